/// Reply to `STAT`: the size of the maildrop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct POP3Stat {
    pub mbox_size: u64,
    pub num_mails: u32,
}
