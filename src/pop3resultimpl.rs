use crate::errors::*;
use crate::pop3result::POP3Stat;
use regex::Regex;


lazy_static! {
    static ref STAT_REGEX: Regex = Regex::new(r"^(?P<nmsg>\d+)\s+(?P<size>\d+)").unwrap();
}

impl POP3Stat {
    /// Parse the text following `+OK` in a `STAT` reply.
    pub fn parse(stat_line: &str) -> Result<POP3Stat> {
        let stat_cap = match STAT_REGEX.captures(stat_line.trim_start()) {
            Some(cap) => cap,
            None => bail!(ErrorKind::Protocol(format!("malformed STAT response: {}", stat_line))),
        };
        let malformed = |_| ErrorKind::Protocol(format!("malformed STAT response: {}", stat_line));
        Ok(POP3Stat {
            num_mails: stat_cap["nmsg"].parse::<u32>().map_err(malformed)?,
            mbox_size: stat_cap["size"].parse::<u64>().map_err(malformed)?,
        })
    }
}
