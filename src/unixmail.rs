//! The local mail spool, an mbox file of `From ` separated messages.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::config::SessionConfig;
use crate::errors::*;
use crate::headers::{DisplayMode, SenderFilter};

const SPOOL_DIRS: &[&str] = &["/var/spool/mail", "/var/mail"];

/// `user`'s mailbox in the first system spool directory that exists.
pub fn spool_path(user: &str) -> Option<PathBuf> {
    SPOOL_DIRS
        .iter()
        .map(|dir| Path::new(dir))
        .find(|dir| dir.is_dir())
        .map(|dir| dir.join(user))
}

/// Open and scan the mail drop at `path`.
pub fn check_mail_drop<W: Write>(
    path: &Path,
    config: &SessionConfig,
    pop_enabled: bool,
    out: &mut W,
) -> Result<u32> {
    let file = File::open(path)
        .chain_err(|| format!("Can't open {}", path.display()))?;
    let size = file.metadata().ok().map(|m| m.len());
    check_unix_mail(BufReader::new(file), size, config, pop_enabled, out)
}

/// Print the envelope line of every message in an mbox stream.
///
/// `size` is the byte length of the mailbox, shown by the totals summary
/// when known.
pub fn check_unix_mail<R: BufRead, W: Write>(
    mut reader: R,
    size: Option<u64>,
    config: &SessionConfig,
    pop_enabled: bool,
    out: &mut W,
) -> Result<u32> {
    let totals = config.mode == DisplayMode::Totals;
    let mut found = 0u32;
    let mut stashed: Option<String> = None;
    let mut buff = Vec::new();

    loop {
        buff.clear();
        if reader.read_until(b'\n', &mut buff)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buff);
        let line = line.trim_end_matches(|c: char| c == '\n' || c == '\r');

        if line.is_empty() && stashed.is_some() {
            if let Some(envelope) = stashed.take() {
                print_envelope(&envelope, found, totals, pop_enabled, out)?;
                found += 1;
            }
        } else if line.starts_with("From ")
            && config.sender.as_ref().map_or(true, |s| sender_matches(&line[4..], s))
        {
            stashed = Some(line.to_owned());
        }
    }
    if let Some(envelope) = stashed.take() {
        print_envelope(&envelope, found, totals, pop_enabled, out)?;
        found += 1;
    }

    if totals && found > 0 {
        let plural = if found > 1 { "s" } else { "" };
        match size {
            Some(size) => writeln!(
                out,
                "You have {} local message{} ({} bytes).",
                found, plural, size
            )?,
            None => writeln!(out, "You have {} local message{}.", found, plural)?,
        }
    }
    Ok(found)
}

fn print_envelope<W: Write>(
    envelope: &str,
    found: u32,
    totals: bool,
    pop_enabled: bool,
    out: &mut W,
) -> Result<()> {
    if totals {
        return Ok(());
    }
    if found == 0 && pop_enabled {
        writeln!(out, "Local mail:")?;
    }
    writeln!(out, "{}", envelope)?;
    Ok(())
}

/// Whether the envelope sender (the first word of `rest`) starts with the
/// filter, ignoring case.
fn sender_matches(rest: &str, sender: &SenderFilter) -> bool {
    let word = rest
        .trim_start_matches(|c: char| c == ' ' || c == '\t')
        .split(|c: char| c == ' ' || c == '\t')
        .next()
        .unwrap_or("");
    if word.is_empty() {
        return false;
    }
    word.to_lowercase().starts_with(sender.as_str())
}
