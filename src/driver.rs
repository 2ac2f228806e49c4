//! One complete check of a POP3 maildrop.

use std::io::{Read, Write};

use crate::config::{AccountConfig, SessionConfig};
use crate::errors::*;
use crate::headers::{DisplayMode, HeaderScanner};
use crate::report::MessageEmitter;
use crate::terminal;
use crate::POP3Connection;

/// Connect to `account` and report its messages on `out`.
///
/// Returns the number of messages in the maildrop. `local_mail_found`
/// makes the remote listing start with a `POP mail:` heading.
pub fn check_pop_mail<W: Write>(
    account: AccountConfig,
    config: &SessionConfig,
    local_mail_found: bool,
    out: &mut W,
) -> Result<u32> {
    let conn = POP3Connection::connect(account)?;
    run_session(conn, config, local_mail_found, out)
}

/// Run a check over an already greeted connection, then close it.
pub fn run_session<S: Read + Write, W: Write>(
    mut conn: POP3Connection<S>,
    config: &SessionConfig,
    local_mail_found: bool,
    out: &mut W,
) -> Result<u32> {
    let result = report_mailbox(&mut conn, config, local_mail_found, out);
    match result {
        Err(ref e) if e.is_transport() => {
            debug!("Connection unusable, not sending QUIT");
        }
        _ => {
            if let Err(e) = conn.quit() {
                warn!("QUIT failed: {}", e);
            }
        }
    }
    result
}

fn report_mailbox<S: Read + Write, W: Write>(
    conn: &mut POP3Connection<S>,
    config: &SessionConfig,
    local_mail_found: bool,
    out: &mut W,
) -> Result<u32> {
    conn.login()?;
    let stat = conn.stat()?;
    debug!("{} messages, {} bytes", stat.num_mails, stat.mbox_size);
    if stat.num_mails == 0 {
        return Ok(0);
    }

    if config.mode.prints_summary() {
        writeln!(
            out,
            "You have {} {} ({} bytes) on {}{}",
            stat.num_mails,
            if stat.num_mails > 1 { "messages" } else { "message" },
            stat.mbox_size,
            conn.host(),
            if config.mode == DisplayMode::Verbose { ':' } else { '.' }
        )?;
    }
    if config.mode == DisplayMode::Totals {
        return Ok(stat.num_mails);
    }
    if local_mail_found {
        writeln!(out, "POP mail:")?;
    }

    let width = config.terminal_width.unwrap_or_else(terminal::terminal_width);
    let emitter = MessageEmitter::for_mode(config.mode, terminal::column_width(width));

    let mut previous_skipped = false;
    for msgnum in 1..=stat.num_mails {
        if config.mode == DisplayMode::Verbose && !previous_skipped {
            writeln!(out)?;
        }
        let mut scanner = HeaderScanner::new(config);
        conn.retr_headers(msgnum, &mut scanner)?;
        let message = scanner.finish();
        previous_skipped = message.skipped;
        if message.skipped {
            debug!("Message {} is not from the requested sender", msgnum);
            continue;
        }
        emitter.emit(&message.headers, out)?;
    }
    Ok(stat.num_mails)
}
