//! Line framing for the POP3 wire: CRLF-terminated command lines and
//! dot-terminated, dot-stuffed multi-line blocks.

use std::io::{BufRead, BufReader, Read, Write};

use crate::errors::*;

const LF: u8 = 0x0a;
const CR: u8 = 0x0d;

/// Terminates a multi-line block when alone on a line.
pub const TERMINATOR: &str = ".";

/// Longest line accepted from the server, terminator included.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

pub struct LineTransport<S: Read + Write> {
    inner: BufReader<S>,
}

impl<S: Read + Write> LineTransport<S> {
    pub fn new(stream: S) -> LineTransport<S> {
        LineTransport {
            inner: BufReader::new(stream),
        }
    }

    /// Write `command` followed by CRLF.
    pub fn send_command(&mut self, command: &str) -> Result<()> {
        let stream = self.inner.get_mut();
        stream
            .write_all(format!("{}\r\n", command).as_bytes())
            .and_then(|_| stream.flush())
            .map_err(|e| ErrorKind::Transport(format!("write failed: {}", e)))?;
        Ok(())
    }

    /// Read one line, without its terminator.
    ///
    /// A bare LF is accepted as well as CRLF. End of stream, including a
    /// last line with no LF, is an error, and so is a line longer than
    /// `MAX_LINE_LENGTH`.
    pub fn read_line(&mut self) -> Result<String> {
        let mut buff = Vec::new();
        let n = self
            .inner
            .by_ref()
            .take(MAX_LINE_LENGTH as u64)
            .read_until(LF, &mut buff)
            .map_err(|e| ErrorKind::Transport(format!("read failed: {}", e)))?;
        if n == 0 {
            bail!(ErrorKind::Transport("connection closed by server".into()));
        }
        if n == MAX_LINE_LENGTH && buff.last() != Some(&LF) {
            bail!(ErrorKind::Transport(format!(
                "line longer than {} bytes",
                MAX_LINE_LENGTH
            )));
        }
        if buff.last() != Some(&LF) {
            bail!(ErrorKind::Transport("connection closed in the middle of a line".into()));
        }
        buff.pop();
        if buff.last() == Some(&CR) {
            buff.pop();
        }
        Ok(String::from_utf8_lossy(&buff).into_owned())
    }

    /// Read the next line of a multi-line block.
    ///
    /// Returns `None` once the terminator line has been consumed. A leading
    /// `..` is unstuffed to `.`.
    pub fn read_multiline(&mut self) -> Result<Option<String>> {
        let mut line = self.read_line()?;
        if line == TERMINATOR {
            return Ok(None);
        }
        if line.starts_with("..") {
            line.remove(0);
        }
        Ok(Some(line))
    }
}
