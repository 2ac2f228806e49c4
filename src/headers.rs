//! Selection of the header lines worth showing for one message.

use std::slice;

use crate::config::SessionConfig;
use crate::errors::*;
use crate::LineConsumer;

/// Upper bound on retained header lines per message.
pub const DEFAULT_MAX_HEADER_LINES: usize = 512;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayMode {
    /// `From` lines only.
    Short,
    /// One formatted sender/subject line per message.
    Report,
    Verbose,
    /// Mailbox totals; no message is retrieved.
    Totals,
}

impl DisplayMode {
    /// Lower-cased names of the fields retained in this mode.
    pub fn retained_fields(self) -> &'static [&'static str] {
        match self {
            DisplayMode::Short => &["from"],
            DisplayMode::Report => &["from", "subject"],
            DisplayMode::Verbose => &["to", "from", "subject", "date"],
            DisplayMode::Totals => &[],
        }
    }

    /// Whether the maildrop size is announced before anything else.
    pub fn prints_summary(self) -> bool {
        match self {
            DisplayMode::Verbose | DisplayMode::Totals => true,
            DisplayMode::Short | DisplayMode::Report => false,
        }
    }
}

/// Only show messages from one address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SenderFilter(String);

impl SenderFilter {
    pub fn new(sender: &str) -> SenderFilter {
        SenderFilter(sender.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `value` is everything after the colon of a `From` field.
    pub fn matches(&self, value: &str) -> bool {
        parse_from_field(value) == self.0
    }
}

/// Reduce a `From` value to a lower-cased local part.
///
/// `Alice Smith <ALICE@example.com>` becomes `alice`.
pub fn parse_from_field(value: &str) -> String {
    let mut address = value.trim_start();
    if let Some(lt) = address.find('<') {
        address = &address[lt + 1..];
    }
    if let Some(at) = address.find('@') {
        address = &address[..at];
    }
    if let Some(gt) = address.find('>') {
        address = &address[..gt];
    }
    address.to_lowercase()
}

/// The text before the first colon, or the whole line when there is none.
pub fn field_name(line: &str) -> &str {
    match line.find(':') {
        Some(colon) => &line[..colon],
        None => line,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeaderLine {
    Primary { name: String, text: String },
    /// A folded line belonging to the preceding primary line.
    Continuation { text: String },
}

impl HeaderLine {
    pub fn classify(line: &str) -> HeaderLine {
        if starts_with_whitespace(line) {
            HeaderLine::Continuation {
                text: line.to_owned(),
            }
        } else {
            HeaderLine::Primary {
                name: field_name(line).to_owned(),
                text: line.to_owned(),
            }
        }
    }

    /// The line exactly as received.
    pub fn text(&self) -> &str {
        match *self {
            HeaderLine::Primary { ref text, .. } => text,
            HeaderLine::Continuation { ref text } => text,
        }
    }
}

fn starts_with_whitespace(line: &str) -> bool {
    line.chars().next().map_or(false, char::is_whitespace)
}

/// Retained header lines of one message, in arrival order.
#[derive(Clone, Debug)]
pub struct HeaderSet {
    lines: Vec<HeaderLine>,
    capacity: usize,
}

impl HeaderSet {
    pub fn with_capacity(capacity: usize) -> HeaderSet {
        HeaderSet {
            lines: Vec::new(),
            capacity: capacity,
        }
    }

    pub fn push(&mut self, line: HeaderLine) -> Result<()> {
        if self.lines.len() >= self.capacity {
            bail!(ErrorKind::Resource(format!(
                "more than {} header lines in one message",
                self.capacity
            )));
        }
        self.lines.push(line);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn iter(&self) -> slice::Iter<HeaderLine> {
        self.lines.iter()
    }
}

impl<'a> IntoIterator for &'a HeaderSet {
    type Item = &'a HeaderLine;
    type IntoIter = slice::Iter<'a, HeaderLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

/// Outcome of scanning one message's header section.
#[derive(Debug)]
pub struct ScannedMessage {
    pub headers: HeaderSet,
    /// The sender filter rejected this message.
    pub skipped: bool,
}

/// Classifies the header lines of one message as they arrive.
pub struct HeaderScanner<'a> {
    config: &'a SessionConfig,
    headers: HeaderSet,
    in_retained: bool,
    skipped: bool,
}

impl<'a> HeaderScanner<'a> {
    pub fn new(config: &'a SessionConfig) -> HeaderScanner<'a> {
        HeaderScanner {
            config: config,
            headers: HeaderSet::with_capacity(config.max_header_lines),
            in_retained: false,
            skipped: false,
        }
    }

    pub fn scan(&mut self, line: &str) -> Result<()> {
        let header = HeaderLine::classify(line);
        let (keyword, name_len) = match header {
            HeaderLine::Primary { ref name, .. } => (name.to_lowercase(), name.len()),
            HeaderLine::Continuation { .. } if self.in_retained => {
                return self.headers.push(header);
            }
            HeaderLine::Continuation { .. } => return Ok(()),
        };

        if let Some(ref sender) = self.config.sender {
            let value = line.get(name_len + 1..).unwrap_or("");
            if keyword == "from" && !sender.matches(value) {
                trace!("Sender filter rejects {:?}", line);
                self.skipped = true;
            }
        }

        if self.config.mode.retained_fields().contains(&keyword.as_str()) {
            self.in_retained = true;
            self.headers.push(header)
        } else {
            self.in_retained = false;
            Ok(())
        }
    }

    pub fn finish(self) -> ScannedMessage {
        ScannedMessage {
            headers: self.headers,
            skipped: self.skipped,
        }
    }
}

impl<'a> LineConsumer for HeaderScanner<'a> {
    fn consume(&mut self, line: &str) -> Result<()> {
        self.scan(line)
    }
}
