//! Per-message output.

use std::cmp;
use std::io::{self, Write};

use crate::headers::{DisplayMode, HeaderLine, HeaderSet};

/// The subject column never starts before this many characters.
pub const MIN_SENDER_WIDTH: usize = 30;

const UNKNOWN_SENDER: &str = "<<unknown sender>>";

/// Value of a header line: after the first colon, leading blanks removed.
fn field_value(text: &str) -> Option<&str> {
    text.find(':').map(|colon| text[colon + 1..].trim_start_matches(' '))
}

/// At most `max` characters of `s`.
fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

/// Reduce a message to one `sender subject` line no wider than
/// `column_width`.
pub fn format_report(headers: &HeaderSet, column_width: usize) -> String {
    let mut from = None;
    let mut subject = None;
    for header in headers {
        let (name, value) = match *header {
            HeaderLine::Primary { ref name, ref text } => match field_value(text) {
                Some(value) => (name, value),
                None => continue,
            },
            HeaderLine::Continuation { .. } => continue,
        };
        if from.is_none() && name.eq_ignore_ascii_case("from") {
            from = Some(value);
        } else if subject.is_none() && name.eq_ignore_ascii_case("subject") {
            subject = Some(value);
        }
        if from.is_some() && subject.is_some() {
            break;
        }
    }

    let sender = truncate(from.unwrap_or(UNKNOWN_SENDER), column_width);
    let sender_len = cmp::max(sender.chars().count(), MIN_SENDER_WIDTH);
    let field_width = cmp::min(MIN_SENDER_WIDTH, column_width);

    let subject = match column_width.checked_sub(sender_len + 1) {
        Some(room) if room >= 1 => subject.map(|s| truncate(s, room)),
        _ => None,
    };

    match subject {
        Some(subject) => format!("{:<width$} {}", sender, subject, width = field_width),
        None => format!("{:<width$}", sender, width = field_width),
    }
}

/// How retained headers reach the output, fixed for the whole run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageEmitter {
    /// Every retained line verbatim.
    RawLines,
    Report { column_width: usize },
}

impl MessageEmitter {
    pub fn for_mode(mode: DisplayMode, column_width: usize) -> MessageEmitter {
        match mode {
            DisplayMode::Report => MessageEmitter::Report {
                column_width: column_width,
            },
            DisplayMode::Short | DisplayMode::Verbose | DisplayMode::Totals => {
                MessageEmitter::RawLines
            }
        }
    }

    pub fn emit<W: Write>(&self, headers: &HeaderSet, out: &mut W) -> io::Result<()> {
        match *self {
            MessageEmitter::RawLines => {
                for header in headers {
                    writeln!(out, "{}", header.text())?;
                }
                Ok(())
            }
            MessageEmitter::Report { column_width } => {
                writeln!(out, "{}", format_report(headers, column_width))
            }
        }
    }
}
