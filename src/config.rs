use std::time::Duration;

use crate::headers::{DisplayMode, SenderFilter, DEFAULT_MAX_HEADER_LINES};

pub const POP3_PORT: u16 = 110;
pub const POP3S_PORT: u16 = 995;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Security {
    Plain,
    SSL,
}

impl Security {
    pub fn default_port(self) -> u16 {
        match self {
            Security::Plain => POP3_PORT,
            Security::SSL => POP3S_PORT,
        }
    }
}

/// How the client proves its identity after the greeting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthScheme {
    /// `USER` followed by `PASS` with the account password.
    Pass,
    /// `USER` followed by `RPOP`, trusting the client host.
    Rpop,
    /// A single `APOP` carrying an MD5 digest of the greeting timestamp and
    /// the account password.
    Apop,
}

impl AuthScheme {
    #[cfg(feature = "apop")]
    pub const COMPILED: AuthScheme = AuthScheme::Apop;
    #[cfg(all(feature = "rpop", not(feature = "apop")))]
    pub const COMPILED: AuthScheme = AuthScheme::Rpop;
    #[cfg(not(any(feature = "rpop", feature = "apop")))]
    pub const COMPILED: AuthScheme = AuthScheme::Pass;

    pub fn needs_password(self) -> bool {
        self != AuthScheme::Rpop
    }
}

#[derive(Clone, Debug)]
pub struct AccountConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
    pub security: Security,
    pub auth: AuthScheme,
    /// Applies to connecting and to every read and write.
    pub timeout: Duration,
}

impl AccountConfig {
    pub fn new(host: &str, username: &str) -> AccountConfig {
        AccountConfig {
            host: host.to_owned(),
            port: POP3_PORT,
            username: username.to_owned(),
            password: None,
            security: Security::Plain,
            auth: AuthScheme::COMPILED,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Presentation settings for one run. Built once and only ever borrowed.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub mode: DisplayMode,
    pub sender: Option<SenderFilter>,
    pub max_header_lines: usize,
    /// Overrides the terminal query; mostly useful when output is not a
    /// terminal.
    pub terminal_width: Option<u16>,
}

impl SessionConfig {
    pub fn new(mode: DisplayMode) -> SessionConfig {
        SessionConfig {
            mode: mode,
            sender: None,
            max_header_lines: DEFAULT_MAX_HEADER_LINES,
            terminal_width: None,
        }
    }

    pub fn with_sender(mut self, sender: &str) -> SessionConfig {
        self.sender = Some(SenderFilter::new(sender));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_defaults() {
        let account = AccountConfig::new("po10.mit.edu", "jdoe");
        assert_eq!(POP3_PORT, account.port);
        assert_eq!(Security::Plain, account.security);
        assert_eq!(AuthScheme::COMPILED, account.auth);
        assert!(account.password.is_none());
        assert_eq!(POP3S_PORT, Security::SSL.default_port());
    }

    #[test]
    fn sender_is_lowered_once() {
        let config = SessionConfig::new(DisplayMode::Report).with_sender("Alice");
        assert_eq!("alice", config.sender.unwrap().as_str());
    }
}
