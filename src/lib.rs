//! Report waiting mail in a POP3 maildrop and in the local mail spool.
//!
//! The remote check is a short POP3 conversation: greeting, authentication,
//! `STAT`, one `RETR` per message (only the header section is looked at) and
//! `QUIT`. See [`driver::check_pop_mail`] for the entry point.

#[macro_use]
extern crate log;
#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate lazy_static;
extern crate md5;
extern crate nix;
extern crate openssl;
extern crate regex;

#[cfg(all(feature = "rpop", feature = "apop"))]
compile_error!("features `rpop` and `apop` select different credential schemes; enable at most one");

use std::io::{Read, Write};
use regex::Regex;

pub mod errors {
    error_chain! {
        foreign_links {
            Io(::std::io::Error);
            SslStack(::openssl::error::ErrorStack);
            RegexError(::regex::Error);
        }

        errors {
            Connection(msg: String) {
                description("unable to connect to the mail server")
                display("{}", msg)
            }
            Protocol(msg: String) {
                description("unexpected response from the mail server")
                display("{}", msg)
            }
            Transport(msg: String) {
                description("connection to the mail server failed")
                display("{}", msg)
            }
            Resource(msg: String) {
                description("resource limit exceeded")
                display("{}", msg)
            }
            Config(msg: String) {
                description("invalid configuration")
                display("{}", msg)
            }
        }
    }

    impl Error {
        /// The connection can no longer carry a `QUIT`.
        pub fn is_transport(&self) -> bool {
            match *self.kind() {
                ErrorKind::Transport(_) => true,
                _ => false,
            }
        }

        /// Errors which must end the whole process, not just the session.
        pub fn is_fatal(&self) -> bool {
            match *self.kind() {
                ErrorKind::Resource(_) => true,
                _ => false,
            }
        }
    }
}
use errors::*;

pub mod config;
pub mod driver;
pub mod headers;
pub mod pop3result;
mod pop3resultimpl;
pub mod report;
pub mod tcpstream;
pub mod terminal;
pub mod transport;
pub mod unixmail;
mod utils;

#[cfg(test)]
mod mock_stream;

use config::{AccountConfig, AuthScheme};
use pop3result::POP3Stat;
use tcpstream::TCPStreamType;
use transport::LineTransport;

/// Receives the header lines of one message, in arrival order.
///
/// The empty line ending the header section and the message body are never
/// passed on.
pub trait LineConsumer {
    fn consume(&mut self, line: &str) -> Result<()>;
}

#[derive(PartialEq)]
#[derive(Debug)]
enum POP3State {
    BEGIN,
    AUTHORIZATION,
    TRANSACTION,
    // UPDATE, // State unused in a Client
    END,
}

pub struct POP3Connection<S: Read + Write = TCPStreamType> {
    account: AccountConfig,
    transport: LineTransport<S>,
    state: POP3State,
    timestamp: String,
}

impl POP3Connection<TCPStreamType> {
    /// Connect to the account's host and read the server greeting.
    pub fn connect(account: AccountConfig) -> Result<POP3Connection> {
        trace!("Initiate POP3 Connection");
        let stream = TCPStreamType::connect(&account)?;
        POP3Connection::with_stream(account, stream)
    }
}

impl<S: Read + Write> POP3Connection<S> {
    /// Start a session over an already established stream.
    pub fn with_stream(account: AccountConfig, stream: S) -> Result<POP3Connection<S>> {
        let mut ctx = POP3Connection {
            account: account,
            transport: LineTransport::new(stream),
            state: POP3State::BEGIN,
            timestamp: String::new(),
        };
        trace!("Connection Established");
        debug!("POP3State::{:?}", ctx.state);
        ctx.read_greeting()?;
        ctx.state = POP3State::AUTHORIZATION;
        debug!("POP3State::{:?}", ctx.state);
        Ok(ctx)
    }

    pub fn host(&self) -> &str {
        &self.account.host
    }

    pub fn login(&mut self) -> Result<()> {
        assert!(self.state == POP3State::AUTHORIZATION);
        trace!("Attempting to Login");
        let username = self.account.username.clone();
        match self.account.auth {
            AuthScheme::Pass => {
                debug!("Plain USER/PASS authentication");
                let password = self.secret()?;
                self.send_command("USER", Some(&username))?;
                self.send_command("PASS", Some(&password))?;
            }
            AuthScheme::Rpop => {
                debug!("Authenticating using RPOP");
                self.send_command("USER", Some(&username))?;
                self.send_command("RPOP", Some(&username))?;
            }
            AuthScheme::Apop => {
                debug!("Authenticating using APOP");
                let password = self.secret()?;
                if self.timestamp.is_empty() {
                    bail!(ErrorKind::Protocol("server greeting carries no APOP timestamp".into()));
                }
                let digest = utils::apop_digest(&self.timestamp, &password);
                self.send_command("APOP", Some(&format!("{} {}", username, digest)))?;
            }
        }

        // Switch the current state to TRANSACTION on a successful authentication
        self.state = POP3State::TRANSACTION;
        debug!("POP3State::{:?}", self.state);
        Ok(())
    }

    pub fn stat(&mut self) -> Result<POP3Stat> {
        assert!(self.state == POP3State::TRANSACTION);
        trace!("Cmd: STAT");
        let status = self.send_command("STAT", None)?;
        POP3Stat::parse(&status)
    }

    /// Retrieve message `msgnum`, handing its header lines to `consumer`.
    ///
    /// The whole response block is always read up to its terminator so the
    /// session stays usable, even when `consumer` fails part way.
    pub fn retr_headers<C>(&mut self, msgnum: u32, consumer: &mut C) -> Result<()>
        where C: LineConsumer + ?Sized
    {
        assert!(self.state == POP3State::TRANSACTION);
        trace!("Cmd: RETR");
        self.send_command("RETR", Some(&msgnum.to_string()))?;

        let mut in_headers = true;
        let mut consumer_error = None;
        while let Some(line) = self.transport.read_multiline()? {
            if !in_headers {
                continue;
            }
            if line.is_empty() {
                in_headers = false;
                continue;
            }
            if consumer_error.is_none() {
                if let Err(e) = consumer.consume(&line) {
                    consumer_error = Some(e);
                }
            }
        }
        trace!("Message {} drained", msgnum);

        match consumer_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn quit(&mut self) -> Result<()> {
        assert!(self.state == POP3State::AUTHORIZATION || self.state == POP3State::TRANSACTION);
        trace!("Cmd: QUIT");
        let _ = self.send_command("QUIT", None)?;
        self.state = POP3State::END;
        debug!("POP3State::{:?}", self.state);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn timestamp(&self) -> &str {
        &self.timestamp
    }

    fn secret(&self) -> Result<String> {
        match self.account.password {
            Some(ref password) => Ok(password.clone()),
            None => bail!(ErrorKind::Config(format!(
                "no password configured for {}",
                self.account.username
            ))),
        }
    }

    fn read_greeting(&mut self) -> Result<()> {
        trace!("Reading Greeting from Server");
        let greeting = self.read_response()?;
        let re = Regex::new(r"(<[^<>]*>)\s*$")?;
        for cap in re.captures_iter(&greeting) {
            self.timestamp = cap[1].to_string();
        }
        Ok(())
    }

    fn send_command(&mut self, command: &str, param: Option<&str>) -> Result<String> {
        // Create the actual POP3 Command by appending the parameters
        let line = match param {
            Some(x) => format!("{} {}", command, x),
            None => command.to_string(),
        };

        match command {
            "PASS" | "APOP" => info!("C: {} ****", command),
            _ => info!("C: {}", line),
        }
        self.transport.send_command(&line)?;

        self.read_response()
    }

    /// Read a single status line, returning the text after the status
    /// indicator for a positive response.
    fn read_response(&mut self) -> Result<String> {
        lazy_static! {
            static ref RESPONSE: Regex =
                Regex::new(r"^(?P<status>[+-])(?:OK|ERR)?\s*(?P<statustext>.*)$").unwrap();
        }

        let status_line = self.transport.read_line()?;
        info!("S: {}", status_line);

        // Test if the response is positive. Else exit early.
        let response_groups = match RESPONSE.captures(&status_line) {
            Some(groups) => groups,
            None => bail!(ErrorKind::Protocol(format!("Un-parseable Response: {}", status_line))),
        };
        let text = response_groups["statustext"].to_string();
        match &response_groups["status"] {
            "+" => Ok(text),
            _ if text.is_empty() => bail!(ErrorKind::Protocol(status_line)),
            _ => bail!(ErrorKind::Protocol(text)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::{self, HeaderSet};
    use crate::mock_stream::MockStream;

    struct Collect(Vec<String>);

    impl LineConsumer for Collect {
        fn consume(&mut self, line: &str) -> Result<()> {
            self.0.push(line.to_owned());
            Ok(())
        }
    }

    fn account(auth: AuthScheme) -> AccountConfig {
        let mut account = AccountConfig::new("pop.example.com", "alice");
        account.password = Some("tanstaaf".to_owned());
        account.auth = auth;
        account
    }

    #[test]
    fn greeting_must_be_positive() {
        let (stream, _) = MockStream::new("-ERR go away\r\n");
        let err = POP3Connection::with_stream(account(AuthScheme::Pass), stream)
            .err()
            .expect("greeting accepted");
        match *err.kind() {
            ErrorKind::Protocol(ref msg) => assert_eq!("go away", msg),
            ref k => panic!("unexpected error {:?}", k),
        }
    }

    #[test]
    fn greeting_timestamp_is_remembered() {
        let (stream, _) =
            MockStream::new("+OK POP3 server ready <1896.697170952@dbc.mtview.ca.us>\r\n");
        let conn = POP3Connection::with_stream(account(AuthScheme::Apop), stream).unwrap();
        assert_eq!("<1896.697170952@dbc.mtview.ca.us>", conn.timestamp());
    }

    #[test]
    fn user_pass_login() {
        let (stream, sent) = MockStream::new("+OK ready\r\n+OK\r\n+OK logged in\r\n");
        let mut conn = POP3Connection::with_stream(account(AuthScheme::Pass), stream).unwrap();
        conn.login().unwrap();
        assert_eq!("USER alice\r\nPASS tanstaaf\r\n", sent.text());
    }

    #[test]
    fn rpop_login_names_the_user_twice() {
        let (stream, sent) = MockStream::new("+OK ready\r\n+OK\r\n+OK\r\n");
        let mut conn = POP3Connection::with_stream(account(AuthScheme::Rpop), stream).unwrap();
        conn.login().unwrap();
        assert_eq!("USER alice\r\nRPOP alice\r\n", sent.text());
    }

    #[test]
    fn apop_login_sends_digest() {
        let (stream, sent) = MockStream::new(
            "+OK POP3 server ready <1896.697170952@dbc.mtview.ca.us>\r\n+OK maildrop locked\r\n",
        );
        let mut conn = POP3Connection::with_stream(account(AuthScheme::Apop), stream).unwrap();
        conn.login().unwrap();
        assert_eq!("APOP alice c4c9334bac560ecc979e58001b3e22fb\r\n", sent.text());
    }

    #[test]
    fn apop_without_timestamp_is_refused() {
        let (stream, sent) = MockStream::new("+OK ready\r\n");
        let mut conn = POP3Connection::with_stream(account(AuthScheme::Apop), stream).unwrap();
        assert!(conn.login().is_err());
        assert_eq!("", sent.text());
    }

    #[test]
    fn rejected_password() {
        let (stream, _) = MockStream::new("+OK ready\r\n+OK\r\n-ERR invalid password\r\n");
        let mut conn = POP3Connection::with_stream(account(AuthScheme::Pass), stream).unwrap();
        let err = conn.login().unwrap_err();
        match *err.kind() {
            ErrorKind::Protocol(ref msg) => assert_eq!("invalid password", msg),
            ref k => panic!("unexpected error {:?}", k),
        }
    }

    #[test]
    fn missing_password() {
        let (stream, sent) = MockStream::new("+OK ready\r\n");
        let mut acct = account(AuthScheme::Pass);
        acct.password = None;
        let mut conn = POP3Connection::with_stream(acct, stream).unwrap();
        match *conn.login().unwrap_err().kind() {
            ErrorKind::Config(_) => (),
            ref k => panic!("unexpected error {:?}", k),
        }
        assert_eq!("", sent.text());
    }

    #[test]
    fn stat_counts() {
        let (stream, sent) =
            MockStream::new("+OK ready\r\n+OK\r\n+OK\r\n+OK 3 1024\r\n");
        let mut conn = POP3Connection::with_stream(account(AuthScheme::Pass), stream).unwrap();
        conn.login().unwrap();
        let stat = conn.stat().unwrap();
        assert_eq!(3, stat.num_mails);
        assert_eq!(1024, stat.mbox_size);
        assert!(sent.text().ends_with("STAT\r\n"));
    }

    #[test]
    fn retr_stops_consuming_at_the_empty_line() {
        let (stream, sent) = MockStream::new(
            "+OK ready\r\n+OK\r\n+OK\r\n\
             +OK 120 octets\r\n\
             From: bob@x.com\r\n\
             Subject: hi\r\n\
             \r\n\
             From: not a header\r\n\
             ..dotted\r\n\
             .\r\n\
             +OK bye\r\n",
        );
        let mut conn = POP3Connection::with_stream(account(AuthScheme::Pass), stream).unwrap();
        conn.login().unwrap();
        let mut lines = Collect(Vec::new());
        conn.retr_headers(1, &mut lines).unwrap();
        assert_eq!(vec!["From: bob@x.com", "Subject: hi"], lines.0);
        conn.quit().unwrap();
        assert!(sent.text().ends_with("RETR 1\r\nQUIT\r\n"));
    }

    #[test]
    fn retr_block_without_body() {
        let (stream, _) = MockStream::new(
            "+OK ready\r\n+OK\r\n+OK\r\n+OK\r\nFrom: bob@x.com\r\n.\r\n",
        );
        let mut conn = POP3Connection::with_stream(account(AuthScheme::Pass), stream).unwrap();
        conn.login().unwrap();
        let mut lines = Collect(Vec::new());
        conn.retr_headers(1, &mut lines).unwrap();
        assert_eq!(vec!["From: bob@x.com"], lines.0);
    }

    #[test]
    fn retr_refused() {
        let (stream, _) = MockStream::new(
            "+OK ready\r\n+OK\r\n+OK\r\n-ERR no such message\r\n",
        );
        let mut conn = POP3Connection::with_stream(account(AuthScheme::Pass), stream).unwrap();
        conn.login().unwrap();
        let mut lines = Collect(Vec::new());
        match *conn.retr_headers(7, &mut lines).unwrap_err().kind() {
            ErrorKind::Protocol(ref msg) => assert_eq!("no such message", msg),
            ref k => panic!("unexpected error {:?}", k),
        }
    }

    #[test]
    fn retr_cut_off_is_a_transport_error() {
        let (stream, _) = MockStream::new(
            "+OK ready\r\n+OK\r\n+OK\r\n+OK\r\nFrom: bob@x.com\r\n",
        );
        let mut conn = POP3Connection::with_stream(account(AuthScheme::Pass), stream).unwrap();
        conn.login().unwrap();
        let mut lines = Collect(Vec::new());
        assert!(conn.retr_headers(1, &mut lines).unwrap_err().is_transport());
    }

    #[test]
    fn retr_drains_after_consumer_failure() {
        let (stream, _) = MockStream::new(
            "+OK ready\r\n+OK\r\n+OK\r\n\
             +OK\r\nFrom: a\r\nFrom: b\r\nFrom: c\r\n\r\nbody\r\n.\r\n\
             +OK bye\r\n",
        );
        let mut conn = POP3Connection::with_stream(account(AuthScheme::Pass), stream).unwrap();
        conn.login().unwrap();

        struct Bounded(HeaderSet);
        impl LineConsumer for Bounded {
            fn consume(&mut self, line: &str) -> Result<()> {
                self.0.push(headers::HeaderLine::classify(line))
            }
        }

        let mut bounded = Bounded(HeaderSet::with_capacity(2));
        assert!(conn.retr_headers(1, &mut bounded).unwrap_err().is_fatal());
        // The block was read to its end, so QUIT gets its own reply.
        conn.quit().unwrap();
    }
}
