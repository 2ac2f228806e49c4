use openssl::ssl::{SslConnector, SslMethod, SslStream};
use std::net::{TcpStream, ToSocketAddrs};
use std::io::{self, Read, Write};

use crate::config::{AccountConfig, Security};
use crate::errors::*;

#[derive(Debug)]
pub enum TCPStreamType {
    Plain(TcpStream),
    SSL(SslStream<TcpStream>),
}

impl Write for TCPStreamType {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match *self {
            TCPStreamType::Plain(ref mut stream) => stream.write(buf),
            TCPStreamType::SSL(ref mut stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match *self {
            TCPStreamType::Plain(ref mut stream) => stream.flush(),
            TCPStreamType::SSL(ref mut stream) => stream.flush(),
        }
    }
}

impl Read for TCPStreamType {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match *self {
            TCPStreamType::Plain(ref mut stream) => stream.read(buf),
            TCPStreamType::SSL(ref mut stream) => stream.read(buf),
        }
    }
}

impl TCPStreamType {
    /// Open a connection to `account.host`, trying each resolved address in
    /// turn, and wrap it in TLS when the account asks for it.
    pub fn connect(account: &AccountConfig) -> Result<TCPStreamType> {
        let addrs = (&account.host[..], account.port)
            .to_socket_addrs()
            .map_err(|e| ErrorKind::Connection(format!("{}: {}", account.host, e)))?;

        let mut last_error = None;
        let mut tcp_stream = None;
        for addr in addrs {
            debug!("Connecting to {}", addr);
            match TcpStream::connect_timeout(&addr, account.timeout) {
                Ok(stream) => {
                    tcp_stream = Some(stream);
                    break;
                }
                Err(e) => last_error = Some(e),
            }
        }
        let tcp_stream = match tcp_stream {
            Some(stream) => stream,
            None => bail!(ErrorKind::Connection(match last_error {
                Some(e) => format!("{}: {}", account.host, e),
                None => format!("{}: no address found", account.host),
            })),
        };
        tcp_stream
            .set_read_timeout(Some(account.timeout))
            .and_then(|_| tcp_stream.set_write_timeout(Some(account.timeout)))
            .map_err(|e| ErrorKind::Connection(format!("{}: cannot set timeout: {}", account.host, e)))?;

        match account.security {
            Security::Plain => {
                debug!("Creating a Plain TCP Connection");
                Ok(TCPStreamType::Plain(tcp_stream))
            }
            Security::SSL => {
                debug!("Creating a SSL Connection");
                let connector = SslConnector::builder(SslMethod::tls())
                    .map_err(|e| ErrorKind::Connection(format!("cannot set up TLS: {}", e)))?
                    .build();
                let stream = connector.connect(&account.host, tcp_stream).map_err(|e| {
                    ErrorKind::Connection(format!("TLS handshake with {} failed: {}", account.host, e))
                })?;
                Ok(TCPStreamType::SSL(stream))
            }
        }
    }
}
