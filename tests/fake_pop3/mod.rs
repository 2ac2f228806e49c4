//! In-process fake POP3 server.
//!
//! Serves a single connection on `127.0.0.1` from a background thread and
//! records every command line it receives.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};

pub struct Mailbox {
    pub password: String,
    pub messages: Vec<String>,
    /// Close the connection instead of answering `RETR` for this message.
    pub hang_up_on: Option<u32>,
}

impl Mailbox {
    pub fn new(messages: &[&str]) -> Mailbox {
        Mailbox {
            password: "secret".to_owned(),
            messages: messages.iter().map(|m| m.to_string()).collect(),
            hang_up_on: None,
        }
    }

    fn size(&self) -> usize {
        self.messages.iter().map(String::len).sum()
    }
}

pub struct FakePop3Server {
    port: u16,
    handle: JoinHandle<Vec<String>>,
}

impl FakePop3Server {
    pub fn start(mailbox: Mailbox) -> FakePop3Server {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            serve(stream, &mailbox)
        });
        FakePop3Server { port, handle }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Wait for the client to go away and return the commands it sent.
    pub fn commands(self) -> Vec<String> {
        self.handle.join().unwrap()
    }
}

fn serve(stream: TcpStream, mailbox: &Mailbox) -> Vec<String> {
    let mut writer = stream.try_clone().unwrap();
    let mut reader = BufReader::new(stream);
    let mut commands = Vec::new();

    writer
        .write_all(b"+OK fake POP3 server ready <1896.697170952@localhost>\r\n")
        .unwrap();

    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let command = line.trim_end().to_owned();
        commands.push(command.clone());

        let mut words = command.splitn(2, ' ');
        let verb = words.next().unwrap_or("").to_uppercase();
        let arg = words.next().unwrap_or("");
        let reply = match verb.as_str() {
            "USER" => "+OK\r\n".to_owned(),
            "PASS" if arg == mailbox.password => "+OK maildrop locked\r\n".to_owned(),
            "PASS" => "-ERR invalid password\r\n".to_owned(),
            "STAT" => format!("+OK {} {}\r\n", mailbox.messages.len(), mailbox.size()),
            "RETR" => {
                let msgnum = arg.parse::<usize>().unwrap_or(0);
                if mailbox.hang_up_on == Some(msgnum as u32) {
                    let _ = writer.write_all(b"+OK\r\nFrom: cut@off.example\r\n");
                    break;
                }
                match mailbox.messages.get(msgnum.wrapping_sub(1)) {
                    Some(message) => retr_reply(message),
                    None => "-ERR no such message\r\n".to_owned(),
                }
            }
            "QUIT" => {
                let _ = writer.write_all(b"+OK bye\r\n");
                break;
            }
            _ => "-ERR unknown command\r\n".to_owned(),
        };
        if writer.write_all(reply.as_bytes()).is_err() {
            break;
        }
    }
    commands
}

fn retr_reply(message: &str) -> String {
    let mut reply = format!("+OK {} octets\r\n", message.len());
    for line in message.lines() {
        if line.starts_with('.') {
            reply.push('.');
        }
        reply.push_str(line);
        reply.push_str("\r\n");
    }
    reply.push_str(".\r\n");
    reply
}
