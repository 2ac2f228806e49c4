//! In-memory stand-in for a server connection.

use std::cell::RefCell;
use std::io::{self, Cursor, Read, Write};
use std::rc::Rc;

/// Everything the client wrote to a `MockStream`.
#[derive(Clone, Default)]
pub struct Sent(Rc<RefCell<Vec<u8>>>);

impl Sent {
    pub fn text(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).unwrap()
    }

    pub fn commands(&self) -> Vec<String> {
        self.text().lines().map(str::to_owned).collect()
    }
}

/// Replays a canned server script and records what the client sends.
pub struct MockStream {
    input: Cursor<Vec<u8>>,
    output: Sent,
}

impl MockStream {
    pub fn new(script: &str) -> (MockStream, Sent) {
        MockStream::from_bytes(script.as_bytes().to_vec())
    }

    pub fn from_bytes(script: Vec<u8>) -> (MockStream, Sent) {
        let sent = Sent::default();
        let stream = MockStream {
            input: Cursor::new(script),
            output: sent.clone(),
        };
        (stream, sent)
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
