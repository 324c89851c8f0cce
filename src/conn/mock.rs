//! An in-memory connection used by the unit tests: scripted input on one
//! side, captured output on the other.

use crate::conn::Connection;
use crate::conn::ConnectionExt;
use std::collections::VecDeque;

pub(crate) struct MockConn {
    pub input: VecDeque<u8>,
    pub output: Vec<u8>,
}

impl MockConn {
    pub fn new() -> MockConn {
        MockConn {
            input: VecDeque::new(),
            output: Vec::new(),
        }
    }

    /// Queue raw bytes for the server to read.
    pub fn queue(&mut self, bytes: &[u8]) {
        self.input.extend(bytes);
    }

    /// Frame `body` as `$<body>#<checksum>` and queue it.
    pub fn queue_packet(&mut self, body: &[u8]) {
        let checksum = body.iter().fold(0u8, |a, x| a.wrapping_add(*x));
        self.input.push_back(b'$');
        self.input.extend(body);
        self.input.push_back(b'#');
        self.input
            .extend(format!("{checksum:02x}").as_bytes().iter().copied());
    }

    /// Every `$...#cc` frame the server sent, as body strings.
    pub fn sent_packets(&self) -> Vec<String> {
        let mut packets = Vec::new();
        let mut body: Option<Vec<u8>> = None;
        for &b in &self.output {
            match (&mut body, b) {
                (None, b'$') => body = Some(Vec::new()),
                (None, _) => {}
                (Some(acc), b'#') => {
                    packets.push(String::from_utf8_lossy(acc).into_owned());
                    body = None;
                }
                (Some(acc), _) => acc.push(b),
            }
        }
        packets
    }
}

impl Connection for MockConn {
    type Error = String;

    fn write(&mut self, byte: u8) -> Result<(), String> {
        self.output.push(byte);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), String> {
        Ok(())
    }
}

impl ConnectionExt for MockConn {
    fn read(&mut self) -> Result<u8, String> {
        self.input.pop_front().ok_or_else(|| "eof".to_string())
    }

    fn peek(&mut self) -> Result<Option<u8>, String> {
        Ok(self.input.front().copied())
    }
}
