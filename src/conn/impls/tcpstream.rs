use crate::conn::Connection;
use crate::conn::ConnectionExt;
use std::io;
use std::net::TcpStream;

impl Connection for TcpStream {
    type Error = io::Error;

    fn write(&mut self, byte: u8) -> io::Result<()> {
        io::Write::write_all(self, std::slice::from_ref(&byte))
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        io::Write::write_all(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::Write::flush(self)
    }

    fn on_session_start(&mut self) -> io::Result<()> {
        // an RSP session is a stream of tiny packets, each of which the
        // client waits on; letting Nagle batch them cripples latency
        self.set_nodelay(true)
    }
}

// The session loop alternates blocking packet reads with non-blocking
// break polling on the same socket, and `TcpStream` carries no room for
// extra state, so each entry point below pins the O_NONBLOCK mode it
// needs before touching the socket.
impl ConnectionExt for TcpStream {
    fn read(&mut self) -> io::Result<u8> {
        self.set_nonblocking(false)?;

        let mut byte = 0u8;
        loop {
            return match io::Read::read(self, std::slice::from_mut(&mut byte)) {
                Ok(0) => Err(io::ErrorKind::UnexpectedEof.into()),
                Ok(_) => Ok(byte),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => Err(e),
            };
        }
    }

    fn peek(&mut self) -> io::Result<Option<u8>> {
        self.set_nonblocking(true)?;

        let mut byte = 0u8;
        match TcpStream::peek(self, std::slice::from_mut(&mut byte)) {
            // orderly shutdown: nothing to consume; the next blocking
            // read surfaces the EOF
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(byte)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }
}
