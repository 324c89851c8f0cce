//! The byte transport between the server and the GDB client.
//!
//! RSP is strictly in-order and byte-oriented, so the seam is deliberately
//! small: blocking writes, a blocking read, and one non-blocking `peek` -
//! which is what lets the server notice an out-of-band break byte (Ctrl-C)
//! between polling rounds of a `continue` without giving up the socket.

mod impls;

#[cfg(test)]
pub(crate) mod mock;

/// Writing bytes to the client, in order, blocking until accepted.
///
/// Implemented out-of-the-box for [`TcpStream`](std::net::TcpStream).
pub trait Connection {
    /// Transport-specific error type.
    type Error;

    /// Write a single byte.
    fn write(&mut self, byte: u8) -> Result<(), Self::Error>;

    /// Write a whole buffer.
    ///
    /// Overriding this is worthwhile whenever the transport has a bulk
    /// write of its own; the provided implementation just feeds
    /// [`write`](Self::write) one byte at a time.
    fn write_all(&mut self, buf: &[u8]) -> Result<(), Self::Error> {
        buf.iter().try_for_each(|b| self.write(*b))
    }

    /// Push any buffered bytes out to the client.
    ///
    /// Transports without internal buffering may simply return `Ok(())`.
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// One-time transport setup, called before the first packet of a
    /// session moves in either direction. The provided implementation
    /// does nothing.
    fn on_session_start(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Extends [`Connection`] with the receive side.
pub trait ConnectionExt: Connection {
    /// Read a single byte, blocking until one arrives.
    fn read(&mut self) -> Result<u8, Self::Error>;

    /// Look at the next byte without consuming it, returning `None` when
    /// nothing is pending.
    ///
    /// This MUST NOT block, and repeated calls MUST keep returning the
    /// same byte until [`read`](Self::read) consumes it: the session loop
    /// peeks on every polling round while the target runs.
    fn peek(&mut self) -> Result<Option<u8>, Self::Error>;
}
