use crate::conn::Connection;
use crate::protocol::hex::hex_char;

/// Error value while writing a response.
#[derive(Debug)]
pub struct ResponseWriterError<C>(pub C);

/// A wrapper around [`Connection`] that computes the single-byte checksum of
/// outgoing data, framing each response as `$<data>#<checksum>`.
///
/// Dropping a `ResponseWriter` without calling [`flush`](Self::flush)
/// discards the response.
pub struct ResponseWriter<'a, C: 'a> {
    inner: &'a mut C,
    started: bool,
    checksum: u8,
    msg: Vec<u8>,
}

impl<'a, C: Connection + 'a> ResponseWriter<'a, C> {
    pub fn new(inner: &'a mut C) -> Self {
        Self {
            inner,
            started: false,
            checksum: 0,
            msg: Vec::new(),
        }
    }

    /// Consumes self, writing out the final '#' and checksum.
    pub fn flush(mut self) -> Result<(), ResponseWriterError<C::Error>> {
        // don't include '#' in checksum calculation
        let checksum = self.checksum;

        log::trace!("--> ${}#{:02x}", String::from_utf8_lossy(&self.msg), checksum);

        self.write(b'#')?;
        self.write(hex_char(checksum >> 4))?;
        self.write(hex_char(checksum & 0xf))?;

        self.inner.flush().map_err(ResponseWriterError)
    }

    /// Write a single byte.
    pub fn write(&mut self, byte: u8) -> Result<(), ResponseWriterError<C::Error>> {
        self.msg.push(byte);

        if !self.started {
            self.started = true;
            self.inner.write(b'$').map_err(ResponseWriterError)?;
        }

        self.checksum = self.checksum.wrapping_add(byte);
        self.inner.write(byte).map_err(ResponseWriterError)
    }

    /// Write an entire buffer over the connection.
    pub fn write_all(&mut self, data: &[u8]) -> Result<(), ResponseWriterError<C::Error>> {
        data.iter().try_for_each(|b| self.write(*b))
    }

    /// Write an entire string over the connection.
    pub fn write_str(&mut self, s: &str) -> Result<(), ResponseWriterError<C::Error>> {
        self.write_all(s.as_bytes())
    }

    /// Write a single byte as a hex string (two ascii chars).
    pub fn write_hex(&mut self, byte: u8) -> Result<(), ResponseWriterError<C::Error>> {
        self.write(hex_char(byte >> 4))?;
        self.write(hex_char(byte & 0xf))
    }

    /// Write an entire buffer as a hex string (two ascii chars / byte).
    pub fn write_hex_buf(&mut self, data: &[u8]) -> Result<(), ResponseWriterError<C::Error>> {
        data.iter().try_for_each(|b| self.write_hex(*b))
    }

    /// Write a number as its big-endian hex string, without leading zeros.
    pub fn write_num(&mut self, n: u32) -> Result<(), ResponseWriterError<C::Error>> {
        if n == 0 {
            return self.write(b'0');
        }
        let mut started = false;
        for shift in (0..8).rev() {
            let nibble = ((n >> (shift * 4)) & 0xf) as u8;
            if nibble != 0 || started {
                started = true;
                self.write(hex_char(nibble))?;
            }
        }
        Ok(())
    }

    /// Write a 32-bit register value as 8 hex chars in target endian order.
    pub fn write_reg32(&mut self, val: u32) -> Result<(), ResponseWriterError<C::Error>> {
        self.write_all(&crate::protocol::hex::encode_reg32(val))
    }
}
