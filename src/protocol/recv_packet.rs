//! Pulling one RSP frame at a time off the byte transport.

use managed::ManagedSlice;

pub enum RecvPacketError<C> {
    /// The frame outgrew the receive buffer.
    Capacity,
    Connection(C),
}

/// Deposit `byte` at position `len` of the receive buffer. A borrowed
/// buffer is a hard capacity limit; an owned one grows.
fn store<C>(buf: &mut ManagedSlice<'_, u8>, len: usize, byte: u8) -> Result<(), RecvPacketError<C>> {
    match buf {
        ManagedSlice::Borrowed(slice) => match slice.get_mut(len) {
            Some(slot) => *slot = byte,
            None => return Err(RecvPacketError::Capacity),
        },
        ManagedSlice::Owned(vec) => {
            if len < vec.len() {
                vec[len] = byte;
            } else {
                vec.push(byte);
            }
        }
    }
    Ok(())
}

/// Assembles one frame per call by pulling bytes from a blocking source
/// (typically `ConnectionExt::read`).
///
/// A frame is either a full `$<body>#cc` command, or a single
/// ack/nack/break byte; framing errors and checksum validation are the
/// parser's business, not the receiver's.
pub struct RecvPacketBlocking {}

impl RecvPacketBlocking {
    pub fn new() -> Self {
        RecvPacketBlocking {}
    }

    pub fn recv<'b, C>(
        &mut self,
        buf: &'b mut ManagedSlice<'_, u8>,
        mut next_byte: impl FnMut() -> Result<u8, C>,
    ) -> Result<&'b mut [u8], RecvPacketError<C>> {
        let mut len = 0;

        let header = next_byte().map_err(RecvPacketError::Connection)?;
        store(buf, len, header)?;
        len += 1;

        if header == b'$' {
            // consume through the '#' terminator, then two checksum chars.
            // '#' cannot appear un-escaped inside a body, so counting down
            // a trailer once it is seen is sufficient.
            let mut trailer_left = 0;
            loop {
                let byte = next_byte().map_err(RecvPacketError::Connection)?;
                store(buf, len, byte)?;
                len += 1;

                if trailer_left > 0 {
                    trailer_left -= 1;
                    if trailer_left == 0 {
                        break;
                    }
                } else if byte == b'#' {
                    trailer_left = 2;
                }
            }
        }

        log::trace!(
            "<-- {}",
            String::from_utf8_lossy(&buf[..len]).escape_debug()
        );

        Ok(&mut buf[..len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recv_from(input: &[u8], cap: usize) -> Result<Vec<u8>, ()> {
        let mut storage = vec![0u8; cap];
        let mut buf = ManagedSlice::Borrowed(&mut storage[..]);
        let mut iter = input.iter().copied();
        RecvPacketBlocking::new()
            .recv(&mut buf, || iter.next().ok_or(()))
            .map(|frame| frame.to_vec())
            .map_err(|_| ())
    }

    #[test]
    fn whole_packet() {
        assert_eq!(recv_from(b"$?#3f", 64).unwrap(), b"$?#3f");
    }

    #[test]
    fn single_byte_tokens() {
        assert_eq!(recv_from(b"+", 64).unwrap(), b"+");
        assert_eq!(recv_from(&[0x03], 64).unwrap(), &[0x03]);
    }

    #[test]
    fn hash_in_checksum_position_does_not_restart_the_trailer() {
        // a malformed checksum containing '#' must not re-arm the
        // countdown; exactly two trailer bytes are consumed
        assert_eq!(recv_from(b"$a##b", 64).unwrap(), b"$a##b");
    }

    #[test]
    fn oversized_frame_reports_capacity() {
        assert!(recv_from(b"$qSupported#00", 4).is_err());
    }
}
