//! Hex and binary-escape helpers used throughout the protocol layer.

use btoi::btou_radix;
use btoi::ParseIntegerError;
use num_traits::CheckedAdd;
use num_traits::CheckedMul;
use num_traits::FromPrimitive;
use num_traits::Zero;

/// Decode a big-endian hex string into an integer.
#[inline]
pub fn decode_hex<I>(buf: &[u8]) -> Result<I, ParseIntegerError>
where
    I: FromPrimitive + Zero + CheckedAdd + CheckedMul,
{
    btou_radix(buf, 16)
}

/// Decode a possibly-negative hex string into an integer, as sent in GDB
/// File-I/O replies (e.g. `F-1,16`).
pub fn decode_hex_signed(buf: &[u8]) -> Option<i64> {
    match buf.split_first() {
        Some((b'-', rest)) => Some(-(decode_hex::<i64>(rest).ok()?)),
        _ => decode_hex::<i64>(buf).ok(),
    }
}

/// The ASCII hex digit for a nibble.
#[inline]
pub fn hex_char(nibble: u8) -> u8 {
    b"0123456789abcdef"[(nibble & 0xf) as usize]
}

/// The nibble value of an ASCII hex digit.
pub fn ascii2byte(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum DecodeHexBufError {
    NotAscii,
    NotEvenLen,
}

/// Decode a GDB hex string into a byte slice _in place_.
pub fn decode_hex_buf(buf: &mut [u8]) -> Result<&mut [u8], DecodeHexBufError> {
    use DecodeHexBufError::*;

    if buf.len() % 2 != 0 {
        return Err(NotEvenLen);
    }

    let decoded_len = buf.len() / 2;
    for i in 0..decoded_len {
        let b = ascii2byte(buf[i * 2]).ok_or(NotAscii)? << 4
            | ascii2byte(buf[i * 2 + 1]).ok_or(NotAscii)?;
        buf[i] = b;
    }

    Ok(&mut buf[..decoded_len])
}

/// Encode a 32-bit register value as 8 hex chars in target (little) endian
/// byte order.
pub fn encode_reg32(val: u32) -> [u8; 8] {
    let mut out = [0u8; 8];
    for (i, b) in val.to_le_bytes().iter().enumerate() {
        out[i * 2] = hex_char(b >> 4);
        out[i * 2 + 1] = hex_char(b & 0xf);
    }
    out
}

/// Decode 8 hex chars in target (little) endian byte order into a 32-bit
/// register value.
pub fn decode_reg32(buf: &[u8]) -> Option<u32> {
    if buf.len() < 8 {
        return None;
    }
    let mut bytes = [0u8; 4];
    for (i, b) in bytes.iter_mut().enumerate() {
        *b = ascii2byte(buf[i * 2])? << 4 | ascii2byte(buf[i * 2 + 1])?;
    }
    Some(u32::from_le_bytes(bytes))
}

/// Decode the hex-ASCII payload of a `qRcmd` packet into the original text.
pub fn hex_to_ascii(buf: &[u8]) -> Option<Vec<u8>> {
    if buf.len() % 2 != 0 {
        return None;
    }
    buf.chunks_exact(2)
        .map(|pair| Some(ascii2byte(pair[0])? << 4 | ascii2byte(pair[1])?))
        .collect()
}

/// Encode text as the hex-ASCII payload of a `qRcmd` reply.
pub fn ascii_to_hex(text: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2);
    for b in text {
        out.push(hex_char(b >> 4));
        out.push(hex_char(b & 0xf));
    }
    out
}

/// Collapse the RSP binary escape (`0x7d` followed by the byte XOR `0x20`)
/// _in place_, returning the unescaped length.
///
/// Idempotent on input containing no `0x7d` bytes, and never grows the
/// buffer.
pub fn rsp_unescape(buf: &mut [u8]) -> usize {
    let mut out = 0;
    let mut i = 0;
    while i < buf.len() {
        if buf[i] == 0x7d && i + 1 < buf.len() {
            buf[out] = buf[i + 1] ^ 0x20;
            i += 2;
        } else {
            buf[out] = buf[i];
            i += 1;
        }
        out += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rsp_escape(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        for &b in data {
            if matches!(b, 0x23 | 0x24 | 0x2a | 0x7d) {
                out.push(0x7d);
                out.push(b ^ 0x20);
            } else {
                out.push(b);
            }
        }
        out
    }

    #[test]
    fn decode_hex_basic() {
        assert_eq!(decode_hex::<u32>(b"f0400"), Ok(0xf0400));
        assert!(decode_hex::<u32>(b"xyz").is_err());
        assert_eq!(decode_hex_signed(b"-1"), Some(-1));
        assert_eq!(decode_hex_signed(b"5"), Some(5));
    }

    #[test]
    fn reg32_round_trip_is_little_endian() {
        // value 0x00000100 must read "00010000" on the wire
        assert_eq!(&encode_reg32(0x0000_0100), b"00010000");
        for v in [0u32, 1, 0xdead_beef, u32::MAX] {
            assert_eq!(decode_reg32(&encode_reg32(v)), Some(v));
        }
    }

    #[test]
    fn decode_hex_buf_in_place() {
        let mut buf = *b"0402";
        assert_eq!(*decode_hex_buf(&mut buf).unwrap(), [0x04, 0x02]);

        let mut odd = *b"040";
        assert_eq!(
            decode_hex_buf(&mut odd).unwrap_err(),
            DecodeHexBufError::NotEvenLen
        );
    }

    #[test]
    fn ascii_hex_round_trip() {
        let cmd = b"swreset";
        assert_eq!(hex_to_ascii(&ascii_to_hex(cmd)).unwrap(), cmd);
        assert_eq!(ascii_to_hex(b"\x01"), b"01");
    }

    #[test]
    fn unescape_inverts_escape() {
        let cases: &[&[u8]] = &[
            b"",
            b"plain data",
            &[0x7d, 0x23, 0x24, 0x2a],
            &[0x7d, 0x7d, 0x00, 0xff],
        ];
        for &data in cases {
            let mut escaped = rsp_escape(data);
            let len = rsp_unescape(&mut escaped);
            assert_eq!(&escaped[..len], data);
        }
    }

    #[test]
    fn unescape_idempotent_on_plain_input() {
        let mut buf = *b"no escapes here";
        let len = rsp_unescape(&mut buf);
        assert_eq!(&buf[..len], b"no escapes here");
    }
}
