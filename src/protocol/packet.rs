use crate::protocol::hex::decode_hex;

/// Packet parse error.
#[derive(Debug)]
pub enum PacketParseError {
    ChecksumMismatched { checksum: u8, calculated: u8 },
    EmptyBuf,
    MissingChecksum,
    MalformedChecksum,
    UnexpectedHeader(u8),
}

/// Top-level GDB packet.
pub enum Packet<'a> {
    Ack,
    Nack,
    Interrupt,
    Command(PacketBuf<'a>),
}

/// A received `$<body>#cc` packet, validated and trimmed down to its body.
///
/// The body is _not_ required to be ASCII: `X` packets carry escaped binary
/// data.
pub struct PacketBuf<'a> {
    buf: &'a mut [u8],
    body_range: core::ops::Range<usize>,
}

impl<'a> PacketBuf<'a> {
    /// Validate the contents of the raw packet buffer, checking for checksum
    /// consistency and structural correctness.
    pub fn new(pkt_buf: &'a mut [u8]) -> Result<PacketBuf<'a>, PacketParseError> {
        if pkt_buf.is_empty() {
            return Err(PacketParseError::EmptyBuf);
        }

        // The '#' terminator cannot appear un-escaped inside the body, so
        // splitting on the last '#' finds the checksum.
        let terminator = pkt_buf
            .iter()
            .rposition(|b| *b == b'#')
            .ok_or(PacketParseError::MissingChecksum)?;

        let checksum = pkt_buf
            .get(terminator + 1..terminator + 3)
            .ok_or(PacketParseError::MalformedChecksum)?;
        let checksum =
            decode_hex::<u8>(checksum).map_err(|_| PacketParseError::MalformedChecksum)?;

        let body = &pkt_buf[1..terminator];
        let calculated = body.iter().fold(0u8, |a, x| a.wrapping_add(*x));
        if calculated != checksum {
            return Err(PacketParseError::ChecksumMismatched {
                checksum,
                calculated,
            });
        }

        Ok(PacketBuf {
            buf: pkt_buf,
            body_range: 1..terminator,
        })
    }

    /// Return a mut reference to the slice of the packet buffer
    /// corresponding to the body.
    pub fn into_body(self) -> &'a mut [u8] {
        &mut self.buf[self.body_range]
    }
}

impl<'a> Packet<'a> {
    pub fn from_buf(buf: &'a mut [u8]) -> Result<Packet<'a>, PacketParseError> {
        match *buf.first().ok_or(PacketParseError::EmptyBuf)? {
            b'$' => Ok(Packet::Command(PacketBuf::new(buf)?)),
            b'+' => Ok(Packet::Ack),
            b'-' => Ok(Packet::Nack),
            0x03 => Ok(Packet::Interrupt),
            header => Err(PacketParseError::UnexpectedHeader(header)),
        }
    }
}
