//! `z`/`Z`: matchpoint insertion and removal.
//!
//! Only memory breakpoints are implemented, by substituting a BKPT
//! instruction at the given address. The handlers must cope with duplicate
//! packets: re-inserting an existing breakpoint must not capture the BKPT
//! word as the "saved" instruction.

use super::prelude::*;
use crate::arch;
use crate::breakpoints::BreakpointKind;
use crate::control;
use crate::protocol::hex::decode_hex;

fn parse_matchpoint(body: &[u8]) -> Option<(BreakpointKind, u32, u32)> {
    // <kind>,<addr>,<len>
    let mut parts = body[1..].splitn(3, |b| *b == b',');
    let kind_digits = parts.next()?;
    let kind = match kind_digits {
        [digit] => BreakpointKind::from_digit(*digit)?,
        _ => return None,
    };
    let addr: u32 = decode_hex(parts.next()?).ok()?;
    let len: u32 = decode_hex(parts.next()?).ok()?;
    Some((kind, addr, len))
}

impl GdbServer {
    /// `Z<kind>,<addr>,<len>`: insert a matchpoint.
    pub(super) fn insert_matchpoint<T: TargetControl, C: Connection>(
        &mut self,
        target: &mut T,
        conn: &mut C,
        body: &[u8],
    ) -> Result<(), InternalError<C::Error>> {
        let (kind, addr, len) = parse_matchpoint(body).ok_or_else(|| {
            log::warn!("RSP matchpoint insertion request not recognized: ignored");
            InternalError::NonFatalError(1)
        })?;

        if len != arch::BKPT_INSTLEN {
            log::warn!(
                "RSP matchpoint insertion length {len} not valid: {} assumed",
                arch::BKPT_INSTLEN
            );
        }

        match kind {
            BreakpointKind::Memory => {
                // save the original instruction, unless this is a duplicate
                // insert and the table already holds it
                if self.bkpts.lookup(kind, addr).is_none() {
                    let saved = target.read_mem16(addr).handle_error()?;
                    self.bkpts.add(kind, addr, saved);
                }
                control::plant_bkpt(target, addr).handle_error()?;
                self.reply_str(conn, "OK")
            }
            _ => self.reply_empty(conn), // not supported
        }
    }

    /// `z<kind>,<addr>,<len>`: remove a matchpoint, restoring the original
    /// instruction.
    pub(super) fn remove_matchpoint<T: TargetControl, C: Connection>(
        &mut self,
        target: &mut T,
        conn: &mut C,
        body: &[u8],
    ) -> Result<(), InternalError<C::Error>> {
        let (kind, addr, len) = parse_matchpoint(body).ok_or_else(|| {
            log::warn!("RSP matchpoint deletion request not recognized: ignored");
            InternalError::NonFatalError(1)
        })?;

        if len != arch::BKPT_INSTLEN {
            log::warn!(
                "RSP matchpoint deletion length {len} not valid: {} assumed",
                arch::BKPT_INSTLEN
            );
        }

        match kind {
            BreakpointKind::Memory => {
                if let Some(saved) = self.bkpts.remove(kind, addr) {
                    target.write_mem16(addr, saved).handle_error()?;
                }
                self.reply_str(conn, "OK")
            }
            _ => self.reply_empty(conn), // not supported
        }
    }
}
