//! Register, memory, and thread packets.

use super::prelude::*;
use crate::arch;
use crate::protocol::hex::decode_hex;
use crate::protocol::hex::decode_hex_buf;
use crate::protocol::hex::decode_reg32;
use crate::protocol::hex::rsp_unescape;
use crate::protocol::PKT_CAP;
use crate::regs;

impl GdbServer {
    /// `g`: read the whole register file.
    pub(super) fn read_all_regs<T: TargetControl, C: Connection>(
        &mut self,
        target: &mut T,
        conn: &mut C,
    ) -> Result<(), InternalError<C::Error>> {
        let regs = regs::read_all(target).handle_error()?;

        let mut res = ResponseWriter::new(conn);
        for reg in regs {
            res.write_reg32(reg)?;
        }
        res.flush()?;
        Ok(())
    }

    /// `G<hex...>`: write the whole register file.
    pub(super) fn write_all_regs<T: TargetControl, C: Connection>(
        &mut self,
        target: &mut T,
        conn: &mut C,
        body: &[u8],
    ) -> Result<(), InternalError<C::Error>> {
        let data = &body[1..];
        if data.len() < arch::NUM_REGS * 8 {
            log::warn!(
                "'G' packet with {} hex digits, {} expected",
                data.len(),
                arch::NUM_REGS * 8
            );
            return Err(InternalError::NonFatalError(1));
        }

        let mut regs = [0u32; arch::NUM_REGS];
        for (i, reg) in regs.iter_mut().enumerate() {
            *reg = decode_reg32(&data[i * 8..])
                .ok_or(InternalError::NonFatalError(1))?;
        }
        regs::write_all(target, &regs).handle_error()?;

        self.reply_str(conn, "OK")
    }

    /// `p<n>`: read a single register.
    pub(super) fn read_reg<T: TargetControl, C: Connection>(
        &mut self,
        target: &mut T,
        conn: &mut C,
        body: &[u8],
    ) -> Result<(), InternalError<C::Error>> {
        let regnum: usize = decode_hex(&body[1..]).map_err(|_| {
            log::warn!("failed to recognize RSP read register command");
            InternalError::NonFatalError(1)
        })?;

        let value = match regs::read_reg(target, regnum) {
            Some(read) => read.handle_error()?,
            None => {
                log::warn!("attempt to read unknown register {regnum}: ignored");
                return Err(InternalError::NonFatalError(1));
            }
        };

        let mut res = ResponseWriter::new(conn);
        res.write_reg32(value)?;
        res.flush()?;
        Ok(())
    }

    /// `P<n>=<hex>`: write a single register.
    pub(super) fn write_reg<T: TargetControl, C: Connection>(
        &mut self,
        target: &mut T,
        conn: &mut C,
        body: &[u8],
    ) -> Result<(), InternalError<C::Error>> {
        let mut parts = body[1..].splitn(2, |b| *b == b'=');
        let (regnum, value) = (|| {
            let regnum: usize = decode_hex(parts.next()?).ok()?;
            let value = decode_reg32(parts.next()?)?;
            Some((regnum, value))
        })()
        .ok_or_else(|| {
            log::warn!("failed to recognize RSP write register command");
            InternalError::NonFatalError(1)
        })?;

        match regs::write_reg(target, regnum, value) {
            Some(write) => write.handle_error()?,
            None => {
                log::warn!("attempt to write unknown register {regnum}: ignored");
                return Err(InternalError::NonFatalError(1));
            }
        }

        self.reply_str(conn, "OK")
    }

    /// `m<addr>,<len>`: read memory, hex-encoded reply.
    pub(super) fn read_mem<T: TargetControl, C: Connection>(
        &mut self,
        target: &mut T,
        conn: &mut C,
        body: &[u8],
    ) -> Result<(), InternalError<C::Error>> {
        let mut parts = body[1..].splitn(2, |b| *b == b',');
        let (addr, len) = (|| {
            let addr: u32 = decode_hex(parts.next()?).ok()?;
            let len: usize = decode_hex(parts.next()?).ok()?;
            Some((addr, len))
        })()
        .ok_or_else(|| {
            log::warn!("failed to recognize RSP read memory command");
            InternalError::NonFatalError(1)
        })?;

        // two reply chars per byte must fit the packet buffer
        if len * 2 >= PKT_CAP {
            log::warn!("memory read of {len:#x} bytes too large for RSP packet: refused");
            return Err(InternalError::NonFatalError(1));
        }

        if self.config.debug.contains(crate::stub::DebugFlags::TRAN_DETAIL) {
            log::debug!("memory read at {addr:#x} ({len:#x} bytes)");
        }

        let mut buf = vec![0u8; len];
        target.read_burst(addr, &mut buf).handle_error()?;

        let mut res = ResponseWriter::new(conn);
        res.write_hex_buf(&buf)?;
        res.flush()?;
        Ok(())
    }

    /// `M<addr>,<len>:<hex>`: write memory from hex data.
    pub(super) fn write_mem<T: TargetControl, C: Connection>(
        &mut self,
        target: &mut T,
        conn: &mut C,
        body: &mut [u8],
    ) -> Result<(), InternalError<C::Error>> {
        let colon = body.iter().position(|b| *b == b':').ok_or_else(|| {
            log::warn!("failed to recognize RSP write memory command");
            InternalError::NonFatalError(1)
        })?;
        let (header, data) = body.split_at_mut(colon);
        let data = &mut data[1..];

        let mut parts = header[1..].splitn(2, |b| *b == b',');
        let (addr, len) = (|| {
            let addr: u32 = decode_hex(parts.next()?).ok()?;
            let len: usize = decode_hex(parts.next()?).ok()?;
            Some((addr, len))
        })()
        .ok_or_else(|| {
            log::warn!("failed to recognize RSP write memory command");
            InternalError::NonFatalError(1)
        })?;

        if len * 2 != data.len() {
            log::warn!(
                "write of {} digits requested, but {} digits supplied: packet ignored",
                len * 2,
                data.len()
            );
            return Err(InternalError::NonFatalError(1));
        }

        if self.config.debug.contains(crate::stub::DebugFlags::TRAN_DETAIL) {
            log::debug!("memory write at {addr:#x} ({len:#x} bytes)");
        }

        let decoded = decode_hex_buf(data).map_err(|_| InternalError::NonFatalError(1))?;
        target.write_burst(addr, decoded).handle_error()?;

        self.reply_str(conn, "OK")
    }

    /// `X<addr>,<len>:<binary>`: write memory from escaped binary data.
    pub(super) fn write_mem_bin<T: TargetControl, C: Connection>(
        &mut self,
        target: &mut T,
        conn: &mut C,
        body: &mut [u8],
    ) -> Result<(), InternalError<C::Error>> {
        let colon = body.iter().position(|b| *b == b':').ok_or_else(|| {
            log::warn!("failed to recognize RSP write memory (binary) command");
            InternalError::NonFatalError(1)
        })?;
        let (header, data) = body.split_at_mut(colon);
        let data = &mut data[1..];

        let mut parts = header[1..].splitn(2, |b| *b == b',');
        let (addr, mut len) = (|| {
            let addr: u32 = decode_hex(parts.next()?).ok()?;
            let len: usize = decode_hex(parts.next()?).ok()?;
            Some((addr, len))
        })()
        .ok_or_else(|| {
            log::warn!("failed to recognize RSP write memory (binary) command");
            InternalError::NonFatalError(1)
        })?;

        let unescaped = rsp_unescape(data);
        if unescaped != len {
            log::warn!(
                "write of {len} bytes requested, but {unescaped} bytes supplied: \
                 writing the shorter"
            );
            len = len.min(unescaped);
        }

        target.write_burst(addr, &data[..len]).handle_error()?;

        self.reply_str(conn, "OK")
    }

    /// `H<op><tid>`: set the thread for subsequent operations. `c` selects
    /// the thread execution packets steer to, `g` the thread register and
    /// memory packets steer to.
    pub(super) fn set_thread<T: TargetControl, C: Connection>(
        &mut self,
        target: &mut T,
        conn: &mut C,
        body: &[u8],
    ) -> Result<(), InternalError<C::Error>> {
        let (op, tid) = (|| {
            let op = *body.get(1)?;
            let tid: i32 = btoi::btoi(&body[2..]).ok()?;
            Some((op, tid))
        })()
        .ok_or_else(|| {
            log::warn!(
                "failed to recognize RSP set thread command: {:?}",
                String::from_utf8_lossy(body)
            );
            InternalError::NonFatalError(1)
        })?;

        let ok = match op {
            b'c' => {
                if target.set_thread_execute(tid) {
                    self.exec_tid = tid;
                    true
                } else {
                    false
                }
            }
            b'g' => {
                if target.set_thread_general(tid) {
                    self.gen_tid = tid;
                    true
                } else {
                    false
                }
            }
            _ => false,
        };

        if ok {
            self.reply_str(conn, "OK")
        } else {
            log::warn!(
                "failed RSP set thread command: {:?}",
                String::from_utf8_lossy(body)
            );
            Err(InternalError::NonFatalError(1))
        }
    }
}
