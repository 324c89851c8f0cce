//! The semihosting trap bridge: TRAP instructions redirected to the GDB
//! client as File-I/O requests, and the `F` replies that come back.
//!
//! The register convention is `R0..R2` = arguments and `R3` = sub-function
//! for trap 7. A trap leaves the core halted; the server sends the
//! matching `F` request and waits. The client's `F` reply lands the return
//! value in `R0` (and `errno` in `R3`), after which the core resumes.

use super::prelude::*;
use crate::common::Signal;
use crate::control;
use crate::protocol::hex::decode_hex_signed;
use crate::regs;
use crate::stub::DebugFlags;

// Trap numbers, matching the instruction-set dispatch codes.
const TRAP_WRITE: u8 = 0;
const TRAP_READ: u8 = 1;
const TRAP_OPEN: u8 = 2;
const TRAP_EXIT: u8 = 3;
const TRAP_PASS: u8 = 4;
const TRAP_FAIL: u8 = 5;
const TRAP_CLOSE: u8 = 6;
const TRAP_OTHER: u8 = 7;

// Sub-function numbers of trap 7, from the C library's syscall table.
const SYS_OPEN: u32 = 2;
const SYS_CLOSE: u32 = 3;
const SYS_READ: u32 = 4;
const SYS_WRITE: u32 = 5;
const SYS_LSEEK: u32 = 6;
const SYS_UNLINK: u32 = 7;
const SYS_FSTAT: u32 = 10;
const SYS_STAT: u32 = 15;

/// Longest pathname fetched from target memory for open/stat/unlink.
const MAX_FILE_NAME_LENGTH: u32 = 256 * 4;

/// `S_IRUSR | S_IWUSR`: the mode passed along with `Fopen`.
const OPEN_MODE: u32 = 0o600;

impl GdbServer {
    /// Redirect a decoded trap to the client (or the configured tty).
    pub(super) fn redirect_trap<T: TargetControl, C: Connection>(
        &mut self,
        target: &mut T,
        conn: &mut C,
        trap: u8,
    ) -> Result<(), InternalError<C::Error>> {
        if self.config.debug.contains(DebugFlags::TRAP_AND_RSP_CON) {
            log::debug!("redirecting trap {trap}");
        }

        match trap {
            TRAP_WRITE => {
                let (chan, addr, len) = self.trap_args3(target)?;
                self.send_fio_request(conn, &format!("Fwrite,{chan:x},{addr:x},{len:x}"))
            }
            TRAP_READ => {
                let (chan, addr, len) = self.trap_args3(target)?;
                self.send_fio_request(conn, &format!("Fread,{chan:x},{addr:x},{len:x}"))
            }
            TRAP_OPEN => {
                let path = regs::read_gpr(target, 0).handle_error()?;
                let flags = regs::read_gpr(target, 1).handle_error()?;
                let len = self.pathname_len(target, path)?;
                self.send_fio_request(
                    conn,
                    &format!("Fopen,{path:x}/{len:x},{flags:x},{OPEN_MODE:x}"),
                )
            }
            TRAP_EXIT => {
                log::info!("target exit() trap");
                let pc = regs::read_pc(target).handle_error()?;
                self.report_stop(conn, pc, 0, Signal::SIGQUIT)
            }
            TRAP_PASS => {
                log::info!("target PASS trap");
                let pc = regs::read_pc(target).handle_error()?;
                self.report_stop(conn, pc, 0, Signal::SIGTRAP)
            }
            TRAP_FAIL => {
                log::info!("target FAIL trap");
                let pc = regs::read_pc(target).handle_error()?;
                self.report_stop(conn, pc, 0, Signal::SIGQUIT)
            }
            TRAP_CLOSE => {
                let chan = regs::read_gpr(target, 0).handle_error()?;
                self.send_fio_request(conn, &format!("Fclose,{chan:x}"))
            }
            TRAP_OTHER => {
                if self.config.tty_out.is_some() {
                    self.trap_printf_to_tty::<T, C>(target)
                } else {
                    self.trap_syscall(target, conn)
                }
            }
            _ => Ok(()),
        }
    }

    /// `F<ret>[,<errno>[,C]]`: the client answered a File-I/O request.
    /// Land the results in the register convention and resume - unless the
    /// syscall was interrupted, in which case report the stop instead.
    pub(super) fn file_io_reply<T: TargetControl, C: Connection>(
        &mut self,
        target: &mut T,
        conn: &mut C,
        body: &[u8],
    ) -> Result<(), InternalError<C::Error>> {
        let mut fields = body[1..].split(|b| *b == b',');

        let mut interrupted = false;
        match fields.next().and_then(decode_hex_signed) {
            Some(ret) => {
                regs::write_gpr(target, 0, ret as u32).handle_error()?;

                if let Some(field) = fields.next() {
                    if let Some(errno) = decode_hex_signed(field) {
                        regs::write_gpr(target, 3, errno as u32).handle_error()?;
                    }
                }
                interrupted = matches!(fields.next(), Some(f) if f == b"C".as_slice());

                if self.config.debug.contains(DebugFlags::STOP_RESUME_DETAIL) {
                    log::debug!("remote io done, ret {ret}");
                }
            }
            None => log::warn!("remote IO reply not recognized: resuming anyway"),
        }

        if interrupted {
            let pc = regs::read_pc(target).handle_error()?;
            return self.report_stop(conn, pc, 0, Signal::SIGTRAP);
        }

        control::resume(target).handle_error()?;
        self.running = true;
        Ok(())
    }

    /// Trap 7 without a tty: the sub-function in R3 picks the syscall.
    fn trap_syscall<T: TargetControl, C: Connection>(
        &mut self,
        target: &mut T,
        conn: &mut C,
    ) -> Result<(), InternalError<C::Error>> {
        let r0 = regs::read_gpr(target, 0).handle_error()?;
        let r1 = regs::read_gpr(target, 1).handle_error()?;
        let r2 = regs::read_gpr(target, 2).handle_error()?;
        let r3 = regs::read_gpr(target, 3).handle_error()?;

        let request = match r3 {
            SYS_CLOSE => format!("Fclose,{r0:x}"),
            SYS_OPEN => {
                let len = self.pathname_len(target, r0)?;
                format!("Fopen,{r0:x}/{len:x},{r1:x},{r2:x}")
            }
            SYS_READ => format!("Fread,{r0:x},{r1:x},{r2:x}"),
            SYS_WRITE => format!("Fwrite,{r0:x},{r1:x},{r2:x}"),
            SYS_LSEEK => format!("Flseek,{r0:x},{r1:x},{r2:x}"),
            SYS_UNLINK => {
                let len = self.pathname_len(target, r0)?;
                format!("Funlink,{r0:x}/{len:x}")
            }
            SYS_STAT => {
                let len = self.pathname_len(target, r0)?;
                format!("Fstat,{r0:x}/{len:x},{r1:x}")
            }
            SYS_FSTAT => format!("Ffstat,{r0:x},{r1:x}"),
            _ => {
                log::error!("trap 7 with unknown sub-function {r3}: reporting stop");
                let pc = regs::read_pc(target).handle_error()?;
                return self.report_stop(conn, pc, 0, Signal::SIGTRAP);
            }
        };

        if self.config.debug.contains(DebugFlags::TRAP_AND_RSP_CON) {
            log::debug!("trap 7: {request}");
        }
        self.send_fio_request(conn, &request)
    }

    /// Trap 7 with a tty configured: interpret the arguments as a packed
    /// printf call, render it host-side, and resume without involving the
    /// client.
    fn trap_printf_to_tty<T: TargetControl, C: Connection>(
        &mut self,
        target: &mut T,
    ) -> Result<(), InternalError<C::Error>> {
        let buf_addr = regs::read_gpr(target, 0).handle_error()?;
        let fmt_len = regs::read_gpr(target, 1).handle_error()? as usize;
        let total_len = regs::read_gpr(target, 2).handle_error()? as usize;

        let mut buf = vec![0u8; total_len];
        target.read_burst(buf_addr, &mut buf).handle_error()?;

        let fmt_end = fmt_len.min(buf.len());
        // the format string may be NUL-terminated short of its declared
        // length
        let fmt: Vec<u8> = buf[..fmt_end]
            .iter()
            .copied()
            .take_while(|b| *b != 0)
            .collect();
        let args = buf.get(fmt_len + 1..).unwrap_or(&[]);

        let rendered = format_printf(&fmt, args);
        if let Some(tty) = self.config.tty_out.as_mut() {
            if let Err(e) = tty.write_all(&rendered).and_then(|()| tty.flush()) {
                log::warn!("tty write failed: {e}");
            }
        }

        control::resume(target).handle_error()?;
        self.running = true;
        Ok(())
    }

    /// R0, R1, R2 of the steered core.
    fn trap_args3<T: TargetControl, C>(
        &mut self,
        target: &mut T,
    ) -> Result<(u32, u32, u32), InternalError<C>> {
        Ok((
            regs::read_gpr(target, 0).handle_error()?,
            regs::read_gpr(target, 1).handle_error()?,
            regs::read_gpr(target, 2).handle_error()?,
        ))
    }

    /// The length of the NUL-terminated pathname at `addr`, capped.
    fn pathname_len<T: TargetControl, C>(
        &mut self,
        target: &mut T,
        addr: u32,
    ) -> Result<u32, InternalError<C>> {
        for k in 0..MAX_FILE_NAME_LENGTH - 1 {
            if target.read_mem8(addr + k).handle_error()? == 0 {
                return Ok(k);
            }
        }
        Ok(MAX_FILE_NAME_LENGTH - 1)
    }

    /// Send a `F...` File-I/O request packet to the client. The reply
    /// arrives later as an `F` packet from the client's side.
    fn send_fio_request<C: Connection>(
        &mut self,
        conn: &mut C,
        request: &str,
    ) -> Result<(), InternalError<C::Error>> {
        let mut res = ResponseWriter::new(conn);
        res.write_str(request)?;
        res.flush()?;
        Ok(())
    }
}

/// Render a printf call whose arguments arrive as a packed blob: `%s`
/// consumes a NUL-terminated string, the numeric conversions each consume
/// four big-endian bytes.
///
/// Flags and field widths between `%` and the conversion character are
/// accepted but ignored.
pub(super) fn format_printf(fmt: &[u8], args: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(fmt.len());
    let mut args = args;

    let mut take_word = |args: &mut &[u8]| -> u32 {
        let (word, rest) = args.split_at(args.len().min(4));
        let mut val = 0u32;
        for b in word {
            val = val << 8 | *b as u32;
        }
        *args = rest;
        val
    };

    let mut iter = fmt.iter().copied().peekable();
    while let Some(b) = iter.next() {
        if b != b'%' {
            out.push(b);
            continue;
        }

        // scan past flags/width to the conversion character
        let mut conv = None;
        for c in iter.by_ref() {
            if matches!(c, b's' | b'd' | b'i' | b'u' | b'x' | b'X' | b'p' | b'f' | b'%') {
                conv = Some(c);
                break;
            }
        }

        match conv {
            Some(b'%') => out.push(b'%'),
            Some(b's') => {
                let end = args.iter().position(|b| *b == 0).unwrap_or(args.len());
                out.extend_from_slice(&args[..end]);
                args = args.get(end + 1..).unwrap_or(&[]);
            }
            Some(b'd') | Some(b'i') => {
                out.extend_from_slice(format!("{}", take_word(&mut args) as i32).as_bytes())
            }
            Some(b'u') => out.extend_from_slice(format!("{}", take_word(&mut args)).as_bytes()),
            Some(b'x') => out.extend_from_slice(format!("{:x}", take_word(&mut args)).as_bytes()),
            Some(b'X') => out.extend_from_slice(format!("{:X}", take_word(&mut args)).as_bytes()),
            Some(b'p') => out.extend_from_slice(format!("{:#x}", take_word(&mut args)).as_bytes()),
            Some(b'f') => out.extend_from_slice(
                format!("{}", f32::from_bits(take_word(&mut args))).as_bytes(),
            ),
            _ => break,
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::format_printf;

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(format_printf(b"hello core\n", &[]), b"hello core\n");
    }

    #[test]
    fn numeric_conversions_consume_big_endian_words() {
        assert_eq!(
            format_printf(b"n=%d x=%x", &[0, 0, 0, 42, 0, 0, 0xab, 0xcd]),
            b"n=42 x=abcd"
        );
    }

    #[test]
    fn negative_decimal() {
        assert_eq!(
            format_printf(b"%i", &[0xff, 0xff, 0xff, 0xfe]),
            b"-2"
        );
    }

    #[test]
    fn string_conversion_consumes_nul_terminated() {
        assert_eq!(
            format_printf(b"[%s][%s]", b"one\0two\0"),
            b"[one][two]"
        );
    }

    #[test]
    fn percent_escape() {
        assert_eq!(format_printf(b"100%%", &[]), b"100%");
    }

    #[test]
    fn mixed_string_and_word() {
        assert_eq!(
            format_printf(b"%s=%u\n", &[b'x', 0, 0, 0, 0, 7]),
            b"x=7\n"
        );
    }
}
