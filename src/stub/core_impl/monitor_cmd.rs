//! `qRcmd`: monitor commands, hex-ASCII in and hex-ASCII out.

use super::prelude::*;
use crate::arch;
use crate::common::Signal;
use crate::control;
use crate::protocol::hex::ascii_to_hex;
use crate::protocol::hex::hex_to_ascii;
use crate::regs;

impl GdbServer {
    /// `qRcmd,<hex>`: the payload is a command typed at GDB's `monitor`
    /// prompt. Replies are `OK`, or a hex-ASCII payload shown to the user.
    pub(super) fn monitor_cmd<T: TargetControl, C: Connection>(
        &mut self,
        target: &mut T,
        conn: &mut C,
        hex_cmd: &[u8],
    ) -> Result<(), InternalError<C::Error>> {
        let cmd = hex_to_ascii(hex_cmd).ok_or_else(|| {
            log::warn!("malformed qRcmd payload");
            InternalError::NonFatalError(1)
        })?;

        match cmd.as_slice() {
            b"swreset" => {
                log::info!("monitor: software reset request");
                control::sw_reset(target).handle_error()?;
                self.reply_str(conn, "OK")
            }
            b"hwreset" => {
                let message = "The debugger sent a platform reset request, \
                               please restart other debug clients.\n";
                log::info!("monitor: platform reset request");
                control::hw_reset(target);
                self.reply_hex_ascii(conn, message)
            }
            b"halt" => {
                log::info!("monitor: halt request");
                let halted = control::halt(target).handle_error()?;
                if !halted {
                    self.report_stop(conn, 0, 0, Signal::SIGHUP)?;
                }
                self.reply_str(conn, "OK")
            }
            b"run" => {
                log::info!("monitor: start request");
                // kick the core by latching the reset interrupt
                regs::write_scr(target, arch::SCR_ILAT, arch::ILAT_RESET).handle_error()?;
                self.reply_str(conn, "OK")
            }
            b"coreid" => {
                let coreid = regs::read_coreid(target).handle_error()?;
                self.reply_hex_ascii(conn, &format!("{coreid:#x}\n"))
            }
            b"help" => self.reply_hex_ascii(
                conn,
                "monitor commands: hwreset, coreid, swreset, halt, run, help\n",
            ),
            b"help-hidden" => self.reply_hex_ascii(conn, "link,spi\n"),
            // accepted, nothing to configure on this platform
            b"link" | b"spi" => {
                log::debug!(
                    "monitor: {} request acknowledged",
                    String::from_utf8_lossy(&cmd)
                );
                self.reply_str(conn, "OK")
            }
            _ => {
                log::warn!(
                    "received remote command {:?}: ignored",
                    String::from_utf8_lossy(&cmd)
                );
                self.reply_str(conn, "OK")
            }
        }
    }

    fn reply_hex_ascii<C: Connection>(
        &mut self,
        conn: &mut C,
        text: &str,
    ) -> Result<(), InternalError<C::Error>> {
        let mut res = ResponseWriter::new(conn);
        res.write_all(&ascii_to_hex(text.as_bytes()))?;
        res.flush()?;
        Ok(())
    }
}
