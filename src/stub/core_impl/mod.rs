//! One handler per RSP packet letter.
//!
//! Dispatch is a flat match on the first body byte, with small sub-matches
//! for the `q`/`Q`/`v` families. Handlers send their own complete replies
//! through a per-reply [`ResponseWriter`]; recoverable failures propagate
//! as `InternalError::NonFatalError`, which the session loop turns into an
//! `E<code>` reply.

use crate::common::Signal;
use crate::common::Tid;
use crate::conn::Connection;
use crate::conn::ConnectionExt;
use crate::protocol::ResponseWriter;
use crate::stub::error::InternalError;
use crate::stub::DisconnectReason;
use crate::stub::GdbServer;
use crate::target::TargetControl;

mod base;
mod breakpoints;
mod host_io;
mod monitor_cmd;
mod osdata;
mod query;
mod resume;

/// Common imports used by most handler modules.
mod prelude {
    pub(super) use super::HandlerStatus;
    pub(super) use super::TargetResultExt;
    pub(super) use crate::conn::Connection;
    pub(super) use crate::conn::ConnectionExt;
    pub(super) use crate::protocol::ResponseWriter;
    pub(super) use crate::stub::error::InternalError;
    pub(super) use crate::stub::GdbServer;
    pub(super) use crate::target::TargetControl;
}

pub(crate) enum HandlerStatus {
    Handled,
    Disconnect(DisconnectReason),
}

/// Encapsulates the boilerplate of handling fallible target-fabric
/// accesses: log the failure and convert it into the non-fatal error the
/// session loop answers with `E01`.
pub(crate) trait TargetResultExt<V, C> {
    fn handle_error(self) -> Result<V, InternalError<C>>;
}

impl<V, E: core::fmt::Display, C> TargetResultExt<V, C> for Result<V, E> {
    fn handle_error(self) -> Result<V, InternalError<C>> {
        self.map_err(|e| {
            log::warn!("target access failed: {}", e);
            InternalError::NonFatalError(1)
        })
    }
}

impl GdbServer {
    pub(crate) fn handle_command<T: TargetControl, C: ConnectionExt>(
        &mut self,
        target: &mut T,
        conn: &mut C,
        body: &mut [u8],
    ) -> Result<HandlerStatus, InternalError<C::Error>> {
        let Some(&letter) = body.first() else {
            return self.reply_empty(conn).map(|()| HandlerStatus::Handled);
        };

        match letter {
            // extended remote mode is not supported
            b'!' => self.reply_empty(conn)?,
            // report last signal
            b'?' => self.report_stop(conn, 0, 0, Signal::SIGTRAP)?,
            b'A' => {
                log::warn!("RSP 'A' packet not supported: ignored");
                self.reply_str(conn, "E01")?;
            }
            b'b' | b'B' | b'd' | b'r' => {
                log::warn!(
                    "deprecated RSP '{}' packet: ignored",
                    letter as char
                );
                self.reply_empty(conn)?;
            }
            b'i' | b'I' => {
                log::warn!("RSP cycle stepping not supported: ignored");
                self.reply_empty(conn)?;
            }
            b't' => {
                log::warn!("RSP 't' packet not supported: ignored");
                self.reply_empty(conn)?;
            }
            b'c' => self.cont(target, conn, body)?,
            b'C' => self.cont_with_signal(target, conn, body)?,
            b'D' => {
                // detach: the rules say execution continues, so the client
                // is closed and the embedder reconnects
                self.reply_str(conn, "OK")?;
                return Ok(HandlerStatus::Disconnect(DisconnectReason::Detach));
            }
            b'F' => self.file_io_reply(target, conn, body)?,
            b'g' => self.read_all_regs(target, conn)?,
            b'G' => self.write_all_regs(target, conn, body)?,
            b'H' => self.set_thread(target, conn, body)?,
            b'k' => {
                // kill: bare metal has nothing to kill; detach the client
                // and stop reporting to it
                log::info!("kill request: detaching from client");
                self.running = false;
            }
            b'm' => self.read_mem(target, conn, body)?,
            b'M' => self.write_mem(target, conn, body)?,
            b'p' => self.read_reg(target, conn, body)?,
            b'P' => self.write_reg(target, conn, body)?,
            b'q' => self.query(target, conn, body)?,
            b'Q' => self.set(target, conn, body)?,
            b'R' => {
                // restart: put the program counter back to zero
                if let Err(e) = crate::regs::write_pc(target, 0) {
                    log::warn!("restart failed to write PC: {}", e);
                }
            }
            b's' => self.step_cmd(target, conn, body)?,
            b'S' => {
                // step with signal is not supported; echo the packet back
                log::warn!("RSP step with signal not supported: ignored");
                let mut res = ResponseWriter::new(conn);
                res.write_all(body)?;
                res.flush()?;
            }
            b'T' => {
                // bare metal: every thread is alive
                self.reply_str(conn, "OK")?;
            }
            b'v' => self.v_packet(target, conn, body)?,
            b'X' => self.write_mem_bin(target, conn, body)?,
            b'z' => self.remove_matchpoint(target, conn, body)?,
            b'Z' => self.insert_matchpoint(target, conn, body)?,
            _ => {
                log::warn!(
                    "unknown RSP request {:?}: ignored",
                    String::from_utf8_lossy(body)
                );
                self.reply_empty(conn)?;
            }
        }

        Ok(HandlerStatus::Handled)
    }

    // -------------------------------------------------------------------
    // Reply helpers

    pub(crate) fn reply_empty<C: Connection>(
        &mut self,
        conn: &mut C,
    ) -> Result<(), InternalError<C::Error>> {
        ResponseWriter::new(conn).flush()?;
        Ok(())
    }

    pub(crate) fn reply_str<C: Connection>(
        &mut self,
        conn: &mut C,
        s: &str,
    ) -> Result<(), InternalError<C::Error>> {
        let mut res = ResponseWriter::new(conn);
        res.write_str(s)?;
        res.flush()?;
        Ok(())
    }

    /// Reply `E<code>` to the current request.
    pub(crate) fn reply_error<C: Connection>(
        &mut self,
        conn: &mut C,
        code: u8,
    ) -> Result<(), InternalError<C::Error>> {
        let mut res = ResponseWriter::new(conn);
        res.write(b'E')?;
        res.write_hex(code)?;
        res.flush()?;
        Ok(())
    }

    /// Send a stop reply: `S<hh>` for "all threads", `T<hh>thread:<tid>;`
    /// for a specific thread. Clears the running flag: the core is back in
    /// the debug state as far as the client is concerned.
    pub(crate) fn report_stop<C: Connection>(
        &mut self,
        conn: &mut C,
        stopped_pc: u32,
        tid: Tid,
        cause: Signal,
    ) -> Result<(), InternalError<C::Error>> {
        if self.config.debug.contains(crate::stub::DebugFlags::STOP_RESUME) {
            log::debug!("stopped at PC {stopped_pc:#x} with {cause}");
        }

        let mut res = ResponseWriter::new(conn);
        if tid == 0 {
            res.write(b'S')?;
            res.write_hex(cause.0)?;
        } else {
            res.write(b'T')?;
            res.write_hex(cause.0)?;
            res.write_str("thread:")?;
            res.write_num(tid as u32)?;
            res.write(b';')?;
        }
        res.flush()?;

        self.running = false;
        Ok(())
    }
}
