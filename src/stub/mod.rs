//! The RSP server proper: session state, the packet pump, and the
//! run-state polling loop.

mod core_impl;
mod error;

pub use error::ConnectionErrorKind;
pub use error::GdbServerError;

use crate::arch;
use crate::breakpoints::BreakpointTable;
use crate::common::Tid;
use crate::conn::ConnectionExt;
use crate::protocol::Packet;
use crate::protocol::RecvPacketBlocking;
use crate::protocol::RecvPacketError;
use crate::protocol::PKT_CAP;
use crate::stub::error::InternalError;
use crate::target::TargetControl;
use managed::ManagedSlice;

use bitflags::bitflags;

bitflags! {
    /// Per-category verbosity switches, mirroring the server's CLI debug
    /// flags. Each category gates the noisier `debug!`-level logging of one
    /// subsystem.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DebugFlags: u8 {
        /// Halting, resuming, and stop reporting.
        const STOP_RESUME = 1 << 0;
        /// Instruction-level detail of the step engine.
        const STOP_RESUME_DETAIL = 1 << 1;
        /// Trap decoding and RSP connection chatter.
        const TRAP_AND_RSP_CON = 1 << 2;
        /// The Ctrl-C polling loop.
        const CTRL_C_WAIT = 1 << 3;
        /// Individual target-fabric transactions.
        const TRAN_DETAIL = 1 << 4;
    }
}

/// Server configuration, owned by the [`GdbServer`] context.
pub struct ServerConfig {
    /// The TCP port the embedder listens on. Only used for logging; the
    /// listener itself is the embedder's.
    pub port: u16,
    /// Halt the target when a client connects.
    pub halt_on_attach: bool,
    /// Sink for semihosted `printf` output (trap 7). When absent, trap 7
    /// is redirected to the client as a File-I/O request instead.
    pub tty_out: Option<Box<dyn std::io::Write + Send>>,
    /// Per-category verbosity.
    pub debug: DebugFlags,
}

impl Default for ServerConfig {
    fn default() -> ServerConfig {
        ServerConfig {
            port: 51000,
            halt_on_attach: true,
            tty_out: None,
            debug: DebugFlags::empty(),
        }
    }
}

/// Describes why a session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisconnectReason {
    /// GDB issued a detach (`D`) command.
    Detach,
}

/// A GDB RSP server session context.
///
/// One instance serves one client at a time; state that must survive a
/// reconnect (the breakpoint table in particular) lives here, so the
/// embedder is expected to reuse the instance across sessions.
pub struct GdbServer {
    pub(crate) config: ServerConfig,
    pub(crate) bkpts: BreakpointTable,
    pub(crate) ivt_shadow: [u8; arch::IVT_BYTES],
    pub(crate) running: bool,
    pub(crate) gen_tid: Tid,
    pub(crate) exec_tid: Tid,
    pub(crate) os_process: String,
    pub(crate) os_load: String,
    pub(crate) os_traffic: String,
}

impl GdbServer {
    pub fn new(config: ServerConfig) -> GdbServer {
        GdbServer {
            config,
            bkpts: BreakpointTable::new(),
            ivt_shadow: [0; arch::IVT_BYTES],
            running: false,
            gen_tid: 0,
            exec_tid: 0,
            os_process: String::new(),
            os_load: String::new(),
            os_traffic: String::new(),
        }
    }

    /// The thread selections last set by the client's `H` packets, as
    /// `(execution, general)`. `0` means "any", `-1` "all".
    pub fn thread_selection(&self) -> (Tid, Tid) {
        (self.exec_tid, self.gen_tid)
    }

    /// Serve one debugging session over `conn`, translating RSP requests
    /// into debug-unit accesses through `target`.
    ///
    /// Returns when the client detaches or the transport fails; in either
    /// case the embedder goes back to its accept loop.
    pub fn run<T: TargetControl, C: ConnectionExt>(
        &mut self,
        target: &mut T,
        conn: &mut C,
    ) -> Result<DisconnectReason, GdbServerError<C::Error>> {
        self.session(target, conn).map_err(Into::into)
    }

    fn session<T: TargetControl, C: ConnectionExt>(
        &mut self,
        target: &mut T,
        conn: &mut C,
    ) -> Result<DisconnectReason, InternalError<C::Error>> {
        conn.on_session_start().map_err(InternalError::conn_init)?;
        log::info!("client connected on port {}", self.config.port);

        self.running = false;
        if self.config.halt_on_attach {
            self.attach(target, conn)?;
        }

        let mut storage = vec![0u8; PKT_CAP];
        let mut buf = ManagedSlice::Borrowed(&mut storage[..]);
        let mut recv = RecvPacketBlocking::new();

        loop {
            let raw = match recv.recv(&mut buf, || conn.read()) {
                Ok(raw) => raw,
                Err(RecvPacketError::Capacity) => return Err(InternalError::PacketBufferOverflow),
                Err(RecvPacketError::Connection(e)) => return Err(InternalError::conn_read(e)),
            };

            match Packet::from_buf(raw) {
                Ok(Packet::Ack) => {}
                Ok(Packet::Nack) => return Err(InternalError::ClientSentNack),
                Ok(Packet::Interrupt) => {
                    log::debug!("<-- interrupt packet");
                    let result = self.suspend(target, conn);
                    self.handle_poll_result(conn, result)?;
                }
                Ok(Packet::Command(pkt)) => {
                    // acknowledge the packet
                    conn.write(b'+').map_err(InternalError::conn_write)?;

                    let body = pkt.into_body();
                    match self.handle_command(target, conn, body) {
                        Ok(core_impl::HandlerStatus::Handled) => {}
                        Ok(core_impl::HandlerStatus::Disconnect(reason)) => return Ok(reason),
                        Err(InternalError::NonFatalError(code)) => {
                            self.reply_error(conn, code)?;
                        }
                        Err(e) => return Err(e),
                    }
                }
                Err(e) => {
                    // bad framing or checksum: ask for a re-transmission
                    error::log_packet_error(e);
                    conn.write(b'-').map_err(InternalError::conn_write)?;
                }
            }

            // While the target runs free, alternate between watching for an
            // out-of-band break from the client and polling the debug
            // state. A stop report from either path clears the flag.
            while self.running {
                if self.config.debug.contains(DebugFlags::CTRL_C_WAIT) {
                    log::debug!("checking for Ctrl-C");
                }
                let poll = if self.poll_break(conn)? {
                    log::info!("break request from client");
                    self.suspend(target, conn)
                } else {
                    self.continue_poll(target, conn)
                };
                self.handle_poll_result(conn, poll)?;
            }
        }
    }

    /// Recoverable errors in the polling paths have no request to attach an
    /// `E01` to; report HUP and stop polling instead.
    fn handle_poll_result<C: ConnectionExt>(
        &mut self,
        conn: &mut C,
        result: Result<(), InternalError<C::Error>>,
    ) -> Result<(), InternalError<C::Error>> {
        match result {
            Ok(()) => Ok(()),
            Err(InternalError::NonFatalError(_)) => {
                log::warn!("target unreachable while polling; reporting HUP");
                self.report_stop(conn, 0, 0, crate::common::Signal::SIGHUP)
            }
            Err(e) => Err(e),
        }
    }

    /// Halt-on-attach: stall the core on a fresh connection, reporting HUP
    /// when the halt fails. The target is *not* reset when attaching.
    fn attach<T: TargetControl, C: ConnectionExt>(
        &mut self,
        target: &mut T,
        conn: &mut C,
    ) -> Result<(), InternalError<C::Error>> {
        let halted = crate::control::halt(target).unwrap_or(false);
        if !halted {
            self.report_stop(conn, 0, 0, crate::common::Signal::SIGHUP)?;
        }
        Ok(())
    }

    /// Consume a pending break byte (Ctrl-C), if one has arrived.
    fn poll_break<C: ConnectionExt>(
        &mut self,
        conn: &mut C,
    ) -> Result<bool, InternalError<C::Error>> {
        match conn.peek().map_err(InternalError::conn_read)? {
            Some(0x03) => {
                conn.read().map_err(InternalError::conn_read)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
