//! An implementation of the server side of the
//! [GDB Remote Serial Protocol](https://sourceware.org/gdb/onlinedocs/gdb/Remote-Protocol.html)
//! for memory-mapped many-core mesh targets.
//!
//! The targets this crate speaks to are meshes of small RISC cores without
//! any hardware single-step support: every debug action - halting, reading
//! registers, planting breakpoints, even stepping one instruction - is a
//! sequence of word-granular reads/writes against the core's memory-mapped
//! register file and debug unit.
//!
//! `meshstub` owns the protocol engine and the debug-control state machine:
//!
//! - RSP packet framing, checksumming, and the binary escape
//! - a dispatcher for every supported packet letter, including the
//!   `qSupported`/`qXfer`/`qRcmd` subsystems
//! - software breakpoints, and single-step synthesized by predicting the
//!   successor PC(s), planting temporary breakpoints, and unwinding
//! - semi-hosted system calls redirected through GDB's File-I/O extension
//!
//! Two collaborators are supplied by the embedding program:
//!
//! - [`conn::Connection`]: in-order byte I/O to the GDB client (implemented
//!   out-of-the-box for [`TcpStream`](std::net::TcpStream))
//! - [`target::TargetControl`]: word-granular memory access to the silicon
//!
//! A debugging session is a single call to [`stub::GdbServer::run`] per
//! accepted connection. The embedder owns the listen/accept/reconnect loop.

pub mod arch;
pub mod breakpoints;
pub mod common;
pub mod conn;
pub mod control;
pub mod protocol;
pub mod regs;
pub mod stub;
pub mod target;

pub use stub::DisconnectReason;
pub use stub::GdbServer;
pub use stub::GdbServerError;
pub use stub::ServerConfig;
