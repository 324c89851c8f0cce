use crate::protocol::PacketParseError;
use crate::protocol::ResponseWriterError;
use core::fmt;
use core::fmt::Display;

/// An error that may occur while interacting with a
/// [`Connection`](crate::conn::Connection).
#[derive(Debug)]
pub enum ConnectionErrorKind {
    /// Error initializing the session.
    Init,
    /// Error reading data.
    Read,
    /// Error writing data.
    Write,
}

#[derive(Debug)]
pub(crate) enum InternalError<C> {
    /// Connection error.
    Connection(C, ConnectionErrorKind),
    /// The incoming packet did not fit in the packet buffer.
    PacketBufferOverflow,
    /// The client nack'd a response, but re-transmission is not
    /// implemented.
    ClientSentNack,

    // Internal - a non-fatal error occurred (with errno-style error code).
    //
    // This "dummy" error is required as part of the `TargetResultExt::
    // handle_error()` machinery: the dispatcher catches it and replies
    // `E<code>` to the current request. It never propagates to the caller
    // of `run`.
    #[doc(hidden)]
    NonFatalError(u8),
}

impl<C> InternalError<C> {
    pub fn conn_read(e: C) -> Self {
        InternalError::Connection(e, ConnectionErrorKind::Read)
    }

    pub fn conn_write(e: C) -> Self {
        InternalError::Connection(e, ConnectionErrorKind::Write)
    }

    pub fn conn_init(e: C) -> Self {
        InternalError::Connection(e, ConnectionErrorKind::Init)
    }
}

impl<C> From<ResponseWriterError<C>> for InternalError<C> {
    fn from(e: ResponseWriterError<C>) -> Self {
        InternalError::Connection(e.0, ConnectionErrorKind::Write)
    }
}

/// An error which may terminate a GDB debugging session.
///
/// Only transport-level failures end a session: everything recoverable
/// (malformed packets, bus errors on the target fabric) is reported to the
/// client as an `E01`-class reply and the session carries on. The embedder
/// is expected to treat any `GdbServerError` as "close this connection and
/// go back to listening".
#[derive(Debug)]
pub struct GdbServerError<C> {
    kind: InternalError<C>,
}

impl<C> GdbServerError<C> {
    /// Check if the error was due to a connection error.
    pub fn is_connection_error(&self) -> bool {
        matches!(self.kind, InternalError::Connection(..))
    }

    /// If the error was due to a connection error, return the concrete
    /// error type.
    pub fn into_connection_error(self) -> Option<(C, ConnectionErrorKind)> {
        match self.kind {
            InternalError::Connection(e, kind) => Some((e, kind)),
            _ => None,
        }
    }
}

impl<C: Display> Display for GdbServerError<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use self::InternalError::*;
        match &self.kind {
            Connection(e, ConnectionErrorKind::Init) => {
                write!(f, "connection error while initializing the session: {}", e)
            }
            Connection(e, ConnectionErrorKind::Read) => {
                write!(f, "connection error while reading request: {}", e)
            }
            Connection(e, ConnectionErrorKind::Write) => {
                write!(f, "connection error while writing response: {}", e)
            }
            PacketBufferOverflow => write!(f, "received an oversized packet"),
            ClientSentNack => write!(
                f,
                "client nack'd the last packet, but re-transmission is not implemented"
            ),
            NonFatalError(_) => write!(
                f,
                "internal non-fatal error leaked out of the dispatcher; this is a bug"
            ),
        }
    }
}

impl<C: fmt::Debug + Display> std::error::Error for GdbServerError<C> {}

impl<C> From<InternalError<C>> for GdbServerError<C> {
    fn from(kind: InternalError<C>) -> Self {
        GdbServerError { kind }
    }
}

/// Packet-level parse failures are recoverable: the session nacks the
/// packet and waits for a re-transmission, so `PacketParseError` never
/// becomes a session error. It is logged instead.
pub(crate) fn log_packet_error(e: PacketParseError) {
    log::warn!("malformed packet: {:?}", e);
}
