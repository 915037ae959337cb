use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;

use common::mmap::MmapError;
use rustix::io::Errno;

use crate::wayland::wire::WireError;

/// Everything that can end a session
#[derive(Debug)]
pub enum Error {
    /// `XDG_RUNTIME_DIR` is not set, so there is nowhere to look for the socket
    NoRuntimeDir,
    /// The socket path does not fit in a `sockaddr_un`
    SocketPathTooLong { path: PathBuf, max: usize },
    /// A system call on the socket failed
    Os { kind: OsErrorKind, err: Errno },
    /// The kernel took only part of a message
    ShortWrite { expected: usize, written: usize },
    /// The compositor hung up
    ConnectionClosed,
    /// The compositor sent `wl_display.error`
    Protocol {
        object_id: u32,
        interface: &'static str,
        code: u32,
        message: String,
    },
    /// A message header announced an impossible size
    Framing {
        object_id: u32,
        opcode: u16,
        size: u16,
    },
    /// We broke the wire format ourselves, or the compositor sent garbage arguments
    Wire(WireError),
    /// A request needed an object we have not bound yet
    Unbound(&'static str),
    /// The pixel buffer's shared memory could not be set up
    Shm(MmapError),
    /// The requested surface is too big for a `wl_shm_pool`
    BufferTooLarge { width: u32, height: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsErrorKind {
    /// Failed to create file descriptor
    Socket,
    /// Failed to connect to socket
    Connect,
    /// Writing to socket failed
    Send,
    /// Reading socket failed
    Recv,
}

impl OsErrorKind {
    fn description(&self) -> &'static str {
        match self {
            Self::Socket => "failed to create socket file descriptor",
            Self::Connect => "failed to connect to the wayland socket",
            Self::Send => "failed to send message to the compositor",
            Self::Recv => "failed to receive message from the compositor",
        }
    }
}

impl Error {
    /// Errors caused by the environment we were started in, rather than by the compositor
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::NoRuntimeDir | Self::SocketPathTooLong { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRuntimeDir => {
                f.write_str("XDG_RUNTIME_DIR is not set, cannot find the wayland socket")
            }
            Self::SocketPathTooLong { path, max } => write!(
                f,
                "wayland socket path {path:?} is longer than the maximum of {max} bytes"
            ),
            Self::Os { kind, .. } => f.write_str(kind.description()),
            Self::ShortWrite { expected, written } => write!(
                f,
                "short write to the wayland socket: sent {written} of {expected} bytes"
            ),
            Self::ConnectionClosed => f.write_str("the compositor closed the connection"),
            Self::Protocol {
                object_id,
                interface,
                code,
                message,
            } => write!(
                f,
                "Protocol error on interface {interface} (object {object_id}). Code {code}: {message}"
            ),
            Self::Framing {
                object_id,
                opcode,
                size,
            } => write!(
                f,
                "malformed message from the compositor: object {object_id}, opcode {opcode}, size {size}"
            ),
            Self::Wire(e) => write!(f, "wire format violation: {e}"),
            Self::Unbound(interface) => write!(f, "{interface} has not been bound yet"),
            Self::Shm(e) => fmt::Display::fmt(e, f),
            Self::BufferTooLarge { width, height } => {
                write!(f, "a {width}x{height} buffer does not fit in a wl_shm pool")
            }
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Os { err, .. } => Some(err),
            Self::Wire(e) => Some(e),
            Self::Shm(e) => e.source(),
            _ => None,
        }
    }
}

impl From<WireError> for Error {
    fn from(e: WireError) -> Self {
        Self::Wire(e)
    }
}

impl From<MmapError> for Error {
    fn from(e: MmapError) -> Self {
        Self::Shm(e)
    }
}

/// Simplify generating [`Error`]s from [`Errno`]
pub(crate) trait ErrnoExt {
    type Output;
    fn context(self, kind: OsErrorKind) -> Self::Output;
}

impl ErrnoExt for Errno {
    type Output = Error;
    fn context(self, kind: OsErrorKind) -> Self::Output {
        Error::Os { kind, err: self }
    }
}

impl<T> ErrnoExt for Result<T, Errno> {
    type Output = Result<T, Error>;
    fn context(self, kind: OsErrorKind) -> Self::Output {
        self.map_err(|error| error.context(kind))
    }
}
