//! The unix socket we talk to the compositor through

use std::ffi::OsStr;
use std::path::PathBuf;

use log::{debug, warn};
use rustix::{
    fd::{BorrowedFd, OwnedFd},
    io, net,
};

use super::{
    wire::{MessageBuffer, WireError, MAX_MESSAGE_LEN},
    ObjectId,
};
use crate::error::{ErrnoExt, Error, OsErrorKind};

/// Size of `sockaddr_un.sun_path`, null terminator included
#[cfg(target_os = "linux")]
pub const SUN_PATH_LEN: usize = 108;
#[cfg(not(target_os = "linux"))]
pub const SUN_PATH_LEN: usize = 104;

/// Where the compositor's socket should be, given `XDG_RUNTIME_DIR` and `WAYLAND_DISPLAY`
pub fn socket_path(runtime_dir: Option<&OsStr>, display: Option<&OsStr>) -> Result<PathBuf, Error> {
    let runtime_dir = runtime_dir
        .filter(|d| !d.is_empty())
        .ok_or(Error::NoRuntimeDir)?;
    let socket_name: PathBuf = match display.filter(|d| !d.is_empty()) {
        Some(display) => display.into(),
        None => {
            warn!("WAYLAND_DISPLAY is not set! Defaulting to wayland-0");
            PathBuf::from("wayland-0")
        }
    };

    // an absolute display name replaces the runtime dir entirely
    let path = PathBuf::from(runtime_dir).join(socket_name);

    // leave room for the null terminator
    if path.as_os_str().len() >= SUN_PATH_LEN {
        return Err(Error::SocketPathTooLong {
            path,
            max: SUN_PATH_LEN - 1,
        });
    }
    Ok(path)
}

/// A connection to the compositor
///
/// Outbound messages are assembled in a single scratch buffer, see [`Connection::begin`]. Inbound
/// bytes accumulate in the inbox until the dispatcher has consumed whole messages from it.
#[derive(Debug)]
pub struct Connection {
    fd: OwnedFd,
    out: MessageBuffer,
    /// size written in the header of the message being assembled
    announced: usize,
    inbox: Vec<u8>,
}

impl Connection {
    /// Connects to the socket named by `XDG_RUNTIME_DIR` and `WAYLAND_DISPLAY`
    pub fn connect_to_env() -> Result<Self, Error> {
        Self::connect(
            std::env::var_os("XDG_RUNTIME_DIR").as_deref(),
            std::env::var_os("WAYLAND_DISPLAY").as_deref(),
        )
    }

    pub fn connect(runtime_dir: Option<&OsStr>, display: Option<&OsStr>) -> Result<Self, Error> {
        let path = socket_path(runtime_dir, display)?;

        let fd = net::socket_with(
            net::AddressFamily::UNIX,
            net::SocketType::STREAM,
            net::SocketFlags::CLOEXEC,
            None,
        )
        .context(OsErrorKind::Socket)?;
        let addr = net::SocketAddrUnix::new(path.as_path()).context(OsErrorKind::Connect)?;
        net::connect_unix(&fd, &addr).context(OsErrorKind::Connect)?;

        debug!("connected to wayland socket at {path:?}");
        Ok(Self::from_fd(fd))
    }

    /// Wraps a socket that is already connected to a compositor
    #[must_use]
    pub fn from_fd(fd: OwnedFd) -> Self {
        Self {
            fd,
            out: MessageBuffer::default(),
            announced: 0,
            inbox: Vec::with_capacity(MAX_MESSAGE_LEN),
        }
    }

    /// Clears the scratch buffer and writes the header of a new message into it
    ///
    /// `size` is the full message size, header included. The caller writes the arguments into
    /// the returned buffer, then calls [`Self::send`] or [`Self::send_with_fd`], which refuse to
    /// transmit anything that does not match `size`.
    pub(crate) fn begin(
        &mut self,
        sender_id: ObjectId,
        opcode: u16,
        size: usize,
    ) -> Result<&mut MessageBuffer, Error> {
        self.out.clear();
        debug_assert_eq!(self.out.position(), 0);

        let wire_size = u16::try_from(size).map_err(|_| WireError::Overflow {
            needed: size,
            remaining: self.out.capacity(),
        })?;
        self.announced = size;
        super::wire::Header {
            object_id: sender_id.get(),
            opcode,
            size: wire_size,
        }
        .write(&mut self.out)?;
        Ok(&mut self.out)
    }

    fn assembled(&self) -> Result<&[u8], Error> {
        let written = self.out.position();
        if written != self.announced || self.announced % 4 != 0 {
            return Err(WireError::SizeMismatch {
                announced: self.announced,
                written,
            }
            .into());
        }
        Ok(self.out.as_bytes())
    }

    /// Transmits the message assembled since the last [`Self::begin`]
    pub(crate) fn send(&mut self) -> Result<(), Error> {
        let msg = self.assembled()?;
        let written = io::retry_on_intr(|| net::send(&self.fd, msg, net::SendFlags::NOSIGNAL))
            .map_err(|err| hangup_or(err, OsErrorKind::Send))?;
        check_written(msg.len(), written)
    }

    /// Like [`Self::send`], passing `fd` along as ancillary data
    pub(crate) fn send_with_fd(&mut self, fd: BorrowedFd) -> Result<(), Error> {
        let msg = self.assembled()?;
        let fds = [fd];
        let written = io::retry_on_intr(|| {
            let iov = io::IoSlice::new(msg);
            let mut control_buf = [0u8; rustix::cmsg_space!(ScmRights(1))];
            let mut control = net::SendAncillaryBuffer::new(&mut control_buf);
            control.push(net::SendAncillaryMessage::ScmRights(&fds));
            net::sendmsg(&self.fd, &[iov], &mut control, net::SendFlags::NOSIGNAL)
        })
        .map_err(|err| hangup_or(err, OsErrorKind::Send))?;
        check_written(msg.len(), written)
    }

    /// Blocks until the compositor sends something, and appends it to the inbox
    pub fn receive(&mut self) -> Result<usize, Error> {
        let mut buf = [0u8; MAX_MESSAGE_LEN];
        let n = io::retry_on_intr(|| net::recv(&self.fd, &mut buf, net::RecvFlags::empty()))
            .map_err(|err| hangup_or(err, OsErrorKind::Recv))?;
        if n == 0 {
            return Err(Error::ConnectionClosed);
        }
        self.inbox.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    /// Takes the unread bytes out, so they can be dispatched while the connection is borrowed
    pub(crate) fn take_inbox(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.inbox)
    }

    /// Puts back what is left of `inbox` after its first `consumed` bytes were dispatched
    pub(crate) fn keep_unread(&mut self, mut inbox: Vec<u8>, consumed: usize) {
        inbox.drain(..consumed);
        self.inbox = inbox;
    }
}

/// A reset or a broken pipe only means the compositor closed its end before reading everything
fn hangup_or(err: io::Errno, kind: OsErrorKind) -> Error {
    match err {
        io::Errno::CONNRESET | io::Errno::PIPE => Error::ConnectionClosed,
        err => err.context(kind),
    }
}

fn check_written(expected: usize, written: usize) -> Result<(), Error> {
    if written != expected {
        return Err(Error::ShortWrite { expected, written });
    }
    Ok(())
}
