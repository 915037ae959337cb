//! Shared memory files that back the compositor's `wl_shm` pools

use std::error::Error;
use std::fmt;
use std::ptr::NonNull;

use rustix::fd::AsFd;
use rustix::fd::BorrowedFd;
use rustix::fd::OwnedFd;
use rustix::io::Errno;
use rustix::mm::mmap;
use rustix::mm::munmap;
use rustix::mm::MapFlags;
use rustix::mm::ProtFlags;
use rustix::shm::Mode;
use rustix::shm::ShmOFlags;

/// The step of [`Mmap::create`] that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmapStep {
    /// Creating the anonymous file
    Create,
    /// Growing the file to the requested length
    Truncate,
    /// Mapping the file into our address space
    Map,
}

#[derive(Debug)]
pub struct MmapError {
    step: MmapStep,
    err: Errno,
}

impl MmapError {
    #[must_use]
    pub const fn step(&self) -> MmapStep {
        self.step
    }

    #[must_use]
    pub const fn errno(&self) -> Errno {
        self.err
    }
}

impl fmt::Display for MmapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self.step {
            MmapStep::Create => "failed to create shared memory file",
            MmapStep::Truncate => "failed to resize shared memory file",
            MmapStep::Map => "failed to map shared memory file",
        })
    }
}

impl Error for MmapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.err)
    }
}

trait StepExt<T> {
    fn at(self, step: MmapStep) -> Result<T, MmapError>;
}

impl<T> StepExt<T> for Result<T, Errno> {
    fn at(self, step: MmapStep) -> Result<T, MmapError> {
        self.map_err(|err| MmapError { step, err })
    }
}

/// A read/write, shared mapping of an anonymous file
///
/// The file descriptor lives as long as the mapping. Compositors receive a duplicate of it through
/// the socket, so dropping this only releases our side.
#[derive(Debug)]
pub struct Mmap {
    fd: OwnedFd,
    ptr: NonNull<std::ffi::c_void>,
    len: usize,
}

impl Mmap {
    const PROT: ProtFlags = ProtFlags::WRITE.union(ProtFlags::READ);
    const FLAGS: MapFlags = MapFlags::SHARED;

    /// Creates a new anonymous file with exactly `len` bytes and maps all of it
    #[inline]
    pub fn create(len: usize) -> Result<Self, MmapError> {
        let fd = create_shm_fd().at(MmapStep::Create)?;
        rustix::io::retry_on_intr(|| rustix::fs::ftruncate(&fd, len as u64))
            .at(MmapStep::Truncate)?;

        // nobody gets to shrink the file under the compositor's feet. This fails for the shm_open
        // fallback, which is fine
        #[cfg(target_os = "linux")]
        let _ = rustix::fs::fcntl_add_seals(
            &fd,
            rustix::fs::SealFlags::SHRINK | rustix::fs::SealFlags::SEAL,
        );

        // SAFETY: we map a fresh file we own; nothing else in this process aliases the region
        let ptr = unsafe { mmap(std::ptr::null_mut(), len, Self::PROT, Self::FLAGS, &fd, 0) }
            .at(MmapStep::Map)?;

        // POSIX says that the implementation will never select an address at 0
        let ptr = NonNull::new(ptr).ok_or(MmapError {
            step: MmapStep::Map,
            err: Errno::FAULT,
        })?;

        Ok(Self { fd, ptr, len })
    }

    #[inline]
    #[must_use]
    pub fn slice_mut(&mut self) -> &mut [u8] {
        // SAFETY: the mapping is `len` bytes long and valid for as long as `self` lives
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr().cast(), self.len) }
    }

    #[inline]
    #[must_use]
    pub fn slice(&self) -> &[u8] {
        // SAFETY: the mapping is `len` bytes long and valid for as long as `self` lives
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr().cast(), self.len) }
    }

    #[inline]
    #[must_use]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub fn fd(&self) -> BorrowedFd {
        self.fd.as_fd()
    }
}

impl Drop for Mmap {
    #[inline]
    fn drop(&mut self) {
        // SAFETY: `ptr` and `len` describe exactly the region we mapped in `create`
        if let Err(e) = unsafe { munmap(self.ptr.as_ptr(), self.len) } {
            eprintln!("ERROR WHEN UNMAPPING SHARED MEMORY: {e}");
        }
    }
}

fn create_shm_fd() -> rustix::io::Result<OwnedFd> {
    #[cfg(target_os = "linux")]
    {
        match create_memfd() {
            Ok(fd) => return Ok(fd),
            // Not supported, use fallback.
            Err(Errno::NOSYS) => (),
            Err(err) => return Err(err),
        };
    }

    let flags = ShmOFlags::CREATE | ShmOFlags::EXCL | ShmOFlags::RDWR;
    let mode = Mode::RUSR | Mode::WUSR;
    loop {
        let handle = shm_handle();
        match rustix::shm::shm_open(handle.as_str(), flags, mode) {
            Ok(fd) => {
                rustix::shm::shm_unlink(handle.as_str())?;
                return Ok(fd);
            }
            // somebody else got the same name, try another one
            Err(Errno::EXIST) | Err(Errno::INTR) => continue,
            Err(err) => return Err(err),
        }
    }
}

fn shm_handle() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or_default();
    format!("/rawland-shm-{}-{nanos}", std::process::id())
}

#[cfg(target_os = "linux")]
fn create_memfd() -> rustix::io::Result<OwnedFd> {
    use rustix::fs::MemfdFlags;

    let flags = MemfdFlags::ALLOW_SEALING | MemfdFlags::CLOEXEC;
    rustix::io::retry_on_intr(|| rustix::fs::memfd_create("rawland-shm", flags))
}
