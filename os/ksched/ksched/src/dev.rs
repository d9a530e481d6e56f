//! The real kernel module behind `/dev/ksched`.

use crate::{Backend, KschedError};
use ksched_abi::{ControlBlock, CoreSet, IntrReq, KSCHED_IOC_INTR};
use log::{debug, error, warn};
use std::fs::{File, OpenOptions, TryLockError};
use std::io;
use std::ops::Deref;
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};

/// An open handle on the ksched device. Closed on drop.
///
/// Holding one makes this process the channel's only user-space writer: the
/// descriptor carries an exclusive lock on the device until it is closed.
#[derive(Debug)]
pub struct DevKsched {
    file: File,
    path: PathBuf,
}

impl DevKsched {
    /// Open the device read/write and take ownership of the channel.
    ///
    /// # Errors
    /// - [`KschedError::ChannelUnavailable`] if the node is missing or not accessible.
    /// - [`KschedError::ChannelBusy`] if another handle already owns the channel.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KschedError> {
        let path = path.as_ref();
        let unavailable = |source| KschedError::ChannelUnavailable {
            path: path.to_path_buf(),
            source,
        };

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(unavailable)?;
        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => {
                warn!("{} is already owned by another writer", path.display());
                return Err(KschedError::ChannelBusy);
            }
            Err(TryLockError::Error(e)) => return Err(unavailable(e)),
        }

        debug!("opened {}", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Backend for DevKsched {
    type Region = MmapRegion;

    fn map(&mut self, num_cores: usize) -> io::Result<MmapRegion> {
        map_blocks(&self.file, num_cores, libc::PROT_READ | libc::PROT_WRITE)
    }

    fn send_interrupts(&mut self, cores: &CoreSet) -> io::Result<()> {
        let req = IntrReq::for_set(cores);
        // SAFETY: `req` and the mask it points at outlive the call.
        let ret = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                libc::Ioctl::from(KSCHED_IOC_INTR),
                &raw const req,
            )
        };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

/// Map the control blocks read-only, without taking ownership of the channel.
///
/// The descriptor is closed again before returning; the mapping stays valid.
pub(crate) fn map_observer(path: &Path, num_cores: usize) -> Result<MmapRegion, KschedError> {
    let file = File::open(path).map_err(|source| KschedError::ChannelUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    map_blocks(&file, num_cores, libc::PROT_READ).map_err(KschedError::MappingFailed)
}

fn map_blocks(file: &File, num_cores: usize, prot: libc::c_int) -> io::Result<MmapRegion> {
    let len = num_cores
        .checked_mul(size_of::<ControlBlock>())
        .ok_or_else(|| io::Error::from(io::ErrorKind::InvalidInput))?;

    // SAFETY: fresh shared mapping over a descriptor we hold; the kernel
    // decides placement.
    let addr = unsafe {
        libc::mmap(
            ptr::null_mut(),
            len,
            prot,
            libc::MAP_SHARED,
            file.as_raw_fd(),
            0,
        )
    };
    if addr == libc::MAP_FAILED {
        return Err(io::Error::last_os_error());
    }

    let ptr = NonNull::new(addr.cast::<ControlBlock>())
        .ok_or_else(|| io::Error::other("mmap returned a null mapping"))?;
    Ok(MmapRegion {
        ptr,
        cores: num_cores,
    })
}

/// Control blocks mapped from the device. Unmapped on drop.
#[derive(Debug)]
pub struct MmapRegion {
    ptr: NonNull<ControlBlock>,
    cores: usize,
}

// SAFETY: the region is plain shared memory and every field of
// `ControlBlock` is atomic.
unsafe impl Send for MmapRegion {}
unsafe impl Sync for MmapRegion {}

impl Deref for MmapRegion {
    type Target = [ControlBlock];

    fn deref(&self) -> &[ControlBlock] {
        // SAFETY: the mapping starts on a page boundary, which satisfies the
        // blocks' 64-byte alignment, spans `cores` contiguous blocks and
        // stays valid until drop.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.cores) }
    }
}

impl Drop for MmapRegion {
    fn drop(&mut self) {
        let len = self.cores * size_of::<ControlBlock>();
        // SAFETY: unmaps exactly what `map_blocks` mapped; no borrows survive `self`.
        let ret = unsafe { libc::munmap(self.ptr.as_ptr().cast(), len) };
        if ret != 0 {
            error!(
                "failed to unmap ksched control blocks: {}",
                io::Error::last_os_error()
            );
        }
    }
}
