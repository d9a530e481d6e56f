use crate::CoreSet;

/// ioctl type byte claimed by the module.
pub const KSCHED_MAGIC: u8 = 0xF0;

/// Interrupt every core named in an [`IntrReq`].
pub const KSCHED_IOC_INTR: u32 = iow(KSCHED_MAGIC, 3, size_of::<IntrReq>());

/// Argument of [`KSCHED_IOC_INTR`].
#[repr(C)]
#[derive(Debug)]
pub struct IntrReq {
    /// Length of the mask in bytes.
    pub len: usize,
    /// Start of the bitmask words.
    pub mask: *const u64,
}

impl IntrReq {
    /// Borrow `set` for the duration of one ioctl.
    #[must_use]
    pub const fn for_set(set: &CoreSet) -> Self {
        Self {
            len: CoreSet::byte_len(),
            mask: set.as_words().as_slice().as_ptr(),
        }
    }
}

// asm-generic ioctl encoding: dir(2) | size(14) | type(8) | nr(8)
const IOC_TYPESHIFT: u32 = 8;
const IOC_SIZESHIFT: u32 = 16;
const IOC_DIRSHIFT: u32 = 30;
const IOC_WRITE: u32 = 1;

#[allow(clippy::cast_possible_truncation)]
const fn iow(ty: u8, nr: u8, size: usize) -> u32 {
    assert!(size < (1 << 14), "ioctl argument too large");
    (IOC_WRITE << IOC_DIRSHIFT)
        | ((size as u32) << IOC_SIZESHIFT)
        | ((ty as u32) << IOC_TYPESHIFT)
        | (nr as u32)
}
