use ksched_abi::{ControlBlock, CoreSet};
use std::io;
use std::ops::Deref;

/// The privileged half of the channel: whatever provides the shared control
/// blocks and delivers wake interrupts.
///
/// [`DevKsched`](crate::DevKsched) talks to the kernel module;
/// `SimulatedKernel` (feature `sim`) plays the module in-process.
///
/// A backend serves one channel at a time. Mapping blocks that another
/// channel still owns fails with [`io::ErrorKind::ResourceBusy`].
pub trait Backend {
    /// A live mapping of the control blocks. Dropping it releases the mapping.
    type Region: Deref<Target = [ControlBlock]>;

    /// Map one control block per core.
    ///
    /// # Errors
    /// The OS error that prevented the mapping, `ResourceBusy` if the blocks
    /// already have an owner.
    fn map(&mut self, num_cores: usize) -> io::Result<Self::Region>;

    /// Interrupt every core in `cores` with one privileged call.
    ///
    /// # Errors
    /// The OS error of the failed call; delivery may have been partial.
    fn send_interrupts(&mut self, cores: &CoreSet) -> io::Result<()>;
}
