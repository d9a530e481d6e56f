use crate::Command;
use core::sync::atomic::{AtomicI32, AtomicU32, Ordering};

/// Per-core record in the region shared with the kernel module.
///
/// One cache line per core so that neighbouring cores never contend.
/// Fields are atomics because the peer mutates the same memory at any time;
/// the methods below are split by which side is allowed to call them.
#[repr(C, align(64))]
#[derive(Debug)]
pub struct ControlBlock {
    /// Generation of the most recently issued directive.
    ///
    /// **Writer:** user space (release).
    issued_gen: AtomicU32,

    /// Generation of the most recently applied directive.
    ///
    /// **Writer:** kernel (release).
    last_gen: AtomicU32,

    /// Encoded [`Command`].
    ///
    /// **Writer:** user space.
    cmd: AtomicU32,

    /// Kernel thread id to run for [`CommandKind::Run`](crate::CommandKind::Run), `0` for none.
    ///
    /// **Writer:** user space.
    tid: AtomicI32,

    /// Power-state hint for the core's idle loop (e.g. an `mwait` hint).
    ///
    /// **Writer:** user space.
    idle_hint: AtomicU32,
}

/// Snapshot of the user-written half of a block, as the kernel sees it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Directive {
    pub generation: u32,
    pub command: Command,
    pub tid: i32,
}

impl Default for ControlBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlBlock {
    /// A zeroed block, as the module hands out on first open.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            issued_gen: AtomicU32::new(0),
            last_gen: AtomicU32::new(0),
            cmd: AtomicU32::new(0),
            tid: AtomicI32::new(0),
            idle_hint: AtomicU32::new(0),
        }
    }
}

// User-space side.
impl ControlBlock {
    /// Acquire-load the generation the kernel last applied.
    #[inline]
    pub fn last_committed_generation(&self) -> u32 {
        self.last_gen.load(Ordering::Acquire)
    }

    /// Publish a directive.
    ///
    /// The command fields are written first; the release store of
    /// `generation` orders them so the kernel never sees the new generation
    /// with stale command fields.
    #[inline]
    pub fn publish(&self, command: Command, tid: i32, generation: u32) {
        self.cmd.store(command.into_bits(), Ordering::Relaxed);
        self.tid.store(tid, Ordering::Relaxed);
        self.issued_gen.store(generation, Ordering::Release);
    }

    /// Set the idle-loop hint without issuing a directive.
    #[inline]
    pub fn set_idle_hint(&self, hint: u32) {
        self.idle_hint.store(hint, Ordering::Release);
    }
}

// Reads of the user-written fields, as the kernel sees them.
impl ControlBlock {
    /// Acquire-load the published directive.
    #[inline]
    pub fn load_directive(&self) -> Directive {
        let generation = self.issued_gen.load(Ordering::Acquire);
        Directive {
            generation,
            command: Command::from_bits(self.cmd.load(Ordering::Relaxed)),
            tid: self.tid.load(Ordering::Relaxed),
        }
    }

    /// Acquire-load the idle-loop hint.
    #[inline]
    pub fn idle_hint(&self) -> u32 {
        self.idle_hint.load(Ordering::Acquire)
    }
}

// Kernel side. Only built with the `kernel` feature so user space cannot
// write `last_gen` on a live mapping.
#[cfg(any(test, feature = "kernel"))]
impl ControlBlock {
    /// Mark `generation` as applied.
    #[inline]
    pub fn commit(&self, generation: u32) {
        self.last_gen.store(generation, Ordering::Release);
    }
}

// Layout guards: the kernel module hard-codes one 64-byte line per core.
const _: () = {
    assert!(size_of::<ControlBlock>() == 64);
    assert!(align_of::<ControlBlock>() == 64);
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CommandKind;

    #[test]
    fn publish_is_visible_through_directive() {
        let block = ControlBlock::new();
        block.publish(Command::run(), 42, 7);

        let d = block.load_directive();
        assert_eq!(d.generation, 7);
        assert_eq!(d.command.kind(), Some(CommandKind::Run));
        assert_eq!(d.tid, 42);

        // publishing does not commit
        assert_eq!(block.last_committed_generation(), 0);
        block.commit(7);
        assert_eq!(block.last_committed_generation(), 7);
    }

    #[test]
    fn idle_hint_is_independent_of_generation() {
        let block = ControlBlock::new();
        block.set_idle_hint(0x20);
        assert_eq!(block.idle_hint(), 0x20);
        assert_eq!(block.load_directive().generation, 0);
    }
}
