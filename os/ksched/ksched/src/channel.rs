use crate::batch::InterruptBatch;
use crate::generation::GenerationTracker;
use crate::{Backend, Config, CoreState, KschedError, TaskHandle};
use ksched_abi::{Command, CommandKind, ControlBlock, CoreSet};
use log::{info, trace};
use std::{fmt, io};

/// Task id published with idle directives.
const NO_TASK: i32 = 0;

/// An established channel to the kernel peer.
///
/// Owns the mapping, the device handle, the per-core generation counters and
/// the pending interrupt set. Dropping it unmaps the blocks and then releases
/// the backend.
///
/// Issuing methods take `&mut self`: directives for one core must be
/// serialized, and the channel leaves that to its single owner.
pub struct Channel<B: Backend> {
    // Declared before `backend` so the mapping is released first.
    blocks: B::Region,
    backend: B,
    generations: GenerationTracker,
    interrupts: InterruptBatch,
    num_cores: u32,
}

impl<B: Backend> Channel<B> {
    /// Map the control blocks over `backend` and prime every core.
    ///
    /// Each core's counter adopts the kernel's committed generation before an
    /// idle command with no task is published under that same generation, so
    /// leftover block contents are never taken for a live directive and every
    /// core starts out confirmed.
    ///
    /// # Errors
    /// - [`KschedError::InvalidConfig`] for an unusable core count.
    /// - [`KschedError::ChannelBusy`] if the backend already serves another
    ///   channel.
    /// - [`KschedError::MappingFailed`] if the blocks cannot be mapped; the
    ///   backend is released before returning.
    pub fn open(mut backend: B, config: &Config) -> Result<Self, KschedError> {
        config.validate()?;
        let num_cores = config.num_cores();
        let cores = num_cores as usize;

        let blocks = backend.map(cores).map_err(|e| match e.kind() {
            io::ErrorKind::ResourceBusy => KschedError::ChannelBusy,
            _ => KschedError::MappingFailed(e),
        })?;
        if blocks.len() < cores {
            return Err(KschedError::MappingFailed(io::Error::new(
                io::ErrorKind::InvalidData,
                "mapping holds fewer control blocks than requested",
            )));
        }

        let mut generations = GenerationTracker::new(cores);
        for (core, block) in blocks.iter().take(cores).enumerate() {
            let committed = block.last_committed_generation();
            generations.prime(core, committed);
            block.set_idle_hint(0);
            block.publish(Command::idle(), NO_TASK, committed);
        }

        info!("ksched channel open for {num_cores} cores");
        Ok(Self {
            blocks,
            backend,
            generations,
            interrupts: InterruptBatch::new(),
            num_cores,
        })
    }

    #[must_use]
    pub const fn num_cores(&self) -> u32 {
        self.num_cores
    }

    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Tell `core` to go idle. Returns the generation of the directive.
    ///
    /// Non-blocking; poll [`is_applied`](Self::is_applied) for confirmation.
    ///
    /// # Errors
    /// [`KschedError::InvalidCore`]; nothing is written in that case.
    pub fn set_idle(&mut self, core: u32) -> Result<u32, KschedError> {
        self.issue(core, CommandKind::Idle, NO_TASK)
    }

    /// Tell `core` to run `task`. Returns the generation of the directive.
    ///
    /// Non-blocking; poll [`is_applied`](Self::is_applied) for confirmation.
    ///
    /// # Errors
    /// [`KschedError::InvalidCore`]; nothing is written in that case.
    pub fn run(&mut self, core: u32, task: TaskHandle) -> Result<u32, KschedError> {
        self.issue(core, CommandKind::Run, task.tid())
    }

    fn issue(&mut self, core: u32, kind: CommandKind, tid: i32) -> Result<u32, KschedError> {
        let index = self.index(core)?;
        let generation = self.generations.advance(index, kind);
        self.blocks[index].publish(Command::from_kind(kind), tid, generation);
        trace!("core {core}: {kind:?} (tid {tid}) at generation {generation}");
        Ok(generation)
    }

    /// Set the power-state hint `core` uses while idle. Not a directive: the
    /// generation does not move.
    ///
    /// # Errors
    /// [`KschedError::InvalidCore`].
    pub fn idle_hint(&mut self, core: u32, hint: u32) -> Result<(), KschedError> {
        self.block(core)?.set_idle_hint(hint);
        Ok(())
    }

    /// Whether the kernel has applied the last directive issued for `core`.
    ///
    /// One acquire load; no syscalls, safe to spin on.
    ///
    /// # Errors
    /// [`KschedError::InvalidCore`].
    #[inline]
    pub fn is_applied(&self, core: u32) -> Result<bool, KschedError> {
        let index = self.index(core)?;
        Ok(self.blocks[index].last_committed_generation() == self.generations.issued(index))
    }

    /// Generation of the last directive issued for `core`.
    ///
    /// # Errors
    /// [`KschedError::InvalidCore`].
    pub fn issued_generation(&self, core: u32) -> Result<u32, KschedError> {
        Ok(self.generations.issued(self.index(core)?))
    }

    /// Generation the kernel last committed for `core`.
    ///
    /// # Errors
    /// [`KschedError::InvalidCore`].
    pub fn committed_generation(&self, core: u32) -> Result<u32, KschedError> {
        Ok(self.block(core)?.last_committed_generation())
    }

    /// Where `core` stands in its idle/run cycle.
    ///
    /// # Errors
    /// [`KschedError::InvalidCore`].
    pub fn core_state(&self, core: u32) -> Result<CoreState, KschedError> {
        let applied = self.is_applied(core)?;
        let last = self.generations.last_kind(core as usize);
        Ok(CoreState::new(last, applied))
    }

    /// Queue a wake interrupt for `core`. Idempotent until the next flush.
    ///
    /// # Errors
    /// [`KschedError::InvalidCore`].
    pub fn mark_pending(&mut self, core: u32) -> Result<(), KschedError> {
        self.index(core)?;
        self.interrupts.mark(core);
        Ok(())
    }

    /// Cores queued since the last flush.
    #[must_use]
    pub const fn pending(&self) -> &CoreSet {
        self.interrupts.pending()
    }

    /// Interrupt every queued core with one privileged call and clear the
    /// queue, whether or not delivery succeeded.
    ///
    /// # Errors
    /// [`KschedError::DeliveryFailed`] for the batch as a whole. Re-mark the
    /// cores that must be woken and flush again.
    pub fn flush_pending(&mut self) -> Result<(), KschedError> {
        let backend = &mut self.backend;
        self.interrupts
            .flush(|cores| backend.send_interrupts(cores))
            .map(|_| ())
    }

    fn block(&self, core: u32) -> Result<&ControlBlock, KschedError> {
        let index = self.index(core)?;
        Ok(&self.blocks[index])
    }

    #[inline]
    const fn index(&self, core: u32) -> Result<usize, KschedError> {
        if core < self.num_cores {
            Ok(core as usize)
        } else {
            Err(KschedError::InvalidCore {
                core,
                num_cores: self.num_cores,
            })
        }
    }
}

impl<B: Backend> fmt::Debug for Channel<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("num_cores", &self.num_cores)
            .field("pending", self.interrupts.pending())
            .finish_non_exhaustive()
    }
}

impl<B: Backend> Drop for Channel<B> {
    fn drop(&mut self) {
        info!("ksched channel closed ({} cores)", self.num_cores);
    }
}
