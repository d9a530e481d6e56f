//! An in-process stand-in for the kernel module.
//!
//! Owns the control blocks in ordinary memory and lets a test (or a policy
//! simulator) act as the kernel: observe directives, commit generations and
//! inspect the interrupt batches user space sent.
//!
//! Like the module, it hands the writable blocks to one owner at a time.
//! [`SimulatedKernel::observe`] gives read-only access on top of that.

use crate::Backend;
use ksched_abi::{ControlBlock, CoreSet, Directive};
use std::io;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Simulated kernel peer. Clones share the same state.
#[derive(Debug, Clone)]
pub struct SimulatedKernel {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    blocks: Box<[ControlBlock]>,
    batches: Mutex<Vec<CoreSet>>,
    failing_deliveries: AtomicUsize,
    refuse_mapping: AtomicBool,
    owned: AtomicBool,
    live_regions: AtomicUsize,
}

impl SimulatedKernel {
    /// A kernel driving `num_cores` zeroed control blocks.
    #[must_use]
    pub fn new(num_cores: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                blocks: (0..num_cores).map(|_| ControlBlock::new()).collect(),
                batches: Mutex::new(Vec::new()),
                failing_deliveries: AtomicUsize::new(0),
                refuse_mapping: AtomicBool::new(false),
                owned: AtomicBool::new(false),
                live_regions: AtomicUsize::new(0),
            }),
        }
    }

    #[must_use]
    pub fn num_cores(&self) -> usize {
        self.shared.blocks.len()
    }

    /// The raw block, for inspecting or seeding state.
    ///
    /// # Panics
    /// If `core` is out of range.
    #[must_use]
    pub fn block(&self, core: usize) -> &ControlBlock {
        &self.shared.blocks[core]
    }

    /// What user space last published for `core`.
    ///
    /// # Panics
    /// If `core` is out of range.
    #[must_use]
    pub fn directive(&self, core: usize) -> Directive {
        self.block(core).load_directive()
    }

    /// Apply the pending directive on `core`, if any.
    ///
    /// # Panics
    /// If `core` is out of range.
    #[must_use]
    pub fn commit(&self, core: usize) -> Option<Directive> {
        let block = self.block(core);
        let directive = block.load_directive();
        if directive.generation == block.last_committed_generation() {
            return None;
        }
        block.commit(directive.generation);
        Some(directive)
    }

    /// Apply every pending directive; returns how many were applied.
    #[must_use]
    pub fn commit_all(&self) -> usize {
        (0..self.num_cores())
            .filter(|&core| self.commit(core).is_some())
            .count()
    }

    /// Interrupt batches received so far, oldest first.
    #[must_use]
    pub fn interrupt_batches(&self) -> Vec<CoreSet> {
        self.shared
            .batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Fail the next `count` interrupt deliveries.
    pub fn fail_next_deliveries(&self, count: usize) {
        self.shared
            .failing_deliveries
            .store(count, Ordering::Relaxed);
    }

    /// Refuse (or allow again) mapping the control blocks.
    pub fn refuse_mapping(&self, refuse: bool) {
        self.shared.refuse_mapping.store(refuse, Ordering::Relaxed);
    }

    /// Mappings handed out and not yet released, observers included.
    #[must_use]
    pub fn live_regions(&self) -> usize {
        self.shared.live_regions.load(Ordering::Acquire)
    }

    /// Map the blocks for reading without claiming ownership.
    ///
    /// # Errors
    /// As [`Backend::map`], except that an existing owner is no obstacle.
    pub fn observe(&self, num_cores: usize) -> io::Result<SimRegion> {
        self.check_mappable(num_cores)?;
        Ok(self.region(num_cores, false))
    }

    fn check_mappable(&self, num_cores: usize) -> io::Result<()> {
        if self.shared.refuse_mapping.load(Ordering::Relaxed) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        if num_cores > self.num_cores() {
            return Err(io::Error::from(io::ErrorKind::InvalidInput));
        }
        Ok(())
    }

    fn region(&self, num_cores: usize, owner: bool) -> SimRegion {
        self.shared.live_regions.fetch_add(1, Ordering::AcqRel);
        SimRegion {
            shared: Arc::clone(&self.shared),
            cores: num_cores,
            owner,
        }
    }
}

impl Backend for SimulatedKernel {
    type Region = SimRegion;

    fn map(&mut self, num_cores: usize) -> io::Result<SimRegion> {
        self.check_mappable(num_cores)?;
        if self.shared.owned.swap(true, Ordering::AcqRel) {
            return Err(io::Error::from(io::ErrorKind::ResourceBusy));
        }
        Ok(self.region(num_cores, true))
    }

    fn send_interrupts(&mut self, cores: &CoreSet) -> io::Result<()> {
        let failing = &self.shared.failing_deliveries;
        if failing
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(io::Error::other("simulated interrupt delivery failure"));
        }
        self.shared
            .batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(*cores);
        Ok(())
    }
}

/// A mapping of the simulated blocks.
#[derive(Debug)]
pub struct SimRegion {
    shared: Arc<Shared>,
    cores: usize,
    owner: bool,
}

impl Deref for SimRegion {
    type Target = [ControlBlock];

    fn deref(&self) -> &[ControlBlock] {
        &self.shared.blocks[..self.cores]
    }
}

impl Drop for SimRegion {
    fn drop(&mut self) {
        if self.owner {
            self.shared.owned.store(false, Ordering::Release);
        }
        self.shared.live_regions.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ksched_abi::{Command, CommandKind};

    #[test]
    fn commits_only_new_directives() {
        let kernel = SimulatedKernel::new(2);
        assert_eq!(kernel.commit(0), None);

        kernel.block(0).publish(Command::run(), 99, 1);
        let applied = kernel.commit(0).unwrap();
        assert_eq!(applied.command.kind(), Some(CommandKind::Run));
        assert_eq!(applied.tid, 99);
        assert_eq!(kernel.block(0).last_committed_generation(), 1);

        assert_eq!(kernel.commit(0), None);
        assert_eq!(kernel.commit_all(), 0);
    }

    #[test]
    fn delivery_failures_are_counted_down() {
        let mut kernel = SimulatedKernel::new(1);
        kernel.fail_next_deliveries(1);
        let set: CoreSet = [0].into_iter().collect();
        assert!(kernel.send_interrupts(&set).is_err());
        assert!(kernel.send_interrupts(&set).is_ok());
        assert_eq!(kernel.interrupt_batches(), vec![set]);
    }

    #[test]
    fn regions_are_tracked() {
        let mut kernel = SimulatedKernel::new(4);
        let region = kernel.map(4).unwrap();
        assert_eq!(region.len(), 4);
        assert_eq!(kernel.live_regions(), 1);
        drop(region);
        assert_eq!(kernel.live_regions(), 0);

        assert!(kernel.map(5).is_err());
        kernel.refuse_mapping(true);
        assert!(kernel.map(1).is_err());
    }

    #[test]
    fn one_owner_at_a_time() {
        let mut kernel = SimulatedKernel::new(2);
        let owner = kernel.map(2).unwrap();
        let err = kernel.clone().map(2).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ResourceBusy);

        // observers do not need ownership and do not take it
        let observer = kernel.observe(2).unwrap();
        assert_eq!(kernel.live_regions(), 2);

        drop(owner);
        let next = kernel.map(2).unwrap();
        assert_eq!(next.len(), 2);
        drop(observer);
        assert_eq!(kernel.live_regions(), 1);
    }
}
