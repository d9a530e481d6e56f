//! Read-only view of the control blocks.
//!
//! Nothing here writes to the shared region or claims the channel, so a
//! snapshot can be taken while a scheduler owns the device.

use crate::{Config, CoreState, KschedError, dev};
use ksched_abi::{Command, ControlBlock};

/// One control block as it read at a single moment.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CoreSnapshot {
    pub core: u32,
    /// Generation the owner last issued.
    pub issued: u32,
    /// Generation the kernel last applied.
    pub committed: u32,
    pub command: Command,
    pub tid: i32,
    pub idle_hint: u32,
}

impl CoreSnapshot {
    #[must_use]
    pub fn read(core: u32, block: &ControlBlock) -> Self {
        // committed before issued: the owner can only move issued further ahead
        let committed = block.last_committed_generation();
        let directive = block.load_directive();
        Self {
            core,
            issued: directive.generation,
            committed,
            command: directive.command,
            tid: directive.tid,
            idle_hint: block.idle_hint(),
        }
    }

    #[must_use]
    pub const fn is_applied(&self) -> bool {
        self.issued == self.committed
    }

    /// `None` if the command word does not decode.
    #[must_use]
    pub const fn state(&self) -> Option<CoreState> {
        match self.command.kind() {
            Some(kind) => Some(CoreState::new(kind, self.is_applied())),
            None => None,
        }
    }
}

/// Snapshot every block in `blocks`, numbering cores from zero.
#[must_use]
pub fn snapshot(blocks: &[ControlBlock]) -> Vec<CoreSnapshot> {
    (0u32..)
        .zip(blocks)
        .map(|(core, block)| CoreSnapshot::read(core, block))
        .collect()
}

/// Map the device named in `config` read-only and snapshot its blocks.
///
/// # Errors
/// - [`KschedError::InvalidConfig`] for an unusable core count.
/// - [`KschedError::ChannelUnavailable`] if the device cannot be opened.
/// - [`KschedError::MappingFailed`] if the blocks cannot be mapped.
pub fn inspect(config: &Config) -> Result<Vec<CoreSnapshot>, KschedError> {
    config.validate()?;
    let region = dev::map_observer(config.device_path(), config.num_cores() as usize)?;
    Ok(snapshot(&region))
}
