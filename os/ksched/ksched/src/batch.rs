use crate::KschedError;
use ksched_abi::CoreSet;
use log::{debug, warn};
use std::io;

/// Cores waiting for a wake interrupt.
///
/// Marks accumulate until an explicit [`flush`](Self::flush), which hands the
/// whole set to one privileged call and then empties it whatever the outcome.
#[derive(Debug, Default)]
pub struct InterruptBatch {
    pending: CoreSet,
}

impl InterruptBatch {
    pub const fn new() -> Self {
        Self {
            pending: CoreSet::new(),
        }
    }

    /// Queue `core`. Marking a queued core again is a no-op.
    pub const fn mark(&mut self, core: u32) {
        self.pending.insert(core);
    }

    pub const fn pending(&self) -> &CoreSet {
        &self.pending
    }

    /// Deliver the batch through `deliver` and clear it.
    ///
    /// An empty batch skips `deliver`. Returns the number of cores in the
    /// delivered batch.
    pub fn flush<F>(&mut self, deliver: F) -> Result<usize, KschedError>
    where
        F: FnOnce(&CoreSet) -> io::Result<()>,
    {
        if self.pending.is_empty() {
            return Ok(0);
        }

        let count = self.pending.len();
        let outcome = deliver(&self.pending);
        self.pending.clear();

        match outcome {
            Ok(()) => {
                debug!("delivered wake interrupts to {count} cores");
                Ok(count)
            }
            Err(e) => {
                warn!("wake interrupt batch of {count} cores failed: {e}");
                Err(KschedError::DeliveryFailed(e))
            }
        }
    }
}
