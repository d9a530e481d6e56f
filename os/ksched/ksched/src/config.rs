use crate::KschedError;
use ksched_abi::{ControlBlock, DEVICE_PATH, NCPU};
use std::path::{Path, PathBuf};

/// Where to find the kernel module and how many cores to drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    device_path: PathBuf,
    num_cores: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// `/dev/ksched`, all [`NCPU`] cores.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new() -> Self {
        Self {
            device_path: PathBuf::from(DEVICE_PATH),
            num_cores: NCPU as u32,
        }
    }

    #[must_use]
    pub fn with_device_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.device_path = path.into();
        self
    }

    #[must_use]
    pub fn with_num_cores(mut self, num_cores: u32) -> Self {
        self.num_cores = num_cores;
        self
    }

    #[must_use]
    pub fn device_path(&self) -> &Path {
        &self.device_path
    }

    #[must_use]
    pub const fn num_cores(&self) -> u32 {
        self.num_cores
    }

    /// Bytes to map for the configured cores.
    #[must_use]
    pub const fn region_len(&self) -> usize {
        self.num_cores as usize * size_of::<ControlBlock>()
    }

    /// # Errors
    /// [`KschedError::InvalidConfig`] for a core count of zero or above [`NCPU`].
    pub const fn validate(&self) -> Result<(), KschedError> {
        if self.num_cores == 0 {
            return Err(KschedError::InvalidConfig("at least one core is required"));
        }
        if self.num_cores as usize > NCPU {
            return Err(KschedError::InvalidConfig("more cores than the shared region holds"));
        }
        Ok(())
    }
}
