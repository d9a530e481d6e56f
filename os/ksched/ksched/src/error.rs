use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum KschedError {
    /// The device node could not be opened (module not loaded, no permission).
    #[error("ksched device {path:?} unavailable: {source}")]
    ChannelUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Another process already drives the control blocks.
    #[error("ksched channel is owned by another writer")]
    ChannelBusy,
    /// The control blocks could not be mapped.
    #[error("failed to map the ksched control blocks: {0}")]
    MappingFailed(#[source] io::Error),
    #[error("core {core} out of range (channel drives {num_cores} cores)")]
    InvalidCore { core: u32, num_cores: u32 },
    #[error("ksched channel already initialized")]
    AlreadyInitialized,
    /// An interrupt batch was not (fully) delivered. The batch is gone; re-mark and flush again.
    #[error("interrupt delivery failed: {0}")]
    DeliveryFailed(#[source] io::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}
