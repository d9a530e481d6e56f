use crate::{Backend, Channel, Config, DevKsched, KschedError};
use log::{info, warn};

/// Owner of the one channel a scheduler subsystem holds.
///
/// Starts uninitialized; [`init`](Self::init) establishes the channel and
/// [`teardown`](Self::teardown) releases it. Pass it (or the [`Channel`] it
/// hands out) by reference to whatever issues directives.
#[derive(Debug)]
pub struct Ksched<B: Backend> {
    channel: Option<Channel<B>>,
}

impl<B: Backend> Default for Ksched<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> Ksched<B> {
    #[must_use]
    pub const fn new() -> Self {
        Self { channel: None }
    }

    /// Establish the channel over the backend produced by `open`.
    ///
    /// `open` only runs once the context is known to be uninitialized and the
    /// configuration is valid. Whatever it acquired is released again if the
    /// mapping fails.
    ///
    /// # Errors
    /// - [`KschedError::AlreadyInitialized`] if a channel is live; it is left untouched.
    /// - [`KschedError::InvalidConfig`], or any error from `open`.
    /// - [`KschedError::MappingFailed`].
    pub fn init_with<F>(&mut self, config: &Config, open: F) -> Result<&mut Channel<B>, KschedError>
    where
        F: FnOnce(&Config) -> Result<B, KschedError>,
    {
        if self.channel.is_some() {
            warn!("refusing to initialize a live ksched channel");
            return Err(KschedError::AlreadyInitialized);
        }
        config.validate()?;

        let backend = open(config)?;
        let channel = Channel::open(backend, config)?;
        Ok(self.channel.insert(channel))
    }

    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.channel.is_some()
    }

    #[must_use]
    pub const fn channel(&self) -> Option<&Channel<B>> {
        self.channel.as_ref()
    }

    pub const fn channel_mut(&mut self) -> Option<&mut Channel<B>> {
        self.channel.as_mut()
    }

    /// Unmap the control blocks and release the backend.
    ///
    /// Returns `false` if there was nothing to tear down.
    pub fn teardown(&mut self) -> bool {
        let Some(channel) = self.channel.take() else {
            return false;
        };
        info!("tearing down ksched channel");
        drop(channel);
        true
    }
}

impl Ksched<DevKsched> {
    /// Open the device named in `config` and establish the channel.
    ///
    /// # Errors
    /// As [`init_with`](Self::init_with), plus
    /// [`KschedError::ChannelUnavailable`] if the device cannot be opened.
    pub fn init(&mut self, config: &Config) -> Result<&mut Channel<DevKsched>, KschedError> {
        self.init_with(config, |config| DevKsched::open(config.device_path()))
    }
}
