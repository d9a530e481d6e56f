//! # ksched
//!
//! User-space side of the channel between a cluster scheduler and the
//! `ksched` kernel module, which parks, wakes, or switches cores on request
//! without waiting for the kernel's scheduling tick.
//!
//! ## Overview
//!
//! ```text
//!  policy layer
//!      │ set_idle / run                 mark_pending / flush_pending
//!      ▼                                          │
//! ┌──────────────────────────┐          ┌─────────▼─────────┐
//! │ Channel                  │          │ InterruptBatch    │
//! │  GenerationTracker ──┐   │          │  CoreSet          │
//! └──────────────────────┼───┘          └─────────┬─────────┘
//!                        │ publish (release)      │ one ioctl
//! ┌──────────────────────▼───────────────┐        ▼
//! │ ControlBlock[0..n]  (shared mapping) │◄── ksched module
//! └──────────────────────────────────────┘   commits last_gen
//! ```
//!
//! * **Directives** ([`Channel::set_idle`], [`Channel::run`]) bump the core's
//!   generation and publish command and generation with release ordering.
//!   They return immediately.
//! * **Confirmation** ([`Channel::is_applied`]) is one acquire load compared
//!   against the locally tracked generation. A directive counts as applied
//!   only once the kernel wrote its generation back.
//! * **Wake interrupts** ([`Channel::mark_pending`],
//!   [`Channel::flush_pending`]) accumulate in a [`CoreSet`] and go out as a
//!   single privileged call. The set is cleared even when delivery fails.
//!
//! No lock guards the shared region. Each field has a single writer: the
//! kernel owns the committed generation, user space everything else.
//!
//! ## Lifecycle
//!
//! ```rust,no_run
//! use ksched::{Config, DevKsched, Ksched, TaskHandle};
//!
//! let mut ksched = Ksched::<DevKsched>::new();
//! let channel = ksched.init(&Config::new().with_num_cores(8))?;
//!
//! let task = TaskHandle::from_tid(4242).expect("valid tid");
//! channel.run(2, task)?;
//! channel.mark_pending(2)?;
//! channel.flush_pending()?;
//!
//! while !channel.is_applied(2)? {
//!     std::hint::spin_loop();
//! }
//!
//! ksched.teardown();
//! # Ok::<(), ksched::KschedError>(())
//! ```
//!
//! ## Ownership
//!
//! The channel has one user-space writer. [`DevKsched::open`] takes an
//! exclusive lock on the device, so a second process trying to drive the
//! same blocks gets [`KschedError::ChannelBusy`] instead of clobbering the
//! first one's directives. Tools that only want to look use [`inspect()`],
//! which maps the blocks read-only and never claims the channel.
//!
//! ## Backends
//!
//! [`DevKsched`] maps the real device. With the `sim` feature (on by
//! default), `SimulatedKernel` keeps the blocks in process memory and lets
//! tests play the kernel side. Builds that only talk to the device should
//! turn default features off.

#![allow(unsafe_code)]

mod backend;
mod batch;
mod channel;
mod config;
mod context;
mod dev;
mod directive;
mod error;
mod generation;
mod inspect;
#[cfg(feature = "sim")]
pub mod sim;

pub use backend::Backend;
pub use channel::Channel;
pub use config::Config;
pub use context::Ksched;
pub use dev::{DevKsched, MmapRegion};
pub use directive::{CoreState, TaskHandle};
pub use error::KschedError;
pub use inspect::{CoreSnapshot, inspect, snapshot};
pub use ksched_abi::{Command, CommandKind, ControlBlock, CoreSet, Directive, NCPU};
#[cfg(feature = "sim")]
pub use sim::SimulatedKernel;
