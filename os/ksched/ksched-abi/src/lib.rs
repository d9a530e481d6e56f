//! # ksched ABI
//!
//! The fixed contract between the user-space scheduler and the `ksched`
//! kernel module. Both sides compile against these definitions; nothing in
//! here performs I/O.
//!
//! ## Shared Region
//!
//! The module exposes a character device ([`DEVICE_PATH`]). Mapping it
//! yields one [`ControlBlock`] per core, laid out back-to-back:
//!
//! ```text
//! offset 0                64               128                 64 * n
//! ┌────────────────────┬────────────────────┬─────┬────────────────────┐
//! │ ControlBlock[0]    │ ControlBlock[1]    │ ... │ ControlBlock[n-1]  │
//! │ issued_gen   (usr) │                    │     │                    │
//! │ last_gen     (krn) │                    │     │                    │
//! │ cmd          (usr) │                    │     │                    │
//! │ tid          (usr) │                    │     │                    │
//! │ idle_hint    (usr) │                    │     │                    │
//! └────────────────────┴────────────────────┴─────┴────────────────────┘
//! ```
//!
//! Every field has exactly one writer. User space owns the command fields
//! and the issued generation; the kernel owns the committed generation.
//!
//! ## Generation Protocol
//!
//! 1. User space writes [`Command`] and task id (relaxed).
//! 2. User space stores the new issued generation (release).
//! 3. The kernel observes `issued_gen != last_gen` (acquire), applies the
//!    directive, and stores `last_gen = issued_gen` (release).
//! 4. User space acquire-loads `last_gen`; equality with the generation it
//!    issued means the directive was applied.
//!
//! ## Features
//!
//! * `kernel`: builds `ControlBlock::commit`, the kernel's write of the
//!   committed generation. User-space builds leave it off.
//!
//! ## Interrupts
//!
//! Cores are woken in batches through a single [`KSCHED_IOC_INTR`] ioctl
//! carrying an [`IntrReq`] that points at a [`CoreSet`] bitmask.

#![cfg_attr(not(test), no_std)]

mod command;
mod control_block;
mod core_set;
mod ioctl;

pub use command::{Command, CommandKind};
pub use control_block::{ControlBlock, Directive};
pub use core_set::{CORE_SET_WORDS, CoreSet};
pub use ioctl::{IntrReq, KSCHED_IOC_INTR, KSCHED_MAGIC};

/// Device node exposed by the kernel module.
pub const DEVICE_PATH: &str = "/dev/ksched";

/// Maximum number of cores the shared region can describe.
pub const NCPU: usize = 256;
