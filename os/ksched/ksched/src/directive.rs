use ksched_abi::CommandKind;
use std::num::NonZeroI32;

/// A kernel thread the scheduler may place on a core.
///
/// Crosses the shared boundary as its thread id; `0` is reserved for "no task".
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TaskHandle(NonZeroI32);

impl TaskHandle {
    /// Wrap a thread id. Returns `None` for non-positive ids.
    #[must_use]
    pub const fn from_tid(tid: i32) -> Option<Self> {
        if tid <= 0 {
            return None;
        }
        match NonZeroI32::new(tid) {
            Some(tid) => Some(Self(tid)),
            None => None,
        }
    }

    #[must_use]
    pub const fn tid(self) -> i32 {
        self.0.get()
    }
}

/// Where a core is in its directive cycle.
///
/// ```text
/// Idle --run--> RunPending --commit--> Running --set_idle--> IdlePending --commit--> Idle
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CoreState {
    Idle,
    RunPending,
    Running,
    IdlePending,
}

impl CoreState {
    pub(crate) const fn new(last: CommandKind, applied: bool) -> Self {
        match (last, applied) {
            (CommandKind::Idle, true) => Self::Idle,
            (CommandKind::Idle, false) => Self::IdlePending,
            (CommandKind::Run, true) => Self::Running,
            (CommandKind::Run, false) => Self::RunPending,
        }
    }

    /// `true` while a directive is issued but not yet confirmed.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::RunPending | Self::IdlePending)
    }
}
