use ksched_abi::CommandKind;

/// Per-core record of what user space last issued.
///
/// Lives in ordinary process memory; the kernel never sees it. A directive is
/// applied once the block's committed generation equals [`issued`](Self::issued).
#[derive(Debug)]
pub struct GenerationTracker {
    issued: Box<[u32]>,
    last_kind: Box<[CommandKind]>,
}

impl GenerationTracker {
    pub fn new(num_cores: usize) -> Self {
        Self {
            issued: vec![0; num_cores].into_boxed_slice(),
            last_kind: vec![CommandKind::Idle; num_cores].into_boxed_slice(),
        }
    }

    /// Adopt the kernel's committed generation so stale state never reads as
    /// a fresh directive.
    pub fn prime(&mut self, core: usize, committed: u32) {
        self.issued[core] = committed;
        self.last_kind[core] = CommandKind::Idle;
    }

    /// Allocate the generation for a new directive.
    ///
    /// Wraps at `u32::MAX`, matching the kernel's unsigned comparison.
    pub fn advance(&mut self, core: usize, kind: CommandKind) -> u32 {
        let next = self.issued[core].wrapping_add(1);
        self.issued[core] = next;
        self.last_kind[core] = kind;
        next
    }

    #[inline]
    pub fn issued(&self, core: usize) -> u32 {
        self.issued[core]
    }

    #[inline]
    pub fn last_kind(&self, core: usize) -> CommandKind {
        self.last_kind[core]
    }
}
