use bitfield_struct::bitfield;

/// Directive kinds understood by the kernel module.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Park the core in its idle loop.
    Idle = 0,
    /// Switch the core to the task named by the block's `tid`.
    Run = 1,
}

impl CommandKind {
    /// Decode a raw kind byte; unknown values yield `None`.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Idle),
            1 => Some(Self::Run),
            _ => None,
        }
    }
}

/// The `cmd` word of a [`ControlBlock`](crate::ControlBlock).
///
/// Layout (LSB→MSB):
/// - bits 0..7: directive kind, see [`CommandKind`]
/// - bits 8..31: reserved (must be zero)
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct Command {
    /// Bits 0–7 — raw [`CommandKind`] discriminant.
    #[bits(8)]
    pub kind_raw: u8,

    /// Bits 8–31 — Reserved (must be 0).
    #[bits(24, default = 0)]
    _reserved_8_31: u32,
}

impl Command {
    /// Encode a well-formed command of the given kind.
    #[must_use]
    pub const fn from_kind(kind: CommandKind) -> Self {
        Self::new().with_kind_raw(kind as u8)
    }

    /// The idle directive.
    #[must_use]
    pub const fn idle() -> Self {
        Self::from_kind(CommandKind::Idle)
    }

    /// The run directive; the task travels in the block's `tid` field.
    #[must_use]
    pub const fn run() -> Self {
        Self::from_kind(CommandKind::Run)
    }

    /// Decoded kind, or `None` if the word is malformed.
    #[must_use]
    pub const fn kind(self) -> Option<CommandKind> {
        if self.into_bits() >> 8 != 0 {
            return None;
        }
        CommandKind::from_raw(self.kind_raw())
    }
}

const _: () = assert!(size_of::<Command>() == 4);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_kind_in_low_byte() {
        assert_eq!(Command::idle().into_bits(), 0);
        assert_eq!(Command::run().into_bits(), 1);
        assert_eq!(Command::idle().kind(), Some(CommandKind::Idle));
        assert_eq!(Command::run().kind(), Some(CommandKind::Run));
    }

    #[test]
    fn rejects_unknown_kinds_and_reserved_bits() {
        assert_eq!(Command::from_bits(7).kind(), None);
        assert_eq!(Command::from_bits(1 << 8).kind(), None);
        assert_eq!(Command::from_bits((1 << 31) | 1).kind(), None);
    }
}
