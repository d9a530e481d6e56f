use crate::NCPU;
use core::fmt;

/// Number of 64-bit words in a [`CoreSet`].
pub const CORE_SET_WORDS: usize = NCPU.div_ceil(64);

/// Fixed-size core bitmask, bit `n` of word `n / 64` standing for core `n`.
///
/// Same bit order as the kernel's `cpumask`, so the words can be handed to
/// the module as-is.
#[repr(C)]
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct CoreSet {
    words: [u64; CORE_SET_WORDS],
}

impl CoreSet {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            words: [0; CORE_SET_WORDS],
        }
    }

    /// Add `core`; returns `true` if it was not yet a member.
    ///
    /// # Panics
    /// If `core` is not below [`NCPU`].
    #[inline]
    pub const fn insert(&mut self, core: u32) -> bool {
        let (word, bit) = Self::slot(core);
        let fresh = self.words[word] & bit == 0;
        self.words[word] |= bit;
        fresh
    }

    /// Remove `core`; returns `true` if it was a member.
    ///
    /// # Panics
    /// If `core` is not below [`NCPU`].
    #[inline]
    pub const fn remove(&mut self, core: u32) -> bool {
        let (word, bit) = Self::slot(core);
        let present = self.words[word] & bit != 0;
        self.words[word] &= !bit;
        present
    }

    /// Membership test; cores at or above [`NCPU`] are never members.
    #[inline]
    #[must_use]
    pub const fn contains(&self, core: u32) -> bool {
        if core as usize >= NCPU {
            return false;
        }
        let (word, bit) = Self::slot(core);
        self.words[word] & bit != 0
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    #[inline]
    pub const fn clear(&mut self) {
        self.words = [0; CORE_SET_WORDS];
    }

    /// Members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let mut rest = word;
            core::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let bit = rest.trailing_zeros();
                rest &= rest - 1;
                #[allow(clippy::cast_possible_truncation)]
                let base = i as u32 * 64;
                Some(base + bit)
            })
        })
    }

    /// Raw bitmask words.
    #[must_use]
    pub const fn as_words(&self) -> &[u64; CORE_SET_WORDS] {
        &self.words
    }

    /// Size of the bitmask in bytes.
    #[must_use]
    pub const fn byte_len() -> usize {
        size_of::<[u64; CORE_SET_WORDS]>()
    }

    const fn slot(core: u32) -> (usize, u64) {
        let core = core as usize;
        assert!(core < NCPU, "core id out of range");
        (core / 64, 1 << (core % 64))
    }
}

impl fmt::Debug for CoreSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl Extend<u32> for CoreSet {
    fn extend<I: IntoIterator<Item = u32>>(&mut self, iter: I) {
        for core in iter {
            self.insert(core);
        }
    }
}

impl FromIterator<u32> for CoreSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}
