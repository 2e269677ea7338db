//! Typed flag sets over field-less enums.

use core::fmt;
use core::marker::PhantomData;
use core::ops::{BitOr, BitOrAssign};

/// A field-less enum usable in a [`FlagSet`].
///
/// `ALL` enumerates every variant; `mask` assigns each variant a distinct
/// single-bit mask.
pub trait Flag: Copy + Eq + 'static {
    const ALL: &'static [Self];

    fn mask(self) -> u32;
}

/// A set of [`Flag`] variants packed into one word.
pub struct FlagSet<F> {
    bits: u32,
    _marker: PhantomData<F>,
}

impl<F: Flag> FlagSet<F> {
    pub const fn empty() -> Self {
        Self {
            bits: 0,
            _marker: PhantomData,
        }
    }

    pub fn all() -> Self {
        F::ALL.iter().copied().collect()
    }

    pub fn contains(&self, flag: F) -> bool {
        self.bits & flag.mask() != 0
    }

    pub fn insert(&mut self, flag: F) {
        self.bits |= flag.mask();
    }

    pub fn remove(&mut self, flag: F) {
        self.bits &= !flag.mask();
    }

    pub fn toggle(&mut self, flag: F) {
        self.bits ^= flag.mask();
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn iter(&self) -> impl Iterator<Item = F> + '_ {
        F::ALL.iter().copied().filter(|flag| self.contains(*flag))
    }
}

impl<F: Flag> Default for FlagSet<F> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<F> Clone for FlagSet<F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F> Copy for FlagSet<F> {}

impl<F> PartialEq for FlagSet<F> {
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}

impl<F> Eq for FlagSet<F> {}

impl<F: Flag> From<F> for FlagSet<F> {
    fn from(flag: F) -> Self {
        let mut set = Self::empty();
        set.insert(flag);
        set
    }
}

impl<F: Flag> BitOr<F> for FlagSet<F> {
    type Output = Self;

    fn bitor(mut self, flag: F) -> Self {
        self.insert(flag);
        self
    }
}

impl<F: Flag> BitOr for FlagSet<F> {
    type Output = Self;

    fn bitor(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
            _marker: PhantomData,
        }
    }
}

impl<F: Flag> BitOrAssign<F> for FlagSet<F> {
    fn bitor_assign(&mut self, flag: F) {
        self.insert(flag);
    }
}

impl<F: Flag> FromIterator<F> for FlagSet<F> {
    fn from_iter<I: IntoIterator<Item = F>>(iter: I) -> Self {
        let mut set = Self::empty();
        set.extend(iter);
        set
    }
}

impl<F: Flag> Extend<F> for FlagSet<F> {
    fn extend<I: IntoIterator<Item = F>>(&mut self, iter: I) {
        for flag in iter {
            self.insert(flag);
        }
    }
}

impl<F: Flag + fmt::Debug> fmt::Debug for FlagSet<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
