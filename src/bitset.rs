//! A fixed-width bitset addressed by bit index.

/// `BITS` flags packed into one machine word.
///
/// `BITS` outside `1..=64` fails the build.  Out-of-range indices at runtime
/// are a caller bug and panic, matching slice indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CompactBitset<const BITS: usize> {
    bits: u64,
}

impl<const BITS: usize> CompactBitset<BITS> {
    const VALID: () = assert!(
        BITS >= 1 && BITS <= 64,
        "CompactBitset supports widths 1..=64"
    );
    const FITS_BYTE: () = assert!(BITS <= 8, "byte conversion requires a width of at most 8");

    /// An empty set.
    pub const fn new() -> Self {
        let () = Self::VALID;
        Self { bits: 0 }
    }

    pub const fn capacity() -> usize {
        BITS
    }

    fn mask(index: usize) -> u64 {
        assert!(index < BITS, "bit index out of range");
        1 << index
    }

    pub fn get(&self, index: usize) -> bool {
        self.bits & Self::mask(index) != 0
    }

    pub fn set(&mut self, index: usize) {
        self.bits |= Self::mask(index);
    }

    pub fn reset(&mut self, index: usize) {
        self.bits &= !Self::mask(index);
    }

    pub fn assign(&mut self, index: usize, value: bool) {
        if value {
            self.set(index);
        } else {
            self.reset(index);
        }
    }

    pub fn toggle(&mut self, index: usize) {
        self.bits ^= Self::mask(index);
    }

    /// Number of set bits.
    pub fn count(&self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn clear(&mut self) {
        self.bits = 0;
    }

    /// The set as a raw byte.  Only available for widths up to 8.
    pub fn to_byte(self) -> u8 {
        let () = Self::FITS_BYTE;
        self.bits as u8
    }

    /// Build a set from a raw byte; bits beyond the width are dropped.
    /// Only available for widths up to 8.
    pub fn from_byte(byte: u8) -> Self {
        let () = Self::FITS_BYTE;
        let mask = if BITS == 8 { 0xff } else { (1u8 << BITS) - 1 };
        Self {
            bits: u64::from(byte & mask),
        }
    }
}
