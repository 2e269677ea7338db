//! Per-pin views of an 8-bit register.

use core::marker::PhantomData;

use crate::bitset::CompactBitset;

/// A two-state value stored as one register bit.
pub trait PinValue: Copy + Eq {
    fn from_bit(bit: bool) -> Self;
    fn into_bit(self) -> bool;
}

impl PinValue for bool {
    fn from_bit(bit: bool) -> Self {
        bit
    }

    fn into_bit(self) -> bool {
        self
    }
}

/// Logic level of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Low,
    High,
}

impl PinValue for Level {
    fn from_bit(bit: bool) -> Self {
        if bit {
            Level::High
        } else {
            Level::Low
        }
    }

    fn into_bit(self) -> bool {
        self == Level::High
    }
}

/// Direction of a pin.
///
/// The bit encoding matches the MCP-family IODIR registers: 1 means input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinMode {
    Output,
    Input,
}

impl PinValue for PinMode {
    fn from_bit(bit: bool) -> Self {
        if bit {
            PinMode::Input
        } else {
            PinMode::Output
        }
    }

    fn into_bit(self) -> bool {
        self == PinMode::Input
    }
}

struct PinIndex<const INDEX: u8>;

impl<const INDEX: u8> PinIndex<INDEX> {
    const VALID: () = assert!(INDEX < 8, "pin indices are 0..=7");
}

/// The 8 pin slots of one register byte, viewed as values of type `V`.
///
/// Statically-known indices go through the `*_at::<INDEX>` methods and are
/// checked at build time; runtime indices go through [`pin`](Self::pin) and
/// [`set_pin`](Self::set_pin), where an out-of-range index yields an empty
/// result rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinConfig<V: PinValue> {
    bits: CompactBitset<8>,
    _marker: PhantomData<V>,
}

impl<V: PinValue> Default for PinConfig<V> {
    fn default() -> Self {
        Self::from_raw(0)
    }
}

impl<V: PinValue> PinConfig<V> {
    pub const PIN_COUNT: u8 = 8;

    /// Every pin set to `value`.
    pub fn uniform(value: V) -> Self {
        Self::from_raw(if value.into_bit() { 0xff } else { 0x00 })
    }

    pub fn from_raw(raw: u8) -> Self {
        Self {
            bits: CompactBitset::from_byte(raw),
            _marker: PhantomData,
        }
    }

    pub fn raw(self) -> u8 {
        self.bits.to_byte()
    }

    /// Value of a statically-known pin.
    pub fn pin_at<const INDEX: u8>(self) -> V {
        let () = PinIndex::<INDEX>::VALID;
        V::from_bit(self.bits.get(usize::from(INDEX)))
    }

    /// Value of a runtime pin index, `None` if out of range.
    pub fn pin(self, index: u8) -> Option<V> {
        (index < Self::PIN_COUNT).then(|| V::from_bit(self.bits.get(usize::from(index))))
    }

    /// Set a statically-known pin.
    pub fn set_pin_at<const INDEX: u8>(&mut self, value: V) {
        let () = PinIndex::<INDEX>::VALID;
        self.bits.assign(usize::from(INDEX), value.into_bit());
    }

    /// Set a runtime pin index; out of range is a no-op reported as `false`.
    pub fn set_pin(&mut self, index: u8, value: V) -> bool {
        if index < Self::PIN_COUNT {
            self.bits.assign(usize::from(index), value.into_bit());
            true
        } else {
            false
        }
    }

    /// Builder form of [`set_pin_at`](Self::set_pin_at); later writes to the
    /// same pin win.
    pub fn with_pin<const INDEX: u8>(mut self, value: V) -> Self {
        self.set_pin_at::<INDEX>(value);
        self
    }

    /// Visit all 8 pins in ascending index order.
    pub fn for_each_pin(self, mut f: impl FnMut(u8, V)) {
        for index in 0..Self::PIN_COUNT {
            f(index, V::from_bit(self.bits.get(usize::from(index))));
        }
    }
}

impl<V: PinValue> From<PinConfig<V>> for u8 {
    fn from(config: PinConfig<V>) -> u8 {
        config.raw()
    }
}
