use core::fmt;
use std::time::Duration;

use embedded_hal::i2c::{I2c, SevenBitAddress};

use crate::bus::{BusController, Endianness, RegisterPointer};
use crate::error::{Error, ErrorCode, Result};

/// A validated 7-bit device address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceAddress(u8);

impl DeviceAddress {
    /// Validate a raw byte as a 7-bit address.
    pub fn new(raw: u8) -> Result<Self> {
        if raw < 0x80 {
            Ok(Self(raw))
        } else {
            Err(Error::new(
                ErrorCode::InvalidAddress,
                format!("0x{raw:02x} is not a 7-bit address"),
            ))
        }
    }

    /// Compile-time constructor for address literals; an out-of-range value
    /// fails constant evaluation.
    pub const fn new_const(raw: u8) -> Self {
        assert!(raw < 0x80, "7-bit device addresses are 0..=0x7f");
        Self(raw)
    }

    pub const fn raw(self) -> u8 {
        self.0
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

/// Types usable as a device address: [`DeviceAddress`] itself, or an
/// enumeration whose storage is exactly one byte (`#[repr(u8)]`).
///
/// The width requirement is checked at build time through `WIDTH_CHECK`;
/// binding a wider type to a [`Device`] fails the build, which keeps address
/// constants from one chip family out of another's driver.
pub trait IntoAddress: Copy {
    #[doc(hidden)]
    const WIDTH_CHECK: () = assert!(
        core::mem::size_of::<Self>() == 1,
        "device address types must be exactly one byte wide"
    );

    fn into_address(self) -> DeviceAddress;
}

impl IntoAddress for DeviceAddress {
    fn into_address(self) -> DeviceAddress {
        self
    }
}

/// One device address bound to a bus controller.
///
/// Forwards the controller's read/write surface with the address curried in.
/// Holds no state beyond the address and the bus reference and does not own
/// the bus's lifetime.
pub struct Device<'a, T, A> {
    bus: &'a BusController<T>,
    addr: A,
}

impl<T, A: Copy> Clone for Device<'_, T, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, A: Copy> Copy for Device<'_, T, A> {}

impl<'a, T, A> Device<'a, T, A>
where
    T: I2c<SevenBitAddress> + Send,
    A: IntoAddress,
{
    pub fn new(bus: &'a BusController<T>, addr: A) -> Self {
        let () = A::WIDTH_CHECK;
        Self { bus, addr }
    }

    pub fn address(&self) -> DeviceAddress {
        self.addr.into_address()
    }

    pub fn bus(&self) -> &'a BusController<T> {
        self.bus
    }

    pub fn read_byte<R: Into<RegisterPointer>>(&self, register: R) -> Result<u8> {
        self.bus.read_byte(self.addr, register)
    }

    pub fn read_fixed<const N: usize, R: Into<RegisterPointer>>(
        &self,
        register: R,
    ) -> Result<[u8; N]> {
        self.bus.read_fixed(self.addr, register)
    }

    pub fn read_buffer<R: Into<RegisterPointer>>(&self, register: R, buf: &mut [u8]) -> Result<()> {
        self.bus.read_buffer(self.addr, register, buf)
    }

    pub fn read_i8<R: Into<RegisterPointer>>(&self, register: R) -> Result<i8> {
        self.bus.read_i8(self.addr, register)
    }

    pub fn read_i16<R: Into<RegisterPointer>>(
        &self,
        register: R,
        endianness: Endianness,
    ) -> Result<i16> {
        self.bus.read_i16(self.addr, register, endianness)
    }

    pub fn read_i32<R: Into<RegisterPointer>>(
        &self,
        register: R,
        endianness: Endianness,
    ) -> Result<i32> {
        self.bus.read_i32(self.addr, register, endianness)
    }

    pub fn write_byte<R: Into<RegisterPointer>>(&self, register: R, value: u8) -> Result<()> {
        self.bus.write_byte(self.addr, register, value)
    }

    pub fn write_buffer<R: Into<RegisterPointer>>(&self, register: R, data: &[u8]) -> Result<()> {
        self.bus.write_buffer(self.addr, register, data)
    }

    pub fn sleep(&self, duration: Duration) {
        self.bus.sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::i2c::{Mock, Transaction};

    #[test]
    fn address_validation() {
        assert_eq!(DeviceAddress::new(0x48).unwrap().raw(), 0x48);
        assert_eq!(DeviceAddress::new(0x7f).unwrap().raw(), 0x7f);
        let err = DeviceAddress::new(0x80).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidAddress);
        assert_eq!(DeviceAddress::new_const(0x20).to_string(), "0x20");
    }

    #[test]
    fn forwards_with_the_address_curried_in() {
        let expectations = [
            Transaction::write_read(0x48, vec![0x01], vec![0x5a]),
            Transaction::write(0x48, vec![0x02, 0xa5]),
        ];
        let mut mock = Mock::new(&expectations);
        let bus = BusController::attach(mock.clone(), "/dev/i2c-mock");
        let dev = Device::new(&bus, DeviceAddress::new_const(0x48));

        assert_eq!(dev.read_byte(0x01u8).unwrap(), 0x5a);
        dev.write_byte(0x02u8, 0xa5).unwrap();

        mock.done();
    }

    #[test]
    fn one_byte_enums_are_valid_addresses() {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[repr(u8)]
        enum SensorAddress {
            Primary = 0x76,
            Secondary = 0x77,
        }

        impl IntoAddress for SensorAddress {
            fn into_address(self) -> DeviceAddress {
                DeviceAddress::new_const(self as u8)
            }
        }

        let expectations = [Transaction::write_read(0x77, vec![0xd0], vec![0x61])];
        let mut mock = Mock::new(&expectations);
        let bus = BusController::attach(mock.clone(), "/dev/i2c-mock");

        let dev = Device::new(&bus, SensorAddress::Secondary);
        assert_eq!(dev.address().raw(), 0x77);
        assert_eq!(dev.read_byte(0xd0u8).unwrap(), 0x61);
        assert_eq!(SensorAddress::Primary.into_address().raw(), 0x76);

        mock.done();
    }
}
