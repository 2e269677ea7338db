//! Serialized register access to I2C devices, plus a compact per-pin
//! configuration primitive and a port/pin dispatch layer for I/O expanders.
//!
//! A [`BusController`] owns one bus transport and totally orders every
//! transaction issued through it.  A [`Device`] binds one address to a
//! controller.  Chip drivers (currently the [`Mcp23017`]) sit on top and
//! expose per-pin handles whose operations always re-read the chip's
//! registers.
//!
//! ```
//! use embedded_hal_mock::eh1::i2c::{Mock, Transaction};
//! use portbus::{BusController, Mcp23017, PinMode};
//!
//! let expectations = [
//!     Transaction::write_read(0x20, vec![0x00], vec![0xff]),
//!     Transaction::write(0x20, vec![0x00, 0xf7]),
//! ];
//! let mut transport = Mock::new(&expectations);
//!
//! let bus = BusController::attach(transport.clone(), "/dev/i2c-1");
//! let expander = Mcp23017::new(&bus, false, false, false);
//! expander.split().gpa3.set_mode(PinMode::Output).unwrap();
//!
//! transport.done();
//! ```
//!
//! On Linux, [`LinuxI2c`] opens a real `/dev/i2c-*` node:
//! `BusController::<LinuxI2c>::open("/dev/i2c-1")`.

mod bitset;
mod bus;
mod counter;
pub mod dev;
mod device;
mod error;
mod flags;
#[cfg(target_os = "linux")]
mod linux;
mod pin_config;
#[cfg(test)]
mod testbus;

pub use bitset::CompactBitset;
pub use bus::{
    BusCapability, BusController, Endianness, OpenBus, RegisterPointer, MAX_WRITE_PAYLOAD,
};
pub use counter::{InstanceCounter, InstanceToken};
pub use device::{Device, DeviceAddress, IntoAddress};
pub use error::{Error, ErrorCode, Result};
pub use flags::{Flag, FlagSet};
pub use pin_config::{Level, PinConfig, PinMode, PinValue};

pub use dev::mcp23017::{InterruptMode, Mcp23017, Pin, PinOp, PinOpOutput, Pins, Port};

#[cfg(target_os = "linux")]
pub use linux::{LinuxI2c, LinuxI2cError};
