//! Device-node transport for Linux, backed by the kernel's `I2C_RDWR`
//! interface.

use core::fmt;
use std::path::Path;

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation, SevenBitAddress};
use i2cdev::core::{I2CMessage, I2CTransfer};
use i2cdev::linux::{LinuxI2CBus, LinuxI2CError, LinuxI2CMessage};

use crate::bus::{BusCapability, OpenBus};
use crate::error::{Error, ErrorCode, Result};
use crate::flags::FlagSet;

/// Transport error carrying the kernel-reported failure.
///
/// No errno refinement happens here; the bus layer keeps the operation's base
/// code and captures the text.
#[derive(Debug)]
pub struct LinuxI2cError(LinuxI2CError);

impl fmt::Display for LinuxI2cError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl embedded_hal::i2c::Error for LinuxI2cError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// One open I2C device node.
///
/// Each [`transaction`](I2c::transaction) becomes a single `I2C_RDWR`
/// transfer; the kernel chains the messages with repeated starts, so a
/// pointer-write followed by a read is one atomic combined transaction on
/// the wire.
pub struct LinuxI2c {
    bus: LinuxI2CBus,
}

impl ErrorType for LinuxI2c {
    type Error = LinuxI2cError;
}

impl I2c<SevenBitAddress> for LinuxI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> core::result::Result<(), Self::Error> {
        let mut messages: Vec<LinuxI2CMessage<'_>> = operations
            .iter_mut()
            .map(|op| match op {
                Operation::Read(buf) => LinuxI2CMessage::read(buf).with_address(u16::from(address)),
                Operation::Write(buf) => {
                    LinuxI2CMessage::write(buf).with_address(u16::from(address))
                }
            })
            .collect();
        self.bus.transfer(&mut messages).map_err(LinuxI2cError)?;
        Ok(())
    }
}

/// Refine an open failure into a domain code through its `io::ErrorKind`.
fn open_code(err: &LinuxI2CError) -> ErrorCode {
    let kind = match err {
        LinuxI2CError::Io(io_err) => io_err.kind(),
        LinuxI2CError::Errno(code) => std::io::Error::from_raw_os_error(*code).kind(),
    };
    match kind {
        std::io::ErrorKind::PermissionDenied => ErrorCode::AccessDenied,
        _ => ErrorCode::DeviceNotFound,
    }
}

impl OpenBus for LinuxI2c {
    fn open(path: &Path) -> Result<Self> {
        let bus = LinuxI2CBus::new(path).map_err(|err| {
            Error::new(
                open_code(&err),
                format!("failed to open {}: {}", path.display(), err),
            )
        })?;
        Ok(Self { bus })
    }

    fn probe(&mut self) -> FlagSet<BusCapability> {
        // A working I2C_RDWR path implies these; the kernel does not expose
        // anything finer through i2cdev.
        [
            BusCapability::SevenBitAddressing,
            BusCapability::RepeatedStart,
            BusCapability::BlockTransfer,
        ]
        .into_iter()
        .collect()
    }
}
