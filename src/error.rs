//! Error taxonomy shared by every fallible operation in the crate.
//!
//! Transport failures are caught at the call boundary: the transport's own
//! error is rendered into the message text and refined into a domain code
//! where its [`ErrorKind`](embedded_hal::i2c::ErrorKind) allows it.

use core::fmt;

pub type Result<T> = core::result::Result<T, Error>;

/// Flat failure taxonomy.
///
/// The operation supplies a base code naming what was attempted; the
/// transport's error kind refines it into a more specific bus condition when
/// one is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorCode {
    FailedToRead,
    FailedToWrite,
    DeviceNotFound,
    HardwareFailure,
    DeviceNotResponding,
    BusBusy,
    NackReceived,
    Timeout,
    InvalidAddress,
    DataOverrun,
    ArbitrationLost,
    AccessDenied,
    UnsupportedOperation,
    InvalidData,
    RetryLimitExceeded,
    UnexpectedError,
    NotImplemented,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::FailedToRead => "FAILED_TO_READ",
            ErrorCode::FailedToWrite => "FAILED_TO_WRITE",
            ErrorCode::DeviceNotFound => "DEVICE_NOT_FOUND",
            ErrorCode::HardwareFailure => "HARDWARE_FAILURE",
            ErrorCode::DeviceNotResponding => "DEVICE_NOT_RESPONDING",
            ErrorCode::BusBusy => "BUS_BUSY",
            ErrorCode::NackReceived => "NACK_RECEIVED",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::InvalidAddress => "INVALID_ADDRESS",
            ErrorCode::DataOverrun => "DATA_OVERRUN",
            ErrorCode::ArbitrationLost => "ARBITRATION_LOST",
            ErrorCode::AccessDenied => "ACCESS_DENIED",
            ErrorCode::UnsupportedOperation => "UNSUPPORTED_OPERATION",
            ErrorCode::InvalidData => "INVALID_DATA",
            ErrorCode::RetryLimitExceeded => "RETRY_LIMIT_EXCEEDED",
            ErrorCode::UnexpectedError => "UNEXPECTED_ERROR",
            ErrorCode::NotImplemented => "NOT_IMPLEMENTED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure code plus the human-readable text captured at the point of
/// failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct Error {
    code: ErrorCode,
    message: String,
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Map a transport failure onto the taxonomy.
    ///
    /// Known bus conditions refine `base`; anything else keeps it and only
    /// captures the transport's rendering.
    pub(crate) fn transport<E: embedded_hal::i2c::Error>(base: ErrorCode, err: &E) -> Self {
        use embedded_hal::i2c::ErrorKind;

        let code = match err.kind() {
            ErrorKind::Bus => ErrorCode::HardwareFailure,
            ErrorKind::ArbitrationLoss => ErrorCode::ArbitrationLost,
            ErrorKind::NoAcknowledge(_) => ErrorCode::NackReceived,
            ErrorKind::Overrun => ErrorCode::DataOverrun,
            _ => base,
        };
        Self::new(code, format!("{:?}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};

    #[derive(Debug)]
    struct Kind(ErrorKind);

    impl embedded_hal::i2c::Error for Kind {
        fn kind(&self) -> ErrorKind {
            self.0
        }
    }

    #[test]
    fn transport_kinds_refine_the_base_code() {
        let cases = [
            (ErrorKind::Bus, ErrorCode::HardwareFailure),
            (ErrorKind::ArbitrationLoss, ErrorCode::ArbitrationLost),
            (
                ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
                ErrorCode::NackReceived,
            ),
            (ErrorKind::Overrun, ErrorCode::DataOverrun),
            (ErrorKind::Other, ErrorCode::FailedToRead),
        ];
        for (kind, expected) in cases {
            let err = Error::transport(ErrorCode::FailedToRead, &Kind(kind));
            assert_eq!(err.code(), expected);
        }
    }

    #[test]
    fn display_is_code_then_message() {
        let err = Error::new(ErrorCode::InvalidAddress, "0x80 is not a 7-bit address");
        assert_eq!(
            err.to_string(),
            "INVALID_ADDRESS: 0x80 is not a 7-bit address"
        );
        assert_eq!(err.message(), "0x80 is not a 7-bit address");
    }
}
