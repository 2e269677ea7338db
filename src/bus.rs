use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use embedded_hal::i2c::{I2c, SevenBitAddress};
use log::{debug, trace};

use crate::counter::{InstanceCounter, InstanceToken};
use crate::device::IntoAddress;
use crate::error::{Error, ErrorCode, Result};
use crate::flags::{Flag, FlagSet};

/// Largest payload accepted by [`BusController::write_buffer`].
///
/// Matches the SMBus block limit; larger writes are rejected as
/// `INVALID_DATA` before touching the bus.
pub const MAX_WRITE_PAYLOAD: usize = 32;

// register prefix (up to 2 bytes) + payload
const FRAME_CAPACITY: usize = MAX_WRITE_PAYLOAD + 2;

static BUS_CONTROLLERS: InstanceCounter = InstanceCounter::new();

/// Register pointer sent ahead of every transfer.
///
/// Most devices use a one-byte register pointer; devices with a 16-bit
/// command word send it split high/low as a two-byte prefix of the same
/// wire pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterPointer {
    Byte(u8),
    Word(u16),
}

impl RegisterPointer {
    fn bytes(self) -> heapless::Vec<u8, 2> {
        let mut prefix = heapless::Vec::new();
        let _ = match self {
            RegisterPointer::Byte(reg) => prefix.extend_from_slice(&[reg]),
            RegisterPointer::Word(cmd) => prefix.extend_from_slice(&cmd.to_be_bytes()),
        };
        prefix
    }
}

impl From<u8> for RegisterPointer {
    fn from(reg: u8) -> Self {
        RegisterPointer::Byte(reg)
    }
}

impl From<u16> for RegisterPointer {
    fn from(cmd: u16) -> Self {
        RegisterPointer::Word(cmd)
    }
}

/// Byte order for multi-byte register values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Native,
    Little,
    Big,
}

impl Endianness {
    fn resolve(self) -> Self {
        match self {
            Endianness::Native => {
                if cfg!(target_endian = "big") {
                    Endianness::Big
                } else {
                    Endianness::Little
                }
            }
            other => other,
        }
    }
}

/// Features reported by the transport's capability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusCapability {
    SevenBitAddressing,
    TenBitAddressing,
    RepeatedStart,
    BlockTransfer,
}

impl Flag for BusCapability {
    const ALL: &'static [Self] = &[
        BusCapability::SevenBitAddressing,
        BusCapability::TenBitAddressing,
        BusCapability::RepeatedStart,
        BusCapability::BlockTransfer,
    ];

    fn mask(self) -> u32 {
        1 << self as u32
    }
}

/// A transport that can be opened from an OS device-node path.
pub trait OpenBus: I2c<SevenBitAddress> + Send + Sized {
    fn open(path: &Path) -> Result<Self>;

    /// Capability probe, run once after open.  Must not fail.
    fn probe(&mut self) -> FlagSet<BusCapability> {
        FlagSet::empty()
    }
}

/// Serialized, fault-reporting access to one shared bus.
///
/// One controller owns one transport.  Every read and write holds the
/// transaction mutex for its whole duration, so all transactions issued
/// through one controller are totally ordered, including transactions to
/// different devices on the same physical bus.  No ordering guarantee spans
/// two controllers.
///
/// Reads are combined transactions (register-pointer write, repeated-start
/// read) and zero-fill the destination first, so a transaction either fully
/// succeeds or fails with no partial-transfer state observable.  The text of
/// the most recent failure is kept in a separate reader/writer-locked slot,
/// so error inspection never blocks transactions.
pub struct BusController<T> {
    path: PathBuf,
    open: AtomicBool,
    transport: Mutex<Option<T>>,
    last_error: RwLock<String>,
    capabilities: FlagSet<BusCapability>,
    _instance: InstanceToken,
}

impl<T: I2c<SevenBitAddress> + Send> BusController<T> {
    /// Open the device node at `path` and probe its capabilities.
    ///
    /// The probe is non-fatal; a transport that reports nothing still opens.
    pub fn open(path: impl AsRef<Path>) -> Result<Self>
    where
        T: OpenBus,
    {
        let path = path.as_ref();
        let mut transport = T::open(path)?;
        let capabilities = transport.probe();
        debug!(
            "opened bus {} (capabilities {:?})",
            path.display(),
            capabilities
        );
        Ok(Self {
            path: path.to_path_buf(),
            open: AtomicBool::new(true),
            transport: Mutex::new(Some(transport)),
            last_error: RwLock::new(String::new()),
            capabilities,
            _instance: BUS_CONTROLLERS.track(),
        })
    }

    /// Bind an already-open transport (in-memory buses, tests).
    pub fn attach(transport: T, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        debug!("attached transport as bus {}", path.display());
        Self {
            path,
            open: AtomicBool::new(true),
            transport: Mutex::new(Some(transport)),
            last_error: RwLock::new(String::new()),
            capabilities: FlagSet::empty(),
            _instance: BUS_CONTROLLERS.track(),
        }
    }

    /// Lock-free open check.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Close the bus and drop the transport.  Idempotent.
    pub fn close(&self) {
        // Clear the flag first so concurrent callers fast-fail instead of
        // queueing on a descriptor that is about to go away.
        if self.open.swap(false, Ordering::AcqRel) {
            debug!("closed bus {}", self.path.display());
        }
        *self.transport.lock().unwrap() = None;
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn capabilities(&self) -> FlagSet<BusCapability> {
        self.capabilities
    }

    /// Text of the most recent failure, empty if none occurred.
    pub fn last_error(&self) -> String {
        self.last_error.read().unwrap().clone()
    }

    /// Number of live controllers in this process.
    pub fn instances() -> usize {
        BUS_CONTROLLERS.count()
    }

    /// Suspend the calling thread.  The transaction mutex is not held.
    pub fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }

    /// Read `buf.len()` bytes from `register` as one combined transaction:
    /// register-pointer write, then a repeated-start read.
    ///
    /// `buf` is zero-filled before the transfer.
    pub fn read_buffer<A, R>(&self, addr: A, register: R, buf: &mut [u8]) -> Result<()>
    where
        A: IntoAddress,
        R: Into<RegisterPointer>,
    {
        buf.fill(0);
        let pointer = register.into().bytes();
        let address = addr.into_address().raw();
        self.transact(ErrorCode::FailedToRead, |transport| {
            transport.write_read(address, &pointer, buf)
        })
    }

    /// Read exactly `N` bytes from `register`.
    pub fn read_fixed<const N: usize, A, R>(&self, addr: A, register: R) -> Result<[u8; N]>
    where
        A: IntoAddress,
        R: Into<RegisterPointer>,
    {
        let mut buf = [0u8; N];
        self.read_buffer(addr, register, &mut buf)?;
        Ok(buf)
    }

    pub fn read_byte<A, R>(&self, addr: A, register: R) -> Result<u8>
    where
        A: IntoAddress,
        R: Into<RegisterPointer>,
    {
        Ok(self.read_fixed::<1, _, _>(addr, register)?[0])
    }

    pub fn read_i8<A, R>(&self, addr: A, register: R) -> Result<i8>
    where
        A: IntoAddress,
        R: Into<RegisterPointer>,
    {
        Ok(self.read_byte(addr, register)? as i8)
    }

    pub fn read_i16<A, R>(&self, addr: A, register: R, endianness: Endianness) -> Result<i16>
    where
        A: IntoAddress,
        R: Into<RegisterPointer>,
    {
        let bytes = self.read_fixed::<2, _, _>(addr, register)?;
        Ok(match endianness.resolve() {
            Endianness::Big => i16::from_be_bytes(bytes),
            _ => i16::from_le_bytes(bytes),
        })
    }

    pub fn read_i32<A, R>(&self, addr: A, register: R, endianness: Endianness) -> Result<i32>
    where
        A: IntoAddress,
        R: Into<RegisterPointer>,
    {
        let bytes = self.read_fixed::<4, _, _>(addr, register)?;
        Ok(match endianness.resolve() {
            Endianness::Big => i32::from_be_bytes(bytes),
            _ => i32::from_le_bytes(bytes),
        })
    }

    pub fn write_byte<A, R>(&self, addr: A, register: R, value: u8) -> Result<()>
    where
        A: IntoAddress,
        R: Into<RegisterPointer>,
    {
        self.write_buffer(addr, register, &[value])
    }

    /// Write `data` to `register` as one contiguous frame
    /// `[register-prefix, data...]` issued as a single message; the wire
    /// format requires register and payload in the same physical write.
    pub fn write_buffer<A, R>(&self, addr: A, register: R, data: &[u8]) -> Result<()>
    where
        A: IntoAddress,
        R: Into<RegisterPointer>,
    {
        let pointer = register.into().bytes();
        let mut frame = heapless::Vec::<u8, FRAME_CAPACITY>::new();
        if frame.extend_from_slice(&pointer).is_err() || frame.extend_from_slice(data).is_err() {
            return Err(self.record(Error::new(
                ErrorCode::InvalidData,
                format!(
                    "write payload of {} bytes exceeds the {}-byte limit",
                    data.len(),
                    MAX_WRITE_PAYLOAD
                ),
            )));
        }
        let address = addr.into_address().raw();
        self.transact(ErrorCode::FailedToWrite, |transport| {
            transport.write(address, &frame)
        })
    }

    /// Run one transaction under the bus mutex, capturing any failure.
    ///
    /// Fast-fails without touching the transport when the bus is not open.
    fn transact<R>(
        &self,
        base: ErrorCode,
        f: impl FnOnce(&mut T) -> core::result::Result<R, T::Error>,
    ) -> Result<R> {
        if !self.is_open() {
            return Err(self.record(self.not_open(base)));
        }
        let mut guard = self.transport.lock().unwrap();
        let transport = match guard.as_mut() {
            Some(transport) => transport,
            // lost a race with close()
            None => return Err(self.record(self.not_open(base))),
        };
        f(transport).map_err(|err| self.record(Error::transport(base, &err)))
    }

    fn not_open(&self, base: ErrorCode) -> Error {
        Error::new(base, format!("bus {} is not open", self.path.display()))
    }

    fn record(&self, err: Error) -> Error {
        trace!("bus {}: {}", self.path.display(), err);
        *self.last_error.write().unwrap() = err.to_string();
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceAddress;
    use crate::testbus::MemBus;
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock, Transaction};

    const DEV: DeviceAddress = DeviceAddress::new_const(0x48);

    #[test]
    fn open_write_read_scenario() {
        let bus = BusController::<MemBus>::open("/dev/i2c-mock").unwrap();
        assert!(bus.is_open());
        assert!(bus.capabilities().contains(BusCapability::RepeatedStart));

        bus.write_byte(DEV, 0x01u8, 0x5a).unwrap();
        assert_eq!(bus.read_byte(DEV, 0x01u8).unwrap(), 0x5a);
        assert!(bus.last_error().is_empty());
    }

    #[test]
    fn round_trip_fixed_widths() {
        let bus = BusController::<MemBus>::open("/dev/i2c-mock").unwrap();

        bus.write_buffer(DEV, 0x10u8, &[0xde]).unwrap();
        assert_eq!(bus.read_fixed::<1, _, _>(DEV, 0x10u8).unwrap(), [0xde]);

        bus.write_buffer(DEV, 0x20u8, &[0xca, 0xfe]).unwrap();
        assert_eq!(
            bus.read_fixed::<2, _, _>(DEV, 0x20u8).unwrap(),
            [0xca, 0xfe]
        );

        bus.write_buffer(DEV, 0x30u8, &[0x01, 0x02, 0x03, 0x04])
            .unwrap();
        assert_eq!(
            bus.read_fixed::<4, _, _>(DEV, 0x30u8).unwrap(),
            [0x01, 0x02, 0x03, 0x04]
        );
    }

    #[test]
    fn closed_bus_fast_fails_without_transport_calls() {
        let transport = MemBus::new();
        let bus = BusController::attach(transport.clone(), "/dev/i2c-mock");
        bus.close();
        bus.close(); // idempotent

        assert!(!bus.is_open());
        let err = bus.read_byte(DEV, 0x01u8).unwrap_err();
        assert_eq!(err.code(), ErrorCode::FailedToRead);
        let err = bus.write_byte(DEV, 0x01u8, 0xaa).unwrap_err();
        assert_eq!(err.code(), ErrorCode::FailedToWrite);
        assert_eq!(transport.transactions(), 0);
        assert!(bus.last_error().contains("not open"));
    }

    #[test]
    fn transactions_are_serialized_across_threads() {
        let transport = MemBus::new();
        let bus = BusController::attach(transport.clone(), "/dev/i2c-mock");

        std::thread::scope(|scope| {
            for _ in 0..2 {
                scope.spawn(|| {
                    for _ in 0..1000 {
                        bus.read_byte(DEV, 0x01u8).unwrap();
                    }
                });
            }
        });

        assert_eq!(transport.transactions(), 2000);
        assert_eq!(transport.overlaps(), 0);
    }

    #[test]
    fn reads_zero_fill_before_the_transfer() {
        let transport = MemBus::new();
        let bus = BusController::attach(transport, "/dev/i2c-mock");
        bus.close();

        let mut buf = [0xffu8; 4];
        let _ = bus.read_buffer(DEV, 0x00u8, &mut buf);
        assert_eq!(buf, [0; 4]);
    }

    #[test]
    fn signed_reads_reassemble_per_endianness() {
        let expectations = [
            Transaction::write_read(0x48, vec![0x10], vec![0x34, 0x12]),
            Transaction::write_read(0x48, vec![0x10], vec![0x12, 0x34]),
            Transaction::write_read(0x48, vec![0x10], vec![0xff, 0xff]),
            Transaction::write_read(0x48, vec![0x20], vec![0x78, 0x56, 0x34, 0x12]),
            Transaction::write_read(0x48, vec![0x20], vec![0x12, 0x34, 0x56, 0x78]),
            Transaction::write_read(0x48, vec![0x30], vec![0x80]),
        ];
        let mut mock = Mock::new(&expectations);
        let bus = BusController::attach(mock.clone(), "/dev/i2c-mock");

        assert_eq!(
            bus.read_i16(DEV, 0x10u8, Endianness::Little).unwrap(),
            0x1234
        );
        assert_eq!(bus.read_i16(DEV, 0x10u8, Endianness::Big).unwrap(), 0x1234);
        assert_eq!(bus.read_i16(DEV, 0x10u8, Endianness::Native).unwrap(), -1);
        assert_eq!(
            bus.read_i32(DEV, 0x20u8, Endianness::Little).unwrap(),
            0x1234_5678
        );
        assert_eq!(
            bus.read_i32(DEV, 0x20u8, Endianness::Big).unwrap(),
            0x1234_5678
        );
        assert_eq!(bus.read_i8(DEV, 0x30u8).unwrap(), -128);

        mock.done();
    }

    #[test]
    fn word_registers_send_a_two_byte_prefix() {
        let expectations = [
            Transaction::write_read(0x48, vec![0x12, 0x34], vec![0xaa]),
            Transaction::write(0x48, vec![0x12, 0x34, 0xbb]),
        ];
        let mut mock = Mock::new(&expectations);
        let bus = BusController::attach(mock.clone(), "/dev/i2c-mock");

        assert_eq!(bus.read_byte(DEV, 0x1234u16).unwrap(), 0xaa);
        bus.write_byte(DEV, 0x1234u16, 0xbb).unwrap();

        mock.done();
    }

    #[test]
    fn oversized_write_is_rejected_before_the_bus() {
        let transport = MemBus::new();
        let bus = BusController::attach(transport.clone(), "/dev/i2c-mock");

        let payload = [0u8; MAX_WRITE_PAYLOAD + 1];
        let err = bus.write_buffer(DEV, 0x00u8, &payload).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidData);
        assert_eq!(transport.transactions(), 0);
    }

    #[test]
    fn transport_failures_are_captured() {
        let expectations = [Transaction::write(0x48, vec![0x01, 0x5a]).with_error(
            ErrorKind::NoAcknowledge(embedded_hal::i2c::NoAcknowledgeSource::Address),
        )];
        let mut mock = Mock::new(&expectations);
        let bus = BusController::attach(mock.clone(), "/dev/i2c-mock");

        let err = bus.write_byte(DEV, 0x01u8, 0x5a).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NackReceived);
        assert!(bus.last_error().starts_with("NACK_RECEIVED"));

        mock.done();
    }
}
