//! In-memory transports for exercising the bus layer without hardware.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use embedded_hal::i2c::{ErrorType, I2c, Operation, SevenBitAddress};

use crate::bus::{BusCapability, OpenBus};
use crate::error::Result;
use crate::flags::FlagSet;

#[derive(Debug)]
pub(crate) enum MemBusError {}

impl embedded_hal::i2c::Error for MemBusError {
    fn kind(&self) -> embedded_hal::i2c::ErrorKind {
        match *self {}
    }
}

/// A register-backed bus with an auto-incrementing register pointer per
/// device, like a real register-file chip.  Clones share state, so a test can
/// keep a handle for inspection after handing one to a controller.
///
/// Instrumented: counts completed transactions and records overlapping
/// entries, which a correctly serialized controller never produces.
#[derive(Clone, Default)]
pub(crate) struct MemBus {
    shared: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    in_flight: AtomicBool,
    transactions: AtomicU64,
    overlaps: AtomicU64,
}

#[derive(Default)]
struct State {
    regs: HashMap<u8, [u8; 256]>,
    pointer: HashMap<u8, u8>,
}

impl MemBus {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn transactions(&self) -> u64 {
        self.shared.transactions.load(Ordering::SeqCst)
    }

    pub(crate) fn overlaps(&self) -> u64 {
        self.shared.overlaps.load(Ordering::SeqCst)
    }
}

impl ErrorType for MemBus {
    type Error = MemBusError;
}

impl I2c<SevenBitAddress> for MemBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> core::result::Result<(), Self::Error> {
        if self.shared.in_flight.swap(true, Ordering::SeqCst) {
            self.shared.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        std::thread::yield_now();
        {
            let mut guard = self.shared.state.lock().unwrap();
            let state = &mut *guard;
            for op in operations.iter_mut() {
                match op {
                    Operation::Write(data) => {
                        let Some((reg, payload)) = data.split_first() else {
                            continue;
                        };
                        let file = state.regs.entry(address).or_insert_with(|| [0u8; 256]);
                        let mut at = usize::from(*reg);
                        for byte in payload {
                            file[at % 256] = *byte;
                            at += 1;
                        }
                        state.pointer.insert(address, (at % 256) as u8);
                    }
                    Operation::Read(buf) => {
                        let mut at = usize::from(*state.pointer.get(&address).unwrap_or(&0));
                        let file = state.regs.entry(address).or_insert_with(|| [0u8; 256]);
                        for byte in buf.iter_mut() {
                            *byte = file[at % 256];
                            at += 1;
                        }
                        state.pointer.insert(address, (at % 256) as u8);
                    }
                }
            }
        }
        self.shared.transactions.fetch_add(1, Ordering::SeqCst);
        self.shared.in_flight.store(false, Ordering::SeqCst);
        Ok(())
    }
}

impl OpenBus for MemBus {
    fn open(_path: &Path) -> Result<Self> {
        Ok(Self::new())
    }

    fn probe(&mut self) -> FlagSet<BusCapability> {
        [
            BusCapability::SevenBitAddressing,
            BusCapability::RepeatedStart,
            BusCapability::BlockTransfer,
        ]
        .into_iter()
        .collect()
    }
}
