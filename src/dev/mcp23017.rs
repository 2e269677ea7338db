//! Support for the `MCP23017` "16-Bit I/O Expander with Serial Interface"
//!
//! Datasheet: https://ww1.microchip.com/downloads/en/devicedoc/20001952c.pdf
//!
//! The MCP23017 offers two eight-bit GPIO ports.  It has three address pins,
//! so eight devices can coexist on an I2C bus.  Every pin operation re-reads
//! the affected register from the chip before acting on it; nothing is cached
//! across calls, so a chip shared with another controller is never acted on
//! from stale state.

use embedded_hal::i2c::{I2c, SevenBitAddress};

use crate::bus::BusController;
use crate::counter::{InstanceCounter, InstanceToken};
use crate::device::{Device, DeviceAddress};
use crate::error::Result;
use crate::pin_config::{Level, PinConfig, PinMode, PinValue};

static MCP23017_INSTANCES: InstanceCounter = InstanceCounter::new();

/// One of the two eight-bit ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Port {
    A,
    B,
}

/// Register kinds, resolved per port.
///
/// Addresses are for BANK=0, which is the reset state of the chip (and this
/// driver does not change): port B lives one past port A for every kind.
/// All registers reset to 0x00 except IODIR{A,B}, which reset to 0xFF
/// (making all pins inputs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Register {
    /// IODIR: input/output direction: 0=output; 1=input
    Iodir,
    /// GPINTEN: interrupt-on-change: 0=disable; 1=enable
    Gpinten,
    /// DEFVAL: default values for interrupt-on-change
    Defval,
    /// INTCON: interrupt-on-change config: 0=compare to previous pin value;
    ///   1=compare to corresponding bit in DEFVAL
    Intcon,
    /// GPPU: enables weak internal pull-ups on each pin (when configured as
    ///   an input)
    Gppu,
    /// INTF: interrupt flags: 1=corresponding pin caused the interrupt
    Intf,
    /// INTCAP: value of each pin captured at the time it caused an interrupt
    Intcap,
    /// GPIO: reflects logic level on pins; writing sets the output latches
    Gpio,
}

impl Register {
    fn at(self, port: Port) -> u8 {
        let base = match self {
            Register::Iodir => 0x00,
            Register::Gpinten => 0x04,
            Register::Defval => 0x06,
            Register::Intcon => 0x08,
            Register::Gppu => 0x0c,
            Register::Intf => 0x0e,
            Register::Intcap => 0x10,
            Register::Gpio => 0x12,
        };
        match port {
            Port::A => base,
            Port::B => base + 1,
        }
    }
}

/// Interrupt-on-change behavior of one pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptMode {
    /// No interrupt for this pin.
    Disabled,
    /// Interrupt whenever the pin changes state.
    OnChange,
    /// Interrupt while the pin differs from the given level.
    OnMismatch(Level),
}

/// The closed set of per-pin operations.
///
/// Each variant is one register read-modify-write sequence; the dispatcher
/// matches exhaustively, so adding an operation fails the build until every
/// handler exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinOp {
    GetMode,
    SetMode(PinMode),
    GetLevel,
    SetLevel(Level),
    GetPullUp,
    SetPullUp(bool),
    SetInterrupt(InterruptMode),
    ReadCapturedLevel,
    ReadInterruptFlag,
}

/// Result of a dispatched [`PinOp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinOpOutput {
    Mode(PinMode),
    Level(Level),
    PullUp(bool),
    CapturedLevel(Level),
    InterruptFlag(bool),
    Done,
}

/// `MCP23017` "16-Bit I/O Expander with Serial Interface"
pub struct Mcp23017<'a, T> {
    dev: Device<'a, T, DeviceAddress>,
    _instance: InstanceToken,
}

impl<'a, T: I2c<SevenBitAddress> + Send> Mcp23017<'a, T> {
    /// Bind the expander selected by its three hardware address pins.
    pub fn new(bus: &'a BusController<T>, a0: bool, a1: bool, a2: bool) -> Self {
        let addr =
            DeviceAddress::new_const(0x20 | ((a2 as u8) << 2) | ((a1 as u8) << 1) | (a0 as u8));
        Self {
            dev: Device::new(bus, addr),
            _instance: MCP23017_INSTANCES.track(),
        }
    }

    /// Number of live expander bindings in this process.
    pub fn instances() -> usize {
        MCP23017_INSTANCES.count()
    }

    pub fn address(&self) -> DeviceAddress {
        self.dev.address()
    }

    /// Handles for all sixteen pins.
    pub fn split(&self) -> Pins<'a, T> {
        Pins {
            gpa0: Pin::new(self.dev, Port::A, 0),
            gpa1: Pin::new(self.dev, Port::A, 1),
            gpa2: Pin::new(self.dev, Port::A, 2),
            gpa3: Pin::new(self.dev, Port::A, 3),
            gpa4: Pin::new(self.dev, Port::A, 4),
            gpa5: Pin::new(self.dev, Port::A, 5),
            gpa6: Pin::new(self.dev, Port::A, 6),
            gpa7: Pin::new(self.dev, Port::A, 7),
            gpb0: Pin::new(self.dev, Port::B, 0),
            gpb1: Pin::new(self.dev, Port::B, 1),
            gpb2: Pin::new(self.dev, Port::B, 2),
            gpb3: Pin::new(self.dev, Port::B, 3),
            gpb4: Pin::new(self.dev, Port::B, 4),
            gpb5: Pin::new(self.dev, Port::B, 5),
            gpb6: Pin::new(self.dev, Port::B, 6),
            gpb7: Pin::new(self.dev, Port::B, 7),
        }
    }

    /// Handle for one pin, `None` for `index >= 8`.
    pub fn pin(&self, port: Port, index: u8) -> Option<Pin<'a, T>> {
        (index < 8).then(|| Pin::new(self.dev, port, index))
    }

    /// Current direction of every pin on `port`.
    pub fn port_modes(&self, port: Port) -> Result<PinConfig<PinMode>> {
        self.port_view(port, Register::Iodir)
    }

    /// Current logic level of every pin on `port`.
    pub fn port_levels(&self, port: Port) -> Result<PinConfig<Level>> {
        self.port_view(port, Register::Gpio)
    }

    /// Which pins of `port` caused the pending interrupt.
    pub fn interrupt_flags(&self, port: Port) -> Result<PinConfig<bool>> {
        self.port_view(port, Register::Intf)
    }

    /// Levels captured when the pending interrupt fired.
    pub fn captured_levels(&self, port: Port) -> Result<PinConfig<Level>> {
        self.port_view(port, Register::Intcap)
    }

    fn port_view<V: PinValue>(&self, port: Port, reg: Register) -> Result<PinConfig<V>> {
        Ok(PinConfig::from_raw(self.dev.read_byte(reg.at(port))?))
    }
}

/// All sixteen pins of an expander.
pub struct Pins<'a, T> {
    pub gpa0: Pin<'a, T>,
    pub gpa1: Pin<'a, T>,
    pub gpa2: Pin<'a, T>,
    pub gpa3: Pin<'a, T>,
    pub gpa4: Pin<'a, T>,
    pub gpa5: Pin<'a, T>,
    pub gpa6: Pin<'a, T>,
    pub gpa7: Pin<'a, T>,
    pub gpb0: Pin<'a, T>,
    pub gpb1: Pin<'a, T>,
    pub gpb2: Pin<'a, T>,
    pub gpb3: Pin<'a, T>,
    pub gpb4: Pin<'a, T>,
    pub gpb5: Pin<'a, T>,
    pub gpb6: Pin<'a, T>,
    pub gpb7: Pin<'a, T>,
}

/// One pin of one port.
///
/// A pin handle carries no register state; every operation re-reads the
/// register byte, changes one bit and writes the byte back.  Level and
/// pull-up are only meaningful once the pin is in the matching mode (output
/// and input respectively); that precondition is the caller's contract, the
/// chip accepts the writes either way.
pub struct Pin<'a, T> {
    dev: Device<'a, T, DeviceAddress>,
    port: Port,
    index: u8,
}

impl<T> Clone for Pin<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Pin<'_, T> {}

impl<'a, T: I2c<SevenBitAddress> + Send> Pin<'a, T> {
    fn new(dev: Device<'a, T, DeviceAddress>, port: Port, index: u8) -> Self {
        assert!(index < 8);
        Self { dev, port, index }
    }

    pub fn port(&self) -> Port {
        self.port
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    /// Execute one operation from the closed set.
    pub fn dispatch(&self, op: PinOp) -> Result<PinOpOutput> {
        match op {
            PinOp::GetMode => self.mode().map(PinOpOutput::Mode),
            PinOp::SetMode(mode) => self.set_mode(mode).map(|()| PinOpOutput::Done),
            PinOp::GetLevel => self.level().map(PinOpOutput::Level),
            PinOp::SetLevel(level) => self.set_level(level).map(|()| PinOpOutput::Done),
            PinOp::GetPullUp => self.is_pull_up_enabled().map(PinOpOutput::PullUp),
            PinOp::SetPullUp(enable) => self.set_pull_up(enable).map(|()| PinOpOutput::Done),
            PinOp::SetInterrupt(mode) => self.configure_interrupt(mode).map(|()| PinOpOutput::Done),
            PinOp::ReadCapturedLevel => self.captured_level().map(PinOpOutput::CapturedLevel),
            PinOp::ReadInterruptFlag => self.interrupt_flag().map(PinOpOutput::InterruptFlag),
        }
    }

    pub fn mode(&self) -> Result<PinMode> {
        self.read_slot(Register::Iodir)
    }

    pub fn set_mode(&self, mode: PinMode) -> Result<()> {
        self.update_register(Register::Iodir, mode)
    }

    pub fn level(&self) -> Result<Level> {
        self.read_slot(Register::Gpio)
    }

    pub fn set_level(&self, level: Level) -> Result<()> {
        self.update_register(Register::Gpio, level)
    }

    pub fn is_pull_up_enabled(&self) -> Result<bool> {
        self.read_slot(Register::Gppu)
    }

    pub fn set_pull_up(&self, enable: bool) -> Result<()> {
        self.update_register(Register::Gppu, enable)
    }

    /// Configure interrupt-on-change for this pin.
    ///
    /// The sub-steps are independent register read-modify-writes issued in
    /// the order INTCON, DEFVAL, GPINTEN.  A failing sub-step short-circuits
    /// the rest; registers already written stay written.
    pub fn configure_interrupt(&self, mode: InterruptMode) -> Result<()> {
        match mode {
            InterruptMode::Disabled => self.update_register(Register::Gpinten, false),
            InterruptMode::OnChange => {
                self.update_register(Register::Intcon, false)?;
                self.update_register(Register::Gpinten, true)
            }
            InterruptMode::OnMismatch(level) => {
                self.update_register(Register::Intcon, true)?;
                self.update_register(Register::Defval, level)?;
                self.update_register(Register::Gpinten, true)
            }
        }
    }

    /// Whether this pin caused the pending interrupt (INTF, read-only).
    pub fn interrupt_flag(&self) -> Result<bool> {
        self.read_slot(Register::Intf)
    }

    /// Level captured when the pending interrupt fired (INTCAP, read-only).
    pub fn captured_level(&self) -> Result<Level> {
        self.read_slot(Register::Intcap)
    }

    fn read_slot<V: PinValue>(&self, reg: Register) -> Result<V> {
        let view: PinConfig<V> = PinConfig::from_raw(self.dev.read_byte(reg.at(self.port))?);
        // index is validated at construction
        Ok(V::from_bit(view.raw() >> self.index & 1 != 0))
    }

    fn update_register<V: PinValue>(&self, reg: Register, value: V) -> Result<()> {
        let mut view: PinConfig<V> = PinConfig::from_raw(self.dev.read_byte(reg.at(self.port))?);
        view.set_pin(self.index, value);
        self.dev.write_byte(reg.at(self.port), view.raw())
    }
}
