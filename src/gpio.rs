//! Interface for the GPIO peripheral.
//!
//! BPI-GPIO controls the GPIO peripheral by directly accessing the registers
//! through `/dev/mem`. Allwinner-based boards map two register windows (the
//! main PIO block and the R_PIO block serving banks PL and up), while the
//! MediaTek-based Banana Pi R2 maps a single flat window.
//!
//! ## Pins
//!
//! Pins are addressed by their SoC GPIO number, for instance `PA12` is pin 12
//! and `PL10` is pin `11 * 32 + 10`. Translating physical header pins into SoC
//! GPIO numbers is left to the caller, based on the board's
//! [`PinMapId`](../system/enum.PinMapId.html).
//!
//! ## Concurrency
//!
//! Every register update is a non-atomic read-modify-write of a 32-bit word
//! shared by several pins. All methods that change register contents take
//! `&mut self`, so a `Gpio` instance can only be modified from one place at a
//! time. Sharing a `Gpio` between threads requires wrapping it in a `Mutex`.
//!
//! Only a single `Gpio` instance per register layout can exist at any time.
//! Constructing another instance before the existing one goes out of scope
//! returns an [`Error::InstanceExists`].
//!
//! ## Examples
//!
//! ```no_run
//! use bpi_gpio::gpio::{Direction, Gpio, Level, PullUpDown};
//!
//! # fn main() -> bpi_gpio::gpio::Result<()> {
//! let mut gpio = Gpio::new()?;
//!
//! gpio.setup(12, Direction::Output, PullUpDown::Off)?;
//! gpio.write(12, Level::High)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Troubleshooting
//!
//! ### Permission denied
//!
//! Mapping `/dev/mem` requires superuser privileges. If you encounter a
//! [`PermissionDenied`] error when constructing a new [`Gpio`] instance, run
//! your application with `sudo`.
//!
//! [`PermissionDenied`]: enum.Error.html#variant.PermissionDenied
//! [`Error::InstanceExists`]: enum.Error.html#variant.InstanceExists
//! [`Gpio`]: struct.Gpio.html

use std::error;
use std::fmt;
use std::io;
use std::ops::Not;
use std::result;

use log::error;

mod gpiomem;
#[cfg(feature = "hal")]
mod hal;
pub mod layout;
mod mem;

use crate::config::Config;
use crate::system::{self, BoardIdentity, RegisterFamily, Resolver};

use self::gpiomem::{FamilyClaim, GpioRegisters};

/// Errors that can occur when accessing the GPIO peripheral.
#[derive(Debug)]
pub enum Error {
    /// Unknown model.
    ///
    /// The board couldn't be identified, or isn't supported. See
    /// [`system::Error::UnknownModel`](../system/enum.Error.html#variant.UnknownModel).
    UnknownModel,
    /// Permission denied when opening the physical memory device for
    /// read/write access.
    ///
    /// More information on possible causes for this error can be found [here].
    ///
    /// [here]: index.html#permission-denied
    PermissionDenied(String),
    /// The physical memory device couldn't be opened.
    DeviceOpen(io::Error),
    /// Not enough memory to map the GPIO registers.
    Allocation(io::Error),
    /// The GPIO registers at the specified physical address couldn't be mapped.
    Map(u64, io::Error),
    /// Invalid pin direction.
    ///
    /// Direction values are `0` (output) and `1` (input). The registers
    /// are left untouched.
    InvalidDirection(u8),
    /// Pin is not available.
    ///
    /// The GPIO controller doesn't expose a pin with the specified number.
    PinNotAvailable(u16),
    /// The operation isn't supported by the board's register layout.
    Unsupported(RegisterFamily),
    /// An instance of `Gpio` already maps the registers of this layout.
    InstanceExists(RegisterFamily),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::UnknownModel => write!(f, "Unknown Banana Pi model"),
            Error::PermissionDenied(ref path) => write!(f, "Permission denied: {}", path),
            Error::DeviceOpen(ref err) => write!(f, "Failed to open memory device: {}", err),
            Error::Allocation(ref err) => write!(f, "Failed to allocate memory: {}", err),
            Error::Map(base, ref err) => {
                write!(f, "Failed to map registers at {:#010x}: {}", base, err)
            }
            Error::InvalidDirection(value) => write!(f, "Invalid pin direction: {}", value),
            Error::PinNotAvailable(pin) => write!(f, "Pin {} is not available", pin),
            Error::Unsupported(family) => {
                write!(f, "Operation not supported on {} GPIO registers", family)
            }
            Error::InstanceExists(family) => {
                write!(f, "An instance of Gpio already maps the {} registers", family)
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::DeviceOpen(ref err) | Error::Allocation(ref err) | Error::Map(_, ref err) => {
                Some(err)
            }
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::DeviceOpen(err)
    }
}

impl From<system::Error> for Error {
    fn from(_err: system::Error) -> Error {
        Error::UnknownModel
    }
}

/// Result type returned from methods that can have `bpi_gpio::gpio::Error`s.
pub type Result<T> = result::Result<T, Error>;

/// Pin directions.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Direction::Input => write!(f, "In"),
            Direction::Output => write!(f, "Out"),
        }
    }
}

impl TryFrom<u8> for Direction {
    type Error = Error;

    /// Converts the numeric direction used by the pin-numbering layer, where
    /// `0` is output and `1` is input.
    fn try_from(value: u8) -> Result<Direction> {
        match value {
            0 => Ok(Direction::Output),
            1 => Ok(Direction::Input),
            _ => {
                error!("Invalid GPIO direction {}", value);
                Err(Error::InvalidDirection(value))
            }
        }
    }
}

/// Pin logic levels.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[repr(u8)]
pub enum Level {
    Low = 0,
    High = 1,
}

impl From<bool> for Level {
    fn from(e: bool) -> Level {
        if e {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl From<u8> for Level {
    fn from(value: u8) -> Self {
        if value == 0 {
            Level::Low
        } else {
            Level::High
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Level::Low => write!(f, "Low"),
            Level::High => write!(f, "High"),
        }
    }
}

impl Not for Level {
    type Output = Level;

    fn not(self) -> Level {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

/// Built-in pull-up/pull-down resistor states.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum PullUpDown {
    Off,
    PullDown,
    PullUp,
}

impl PullUpDown {
    /// Returns the 2-bit value written to a sunxi pull register.
    pub fn register_value(self) -> u32 {
        match self {
            PullUpDown::Off => 0b00,
            PullUpDown::PullDown => 0b10,
            PullUpDown::PullUp => 0b01,
        }
    }
}

impl From<u8> for PullUpDown {
    /// Converts the numeric pull state used by the pin-numbering layer, where
    /// `1` is pull-down and `2` is pull-up. Anything else disables the resistors.
    fn from(value: u8) -> PullUpDown {
        match value {
            1 => PullUpDown::PullDown,
            2 => PullUpDown::PullUp,
            _ => PullUpDown::Off,
        }
    }
}

impl fmt::Display for PullUpDown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            PullUpDown::Off => write!(f, "Off"),
            PullUpDown::PullDown => write!(f, "PullDown"),
            PullUpDown::PullUp => write!(f, "PullUp"),
        }
    }
}

/// Provides access to the Banana Pi's GPIO peripheral.
///
/// The register mappings are released when the `Gpio` instance goes out of scope.
#[derive(Debug)]
pub struct Gpio {
    regs: Box<dyn GpioRegisters>,
    identity: BoardIdentity,
    // Released after the mappings in regs
    claim: Option<FamilyClaim>,
}

impl Gpio {
    /// Constructs a new `Gpio`.
    ///
    /// `new` identifies the board using the default paths and the debug level
    /// from `RPIGPIO_DEBUG`, and maps the GPIO registers for the board's
    /// register layout.
    pub fn new() -> Result<Gpio> {
        let config = Config::from_env();
        let mut resolver = Resolver::new(config.clone());

        let identity = resolver
            .resolve()
            .identity()
            .cloned()
            .ok_or(Error::UnknownModel)?;

        Gpio::with_identity(identity, &config)
    }

    /// Constructs a new `Gpio` for an already identified board.
    ///
    /// Returns [`Error::InstanceExists`] if another `Gpio` instance maps the
    /// same register layout.
    ///
    /// [`Error::InstanceExists`]: enum.Error.html#variant.InstanceExists
    pub fn with_identity(identity: BoardIdentity, config: &Config) -> Result<Gpio> {
        let claim = FamilyClaim::acquire(identity.family())?;

        let regs: Box<dyn GpioRegisters> = match identity.family() {
            RegisterFamily::Sunxi => Box::new(gpiomem::sunxi::GpioMem::open(
                config.dev_mem(),
                config.debug(),
            )?),
            RegisterFamily::Mtk => Box::new(gpiomem::mtk::GpioMem::open(
                config.dev_mem(),
                config.debug(),
            )?),
        };

        Ok(Gpio {
            regs,
            identity,
            claim: Some(claim),
        })
    }

    /// Returns the identified board.
    pub fn board(&self) -> &BoardIdentity {
        &self.identity
    }

    /// Returns the register layout in use.
    pub fn family(&self) -> RegisterFamily {
        self.regs.family()
    }

    /// Returns the number of addressable pins. Valid pin numbers are
    /// `0..pin_count()`.
    pub fn pin_count(&self) -> u16 {
        self.regs.pin_count()
    }

    /// Configures the built-in pull-up/pull-down resistors.
    ///
    /// Only supported on Allwinner-based boards.
    pub fn set_pullupdown(&mut self, pin: u16, pud: PullUpDown) -> Result<()> {
        self.regs.set_pullupdown(pin, pud)
    }

    /// Configures the pin as input or output.
    ///
    /// On Allwinner-based boards, the pull state is applied first, followed by
    /// the pin function. On MediaTek-based boards, the pin is switched to its
    /// GPIO mode before the direction is set. Pull resistors aren't
    /// configurable there, so any `pud` other than `Off` returns
    /// `Error::Unsupported` without touching the registers.
    pub fn setup(&mut self, pin: u16, direction: Direction, pud: PullUpDown) -> Result<()> {
        self.regs.setup(pin, direction, pud)
    }

    /// Returns the raw 3-bit function field for the pin.
    ///
    /// `0` is input, `1` is output, higher values select alternate functions.
    /// Only supported on Allwinner-based boards.
    pub fn function(&self, pin: u16) -> Result<u8> {
        self.regs.function(pin)
    }

    /// Writes the 3-bit mode field for the pin.
    ///
    /// Only supported on MediaTek-based boards, where mode `0` selects GPIO.
    pub fn set_mode(&mut self, pin: u16, mode: u8) -> Result<()> {
        self.regs.set_mode(pin, mode)
    }

    /// Sets the pin's output state.
    pub fn write(&mut self, pin: u16, level: Level) -> Result<()> {
        self.regs.write(pin, level)
    }

    /// Reads the pin's logic level.
    pub fn read(&self, pin: u16) -> Result<Level> {
        self.regs.read(pin)
    }

    /// Returns the output state last written to the pin.
    ///
    /// On MediaTek-based boards this reads the output latch rather than the
    /// input register.
    pub fn output_level(&self, pin: u16) -> Result<Level> {
        self.regs.output_level(pin)
    }

    /// Returns a [`Pin`] borrowing this `Gpio` for the specified pin number.
    ///
    /// [`Pin`]: struct.Pin.html
    pub fn pin(&mut self, pin: u16) -> Result<Pin<'_>> {
        if pin >= self.pin_count() {
            return Err(Error::PinNotAvailable(pin));
        }

        Ok(Pin { gpio: self, pin })
    }
}

/// A single GPIO pin, borrowed from a [`Gpio`] instance.
///
/// [`Gpio`]: struct.Gpio.html
#[derive(Debug)]
pub struct Pin<'a> {
    gpio: &'a mut Gpio,
    pin: u16,
}

impl<'a> Pin<'a> {
    /// Returns the GPIO pin number.
    #[inline]
    pub fn pin(&self) -> u16 {
        self.pin
    }

    /// Configures the pin as input or output. See [`Gpio::setup`].
    ///
    /// [`Gpio::setup`]: struct.Gpio.html#method.setup
    pub fn setup(&mut self, direction: Direction, pud: PullUpDown) -> Result<()> {
        self.gpio.setup(self.pin, direction, pud)
    }

    /// Returns the raw function field. See [`Gpio::function`].
    ///
    /// [`Gpio::function`]: struct.Gpio.html#method.function
    pub fn function(&self) -> Result<u8> {
        self.gpio.function(self.pin)
    }

    /// Reads the pin's logic level.
    #[inline]
    pub fn read(&self) -> Result<Level> {
        self.gpio.read(self.pin)
    }

    #[inline]
    pub fn is_high(&self) -> Result<bool> {
        Ok(self.read()? == Level::High)
    }

    #[inline]
    pub fn is_low(&self) -> Result<bool> {
        Ok(self.read()? == Level::Low)
    }

    /// Sets the pin's output state.
    #[inline]
    pub fn write(&mut self, level: Level) -> Result<()> {
        self.gpio.write(self.pin, level)
    }

    #[inline]
    pub fn set_high(&mut self) -> Result<()> {
        self.write(Level::High)
    }

    #[inline]
    pub fn set_low(&mut self) -> Result<()> {
        self.write(Level::Low)
    }

    /// Returns the output state last written to the pin.
    #[inline]
    pub fn output_level(&self) -> Result<Level> {
        self.gpio.output_level(self.pin)
    }

    #[inline]
    pub fn is_set_high(&self) -> Result<bool> {
        Ok(self.output_level()? == Level::High)
    }

    #[inline]
    pub fn is_set_low(&self) -> Result<bool> {
        Ok(self.output_level()? == Level::Low)
    }

    /// Inverts the pin's output state.
    pub fn toggle(&mut self) -> Result<()> {
        let level = self.output_level()?;
        self.write(!level)
    }
}

#[cfg(test)]
impl Gpio {
    pub(crate) fn with_registers(regs: Box<dyn GpioRegisters>, identity: BoardIdentity) -> Gpio {
        Gpio {
            regs,
            identity,
            claim: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Mutex, MutexGuard};

    use crate::gpio::layout::{mtk, sunxi};
    use crate::gpio::mem::MemoryBlock;
    use crate::system::tests::Fixture;

    // Serializes the tests that claim a register layout, since claims are
    // process-wide.
    fn claim_lock() -> MutexGuard<'static, ()> {
        static LOCK: Mutex<()> = Mutex::new(());

        LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn identity(board: &str) -> BoardIdentity {
        let fixture = Fixture::new();
        fixture.board(&format!("BOARD={}\n", board));

        let mut resolver = fixture.resolver();
        resolver.resolve().identity().cloned().unwrap()
    }

    fn simulated(board: &str) -> Gpio {
        let identity = identity(board);

        let regs: Box<dyn GpioRegisters> = match identity.family() {
            RegisterFamily::Sunxi => Box::new(gpiomem::sunxi::GpioMem::new(
                MemoryBlock::new(sunxi::BLOCK_SIZE),
                MemoryBlock::new(sunxi::BLOCK_SIZE),
                0,
            )),
            RegisterFamily::Mtk => Box::new(gpiomem::mtk::GpioMem::new(
                MemoryBlock::new(mtk::BLOCK_SIZE),
                0,
            )),
        };

        Gpio::with_registers(regs, identity)
    }

    #[test]
    fn direction_from_u8() {
        assert_eq!(Direction::try_from(0).unwrap(), Direction::Output);
        assert_eq!(Direction::try_from(1).unwrap(), Direction::Input);
        assert!(matches!(
            Direction::try_from(2),
            Err(Error::InvalidDirection(2))
        ));
    }

    #[test]
    fn pullupdown_from_u8() {
        assert_eq!(PullUpDown::from(0), PullUpDown::Off);
        assert_eq!(PullUpDown::from(1), PullUpDown::PullDown);
        assert_eq!(PullUpDown::from(2), PullUpDown::PullUp);
        assert_eq!(PullUpDown::from(9), PullUpDown::Off);
        assert_eq!(PullUpDown::PullDown.register_value(), 0b10);
        assert_eq!(PullUpDown::PullUp.register_value(), 0b01);
    }

    #[test]
    fn level_conversions() {
        assert_eq!(Level::from(true), Level::High);
        assert_eq!(Level::from(0u8), Level::Low);
        assert_eq!(!Level::Low, Level::High);
    }

    #[test]
    fn invalid_direction_leaves_registers_untouched() {
        let mut gpio = simulated("bpi-m2p");

        gpio.setup(3, Direction::Output, PullUpDown::Off).unwrap();

        let result = Direction::try_from(7).and_then(|dir| gpio.setup(3, dir, PullUpDown::Off));
        assert!(matches!(result, Err(Error::InvalidDirection(7))));
        assert_eq!(gpio.function(3).unwrap(), 1);
    }

    #[test]
    fn sunxi_board() {
        let mut gpio = simulated("bpi-m2p");

        assert_eq!(gpio.family(), RegisterFamily::Sunxi);
        assert_eq!(gpio.board().model(), 26);
        assert_eq!(gpio.pin_count(), sunxi::PINS);

        gpio.setup(12, Direction::Output, PullUpDown::PullUp).unwrap();
        assert_eq!(gpio.function(12).unwrap(), 1);

        gpio.write(12, Level::High).unwrap();
        assert_eq!(gpio.read(12).unwrap(), Level::High);
        assert!(matches!(
            gpio.set_mode(12, 0),
            Err(Error::Unsupported(RegisterFamily::Sunxi))
        ));
    }

    #[test]
    fn mtk_board() {
        let mut gpio = simulated("bpi-r2");

        assert_eq!(gpio.family(), RegisterFamily::Mtk);
        assert_eq!(gpio.board().processor(), "MTK");
        assert_eq!(gpio.pin_count(), mtk::PINS);

        gpio.setup(33, Direction::Output, PullUpDown::Off).unwrap();
        gpio.set_mode(33, 0).unwrap();
        gpio.write(33, Level::High).unwrap();
        assert!(matches!(gpio.function(33), Err(Error::Unsupported(_))));
    }

    #[test]
    fn pin_handle() {
        let mut gpio = simulated("bpi-m3");

        {
            let mut pin = gpio.pin(37).unwrap();
            assert_eq!(pin.pin(), 37);

            pin.setup(Direction::Output, PullUpDown::Off).unwrap();
            pin.set_high().unwrap();
            assert!(pin.is_high().unwrap());

            pin.toggle().unwrap();
            assert!(pin.is_low().unwrap());
            assert_eq!(pin.function().unwrap(), 1);
        }

        assert!(matches!(
            gpio.pin(sunxi::PINS),
            Err(Error::PinNotAvailable(_))
        ));
    }

    #[test]
    fn error_display() {
        assert_eq!(
            Error::PinNotAvailable(500).to_string(),
            "Pin 500 is not available"
        );
        assert_eq!(
            Error::Unsupported(RegisterFamily::Mtk).to_string(),
            "Operation not supported on MTK GPIO registers"
        );
        assert_eq!(
            Error::from(system::Error::UnknownModel).to_string(),
            "Unknown Banana Pi model"
        );
    }

    #[test]
    fn device_open_failure() {
        let _lock = claim_lock();
        let fixture = Fixture::new();
        let identity = identity("bpi-m2p");

        assert!(matches!(
            Gpio::with_identity(identity, &fixture.config()),
            Err(Error::DeviceOpen(_))
        ));
    }

    #[test]
    fn map_failure() {
        let _lock = claim_lock();
        let config = Config::default().with_dev_mem("/dev/null");

        assert!(matches!(
            Gpio::with_identity(identity("bpi-m2p"), &config),
            Err(Error::Map(sunxi::GPIO_BASE, _))
        ));

        // A failed open releases the claim.
        let config = Fixture::new().config();
        assert!(matches!(
            Gpio::with_identity(identity("bpi-m2p"), &config),
            Err(Error::DeviceOpen(_))
        ));
    }

    #[test]
    fn single_instance_per_family() {
        let _lock = claim_lock();

        // Sparse files large enough to cover both families' register windows
        let sunxi_mem = Fixture::new();
        sunxi_mem.mem(sunxi::R_GPIO_BASE + sunxi::BLOCK_SIZE as u64);
        let mtk_mem = Fixture::new();
        mtk_mem.mem(mtk::GPIO_BASE + mtk::BLOCK_SIZE as u64);

        let mut first = Gpio::with_identity(identity("bpi-m2p"), &sunxi_mem.config()).unwrap();
        first.write(7, Level::High).unwrap();

        assert!(matches!(
            Gpio::with_identity(identity("bpi-m3"), &sunxi_mem.config()),
            Err(Error::InstanceExists(RegisterFamily::Sunxi))
        ));

        // Other families aren't affected.
        let r2 = Gpio::with_identity(identity("bpi-r2"), &mtk_mem.config()).unwrap();
        assert_eq!(r2.family(), RegisterFamily::Mtk);

        drop(first);

        let second = Gpio::with_identity(identity("bpi-m2p"), &sunxi_mem.config()).unwrap();
        assert_eq!(second.read(7).unwrap(), Level::High);
    }

    #[test]
    fn simulated_instances_are_independent() {
        let mut a = simulated("bpi-m2p");
        let b = simulated("bpi-m2p");

        a.write(7, Level::High).unwrap();
        assert_eq!(b.read(7).unwrap(), Level::Low);
    }

    #[test]
    fn mtk_toggle_uses_output_latch() {
        let mut gpio = simulated("bpi-r2");

        gpio.setup(33, Direction::Output, PullUpDown::Off).unwrap();
        let mut pin = gpio.pin(33).unwrap();

        pin.set_high().unwrap();
        assert!(pin.is_set_high().unwrap());
        // The simulated pad isn't driven, so the input register stays low.
        assert!(pin.is_low().unwrap());

        pin.toggle().unwrap();
        assert!(pin.is_set_low().unwrap());
        pin.toggle().unwrap();
        assert!(pin.is_set_high().unwrap());
    }

    #[test]
    fn mtk_setup_rejects_pull() {
        let mut gpio = simulated("bpi-r2");

        assert!(matches!(
            gpio.setup(33, Direction::Input, PullUpDown::PullDown),
            Err(Error::Unsupported(RegisterFamily::Mtk))
        ));
    }

    #[test]
    fn io_error_conversion() {
        let err = Error::from(io::Error::from(io::ErrorKind::NotFound));

        assert!(matches!(err, Error::DeviceOpen(_)));
        assert_eq!(
            Error::InstanceExists(RegisterFamily::Sunxi).to_string(),
            "An instance of Gpio already maps the Allwinner registers"
        );
    }
}
