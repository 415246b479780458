use std::path::Path;

use log::trace;

use crate::gpio::layout::sunxi::{
    self, PinAddress, Window, BLOCK_SIZE, GPIO_BASE, PINS, R_GPIO_BASE,
};
use crate::gpio::layout::OffsetTable;
use crate::gpio::mem::{self, MappedRegion, RegisterBlock};
use crate::gpio::{Direction, Error, Level, PullUpDown, Result};
use crate::system::RegisterFamily;

use super::GpioRegisters;

const CFG_MASK: u32 = 0b111;
const PULL_MASK: u32 = 0b11;

/// Allwinner GPIO controller, spread over the main PIO window and the R_PIO window.
#[derive(Debug)]
pub(crate) struct GpioMem<B: RegisterBlock> {
    main: B,
    r: B,
    table: OffsetTable<PinAddress>,
    debug: u8,
}

impl GpioMem<MappedRegion> {
    /// Maps both register windows through the physical memory device at `path`.
    ///
    /// If the R_PIO window can't be mapped, the main window is released again
    /// before the error is returned.
    pub(crate) fn open(path: &Path, debug: u8) -> Result<GpioMem<MappedRegion>> {
        debug_at!(debug, 1, "Opening sunxi GPIO registers through {}", path.display());

        let mem_file = mem::open_dev_mem(path)?;
        let main = MappedRegion::map(&mem_file, GPIO_BASE, BLOCK_SIZE)?;
        let r = MappedRegion::map(&mem_file, R_GPIO_BASE, BLOCK_SIZE)?;

        debug_at!(
            debug,
            2,
            "PIO at {:#010x}, R_PIO at {:#010x}",
            main.base(),
            r.base()
        );

        Ok(GpioMem::new(main, r, debug))
    }
}

impl<B: RegisterBlock> GpioMem<B> {
    pub(crate) fn new(main: B, r: B, debug: u8) -> GpioMem<B> {
        let main_words = main.words();
        let r_words = r.words();

        let table = OffsetTable::build(PINS, sunxi::address, |addr| match addr.window {
            Window::Main => addr.last_word() < main_words,
            Window::R => addr.last_word() < r_words,
        });

        GpioMem {
            main,
            r,
            table,
            debug,
        }
    }

    fn address(&self, pin: u16) -> Result<PinAddress> {
        let addr = self.table.get(pin).ok_or(Error::PinNotAvailable(pin))?;

        debug_at!(
            self.debug,
            2,
            "gpio({}) bank({}) window({:?}) cfg({}:{}) data({}:{}) pull({}:{})",
            pin,
            sunxi::bank(u32::from(pin)),
            addr.window,
            addr.cfg_word,
            addr.cfg_shift,
            addr.data_word,
            addr.data_shift,
            addr.pull_word,
            addr.pull_shift
        );

        Ok(addr)
    }

    fn block(&self, window: Window) -> &B {
        match window {
            Window::Main => &self.main,
            Window::R => &self.r,
        }
    }

    fn block_mut(&mut self, window: Window) -> &mut B {
        match window {
            Window::Main => &mut self.main,
            Window::R => &mut self.r,
        }
    }

    fn modify(&mut self, window: Window, word: usize, mask: u32, value: u32) {
        let debug = self.debug;
        let block = self.block_mut(window);

        let old = block.read(word);
        let new = (old & !mask) | (value & mask);
        block.write(word, new);

        if debug >= 4 {
            trace!("{:?}[{:#x}]: {:#010x} -> {:#010x}", window, word, old, new);
        }
    }
}

impl<B: RegisterBlock> GpioRegisters for GpioMem<B> {
    fn family(&self) -> RegisterFamily {
        RegisterFamily::Sunxi
    }

    fn pin_count(&self) -> u16 {
        self.table.len() as u16
    }

    fn set_pullupdown(&mut self, pin: u16, pud: PullUpDown) -> Result<()> {
        debug_at!(self.debug, 1, "Setting pin {} pull to {}", pin, pud);

        let addr = self.address(pin)?;
        self.modify(
            addr.window,
            addr.pull_word,
            PULL_MASK << addr.pull_shift,
            pud.register_value() << addr.pull_shift,
        );

        Ok(())
    }

    fn setup(&mut self, pin: u16, direction: Direction, pud: PullUpDown) -> Result<()> {
        debug_at!(self.debug, 1, "Setting up pin {} as {} ({})", pin, direction, pud);

        let addr = self.address(pin)?;

        // The pull state is applied before the direction changes.
        self.set_pullupdown(pin, pud)?;

        let value = match direction {
            Direction::Input => 0,
            Direction::Output => 1,
        };
        self.modify(
            addr.window,
            addr.cfg_word,
            CFG_MASK << addr.cfg_shift,
            value << addr.cfg_shift,
        );

        Ok(())
    }

    fn function(&self, pin: u16) -> Result<u8> {
        let addr = self.address(pin)?;
        let reg_value = self.block(addr.window).read(addr.cfg_word);

        Ok(((reg_value >> addr.cfg_shift) & CFG_MASK) as u8)
    }

    fn set_mode(&mut self, _pin: u16, _mode: u8) -> Result<()> {
        Err(Error::Unsupported(RegisterFamily::Sunxi))
    }

    fn write(&mut self, pin: u16, level: Level) -> Result<()> {
        debug_at!(self.debug, 1, "Writing {} to pin {}", level, pin);

        let addr = self.address(pin)?;
        self.modify(
            addr.window,
            addr.data_word,
            1 << addr.data_shift,
            (level as u32) << addr.data_shift,
        );

        Ok(())
    }

    fn read(&self, pin: u16) -> Result<Level> {
        let addr = self.address(pin)?;
        let reg_value = self.block(addr.window).read(addr.data_word);

        if self.debug >= 4 {
            trace!("{:?}[{:#x}]: {:#010x}", addr.window, addr.data_word, reg_value);
        }

        Ok(Level::from(((reg_value >> addr.data_shift) & 0b1) as u8))
    }

    // The data register serves both directions
    fn output_level(&self, pin: u16) -> Result<Level> {
        self.read(pin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::gpio::mem::MemoryBlock;

    fn gpio_mem() -> GpioMem<MemoryBlock> {
        GpioMem::new(MemoryBlock::new(BLOCK_SIZE), MemoryBlock::new(BLOCK_SIZE), 0)
    }

    #[test]
    fn output_then_input() {
        let mut gpio = gpio_mem();

        for pin in 0..PINS {
            gpio.setup(pin, Direction::Output, PullUpDown::Off).unwrap();
            assert_eq!(gpio.function(pin).unwrap() & 0b1, 1, "pin {}", pin);

            gpio.setup(pin, Direction::Input, PullUpDown::Off).unwrap();
            assert_eq!(gpio.function(pin).unwrap(), 0, "pin {}", pin);
        }
    }

    #[test]
    fn output_clears_alternate_function() {
        let mut gpio = gpio_mem();
        let addr = sunxi::address(12);

        // PA12 configured as alt function 4, neighbours as 0b111
        gpio.main.write(addr.cfg_word, 0x7774_7777);
        assert_eq!(gpio.function(12).unwrap(), 4);

        gpio.setup(12, Direction::Output, PullUpDown::Off).unwrap();
        assert_eq!(gpio.function(12).unwrap(), 1);
        assert_eq!(gpio.main.read(addr.cfg_word), 0x7771_7777);
    }

    #[test]
    fn pull_encoding() {
        let mut gpio = gpio_mem();
        let addr = sunxi::address(17);

        gpio.set_pullupdown(17, PullUpDown::PullDown).unwrap();
        assert_eq!(gpio.main.read(addr.pull_word), 0b10 << 2);

        gpio.set_pullupdown(17, PullUpDown::PullUp).unwrap();
        assert_eq!(gpio.main.read(addr.pull_word), 0b01 << 2);

        gpio.set_pullupdown(17, PullUpDown::Off).unwrap();
        assert_eq!(gpio.main.read(addr.pull_word), 0);
    }

    #[test]
    fn pull_up_is_idempotent() {
        let mut gpio = gpio_mem();

        for pin in 0..PINS {
            let addr = sunxi::address(u32::from(pin));

            gpio.set_pullupdown(pin, PullUpDown::PullUp).unwrap();
            let once = gpio.block(addr.window).read(addr.pull_word);

            gpio.set_pullupdown(pin, PullUpDown::PullUp).unwrap();
            let twice = gpio.block(addr.window).read(addr.pull_word);

            assert_eq!(once, twice, "pin {}", pin);
        }
    }

    #[test]
    fn setup_applies_pull() {
        let mut gpio = gpio_mem();
        let addr = sunxi::address(6);

        gpio.setup(6, Direction::Input, PullUpDown::PullUp).unwrap();
        assert_eq!(
            (gpio.main.read(addr.pull_word) >> addr.pull_shift) & PULL_MASK,
            0b01
        );
    }

    #[test]
    fn write_then_read() {
        let mut gpio = gpio_mem();

        gpio.write(7, Level::High).unwrap();
        gpio.write(8, Level::High).unwrap();
        assert_eq!(gpio.read(7).unwrap(), Level::High);
        assert_eq!(gpio.read(8).unwrap(), Level::High);
        assert_eq!(gpio.main.read(sunxi::address(7).data_word), 0b1_1000_0000);

        gpio.write(7, Level::Low).unwrap();
        assert_eq!(gpio.read(7).unwrap(), Level::Low);
        assert_eq!(gpio.read(8).unwrap(), Level::High);
        assert_eq!(gpio.output_level(8).unwrap(), Level::High);
    }

    #[test]
    fn r_window_is_separate() {
        let mut gpio = gpio_mem();

        // PL10 and PA10 share the same bit in their bank's data register.
        gpio.write(11 * 32 + 10, Level::High).unwrap();
        assert_eq!(gpio.read(11 * 32 + 10).unwrap(), Level::High);
        assert_eq!(gpio.read(10).unwrap(), Level::Low);
        assert_eq!(gpio.r.read(0xc10 / 4), 1 << 10);
        assert_eq!(gpio.main.read(0x810 / 4), 0);

        // PK10 is still served by the main window.
        gpio.write(10 * 32 + 10, Level::High).unwrap();
        assert_eq!(gpio.main.read((0x800 + 10 * 0x24 + 0x10) / 4), 1 << 10);
    }

    #[test]
    fn unavailable_pins() {
        let mut gpio = gpio_mem();

        assert_eq!(gpio.pin_count(), PINS);
        assert!(matches!(
            gpio.write(PINS, Level::High),
            Err(Error::PinNotAvailable(pin)) if pin == PINS
        ));
        assert!(matches!(gpio.function(u16::MAX), Err(Error::PinNotAvailable(_))));
        assert!(matches!(
            gpio.set_mode(0, 0),
            Err(Error::Unsupported(RegisterFamily::Sunxi))
        ));
    }
}
