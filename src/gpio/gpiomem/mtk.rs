use std::path::Path;

use log::{debug, trace};

use crate::gpio::layout::mtk::{self, PinAddress, BLOCK_SIZE, GPIO_BASE, PINS};
use crate::gpio::layout::OffsetTable;
use crate::gpio::mem::{self, MappedRegion, RegisterBlock};
use crate::gpio::{Direction, Error, Level, PullUpDown, Result};
use crate::system::RegisterFamily;

use super::GpioRegisters;

const MODE_MASK: u32 = 0b111;
// Mode 0 selects the GPIO function
const MODE_GPIO: u8 = 0;

/// MediaTek GPIO controller, mapped as a single flat window.
#[derive(Debug)]
pub(crate) struct GpioMem<B: RegisterBlock> {
    regs: B,
    table: OffsetTable<PinAddress>,
    debug: u8,
}

impl GpioMem<MappedRegion> {
    /// Maps the register window through the physical memory device at `path`.
    pub(crate) fn open(path: &Path, debug: u8) -> Result<GpioMem<MappedRegion>> {
        debug_at!(debug, 1, "Opening MTK GPIO registers through {}", path.display());

        let mem_file = mem::open_dev_mem(path)?;
        let regs = MappedRegion::map(&mem_file, GPIO_BASE, BLOCK_SIZE)?;

        Ok(GpioMem::new(regs, debug))
    }
}

impl<B: RegisterBlock> GpioMem<B> {
    pub(crate) fn new(regs: B, debug: u8) -> GpioMem<B> {
        let words = regs.words();
        let table = OffsetTable::build(PINS, mtk::address, |addr| addr.last_word() < words);

        GpioMem { regs, table, debug }
    }

    fn address(&self, pin: u16) -> Result<PinAddress> {
        let addr = self.table.get(pin).ok_or(Error::PinNotAvailable(pin))?;

        debug_at!(
            self.debug,
            2,
            "pin({}) dir({:#x}) dout({:#x}) din({:#x}) bit({}) mode({:#x}:{})",
            pin,
            addr.dir_word * 4,
            addr.dout_word * 4,
            addr.din_word * 4,
            addr.bit,
            addr.mode_word * 4,
            addr.mode_shift
        );

        Ok(addr)
    }

    fn modify(&mut self, word: usize, mask: u32, value: u32) {
        let old = self.regs.read(word);
        let new = (old & !mask) | (value & mask);
        self.regs.write(word, new);

        if self.debug >= 4 {
            trace!("[{:#x}]: {:#010x} -> {:#010x}", word * 4, old, new);
        }
    }

    /// Sets or clears the output bit for `pin`.
    pub(crate) fn set_gpio_out(&mut self, pin: u16, level: Level) -> Result<()> {
        let addr = self.address(pin)?;
        self.modify(addr.dout_word, 1 << addr.bit, (level as u32) << addr.bit);

        Ok(())
    }

    /// Sets or clears the direction bit for `pin`. A set bit selects output.
    pub(crate) fn set_gpio_dir(&mut self, pin: u16, direction: Direction) -> Result<()> {
        let addr = self.address(pin)?;
        let value = match direction {
            Direction::Input => 0,
            Direction::Output => 1,
        };
        self.modify(addr.dir_word, 1 << addr.bit, value << addr.bit);

        Ok(())
    }

    /// Writes the 3-bit mode field for `pin`.
    pub(crate) fn set_gpio_mode(&mut self, pin: u16, mode: u8) -> Result<()> {
        let addr = self.address(pin)?;
        self.modify(
            addr.mode_word,
            MODE_MASK << addr.mode_shift,
            u32::from(mode) << addr.mode_shift,
        );

        Ok(())
    }
}

impl<B: RegisterBlock> GpioRegisters for GpioMem<B> {
    fn family(&self) -> RegisterFamily {
        RegisterFamily::Mtk
    }

    fn pin_count(&self) -> u16 {
        self.table.len() as u16
    }

    fn set_pullupdown(&mut self, _pin: u16, _pud: PullUpDown) -> Result<()> {
        Err(Error::Unsupported(RegisterFamily::Mtk))
    }

    fn setup(&mut self, pin: u16, direction: Direction, pud: PullUpDown) -> Result<()> {
        debug_at!(self.debug, 1, "Setting up pin {} as {} ({})", pin, direction, pud);

        if pud != PullUpDown::Off {
            debug!("Rejecting pull {} for MTK pin {}", pud, pin);
            return Err(Error::Unsupported(RegisterFamily::Mtk));
        }

        self.set_gpio_mode(pin, MODE_GPIO)?;
        self.set_gpio_dir(pin, direction)
    }

    fn function(&self, _pin: u16) -> Result<u8> {
        Err(Error::Unsupported(RegisterFamily::Mtk))
    }

    fn set_mode(&mut self, pin: u16, mode: u8) -> Result<()> {
        debug_at!(self.debug, 1, "Setting pin {} mode to {}", pin, mode);

        self.set_gpio_mode(pin, mode)
    }

    fn write(&mut self, pin: u16, level: Level) -> Result<()> {
        debug_at!(self.debug, 1, "Writing {} to pin {}", level, pin);

        self.set_gpio_out(pin, level)
    }

    fn read(&self, pin: u16) -> Result<Level> {
        let addr = self.address(pin)?;
        let reg_value = self.regs.read(addr.din_word);

        Ok(Level::from(((reg_value >> addr.bit) & 0b1) as u8))
    }

    fn output_level(&self, pin: u16) -> Result<Level> {
        let addr = self.address(pin)?;
        let reg_value = self.regs.read(addr.dout_word);

        Ok(Level::from(((reg_value >> addr.bit) & 0b1) as u8))
    }
}
