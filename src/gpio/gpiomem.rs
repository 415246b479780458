use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::gpio::{Direction, Error, Level, PullUpDown, Result};
use crate::system::RegisterFamily;

pub(crate) mod mtk;
pub(crate) mod sunxi;

// Set while a register mapping for the family is alive
static SUNXI_MAPPED: AtomicBool = AtomicBool::new(false);
static MTK_MAPPED: AtomicBool = AtomicBool::new(false);

fn mapped_flag(family: RegisterFamily) -> &'static AtomicBool {
    match family {
        RegisterFamily::Sunxi => &SUNXI_MAPPED,
        RegisterFamily::Mtk => &MTK_MAPPED,
    }
}

/// Exclusive claim on the register mappings of a single family.
///
/// Only one claim per family can exist at a time. The claim is released when
/// it's dropped.
#[derive(Debug)]
pub(crate) struct FamilyClaim {
    family: RegisterFamily,
}

impl FamilyClaim {
    pub(crate) fn acquire(family: RegisterFamily) -> Result<FamilyClaim> {
        if mapped_flag(family)
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::InstanceExists(family));
        }

        Ok(FamilyClaim { family })
    }
}

impl Drop for FamilyClaim {
    fn drop(&mut self) {
        mapped_flag(self.family).store(false, Ordering::SeqCst);
    }
}

pub(crate) trait GpioRegisters: fmt::Debug + Send {
    fn family(&self) -> RegisterFamily;
    fn pin_count(&self) -> u16;
    fn set_pullupdown(&mut self, pin: u16, pud: PullUpDown) -> Result<()>;
    fn setup(&mut self, pin: u16, direction: Direction, pud: PullUpDown) -> Result<()>;
    fn function(&self, pin: u16) -> Result<u8>;
    fn set_mode(&mut self, pin: u16, mode: u8) -> Result<()>;
    fn write(&mut self, pin: u16, level: Level) -> Result<()>;
    fn read(&self, pin: u16) -> Result<Level>;
    /// Returns the latched output level, rather than the level on the pad.
    fn output_level(&self, pin: u16) -> Result<Level>;
}
