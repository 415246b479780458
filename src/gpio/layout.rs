//! Bit-field address computation for the supported GPIO register layouts.
//!
//! All functions are pure. They don't validate the pin number; the register
//! backends only call them for pins inside their offset tables.

/// Allwinner (sunxi) banked layout.
///
/// Each bank of 32 pins has four configuration words (8 pins per word, 4 bits
/// per pin), one data word, two drive words and two pull words (16 pins per
/// word, 2 bits per pin). Banks 11 and up (PL, PM) live in the separate R_PIO
/// register block.
pub mod sunxi {
    /// Physical base address of the main GPIO window.
    pub const GPIO_BASE: u64 = 0x01c2_0000;
    /// Byte offset of the PIO registers inside the main window.
    pub const GPIO_REG_OFFSET: usize = 0x800;
    /// Physical base address of the R_PIO window.
    pub const R_GPIO_BASE: u64 = 0x01f0_2000;
    /// Byte offset of the PIO registers inside the R_PIO window.
    pub const R_GPIO_REG_OFFSET: usize = 0xc00;
    /// Size of each mapped window.
    pub const BLOCK_SIZE: usize = 4096;

    /// Byte offset between consecutive banks.
    pub const BANK_SIZE: usize = 0x24;
    pub const CFG_OFFSET: usize = 0x00;
    pub const DATA_OFFSET: usize = 0x10;
    pub const PULL_OFFSET: usize = 0x1c;

    /// First bank served by the R_PIO window.
    pub const R_BANK_FIRST: u32 = 11;
    /// Banks PA through PM.
    pub const BANKS: u32 = 13;
    /// Number of addressable pins.
    pub const PINS: u16 = (BANKS * 32) as u16;

    /// Register window holding a pin's bank.
    #[derive(Debug, PartialEq, Eq, Copy, Clone)]
    pub enum Window {
        Main,
        R,
    }

    /// Bank index: 32 pins per bank.
    #[inline]
    pub const fn bank(pin: u32) -> u32 {
        pin >> 5
    }

    /// Pin number inside its bank, which is also its bit in the data register.
    #[inline]
    pub const fn num(pin: u32) -> u32 {
        pin & 0x1f
    }

    /// Configuration word index inside the bank.
    #[inline]
    pub const fn cfg_index(pin: u32) -> u32 {
        (pin & 0x1f) >> 3
    }

    /// Bit offset of the configuration field inside its word.
    #[inline]
    pub const fn cfg_offset(pin: u32) -> u32 {
        ((pin & 0x1f) & 0x7) << 2
    }

    /// Pull word index inside the bank.
    #[inline]
    pub const fn pull_index(pin: u32) -> u32 {
        (pin & 0x1f) >> 4
    }

    /// Bit offset of the pull field inside its word.
    #[inline]
    pub const fn pull_offset(pin: u32) -> u32 {
        (pin & 0x0f) << 1
    }

    /// Returns the window holding `bank`, and the bank's index inside that window.
    #[inline]
    pub const fn window(bank: u32) -> (Window, u32) {
        if bank >= R_BANK_FIRST {
            (Window::R, bank - R_BANK_FIRST)
        } else {
            (Window::Main, bank)
        }
    }

    /// Word offsets and bit shifts for a single pin, relative to the start of
    /// the mapped window.
    #[derive(Debug, PartialEq, Eq, Copy, Clone)]
    pub struct PinAddress {
        pub window: Window,
        pub cfg_word: usize,
        pub cfg_shift: u32,
        pub data_word: usize,
        pub data_shift: u32,
        pub pull_word: usize,
        pub pull_shift: u32,
    }

    /// Computes the register addresses for `pin`.
    pub fn address(pin: u32) -> PinAddress {
        let (window, bank) = window(bank(pin));

        let reg_offset = match window {
            Window::Main => GPIO_REG_OFFSET,
            Window::R => R_GPIO_REG_OFFSET,
        };
        let bank_start = reg_offset + bank as usize * BANK_SIZE;

        PinAddress {
            window,
            cfg_word: (bank_start + CFG_OFFSET) / 4 + cfg_index(pin) as usize,
            cfg_shift: cfg_offset(pin),
            data_word: (bank_start + DATA_OFFSET) / 4,
            data_shift: num(pin),
            pull_word: (bank_start + PULL_OFFSET) / 4 + pull_index(pin) as usize,
            pull_shift: pull_offset(pin),
        }
    }

    impl PinAddress {
        /// Returns the highest word offset this pin touches.
        pub fn last_word(&self) -> usize {
            self.cfg_word.max(self.data_word).max(self.pull_word)
        }
    }
}

/// MediaTek (MT7623) flat-offset layout.
///
/// Direction, output and input registers pack 16 pins per 16-byte block,
/// one bit per pin. Mode registers pack 5 pins per 16-byte block, 3 bits per pin.
pub mod mtk {
    /// Physical base address of the GPIO window.
    pub const GPIO_BASE: u64 = 0x1000_5000;
    /// Size of the mapped window.
    pub const BLOCK_SIZE: usize = 8 * 1024;

    pub const DIR_OFFSET: usize = 0x000;
    pub const PULLEN_OFFSET: usize = 0x150;
    pub const DOUT_OFFSET: usize = 0x500;
    pub const DIN_OFFSET: usize = 0x630;
    pub const MODE_OFFSET: usize = 0x760;

    /// Pins from here on use the second block of direction registers.
    pub const DIR_SECOND_BLOCK: u32 = 199;
    /// Number of addressable pins.
    pub const PINS: u16 = 280;

    /// Byte offset of the 16-pin block holding `pin`, relative to a register base.
    #[inline]
    pub const fn block(pin: u32) -> usize {
        (pin as usize / 16) * 16
    }

    /// Bit position inside a direction, output or input word.
    #[inline]
    pub const fn bit(pin: u32) -> u32 {
        pin % 16
    }

    /// Byte offset of the direction word.
    #[inline]
    pub const fn dir(pin: u32) -> usize {
        if pin < DIR_SECOND_BLOCK {
            DIR_OFFSET + block(pin)
        } else {
            DIR_OFFSET + block(pin) + 0x10
        }
    }

    /// Byte offset of the output word.
    #[inline]
    pub const fn dout(pin: u32) -> usize {
        DOUT_OFFSET + block(pin)
    }

    /// Byte offset of the input word.
    #[inline]
    pub const fn din(pin: u32) -> usize {
        DIN_OFFSET + block(pin)
    }

    /// Byte offset of the mode word.
    #[inline]
    pub const fn mode(pin: u32) -> usize {
        MODE_OFFSET + (pin as usize / 5) * 16
    }

    /// Bit offset of the 3-bit mode field inside its word.
    #[inline]
    pub const fn mode_shift(pin: u32) -> u32 {
        (pin % 5) * 3
    }

    /// Word offsets and bit shifts for a single pin, relative to the start of
    /// the mapped window.
    #[derive(Debug, PartialEq, Eq, Copy, Clone)]
    pub struct PinAddress {
        pub dir_word: usize,
        pub dout_word: usize,
        pub din_word: usize,
        pub bit: u32,
        pub mode_word: usize,
        pub mode_shift: u32,
    }

    /// Computes the register addresses for `pin`.
    pub fn address(pin: u32) -> PinAddress {
        PinAddress {
            dir_word: dir(pin) / 4,
            dout_word: dout(pin) / 4,
            din_word: din(pin) / 4,
            bit: bit(pin),
            mode_word: mode(pin) / 4,
            mode_shift: mode_shift(pin),
        }
    }

    impl PinAddress {
        /// Returns the highest word offset this pin touches.
        pub fn last_word(&self) -> usize {
            self.dir_word
                .max(self.dout_word)
                .max(self.din_word)
                .max(self.mode_word)
        }
    }
}

/// Per-pin addresses, computed once and checked against the size of the
/// register window(s) they index into.
#[derive(Debug, Clone)]
pub(crate) struct OffsetTable<A> {
    entries: Vec<Option<A>>,
}

impl<A: Copy> OffsetTable<A> {
    /// Builds a table for pins `0..pins`. `fits` decides whether an address
    /// lies inside the mapped window(s); pins that don't fit are unavailable.
    pub(crate) fn build<F, V>(pins: u16, address: F, fits: V) -> OffsetTable<A>
    where
        F: Fn(u32) -> A,
        V: Fn(&A) -> bool,
    {
        let entries = (0..u32::from(pins))
            .map(|pin| {
                let addr = address(pin);
                if fits(&addr) {
                    Some(addr)
                } else {
                    None
                }
            })
            .collect();

        OffsetTable { entries }
    }

    pub(crate) fn get(&self, pin: u16) -> Option<A> {
        self.entries.get(pin as usize).copied().flatten()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
