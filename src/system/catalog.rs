//! Static board metadata.
//!
//! The catalog is indexed by model id: entry `n` describes model `n`. Entries
//! below [`MODEL_MIN`] are placeholders kept so the indices line up with the
//! model, maker and memory name tables, and are never reported as detected.

use std::fmt;

/// Lowest model id that identifies a real, supported board.
pub const MODEL_MIN: u32 = 21;
/// Model id of the Banana Pi M2 Zero.
pub const MODEL_M2Z: u32 = 33;

const MAKER_SINOVOIP: u32 = 5;

/// Register layout used by a board's GPIO controller.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum RegisterFamily {
    /// Allwinner banked registers, with a separate R_PIO block for the high banks.
    Sunxi,
    /// MediaTek flat-offset registers.
    Mtk,
}

impl fmt::Display for RegisterFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RegisterFamily::Sunxi => write!(f, "Allwinner"),
            RegisterFamily::Mtk => write!(f, "MTK"),
        }
    }
}

/// Identifies the pin-number translation tables for a board.
///
/// The tables themselves (logical pin to SoC pin, physical header pin to SoC
/// pin, and logical pin to BCM alias) belong to the pin-numbering layer.
/// Several boards share the same header wiring, and therefore the same tables.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum PinMapId {
    BpiM1Plus,
    BpiM2,
    BpiM3,
    BpiM2Plus,
    BpiM64,
    BpiM2Ultra,
    BpiM2Magic,
    BpiR2,
}

impl fmt::Display for PinMapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            PinMapId::BpiM1Plus => write!(f, "BPI_M1P"),
            PinMapId::BpiM2 => write!(f, "BPI_M2"),
            PinMapId::BpiM3 => write!(f, "BPI_M3"),
            PinMapId::BpiM2Plus => write!(f, "BPI_M2P"),
            PinMapId::BpiM64 => write!(f, "BPI_M64"),
            PinMapId::BpiM2Ultra => write!(f, "BPI_M2U"),
            PinMapId::BpiM2Magic => write!(f, "BPI_M2M"),
            PinMapId::BpiR2 => write!(f, "BPI_R2"),
        }
    }
}

/// A supported board, as listed in the static catalog.
///
/// Descriptors can't be constructed outside this crate. Use [`catalog`],
/// [`find_by_name`] or [`find_by_model`] to look one up.
#[derive(Debug, PartialEq, Eq)]
pub struct BoardDescriptor {
    name: &'static str,
    layout: i32,
    model: u32,
    revision: u32,
    memory: u32,
    maker: u32,
    warranty: bool,
    pin_map: Option<PinMapId>,
    family: RegisterFamily,
}

impl BoardDescriptor {
    /// Returns the board name, as written to the board-name file.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the GPIO layout number, or -1 for placeholder entries.
    pub fn layout(&self) -> i32 {
        self.layout
    }

    /// Returns the model id. This is also the descriptor's index in the catalog.
    pub fn model(&self) -> u32 {
        self.model
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// Returns the memory size code. See [`memory_size`].
    pub fn memory(&self) -> u32 {
        self.memory
    }

    /// Returns the manufacturer code. See [`maker_name`].
    pub fn maker(&self) -> u32 {
        self.maker
    }

    pub fn warranty(&self) -> bool {
        self.warranty
    }

    /// Returns the pin map used by this board, or `None` for placeholder entries.
    pub fn pin_map(&self) -> Option<PinMapId> {
        self.pin_map
    }

    /// Returns the register layout of the board's GPIO controller.
    pub fn family(&self) -> RegisterFamily {
        self.family
    }

    /// Returns `true` if this entry identifies a real, supported board.
    pub fn is_supported(&self) -> bool {
        self.model >= MODEL_MIN
    }
}

static BOARDS: [BoardDescriptor; 35] = [
    board!("bpi-0", -1, 0, 2),
    board!("bpi-1", -1, 1, 2),
    board!("bpi-2", -1, 2, 2),
    board!("bpi-3", -1, 3, 2),
    board!("bpi-4", -1, 4, 2),
    board!("bpi-5", -1, 5, 2),
    board!("bpi-6", -1, 6, 2),
    board!("bpi-7", -1, 7, 2),
    board!("bpi-8", -1, 8, 2),
    board!("bpi-9", -1, 9, 2),
    board!("bpi-10", -1, 10, 2),
    board!("bpi-11", -1, 11, 2),
    board!("bpi-12", -1, 12, 2),
    board!("bpi-13", -1, 13, 2),
    board!("bpi-14", -1, 14, 2),
    board!("bpi-15", -1, 15, 2),
    board!("bpi-new", -1, 16, 2),
    board!("bpi-x86", -1, 17, 2),
    board!("bpi-rpi", -1, 18, 2),
    board!("bpi-rpi2", -1, 19, 2),
    board!("bpi-rpi3", -1, 20, 2),
    board!("bpi-m1", 10001, 21, 2, PinMapId::BpiM1Plus),
    board!("bpi-m1p", 10001, 22, 2, PinMapId::BpiM1Plus),
    board!("bpi-r1", 10001, 23, 2, PinMapId::BpiM1Plus),
    board!("bpi-m2", 10101, 24, 2, PinMapId::BpiM2),
    board!("bpi-m3", 10201, 25, 3, PinMapId::BpiM3),
    board!("bpi-m2p", 10301, 26, 3, PinMapId::BpiM2Plus),
    board!("bpi-m64", 10401, 27, 3, PinMapId::BpiM64),
    board!("bpi-m2u", 10501, 28, 3, PinMapId::BpiM2Ultra),
    board!("bpi-m2m", 10601, 29, 1, PinMapId::BpiM2Magic),
    board!("bpi-m2p_H2+", 10701, 30, 2, PinMapId::BpiM2Plus),
    board!("bpi-m2p_H5", 10801, 31, 2, PinMapId::BpiM2Plus),
    board!("bpi-m2u_V40", 10901, 32, 3, PinMapId::BpiM2Ultra),
    board!("bpi-m2z", 11001, MODEL_M2Z, 1, PinMapId::BpiM2Plus),
    board!(
        "bpi-r2",
        11101,
        34,
        3,
        Some(PinMapId::BpiR2),
        RegisterFamily::Mtk
    ),
];

static MODEL_NAMES: [&str; 35] = [
    "Model A",
    "Model B",
    "Model A+",
    "Model B+",
    "Pi 2",
    "Alpha",
    "CM",
    "Unknown07",
    "Pi 3",
    "Pi Zero",
    "CM3",
    "Unknown11",
    "Pi Zero-W",
    "Unknown13",
    "Unknown14",
    "Unknown15",
    "Banana Pi[New]",
    "Banana Pi[X86]",
    "Raspbery Pi[RPI]",
    "Raspbery Pi[RPI2]",
    "Raspbery Pi[RPI3]",
    "Banana Pi M1[A20]",
    "Banana Pi M1+[A20]",
    "Banana Pi R1[A20]",
    "Banana Pi M2[A31s]",
    "Banana Pi M3[A83T]",
    "Banana Pi M2+[H3]",
    "Banana Pi M64[A64]",
    "Banana Pi M2 Ultra[R40]",
    "Banana Pi M2 Magic[R16]",
    "Banana Pi M2+[H2+]",
    "Banana Pi M2+[H5]",
    "Banana Pi M2 Ultra[V40]",
    "Banana Pi M2 Zero[H2+]",
    "Banana Pi R2[MT7623]",
];

static MAKER_NAMES: [&str; 16] = [
    "Sony",
    "Egoman",
    "Embest",
    "Unknown",
    "Embest",
    "BPI-Sinovoip",
    "Unknown06",
    "Unknown07",
    "Unknown08",
    "Unknown09",
    "Unknown10",
    "Unknown11",
    "Unknown12",
    "Unknown13",
    "Unknown14",
    "Unknown15",
];

// Megabytes, indexed by memory code. Codes 5-7 are unassigned.
static MEMORY_SIZES: [u32; 8] = [256, 512, 1024, 2048, 4096, 0, 0, 0];

// Marketing model strings exposed through the device tree.
static DEVICE_TREE_MODELS: [(&str, u32); 1] = [("Banana Pi M2 Zero", MODEL_M2Z)];

/// Returns every catalog entry, indexed by model id.
pub fn catalog() -> &'static [BoardDescriptor] {
    &BOARDS
}

/// Looks up a board by the name used in the board-name file.
pub fn find_by_name(name: &str) -> Option<&'static BoardDescriptor> {
    BOARDS.iter().find(|board| board.name == name)
}

/// Looks up a board by model id.
pub fn find_by_model(model: u32) -> Option<&'static BoardDescriptor> {
    BOARDS.get(model as usize)
}

/// Looks up the model id for a device tree model string.
pub fn find_by_device_tree_model(model: &str) -> Option<u32> {
    DEVICE_TREE_MODELS
        .iter()
        .find(|(name, _)| *name == model)
        .map(|&(_, id)| id)
}

/// Returns the human-readable model name for a model id.
pub fn model_name(model: u32) -> Option<&'static str> {
    MODEL_NAMES.get(model as usize).copied()
}

/// Returns the manufacturer name for a maker code.
pub fn maker_name(maker: u32) -> Option<&'static str> {
    MAKER_NAMES.get(maker as usize).copied()
}

/// Returns the memory size in megabytes for a memory code.
pub fn memory_size(memory: u32) -> Option<u32> {
    MEMORY_SIZES.get(memory as usize).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_matches_index() {
        for (idx, board) in catalog().iter().enumerate() {
            assert_eq!(board.model() as usize, idx, "{}", board.name());
        }
    }

    #[test]
    fn names_are_unique() {
        for board in catalog() {
            let matches = catalog()
                .iter()
                .filter(|other| other.name() == board.name())
                .count();
            assert_eq!(matches, 1, "{}", board.name());

            let found = find_by_name(board.name()).map(|found| found.model());
            assert_eq!(found, Some(board.model()));
        }
    }

    #[test]
    fn tables_cover_every_board() {
        for board in catalog() {
            assert!(model_name(board.model()).is_some());
            assert!(maker_name(board.maker()).is_some());
            assert!(memory_size(board.memory()).is_some());
        }
    }

    #[test]
    fn supported_boards_have_pin_maps() {
        for board in catalog() {
            assert_eq!(board.is_supported(), board.pin_map().is_some());
            assert_eq!(board.is_supported(), board.layout() > 0);
        }
    }

    #[test]
    fn only_r2_uses_mtk() {
        let mtk: Vec<&str> = catalog()
            .iter()
            .filter(|board| board.family() == RegisterFamily::Mtk)
            .map(|board| board.name())
            .collect();

        assert_eq!(mtk, vec!["bpi-r2"]);
    }

    #[test]
    fn device_tree_lookup() {
        assert_eq!(find_by_device_tree_model("Banana Pi M2 Zero"), Some(33));
        assert_eq!(find_by_device_tree_model("Banana Pi M2 Zero\n"), None);
        assert_eq!(find_by_device_tree_model("Raspberry Pi 4 Model B"), None);
    }

    #[test]
    fn unknown_codes() {
        assert_eq!(find_by_model(35), None);
        assert_eq!(model_name(64), None);
        assert_eq!(maker_name(16), None);
        assert_eq!(memory_size(8), None);
        assert_eq!(memory_size(5), Some(0));
    }
}
