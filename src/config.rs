use std::env;
use std::path::{Path, PathBuf};

const PATH_DEVICE_TREE_MODEL: &str = "/proc/device-tree/model";
const PATH_BOARD_NAME: &str = "/var/lib/bananapi/board.sh";
const PATH_DEV_MEM: &str = "/dev/mem";

/// Environment variable holding the diagnostic verbosity level.
pub const ENV_DEBUG: &str = "RPIGPIO_DEBUG";

/// Paths and diagnostic settings shared by board resolution and register access.
///
/// `Config::default()` points at the standard locations on a Banana Pi image
/// and disables the extra diagnostics. Tests and simulators can redirect the
/// paths to fixture files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    device_tree_model: PathBuf,
    board_name: PathBuf,
    dev_mem: PathBuf,
    debug: u8,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            device_tree_model: PathBuf::from(PATH_DEVICE_TREE_MODEL),
            board_name: PathBuf::from(PATH_BOARD_NAME),
            dev_mem: PathBuf::from(PATH_DEV_MEM),
            debug: 0,
        }
    }
}

impl Config {
    /// Constructs a `Config` with the default paths, and the debug level read
    /// from `RPIGPIO_DEBUG`.
    ///
    /// An unset or non-numeric variable results in level 0. Levels above 0
    /// enable progressively more detailed diagnostics: 1 traces calls, 2 adds
    /// computed register addresses, and 4 adds raw register values.
    pub fn from_env() -> Config {
        let debug = env::var(ENV_DEBUG)
            .ok()
            .map(|value| parse_debug_level(&value))
            .unwrap_or(0);

        Config {
            debug,
            ..Config::default()
        }
    }

    /// Sets the path of the device tree model file.
    pub fn with_device_tree_model<P: Into<PathBuf>>(mut self, path: P) -> Config {
        self.device_tree_model = path.into();
        self
    }

    /// Sets the path of the board-name file.
    pub fn with_board_name<P: Into<PathBuf>>(mut self, path: P) -> Config {
        self.board_name = path.into();
        self
    }

    /// Sets the path of the physical memory device.
    pub fn with_dev_mem<P: Into<PathBuf>>(mut self, path: P) -> Config {
        self.dev_mem = path.into();
        self
    }

    /// Sets the debug level.
    pub fn with_debug(mut self, debug: u8) -> Config {
        self.debug = debug;
        self
    }

    pub fn device_tree_model(&self) -> &Path {
        &self.device_tree_model
    }

    pub fn board_name(&self) -> &Path {
        &self.board_name
    }

    pub fn dev_mem(&self) -> &Path {
        &self.dev_mem
    }

    pub fn debug(&self) -> u8 {
        self.debug
    }
}

// Mirrors atoi(): leading digits count, anything else is 0.
fn parse_debug_level(value: &str) -> u8 {
    let digits: String = value
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();

    digits
        .parse::<u32>()
        .map(|level| level.min(u32::from(u8::MAX)) as u8)
        .unwrap_or(0)
}
