// Copyright (c) 2017-2019 Rene van der Meer
//
// Permission is hereby granted, free of charge, to any person obtaining a
// copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL
// THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

//! Banana Pi board identification.
//!
//! Use [`Resolver`] to identify the board once, and keep it around for as long
//! as the result is needed. [`DeviceInfo`] wraps a single resolution pass with
//! the default configuration.
//!
//! The board is identified based on the contents of `/proc/device-tree/model`,
//! and if that doesn't match a supported board, the `BOARD=<name>` line in
//! `/var/lib/bananapi/board.sh`.
//!
//! [`Resolver`]: struct.Resolver.html
//! [`DeviceInfo`]: struct.DeviceInfo.html

use std::error;
use std::fmt;
use std::fs;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::result;

use log::debug;

use crate::config::Config;

mod catalog;

pub use self::catalog::{
    catalog, find_by_device_tree_model, find_by_model, find_by_name, maker_name, memory_size,
    model_name, BoardDescriptor, PinMapId, RegisterFamily, MODEL_M2Z, MODEL_MIN,
};

const REVISION_DEFAULT: &str = "4001";
// The M2 Zero reports itself as a Raspberry Pi Zero W.
const REVISION_M2Z: &str = "9000c1";
const P1_REVISION: u32 = 3;

/// Errors that can occur when trying to identify the Banana Pi hardware.
#[derive(Debug)]
pub enum Error {
    /// Unknown model.
    ///
    /// The board couldn't be identified based on the contents of
    /// `/proc/device-tree/model` or `/var/lib/bananapi/board.sh`, or the
    /// identified board isn't supported.
    UnknownModel,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::UnknownModel => write!(f, "Unknown Banana Pi model"),
        }
    }
}

impl error::Error for Error {}

/// Result type returned from methods that can have `system::Error`s.
pub type Result<T> = result::Result<T, Error>;

/// Board resolution status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardState {
    /// No resolution pass has run yet.
    Unresolved,
    /// Neither probe identified a supported board.
    NotFound,
    /// A supported board was identified.
    Found(BoardIdentity),
}

impl BoardState {
    /// Returns the identified board, if any.
    pub fn identity(&self) -> Option<&BoardIdentity> {
        match self {
            BoardState::Found(identity) => Some(identity),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, BoardState::Found(_))
    }
}

/// An identified board, along with the information derived from its catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardIdentity {
    descriptor: &'static BoardDescriptor,
    type_name: String,
    ram: String,
    manufacturer: String,
    revision: String,
}

impl BoardIdentity {
    fn new(descriptor: &'static BoardDescriptor) -> BoardIdentity {
        let megabytes = catalog::memory_size(descriptor.memory()).unwrap_or(0);

        let revision = if descriptor.model() == MODEL_M2Z {
            REVISION_M2Z
        } else {
            REVISION_DEFAULT
        };

        BoardIdentity {
            descriptor,
            type_name: catalog::model_name(descriptor.model())
                .unwrap_or("Unknown")
                .to_owned(),
            ram: format!("{}MB", megabytes),
            manufacturer: catalog::maker_name(descriptor.maker())
                .unwrap_or("Unknown")
                .to_owned(),
            revision: revision.to_owned(),
        }
    }

    /// Returns the catalog entry for this board.
    pub fn descriptor(&self) -> &'static BoardDescriptor {
        self.descriptor
    }

    /// Returns the board name, for instance `bpi-m2p`.
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// Returns the model id.
    pub fn model(&self) -> u32 {
        self.descriptor.model()
    }

    /// Returns the human-readable model name, for instance `Banana Pi M2+[H3]`.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the installed RAM, for instance `1024MB`.
    pub fn ram(&self) -> &str {
        &self.ram
    }

    pub fn manufacturer(&self) -> &str {
        &self.manufacturer
    }

    /// Returns the processor family label, either `Allwinner` or `MTK`.
    pub fn processor(&self) -> String {
        self.descriptor.family().to_string()
    }

    /// Returns the revision string reported to the pin-numbering layer.
    pub fn revision(&self) -> &str {
        &self.revision
    }

    /// Returns the header revision. All supported boards use the 40-pin layout.
    pub fn p1_revision(&self) -> u32 {
        P1_REVISION
    }

    /// Returns the register layout of the board's GPIO controller.
    pub fn family(&self) -> RegisterFamily {
        self.descriptor.family()
    }

    /// Returns the pin-number translation tables used by this board.
    pub fn pin_map(&self) -> Option<PinMapId> {
        self.descriptor.pin_map()
    }
}

impl fmt::Display for BoardIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {}, {} by {})",
            self.type_name,
            self.name(),
            self.ram,
            self.processor(),
            self.manufacturer
        )
    }
}

// Identify the model based on the device tree model string
fn parse_device_tree_model(path: &Path) -> Option<u32> {
    let mut file = BufReader::new(File::open(path).ok()?);

    let mut line = String::new();
    if file.read_line(&mut line).ok()? == 0 {
        return None;
    }

    // The kernel exposes the model NUL-terminated, usually without a newline.
    find_by_device_tree_model(&line)
        .or_else(|| find_by_device_tree_model(line.trim_end_matches(&['\0', '\n', '\r'][..])))
}

// Identify the board based on the BOARD=<name> lines in the board-name file
fn parse_board_name(path: &Path) -> Option<&'static BoardDescriptor> {
    let contents = fs::read(path).ok()?;
    let contents = String::from_utf8_lossy(&contents);

    for line in contents.lines() {
        let name = match line
            .strip_prefix("BOARD=")
            .and_then(|rest| rest.split_whitespace().next())
        {
            Some(name) => name,
            None => continue,
        };

        if let Some(board) = find_by_name(name) {
            if board.is_supported() {
                return Some(board);
            }
        }
    }

    None
}

/// Identifies the board, and caches the result.
///
/// The first call to [`resolve`] probes the board. Every later call returns
/// the cached state without touching the filesystem again.
///
/// [`resolve`]: #method.resolve
#[derive(Debug, Clone)]
pub struct Resolver {
    config: Config,
    state: BoardState,
}

impl Default for Resolver {
    fn default() -> Resolver {
        Resolver::new(Config::default())
    }
}

impl Resolver {
    /// Constructs a new, unresolved `Resolver`.
    pub fn new(config: Config) -> Resolver {
        Resolver {
            config,
            state: BoardState::Unresolved,
        }
    }

    /// Returns the configuration used for probing.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the current state without probing.
    pub fn state(&self) -> &BoardState {
        &self.state
    }

    /// Identifies the board, unless that already happened.
    pub fn resolve(&mut self) -> &BoardState {
        if self.state == BoardState::Unresolved {
            self.state = match self.probe() {
                Some(board) => BoardState::Found(BoardIdentity::new(board)),
                None => BoardState::NotFound,
            };
        }

        &self.state
    }

    fn probe(&self) -> Option<&'static BoardDescriptor> {
        let debug = self.config.debug();

        if let Some(model) = parse_device_tree_model(self.config.device_tree_model()) {
            if model >= MODEL_MIN {
                debug_at!(debug, 2, "Banana Pi device tree found layout {}", model);
                return find_by_model(model);
            }
        }

        match parse_board_name(self.config.board_name()) {
            Some(board) => {
                debug_at!(
                    debug,
                    2,
                    "Banana Pi '{}' found layout {}",
                    self.config.board_name().display(),
                    board.model()
                );
                Some(board)
            }
            None => {
                debug!("No supported Banana Pi board found");
                None
            }
        }
    }
}

/// Retrieves Banana Pi device information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    identity: BoardIdentity,
}

impl DeviceInfo {
    /// Constructs a new `DeviceInfo`.
    ///
    /// `new` attempts to identify the board based on the contents of
    /// `/proc/device-tree/model` and `/var/lib/bananapi/board.sh`.
    pub fn new() -> Result<DeviceInfo> {
        DeviceInfo::with_config(Config::from_env())
    }

    /// Constructs a new `DeviceInfo` using the specified configuration.
    pub fn with_config(config: Config) -> Result<DeviceInfo> {
        let mut resolver = Resolver::new(config);

        match resolver.resolve() {
            BoardState::Found(identity) => Ok(DeviceInfo {
                identity: identity.clone(),
            }),
            _ => Err(Error::UnknownModel),
        }
    }

    /// Returns the identified board.
    pub fn identity(&self) -> &BoardIdentity {
        &self.identity
    }

    /// Returns the register layout of the board's GPIO controller.
    pub fn family(&self) -> RegisterFamily {
        self.identity.family()
    }
}
