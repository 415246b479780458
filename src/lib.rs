//! BPI-GPIO provides register-level access to the GPIO controller of Banana Pi
//! single-board computers. Boards built on Allwinner (sunxi) SoCs use the
//! banked sunxi register layout, and the Banana Pi R2 uses the flat MediaTek
//! (MT7623) layout.
//!
//! The [`system`] module identifies the board through the device tree model
//! string or the board-name file written during image provisioning, and the
//! [`gpio`] module maps the GPIO registers through `/dev/mem` and exposes
//! pin direction, pull-up/pull-down, read and write primitives.
//!
//! Translating physical header pins into SoC pin numbers is left to the caller.
//! Resolved boards only report which pin map applies through
//! [`system::PinMapId`].

// Used by rustdoc to link other crates to bpi-gpio's docs
#![doc(html_root_url = "https://docs.rs/bpi-gpio/0.1.0")]

#[macro_use]
mod macros;

mod config;
pub mod gpio;
pub mod system;

pub use crate::config::{Config, ENV_DEBUG};
