#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub(crate) mod macros;
pub(crate) use macros::*;

pub mod controller;
pub mod memory;
pub mod message;
pub mod module;
pub mod monitor;
pub mod pool;
pub mod settings;
pub mod status;

pub use critical_section;

pub use controller::CanController;
pub use message::rx::{RxFilter, RxHandler, RxSlot};
pub use message::tx::{TxSlot, TxSlotRef};
pub use message::CanFrame;
pub use module::{CanModule, ConfigError, Error};
pub use monitor::{ErrorCounters, ErrorMonitor};
pub use settings::{BitRate, FilterStrategy, Settings};
pub use status::ErrorStatus;
