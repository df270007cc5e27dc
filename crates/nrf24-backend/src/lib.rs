//! nRF24L01 backend for Linux hosts: spidev command transport, sysfs
//! chip-enable control and the capability set a protocol core drives the
//! radio through.

pub mod bus;
pub mod capability;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod payload;
pub mod pin;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod trace;
pub mod transaction;

pub use bus::{BusSetting, BusSettings, ConfiguredBus, SpiController, SpidevController, Transfer};
pub use capability::{Backend, LinuxBackend, ProtocolCore, MAX_SLEEP_US};
pub use config::BackendConfig;
pub use error::{BackendError, ErrorKind, Result};
pub use lifecycle::{Lifecycle, Stage};
pub use payload::PayloadEncoding;
pub use pin::CePin;
pub use trace::{SharedTrace, TraceEntry, TraceLog};
pub use transaction::{Payload, FILLER};
