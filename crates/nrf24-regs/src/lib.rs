//! nRF24L01 register map, SPI command opcodes and frame decoding.
//!
//! Everything here is descriptive: no I/O, just the tables and bit layouts
//! the transceiver datasheet defines.

pub mod command;
pub mod frame;
pub mod registers;
pub mod status;

pub use command::{opcode, Command};
pub use frame::SpiFrame;
pub use registers::Register;
pub use status::Status;

/// Value clocked out on MOSI while the host is only reading.
pub const FILLER: u8 = 0xFF;
