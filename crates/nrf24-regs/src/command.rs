//! SPI command set.
//!
//! Every command starts with a one-byte opcode on a fresh CSN falling edge;
//! the STATUS register is shifted out on MISO while the opcode goes in.

use crate::registers::Register;

pub mod opcode {
    pub const R_REGISTER: u8 = 0x00;
    pub const W_REGISTER: u8 = 0x20;
    pub const REGISTER_MASK: u8 = 0x1F;
    pub const ACTIVATE: u8 = 0x50;
    pub const R_RX_PL_WID: u8 = 0x60;
    pub const R_RX_PAYLOAD: u8 = 0x61;
    pub const W_TX_PAYLOAD: u8 = 0xA0;
    pub const W_ACK_PAYLOAD: u8 = 0xA8;
    pub const W_TX_PAYLOAD_NO_ACK: u8 = 0xB0;
    pub const FLUSH_TX: u8 = 0xE1;
    pub const FLUSH_RX: u8 = 0xE2;
    pub const REUSE_TX_PL: u8 = 0xE3;
    pub const NOP: u8 = 0xFF;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ReadRegister(u8),
    WriteRegister(u8),
    Activate,
    ReadRxPayloadWidth,
    ReadRxPayload,
    WriteTxPayload,
    WriteAckPayload(u8),
    WriteTxPayloadNoAck,
    FlushTx,
    FlushRx,
    ReuseTxPayload,
    Nop,
    Unknown(u8),
}

impl Command {
    pub fn read(register: Register) -> Self {
        Self::ReadRegister(register.address)
    }

    pub fn write(register: Register) -> Self {
        Self::WriteRegister(register.address)
    }

    pub fn opcode(&self) -> u8 {
        match *self {
            Self::ReadRegister(addr) => opcode::R_REGISTER | (addr & opcode::REGISTER_MASK),
            Self::WriteRegister(addr) => opcode::W_REGISTER | (addr & opcode::REGISTER_MASK),
            Self::Activate => opcode::ACTIVATE,
            Self::ReadRxPayloadWidth => opcode::R_RX_PL_WID,
            Self::ReadRxPayload => opcode::R_RX_PAYLOAD,
            Self::WriteTxPayload => opcode::W_TX_PAYLOAD,
            Self::WriteAckPayload(pipe) => opcode::W_ACK_PAYLOAD | (pipe & 0x07),
            Self::WriteTxPayloadNoAck => opcode::W_TX_PAYLOAD_NO_ACK,
            Self::FlushTx => opcode::FLUSH_TX,
            Self::FlushRx => opcode::FLUSH_RX,
            Self::ReuseTxPayload => opcode::REUSE_TX_PL,
            Self::Nop => opcode::NOP,
            Self::Unknown(raw) => raw,
        }
    }
}

impl From<u8> for Command {
    fn from(raw: u8) -> Self {
        match raw {
            0x00..=0x1F => Self::ReadRegister(raw & opcode::REGISTER_MASK),
            0x20..=0x3F => Self::WriteRegister(raw & opcode::REGISTER_MASK),
            opcode::ACTIVATE => Self::Activate,
            opcode::R_RX_PL_WID => Self::ReadRxPayloadWidth,
            opcode::R_RX_PAYLOAD => Self::ReadRxPayload,
            opcode::W_TX_PAYLOAD => Self::WriteTxPayload,
            0xA8..=0xAD => Self::WriteAckPayload(raw & 0x07),
            opcode::W_TX_PAYLOAD_NO_ACK => Self::WriteTxPayloadNoAck,
            opcode::FLUSH_TX => Self::FlushTx,
            opcode::FLUSH_RX => Self::FlushRx,
            opcode::REUSE_TX_PL => Self::ReuseTxPayload,
            opcode::NOP => Self::Nop,
            other => Self::Unknown(other),
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reg_name = |addr: u8| Register::from_address(addr).map(|r| r.name).unwrap_or("?");
        match *self {
            Self::ReadRegister(addr) => write!(f, "R_REGISTER({})", reg_name(addr)),
            Self::WriteRegister(addr) => write!(f, "W_REGISTER({})", reg_name(addr)),
            Self::Activate => f.write_str("ACTIVATE"),
            Self::ReadRxPayloadWidth => f.write_str("R_RX_PL_WID"),
            Self::ReadRxPayload => f.write_str("R_RX_PAYLOAD"),
            Self::WriteTxPayload => f.write_str("W_TX_PAYLOAD"),
            Self::WriteAckPayload(pipe) => write!(f, "W_ACK_PAYLOAD(P{pipe})"),
            Self::WriteTxPayloadNoAck => f.write_str("W_TX_PAYLOAD_NO_ACK"),
            Self::FlushTx => f.write_str("FLUSH_TX"),
            Self::FlushRx => f.write_str("FLUSH_RX"),
            Self::ReuseTxPayload => f.write_str("REUSE_TX_PL"),
            Self::Nop => f.write_str("NOP"),
            Self::Unknown(raw) => write!(f, "0x{raw:02X}"),
        }
    }
}
