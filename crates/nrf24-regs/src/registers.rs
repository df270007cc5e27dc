use serde::Serialize;

/// A register of the transceiver's memory map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Register {
    pub name: &'static str,
    pub address: u8,
    /// Width in bytes. Address registers are as wide as the maximum address (5 bytes).
    pub width: u8,
}

const fn reg(name: &'static str, address: u8, width: u8) -> Register {
    Register { name, address, width }
}

pub const CONFIG: Register = reg("CONFIG", 0x00, 1);
pub const EN_AA: Register = reg("EN_AA", 0x01, 1);
pub const EN_RXADDR: Register = reg("EN_RXADDR", 0x02, 1);
pub const SETUP_AW: Register = reg("SETUP_AW", 0x03, 1);
pub const SETUP_RETR: Register = reg("SETUP_RETR", 0x04, 1);
pub const RF_CH: Register = reg("RF_CH", 0x05, 1);
pub const RF_SETUP: Register = reg("RF_SETUP", 0x06, 1);
pub const STATUS: Register = reg("STATUS", 0x07, 1);
pub const OBSERVE_TX: Register = reg("OBSERVE_TX", 0x08, 1);
pub const RPD: Register = reg("RPD", 0x09, 1);
pub const RX_ADDR_P0: Register = reg("RX_ADDR_P0", 0x0A, 5);
pub const RX_ADDR_P1: Register = reg("RX_ADDR_P1", 0x0B, 5);
pub const RX_ADDR_P2: Register = reg("RX_ADDR_P2", 0x0C, 1);
pub const RX_ADDR_P3: Register = reg("RX_ADDR_P3", 0x0D, 1);
pub const RX_ADDR_P4: Register = reg("RX_ADDR_P4", 0x0E, 1);
pub const RX_ADDR_P5: Register = reg("RX_ADDR_P5", 0x0F, 1);
pub const TX_ADDR: Register = reg("TX_ADDR", 0x10, 5);
pub const RX_PW_P0: Register = reg("RX_PW_P0", 0x11, 1);
pub const RX_PW_P1: Register = reg("RX_PW_P1", 0x12, 1);
pub const RX_PW_P2: Register = reg("RX_PW_P2", 0x13, 1);
pub const RX_PW_P3: Register = reg("RX_PW_P3", 0x14, 1);
pub const RX_PW_P4: Register = reg("RX_PW_P4", 0x15, 1);
pub const RX_PW_P5: Register = reg("RX_PW_P5", 0x16, 1);
pub const FIFO_STATUS: Register = reg("FIFO_STATUS", 0x17, 1);
pub const DYNPD: Register = reg("DYNPD", 0x1C, 1);
pub const FEATURE: Register = reg("FEATURE", 0x1D, 1);

/// The whole map, in address order.
pub const ALL: [Register; 26] = [
    CONFIG, EN_AA, EN_RXADDR, SETUP_AW, SETUP_RETR, RF_CH, RF_SETUP, STATUS,
    OBSERVE_TX, RPD, RX_ADDR_P0, RX_ADDR_P1, RX_ADDR_P2, RX_ADDR_P3, RX_ADDR_P4,
    RX_ADDR_P5, TX_ADDR, RX_PW_P0, RX_PW_P1, RX_PW_P2, RX_PW_P3, RX_PW_P4,
    RX_PW_P5, FIFO_STATUS, DYNPD, FEATURE,
];

/// CONFIG register bits.
pub mod config {
    pub const MASK_RX_DR: u8 = 1 << 6;
    pub const MASK_TX_DS: u8 = 1 << 5;
    pub const MASK_MAX_RT: u8 = 1 << 4;
    pub const EN_CRC: u8 = 1 << 3;
    pub const CRCO: u8 = 1 << 2;
    pub const PWR_UP: u8 = 1 << 1;
    pub const PRIM_RX: u8 = 1 << 0;
}

impl Register {
    /// Looks a register up by name, case-insensitively. A trailing `_RG`
    /// suffix is tolerated so older register tables keep working.
    pub fn from_name(name: &str) -> Option<Register> {
        let name = name.trim();
        let upper = name.to_ascii_uppercase();
        let bare = upper.strip_suffix("_RG").unwrap_or(&upper);
        ALL.iter().copied().find(|r| r.name == bare)
    }

    pub fn from_address(address: u8) -> Option<Register> {
        ALL.iter().copied().find(|r| r.address == address)
    }

    /// Largest value that fits the register width.
    pub fn max_value(&self) -> u64 {
        if self.width >= 8 {
            u64::MAX
        } else {
            (1u64 << (u32::from(self.width) * 8)) - 1
        }
    }

    /// Whether a write is expected to read back unchanged. STATUS flags
    /// are write-1-to-clear; OBSERVE_TX, RPD and FIFO_STATUS are read-only.
    pub fn reads_back_written(&self) -> bool {
        ![STATUS, OBSERVE_TX, RPD, FIFO_STATUS].contains(self)
    }
}

impl std::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_is_sorted_and_unique() {
        for pair in ALL.windows(2) {
            assert!(pair[0].address < pair[1].address, "{} / {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(Register::from_name("config"), Some(CONFIG));
        assert_eq!(Register::from_name("RX_ADDR_P0_RG"), Some(RX_ADDR_P0));
        assert_eq!(Register::from_name(" FEATURE\n"), Some(FEATURE));
        assert_eq!(Register::from_name("BOGUS"), None);
    }

    #[test]
    fn lookup_by_address() {
        assert_eq!(Register::from_address(0x17), Some(FIFO_STATUS));
        assert_eq!(Register::from_address(0x18), None);
    }

    #[test]
    fn max_value_follows_width() {
        assert_eq!(RF_CH.max_value(), 0xFF);
        assert_eq!(TX_ADDR.max_value(), 0xFF_FFFF_FFFF);
    }

    #[test]
    fn status_and_read_only_registers_do_not_echo_writes() {
        let volatile: Vec<&str> = ALL
            .iter()
            .filter(|r| !r.reads_back_written())
            .map(|r| r.name)
            .collect();
        assert_eq!(volatile, ["STATUS", "OBSERVE_TX", "RPD", "FIFO_STATUS"]);
    }
}
