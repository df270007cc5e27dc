/// The STATUS register as clocked out during every command phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status(pub u8);

impl Status {
    pub const RX_DR: u8 = 1 << 6;
    pub const TX_DS: u8 = 1 << 5;
    pub const MAX_RT: u8 = 1 << 4;
    pub const TX_FULL: u8 = 1 << 0;

    pub fn rx_data_ready(&self) -> bool {
        self.0 & Self::RX_DR != 0
    }

    pub fn tx_data_sent(&self) -> bool {
        self.0 & Self::TX_DS != 0
    }

    pub fn max_retransmits(&self) -> bool {
        self.0 & Self::MAX_RT != 0
    }

    pub fn tx_full(&self) -> bool {
        self.0 & Self::TX_FULL != 0
    }

    /// Pipe number of the payload at the head of the RX FIFO, `None` when empty.
    pub fn rx_pipe(&self) -> Option<u8> {
        match (self.0 >> 1) & 0x07 {
            pipe @ 0..=5 => Some(pipe),
            _ => None,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:02X}", self.0)?;
        let flags = [
            (self.rx_data_ready(), "RX_DR"),
            (self.tx_data_sent(), "TX_DS"),
            (self.max_retransmits(), "MAX_RT"),
            (self.tx_full(), "TX_FULL"),
        ];
        for (_, name) in flags.iter().filter(|(set, _)| *set) {
            write!(f, " {name}")?;
        }
        match self.rx_pipe() {
            Some(pipe) => write!(f, " RX_P_NO={pipe}"),
            None => f.write_str(" RX_EMPTY"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_value_decodes_as_empty() {
        let status = Status(0x0E);
        assert_eq!(status.rx_pipe(), None);
        assert!(!status.rx_data_ready());
        assert_eq!(status.to_string(), "0x0E RX_EMPTY");
    }

    #[test]
    fn flags_and_pipe() {
        let status = Status(0x40 | 0x20 | (2 << 1) | 0x01);
        assert!(status.rx_data_ready());
        assert!(status.tx_data_sent());
        assert!(status.tx_full());
        assert_eq!(status.rx_pipe(), Some(2));
        assert_eq!(status.to_string(), "0x65 RX_DR TX_DS TX_FULL RX_P_NO=2");
    }
}
