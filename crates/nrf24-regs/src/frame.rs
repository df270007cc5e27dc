//! Decoding of one chip-select-qualified nRF24L01 SPI exchange.

use crate::command::Command;
use crate::status::Status;
use crate::FILLER;

/// One command as seen on the wire: MOSI and MISO byte streams of equal length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpiFrame {
    pub command: Command,
    pub status: Status,
    /// Payload bytes following the opcode, in the direction that carries data.
    pub data: Vec<u8>,
    pub host_to_device: bool,
}

impl SpiFrame {
    /// Builds a frame from the MOSI and MISO captures of one exchange.
    ///
    /// Returns `None` for an empty capture. A data phase whose MOSI bytes are
    /// all filler is treated as a read.
    pub fn decode(mosi: &[u8], miso: &[u8]) -> Option<SpiFrame> {
        let (&opcode, mosi_data) = mosi.split_first()?;
        let (&status, miso_data) = miso.split_first()?;
        let host_to_device = is_write(Command::from(opcode), mosi_data);
        let data = if host_to_device { mosi_data } else { miso_data };
        Some(SpiFrame {
            command: Command::from(opcode),
            status: Status(status),
            data: data.to_vec(),
            host_to_device,
        })
    }
}

fn is_write(command: Command, mosi_data: &[u8]) -> bool {
    match command {
        Command::WriteRegister(_)
        | Command::WriteTxPayload
        | Command::WriteAckPayload(_)
        | Command::WriteTxPayloadNoAck
        | Command::Activate => true,
        Command::Unknown(_) => mosi_data.iter().any(|&b| b != FILLER),
        _ => false,
    }
}

impl std::fmt::Display for SpiFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} status={}", self.command, self.status)?;
        if !self.data.is_empty() {
            f.write_str(if self.host_to_device { " >>" } else { " <<" })?;
            for byte in &self.data {
                write!(f, " {byte:02X}")?;
            }
        }
        Ok(())
    }
}
