use nrf24_backend::{Backend, BackendError, Payload, ProtocolCore};
use nrf24_regs::registers::{self, config};
use nrf24_regs::{Command, Register, Status};
use thiserror::Error;

/// Power-down to standby takes up to 1.5 ms (Tpd2stby).
const POWER_UP_DELAY_US: u32 = 1_500;

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("register console is not bound to a backend")]
    NotBound,

    #[error("0x{value:X} does not fit {register} ({} bytes)", .register.width)]
    TooWide { register: Register, value: u64 },

    #[error("{register} reads back 0x{actual:x} after writing 0x{wanted:x}")]
    ReadBack { register: Register, wanted: u64, actual: u64 },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Minimal protocol core: raw register access plus PTX power-up.
#[derive(Default)]
pub struct RegisterConsole {
    backend: Option<Box<dyn Backend>>,
}

impl RegisterConsole {
    fn backend(&mut self) -> Result<&mut dyn Backend, ConsoleError> {
        match self.backend.as_deref_mut() {
            Some(backend) => Ok(backend),
            None => Err(ConsoleError::NotBound),
        }
    }

    /// Reads a register; multi-byte registers come back LSByte first.
    pub fn read(&mut self, register: Register) -> Result<u64, ConsoleError> {
        let mut raw = [0u8; 8];
        let width = usize::from(register.width);
        self.backend()?
            .transact(Command::read(register).opcode(), Payload::Read(&mut raw[..width]))?;
        Ok(u64::from_le_bytes(raw))
    }

    pub fn write(&mut self, register: Register, value: u64) -> Result<(), ConsoleError> {
        if value > register.max_value() {
            return Err(ConsoleError::TooWide { register, value });
        }
        let raw = value.to_le_bytes();
        let width = usize::from(register.width);
        self.backend()?
            .transact(Command::write(register).opcode(), Payload::Write(&raw[..width]))?;
        Ok(())
    }

    /// Writes and returns what the register holds afterwards. Registers
    /// that echo writes must read back the written value.
    pub fn write_checked(&mut self, register: Register, wanted: u64) -> Result<u64, ConsoleError> {
        self.write(register, wanted)?;
        let actual = self.read(register)?;
        if register.reads_back_written() && actual != wanted {
            return Err(ConsoleError::ReadBack { register, wanted, actual });
        }
        Ok(actual)
    }

    pub fn status(&mut self) -> Result<Status, ConsoleError> {
        let status = self.backend()?.transact(Command::Nop.opcode(), Payload::None)?;
        Ok(Status(status))
    }
}

impl ProtocolCore for RegisterConsole {
    type Error = ConsoleError;

    fn init(&mut self, backend: Box<dyn Backend>) -> Result<(), ConsoleError> {
        self.backend = Some(backend);
        Ok(())
    }

    fn prepare_to_transmit(&mut self) -> Result<(), ConsoleError> {
        self.backend()?.set_ce(false)?;
        let current = self.read(registers::CONFIG)?;
        let ptx = (current as u8 | config::PWR_UP) & !config::PRIM_RX;
        self.write(registers::CONFIG, u64::from(ptx))?;
        self.backend()?.sleep_us(POWER_UP_DELAY_US);
        Ok(())
    }

    fn release(&mut self) -> Option<Box<dyn Backend>> {
        self.backend.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nrf24_backend::sim::{SimMonitor, SimulatedController};
    use nrf24_backend::{BackendConfig, Lifecycle};
    use std::fs;

    fn console() -> (RegisterConsole, SimMonitor, tempfile::TempDir) {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("gpio199");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("direction"), "").unwrap();
        fs::write(dir.join("value"), "").unwrap();

        let sim = SimulatedController::new();
        let monitor = sim.monitor();
        let mut console = RegisterConsole::default();
        let mut lifecycle = Lifecycle::new(BackendConfig {
            gpio_root: root.path().to_path_buf(),
            ..BackendConfig::default()
        });
        lifecycle.start_with(|_| Ok(sim), &mut console).unwrap();
        (console, monitor, root)
    }

    #[test]
    fn bring_up_powers_up_in_ptx() {
        let (_console, monitor, root) = console();
        assert_eq!(monitor.register(0x00)[0], 0x0A);
        assert_eq!(fs::read_to_string(root.path().join("gpio199/value")).unwrap(), "0");
    }

    #[test]
    fn address_registers_are_little_endian() {
        let (mut console, monitor, _root) = console();
        monitor.set_register(0x10, &[0x01, 0x02, 0x03, 0x04, 0x05]);
        assert_eq!(console.read(registers::TX_ADDR).unwrap(), 0x05_0403_0201);

        console.write(registers::RX_ADDR_P1, 0xAA_BBCC_DDEE).unwrap();
        assert_eq!(monitor.register(0x0B), [0xEE, 0xDD, 0xCC, 0xBB, 0xAA]);
    }

    #[test]
    fn oversized_values_are_refused() {
        let (mut console, monitor, _root) = console();
        let before = monitor.submissions().len();
        let err = console.write(registers::RF_CH, 0x1FF).unwrap_err();
        assert!(matches!(err, ConsoleError::TooWide { value: 0x1FF, .. }));
        assert_eq!(monitor.submissions().len(), before);
    }

    #[test]
    fn checked_write_returns_the_stored_value() {
        let (mut console, _monitor, _root) = console();
        assert_eq!(console.write_checked(registers::RF_CH, 0x4C).unwrap(), 0x4C);
    }

    #[test]
    fn clearing_status_flags_is_not_a_mismatch() {
        let (mut console, monitor, _root) = console();
        monitor.set_register(0x07, &[0x7E]);
        let after = console.write_checked(registers::STATUS, 0x70).unwrap();
        assert_eq!(after, 0x0E);
    }

    #[test]
    fn writes_to_read_only_registers_are_not_verified() {
        let (mut console, monitor, _root) = console();
        monitor.set_register(0x17, &[0x11]);
        assert_eq!(console.write_checked(registers::FIFO_STATUS, 0x00).unwrap(), 0x11);
    }

    #[test]
    fn status_after_reset() {
        let (mut console, _monitor, _root) = console();
        assert_eq!(console.status().unwrap(), Status(0x0E));
    }

    #[test]
    fn unbound_console_reports_error() {
        let mut console = RegisterConsole::default();
        assert!(matches!(console.status(), Err(ConsoleError::NotBound)));
        assert!(console.release().is_none());
    }
}
