//! Simulated SPI controller with an nRF24L01 register file behind it.
//!
//! The controller is moved into the backend like a real one; a
//! [`SimMonitor`] sharing its state stays with the caller to script replies
//! and inspect what was clocked out.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::bus::{BusSetting, SpiController, Transfer};

const R_REGISTER_MAX: u8 = 0x1F;
const W_REGISTER_MAX: u8 = 0x3F;
const STATUS_ADDR: usize = 0x07;
const READ_ONLY: [usize; 3] = [0x08, 0x09, 0x17];

/// A configuration call as observed by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Write(BusSetting),
    Read(BusSetting),
}

/// Scripted outcome for the next submitted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// MISO bytes for the whole request; missing bytes read as 0x00.
    Respond(Vec<u8>),
    /// The submission call fails outright.
    Fail(io::ErrorKind),
    /// The request completes but reports this many bytes clocked.
    Short(usize),
}

/// MOSI contents of one submitted request, one vector per transfer.
pub type Submission = Vec<Vec<u8>>;

#[derive(Debug)]
struct SimState {
    mode: u8,
    lsb_first: bool,
    bits_per_word: u8,
    speed_hz: u32,
    overrides: HashMap<BusSetting, u32>,
    refused: Vec<BusSetting>,
    steps: Vec<Step>,
    replies: VecDeque<Reply>,
    submissions: Vec<Submission>,
    registers: [[u8; 5]; 32],
    closed: bool,
}

fn reset_registers() -> [[u8; 5]; 32] {
    let mut regs = [[0u8; 5]; 32];
    let single = [
        (0x00, 0x08),
        (0x01, 0x3F),
        (0x02, 0x03),
        (0x03, 0x03),
        (0x04, 0x03),
        (0x05, 0x02),
        (0x06, 0x0F),
        (0x07, 0x0E),
        (0x0C, 0xC3),
        (0x0D, 0xC4),
        (0x0E, 0xC5),
        (0x0F, 0xC6),
        (0x17, 0x11),
    ];
    for (addr, value) in single {
        regs[addr][0] = value;
    }
    regs[0x0A] = [0xE7; 5];
    regs[0x0B] = [0xC2; 5];
    regs[0x10] = [0xE7; 5];
    regs
}

impl SimState {
    fn readback(&self, setting: BusSetting) -> Option<u32> {
        self.overrides.get(&setting).copied()
    }

    fn config(&mut self, step: Step) -> io::Result<()> {
        self.steps.push(step);
        let setting = match step {
            Step::Write(s) | Step::Read(s) => s,
        };
        if self.refused.contains(&setting) {
            return Err(io::Error::from(io::ErrorKind::InvalidInput));
        }
        Ok(())
    }

    /// Serves a request from the register model.
    fn emulate(&mut self, transfers: &mut [Transfer<'_>]) {
        let opcode = transfers.first().and_then(|t| t.tx.first()).copied().unwrap_or(0xFF);
        let addr = usize::from(opcode & R_REGISTER_MAX);
        if let Some(first) = transfers.first_mut() {
            if let Some(b) = first.rx.first_mut() {
                *b = self.registers[STATUS_ADDR][0];
            }
        }
        let Some(data) = transfers.get_mut(1) else { return };
        match opcode {
            0x00..=R_REGISTER_MAX => {
                for (dst, src) in data.rx.iter_mut().zip(self.registers[addr].iter().chain(std::iter::repeat(&0))) {
                    *dst = *src;
                }
            }
            0x20..=W_REGISTER_MAX => {
                data.rx.fill(0);
                if addr == STATUS_ADDR {
                    // interrupt flags are cleared by writing 1
                    self.registers[STATUS_ADDR][0] &= !(data.tx[0] & 0x70);
                } else if READ_ONLY.contains(&addr) {
                    // OBSERVE_TX, RPD, FIFO_STATUS
                } else {
                    let width = data.tx.len().min(5);
                    self.registers[addr][..width].copy_from_slice(&data.tx[..width]);
                }
            }
            _ => data.rx.fill(0),
        }
    }
}

/// The controller half, handed to the code under test.
#[derive(Debug)]
pub struct SimulatedController {
    state: Arc<Mutex<SimState>>,
}

/// The observer half, kept by the test.
#[derive(Debug, Clone)]
pub struct SimMonitor {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedController {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                mode: 0,
                lsb_first: false,
                bits_per_word: 8,
                speed_hz: 0,
                overrides: HashMap::new(),
                refused: Vec::new(),
                steps: Vec::new(),
                replies: VecDeque::new(),
                submissions: Vec::new(),
                registers: reset_registers(),
                closed: false,
            })),
        }
    }

    pub fn monitor(&self) -> SimMonitor {
        SimMonitor {
            state: Arc::clone(&self.state),
        }
    }
}

impl Default for SimulatedController {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SimulatedController {
    fn drop(&mut self) {
        self.state.lock().closed = true;
    }
}

impl SimMonitor {
    /// Makes the controller read back `value` for `setting` regardless of what was written.
    pub fn override_readback(&self, setting: BusSetting, value: u32) {
        self.state.lock().overrides.insert(setting, value);
    }

    /// Makes every write and read of `setting` fail.
    pub fn refuse(&self, setting: BusSetting) {
        self.state.lock().refused.push(setting);
    }

    pub fn push_reply(&self, reply: Reply) {
        self.state.lock().replies.push_back(reply);
    }

    pub fn respond(&self, miso: &[u8]) {
        self.push_reply(Reply::Respond(miso.to_vec()));
    }

    pub fn config_steps(&self) -> Vec<Step> {
        self.state.lock().steps.clone()
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.state.lock().submissions.clone()
    }

    pub fn register(&self, address: u8) -> [u8; 5] {
        self.state.lock().registers[usize::from(address & R_REGISTER_MAX)]
    }

    pub fn set_register(&self, address: u8, value: &[u8]) {
        let mut state = self.state.lock();
        let reg = &mut state.registers[usize::from(address & R_REGISTER_MAX)];
        let width = value.len().min(5);
        reg[..width].copy_from_slice(&value[..width]);
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl SpiController for SimulatedController {
    fn write_mode(&mut self, mode: u8) -> io::Result<()> {
        let mut state = self.state.lock();
        state.config(Step::Write(BusSetting::Mode))?;
        state.mode = mode;
        Ok(())
    }

    fn read_mode(&mut self) -> io::Result<u8> {
        let mut state = self.state.lock();
        state.config(Step::Read(BusSetting::Mode))?;
        Ok(state.readback(BusSetting::Mode).map_or(state.mode, |v| v as u8))
    }

    fn write_lsb_first(&mut self, lsb_first: bool) -> io::Result<()> {
        let mut state = self.state.lock();
        state.config(Step::Write(BusSetting::BitOrder))?;
        state.lsb_first = lsb_first;
        Ok(())
    }

    fn read_lsb_first(&mut self) -> io::Result<bool> {
        let mut state = self.state.lock();
        state.config(Step::Read(BusSetting::BitOrder))?;
        Ok(state.readback(BusSetting::BitOrder).map_or(state.lsb_first, |v| v != 0))
    }

    fn write_bits_per_word(&mut self, bits: u8) -> io::Result<()> {
        let mut state = self.state.lock();
        state.config(Step::Write(BusSetting::WordSize))?;
        state.bits_per_word = bits;
        Ok(())
    }

    fn read_bits_per_word(&mut self) -> io::Result<u8> {
        let mut state = self.state.lock();
        state.config(Step::Read(BusSetting::WordSize))?;
        Ok(state.readback(BusSetting::WordSize).map_or(state.bits_per_word, |v| v as u8))
    }

    fn write_max_speed_hz(&mut self, hz: u32) -> io::Result<()> {
        let mut state = self.state.lock();
        state.config(Step::Write(BusSetting::Speed))?;
        state.speed_hz = hz;
        Ok(())
    }

    fn read_max_speed_hz(&mut self) -> io::Result<u32> {
        let mut state = self.state.lock();
        state.config(Step::Read(BusSetting::Speed))?;
        Ok(state.readback(BusSetting::Speed).unwrap_or(state.speed_hz))
    }

    fn submit(&mut self, transfers: &mut [Transfer<'_>]) -> io::Result<usize> {
        let mut state = self.state.lock();
        state
            .submissions
            .push(transfers.iter().map(|t| t.tx.to_vec()).collect());
        let total = transfers.iter().map(|t| t.tx.len()).sum();

        match state.replies.pop_front() {
            None => {
                state.emulate(transfers);
                Ok(total)
            }
            Some(Reply::Respond(miso)) => {
                let mut bytes = miso.into_iter().chain(std::iter::repeat(0));
                for transfer in transfers.iter_mut() {
                    for (dst, src) in transfer.rx.iter_mut().zip(bytes.by_ref()) {
                        *dst = src;
                    }
                }
                Ok(total)
            }
            Some(Reply::Fail(kind)) => Err(io::Error::from(kind)),
            Some(Reply::Short(n)) => Ok(n),
        }
    }
}
