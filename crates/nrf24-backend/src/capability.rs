//! The capability set handed to the protocol core.
//!
//! A protocol core drives the radio exclusively through [`Backend`]: the CE
//! line, command transactions, a blocking delay and a hook for completed
//! payloads. It never sees the concrete host types behind it.

use std::time::Duration;

use crossbeam_channel::Sender;
use log::{info, warn};

use crate::bus::{ConfiguredBus, SpiController};
use crate::error::Result;
use crate::payload::PayloadEncoding;
use crate::pin::CePin;
use crate::transaction::Payload;

/// Longest delay a single `sleep_us` call honours.
pub const MAX_SLEEP_US: u32 = 1_500;

pub trait Backend {
    /// Drives the chip-enable line.
    fn set_ce(&mut self, high: bool) -> Result<()>;

    /// Sends one command; returns the STATUS register clocked back with the opcode.
    fn transact(&mut self, opcode: u8, payload: Payload<'_>) -> Result<u8>;

    /// Blocks the calling thread for `micros` (at most [`MAX_SLEEP_US`]).
    /// Longer waits are composed from repeated calls.
    fn sleep_us(&mut self, micros: u32);

    /// Called with each complete payload the core receives. The buffer is
    /// only borrowed for the duration of the call.
    fn data_received(&mut self, payload: &[u8]);
}

/// What the backend needs from a protocol core.
pub trait ProtocolCore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Takes ownership of the capability set. Called exactly once.
    fn init(&mut self, backend: Box<dyn Backend>) -> std::result::Result<(), Self::Error>;

    fn prepare_to_transmit(&mut self) -> std::result::Result<(), Self::Error>;

    /// Gives the capability set back, if the core holds it. Called when
    /// bring-up fails after `init` was attempted.
    fn release(&mut self) -> Option<Box<dyn Backend>>;
}

pub(crate) fn blocking_sleep(micros: u32) {
    let micros = if micros > MAX_SLEEP_US {
        warn!("sleep of {micros} us clamped to {MAX_SLEEP_US} us");
        MAX_SLEEP_US
    } else {
        micros
    };
    std::thread::sleep(Duration::from_micros(u64::from(micros)));
}

/// spidev bus plus sysfs CE pin.
pub struct LinuxBackend<C> {
    bus: ConfiguredBus<C>,
    ce: CePin,
    encoding: PayloadEncoding,
    sink: Option<Sender<Vec<u8>>>,
}

impl<C: SpiController> LinuxBackend<C> {
    pub fn new(bus: ConfiguredBus<C>, ce: CePin) -> Self {
        Self {
            bus,
            ce,
            encoding: PayloadEncoding::default(),
            sink: None,
        }
    }

    pub fn with_encoding(mut self, encoding: PayloadEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Forwards a copy of every received payload to `sink`.
    pub fn with_sink(mut self, sink: Sender<Vec<u8>>) -> Self {
        self.sink = Some(sink);
        self
    }
}

impl<C: SpiController> Backend for LinuxBackend<C> {
    fn set_ce(&mut self, high: bool) -> Result<()> {
        self.ce.set_level(high)
    }

    fn transact(&mut self, opcode: u8, payload: Payload<'_>) -> Result<u8> {
        self.bus.transact(opcode, payload)
    }

    fn sleep_us(&mut self, micros: u32) {
        blocking_sleep(micros);
    }

    fn data_received(&mut self, payload: &[u8]) {
        info!("received data ({} bytes): {}", payload.len(), self.encoding.render(payload));
        if let Some(sink) = &self.sink {
            if sink.send(payload.to_vec()).is_err() {
                warn!("payload receiver dropped, no longer forwarding");
                self.sink = None;
            }
        }
    }
}
