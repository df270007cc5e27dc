//! Bring-up sequence.
//!
//! `Unopened → BusOpened → BusConfigured → PinsReady → CapabilitiesBound →
//! CoreInitialized → TransmitModeEntered`, strictly in order. The first
//! failing stage aborts the sequence; every handle acquired so far is
//! dropped on the way out and the stage falls back to `Unopened`.

use std::fmt;
use std::path::Path;

use crossbeam_channel::Sender;
use log::{debug, error, info};

use crate::bus::{configure, BusSettings, SpiController, SpidevController};
use crate::capability::{LinuxBackend, ProtocolCore};
use crate::config::BackendConfig;
use crate::error::{BackendError, Result};
use crate::pin::CePin;
use crate::trace::SharedTrace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Unopened,
    BusOpened,
    BusConfigured,
    PinsReady,
    CapabilitiesBound,
    CoreInitialized,
    TransmitModeEntered,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

pub struct Lifecycle {
    config: BackendConfig,
    stage: Stage,
    trace: Option<SharedTrace>,
    sink: Option<Sender<Vec<u8>>>,
}

impl Lifecycle {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            stage: Stage::Unopened,
            trace: None,
            sink: None,
        }
    }

    /// Records every bus transaction into `trace`.
    pub fn with_trace(mut self, trace: SharedTrace) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Forwards every payload the core reports as received.
    pub fn with_sink(mut self, sink: Sender<Vec<u8>>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Brings the radio up on the configured spidev device.
    pub fn start<K: ProtocolCore>(&mut self, core: &mut K) -> Result<()> {
        self.start_with(SpidevController::open, core)
    }

    /// Brings the radio up on whatever controller `open` returns for the
    /// configured device path.
    pub fn start_with<C, F, K>(&mut self, open: F, core: &mut K) -> Result<()>
    where
        C: SpiController + 'static,
        F: FnOnce(&Path) -> Result<C>,
        K: ProtocolCore,
    {
        let result = self.run(open, core);
        if let Err(e) = &result {
            error!("bring-up failed after {}: {e}", self.stage);
            self.stage = Stage::Unopened;
        }
        result
    }

    fn advance(&mut self, stage: Stage) {
        debug!("{} -> {stage}", self.stage);
        self.stage = stage;
    }

    fn run<C, F, K>(&mut self, open: F, core: &mut K) -> Result<()>
    where
        C: SpiController + 'static,
        F: FnOnce(&Path) -> Result<C>,
        K: ProtocolCore,
    {
        self.config.validate()?;

        let controller = open(self.config.spi_device.as_path())?;
        self.advance(Stage::BusOpened);

        let mut bus = configure(controller, BusSettings::nrf24(self.config.speed_hz))?;
        if let Some(trace) = &self.trace {
            bus.set_trace(trace.clone());
        }
        info!("spi master was successfully prepared to use");
        self.advance(Stage::BusConfigured);

        let ce = CePin::provision(&self.config.gpio_root, self.config.ce_pin)?;
        info!("pins were successfully prepared to use");
        self.advance(Stage::PinsReady);

        let mut backend = LinuxBackend::new(bus, ce).with_encoding(self.config.payload_encoding);
        if let Some(sink) = self.sink.take() {
            backend = backend.with_sink(sink);
        }
        self.advance(Stage::CapabilitiesBound);

        if let Err(e) = self.bind_core(backend, core) {
            // Dropping the returned backend closes the bus and CE handles.
            if core.release().is_some() {
                debug!("backend released by the core");
            }
            return Err(e);
        }

        info!("nRF24L01 ready to transmit");
        Ok(())
    }

    fn bind_core<C, K>(&mut self, backend: LinuxBackend<C>, core: &mut K) -> Result<()>
    where
        C: SpiController + 'static,
        K: ProtocolCore,
    {
        core.init(Box::new(backend)).map_err(|e| BackendError::Core {
            stage: "init",
            source: Box::new(e),
        })?;
        self.advance(Stage::CoreInitialized);

        core.prepare_to_transmit().map_err(|e| BackendError::Core {
            stage: "prepare_to_transmit",
            source: Box::new(e),
        })?;
        self.advance(Stage::TransmitModeEntered);
        Ok(())
    }
}
