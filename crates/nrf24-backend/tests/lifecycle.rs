use std::fs;
use std::path::Path;

use nrf24_backend::sim::{Reply, SimMonitor, SimulatedController};
use nrf24_backend::{
    Backend, BackendConfig, BackendError, BusSetting, ErrorKind, Lifecycle, Payload,
    ProtocolCore, Stage, TraceLog,
};

#[derive(Debug, thiserror::Error)]
#[error("core refused: {0}")]
struct CoreError(String);

/// Stand-in protocol core: powers the chip up in PTX mode on transmit entry.
#[derive(Default)]
struct PowerUpCore {
    backend: Option<Box<dyn Backend>>,
    fail_init: bool,
}

impl ProtocolCore for PowerUpCore {
    type Error = CoreError;

    fn init(&mut self, backend: Box<dyn Backend>) -> Result<(), CoreError> {
        self.backend = Some(backend);
        if self.fail_init {
            return Err(CoreError("init".into()));
        }
        Ok(())
    }

    fn prepare_to_transmit(&mut self) -> Result<(), CoreError> {
        let backend = self.backend.as_mut().ok_or_else(|| CoreError("no backend".into()))?;
        backend.set_ce(false).map_err(|e| CoreError(e.to_string()))?;
        backend
            .transact(0x20, Payload::Write(&[0x0A]))
            .map_err(|e| CoreError(e.to_string()))?;
        backend.sleep_us(1_500);
        Ok(())
    }

    fn release(&mut self) -> Option<Box<dyn Backend>> {
        self.backend.take()
    }
}

fn gpio_tree(root: &Path, pin: u32) {
    let dir = root.join(format!("gpio{pin}"));
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("direction"), "in").unwrap();
    fs::write(dir.join("value"), "").unwrap();
}

fn config(root: &Path) -> BackendConfig {
    BackendConfig {
        gpio_root: root.to_path_buf(),
        ..BackendConfig::default()
    }
}

fn sim() -> (SimulatedController, SimMonitor) {
    let sim = SimulatedController::new();
    let monitor = sim.monitor();
    (sim, monitor)
}

#[test]
fn full_bring_up_reaches_transmit_mode() {
    let root = tempfile::tempdir().unwrap();
    gpio_tree(root.path(), 199);
    let (sim, monitor) = sim();
    let trace = TraceLog::shared(16);
    let mut core = PowerUpCore::default();

    let mut lifecycle = Lifecycle::new(config(root.path())).with_trace(trace.clone());
    lifecycle.start_with(|_| Ok(sim), &mut core).unwrap();

    assert_eq!(lifecycle.stage(), Stage::TransmitModeEntered);
    assert_eq!(monitor.register(0x00)[0], 0x0A);
    assert_eq!(fs::read_to_string(root.path().join("gpio199/direction")).unwrap(), "out");
    assert_eq!(fs::read_to_string(root.path().join("gpio199/value")).unwrap(), "0");
    assert_eq!(trace.lock().len(), 1);
    assert!(!monitor.is_closed());

    drop(core);
    assert!(monitor.is_closed());
}

#[test]
fn missing_device_is_an_open_failure() {
    let root = tempfile::tempdir().unwrap();
    let mut lifecycle = Lifecycle::new(BackendConfig {
        spi_device: root.path().join("spidev9.9"),
        ..config(root.path())
    });

    let err = lifecycle.start(&mut PowerUpCore::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Open);
    assert_eq!(lifecycle.stage(), Stage::Unopened);
}

#[test]
fn rejected_speed_halts_before_pins() {
    let root = tempfile::tempdir().unwrap();
    gpio_tree(root.path(), 199);
    let (sim, monitor) = sim();
    monitor.override_readback(BusSetting::Speed, 250_000);

    let mut lifecycle = Lifecycle::new(config(root.path()));
    let err = lifecycle.start_with(|_| Ok(sim), &mut PowerUpCore::default()).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::BusConfig);
    assert_eq!(lifecycle.stage(), Stage::Unopened);
    assert!(monitor.submissions().is_empty());
    assert!(monitor.is_closed());
    assert_eq!(fs::read_to_string(root.path().join("gpio199/direction")).unwrap(), "in");
}

#[test]
fn pin_failure_releases_the_bus() {
    let root = tempfile::tempdir().unwrap();
    let (sim, monitor) = sim();

    let mut lifecycle = Lifecycle::new(config(root.path()));
    let err = lifecycle.start_with(|_| Ok(sim), &mut PowerUpCore::default()).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PinProvisioning);
    assert!(monitor.is_closed());
    assert_eq!(lifecycle.stage(), Stage::Unopened);
}

#[test]
fn core_init_failure_unwinds() {
    let root = tempfile::tempdir().unwrap();
    gpio_tree(root.path(), 199);
    let (sim, monitor) = sim();
    let mut core = PowerUpCore {
        fail_init: true,
        ..PowerUpCore::default()
    };

    let mut lifecycle = Lifecycle::new(config(root.path()));
    let err = lifecycle.start_with(|_| Ok(sim), &mut core).unwrap_err();

    assert!(matches!(err, BackendError::Core { stage: "init", .. }));
    assert!(monitor.is_closed());
}

#[test]
fn transmit_entry_failure_is_reported() {
    let root = tempfile::tempdir().unwrap();
    gpio_tree(root.path(), 199);
    let (sim, monitor) = sim();
    monitor.push_reply(Reply::Fail(std::io::ErrorKind::TimedOut));
    let mut core = PowerUpCore::default();

    let mut lifecycle = Lifecycle::new(config(root.path()));
    let err = lifecycle.start_with(|_| Ok(sim), &mut core).unwrap_err();

    assert!(matches!(err, BackendError::Core { stage: "prepare_to_transmit", .. }));
    assert_eq!(lifecycle.stage(), Stage::Unopened);
    assert!(core.release().is_none());
    assert!(monitor.is_closed());
}

#[test]
fn configurable_ce_pin() {
    let root = tempfile::tempdir().unwrap();
    gpio_tree(root.path(), 24);
    let (sim, _monitor) = sim();
    let mut core = PowerUpCore::default();

    let mut lifecycle = Lifecycle::new(BackendConfig {
        ce_pin: 24,
        ..config(root.path())
    });
    lifecycle.start_with(|_| Ok(sim), &mut core).unwrap();
    assert_eq!(fs::read_to_string(root.path().join("gpio24/value")).unwrap(), "0");
}

#[test]
fn invalid_config_fails_before_opening() {
    let mut opened = false;
    let mut lifecycle = Lifecycle::new(BackendConfig {
        speed_hz: 0,
        ..BackendConfig::default()
    });
    let err = lifecycle
        .start_with(
            |_| {
                opened = true;
                Ok(SimulatedController::new())
            },
            &mut PowerUpCore::default(),
        )
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Config);
    assert!(!opened);
}
