use std::io;
use std::path::PathBuf;

use crate::bus::BusSetting;

/// Broad failure classes, one per backend stage that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Open,
    BusConfig,
    PinProvisioning,
    PinIo,
    Transaction,
    Core,
    Config,
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("bus controller refused {setting}: {source}")]
    BusConfig {
        setting: BusSetting,
        #[source]
        source: io::Error,
    },

    #[error("bus controller read back {setting} = {actual}, requested {requested}")]
    BusSettingMismatch {
        setting: BusSetting,
        requested: u32,
        actual: u32,
    },

    #[error("failed to provision gpio{pin} ({step}): {source}")]
    PinProvisioning {
        pin: u32,
        step: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("failed to drive gpio{pin}: {source}")]
    PinIo {
        pin: u32,
        #[source]
        source: io::Error,
    },

    #[error("transaction 0x{opcode:02X} failed: {source}")]
    Transaction {
        opcode: u8,
        #[source]
        source: io::Error,
    },

    #[error("protocol core failed during {stage}: {source}")]
    Core {
        stage: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl BackendError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Open { .. } => ErrorKind::Open,
            Self::BusConfig { .. } | Self::BusSettingMismatch { .. } => ErrorKind::BusConfig,
            Self::PinProvisioning { .. } => ErrorKind::PinProvisioning,
            Self::PinIo { .. } => ErrorKind::PinIo,
            Self::Transaction { .. } => ErrorKind::Transaction,
            Self::Core { .. } => ErrorKind::Core,
            Self::Config(_) => ErrorKind::Config,
        }
    }
}

pub type Result<T> = std::result::Result<T, BackendError>;

/// The error a single write reports when the file accepted fewer bytes than given.
pub(crate) fn short_write(written: usize, expected: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::WriteZero,
        format!("short write: {written} of {expected} bytes"),
    )
}
