//! Bus controller abstraction and configuration.
//!
//! The nRF24L01 speaks SPI mode 0 (CPOL = 0, CPHA = 0), MSB first, 8-bit
//! words, at up to 8 MHz. Every setting is written and then read back from
//! the controller; a refused or altered setting aborts configuration and the
//! controller is dropped, so a half-configured bus is never handed out.

use std::fmt;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::Path;

use log::{error, info};
use spidev::{spidevioctl, SpiModeFlags, Spidev, SpidevTransfer};

use crate::error::{BackendError, Result};
use crate::trace::SharedTrace;

pub const SPI_CPHA: u8 = 0x01;
pub const SPI_CPOL: u8 = 0x02;
pub const SPI_MODE_0: u8 = 0;

/// One full-duplex segment of a multi-transfer request.
///
/// `tx` and `rx` always have the same length.
pub struct Transfer<'a> {
    pub tx: &'a [u8],
    pub rx: &'a mut [u8],
}

impl<'a> Transfer<'a> {
    pub fn new(tx: &'a [u8], rx: &'a mut [u8]) -> Self {
        debug_assert_eq!(tx.len(), rx.len());
        Self { tx, rx }
    }
}

/// Host-side SPI controller handle.
pub trait SpiController {
    fn write_mode(&mut self, mode: u8) -> io::Result<()>;
    fn read_mode(&mut self) -> io::Result<u8>;
    fn write_lsb_first(&mut self, lsb_first: bool) -> io::Result<()>;
    fn read_lsb_first(&mut self) -> io::Result<bool>;
    fn write_bits_per_word(&mut self, bits: u8) -> io::Result<()>;
    fn read_bits_per_word(&mut self) -> io::Result<u8>;
    fn write_max_speed_hz(&mut self, hz: u32) -> io::Result<()>;
    fn read_max_speed_hz(&mut self) -> io::Result<u32>;

    /// Executes the transfers in order under a single chip-select assertion
    /// and returns the number of bytes clocked.
    fn submit(&mut self, transfers: &mut [Transfer<'_>]) -> io::Result<usize>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusSetting {
    Mode,
    BitOrder,
    WordSize,
    Speed,
}

impl fmt::Display for BusSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mode => "clock mode",
            Self::BitOrder => "bit order",
            Self::WordSize => "bits per word",
            Self::Speed => "max speed",
        })
    }
}

/// Settings as read back from the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusSettings {
    pub mode: u8,
    pub lsb_first: bool,
    pub bits_per_word: u8,
    pub speed_hz: u32,
}

impl BusSettings {
    pub fn nrf24(speed_hz: u32) -> Self {
        Self {
            mode: SPI_MODE_0,
            lsb_first: false,
            bits_per_word: 8,
            speed_hz,
        }
    }
}

impl fmt::Display for BusSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SPI_MODE_{}, {}, {} bits per word, {} Hz",
            self.mode & (SPI_CPOL | SPI_CPHA),
            if self.lsb_first { "lsbit first" } else { "msbit first" },
            self.bits_per_word,
            self.speed_hz
        )
    }
}

/// A controller that accepted every required setting.
///
/// Only [`configure`] produces one, so transactions can never be issued on
/// an unconfigured bus.
pub struct ConfiguredBus<C> {
    pub(crate) controller: C,
    settings: BusSettings,
    pub(crate) trace: Option<SharedTrace>,
}

impl<C> ConfiguredBus<C> {
    pub fn settings(&self) -> BusSettings {
        self.settings
    }

    pub fn release(self) -> C {
        self.controller
    }
}

fn refused(setting: BusSetting, source: io::Error) -> BackendError {
    error!("error while setting {setting}: {source}");
    BackendError::BusConfig { setting, source }
}

fn check(setting: BusSetting, requested: u32, actual: u32) -> Result<()> {
    if requested == actual {
        return Ok(());
    }
    error!("controller read back {setting} = {actual}, requested {requested}");
    Err(BackendError::BusSettingMismatch {
        setting,
        requested,
        actual,
    })
}

/// Negotiates mode, bit order, word size and speed, in that order.
pub fn configure<C: SpiController>(mut controller: C, wanted: BusSettings) -> Result<ConfiguredBus<C>> {
    use BusSetting::*;

    controller.write_mode(wanted.mode).map_err(|e| refused(Mode, e))?;
    let mode = controller.read_mode().map_err(|e| refused(Mode, e))?;
    let clock_bits = SPI_CPOL | SPI_CPHA;
    check(Mode, u32::from(wanted.mode & clock_bits), u32::from(mode & clock_bits))?;

    controller
        .write_lsb_first(wanted.lsb_first)
        .map_err(|e| refused(BitOrder, e))?;
    let lsb_first = controller.read_lsb_first().map_err(|e| refused(BitOrder, e))?;
    check(BitOrder, u32::from(wanted.lsb_first), u32::from(lsb_first))?;

    controller
        .write_bits_per_word(wanted.bits_per_word)
        .map_err(|e| refused(WordSize, e))?;
    let mut bits_per_word = controller.read_bits_per_word().map_err(|e| refused(WordSize, e))?;
    // spidev reports the default word size as 0
    if bits_per_word == 0 {
        bits_per_word = 8;
    }
    check(WordSize, u32::from(wanted.bits_per_word), u32::from(bits_per_word))?;

    controller
        .write_max_speed_hz(wanted.speed_hz)
        .map_err(|e| refused(Speed, e))?;
    let speed_hz = controller.read_max_speed_hz().map_err(|e| refused(Speed, e))?;
    check(Speed, wanted.speed_hz, speed_hz)?;

    let settings = BusSettings {
        mode,
        lsb_first,
        bits_per_word,
        speed_hz,
    };
    info!("spi master configured: {settings}");

    Ok(ConfiguredBus {
        controller,
        settings,
        trace: None,
    })
}

/// Linux `spidev` character device.
pub struct SpidevController {
    spi: Spidev,
}

impl SpidevController {
    pub fn open(path: &Path) -> Result<Self> {
        let spi = Spidev::open(path).map_err(|source| {
            error!("error while opening spidev device file {}: {source}", path.display());
            BackendError::Open {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Ok(Self { spi })
    }
}

impl SpiController for SpidevController {
    fn write_mode(&mut self, mode: u8) -> io::Result<()> {
        spidevioctl::set_mode(self.spi.as_raw_fd(), SpiModeFlags::from_bits_truncate(u32::from(mode)))
    }

    fn read_mode(&mut self) -> io::Result<u8> {
        spidevioctl::get_mode(self.spi.as_raw_fd())
    }

    fn write_lsb_first(&mut self, lsb_first: bool) -> io::Result<()> {
        spidevioctl::set_lsb_first(self.spi.as_raw_fd(), lsb_first)
    }

    fn read_lsb_first(&mut self) -> io::Result<bool> {
        spidevioctl::get_lsb_first(self.spi.as_raw_fd()).map(|v| v != 0)
    }

    fn write_bits_per_word(&mut self, bits: u8) -> io::Result<()> {
        spidevioctl::set_bits_per_word(self.spi.as_raw_fd(), bits)
    }

    fn read_bits_per_word(&mut self) -> io::Result<u8> {
        spidevioctl::get_bits_per_word(self.spi.as_raw_fd())
    }

    fn write_max_speed_hz(&mut self, hz: u32) -> io::Result<()> {
        spidevioctl::set_max_speed_hz(self.spi.as_raw_fd(), hz)
    }

    fn read_max_speed_hz(&mut self) -> io::Result<u32> {
        spidevioctl::get_max_speed_hz(self.spi.as_raw_fd())
    }

    // `Spidev::transfer_multiple` drops the byte count SPI_IOC_MESSAGE
    // returns, so a successful request reports the full requested length.
    // Short transfers are only observable through other controllers.
    fn submit(&mut self, transfers: &mut [Transfer<'_>]) -> io::Result<usize> {
        let total = transfers.iter().map(|t| t.tx.len()).sum();
        let mut xfers: Vec<SpidevTransfer<'_, '_>> = transfers
            .iter_mut()
            .map(|t| SpidevTransfer::read_write(t.tx, &mut *t.rx))
            .collect();
        self.spi.transfer_multiple(&mut xfers)?;
        Ok(total)
    }
}
