//! Chip-enable line through the sysfs GPIO interface.
//!
//! See <http://forum.odroid.com/viewtopic.php?f=80&t=5702> for the export
//! dance on the ODROID boards.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{debug, error, info};

use crate::error::{short_write, BackendError, Result};

const DIRECTION_OUT: &[u8] = b"out";

/// An exported GPIO configured as output, with its value file held open.
#[derive(Debug)]
pub struct CePin {
    pin: u32,
    value: File,
}

/// Issues `bytes` as one write call; anything but a complete write is an error.
fn write_once(file: &mut File, bytes: &[u8]) -> io::Result<()> {
    let written = file.write(bytes)?;
    if written != bytes.len() {
        return Err(short_write(written, bytes.len()));
    }
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).open(path)?;
    write_once(&mut file, bytes)
}

impl CePin {
    /// Exports `pin` under `gpio_root` if needed, sets it as an output and
    /// opens its value file.
    pub fn provision(gpio_root: &Path, pin: u32) -> Result<Self> {
        let failed = |step: &'static str| {
            move |source: io::Error| {
                error!("error while provisioning gpio{pin}: {step}: {source}");
                BackendError::PinProvisioning { pin, step, source }
            }
        };

        let pin_dir: PathBuf = gpio_root.join(format!("gpio{pin}"));
        if pin_dir.exists() {
            debug!("{} already exported", pin_dir.display());
        } else {
            write_file(&gpio_root.join("export"), pin.to_string().as_bytes())
                .map_err(failed("export"))?;
            debug!("exported gpio{pin}");
        }

        write_file(&pin_dir.join("direction"), DIRECTION_OUT).map_err(failed("direction"))?;

        let value = OpenOptions::new()
            .read(true)
            .write(true)
            .open(pin_dir.join("value"))
            .map_err(failed("value"))?;

        info!("gpio{pin} ready as chip-enable output");
        Ok(Self { pin, value })
    }

    pub fn pin(&self) -> u32 {
        self.pin
    }

    /// Drives the line. Exactly one `'1'` or `'0'` is written; a failed or
    /// short write leaves the level unknown and is reported, not retried.
    pub fn set_level(&mut self, high: bool) -> Result<()> {
        let level: &[u8] = if high { b"1" } else { b"0" };
        write_once(&mut self.value, level).map_err(|source| {
            error!("error while setting gpio{} to {}: {source}", self.pin, u8::from(high));
            BackendError::PinIo {
                pin: self.pin,
                source,
            }
        })
    }
}
