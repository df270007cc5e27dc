//! Command framing.
//!
//! Every command is one request of one or two full-duplex transfers under a
//! single chip-select assertion: the opcode phase, which clocks the STATUS
//! register back, and an optional data phase. The STATUS byte is only
//! coherent for the cycle right after the opcode, so both phases always go
//! out in the same request.

use std::io;

use log::{debug, error};

use crate::bus::{ConfiguredBus, SpiController, Transfer};
use crate::error::{BackendError, Result};
use crate::trace::SharedTrace;

/// Driven on MOSI during a read data phase.
pub const FILLER: u8 = 0xFF;

/// The data phase of a command. Buffers stay owned by the caller.
#[derive(Debug)]
pub enum Payload<'a> {
    None,
    /// Bytes to drive out; whatever comes back is discarded.
    Write(&'a [u8]),
    /// Buffer to fill with the bytes clocked in.
    Read(&'a mut [u8]),
}

impl Payload<'_> {
    pub fn len(&self) -> usize {
        match self {
            Payload::None => 0,
            Payload::Write(data) => data.len(),
            Payload::Read(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<C> ConfiguredBus<C> {
    /// Records every transaction into `trace` from now on.
    pub fn set_trace(&mut self, trace: SharedTrace) {
        self.trace = Some(trace);
    }
}

impl<C: SpiController> ConfiguredBus<C> {
    /// Sends `opcode` followed by the optional data phase and returns the
    /// STATUS register clocked back during the opcode.
    ///
    /// Nothing is retried; on failure a read buffer is left untouched.
    pub fn transact(&mut self, opcode: u8, payload: Payload<'_>) -> Result<u8> {
        let len = payload.len();
        let command = [opcode];
        let mut status = [0u8; 1];

        // Data phase scratch: what goes out and what comes in.
        let tx: Vec<u8> = match &payload {
            Payload::Write(data) => data.to_vec(),
            _ => vec![FILLER; len],
        };
        let mut rx = vec![0u8; len];

        let submitted = if len == 0 {
            self.controller
                .submit(&mut [Transfer::new(&command, &mut status)])
        } else {
            self.controller.submit(&mut [
                Transfer::new(&command, &mut status),
                Transfer::new(&tx, &mut rx),
            ])
        };

        let outcome = submitted.and_then(|clocked| {
            if clocked < 1 + len {
                Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("{clocked} of {} bytes transferred", 1 + len),
                ))
            } else {
                Ok(clocked)
            }
        });

        if let Some(trace) = &self.trace {
            let mut mosi = Vec::with_capacity(1 + len);
            mosi.push(opcode);
            mosi.extend_from_slice(&tx);
            let miso = match &outcome {
                Ok(_) => std::iter::once(status[0]).chain(rx.iter().copied()).collect(),
                Err(_) => Vec::new(),
            };
            trace.lock().push(mosi, miso, outcome.is_ok());
        }

        match outcome {
            Ok(clocked) => {
                debug!("command 0x{opcode:02X}: {clocked} bytes clocked, status 0x{:02X}", status[0]);
                if let Payload::Read(data) = payload {
                    data.copy_from_slice(&rx);
                }
                Ok(status[0])
            }
            Err(source) => {
                error!("error while sending command 0x{opcode:02X}: {source}");
                Err(BackendError::Transaction { opcode, source })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{configure, BusSettings};
    use crate::error::ErrorKind;
    use crate::sim::{Reply, SimMonitor, SimulatedController};
    use crate::trace::TraceLog;

    fn bus() -> (ConfiguredBus<SimulatedController>, SimMonitor) {
        let sim = SimulatedController::new();
        let monitor = sim.monitor();
        (configure(sim, BusSettings::nrf24(500_000)).unwrap(), monitor)
    }

    #[test]
    fn command_only_is_a_single_transfer() {
        let (mut bus, monitor) = bus();
        monitor.respond(&[0x2E]);

        assert_eq!(bus.transact(0xE1, Payload::None).unwrap(), 0x2E);
        assert_eq!(monitor.submissions(), vec![vec![vec![0xE1]]]);
    }

    #[test]
    fn empty_buffers_behave_like_no_payload() {
        let (mut bus, monitor) = bus();
        let mut empty: [u8; 0] = [];
        bus.transact(0xFF, Payload::Write(&[])).unwrap();
        bus.transact(0xFF, Payload::Read(&mut empty)).unwrap();
        assert!(monitor.submissions().iter().all(|s| s.len() == 1));
    }

    #[test]
    fn write_drives_data_and_leaves_it_intact() {
        let (mut bus, monitor) = bus();
        monitor.respond(&[0x0E, 0xAA, 0xBB, 0xCC]);
        let data = [0xE7, 0xE7, 0x01];

        let status = bus.transact(0x30, Payload::Write(&data)).unwrap();
        assert_eq!(status, 0x0E);
        assert_eq!(data, [0xE7, 0xE7, 0x01]);
        assert_eq!(monitor.submissions(), vec![vec![vec![0x30], vec![0xE7, 0xE7, 0x01]]]);
    }

    #[test]
    fn read_drives_filler_whatever_the_buffer_held() {
        let (mut bus, monitor) = bus();
        monitor.respond(&[0x0E, 9, 8, 7]);
        let mut data = [0x12, 0x34, 0x56];

        bus.transact(0x0A, Payload::Read(&mut data)).unwrap();
        assert_eq!(data, [9, 8, 7]);
        assert_eq!(monitor.submissions()[0][1], vec![FILLER; 3]);
    }

    #[test]
    fn rx_payload_scenario() {
        let (mut bus, monitor) = bus();
        monitor.respond(&[0x0E, 1, 2, 3, 4, 5]);
        let mut buf = [0u8; 5];

        let status = bus.transact(0x61, Payload::Read(&mut buf)).unwrap();
        assert_eq!(status, 0x0E);
        assert_eq!(buf, [1, 2, 3, 4, 5]);
    }

    #[test]
    fn failed_request_reports_transaction_failure() {
        let (mut bus, monitor) = bus();
        monitor.push_reply(Reply::Fail(io::ErrorKind::Other));

        let err = bus.transact(0x20, Payload::Write(&[0x0F])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transaction);
        assert!(matches!(err, BackendError::Transaction { opcode: 0x20, .. }));
    }

    #[test]
    fn short_transfer_leaves_read_buffer_untouched() {
        let (mut bus, monitor) = bus();
        monitor.push_reply(Reply::Short(3));
        let mut buf = [0x55u8; 5];

        let err = bus.transact(0x61, Payload::Read(&mut buf)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transaction);
        assert_eq!(buf, [0x55; 5]);
    }

    #[test]
    fn trace_records_both_directions() {
        let (mut bus, monitor) = bus();
        let trace = TraceLog::shared(8);
        bus.set_trace(trace.clone());
        monitor.respond(&[0x0E, 0x0B]);
        monitor.push_reply(Reply::Fail(io::ErrorKind::BrokenPipe));

        let mut reg = [0u8; 1];
        bus.transact(0x00, Payload::Read(&mut reg)).unwrap();
        bus.transact(0xE2, Payload::None).unwrap_err();

        let log = trace.lock();
        let entries: Vec<_> = log.entries().cloned().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].mosi, vec![0x00, 0xFF]);
        assert_eq!(entries[0].miso, vec![0x0E, 0x0B]);
        assert!(entries[0].ok);
        assert_eq!(entries[1].mosi, vec![0xE2]);
        assert!(entries[1].miso.is_empty());
        assert!(!entries[1].ok);
    }
}
