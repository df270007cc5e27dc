use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// One bus transaction as it went over the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Opcode followed by the data phase, as driven on MOSI.
    pub mosi: Vec<u8>,
    /// Status byte followed by the data phase, as sampled on MISO. Empty on failure.
    pub miso: Vec<u8>,
    pub ok: bool,
}

impl TraceEntry {
    /// The command byte, `None` for an entry without MOSI bytes.
    pub fn opcode(&self) -> Option<u8> {
        self.mosi.first().copied()
    }
}

/// Bounded ring of the most recent transactions.
#[derive(Debug)]
pub struct TraceLog {
    entries: VecDeque<TraceEntry>,
    max_entries: usize,
}

pub type SharedTrace = Arc<Mutex<TraceLog>>;

impl TraceLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_entries.min(1024)),
            max_entries,
        }
    }

    pub fn shared(max_entries: usize) -> SharedTrace {
        Arc::new(Mutex::new(Self::new(max_entries)))
    }

    pub fn push(&mut self, mosi: Vec<u8>, miso: Vec<u8>, ok: bool) {
        if self.max_entries == 0 {
            return;
        }
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        if self.entries.len() == self.max_entries {
            self.entries.pop_front();
        }
        self.entries.push_back(TraceEntry { timestamp, mosi, miso, ok });
    }

    pub fn entries(&self) -> impl Iterator<Item = &TraceEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
