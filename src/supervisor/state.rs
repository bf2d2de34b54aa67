use crate::ebpf::PacketTable;
use crate::error::TableError;
use portdrop_common::counter;

/// Packet totals as last read from the counter map
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub total: u64,
    pub dropped: u64,
}

impl CounterSnapshot {
    pub fn new(total: u64, dropped: u64) -> Self {
        Self { total, dropped }
    }

    /// Read both counters; the first failure aborts the read
    pub fn read<T: PacketTable + ?Sized>(table: &T) -> Result<Self, TableError> {
        Ok(Self {
            total: table.read_counter(counter::TOTAL)?,
            dropped: table.read_counter(counter::DROPPED)?,
        })
    }
}

/// What the `status` command shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub counters: CounterSnapshot,
    pub port: u16,
}

impl std::fmt::Display for StatusReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Total packets: {}, Dropped: {}, Current port: {}",
            self.counters.total, self.counters.dropped, self.port
        )
    }
}

/// Control-plane shadow of the shared table, owned by the supervisor loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopState {
    /// Snapshot reported on the last tick that changed anything
    pub last: CounterSnapshot,
    /// Last port successfully written to the config slot
    pub current_port: u16,
}

impl LoopState {
    pub fn new(current_port: u16) -> Self {
        Self {
            last: CounterSnapshot::default(),
            current_port,
        }
    }

    /// Store `snapshot` and report whether it differs from the previous one
    pub fn observe(&mut self, snapshot: CounterSnapshot) -> bool {
        let changed = snapshot != self.last;
        self.last = snapshot;
        changed
    }
}
