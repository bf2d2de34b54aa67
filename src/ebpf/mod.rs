#[cfg(target_os = "linux")]
pub mod loader;
#[cfg(target_os = "linux")]
pub mod maps;

use crate::error::TableError;

/// The table shared with the XDP program: read-only packet counters and a
/// writable configuration slot.
///
/// Implementations never create or delete entries; both maps are fixed-size
/// arrays owned by the loaded program.
pub trait PacketTable {
    /// Current value of counter `id` (see `portdrop_common::counter`)
    fn read_counter(&self, id: u32) -> Result<u64, TableError>;

    /// Atomically store `value` into configuration slot `slot`
    fn write_config(&mut self, slot: u32, value: u16) -> Result<(), TableError>;
}

impl<T: PacketTable + ?Sized> PacketTable for &mut T {
    fn read_counter(&self, id: u32) -> Result<u64, TableError> {
        (**self).read_counter(id)
    }

    fn write_config(&mut self, slot: u32, value: u16) -> Result<(), TableError> {
        (**self).write_config(slot, value)
    }
}
