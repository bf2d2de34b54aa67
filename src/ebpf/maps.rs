use crate::ebpf::PacketTable;
use crate::error::TableError;
use crate::{PortdropError, Result};
use aya::maps::{Array, MapData};
use aya::Ebpf;
use portdrop_common::{CONFIG_MAP, COUNTER_MAP};

/// [`PacketTable`] backed by the `PKT_COUNT` and `CONFIG` array maps
pub struct XdpTable {
    counters: Array<MapData, u64>,
    config: Array<MapData, u16>,
}

impl XdpTable {
    /// Take ownership of both maps out of a loaded object
    pub fn take_from(bpf: &mut Ebpf) -> Result<Self> {
        let counters = bpf
            .take_map(COUNTER_MAP)
            .ok_or(PortdropError::MapNotFound(COUNTER_MAP))?;
        let counters = Array::try_from(counters)
            .map_err(|e| PortdropError::EbpfError(format!("{}: {}", COUNTER_MAP, e)))?;

        let config = bpf
            .take_map(CONFIG_MAP)
            .ok_or(PortdropError::MapNotFound(CONFIG_MAP))?;
        let config = Array::try_from(config)
            .map_err(|e| PortdropError::EbpfError(format!("{}: {}", CONFIG_MAP, e)))?;

        Ok(Self { counters, config })
    }
}

impl PacketTable for XdpTable {
    fn read_counter(&self, id: u32) -> std::result::Result<u64, TableError> {
        self.counters
            .get(&id, 0)
            .map_err(|e| TableError::new(COUNTER_MAP, id, e))
    }

    fn write_config(&mut self, slot: u32, value: u16) -> std::result::Result<(), TableError> {
        self.config
            .set(slot, value, 0)
            .map_err(|e| TableError::new(CONFIG_MAP, slot, e))
    }
}
