//! Map layout shared between the XDP program (kernel) and the control plane
//!
//! Both sides must agree on:
//! - map names, as they appear in the compiled object
//! - array indices for counters and configuration slots
//! - the port dropped before user space writes its own value

#![cfg_attr(not(feature = "userspace"), no_std)]

/// Per-counter packet totals: `Array<u64>` with [`counter::COUNT`] entries
pub const COUNTER_MAP: &str = "PKT_COUNT";

/// Runtime configuration: `Array<u16>` with [`config::COUNT`] entries
pub const CONFIG_MAP: &str = "CONFIG";

/// Name of the XDP program inside the object
pub const PROGRAM_NAME: &str = "drop_tcp_packet";

/// Port dropped until the control plane says otherwise
pub const DEFAULT_DROP_PORT: u16 = 4040;

/// Counter ids (indices into [`COUNTER_MAP`])
pub mod counter {
    pub const TOTAL: u32 = 0;
    pub const DROPPED: u32 = 1;
    pub const COUNT: u32 = 2;
}

/// Configuration slots (indices into [`CONFIG_MAP`])
pub mod config {
    pub const DROP_PORT: u32 = 0;
    pub const COUNT: u32 = 1;
}

#[cfg(feature = "userspace")]
const _: () = {
    assert!(counter::TOTAL < counter::COUNT);
    assert!(counter::DROPPED < counter::COUNT);
    assert!(config::DROP_PORT < config::COUNT);
    assert!(DEFAULT_DROP_PORT != 0, "default drop port must be a valid TCP port");
};
