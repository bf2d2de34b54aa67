//! Control plane for the portdrop XDP program
//!
//! - Loads the XDP program and attaches it to one interface
//! - Seeds the drop port before traffic is observed
//! - Samples packet counters and reports changes
//! - Accepts operator commands on stdin to retarget the drop port

pub mod cli;
pub mod config;
pub mod ebpf;
pub mod error;
pub mod supervisor;

pub use config::Config;
pub use error::{PortdropError, Result, TableError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
