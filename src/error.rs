use thiserror::Error;

#[derive(Error, Debug)]
pub enum PortdropError {
    #[error("eBPF error: {0}")]
    EbpfError(String),

    #[error("Failed to load eBPF program: {0}")]
    ProgramLoadFailed(String),

    #[error("Interface {name} not found: {reason}")]
    InterfaceNotFound { name: String, reason: String },

    #[error("Failed to attach XDP program to {iface}: {reason}")]
    AttachFailed { iface: String, reason: String },

    #[error("Map {0} not found in eBPF object")]
    MapNotFound(&'static str),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Kernel version {version} is too old. Minimum required: {min_version}")]
    KernelVersionTooOld {
        version: String,
        min_version: String,
    },

    #[error("Unsupported feature on this system: {0}")]
    UnsupportedFeature(String),
}

/// Failure to read or write the shared counter/config table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Table access failed on {map}[{key}]: {reason}")]
pub struct TableError {
    pub map: &'static str,
    pub key: u32,
    pub reason: String,
}

impl TableError {
    pub fn new(map: &'static str, key: u32, reason: impl std::fmt::Display) -> Self {
        Self {
            map,
            key,
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PortdropError>;
