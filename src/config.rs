//! Runtime configuration
//!
//! Resolution order: built-in defaults, then an optional YAML file, then
//! command-line flags. The result is validated once before anything is
//! loaded into the kernel.

use crate::cli::Cli;
use crate::{PortdropError, Result};
use portdrop_common::DEFAULT_DROP_PORT;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_IFACE: &str = "lo";
pub const DEFAULT_INTERVAL_MS: u64 = 1000;

/// Minimum pending commands buffered between the stdin reader and the loop
pub const MIN_COMMAND_QUEUE: usize = 10;
/// Minimum pending termination signals buffered for the loop
pub const MIN_SIGNAL_QUEUE: usize = 5;

/// How the XDP program is attached to the interface
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum XdpMode {
    /// Let the kernel pick (native if supported, generic otherwise)
    #[default]
    Default,
    /// Generic (skb) mode, works on any interface
    Skb,
    /// Native driver mode
    Drv,
    /// Offloaded to the NIC
    Hw,
}

impl XdpMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            XdpMode::Default => "default",
            XdpMode::Skb => "skb",
            XdpMode::Drv => "drv",
            XdpMode::Hw => "hw",
        }
    }
}

impl std::fmt::Display for XdpMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Interface the XDP program is attached to; fixed for the process lifetime
    pub iface: String,
    /// Port written into the config slot before traffic is observed
    pub drop_port: u16,
    pub interval_ms: u64,
    pub xdp_mode: XdpMode,
    /// Read operator commands from stdin
    pub interactive: bool,
    pub command_queue: usize,
    pub signal_queue: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            iface: DEFAULT_IFACE.to_string(),
            drop_port: DEFAULT_DROP_PORT,
            interval_ms: DEFAULT_INTERVAL_MS,
            xdp_mode: XdpMode::Default,
            interactive: true,
            command_queue: MIN_COMMAND_QUEUE,
            signal_queue: MIN_SIGNAL_QUEUE,
        }
    }
}

impl Config {
    /// Build the effective configuration from the command line, reading the
    /// config file it names (if any).
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Reading config file {}", path.display());
        let contents = std::fs::read_to_string(path).map_err(|e| {
            PortdropError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&contents)
            .map_err(|e| PortdropError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    pub fn from_yaml(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
        // An empty document means "all defaults"
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents)
    }

    /// Flags given on the command line win over file values
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(iface) = &cli.iface {
            self.iface = iface.clone();
        }
        if let Some(port) = cli.port {
            self.drop_port = port;
        }
        if let Some(interval_ms) = cli.interval_ms {
            self.interval_ms = interval_ms;
        }
        if let Some(mode) = cli.xdp_mode {
            self.xdp_mode = mode;
        }
        if cli.no_stdin {
            self.interactive = false;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.iface.trim().is_empty() {
            return Err(PortdropError::ConfigError(
                "interface name must not be empty".to_string(),
            ));
        }
        if self.drop_port == 0 {
            return Err(PortdropError::ConfigError(
                "drop_port must be between 1-65535".to_string(),
            ));
        }
        if self.interval_ms == 0 {
            return Err(PortdropError::ConfigError(
                "interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.command_queue < MIN_COMMAND_QUEUE {
            return Err(PortdropError::ConfigError(format!(
                "command_queue must be at least {}",
                MIN_COMMAND_QUEUE
            )));
        }
        if self.signal_queue < MIN_SIGNAL_QUEUE {
            return Err(PortdropError::ConfigError(format!(
                "signal_queue must be at least {}",
                MIN_SIGNAL_QUEUE
            )));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}
