use crate::config::XdpMode;
use clap::Parser;
use std::path::PathBuf;

/// Command-line flags. Every setting is optional here so that values from a
/// config file are only overridden when a flag is actually given.
#[derive(Parser, Debug, Default)]
#[command(name = "portdrop")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Count packets and drop TCP SYNs to a runtime-configurable port with XDP", long_about = None)]
pub struct Cli {
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, help = "YAML config file")]
    pub config: Option<PathBuf>,

    #[arg(short, long, help = "Network interface to attach to [default: lo]")]
    pub iface: Option<String>,

    #[arg(
        short,
        long,
        value_parser = clap::value_parser!(u16).range(1..),
        help = "Initial TCP port to drop [default: 4040]"
    )]
    pub port: Option<u16>,

    #[arg(long, value_name = "MILLIS", help = "Counter sampling interval [default: 1000]")]
    pub interval_ms: Option<u64>,

    #[arg(long, value_enum, help = "XDP attach mode [default: default]")]
    pub xdp_mode: Option<XdpMode>,

    #[arg(long, help = "Do not read commands from stdin")]
    pub no_stdin: bool,
}
