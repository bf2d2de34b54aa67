//! portdrop - XDP packet counter with a runtime-configurable TCP drop port
//!
//! Startup order matters: the drop port is written into the config map
//! before the program is attached, so the first packet already sees it.

use std::process;

#[cfg(not(target_os = "linux"))]
fn main() {
    eprintln!("Error: portdrop requires Linux to run XDP programs");
    process::exit(1);
}

#[cfg(target_os = "linux")]
#[tokio::main]
async fn main() {
    use clap::Parser;
    use portdrop::cli::Cli;
    use tracing::{error, info};

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    info!("Starting portdrop v{}", portdrop::VERSION);

    let code = match linux::run(cli).await {
        Ok(exit) => {
            info!("portdrop stopped ({:?})", exit);
            0
        }
        Err(e) => {
            error!("{}", e);
            1
        }
    };

    // The command reader thread may still be blocked on stdin
    process::exit(code);
}

#[cfg(target_os = "linux")]
fn init_tracing(verbose: bool) {
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();

    // Also routes `log` records (aya, aya-log) into tracing
    if let Err(e) = subscriber.try_init() {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

#[cfg(target_os = "linux")]
mod linux {
    use aya_log::EbpfLogger;
    use portdrop::cli::Cli;
    use portdrop::ebpf::loader::XdpManager;
    use portdrop::ebpf::maps::XdpTable;
    use portdrop::ebpf::PacketTable;
    use portdrop::supervisor::input::{spawn_signal_listener, spawn_stdin_reader};
    use portdrop::supervisor::{Exit, Shutdown, Supervisor};
    use portdrop::{Config, Result};
    use portdrop_common::config::DROP_PORT;
    use tokio::sync::mpsc;
    use tracing::{info, warn};

    pub async fn run(cli: Cli) -> Result<Exit> {
        let config = Config::from_cli(&cli)?;

        // Signals from here on are queued and handled once the loop starts
        let signals = spawn_signal_listener(config.signal_queue)?;

        let mut manager = XdpManager::load()?;

        if let Err(e) = EbpfLogger::init(manager.bpf_mut()) {
            warn!(
                "Failed to initialize EbpfLogger: {}. XDP program logs will not be visible.",
                e
            );
        }

        let mut table = manager.take_table()?;
        table.write_config(DROP_PORT, config.drop_port)?;

        manager.attach(&config.iface, config.xdp_mode)?;

        let result = supervise(&config, &mut table, signals).await;

        // Runs on every exit path of the loop, including a fatal tick
        drop(table);
        manager.unload();

        result
    }

    async fn supervise(
        config: &Config,
        table: &mut XdpTable,
        signals: mpsc::Receiver<Shutdown>,
    ) -> Result<Exit> {
        let commands = if config.interactive {
            Some(spawn_stdin_reader(config.command_queue)?)
        } else {
            None
        };

        info!("Counting incoming packets on {}..", config.iface);
        info!("Current drop port: {}", config.drop_port);
        if config.interactive {
            info!("Commands:");
            info!("  Type 'port XXXX' to change port (e.g., 'port 8080')");
            info!("  Type 'status' to see current stats");
            info!("  Type 'quit' or Ctrl+C to exit");
        } else {
            info!("Press Ctrl+C to exit");
        }

        let mut supervisor = Supervisor::new(table, config.drop_port, config.tick_interval());
        supervisor.run(commands, signals).await
    }
}
