//! Supervisory event loop
//!
//! A single task multiplexes three sources and handles one event to
//! completion before waiting again:
//! - the sampling ticker (counter deltas)
//! - operator commands (FIFO, optional)
//! - termination signals
//!
//! All loop state is owned here and mutated only inside a handler.

pub mod command;
pub mod input;
pub mod state;

pub use command::{Command, CommandError, HELP};
pub use input::Shutdown;
pub use state::{CounterSnapshot, LoopState, StatusReport};

use crate::ebpf::PacketTable;
use crate::error::TableError;
use crate::Result;
use portdrop_common::{config, counter};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// What a handler wants the loop to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Why [`Supervisor::run`] returned without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// `quit` or `exit` was entered
    Quit,
    /// A termination signal arrived
    Signal(Shutdown),
}

pub struct Supervisor<T> {
    table: T,
    state: LoopState,
    tick: Duration,
}

impl<T: PacketTable> Supervisor<T> {
    /// `current_port` must already be in the config slot
    pub fn new(table: T, current_port: u16, tick: Duration) -> Self {
        Self {
            table,
            state: LoopState::new(current_port),
            tick,
        }
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    /// Run until a quit command, a termination signal, or a fatal counter
    /// read. `commands` is `None` in non-interactive mode; once it reports
    /// end of input the loop carries on without it.
    pub async fn run(
        &mut self,
        mut commands: Option<mpsc::Receiver<String>>,
        mut signals: mpsc::Receiver<Shutdown>,
    ) -> Result<Exit> {
        let mut ticker = time::interval_at(Instant::now() + self.tick, self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.on_tick()?;
                }
                line = next_line(&mut commands) => match line {
                    Some(line) => {
                        if self.on_line(&line) == Flow::Quit {
                            return Ok(Exit::Quit);
                        }
                    }
                    None => {
                        debug!("Command input closed");
                        commands = None;
                    }
                },
                Some(signal) = signals.recv() => {
                    info!("Received {}, exiting..", signal);
                    return Ok(Exit::Signal(signal));
                }
            }
        }
    }

    /// Sample both counters and log them if anything moved since the last
    /// tick. Returns the new snapshot when it was reported.
    ///
    /// A read failure means the program is gone; the caller treats it as fatal.
    pub fn on_tick(&mut self) -> std::result::Result<Option<CounterSnapshot>, TableError> {
        let snapshot = CounterSnapshot::read(&self.table)?;

        if !self.state.observe(snapshot) {
            return Ok(None);
        }

        info!(
            "Received {} packets, Dropped {} packets (port {})",
            snapshot.total, snapshot.dropped, self.state.current_port
        );
        Ok(Some(snapshot))
    }

    /// Parse and execute one line of operator input. Input errors are
    /// reported and never escape.
    pub fn on_line(&mut self, line: &str) -> Flow {
        match Command::parse(line) {
            Ok(Some(command)) => self.execute(command),
            Ok(None) => Flow::Continue,
            Err(e) => {
                warn!("{}", e);
                Flow::Continue
            }
        }
    }

    pub fn execute(&mut self, command: Command) -> Flow {
        match command {
            Command::Port(port) => {
                self.set_port(port);
                Flow::Continue
            }
            Command::Status => {
                info!("Status: {}", self.status());
                Flow::Continue
            }
            Command::Help => {
                println!("\n{}\n", HELP);
                Flow::Continue
            }
            Command::Quit => {
                info!("Exiting...");
                Flow::Quit
            }
        }
    }

    /// Write `port` to the config slot; the shadow only follows a successful write
    fn set_port(&mut self, port: u16) {
        match self.table.write_config(config::DROP_PORT, port) {
            Ok(()) => {
                self.state.current_port = port;
                info!("Port changed to {}", port);
            }
            Err(e) => error!("Error updating port: {}", e),
        }
    }

    /// Best-effort counter read: failures are logged and shown as zero
    pub fn status(&self) -> StatusReport {
        let read = |id: u32| {
            self.table.read_counter(id).unwrap_or_else(|e| {
                warn!("{}", e);
                0
            })
        };
        StatusReport {
            counters: CounterSnapshot::new(read(counter::TOTAL), read(counter::DROPPED)),
            port: self.state.current_port,
        }
    }
}

async fn next_line(commands: &mut Option<mpsc::Receiver<String>>) -> Option<String> {
    match commands {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Inner {
        counters: [u64; 2],
        port: u16,
        writes: Vec<u16>,
        counter_reads: usize,
        fail_reads: bool,
        fail_writes: bool,
    }

    /// In-memory table whose contents tests can change while the loop runs
    #[derive(Clone, Default)]
    struct FakeTable(Arc<Mutex<Inner>>);

    impl FakeTable {
        fn set_counters(&self, total: u64, dropped: u64) {
            self.0.lock().unwrap().counters = [total, dropped];
        }

        fn writes(&self) -> Vec<u16> {
            self.0.lock().unwrap().writes.clone()
        }

        fn port(&self) -> u16 {
            self.0.lock().unwrap().port
        }

        fn counter_reads(&self) -> usize {
            self.0.lock().unwrap().counter_reads
        }

        fn fail_reads(&self) {
            self.0.lock().unwrap().fail_reads = true;
        }

        fn fail_writes(&self) {
            self.0.lock().unwrap().fail_writes = true;
        }
    }

    impl PacketTable for FakeTable {
        fn read_counter(&self, id: u32) -> std::result::Result<u64, TableError> {
            let mut inner = self.0.lock().unwrap();
            inner.counter_reads += 1;
            if inner.fail_reads {
                return Err(TableError::new("PKT_COUNT", id, "detached"));
            }
            Ok(inner.counters[id as usize])
        }

        fn write_config(&mut self, slot: u32, value: u16) -> std::result::Result<(), TableError> {
            let mut inner = self.0.lock().unwrap();
            if inner.fail_writes {
                return Err(TableError::new("CONFIG", slot, "detached"));
            }
            inner.port = value;
            inner.writes.push(value);
            Ok(())
        }
    }

    fn supervisor(table: &FakeTable) -> Supervisor<FakeTable> {
        Supervisor::new(table.clone(), 4040, Duration::from_secs(1))
    }

    #[test]
    fn test_tick_reports_only_changes() {
        let table = FakeTable::default();
        let mut sup = supervisor(&table);

        assert_eq!(sup.on_tick().unwrap(), None);

        table.set_counters(10, 3);
        assert_eq!(sup.on_tick().unwrap(), Some(CounterSnapshot::new(10, 3)));
        assert_eq!(sup.state().last, CounterSnapshot::new(10, 3));

        assert_eq!(sup.on_tick().unwrap(), None);
        assert_eq!(sup.state().last, CounterSnapshot::new(10, 3));
    }

    #[test]
    fn test_tick_read_failure_is_an_error() {
        let table = FakeTable::default();
        let mut sup = supervisor(&table);
        table.fail_reads();

        let err = sup.on_tick().unwrap_err();
        assert_eq!(err.map, "PKT_COUNT");
    }

    #[test]
    fn test_port_command_updates_table_and_shadow() {
        let table = FakeTable::default();
        let mut sup = supervisor(&table);

        assert_eq!(sup.on_line("port 8080"), Flow::Continue);
        assert_eq!(sup.state().current_port, 8080);
        assert_eq!(table.port(), 8080);

        assert_eq!(sup.on_line("PORT 22"), Flow::Continue);
        assert_eq!(sup.state().current_port, 22);
        assert_eq!(table.writes(), vec![8080, 22]);
    }

    #[test]
    fn test_rejected_port_leaves_state_alone() {
        let table = FakeTable::default();
        let mut sup = supervisor(&table);
        sup.on_line("port 8080");

        for line in ["port 99999", "port 0", "port", "port 1 2", "port http"] {
            assert_eq!(sup.on_line(line), Flow::Continue);
            assert_eq!(sup.state().current_port, 8080, "after {:?}", line);
        }
        assert_eq!(table.writes(), vec![8080]);
    }

    #[test]
    fn test_failed_write_leaves_shadow_unchanged() {
        let table = FakeTable::default();
        let mut sup = supervisor(&table);
        table.fail_writes();

        assert_eq!(sup.on_line("port 9000"), Flow::Continue);
        assert_eq!(sup.state().current_port, 4040);
        assert!(table.writes().is_empty());
    }

    #[test]
    fn test_status_survives_read_failure() {
        let table = FakeTable::default();
        let mut sup = supervisor(&table);
        table.set_counters(5, 1);
        assert_eq!(sup.status().counters, CounterSnapshot::new(5, 1));

        table.fail_reads();
        assert_eq!(sup.on_line("status"), Flow::Continue);
        assert_eq!(sup.status().counters, CounterSnapshot::default());
        assert_eq!(sup.status().port, 4040);
    }

    #[test]
    fn test_unknown_and_blank_input_continue() {
        let table = FakeTable::default();
        let mut sup = supervisor(&table);

        assert_eq!(sup.on_line("foo"), Flow::Continue);
        assert_eq!(sup.on_line("   "), Flow::Continue);
        assert_eq!(sup.on_line("help"), Flow::Continue);
        assert_eq!(sup.state().current_port, 4040);
        assert!(table.writes().is_empty());
    }

    #[test]
    fn test_quit_and_exit() {
        let table = FakeTable::default();
        let mut sup = supervisor(&table);
        assert_eq!(sup.on_line("quit"), Flow::Quit);
        assert_eq!(sup.on_line("Exit"), Flow::Quit);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_processes_commands_in_order_until_quit() {
        let table = FakeTable::default();
        let mut sup = supervisor(&table);
        let (cmd_tx, cmd_rx) = mpsc::channel(10);
        let (_sig_tx, sig_rx) = mpsc::channel(5);

        for line in ["port 8080", "port 99999", "foo", "port 9090", "quit", "port 1"] {
            cmd_tx.send(line.to_string()).await.unwrap();
        }

        let exit = sup.run(Some(cmd_rx), sig_rx).await.unwrap();
        assert_eq!(exit, Exit::Quit);
        assert_eq!(table.writes(), vec![8080, 9090]);
        assert_eq!(sup.state().current_port, 9090);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_signal() {
        let table = FakeTable::default();
        let mut sup = supervisor(&table);
        let (sig_tx, sig_rx) = mpsc::channel(5);

        sig_tx.send(Shutdown::Terminate).await.unwrap();

        let exit = sup.run(None, sig_rx).await.unwrap();
        assert_eq!(exit, Exit::Signal(Shutdown::Terminate));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ticks_after_input_closes() {
        let table = FakeTable::default();
        let mut sup = supervisor(&table);
        let (cmd_tx, cmd_rx) = mpsc::channel(10);
        let (sig_tx, sig_rx) = mpsc::channel(5);

        cmd_tx.send("port 8080".to_string()).await.unwrap();
        drop(cmd_tx);

        let feeder = table.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(1500)).await;
            feeder.set_counters(10, 3);
            time::sleep(Duration::from_secs(2)).await;
            sig_tx.send(Shutdown::Interrupt).await.unwrap();
        });

        let exit = sup.run(Some(cmd_rx), sig_rx).await.unwrap();
        assert_eq!(exit, Exit::Signal(Shutdown::Interrupt));
        // ticks at 1s, 2s and 3s, two counters each
        assert_eq!(table.counter_reads(), 6);
        assert_eq!(sup.state().last, CounterSnapshot::new(10, 3));
        assert_eq!(sup.state().current_port, 8080);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_fails_when_counters_disappear() {
        let table = FakeTable::default();
        let mut sup = supervisor(&table);
        let (_sig_tx, sig_rx) = mpsc::channel(5);
        table.fail_reads();

        let err = sup.run(None, sig_rx).await.unwrap_err();
        assert!(matches!(err, crate::PortdropError::Table(_)));
    }
}
