//! Event feeds for the supervisor loop
//!
//! Blocking sources are turned into bounded channels so the loop only ever
//! waits in one place.

use std::io::{BufRead, ErrorKind};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Why the process was asked to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    Interrupt,
    Terminate,
}

impl std::fmt::Display for Shutdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Shutdown::Interrupt => write!(f, "SIGINT"),
            Shutdown::Terminate => write!(f, "SIGTERM"),
        }
    }
}

/// Read lines from `reader` on a dedicated thread.
///
/// Bytes that are not valid UTF-8 are replaced rather than ending the feed.
/// The thread blocks when `capacity` lines are pending and exits at end of
/// input, on an I/O error, or once the receiver is dropped.
pub fn spawn_line_reader<R>(mut reader: R, capacity: usize) -> std::io::Result<mpsc::Receiver<String>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity);

    std::thread::Builder::new()
        .name("command-reader".to_string())
        .spawn(move || {
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf) {
                    Ok(0) => break,
                    Ok(_) => {
                        if tx.blocking_send(decode_line(&buf)).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => {
                        warn!("Failed to read command input: {}", e);
                        break;
                    }
                }
            }
            debug!("Command reader finished");
        })?;

    Ok(rx)
}

/// Strip the line terminator and decode lossily
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Read operator commands from the process's standard input
pub fn spawn_stdin_reader(capacity: usize) -> std::io::Result<mpsc::Receiver<String>> {
    spawn_line_reader(std::io::BufReader::new(std::io::stdin()), capacity)
}

/// Forward SIGINT and SIGTERM into a bounded channel. Must be called from
/// within a tokio runtime.
#[cfg(unix)]
pub fn spawn_signal_listener(capacity: usize) -> std::io::Result<mpsc::Receiver<Shutdown>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let (tx, rx) = mpsc::channel(capacity);

    tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                Some(()) = interrupt.recv() => Shutdown::Interrupt,
                Some(()) = terminate.recv() => Shutdown::Terminate,
                else => break,
            };
            if tx.send(received).await.is_err() {
                break;
            }
        }
    });

    Ok(rx)
}

#[cfg(not(unix))]
pub fn spawn_signal_listener(capacity: usize) -> std::io::Result<mpsc::Receiver<Shutdown>> {
    let (tx, rx) = mpsc::channel(capacity);

    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if tx.send(Shutdown::Interrupt).await.is_err() {
                break;
            }
        }
    });

    Ok(rx)
}
