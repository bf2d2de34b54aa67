//! Operator command grammar
//!
//! One command per line, whitespace-separated tokens, keyword matched
//! case-insensitively:
//! - `port <number>` - change the drop port (1-65535)
//! - `status` - show counters and the current port
//! - `help` - show the command reference
//! - `quit` / `exit` - stop the control plane

use thiserror::Error;

pub const HELP: &str = "\
Available commands:
  port <number>  - Change the drop port (e.g., 'port 8080')
  status         - Show current statistics
  help           - Show this help message
  quit/exit      - Exit the program
  Ctrl+C         - Exit the program";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Port(u16),
    Status,
    Help,
    Quit,
}

/// Rejected input. The `Display` text is what the operator sees.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Usage: port <number> (e.g., port 8080)")]
    PortUsage,

    #[error("Invalid port number '{0}'. Must be between 1-65535")]
    InvalidPort(String),

    #[error("Unknown command: {0}. Type 'help' for available commands")]
    Unknown(String),
}

impl Command {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    ///
    /// Only `port` takes an argument; trailing tokens after the other
    /// keywords are ignored.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let mut tokens = line.split_whitespace();
        let Some(keyword) = tokens.next() else {
            return Ok(None);
        };

        let command = match keyword.to_ascii_lowercase().as_str() {
            "port" => {
                let args: Vec<&str> = tokens.collect();
                let [arg] = args.as_slice() else {
                    return Err(CommandError::PortUsage);
                };
                Command::Port(parse_port(arg)?)
            }
            "status" => Command::Status,
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            _ => return Err(CommandError::Unknown(keyword.to_string())),
        };

        Ok(Some(command))
    }
}

fn parse_port(arg: &str) -> Result<u16, CommandError> {
    let invalid = || CommandError::InvalidPort(arg.to_string());

    if !arg.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    match arg.parse::<u16>() {
        Ok(0) | Err(_) => Err(invalid()),
        Ok(port) => Ok(port),
    }
}
