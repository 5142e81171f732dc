//! JSON lines protocol for driving the resolver from another process.
//!
//! **Input (stdin):** one command object per line
//! **Output (stdout):** one response object per line
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0"}
//! -> {"cmd":"simulate","input":{"seed":"room-7","fleetA":[...],"fleetB":[...]}}
//! <- {"type":"result","digest":123...,"output":{"winnerId":"A","roundLog":[...],...}}
//! -> {"cmd":"verify","input":{...},"digest":123...}
//! <- {"type":"verified","matches":true,"local":123...,"remote":123...}
//! ```

use std::io::{self, BufRead, Write};

use fleet_core::prelude::{simulate, BattleInput, BattleOutput, Seed};
use serde::{Deserialize, Serialize};

use crate::scenario::Scenario;

/// Protocol version announced in the ready message.
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Input Commands (controller -> runner)
// ============================================================================

/// Commands accepted by the runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Resolve a battle and return the full output.
    Simulate { input: BattleInput },

    /// Resolve a battle and return only its digest.
    Digest { input: BattleInput },

    /// Resolve a battle and compare against a peer's digest.
    Verify { input: BattleInput, digest: u64 },

    /// Resolve a built-in scenario, optionally with another seed.
    Scenario {
        name: String,
        #[serde(default)]
        seed: Option<Seed>,
    },
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Command name, for error reporting.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Simulate { .. } => "simulate",
            Command::Digest { .. } => "digest",
            Command::Verify { .. } => "verify",
            Command::Scenario { .. } => "scenario",
        }
    }
}

// ============================================================================
// Output Responses (runner -> controller)
// ============================================================================

/// Responses written by the runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready { version: String },

    /// A resolved battle.
    Result { digest: u64, output: BattleOutput },

    /// Digest of a resolved battle.
    Digest { digest: u64 },

    /// Comparison against a peer digest.
    Verified { matches: bool, local: u64, remote: u64 },

    /// Error processing a command.
    Error {
        message: String,
        cmd: Option<String>,
    },
}

impl Response {
    /// Create a ready response.
    pub fn ready() -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"type":"error","message":"Serialization failed: {}"}}"#,
                e
            )
        });
        json.push('\n');
        json
    }
}

/// Execute one command.
pub fn handle(command: Command) -> Response {
    match command {
        Command::Simulate { input } => {
            let output = simulate(&input);
            Response::Result {
                digest: output.digest(),
                output,
            }
        }
        Command::Digest { input } => Response::Digest {
            digest: simulate(&input).digest(),
        },
        Command::Verify { input, digest } => {
            let output = simulate(&input);
            Response::Verified {
                matches: output.verify_digest(digest).is_ok(),
                local: output.digest(),
                remote: digest,
            }
        }
        Command::Scenario { name, seed } => match Scenario::builtin(&name) {
            Some(scenario) => {
                let input = match seed {
                    Some(seed) => scenario.input_with_seed(seed),
                    None => scenario.to_input(),
                };
                handle(Command::Simulate { input })
            }
            None => Response::error(format!("Unknown scenario: {name}"), Some("scenario")),
        },
    }
}

/// Parse and execute one JSON line.
pub fn handle_line(line: &str) -> Response {
    match Command::from_json(line) {
        Ok(command) => {
            let name = command.name();
            tracing::debug!(cmd = name, "Handling command");
            handle(command)
        }
        Err(e) => Response::error(format!("Invalid command: {e}"), None),
    }
}

/// Serve commands from `reader` until end of input. Returns the number of
/// commands handled.
pub fn serve<R: BufRead, W: Write>(reader: R, mut writer: W) -> io::Result<u32> {
    writer.write_all(Response::ready().to_json_line().as_bytes())?;
    writer.flush()?;

    let mut handled = 0;
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        writer.write_all(handle_line(&line).to_json_line().as_bytes())?;
        writer.flush()?;
        handled += 1;
    }
    Ok(handled)
}
