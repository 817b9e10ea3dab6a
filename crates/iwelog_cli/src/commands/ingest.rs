//! Ingest command implementation.
//!
//! Reads one JSON message per line and answers each with one JSON line:
//!
//! ```text
//! > {"typeMessage":"W","nameProject":"netlog","locationEvent":"cmd/main.go:65","bodyMessage":"Not equal"}
//! < {"status":"Ok","segment":"logW_1","sequence":1}
//! ```
//!
//! A message of type `T` is a connectivity check: it is acknowledged and
//! nothing is stored.

use iwelog_core::{Config, LogStore};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::{info, warn};

/// Message type used by clients to test the connection.
pub const TEST_MESSAGE_TYPE: &str = "T";

/// An incoming message.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Severity tag, or `T`.
    pub type_message: String,
    /// Project that emitted the event.
    #[serde(default)]
    pub name_project: String,
    /// Location of the event.
    #[serde(default)]
    pub location_event: String,
    /// Message text.
    #[serde(default)]
    pub body_message: String,
}

/// The answer to one message.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Reply {
    /// `Ok` or `Error`.
    pub status: &'static str,
    /// Segment the record was written to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
    /// Sequence the record received.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
    /// What went wrong.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Reply {
    fn ok() -> Self {
        Self {
            status: "Ok",
            segment: None,
            sequence: None,
            error: None,
        }
    }

    fn error(message: impl ToString) -> Self {
        Self {
            status: "Error",
            segment: None,
            sequence: None,
            error: Some(message.to_string()),
        }
    }
}

/// Handles one input line.
pub fn handle_line(store: &LogStore, line: &str) -> Reply {
    let message: Message = match serde_json::from_str(line) {
        Ok(message) => message,
        Err(e) => return Reply::error(format!("malformed message: {e}")),
    };

    if message.type_message == TEST_MESSAGE_TYPE {
        return Reply::ok();
    }

    match store.submit(
        &message.type_message,
        &message.name_project,
        &message.location_event,
        &message.body_message,
    ) {
        Ok(outcome) => Reply {
            segment: Some(outcome.segment.to_string()),
            sequence: Some(outcome.sequence.as_u64()),
            ..Reply::ok()
        },
        Err(e) => {
            warn!(error = %e, "rejected message");
            Reply::error(e)
        }
    }
}

/// Runs the ingest command until `input` is exhausted.
pub fn run(
    path: &Path,
    config: Config,
    input: impl BufRead,
    mut output: impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = super::open_existing(path, config)?;
    store.initialize()?;

    let (mut accepted, mut rejected) = (0u64, 0u64);
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let reply = handle_line(&store, &line);
        if reply.error.is_some() {
            rejected += 1;
        } else {
            accepted += 1;
        }
        serde_json::to_writer(&mut output, &reply)?;
        writeln!(output)?;
    }
    output.flush()?;

    info!(accepted, rejected, "ingest finished");
    store.close()?;
    Ok(())
}
