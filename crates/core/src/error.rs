//! Error taxonomy for the core crate.
//!
//! Input data problems are fatal and surface to the process boundary. LLM
//! service failures never appear here; they are absorbed by the gateway.

use std::path::PathBuf;

/// Failures while reading or interpreting the user's data files.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Malformed CSV in {path} at line {line}: {source}")]
    Csv {
        path: PathBuf,
        line: u64,
        #[source]
        source: csv::Error,
    },
    #[error("Invalid timestamp '{value}': {source}")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("Profile field '{0}' is missing or has the wrong type")]
    MissingField(String),
}

/// Failures raised by the day simulator itself.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Prompt(#[from] crate::prompts::PromptError),
    #[error("Cannot {operation} while the day is {state}")]
    InvalidState {
        operation: &'static str,
        state: crate::simulator::DayState,
    },
    #[error("Simulated clock cannot move backwards from {from} to {to}")]
    ClockRewind {
        from: chrono::NaiveDateTime,
        to: chrono::NaiveDateTime,
    },
    #[error("Invalid simulation configuration: {0}")]
    InvalidConfig(String),
}
