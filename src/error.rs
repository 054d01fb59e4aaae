//! Error type shared by the store, the scheduling engine and the workflows.

use std::io;

use chrono::NaiveDate;
use thiserror::Error;

/// Errors surfaced to the user by `spm` commands.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("could not parse workbook {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not parse config {path}: {source}")]
    Config {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("multiple {kind}s named '{name}': {candidates}. Please use the specific ID instead")]
    Ambiguous {
        kind: &'static str,
        name: String,
        candidates: String,
    },

    #[error("deadline {deadline} is before start date {start}")]
    InvalidDateRange { start: NaiveDate, deadline: NaiveDate },

    #[error("task duration must be at least 1 day, got {0}")]
    InvalidDuration(i64),

    #[error("could not understand date '{0}'")]
    InvalidDate(String),

    #[error("{date} moved by {days} day(s) is outside the supported calendar")]
    DateOutOfRange { date: NaiveDate, days: i64 },

    #[error("invalid task hierarchy: {0}")]
    InvalidHierarchy(String),

    #[error("propagation did not settle within {0} steps")]
    PropagationLimit(usize),

    #[error("{0}")]
    Rejected(String),

    #[error("{user} is not authorized to {action}")]
    Unauthorized { user: String, action: &'static str },
}

impl AppError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        AppError::NotFound { kind, id: id.to_string() }
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        AppError::Rejected(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
