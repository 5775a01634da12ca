//! Failure log entries
//!
//! The failure log is append-only and deliberately not deduplicated: the same
//! URL can show up once per failed attempt.

use std::fmt;

/// Why a URL ended up in the failure log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Timeout, connection error, non-2xx status or aborted fetch task
    Transport,

    /// The endpoint answered with an empty body
    EmptyPayload,

    /// The body could not be decoded into reviews
    Parse,
}

impl FailureKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::EmptyPayload => "empty_payload",
            Self::Parse => "parse",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "transport" => Some(Self::Transport),
            "empty_payload" => Some(Self::EmptyPayload),
            "parse" => Some(Self::Parse),
            _ => None,
        }
    }

    pub fn all() -> [Self; 3] {
        [Self::Transport, Self::EmptyPayload, Self::Parse]
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// A failure about to be appended to the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub url: String,
    pub kind: FailureKind,
    pub message: String,
    pub item_id: String,
}

impl Failure {
    pub fn new(
        url: impl Into<String>,
        kind: FailureKind,
        message: impl Into<String>,
        item_id: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            kind,
            message: message.into(),
            item_id: item_id.into(),
        }
    }
}

/// A failure as stored in the log
#[derive(Debug, Clone)]
pub struct FailureRecord {
    pub id: i64,
    pub run_id: Option<i64>,
    pub recorded_at: String,
    pub failure: Failure,
}
