use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Message class used to colour console lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    #[default]
    Info,
    Debug,
    Error,
    System,
    User,
    Tars,
    /// Lines tagged with `*` by the dialogue pipeline.
    #[serde(rename = "*")]
    Highlight,
}

impl Severity {
    /// Parse the label producers use on the wire; unknown labels map to `Info`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Self::Debug,
            "ERROR" => Self::Error,
            "SYSTEM" => Self::System,
            "USER" => Self::User,
            "TARS" => Self::Tars,
            "*" => Self::Highlight,
            _ => Self::Info,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
            Self::Error => "ERROR",
            Self::System => "SYSTEM",
            Self::User => "USER",
            Self::Tars => "TARS",
            Self::Highlight => "*",
        }
    }
}

impl From<&str> for Severity {
    fn from(label: &str) -> Self {
        Self::from_label(label)
    }
}

/// One console line as pushed by a producer. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// Arrival order across all producers, starting at 1. Zero for entries
    /// built outside a feed.
    pub seq: u64,
    pub timestamp: SystemTime,
    pub source: String,
    pub text: String,
    pub severity: Severity,
}

impl LogEntry {
    pub fn new(source: impl Into<String>, text: impl Into<String>, severity: Severity) -> Self {
        Self {
            seq: 0,
            timestamp: SystemTime::now(),
            source: source.into(),
            text: text.into(),
            severity,
        }
    }

    pub(crate) fn with_seq(mut self, seq: u64) -> Self {
        self.seq = seq;
        self
    }

    /// Text shown in the console, `source: text`.
    pub fn display_text(&self) -> String {
        if self.source.is_empty() {
            self.text.clone()
        } else {
            format!("{}: {}", self.source, self.text)
        }
    }
}
