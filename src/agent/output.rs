//! Loop bounds and final-output serialization forms.

use serde::Serialize;
use strum::{Display, EnumString};

use super::transcript::TranscriptEntry;

/// Iteration bound for one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxLoops {
    Bounded(u32),
    Unbounded,
}

impl MaxLoops {
    /// Whether another iteration may start after `completed` iterations.
    pub fn allows(&self, completed: u32) -> bool {
        match self {
            MaxLoops::Bounded(max) => completed < *max,
            MaxLoops::Unbounded => true,
        }
    }
}

/// Serialization form of a completed turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OutputType {
    /// Concatenated text of all per-iteration responses.
    #[strum(serialize = "string", serialize = "str")]
    Text,
    /// The raw per-iteration response list.
    List,
    /// Structured dump of the full turn.
    Json,
}

/// Terminal value of a completed turn, shaped by [`OutputType`].
#[derive(Debug, Clone, PartialEq)]
pub enum FinalOutput {
    Text(String),
    List(Vec<String>),
    Json(String),
}

/// Structured dump of a full turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnDump {
    pub task: String,
    pub steps: Vec<TranscriptEntry>,
    pub full_history: String,
    pub total_tokens: usize,
}
