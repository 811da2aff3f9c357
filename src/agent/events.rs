//! Output items yielded by the execution loop.

use serde::Serialize;

use super::output::FinalOutput;

/// Ephemeral progress notice emitted to the caller, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEvent {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl StatusEvent {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            tool_name: None,
        }
    }

    pub fn for_tool(message: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            tool_name: Some(tool_name.into()),
        }
    }
}

/// One item of the loop's output stream.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentOutput {
    /// Streamed response text, flushed once the stop condition fires.
    Fragment(String),
    /// Progress notice.
    Status(StatusEvent),
    /// One value produced by a streaming tool.
    ToolOutput(String),
    /// Terminal serialization of the turn; exactly one per completed turn.
    Final(FinalOutput),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_event_serializes_without_empty_tool_name() {
        let plain = serde_json::to_string(&StatusEvent::new("task understanding")).unwrap();
        assert_eq!(plain, r#"{"message":"task understanding"}"#);

        let tagged =
            serde_json::to_string(&StatusEvent::for_tool("executing tool", "ai_search")).unwrap();
        assert_eq!(
            tagged,
            r#"{"message":"executing tool","tool_name":"ai_search"}"#
        );
    }
}
