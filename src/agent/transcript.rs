//! Short-term transcript rendered into each prompt.

use serde::Serialize;

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    pub role: String,
    pub content: String,
}

/// Ordered transcript of a turn: system prompts, prior exchanges, the
/// task, and every model/tool response so far.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, role: impl Into<String>, content: impl Into<String>) {
        self.entries.push(TranscriptEntry {
            role: role.into(),
            content: content.into(),
        });
    }

    /// Render the full transcript as the next prompt.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{}: {}", e.role, e.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_preserves_insertion_order() {
        let mut transcript = Transcript::new();
        transcript.add("system", "You are an agent.");
        transcript.add("User", "hello");
        transcript.add("Pulse Agent", "Final Answer: hi");

        let rendered = transcript.render();
        assert_eq!(
            rendered,
            "system: You are an agent.\n\nUser: hello\n\nPulse Agent: Final Answer: hi"
        );
    }

    #[test]
    fn empty_transcript_renders_empty() {
        assert_eq!(Transcript::new().render(), "");
        assert!(Transcript::new().is_empty());
    }
}
