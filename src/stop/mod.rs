//! Stop conditions for the agent loop.
//!
//! A stop condition is a predicate over accumulated model output that
//! decides a turn is complete. The default treats the presence of a
//! literal marker substring as satisfied; markers are stripped from
//! text before it reaches the caller.

/// Marker the model emits when it has a final reply.
pub const FINAL_ANSWER_MARKER: &str = "Final Answer:";

/// Marker the model emits when it needs clarification from the user.
pub const CLARIFY_MARKER: &str = "Tool Clarify: ";

/// Trait for conditions that can stop a turn early.
pub trait StopCondition: Send + Sync {
    /// Check whether generation should stop given the accumulated text.
    fn should_stop(&self, text: &str) -> bool;
}

/// Stop when any of a set of literal marker substrings is present.
#[derive(Debug, Clone)]
pub struct MarkerStop {
    markers: Vec<String>,
}

impl MarkerStop {
    pub fn new(markers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            markers: markers.into_iter().map(Into::into).collect(),
        }
    }

    /// The default marker set: final answer or clarification request.
    pub fn final_answer() -> Self {
        Self::new([FINAL_ANSWER_MARKER, CLARIFY_MARKER])
    }

    /// Remove every marker occurrence from `text`.
    pub fn strip(&self, text: &str) -> String {
        let mut out = text.to_string();
        for marker in &self.markers {
            if out.contains(marker.as_str()) {
                out = out.replace(marker.as_str(), "");
            }
        }
        out
    }
}

impl StopCondition for MarkerStop {
    fn should_stop(&self, text: &str) -> bool {
        self.markers.iter().any(|m| text.contains(m.as_str()))
    }
}

/// Stop when a custom predicate returns true.
pub struct PredicateStop<F: Fn(&str) -> bool + Send + Sync> {
    predicate: F,
}

impl<F: Fn(&str) -> bool + Send + Sync> PredicateStop<F> {
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F: Fn(&str) -> bool + Send + Sync> StopCondition for PredicateStop<F> {
    fn should_stop(&self, text: &str) -> bool {
        (self.predicate)(text)
    }
}
