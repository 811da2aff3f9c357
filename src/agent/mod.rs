//! Agent execution loop.
//!
//! [`AgentExecutor`] drives one user turn to completion: it renders the
//! transcript as a prompt, streams a completion, checks the stopping
//! condition against the buffer after every fragment, dispatches tool
//! invocations, and decides whether to keep looping. It is composed
//! from explicit capabilities (a completion client, a tool registry, a
//! stop condition) rather than inherited from anything.

mod events;
mod executor;
mod output;
mod transcript;

pub use events::{AgentOutput, StatusEvent};
pub use executor::{AgentExecutor, ExecutorConfig, StoppingFn};
pub use output::{FinalOutput, MaxLoops, OutputType, TurnDump};
pub use transcript::{Transcript, TranscriptEntry};
