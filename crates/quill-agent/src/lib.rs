//! # Quill Agent
//!
//! The conversation orchestrator. One caller turn is driven as a bounded
//! loop of model invocations: stream the model's response, execute any tool
//! calls it issued, feed the results back, and repeat until the model
//! answers in plain text or the step budget runs out.
//!
//! Progress is surfaced as a stream of [`TurnEvent`]s so callers can render
//! text deltas and tool-invocation lifecycles live.

pub mod agent;
pub mod events;
pub mod wire;

pub use agent::Agent;
pub use events::TurnEvent;
