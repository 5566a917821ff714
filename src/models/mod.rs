//! Data models for the DSA roadmap tracker.
//!
//! Field names are snake_case to match the JSON contract consumed by the web client.

mod problem;
mod snapshot;
mod subtopic;
mod topic;

pub use problem::*;
pub use snapshot::*;
pub use subtopic::*;
pub use topic::*;
