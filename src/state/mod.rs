//! State module for tracking chapter walks
//!
//! # Components
//!
//! - `WalkState`: the pagination state machine a chapter walk moves through
//! - `EndReason`: which terminal condition finished a chapter

mod walk_state;

// Re-export main types
pub use walk_state::{EndReason, WalkState};
