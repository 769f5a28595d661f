//! Cooperative cancellation and first-success task racing.
//!
//! This module provides:
//! - CancellationToken for cooperative cancellation with child tokens
//! - RaceGroup for fanning out equivalent tasks and keeping the first success

mod task_group;
mod token;

pub use task_group::{RaceGroup, RaceOutcome};
pub use token::{CallbackId, CancelCallback, CancellationToken};
