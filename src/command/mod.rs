//! Command Lifecycle Tracker
//!
//! This module handles:
//! - Issuing operator commands and tracking the 5 most recent
//! - Simulated acknowledgement timing via a pluggable scheduler
//! - Forward-only stage progression keyed by command id
//! - Mission phase and operator control mode derived from the commands

mod scheduler;
mod tracker;

pub use scheduler::{ManualScheduler, Scheduler, TokioScheduler};
pub use tracker::{CommandRecord, CommandTracker, TrackerConfig};
