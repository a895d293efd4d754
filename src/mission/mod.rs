//! Mission Route Planner
//!
//! This module handles:
//! - The operator-authored waypoint route, in authoritative order
//! - Flat-rate distance and time aggregates, recomputed per mutation
//! - Writing the route out as a mission document on upload

mod metrics;
mod planner;

pub use metrics::{distance_km, estimated_time_secs};
pub use planner::{MissionPlanner, MissionStats, PlanError, WaypointDraft};
