//! Waypoint route editing and mission upload

use super::metrics;
use crate::notify::{Notification, NotificationSender};
use fleetdeck_shared::{now_ms, Mission, TaskKind, Waypoint};
use thiserror::Error;
use tracing::info;

/// Validation failures when adding a waypoint
#[derive(Error, Debug, PartialEq)]
pub enum PlanError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("latitude {0} out of range")]
    InvalidLatitude(f64),

    #[error("longitude {0} out of range")]
    InvalidLongitude(f64),
}

/// Operator input for a new waypoint, before validation
#[derive(Debug, Clone)]
pub struct WaypointDraft {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub altitude: f64,
    pub task: TaskKind,
    pub duration_secs: u32,
}

/// Route summary shown above the waypoint list
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissionStats {
    pub waypoint_count: usize,
    pub distance_km: f64,
    pub estimated_time_secs: u32,
}

/// Owns the waypoint route. The list order is the authoritative route
/// order; the stats are recomputed exactly once per mutation and served
/// from cache between mutations.
pub struct MissionPlanner {
    waypoints: Vec<Waypoint>,
    stats: MissionStats,
    next_id: u64,
    notify_tx: NotificationSender,
}

impl MissionPlanner {
    /// An empty route
    pub fn new(notify_tx: NotificationSender) -> Self {
        let mut planner = Self {
            waypoints: Vec::new(),
            stats: MissionStats {
                waypoint_count: 0,
                distance_km: 0.0,
                estimated_time_secs: 0,
            },
            next_id: 1,
            notify_tx,
        };
        planner.recompute();
        planner
    }

    /// The survey route the planner opens with
    pub fn with_default_route(notify_tx: NotificationSender) -> Self {
        let mut planner = Self::new(notify_tx);
        for (name, lat, lng, altitude, task, duration_secs) in [
            ("WP1", 37.7749, -122.4194, 100.0, TaskKind::Survey, 30),
            ("WP2", 37.7849, -122.4094, 120.0, TaskKind::Photo, 15),
            ("WP3", 37.7649, -122.4294, 80.0, TaskKind::Hover, 45),
        ] {
            planner.push_waypoint(Waypoint {
                id: 0, // assigned below
                name: name.to_string(),
                lat,
                lng,
                altitude,
                task,
                duration_secs,
            });
        }
        planner
    }

    /// Validate a draft and append it to the route
    pub fn add_waypoint(&mut self, draft: WaypointDraft) -> Result<u64, PlanError> {
        if draft.name.trim().is_empty() {
            return Err(PlanError::MissingField("name"));
        }
        if !(-90.0..=90.0).contains(&draft.lat) {
            return Err(PlanError::InvalidLatitude(draft.lat));
        }
        if !(-180.0..=180.0).contains(&draft.lng) {
            return Err(PlanError::InvalidLongitude(draft.lng));
        }

        let id = self.push_waypoint(Waypoint {
            id: 0,
            name: draft.name,
            lat: draft.lat,
            lng: draft.lng,
            altitude: draft.altitude,
            task: draft.task,
            duration_secs: draft.duration_secs,
        });

        let _ = self.notify_tx.send(Notification::new("Waypoint added"));
        Ok(id)
    }

    /// Remove a waypoint by id. Returns false when the id is unknown.
    pub fn remove_waypoint(&mut self, id: u64) -> bool {
        let before = self.waypoints.len();
        self.waypoints.retain(|w| w.id != id);

        if self.waypoints.len() == before {
            return false;
        }

        self.recompute();
        let _ = self.notify_tx.send(Notification::new("Waypoint removed"));
        true
    }

    /// The route in authoritative order
    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    /// Cached aggregates for the current route
    pub fn stats(&self) -> MissionStats {
        self.stats
    }

    /// Produce the mission document for upload. The actual transfer is a
    /// stub side effect; the console never persists routes itself.
    pub fn upload(&self, name: &str, drone_id: &str, created_by: &str) -> Mission {
        let mission = Mission {
            id: format!("mission-{}", now_ms()),
            drone_id: drone_id.to_string(),
            created_by: created_by.to_string(),
            name: name.to_string(),
            status: "planned".to_string(),
            start_time: None,
            end_time: None,
            waypoints: serde_json::json!(self.waypoints),
        };

        info!(
            "Mission '{}' prepared: {} waypoints, {:.1} km",
            name, self.stats.waypoint_count, self.stats.distance_km
        );
        let _ = self
            .notify_tx
            .send(Notification::new("Mission uploaded to drone"));

        mission
    }

    fn push_waypoint(&mut self, mut waypoint: Waypoint) -> u64 {
        waypoint.id = self.next_id;
        self.next_id += 1;
        let id = waypoint.id;

        self.waypoints.push(waypoint);
        self.recompute();
        id
    }

    fn recompute(&mut self) {
        self.stats = MissionStats {
            waypoint_count: self.waypoints.len(),
            distance_km: metrics::distance_km(&self.waypoints),
            estimated_time_secs: metrics::estimated_time_secs(&self.waypoints),
        };
    }
}
