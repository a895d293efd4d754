//! Fleetdeck Shared Types
//!
//! This crate provides the row types for the fleet database tables consumed
//! by the console, the command lifecycle stage machine, and the operating
//! limits shared between the console components.

pub mod stage;

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

pub use stage::CommandStage;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Operating limits for the console
pub mod limits {
    /// Maximum alerts retained in the local mirror, newest first
    pub const MAX_ALERTS: usize = 10;

    /// Maximum commands retained in the tracker, newest first
    pub const MAX_COMMANDS: usize = 5;

    /// Maximum drones with a live telemetry reading in the mirror
    pub const MAX_TELEMETRY_DRONES: usize = 16;

    /// Delay before an issued command is reported acknowledged
    pub const COMMAND_ACK_DELAY_MS: u64 = 1_000;

    /// Delay before an issued command is reported executed, measured
    /// from creation. Must exceed `COMMAND_ACK_DELAY_MS` so the stages
    /// fire in order.
    pub const COMMAND_EXECUTE_DELAY_MS: u64 = 2_000;

    /// Delay before an operator override hands control back to standby
    pub const OVERRIDE_RESET_MS: u64 = 5_000;

    /// Flat-rate route leg length used by the mission planner
    pub const LEG_DISTANCE_KM: f64 = 0.5;

    /// Per-waypoint transit overhead added to the time estimate
    pub const TRANSIT_OVERHEAD_SECS: u32 = 2;
}

/// Operational status of a drone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DroneStatus {
    Flying,
    Idle,
    Maintenance,
    Offline,
}

/// Fleet-wide mission phase, driven by the commands the operator issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionStatus {
    Idle,
    Active,
    Paused,
    Returning,
}

impl MissionStatus {
    pub fn label(self) -> &'static str {
        match self {
            MissionStatus::Idle => "idle",
            MissionStatus::Active => "active",
            MissionStatus::Paused => "paused",
            MissionStatus::Returning => "returning",
        }
    }
}

/// Who holds the controls. Overrides are temporary; the console falls
/// back to standby after a fixed delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorMode {
    Standby,
    Override,
    Emergency,
}

impl OperatorMode {
    pub fn label(self) -> &'static str {
        match self {
            OperatorMode::Standby => "standby",
            OperatorMode::Override => "override",
            OperatorMode::Emergency => "emergency",
        }
    }
}

/// A row from the `drones` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drone {
    pub id: String,
    pub name: String,
    pub model: String,
    pub status: DroneStatus,
    /// Battery percentage, 0-100
    pub battery_level: f64,
    /// Altitude in meters
    pub altitude: f64,
    /// Ground speed in m/s
    pub speed: f64,
    /// Heading in degrees, 0-360
    pub heading: f64,
    pub location_lat: f64,
    pub location_lng: f64,
    pub updated_at: u64,
}

/// A telemetry snapshot for one drone. Only the most recent reading per
/// drone is retained by the console.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryReading {
    pub drone_id: String,
    pub timestamp: u64,
    pub altitude: f64,
    pub speed: f64,
    pub heading: f64,
    pub battery_level: f64,
    pub gps_satellites: u32,
    pub signal_strength: f64,
    /// Environmental sensors are optional equipment; missing columns
    /// render as "not available" rather than a default value.
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

/// Alert severity, stored in the `type` column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

/// A row from the `alerts` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    #[serde(default)]
    pub drone_id: Option<String>,
    #[serde(rename = "type")]
    pub severity: Severity,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub ai_recommendation: Option<String>,
    pub created_at: u64,
    pub acknowledged: bool,
    #[serde(default)]
    pub acknowledged_by: Option<String>,
}

/// A row from the `missions` table. The waypoint route is stored as a
/// structured JSON document, matching the backing store schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mission {
    pub id: String,
    pub drone_id: String,
    pub created_by: String,
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub start_time: Option<u64>,
    #[serde(default)]
    pub end_time: Option<u64>,
    pub waypoints: serde_json::Value,
}

/// A row from the `profiles` table, the operator identity boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub display_name: String,
    pub role: String,
}

/// What a drone does on arrival at a waypoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    Survey,
    Photo,
    Video,
    Hover,
    Landing,
}

/// A planner-local waypoint. Routes live in the mission planner and are
/// only written out as a mission document on upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waypoint {
    pub id: u64,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    /// Altitude in meters
    pub altitude: f64,
    pub task: TaskKind,
    /// Dwell time at the waypoint in seconds
    pub duration_secs: u32,
}

impl Alert {
    /// Whether the alert still needs operator attention
    pub fn needs_attention(&self) -> bool {
        !self.acknowledged
    }
}

impl TelemetryReading {
    /// Format an optional sensor value for display
    pub fn sensor_display(value: Option<f64>, unit: &str) -> String {
        match value {
            Some(v) => format!("{:.1}{}", v, unit),
            None => "n/a".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_ms_monotonic_enough() {
        let a = now_ms();
        let b = now_ms();
        assert!(b >= a);
        assert!(a > 0);
    }

    #[test]
    fn test_alert_severity_column_name() {
        let row = serde_json::json!({
            "id": "a-1",
            "type": "critical",
            "title": "Battery low",
            "message": "Drone alpha below 20%",
            "created_at": 1_000u64,
            "acknowledged": false,
        });

        let alert: Alert = serde_json::from_value(row).unwrap();
        assert_eq!(alert.severity, Severity::Critical);
        assert!(alert.needs_attention());
        assert!(alert.drone_id.is_none());
        assert!(alert.acknowledged_by.is_none());
    }

    #[test]
    fn test_missing_optional_sensors_decode_as_none() {
        let row = serde_json::json!({
            "drone_id": "drone-1",
            "timestamp": 5_000u64,
            "altitude": 120.0,
            "speed": 8.5,
            "heading": 270.0,
            "battery_level": 76.0,
            "gps_satellites": 11,
            "signal_strength": 92.0,
        });

        let reading: TelemetryReading = serde_json::from_value(row).unwrap();
        assert!(reading.temperature.is_none());
        assert!(reading.humidity.is_none());
        assert_eq!(TelemetryReading::sensor_display(reading.temperature, "C"), "n/a");
        assert_eq!(TelemetryReading::sensor_display(Some(21.57), "C"), "21.6C");
    }

    #[test]
    fn test_drone_status_round_trip() {
        let json = serde_json::to_string(&DroneStatus::Maintenance).unwrap();
        assert_eq!(json, "\"maintenance\"");
        let status: DroneStatus = serde_json::from_str("\"flying\"").unwrap();
        assert_eq!(status, DroneStatus::Flying);
    }
}
