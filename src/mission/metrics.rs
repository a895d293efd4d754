//! Route aggregates over the waypoint sequence
//!
//! Both functions are pure over the current route order. The distance is
//! a flat per-leg rate, not a geodesic computation; the dashboard has
//! always shown it that way and the toy model is kept as-is.

use fleetdeck_shared::{limits, Waypoint};

/// Total route distance: `legs * LEG_DISTANCE_KM`, zero for fewer than
/// two waypoints.
pub fn distance_km(waypoints: &[Waypoint]) -> f64 {
    match waypoints.len() {
        0 | 1 => 0.0,
        n => (n as f64 - 1.0) * limits::LEG_DISTANCE_KM,
    }
}

/// Estimated route time: the sum of dwell durations plus a fixed transit
/// overhead per waypoint.
pub fn estimated_time_secs(waypoints: &[Waypoint]) -> u32 {
    let dwell: u32 = waypoints.iter().map(|w| w.duration_secs).sum();
    dwell + waypoints.len() as u32 * limits::TRANSIT_OVERHEAD_SECS
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetdeck_shared::TaskKind;

    fn waypoint(id: u64, duration_secs: u32) -> Waypoint {
        Waypoint {
            id,
            name: format!("WP{id}"),
            lat: 37.77,
            lng: -122.41,
            altitude: 100.0,
            task: TaskKind::Survey,
            duration_secs,
        }
    }

    #[test]
    fn test_distance_flat_rate() {
        assert_eq!(distance_km(&[]), 0.0);
        assert_eq!(distance_km(&[waypoint(1, 30)]), 0.0);

        let route = vec![waypoint(1, 30), waypoint(2, 15), waypoint(3, 45)];
        assert_eq!(distance_km(&route), 2.0 * limits::LEG_DISTANCE_KM);
    }

    #[test]
    fn test_estimated_time() {
        assert_eq!(estimated_time_secs(&[]), 0);

        let route = vec![waypoint(1, 30), waypoint(2, 15)];
        assert_eq!(
            estimated_time_secs(&route),
            30 + 15 + 2 * limits::TRANSIT_OVERHEAD_SECS
        );
    }

    #[test]
    fn test_aggregates_are_idempotent() {
        let route = vec![waypoint(1, 10), waypoint(2, 20)];
        assert_eq!(distance_km(&route), distance_km(&route));
        assert_eq!(estimated_time_secs(&route), estimated_time_secs(&route));
    }
}
