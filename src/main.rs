mod command;
mod mirror;
mod mission;
mod notify;
mod store;

use command::{CommandTracker, TokioScheduler};
use fleetdeck_shared::{limits, now_ms, Alert, Drone, Profile, TaskKind, TelemetryReading};
use mirror::{CollectionSpec, Mirror};
use mission::{MissionPlanner, WaypointDraft};
use store::{MemoryStore, RemoteStore};

use anyhow::Context;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    info!("Fleet console starting");

    // In-process store with a seeded fleet; the hosted database takes
    // this role in production.
    let store = Arc::new(MemoryStore::new());
    seed_fleet(&store).await?;

    let operator = current_operator(store.as_ref()).await;
    match &operator {
        Some(profile) => info!("Signed in as {} ({})", profile.display_name, profile.role),
        None => warn!("No operator profile; alert acknowledgement disabled"),
    }

    let fleet = fetch_fleet(store.as_ref()).await?;
    info!("Fleet roster: {} drones", fleet.len());
    for drone in &fleet {
        info!("  {} ({}) - {:?}", drone.name, drone.model, drone.status);
    }

    // Mirrors follow the server-held collections.
    let mut telemetry: Mirror<TelemetryReading> =
        Mirror::start(store.clone(), CollectionSpec::telemetry()).await;
    let mut alerts: Mirror<Alert> = Mirror::start(store.clone(), CollectionSpec::alerts()).await;

    // Command tracker and mission planner share the notification line.
    let (notify_tx, mut notify_rx) = notify::channel();
    let tracker = CommandTracker::new(Arc::new(TokioScheduler), notify_tx.clone());
    let mut planner = MissionPlanner::with_default_route(notify_tx.clone());

    // Simulated fleet activity feeding the store, the way real rows would
    // arrive server-side.
    tokio::spawn(simulate_fleet(store.clone(), fleet.clone()));

    let mut ticker = tokio::time::interval(tokio::time::Duration::from_millis(2000));
    let mut step: u32 = 0;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
            Some(notification) = notify_rx.recv() => {
                info!("[NOTIFY] {}", notification.message);
            }
            _ = ticker.tick() => {
                step += 1;
                run_operator_step(step, &tracker, &mut planner, &alerts, &operator).await;
                log_status(&telemetry, &alerts, &tracker).await;
            }
        }
    }

    // Symmetric teardown: after stop() returns, no feed event can touch
    // the caches.
    telemetry.stop().await;
    alerts.stop().await;
    info!("Mirrors stopped");

    Ok(())
}

/// Seed the standard fleet the dashboard opens with
async fn seed_fleet(store: &MemoryStore) -> anyhow::Result<()> {
    let now = now_ms();

    let drones = [
        ("drone-1", "Falcon", "QX-400", "flying", 87.0, 37.7749, -122.4194),
        ("drone-2", "Osprey", "QX-400", "idle", 64.0, 37.7849, -122.4094),
        ("drone-3", "Kestrel", "MX-200", "maintenance", 31.0, 37.7649, -122.4294),
    ];

    for (id, name, model, status, battery, lat, lng) in drones {
        store
            .insert(
                "drones",
                json!({
                    "id": id,
                    "name": name,
                    "model": model,
                    "status": status,
                    "battery_level": battery,
                    "altitude": 0.0,
                    "speed": 0.0,
                    "heading": 0.0,
                    "location_lat": lat,
                    "location_lng": lng,
                    "updated_at": now,
                }),
            )
            .await
            .context("seeding drones")?;
    }

    store
        .insert(
            "profiles",
            json!({
                "user_id": "op-1",
                "display_name": "Field Operator",
                "role": "operator",
            }),
        )
        .await
        .context("seeding profiles")?;

    Ok(())
}

/// Resolve the signed-in operator, or none. Identity itself is handled by
/// an external provider; the console only needs someone to attribute
/// acknowledgements to.
async fn current_operator(store: &dyn RemoteStore) -> Option<Profile> {
    let rows = match store.select("profiles", "user_id", false, 1).await {
        Ok(rows) => rows,
        Err(e) => {
            error!("Profile lookup failed: {}", e);
            return None;
        }
    };

    rows.into_iter()
        .next()
        .and_then(|row| serde_json::from_value(row).ok())
}

/// One bulk read of the drone roster
async fn fetch_fleet(store: &dyn RemoteStore) -> anyhow::Result<Vec<Drone>> {
    let rows = store
        .select("drones", "name", false, limits::MAX_TELEMETRY_DRONES)
        .await
        .context("fetching drone roster")?;

    Ok(rows
        .into_iter()
        .filter_map(|row| serde_json::from_value(row).ok())
        .collect())
}

/// Push synthetic telemetry and the occasional alert into the store.
/// Values drift deterministically; this stands in for the fleet itself.
async fn simulate_fleet(store: Arc<MemoryStore>, fleet: Vec<Drone>) {
    let mut ticker = tokio::time::interval(tokio::time::Duration::from_millis(1000));
    let mut tick: u64 = 0;

    loop {
        ticker.tick().await;
        tick += 1;

        for (index, drone) in fleet.iter().enumerate() {
            let phase = (tick + index as u64 * 7) as f64;
            let reading = json!({
                "drone_id": drone.id,
                "timestamp": now_ms(),
                "altitude": 100.0 + 20.0 * (phase * 0.3).sin(),
                "speed": 8.0 + 2.0 * (phase * 0.5).cos(),
                "heading": (phase * 13.0) % 360.0,
                "battery_level": (drone.battery_level - tick as f64 * 0.05).max(0.0),
                "gps_satellites": 9 + (tick + index as u64) % 4,
                "signal_strength": 88.0 + 6.0 * (phase * 0.2).sin(),
                "temperature": 18.0 + 4.0 * (phase * 0.1).sin(),
                "humidity": 55.0 + 10.0 * (phase * 0.15).cos(),
            });

            if let Err(e) = store.insert("telemetry", reading).await {
                error!("Telemetry insert failed: {}", e);
            }
        }

        if tick % 7 == 0 {
            let severity = match (tick / 7) % 3 {
                0 => "critical",
                1 => "warning",
                _ => "info",
            };
            let alert = json!({
                "id": format!("alert-{tick}"),
                "drone_id": "drone-1",
                "type": severity,
                "title": "Telemetry anomaly",
                "message": "Signal variance above threshold on drone-1",
                "ai_recommendation": "Reduce speed and verify GPS lock",
                "created_at": now_ms(),
                "acknowledged": false,
            });

            if let Err(e) = store.insert("alerts", alert).await {
                error!("Alert insert failed: {}", e);
            }
        }
    }
}

/// Scripted operator session: a little of everything the console does
async fn run_operator_step(
    step: u32,
    tracker: &CommandTracker,
    planner: &mut MissionPlanner,
    alerts: &Mirror<Alert>,
    operator: &Option<Profile>,
) {
    match step {
        2 => {
            tracker.start_mission().await;
        }
        4 => {
            let draft = WaypointDraft {
                name: "WP4".to_string(),
                lat: 37.7549,
                lng: -122.4394,
                altitude: 110.0,
                task: TaskKind::Video,
                duration_secs: 20,
            };
            match planner.add_waypoint(draft) {
                Ok(_) => {
                    let stats = planner.stats();
                    info!(
                        "Route: {} waypoints, {:.1} km, est {}s",
                        stats.waypoint_count, stats.distance_km, stats.estimated_time_secs
                    );
                }
                Err(e) => warn!("Waypoint rejected: {}", e),
            }
        }
        5 => {
            let user_id = operator.as_ref().map(|p| p.user_id.clone());
            planner.upload("Harbor Survey", "drone-1", user_id.as_deref().unwrap_or("unknown"));
        }
        6 => {
            tracker.return_to_home().await;
        }
        7 => {
            tracker.initiate_reroute().await;
        }
        8 => {
            if let Some(profile) = operator {
                let pending = alerts.snapshot().await;
                if let Some(alert) = pending.iter().find(|a| a.needs_attention()) {
                    info!("Acknowledging alert {} ({})", alert.id, alert.title);
                    alerts.acknowledge(&alert.id, &profile.user_id).await;
                }
            }
        }
        _ => {}
    }
}

/// Periodic status line, the console's render pass
async fn log_status(
    telemetry: &Mirror<TelemetryReading>,
    alerts: &Mirror<Alert>,
    tracker: &CommandTracker,
) {
    let readings = telemetry.snapshot().await;
    let alert_list = alerts.snapshot().await;
    let commands = tracker.snapshot().await;

    for reading in &readings {
        info!(
            "[TELEMETRY] {}: alt {:.0}m, spd {:.1}m/s, bat {:.0}%, sats {}, temp {}",
            reading.drone_id,
            reading.altitude,
            reading.speed,
            reading.battery_level,
            reading.gps_satellites,
            TelemetryReading::sensor_display(reading.temperature, "C"),
        );
    }

    let unacked = alert_list.iter().filter(|a| a.needs_attention()).count();
    info!(
        "[STATUS] mission {}, operator {}, {} alerts ({} unacknowledged), {} tracked commands",
        tracker.mission_status().await.label(),
        tracker.operator_mode().await.label(),
        alert_list.len(),
        unacked,
        commands.len()
    );

    for command in &commands {
        info!(
            "[COMMAND] #{} {} - {}",
            command.id,
            command.description,
            command.stage.label()
        );
    }
}
