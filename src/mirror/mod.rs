//! Remote State Mirror
//!
//! This module handles:
//! - Bounded local caches of server-held collections (telemetry, alerts)
//! - Initial bulk fetch plus incremental change-feed application
//! - Deterministic feed teardown when a mirror is stopped

mod cache;

pub use cache::{BoundedCache, FeedRow};

use crate::store::{ChangeEvent, ChangeKind, FeedHandle, RemoteStore, Row};
use fleetdeck_shared::{limits, Alert};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Which collection a mirror tracks and how it is fetched
#[derive(Debug, Clone, Copy)]
pub struct CollectionSpec {
    pub table: &'static str,
    pub order_by: &'static str,
    pub limit: usize,
}

impl CollectionSpec {
    /// The 10 most recent alerts, newest first
    pub fn alerts() -> Self {
        Self {
            table: "alerts",
            order_by: "created_at",
            limit: limits::MAX_ALERTS,
        }
    }

    /// Latest telemetry reading per drone
    pub fn telemetry() -> Self {
        Self {
            table: "telemetry",
            order_by: "timestamp",
            limit: limits::MAX_TELEMETRY_DRONES,
        }
    }
}

/// An eventually-consistent local view of one server-held collection.
///
/// The cache is seeded with one bulk read and then follows the table's
/// change feed; it never blocks a reader while events are applied.
pub struct Mirror<T> {
    cache: Arc<RwLock<BoundedCache<T>>>,
    store: Arc<dyn RemoteStore>,
    spec: CollectionSpec,
    feed_handle: Option<Box<dyn FeedHandle>>,
    pump: Option<JoinHandle<()>>,
}

impl<T> Mirror<T>
where
    T: FeedRow + DeserializeOwned,
{
    /// Fetch the initial collection state and start following its feed.
    ///
    /// A failed bulk read leaves the cache empty and is logged, not
    /// retried; the feed still attaches so later changes arrive.
    pub async fn start(store: Arc<dyn RemoteStore>, spec: CollectionSpec) -> Self {
        let cache = Arc::new(RwLock::new(BoundedCache::new(spec.limit)));

        match store
            .select(spec.table, spec.order_by, true, spec.limit)
            .await
        {
            Ok(rows) => {
                let seeded = decode_rows::<T>(spec.table, rows);
                cache.write().await.seed(seeded);
            }
            Err(e) => {
                error!("Initial fetch of {} failed: {}", spec.table, e);
            }
        }

        let (feed_handle, pump) = match store.subscribe(spec.table).await {
            Ok(feed) => {
                let pump_cache = cache.clone();
                let table = spec.table;
                let mut events = feed.events;

                let pump = tokio::spawn(async move {
                    while let Some(event) = events.recv().await {
                        apply_event(&pump_cache, table, event).await;
                    }
                    debug!("Feed pump for {} stopped", table);
                });

                (Some(feed.handle), Some(pump))
            }
            Err(e) => {
                error!("Subscribe to {} failed: {}", spec.table, e);
                (None, None)
            }
        };

        Self {
            cache,
            store,
            spec,
            feed_handle,
            pump,
        }
    }

    /// Snapshot of the cached collection, newest first
    pub async fn snapshot(&self) -> Vec<T> {
        self.cache.read().await.rows().to_vec()
    }

    /// Number of cached entries
    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Close the change feed and wait for the pump task to finish.
    ///
    /// Once this returns, the subscription is gone from the store and no
    /// further event can mutate the cache.
    pub async fn stop(&mut self) {
        if let Some(handle) = self.feed_handle.take() {
            handle.close().await;
        }
        if let Some(pump) = self.pump.take() {
            if let Err(e) = pump.await {
                warn!("Feed pump for {} ended abnormally: {}", self.spec.table, e);
            }
        }
    }
}

impl Mirror<Alert> {
    /// Mark an alert acknowledged on behalf of an operator.
    ///
    /// Fire-and-forget: no local mutation happens here. The authoritative
    /// acknowledged row comes back through the change feed as a normal
    /// update, so a write failure only needs logging.
    pub async fn acknowledge(&self, alert_id: &str, user_id: &str) {
        let patch = serde_json::json!({
            "acknowledged": true,
            "acknowledged_by": user_id,
        });

        if let Err(e) = self.store.update(self.spec.table, alert_id, patch).await {
            warn!("Acknowledge of alert {} failed: {}", alert_id, e);
        }
    }
}

/// Decode bulk-read rows, dropping any that do not match the collection
/// type. A malformed row is a server-side bug worth logging, not a reason
/// to fail the whole fetch.
fn decode_rows<T: DeserializeOwned>(table: &str, rows: Vec<Row>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!("Dropping malformed {} row: {}", table, e);
                None
            }
        })
        .collect()
}

/// Apply one feed event to the cache, in arrival order
async fn apply_event<T>(cache: &RwLock<BoundedCache<T>>, table: &str, event: ChangeEvent)
where
    T: FeedRow + DeserializeOwned,
{
    match event.kind {
        ChangeKind::Insert => {
            let Some(row) = decode_event_row::<T>(table, event.new) else {
                return;
            };
            cache.write().await.apply_insert(row);
        }
        ChangeKind::Update => {
            let Some(row) = decode_event_row::<T>(table, event.new) else {
                return;
            };
            let applied = cache.write().await.apply_update(row);
            if !applied {
                // Row fell outside the bounded window; nothing to do.
                debug!("Update for uncached {} row ignored", table);
            }
        }
        ChangeKind::Delete => {
            // The dashboard collections are insert/acknowledge only.
            debug!("Delete event on {} ignored", table);
        }
    }
}

fn decode_event_row<T: DeserializeOwned>(table: &str, row: Option<Row>) -> Option<T> {
    let row = row?;
    match serde_json::from_value(row) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!("Dropping malformed {} feed row: {}", table, e);
            None
        }
    }
}
