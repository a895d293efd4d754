//! In-process store with ordered change-feed fan-out
//!
//! Stands in for the hosted database during development and in tests,
//! the same way the edge stack substitutes TCP simulation for hardware
//! transports. Events are emitted to every open subscription in the
//! order mutations are applied.

use super::traits::{ChangeEvent, ChangeFeed, ChangeKind, FeedHandle, RemoteStore, Row, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

/// The fleet database tables the console knows about
pub const TABLES: &[&str] = &["drones", "telemetry", "alerts", "missions", "profiles"];

struct Table {
    rows: Vec<Row>,
    /// Open feed subscriptions by subscription id
    subscribers: HashMap<u64, mpsc::UnboundedSender<ChangeEvent>>,
}

impl Table {
    fn new() -> Self {
        Self {
            rows: Vec::new(),
            subscribers: HashMap::new(),
        }
    }

    /// Deliver an event to every open subscription, dropping any whose
    /// receiver side has gone away.
    fn emit(&mut self, event: ChangeEvent) {
        self.subscribers
            .retain(|_, tx| tx.send(event.clone()).is_ok());
    }
}

/// In-memory fleet database
pub struct MemoryStore {
    tables: Arc<RwLock<HashMap<String, Table>>>,
    next_subscription_id: AtomicU64,
}

impl MemoryStore {
    /// Create a store with the standard fleet tables, all empty
    pub fn new() -> Self {
        let mut tables = HashMap::new();
        for name in TABLES {
            tables.insert(name.to_string(), Table::new());
        }

        Self {
            tables: Arc::new(RwLock::new(tables)),
            next_subscription_id: AtomicU64::new(1),
        }
    }

    /// Insert a row, announcing it on the table's feed. Row creation is
    /// the server-side role; the console itself only reads and patches.
    pub async fn insert(&self, table: &str, row: Row) -> Result<(), StoreError> {
        if !row.is_object() {
            return Err(StoreError::NotAnObject);
        }

        let mut tables = self.tables.write().await;
        let entry = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;

        entry.rows.push(row.clone());
        entry.emit(ChangeEvent {
            kind: ChangeKind::Insert,
            old: None,
            new: Some(row),
        });

        Ok(())
    }

    /// Number of open subscriptions on a table
    pub async fn subscriber_count(&self, table: &str) -> usize {
        let tables = self.tables.read().await;
        tables.get(table).map(|t| t.subscribers.len()).unwrap_or(0)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Compare two rows by one column, for `select` ordering. Numbers compare
/// numerically, everything else by its string form.
fn compare_column(a: &Row, b: &Row, column: &str) -> Ordering {
    let av = a.get(column);
    let bv = b.get(column);

    match (av.and_then(Value::as_f64), bv.and_then(Value::as_f64)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => {
            let x = av.map(Value::to_string).unwrap_or_default();
            let y = bv.map(Value::to_string).unwrap_or_default();
            x.cmp(&y)
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn select(
        &self,
        table: &str,
        order_by: &str,
        descending: bool,
        limit: usize,
    ) -> Result<Vec<Row>, StoreError> {
        let tables = self.tables.read().await;
        let entry = tables
            .get(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;

        let mut rows = entry.rows.clone();
        rows.sort_by(|a, b| {
            let ord = compare_column(a, b, order_by);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        });
        rows.truncate(limit);

        Ok(rows)
    }

    async fn update(&self, table: &str, id: &str, patch: Row) -> Result<(), StoreError> {
        let patch = match patch {
            Value::Object(map) => map,
            _ => return Err(StoreError::NotAnObject),
        };

        let mut tables = self.tables.write().await;
        let entry = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;

        let row = entry
            .rows
            .iter_mut()
            .find(|r| r.get("id").and_then(Value::as_str) == Some(id))
            .ok_or_else(|| StoreError::RowNotFound {
                table: table.to_string(),
                id: id.to_string(),
            })?;

        let old = row.clone();
        if let Value::Object(target) = row {
            for (key, value) in patch {
                target.insert(key, value);
            }
        }
        let new = row.clone();

        entry.emit(ChangeEvent {
            kind: ChangeKind::Update,
            old: Some(old),
            new: Some(new),
        });

        Ok(())
    }

    async fn subscribe(&self, table: &str) -> Result<ChangeFeed, StoreError> {
        let mut tables = self.tables.write().await;
        let entry = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;

        let id = self
            .next_subscription_id
            .fetch_add(1, AtomicOrdering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();
        entry.subscribers.insert(id, tx);

        Ok(ChangeFeed {
            events: rx,
            handle: Box::new(MemoryFeedHandle {
                tables: self.tables.clone(),
                table: table.to_string(),
                id,
            }),
        })
    }
}

/// Handle for one MemoryStore subscription
struct MemoryFeedHandle {
    tables: Arc<RwLock<HashMap<String, Table>>>,
    table: String,
    id: u64,
}

#[async_trait]
impl FeedHandle for MemoryFeedHandle {
    async fn close(self: Box<Self>) {
        let mut tables = self.tables.write().await;
        if let Some(entry) = tables.get_mut(&self.table) {
            entry.subscribers.remove(&self.id);
        }
    }
}
