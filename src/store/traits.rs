//! Store trait abstraction for pluggable database backends

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

/// A single table row as the store delivers it
pub type Row = Value;

/// Errors surfaced by the backing store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("no row with id {id} in table {table}")]
    RowNotFound { table: String, id: String },

    #[error("row is not a JSON object")]
    NotAnObject,

    #[error("row decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Kind of row change carried on a feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A row change pushed by the store, in the order the store applied it
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    /// Row state before the change, where the store knows it
    pub old: Option<Row>,
    /// Row state after the change; absent only for deletes
    pub new: Option<Row>,
}

/// Handle for tearing down one feed subscription.
///
/// After `close` returns, the store no longer holds a sender for the
/// subscription, so no further events can be observed on it.
#[async_trait]
pub trait FeedHandle: Send {
    async fn close(self: Box<Self>);
}

/// One live change-feed subscription: an ordered event stream plus the
/// handle that is the only way to end it.
pub struct ChangeFeed {
    pub events: mpsc::UnboundedReceiver<ChangeEvent>,
    pub handle: Box<dyn FeedHandle>,
}

/// The surface the console needs from the hosted fleet database
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Bulk read: the `limit` rows of `table` with the largest `order_by`
    /// values first (or smallest, when `descending` is false).
    async fn select(
        &self,
        table: &str,
        order_by: &str,
        descending: bool,
        limit: usize,
    ) -> Result<Vec<Row>, StoreError>;

    /// Patch the row whose `id` column matches, merging `patch` into it.
    /// The resulting state is announced on the table's change feed; the
    /// caller never mutates its local view directly.
    async fn update(&self, table: &str, id: &str, patch: Row) -> Result<(), StoreError>;

    /// Open a change feed for one table
    async fn subscribe(&self, table: &str) -> Result<ChangeFeed, StoreError>;
}
