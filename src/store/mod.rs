//! Backing store access for the fleet database
//!
//! This module handles:
//! - The `RemoteStore` trait the console depends on (bulk read, row
//!   patch, change feed)
//! - An in-process `MemoryStore` used for development and tests

mod memory;
mod traits;

pub use memory::MemoryStore;
pub use traits::{
    ChangeEvent, ChangeFeed, ChangeKind, FeedHandle, RemoteStore, Row, StoreError,
};
