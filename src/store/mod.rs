//! Persistence seam for events.

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use mongodb::error::ErrorKind;
use thiserror::Error;

use crate::models::event::{Event, EventChanges, PageRequest};

pub mod mongo;

pub use mongo::MongoEventStore;

pub const EVENTS_COLLECTION: &str = "events";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("MongoDB error: {0}")]
    Mongo(#[source] mongodb::error::Error),

    /// No server could be selected within the configured timeout.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        match *err.kind {
            ErrorKind::ServerSelection { .. } => StoreError::Unavailable(err.to_string()),
            _ => StoreError::Mongo(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}

/// Single-document operations over the events collection.
///
/// Every call is atomic on its own; callers that combine calls (read, then
/// write) get last-write-wins semantics.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn insert(&self, event: &Event) -> Result<()>;

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Event>>;

    /// Events ordered by `schedule` descending, one page at a time.
    async fn list_latest(&self, page: &PageRequest) -> Result<Vec<Event>>;

    async fn update(&self, id: &ObjectId, changes: &EventChanges) -> Result<UpdateOutcome>;

    /// Returns the number of removed documents (0 or 1).
    async fn delete(&self, id: &ObjectId) -> Result<u64>;

    async fn ping(&self) -> Result<()>;
}
