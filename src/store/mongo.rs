use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::FindOptions;
use mongodb::{Collection, Database, IndexModel};
use tracing::instrument;

use super::{EventStore, Result, UpdateOutcome, EVENTS_COLLECTION};
use crate::models::event::{Event, EventChanges, PageRequest};

/// MongoDB-backed event store.
#[derive(Clone)]
pub struct MongoEventStore {
    database: Database,
    collection: Collection<Event>,
}

impl MongoEventStore {
    pub fn new(database: &Database) -> Self {
        Self {
            database: database.clone(),
            collection: database.collection(EVENTS_COLLECTION),
        }
    }

    /// Index backing the `latest` listing.
    pub async fn create_indexes(&self) -> Result<()> {
        let index = IndexModel::builder().keys(doc! { "schedule": -1 }).build();
        self.collection.create_index(index).await?;
        Ok(())
    }
}

#[async_trait]
impl EventStore for MongoEventStore {
    #[instrument(skip(self, event), fields(event_id = %event.id))]
    async fn insert(&self, event: &Event) -> Result<()> {
        self.collection.insert_one(event).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Event>> {
        let event = self.collection.find_one(doc! { "_id": *id }).await?;
        Ok(event)
    }

    #[instrument(skip(self))]
    async fn list_latest(&self, page: &PageRequest) -> Result<Vec<Event>> {
        let options = FindOptions::builder()
            .sort(doc! { "schedule": -1 })
            .skip(page.offset())
            .limit(page.limit as i64)
            .build();

        let cursor = self.collection.find(doc! {}).with_options(options).await?;
        let events: Vec<Event> = cursor.try_collect().await?;
        Ok(events)
    }

    #[instrument(skip(self, changes))]
    async fn update(&self, id: &ObjectId, changes: &EventChanges) -> Result<UpdateOutcome> {
        let result = self
            .collection
            .update_one(
                doc! { "_id": *id },
                doc! { "$set": changes.to_set_document() },
            )
            .await?;

        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &ObjectId) -> Result<u64> {
        let result = self.collection.delete_one(doc! { "_id": *id }).await?;
        Ok(result.deleted_count)
    }

    async fn ping(&self) -> Result<()> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}
