//! MongoDB-backed lock store

use async_trait::async_trait;
use mongodb::bson::{Document, doc};
use mongodb::error::{Error, ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};
use tracing::info;

use deadbolt_core::{
    ExpireBound, ExpireStamp, InsertOutcome, LockRecord, LockStore, RecordFilter, Selector,
    StoreError,
};

/// Duplicate-key error code raised when an insert hits the unique index.
const DUPLICATE_KEY: i32 = 11000;

/// `LockStore` over a MongoDB collection.
///
/// Each capability maps onto one driver call: `findOneAndUpdate`,
/// `findOneAndDelete`, `insertOne`, `createIndexes`. All of them are atomic
/// per document on the server, which is everything the protocol requires.
pub struct MongoStore {
    collection: Collection<LockRecord>,
}

impl MongoStore {
    pub fn new(collection: Collection<LockRecord>) -> Self {
        Self { collection }
    }

    /// Convenience constructor over a named collection of `database`.
    pub fn with_database(database: &Database, collection_name: &str) -> Self {
        Self::new(database.collection(collection_name))
    }

    pub fn collection(&self) -> &Collection<LockRecord> {
        &self.collection
    }
}

/// Server-side rendering of a [`RecordFilter`].
fn filter_document(filter: &RecordFilter) -> Document {
    let mut document = Document::new();
    match &filter.selector {
        Selector::Name(name) => document.insert("name", name.as_str()),
        Selector::Code(code) => document.insert("code", code.as_str()),
    };
    match filter.expire {
        ExpireBound::Before(t) => document.insert("expire", doc! { "$lt": t }),
        ExpireBound::After(t) => document.insert("expire", doc! { "$gt": t }),
    };
    // Reclaimed records are inert; never match them again.
    document.insert("expired", doc! { "$exists": false });
    document
}

/// Server-side rendering of an [`ExpireStamp`].
fn stamp_document(stamp: &ExpireStamp) -> Document {
    doc! {
        "$set": {
            "name": stamp.renamed.as_str(),
            "expired": stamp.at,
        },
    }
}

fn is_duplicate_key(error: &Error) -> bool {
    match error.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY
        }
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY,
        _ => false,
    }
}

#[async_trait]
impl LockStore for MongoStore {
    async fn find_one_and_update(
        &self,
        filter: RecordFilter,
        stamp: ExpireStamp,
    ) -> Result<Option<LockRecord>, StoreError> {
        // Returns the pre-image: the default return-document mode is all
        // the protocol needs to tell "matched" from "nothing there".
        self.collection
            .find_one_and_update(filter_document(&filter), stamp_document(&stamp))
            .await
            .map_err(|error| StoreError::new("findOneAndUpdate", error))
    }

    async fn find_one_and_delete(
        &self,
        filter: RecordFilter,
    ) -> Result<Option<LockRecord>, StoreError> {
        self.collection
            .find_one_and_delete(filter_document(&filter))
            .await
            .map_err(|error| StoreError::new("findOneAndDelete", error))
    }

    async fn insert(&self, record: &LockRecord) -> Result<InsertOutcome, StoreError> {
        match self.collection.insert_one(record).await {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(error) if is_duplicate_key(&error) => Ok(InsertOutcome::DuplicateName),
            Err(error) => Err(StoreError::new("insertOne", error)),
        }
    }

    async fn ensure_name_index(&self) -> Result<(), StoreError> {
        let index = IndexModel::builder()
            .keys(doc! { "name": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection
            .create_index(index)
            .await
            .map_err(|error| StoreError::new("createIndexes", error))?;
        info!(collection = self.collection.name(), "unique name index ensured");
        Ok(())
    }
}
