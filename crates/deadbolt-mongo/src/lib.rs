//! Deadbolt Mongo - MongoDB store adapter
//!
//! Maps the `LockStore` capability set onto one MongoDB collection:
//! reclamation and release ride `findOneAndUpdate` / `findOneAndDelete`,
//! acquisition rides `insertOne` against a unique index on `name`, with
//! server error 11000 classified as contention rather than failure.
//!
//! ```no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use deadbolt_core::Lock;
//! use deadbolt_mongo::MongoStore;
//!
//! let client = mongodb::Client::with_uri_str("mongodb://localhost:27017").await?;
//! let store = Arc::new(MongoStore::with_database(&client.database("app"), "locks"));
//!
//! let lock = Lock::with_defaults(store, "nightly-report")?;
//! lock.ensure_indexes().await?;
//! if let Some(code) = lock.acquire().await? {
//!     // ... exclusive work ...
//!     lock.release(&code).await?;
//! }
//! # Ok(())
//! # }
//! ```

mod store;

pub use store::MongoStore;
