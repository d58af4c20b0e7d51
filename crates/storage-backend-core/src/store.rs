//! Document store capability traits
//!
//! The repository consumes the underlying database only through
//! [`DocumentStore`] and [`DocumentCollection`]. Implementations exist for
//! MongoDB (`storage-backend-mongodb`) and for an in-memory store
//! ([`crate::memory::MemoryStore`]).
//!
//! Every operation is an `async fn`. Dropping the returned future cancels the
//! operation; deadlines are imposed by the caller, e.g. with
//! `tokio::time::timeout`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bson::Document;

use crate::error::StorageResult;

/// Options for [`DocumentCollection::find`]
///
/// # Example
///
/// ```rust
/// use bson::doc;
/// use storage_backend_core::store::FindOptions;
///
/// let options = FindOptions::new().sort(doc! { "created_at": -1 }).limit(10).skip(0);
/// assert_eq!(options.limit, Some(10));
/// assert_eq!(options.skip, None);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
	pub sort: Option<Document>,
	pub limit: Option<i64>,
	pub skip: Option<u64>,
}

impl FindOptions {
	/// Unsorted, unbounded scan
	pub fn new() -> Self {
		Self::default()
	}

	/// Sort by the given document; an empty document leaves the order unspecified
	pub fn sort(mut self, sort: Document) -> Self {
		self.sort = if sort.is_empty() { None } else { Some(sort) };
		self
	}

	/// Limit the result count; zero or negative means unbounded
	pub fn limit(mut self, limit: i64) -> Self {
		self.limit = (limit > 0).then_some(limit);
		self
	}

	/// Skip leading results; zero or negative means no skip
	pub fn skip(mut self, skip: i64) -> Self {
		self.skip = u64::try_from(skip).ok().filter(|skip| *skip > 0);
		self
	}
}

/// Result of an update operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
	pub matched_count: u64,
	pub modified_count: u64,
}

impl UpdateResult {
	pub fn new(matched_count: u64, modified_count: u64) -> Self {
		Self {
			matched_count,
			modified_count,
		}
	}
}

/// Single upsert in a bulk batch: replace the document matching `filter`,
/// inserting `replacement` when nothing matches
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertModel {
	pub filter: Document,
	pub replacement: Document,
}

/// Counts reported by a bulk write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkWriteSummary {
	pub matched_count: u64,
	pub modified_count: u64,
	pub upserted_count: u64,
}

/// Regular index definition
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDefinition {
	pub keys: Document,
	pub name: Option<String>,
	pub unique: bool,
}

impl IndexDefinition {
	pub fn new(keys: Document) -> Self {
		Self {
			keys,
			name: None,
			unique: false,
		}
	}

	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn unique(mut self, unique: bool) -> Self {
		self.unique = unique;
		self
	}
}

/// Full-text search index definition
#[derive(Debug, Clone, PartialEq)]
pub struct SearchIndexDefinition {
	pub name: String,
	pub definition: Document,
}

impl SearchIndexDefinition {
	pub fn new(name: impl Into<String>, definition: Document) -> Self {
		Self {
			name: name.into(),
			definition,
		}
	}
}

/// Time-series collection layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSeriesOptions {
	pub time_field: String,
	pub meta_field: Option<String>,
	/// Used as both the maximum bucket span and the bucket rounding
	pub bucket_span: Option<Duration>,
}

/// Handle on one collection of the store
#[async_trait]
pub trait DocumentCollection: Send + Sync {
	/// Collection name
	fn name(&self) -> &str;

	/// Finds a single document matching the filter
	async fn find_one(&self, filter: Document) -> StorageResult<Option<Document>>;

	/// Finds documents matching the filter
	async fn find(&self, filter: Document, options: FindOptions) -> StorageResult<Vec<Document>>;

	/// Inserts a single document
	async fn insert_one(&self, document: Document) -> StorageResult<()>;

	/// Inserts several documents; partial application is whatever the store guarantees
	async fn insert_many(&self, documents: Vec<Document>) -> StorageResult<()>;

	/// Applies `update` to the first document matching `filter`
	async fn update_one(&self, filter: Document, update: Document) -> StorageResult<UpdateResult>;

	/// Applies `update` to every document matching `filter`
	async fn update_many(&self, filter: Document, update: Document) -> StorageResult<UpdateResult>;

	/// Deletes the first document matching `filter`, returning the deleted count
	async fn delete_one(&self, filter: Document) -> StorageResult<u64>;

	/// Deletes every document matching `filter`, returning the deleted count
	async fn delete_many(&self, filter: Document) -> StorageResult<u64>;

	/// Counts documents matching `filter`
	async fn count(&self, filter: Document) -> StorageResult<u64>;

	/// Submits a batch of upserts as one request
	async fn bulk_upsert(&self, models: Vec<UpsertModel>) -> StorageResult<BulkWriteSummary>;

	/// Executes an aggregation pipeline
	async fn aggregate(&self, pipeline: Vec<Document>) -> StorageResult<Vec<Document>>;

	/// Creates regular indexes, returning their names
	async fn create_indexes(&self, indexes: Vec<IndexDefinition>) -> StorageResult<Vec<String>>;

	/// Creates full-text search indexes, returning their names
	async fn create_search_indexes(
		&self,
		indexes: Vec<SearchIndexDefinition>,
	) -> StorageResult<Vec<String>>;

	/// Creates this collection as a time-series collection
	async fn create_time_series(&self, options: TimeSeriesOptions) -> StorageResult<()>;
}

/// Connected database handing out collection handles
#[async_trait]
pub trait DocumentStore: Send + Sync {
	/// Handle on the named collection
	fn collection(&self, name: &str) -> Arc<dyn DocumentCollection>;

	/// Verifies connectivity
	async fn health_check(&self) -> StorageResult<()>;
}
