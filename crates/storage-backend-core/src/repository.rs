//! Generic repository
//!
//! [`DocumentRepository`] binds one [`Record`] type to its collection and
//! exposes CRUD, bulk, aggregation and search operations. Search requests
//! are compiled by [`crate::compiler::compile`] and executed as an
//! aggregation pipeline.
//!
//! # Example
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use storage_backend_core::memory::MemoryStore;
//! use storage_backend_core::{DocumentRepository, Record, Repository};
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct User {
//!     id: String,
//!     name: String,
//! }
//!
//! impl Record for User {
//!     type Id = String;
//!     const COLLECTION_NAME: &'static str = "user";
//!
//!     fn id(&self) -> &String {
//!         &self.id
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> storage_backend_core::StorageResult<()> {
//! let store = MemoryStore::new();
//! let users = DocumentRepository::<User>::new(&store);
//!
//! users.insert_one(&User { id: "1".into(), name: "ak".into() }).await?;
//! let user = users.find_by_id(&"1".to_string()).await?;
//! assert_eq!(user.name, "ak");
//! # Ok(())
//! # }
//! ```

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bson::{Bson, Document, doc};
use serde::de::DeserializeOwned;

use crate::compiler::compile;
use crate::criteria::SearchCriteria;
use crate::error::{StorageError, StorageResult};
use crate::record::{Record, id_to_bson};
use crate::store::{
	BulkWriteSummary, DocumentCollection, DocumentStore, FindOptions, IndexDefinition,
	SearchIndexDefinition, TimeSeriesOptions, UpdateResult, UpsertModel,
};

/// Data-access contract for one record type
///
/// Store failures are surfaced unchanged. The only outcome distinguished
/// locally is [`StorageError::NotFound`] on single-document reads.
#[async_trait]
pub trait Repository<M: Record>: Send + Sync {
	/// Looks up a single record by identity
	async fn find_by_id(&self, id: &M::Id) -> StorageResult<M>;

	/// Filtered, sorted, paged scan
	async fn find(&self, filter: Document, options: FindOptions) -> StorageResult<Vec<M>>;

	/// Inserts one record; an existing identity yields [`StorageError::DuplicateKey`]
	async fn insert_one(&self, record: &M) -> StorageResult<()>;

	/// Inserts several records in one request
	async fn insert_many(&self, records: &[M]) -> StorageResult<()>;

	/// Sets every field of `record` on the document with the same identity.
	///
	/// Matching no document is not an error; inspect
	/// [`UpdateResult::matched_count`] to detect it.
	async fn update_one(&self, record: &M) -> StorageResult<UpdateResult>;

	/// Applies the same `$set` to every document whose identity is in `ids`.
	///
	/// An empty `ids` slice is rejected with [`StorageError::InvalidRequest`].
	async fn update_many(&self, ids: &[M::Id], set: Document) -> StorageResult<UpdateResult>;

	/// Deletes the record with the given identity
	async fn delete_by_id(&self, id: &M::Id) -> StorageResult<u64>;

	/// Deletes every record whose identity is in `ids`.
	///
	/// An empty `ids` slice deletes **every** document in the collection.
	async fn delete_many(&self, ids: &[M::Id]) -> StorageResult<u64>;

	/// Upserts each record by identity in a single batch
	async fn bulk_write(&self, records: &[M]) -> StorageResult<BulkWriteSummary>;

	/// Executes an arbitrary pipeline and decodes every result
	async fn aggregate<T>(&self, pipeline: Vec<Document>) -> StorageResult<Vec<T>>
	where
		T: DeserializeOwned + Send + 'static;

	/// Compiles the criteria and executes the resulting pipeline
	async fn search(&self, criteria: &SearchCriteria) -> StorageResult<Vec<M>>;

	/// Total number of documents in the collection
	async fn count(&self) -> StorageResult<u64>;

	/// Creates regular indexes on the collection
	async fn create_indexes(&self, indexes: Vec<IndexDefinition>) -> StorageResult<Vec<String>>;

	/// Creates full-text search indexes on the collection
	async fn create_search_indexes(
		&self,
		indexes: Vec<SearchIndexDefinition>,
	) -> StorageResult<Vec<String>>;

	/// Creates the collection as a time-series collection
	async fn create_time_series_collection(
		&self,
		time_field: &str,
		meta_field: &str,
		bucket_span: Duration,
	) -> StorageResult<()>;
}

/// [`Repository`] implementation over a [`DocumentCollection`]
pub struct DocumentRepository<M: Record> {
	collection: Arc<dyn DocumentCollection>,
	_record: PhantomData<fn() -> M>,
}

impl<M: Record> Clone for DocumentRepository<M> {
	fn clone(&self) -> Self {
		Self {
			collection: Arc::clone(&self.collection),
			_record: PhantomData,
		}
	}
}

impl<M: Record> DocumentRepository<M> {
	/// Bind a repository to `M::COLLECTION_NAME` in the given store
	pub fn new(store: &dyn DocumentStore) -> Self {
		Self::with_collection(store.collection(M::COLLECTION_NAME))
	}

	/// Bind a repository to an explicit collection handle
	pub fn with_collection(collection: Arc<dyn DocumentCollection>) -> Self {
		Self {
			collection,
			_record: PhantomData,
		}
	}

	/// The bound collection
	pub fn collection(&self) -> &Arc<dyn DocumentCollection> {
		&self.collection
	}

	fn id_filter(id: &M::Id) -> StorageResult<Document> {
		let mut filter = Document::new();
		filter.insert(M::ID_FIELD, id_to_bson::<M>(id)?);
		Ok(filter)
	}

	fn ids_filter(ids: &[M::Id]) -> StorageResult<Document> {
		let values = ids
			.iter()
			.map(id_to_bson::<M>)
			.collect::<StorageResult<Vec<Bson>>>()?;
		let mut filter = Document::new();
		filter.insert(M::ID_FIELD, doc! { "$in": values });
		Ok(filter)
	}

	fn encode(record: &M) -> StorageResult<Document> {
		Ok(bson::serialize_to_document(record)?)
	}

	fn decode_all<T: DeserializeOwned>(documents: Vec<Document>) -> StorageResult<Vec<T>> {
		documents
			.into_iter()
			.map(|document| bson::deserialize_from_document(document).map_err(StorageError::from))
			.collect()
	}
}

#[async_trait]
impl<M: Record> Repository<M> for DocumentRepository<M> {
	async fn find_by_id(&self, id: &M::Id) -> StorageResult<M> {
		let filter = Self::id_filter(id)?;
		match self.collection.find_one(filter).await? {
			Some(document) => Ok(bson::deserialize_from_document(document)?),
			None => Err(StorageError::NotFound),
		}
	}

	async fn find(&self, filter: Document, options: FindOptions) -> StorageResult<Vec<M>> {
		let documents = self.collection.find(filter, options).await?;
		Self::decode_all(documents)
	}

	async fn insert_one(&self, record: &M) -> StorageResult<()> {
		tracing::debug!(collection = M::COLLECTION_NAME, id = ?record.id(), "Inserting record");
		let document = Self::encode(record)?;
		self.collection.insert_one(document).await
	}

	async fn insert_many(&self, records: &[M]) -> StorageResult<()> {
		if records.is_empty() {
			return Ok(());
		}
		let documents = records
			.iter()
			.map(Self::encode)
			.collect::<StorageResult<Vec<_>>>()?;
		tracing::debug!(collection = M::COLLECTION_NAME, count = documents.len(), "Inserting records");
		self.collection.insert_many(documents).await
	}

	async fn update_one(&self, record: &M) -> StorageResult<UpdateResult> {
		let filter = Self::id_filter(record.id())?;
		let update = doc! { "$set": Self::encode(record)? };
		let result = self.collection.update_one(filter, update).await?;
		if result.matched_count == 0 {
			tracing::debug!(collection = M::COLLECTION_NAME, id = ?record.id(), "Update matched no document");
		}
		Ok(result)
	}

	async fn update_many(&self, ids: &[M::Id], set: Document) -> StorageResult<UpdateResult> {
		if ids.is_empty() {
			return Err(StorageError::InvalidRequest(format!(
				"update_many on '{}' requires at least one id",
				M::COLLECTION_NAME
			)));
		}
		let filter = Self::ids_filter(ids)?;
		let update = doc! { "$set": set };
		self.collection.update_many(filter, update).await
	}

	async fn delete_by_id(&self, id: &M::Id) -> StorageResult<u64> {
		let filter = Self::id_filter(id)?;
		self.collection.delete_one(filter).await
	}

	async fn delete_many(&self, ids: &[M::Id]) -> StorageResult<u64> {
		let filter = if ids.is_empty() {
			tracing::debug!(collection = M::COLLECTION_NAME, "Deleting every document");
			Document::new()
		} else {
			Self::ids_filter(ids)?
		};
		self.collection.delete_many(filter).await
	}

	async fn bulk_write(&self, records: &[M]) -> StorageResult<BulkWriteSummary> {
		if records.is_empty() {
			return Ok(BulkWriteSummary::default());
		}
		let models = records
			.iter()
			.map(|record| -> StorageResult<UpsertModel> {
				Ok(UpsertModel {
					filter: Self::id_filter(record.id())?,
					replacement: Self::encode(record)?,
				})
			})
			.collect::<StorageResult<Vec<_>>>()?;
		tracing::debug!(collection = M::COLLECTION_NAME, count = models.len(), "Submitting bulk upsert");
		self.collection.bulk_upsert(models).await
	}

	async fn aggregate<T>(&self, pipeline: Vec<Document>) -> StorageResult<Vec<T>>
	where
		T: DeserializeOwned + Send + 'static,
	{
		let documents = self.collection.aggregate(pipeline).await?;
		Self::decode_all(documents)
	}

	async fn search(&self, criteria: &SearchCriteria) -> StorageResult<Vec<M>> {
		let pipeline = compile(criteria);
		self.aggregate(pipeline).await
	}

	async fn count(&self) -> StorageResult<u64> {
		self.collection.count(Document::new()).await
	}

	async fn create_indexes(&self, indexes: Vec<IndexDefinition>) -> StorageResult<Vec<String>> {
		self.collection.create_indexes(indexes).await
	}

	async fn create_search_indexes(
		&self,
		indexes: Vec<SearchIndexDefinition>,
	) -> StorageResult<Vec<String>> {
		self.collection.create_search_indexes(indexes).await
	}

	async fn create_time_series_collection(
		&self,
		time_field: &str,
		meta_field: &str,
		bucket_span: Duration,
	) -> StorageResult<()> {
		let options = TimeSeriesOptions {
			time_field: time_field.to_string(),
			meta_field: (!meta_field.is_empty()).then(|| meta_field.to_string()),
			bucket_span: Some(bucket_span),
		};
		self.collection.create_time_series(options).await
	}
}
