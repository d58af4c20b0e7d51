//! Collection adapter over the MongoDB driver

use std::sync::Arc;

use async_trait::async_trait;
use bson::Document;
use futures::TryStreamExt;
use mongodb::options::{IndexOptions, TimeseriesOptions};
use mongodb::options::{FindOptions as DriverFindOptions, ReplaceOneModel, WriteModel};
use mongodb::{Client, Collection, Database, IndexModel, SearchIndexModel};
use storage_backend_core::{
	BulkWriteSummary, DocumentCollection, FindOptions, IndexDefinition, SearchIndexDefinition,
	StorageResult, TimeSeriesOptions, UpdateResult, UpsertModel,
};

use crate::error::map_error;

/// [`DocumentCollection`] backed by a driver collection
///
/// Keeps the client alongside the collection because bulk upserts go
/// through the client-level bulk write command (MongoDB 8.0 or later).
#[derive(Clone)]
pub struct MongoCollection {
	client: Arc<Client>,
	database: Database,
	inner: Collection<Document>,
}

impl MongoCollection {
	pub(crate) fn new(client: Arc<Client>, database: Database, name: &str) -> Self {
		let inner = database.collection::<Document>(name);
		Self {
			client,
			database,
			inner,
		}
	}

	/// Underlying driver collection
	pub fn inner(&self) -> &Collection<Document> {
		&self.inner
	}
}

fn count<T: TryInto<u64>>(value: T) -> u64 {
	value.try_into().unwrap_or_default()
}

#[async_trait]
impl DocumentCollection for MongoCollection {
	fn name(&self) -> &str {
		self.inner.name()
	}

	async fn find_one(&self, filter: Document) -> StorageResult<Option<Document>> {
		self.inner.find_one(filter).await.map_err(map_error)
	}

	async fn find(&self, filter: Document, options: FindOptions) -> StorageResult<Vec<Document>> {
		let driver_options = DriverFindOptions::builder()
			.sort(options.sort)
			.limit(options.limit)
			.skip(options.skip)
			.build();
		let cursor = self
			.inner
			.find(filter)
			.with_options(driver_options)
			.await
			.map_err(map_error)?;
		cursor.try_collect().await.map_err(map_error)
	}

	async fn insert_one(&self, document: Document) -> StorageResult<()> {
		self.inner.insert_one(document).await.map_err(map_error)?;
		Ok(())
	}

	async fn insert_many(&self, documents: Vec<Document>) -> StorageResult<()> {
		self.inner.insert_many(documents).await.map_err(map_error)?;
		Ok(())
	}

	async fn update_one(&self, filter: Document, update: Document) -> StorageResult<UpdateResult> {
		let result = self
			.inner
			.update_one(filter, update)
			.await
			.map_err(map_error)?;
		Ok(UpdateResult::new(result.matched_count, result.modified_count))
	}

	async fn update_many(&self, filter: Document, update: Document) -> StorageResult<UpdateResult> {
		let result = self
			.inner
			.update_many(filter, update)
			.await
			.map_err(map_error)?;
		Ok(UpdateResult::new(result.matched_count, result.modified_count))
	}

	async fn delete_one(&self, filter: Document) -> StorageResult<u64> {
		let result = self.inner.delete_one(filter).await.map_err(map_error)?;
		Ok(result.deleted_count)
	}

	async fn delete_many(&self, filter: Document) -> StorageResult<u64> {
		let result = self.inner.delete_many(filter).await.map_err(map_error)?;
		Ok(result.deleted_count)
	}

	async fn count(&self, filter: Document) -> StorageResult<u64> {
		self.inner.count_documents(filter).await.map_err(map_error)
	}

	async fn bulk_upsert(&self, models: Vec<UpsertModel>) -> StorageResult<BulkWriteSummary> {
		let namespace = self.inner.namespace();
		let models: Vec<WriteModel> = models
			.into_iter()
			.map(|model| {
				WriteModel::ReplaceOne(
					ReplaceOneModel::builder()
						.namespace(namespace.clone())
						.filter(model.filter)
						.replacement(model.replacement)
						.upsert(true)
						.build(),
				)
			})
			.collect();

		let result = self.client.bulk_write(models).await.map_err(map_error)?;
		Ok(BulkWriteSummary {
			matched_count: count(result.matched_count),
			modified_count: count(result.modified_count),
			upserted_count: count(result.upserted_count),
		})
	}

	async fn aggregate(&self, pipeline: Vec<Document>) -> StorageResult<Vec<Document>> {
		let cursor = self.inner.aggregate(pipeline).await.map_err(map_error)?;
		cursor.try_collect().await.map_err(map_error)
	}

	async fn create_indexes(&self, indexes: Vec<IndexDefinition>) -> StorageResult<Vec<String>> {
		let models = indexes.into_iter().map(|index| {
			let options = IndexOptions::builder()
				.name(index.name)
				.unique(index.unique.then_some(true))
				.build();
			IndexModel::builder().keys(index.keys).options(Some(options)).build()
		});
		let result = self.inner.create_indexes(models).await.map_err(map_error)?;
		Ok(result.index_names)
	}

	async fn create_search_indexes(
		&self,
		indexes: Vec<SearchIndexDefinition>,
	) -> StorageResult<Vec<String>> {
		let models = indexes.into_iter().map(|index| {
			SearchIndexModel::builder()
				.definition(index.definition)
				.name(index.name)
				.build()
		});
		self.inner
			.create_search_indexes(models)
			.await
			.map_err(map_error)
	}

	async fn create_time_series(&self, options: TimeSeriesOptions) -> StorageResult<()> {
		let timeseries = TimeseriesOptions::builder()
			.time_field(options.time_field)
			.meta_field(options.meta_field)
			.bucket_max_span(options.bucket_span)
			.bucket_rounding(options.bucket_span)
			.build();
		self.database
			.create_collection(self.inner.name())
			.timeseries(timeseries)
			.await
			.map_err(map_error)?;
		tracing::info!(collection = self.inner.name(), "Created time-series collection");
		Ok(())
	}
}
