//! In-memory document store
//!
//! [`MemoryStore`] implements the store capability traits without a
//! database. It understands the subset of the query language the
//! repository emits:
//!
//! - filters: field equality, `$eq`, `$ne` and `$in`, AND-ed across keys
//! - updates: `$set`
//! - aggregation stages: `$match`, `$sort`, `$skip`, `$limit`
//!
//! `$search` stages cannot be evaluated without a search engine and are
//! passed through unchanged; the last pipeline run on each collection is
//! kept for inspection. The identity field is unique per collection.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bson::{Bson, Document};
use parking_lot::RwLock;

use crate::error::{StorageError, StorageResult};
use crate::store::{
	BulkWriteSummary, DocumentCollection, DocumentStore, FindOptions, IndexDefinition,
	SearchIndexDefinition, TimeSeriesOptions, UpdateResult, UpsertModel,
};

/// In-memory [`DocumentStore`]
pub struct MemoryStore {
	id_field: String,
	collections: RwLock<HashMap<String, Arc<MemoryCollection>>>,
}

impl MemoryStore {
	/// Store whose collections treat `id` as the unique identity field
	pub fn new() -> Self {
		Self::with_id_field("id")
	}

	/// Store whose collections treat `id_field` as the unique identity field
	pub fn with_id_field(id_field: impl Into<String>) -> Self {
		Self {
			id_field: id_field.into(),
			collections: RwLock::new(HashMap::new()),
		}
	}

	/// Concrete handle on a collection, created on first use
	pub fn collection_handle(&self, name: &str) -> Arc<MemoryCollection> {
		if let Some(collection) = self.collections.read().get(name) {
			return Arc::clone(collection);
		}
		let mut collections = self.collections.write();
		let collection = collections
			.entry(name.to_string())
			.or_insert_with(|| Arc::new(MemoryCollection::new(name, &self.id_field)));
		Arc::clone(collection)
	}

	/// Last aggregation pipeline executed on a collection
	pub fn last_pipeline(&self, name: &str) -> Option<Vec<Document>> {
		self.collection_handle(name).state.read().last_pipeline.clone()
	}

	/// Time-series layout requested for a collection
	pub fn time_series_options(&self, name: &str) -> Option<TimeSeriesOptions> {
		self.collection_handle(name).state.read().time_series.clone()
	}

	/// Search indexes created on a collection
	pub fn search_indexes(&self, name: &str) -> Vec<SearchIndexDefinition> {
		self.collection_handle(name).state.read().search_indexes.clone()
	}

	/// Snapshot of the documents in a collection, in insertion order
	pub fn documents(&self, name: &str) -> Vec<Document> {
		self.collection_handle(name).state.read().documents.clone()
	}
}

impl Default for MemoryStore {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl DocumentStore for MemoryStore {
	fn collection(&self, name: &str) -> Arc<dyn DocumentCollection> {
		self.collection_handle(name)
	}

	async fn health_check(&self) -> StorageResult<()> {
		Ok(())
	}
}

#[derive(Default)]
struct CollectionState {
	documents: Vec<Document>,
	indexes: Vec<IndexDefinition>,
	search_indexes: Vec<SearchIndexDefinition>,
	time_series: Option<TimeSeriesOptions>,
	last_pipeline: Option<Vec<Document>>,
}

/// In-memory [`DocumentCollection`]
pub struct MemoryCollection {
	name: String,
	id_field: String,
	state: RwLock<CollectionState>,
}

impl MemoryCollection {
	fn new(name: &str, id_field: &str) -> Self {
		Self {
			name: name.to_string(),
			id_field: id_field.to_string(),
			state: RwLock::new(CollectionState::default()),
		}
	}

	/// Number of stored documents
	pub fn len(&self) -> usize {
		self.state.read().documents.len()
	}

	/// Whether the collection is empty
	pub fn is_empty(&self) -> bool {
		self.state.read().documents.is_empty()
	}

	fn check_unique(&self, documents: &[Document], candidate: &Document) -> StorageResult<()> {
		let Some(id) = candidate.get(&self.id_field) else {
			return Ok(());
		};
		if documents
			.iter()
			.any(|existing| existing.get(&self.id_field) == Some(id))
		{
			return Err(StorageError::DuplicateKey(format!(
				"{}.{} = {}",
				self.name, self.id_field, id
			)));
		}
		Ok(())
	}
}

#[async_trait]
impl DocumentCollection for MemoryCollection {
	fn name(&self) -> &str {
		&self.name
	}

	async fn find_one(&self, filter: Document) -> StorageResult<Option<Document>> {
		let state = self.state.read();
		for document in &state.documents {
			if matches_filter(document, &filter)? {
				return Ok(Some(document.clone()));
			}
		}
		Ok(None)
	}

	async fn find(&self, filter: Document, options: FindOptions) -> StorageResult<Vec<Document>> {
		let mut documents = {
			let state = self.state.read();
			select(&state.documents, &filter)?
		};
		if let Some(sort) = &options.sort {
			sort_documents(&mut documents, sort)?;
		}
		let skip = options.skip.map_or(0, |skip| skip as usize);
		let limit = options.limit.map_or(usize::MAX, |limit| limit as usize);
		Ok(documents.into_iter().skip(skip).take(limit).collect())
	}

	async fn insert_one(&self, document: Document) -> StorageResult<()> {
		let mut state = self.state.write();
		self.check_unique(&state.documents, &document)?;
		state.documents.push(document);
		Ok(())
	}

	async fn insert_many(&self, documents: Vec<Document>) -> StorageResult<()> {
		// Ordered insert: documents before the first failure stay inserted.
		let mut state = self.state.write();
		for document in documents {
			self.check_unique(&state.documents, &document)?;
			state.documents.push(document);
		}
		Ok(())
	}

	async fn update_one(&self, filter: Document, update: Document) -> StorageResult<UpdateResult> {
		let set = set_fields(&update)?;
		let mut state = self.state.write();
		for document in state.documents.iter_mut() {
			if matches_filter(document, &filter)? {
				let modified = apply_set(document, set);
				return Ok(UpdateResult::new(1, u64::from(modified)));
			}
		}
		Ok(UpdateResult::default())
	}

	async fn update_many(&self, filter: Document, update: Document) -> StorageResult<UpdateResult> {
		let set = set_fields(&update)?;
		let mut state = self.state.write();
		let mut result = UpdateResult::default();
		for document in state.documents.iter_mut() {
			if matches_filter(document, &filter)? {
				result.matched_count += 1;
				if apply_set(document, set) {
					result.modified_count += 1;
				}
			}
		}
		Ok(result)
	}

	async fn delete_one(&self, filter: Document) -> StorageResult<u64> {
		let mut state = self.state.write();
		let mut position = None;
		for (index, document) in state.documents.iter().enumerate() {
			if matches_filter(document, &filter)? {
				position = Some(index);
				break;
			}
		}
		Ok(match position {
			Some(index) => {
				state.documents.remove(index);
				1
			}
			None => 0,
		})
	}

	async fn delete_many(&self, filter: Document) -> StorageResult<u64> {
		let mut state = self.state.write();
		let mut kept = Vec::with_capacity(state.documents.len());
		let mut deleted = 0;
		for document in state.documents.drain(..) {
			if matches_filter(&document, &filter)? {
				deleted += 1;
			} else {
				kept.push(document);
			}
		}
		state.documents = kept;
		Ok(deleted)
	}

	async fn count(&self, filter: Document) -> StorageResult<u64> {
		let state = self.state.read();
		Ok(select(&state.documents, &filter)?.len() as u64)
	}

	async fn bulk_upsert(&self, models: Vec<UpsertModel>) -> StorageResult<BulkWriteSummary> {
		let mut state = self.state.write();
		let mut summary = BulkWriteSummary::default();
		for model in models {
			let mut position = None;
			for (index, document) in state.documents.iter().enumerate() {
				if matches_filter(document, &model.filter)? {
					position = Some(index);
					break;
				}
			}
			match position {
				Some(index) => {
					summary.matched_count += 1;
					if state.documents[index] != model.replacement {
						summary.modified_count += 1;
					}
					state.documents[index] = model.replacement;
				}
				None => {
					self.check_unique(&state.documents, &model.replacement)?;
					state.documents.push(model.replacement);
					summary.upserted_count += 1;
				}
			}
		}
		Ok(summary)
	}

	async fn aggregate(&self, pipeline: Vec<Document>) -> StorageResult<Vec<Document>> {
		let mut documents = {
			let mut state = self.state.write();
			state.last_pipeline = Some(pipeline.clone());
			state.documents.clone()
		};

		for stage in &pipeline {
			let Some((operator, argument)) = stage.iter().next() else {
				return Err(StorageError::Store("empty pipeline stage".to_string()));
			};
			match (operator.as_str(), argument) {
				("$search", _) => {}
				("$match", Bson::Document(filter)) => documents = select(&documents, filter)?,
				("$sort", Bson::Document(sort)) => sort_documents(&mut documents, sort)?,
				("$skip", value) => {
					let skip = as_count(value, "$skip")?;
					documents = documents.into_iter().skip(skip).collect();
				}
				("$limit", value) => documents.truncate(as_count(value, "$limit")?),
				(other, _) => {
					return Err(StorageError::Store(format!(
						"unsupported pipeline stage '{other}'"
					)));
				}
			}
		}
		Ok(documents)
	}

	async fn create_indexes(&self, indexes: Vec<IndexDefinition>) -> StorageResult<Vec<String>> {
		let names = indexes.iter().map(index_name).collect();
		self.state.write().indexes.extend(indexes);
		Ok(names)
	}

	async fn create_search_indexes(
		&self,
		indexes: Vec<SearchIndexDefinition>,
	) -> StorageResult<Vec<String>> {
		let names = indexes.iter().map(|index| index.name.clone()).collect();
		self.state.write().search_indexes.extend(indexes);
		Ok(names)
	}

	async fn create_time_series(&self, options: TimeSeriesOptions) -> StorageResult<()> {
		let mut state = self.state.write();
		if state.time_series.is_some() || !state.documents.is_empty() {
			return Err(StorageError::Store(format!(
				"collection '{}' already exists",
				self.name
			)));
		}
		state.time_series = Some(options);
		Ok(())
	}
}

fn select(documents: &[Document], filter: &Document) -> StorageResult<Vec<Document>> {
	let mut selected = Vec::new();
	for document in documents {
		if matches_filter(document, filter)? {
			selected.push(document.clone());
		}
	}
	Ok(selected)
}

fn matches_filter(document: &Document, filter: &Document) -> StorageResult<bool> {
	for (field, condition) in filter {
		let value = document.get(field);
		let matched = match condition {
			Bson::Document(operators) if is_operator_document(operators) => {
				matches_operators(value, operators)?
			}
			expected => value == Some(expected),
		};
		if !matched {
			return Ok(false);
		}
	}
	Ok(true)
}

fn is_operator_document(document: &Document) -> bool {
	document.keys().next().is_some_and(|key| key.starts_with('$'))
}

fn matches_operators(value: Option<&Bson>, operators: &Document) -> StorageResult<bool> {
	for (operator, operand) in operators {
		let matched = match operator.as_str() {
			"$eq" => value == Some(operand),
			"$ne" => value != Some(operand),
			"$in" => {
				let Bson::Array(candidates) = operand else {
					return Err(StorageError::Store("$in needs an array".to_string()));
				};
				value.is_some_and(|value| candidates.contains(value))
			}
			other => {
				return Err(StorageError::Store(format!(
					"unsupported filter operator '{other}'"
				)));
			}
		};
		if !matched {
			return Ok(false);
		}
	}
	Ok(true)
}

fn set_fields(update: &Document) -> StorageResult<&Document> {
	match update.get("$set") {
		Some(Bson::Document(set)) if update.len() == 1 => Ok(set),
		_ => Err(StorageError::Store(
			"only $set updates are supported".to_string(),
		)),
	}
}

fn apply_set(document: &mut Document, set: &Document) -> bool {
	let mut modified = false;
	for (field, value) in set {
		if document.get(field) != Some(value) {
			document.insert(field.clone(), value.clone());
			modified = true;
		}
	}
	modified
}

fn sort_documents(documents: &mut [Document], sort: &Document) -> StorageResult<()> {
	let mut keys = Vec::with_capacity(sort.len());
	for (field, direction) in sort {
		let descending = match as_number(direction) {
			Some(value) if value < 0.0 => true,
			Some(_) => false,
			None => {
				return Err(StorageError::Store(format!(
					"invalid sort direction for '{field}'"
				)));
			}
		};
		keys.push((field.as_str(), descending));
	}
	documents.sort_by(|a, b| {
		for (field, descending) in &keys {
			let ordering = compare_values(a.get(*field), b.get(*field));
			let ordering = if *descending { ordering.reverse() } else { ordering };
			if ordering != Ordering::Equal {
				return ordering;
			}
		}
		Ordering::Equal
	});
	Ok(())
}

// Missing values sort first; values of different kinds compare equal.
fn compare_values(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
	match (a, b) {
		(None, None) => Ordering::Equal,
		(None, Some(_)) => Ordering::Less,
		(Some(_), None) => Ordering::Greater,
		(Some(a), Some(b)) => match (as_number(a), as_number(b)) {
			(Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
			_ => match (a, b) {
				(Bson::String(x), Bson::String(y)) => x.cmp(y),
				(Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
				(Bson::DateTime(x), Bson::DateTime(y)) => x.cmp(y),
				_ => Ordering::Equal,
			},
		},
	}
}

fn as_number(value: &Bson) -> Option<f64> {
	match value {
		Bson::Int32(v) => Some(f64::from(*v)),
		Bson::Int64(v) => Some(*v as f64),
		Bson::Double(v) => Some(*v),
		_ => None,
	}
}

fn as_count(value: &Bson, stage: &str) -> StorageResult<usize> {
	let count = match value {
		Bson::Int32(v) => i64::from(*v),
		Bson::Int64(v) => *v,
		_ => -1,
	};
	usize::try_from(count)
		.map_err(|_| StorageError::Store(format!("{stage} needs a non-negative integer")))
}

fn index_name(index: &IndexDefinition) -> String {
	index.name.clone().unwrap_or_else(|| {
		index
			.keys
			.iter()
			.map(|(field, direction)| format!("{field}_{direction}"))
			.collect::<Vec<_>>()
			.join("_")
	})
}
