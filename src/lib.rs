//! # storage-backend
//!
//! Typed repositories over a document store, a compiler from declarative
//! search criteria to `$search` aggregation pipelines, and a versioned
//! migration runner.
//!
//! ## Feature Flags
//!
//! - `mongodb` (default): MongoDB store ([`mongodb::MongoBackend`])
//! - `migrations` (default): migration catalog and runner
//! - `integration-tests`: tests that start a MongoDB container
//!
//! ## Example
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use storage_backend::prelude::*;
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct Product {
//!     id: String,
//!     name: String,
//!     in_stock: bool,
//! }
//!
//! impl Record for Product {
//!     type Id = String;
//!     const COLLECTION_NAME: &'static str = "product";
//!
//!     fn id(&self) -> &String {
//!         &self.id
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> StorageResult<()> {
//! let store = MemoryStore::new();
//! let products = DocumentRepository::<Product>::new(&store);
//! products
//!     .insert_one(&Product { id: "p1".into(), name: "laptop".into(), in_stock: true })
//!     .await?;
//!
//! let criteria = SearchCriteria::new("product_search")
//!     .query("lap")
//!     .autocomplete_field("name")
//!     .boolean_field("in_stock")
//!     .limit(10);
//! let found = products.search(&criteria).await?;
//! assert_eq!(found.len(), 1);
//! # Ok(())
//! # }
//! ```

pub use storage_backend_core::{codec, compiler, criteria, error, memory, record, repository, store};
pub use storage_backend_core::{
	BulkWriteSummary, DocumentCollection, DocumentRepository, DocumentStore, FindOptions,
	IndexDefinition, Record, Repository, SearchCriteria, SearchIndexDefinition, StorageError,
	StorageResult, TimeSeriesOptions, UpdateResult, bson, compile,
};

#[cfg(feature = "mongodb")]
pub use storage_backend_mongodb as mongodb;

#[cfg(feature = "migrations")]
pub use storage_backend_migrations as migrations;

/// Common imports for application code
pub mod prelude {
	pub use storage_backend_core::memory::MemoryStore;
	pub use storage_backend_core::{
		DocumentRepository, DocumentStore, FindOptions, IndexDefinition, RangeOperator, Record,
		Repository, SearchCriteria, SearchIndexDefinition, SortDirection, StorageError,
		StorageResult,
	};

	#[cfg(feature = "migrations")]
	pub use storage_backend_migrations::{
		Migration, MigrationCatalog, MigrationRunner, migration_fn,
	};

	#[cfg(feature = "mongodb")]
	pub use storage_backend_mongodb::{MongoBackend, MongoConfig};
}
