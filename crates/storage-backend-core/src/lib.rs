//! # storage-backend-core
//!
//! Store-agnostic half of the storage layer.
//!
//! ## Modules
//!
//! - [`record`]: capability set a storable entity must satisfy
//! - [`criteria`] / [`compiler`]: declarative search requests and their
//!   translation into a `$search` aggregation pipeline
//! - [`store`]: capability traits a document database must provide
//! - [`repository`]: generic CRUD, bulk, aggregation and search operations
//! - [`codec`]: serde adapters for exact decimal fields
//! - [`memory`]: in-memory store used by tests and local tooling
//!
//! ## Quick start
//!
//! ```rust
//! use storage_backend_core::{SearchCriteria, compile};
//!
//! let pipeline = compile(&SearchCriteria::new("users").query("al").autocomplete_field("name"));
//! assert_eq!(pipeline.len(), 1);
//! ```

pub mod codec;
pub mod compiler;
pub mod criteria;
pub mod error;
pub mod memory;
pub mod record;
pub mod repository;
pub mod store;

pub use compiler::compile;
pub use criteria::{RangeField, RangeOperator, SearchCriteria, SortDirection, SortField, TokenField};
pub use error::{StorageError, StorageResult};
pub use record::Record;
pub use repository::{DocumentRepository, Repository};
pub use store::{
	BulkWriteSummary, DocumentCollection, DocumentStore, FindOptions, IndexDefinition,
	SearchIndexDefinition, TimeSeriesOptions, UpdateResult, UpsertModel,
};

// Re-exported so callers build filters with the same bson version
pub use bson;
