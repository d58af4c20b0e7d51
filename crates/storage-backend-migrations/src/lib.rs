//! # storage-backend-migrations
//!
//! Versioned, apply-once upgrade steps for a document store.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use storage_backend_core::memory::MemoryStore;
//! use storage_backend_migrations::{MigrationCatalog, MigrationRunner, migration_fn};
//!
//! # #[tokio::main]
//! # async fn main() -> storage_backend_core::StorageResult<()> {
//! let mut catalog = MigrationCatalog::new();
//! catalog.add(1, "create settings", migration_fn(|_| async { Ok(()) }));
//!
//! let runner = MigrationRunner::new(Arc::new(MemoryStore::new()));
//! let report = runner.run(&catalog).await?;
//! assert_eq!(report.applied, vec![1]);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod migration;
pub mod runner;

pub use catalog::MigrationCatalog;
pub use migration::{Migration, MigrationFn, MigrationRecord, migration_fn};
pub use runner::{MigrationReport, MigrationRunner};
