//! Migration definitions and persisted records

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use storage_backend_core::{DocumentStore, Record, StorageResult};

/// Forward or reverse step of a migration
pub type MigrationFn =
	Arc<dyn Fn(Arc<dyn DocumentStore>) -> BoxFuture<'static, StorageResult<()>> + Send + Sync>;

/// Wrap an async function or closure as a [`MigrationFn`]
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use bson::doc;
/// use storage_backend_core::{DocumentStore, IndexDefinition, StorageResult};
/// use storage_backend_migrations::migration_fn;
///
/// async fn add_email_index(store: Arc<dyn DocumentStore>) -> StorageResult<()> {
///     store
///         .collection("user")
///         .create_indexes(vec![IndexDefinition::new(doc! { "email": 1 }).unique(true)])
///         .await?;
///     Ok(())
/// }
///
/// let up = migration_fn(add_email_index);
/// ```
pub fn migration_fn<F, Fut>(step: F) -> MigrationFn
where
	F: Fn(Arc<dyn DocumentStore>) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = StorageResult<()>> + Send + 'static,
{
	Arc::new(move |store| step(store).boxed())
}

/// Versioned upgrade step
#[derive(Clone)]
pub struct Migration {
	pub version: i64,
	pub description: String,
	pub up: MigrationFn,
	/// Never run automatically; see [`crate::MigrationRunner::revert`]
	pub down: Option<MigrationFn>,
}

impl Migration {
	pub fn new(version: i64, description: impl Into<String>, up: MigrationFn) -> Self {
		Self {
			version,
			description: description.into(),
			up,
			down: None,
		}
	}

	/// Attach a reverse step
	pub fn with_down(mut self, down: MigrationFn) -> Self {
		self.down = Some(down);
		self
	}

	/// Identity of the persisted record, derived from the version
	pub fn id(&self) -> String {
		self.version.to_string()
	}

	pub fn is_reversible(&self) -> bool {
		self.down.is_some()
	}
}

impl fmt::Debug for Migration {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Migration")
			.field("version", &self.version)
			.field("description", &self.description)
			.field("reversible", &self.is_reversible())
			.finish()
	}
}

/// Applied-migration log entry, stored in the `migration` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationRecord {
	pub id: String,
	pub version: i64,
	pub description: String,
	/// When the forward step finished
	pub timestamp: DateTime<Utc>,
}

impl MigrationRecord {
	pub fn applied(migration: &Migration, timestamp: DateTime<Utc>) -> Self {
		Self {
			id: migration.id(),
			version: migration.version,
			description: migration.description.clone(),
			timestamp,
		}
	}
}

impl Record for MigrationRecord {
	type Id = String;
	const COLLECTION_NAME: &'static str = "migration";

	fn id(&self) -> &String {
		&self.id
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use storage_backend_core::memory::MemoryStore;

	#[rstest]
	fn test_record_identity_is_version() {
		let migration = Migration::new(12, "backfill", migration_fn(|_| async { Ok(()) }));

		let record = MigrationRecord::applied(&migration, Utc::now());

		assert_eq!(record.id, "12");
		assert_eq!(record.version, 12);
		assert!(!migration.is_reversible());
	}

	#[rstest]
	#[tokio::test]
	async fn test_migration_fn_runs_against_store() {
		// Arrange
		let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
		let up = migration_fn(|store: Arc<dyn DocumentStore>| async move {
			store
				.collection("settings")
				.insert_one(bson::doc! { "id": "theme", "value": "dark" })
				.await
		});

		// Act
		(up)(Arc::clone(&store)).await.unwrap();

		// Assert
		assert_eq!(store.collection("settings").count(bson::doc! {}).await.unwrap(), 1);
	}
}
