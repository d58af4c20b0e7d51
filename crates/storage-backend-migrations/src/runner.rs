//! Migration runner
//!
//! [`MigrationRunner::run`] reads the highest applied version from the
//! `migration` collection, then applies every newer catalog entry in
//! ascending order. A version is recorded only after its forward step
//! succeeds, and the first failing step halts the run.
//!
//! The read-apply-record sequence is not guarded by any lock. Run it once
//! per deployment (at startup of a single instance); concurrent runners in
//! several processes can apply the same step twice.

use std::sync::Arc;

use bson::doc;
use chrono::Utc;
use storage_backend_core::{
	DocumentRepository, DocumentStore, FindOptions, Repository, StorageError, StorageResult,
};

use crate::catalog::MigrationCatalog;
use crate::migration::MigrationRecord;

/// Outcome of a successful run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
	/// Highest version applied before the run
	pub starting_version: i64,
	/// Versions applied by this run, ascending
	pub applied: Vec<i64>,
}

impl MigrationReport {
	/// Highest applied version after the run
	pub fn current_version(&self) -> i64 {
		self.applied.last().copied().unwrap_or(self.starting_version)
	}
}

pub struct MigrationRunner {
	store: Arc<dyn DocumentStore>,
	log: DocumentRepository<MigrationRecord>,
}

impl MigrationRunner {
	pub fn new(store: Arc<dyn DocumentStore>) -> Self {
		let log = DocumentRepository::new(store.as_ref());
		Self { store, log }
	}

	/// Highest persisted version, `0` when nothing has been applied
	pub async fn current_version(&self) -> StorageResult<i64> {
		let options = FindOptions::new().sort(doc! { "version": -1 }).limit(1);
		let latest = self.log.find(doc! {}, options).await?;
		Ok(latest.first().map_or(0, |record| record.version))
	}

	/// Applied-migration log in ascending version order
	pub async fn applied(&self) -> StorageResult<Vec<MigrationRecord>> {
		let options = FindOptions::new().sort(doc! { "version": 1 });
		self.log.find(doc! {}, options).await
	}

	/// Apply every pending migration of the catalog
	pub async fn run(&self, catalog: &MigrationCatalog) -> StorageResult<MigrationReport> {
		let starting_version = self.current_version().await?;
		tracing::info!(current_version = starting_version, "Running migrations");

		let mut report = MigrationReport {
			starting_version,
			applied: Vec::new(),
		};

		for migration in catalog.pending_after(starting_version) {
			tracing::info!(
				version = migration.version,
				description = %migration.description,
				"Applying migration"
			);

			if let Err(err) = (migration.up)(Arc::clone(&self.store)).await {
				tracing::error!(
					version = migration.version,
					description = %migration.description,
					error = %err,
					"Migration failed"
				);
				return Err(StorageError::MigrationFailure {
					version: migration.version,
					description: migration.description.clone(),
					reason: err.to_string(),
				});
			}

			let record = MigrationRecord::applied(migration, Utc::now());
			self.log
				.insert_one(&record)
				.await
				.map_err(|err| StorageError::MigrationFailure {
					version: migration.version,
					description: migration.description.clone(),
					reason: format!("recording applied version: {err}"),
				})?;
			report.applied.push(migration.version);
		}

		tracing::info!(
			applied = report.applied.len(),
			current_version = report.current_version(),
			"Migrations complete"
		);
		Ok(report)
	}

	/// Run the reverse step of an applied migration and drop its record.
	///
	/// Never invoked by [`MigrationRunner::run`]; this is an operator action.
	pub async fn revert(&self, catalog: &MigrationCatalog, version: i64) -> StorageResult<()> {
		let migration = catalog.get(version).ok_or_else(|| {
			StorageError::InvalidRequest(format!("migration {version} is not registered"))
		})?;
		let down = migration
			.down
			.as_ref()
			.ok_or(StorageError::Irreversible(version))?;

		let id = migration.id();
		// Surfaces NotFound when the version was never applied.
		self.log.find_by_id(&id).await?;

		tracing::info!(version, description = %migration.description, "Reverting migration");
		down(Arc::clone(&self.store)).await?;
		self.log.delete_by_id(&id).await?;
		Ok(())
	}
}
