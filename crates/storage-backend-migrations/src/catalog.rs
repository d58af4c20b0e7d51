//! In-memory migration catalog
//!
//! Built once at startup and handed to the runner. Iteration is always in
//! ascending version order regardless of registration order.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::ops::Bound;

use storage_backend_core::{StorageError, StorageResult};

use crate::migration::{Migration, MigrationFn};

#[derive(Debug, Default, Clone)]
pub struct MigrationCatalog {
	migrations: BTreeMap<i64, Migration>,
}

impl MigrationCatalog {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a migration.
	///
	/// # Panics
	///
	/// Panics when the version is already registered or is not positive.
	/// Both are programming errors in the migration list.
	pub fn register(&mut self, migration: Migration) -> &mut Self {
		if let Err(err) = self.try_register(migration) {
			panic!("{err}");
		}
		self
	}

	/// Register a forward-only migration from its parts
	pub fn add(&mut self, version: i64, description: impl Into<String>, up: MigrationFn) -> &mut Self {
		self.register(Migration::new(version, description, up))
	}

	/// Register a migration, reporting a duplicate version as an error
	pub fn try_register(&mut self, migration: Migration) -> StorageResult<()> {
		if migration.version < 1 {
			return Err(StorageError::InvalidRequest(format!(
				"migration version must be positive, got {}",
				migration.version
			)));
		}
		match self.migrations.entry(migration.version) {
			Entry::Occupied(_) => Err(StorageError::DuplicateMigrationVersion(migration.version)),
			Entry::Vacant(slot) => {
				slot.insert(migration);
				Ok(())
			}
		}
	}

	pub fn get(&self, version: i64) -> Option<&Migration> {
		self.migrations.get(&version)
	}

	/// Migrations in ascending version order
	pub fn iter(&self) -> impl Iterator<Item = &Migration> {
		self.migrations.values()
	}

	/// Migrations with a version above `version`, ascending
	pub fn pending_after(&self, version: i64) -> impl Iterator<Item = &Migration> {
		self.migrations
			.range((Bound::Excluded(version), Bound::Unbounded))
			.map(|(_, migration)| migration)
	}

	pub fn latest_version(&self) -> Option<i64> {
		self.migrations.keys().next_back().copied()
	}

	pub fn len(&self) -> usize {
		self.migrations.len()
	}

	pub fn is_empty(&self) -> bool {
		self.migrations.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::migration::migration_fn;
	use rstest::rstest;

	fn noop(version: i64) -> Migration {
		Migration::new(version, format!("step {version}"), migration_fn(|_| async { Ok(()) }))
	}

	#[rstest]
	fn test_iteration_is_ascending() {
		let mut catalog = MigrationCatalog::new();
		catalog.register(noop(3)).register(noop(1)).register(noop(2));

		let versions: Vec<i64> = catalog.iter().map(|m| m.version).collect();

		assert_eq!(versions, vec![1, 2, 3]);
		assert_eq!(catalog.latest_version(), Some(3));
	}

	#[rstest]
	fn test_pending_after_skips_applied() {
		let mut catalog = MigrationCatalog::new();
		catalog.register(noop(1)).register(noop(2)).register(noop(3));

		let versions: Vec<i64> = catalog.pending_after(1).map(|m| m.version).collect();

		assert_eq!(versions, vec![2, 3]);
		assert_eq!(catalog.pending_after(i64::MAX).count(), 0);
	}

	#[rstest]
	#[should_panic(expected = "Migration version '2' already exists")]
	fn test_duplicate_registration_panics() {
		let mut catalog = MigrationCatalog::new();
		catalog.register(noop(1)).register(noop(2));

		catalog.register(noop(2));
	}

	#[rstest]
	fn test_try_register_reports_duplicate() {
		let mut catalog = MigrationCatalog::new();
		catalog.try_register(noop(5)).unwrap();

		let result = catalog.try_register(noop(5));

		assert!(matches!(result, Err(StorageError::DuplicateMigrationVersion(5))));
		assert_eq!(catalog.len(), 1);
	}

	#[rstest]
	#[case(0)]
	#[case(-4)]
	fn test_non_positive_versions_are_rejected(#[case] version: i64) {
		let mut catalog = MigrationCatalog::new();

		let result = catalog.try_register(noop(version));

		assert!(matches!(result, Err(StorageError::InvalidRequest(_))));
		assert!(catalog.is_empty());
	}
}
