//! Storage error types
//!
//! Every repository, store and migration operation reports failures through
//! [`StorageError`]. Store-level failures are passed through unchanged; the
//! only locally-distinguished outcome is [`StorageError::NotFound`].

use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Unified error type for storage operations
#[derive(Debug, Error)]
pub enum StorageError {
	/// A single-document lookup decoded nothing
	#[error("Document not found")]
	NotFound,

	/// The store rejected a write because the identity already exists
	#[error("Duplicate key: {0}")]
	DuplicateKey(String),

	/// Any other store or transport failure
	#[error("Store error: {0}")]
	Store(String),

	/// Bad connection parameters at startup
	#[error("Configuration error: {0}")]
	Configuration(String),

	/// A record could not be encoded to or decoded from a document
	#[error("Serialization error: {0}")]
	Serialization(String),

	/// The request has no valid target (e.g. an update without ids)
	#[error("Invalid request: {0}")]
	InvalidRequest(String),

	/// A migration's forward step failed; the run was halted
	#[error("Migration {version} ({description}) failed: {reason}")]
	MigrationFailure {
		version: i64,
		description: String,
		reason: String,
	},

	/// Two migrations were registered with the same version
	#[error("Migration version '{0}' already exists")]
	DuplicateMigrationVersion(i64),

	/// A migration without a reverse step was asked to revert
	#[error("Migration {0} has no reverse step")]
	Irreversible(i64),
}

impl StorageError {
	/// Whether this error is [`StorageError::NotFound`]
	pub fn is_not_found(&self) -> bool {
		matches!(self, StorageError::NotFound)
	}

	/// Whether this error is [`StorageError::DuplicateKey`]
	pub fn is_duplicate_key(&self) -> bool {
		matches!(self, StorageError::DuplicateKey(_))
	}
}

// In bson v3.x, both ser::Error and de::Error are type aliases for bson::error::Error
impl From<bson::error::Error> for StorageError {
	fn from(err: bson::error::Error) -> Self {
		StorageError::Serialization(err.to_string())
	}
}
