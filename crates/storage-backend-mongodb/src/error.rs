//! Driver error mapping

use mongodb::error::{ErrorKind, WriteFailure};
use storage_backend_core::StorageError;

const DUPLICATE_KEY_CODE: i32 = 11000;

/// Map a driver error onto [`StorageError`].
///
/// Duplicate-key write failures become [`StorageError::DuplicateKey`] and
/// rejected arguments become [`StorageError::InvalidRequest`]. Everything
/// else is passed through as [`StorageError::Store`] with the driver message.
pub fn map_error(err: mongodb::error::Error) -> StorageError {
	let duplicate = match err.kind.as_ref() {
		ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
			write_error.code == DUPLICATE_KEY_CODE
		}
		ErrorKind::InsertMany(insert_error) => insert_error
			.write_errors
			.as_ref()
			.is_some_and(|errors| errors.iter().any(|e| e.code == DUPLICATE_KEY_CODE)),
		ErrorKind::BulkWrite(bulk_error) => bulk_error
			.write_errors
			.values()
			.any(|e| e.code == DUPLICATE_KEY_CODE),
		ErrorKind::InvalidArgument { .. } => {
			return StorageError::InvalidRequest(err.to_string());
		}
		_ => false,
	};

	if duplicate {
		StorageError::DuplicateKey(err.to_string())
	} else {
		StorageError::Store(err.to_string())
	}
}
