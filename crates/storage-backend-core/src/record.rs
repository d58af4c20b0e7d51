//! Core `Record` trait definition.

use std::fmt::Debug;

use bson::Bson;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::StorageResult;

/// Capability set every storable entity must satisfy.
///
/// Identity is assigned by the caller before insert; the storage layer never
/// generates ids.
///
/// ## Example
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use storage_backend_core::Record;
///
/// #[derive(Debug, Serialize, Deserialize)]
/// struct User {
///     id: String,
///     name: String,
/// }
///
/// impl Record for User {
///     type Id = String;
///     const COLLECTION_NAME: &'static str = "user";
///
///     fn id(&self) -> &String {
///         &self.id
///     }
/// }
///
/// assert_eq!(User::COLLECTION_NAME, "user");
/// ```
pub trait Record: Serialize + DeserializeOwned + Send + Sync + Unpin + 'static {
	/// Identity type (e.g. `String`, `i64`, `Uuid`).
	type Id: Serialize + DeserializeOwned + Clone + Debug + Send + Sync;

	/// Collection name in the store.
	const COLLECTION_NAME: &'static str;

	/// Document field holding the identity.
	const ID_FIELD: &'static str = "id";

	/// Get the record's identity.
	fn id(&self) -> &Self::Id;
}

/// Encode an identity value as BSON for use in filters.
pub fn id_to_bson<M: Record>(id: &M::Id) -> StorageResult<Bson> {
	Ok(bson::serialize_to_bson(id)?)
}
