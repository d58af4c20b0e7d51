//! Connection configuration
//!
//! [`MongoConfig`] can be deserialized from any serde source (a settings
//! file section, for instance) or read from the process environment:
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `MONGO_ATLAS_CONN_STR` | `uri` | required |
//! | `MONGO_DATABASE` | `database` | `test` |
//! | `MONGO_MAX_POOL_SIZE` | `max_pool_size` | driver default |
//! | `MONGO_MIN_POOL_SIZE` | `min_pool_size` | driver default |
//! | `MONGO_MAX_IDLE_TIME_SECS` | `max_idle_time_secs` | driver default |
//! | `MONGO_APP_NAME` | `app_name` | none |

use serde::Deserialize;
use storage_backend_core::{StorageError, StorageResult};

pub const URI_VAR: &str = "MONGO_ATLAS_CONN_STR";
pub const DATABASE_VAR: &str = "MONGO_DATABASE";
pub const MAX_POOL_SIZE_VAR: &str = "MONGO_MAX_POOL_SIZE";
pub const MIN_POOL_SIZE_VAR: &str = "MONGO_MIN_POOL_SIZE";
pub const MAX_IDLE_TIME_VAR: &str = "MONGO_MAX_IDLE_TIME_SECS";
pub const APP_NAME_VAR: &str = "MONGO_APP_NAME";

fn default_database() -> String {
	"test".to_string()
}

/// MongoDB connection settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MongoConfig {
	/// Connection string (`mongodb://` or `mongodb+srv://`)
	pub uri: String,
	#[serde(default = "default_database")]
	pub database: String,
	#[serde(default)]
	pub max_pool_size: Option<u32>,
	#[serde(default)]
	pub min_pool_size: Option<u32>,
	#[serde(default)]
	pub max_idle_time_secs: Option<u64>,
	#[serde(default)]
	pub app_name: Option<String>,
}

impl MongoConfig {
	/// Settings with driver defaults for everything but the target
	pub fn new(uri: impl Into<String>, database: impl Into<String>) -> Self {
		Self {
			uri: uri.into(),
			database: database.into(),
			max_pool_size: None,
			min_pool_size: None,
			max_idle_time_secs: None,
			app_name: None,
		}
	}

	/// Read settings from the process environment
	pub fn from_env() -> StorageResult<Self> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Read settings through an arbitrary variable lookup
	pub fn from_lookup<F>(lookup: F) -> StorageResult<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		let uri = lookup(URI_VAR)
			.filter(|value| !value.trim().is_empty())
			.ok_or_else(|| StorageError::Configuration(format!("{URI_VAR} is not set")))?;

		let config = Self {
			uri,
			database: lookup(DATABASE_VAR).unwrap_or_else(default_database),
			max_pool_size: parse_var(&lookup, MAX_POOL_SIZE_VAR)?,
			min_pool_size: parse_var(&lookup, MIN_POOL_SIZE_VAR)?,
			max_idle_time_secs: parse_var(&lookup, MAX_IDLE_TIME_VAR)?,
			app_name: lookup(APP_NAME_VAR).filter(|value| !value.is_empty()),
		};
		config.validate()?;
		Ok(config)
	}

	/// Reject settings that cannot name a database
	pub fn validate(&self) -> StorageResult<()> {
		if self.uri.trim().is_empty() {
			return Err(StorageError::Configuration(
				"connection string is empty".to_string(),
			));
		}
		if self.database.trim().is_empty() {
			return Err(StorageError::Configuration(
				"database name is empty".to_string(),
			));
		}
		if let (Some(min), Some(max)) = (self.min_pool_size, self.max_pool_size) {
			if min > max {
				return Err(StorageError::Configuration(format!(
					"min pool size {min} exceeds max pool size {max}"
				)));
			}
		}
		Ok(())
	}
}

fn parse_var<F, T>(lookup: &F, name: &str) -> StorageResult<Option<T>>
where
	F: Fn(&str) -> Option<String>,
	T: std::str::FromStr,
	T::Err: std::fmt::Display,
{
	match lookup(name).filter(|value| !value.is_empty()) {
		Some(value) => value
			.parse()
			.map(Some)
			.map_err(|e| StorageError::Configuration(format!("{name}: {e}"))),
		None => Ok(None),
	}
}
