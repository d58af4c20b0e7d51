//! MongoDB connection and store implementation
//!
//! # Example
//!
//! ```rust,no_run
//! use storage_backend_mongodb::MongoBackend;
//! use storage_backend_core::DocumentStore;
//!
//! # async fn example() -> storage_backend_core::StorageResult<()> {
//! let backend = MongoBackend::builder()
//!     .url("mongodb://localhost:27017")
//!     .database("myapp")
//!     .max_pool_size(100)
//!     .build()
//!     .await?;
//!
//! backend.health_check().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use storage_backend_core::{DocumentCollection, DocumentStore, StorageError, StorageResult};

use crate::collection::MongoCollection;
use crate::config::MongoConfig;
use crate::error::map_error;

/// MongoDB-backed [`DocumentStore`]
///
/// Cloning is cheap: clones share one driver client and its connection pool.
#[derive(Clone)]
pub struct MongoBackend {
	client: Arc<Client>,
	database_name: String,
}

/// Builder for configuring MongoDB connections
///
/// # Example
///
/// ```rust,no_run
/// use storage_backend_mongodb::MongoBackendBuilder;
///
/// # async fn example() -> storage_backend_core::StorageResult<()> {
/// let backend = MongoBackendBuilder::new()
///     .url("mongodb://localhost:27017")
///     .database("mydb")
///     .min_pool_size(10)
///     .max_idle_time_secs(300)
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MongoBackendBuilder {
	url: String,
	database: String,
	max_pool_size: Option<u32>,
	min_pool_size: Option<u32>,
	max_idle_time_secs: Option<u64>,
	app_name: Option<String>,
}

impl Default for MongoBackendBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl MongoBackendBuilder {
	/// Create a new builder targeting `mongodb://localhost:27017`, database `test`
	pub fn new() -> Self {
		Self {
			url: "mongodb://localhost:27017".to_string(),
			database: "test".to_string(),
			max_pool_size: None,
			min_pool_size: None,
			max_idle_time_secs: None,
			app_name: None,
		}
	}

	/// Set the connection string
	pub fn url(mut self, url: impl Into<String>) -> Self {
		self.url = url.into();
		self
	}

	/// Set the database name
	pub fn database(mut self, database: impl Into<String>) -> Self {
		self.database = database.into();
		self
	}

	/// Set the maximum connection pool size
	pub fn max_pool_size(mut self, size: u32) -> Self {
		self.max_pool_size = Some(size);
		self
	}

	/// Set the minimum connection pool size
	pub fn min_pool_size(mut self, size: u32) -> Self {
		self.min_pool_size = Some(size);
		self
	}

	/// Set the maximum idle time for pooled connections in seconds
	pub fn max_idle_time_secs(mut self, secs: u64) -> Self {
		self.max_idle_time_secs = Some(secs);
		self
	}

	/// Set the application name reported to the server
	pub fn app_name(mut self, name: impl Into<String>) -> Self {
		self.app_name = Some(name.into());
		self
	}

	/// Parse the connection string and create the client.
	///
	/// No round trip is made to the server; use
	/// [`MongoBackend::health_check`] to verify connectivity.
	pub async fn build(self) -> StorageResult<MongoBackend> {
		if self.database.trim().is_empty() {
			return Err(StorageError::Configuration(
				"database name is empty".to_string(),
			));
		}

		let mut options = ClientOptions::parse(&self.url)
			.await
			.map_err(|e| StorageError::Configuration(e.to_string()))?;

		if let Some(max_size) = self.max_pool_size {
			options.max_pool_size = Some(max_size);
		}
		if let Some(min_size) = self.min_pool_size {
			options.min_pool_size = Some(min_size);
		}
		if let Some(idle_time) = self.max_idle_time_secs {
			options.max_idle_time = Some(Duration::from_secs(idle_time));
		}
		if self.app_name.is_some() {
			options.app_name = self.app_name;
		}

		let client =
			Client::with_options(options).map_err(|e| StorageError::Configuration(e.to_string()))?;

		tracing::debug!(database = %self.database, "MongoDB client created");
		Ok(MongoBackend {
			client: Arc::new(client),
			database_name: self.database,
		})
	}
}

impl From<&MongoConfig> for MongoBackendBuilder {
	fn from(config: &MongoConfig) -> Self {
		let mut builder = Self::new().url(&config.uri).database(&config.database);
		builder.max_pool_size = config.max_pool_size;
		builder.min_pool_size = config.min_pool_size;
		builder.max_idle_time_secs = config.max_idle_time_secs;
		builder.app_name = config.app_name.clone();
		builder
	}
}

impl MongoBackend {
	/// Connect with a connection string and database name
	pub async fn connect(url: &str, database: &str) -> StorageResult<Self> {
		Self::builder().url(url).database(database).build().await
	}

	/// Create a builder for configuring the connection
	pub fn builder() -> MongoBackendBuilder {
		MongoBackendBuilder::new()
	}

	/// Connect using validated settings
	pub async fn from_config(config: &MongoConfig) -> StorageResult<Self> {
		config.validate()?;
		MongoBackendBuilder::from(config).build().await
	}

	/// Database handle
	pub fn database(&self) -> Database {
		self.client.database(&self.database_name)
	}

	/// Database name
	pub fn database_name(&self) -> &str {
		&self.database_name
	}

	/// Typed collection adapter
	pub fn mongo_collection(&self, name: &str) -> MongoCollection {
		MongoCollection::new(Arc::clone(&self.client), self.database(), name)
	}
}

#[async_trait]
impl DocumentStore for MongoBackend {
	fn collection(&self, name: &str) -> Arc<dyn DocumentCollection> {
		Arc::new(self.mongo_collection(name))
	}

	async fn health_check(&self) -> StorageResult<()> {
		self.client
			.database("admin")
			.run_command(doc! { "ping": 1 })
			.await
			.map_err(map_error)?;
		Ok(())
	}
}
