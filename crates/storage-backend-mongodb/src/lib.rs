//! # storage-backend-mongodb
//!
//! MongoDB implementation of the storage-backend store traits.
//!
//! - [`MongoBackend`]: connection pool and [`DocumentStore`] implementation
//! - [`MongoCollection`]: [`DocumentCollection`] adapter over the driver
//! - [`MongoConfig`]: connection settings from serde or the environment
//!
//! Full-text search and client-level bulk writes need an Atlas cluster
//! (or MongoDB 8.0 with Atlas Search) on the server side.
//!
//! [`DocumentStore`]: storage_backend_core::DocumentStore
//! [`DocumentCollection`]: storage_backend_core::DocumentCollection

pub mod collection;
pub mod config;
pub mod connection;
pub mod error;

pub use collection::MongoCollection;
pub use config::MongoConfig;
pub use connection::{MongoBackend, MongoBackendBuilder};
pub use error::map_error;
