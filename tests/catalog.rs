//! End-to-end flow over the in-memory store: migrations provision the
//! collection, records with decimal prices are written, then searched.

use std::sync::Arc;

use rstest::{fixture, rstest};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storage_backend::bson::{Bson, doc};
use storage_backend::prelude::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Product {
	id: String,
	name: String,
	category: String,
	#[serde(with = "storage_backend::codec::decimal")]
	price: Decimal,
	in_stock: bool,
}

impl Product {
	fn new(id: &str, name: &str, category: &str, cents: i64) -> Self {
		Self {
			id: id.to_string(),
			name: name.to_string(),
			category: category.to_string(),
			price: Decimal::new(cents, 2),
			in_stock: true,
		}
	}
}

impl Record for Product {
	type Id = String;
	const COLLECTION_NAME: &'static str = "product";

	fn id(&self) -> &String {
		&self.id
	}
}

fn catalog() -> MigrationCatalog {
	let mut catalog = MigrationCatalog::new();
	catalog
		.add(
			1,
			"unique product id",
			migration_fn(|store: Arc<dyn DocumentStore>| async move {
				store
					.collection(Product::COLLECTION_NAME)
					.create_indexes(vec![IndexDefinition::new(doc! { "id": 1 }).unique(true)])
					.await?;
				Ok(())
			}),
		)
		.add(
			2,
			"product search index",
			migration_fn(|store: Arc<dyn DocumentStore>| async move {
				let definition = doc! {
					"mappings": {
						"dynamic": false,
						"fields": {
							"name": { "type": "autocomplete" },
							"category": { "type": "token" },
							"in_stock": { "type": "boolean" },
						}
					}
				};
				store
					.collection(Product::COLLECTION_NAME)
					.create_search_indexes(vec![SearchIndexDefinition::new("product_search", definition)])
					.await?;
				Ok(())
			}),
		);
	catalog
}

#[fixture]
fn store() -> Arc<MemoryStore> {
	Arc::new(MemoryStore::new())
}

#[rstest]
#[tokio::test]
async fn test_migrations_provision_then_repository_serves(store: Arc<MemoryStore>) {
	// Arrange
	let runner = MigrationRunner::new(store.clone());
	let products = DocumentRepository::<Product>::new(&*store);

	// Act
	let report = runner.run(&catalog()).await.unwrap();
	products
		.insert_many(&[
			Product::new("p1", "laptop", "electronics", 149_999),
			Product::new("p2", "lamp", "home", 2_450),
		])
		.await
		.unwrap();

	// Assert
	assert_eq!(report.applied, vec![1, 2]);
	assert_eq!(store.search_indexes("product")[0].name, "product_search");
	let stored = store.documents("product");
	assert!(matches!(stored[0].get("price"), Some(Bson::Decimal128(_))));
	let laptop = products.find_by_id(&"p1".to_string()).await.unwrap();
	assert_eq!(laptop.price, Decimal::new(149_999, 2));
}

#[rstest]
#[tokio::test]
async fn test_search_sends_compiled_pipeline(store: Arc<MemoryStore>) {
	// Arrange
	let products = DocumentRepository::<Product>::new(&*store);
	products
		.bulk_write(&[
			Product::new("p1", "laptop", "electronics", 149_999),
			Product::new("p2", "lamp", "home", 2_450),
			Product::new("p3", "ladder", "home", 8_900),
		])
		.await
		.unwrap();
	let criteria = SearchCriteria::new("product_search")
		.query("la")
		.autocomplete_field("name")
		.token_field("category", ["home"])
		.range_field("price", RangeOperator::Lt, 100.0)
		.boolean_field("in_stock")
		.sort_field("price", SortDirection::Descending)
		.limit(2);

	// Act
	let found = products.search(&criteria).await.unwrap();

	// Assert
	assert_eq!(found.len(), 2);
	let pipeline = store.last_pipeline("product").unwrap();
	assert_eq!(pipeline, storage_backend::compile(&criteria));
	assert_eq!(pipeline[1], doc! { "$limit": 2_i64 });
}

#[rstest]
#[tokio::test]
async fn test_second_startup_applies_nothing(store: Arc<MemoryStore>) {
	let catalog = catalog();
	MigrationRunner::new(store.clone()).run(&catalog).await.unwrap();

	let report = MigrationRunner::new(store.clone()).run(&catalog).await.unwrap();

	assert!(report.applied.is_empty());
	assert_eq!(report.current_version(), 2);
	assert_eq!(store.search_indexes("product").len(), 1);
}
