//! Search criteria compiler
//!
//! Turns a [`SearchCriteria`] into an aggregation pipeline made of one
//! `$search` stage and, when a positive limit is requested, a trailing
//! `$limit` stage.
//!
//! Inside the `$search` stage the clauses are always laid out in the same
//! order: the `should` group (with `minimumShouldMatch`), then the `filter`
//! group, both under `compound`, then `sort`.
//!
//! # Example
//!
//! ```rust
//! use bson::doc;
//! use storage_backend_core::compiler::compile;
//! use storage_backend_core::criteria::SearchCriteria;
//!
//! let pipeline = compile(&SearchCriteria::new("users").limit(5));
//!
//! assert_eq!(pipeline.len(), 2);
//! assert_eq!(pipeline[0], doc! { "$search": { "index": "users", "compound": {} } });
//! assert_eq!(pipeline[1], doc! { "$limit": 5_i64 });
//! ```

use bson::{Bson, Document, doc};

use crate::criteria::SearchCriteria;

/// Compile search criteria into an ordered list of pipeline stages.
///
/// The function is pure and deterministic: the same criteria always yield
/// the same stages in the same order. Criteria without query, filters, sort
/// or limit compile to a single `$search` stage naming only the index.
pub fn compile(criteria: &SearchCriteria) -> Vec<Document> {
	let mut compound = Document::new();

	if criteria.has_query() {
		compound.insert("should", should_clauses(criteria));
		compound.insert("minimumShouldMatch", 1);
	}

	if criteria.has_filters() {
		compound.insert("filter", filter_clauses(criteria));
	}

	let mut search = doc! {
		"index": criteria.index_name.as_str(),
		"compound": compound,
	};

	if !criteria.sort_fields.is_empty() {
		let mut sort = Document::new();
		for field in &criteria.sort_fields {
			sort.insert(field.name.as_str(), field.direction.as_i32());
		}
		search.insert("sort", sort);
	}

	let search_stage = doc! { "$search": search };
	tracing::debug!(search_stage = %search_stage, "Compiled search criteria");

	let mut pipeline = vec![search_stage];
	if criteria.limit > 0 {
		pipeline.push(doc! { "$limit": criteria.limit });
	}
	pipeline
}

fn should_clauses(criteria: &SearchCriteria) -> Vec<Bson> {
	criteria
		.autocomplete_fields
		.iter()
		.map(|field| {
			Bson::Document(doc! {
				"autocomplete": {
					"query": criteria.query.as_str(),
					"path": field.as_str(),
				}
			})
		})
		.collect()
}

// Token clauses first, then range, then boolean.
fn filter_clauses(criteria: &SearchCriteria) -> Vec<Bson> {
	let mut clauses = Vec::with_capacity(criteria.filter_count());

	for token in &criteria.token_fields {
		clauses.push(Bson::Document(doc! {
			"in": {
				"path": token.name.as_str(),
				"value": token.values.clone(),
			}
		}));
	}

	for range in &criteria.range_fields {
		let mut bound = doc! { "path": range.name.as_str() };
		bound.insert(range.operator.as_str(), range.value);
		clauses.push(Bson::Document(doc! { "range": bound }));
	}

	for field in &criteria.boolean_fields {
		clauses.push(Bson::Document(doc! {
			"equals": {
				"path": field.as_str(),
				"value": true,
			}
		}));
	}

	clauses
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::criteria::{RangeOperator, SortDirection};
	use rstest::rstest;

	fn search_value(stage: &Document) -> &Document {
		stage.get_document("$search").unwrap()
	}

	fn compound(stage: &Document) -> &Document {
		search_value(stage).get_document("compound").unwrap()
	}

	#[rstest]
	#[case(0)]
	#[case(-1)]
	#[case(i64::MIN)]
	fn test_empty_criteria_compiles_to_single_index_stage(#[case] limit: i64) {
		// Arrange
		let criteria = SearchCriteria::new("catalog").limit(limit);

		// Act
		let pipeline = compile(&criteria);

		// Assert
		assert_eq!(
			pipeline,
			vec![doc! { "$search": { "index": "catalog", "compound": {} } }]
		);
	}

	#[rstest]
	fn test_should_group_has_one_clause_per_field_in_order() {
		let criteria = SearchCriteria::new("users")
			.query("al")
			.autocomplete_field("first_name")
			.autocomplete_field("last_name")
			.autocomplete_field("email");

		let pipeline = compile(&criteria);
		let compound = compound(&pipeline[0]);
		let should = compound.get_array("should").unwrap();

		assert_eq!(should.len(), 3);
		let paths: Vec<&str> = should
			.iter()
			.map(|clause| {
				let autocomplete = clause
					.as_document()
					.unwrap()
					.get_document("autocomplete")
					.unwrap();
				assert_eq!(autocomplete.get_str("query").unwrap(), "al");
				autocomplete.get_str("path").unwrap()
			})
			.collect();
		assert_eq!(paths, vec!["first_name", "last_name", "email"]);
		assert_eq!(compound.get_i32("minimumShouldMatch").unwrap(), 1);
	}

	#[rstest]
	fn test_autocomplete_fields_ignored_without_query() {
		let criteria = SearchCriteria::new("users").autocomplete_field("name");

		let pipeline = compile(&criteria);

		assert!(compound(&pipeline[0]).is_empty());
	}

	#[rstest]
	fn test_filter_group_orders_token_range_boolean() {
		// Arrange: add in reverse kind order to prove ordering is by kind
		let criteria = SearchCriteria::new("products")
			.boolean_field("active")
			.range_field("price", RangeOperator::Gte, 10.0)
			.token_field("category", ["books", "music"])
			.boolean_field("featured")
			.range_field("price", RangeOperator::Lt, 99.5)
			.token_field("brand", ["acme"]);

		// Act
		let pipeline = compile(&criteria);

		// Assert
		let filter = compound(&pipeline[0]).get_array("filter").unwrap();
		assert_eq!(filter.len(), 6);
		assert_eq!(
			filter[0],
			Bson::Document(doc! { "in": { "path": "category", "value": ["books", "music"] } })
		);
		assert_eq!(
			filter[1],
			Bson::Document(doc! { "in": { "path": "brand", "value": ["acme"] } })
		);
		assert_eq!(
			filter[2],
			Bson::Document(doc! { "range": { "path": "price", "gte": 10.0 } })
		);
		assert_eq!(
			filter[3],
			Bson::Document(doc! { "range": { "path": "price", "lt": 99.5 } })
		);
		assert_eq!(
			filter[4],
			Bson::Document(doc! { "equals": { "path": "active", "value": true } })
		);
		assert_eq!(
			filter[5],
			Bson::Document(doc! { "equals": { "path": "featured", "value": true } })
		);
	}

	#[rstest]
	fn test_no_filter_key_without_filters() {
		let criteria = SearchCriteria::new("users")
			.query("a")
			.autocomplete_field("name");

		let pipeline = compile(&criteria);

		assert!(!compound(&pipeline[0]).contains_key("filter"));
	}

	#[rstest]
	fn test_full_criteria_layout() {
		// Arrange
		let criteria = SearchCriteria::new("products")
			.query("lap")
			.autocomplete_field("name")
			.token_field("category", ["electronics"])
			.range_field("price", RangeOperator::Lte, 1500.0)
			.boolean_field("in_stock")
			.sort_field("price", SortDirection::Ascending)
			.sort_field("rating", SortDirection::Descending)
			.limit(20);

		// Act
		let pipeline = compile(&criteria);

		// Assert
		let expected = vec![
			doc! {
				"$search": {
					"index": "products",
					"compound": {
						"should": [
							{ "autocomplete": { "query": "lap", "path": "name" } }
						],
						"minimumShouldMatch": 1,
						"filter": [
							{ "in": { "path": "category", "value": ["electronics"] } },
							{ "range": { "path": "price", "lte": 1500.0 } },
							{ "equals": { "path": "in_stock", "value": true } },
						],
					},
					"sort": { "price": 1, "rating": -1 },
				}
			},
			doc! { "$limit": 20_i64 },
		];
		assert_eq!(pipeline, expected);
		let keys: Vec<&String> = search_value(&pipeline[0]).keys().collect();
		assert_eq!(keys, vec!["index", "compound", "sort"]);
	}

	#[rstest]
	#[case(1)]
	#[case(250)]
	fn test_positive_limit_adds_trailing_stage(#[case] limit: i64) {
		let pipeline = compile(&SearchCriteria::new("idx").limit(limit));

		assert_eq!(pipeline.len(), 2);
		assert_eq!(pipeline[1].get_i64("$limit").unwrap(), limit);
	}

	#[rstest]
	fn test_compile_is_deterministic() {
		let criteria = SearchCriteria::new("idx")
			.query("q")
			.autocomplete_field("a")
			.autocomplete_field("b")
			.token_field("t", ["x", "y"])
			.boolean_field("flag")
			.sort_field("s", SortDirection::Descending)
			.limit(3);

		let first = compile(&criteria);
		let second = compile(&criteria);

		assert_eq!(first, second);
		assert_eq!(first[0].to_string(), second[0].to_string());
	}
}
