//! Search criteria model
//!
//! A [`SearchCriteria`] describes one full-text search request: free text
//! matched against autocomplete fields, exact-match token filters, numeric
//! range filters, boolean filters, sort fields and a result limit. It is
//! compiled into an aggregation pipeline by [`crate::compiler::compile`].
//!
//! # Example
//!
//! ```rust
//! use storage_backend_core::criteria::{RangeOperator, SearchCriteria, SortDirection};
//!
//! let criteria = SearchCriteria::new("products_search")
//!     .query("lapt")
//!     .autocomplete_field("name")
//!     .token_field("category", ["electronics"])
//!     .range_field("price", RangeOperator::Lte, 1500.0)
//!     .boolean_field("in_stock")
//!     .sort_field("price", SortDirection::Ascending)
//!     .limit(20);
//!
//! assert!(criteria.has_query());
//! assert!(criteria.has_filters());
//! ```

use serde::{Deserialize, Serialize};

/// Exact-match membership filter (`in` clause)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenField {
	pub name: String,
	pub values: Vec<String>,
}

/// Comparison operator of a numeric range filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeOperator {
	Gt,
	Gte,
	Lt,
	Lte,
}

impl RangeOperator {
	/// Operator key as written in a `range` clause
	pub fn as_str(&self) -> &'static str {
		match self {
			RangeOperator::Gt => "gt",
			RangeOperator::Gte => "gte",
			RangeOperator::Lt => "lt",
			RangeOperator::Lte => "lte",
		}
	}
}

/// Numeric range filter (`range` clause)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeField {
	pub name: String,
	pub operator: RangeOperator,
	pub value: f64,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
	Ascending,
	Descending,
}

impl SortDirection {
	/// Direction as the store expects it (`1` or `-1`)
	pub fn as_i32(&self) -> i32 {
		match self {
			SortDirection::Ascending => 1,
			SortDirection::Descending => -1,
		}
	}
}

/// Sort entry; position in [`SearchCriteria::sort_fields`] is its priority
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortField {
	pub name: String,
	pub direction: SortDirection,
}

/// Declarative description of a search request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchCriteria {
	/// Target search index
	pub index_name: String,

	/// Free-text query; empty means no free-text clause
	pub query: String,

	/// Maximum result count; zero or negative leaves the server default
	pub limit: i64,

	/// Fields the free-text query matches against (any one must match)
	pub autocomplete_fields: Vec<String>,

	/// Membership filters (all must match)
	pub token_fields: Vec<TokenField>,

	/// Numeric range filters (all must match)
	pub range_fields: Vec<RangeField>,

	/// Fields that must equal `true`
	pub boolean_fields: Vec<String>,

	/// Sort fields in priority order
	pub sort_fields: Vec<SortField>,
}

impl SearchCriteria {
	/// Create empty criteria targeting a search index
	pub fn new(index_name: impl Into<String>) -> Self {
		Self {
			index_name: index_name.into(),
			..Self::default()
		}
	}

	/// Set the free-text query
	pub fn query(mut self, query: impl Into<String>) -> Self {
		self.query = query.into();
		self
	}

	/// Set the result limit
	pub fn limit(mut self, limit: i64) -> Self {
		self.limit = limit;
		self
	}

	/// Add a field the free-text query matches against
	pub fn autocomplete_field(mut self, name: impl Into<String>) -> Self {
		self.autocomplete_fields.push(name.into());
		self
	}

	/// Add a membership filter
	pub fn token_field<I, S>(mut self, name: impl Into<String>, values: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.token_fields.push(TokenField {
			name: name.into(),
			values: values.into_iter().map(Into::into).collect(),
		});
		self
	}

	/// Add a numeric range filter
	pub fn range_field(mut self, name: impl Into<String>, operator: RangeOperator, value: f64) -> Self {
		self.range_fields.push(RangeField {
			name: name.into(),
			operator,
			value,
		});
		self
	}

	/// Add a field that must equal `true`
	pub fn boolean_field(mut self, name: impl Into<String>) -> Self {
		self.boolean_fields.push(name.into());
		self
	}

	/// Add a sort field; earlier fields take priority
	pub fn sort_field(mut self, name: impl Into<String>, direction: SortDirection) -> Self {
		self.sort_fields.push(SortField {
			name: name.into(),
			direction,
		});
		self
	}

	/// Whether a free-text clause will be emitted
	pub fn has_query(&self) -> bool {
		!self.query.is_empty()
	}

	/// Whether a filter group will be emitted
	pub fn has_filters(&self) -> bool {
		!self.token_fields.is_empty()
			|| !self.range_fields.is_empty()
			|| !self.boolean_fields.is_empty()
	}

	/// Number of clauses the filter group will contain
	pub fn filter_count(&self) -> usize {
		self.token_fields.len() + self.range_fields.len() + self.boolean_fields.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_builder_preserves_insertion_order() {
		let criteria = SearchCriteria::new("idx")
			.autocomplete_field("title")
			.autocomplete_field("summary")
			.sort_field("rank", SortDirection::Descending)
			.sort_field("name", SortDirection::Ascending);

		assert_eq!(criteria.autocomplete_fields, vec!["title", "summary"]);
		assert_eq!(criteria.sort_fields[0].name, "rank");
		assert_eq!(criteria.sort_fields[1].name, "name");
	}

	#[rstest]
	fn test_duplicate_fields_are_kept() {
		let criteria = SearchCriteria::new("idx")
			.range_field("price", RangeOperator::Gte, 10.0)
			.range_field("price", RangeOperator::Lt, 20.0)
			.boolean_field("price");

		assert_eq!(criteria.range_fields.len(), 2);
		assert_eq!(criteria.filter_count(), 3);
	}

	#[rstest]
	fn test_empty_criteria_has_no_clauses() {
		let criteria = SearchCriteria::new("idx");

		assert!(!criteria.has_query());
		assert!(!criteria.has_filters());
		assert_eq!(criteria.limit, 0);
	}

	#[rstest]
	#[case(RangeOperator::Gt, "gt")]
	#[case(RangeOperator::Gte, "gte")]
	#[case(RangeOperator::Lt, "lt")]
	#[case(RangeOperator::Lte, "lte")]
	fn test_range_operator_keys(#[case] operator: RangeOperator, #[case] expected: &str) {
		assert_eq!(operator.as_str(), expected);
	}

	#[rstest]
	fn test_deserialize_from_request_payload() {
		let payload = serde_json::json!({
			"index_name": "products",
			"query": "ch",
			"autocomplete_fields": ["name"],
			"range_fields": [{ "name": "price", "operator": "lte", "value": 9.5 }],
			"sort_fields": [{ "name": "price", "direction": "descending" }]
		});

		let criteria: SearchCriteria = serde_json::from_value(payload).unwrap();

		assert_eq!(criteria.index_name, "products");
		assert_eq!(criteria.range_fields[0].operator, RangeOperator::Lte);
		assert_eq!(criteria.sort_fields[0].direction, SortDirection::Descending);
		assert!(criteria.token_fields.is_empty());
		assert_eq!(criteria.limit, 0);
	}
}
