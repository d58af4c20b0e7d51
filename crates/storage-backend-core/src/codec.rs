//! Field codecs for record types
//!
//! Monetary and other exact values are stored as BSON `Decimal128` rather
//! than doubles. Use the modules here with `#[serde(with = "...")]`:
//!
//! ```rust
//! use rust_decimal::Decimal;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Product {
//!     id: String,
//!     #[serde(with = "storage_backend_core::codec::decimal")]
//!     price: Decimal,
//!     #[serde(with = "storage_backend_core::codec::decimal_option", default)]
//!     discount: Option<Decimal>,
//! }
//! ```

use std::str::FromStr;

use bson::Decimal128;
use rust_decimal::Decimal;

fn to_decimal128(value: &Decimal) -> Result<Decimal128, String> {
	value
		.to_string()
		.parse::<Decimal128>()
		.map_err(|e| format!("cannot encode {value} as Decimal128: {e}"))
}

fn from_decimal128(value: &Decimal128) -> Result<Decimal, String> {
	let text = value.to_string();
	Decimal::from_str(&text)
		.or_else(|_| Decimal::from_scientific(&text))
		.map_err(|e| format!("cannot decode Decimal128 {text}: {e}"))
}

/// `Decimal` ⇄ `Decimal128`
pub mod decimal {
	use super::*;
	use serde::{Deserialize, Deserializer, Serialize, Serializer, de, ser};

	pub fn serialize<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
		to_decimal128(value)
			.map_err(ser::Error::custom)?
			.serialize(serializer)
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
		let value = Decimal128::deserialize(deserializer)?;
		from_decimal128(&value).map_err(de::Error::custom)
	}
}

/// `Option<Decimal>` ⇄ `Decimal128` or null
pub mod decimal_option {
	use super::*;
	use serde::{Deserialize, Deserializer, Serialize, Serializer, de, ser};

	pub fn serialize<S: Serializer>(
		value: &Option<Decimal>,
		serializer: S,
	) -> Result<S::Ok, S::Error> {
		match value {
			Some(value) => to_decimal128(value)
				.map_err(ser::Error::custom)?
				.serialize(serializer),
			None => serializer.serialize_none(),
		}
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(
		deserializer: D,
	) -> Result<Option<Decimal>, D::Error> {
		match Option::<Decimal128>::deserialize(deserializer)? {
			Some(value) => from_decimal128(&value).map(Some).map_err(de::Error::custom),
			None => Ok(None),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bson::Bson;
	use rstest::rstest;
	use serde::{Deserialize, Serialize};

	#[derive(Debug, PartialEq, Serialize, Deserialize)]
	struct Invoice {
		#[serde(with = "crate::codec::decimal")]
		total: Decimal,
		#[serde(with = "crate::codec::decimal_option", default)]
		tip: Option<Decimal>,
	}

	#[rstest]
	#[case("19.99")]
	#[case("-0.005")]
	#[case("1000000")]
	fn test_decimal_is_stored_as_decimal128(#[case] amount: &str) {
		// Arrange
		let invoice = Invoice {
			total: Decimal::from_str(amount).unwrap(),
			tip: None,
		};

		// Act
		let document = bson::serialize_to_document(&invoice).unwrap();

		// Assert
		assert!(matches!(document.get("total"), Some(Bson::Decimal128(_))));
		assert_eq!(document.get("tip"), Some(&Bson::Null));
		let decoded: Invoice = bson::deserialize_from_document(document).unwrap();
		assert_eq!(decoded, invoice);
	}

	#[rstest]
	fn test_optional_decimal_present() {
		let invoice = Invoice {
			total: Decimal::new(500, 2),
			tip: Some(Decimal::new(75, 2)),
		};

		let document = bson::serialize_to_document(&invoice).unwrap();

		assert!(matches!(document.get("tip"), Some(Bson::Decimal128(_))));
		let decoded: Invoice = bson::deserialize_from_document(document).unwrap();
		assert_eq!(decoded.tip, Some(Decimal::new(75, 2)));
	}
}
