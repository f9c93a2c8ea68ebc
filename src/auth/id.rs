//! Strongly typed identifiers for backend records.
//!
//! The backend emits ids as JSON numbers while hosts store them as strings, so every id
//! deserializes from either form and compares by its string value.

// std
use std::{borrow::Borrow, ops::Deref};
// crates.io
use serde::{Deserializer, Serializer, de::Error as _};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate_view($kind, view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl From<u64> for $name {
			fn from(value: u64) -> Self {
				Self(value.to_string())
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
		impl Serialize for $name {
			fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
			where
				S: Serializer,
			{
				serializer.serialize_str(&self.0)
			}
		}
		impl<'de> Deserialize<'de> for $name {
			fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
			where
				D: Deserializer<'de>,
			{
				let raw = crate::de::string_or_number(deserializer)?;

				Self::new(raw).map_err(D::Error::custom)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (account, license, subscription, user).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (account, license, subscription, user).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (account, license, subscription, user).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
}

def_id! { AccountId, "Identifier of a customer account.", "Account" }
def_id! { LicenseId, "Identifier of a license (one translated site).", "License" }
def_id! { SubscriptionId, "Identifier of a billing subscription.", "Subscription" }
def_id! { UserId, "Identifier of a dashboard user.", "User" }

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn identifiers_validate() {
		assert!(LicenseId::new(" 42").is_err(), "Leading whitespace must be rejected.");
		assert!(AccountId::new("").is_err());
		assert!(UserId::new("a".repeat(IDENTIFIER_MAX_LEN + 1)).is_err());

		let id = LicenseId::new("42").expect("License fixture should be valid.");

		assert_eq!(id.as_ref(), "42");
		assert_eq!(id, LicenseId::from(42));
	}

	#[test]
	fn numbers_and_strings_deserialize_to_the_same_id() {
		let from_number: LicenseId =
			serde_json::from_str("42").expect("Numeric id should deserialize.");
		let from_string: LicenseId =
			serde_json::from_str("\"42\"").expect("String id should deserialize.");

		assert_eq!(from_number, from_string);
		assert_eq!(serde_json::to_string(&from_number).expect("Id should serialize."), "\"42\"");
		assert!(serde_json::from_str::<LicenseId>("\"with space\"").is_err());
		assert!(serde_json::from_str::<LicenseId>("true").is_err());
	}

	#[test]
	fn borrow_supports_fast_lookup() {
		let map: HashMap<AccountId, u8> = HashMap::from_iter([(AccountId::from(7), 1_u8)]);

		assert_eq!(map.get("7"), Some(&1));
	}
}
