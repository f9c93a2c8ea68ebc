//! Lenient deserializers for backend payloads that mix numbers, strings, and booleans.

// crates.io
use serde::{Deserializer, de::Error as _};
// self
use crate::_prelude::*;

/// Accepts `true`, `1`, `"1"`, and `"true"` as truthy; everything else (including null) is false.
pub(crate) fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(is_truthy(&Value::deserialize(deserializer)?))
}

/// Accepts a JSON string or number and yields its string form.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
	D: Deserializer<'de>,
{
	match Value::deserialize(deserializer)? {
		Value::String(s) => Ok(s),
		Value::Number(n) => Ok(n.to_string()),
		other => Err(D::Error::custom(format!("expected a string or number, found {other}"))),
	}
}

/// Optional variant of [`string_or_number`]; null and empty strings map to `None`.
pub(crate) fn string_or_number_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
	D: Deserializer<'de>,
{
	match Option::<Value>::deserialize(deserializer)? {
		None | Some(Value::Null) => Ok(None),
		Some(Value::String(s)) if s.is_empty() => Ok(None),
		Some(Value::String(s)) => Ok(Some(s)),
		Some(Value::Number(n)) => Ok(Some(n.to_string())),
		Some(other) =>
			Err(D::Error::custom(format!("expected a string or number, found {other}"))),
	}
}

/// Treats `null` as the type's default value.
pub(crate) fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: Deserializer<'de>,
	T: Default + Deserialize<'de>,
{
	Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn is_truthy(value: &Value) -> bool {
	match value {
		Value::Bool(b) => *b,
		Value::Number(n) => n.as_i64() == Some(1),
		Value::String(s) => s == "1" || s.eq_ignore_ascii_case("true"),
		_ => false,
	}
}

/// JSON truthiness: everything except null, `false`, `0`, and `""`.
pub(crate) fn is_present(value: &Value) -> bool {
	match value {
		Value::Null => false,
		Value::Bool(b) => *b,
		Value::Number(n) => n.as_f64() != Some(0.),
		Value::String(s) => !s.is_empty(),
		_ => true,
	}
}

/// String form of an id sent as a JSON string or number.
pub(crate) fn id_string(value: &Value) -> Option<String> {
	match value {
		Value::String(s) if !s.is_empty() => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		_ => None,
	}
}
