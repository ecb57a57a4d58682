//! Typed decoding of backend response bodies.

// crates.io
use serde::de::DeserializeOwned;
use serde_json::Value;
// self
use crate::_prelude::*;

/// Decodes a raw response body, reporting the failing JSON path on mismatch.
pub fn decode_slice<T>(endpoint: &'static str, body: &[u8]) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| Error::InvalidResponse { endpoint, source })
}

/// Decodes an already parsed JSON document into a typed payload.
pub fn decode_value<T>(endpoint: &'static str, value: Value) -> Result<T>
where
	T: DeserializeOwned,
{
	serde_path_to_error::deserialize(value)
		.map_err(|source| Error::InvalidResponse { endpoint, source })
}
