//! Persistent local storage contract and built-in backends.
//!
//! The broker owns three keys (see [`keys`]). Values are JSON documents so the storage layer
//! stays agnostic of the records it holds; typed accessors live next to the types they persist.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// crates.io
use serde_json::Value;
// self
use crate::_prelude::*;

/// Storage keys owned by the broker.
pub mod keys {
	/// Anonymized user identifier.
	pub const USER_ID: &str = "user_id";
	/// Subscription plan label.
	pub const USER_PLAN: &str = "user_plan";
	/// Serialized blacklist cache snapshot.
	pub const BLACKLIST_CACHE: &str = "blacklist_cache";
}

/// Boxed future returned by [`LocalStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Key/value storage that survives process restarts.
///
/// Writes are whole-value replacements; the store offers no versioning, so concurrent writers
/// to the same key resolve as last-writer-wins.
pub trait LocalStore
where
	Self: Send + Sync,
{
	/// Reads the value stored under `key`, if any.
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Value>>;

	/// Stores (or replaces) the value under `key`.
	fn set<'a>(&'a self, key: &'a str, value: Value) -> StoreFuture<'a, ()>;

	/// Removes `key`; removing a missing key succeeds.
	fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()>;
}

/// Error type produced by [`LocalStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend or a typed accessor.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
