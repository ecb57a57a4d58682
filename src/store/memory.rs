//! Thread-safe in-memory [`LocalStore`] implementation for local development and tests.

// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	store::{LocalStore, StoreFuture},
};

type StoreMap = Arc<RwLock<HashMap<String, Value>>>;

/// Thread-safe storage backend that keeps values in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Returns a copy of every stored key/value pair.
	pub fn snapshot(&self) -> HashMap<String, Value> {
		self.0.read().clone()
	}

	/// Returns `true` when `key` is present.
	pub fn contains(&self, key: &str) -> bool {
		self.0.read().contains_key(key)
	}
}
impl LocalStore for MemoryStore {
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Value>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(key).cloned()) })
	}

	fn set<'a>(&'a self, key: &'a str, value: Value) -> StoreFuture<'a, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().insert(key.to_owned(), value);

			Ok(())
		})
	}

	fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().remove(key);

			Ok(())
		})
	}
}
