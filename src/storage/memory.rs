//! Thread-safe in-memory [`ClientStorage`] implementation for tests and ephemeral hosts.

// self
use crate::{
	_prelude::*,
	storage::{ClientStorage, StoreFuture},
};

/// Keeps values in-process; contents vanish with the instance.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage(Arc<RwLock<HashMap<String, String>>>);
impl MemoryStorage {
	/// Synchronous read used by tests and diagnostics.
	pub fn snapshot(&self, key: &str) -> Option<String> {
		self.0.read().get(key).cloned()
	}

	/// Seeds a value without going through the async contract.
	pub fn seed(&self, key: impl Into<String>, value: impl Into<String>) {
		self.0.write().insert(key.into(), value.into());
	}
}
impl ClientStorage for MemoryStorage {
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		Box::pin(async move { Ok(self.snapshot(key)) })
	}

	fn set<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.0.write().insert(key.to_owned(), value);

			Ok(())
		})
	}

	fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.0.write().remove(key);

			Ok(())
		})
	}
}
