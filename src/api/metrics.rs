// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for the API client's recovery paths.
#[derive(Debug, Default)]
pub struct ApiMetrics {
	csrf_fetches: AtomicU64,
	csrf_retries: AtomicU64,
	unauthorized: AtomicU64,
}
impl ApiMetrics {
	/// Number of CSRF cookie fetches (bootstrap plus forced refreshes).
	pub fn csrf_fetches(&self) -> u64 {
		self.csrf_fetches.load(Ordering::Relaxed)
	}

	/// Number of requests replayed after a 419.
	pub fn csrf_retries(&self) -> u64 {
		self.csrf_retries.load(Ordering::Relaxed)
	}

	/// Number of 401 responses observed.
	pub fn unauthorized(&self) -> u64 {
		self.unauthorized.load(Ordering::Relaxed)
	}

	pub(crate) fn record_csrf_fetch(&self) {
		self.csrf_fetches.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_csrf_retry(&self) {
		self.csrf_retries.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_unauthorized(&self) {
		self.unauthorized.fetch_add(1, Ordering::Relaxed);
	}
}
