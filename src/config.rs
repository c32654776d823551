//! Tunables for sync engines.

// self
use crate::{_prelude::*, dispatch::RetryPolicy};

/// Engine configuration, deserializable from any serde source.
///
/// Missing fields fall back to their defaults, so `{}` is a valid configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
	/// Retry budget applied to every service request.
	pub retry: RetryPolicy,
	/// Maximum number of NRPS pages fetched in a single roster pull.
	///
	/// The first page is always fetched, so `0` behaves like `1`.
	pub roster_page_limit: usize,
}
impl SyncConfig {
	/// Overrides the retry budget.
	pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;

		self
	}

	/// Overrides the NRPS page limit.
	pub fn with_roster_page_limit(mut self, limit: usize) -> Self {
		self.roster_page_limit = limit;

		self
	}
}
impl Default for SyncConfig {
	fn default() -> Self {
		Self { retry: RetryPolicy::default(), roster_page_limit: 50 }
	}
}
