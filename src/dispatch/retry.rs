// self
use crate::_prelude::*;

/// Boxed future returned by [`Pause::pause`].
pub type PauseFuture<'a> = Pin<Box<dyn Future<Output = ()> + 'a + Send>>;

/// Suspends the current dispatch between rate-limited attempts.
pub trait Pause
where
	Self: Send + Sync,
{
	/// Resolves once `duration` has elapsed.
	fn pause(&self, duration: Duration) -> PauseFuture<'_>;
}

/// [`Pause`] backed by the tokio timer.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioPause;
impl Pause for TokioPause {
	fn pause(&self, duration: Duration) -> PauseFuture<'_> {
		Box::pin(tokio::time::sleep(duration.unsigned_abs()))
	}
}

/// Retry budget applied to every dispatched request.
///
/// Both budgets count occurrences per logical call; the occurrence that exceeds a budget
/// fails the call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
	/// Rate-limited (`429`) responses tolerated before giving up.
	pub max_rate_limited: u32,
	/// Unauthorized (`401`) responses tolerated before giving up.
	pub max_unauthorized: u32,
	/// Fixed wait after each rate-limited response, expressed in whole seconds on the wire.
	#[serde(with = "seconds")]
	pub rate_limit_backoff: Duration,
}
impl RetryPolicy {
	/// Overrides the rate-limit budget.
	pub fn with_max_rate_limited(mut self, max: u32) -> Self {
		self.max_rate_limited = max;

		self
	}

	/// Overrides the unauthorized budget.
	pub fn with_max_unauthorized(mut self, max: u32) -> Self {
		self.max_unauthorized = max;

		self
	}

	/// Overrides the fixed rate-limit backoff.
	pub fn with_rate_limit_backoff(mut self, backoff: Duration) -> Self {
		self.rate_limit_backoff = backoff;

		self
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self { max_rate_limited: 5, max_unauthorized: 5, rate_limit_backoff: Duration::seconds(10) }
	}
}

mod seconds {
	// crates.io
	use serde::{Deserializer, Serializer};
	// self
	use crate::_prelude::*;

	pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_i64(value.whole_seconds())
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		u32::deserialize(deserializer).map(|secs| Duration::seconds(secs.into()))
	}
}
