//! Retry budget, backoff, and per-class timeouts applied by the dispatcher.

// self
use crate::{_prelude::*, error::ConfigError};

/// Boxed future returned by [`Sleeper::sleep`].
pub type SleepFuture<'a> = Pin<Box<dyn Future<Output = ()> + 'a + Send>>;

/// Waits between retry attempts.
///
/// The dispatcher never sleeps directly so tests can observe (and skip) backoff waits.
pub trait Sleeper
where
	Self: Send + Sync,
{
	/// Suspends the caller for `duration`.
	fn sleep(&self, duration: Duration) -> SleepFuture<'_>;
}

/// [`Sleeper`] backed by the tokio timer.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;
impl Sleeper for TokioSleeper {
	fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
		Box::pin(tokio::time::sleep(duration))
	}
}

/// Attempt budget and timing used for every backend call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryPolicy {
	/// Total attempts per request, including the first.
	pub max_attempts: u32,
	/// Linear backoff unit; the wait after attempt `n` is `n * backoff_step`.
	#[serde(rename = "backoffStepMs", with = "millis")]
	pub backoff_step: Duration,
	/// Per-attempt timeout for standard endpoints.
	#[serde(rename = "standardTimeoutMs", with = "millis")]
	pub standard_timeout: Duration,
	/// Per-attempt timeout for bulk (generation/scraping) endpoints.
	#[serde(rename = "bulkTimeoutMs", with = "millis")]
	pub bulk_timeout: Duration,
}
impl RetryPolicy {
	/// Wait applied after the given (1-based) failed attempt.
	pub fn backoff(&self, attempt: u32) -> Duration {
		self.backoff_step.saturating_mul(attempt)
	}

	/// Ensures the policy can issue at least one request.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.max_attempts == 0 {
			return Err(ConfigError::NoAttempts);
		}

		Ok(())
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 2,
			backoff_step: Duration::from_millis(1_000),
			standard_timeout: Duration::from_secs(15),
			bulk_timeout: Duration::from_secs(45),
		}
	}
}

mod millis {
	// crates.io
	use serde::{Deserializer, Serializer};
	// self
	use crate::_prelude::*;

	pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		u64::deserialize(deserializer).map(Duration::from_millis)
	}
}
