//! Broker configuration loaded from JSON.

// std
use std::{fs, path::Path};
// self
use crate::{
	_prelude::*, backend::BackendDescriptor, dispatch::RetryPolicy, error::ConfigError,
	quota::QuotaDefaults,
};

/// Everything a [`Broker`](crate::broker::Broker) needs besides its collaborators.
///
/// ```json
/// {
///   "backend": { "baseUrl": "https://api.example.com", "identityProvider": "google" },
///   "retry": { "maxAttempts": 2, "backoffStepMs": 1000 },
///   "quotaDefaults": { "remaining": 5, "dailyLimit": 5, "plan": "FREE" }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerConfig {
	/// Backend location and identity provider.
	pub backend: BackendDescriptor,
	/// Attempt budget and timeouts.
	#[serde(default)]
	pub retry: RetryPolicy,
	/// Values served when quota lookups fail.
	#[serde(default)]
	pub quota_defaults: QuotaDefaults,
}
impl BrokerConfig {
	/// Creates a configuration with default retry and quota settings.
	pub fn new(backend: BackendDescriptor) -> Self {
		Self { backend, retry: RetryPolicy::default(), quota_defaults: QuotaDefaults::default() }
	}

	/// Overrides the retry policy.
	pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;

		self
	}

	/// Overrides the fail-open quota values.
	pub fn with_quota_defaults(mut self, defaults: QuotaDefaults) -> Self {
		self.quota_defaults = defaults;

		self
	}

	/// Parses and validates a JSON document.
	pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
		let mut deserializer = serde_json::Deserializer::from_str(raw);
		let config: Self = serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| ConfigError::Parse { source })?;

		config.validate()?;

		Ok(config)
	}

	/// Reads, parses, and validates a JSON file.
	pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let raw = fs::read_to_string(path)?;

		Self::from_json_str(&raw)
	}

	/// Checks every section.
	pub fn validate(&self) -> Result<(), ConfigError> {
		self.backend.validate()?;
		self.retry.validate()?;
		self.quota_defaults.validate()?;

		Ok(())
	}
}
