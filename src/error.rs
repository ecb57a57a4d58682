//! Broker-level error types shared across the exchanger, dispatcher, cache, and router.

// self
use crate::{_prelude::*, backend::ErrorDetail};

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary backend failure; the dispatcher retries these.
	#[error(transparent)]
	Transient(#[from] TransientError),

	/// No usable credential exists; the user must sign in again.
	#[error("Authentication is required.")]
	AuthRequired,
	/// The user declined (or the host aborted) interactive sign-in.
	#[error("Interactive sign-in was cancelled: {reason}.")]
	AuthCancelled {
		/// Host- or user-supplied reason string.
		reason: String,
	},
	/// No identity token can be acquired without prompting.
	#[error("No identity token is available without user interaction.")]
	NotAuthenticated,
	/// Backend rejected a session exchange step.
	#[error("Backend rejected the session exchange with status {status}.")]
	BackendRejected {
		/// HTTP status code returned by the backend.
		status: u16,
		/// Normalized `{detail}` payload.
		detail: ErrorDetail,
	},
	/// Route does not exist on the backend; client and server versions drifted.
	#[error("Backend endpoint `{endpoint}` does not exist.")]
	EndpointMissing {
		/// Endpoint label.
		endpoint: &'static str,
	},
	/// Resource is gated behind a plan the user does not have.
	#[error("Feature is not available on the current plan.")]
	FeatureNotEntitled {
		/// Normalized `{detail}` payload.
		detail: ErrorDetail,
	},
	/// Catch-all for non-retryable HTTP statuses.
	#[error("Backend returned unexpected status {status}.")]
	UnexpectedStatus {
		/// HTTP status code returned by the backend.
		status: u16,
		/// Normalized `{detail}` payload.
		detail: ErrorDetail,
	},
	/// Backend replied with a body that does not match the expected shape.
	#[error("Backend returned a malformed `{endpoint}` response.")]
	InvalidResponse {
		/// Endpoint label.
		endpoint: &'static str,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Incoming router message could not be interpreted.
	#[error("Message is invalid: {reason}.")]
	InvalidMessage {
		/// Human-readable explanation.
		reason: String,
	},
	/// The backend reported no remaining quota for today.
	#[error("Daily quota of {daily_limit} is exhausted.")]
	QuotaExhausted {
		/// Daily allowance for the current plan.
		daily_limit: u32,
	},
}
impl Error {
	/// Returns a stable, upper-snake label for replies and metrics.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Storage(_) => "STORAGE",
			Self::Config(_) => "CONFIG",
			Self::Transient(TransientError::Timeout { .. }) => "TIMEOUT",
			Self::Transient(_) => "BACKEND_UNREACHABLE",
			Self::AuthRequired | Self::NotAuthenticated => "AUTH_REQUIRED",
			Self::AuthCancelled { .. } => "AUTH_CANCELLED",
			Self::BackendRejected { .. } => "BACKEND_REJECTED",
			Self::EndpointMissing { .. } => "ENDPOINT_MISSING",
			Self::FeatureNotEntitled { .. } => "FEATURE_NOT_ENTITLED",
			Self::UnexpectedStatus { .. } => "UNEXPECTED_STATUS",
			Self::InvalidResponse { .. } => "INVALID_RESPONSE",
			Self::InvalidMessage { .. } => "INVALID_MESSAGE",
			Self::QuotaExhausted { .. } => "QUOTA_EXHAUSTED",
		}
	}

	/// Returns `true` when another attempt may succeed.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Transient(_))
	}

	/// Returns the backend-supplied detail, when the failure carried one.
	pub fn detail(&self) -> Option<&ErrorDetail> {
		match self {
			Self::BackendRejected { detail, .. }
			| Self::FeatureNotEntitled { detail }
			| Self::UnexpectedStatus { detail, .. } => Some(detail),
			Self::Transient(TransientError::ServerError { detail, .. }) => Some(detail),
			_ => None,
		}
	}

	/// Returns the user-facing message, preferring the backend's own wording.
	pub fn message(&self) -> String {
		self.detail().and_then(|detail| detail.message.clone()).unwrap_or_else(|| self.to_string())
	}
}

/// Configuration and validation failures raised by the broker.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Backend descriptor failed validation.
	#[error(transparent)]
	Descriptor(#[from] crate::backend::BackendDescriptorError),
	/// Endpoint path could not be joined onto the base URL.
	#[error("Endpoint path `{path}` cannot be resolved against the base URL.")]
	InvalidEndpoint {
		/// Offending path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Configuration document could not be read.
	#[error("Configuration file could not be read.")]
	Read(#[from] std::io::Error),
	/// Configuration document could not be parsed.
	#[error("Configuration document is malformed.")]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Retry policy must allow at least one attempt.
	#[error("Retry policy must allow at least one attempt.")]
	NoAttempts,
	/// Quota defaults must carry a positive daily limit.
	#[error("Fail-open daily limit must be positive.")]
	NonPositiveDailyLimit,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Backend could not be reached at all.
	#[error("Backend endpoint `{endpoint}` is unreachable.")]
	Unreachable {
		/// Endpoint label.
		endpoint: &'static str,
		/// Transport failure.
		#[source]
		source: TransportError,
	},
	/// Request exceeded its per-attempt timeout.
	#[error("Backend endpoint `{endpoint}` timed out after {after:?}.")]
	Timeout {
		/// Endpoint label.
		endpoint: &'static str,
		/// Timeout that elapsed.
		after: Duration,
	},
	/// Backend answered with a 5xx status.
	#[error("Backend endpoint `{endpoint}` failed with status {status}.")]
	ServerError {
		/// Endpoint label.
		endpoint: &'static str,
		/// HTTP status code.
		status: u16,
		/// Normalized `{detail}` payload.
		detail: ErrorDetail,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// The transport aborted the request because its timeout elapsed.
	#[error("Request timed out.")]
	Timeout,
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the backend.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the backend.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout } else { Self::network(e) }
	}
}
