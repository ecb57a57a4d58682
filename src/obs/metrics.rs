// self
use crate::obs::{OperationKind, OperationOutcome};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_operation_outcome(kind: OperationKind, outcome: OperationOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"session_broker_operation_total",
			"operation" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records a dispatcher retry, labeled by endpoint.
pub fn record_retry(endpoint: &'static str) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("session_broker_retry_total", "endpoint" => endpoint).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = endpoint;
	}
}
