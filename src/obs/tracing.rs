// self
use crate::{_prelude::*, obs::OperationKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOperation<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOperation<F> = F;

/// A span builder used by broker operations.
#[derive(Clone, Debug)]
pub struct OperationSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OperationSpan {
	/// Creates a new span tagged with the provided operation kind + stage.
	pub fn new(kind: OperationKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span =
				tracing::info_span!("session_broker.operation", operation = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOperation<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Reports that a failed attempt will be retried after `wait`.
pub fn retry_scheduled(endpoint: &'static str, attempt: u32, wait: Duration, error: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(endpoint, attempt, wait_ms = wait.as_millis() as u64, kind = error.kind(), %error, "retrying backend request");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (endpoint, attempt, wait, error);
	}
}

/// Reports a 404 from a known route; client and backend versions have drifted.
pub fn endpoint_missing(endpoint: &'static str, path: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::error!(endpoint, path, "backend route is missing; client and server are out of sync");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (endpoint, path);
	}
}

/// Reports that a read answered with configured defaults instead of failing.
pub fn failed_open(operation: OperationKind, error: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(operation = operation.as_str(), kind = error.kind(), %error, "serving defaults after failure");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (operation, error);
	}
}

/// Reports that a mutation could not be applied locally and the follow-up resync failed too.
pub fn resync_failed(error: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(kind = error.kind(), %error, "blacklist resync failed; dropping the local snapshot");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = error;
	}
}

/// Reports a backend-confirmed mutation whose local snapshot update failed.
pub fn local_update_failed(error: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(kind = error.kind(), %error, "blacklist snapshot update failed after backend success");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = error;
	}
}

/// Reports a list element that was dropped because it could not be decoded.
pub fn entry_skipped(endpoint: &'static str, error: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(endpoint, kind = error.kind(), %error, "skipping undecodable list entry");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (endpoint, error);
	}
}

/// Reports a best-effort follow-up (token invalidation, plan persistence) that failed.
pub fn side_effect_failed(operation: OperationKind, step: &'static str, error: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(operation = operation.as_str(), step, kind = error.kind(), %error, "best-effort follow-up failed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (operation, step, error);
	}
}

/// Reports a handler failure converted into an error reply.
pub fn route_failed(action: &str, reason: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(action, reason, "message handler failed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (action, reason);
	}
}
