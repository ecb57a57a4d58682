//! Optional observability helpers for broker operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `session_broker.operation` with the
//!   `operation` and `stage` fields, plus warn-level events for retries, fail-open quota reads,
//!   missing endpoints, and router failures.
//! - Enable `metrics` to increment the `session_broker_operation_total` counter for every
//!   attempt/success/failure, labeled by `operation` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Broker operations observed by spans and counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
	/// Identity token → session credential exchange.
	Exchange,
	/// Authenticated backend request (including retries).
	Dispatch,
	/// Quota status lookup.
	Quota,
	/// Full blacklist cache resynchronization.
	BlacklistSync,
	/// Blacklist add/remove.
	BlacklistMutation,
	/// Router message handling.
	Route,
}
impl OperationKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationKind::Exchange => "exchange",
			OperationKind::Dispatch => "dispatch",
			OperationKind::Quota => "quota",
			OperationKind::BlacklistSync => "blacklist_sync",
			OperationKind::BlacklistMutation => "blacklist_mutation",
			OperationKind::Route => "route",
		}
	}
}
impl Display for OperationKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationOutcome {
	/// Entry to a broker operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OperationOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationOutcome::Attempt => "attempt",
			OperationOutcome::Success => "success",
			OperationOutcome::Failure => "failure",
		}
	}
}
impl Display for OperationOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
