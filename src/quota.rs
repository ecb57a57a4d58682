//! Remaining-usage lookups that fail open.

// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::{Plan, UserContext},
	backend::{self, Endpoint},
	dispatch::RequestDispatcher,
	error::ConfigError,
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
	store::LocalStore,
};

/// Usage allowance reported by the backend (or defaulted).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaStatus {
	/// Requests left today.
	pub remaining: u32,
	/// Daily allowance for the plan.
	pub daily_limit: u32,
	/// Plan the allowance belongs to.
	pub plan: Plan,
	/// `true` when the values are fail-open defaults rather than backend data.
	#[serde(default)]
	pub degraded: bool,
}
impl QuotaStatus {
	/// Whether another request is allowed.
	pub fn has_remaining(&self) -> bool {
		self.remaining > 0
	}
}

/// Values served when the quota lookup fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuotaDefaults {
	/// Remaining count reported while degraded.
	pub remaining: u32,
	/// Daily limit reported while degraded.
	pub daily_limit: u32,
	/// Plan reported while degraded.
	pub plan: Plan,
}
impl QuotaDefaults {
	/// Ensures the defaults describe a usable allowance.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.daily_limit == 0 {
			return Err(ConfigError::NonPositiveDailyLimit);
		}

		Ok(())
	}

	/// Degraded status built from these defaults.
	pub fn status(&self) -> QuotaStatus {
		QuotaStatus {
			remaining: self.remaining,
			daily_limit: self.daily_limit,
			plan: self.plan,
			degraded: true,
		}
	}
}
impl Default for QuotaDefaults {
	fn default() -> Self {
		Self { remaining: 5, daily_limit: 5, plan: Plan::Free }
	}
}

#[derive(Debug, Deserialize)]
struct QuotaResponse {
	#[serde(alias = "remaining_quota", alias = "remainingQuota")]
	remaining: i64,
	#[serde(alias = "dailyLimit", alias = "limit")]
	daily_limit: i64,
	#[serde(default)]
	plan: Option<Plan>,
}

/// Typed accessor over the quota-status endpoint.
#[derive(Clone)]
pub struct QuotaGateway {
	dispatcher: RequestDispatcher,
	store: Arc<dyn LocalStore>,
	defaults: QuotaDefaults,
}
impl QuotaGateway {
	/// Creates a gateway; `defaults` are served whenever the lookup fails.
	pub fn new(
		dispatcher: RequestDispatcher,
		store: Arc<dyn LocalStore>,
		defaults: QuotaDefaults,
	) -> Self {
		Self { dispatcher, store, defaults }
	}

	/// Fetches the current allowance, never failing.
	///
	/// Any dispatch or decoding failure yields [`QuotaDefaults::status`] with `degraded` set.
	/// A plan reported by the backend that differs from the stored one is persisted.
	pub async fn check_quota(&self) -> QuotaStatus {
		const KIND: OperationKind = OperationKind::Quota;

		let span = OperationSpan::new(KIND, "check_quota");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		match span.instrument(self.fetch()).await {
			Ok(status) => {
				obs::record_operation_outcome(KIND, OperationOutcome::Success);

				status
			},
			Err(e) => {
				obs::failed_open(KIND, &e);
				obs::record_operation_outcome(KIND, OperationOutcome::Failure);

				self.defaults.status()
			},
		}
	}

	async fn fetch(&self) -> Result<QuotaStatus> {
		let value = self.dispatcher.send(&Endpoint::QUOTA_STATUS, None).await?;
		let stored = UserContext::load(self.store.as_ref()).await.ok().flatten();
		let status = parse_status(value, stored.as_ref().map(|context| context.plan))?;

		if stored.as_ref().is_some_and(|context| context.plan != status.plan) {
			// The quota answer is authoritative even if persisting the new plan fails.
			if let Err(e) = UserContext::save_plan(self.store.as_ref(), status.plan).await {
				obs::side_effect_failed(OperationKind::Quota, "save_plan", &e);
			}
		}

		Ok(status)
	}
}
impl Debug for QuotaGateway {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("QuotaGateway").field("defaults", &self.defaults).finish()
	}
}

fn parse_status(value: Value, fallback_plan: Option<Plan>) -> Result<QuotaStatus> {
	let raw: QuotaResponse = backend::decode_value(Endpoint::QUOTA_STATUS.name, value)?;
	let plan = raw.plan.or(fallback_plan).unwrap_or_default();

	Ok(QuotaStatus {
		remaining: u32::try_from(raw.remaining.max(0)).unwrap_or(u32::MAX),
		daily_limit: u32::try_from(raw.daily_limit.max(1)).unwrap_or(u32::MAX),
		plan,
		degraded: false,
	})
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	#[test]
	fn parse_clamps_negative_remaining_and_keeps_plan() {
		let status = parse_status(
			json!({"remaining": -3, "daily_limit": 50, "plan": "PREMIUM"}),
			Some(Plan::Free),
		)
		.expect("Quota fixture should parse.");

		assert_eq!(
			status,
			QuotaStatus { remaining: 0, daily_limit: 50, plan: Plan::Premium, degraded: false }
		);
		assert!(!status.has_remaining());
	}

	#[test]
	fn parse_falls_back_to_stored_plan() {
		let status = parse_status(json!({"remainingQuota": 2, "dailyLimit": 20}), Some(Plan::Medium))
			.expect("Camel-case quota fixture should parse.");

		assert_eq!(status.plan, Plan::Medium);
		assert_eq!(status.remaining, 2);
	}

	#[test]
	fn defaults_are_degraded() {
		let status = QuotaDefaults::default().status();

		assert_eq!(
			status,
			QuotaStatus { remaining: 5, daily_limit: 5, plan: Plan::Free, degraded: true }
		);
		assert!(QuotaDefaults { daily_limit: 0, ..Default::default() }.validate().is_err());
	}
}
