//! Subscription plan and the persisted user context attached to every request.

// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::AnonymizedUserId,
	store::{LocalStore, StoreError, keys},
};

/// Subscription tier gating feature entitlement and quota.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Plan {
	/// Free tier.
	#[default]
	#[serde(alias = "free")]
	Free,
	/// Intermediate paid tier.
	#[serde(alias = "medium")]
	Medium,
	/// Top paid tier.
	#[serde(alias = "premium")]
	Premium,
}
impl Plan {
	/// Returns the wire label (`FREE`, `MEDIUM`, `PREMIUM`).
	pub const fn as_str(self) -> &'static str {
		match self {
			Plan::Free => "FREE",
			Plan::Medium => "MEDIUM",
			Plan::Premium => "PREMIUM",
		}
	}
}
impl Display for Plan {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Plan {
	type Err = UnknownPlan;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_uppercase().as_str() {
			"FREE" => Ok(Plan::Free),
			"MEDIUM" => Ok(Plan::Medium),
			"PREMIUM" => Ok(Plan::Premium),
			_ => Err(UnknownPlan(s.to_owned())),
		}
	}
}

/// Error returned when a plan label is not recognized.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unknown plan `{0}`.")]
pub struct UnknownPlan(pub String);

/// Signed-in user's attribution data, persisted under `user_id` and `user_plan`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
	/// Anonymized identifier attached to outgoing requests.
	pub anonymized_user_id: AnonymizedUserId,
	/// Current subscription tier.
	pub plan: Plan,
}
impl UserContext {
	/// Creates a context for the provided user and plan.
	pub fn new(anonymized_user_id: AnonymizedUserId, plan: Plan) -> Self {
		Self { anonymized_user_id, plan }
	}

	/// Reads the persisted context; `None` when no user is signed in.
	///
	/// A missing or unrecognized plan falls back to [`Plan::Free`].
	pub async fn load(store: &dyn LocalStore) -> Result<Option<Self>> {
		let Some(raw_id) = store.get(keys::USER_ID).await? else {
			return Ok(None);
		};
		let anonymized_user_id =
			serde_json::from_value::<AnonymizedUserId>(raw_id).map_err(|e| {
				StoreError::Serialization {
					message: format!("Stored `{}` is invalid: {e}", keys::USER_ID),
				}
			})?;
		let plan = store
			.get(keys::USER_PLAN)
			.await?
			.as_ref()
			.and_then(Value::as_str)
			.and_then(|label| label.parse().ok())
			.unwrap_or_default();

		Ok(Some(Self { anonymized_user_id, plan }))
	}

	/// Persists both keys.
	pub async fn save(&self, store: &dyn LocalStore) -> Result<()> {
		store.set(keys::USER_ID, Value::String(self.anonymized_user_id.to_string())).await?;
		store.set(keys::USER_PLAN, Value::String(self.plan.as_str().into())).await?;

		Ok(())
	}

	/// Rewrites only the stored plan.
	pub async fn save_plan(store: &dyn LocalStore, plan: Plan) -> Result<()> {
		store.set(keys::USER_PLAN, Value::String(plan.as_str().into())).await?;

		Ok(())
	}

	/// Removes both keys (sign-out).
	pub async fn clear(store: &dyn LocalStore) -> Result<()> {
		store.remove(keys::USER_ID).await?;
		store.remove(keys::USER_PLAN).await?;

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use tokio::runtime::Runtime;
	// self
	use super::*;
	use crate::store::MemoryStore;

	#[test]
	fn plan_labels_parse_case_insensitively() {
		assert_eq!("premium".parse::<Plan>(), Ok(Plan::Premium));
		assert_eq!(" MEDIUM ".parse::<Plan>(), Ok(Plan::Medium));
		assert!("gold".parse::<Plan>().is_err());
		assert_eq!(
			serde_json::to_string(&Plan::Free).expect("Plan should serialize."),
			"\"FREE\""
		);
	}

	#[test]
	fn context_round_trips_through_storage_and_clears() {
		let rt = Runtime::new().expect("Failed to build Tokio runtime for context test.");
		let store = MemoryStore::default();
		let context = UserContext::new(
			AnonymizedUserId::new("anon-1").expect("User identifier fixture should be valid."),
			Plan::Medium,
		);

		rt.block_on(context.save(&store)).expect("Saving user context should succeed.");

		let loaded = rt
			.block_on(UserContext::load(&store))
			.expect("Loading user context should succeed.")
			.expect("Saved context should be present.");

		assert_eq!(loaded, context);

		rt.block_on(UserContext::clear(&store)).expect("Clearing user context should succeed.");

		assert!(
			rt.block_on(UserContext::load(&store))
				.expect("Loading a cleared context should succeed.")
				.is_none()
		);
	}

	#[test]
	fn unknown_stored_plan_defaults_to_free() {
		let rt = Runtime::new().expect("Failed to build Tokio runtime for context test.");
		let store = MemoryStore::default();

		rt.block_on(store.set(keys::USER_ID, Value::String("anon-2".into())))
			.expect("Seeding user id should succeed.");
		rt.block_on(store.set(keys::USER_PLAN, Value::String("legacy".into())))
			.expect("Seeding plan should succeed.");

		let loaded = rt
			.block_on(UserContext::load(&store))
			.expect("Loading user context should succeed.")
			.expect("Context with a user id should be present.");

		assert_eq!(loaded.plan, Plan::Free);
	}
}
