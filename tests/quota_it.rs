#![cfg(feature = "test")]

// crates.io
use serde_json::json;
// self
use session_broker::{
	_preludet::*,
	auth::{AnonymizedUserId, MemoryTokenProvider, Plan, UserContext},
	backend::HttpMethod,
	quota::QuotaStatus,
	store::{LocalStore, keys},
};

const QUOTA_PATH: &str = "/api/users/quota-status";

#[tokio::test]
async fn unreachable_backend_fails_open() {
	let (test, _) = build_scripted_broker(
		signed_in_provider(),
		ScriptedTransport::default().with_session().on(
			HttpMethod::Get,
			QUOTA_PATH,
			ScriptedReply::Unreachable,
		),
	);
	let status = test.broker.quota().check_quota().await;

	assert_eq!(status, QuotaStatus { remaining: 5, daily_limit: 5, plan: Plan::Free, degraded: true });
	assert_eq!(test.sleeper.waits().len(), 1);
}

#[tokio::test]
async fn signed_out_users_get_defaults_without_network() {
	let (test, transport) =
		build_scripted_broker(MemoryTokenProvider::default(), ScriptedTransport::default());
	let status = test.broker.quota().check_quota().await;

	assert!(status.degraded);
	assert!(status.has_remaining());
	assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn reported_plan_change_is_persisted() {
	let (test, _) = build_scripted_broker(
		signed_in_provider(),
		ScriptedTransport::default().with_session().on(
			HttpMethod::Get,
			QUOTA_PATH,
			ScriptedReply::json(200, json!({"remaining": 40, "daily_limit": 50, "plan": "PREMIUM"})),
		),
	);

	UserContext::new(
		AnonymizedUserId::new("anon-plan").expect("User fixture should be valid."),
		Plan::Free,
	)
	.save(test.store.as_ref())
	.await
	.expect("Seeding user context should succeed.");

	let status = test.broker.quota().check_quota().await;

	assert_eq!(
		status,
		QuotaStatus { remaining: 40, daily_limit: 50, plan: Plan::Premium, degraded: false }
	);
	assert_eq!(
		test.store.get(keys::USER_PLAN).await.expect("Reading the plan should succeed."),
		Some(json!("PREMIUM"))
	);
}

#[tokio::test]
async fn malformed_quota_body_fails_open() {
	let (test, _) = build_scripted_broker(
		signed_in_provider(),
		ScriptedTransport::default().with_session().on(
			HttpMethod::Get,
			QUOTA_PATH,
			ScriptedReply::json(200, json!({"remaining": "lots"})),
		),
	);
	let status = test.broker.quota().check_quota().await;

	assert!(status.degraded);
	assert!(test.sleeper.waits().is_empty());
}

#[tokio::test]
async fn failed_plan_write_keeps_the_backend_answer() {
	let store = Arc::new(FlakyStore::default());
	let (broker, _) = build_scripted_broker_with_store(
		store.clone(),
		ScriptedTransport::default().with_session().on(
			HttpMethod::Get,
			QUOTA_PATH,
			ScriptedReply::json(200, json!({"remaining": 2, "daily_limit": 20, "plan": "MEDIUM"})),
		),
	);

	UserContext::new(
		AnonymizedUserId::new("anon-plan").expect("User fixture should be valid."),
		Plan::Free,
	)
	.save(store.as_ref())
	.await
	.expect("Seeding user context should succeed.");
	store.fail_writes(true);

	let status = broker.quota().check_quota().await;

	assert_eq!(
		status,
		QuotaStatus { remaining: 2, daily_limit: 20, plan: Plan::Medium, degraded: false }
	);
	assert_eq!(
		store.get(keys::USER_PLAN).await.expect("Reading the plan should succeed."),
		Some(json!("FREE"))
	);
}
