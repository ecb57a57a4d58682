#![cfg(feature = "test")]

// crates.io
use serde_json::{Value, json};
// self
use session_broker::{
	_preludet::*,
	auth::{IdentityToken, InteractiveGrant, MemoryTokenProvider},
	backend::HttpMethod,
	broker::Broker,
	router::Message,
	store::{LocalStore, StoreFuture, keys},
};

const QUOTA_PATH: &str = "/api/users/quota-status";
const LIST_PATH: &str = "/api/blacklist";

#[tokio::test]
async fn check_authentication_without_token_makes_no_calls() {
	let (test, transport) =
		build_scripted_broker(MemoryTokenProvider::default(), ScriptedTransport::default());
	let reply = test.broker.router().handle(Message::new("checkAuthentication")).await;

	assert_eq!(reply, json!({"authenticated": false}));
	assert!(transport.requests().is_empty());
	assert_eq!(test.analytics.names(), vec!["auth_check_success".to_owned()]);
}

#[tokio::test]
async fn unknown_actions_are_acknowledged() {
	let (test, transport) =
		build_scripted_broker(signed_in_provider(), ScriptedTransport::default());
	let reply = test
		.broker
		.router()
		.handle(Message::new("openDashboard").with_data(json!({"tab": "stats"})))
		.await;

	assert_eq!(reply, json!({"received": true}));
	assert!(transport.requests().is_empty());
	assert!(test.analytics.names().is_empty());
}

#[tokio::test]
async fn quota_info_fails_open_through_the_router() {
	let (test, _) = build_scripted_broker(
		signed_in_provider(),
		ScriptedTransport::default().with_session().on(
			HttpMethod::Get,
			QUOTA_PATH,
			ScriptedReply::Timeout,
		),
	);
	let reply = test.broker.router().handle(Message::new("getQuotaInfo")).await;

	assert_eq!(reply, json!({"remaining": 5, "dailyLimit": 5, "plan": "FREE", "degraded": true}));

	let reply = test.broker.router().handle(Message::new("checkQuota")).await;

	assert_eq!(reply["hasQuota"], json!(true));
	assert_eq!(reply["degraded"], json!(true));
}

#[tokio::test]
async fn sign_in_persists_user_and_sign_out_clears_it() {
	let provider = MemoryTokenProvider::default()
		.with_interactive(InteractiveGrant::Grant(IdentityToken::new(TEST_IDENTITY)));
	let (test, _) = build_scripted_broker(
		provider,
		ScriptedTransport::default()
			.with_session()
			.on(HttpMethod::Get, LIST_PATH, ScriptedReply::json(200, json!([]))),
	);
	let router = test.broker.router();
	let reply = router.handle(Message::new("signIn")).await;

	assert_eq!(
		reply,
		json!({"authenticated": true, "user": {"anonymizedUserId": TEST_USER, "plan": "FREE"}})
	);
	assert_eq!(test.provider.prompts(), 1);

	let reply = router.handle(Message::new("checkAuthentication")).await;

	assert_eq!(reply["authenticated"], json!(true));
	assert_eq!(reply["user"]["anonymizedUserId"], json!(TEST_USER));

	router.handle(Message::new("getBlacklist")).await;

	assert!(test.store.contains(keys::BLACKLIST_CACHE));

	let reply = router.handle(Message::new("signOut")).await;

	assert_eq!(reply, json!({"success": true}));
	assert!(test.provider.cached().is_none());
	assert!(!test.store.contains(keys::USER_ID));
	assert!(!test.store.contains(keys::BLACKLIST_CACHE));
	assert_eq!(
		router.handle(Message::new("checkAuthentication")).await,
		json!({"authenticated": false})
	);
}

#[tokio::test]
async fn cancelled_sign_in_replies_with_error() {
	let (test, transport) =
		build_scripted_broker(MemoryTokenProvider::default(), ScriptedTransport::default());
	let reply = test.broker.router().handle(Message::new("signIn")).await;

	assert_eq!(reply["kind"], json!("AUTH_CANCELLED"));
	assert!(reply["error"].is_string());
	assert!(transport.requests().is_empty());
	assert_eq!(test.analytics.names(), vec!["sign_in_failure".to_owned()]);
}

#[tokio::test]
async fn blacklist_actions_round_trip() {
	let (test, _) = build_scripted_broker(
		signed_in_provider(),
		ScriptedTransport::default()
			.with_session()
			.on(HttpMethod::Get, LIST_PATH, ScriptedReply::json(200, json!([])))
			.on(
				HttpMethod::Post,
				LIST_PATH,
				ScriptedReply::json(
					201,
					json!({
						"id": "e1",
						"blocked_name": "Jane Doe",
						"blocked_profile_url": null,
						"created_at": "2025-01-01T00:00:00Z"
					}),
				),
			)
			.on(HttpMethod::Delete, "/api/blacklist/e1", ScriptedReply::status(204)),
	);
	let router = test.broker.router();
	let synced = router.handle(Message::new("syncBlacklistCache")).await;

	assert_eq!(synced["count"], json!(0));

	let added = router
		.handle(Message::new("addToBlacklist").with_data(json!({"name": "  Jane Doe "})))
		.await;

	assert_eq!(added["success"], json!(true));
	assert_eq!(added["entry"]["id"], json!("e1"));

	let listed = router.handle(Message::new("getBlacklist")).await;

	assert_eq!(listed["count"], json!(1));
	assert_eq!(listed["entries"][0]["blocked_name"], json!("Jane Doe"));

	let removed =
		router.handle(Message::new("removeFromBlacklist").with_data(json!({"id": "e1"}))).await;

	assert_eq!(removed, json!({"success": true, "id": "e1"}));
	assert_eq!(router.handle(Message::new("getBlacklist")).await["count"], json!(0));
	assert_eq!(
		test.analytics.names(),
		vec![
			"blacklist_sync_success".to_owned(),
			"blacklist_add_success".to_owned(),
			"blacklist_read_success".to_owned(),
			"blacklist_remove_success".to_owned(),
			"blacklist_read_success".to_owned(),
		]
	);
}

#[tokio::test]
async fn remove_rejects_ids_that_would_leave_the_blacklist_route() {
	let (test, transport) = build_scripted_broker(
		signed_in_provider(),
		ScriptedTransport::default()
			.with_session()
			.on(HttpMethod::Delete, "/api/users/me", ScriptedReply::status(204)),
	);
	let router = test.broker.router();

	for id in ["../users/me", "..", "e1?force=true", "e1#x", "a/b"] {
		let reply =
			router.handle(Message::new("removeFromBlacklist").with_data(json!({"id": id}))).await;

		assert_eq!(reply["kind"], json!("INVALID_MESSAGE"), "{id:?} must be refused.");
	}

	assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn invalid_and_rejected_adds_reply_with_structured_errors() {
	let (test, _) = build_scripted_broker(
		signed_in_provider(),
		ScriptedTransport::default().with_session().on(
			HttpMethod::Post,
			LIST_PATH,
			ScriptedReply::json(
				409,
				json!({"detail": {"code": "ALREADY_BLOCKED", "message": "Already on your list"}}),
			),
		),
	);
	let router = test.broker.router();
	let missing = router.handle(Message::new("addToBlacklist").with_data(json!({"name": " "}))).await;

	assert_eq!(missing["kind"], json!("INVALID_MESSAGE"));

	let rejected =
		router.handle(Message::new("addToBlacklist").with_data(json!({"name": "Jane"}))).await;

	assert_eq!(
		rejected,
		json!({"error": "Already on your list", "kind": "UNEXPECTED_STATUS", "code": "ALREADY_BLOCKED"})
	);

	let events = test.analytics.events();

	assert_eq!(events[1].properties.get("kind"), Some(&json!("UNEXPECTED_STATUS")));
}

#[tokio::test]
async fn generate_comment_respects_reported_quota_only() {
	let (test, transport) = build_scripted_broker(
		signed_in_provider(),
		ScriptedTransport::default()
			.with_session()
			.on(
				HttpMethod::Get,
				QUOTA_PATH,
				ScriptedReply::json(200, json!({"remaining": 0, "daily_limit": 5, "plan": "FREE"})),
			)
			.on(HttpMethod::Get, QUOTA_PATH, ScriptedReply::Unreachable)
			.on(
				HttpMethod::Post,
				"/api/comments/generate",
				ScriptedReply::json(200, json!({"comment": "Great point!"})),
			),
	);
	let router = test.broker.router();
	let blocked = router
		.handle(Message::new("generateComment").with_data(json!({"post": "Hello"})))
		.await;

	assert_eq!(blocked["kind"], json!("QUOTA_EXHAUSTED"));
	assert_eq!(transport.calls(HttpMethod::Post, "/api/comments/generate"), 0);

	let generated = router
		.handle(Message::new("generateComment").with_data(json!({"post": "Hello"})))
		.await;

	assert_eq!(generated, json!({"comment": "Great point!"}));
}

#[tokio::test]
async fn replies_arrive_through_the_channel() {
	let (test, _) =
		build_scripted_broker(MemoryTokenProvider::default(), ScriptedTransport::default());
	let rx = test.broker.router().request(Message::new("checkAuthentication"));
	let reply = rx.await.expect("Router should always reply.");

	assert_eq!(reply, json!({"authenticated": false}));
}

#[derive(Debug, Default)]
struct PanickingStore;
impl LocalStore for PanickingStore {
	fn get<'a>(&'a self, _key: &'a str) -> StoreFuture<'a, Option<Value>> {
		Box::pin(async { panic!("storage backend exploded") })
	}

	fn set<'a>(&'a self, _key: &'a str, _value: Value) -> StoreFuture<'a, ()> {
		Box::pin(async { Ok(()) })
	}

	fn remove<'a>(&'a self, _key: &'a str) -> StoreFuture<'a, ()> {
		Box::pin(async { Ok(()) })
	}
}

#[tokio::test]
async fn panicking_handler_still_gets_a_reply() {
	let analytics = Arc::new(RecordingAnalytics::default());
	let broker = Broker::with_transport(
		test_config("https://api.test"),
		Arc::new(signed_in_provider()),
		Arc::new(ScriptedTransport::default()),
		Arc::new(PanickingStore),
	)
	.expect("Test broker configuration should validate.")
	.with_analytics(analytics.clone());
	let reply = broker.router().handle(Message::new("checkAuthentication")).await;

	assert_eq!(reply, json!({"error": "Internal error while handling the request."}));
	assert_eq!(analytics.names(), vec!["auth_check_failure".to_owned()]);
}
