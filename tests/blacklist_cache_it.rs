#![cfg(feature = "test")]

// crates.io
use serde_json::{Value, json};
use time::macros;
// self
use session_broker::{
	_preludet::*,
	auth::EntryId,
	backend::HttpMethod,
	cache::BlacklistCacheSnapshot,
	store::{LocalStore, keys},
};

const LIST_PATH: &str = "/api/blacklist";

fn entry_json(id: &str, name: &str, created_at: &str) -> Value {
	json!({
		"id": id,
		"blocked_name": name,
		"blocked_profile_url": null,
		"created_at": created_at
	})
}

fn entry_id(raw: &str) -> EntryId {
	EntryId::new(raw).expect("Entry identifier fixture should be valid.")
}

#[tokio::test]
async fn add_prepends_the_server_entry() {
	let jane = entry_json("e1", "Jane Doe", "2025-01-01T00:00:00Z");
	let (test, _) = build_scripted_broker(
		signed_in_provider(),
		ScriptedTransport::default()
			.with_session()
			.on(
				HttpMethod::Get,
				LIST_PATH,
				ScriptedReply::json(200, json!([entry_json("e0", "John Roe", "2024-06-01T00:00:00Z")])),
			)
			.on(HttpMethod::Post, LIST_PATH, ScriptedReply::json(201, jane.clone())),
	);
	let cache = test.broker.blacklist();
	let before = cache.sync().await.expect("Initial sync should succeed.");
	let entry = cache.add("Jane Doe", None).await.expect("Adding Jane Doe should succeed.");
	let after = cache
		.snapshot()
		.await
		.expect("Reading the snapshot should succeed.")
		.expect("Snapshot should exist after add.");

	assert_eq!(serde_json::to_value(&entry).expect("Entry should serialize."), jane);
	assert_eq!(after.entries()[0], entry);
	assert_eq!(after.count(), before.count() + 1);
	assert_eq!(after.count(), after.entries().len());
}

#[tokio::test]
async fn add_then_remove_excludes_the_id() {
	let (test, transport) = build_scripted_broker(
		signed_in_provider(),
		ScriptedTransport::default()
			.with_session()
			.on(HttpMethod::Get, LIST_PATH, ScriptedReply::json(200, json!([])))
			.on(
				HttpMethod::Post,
				LIST_PATH,
				ScriptedReply::json(201, entry_json("e7", "Spam Bot", "2025-03-01T00:00:00Z")),
			)
			.on(HttpMethod::Delete, "/api/blacklist/e7", ScriptedReply::status(204)),
	);
	let cache = test.broker.blacklist();

	cache.sync().await.expect("Initial sync should succeed.");
	cache.add("Spam Bot", Some("https://social.test/spam")).await.expect("Add should succeed.");
	cache.remove(&entry_id("e7")).await.expect("Remove should succeed.");

	let snapshot = cache.read().await.expect("Read should serve the local snapshot.");

	assert!(!snapshot.contains(&entry_id("e7")));
	assert_eq!(snapshot.count(), snapshot.entries().len());
	assert_eq!(transport.calls(HttpMethod::Get, LIST_PATH), 1);

	let create = transport
		.requests()
		.into_iter()
		.find(|request| request.method == HttpMethod::Post && request.url.path() == LIST_PATH)
		.expect("Create request should be recorded.");

	assert_eq!(
		create.body.as_ref().and_then(|body| body.get("blocked_profile_url")),
		Some(&json!("https://social.test/spam"))
	);
}

#[tokio::test]
async fn rejected_add_leaves_cache_untouched() {
	let (test, _) = build_scripted_broker(
		signed_in_provider(),
		ScriptedTransport::default()
			.with_session()
			.on(
				HttpMethod::Get,
				LIST_PATH,
				ScriptedReply::json(200, json!([entry_json("e1", "Jane Doe", "2025-01-01T00:00:00Z")])),
			)
			.on(
				HttpMethod::Post,
				LIST_PATH,
				ScriptedReply::json(
					409,
					json!({"detail": {"code": "ALREADY_BLOCKED", "message": "Already on your list"}}),
				),
			),
	);
	let cache = test.broker.blacklist();
	let before = cache.sync().await.expect("Initial sync should succeed.");
	let err = cache.add("Jane Doe", None).await.expect_err("Duplicates must be rejected.");
	let after = cache.read().await.expect("Read should serve the local snapshot.");

	assert_eq!(err.kind(), "UNEXPECTED_STATUS");
	assert_eq!(err.detail().and_then(|detail| detail.code.as_deref()), Some("ALREADY_BLOCKED"));
	assert_eq!(err.message(), "Already on your list");
	assert_eq!(before, after);
}

#[tokio::test]
async fn forbidden_sync_yields_explicit_empty_snapshot() {
	let (test, _) = build_scripted_broker(
		signed_in_provider(),
		ScriptedTransport::default().with_session().on(
			HttpMethod::Get,
			LIST_PATH,
			ScriptedReply::json(403, json!({"detail": "Upgrade to use the blacklist"})),
		),
	);
	let snapshot =
		test.broker.blacklist().sync().await.expect("Plan restrictions are not errors.");

	assert!(snapshot.entries().is_empty());
	assert_eq!(snapshot.count(), 0);

	let stored = test
		.store
		.get(keys::BLACKLIST_CACHE)
		.await
		.expect("Reading the stored snapshot should succeed.")
		.expect("Empty snapshot should be persisted.");

	assert_eq!(stored["count"], json!(0));
	assert_eq!(stored["entries"], json!([]));
}

#[tokio::test]
async fn failed_sync_keeps_previous_snapshot() {
	let (test, _) = build_scripted_broker(
		signed_in_provider(),
		ScriptedTransport::default()
			.with_session()
			.on(
				HttpMethod::Get,
				LIST_PATH,
				ScriptedReply::json(200, json!([entry_json("e1", "Jane Doe", "2025-01-01T00:00:00Z")])),
			)
			.on(HttpMethod::Get, LIST_PATH, ScriptedReply::Unreachable),
	);
	let cache = test.broker.blacklist();
	let first = cache.sync().await.expect("First sync should succeed.");
	let err = cache.sync().await.expect_err("Unreachable backend must surface.");

	assert_eq!(err.kind(), "BACKEND_UNREACHABLE");
	assert_eq!(
		cache.snapshot().await.expect("Reading the snapshot should succeed."),
		Some(first)
	);
}

#[tokio::test]
async fn synced_at_never_moves_backwards() {
	let (test, _) = build_scripted_broker(
		signed_in_provider(),
		ScriptedTransport::default().with_session().on(
			HttpMethod::Get,
			LIST_PATH,
			ScriptedReply::json(
				200,
				json!({"entries": [
					entry_json("old", "Old Entry", "2024-01-01T00:00:00Z"),
					entry_json("new", "New Entry", "2025-01-01T00:00:00Z")
				]}),
			),
		),
	);
	let future = macros::datetime!(2999-01-01 00:00 UTC);
	let seeded = BlacklistCacheSnapshot::empty(future);

	test.store
		.set(keys::BLACKLIST_CACHE, serde_json::to_value(&seeded).expect("Seed should serialize."))
		.await
		.expect("Seeding the snapshot should succeed.");

	let snapshot = test.broker.blacklist().sync().await.expect("Sync should succeed.");

	assert_eq!(snapshot.synced_at(), future);
	assert_eq!(snapshot.count(), 2);
	assert_eq!(snapshot.entries()[0].id.as_ref(), "new");

	let again = test.broker.blacklist().sync().await.expect("Second sync should succeed.");

	assert!(again.synced_at() >= snapshot.synced_at());
}

#[tokio::test]
async fn add_without_snapshot_resyncs() {
	let (test, transport) = build_scripted_broker(
		signed_in_provider(),
		ScriptedTransport::default()
			.with_session()
			.on(
				HttpMethod::Post,
				LIST_PATH,
				ScriptedReply::json(201, entry_json("e9", "Fresh", "2025-05-01T00:00:00Z")),
			)
			.on(
				HttpMethod::Get,
				LIST_PATH,
				ScriptedReply::json(200, json!([entry_json("e9", "Fresh", "2025-05-01T00:00:00Z")])),
			),
	);
	let cache = test.broker.blacklist();

	cache.add("Fresh", None).await.expect("Add should succeed.");

	let snapshot = cache
		.snapshot()
		.await
		.expect("Reading the snapshot should succeed.")
		.expect("Resync should have stored a snapshot.");

	assert_eq!(transport.calls(HttpMethod::Get, LIST_PATH), 1);
	assert!(snapshot.contains(&entry_id("e9")));
}

#[tokio::test]
async fn inconsistent_stored_snapshot_is_replaced() {
	let (test, transport) = build_scripted_broker(
		signed_in_provider(),
		ScriptedTransport::default()
			.with_session()
			.on(HttpMethod::Get, LIST_PATH, ScriptedReply::json(200, json!([]))),
	);

	test.store
		.set(
			keys::BLACKLIST_CACHE,
			json!({"entries": [], "count": 3, "syncedAt": "2025-01-01T00:00:00Z"}),
		)
		.await
		.expect("Seeding the snapshot should succeed.");

	let snapshot = test.broker.blacklist().read().await.expect("Read should resync.");

	assert_eq!(snapshot.count(), 0);
	assert_eq!(transport.calls(HttpMethod::Get, LIST_PATH), 1);
}

#[tokio::test]
async fn concurrent_adds_keep_both_local_updates() {
	let (test, transport) = build_scripted_broker(
		signed_in_provider(),
		ScriptedTransport::default()
			.with_session()
			.on(HttpMethod::Get, LIST_PATH, ScriptedReply::json(200, json!([])))
			.on(
				HttpMethod::Post,
				LIST_PATH,
				ScriptedReply::json(201, entry_json("a1", "First Bot", "2025-04-01T00:00:00Z")),
			)
			.on(
				HttpMethod::Post,
				LIST_PATH,
				ScriptedReply::json(201, entry_json("a2", "Second Bot", "2025-04-02T00:00:00Z")),
			),
	);
	let cache = test.broker.blacklist();

	cache.sync().await.expect("Initial sync should succeed.");

	let (first, second) = tokio::join!(cache.add("First Bot", None), cache.add("Second Bot", None));

	first.expect("First add should succeed.");
	second.expect("Second add should succeed.");

	let snapshot = cache
		.snapshot()
		.await
		.expect("Reading the snapshot should succeed.")
		.expect("Snapshot should exist after both adds.");

	assert!(snapshot.contains(&entry_id("a1")));
	assert!(snapshot.contains(&entry_id("a2")));
	assert_eq!(snapshot.count(), 2);
	assert_eq!(transport.calls(HttpMethod::Get, LIST_PATH), 1);
}

#[tokio::test]
async fn removing_an_id_missing_locally_replaces_the_stale_snapshot() {
	let (test, transport) = build_scripted_broker(
		signed_in_provider(),
		ScriptedTransport::default()
			.with_session()
			.on(
				HttpMethod::Get,
				LIST_PATH,
				ScriptedReply::json(200, json!([entry_json("a", "Only Local", "2025-01-01T00:00:00Z")])),
			)
			.on(
				HttpMethod::Get,
				LIST_PATH,
				ScriptedReply::json(200, json!([entry_json("b", "Fresh", "2025-05-01T00:00:00Z")])),
			)
			.on(HttpMethod::Delete, "/api/blacklist/zz", ScriptedReply::status(204)),
	);
	let cache = test.broker.blacklist();

	cache.sync().await.expect("Initial sync should succeed.");
	cache.remove(&entry_id("zz")).await.expect("Backend removal should succeed.");

	let snapshot = cache.read().await.expect("Read should succeed.");

	assert_eq!(transport.calls(HttpMethod::Get, LIST_PATH), 2);
	assert!(!snapshot.contains(&entry_id("a")));
	assert!(snapshot.contains(&entry_id("b")));
	assert_eq!(snapshot.count(), 1);
}

#[tokio::test]
async fn confirmed_add_survives_a_failed_local_write() {
	let store = Arc::new(FlakyStore::default());
	let (broker, transport) = build_scripted_broker_with_store(
		store.clone(),
		ScriptedTransport::default()
			.with_session()
			.on(
				HttpMethod::Get,
				LIST_PATH,
				ScriptedReply::json(200, json!([entry_json("a", "Old", "2025-01-01T00:00:00Z")])),
			)
			.on(
				HttpMethod::Get,
				LIST_PATH,
				ScriptedReply::json(
					200,
					json!([
						entry_json("e9", "New", "2025-06-01T00:00:00Z"),
						entry_json("a", "Old", "2025-01-01T00:00:00Z")
					]),
				),
			)
			.on(
				HttpMethod::Post,
				LIST_PATH,
				ScriptedReply::json(201, entry_json("e9", "New", "2025-06-01T00:00:00Z")),
			),
	);
	let cache = broker.blacklist();

	cache.sync().await.expect("Initial sync should succeed.");
	store.fail_writes(true);

	let entry = cache
		.add("New", None)
		.await
		.expect("A backend-confirmed add must not be reported as failed.");

	assert_eq!(entry.id, entry_id("e9"));
	assert!(
		!store.inner().contains(keys::BLACKLIST_CACHE),
		"A snapshot that could not be updated must be dropped."
	);

	store.fail_writes(false);

	let snapshot = cache.read().await.expect("Read should resync.");

	assert!(snapshot.contains(&entry_id("e9")));
	assert_eq!(snapshot.count(), 2);
	assert_eq!(transport.calls(HttpMethod::Post, LIST_PATH), 1);
}
