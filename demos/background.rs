//! Runs the broker against a mocked backend: sign in, check quota, then add and list blacklist
//! entries through the message router, printing each reply.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
use url::Url;
// self
use session_broker::{
	auth::{IdentityProviderId, IdentityToken, InteractiveGrant, MemoryTokenProvider},
	backend::BackendDescriptor,
	broker::Broker,
	config::BrokerConfig,
	router::Message,
	store::MemoryStore,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/users/verify-google");
			then.status(200).header("content-type", "application/json").body("{}");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/login");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-session\",\"user\":{\"anonymized_user_id\":\"anon-demo\",\"plan\":\"FREE\"}}",
			);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/users/quota-status");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"remaining\":4,\"daily_limit\":5,\"plan\":\"FREE\"}");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/blacklist");
			then.status(200).header("content-type", "application/json").body("[]");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/blacklist");
			then.status(201).header("content-type", "application/json").body(
				"{\"id\":\"e1\",\"blocked_name\":\"Jane Doe\",\"blocked_profile_url\":null,\"created_at\":\"2025-01-01T00:00:00Z\"}",
			);
		})
		.await;

	let descriptor = BackendDescriptor::builder(Url::parse(&server.base_url())?)
		.identity_provider(IdentityProviderId::new("google")?)
		.build()?;
	let provider = MemoryTokenProvider::default()
		.with_interactive(InteractiveGrant::Grant(IdentityToken::new("demo-identity")));
	let broker = Broker::new(
		BrokerConfig::new(descriptor),
		Arc::new(provider),
		Arc::new(MemoryStore::default()),
	)?;
	let router = broker.router();

	for message in [
		Message::new("signIn"),
		Message::new("checkQuota"),
		Message::new("getBlacklist"),
		Message::new("addToBlacklist").with_data(json!({ "name": "Jane Doe" })),
		Message::new("getBlacklist"),
		Message::new("openSettings"),
	] {
		let action = message.action.clone();
		let reply = router.request(message).await?;

		println!("{action}: {reply}");
	}

	Ok(())
}
