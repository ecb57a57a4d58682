//! Background session broker for browser-extension style runtimes: identity-token exchange,
//! retrying backend dispatch, fail-open quota checks, and a locally cached blacklist, all
//! reachable through one message router.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod backend;
pub mod broker;
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod ext;
pub mod http;
pub mod obs;
pub mod quota;
pub mod router;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::{
		collections::VecDeque,
		sync::atomic::{AtomicBool, Ordering},
	};
	// crates.io
	use serde_json::{Value, json};
	// self
	use crate::{
		auth::{IdentityProviderId, IdentityToken, MemoryTokenProvider},
		backend::{BackendDescriptor, HttpMethod},
		broker::Broker,
		config::BrokerConfig,
		dispatch::{SleepFuture, Sleeper},
		error::TransportError,
		ext::{AnalyticsEvent, AnalyticsSink},
		http::{BackendRequest, BackendResponse, BackendTransport, TransportFuture},
		store::{LocalStore, MemoryStore, StoreError, StoreFuture},
	};

	/// Identity token seeded into test providers.
	pub const TEST_IDENTITY: &str = "identity-token";
	/// Session credential returned by [`ScriptedTransport::with_session`].
	pub const TEST_SESSION: &str = "session-token";
	/// Anonymized user returned by [`ScriptedTransport::with_session`].
	pub const TEST_USER: &str = "anon-test";

	/// One scripted transport outcome.
	#[derive(Clone, Debug)]
	pub enum ScriptedReply {
		/// Backend answers with this response.
		Respond(BackendResponse),
		/// The request times out.
		Timeout,
		/// The connection fails.
		Unreachable,
	}
	impl ScriptedReply {
		/// JSON response with the given status.
		pub fn json(status: u16, body: Value) -> Self {
			Self::Respond(BackendResponse::json(status, &body))
		}

		/// Empty-body response with the given status.
		pub fn status(status: u16) -> Self {
			Self::Respond(BackendResponse::new(status, Vec::new()))
		}
	}

	#[derive(Debug, Default)]
	struct Script {
		routes: HashMap<(HttpMethod, String), VecDeque<ScriptedReply>>,
		requests: Vec<BackendRequest>,
	}

	/// In-process transport answering from per-route queues.
	///
	/// Each route pops its queued replies in order and repeats the last one once the queue is
	/// down to a single reply. Unscripted routes answer `404`. Every request is recorded.
	#[derive(Debug, Default)]
	pub struct ScriptedTransport(Mutex<Script>);
	impl ScriptedTransport {
		/// Queues `reply` for `method path` (path without query).
		pub fn on(self, method: HttpMethod, path: &str, reply: ScriptedReply) -> Self {
			self.0.lock().routes.entry((method, path.to_owned())).or_default().push_back(reply);

			self
		}

		/// Scripts a successful verify + login handshake for the `google` provider.
		pub fn with_session(self) -> Self {
			self.on(HttpMethod::Post, "/api/users/verify-google", ScriptedReply::json(200, json!({})))
				.on(
					HttpMethod::Post,
					"/api/auth/login",
					ScriptedReply::json(
						200,
						json!({
							"access_token": TEST_SESSION,
							"user": { "anonymized_user_id": TEST_USER, "plan": "FREE" }
						}),
					),
				)
		}

		/// Every request executed so far.
		pub fn requests(&self) -> Vec<BackendRequest> {
			self.0.lock().requests.clone()
		}

		/// Number of requests sent to `method path`.
		pub fn calls(&self, method: HttpMethod, path: &str) -> usize {
			self.0
				.lock()
				.requests
				.iter()
				.filter(|request| request.method == method && request.url.path() == path)
				.count()
		}

		fn next(&self, request: &BackendRequest) -> ScriptedReply {
			let mut script = self.0.lock();

			script.requests.push(request.clone());

			let key = (request.method, request.url.path().to_owned());

			match script.routes.get_mut(&key) {
				Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(ScriptedReply::status(404)),
				Some(queue) => queue.front().cloned().unwrap_or(ScriptedReply::status(404)),
				None => ScriptedReply::status(404),
			}
		}
	}
	impl BackendTransport for ScriptedTransport {
		fn execute(&self, request: BackendRequest) -> TransportFuture<'_> {
			let reply = self.next(&request);

			Box::pin(async move {
				match reply {
					ScriptedReply::Respond(response) => Ok(response),
					ScriptedReply::Timeout => Err(TransportError::Timeout),
					ScriptedReply::Unreachable => Err(TransportError::Io(std::io::Error::new(
						std::io::ErrorKind::ConnectionRefused,
						"scripted connection failure",
					))),
				}
			})
		}
	}

	/// Sleeper that records requested waits and returns immediately.
	#[derive(Debug, Default)]
	pub struct RecordingSleeper(Mutex<Vec<Duration>>);
	impl RecordingSleeper {
		/// Waits requested so far.
		pub fn waits(&self) -> Vec<Duration> {
			self.0.lock().clone()
		}
	}
	impl Sleeper for RecordingSleeper {
		fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
			self.0.lock().push(duration);

			Box::pin(async {})
		}
	}

	/// Analytics sink that keeps every event.
	#[derive(Debug, Default)]
	pub struct RecordingAnalytics(Mutex<Vec<AnalyticsEvent>>);
	impl RecordingAnalytics {
		/// Names of the recorded events, in order.
		pub fn names(&self) -> Vec<String> {
			self.0.lock().iter().map(|event| event.name.clone()).collect()
		}

		/// Recorded events, in order.
		pub fn events(&self) -> Vec<AnalyticsEvent> {
			self.0.lock().clone()
		}
	}
	impl AnalyticsSink for RecordingAnalytics {
		fn record(&self, event: AnalyticsEvent) {
			self.0.lock().push(event);
		}
	}

	/// Memory store whose writes can be switched to fail; reads and removals always work.
	#[derive(Debug, Default)]
	pub struct FlakyStore {
		inner: MemoryStore,
		fail_writes: AtomicBool,
	}
	impl FlakyStore {
		/// Makes subsequent `set` calls fail (or succeed again).
		pub fn fail_writes(&self, fail: bool) {
			self.fail_writes.store(fail, Ordering::SeqCst);
		}

		/// Backing memory store.
		pub fn inner(&self) -> &MemoryStore {
			&self.inner
		}
	}
	impl LocalStore for FlakyStore {
		fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Value>> {
			self.inner.get(key)
		}

		fn set<'a>(&'a self, key: &'a str, value: Value) -> StoreFuture<'a, ()> {
			if self.fail_writes.load(Ordering::SeqCst) {
				return Box::pin(async {
					Err(StoreError::Backend { message: "scripted write failure".into() })
				});
			}

			self.inner.set(key, value)
		}

		fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
			self.inner.remove(key)
		}
	}

	/// Broker plus handles to every in-memory collaborator behind it.
	#[derive(Debug)]
	pub struct TestBroker {
		/// Broker under test.
		pub broker: Broker,
		/// Backing store.
		pub store: Arc<MemoryStore>,
		/// Host token provider.
		pub provider: Arc<MemoryTokenProvider>,
		/// Retry sleeper.
		pub sleeper: Arc<RecordingSleeper>,
		/// Analytics sink.
		pub analytics: Arc<RecordingAnalytics>,
	}

	/// Provider whose host cache already holds [`TEST_IDENTITY`].
	pub fn signed_in_provider() -> MemoryTokenProvider {
		MemoryTokenProvider::default().with_cached(IdentityToken::new(TEST_IDENTITY))
	}

	/// Configuration pointing at `base_url` with the `google` identity provider.
	pub fn test_config(base_url: &str) -> BrokerConfig {
		let descriptor = BackendDescriptor::builder(
			Url::parse(base_url).expect("Test backend URL should parse."),
		)
		.identity_provider(
			IdentityProviderId::new("google").expect("Identity provider fixture should be valid."),
		)
		.build()
		.expect("Test backend descriptor should validate.");

		BrokerConfig::new(descriptor)
	}

	/// Builds a broker over in-memory collaborators and the provided transport.
	pub fn build_test_broker(
		base_url: &str,
		provider: MemoryTokenProvider,
		transport: Arc<dyn BackendTransport>,
	) -> TestBroker {
		let store = Arc::new(MemoryStore::default());
		let provider = Arc::new(provider);
		let sleeper = Arc::new(RecordingSleeper::default());
		let analytics = Arc::new(RecordingAnalytics::default());
		let broker =
			Broker::with_transport(test_config(base_url), provider.clone(), transport, store.clone())
				.expect("Test broker configuration should validate.")
				.with_sleeper(sleeper.clone())
				.with_analytics(analytics.clone());

		TestBroker { broker, store, provider, sleeper, analytics }
	}

	/// Builds a broker over a [`ScriptedTransport`] rooted at `https://api.test` and the provided
	/// store.
	pub fn build_scripted_broker_with_store(
		store: Arc<dyn LocalStore>,
		transport: ScriptedTransport,
	) -> (Broker, Arc<ScriptedTransport>) {
		let transport = Arc::new(transport);
		let broker = Broker::with_transport(
			test_config("https://api.test"),
			Arc::new(signed_in_provider()),
			transport.clone(),
			store,
		)
		.expect("Test broker configuration should validate.")
		.with_sleeper(Arc::new(RecordingSleeper::default()));

		(broker, transport)
	}

	/// Builds a broker over a [`ScriptedTransport`] rooted at `https://api.test`.
	pub fn build_scripted_broker(
		provider: MemoryTokenProvider,
		transport: ScriptedTransport,
	) -> (TestBroker, Arc<ScriptedTransport>) {
		let transport = Arc::new(transport);
		let broker = build_test_broker("https://api.test", provider, transport.clone());

		(broker, transport)
	}

	/// Builds a reqwest transport that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	#[cfg(feature = "reqwest")]
	pub fn test_reqwest_transport() -> crate::http::ReqwestTransport {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		crate::http::ReqwestTransport::with_client(client)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
