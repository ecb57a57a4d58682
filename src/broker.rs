//! Process-scoped context object that wires every broker component together.

// self
use crate::{
	_prelude::*,
	auth::{SessionExchanger, TokenProvider},
	backend::BackendDescriptor,
	cache::BlacklistCache,
	config::BrokerConfig,
	dispatch::{RequestDispatcher, Sleeper},
	error::ConfigError,
	ext::{AnalyticsSink, NoopAnalytics},
	http::BackendTransport,
	quota::QuotaGateway,
	router::MessageRouter,
	store::LocalStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

/// Owns the shared collaborators and hands out components built on top of them.
///
/// Construct one per process and pass it (or clones, which share all state) to whatever needs
/// it. Tests build isolated instances with in-memory collaborators.
#[derive(Clone)]
pub struct Broker {
	/// Validated configuration.
	pub config: Arc<BrokerConfig>,
	/// Persistent key/value storage.
	pub store: Arc<dyn LocalStore>,
	/// Host identity token provider.
	pub provider: Arc<dyn TokenProvider>,
	/// Fire-and-forget analytics sink.
	pub analytics: Arc<dyn AnalyticsSink>,
	exchanger: SessionExchanger,
	dispatcher: RequestDispatcher,
	quota: QuotaGateway,
	cache: BlacklistCache,
}
impl Broker {
	/// Validates `config` and assembles every component over the provided collaborators.
	pub fn with_transport(
		config: BrokerConfig,
		provider: Arc<dyn TokenProvider>,
		transport: Arc<dyn BackendTransport>,
		store: Arc<dyn LocalStore>,
	) -> Result<Self, ConfigError> {
		config.validate()?;

		let descriptor: Arc<BackendDescriptor> = Arc::new(config.backend.clone());
		let exchanger = SessionExchanger::new(
			provider.clone(),
			transport.clone(),
			descriptor.clone(),
			config.retry.standard_timeout,
		);
		let dispatcher = RequestDispatcher::new(
			exchanger.clone(),
			transport,
			descriptor,
			store.clone(),
			config.retry.clone(),
		);
		let quota =
			QuotaGateway::new(dispatcher.clone(), store.clone(), config.quota_defaults.clone());
		let cache = BlacklistCache::new(dispatcher.clone(), store.clone());

		Ok(Self {
			config: Arc::new(config),
			store,
			provider,
			analytics: Arc::new(NoopAnalytics),
			exchanger,
			dispatcher,
			quota,
			cache,
		})
	}

	/// Replaces the analytics sink.
	pub fn with_analytics(mut self, analytics: Arc<dyn AnalyticsSink>) -> Self {
		self.analytics = analytics;

		self
	}

	/// Replaces the sleeper used between dispatcher retries.
	pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
		self.dispatcher = self.dispatcher.with_sleeper(sleeper);
		self.quota = QuotaGateway::new(
			self.dispatcher.clone(),
			self.store.clone(),
			self.config.quota_defaults.clone(),
		);
		self.cache = BlacklistCache::new(self.dispatcher.clone(), self.store.clone());

		self
	}

	/// Identity → session exchanger.
	pub fn exchanger(&self) -> &SessionExchanger {
		&self.exchanger
	}

	/// Shared request dispatcher.
	pub fn dispatcher(&self) -> &RequestDispatcher {
		&self.dispatcher
	}

	/// Quota accessor.
	pub fn quota(&self) -> &QuotaGateway {
		&self.quota
	}

	/// Blacklist cache.
	pub fn blacklist(&self) -> &BlacklistCache {
		&self.cache
	}

	/// Message router serving UI collaborators.
	pub fn router(&self) -> MessageRouter {
		MessageRouter::new(self.clone())
	}
}
#[cfg(feature = "reqwest")]
impl Broker {
	/// Creates a broker that talks to the backend through a fresh [`ReqwestTransport`].
	pub fn new(
		config: BrokerConfig,
		provider: Arc<dyn TokenProvider>,
		store: Arc<dyn LocalStore>,
	) -> Result<Self, ConfigError> {
		Self::with_transport(config, provider, Arc::new(ReqwestTransport::new()?), store)
	}
}
impl Debug for Broker {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Broker")
			.field("config", &self.config)
			.field("dispatcher", &self.dispatcher)
			.finish()
	}
}
