//! Authenticated backend requests with timeout, retry, and error classification.
//!
//! [`RequestDispatcher::send`] resolves a fresh session credential for every attempt, attaches
//! the stored attribution fields, and classifies the outcome:
//!
//! | Outcome | Result |
//! | --- | --- |
//! | 2xx | JSON body (`null` when empty) |
//! | 401 | identity token invalidated once, [`Error::AuthRequired`] |
//! | 403 | [`Error::FeatureNotEntitled`] |
//! | 404 | [`Error::EndpointMissing`], logged as a defect |
//! | 5xx, network failure, timeout | retried while the budget lasts |
//! | anything else | [`Error::UnexpectedStatus`] |

mod metrics;
pub mod retry;

pub use metrics::*;
pub use retry::*;

// crates.io
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	auth::{IdentityToken, SessionExchanger, SessionGrant, UserContext},
	backend::{BackendDescriptor, Endpoint, ErrorDetail},
	error::{TransientError, TransportError},
	http::{BackendRequest, BackendTransport},
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
	store::LocalStore,
};

const ATTR_USER_ID: &str = "anonymizedUserId";
const ATTR_PLAN: &str = "plan";

/// Issues authenticated backend calls on behalf of every broker component.
#[derive(Clone)]
pub struct RequestDispatcher {
	exchanger: SessionExchanger,
	transport: Arc<dyn BackendTransport>,
	descriptor: Arc<BackendDescriptor>,
	store: Arc<dyn LocalStore>,
	policy: RetryPolicy,
	sleeper: Arc<dyn Sleeper>,
	metrics: Arc<DispatchMetrics>,
}
impl RequestDispatcher {
	/// Creates a dispatcher that waits with [`TokioSleeper`].
	pub fn new(
		exchanger: SessionExchanger,
		transport: Arc<dyn BackendTransport>,
		descriptor: Arc<BackendDescriptor>,
		store: Arc<dyn LocalStore>,
		policy: RetryPolicy,
	) -> Self {
		Self {
			exchanger,
			transport,
			descriptor,
			store,
			policy,
			sleeper: Arc::new(TokioSleeper),
			metrics: Default::default(),
		}
	}

	/// Replaces the sleeper used between attempts.
	pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
		self.sleeper = sleeper;

		self
	}

	/// Retry policy in effect.
	pub fn policy(&self) -> &RetryPolicy {
		&self.policy
	}

	/// Counters shared by every clone of this dispatcher.
	pub fn metrics(&self) -> &DispatchMetrics {
		&self.metrics
	}

	/// Sends `payload` to `endpoint` and returns the decoded JSON response.
	pub async fn send(&self, endpoint: &Endpoint, payload: Option<Value>) -> Result<Value> {
		const KIND: OperationKind = OperationKind::Dispatch;

		let span = OperationSpan::new(KIND, endpoint.name);

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result = span.instrument(self.send_with_retry(endpoint, payload.as_ref())).await;

		match &result {
			Ok(_) => {
				self.metrics.record_success();
				obs::record_operation_outcome(KIND, OperationOutcome::Success);
			},
			Err(_) => {
				self.metrics.record_failure();
				obs::record_operation_outcome(KIND, OperationOutcome::Failure);
			},
		}

		result
	}

	async fn send_with_retry(&self, endpoint: &Endpoint, payload: Option<&Value>) -> Result<Value> {
		let max_attempts = self.policy.max_attempts.max(1);
		let mut attempt = 1;

		loop {
			self.metrics.record_attempt();

			match self.attempt(endpoint, payload).await {
				Err(e) if e.is_retryable() && attempt < max_attempts => {
					let wait = self.policy.backoff(attempt);

					obs::retry_scheduled(endpoint.name, attempt, wait, &e);
					obs::record_retry(endpoint.name);
					self.metrics.record_retry();
					self.sleeper.sleep(wait).await;

					attempt += 1;
				},
				outcome => return outcome,
			}
		}
	}

	async fn attempt(&self, endpoint: &Endpoint, payload: Option<&Value>) -> Result<Value> {
		let grant = self.resolve_grant().await?;
		let attribution = match UserContext::load(self.store.as_ref()).await? {
			Some(context) => Some(context),
			None => grant.profile.clone(),
		};
		let timeout = endpoint.timeout(&self.policy);
		let mut url = self.descriptor.url_for(endpoint)?;
		let mut request = if endpoint.method.carries_body() {
			let body = attach_to_body(payload, attribution.as_ref());

			BackendRequest::new(endpoint.method, url, timeout).with_body(body)
		} else {
			attach_to_query(&mut url, payload, attribution.as_ref());

			BackendRequest::new(endpoint.method, url, timeout)
		};

		request = request.with_authorization(grant.credential.bearer());

		let response = self.transport.execute(request).await.map_err(|err| match err {
			TransportError::Timeout =>
				Error::from(TransientError::Timeout { endpoint: endpoint.name, after: timeout }),
			source => TransientError::Unreachable { endpoint: endpoint.name, source }.into(),
		})?;

		match response.status {
			200..=299 => decode_body(endpoint.name, &response.body),
			401 => {
				self.forget_identity(&grant.identity).await;

				Err(Error::AuthRequired)
			},
			403 => Err(Error::FeatureNotEntitled { detail: ErrorDetail::from_body(&response.body) }),
			404 => {
				obs::endpoint_missing(endpoint.name, &endpoint.path);

				Err(Error::EndpointMissing { endpoint: endpoint.name })
			},
			status @ 500..=599 => Err(TransientError::ServerError {
				endpoint: endpoint.name,
				status,
				detail: ErrorDetail::from_body(&response.body),
			}
			.into()),
			status =>
				Err(Error::UnexpectedStatus { status, detail: ErrorDetail::from_body(&response.body) }),
		}
	}

	async fn resolve_grant(&self) -> Result<SessionGrant> {
		let identity = match self.exchanger.identity().await {
			Ok(identity) => identity,
			Err(Error::NotAuthenticated) => return Err(Error::AuthRequired),
			Err(e) => return Err(e),
		};
		let rejected_identity = identity.clone();

		match self.exchanger.exchange(identity).await {
			Err(Error::BackendRejected { status: 401 | 403, .. }) => {
				self.forget_identity(&rejected_identity).await;

				Err(Error::AuthRequired)
			},
			other => other,
		}
	}

	// The caller is told to sign in again whether or not the host forgets the token.
	async fn forget_identity(&self, identity: &IdentityToken) {
		if let Err(e) = self.exchanger.provider().invalidate(identity).await {
			obs::side_effect_failed(OperationKind::Dispatch, "invalidate_identity", &e);
		}
	}
}
impl Debug for RequestDispatcher {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestDispatcher")
			.field("descriptor", &self.descriptor)
			.field("policy", &self.policy)
			.field("metrics", &self.metrics)
			.finish()
	}
}

fn decode_body(endpoint: &'static str, body: &[u8]) -> Result<Value> {
	if body.iter().all(u8::is_ascii_whitespace) {
		return Ok(Value::Null);
	}

	crate::backend::decode_slice(endpoint, body)
}

fn attach_to_body(payload: Option<&Value>, context: Option<&UserContext>) -> Value {
	let mut body = match payload {
		Some(Value::Object(map)) => map.clone(),
		Some(other) => {
			let mut map = Map::new();

			map.insert("data".into(), other.clone());

			map
		},
		None => Map::new(),
	};

	if let Some(context) = context {
		body.entry(ATTR_USER_ID)
			.or_insert_with(|| Value::String(context.anonymized_user_id.to_string()));
		body.entry(ATTR_PLAN).or_insert_with(|| Value::String(context.plan.as_str().into()));
	}

	Value::Object(body)
}

fn attach_to_query(url: &mut Url, payload: Option<&Value>, context: Option<&UserContext>) {
	let mut pairs = Vec::new();

	if let Some(Value::Object(map)) = payload {
		for (key, value) in map {
			match value {
				Value::String(s) => pairs.push((key.clone(), s.clone())),
				Value::Number(_) | Value::Bool(_) => pairs.push((key.clone(), value.to_string())),
				_ => {},
			}
		}
	}
	if let Some(context) = context {
		if !pairs.iter().any(|(key, _)| key == ATTR_USER_ID) {
			pairs.push((ATTR_USER_ID.into(), context.anonymized_user_id.to_string()));
		}
		if !pairs.iter().any(|(key, _)| key == ATTR_PLAN) {
			pairs.push((ATTR_PLAN.into(), context.plan.as_str().into()));
		}
	}
	if !pairs.is_empty() {
		url.query_pairs_mut().extend_pairs(pairs);
	}
}
