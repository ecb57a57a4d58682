//! Identity-token → session-credential exchange.
//!
//! [`SessionExchanger::credential`] acquires an identity token without prompting, posts it to
//! the identity verification route, then to the login route, and extracts the backend session
//! credential. Nothing is cached: every call repeats the handshake because the backend may
//! rotate session validity independently of the identity token. The exchanger never retries;
//! when it runs inside a dispatcher attempt the dispatcher's retry budget covers it.

// crates.io
use serde_json::{Value, json};
// self
use crate::{
	_prelude::*,
	auth::{
		AnonymizedUserId, IdentityToken, Plan, SessionCredential, TokenProvider, UserContext,
	},
	backend::{self, BackendDescriptor, Endpoint, ErrorDetail, HttpMethod},
	error::{TransientError, TransportError},
	http::{BackendRequest, BackendTransport},
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
};

/// Outcome of a successful exchange.
#[derive(Clone, Debug)]
pub struct SessionGrant {
	/// Backend bearer credential.
	pub credential: SessionCredential,
	/// Identity token the credential was exchanged for.
	pub identity: IdentityToken,
	/// User profile reported by the backend, when it sent one.
	pub profile: Option<UserContext>,
}

const CREDENTIAL_KEYS: [&str; 3] = ["access_token", "token", "session_token"];
const USER_ID_KEYS: [&str; 3] = ["anonymized_user_id", "anonymizedUserId", "user_id"];

#[derive(Debug, Deserialize)]
struct LoginCredential {
	access_token: String,
}

// Only the credential is mandatory; the first key present wins.
fn login_credential(mut login: Value) -> Result<SessionCredential> {
	let token = login
		.as_object_mut()
		.and_then(|map| CREDENTIAL_KEYS.iter().find_map(|key| map.remove(*key)));

	if let (Some(token), Some(map)) = (token, login.as_object_mut()) {
		map.insert("access_token".into(), token);
	}

	let LoginCredential { access_token } = backend::decode_value(Endpoint::LOGIN.name, login)?;

	Ok(SessionCredential::new(access_token))
}

// Profiles are optional; anything that does not look like one is ignored.
fn profile_from(fields: &Value) -> Option<UserContext> {
	let id = USER_ID_KEYS.iter().find_map(|key| match fields.get(key)? {
		Value::String(s) => AnonymizedUserId::new(s).ok(),
		Value::Number(n) => AnonymizedUserId::new(n.to_string()).ok(),
		_ => None,
	})?;
	let plan = fields
		.get("plan")
		.and_then(Value::as_str)
		.and_then(|label| label.parse::<Plan>().ok())
		.unwrap_or_default();

	Some(UserContext::new(id, plan))
}

/// Exchanges identity tokens for backend session credentials.
#[derive(Clone)]
pub struct SessionExchanger {
	provider: Arc<dyn TokenProvider>,
	transport: Arc<dyn BackendTransport>,
	descriptor: Arc<BackendDescriptor>,
	timeout: Duration,
}
impl SessionExchanger {
	/// Creates an exchanger; `timeout` applies to each of the two exchange calls.
	pub fn new(
		provider: Arc<dyn TokenProvider>,
		transport: Arc<dyn BackendTransport>,
		descriptor: Arc<BackendDescriptor>,
		timeout: Duration,
	) -> Self {
		Self { provider, transport, descriptor, timeout }
	}

	/// Token provider the exchanger acquires from.
	pub fn provider(&self) -> &Arc<dyn TokenProvider> {
		&self.provider
	}

	/// Acquires an identity token without prompting.
	///
	/// Fails with [`Error::NotAuthenticated`] when the host has nothing to offer; no network
	/// call is attempted in that case.
	pub async fn identity(&self) -> Result<IdentityToken> {
		match self.provider.acquire(false).await {
			Ok(Some(token)) => Ok(token),
			_ => Err(Error::NotAuthenticated),
		}
	}

	/// Acquires (non-interactively) and exchanges an identity token.
	pub async fn credential(&self) -> Result<SessionGrant> {
		let identity = self.identity().await?;

		self.exchange(identity).await
	}

	/// Prompts the user if needed, then exchanges the resulting identity token.
	pub async fn sign_in(&self) -> Result<SessionGrant> {
		let identity = self.provider.acquire(true).await?.ok_or_else(|| Error::AuthCancelled {
			reason: "The host returned no identity token".into(),
		})?;

		self.exchange(identity).await
	}

	/// Runs verification + login for the provided identity token.
	pub async fn exchange(&self, identity: IdentityToken) -> Result<SessionGrant> {
		const KIND: OperationKind = OperationKind::Exchange;

		let span = OperationSpan::new(KIND, "exchange");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result = span
			.instrument(async move {
				let verify = Endpoint::verify(&self.descriptor.identity_provider);
				let verified = self.post_identity(&verify, &identity).await?;
				let login_body = self.post_identity(&Endpoint::LOGIN, &identity).await?;
				let login: Value = backend::decode_slice(Endpoint::LOGIN.name, &login_body)?;
				let profile = login
					.get("user")
					.and_then(profile_from)
					.or_else(|| profile_from(&login))
					.or_else(|| {
						serde_json::from_slice::<Value>(&verified).ok().as_ref().and_then(profile_from)
					});
				let credential = login_credential(login)?;

				Ok(SessionGrant { credential, identity, profile })
			})
			.await;

		match &result {
			Ok(_) => obs::record_operation_outcome(KIND, OperationOutcome::Success),
			Err(_) => obs::record_operation_outcome(KIND, OperationOutcome::Failure),
		}

		result
	}

	async fn post_identity(&self, endpoint: &Endpoint, identity: &IdentityToken) -> Result<Vec<u8>> {
		let url = self.descriptor.url_for(endpoint)?;
		let request = BackendRequest::new(HttpMethod::Post, url, self.timeout)
			.with_body(json!({ "token": identity.expose() }));
		let response = self.transport.execute(request).await.map_err(|err| match err {
			TransportError::Timeout =>
				Error::from(TransientError::Timeout { endpoint: endpoint.name, after: self.timeout }),
			source => TransientError::Unreachable { endpoint: endpoint.name, source }.into(),
		})?;

		if response.is_success() {
			return Ok(response.body);
		}

		let detail = ErrorDetail::from_body(&response.body);

		if response.status >= 500 {
			Err(TransientError::ServerError { endpoint: endpoint.name, status: response.status, detail }
				.into())
		} else {
			Err(Error::BackendRejected { status: response.status, detail })
		}
	}
}
impl Debug for SessionExchanger {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionExchanger")
			.field("descriptor", &self.descriptor)
			.field("timeout", &self.timeout)
			.finish()
	}
}
