//! Transport primitives for backend calls.
//!
//! The module exposes [`BackendTransport`], the broker's only dependency on an HTTP stack,
//! together with the owned [`BackendRequest`] / [`BackendResponse`] values that cross it.
//! Transports execute exactly one request per call and report timeouts distinctly through
//! [`TransportError::Timeout`]; classification and retries live in the dispatcher.

// crates.io
use serde_json::Value;
#[cfg(feature = "reqwest")] use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
// self
use crate::{_prelude::*, backend::HttpMethod, error::TransportError};

/// Boxed future returned by [`BackendTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<BackendResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing backend requests.
///
/// Implementations must be `Send + Sync + 'static` so they can be shared behind `Arc`
/// by every component of a [`Broker`](crate::broker::Broker), and must enforce
/// [`BackendRequest::timeout`] by aborting the call.
pub trait BackendTransport
where
	Self: 'static + Send + Sync,
{
	/// Executes a single request.
	fn execute(&self, request: BackendRequest) -> TransportFuture<'_>;
}

/// Fully resolved outbound request.
#[derive(Clone)]
pub struct BackendRequest {
	/// HTTP method.
	pub method: HttpMethod,
	/// Absolute URL including any query parameters.
	pub url: Url,
	/// Pre-formatted `Authorization` header value.
	pub authorization: Option<String>,
	/// JSON body, if the method carries one.
	pub body: Option<Value>,
	/// Per-attempt timeout.
	pub timeout: Duration,
}
impl BackendRequest {
	/// Creates a request without credentials or body.
	pub fn new(method: HttpMethod, url: Url, timeout: Duration) -> Self {
		Self { method, url, authorization: None, body: None, timeout }
	}

	/// Attaches an `Authorization` header value.
	pub fn with_authorization(mut self, value: impl Into<String>) -> Self {
		self.authorization = Some(value.into());

		self
	}

	/// Attaches a JSON body.
	pub fn with_body(mut self, body: Value) -> Self {
		self.body = Some(body);

		self
	}
}
impl Debug for BackendRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BackendRequest")
			.field("method", &self.method)
			.field("url", &self.url.as_str())
			.field("authorization", &self.authorization.as_ref().map(|_| "<redacted>"))
			.field("body", &self.body)
			.field("timeout", &self.timeout)
			.finish()
	}
}

/// Raw backend response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response body bytes.
	pub body: Vec<u8>,
}
impl BackendResponse {
	/// Creates a response from a status and body.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, body: body.into() }
	}

	/// Creates a response whose body is the serialized JSON value.
	pub fn json(status: u16, body: &Value) -> Self {
		Self { status, body: body.to_string().into_bytes() }
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Backend routes answer directly; configure any custom client to disable redirect following
/// so bearer credentials never leak to another origin.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client that never follows redirects.
	pub fn new() -> Result<Self, crate::error::ConfigError> {
		let client =
			ReqwestClient::builder().redirect(reqwest::redirect::Policy::none()).build()?;

		Ok(Self(client))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl BackendTransport for ReqwestTransport {
	fn execute(&self, request: BackendRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let method = match request.method {
				HttpMethod::Get => reqwest::Method::GET,
				HttpMethod::Post => reqwest::Method::POST,
				HttpMethod::Delete => reqwest::Method::DELETE,
			};
			let mut builder = client.request(method, request.url).timeout(request.timeout);

			if let Some(value) = request.authorization {
				builder = builder.header(AUTHORIZATION, value);
			}
			if let Some(body) = request.body {
				builder = builder.header(CONTENT_TYPE, "application/json").json(&body);
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let body = response.bytes().await?.to_vec();

			Ok(BackendResponse { status, body })
		})
	}
}
