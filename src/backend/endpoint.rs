//! Backend routes, their methods, and per-route timeout classes.

// std
use std::borrow::Cow;
// self
use crate::{
	_prelude::*,
	auth::{EntryId, IdentityProviderId},
	dispatch::RetryPolicy,
};

/// HTTP methods used against the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
	/// `GET`.
	Get,
	/// `POST`.
	Post,
	/// `DELETE`.
	Delete,
}
impl HttpMethod {
	/// Returns the method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			HttpMethod::Get => "GET",
			HttpMethod::Post => "POST",
			HttpMethod::Delete => "DELETE",
		}
	}

	/// Whether attribution travels in the JSON body rather than the query string.
	pub const fn carries_body(self) -> bool {
		matches!(self, HttpMethod::Post)
	}
}
impl Display for HttpMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Per-endpoint timeout class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointClass {
	/// Interactive calls (auth, quota, blacklist).
	#[default]
	Standard,
	/// Long-running generation or scraping calls.
	Bulk,
}

/// A backend route the broker knows how to call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
	/// Stable label used in errors, spans, and metrics.
	pub name: &'static str,
	/// HTTP method.
	pub method: HttpMethod,
	/// Path relative to the backend base URL.
	pub path: Cow<'static, str>,
	/// Timeout class.
	pub class: EndpointClass,
}
impl Endpoint {
	/// `POST /api/auth/login`.
	pub const LOGIN: Self = Self::fixed("login", HttpMethod::Post, "/api/auth/login");
	/// `GET /api/users/quota-status`.
	pub const QUOTA_STATUS: Self =
		Self::fixed("quota_status", HttpMethod::Get, "/api/users/quota-status");
	/// `GET /api/blacklist`.
	pub const BLACKLIST_LIST: Self = Self::fixed("blacklist_list", HttpMethod::Get, "/api/blacklist");
	/// `POST /api/blacklist`.
	pub const BLACKLIST_CREATE: Self =
		Self::fixed("blacklist_create", HttpMethod::Post, "/api/blacklist");
	/// `POST /api/comments/generate`.
	pub const COMMENT_GENERATE: Self = Self {
		name: "comment_generate",
		method: HttpMethod::Post,
		path: Cow::Borrowed("/api/comments/generate"),
		class: EndpointClass::Bulk,
	};

	const fn fixed(name: &'static str, method: HttpMethod, path: &'static str) -> Self {
		Self { name, method, path: Cow::Borrowed(path), class: EndpointClass::Standard }
	}

	/// `POST /api/users/verify-<idp>`.
	pub fn verify(provider: &IdentityProviderId) -> Self {
		Self {
			name: "verify_identity",
			method: HttpMethod::Post,
			path: Cow::Owned(format!("/api/users/verify-{provider}")),
			class: EndpointClass::Standard,
		}
	}

	/// `DELETE /api/blacklist/<id>`, with the id percent-encoded as a single path segment.
	pub fn blacklist_delete(id: &EntryId) -> Self {
		let segment: String = url::form_urlencoded::byte_serialize(id.as_bytes()).collect();

		Self {
			name: "blacklist_delete",
			method: HttpMethod::Delete,
			path: Cow::Owned(format!("/api/blacklist/{segment}")),
			class: EndpointClass::Standard,
		}
	}

	/// Overrides the timeout class.
	pub fn with_class(mut self, class: EndpointClass) -> Self {
		self.class = class;

		self
	}

	/// Per-attempt timeout configured for this endpoint's class.
	pub fn timeout(&self, policy: &RetryPolicy) -> Duration {
		match self.class {
			EndpointClass::Standard => policy.standard_timeout,
			EndpointClass::Bulk => policy.bulk_timeout,
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn timeout_follows_endpoint_class() {
		let policy = RetryPolicy::default();

		assert_eq!(Endpoint::QUOTA_STATUS.timeout(&policy), Duration::from_secs(15));
		assert_eq!(Endpoint::COMMENT_GENERATE.timeout(&policy), Duration::from_secs(45));
		assert_eq!(
			Endpoint::QUOTA_STATUS.with_class(EndpointClass::Bulk).timeout(&policy),
			Duration::from_secs(45)
		);
	}

	#[test]
	fn dynamic_paths_embed_identifiers() {
		let id = EntryId::new("e-42").expect("Entry identifier fixture should be valid.");

		assert_eq!(Endpoint::blacklist_delete(&id).path, "/api/blacklist/e-42");
		assert_eq!(Endpoint::blacklist_delete(&id).method, HttpMethod::Delete);

		let odd = EntryId::new("a:b@c").expect("Entry identifier fixture should be valid.");

		assert_eq!(Endpoint::blacklist_delete(&odd).path, "/api/blacklist/a%3Ab%40c");
	}
}
