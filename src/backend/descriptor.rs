//! Validated backend location plus the builder used to assemble it.

// self
use crate::{
	_prelude::*,
	auth::IdentityProviderId,
	backend::Endpoint,
	error::ConfigError,
};

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum BackendDescriptorError {
	/// Base URL is mandatory.
	#[error("Missing backend base URL.")]
	MissingBaseUrl,
	/// Identity provider slug is mandatory.
	#[error("Missing identity provider.")]
	MissingIdentityProvider,
	/// Base URL cannot carry relative paths (e.g., `mailto:` or `data:` URLs).
	#[error("The backend base URL cannot be used as a base: {url}.")]
	NotABase {
		/// Offending URL.
		url: String,
	},
	/// Remote backends must use HTTPS.
	#[error("The backend base URL must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Offending URL.
		url: String,
	},
}

/// Immutable backend descriptor consumed by the exchanger and dispatcher.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendDescriptor {
	/// Origin (optionally with a path prefix) every endpoint path is resolved against.
	pub base_url: Url,
	/// Identity provider slug used to build the verification route.
	pub identity_provider: IdentityProviderId,
}
impl BackendDescriptor {
	/// Creates a new builder for the provided base URL.
	pub fn builder(base_url: Url) -> BackendDescriptorBuilder {
		BackendDescriptorBuilder::new().base_url(base_url)
	}

	/// Resolves an endpoint's path against the base URL, keeping any base path prefix.
	pub fn url_for(&self, endpoint: &Endpoint) -> Result<Url, ConfigError> {
		let mut base = self.base_url.clone();

		if !base.path().ends_with('/') {
			let prefixed = format!("{}/", base.path());

			base.set_path(&prefixed);
		}

		base.join(endpoint.path.trim_start_matches('/')).map_err(|source| {
			ConfigError::InvalidEndpoint { path: endpoint.path.to_string(), source }
		})
	}

	/// Validates invariants for the descriptor.
	pub fn validate(&self) -> Result<(), BackendDescriptorError> {
		if self.base_url.cannot_be_a_base() {
			return Err(BackendDescriptorError::NotABase { url: self.base_url.to_string() });
		}
		if self.base_url.scheme() != "https" && !is_loopback(&self.base_url) {
			return Err(BackendDescriptorError::InsecureEndpoint {
				url: self.base_url.to_string(),
			});
		}

		Ok(())
	}
}

/// Builder for [`BackendDescriptor`] values.
#[derive(Debug, Default)]
pub struct BackendDescriptorBuilder {
	/// Backend base URL.
	pub base_url: Option<Url>,
	/// Identity provider slug.
	pub identity_provider: Option<IdentityProviderId>,
}
impl BackendDescriptorBuilder {
	/// Creates an empty builder.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the base URL.
	pub fn base_url(mut self, url: Url) -> Self {
		self.base_url = Some(url);

		self
	}

	/// Sets the identity provider slug (e.g., `google`).
	pub fn identity_provider(mut self, provider: IdentityProviderId) -> Self {
		self.identity_provider = Some(provider);

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<BackendDescriptor, BackendDescriptorError> {
		let base_url = self.base_url.ok_or(BackendDescriptorError::MissingBaseUrl)?;
		let identity_provider =
			self.identity_provider.ok_or(BackendDescriptorError::MissingIdentityProvider)?;
		let descriptor = BackendDescriptor { base_url, identity_provider };

		descriptor.validate()?;

		Ok(descriptor)
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(url::Host::Ipv4(addr)) => addr.is_loopback(),
		Some(url::Host::Ipv6(addr)) => addr.is_loopback(),
		None => false,
	}
}
