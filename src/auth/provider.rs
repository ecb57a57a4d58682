//! Host-platform identity token contract plus an in-memory implementation.

// self
use crate::{_prelude::*, auth::IdentityToken};

/// Boxed future returned by [`TokenProvider`] operations.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Obtains and forgets third-party identity tokens on behalf of the broker.
///
/// The provider knows nothing about the backend. Every operation is idempotent and safe to call
/// when no token exists.
pub trait TokenProvider
where
	Self: Send + Sync,
{
	/// Acquires an identity token.
	///
	/// With `interactive == false` implementations must never present UI and must resolve to
	/// `Ok(None)` on any failure. With `interactive == true` they may prompt and resolve to
	/// [`Error::AuthCancelled`] when the user declines or the host reports an error.
	fn acquire(&self, interactive: bool) -> ProviderFuture<'_, Option<IdentityToken>>;

	/// Forgets a specific token so the next [`acquire`](Self::acquire) performs a fresh handshake.
	fn invalidate<'a>(&'a self, token: &'a IdentityToken) -> ProviderFuture<'a, ()>;

	/// Drops every cached token.
	fn clear_all(&self) -> ProviderFuture<'_, ()>;
}

/// Result the simulated host returns when it has to prompt.
#[derive(Clone, Debug)]
pub enum InteractiveGrant {
	/// The user completes the prompt and the host issues this token.
	Grant(IdentityToken),
	/// The user closes the prompt or the host fails.
	Cancel(String),
}
impl Default for InteractiveGrant {
	fn default() -> Self {
		Self::Cancel("The user did not approve access".into())
	}
}

#[derive(Debug, Default)]
struct HostState {
	cached: Option<IdentityToken>,
	interactive: InteractiveGrant,
	invalidated: Vec<IdentityToken>,
	prompts: u32,
}

/// In-process token provider that mimics a host identity cache for tests and demos.
#[derive(Debug, Default)]
pub struct MemoryTokenProvider(Mutex<HostState>);
impl MemoryTokenProvider {
	/// Seeds the host cache with a token that non-interactive acquisition will return.
	pub fn with_cached(self, token: IdentityToken) -> Self {
		self.0.lock().cached = Some(token);

		self
	}

	/// Configures what an interactive prompt yields.
	pub fn with_interactive(self, grant: InteractiveGrant) -> Self {
		self.0.lock().interactive = grant;

		self
	}

	/// Returns the currently cached token, if any.
	pub fn cached(&self) -> Option<IdentityToken> {
		self.0.lock().cached.clone()
	}

	/// Returns every token passed to [`TokenProvider::invalidate`], in call order.
	pub fn invalidations(&self) -> Vec<IdentityToken> {
		self.0.lock().invalidated.clone()
	}

	/// Number of interactive prompts shown so far.
	pub fn prompts(&self) -> u32 {
		self.0.lock().prompts
	}

	fn acquire_now(&self, interactive: bool) -> Result<Option<IdentityToken>> {
		let mut state = self.0.lock();

		if let Some(token) = state.cached.clone() {
			return Ok(Some(token));
		}
		if !interactive {
			return Ok(None);
		}

		state.prompts += 1;

		match state.interactive.clone() {
			InteractiveGrant::Grant(token) => {
				state.cached = Some(token.clone());

				Ok(Some(token))
			},
			InteractiveGrant::Cancel(reason) => Err(Error::AuthCancelled { reason }),
		}
	}

	fn invalidate_now(&self, token: &IdentityToken) {
		let mut state = self.0.lock();

		if state.cached.as_ref() == Some(token) {
			state.cached = None;
		}

		state.invalidated.push(token.clone());
	}
}
impl TokenProvider for MemoryTokenProvider {
	fn acquire(&self, interactive: bool) -> ProviderFuture<'_, Option<IdentityToken>> {
		Box::pin(async move { self.acquire_now(interactive) })
	}

	fn invalidate<'a>(&'a self, token: &'a IdentityToken) -> ProviderFuture<'a, ()> {
		Box::pin(async move {
			self.invalidate_now(token);

			Ok(())
		})
	}

	fn clear_all(&self) -> ProviderFuture<'_, ()> {
		Box::pin(async move {
			self.0.lock().cached = None;

			Ok(())
		})
	}
}
