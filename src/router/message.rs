//! Wire shapes exchanged with UI collaborators.

// crates.io
use serde_json::{Value, json};
use tokio::sync::oneshot;
// self
use crate::_prelude::*;

/// Incoming request: `{ "action": ..., "data": ... }`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
	/// Action name (camelCase, e.g. `getBlacklist`).
	pub action: String,
	/// Optional action arguments.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
}
impl Message {
	/// Creates a message without arguments.
	pub fn new(action: impl Into<String>) -> Self {
		Self { action: action.into(), data: None }
	}

	/// Attaches arguments.
	pub fn with_data(mut self, data: Value) -> Self {
		self.data = Some(data);

		self
	}

	/// Decodes a raw JSON message.
	pub fn from_value(value: Value) -> Result<Self> {
		serde_json::from_value(value)
			.map_err(|e| Error::InvalidMessage { reason: format!("malformed envelope: {e}") })
	}
}

/// Actions the router serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
	/// Reports whether a signed-in user exists, without network calls.
	CheckAuthentication,
	/// Interactive sign-in followed by a session exchange.
	SignIn,
	/// Forgets tokens, user context, and cached data.
	SignOut,
	/// Whether another generation is allowed.
	CheckQuota,
	/// Full quota status.
	GetQuotaInfo,
	/// Creates a blacklist entry.
	AddToBlacklist,
	/// Deletes a blacklist entry.
	RemoveFromBlacklist,
	/// Cached blacklist snapshot (synced when absent).
	GetBlacklist,
	/// Forces a blacklist resync.
	SyncBlacklistCache,
	/// Proxies comment generation to the backend.
	GenerateComment,
}
impl Action {
	/// Every routed action.
	pub const ALL: [Action; 10] = [
		Action::CheckAuthentication,
		Action::SignIn,
		Action::SignOut,
		Action::CheckQuota,
		Action::GetQuotaInfo,
		Action::AddToBlacklist,
		Action::RemoveFromBlacklist,
		Action::GetBlacklist,
		Action::SyncBlacklistCache,
		Action::GenerateComment,
	];

	/// Wire name.
	pub const fn as_str(self) -> &'static str {
		match self {
			Action::CheckAuthentication => "checkAuthentication",
			Action::SignIn => "signIn",
			Action::SignOut => "signOut",
			Action::CheckQuota => "checkQuota",
			Action::GetQuotaInfo => "getQuotaInfo",
			Action::AddToBlacklist => "addToBlacklist",
			Action::RemoveFromBlacklist => "removeFromBlacklist",
			Action::GetBlacklist => "getBlacklist",
			Action::SyncBlacklistCache => "syncBlacklistCache",
			Action::GenerateComment => "generateComment",
		}
	}

	/// Prefix for analytics event names.
	pub const fn event_name(self) -> &'static str {
		match self {
			Action::CheckAuthentication => "auth_check",
			Action::SignIn => "sign_in",
			Action::SignOut => "sign_out",
			Action::CheckQuota => "quota_check",
			Action::GetQuotaInfo => "quota_info",
			Action::AddToBlacklist => "blacklist_add",
			Action::RemoveFromBlacklist => "blacklist_remove",
			Action::GetBlacklist => "blacklist_read",
			Action::SyncBlacklistCache => "blacklist_sync",
			Action::GenerateComment => "comment_generate",
		}
	}
}
impl Display for Action {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Action {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Action::ALL
			.into_iter()
			.find(|action| action.as_str() == s)
			.ok_or_else(|| Error::InvalidMessage { reason: format!("unknown action `{s}`") })
	}
}

/// Acknowledgement sent for actions this router does not know.
pub fn acknowledgement() -> Value {
	json!({ "received": true })
}

/// Renders an error as `{ "error", "kind", "code"? }`.
pub fn error_reply(error: &Error) -> Value {
	let mut reply = json!({ "error": error.message(), "kind": error.kind() });

	if let Some(code) = error.detail().and_then(|detail| detail.code.clone()) {
		reply["code"] = Value::String(code);
	}

	reply
}

/// Creates a single-use reply channel.
pub fn reply_channel() -> (ReplySender, ReplyReceiver) {
	let (tx, rx) = oneshot::channel();

	(ReplySender(tx), rx)
}

/// Receiving half of a reply channel.
pub type ReplyReceiver = oneshot::Receiver<Value>;

/// Sending half of a reply channel; consuming it guarantees at most one reply.
#[derive(Debug)]
pub struct ReplySender(oneshot::Sender<Value>);
impl ReplySender {
	/// Delivers the reply; returns `false` when the requester is gone and the reply was dropped.
	pub fn send(self, reply: Value) -> bool {
		self.0.send(reply).is_ok()
	}

	/// Whether the requester stopped waiting.
	pub fn is_closed(&self) -> bool {
		self.0.is_closed()
	}
}
