//! Per-action handlers. Each returns the success payload or an [`Error`]; the router renders
//! errors and delivers the reply.

// crates.io
use serde_json::{Value, json};
// self
use crate::{
	_prelude::*,
	auth::{EntryId, UserContext},
	backend::Endpoint,
	broker::Broker,
	router::Action,
};

pub(crate) async fn handle(broker: &Broker, action: Action, data: Option<Value>) -> Result<Value> {
	match action {
		Action::CheckAuthentication => check_authentication(broker).await,
		Action::SignIn => sign_in(broker).await,
		Action::SignOut => sign_out(broker).await,
		Action::CheckQuota => check_quota(broker).await,
		Action::GetQuotaInfo => to_value(&broker.quota().check_quota().await),
		Action::AddToBlacklist => add_to_blacklist(broker, data.as_ref()).await,
		Action::RemoveFromBlacklist => remove_from_blacklist(broker, data.as_ref()).await,
		Action::GetBlacklist => to_value(&broker.blacklist().read().await?),
		Action::SyncBlacklistCache => to_value(&broker.blacklist().sync().await?),
		Action::GenerateComment => generate_comment(broker, data).await,
	}
}

// Never touches the network: a host-cached token plus the stored user is enough.
async fn check_authentication(broker: &Broker) -> Result<Value> {
	if broker.provider.acquire(false).await.ok().flatten().is_none() {
		return Ok(json!({ "authenticated": false }));
	}

	let user = UserContext::load(broker.store.as_ref()).await?;

	Ok(json!({ "authenticated": true, "user": user }))
}

async fn sign_in(broker: &Broker) -> Result<Value> {
	let grant = broker.exchanger().sign_in().await?;

	if let Some(profile) = &grant.profile {
		profile.save(broker.store.as_ref()).await?;
	}

	let user = match grant.profile {
		Some(profile) => Some(profile),
		None => UserContext::load(broker.store.as_ref()).await?,
	};

	Ok(json!({ "authenticated": true, "user": user }))
}

async fn sign_out(broker: &Broker) -> Result<Value> {
	broker.provider.clear_all().await?;
	UserContext::clear(broker.store.as_ref()).await?;
	broker.blacklist().clear().await?;

	Ok(json!({ "success": true }))
}

async fn check_quota(broker: &Broker) -> Result<Value> {
	let status = broker.quota().check_quota().await;

	Ok(json!({
		"hasQuota": status.has_remaining(),
		"remaining": status.remaining,
		"dailyLimit": status.daily_limit,
		"plan": status.plan,
		"degraded": status.degraded,
	}))
}

async fn add_to_blacklist(broker: &Broker, data: Option<&Value>) -> Result<Value> {
	let name = string_field(data, &["name", "blockedName", "blocked_name"])
		.filter(|name| !name.trim().is_empty())
		.ok_or_else(|| Error::InvalidMessage { reason: "`name` is required".into() })?;
	let profile_url = string_field(data, &["profileUrl", "blockedProfileUrl", "blocked_profile_url"])
		.filter(|url| !url.trim().is_empty());
	let entry = broker.blacklist().add(name.trim(), profile_url.as_deref()).await?;

	Ok(json!({ "success": true, "entry": entry }))
}

async fn remove_from_blacklist(broker: &Broker, data: Option<&Value>) -> Result<Value> {
	let raw = string_field(data, &["id", "entryId"])
		.ok_or_else(|| Error::InvalidMessage { reason: "`id` is required".into() })?;
	let id = EntryId::new(&raw)
		.map_err(|e| Error::InvalidMessage { reason: format!("invalid `id`: {e}") })?;

	broker.blacklist().remove(&id).await?;

	Ok(json!({ "success": true, "id": id }))
}

// The quota check only blocks when the backend positively reports zero remaining.
async fn generate_comment(broker: &Broker, data: Option<Value>) -> Result<Value> {
	let status = broker.quota().check_quota().await;

	if !status.degraded && !status.has_remaining() {
		return Err(Error::QuotaExhausted { daily_limit: status.daily_limit });
	}

	broker.dispatcher().send(&Endpoint::COMMENT_GENERATE, data).await
}

fn string_field(data: Option<&Value>, keys: &[&str]) -> Option<String> {
	let data = data?;

	keys.iter().find_map(|key| match data.get(key)? {
		Value::String(s) => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		_ => None,
	})
}

fn to_value<T>(value: &T) -> Result<Value>
where
	T: Serialize,
{
	serde_json::to_value(value).map_err(|e| {
		crate::store::StoreError::Serialization { message: format!("Failed to render reply: {e}") }
			.into()
	})
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn string_fields_accept_aliases_and_numbers() {
		let data = json!({"blockedName": "Jane", "entryId": 42});

		assert_eq!(string_field(Some(&data), &["name", "blockedName"]), Some("Jane".into()));
		assert_eq!(string_field(Some(&data), &["id", "entryId"]), Some("42".into()));
		assert_eq!(string_field(None, &["name"]), None);
	}
}
