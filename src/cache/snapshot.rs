//! Blacklist records and the locally persisted snapshot.

// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::EntryId,
	backend::{self, Endpoint},
	obs,
};

/// A profile the user excluded; owned by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlacklistEntry {
	/// Backend-assigned identifier.
	pub id: EntryId,
	/// Display name of the blocked profile.
	pub blocked_name: String,
	/// Profile URL, when known.
	#[serde(default)]
	pub blocked_profile_url: Option<String>,
	/// Creation time on the backend.
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
}

/// Local copy of the blacklist, most recent entry first.
///
/// `count` always equals `entries.len()`; every constructor and mutation maintains it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlacklistCacheSnapshot {
	entries: Vec<BlacklistEntry>,
	count: usize,
	#[serde(with = "time::serde::rfc3339")]
	synced_at: OffsetDateTime,
}
impl BlacklistCacheSnapshot {
	/// Builds a snapshot from an authoritative list, ordering it most-recent-first.
	pub fn from_entries(mut entries: Vec<BlacklistEntry>, synced_at: OffsetDateTime) -> Self {
		entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));

		Self { count: entries.len(), entries, synced_at }
	}

	/// Snapshot with no entries, used when the plan does not include the feature.
	pub fn empty(synced_at: OffsetDateTime) -> Self {
		Self { entries: Vec::new(), count: 0, synced_at }
	}

	/// Entries, most recent first.
	pub fn entries(&self) -> &[BlacklistEntry] {
		&self.entries
	}

	/// Number of entries.
	pub fn count(&self) -> usize {
		self.count
	}

	/// Time of the last full sync.
	pub fn synced_at(&self) -> OffsetDateTime {
		self.synced_at
	}

	/// Whether an entry with `id` is present.
	pub fn contains(&self, id: &EntryId) -> bool {
		self.entries.iter().any(|entry| &entry.id == id)
	}

	/// Returns `false` for stored snapshots whose count drifted from their entries.
	pub fn is_consistent(&self) -> bool {
		self.count == self.entries.len()
	}

	/// Puts `entry` first, replacing any entry with the same id.
	pub fn prepend(&mut self, entry: BlacklistEntry) {
		self.entries.retain(|existing| existing.id != entry.id);
		self.entries.insert(0, entry);
		self.count = self.entries.len();
	}

	/// Drops the entry with `id`; returns whether one was removed.
	pub fn remove(&mut self, id: &EntryId) -> bool {
		let before = self.entries.len();

		self.entries.retain(|entry| &entry.id != id);
		self.count = self.entries.len();

		self.count != before
	}
}

/// Parses a list response: a bare array or an object wrapping it in `entries` / `items`.
///
/// A response that is not a list fails. Individual entries that cannot be decoded are skipped
/// and logged so one odd record does not block the whole sync.
pub(crate) fn parse_entries(value: Value) -> Result<Vec<BlacklistEntry>> {
	let list = match value {
		Value::Object(mut map) => map
			.remove("entries")
			.or_else(|| map.remove("items"))
			.unwrap_or(Value::Array(Vec::new())),
		Value::Null => Value::Array(Vec::new()),
		other => other,
	};
	let items: Vec<Value> = backend::decode_value(Endpoint::BLACKLIST_LIST.name, list)?;

	Ok(items
		.into_iter()
		.filter_map(|mut item| {
			stringify_id(&mut item);

			backend::decode_value(Endpoint::BLACKLIST_LIST.name, item)
				.map_err(|e| obs::entry_skipped(Endpoint::BLACKLIST_LIST.name, &e))
				.ok()
		})
		.collect())
}

/// Parses a create response: the entry itself or an object wrapping it in `entry`.
pub(crate) fn parse_entry(value: Value) -> Result<BlacklistEntry> {
	let mut entry = match value {
		Value::Object(mut map) if !map.contains_key("id") =>
			map.remove("entry").unwrap_or(Value::Object(map)),
		other => other,
	};

	stringify_id(&mut entry);

	backend::decode_value(Endpoint::BLACKLIST_CREATE.name, entry)
}

// Numeric ids are kept as their decimal text.
fn stringify_id(entry: &mut Value) {
	if let Some(Value::Number(n)) = entry.get("id") {
		let text = n.to_string();

		entry["id"] = Value::String(text);
	}
}
