//! Fire-and-forget analytics notifications.

// crates.io
use serde_json::{Map, Value};
// self
use crate::_prelude::*;

/// Outcome notification emitted after a routed action completes.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
	/// Event name, e.g. `blacklist_add_success`.
	pub name: String,
	/// Free-form event properties.
	pub properties: Map<String, Value>,
	/// Time the outcome was observed.
	#[serde(with = "time::serde::rfc3339")]
	pub occurred_at: OffsetDateTime,
}
impl AnalyticsEvent {
	/// Creates an event stamped with the current time.
	pub fn new(name: impl Into<String>) -> Self {
		Self { name: name.into(), properties: Map::new(), occurred_at: OffsetDateTime::now_utc() }
	}

	/// Adds a property.
	pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.properties.insert(key.into(), value.into());

		self
	}
}

/// Sink for analytics events.
///
/// `record` is synchronous and must return promptly; implementations that ship events over the
/// network queue them and flush elsewhere. Failures are the sink's own concern.
pub trait AnalyticsSink
where
	Self: Send + Sync,
{
	/// Accepts an event without blocking the caller.
	fn record(&self, event: AnalyticsEvent);
}

/// Sink that drops every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopAnalytics;
impl AnalyticsSink for NoopAnalytics {
	fn record(&self, event: AnalyticsEvent) {
		let _ = event;
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	#[test]
	fn properties_serialize_alongside_name() {
		let event = AnalyticsEvent::new("quota_checked").with_property("degraded", true);
		let rendered = serde_json::to_value(&event).expect("Analytics event should serialize.");

		assert_eq!(rendered["name"], json!("quota_checked"));
		assert_eq!(rendered["properties"], json!({"degraded": true}));

		NoopAnalytics.record(event);
	}
}
