//! Single entry point for UI collaborators.
//!
//! Every message gets exactly one reply. Known actions run on their own tokio task; handler
//! errors become `{error, kind, code?}` replies and a panicking handler becomes an `{error}`
//! reply at the task boundary. Unknown actions are acknowledged with `{"received": true}` so
//! older UI code calling newer actions degrades instead of failing. Each outcome is reported to
//! the analytics sink without waiting on it.

pub mod message;

mod handlers;

pub use message::*;

// crates.io
use serde_json::{Value, json};
use tokio::task::JoinHandle;
// self
use crate::{
	_prelude::*,
	broker::Broker,
	ext::AnalyticsEvent,
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
};

const PANIC_REPLY: &str = "Internal error while handling the request.";

/// Routes action messages to broker components.
#[derive(Clone, Debug)]
pub struct MessageRouter {
	broker: Broker,
}
impl MessageRouter {
	/// Creates a router over the provided broker.
	pub fn new(broker: Broker) -> Self {
		Self { broker }
	}

	/// Handles `message` in the background and delivers the reply through `reply`.
	///
	/// Must be called from within a tokio runtime. A reply whose receiver is gone is dropped.
	pub fn dispatch(&self, message: Message, reply: ReplySender) -> JoinHandle<()> {
		let router = self.clone();

		tokio::spawn(async move {
			let value = router.handle(message).await;

			reply.send(value);
		})
	}

	/// Convenience wrapper around [`dispatch`](Self::dispatch) returning the reply receiver.
	pub fn request(&self, message: Message) -> ReplyReceiver {
		let (tx, rx) = reply_channel();

		self.dispatch(message, tx);

		rx
	}

	/// Handles `message` and returns its reply.
	pub async fn handle(&self, message: Message) -> Value {
		let Ok(action) = message.action.parse::<Action>() else {
			return acknowledgement();
		};

		obs::record_operation_outcome(OperationKind::Route, OperationOutcome::Attempt);

		let span = OperationSpan::new(OperationKind::Route, action.as_str());
		let broker = self.broker.clone();
		let data = message.data;
		let task = tokio::spawn(span.instrument(async move {
			handlers::handle(&broker, action, data).await
		}));
		let (reply, event) = match task.await {
			Ok(Ok(value)) => {
				obs::record_operation_outcome(OperationKind::Route, OperationOutcome::Success);

				(value, AnalyticsEvent::new(format!("{}_success", action.event_name())))
			},
			Ok(Err(e)) => {
				obs::route_failed(action.as_str(), &e.to_string());
				obs::record_operation_outcome(OperationKind::Route, OperationOutcome::Failure);

				let event = AnalyticsEvent::new(format!("{}_failure", action.event_name()))
					.with_property("kind", e.kind());

				(error_reply(&e), event)
			},
			Err(join_error) => {
				obs::route_failed(action.as_str(), &join_error.to_string());
				obs::record_operation_outcome(OperationKind::Route, OperationOutcome::Failure);

				let event = AnalyticsEvent::new(format!("{}_failure", action.event_name()))
					.with_property("kind", "PANIC");

				(json!({ "error": PANIC_REPLY }), event)
			},
		};

		self.broker.analytics.record(event);

		reply
	}
}
