//! Local blacklist cache kept consistent with the backend.
//!
//! The backend owns the list; the cache holds a persisted [`BlacklistCacheSnapshot`] under the
//! `blacklist_cache` key. Syncs replace the snapshot wholesale. Adds and removes only touch the
//! snapshot after the backend confirmed them, seeding the local change from the server's answer.
//! A mutation that cannot be applied locally triggers a full sync instead. If that sync fails
//! the snapshot is dropped.
//!
//! Network round-trips are never serialized. The local load-modify-store of one snapshot is
//! guarded by an async mutex so two completing mutations cannot drop each other's update.

pub mod snapshot;

pub use snapshot::*;

// crates.io
use serde_json::{Value, json};
// self
use crate::{
	_prelude::*,
	auth::EntryId,
	backend::Endpoint,
	dispatch::RequestDispatcher,
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
	store::{LocalStore, StoreError, keys},
};

/// Blacklist cache backed by a [`LocalStore`].
#[derive(Clone)]
pub struct BlacklistCache {
	dispatcher: RequestDispatcher,
	store: Arc<dyn LocalStore>,
	guard: Arc<AsyncMutex<()>>,
}
impl BlacklistCache {
	/// Creates a cache over the provided dispatcher and store.
	pub fn new(dispatcher: RequestDispatcher, store: Arc<dyn LocalStore>) -> Self {
		Self { dispatcher, store, guard: Default::default() }
	}

	/// Returns the persisted snapshot without contacting the backend.
	///
	/// A stored value that cannot be decoded, or whose count drifted, is treated as absent.
	pub async fn snapshot(&self) -> Result<Option<BlacklistCacheSnapshot>> {
		let Some(raw) = self.store.get(keys::BLACKLIST_CACHE).await? else {
			return Ok(None);
		};

		Ok(serde_json::from_value::<BlacklistCacheSnapshot>(raw)
			.ok()
			.filter(BlacklistCacheSnapshot::is_consistent))
	}

	/// Returns the current snapshot, syncing first when none exists.
	pub async fn read(&self) -> Result<BlacklistCacheSnapshot> {
		match self.snapshot().await? {
			Some(snapshot) => Ok(snapshot),
			None => self.sync().await,
		}
	}

	/// Replaces the snapshot with the backend's full list.
	///
	/// A plan without the feature yields an explicit empty snapshot. Any other failure keeps the
	/// previous snapshot and is returned.
	pub async fn sync(&self) -> Result<BlacklistCacheSnapshot> {
		self.observe(OperationKind::BlacklistSync, "sync", async {
			let entries = match self.dispatcher.send(&Endpoint::BLACKLIST_LIST, None).await {
				Ok(value) => snapshot::parse_entries(value)?,
				Err(Error::FeatureNotEntitled { .. }) => Vec::new(),
				Err(e) => return Err(e),
			};
			let _guard = self.guard.lock().await;
			let now = OffsetDateTime::now_utc();
			let synced_at = match self.snapshot().await? {
				Some(previous) if previous.synced_at() > now => previous.synced_at(),
				_ => now,
			};
			let snapshot = BlacklistCacheSnapshot::from_entries(entries, synced_at);

			self.persist(&snapshot).await?;

			Ok(snapshot)
		})
		.await
	}

	/// Creates an entry on the backend and prepends the canonical result locally.
	///
	/// Rejections (for example a duplicate) leave the cache untouched and surface unchanged.
	pub async fn add(&self, name: &str, profile_url: Option<&str>) -> Result<BlacklistEntry> {
		self.observe(OperationKind::BlacklistMutation, "add", async {
			let payload = json!({ "blocked_name": name, "blocked_profile_url": profile_url });
			let value = self.dispatcher.send(&Endpoint::BLACKLIST_CREATE, Some(payload)).await?;
			let entry = snapshot::parse_entry(value)?;
			let applied = self
				.apply_locally(|snapshot| {
					snapshot.prepend(entry.clone());

					true
				})
				.await;

			if !applied {
				self.resync_after_mutation().await;
			}

			Ok(entry)
		})
		.await
	}

	/// Deletes an entry on the backend, then filters it out locally.
	///
	/// A snapshot that never held the entry is stale and gets replaced by a full sync.
	pub async fn remove(&self, id: &EntryId) -> Result<()> {
		self.observe(OperationKind::BlacklistMutation, "remove", async {
			self.dispatcher.send(&Endpoint::blacklist_delete(id), None).await?;

			if !self.apply_locally(|snapshot| snapshot.remove(id)).await {
				self.resync_after_mutation().await;
			}

			Ok(())
		})
		.await
	}

	/// Drops the local snapshot.
	pub async fn clear(&self) -> Result<()> {
		let _guard = self.guard.lock().await;

		self.store.remove(keys::BLACKLIST_CACHE).await?;

		Ok(())
	}

	// The backend already confirmed the mutation, so local failures are logged, not returned.
	async fn apply_locally<F>(&self, mutate: F) -> bool
	where
		F: FnOnce(&mut BlacklistCacheSnapshot) -> bool,
	{
		let _guard = self.guard.lock().await;
		let mut snapshot = match self.snapshot().await {
			Ok(Some(snapshot)) => snapshot,
			Ok(None) => return false,
			Err(e) => {
				obs::local_update_failed(&e);

				return false;
			},
		};

		if !mutate(&mut snapshot) {
			return false;
		}

		match self.persist(&snapshot).await {
			Ok(()) => true,
			Err(e) => {
				obs::local_update_failed(&e);

				false
			},
		}
	}

	// A snapshot that cannot be refreshed is dropped so the next read syncs from scratch.
	async fn resync_after_mutation(&self) {
		if let Err(e) = self.sync().await {
			obs::resync_failed(&e);

			if let Err(e) = self.clear().await {
				obs::local_update_failed(&e);
			}
		}
	}

	async fn persist(&self, snapshot: &BlacklistCacheSnapshot) -> Result<()> {
		let value: Value = serde_json::to_value(snapshot).map_err(|e| StoreError::Serialization {
			message: format!("Failed to serialize blacklist snapshot: {e}"),
		})?;

		self.store.set(keys::BLACKLIST_CACHE, value).await?;

		Ok(())
	}

	async fn observe<T, Fut>(&self, kind: OperationKind, stage: &'static str, fut: Fut) -> Result<T>
	where
		Fut: Future<Output = Result<T>>,
	{
		let span = OperationSpan::new(kind, stage);

		obs::record_operation_outcome(kind, OperationOutcome::Attempt);

		let result = span.instrument(fut).await;

		match &result {
			Ok(_) => obs::record_operation_outcome(kind, OperationOutcome::Success),
			Err(_) => obs::record_operation_outcome(kind, OperationOutcome::Failure),
		}

		result
	}
}
impl Debug for BlacklistCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BlacklistCache").finish_non_exhaustive()
	}
}
