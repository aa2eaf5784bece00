//! Query store: the in-memory cache shared by every subscriber in a session.

use chrono::Utc;
use std::any::Any;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::transport::{ApiError, Transport};

use super::endpoint::QueryEndpoint;
use super::key::CacheKey;
use super::state::{QuerySnapshot, QueryStatus};
use super::tags::Tag;

/// Store-wide cache behaviour.
#[derive(Debug, Clone)]
pub struct CacheSettings {
  /// How long an entry without subscribers is kept before eviction
  pub keep_unused_for: Duration,
  /// Refetch whenever a new subscription attaches to an existing entry
  pub refetch_on_mount: bool,
}

impl Default for CacheSettings {
  fn default() -> Self {
    Self {
      keep_unused_for: Duration::from_secs(60),
      refetch_on_mount: false,
    }
  }
}

/// Per-subscription options.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubscribeOptions {
  /// Fetch even if the entry already holds fresh data
  pub refetch_on_mount: bool,
}

/// Type-erased view of a cache entry so the store can hold entries for
/// different endpoints in one map.
trait ErasedEntry: Send + Sync {
  fn as_any(&self) -> &dyn Any;
  fn mark_fetching(&self);
  fn mark_stale(&self);
  fn spawn_fetch(&self, store: &QueryStore, key: CacheKey, instance: u64, generation: u64);
}

struct TypedEntry<E: QueryEndpoint> {
  args: E::Args,
  state: watch::Sender<QuerySnapshot<E::Output>>,
}

impl<E: QueryEndpoint> ErasedEntry for TypedEntry<E> {
  fn as_any(&self) -> &dyn Any {
    self
  }

  fn mark_fetching(&self) {
    self.state.send_modify(|s| s.status = QueryStatus::Loading);
  }

  fn mark_stale(&self) {
    self.state.send_modify(|s| s.is_stale = true);
  }

  fn spawn_fetch(&self, store: &QueryStore, key: CacheKey, instance: u64, generation: u64) {
    store.spawn_fetch::<E>(key, self.args.clone(), instance, generation);
  }
}

/// Bookkeeping for one cache entry.
///
/// Every fetch gets the next generation number. `applied` is the generation
/// whose result is currently shown; results older than that are dropped.
struct Slot {
  /// Distinguishes this entry from earlier ones under the same key
  instance: u64,
  entry: Box<dyn ErasedEntry>,
  tags: Vec<Tag>,
  subscribers: usize,
  stale: bool,
  failed: bool,
  started: u64,
  applied: u64,
  /// Fetches up to this generation began before the last invalidation
  invalidated_through: u64,
  eviction_epoch: u64,
}

impl Slot {
  fn create<E: QueryEndpoint>(
    instance: u64,
    args: E::Args,
  ) -> (Self, watch::Receiver<QuerySnapshot<E::Output>>) {
    let (state, receiver) = watch::channel(QuerySnapshot::default());
    let slot = Self {
      instance,
      entry: Box::new(TypedEntry::<E> { args, state }),
      tags: Vec::new(),
      subscribers: 0,
      stale: false,
      failed: false,
      started: 0,
      applied: 0,
      invalidated_through: 0,
      eviction_epoch: 0,
    };
    (slot, receiver)
  }

  fn typed<E: QueryEndpoint>(&self) -> Option<&TypedEntry<E>> {
    self.entry.as_any().downcast_ref::<TypedEntry<E>>()
  }

  fn is_pending(&self) -> bool {
    self.started > self.applied
  }

  fn begin_fetch(&mut self) -> u64 {
    self.started += 1;
    self.entry.mark_fetching();
    self.started
  }

  fn provides_any(&self, tags: &[Tag]) -> bool {
    self
      .tags
      .iter()
      .any(|provided| tags.iter().any(|tag| tag.matches(provided)))
  }
}

struct StoreInner {
  transport: Arc<dyn Transport>,
  settings: CacheSettings,
  slots: Mutex<HashMap<CacheKey, Slot>>,
  next_instance: AtomicU64,
}

impl StoreInner {
  fn next_instance(&self) -> u64 {
    self.next_instance.fetch_add(1, Ordering::Relaxed) + 1
  }

  /// Lock the entry map. A panic while holding the lock cannot leave an entry
  /// half-written, so a poisoned lock is recovered.
  fn slots(&self) -> MutexGuard<'_, HashMap<CacheKey, Slot>> {
    self.slots.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn evict_if_unused(&self, key: &CacheKey, epoch: u64) {
    let mut slots = self.slots();
    let evict = slots
      .get(key)
      .is_some_and(|slot| slot.subscribers == 0 && slot.eviction_epoch == epoch && !slot.is_pending());

    if evict {
      slots.remove(key);
      debug!(key = %key, "evicted unused cache entry");
    }
  }
}

/// Session-wide query cache.
///
/// Clones share the same entries. Create one at startup, pass it to whatever
/// needs data, and call [`QueryStore::clear`] when the session ends.
/// Fetches run on the tokio runtime, so subscribing requires one.
#[derive(Clone)]
pub struct QueryStore {
  inner: Arc<StoreInner>,
}

impl QueryStore {
  pub fn new(transport: Arc<dyn Transport>, settings: CacheSettings) -> Self {
    Self {
      inner: Arc::new(StoreInner {
        transport,
        settings,
        slots: Mutex::new(HashMap::new()),
        next_instance: AtomicU64::new(0),
      }),
    }
  }

  pub(super) fn transport(&self) -> &Arc<dyn Transport> {
    &self.inner.transport
  }

  /// Subscribe to `E` with the given arguments using default options.
  pub fn subscribe<E: QueryEndpoint>(&self, args: E::Args) -> QuerySubscription<E> {
    self.subscribe_with::<E>(args, SubscribeOptions::default())
  }

  /// Subscribe to `E`, fetching if the entry is new, stale, failed, or the
  /// options ask for it. Identical in-flight requests are shared.
  pub fn subscribe_with<E: QueryEndpoint>(
    &self,
    args: E::Args,
    options: SubscribeOptions,
  ) -> QuerySubscription<E> {
    let key = CacheKey::new(E::NAME, &args);
    let refetch_on_mount = options.refetch_on_mount || self.inner.settings.refetch_on_mount;

    let (receiver, instance) = {
      let mut slots = self.inner.slots();
      let slot = slots
        .entry(key.clone())
        .or_insert_with(|| Slot::create::<E>(self.inner.next_instance(), args.clone()).0);

      let receiver = match slot.typed::<E>() {
        Some(entry) => entry.state.subscribe(),
        None => {
          warn!(key = %key, "cache entry holds a different type, replacing it");
          let (fresh, receiver) = Slot::create::<E>(self.inner.next_instance(), args.clone());
          *slot = fresh;
          receiver
        }
      };

      slot.subscribers += 1;
      // Cancels any eviction scheduled while the entry was unused.
      slot.eviction_epoch += 1;

      let needs_fetch =
        !slot.is_pending() && (slot.applied == 0 || slot.stale || slot.failed || refetch_on_mount);

      if needs_fetch {
        let generation = slot.begin_fetch();
        self.spawn_fetch::<E>(key.clone(), args, slot.instance, generation);
      } else {
        debug!(
          key = %key,
          pending = slot.is_pending(),
          subscribers = slot.subscribers,
          "subscribed to existing entry"
        );
      }

      (receiver, slot.instance)
    };

    QuerySubscription {
      store: self.clone(),
      key,
      instance,
      receiver,
      _endpoint: PhantomData,
    }
  }

  /// Subscribe, wait for the fetch to settle, and return the result.
  ///
  /// The subscription is released on return, so the entry stays cached for the
  /// retention window.
  pub async fn query<E: QueryEndpoint>(&self, args: E::Args) -> Result<Arc<E::Output>, ApiError> {
    let mut subscription = self.subscribe::<E>(args);
    subscription.settled().await.into_result()
  }

  /// Current state of an entry without subscribing to it.
  pub fn peek<E: QueryEndpoint>(&self, args: &E::Args) -> Option<QuerySnapshot<E::Output>> {
    let key = CacheKey::new(E::NAME, args);
    let slots = self.inner.slots();
    slots
      .get(&key)
      .and_then(|slot| slot.typed::<E>())
      .map(|entry| entry.state.borrow().clone())
  }

  /// Start a fresh fetch for an existing entry regardless of its state.
  ///
  /// Returns `false` when nothing is cached for these arguments.
  pub fn refetch<E: QueryEndpoint>(&self, args: &E::Args) -> bool {
    self.refetch_key(&CacheKey::new(E::NAME, args), None)
  }

  /// Refetch the entry under `key`, provided it is still the given instance.
  fn refetch_key(&self, key: &CacheKey, instance: Option<u64>) -> bool {
    let mut slots = self.inner.slots();
    match slots.get_mut(key) {
      Some(slot) if instance.map_or(true, |i| i == slot.instance) => {
        let generation = slot.begin_fetch();
        debug!(key = %key, generation, "manual refetch");
        slot.entry.spawn_fetch(self, key.clone(), slot.instance, generation);
        true
      }
      _ => false,
    }
  }

  /// Mark every entry providing one of `tags` as stale.
  ///
  /// Entries with subscribers are refetched right away; the rest are refetched
  /// when they are next subscribed to.
  pub fn invalidate_tags(&self, tags: &[Tag]) {
    if tags.is_empty() {
      return;
    }

    let mut matched = 0usize;
    let mut refetched = 0usize;
    {
      let mut slots = self.inner.slots();
      for (key, slot) in slots.iter_mut() {
        if !slot.provides_any(tags) {
          continue;
        }

        matched += 1;
        slot.stale = true;
        slot.invalidated_through = slot.started;
        slot.entry.mark_stale();

        if slot.subscribers > 0 {
          refetched += 1;
          let generation = slot.begin_fetch();
          slot.entry.spawn_fetch(self, key.clone(), slot.instance, generation);
        }
      }
    }

    let tags: Vec<String> = tags.iter().map(Tag::to_string).collect();
    info!(?tags, matched, refetched, "invalidated tags");
  }

  /// Number of cached entries.
  pub fn len(&self) -> usize {
    self.inner.slots().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Drop every entry. Live subscriptions see their channel close, and
  /// releasing them later leaves entries created after the clear untouched.
  pub fn clear(&self) {
    let mut slots = self.inner.slots();
    let count = slots.len();
    slots.clear();
    debug!(count, "cleared query cache");
  }

  fn spawn_fetch<E: QueryEndpoint>(
    &self,
    key: CacheKey,
    args: E::Args,
    instance: u64,
    generation: u64,
  ) {
    debug!(key = %key, id = &key.digest()[..12], generation, "fetching");
    let store = self.clone();

    tokio::spawn(async move {
      let request = E::request(&args);
      let outcome = match store.inner.transport.send(request).await {
        Ok(response) => E::transform(response.body),
        Err(error) => Err(error),
      };
      store.complete::<E>(&key, &args, instance, generation, outcome);
    });
  }

  fn complete<E: QueryEndpoint>(
    &self,
    key: &CacheKey,
    args: &E::Args,
    instance: u64,
    generation: u64,
    outcome: Result<E::Output, ApiError>,
  ) {
    let mut slots = self.inner.slots();
    let Some(slot) = slots.get_mut(key).filter(|slot| slot.instance == instance) else {
      debug!(key = %key, "entry evicted before its fetch completed");
      return;
    };

    if generation < slot.applied {
      debug!(key = %key, generation, applied = slot.applied, "dropping superseded result");
      return;
    }

    slot.applied = generation;
    let pending = slot.is_pending();

    match outcome {
      Ok(data) => {
        slot.tags = E::provides_tags(&data, args);
        slot.stale = generation <= slot.invalidated_through;
        slot.failed = false;

        let stale = slot.stale;
        if let Some(entry) = slot.typed::<E>() {
          entry.state.send_modify(|s| {
            s.status = if pending {
              QueryStatus::Loading
            } else {
              QueryStatus::Success
            };
            s.data = Some(Arc::new(data));
            s.error = None;
            s.is_stale = stale;
            s.fulfilled_at = Some(Utc::now());
          });
        }
      }
      Err(error) => {
        warn!(key = %key, %error, "query failed");
        slot.failed = true;

        if let Some(entry) = slot.typed::<E>() {
          entry.state.send_modify(|s| {
            s.status = if pending {
              QueryStatus::Loading
            } else {
              QueryStatus::Error
            };
            s.error = Some(error);
          });
        }
      }
    }

    if slot.subscribers == 0 && !pending {
      self.schedule_eviction(key, slot);
    }
  }

  fn release(&self, key: &CacheKey, instance: u64) {
    let mut slots = self.inner.slots();
    if let Some(slot) = slots.get_mut(key).filter(|slot| slot.instance == instance) {
      slot.subscribers = slot.subscribers.saturating_sub(1);
      // Pending entries are rescheduled when their fetch lands.
      if slot.subscribers == 0 && !slot.is_pending() {
        self.schedule_eviction(key, slot);
      }
    }
  }

  fn schedule_eviction(&self, key: &CacheKey, slot: &mut Slot) {
    slot.eviction_epoch += 1;
    let epoch = slot.eviction_epoch;

    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
      debug!(key = %key, "no runtime to schedule eviction, keeping entry until cleared");
      return;
    };

    let keep_for = self.inner.settings.keep_unused_for;
    let inner = Arc::downgrade(&self.inner);
    let key = key.clone();

    runtime.spawn(async move {
      tokio::time::sleep(keep_for).await;
      if let Some(inner) = inner.upgrade() {
        inner.evict_if_unused(&key, epoch);
      }
    });
  }
}

/// A live binding to one cache entry.
///
/// Dropping the subscription releases it; the entry is evicted once no
/// subscription is left and the retention window has passed.
pub struct QuerySubscription<E: QueryEndpoint> {
  store: QueryStore,
  key: CacheKey,
  instance: u64,
  receiver: watch::Receiver<QuerySnapshot<E::Output>>,
  _endpoint: PhantomData<fn() -> E>,
}

impl<E: QueryEndpoint> QuerySubscription<E> {
  pub fn key(&self) -> &CacheKey {
    &self.key
  }

  pub fn snapshot(&self) -> QuerySnapshot<E::Output> {
    self.receiver.borrow().clone()
  }

  /// Wait for the next state change. Returns `None` once the entry is gone.
  pub async fn changed(&mut self) -> Option<QuerySnapshot<E::Output>> {
    self.receiver.changed().await.ok()?;
    Some(self.receiver.borrow_and_update().clone())
  }

  /// Wait until no fetch is pending and return the state at that point.
  pub async fn settled(&mut self) -> QuerySnapshot<E::Output> {
    loop {
      let snapshot = self.receiver.borrow_and_update().clone();
      if snapshot.is_settled() {
        return snapshot;
      }
      if self.receiver.changed().await.is_err() {
        return snapshot;
      }
    }
  }

  /// Refetch bypassing the cache.
  pub fn refetch(&self) {
    self.store.refetch_key(&self.key, Some(self.instance));
  }
}

impl<E: QueryEndpoint> Drop for QuerySubscription<E> {
  fn drop(&mut self) {
    self.store.release(&self.key, self.instance);
  }
}
