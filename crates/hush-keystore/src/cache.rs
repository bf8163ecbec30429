//! Coalescing key cache: one provisioning round-trip per user, shared by all
//! concurrent callers.
//!
//! Each user maps to a shared future. The first caller creates it, later and
//! concurrent callers clone it and await the same result. Successful handles
//! stay cached; a failed entry is evicted so the next call starts over.
//!
//! Provisioning runs as its own task, so a caller that gives up waiting does
//! not stall the others or leave a half-finished entry behind. Every write to
//! a user's stored key (provisioning or [`KeyCache::replace`]) holds that
//! user's write guard.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use hush_core::{HushError, HushResult};
use hush_crypto::{user_tag, MasterKey, MasterKeyHandle};

use crate::master::{get_or_create_master_key, replace_master_key, ProvisionOutcome};
use crate::KeyStore;

type ProvisionFuture = Shared<BoxFuture<'static, Result<MasterKeyHandle, Arc<HushError>>>>;

/// Serializes writes to one user's stored key
type WriteGuard = Arc<tokio::sync::Mutex<()>>;

/// Called once per completed provisioning round-trip.
pub type ProvisionHook = Arc<dyn Fn(ProvisionOutcome) + Send + Sync>;

struct Slot {
    generation: u64,
    future: ProvisionFuture,
    /// Invalidated while in flight: still joined until it settles, then
    /// replaced by a fresh read
    stale: bool,
}

impl Slot {
    fn in_flight(&self) -> bool {
        self.future.peek().is_none()
    }
}

pub struct KeyCache {
    store: Arc<dyn KeyStore>,
    slots: Mutex<HashMap<String, Slot>>,
    write_guards: Mutex<HashMap<String, WriteGuard>>,
    next_generation: AtomicU64,
    hook: Option<ProvisionHook>,
}

impl KeyCache {
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self {
            store,
            slots: Mutex::new(HashMap::new()),
            write_guards: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
            hook: None,
        }
    }

    /// Observe provisioning outcomes (metrics, alerts on regeneration).
    pub fn with_hook(mut self, hook: ProvisionHook) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn store(&self) -> &Arc<dyn KeyStore> {
        &self.store
    }

    /// Get the user's master key handle, provisioning it if needed.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn provision(&self, user_id: &str) -> HushResult<MasterKeyHandle> {
        let (generation, future) = self.slot_for(user_id);

        match future.await {
            Ok(handle) => Ok(handle),
            Err(err) => {
                self.evict(user_id, generation);
                Err(HushError::from_shared(err))
            }
        }
    }

    /// Persist `key` as the user's master key and serve it from now on.
    ///
    /// Waits out any provisioning in flight for the user, so a key generated
    /// concurrently cannot land on top of the replacement. Returns the
    /// fingerprint of the key that was overwritten, if a valid one was stored.
    pub async fn replace(&self, user_id: &str, key: MasterKey) -> HushResult<Option<String>> {
        let guard = self.write_guard(user_id);
        let _held = guard.lock().await;

        let previous = replace_master_key(self.store.as_ref(), user_id, &key).await?;

        let handle = MasterKeyHandle::current(key);
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let future = futures::future::ready(Ok::<_, Arc<HushError>>(handle)).boxed().shared();
        self.lock().insert(
            user_id.to_string(),
            Slot {
                generation,
                future,
                stale: false,
            },
        );
        Ok(previous)
    }

    /// Drop the cached handle for one user. The persisted key is untouched.
    ///
    /// A provisioning still in flight is marked stale rather than dropped:
    /// callers keep joining it until it settles, and the next call after that
    /// reads the store again.
    pub fn invalidate(&self, user_id: &str) {
        let mut slots = self.lock();
        let in_flight = match slots.get(user_id) {
            Some(slot) => slot.in_flight(),
            None => return,
        };
        if in_flight {
            if let Some(slot) = slots.get_mut(user_id) {
                slot.stale = true;
            }
        } else {
            slots.remove(user_id);
        }
        tracing::debug!(user = %user_tag(user_id), in_flight, "key cache entry invalidated");
    }

    /// Drop every cached handle (e.g. on logout). Persisted keys are untouched;
    /// in-flight provisioning is marked stale as in [`KeyCache::invalidate`].
    pub fn clear(&self) {
        self.lock().retain(|_, slot| {
            let in_flight = slot.in_flight();
            slot.stale |= in_flight;
            in_flight
        });
    }

    /// Number of users with a cached or in-flight entry
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn slot_for(&self, user_id: &str) -> (u64, ProvisionFuture) {
        let mut slots = self.lock();
        if let Some(slot) = slots.get(user_id) {
            if !slot.stale || slot.in_flight() {
                return (slot.generation, slot.future.clone());
            }
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let task = tokio::spawn(provision_uncached(
            Arc::clone(&self.store),
            user_id.to_string(),
            self.write_guard(user_id),
            self.hook.clone(),
        ));
        let future = async move {
            task.await.unwrap_or_else(|e| {
                Err(Arc::new(HushError::Other(anyhow::anyhow!(
                    "key provisioning task: {e}"
                ))))
            })
        }
        .boxed()
        .shared();

        slots.insert(
            user_id.to_string(),
            Slot {
                generation,
                future: future.clone(),
                stale: false,
            },
        );
        (generation, future)
    }

    /// Remove a failed entry, unless it has already been replaced.
    fn evict(&self, user_id: &str, generation: u64) {
        let mut slots = self.lock();
        if slots.get(user_id).is_some_and(|s| s.generation == generation) {
            slots.remove(user_id);
            tracing::debug!(user = %user_tag(user_id), "evicted failed key cache entry");
        }
    }

    /// Guards are never removed, so every writer for a user shares one.
    fn write_guard(&self, user_id: &str) -> WriteGuard {
        let mut guards = self
            .write_guards
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(guards.entry(user_id.to_string()).or_default())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn provision_uncached(
    store: Arc<dyn KeyStore>,
    user_id: String,
    guard: WriteGuard,
    hook: Option<ProvisionHook>,
) -> Result<MasterKeyHandle, Arc<HushError>> {
    let _held = guard.lock().await;
    let provisioned = get_or_create_master_key(store.as_ref(), &user_id)
        .await
        .map_err(|e| {
            tracing::warn!(user = %user_tag(&user_id), "master key provisioning failed: {e}");
            Arc::new(e)
        })?;

    if let Some(hook) = hook {
        hook(provisioned.outcome);
    }
    Ok(MasterKeyHandle::current(provisioned.key))
}
