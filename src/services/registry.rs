use crate::domain::{Scope, ScopeId, TargetHandle, TargetKey};
use crate::error::Result;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

type Teardown = Box<dyn FnOnce() + Send>;

/// A freshly created target together with the action that destroys it
pub struct Provisioned {
    pub handle: TargetHandle,
    teardown: Option<Teardown>,
}

impl Provisioned {
    pub fn new(handle: TargetHandle, teardown: impl FnOnce() + Send + 'static) -> Self {
        Self {
            handle,
            teardown: Some(Box::new(teardown)),
        }
    }

    pub fn teardown(mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl fmt::Debug for Provisioned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provisioned")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

type Slot = Arc<Mutex<Option<Provisioned>>>;

/// Memoizes one target per `(image, scope instance)` until that instance ends.
///
/// Creation is serialized per key; lookups of other keys are never blocked
/// by an in-flight creation. Ending a scope while requests for it are still
/// in flight is a caller error.
///
/// Lock order: a slot lock may be held while taking the map lock, never the
/// other way round.
pub struct TargetRegistry {
    slots: Mutex<HashMap<TargetKey, Slot>>,
    next_test_scope: AtomicU64,
}

impl Default for TargetRegistry {
    fn default() -> Self {
        Self {
            slots: Mutex::default(),
            next_test_scope: AtomicU64::new(1),
        }
    }
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached target for `key`, calling `factory` only on first use.
    ///
    /// A failing or panicking factory caches nothing; the next call tries again.
    pub fn get_or_create<F>(&self, key: &TargetKey, factory: F) -> Result<TargetHandle>
    where
        F: FnOnce() -> Result<Provisioned>,
    {
        loop {
            let slot = lock(&self.slots).entry(key.clone()).or_default().clone();

            let mut entry = lock(&slot);
            if let Some(existing) = entry.as_ref() {
                debug!("reusing target {} for {key}", existing.handle.id);
                return Ok(existing.handle.clone());
            }

            // evicted (failed creation or ended scope) while we waited for it
            if !self.is_current(key, &slot) {
                continue;
            }

            info!("provisioning target for {key}");
            let mut vacancy = Vacancy {
                registry: self,
                key,
                slot: &slot,
                filled: false,
            };
            let provisioned = factory()?;
            let handle = provisioned.handle.clone();
            *entry = Some(provisioned);
            vacancy.filled = true;

            return Ok(handle);
        }
    }

    /// Opens a scope instance, ended when the returned guard drops.
    ///
    /// Every `Scope::Test` call yields a fresh instance; `Scope::Session`
    /// always yields [`ScopeId::SESSION`].
    pub fn scope(&self, scope: Scope) -> ScopeGuard<'_> {
        let id = match scope {
            Scope::Session => ScopeId::SESSION,
            Scope::Test => ScopeId::test(self.next_test_scope.fetch_add(1, Ordering::Relaxed)),
        };
        debug!("opened scope {id}");

        ScopeGuard { registry: self, id }
    }

    /// Tears down and evicts every target of `scope`; returns how many were destroyed.
    pub fn end_scope(&self, scope: ScopeId) -> usize {
        self.evict_where(|key| key.scope == scope)
    }

    /// Number of live targets
    pub fn len(&self) -> usize {
        self.snapshot()
            .iter()
            .filter(|slot| lock(slot).is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_where(&self, matches: impl Fn(&TargetKey) -> bool) -> usize {
        let ended: Vec<(TargetKey, Slot)> = {
            let mut slots = lock(&self.slots);
            let keys: Vec<TargetKey> = slots.keys().filter(|k| matches(k)).cloned().collect();
            keys.into_iter()
                .filter_map(|k| slots.remove_entry(&k))
                .collect()
        };

        let mut destroyed = 0;
        for (key, slot) in ended {
            let provisioned = lock(&slot).take();
            if let Some(provisioned) = provisioned {
                info!("tearing down {} ({key})", provisioned.handle.id);
                provisioned.teardown();
                destroyed += 1;
            }
        }

        destroyed
    }

    fn is_current(&self, key: &TargetKey, slot: &Slot) -> bool {
        lock(&self.slots)
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
    }

    fn snapshot(&self) -> Vec<Slot> {
        lock(&self.slots).values().cloned().collect()
    }
}

impl Drop for TargetRegistry {
    fn drop(&mut self) {
        self.evict_where(|_| true);
    }
}

impl fmt::Debug for TargetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetRegistry")
            .field("targets", &self.len())
            .finish()
    }
}

/// Removes a slot whose creation did not complete, on error or unwind
struct Vacancy<'a> {
    registry: &'a TargetRegistry,
    key: &'a TargetKey,
    slot: &'a Slot,
    filled: bool,
}

impl Drop for Vacancy<'_> {
    fn drop(&mut self) {
        if self.filled {
            return;
        }

        let mut slots = lock(&self.registry.slots);
        if slots
            .get(self.key)
            .is_some_and(|current| Arc::ptr_eq(current, self.slot))
        {
            slots.remove(self.key);
        }
    }
}

/// Ends its scope instance when dropped
pub struct ScopeGuard<'a> {
    registry: &'a TargetRegistry,
    id: ScopeId,
}

impl ScopeGuard<'_> {
    pub fn id(&self) -> ScopeId {
        self.id
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        debug!("closing scope {}", self.id);
        self.registry.end_scope(self.id);
    }
}

// A panicking factory must not wedge every later test on the same key.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
