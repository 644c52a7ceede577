use std::mem;

use parking_lot::Mutex;
use slotmap::SlotMap;

use crate::error::Result;
use crate::proxy::ProxyRef;
use crate::teardown::TeardownPolicy;
use crate::types::{InstanceKey, RefCount, UNTRACKED};

struct Tracked<T> {
    instance: T,
    count: RefCount,
}

/// Reference-counted registry for native instances shared with a
/// garbage-collected proxy domain.
///
/// Proxies in the managed domain are finalized asynchronously, with no
/// ordering relative to the creation of new proxies for the same instance.
/// Without coordination this destroys instances out from under live proxies:
///
/// * a proxy P1 is created for instance A;
/// * P1 becomes unreachable, but its finalizer has not run yet;
/// * a second proxy P2 is created for the same instance A;
/// * P1's finalizer runs and destroys A;
/// * P2 touches A and crashes on freed memory.
///
/// The registry closes that window by tracking one reference count per
/// instance under a single lock and destroying the instance only when the
/// count reaches zero. Proxies add a reference on creation and release it
/// from their finalizer. The registry owns each tracked instance outright,
/// so nothing else can destroy it while it is tracked.
///
/// One registry is instantiated per native type needing this protection,
/// normally for the lifetime of the process. What happens to instances still
/// tracked when the registry itself is dropped is controlled by
/// [`TeardownPolicy`].
pub struct Registry<T> {
    instances: Mutex<SlotMap<InstanceKey, Tracked<T>>>,
    teardown: TeardownPolicy,
}

impl<T> Registry<T> {
    /// Creates an empty registry with the default teardown policy.
    pub fn new() -> Self {
        Self::with_teardown(TeardownPolicy::default())
    }

    /// Creates an empty registry with an explicit teardown policy.
    pub fn with_teardown(teardown: TeardownPolicy) -> Self {
        Self {
            instances: Mutex::new(SlotMap::with_key()),
            teardown,
        }
    }

    /// Starts tracking `instance` with a reference count of 1 and mints its
    /// key.
    ///
    /// The registry owns the instance from this point on; it is destroyed
    /// when the last reference is released.
    pub fn track(&self, instance: T) -> InstanceKey {
        self.instances
            .lock()
            .insert(Tracked { instance, count: 1 })
    }

    /// Increments the reference count for a tracked instance.
    ///
    /// Returns the count after the increment. Passing the null key is a
    /// programmer error: it fails fast in debug builds, and in release
    /// builds returns [`UNTRACKED`] without touching the registry. A stale
    /// key (instance already fully released) is reported the same way, but
    /// without the debug assertion, since a finalizer racing a factory can
    /// produce one legitimately; use [`Registry::get_or_create`] for that
    /// path.
    pub fn add_ref(&self, key: InstanceKey) -> RefCount {
        debug_assert!(!key.is_null(), "null key passed to add_ref");

        let mut instances = self.instances.lock();

        let Some(tracked) = instances.get_mut(key) else {
            log::error!("add_ref on a key that is not tracked: {:?}", key);
            return UNTRACKED;
        };

        tracked.count += 1;
        tracked.count
    }

    /// Decrements the reference count, destroying the instance when the
    /// count reaches zero.
    ///
    /// Returns the count after the decrement, `0` meaning the instance was
    /// just destroyed. Returns [`UNTRACKED`] for a null, stale, or
    /// never-tracked key; this is recoverable (a double release from a
    /// misbehaving finalizer) and mutates nothing.
    pub fn release(&self, key: InstanceKey) -> RefCount {
        let mut instances = self.instances.lock();

        let Some(tracked) = instances.get_mut(key) else {
            return UNTRACKED;
        };

        tracked.count -= 1;

        if tracked.count > 0 {
            return tracked.count;
        }

        // The entry must vanish in the same critical section that decided to
        // destroy. The instance itself may drop after the lock is gone; no
        // other thread can reach it once the entry is erased.
        let destroyed = instances.remove(key);
        drop(instances);
        drop(destroyed);

        0
    }

    /// Atomic lookup-or-create for a factory's cached key.
    ///
    /// If `cached` still resolves to a tracked instance, its count is
    /// incremented and returned. Otherwise `factory` is invoked, the new
    /// instance is tracked with count 1, and the fresh key is written
    /// through `cached`. The whole check-then-create sequence runs under the
    /// registry lock, so two racing creators can never both invoke the
    /// factory for the same cached key.
    ///
    /// The factory runs while the lock is held: keep it from calling back
    /// into the same registry, or it will deadlock.
    pub fn get_or_create<F>(&self, cached: &mut InstanceKey, factory: F) -> RefCount
    where
        F: FnOnce() -> T,
    {
        let mut instances = self.instances.lock();

        if let Some(tracked) = instances.get_mut(*cached) {
            tracked.count += 1;
            return tracked.count;
        }

        *cached = instances.insert(Tracked {
            instance: factory(),
            count: 1,
        });

        1
    }

    /// Fallible version of [`Registry::get_or_create`].
    ///
    /// When the factory errs, nothing is registered and `cached` is left
    /// untouched.
    pub fn try_get_or_create<F>(&self, cached: &mut InstanceKey, factory: F) -> Result<RefCount>
    where
        F: FnOnce() -> Result<T>,
    {
        let mut instances = self.instances.lock();

        if let Some(tracked) = instances.get_mut(*cached) {
            tracked.count += 1;
            return Ok(tracked.count);
        }

        let instance = factory()?;
        *cached = instances.insert(Tracked { instance, count: 1 });

        Ok(1)
    }

    /// Tracks `instance` and wraps the initial reference in a [`ProxyRef`],
    /// which releases it on drop.
    pub fn track_proxy(&self, instance: T) -> ProxyRef<'_, T> {
        let key = self.track(instance);
        ProxyRef::new(self, key)
    }

    /// Adds a reference to a tracked instance and wraps it in a
    /// [`ProxyRef`]. Returns `None` if the key no longer resolves.
    pub fn proxy(&self, key: InstanceKey) -> Option<ProxyRef<'_, T>> {
        let mut instances = self.instances.lock();
        let tracked = instances.get_mut(key)?;
        tracked.count += 1;

        Some(ProxyRef::new(self, key))
    }

    /// Current reference count for `key`, or [`UNTRACKED`] if it does not
    /// resolve.
    pub fn ref_count(&self, key: InstanceKey) -> RefCount {
        self.instances
            .lock()
            .get(key)
            .map(|tracked| tracked.count)
            .unwrap_or(UNTRACKED)
    }

    /// Whether `key` currently resolves to a tracked instance.
    pub fn contains(&self, key: InstanceKey) -> bool {
        self.instances.lock().contains_key(key)
    }

    /// Number of distinct instances currently tracked.
    pub fn len(&self) -> usize {
        self.instances.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.lock().is_empty()
    }

    /// Runs `f` with shared access to the tracked instance, under the
    /// registry lock. Returns `None` if the key does not resolve.
    pub fn with<R>(&self, key: InstanceKey, f: impl FnOnce(&T) -> R) -> Option<R> {
        let instances = self.instances.lock();
        instances.get(key).map(|tracked| f(&tracked.instance))
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Registry<T> {
    fn drop(&mut self) {
        let instances = mem::take(self.instances.get_mut());

        if instances.is_empty() {
            return;
        }

        match self.teardown {
            TeardownPolicy::AssertEmpty => {
                panic!(
                    "{} instance(s) still tracked at registry teardown",
                    instances.len()
                );
            }
            TeardownPolicy::DropRemaining => {
                for (key, tracked) in &instances {
                    log::warn!(
                        "reference to {:?} not released at registry teardown (count: {}), destroying it anyway",
                        key,
                        tracked.count
                    );
                }
            }
            TeardownPolicy::Leak => {
                mem::forget(instances);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_on_null_key_is_untracked() {
        let registry = Registry::<u32>::new();

        assert_eq!(registry.release(InstanceKey::null()), UNTRACKED);
        assert!(registry.is_empty(), "no entry created by a null release");
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "null key passed to add_ref")]
    fn add_ref_on_null_key_fails_fast() {
        let registry = Registry::<u32>::new();

        registry.add_ref(InstanceKey::null());
    }

    #[test]
    fn add_ref_on_stale_key_is_untracked() {
        let registry = Registry::new();

        let key = registry.track(7u32);
        assert_eq!(registry.release(key), 0);

        assert_eq!(registry.add_ref(key), UNTRACKED);
        assert!(registry.is_empty(), "stale add_ref must not resurrect");
    }

    #[test]
    fn keys_are_never_reissued() {
        let registry = Registry::new();

        let first = registry.track(1u32);
        assert_eq!(registry.release(first), 0);

        // The freed slot is the natural candidate for reuse; the generation
        // still has to differ.
        let second = registry.track(2u32);
        assert_ne!(first, second);
        assert_eq!(registry.release(first), UNTRACKED);
        assert_eq!(registry.ref_count(second), 1, "newer instance unaffected");
    }
}
