use std::fmt;

use crate::registry::Registry;
use crate::types::{InstanceKey, UNTRACKED};

/// A handle owning one reference to a tracked instance.
///
/// Cloning adds a reference; dropping releases one. The last handle to go
/// destroys the instance. This is the in-process counterpart of a
/// managed-domain proxy, whose finalizer performs the same release across
/// the boundary.
pub struct ProxyRef<'r, T> {
    registry: &'r Registry<T>,
    key: InstanceKey,
}

impl<'r, T> ProxyRef<'r, T> {
    pub(crate) fn new(registry: &'r Registry<T>, key: InstanceKey) -> Self {
        Self { registry, key }
    }

    /// The identity of the instance this handle refers to.
    ///
    /// Keys are plain copyable tokens; handing one out does not add a
    /// reference.
    pub fn key(&self) -> InstanceKey {
        self.key
    }

    /// Runs `f` with shared access to the instance, under the registry
    /// lock.
    ///
    /// Returns `None` only if the instance was destroyed out from under
    /// this handle by unbalanced key-level releases elsewhere.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.registry.with(self.key, f)
    }
}

impl<T> fmt::Debug for ProxyRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ProxyRef({:?})", self.key)
    }
}

impl<T> Clone for ProxyRef<'_, T> {
    fn clone(&self) -> Self {
        self.registry.add_ref(self.key);

        Self {
            registry: self.registry,
            key: self.key,
        }
    }
}

impl<T> Drop for ProxyRef<'_, T> {
    fn drop(&mut self) {
        if self.registry.release(self.key) == UNTRACKED {
            log::warn!(
                "proxy finalized for a key that is no longer tracked: {:?}",
                self.key
            );
        }
    }
}

impl<T> PartialEq for ProxyRef<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.registry, other.registry) && self.key == other.key
    }
}
