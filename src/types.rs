use slotmap::new_key_type;

new_key_type! {
    /// Opaque identity for one tracked native instance.
    ///
    /// Keys are minted by the registry when an instance is first tracked and
    /// are generational: once an instance is fully released, its key never
    /// resolves again, even if the underlying slot is reused for a newer
    /// instance. A stale key misses instead of aliasing.
    pub struct InstanceKey;
}

impl InstanceKey {
    /// The null key. Never tracked by any registry; [`Registry::release`]
    /// on it returns [`UNTRACKED`] and [`Registry::add_ref`] on it is a
    /// programmer error.
    ///
    /// `InstanceKey::default()` is the same key, which is what makes an
    /// uninitialized cached key work with [`Registry::get_or_create`].
    ///
    /// [`Registry::release`]: crate::Registry::release
    /// [`Registry::add_ref`]: crate::Registry::add_ref
    /// [`Registry::get_or_create`]: crate::Registry::get_or_create
    pub fn null() -> Self {
        Self::default()
    }

    /// Whether this is the null key.
    pub fn is_null(self) -> bool {
        self == Self::default()
    }
}

/// Reference count as returned by registry operations.
pub type RefCount = i32;

/// Returned by release and add_ref when the key is null, stale, or was never
/// tracked. No registry state changes when an operation returns this.
pub const UNTRACKED: RefCount = -1;
