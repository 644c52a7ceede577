/// What a [`Registry`] does with instances still tracked when it is
/// dropped.
///
/// Instances left tracked at teardown mean some proxy was never finalized.
/// There is no universally right answer for that (destroying may race a
/// straggling finalizer, leaking hides the bug), so the choice is explicit
/// per registry.
///
/// [`Registry`]: crate::Registry
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TeardownPolicy {
    /// Panic if any instance is still tracked. Use when teardown order is
    /// controlled and a leftover instance is a hard bug.
    AssertEmpty,

    /// Warn about each instance still tracked, then destroy it.
    #[default]
    DropRemaining,

    /// Deliberately leak instances still tracked. Safe against a finalizer
    /// that fires after teardown, at the cost of the memory.
    Leak,
}
