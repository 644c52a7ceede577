use shared_instance::{Registry, TeardownPolicy};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct DropTester {
    dropped: Arc<AtomicBool>,
}

impl DropTester {
    pub fn new(dropped: &Arc<AtomicBool>) -> Self {
        Self {
            dropped: dropped.clone(),
        }
    }
}

impl Drop for DropTester {
    fn drop(&mut self) {
        assert_eq!(self.dropped.load(Ordering::Relaxed), false, "double free");

        self.dropped.store(true, Ordering::Relaxed);
    }
}

#[test]
fn default_policy_is_drop_remaining() {
    assert_eq!(TeardownPolicy::default(), TeardownPolicy::DropRemaining);

    let dropped = Arc::new(AtomicBool::new(false));
    let registry = Registry::new();
    registry.track(DropTester::new(&dropped));

    drop(registry);
    assert!(dropped.load(Ordering::Relaxed));
}

#[test]
#[should_panic(expected = "still tracked at registry teardown")]
fn assert_empty_panics_on_leftovers() {
    let registry = Registry::with_teardown(TeardownPolicy::AssertEmpty);
    registry.track(1u32);

    drop(registry);
}

#[test]
fn assert_empty_accepts_balanced_shutdown() {
    let registry = Registry::with_teardown(TeardownPolicy::AssertEmpty);

    let key = registry.track(1u32);
    assert_eq!(registry.release(key), 0);

    drop(registry);
}

#[test]
fn drop_remaining_destroys_leftovers() {
    let dropped = Arc::new(AtomicBool::new(false));
    let registry = Registry::with_teardown(TeardownPolicy::DropRemaining);

    let key = registry.track(DropTester::new(&dropped));
    registry.add_ref(key);

    drop(registry);
    assert!(dropped.load(Ordering::Relaxed), "leftover destroyed once");
}

#[test]
fn leak_keeps_leftovers_alive() {
    let dropped = Arc::new(AtomicBool::new(false));
    let registry = Registry::with_teardown(TeardownPolicy::Leak);

    registry.track(DropTester::new(&dropped));

    drop(registry);
    assert!(
        !dropped.load(Ordering::Relaxed),
        "leaked instance never destroyed"
    );
}
