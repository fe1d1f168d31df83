//! Change tracking for both sides of a binding.
//!
//! The host and the engine each bump their own counter whenever their copy of the text
//! changes. The ledger remembers what each counter read at the last synchronization so a
//! pass can tell which direction, if any, has work to do.

/// What the host reports about a document at a given moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostRevision {
    /// Host change counter.
    pub changes: u64,
    /// Document length in characters.
    pub size: usize,
}

impl HostRevision {
    pub fn new(changes: u64, size: usize) -> Self {
        Self { changes, size }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeLedger {
    /// Host counter at the last push, plus any edits the push was expected to cause.
    host_changes: Option<u64>,
    /// Engine tick at the last pull or push.
    engine_tick: Option<u64>,
    /// Size at the last push. A revert restores old content without bumping the host
    /// counter, so a size mismatch also means the engine is stale.
    cached_size: Option<usize>,
}

impl ChangeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether host content must be pushed to the engine.
    ///
    /// True before the first push, after any host counter advance, and when the cached
    /// size no longer matches.
    pub fn needs_push(&self, revision: HostRevision) -> bool {
        let advanced = self
            .host_changes
            .map_or(true, |changes| changes < revision.changes);
        let resized = self
            .cached_size
            .is_some_and(|size| size != revision.size);
        advanced || resized
    }

    /// Record a push.
    ///
    /// `delta` accounts for host edits the push itself is about to cause. Those edits
    /// change the size too, so a nonzero delta drops the cached size instead of
    /// recording a soon-to-be-wrong one.
    pub fn mark_pushed(&mut self, revision: HostRevision, delta: u64) {
        self.host_changes = Some(revision.changes + delta);
        self.cached_size = if delta == 0 { Some(revision.size) } else { None };
    }

    /// Undo a [`mark_pushed`](Self::mark_pushed) whose push never reached the engine, so
    /// the next pass pushes again.
    pub fn forget_push(&mut self) {
        self.host_changes = None;
        self.cached_size = None;
    }

    /// Cache `size` if nothing is cached. Used when a push is skipped.
    pub fn prime_size(&mut self, size: usize) {
        self.cached_size.get_or_insert(size);
    }

    /// Whether the engine changed since it was last observed.
    pub fn needs_pull(&self, tick: u64) -> bool {
        self.engine_tick.map_or(true, |last| tick > last)
    }

    pub fn mark_pulled(&mut self, tick: u64) {
        self.engine_tick = Some(tick);
    }

    pub fn engine_tick(&self) -> Option<u64> {
        self.engine_tick
    }

    pub fn host_changes(&self) -> Option<u64> {
        self.host_changes
    }

    pub fn cached_size(&self) -> Option<usize> {
        self.cached_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sync_always_pushes() {
        let ledger = ChangeLedger::new();
        assert!(ledger.needs_push(HostRevision::new(0, 0)));
    }

    #[test]
    fn clean_after_push() {
        let mut ledger = ChangeLedger::new();
        let revision = HostRevision::new(4, 120);
        ledger.mark_pushed(revision, 0);
        assert!(!ledger.needs_push(revision));
    }

    #[test]
    fn counter_advance_needs_push() {
        let mut ledger = ChangeLedger::new();
        ledger.mark_pushed(HostRevision::new(4, 120), 0);
        assert!(ledger.needs_push(HostRevision::new(5, 120)));
    }

    #[test]
    fn revert_is_caught_by_size() {
        let mut ledger = ChangeLedger::new();
        ledger.mark_pushed(HostRevision::new(4, 120), 0);
        assert!(ledger.needs_push(HostRevision::new(4, 90)));
    }

    #[test]
    fn delta_covers_expected_edits_and_drops_size() {
        let mut ledger = ChangeLedger::new();
        ledger.mark_pushed(HostRevision::new(4, 120), 2);
        assert_eq!(ledger.host_changes(), Some(6));
        assert_eq!(ledger.cached_size(), None);
        // The two expected edits land and change the size: nothing to push.
        assert!(!ledger.needs_push(HostRevision::new(6, 140)));
        assert!(ledger.needs_push(HostRevision::new(7, 140)));
    }

    #[test]
    fn prime_size_only_fills_an_empty_cache() {
        let mut ledger = ChangeLedger::new();
        ledger.mark_pushed(HostRevision::new(1, 10), 1);
        ledger.prime_size(12);
        assert_eq!(ledger.cached_size(), Some(12));
        ledger.prime_size(99);
        assert_eq!(ledger.cached_size(), Some(12));
    }

    #[test]
    fn forgotten_push_is_needed_again() {
        let mut ledger = ChangeLedger::new();
        let revision = HostRevision::new(3, 40);
        ledger.mark_pushed(revision, 0);
        ledger.mark_pulled(7);

        ledger.forget_push();
        assert!(ledger.needs_push(revision));
        assert_eq!(ledger.cached_size(), None);
        assert_eq!(ledger.engine_tick(), Some(7));
    }

    #[test]
    fn pull_needs_a_strictly_newer_tick() {
        let mut ledger = ChangeLedger::new();
        assert!(ledger.needs_pull(0));
        ledger.mark_pulled(3);
        assert!(!ledger.needs_pull(3));
        assert!(!ledger.needs_pull(2));
        assert!(ledger.needs_pull(4));
    }
}
