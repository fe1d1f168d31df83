//! Per-document synchronization state.

use crate::{
    callbacks::{Highlight, Popup},
    engine::{BufferHandle, IndentSettings},
    error::{Error, Result},
    host::DocId,
    ledger::ChangeLedger,
    selection::{DragKind, Selection},
};
use parking_lot::{Mutex, MutexGuard};
use std::collections::VecDeque;

/// Where a binding is in a synchronization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncPhase {
    #[default]
    Idle,
    /// Host text is being written to the engine.
    Pushing,
    /// Text is written; the selection follows.
    AwaitingSelection,
    /// Engine text is being written to the host.
    Pulling,
}

/// Links one host document to one engine buffer.
///
/// All synchronization runs with [`BindingState`] locked, so passes on the same document
/// never interleave. Keys wait in a separate queue so that input arriving while a pass
/// runs is accepted without blocking on the state lock.
#[derive(Debug)]
pub struct Binding {
    doc: DocId,
    state: Mutex<BindingState>,
    keys: Mutex<VecDeque<String>>,
    key_capacity: usize,
}

#[derive(Debug, Default)]
pub(crate) struct BindingState {
    /// Created lazily on first activation.
    pub buffer: Option<BufferHandle>,
    pub ledger: ChangeLedger,
    pub last_selection: Option<Selection>,
    pub drag: DragKind,
    pub phase: SyncPhase,

    /// Set until the first selection pull scrolls the document.
    pub first_scroll: bool,
    /// Host setting keys written by the last view refresh.
    pub applied_settings: Vec<String>,
    pub last_indent: Option<IndentSettings>,
    /// Over the large-file limit; modal editing stays off.
    pub native_only: bool,

    pub hold_pushes: bool,
    pub push_suppressed: bool,

    pub popup: Option<Popup>,
    /// Bells rung so far; a bell's timer only clears it if no newer one rang.
    pub bells: u64,
    pub screen_changes: u64,
    pub last_highlights: Option<Vec<Highlight>>,
}

impl BindingState {
    /// Whether `current` differs from the last selection the engine agreed on.
    pub fn selection_changed(&self, current: &Selection) -> bool {
        self.last_selection.as_ref() != Some(current)
    }

    pub fn enter(&mut self, phase: SyncPhase) {
        tracing::trace!(from = ?self.phase, to = ?phase, "sync phase");
        self.phase = phase;
    }
}

impl Binding {
    pub fn new(doc: DocId, key_capacity: usize) -> Self {
        Self {
            doc,
            state: Mutex::new(BindingState {
                first_scroll: true,
                ..BindingState::default()
            }),
            keys: Mutex::new(VecDeque::new()),
            key_capacity,
        }
    }

    pub fn doc(&self) -> DocId {
        self.doc
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, BindingState> {
        self.state.lock()
    }

    /// Queue a key for the engine. Fails when the queue is at capacity.
    pub fn enqueue_key(&self, key: &str) -> Result<()> {
        let mut keys = self.keys.lock();
        if keys.len() >= self.key_capacity {
            return Err(Error::KeyQueueFull {
                doc: self.doc,
                capacity: self.key_capacity,
            });
        }
        keys.push_back(key.to_string());
        Ok(())
    }

    pub fn dequeue_key(&self) -> Option<String> {
        self.keys.lock().pop_front()
    }

    pub fn pending_keys(&self) -> usize {
        self.keys.lock().len()
    }

    pub fn phase(&self) -> SyncPhase {
        self.state.lock().phase
    }

    pub fn ledger(&self) -> ChangeLedger {
        self.state.lock().ledger.clone()
    }

    pub fn buffer(&self) -> Option<BufferHandle> {
        self.state.lock().buffer
    }

    pub fn drag_kind(&self) -> DragKind {
        self.state.lock().drag
    }

    pub fn is_native_only(&self) -> bool {
        self.state.lock().native_only
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::Region;

    #[test]
    fn key_queue_is_bounded_and_fifo() {
        let binding = Binding::new(DocId(1), 2);
        binding.enqueue_key("a").unwrap();
        binding.enqueue_key("b").unwrap();

        let err = binding.enqueue_key("c").unwrap_err();
        assert!(matches!(err, Error::KeyQueueFull { capacity: 2, .. }));

        assert_eq!(binding.dequeue_key().as_deref(), Some("a"));
        binding.enqueue_key("c").unwrap();
        assert_eq!(binding.dequeue_key().as_deref(), Some("b"));
        assert_eq!(binding.dequeue_key().as_deref(), Some("c"));
        assert_eq!(binding.dequeue_key(), None);
    }

    #[test]
    fn new_binding_is_idle_and_unbuffered() {
        let binding = Binding::new(DocId(7), 4);
        assert_eq!(binding.phase(), SyncPhase::Idle);
        assert_eq!(binding.buffer(), None);
        assert!(binding.lock().first_scroll);
    }

    #[test]
    fn selection_change_is_against_last_known() {
        let binding = Binding::new(DocId(1), 4);
        let mut state = binding.lock();
        let selection = Selection::single(Region::new(1, 4));

        assert!(state.selection_changed(&selection));
        state.last_selection = Some(selection.clone());
        assert!(!state.selection_changed(&selection));
        assert!(state.selection_changed(&Selection::cursor(2)));
    }
}
