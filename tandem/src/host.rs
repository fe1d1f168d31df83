//! The host editor collaborator.
//!
//! Offsets are character offsets, rows are 0-based. Methods are called with a
//! [`Binding`](crate::Binding)'s lock held, so implementations must not call back into
//! the [`Bridge`](crate::Bridge) synchronously; queue such notifications instead.

use crate::{ledger::HostRevision, selection::Selection};
use serde_json::Value;
use std::{fmt, ops::Range, path::PathBuf};

/// Stable identifier of a host document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocId(pub u64);

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-document setting keys read or written by the bridge.
pub mod keys {
    /// Modal editing is on for the document.
    pub const MODAL_MODE: &str = "tandem.modal_mode";
    /// Key input is routed to the engine.
    pub const INTERCEPT: &str = "tandem.intercept";
    /// Set by hosts on widget and preview documents that must stay native.
    pub const PROXY: &str = "tandem.proxy";
    /// Host draws a block caret while the engine is in a command mode.
    pub const BLOCK_CARET: &str = "block_caret";
    pub const EXPAND_TABS: &str = "translate_tabs_to_spaces";
    pub const TAB_SIZE: &str = "tab_size";
    /// Status bar slot owned by the bridge.
    pub const STATUS: &str = "tandem";
    /// Named region set used for engine highlights.
    pub const HIGHLIGHT_REGIONS: &str = "tandem_highlight";
}

/// Interface to the host editor.
pub trait Host: Send + Sync {
    /// Full document text.
    fn text(&self, doc: DocId) -> String;

    /// Document length in characters.
    fn size(&self, doc: DocId) -> usize;

    /// Change counter; bumped on every content change except reverts.
    fn change_count(&self, doc: DocId) -> u64;

    fn replace(&self, doc: DocId, range: Range<usize>, text: &str);

    fn selection(&self, doc: DocId) -> Selection;

    /// Replace the whole selection at once.
    fn set_selection(&self, doc: DocId, selection: Selection);

    fn setting(&self, doc: DocId, key: &str) -> Option<Value>;

    fn set_setting(&self, doc: DocId, key: &str, value: Value);

    fn erase_setting(&self, doc: DocId, key: &str);

    fn is_read_only(&self, doc: DocId) -> bool;

    fn file_name(&self, doc: DocId) -> Option<PathBuf>;

    /// Viewport size in character cells, `(columns, rows)`.
    fn viewport_cells(&self, doc: DocId) -> (u32, u32);

    fn visible_range(&self, doc: DocId) -> Range<usize>;

    /// Scroll so `offset` is visible.
    fn show(&self, doc: DocId, offset: usize);

    /// Scroll so as much of `range` as fits is visible.
    fn show_range(&self, doc: DocId, range: Range<usize>);

    fn set_status(&self, doc: DocId, key: &str, value: Option<&str>);

    fn is_popup_visible(&self, doc: DocId) -> bool;

    fn show_popup(&self, doc: DocId, html: &str);

    fn update_popup(&self, doc: DocId, html: &str);

    fn hide_popup(&self, doc: DocId);

    fn add_regions(&self, doc: DocId, name: &str, regions: &[Range<usize>]);

    fn erase_regions(&self, doc: DocId, name: &str);

    /// Range of the word touching `offset`.
    fn word_at(&self, doc: DocId, offset: usize) -> Range<usize>;

    /// Completion candidates for `prefix` at `offset`.
    fn completions(&self, doc: DocId, prefix: &str, offset: usize) -> Vec<String>;

    fn save(&self, doc: DocId) -> anyhow::Result<()>;

    /// Document with input focus.
    fn active_document(&self) -> Option<DocId>;

    fn revision(&self, doc: DocId) -> HostRevision {
        HostRevision::new(self.change_count(doc), self.size(doc))
    }

    /// Boolean setting, false when unset or not a bool.
    fn flag(&self, doc: DocId, key: &str) -> bool {
        self.setting(doc, key)
            .and_then(|value| value.as_bool())
            .unwrap_or(false)
    }
}
