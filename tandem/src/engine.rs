//! The modal engine collaborator.
//!
//! [`Engine`] is implemented by the process that embeds the Vim-compatible backend.
//! Tests use `test::MockEngine` instead.

use crate::{coords::EnginePoint, mapper::EngineSelection, mode::Mode};
use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

/// `undolevels` value that turns undo off for a buffer.
pub const UNDO_DISABLED: i64 = -1;
/// `undolevels` value that makes a buffer follow the global setting again.
pub const UNDO_GLOBAL: i64 = -123456;

/// Engine-side buffer identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u64);

/// Result of feeding one key to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyOutcome {
    /// Bytes of input the engine accepted.
    pub consumed: usize,
    /// False while a multi-key sequence is still pending.
    pub ready: bool,
}

/// Scroll state of the engine window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct WindowView {
    pub topline: i64,
    pub topfill: i64,
    pub leftcol: i64,
    pub skipcol: i64,
}

/// Snapshot of the engine's cursor and options, as reported by its status call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineStatus {
    pub mode: Mode,
    #[serde(rename = "vline")]
    pub anchor_line: u32,
    #[serde(rename = "vcol")]
    pub anchor_col: u32,
    #[serde(rename = "cline")]
    pub cursor_line: u32,
    #[serde(rename = "ccol")]
    pub cursor_col: u32,
    pub expandtab: bool,
    #[serde(rename = "ts")]
    pub tab_stop: u32,
    #[serde(rename = "wheight", default)]
    pub window_height: u32,
    #[serde(rename = "wview", default)]
    pub window_view: WindowView,
    #[serde(default)]
    pub read_only: bool,
}

impl EngineStatus {
    pub fn anchor(&self) -> EnginePoint {
        EnginePoint::new(self.anchor_line, self.anchor_col)
    }

    pub fn cursor(&self) -> EnginePoint {
        EnginePoint::new(self.cursor_line, self.cursor_col)
    }

    pub fn selection(&self) -> EngineSelection {
        EngineSelection::new(self.mode.clone(), self.anchor(), self.cursor())
    }
}

/// Indentation options mirrored from the host into the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndentSettings {
    pub expand_tabs: bool,
    pub tab_size: u32,
    pub read_only: bool,
}

impl IndentSettings {
    /// Ex commands that apply these settings.
    pub fn commands(&self) -> Vec<String> {
        let indent = if self.expand_tabs {
            format!(
                "set expandtab ts={ts} shiftwidth={ts} softtabstop=0 smarttab",
                ts = self.tab_size
            )
        } else {
            "set noexpandtab softtabstop=0".to_string()
        };
        let modifiable = if self.read_only { "set noma" } else { "set ma" };
        vec![indent, modifiable.to_string()]
    }
}

/// Interface to the embedded modal engine.
///
/// Calls may block on the engine process. Implementations synchronize internally so a
/// shared `Arc<dyn Engine>` can be used from the UI thread and key dispatch threads.
pub trait Engine: Send + Sync {
    /// Whether the engine process is up. Every sync operation is a no-op until it is.
    fn is_loaded(&self) -> bool;

    /// Flush any pending input state so the next call is answered immediately.
    fn force_ready(&self);

    fn buf_new(&self) -> Result<BufferHandle>;

    fn buf_close(&self, buffer: BufferHandle) -> Result<()>;

    fn buf_lines(&self, buffer: BufferHandle) -> Result<Vec<String>>;

    /// Replace the whole buffer.
    fn buf_set_lines(&self, buffer: BufferHandle, lines: Vec<String>) -> Result<()>;

    /// Change tick of the buffer; never decreases.
    fn buf_tick(&self, buffer: BufferHandle) -> Result<u64>;

    fn buf_set_name(&self, buffer: BufferHandle, path: &Path) -> Result<()>;

    fn buf_set_option(&self, buffer: BufferHandle, name: &str, value: i64) -> Result<()>;

    /// Make `buffer` current. Returns true if the current buffer changed.
    fn activate(&self, buffer: BufferHandle) -> Result<bool>;

    /// Current mode, answered from cached state.
    fn mode(&self) -> Mode;

    /// Run an ex command.
    fn cmd(&self, command: &str) -> Result<()>;

    /// Current status. `force` bypasses any cached copy.
    fn status(&self, force: bool) -> Result<EngineStatus>;

    /// Text of the engine's status line, if it shows one.
    fn status_line(&self) -> Option<String>;

    fn press(&self, key: &str) -> Result<KeyOutcome>;

    fn select(&self, selection: &EngineSelection) -> Result<()>;

    fn resize(&self, columns: u32, rows: u32) -> Result<()>;
}
