//! Synchronization between host documents and engine buffers.
//!
//! [`Bridge`] is the only entry point hosts use. Its operations never fail: each one
//! resolves the document's [`Binding`], runs with the binding locked, and logs and skips
//! the pass if anything goes wrong. Everything is a silent no-op until the engine reports
//! itself loaded.
//!
//! Text moves in two directions:
//!
//! - **push** (host → engine): the whole host text replaces the engine buffer, followed by
//!   the host selection. Guarded by the binding's [`ChangeLedger`](crate::ChangeLedger).
//! - **pull** (engine → host): queued on the [`UiQueue`]. When the engine tick advanced,
//!   the host text is replaced in two edits split at the start of the selection, then
//!   the engine selection is decoded and applied.

use crate::{
    binding::{Binding, BindingState, SyncPhase},
    config::{ColumnAuthority, Config},
    coords::Snapshot,
    engine::{BufferHandle, Engine, EngineStatus, IndentSettings, UNDO_DISABLED, UNDO_GLOBAL},
    error::{Error, Result},
    host::{keys, DocId, Host},
    mapper,
    registry::Registry,
    selection::{DragKind, Selection},
    ui::UiQueue,
};
use parking_lot::RwLock;
use serde_json::json;
use std::{path::Path, sync::Arc};

/// Used when the host has no tab size setting.
const DEFAULT_TAB_SIZE: u32 = 4;

#[derive(Clone)]
pub struct Bridge {
    pub(crate) inner: Arc<BridgeInner>,
}

pub(crate) struct BridgeInner {
    pub host: Arc<dyn Host>,
    pub engine: Arc<dyn Engine>,
    pub config: RwLock<Config>,
    pub registry: Registry,
    pub ui: UiQueue,
}

impl Bridge {
    pub fn new(host: Arc<dyn Host>, engine: Arc<dyn Engine>, config: Config) -> Self {
        let registry = Registry::new(config.max_documents);
        Self {
            inner: Arc::new(BridgeInner {
                host,
                engine,
                config: RwLock::new(config),
                registry,
                ui: UiQueue::new(),
            }),
        }
    }

    /// Queue the host drains on its UI thread.
    pub fn ui(&self) -> &UiQueue {
        &self.inner.ui
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn config(&self) -> Config {
        self.inner.config.read().clone()
    }

    /// Replace the configuration. Open bindings pick it up on their next pass.
    pub fn set_config(&self, config: Config) {
        self.inner.registry.set_limit(config.max_documents);
        *self.inner.config.write() = config;
    }

    /// Binding for `doc`, created on first reference. `None` for documents that cannot
    /// be bound; the reason is logged.
    pub fn binding(&self, doc: DocId) -> Option<Arc<Binding>> {
        match self
            .inner
            .registry
            .get_or_create(doc, || self.create_binding(doc))
        {
            Ok(binding) => Some(binding),
            Err(err @ Error::ProxyDocument(_)) => {
                tracing::trace!("{err}");
                None
            },
            Err(err) => {
                tracing::warn!(%doc, "document left unmanaged: {err}");
                None
            },
        }
    }

    /// Whether `doc` is in modal editing and the engine is up.
    pub fn is_active(&self, doc: DocId) -> bool {
        self.inner.engine.is_loaded() && self.inner.host.flag(doc, keys::MODAL_MODE)
    }

    /// Make `doc` the engine's current buffer, creating and filling the buffer on first
    /// use.
    pub fn activate(&self, doc: DocId) {
        let Some(binding) = self.active_binding(doc) else {
            return;
        };
        let mut state = binding.lock();
        if let Err(err) = self.activate_locked(doc, &mut state) {
            tracing::warn!(%doc, "activation failed, skipping: {err}");
        }
    }

    /// Turn modal editing on or off for every open document.
    pub fn enable(&self, enabled: bool) {
        self.inner.config.write().enabled = enabled;
        let host = &self.inner.host;

        for binding in self.inner.registry.all() {
            let doc = binding.doc();
            let mut state = binding.lock();
            if state.native_only {
                continue;
            }
            host.set_setting(doc, keys::MODAL_MODE, json!(enabled));
            host.set_setting(doc, keys::INTERCEPT, json!(enabled));
            if let Err(err) = self.refresh_view(doc, &mut state) {
                tracing::warn!(%doc, "view refresh failed: {err}");
            }
        }
        tracing::info!(enabled, "modal editing toggled");

        if enabled {
            if let Some(doc) = host.active_document() {
                self.activate(doc);
            }
        }
    }

    /// Push host text to the engine if it changed, or unconditionally with `force`.
    pub fn sync_to_backend(&self, doc: DocId, force: bool) {
        let Some(binding) = self.active_binding(doc) else {
            return;
        };
        let mut state = binding.lock();
        if let Err(err) = self.push_text(doc, &mut state, force) {
            tracing::warn!(%doc, "skipping sync to engine: {err}");
        }
    }

    /// Queue a pull of engine text and selection into the host.
    pub fn sync_from_backend(&self, doc: DocId) {
        let Some(binding) = self.active_binding(doc) else {
            return;
        };
        let bridge = self.clone();
        self.inner.ui.defer(move || {
            let mut state = binding.lock();
            if let Err(err) = bridge.pull_text(doc, &mut state) {
                tracing::warn!(%doc, "skipping sync from engine: {err}");
            }
        });
    }

    /// Push the host selection to the engine.
    pub fn selection_to_backend(&self, doc: DocId, force: bool) {
        let Some(binding) = self.active_binding(doc) else {
            return;
        };
        let mut state = binding.lock();
        if let Err(err) = self.push_selection(doc, &mut state, force) {
            tracing::warn!(%doc, "skipping selection sync to engine: {err}");
        }
    }

    /// Apply the engine selection to the host.
    pub fn selection_from_backend(&self, doc: DocId) {
        let Some(binding) = self.active_binding(doc) else {
            return;
        };
        let mut state = binding.lock();
        let snapshot = Snapshot::new(self.inner.host.text(doc));
        if let Err(err) = self.pull_selection(doc, &mut state, &snapshot) {
            tracing::warn!(%doc, "skipping selection sync from engine: {err}");
        }
    }

    /// Reapply mode-dependent settings and the viewport size.
    pub fn update_view(&self, doc: DocId) {
        if !self.inner.engine.is_loaded() {
            return;
        }
        let Some(binding) = self.binding(doc) else {
            return;
        };
        let mut state = binding.lock();
        if let Err(err) = self.refresh_view(doc, &mut state) {
            tracing::warn!(%doc, "view refresh failed: {err}");
        }
    }

    /// Feed one key to the engine. Returns whether the engine finished processing its
    /// input, in which case the host is resynchronized.
    pub fn press(&self, doc: DocId, key: &str) -> bool {
        let Some(binding) = self.active_binding(doc) else {
            return false;
        };
        if let Err(err) = binding.enqueue_key(key) {
            tracing::warn!("dropping key {key:?}: {err}");
            return false;
        }

        let mut state = binding.lock();
        let Some(key) = binding.dequeue_key() else {
            return false;
        };
        if state.buffer.is_none() {
            tracing::trace!(%doc, key = %key, "no engine buffer, dropping key");
            return false;
        }
        if let Err(err) = self.push_text(doc, &mut state, false) {
            tracing::warn!(%doc, "skipping sync to engine: {err}");
        }

        tracing::trace!(%doc, key = %key, "feeding key");
        let outcome = match self.inner.engine.press(&key) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(%doc, "engine rejected key {key:?}: {err:#}");
                return false;
            },
        };

        if outcome.ready {
            self.sync_from_backend(doc);
            if let Err(err) = self.refresh_view(doc, &mut state) {
                tracing::warn!(%doc, "view refresh failed: {err}");
            }
        }
        outcome.ready
    }

    /// Set how the user is extending the selection with the mouse.
    pub fn set_drag_kind(&self, doc: DocId, drag: DragKind) {
        if let Some(binding) = self.inner.registry.get(doc) {
            binding.lock().drag = drag;
        }
    }

    /// Rename the engine buffer after the host document was saved under a new path.
    pub fn set_path(&self, doc: DocId, path: &Path) {
        let Some(binding) = self.active_binding(doc) else {
            return;
        };
        let Some(buffer) = binding.buffer() else {
            return;
        };
        if let Err(err) = self.inner.engine.buf_set_name(buffer, path) {
            tracing::warn!(%doc, "failed to rename engine buffer: {err:#}");
        }
    }

    /// Stop pushing host edits to the engine until [`release_pushes`](Self::release_pushes).
    pub fn hold_pushes(&self, doc: DocId) {
        if let Some(binding) = self.inner.registry.get(doc) {
            binding.lock().hold_pushes = true;
        }
    }

    /// Resume pushes, replaying one that was held back.
    pub fn release_pushes(&self, doc: DocId) {
        let Some(binding) = self.inner.registry.get(doc) else {
            return;
        };
        let mut state = binding.lock();
        state.hold_pushes = false;
        if !std::mem::take(&mut state.push_suppressed) || !self.inner.engine.is_loaded() {
            return;
        }
        if let Err(err) = self.push_text(doc, &mut state, false) {
            tracing::warn!(%doc, "skipping sync to engine: {err}");
        }
    }

    /// Tell the bridge the host is about to make `count` edits that mirror the engine,
    /// so they are not pushed back.
    pub fn expect_host_edits(&self, doc: DocId, count: u64) {
        let Some(binding) = self.inner.registry.get(doc) else {
            return;
        };
        let revision = self.inner.host.revision(doc);
        binding.lock().ledger.mark_pushed(revision, count);
    }

    /// Drop the binding and its engine buffer.
    pub fn close(&self, doc: DocId) {
        let Some(binding) = self.inner.registry.remove(doc) else {
            return;
        };
        let engine = &self.inner.engine;
        if !engine.is_loaded() {
            return;
        }
        engine.force_ready();
        if let Some(buffer) = binding.buffer() {
            if let Err(err) = engine.buf_close(buffer) {
                tracing::warn!(%doc, "failed to close engine buffer: {err:#}");
            }
        }
        tracing::debug!(%doc, "closed binding");
    }

    /// Binding for `doc` if the engine is up and the document is in modal editing.
    fn active_binding(&self, doc: DocId) -> Option<Arc<Binding>> {
        if !self.inner.engine.is_loaded() {
            return None;
        }
        let binding = self.binding(doc)?;
        self.is_active(doc).then_some(binding)
    }

    fn create_binding(&self, doc: DocId) -> Result<Binding> {
        let host = &self.inner.host;
        if host.flag(doc, keys::PROXY) {
            return Err(Error::ProxyDocument(doc));
        }

        let config = self.inner.config.read();
        let binding = Binding::new(doc, config.key_queue_capacity);
        let native_only = config.large_file_disable.exceeded_by(&host.text(doc));
        if native_only {
            tracing::info!(%doc, "document over the large file limit, keeping native editing");
        }
        binding.lock().native_only = native_only;

        let modal = config.enabled && !native_only;
        host.set_setting(doc, keys::MODAL_MODE, json!(modal));
        host.set_setting(doc, keys::INTERCEPT, json!(modal));
        Ok(binding)
    }

    fn activate_locked(&self, doc: DocId, state: &mut BindingState) -> Result<()> {
        let engine = &self.inner.engine;
        let (buffer, created) = match state.buffer {
            Some(buffer) => (buffer, false),
            None => {
                let buffer = engine.buf_new()?;
                state.buffer = Some(buffer);
                (buffer, true)
            },
        };

        if engine.activate(buffer)? {
            tracing::debug!(%doc, ?buffer, "switched engine buffer");
        }

        if created {
            if let Some(path) = self.inner.host.file_name(doc) {
                engine.buf_set_name(buffer, &path)?;
            }
            // The initial fill is not something to undo.
            engine.buf_set_option(buffer, "undolevels", UNDO_DISABLED)?;
            let filled = self.push_text(doc, state, true);
            engine.buf_set_option(buffer, "undolevels", UNDO_GLOBAL)?;
            filled?;
        } else if !self.push_text(doc, state, false)? {
            self.push_selection(doc, state, false)?;
        }

        self.status_from_engine(doc);
        self.refresh_view(doc, state)?;
        self.refresh_highlights(doc, state, None)
    }

    /// Returns whether text was pushed.
    pub(crate) fn push_text(
        &self,
        doc: DocId,
        state: &mut BindingState,
        force: bool,
    ) -> Result<bool> {
        let buffer = state.buffer.ok_or(Error::NoBuffer(doc))?;
        let host = &self.inner.host;
        let revision = host.revision(doc);

        if !force && !state.ledger.needs_push(revision) {
            state.ledger.prime_size(revision.size);
            return Ok(false);
        }
        if state.hold_pushes {
            tracing::debug!(%doc, "pushes on hold, deferring");
            state.push_suppressed = true;
            return Ok(false);
        }

        tracing::debug!(%doc, ?revision, force, "pushing text to engine");
        state.enter(SyncPhase::Pushing);
        state.ledger.mark_pushed(revision, 0);
        let lines = host.text(doc).split('\n').map(str::to_owned).collect();
        let result = self.replace_engine_text(doc, state, buffer, lines);
        if result.is_err() {
            state.ledger.forget_push();
        }
        state.enter(SyncPhase::Idle);
        result.map(|()| true)
    }

    fn replace_engine_text(
        &self,
        doc: DocId,
        state: &mut BindingState,
        buffer: BufferHandle,
        lines: Vec<String>,
    ) -> Result<()> {
        let engine = &self.inner.engine;
        engine.buf_set_lines(buffer, lines)?;
        state.enter(SyncPhase::AwaitingSelection);
        self.push_selection(doc, state, true)?;
        state.ledger.mark_pulled(engine.buf_tick(buffer)?);
        Ok(())
    }

    fn push_selection(&self, doc: DocId, state: &mut BindingState, force: bool) -> Result<()> {
        let host = &self.inner.host;
        if state.ledger.needs_push(host.revision(doc)) {
            tracing::debug!(%doc, "text push pending, skipping selection");
            return Ok(());
        }
        if state.buffer.is_none() {
            return Err(Error::NoBuffer(doc));
        }

        let selection = host.selection(doc);
        if !force && !state.selection_changed(&selection) {
            return Ok(());
        }

        let snapshot = Snapshot::new(host.text(doc));
        let encoded = mapper::host_to_engine(&snapshot, &selection, state.drag);
        tracing::debug!(%doc, ?encoded, "pushing selection");
        self.inner.engine.select(&encoded)?;
        state.last_selection = Some(selection);

        self.pull_selection(doc, state, &snapshot)?;
        self.refresh_view(doc, state)
    }

    /// Decode the engine selection against `snapshot` and apply it to the host.
    fn pull_selection(
        &self,
        doc: DocId,
        state: &mut BindingState,
        snapshot: &Snapshot,
    ) -> Result<()> {
        let status = self.inner.engine.status(true)?;
        self.indent_from_engine(doc, state, &status);

        let selection = mapper::engine_to_host(snapshot, &status.selection());
        tracing::trace!(%doc, ?selection, "applying engine selection");
        self.inner.host.set_selection(doc, selection.clone());
        self.scroll_into_view(doc, state, snapshot, &selection);
        state.last_selection = Some(selection);
        Ok(())
    }

    fn scroll_into_view(
        &self,
        doc: DocId,
        state: &mut BindingState,
        snapshot: &Snapshot,
        selection: &Selection,
    ) {
        let host = &self.inner.host;
        if !state.first_scroll {
            let visible = host.visible_range(doc);
            if let [region] = selection.regions() {
                // A cursor on the first or last visible line may be clipped.
                let row = snapshot.offset_to_point(region.b).row;
                let edge = row == snapshot.offset_to_point(visible.start).row
                    || row == snapshot.offset_to_point(visible.end).row;
                if edge || !visible.contains(&region.b) {
                    host.show(doc, region.b);
                }
            } else if !selection.iter().any(|region| visible.contains(&region.b)) {
                host.show_range(doc, selection.covering_range());
            }
            return;
        }

        // A freshly opened document has no layout yet; try once it does.
        state.first_scroll = false;
        let host = host.clone();
        let delay = self.inner.config.read().first_scroll_delay();
        self.inner.ui.defer_after(delay, move || {
            let cursor = host.selection(doc).primary().b;
            host.show(doc, cursor);
        });
    }

    fn pull_text(&self, doc: DocId, state: &mut BindingState) -> Result<()> {
        let buffer = state.buffer.ok_or(Error::NoBuffer(doc))?;
        state.enter(SyncPhase::Pulling);
        let result = self.pull_text_inner(doc, state, buffer);
        state.enter(SyncPhase::Idle);
        result
    }

    fn pull_text_inner(
        &self,
        doc: DocId,
        state: &mut BindingState,
        buffer: BufferHandle,
    ) -> Result<()> {
        let host = &self.inner.host;
        let engine = &self.inner.engine;

        let tick = engine.buf_tick(buffer)?;
        if state.ledger.needs_pull(tick) {
            let current = Snapshot::new(host.text(doc));
            let text = engine.buf_lines(buffer)?.join("\n");
            if text != current.text() {
                tracing::debug!(%doc, tick, "pulling engine text");
                // Two edits split at the selection keep the host's view of the text
                // around the cursor stable.
                let split = host
                    .selection(doc)
                    .covering_range()
                    .start
                    .min(current.len());
                let incoming = Snapshot::new(text);
                let split_at = incoming.char_to_byte(split.min(incoming.len()));
                let (prefix, tail) = incoming.text().split_at(split_at);

                host.replace(doc, split..current.len(), tail);
                host.replace(doc, 0..split, prefix);
            }
            state.ledger.mark_pulled(tick);
            state.ledger.mark_pushed(host.revision(doc), 0);
        }

        let snapshot = Snapshot::new(host.text(doc));
        self.pull_selection(doc, state, &snapshot)?;
        self.status_from_engine(doc);
        Ok(())
    }

    fn status_from_engine(&self, doc: DocId) {
        let line = self.inner.engine.status_line();
        self.inner
            .host
            .set_status(doc, keys::STATUS, line.as_deref().filter(|line| !line.is_empty()));
    }

    /// Apply settings for the current mode, resize the engine to the viewport, and push
    /// indentation when the host owns it.
    pub(crate) fn refresh_view(&self, doc: DocId, state: &mut BindingState) -> Result<()> {
        let host = &self.inner.host;
        let engine = &self.inner.engine;
        let config = self.inner.config.read();

        let modal = host.flag(doc, keys::MODAL_MODE);
        let mode = modal.then(|| engine.mode());
        let mut settings = config.settings.resolve(mode.as_ref());
        settings
            .entry(keys::BLOCK_CARET)
            .or_insert_with(|| json!(mode.as_ref().is_some_and(|mode| !mode.is_insert())));

        for key in std::mem::take(&mut state.applied_settings) {
            if !settings.contains_key(&key) {
                host.erase_setting(doc, &key);
            }
        }
        for (key, value) in &settings {
            host.set_setting(doc, key, value.clone());
        }
        state.applied_settings = settings.keys().cloned().collect();

        if !modal {
            return Ok(());
        }
        let (columns, rows) = host.viewport_cells(doc);
        engine.resize(columns, rows)?;
        if config.column_authority == ColumnAuthority::Host {
            self.indent_to_engine(doc, state)?;
        }
        Ok(())
    }

    fn host_indent(&self, doc: DocId) -> IndentSettings {
        let host = &self.inner.host;
        let tab_size = host
            .setting(doc, keys::TAB_SIZE)
            .and_then(|value| value.as_u64())
            .and_then(|size| u32::try_from(size).ok())
            .unwrap_or(DEFAULT_TAB_SIZE);
        IndentSettings {
            expand_tabs: host.flag(doc, keys::EXPAND_TABS),
            tab_size,
            read_only: host.is_read_only(doc),
        }
    }

    fn indent_to_engine(&self, doc: DocId, state: &mut BindingState) -> Result<()> {
        let indent = self.host_indent(doc);
        if state.last_indent == Some(indent) {
            return Ok(());
        }
        tracing::debug!(%doc, ?indent, "pushing indent settings");
        for command in indent.commands() {
            self.inner.engine.cmd(&command)?;
        }
        state.last_indent = Some(indent);
        Ok(())
    }

    fn indent_from_engine(&self, doc: DocId, state: &mut BindingState, status: &EngineStatus) {
        if self.inner.config.read().column_authority != ColumnAuthority::Engine {
            return;
        }
        let host = &self.inner.host;
        host.set_setting(doc, keys::EXPAND_TABS, json!(status.expandtab));
        host.set_setting(doc, keys::TAB_SIZE, json!(status.tab_stop));
        state.last_indent = Some(IndentSettings {
            expand_tabs: status.expandtab,
            tab_size: status.tab_stop,
            read_only: host.is_read_only(doc),
        });
    }
}
