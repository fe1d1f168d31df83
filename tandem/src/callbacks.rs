//! Events raised by the engine.
//!
//! The embedding layer forwards engine notifications to these [`Bridge`] methods. None of
//! them create bindings, and anything that touches the host is queued on the
//! [`UiQueue`](crate::UiQueue).

use crate::{
    binding::BindingState,
    bridge::Bridge,
    coords::{byte_col, Point, Snapshot},
    error::Result,
    host::{keys, DocId},
    mapper,
};
use serde::Deserialize;
use std::{ops::Range, time::Duration};

/// Highlight attributes mirrored into the host. Others (bold, italic, colors) are left to
/// the host's own syntax highlighting.
const MIRRORED_ATTRIBUTES: [&str; 3] = ["background", "underline", "reverse"];

const POPUP_STYLE: &str = r#"<style>
.tandem-popup-item { padding: 6px 14px 6px 14px; }
.tandem-popup-item-selected { background-color: color(var(--background) blend(grey 80%)); }
html, body, #tandem-popup { padding: 0; margin: 0; }
</style>
"#;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PopupItem {
    pub word: String,
    #[serde(default)]
    pub kind: String,
}

impl PopupItem {
    pub fn new(word: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            kind: kind.into(),
        }
    }
}

/// Completion menu events, as the engine reports them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupMenuEvent {
    Show {
        items: Vec<PopupItem>,
        selected: Option<usize>,
        /// Screen position of the menu. Hosts place popups at the caret instead.
        row: u32,
        col: u32,
    },
    Select {
        selected: Option<usize>,
    },
    Hide,
}

/// Completion menu as shown in the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Popup {
    pub items: Vec<PopupItem>,
    pub selected: Option<usize>,
}

impl Popup {
    pub fn render(&self) -> String {
        format!("{POPUP_STYLE}{}", self.render_items())
    }

    fn render_items(&self) -> String {
        let mut html = String::from("<div id=\"tandem-popup\">\n");
        for (index, item) in self.items.iter().enumerate() {
            let class = if self.selected == Some(index) {
                "tandem-popup-item tandem-popup-item-selected"
            } else {
                "tandem-popup-item"
            };
            html.push_str(&format!(
                "<div class=\"{class}\">{}</div>\n",
                escape_html(&item.word)
            ));
        }
        html.push_str("</div>\n");
        html
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;")
}

/// Answer to the engine's completion function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// 0-based byte column where the word being completed starts.
    Start(u32),
    Words(Vec<String>),
    /// Nothing to complete.
    Cancel,
}

/// One highlighted span of the engine screen, in screen cells.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Highlight {
    /// 0-based screen row.
    pub line: u32,
    pub start: u32,
    pub end: u32,
    /// Attribute names set on the span (`"background"`, `"bold"`, ...).
    pub attributes: Vec<String>,
}

impl Highlight {
    fn is_mirrored(&self) -> bool {
        self.attributes
            .iter()
            .any(|attr| MIRRORED_ATTRIBUTES.contains(&attr.as_str()))
    }
}

/// State of the engine screen after a redraw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreenSnapshot {
    /// Redraw counter; only grows.
    pub changes: u64,
    pub highlights: Vec<Highlight>,
}

impl Bridge {
    /// Apply the configured bell settings for the configured duration.
    pub fn on_bell(&self, doc: DocId) {
        let Some(binding) = self.inner.registry.get(doc) else {
            return;
        };
        let bell = self.inner.config.read().settings.modal.bell.clone();
        let Some(duration) = bell.duration.filter(|secs| *secs > 0.0) else {
            return;
        };
        let duration = Duration::try_from_secs_f64(duration).unwrap_or_default();

        let bridge = self.clone();
        self.inner.ui.defer(move || {
            let stamp = {
                let mut state = binding.lock();
                state.bells += 1;
                state.bells
            };
            for (key, value) in &bell.settings {
                bridge.inner.host.set_setting(doc, key, value.clone());
            }

            let ring = bridge.clone();
            bridge.inner.ui.defer_after(duration, move || {
                let mut state = binding.lock();
                if state.bells != stamp {
                    return;
                }
                for key in bell.settings.keys() {
                    ring.inner.host.erase_setting(doc, key);
                }
                if let Err(err) = ring.refresh_view(doc, &mut state) {
                    tracing::warn!(%doc, "view refresh failed: {err}");
                }
            });
        });
    }

    pub fn on_popupmenu(&self, doc: DocId, event: PopupMenuEvent) {
        let Some(binding) = self.inner.registry.get(doc) else {
            return;
        };
        let host = self.inner.host.clone();
        self.inner.ui.defer(move || {
            let mut state = binding.lock();
            match event {
                PopupMenuEvent::Show {
                    items, selected, ..
                } => {
                    let popup = Popup { items, selected };
                    host.show_popup(doc, &popup.render());
                    state.popup = Some(popup);
                },
                PopupMenuEvent::Select { selected } => {
                    let Some(popup) = state.popup.as_mut() else {
                        return;
                    };
                    popup.selected = selected;
                    let html = popup.render();
                    if host.is_popup_visible(doc) {
                        host.update_popup(doc, &html);
                    } else {
                        host.show_popup(doc, &html);
                    }
                },
                PopupMenuEvent::Hide => {
                    state.popup = None;
                    host.hide_popup(doc);
                },
            }
        });
    }

    /// The engine wrote the buffer; save the host document instead.
    pub fn on_write(&self, doc: DocId) {
        if self.inner.registry.get(doc).is_none() {
            return;
        }
        let host = self.inner.host.clone();
        self.inner.ui.defer(move || {
            if let Err(err) = host.save(doc) {
                tracing::warn!(%doc, "save failed: {err:#}");
            }
        });
    }

    /// Completion function for the engine. With `find_start`, locate the start of the
    /// word under the cursor; otherwise list host completions for `prefix`.
    pub fn on_complete(&self, doc: DocId, find_start: bool, prefix: &str) -> Completion {
        if self.inner.registry.get(doc).is_none() {
            return Completion::Cancel;
        }
        let (snapshot, cursor) = match self.engine_cursor(doc) {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(%doc, "completion skipped: {err}");
                return Completion::Cancel;
            },
        };

        let host = &self.inner.host;
        if find_start {
            let word = host.word_at(doc, cursor);
            let point = snapshot.offset_to_point(word.start);
            let column = byte_col(snapshot.line(point.row), point.column as usize);
            return Completion::Start(column as u32);
        }
        Completion::Words(host.completions(doc, prefix, cursor))
    }

    /// The engine redrew its screen. Stale snapshots are dropped and the highlight
    /// refresh is queued; a newer redraw supersedes a queued one.
    pub fn on_redraw(&self, doc: DocId, screen: ScreenSnapshot) {
        let Some(binding) = self.inner.registry.get(doc) else {
            return;
        };
        {
            let mut state = binding.lock();
            if screen.changes <= state.screen_changes {
                return;
            }
            state.screen_changes = screen.changes;
        }

        let bridge = self.clone();
        let stamp = screen.changes;
        self.inner.ui.defer(move || {
            let mut state = binding.lock();
            if state.screen_changes != stamp {
                tracing::trace!(%doc, stamp, "highlight refresh superseded");
                return;
            }
            if let Err(err) = bridge.refresh_highlights(doc, &mut state, Some(screen.highlights)) {
                tracing::warn!(%doc, "highlight refresh failed: {err}");
            }
        });
    }

    /// Mirror engine highlights as host regions. `None` republishes the last set.
    pub(crate) fn refresh_highlights(
        &self,
        doc: DocId,
        state: &mut BindingState,
        highlights: Option<Vec<Highlight>>,
    ) -> Result<()> {
        if !self.inner.config.read().highlights {
            return Ok(());
        }
        let fresh = highlights.is_some();
        let Some(highlights) = highlights.or_else(|| state.last_highlights.clone()) else {
            return Ok(());
        };

        let status = self.inner.engine.status(false)?;
        let visible: Vec<Highlight> = highlights
            .into_iter()
            .filter(|hl| hl.is_mirrored() && hl.line < status.window_height)
            .collect();
        if fresh && state.last_highlights.as_ref() == Some(&visible) {
            return Ok(());
        }

        let view = status.window_view;
        let line_offset = view.topline - view.topfill - 1;
        let col_offset = view.leftcol - view.skipcol;
        let snapshot = Snapshot::new(self.inner.host.text(doc));

        let regions: Vec<Range<usize>> = visible
            .iter()
            .filter_map(|hl| {
                let row = u32::try_from(i64::from(hl.line) + line_offset).ok()?;
                let mut start = (i64::from(hl.start) + col_offset).max(0) as usize;
                let mut end = (i64::from(hl.end) + col_offset).max(0) as usize;
                if !status.expandtab {
                    // Screen cells to characters: each tab before the column took
                    // `tab_stop` cells but is one character.
                    let line = snapshot.line(row);
                    let widen = status.tab_stop.saturating_sub(1) as usize;
                    let fix = |cells: usize| {
                        let tabs = line.chars().take(cells).filter(|c| *c == '\t').count();
                        cells.saturating_sub(tabs * widen)
                    };
                    start = fix(start);
                    end = fix(end);
                }
                let a = snapshot.point_to_offset(Point::new(row, start as u32));
                let b = snapshot.point_to_offset(Point::new(row, end as u32));
                Some(a..b)
            })
            .collect();
        state.last_highlights = Some(visible);

        let host = &self.inner.host;
        if regions.is_empty() {
            host.erase_regions(doc, keys::HIGHLIGHT_REGIONS);
        } else {
            host.add_regions(doc, keys::HIGHLIGHT_REGIONS, &regions);
        }
        Ok(())
    }

    /// Snapshot of the host text and the host offset of the engine cursor.
    fn engine_cursor(&self, doc: DocId) -> Result<(Snapshot, usize)> {
        let status = self.inner.engine.status(false)?;
        let snapshot = Snapshot::new(self.inner.host.text(doc));
        let cursor = mapper::engine_to_host(&snapshot, &status.selection())
            .first()
            .b;
        Ok((snapshot, cursor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn popup_marks_selected_item_and_escapes() {
        let popup = Popup {
            items: vec![
                PopupItem::new("foo", "f"),
                PopupItem::new("a & b <c>", "v"),
            ],
            selected: Some(1),
        };

        insta::assert_snapshot!(popup.render_items(), @r#"
        <div id="tandem-popup">
        <div class="tandem-popup-item">foo</div>
        <div class="tandem-popup-item tandem-popup-item-selected">a &amp; b &lt;c></div>
        </div>
        "#);
        assert!(popup.render().starts_with("<style>"));
    }

    #[test]
    fn popup_without_selection() {
        let popup = Popup {
            items: vec![PopupItem::new("only", "")],
            selected: None,
        };
        assert!(!popup.render_items().contains("selected"));
    }

    #[test]
    fn mirrored_attributes() {
        let highlight = |attributes: &[&str]| Highlight {
            line: 0,
            start: 0,
            end: 1,
            attributes: attributes.iter().map(|a| a.to_string()).collect(),
        };
        assert!(highlight(&["bold", "reverse"]).is_mirrored());
        assert!(!highlight(&["bold", "italic"]).is_mirrored());
        assert!(!highlight(&[]).is_mirrored());
    }
}
