//! Conversion between host selections and the engine's mode-tagged selection.
//!
//! The host keeps a list of half-open regions, each with an anchor `a` and a cursor `b`.
//! The engine keeps one `(mode, anchor, cursor)` triple where visual selections include
//! the character under the cursor. Each direction of the mapping is handled per mode:
//!
//! | mode          | host → engine                              | engine → host                          |
//! |---------------|--------------------------------------------|----------------------------------------|
//! | cursor        | anchor = cursor                            | one empty region                       |
//! | visual        | larger endpoint steps back one character   | larger endpoint steps forward one      |
//! | visual line   | end at column 0 of a later row steps up    | whole lines, both ends                 |
//! | visual block  | corners of first/last region               | one region per row of the rectangle    |
//!
//! Line and block mappings are lossy: decoding a line selection always yields full
//! lines, and a block only keeps what fits in each row.

use crate::{
    coords::{EnginePoint, Point, Snapshot},
    mode::Mode,
    selection::{DragKind, Region, Selection},
};

/// The engine's view of a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSelection {
    pub mode: Mode,
    pub anchor: EnginePoint,
    pub cursor: EnginePoint,
}

impl EngineSelection {
    pub fn new(mode: Mode, anchor: EnginePoint, cursor: EnginePoint) -> Self {
        Self {
            mode,
            anchor,
            cursor,
        }
    }

    /// A plain cursor move.
    pub fn cursor(at: EnginePoint) -> Self {
        Self::new(Mode::Normal, at, at)
    }

    pub fn is_cursor(&self) -> bool {
        self.anchor == self.cursor && !self.mode.is_visual()
    }
}

/// Encode the host selection for the engine.
///
/// `drag` picks the visual flavour: line drags become linewise, column drags become
/// blockwise, everything else is characterwise. An empty primary region outside a column
/// drag is a plain cursor move.
pub fn host_to_engine(snapshot: &Snapshot, selection: &Selection, drag: DragKind) -> EngineSelection {
    if drag == DragKind::Columns {
        return encode_block(snapshot, selection);
    }

    let region = selection.primary();
    if region.is_empty() {
        return EngineSelection::cursor(snapshot.offset_to_engine(region.b));
    }

    match drag {
        DragKind::Lines => encode_lines(snapshot, region),
        DragKind::None | DragKind::Columns => encode_chars(snapshot, region),
    }
}

/// The host's exclusive end becomes the engine's inclusive end: the last selected
/// character. Stepping back by a whole character keeps multi-byte text intact, and an
/// end at the start of a line lands on the previous line's newline.
fn encode_chars(snapshot: &Snapshot, region: Region) -> EngineSelection {
    let (anchor, cursor) = if region.is_reversed() {
        (region.a - 1, region.b)
    } else {
        (region.a, region.b - 1)
    };
    EngineSelection::new(
        Mode::Visual,
        snapshot.offset_to_engine(anchor),
        snapshot.offset_to_engine(cursor),
    )
}

fn encode_lines(snapshot: &Snapshot, region: Region) -> EngineSelection {
    let mut anchor = snapshot.offset_to_point(region.a);
    let mut cursor = snapshot.offset_to_point(region.b);
    // A line drag ends at the start of the row after the last selected one.
    let (low, high) = if region.is_reversed() {
        (cursor, &mut anchor)
    } else {
        (anchor, &mut cursor)
    };
    if high.column == 0 && high.row > low.row {
        high.row -= 1;
    }
    EngineSelection::new(
        Mode::VisualLine,
        snapshot.to_engine_point(anchor),
        snapshot.to_engine_point(cursor),
    )
}

fn encode_block(snapshot: &Snapshot, selection: &Selection) -> EngineSelection {
    let mut anchor = snapshot.offset_to_point(selection.last().a);
    let mut cursor = snapshot.offset_to_point(selection.first().b);
    // The right edge is exclusive on the host; whichever corner carries it steps back.
    if cursor.column > anchor.column {
        cursor.column -= 1;
    } else if anchor.column > cursor.column {
        anchor.column -= 1;
    }
    EngineSelection::new(
        Mode::VisualBlock,
        snapshot.to_engine_point(anchor),
        snapshot.to_engine_point(cursor),
    )
}

/// Decode the engine selection into host regions.
pub fn engine_to_host(snapshot: &Snapshot, selection: &EngineSelection) -> Selection {
    let a = snapshot.engine_to_offset(selection.anchor);
    let b = snapshot.engine_to_offset(selection.cursor);

    match &selection.mode {
        Mode::Visual => {
            let region = if a > b {
                Region::new(a + 1, b)
            } else {
                Region::new(a, b + 1)
            };
            Selection::single(region).clamped(snapshot.len())
        },
        Mode::VisualLine => {
            let region = if a > b {
                Region::new(snapshot.line_range_at(a).end, snapshot.line_range_at(b).start)
            } else {
                Region::new(snapshot.line_range_at(a).start, snapshot.line_range_at(b).end)
            };
            Selection::single(region)
        },
        Mode::VisualBlock => decode_block(snapshot, selection)
            .unwrap_or_else(|| Selection::cursor(b)),
        Mode::Normal | Mode::Insert | Mode::Replace | Mode::Command => {
            Selection::single(Region::new(a, b))
        },
        Mode::Other(tag) => {
            tracing::warn!("unhandled selection mode {tag:?}, using anchor and cursor as-is");
            Selection::single(Region::new(a, b))
        },
    }
}

fn decode_block(snapshot: &Snapshot, selection: &EngineSelection) -> Option<Selection> {
    let anchor = snapshot.to_host_point(selection.anchor);
    let cursor = snapshot.to_host_point(selection.cursor);

    let left = anchor.column.min(cursor.column);
    let right = anchor.column.max(cursor.column) + 1;
    let top = anchor.row.min(cursor.row);
    let bottom = anchor.row.max(cursor.row);
    let reversed = anchor.column > cursor.column;

    let regions = (top..=bottom).filter_map(|row| {
        let len = snapshot.line_len(row);
        if left > len {
            return None;
        }
        let start = snapshot.point_to_offset(Point::new(row, left));
        let end = snapshot.point_to_offset(Point::new(row, right.min(len)));
        Some(if reversed {
            Region::new(end, start)
        } else {
            Region::new(start, end)
        })
    });
    Selection::from_regions(regions)
}
