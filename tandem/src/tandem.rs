//! Keeps a host editor's documents in lockstep with an embedded modal editing engine.
//!
//! The host owns the documents the user sees; the engine owns a buffer per document and
//! interprets keys. [`Bridge`] moves text, selections and settings between the two so
//! each side can treat its own copy as authoritative.
//!
//! # Architecture
//!
//! ```text
//! Host (trait) <-- Bridge --> Engine (trait)
//!                    |
//!                    +-- Registry -> Binding (per document: ledger, key queue)
//!                    +-- mapper / coords (selection and column translation)
//!                    +-- UiQueue (host mutations, run on the UI thread)
//! ```
//!
//! Hosts implement [`Host`], embedders implement [`Engine`], and both are driven through
//! [`Bridge`]. Anything that changes host content is queued on [`UiQueue`], which the
//! host drains from its UI thread.
//!
//! # Testing
//!
//! The `test-support` feature exposes `test::MockHost` and
//! `test::MockEngine` for driving a bridge without a real editor.

pub mod binding;
pub mod bridge;
pub mod callbacks;
pub mod config;
pub mod coords;
pub mod engine;
pub mod error;
pub mod host;
pub mod ledger;
pub mod mapper;
pub mod mode;
pub mod registry;
pub mod selection;
pub mod ui;

// Make test utilities available for both unit and integration tests
#[cfg(any(test, feature = "test-support"))]
pub mod test;

pub use binding::{Binding, SyncPhase};
pub use bridge::Bridge;
pub use callbacks::{Completion, Highlight, Popup, PopupItem, PopupMenuEvent, ScreenSnapshot};
pub use config::{ColumnAuthority, Config};
pub use coords::{EnginePoint, Point, Snapshot};
pub use engine::{BufferHandle, Engine, EngineStatus, KeyOutcome};
pub use error::{Error, Result};
pub use host::{DocId, Host};
pub use ledger::{ChangeLedger, HostRevision};
pub use mapper::EngineSelection;
pub use mode::Mode;
pub use registry::Registry;
pub use selection::{DragKind, Region, Selection};
pub use ui::UiQueue;
