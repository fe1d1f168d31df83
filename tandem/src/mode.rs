//! Engine editing modes.
//!
//! The engine reports its mode as a short tag (`"n"`, `"v"`, `"V"`, `"\x16"`, ...).
//! Tags are parsed once into [`Mode`] and matched exhaustively from then on.

use serde::Deserialize;
use std::fmt;

/// Control-V, the engine's tag for blockwise visual mode.
pub const VISUAL_BLOCK_TAG: &str = "\u{16}";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum Mode {
    Normal,
    Insert,
    Replace,
    Visual,
    VisualLine,
    VisualBlock,
    Command,
    /// A tag this crate does not know. Kept verbatim for diagnostics.
    Other(String),
}

impl Mode {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "n" => Mode::Normal,
            "i" => Mode::Insert,
            "R" => Mode::Replace,
            "v" => Mode::Visual,
            "V" => Mode::VisualLine,
            VISUAL_BLOCK_TAG => Mode::VisualBlock,
            "c" => Mode::Command,
            other => Mode::Other(other.to_string()),
        }
    }

    /// Tag understood by the engine's select call.
    pub fn tag(&self) -> &str {
        match self {
            Mode::Normal => "n",
            Mode::Insert => "i",
            Mode::Replace => "R",
            Mode::Visual => "v",
            Mode::VisualLine => "V",
            Mode::VisualBlock => VISUAL_BLOCK_TAG,
            Mode::Command => "c",
            Mode::Other(tag) => tag,
        }
    }

    /// Human readable name, also the key for per-mode settings.
    pub fn name(&self) -> Option<&'static str> {
        match self {
            Mode::Normal => Some("normal"),
            Mode::Insert => Some("insert"),
            Mode::Replace => Some("replace"),
            Mode::Visual => Some("visual"),
            Mode::VisualLine => Some("visual line"),
            Mode::VisualBlock => Some("visual block"),
            Mode::Command => Some("command"),
            Mode::Other(_) => None,
        }
    }

    pub fn is_visual(&self) -> bool {
        matches!(self, Mode::Visual | Mode::VisualLine | Mode::VisualBlock)
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, Mode::Insert | Mode::Replace)
    }
}

impl From<String> for Mode {
    fn from(tag: String) -> Self {
        Mode::from_tag(&tag)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "unknown ({:?})", self.tag()),
        }
    }
}
