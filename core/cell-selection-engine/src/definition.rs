//! FILENAME: core/cell-selection-engine/src/definition.rs
//! Cell Selection Definition - The serializable configuration and input vocabulary.
//!
//! This module contains the types needed to DESCRIBE a selection session:
//! - Options (serializable, loaded from JSON with defaults for missing keys)
//! - Cell coordinates by id, independent of where the cell is displayed
//! - Pointer modifiers and navigation keys fed into the state machine

use grid_model::{FieldId, ModelError, RowId};
use serde::{Deserialize, Serialize};

/// Distance in pixels from a viewport edge at which drag auto-scroll starts.
pub const DEFAULT_AUTO_SCROLL_SENSITIVITY: f64 = 50.0;

/// Pixels scrolled per frame when the pointer sits on the viewport edge.
pub const DEFAULT_AUTO_SCROLL_SPEED: f64 = 20.0;

// ============================================================================
// CELL COORDINATES
// ============================================================================

/// A cell addressed by row id and field. Stays valid across sorting,
/// filtering and column reordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellCoord {
    pub id: RowId,
    pub field: FieldId,
}

impl CellCoord {
    pub fn new(id: impl Into<RowId>, field: &str) -> Self {
        CellCoord {
            id: id.into(),
            field: field.to_string(),
        }
    }
}

// ============================================================================
// OPTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CellSelectionOptions {
    /// When false every selection operation is a no-op.
    pub enabled: bool,

    /// Placed between the fields of one row when copying.
    pub clipboard_delimiter: String,

    pub auto_scroll_sensitivity: f64,
    pub auto_scroll_speed: f64,
}

impl Default for CellSelectionOptions {
    fn default() -> Self {
        CellSelectionOptions {
            enabled: true,
            clipboard_delimiter: "\t".to_string(),
            auto_scroll_sensitivity: DEFAULT_AUTO_SCROLL_SENSITIVITY,
            auto_scroll_speed: DEFAULT_AUTO_SCROLL_SPEED,
        }
    }
}

impl CellSelectionOptions {
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// INPUT
// ============================================================================

/// Modifier keys held during a pointer or keyboard event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    /// Ctrl on most platforms, Cmd on macOS. Makes selection additive.
    pub ctrl: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers { shift: false, ctrl: false };
    pub const SHIFT: Modifiers = Modifiers { shift: true, ctrl: false };
    pub const CTRL: Modifiers = Modifiers { shift: false, ctrl: true };
}

/// Keys that move the focused cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavigationKey {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Home,
    End,
    PageUp,
    PageDown,
}

impl NavigationKey {
    /// Row and column step of an arrow key; `None` for the other keys.
    pub fn arrow_step(self) -> Option<(isize, isize)> {
        match self {
            NavigationKey::ArrowUp => Some((-1, 0)),
            NavigationKey::ArrowDown => Some((1, 0)),
            NavigationKey::ArrowLeft => Some((0, -1)),
            NavigationKey::ArrowRight => Some((0, 1)),
            _ => None,
        }
    }
}

// ============================================================================
// RENDERING CLASSES
// ============================================================================

pub const CLASS_SELECTED: &str = "cell--selected";
pub const CLASS_RANGE_TOP: &str = "cell--rangeTop";
pub const CLASS_RANGE_BOTTOM: &str = "cell--rangeBottom";
pub const CLASS_RANGE_LEFT: &str = "cell--rangeLeft";
pub const CLASS_RANGE_RIGHT: &str = "cell--rangeRight";

/// Which sides of a selected cell border an unselected (or missing) cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeClasses {
    pub top: bool,
    pub bottom: bool,
    pub left: bool,
    pub right: bool,
}

impl EdgeClasses {
    pub fn is_empty(&self) -> bool {
        !(self.top || self.bottom || self.left || self.right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_partial_json() {
        let options = CellSelectionOptions::from_json(r#"{"clipboardDelimiter": ","}"#).unwrap();
        assert_eq!(options.clipboard_delimiter, ",");
        assert!(options.enabled);
        assert_eq!(options.auto_scroll_sensitivity, DEFAULT_AUTO_SCROLL_SENSITIVITY);

        assert!(CellSelectionOptions::from_json("{\"enabled\": 3}").is_err());
    }

    #[test]
    fn test_arrow_steps() {
        assert_eq!(NavigationKey::ArrowUp.arrow_step(), Some((-1, 0)));
        assert_eq!(NavigationKey::ArrowRight.arrow_step(), Some((0, 1)));
        assert_eq!(NavigationKey::Home.arrow_step(), None);
    }
}
