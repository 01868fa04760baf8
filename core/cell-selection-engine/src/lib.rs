//! FILENAME: core/cell-selection-engine/src/lib.rs
//! Cell range selection for the data grid.
//!
//! The engine never looks at records: it works on row ids and fields placed
//! in a `VisibleIndexSpace` that the host (or `grid-session`) keeps current.
//!
//! Layers:
//! - `definition`: Options, cell coordinates and input vocabulary
//! - `index`: The visible row/column coordinate system
//! - `engine`: The pointer/keyboard state machine and the selection model
//! - `autoscroll`, `clipboard`: Drag auto-scroll and copy serialization

pub mod autoscroll;
pub mod clipboard;
pub mod definition;
pub mod engine;
pub mod index;

pub use autoscroll::{AutoScrollController, ScrollDelta, Viewport};
pub use clipboard::serialize_selection;
pub use definition::*;
pub use engine::CellSelectionEngine;
pub use index::{VisibleColumn, VisibleIndexSpace, VisibleRow};
