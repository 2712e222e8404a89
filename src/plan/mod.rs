//! RA → iterator lowering: turns a rewritten `Node` tree into a runnable
//! pull-based pipeline.

pub mod lower;
mod tee;

use crate::column::ColumnRegistry;
use crate::row::Rows;

/// The output of lowering any RA node: its row stream, the registry
/// describing each row's layout, and whether the stream is known to be
/// sorted ascending on every column in that registry, left to right.
///
/// This is plain planning-time metadata threaded alongside a
/// function-composed row stream, rather than fields living on a stateful
/// iterator object (see DESIGN.md).
pub struct Physical {
    pub registry: ColumnRegistry,
    pub sorted: bool,
    pub rows: Rows,
}

impl Physical {
    pub fn new(registry: ColumnRegistry, sorted: bool, rows: Rows) -> Self {
        Self {
            registry,
            sorted,
            rows,
        }
    }
}

pub use lower::lower;
