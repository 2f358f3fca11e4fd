//! Declarative wrappers for external command-line tools.
//!
//! Wrappers describe their inputs with [`ArgSpec`] tables and render a command line from
//! typed values. Nothing here executes the wrapped program.

pub mod argspec;
pub mod dtitk;

pub use argspec::ArgSpec;
pub use dtitk::{ComposeXfmInputs, ComposeXfmOutputs, RenderedCommand};
