//! Evaluation core of a live, structurally editable Lisp.
//!
//! Programs are read into shared value trees that keep their source layout.
//! Evaluation memoizes results and macro expansions on the nodes themselves so
//! that editors can ask what any node evaluated to, or expanded into, after a
//! run. See [`interpreter::cps::Interpreter`] for the entry point.

pub mod interpreter;
pub mod library;
pub mod reader;

pub use interpreter::cps::{ErrorKind, Interpreter, RuntimeError, Value};
pub use interpreter::Error;
