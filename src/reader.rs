//! Source text to values.
//!
//! Besides the forms, the reader records the exact text between them (spacing,
//! commas and comments) on each collection node so the printer can reproduce
//! the input byte for byte.

pub mod lexer;
pub mod parser;

use std::fmt;
use std::rc::Rc;

use crate::interpreter::cps::{Keywords, Notation, Seq, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct ReadError {
    pub message: String,
    /// Byte offset into the source.
    pub offset: usize,
}

impl ReadError {
    pub fn new(message: impl Into<String>, offset: usize) -> ReadError {
        ReadError {
            message: message.into(),
            offset,
        }
    }
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "ReadError at {}: {}", self.offset, self.message) }
}

impl std::error::Error for ReadError {}

/// Read every top-level form into one `Program` node. Evaluating it runs the
/// forms in order; printing it reproduces `src`.
pub fn read_program(src: &str, keywords: &Keywords) -> Result<Value, ReadError> {
    let tokens = lexer::tokenize(src)?;
    let parsed = parser::parse(src, &tokens, keywords)?;
    let program = Seq::from_source(parsed.forms, Notation::Program, parsed.delimiters);
    program.cache().set_literals(parsed.literals);
    Ok(Value::List(Rc::new(program)))
}

/// Read exactly one form; surrounding whitespace and comments are dropped.
pub fn read_form(src: &str, keywords: &Keywords) -> Result<Value, ReadError> {
    let tokens = lexer::tokenize(src)?;
    let mut forms = parser::parse(src, &tokens, keywords)?.forms;
    match forms.len() {
        1 => Ok(forms.remove(0)),
        0 => Err(ReadError::new("Expected a form", src.len())),
        n => Err(ReadError::new(format!("Expected one form, found {}", n), 0)),
    }
}
