pub mod cps;
pub mod cps_json;
pub mod cps_match;

use std::fmt;

use crate::interpreter::cps::{Interpreter, RuntimeError};
use crate::reader::ReadError;

/// Failure of a read-and-evaluate round.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Read(ReadError),
    Runtime(RuntimeError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Read(e) => e.fmt(f),
            Error::Runtime(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for Error {}

impl From<ReadError> for Error {
    fn from(e: ReadError) -> Self { Error::Read(e) }
}

impl From<RuntimeError> for Error {
    fn from(e: RuntimeError) -> Self { Error::Runtime(e) }
}

macro_rules! try_or_return_error {
    ($inp:expr) => {
        match $inp {
            Ok(v) => v,
            Err(e) => return Err(e.to_string()),
        }
    };
}

pub fn new() -> Interpreter { Interpreter::new() }

/// Read and evaluate `input`, rendering the result readably.
pub fn execute(rt: &Interpreter, input: &str) -> Result<String, String> {
    let program = try_or_return_error!(rt.read(input));
    let value = try_or_return_error!(rt.eval(&program));
    Ok(format!("{:?}", value))
}
