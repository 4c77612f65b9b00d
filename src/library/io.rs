//! File access. Failures surface as `Unsupported` errors tagged with the
//! native's name.

use std::fs;

use tracing::debug;

use crate::interpreter::cps::{CallContext, ErrorKind, NativeFn, RuntimeError, Value};
use crate::match_args;

fn io_error(name: &str, path: &str, e: std::io::Error) -> RuntimeError {
    RuntimeError::new(ErrorKind::Unsupported, format!("{}: {}", path, e)).within(name)
}

/// (slurp path)
fn slurp(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("slurp", args, [path] => {
        let path = path.as_str()?;
        debug!("slurp {}", path);
        Value::string(fs::read_to_string(path).map_err(|e| io_error("slurp", path, e))?)
    })
}

/// (spit path content), writes `content` as plain text
fn spit(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("spit", args, [path, content] => {
        let path = path.as_str()?;
        debug!("spit {}", path);
        fs::write(path, content.to_string()).map_err(|e| io_error("spit", path, e))?;
        Value::Nil
    })
}

pub const EXPORTS: &[(&str, NativeFn)] = &[("slurp", slurp), ("spit", spit)];
