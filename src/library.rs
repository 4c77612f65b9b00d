//! Native functions installed into every new [`Interpreter`].
//!
//! Each module exports a table of `(name, function)` pairs; [`install`]
//! binds them in the root environment.

pub mod base;
pub mod io;
pub mod json;
pub mod math;

use crate::interpreter::cps::{Interpreter, Value};

pub fn install(rt: &Interpreter) {
    rt.register(base::EXPORTS);
    rt.register_macros(base::MACROS);
    rt.register(math::EXPORTS);
    rt.define("PI", Value::Number(std::f64::consts::PI));
    rt.register(io::EXPORTS);
    rt.register(json::EXPORTS);
}
