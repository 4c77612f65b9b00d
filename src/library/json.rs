use crate::interpreter::cps::{CallContext, NativeFn, RuntimeError, Value};
use crate::interpreter::cps_json::{from_json_str, to_json_string};
use crate::match_args;

fn json_stringify(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("json-stringify", args, [x] => Value::string(to_json_string(x).map_err(|e| e.within("json-stringify"))?))
}

fn json_parse(ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("json-parse", args, [s] => from_json_str(s.as_str()?, ctx.keywords()).map_err(|e| e.within("json-parse"))?)
}

pub const EXPORTS: &[(&str, NativeFn)] = &[("json-stringify", json_stringify), ("json-parse", json_parse)];
