use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::info;

use crate::interpreter::cps::env::Env;
use crate::interpreter::cps::keyword::Keywords;
use crate::interpreter::cps::value::Value;
use crate::interpreter::cps::{Interpreter, RuntimeError};
use crate::runtime_error;

/// Signature of a library function.
pub type NativeFn = fn(&CallContext<'_>, Vec<Value>) -> Result<Value, RuntimeError>;

type NativeProc = dyn Fn(&CallContext<'_>, Vec<Value>) -> Result<Value, RuntimeError>;

/// What a native procedure can reach besides its arguments.
pub struct CallContext<'a> {
    pub rt: &'a Interpreter,
    /// Frame the call was evaluated in; `None` for calls made from the host.
    pub caller: Option<Rc<RefCell<Env>>>,
}

impl CallContext<'_> {
    pub fn keywords(&self) -> &Keywords { self.rt.keywords() }

    /// Call back into the evaluator, e.g. for higher-order natives.
    pub fn apply(&self, f: &Value, args: Vec<Value>) -> Result<Value, RuntimeError> { self.rt.apply(f, args, self.caller.clone()) }
}

pub struct Native {
    pub name: String,
    pub is_macro: bool,
    pub meta: Value,
    proc: Rc<NativeProc>,
}

impl Native {
    pub fn new(name: &str, f: impl Fn(&CallContext<'_>, Vec<Value>) -> Result<Value, RuntimeError> + 'static) -> Native {
        Native {
            name: name.to_string(),
            is_macro: false,
            meta: Value::Nil,
            proc: Rc::new(f),
        }
    }

    pub fn call(&self, ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> { (self.proc)(ctx, args) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosureKind {
    Function,
    /// Procedural macro: the body runs and its result is the expansion.
    Macro,
    /// Template macro: the body is substituted with the bound arguments.
    Template,
}

pub struct Closure {
    pub params: Value,
    pub body: Value,
    pub env: Rc<RefCell<Env>>,
    pub kind: ClosureKind,
    pub meta: Value,
}

impl Closure {
    pub fn is_macro(&self) -> bool { self.kind != ClosureKind::Function }
}

pub enum Function {
    Native(Native),
    Closure(Closure),
}

impl Function {
    pub fn is_macro(&self) -> bool {
        match self {
            Function::Native(native) => native.is_macro,
            Function::Closure(closure) => closure.is_macro(),
        }
    }

    pub fn meta(&self) -> Value {
        match self {
            Function::Native(native) => native.meta.clone(),
            Function::Closure(closure) => closure.meta.clone(),
        }
    }

    /// A new function sharing this one's code and environment.
    pub fn with_meta(&self, meta: Value) -> Function {
        match self {
            Function::Native(native) => Function::Native(Native {
                name: native.name.clone(),
                is_macro: native.is_macro,
                meta,
                proc: native.proc.clone(),
            }),
            Function::Closure(closure) => Function::Closure(Closure {
                params: closure.params.clone(),
                body: closure.body.clone(),
                env: closure.env.clone(),
                kind: closure.kind,
                meta,
            }),
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Function::Native(native) => write!(f, "#<native:{}>", native.name),
            Function::Closure(closure) => write!(f, "#<closure:{:?} {:?}>", closure.kind, closure.params),
        }
    }
}

fn install(env: &Rc<RefCell<Env>>, lib: &[(&str, NativeFn)], is_macro: bool) {
    let mut frame = env.borrow_mut();
    for (name, f) in lib {
        let mut native = Native::new(name, *f);
        native.is_macro = is_macro;
        frame.define(name.to_string(), Value::Function(Rc::new(Function::Native(native))));
    }
}

/// Bind each `(name, procedure)` pair in `env`.
pub fn register(env: &Rc<RefCell<Env>>, lib: &[(&str, NativeFn)]) {
    install(env, lib, false);
    info!("registered {} natives", lib.len());
}

/// Same as [`register`] but the procedures receive unevaluated forms and
/// return an expansion.
pub fn register_macros(env: &Rc<RefCell<Env>>, lib: &[(&str, NativeFn)]) {
    install(env, lib, true);
    info!("registered {} native macros", lib.len());
}

fn is_rest_marker(value: &Value) -> bool { matches!(value, Value::Symbol(s) if s.name() == "&") }

/// Check a parameter pattern: symbols, vectors of patterns, and at most one
/// `&` followed by exactly one final pattern.
pub fn validate_params(pattern: &Value) -> Result<(), RuntimeError> {
    match pattern {
        Value::Symbol(_) if is_rest_marker(pattern) => runtime_error!(Bind, "`&` is not a valid binding name"),
        Value::Symbol(_) => Ok(()),
        Value::Vector(seq) => {
            let items = seq.items();
            for (i, item) in items.iter().enumerate() {
                if is_rest_marker(item) {
                    if i + 2 != items.len() {
                        runtime_error!(Bind, "`&` must be followed by exactly one pattern in {:?}", pattern)
                    }
                    return validate_params(&items[i + 1]);
                }
                validate_params(item)?;
            }
            Ok(())
        }
        _ => runtime_error!(Bind, "Invalid parameter pattern: {:?}", pattern),
    }
}

/// Destructure `value` against `pattern`, defining every name in `env`.
/// The rest pattern after `&` receives a vector of the remaining values.
pub fn bind(env: &Rc<RefCell<Env>>, pattern: &Value, value: Value) -> Result<(), RuntimeError> {
    let seq = match pattern {
        Value::Symbol(sym) => {
            env.borrow_mut().define(sym.name().to_string(), value);
            return Ok(());
        }
        Value::Vector(seq) => seq,
        _ => runtime_error!(Bind, "Invalid parameter pattern: {:?}", pattern),
    };
    let values: Vec<Value> = match &value {
        Value::List(v) | Value::Vector(v) => v.items().to_vec(),
        Value::Nil => Vec::new(),
        _ => runtime_error!(Bind, "Cannot destructure {:?} with {:?}", value, pattern),
    };

    let items = seq.items();
    for (i, item) in items.iter().enumerate() {
        if is_rest_marker(item) {
            let rest = match items.get(i + 1) {
                Some(rest) => rest,
                None => runtime_error!(Bind, "`&` must be followed by a pattern in {:?}", pattern),
            };
            let remaining = values.get(i..).map(<[Value]>::to_vec).unwrap_or_default();
            return bind(env, rest, Value::vector(remaining));
        }
        match values.get(i) {
            Some(v) => bind(env, item, v.clone())?,
            None => runtime_error!(Bind, "Expected {} arguments but got {}", items.len(), values.len()),
        }
    }
    if values.len() > items.len() {
        runtime_error!(Bind, "Expected {} arguments but got {}", items.len(), values.len())
    }
    Ok(())
}
