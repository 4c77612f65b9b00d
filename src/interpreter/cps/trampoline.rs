use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::interpreter::cps::cont::{cont_special, eval_body, eval_map, eval_vector, memo};
use crate::interpreter::cps::value::Symbol;
use crate::interpreter::cps::{Cont, Env, Interpreter, Notation, RuntimeError, Seq, Value, SPECIAL_FORMS};
use crate::runtime_error;

pub enum Trampoline {
    Bounce(Value, Rc<RefCell<Env>>, Cont),
    QuasiquoteBounce(Value, Rc<RefCell<Env>>, Cont),
    Apply(Value, Cont),
    Land(Value), // only produced by Cont::Return
}

impl fmt::Debug for Trampoline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trampoline::Bounce(val, _, k) => write!(f, "Bounce({:?}, env, {:?})", val, k),
            Trampoline::QuasiquoteBounce(val, _, k) => write!(f, "QuasiquoteBounce({:?}, env, {:?})", val, k),
            Trampoline::Apply(val, k) => write!(f, "Run({:?}, {:?})", val, k),
            Trampoline::Land(val) => write!(f, "Land({:?})", val),
        }
    }
}

/// Build the quasiquoted copy of `template` from element `index` on.
pub fn quasiquote_item(template: Value, index: usize, acc: Vec<Value>, env: Rc<RefCell<Env>>, k: Cont) -> Result<Trampoline, RuntimeError> {
    let seq = match &template {
        Value::List(seq) | Value::Vector(seq) => seq.clone(),
        _ => return Ok(Trampoline::Apply(template, k)),
    };
    let item = match seq.items().get(index) {
        Some(item) => item.clone(),
        None => {
            let built = match template {
                Value::Vector(_) => Value::vector(acc),
                _ => Value::list(acc),
            };
            return Ok(Trampoline::Apply(built, k));
        }
    };

    let spliced = match &item {
        Value::List(inner) if inner.head_name() == Some("splice-unquote") => match inner.items() {
            [_, expr] => Some(expr.clone()),
            _ => runtime_error!(Bind, "splice-unquote expects exactly one form"),
        },
        _ => None,
    };
    match spliced {
        Some(expr) => Ok(Trampoline::Bounce(expr, env.clone(), Cont::ContinueQuasiquote(template, index + 1, acc, true, env, Box::new(k)))),
        None => Ok(Trampoline::QuasiquoteBounce(item, env.clone(), Cont::ContinueQuasiquote(template, index + 1, acc, false, env, Box::new(k)))),
    }
}

// (unquote x) switches back to Bounce, anything else keeps quasi-bouncing
pub fn quasiquote_bounce(rt: &Interpreter, val: Value, env: Rc<RefCell<Env>>, k: Cont) -> Result<Trampoline, RuntimeError> {
    match &val {
        Value::List(seq) if seq.head_name() == Some("unquote") => match seq.items() {
            [_, expr] => Ok(Trampoline::Bounce(expr.clone(), env, k)),
            _ => runtime_error!(Bind, "unquote expects exactly one form"),
        },
        Value::List(seq) | Value::Vector(seq) if !seq.is_empty() => {
            let capacity = seq.len();
            quasiquote_item(val.clone(), 0, Vec::with_capacity(capacity), env, k)
        }
        _ => k.run(rt, val),
    }
}

pub fn bounce_symbol(rt: &Interpreter, symbol: Rc<Symbol>, env: Rc<RefCell<Env>>, k: Cont) -> Result<Trampoline, RuntimeError> {
    let (val, site) = {
        let frame = env.borrow();
        (frame.lookup(symbol.name())?, frame.def_site(symbol.name()))
    };
    trace!("bounce symbol / {} => {:?}", symbol.name(), val);
    rt.record_read(&env, symbol.name(), &val);
    symbol.set_evaluated(val.clone());
    if let Some(site) = site {
        symbol.set_def(site);
    }
    k.run(rt, val)
}

fn bounce_list(rt: &Interpreter, seq: Rc<Seq>, env: Rc<RefCell<Env>>, k: Cont) -> Result<Trampoline, RuntimeError> {
    if seq.notation() == Notation::Program {
        let k = memo(Value::List(seq.clone()), k);
        return eval_body(seq, 0, env, k);
    }
    if seq.is_empty() {
        return k.run(rt, Value::List(seq));
    }

    let k = memo(Value::List(seq.clone()), k);
    let special = match seq.items().first() {
        Some(Value::Symbol(head)) => SPECIAL_FORMS.get(head.name()).copied(),
        _ => None,
    };
    if let Some(sf) = special {
        return cont_special(rt, sf, seq, env, k);
    }
    let head = seq.items()[0].clone();
    Ok(Trampoline::Bounce(head, env.clone(), Cont::BeginFunc(seq, env, Box::new(k))))
}

pub fn bounce(rt: &Interpreter, val: Value, env: Rc<RefCell<Env>>, k: Cont) -> Result<Trampoline, RuntimeError> {
    match val {
        Value::List(seq) => bounce_list(rt, seq, env, k),
        Value::Symbol(symbol) => bounce_symbol(rt, symbol, env, k),
        Value::Vector(seq) if !seq.is_empty() => {
            let k = memo(Value::Vector(seq.clone()), k);
            let capacity = seq.len();
            eval_vector(seq, 0, Vec::with_capacity(capacity), env, k)
        }
        Value::Map(map) if !map.is_empty() => {
            let k = memo(Value::Map(map.clone()), k);
            let capacity = map.len();
            eval_map(map, 0, Vec::with_capacity(capacity), env, k)
        }
        _ => k.run(rt, val),
    }
}

/// Drive the trampoline until a value lands.
pub fn run(rt: &Interpreter, start: Trampoline) -> Result<Value, RuntimeError> {
    let depth = rt.recording_depth();
    let result = drive(rt, start);
    if result.is_err() {
        rt.abandon_recordings(depth);
    }
    result
}

fn drive(rt: &Interpreter, start: Trampoline) -> Result<Value, RuntimeError> {
    let mut result = start;
    let mut steps: u64 = 0;
    loop {
        steps += 1;
        trace!("{:?}", result);
        result = match result {
            Trampoline::Bounce(val, env, k) => bounce(rt, val, env, k)?,
            Trampoline::QuasiquoteBounce(val, env, k) => quasiquote_bounce(rt, val, env, k)?,
            Trampoline::Apply(val, k) => k.run(rt, val)?,
            Trampoline::Land(val) => {
                debug!("landed after {} steps", steps);
                return Ok(val);
            }
        }
    }
}
