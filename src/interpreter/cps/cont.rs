use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::interpreter::cps::expand::{Bound, Constant, Expansion};
use crate::interpreter::cps::procedure::{bind, validate_params, CallContext, Closure, ClosureKind, Function};
use crate::interpreter::cps::trampoline::quasiquote_item;
use crate::interpreter::cps::{Env, Interpreter, Map, RuntimeError, Seq, SpecialForm, Trampoline, Value};
use crate::runtime_error;

pub enum Cont {
    // remaining forms of a body: node, next index
    EvalDo(Rc<Seq>, usize, Rc<RefCell<Env>>, Box<Cont>),

    // call node whose head is being evaluated
    BeginFunc(Rc<Seq>, Rc<RefCell<Env>>, Box<Cont>),
    // function, call node, next argument index, evaluated arguments
    EvalFunc(Value, Rc<Seq>, usize, Vec<Value>, Rc<RefCell<Env>>, Box<Cont>),

    EvalIf(Rc<Seq>, Rc<RefCell<Env>>, Box<Cont>),
    EvalDef(String, Rc<Seq>, Rc<RefCell<Env>>, Box<Cont>),
    // binding vector, index of the pattern being bound, let node, let frame
    EvalLet(Rc<Seq>, usize, Rc<Seq>, Rc<RefCell<Env>>, Box<Cont>),

    // template, next index, built elements, whether the value is spliced
    ContinueQuasiquote(Value, usize, Vec<Value>, bool, Rc<RefCell<Env>>, Box<Cont>),

    // macro body finished: cache the form with the reads recorded since
    // `usize`, then evaluate it in the given frame or hand it on unevaluated
    Expand(Rc<Seq>, Rc<Function>, usize, Option<Rc<RefCell<Env>>>, Box<Cont>),
    Eval(Rc<RefCell<Env>>, Box<Cont>),

    EvalAnd(Rc<Seq>, usize, Rc<RefCell<Env>>, Box<Cont>),
    EvalOr(Rc<Seq>, usize, Rc<RefCell<Env>>, Box<Cont>),

    EvalVector(Rc<Seq>, usize, Vec<Value>, Rc<RefCell<Env>>, Box<Cont>),
    EvalMap(Rc<Map>, usize, Vec<(Value, Value)>, Rc<RefCell<Env>>, Box<Cont>),

    // nodes whose evaluated value is the value passing through
    Memo(Vec<Value>, Box<Cont>),
    Return,
}

fn head(seq: &Seq) -> &str { seq.head_name().unwrap_or("?") }

impl fmt::Debug for Cont {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Cont::EvalDo(seq, next, _, k) => write!(f, "<EvalDo {}/{} {:?}>", next, seq.len(), k),
            Cont::BeginFunc(seq, _, k) => write!(f, "<BeginFunc {} {:?}>", head(seq), k),
            Cont::EvalFunc(_, seq, next, _, _, k) => write!(f, "<EvalFunc {} {}/{} {:?}>", head(seq), next, seq.len(), k),
            Cont::EvalIf(_, _, k) => write!(f, "<EvalIf {:?}>", k),
            Cont::EvalDef(name, _, _, k) => write!(f, "<EvalDef {} {:?}>", name, k),
            Cont::EvalLet(_, index, _, _, k) => write!(f, "<EvalLet {} {:?}>", index, k),
            Cont::ContinueQuasiquote(_, next, _, splice, _, k) => write!(f, "<ContinueQuasiquote {} splice={} {:?}>", next, splice, k),
            Cont::Expand(seq, _, _, _, k) => write!(f, "<Expand {} {:?}>", head(seq), k),
            Cont::Eval(_, k) => write!(f, "<Eval {:?}>", k),
            Cont::EvalAnd(_, next, _, k) => write!(f, "<EvalAnd {} {:?}>", next, k),
            Cont::EvalOr(_, next, _, k) => write!(f, "<EvalOr {} {:?}>", next, k),
            Cont::EvalVector(_, next, _, _, k) => write!(f, "<EvalVector {} {:?}>", next, k),
            Cont::EvalMap(_, next, _, _, k) => write!(f, "<EvalMap {} {:?}>", next, k),
            Cont::Memo(nodes, k) => write!(f, "<Memo {} {:?}>", nodes.len(), k),
            Cont::Return => write!(f, "<Return>"),
        }
    }
}

/// Record `node` as taking the value of `k`. A tail call reuses the pending
/// `Memo` frame instead of stacking a new one, and a node already present is
/// not added twice, so loops in tail position stay bounded.
pub fn memo(node: Value, mut k: Cont) -> Cont {
    if let Cont::Memo(nodes, _) = &mut k {
        if !nodes.iter().any(|n| n.ptr_eq(&node)) {
            nodes.push(node);
        }
        return k;
    }
    Cont::Memo(vec![node], Box::new(k))
}

/// Evaluate `seq[start..]` in order, the last form in tail position.
pub fn eval_body(seq: Rc<Seq>, start: usize, env: Rc<RefCell<Env>>, k: Cont) -> Result<Trampoline, RuntimeError> {
    let len = seq.len();
    if start >= len {
        return Ok(Trampoline::Apply(Value::Nil, k));
    }
    let form = seq.items()[start].clone();
    match start + 1 == len {
        true => Ok(Trampoline::Bounce(form, env, k)),
        false => Ok(Trampoline::Bounce(form, env.clone(), Cont::EvalDo(seq, start + 1, env, Box::new(k)))),
    }
}

fn make_closure(params: &Value, body: &[Value], env: &Rc<RefCell<Env>>, kind: ClosureKind) -> Result<Value, RuntimeError> {
    if !matches!(params, Value::Vector(_)) {
        runtime_error!(Bind, "Parameters must be a vector: {:?}", params)
    }
    validate_params(params)?;
    let body = match body {
        [] => Value::Nil,
        [single] => single.clone(),
        many => {
            let mut items = Vec::with_capacity(many.len() + 1);
            items.push(Value::symbol("do"));
            items.extend(many.iter().cloned());
            Value::list(items)
        }
    };
    let closure = Closure {
        params: params.clone(),
        body,
        env: env.clone(),
        kind,
        meta: Value::Nil,
    };
    Ok(Value::Function(Rc::new(Function::Closure(closure))))
}

/// (def name expr)
fn cont_special_def(seq: Rc<Seq>, env: Rc<RefCell<Env>>, k: Cont) -> Result<Trampoline, RuntimeError> {
    let (name, expr) = match seq.items() {
        [_, Value::Symbol(name), expr] => (name.name().to_string(), expr.clone()),
        _ => runtime_error!(Bind, "def expects a symbol and one value: {:?}", Value::List(seq.clone())),
    };
    Ok(Trampoline::Bounce(expr, env.clone(), Cont::EvalDef(name, seq, env, Box::new(k))))
}

/// (defn name [params] body...), also defmacro and defsyntax
fn cont_special_defn(seq: Rc<Seq>, env: Rc<RefCell<Env>>, k: Cont, kind: ClosureKind) -> Result<Trampoline, RuntimeError> {
    let (name, closure) = match seq.items() {
        [_, Value::Symbol(name), params, body @ ..] => (name.name().to_string(), make_closure(params, body, &env, kind)?),
        _ => runtime_error!(Bind, "Expected a name and a parameter vector: {:?}", Value::List(seq.clone())),
    };
    env.borrow_mut().define_at(name, closure.clone(), &seq);
    Ok(Trampoline::Apply(closure, k))
}

/// (fn [params] body...), also macro
fn cont_special_fn(seq: Rc<Seq>, env: Rc<RefCell<Env>>, k: Cont, kind: ClosureKind) -> Result<Trampoline, RuntimeError> {
    let closure = match seq.items() {
        [_, params, body @ ..] => make_closure(params, body, &env, kind)?,
        _ => runtime_error!(Bind, "Expected a parameter vector: {:?}", Value::List(seq.clone())),
    };
    Ok(Trampoline::Apply(closure, k))
}

/// (let [pattern expr ...] body...)
///
/// Bindings are sequential: each expression sees the names bound before it.
fn cont_special_let(seq: Rc<Seq>, env: Rc<RefCell<Env>>, k: Cont) -> Result<Trampoline, RuntimeError> {
    let bindings = match seq.items() {
        [_, Value::Vector(bindings), ..] => bindings.clone(),
        _ => runtime_error!(Bind, "let expects a binding vector: {:?}", Value::List(seq.clone())),
    };
    if bindings.len() % 2 != 0 {
        runtime_error!(Bind, "let bindings must come in pairs, got {}", bindings.len())
    }
    let frame = Env::new_child(env);
    if bindings.is_empty() {
        return eval_body(seq, 2, frame, k);
    }
    let expr = bindings.items()[1].clone();
    Ok(Trampoline::Bounce(expr, frame.clone(), Cont::EvalLet(bindings, 0, seq, frame, Box::new(k))))
}

fn cont_eval_let(val: Value, bindings: Rc<Seq>, index: usize, seq: Rc<Seq>, frame: Rc<RefCell<Env>>, k: Cont) -> Result<Trampoline, RuntimeError> {
    bind(&frame, &bindings.items()[index], val)?;
    let next = index + 2;
    if next >= bindings.len() {
        return eval_body(seq, 2, frame, k);
    }
    let expr = bindings.items()[next + 1].clone();
    Ok(Trampoline::Bounce(expr, frame.clone(), Cont::EvalLet(bindings, next, seq, frame, Box::new(k))))
}

fn cont_special_if(seq: Rc<Seq>, env: Rc<RefCell<Env>>, k: Cont) -> Result<Trampoline, RuntimeError> {
    let cond = match seq.items() {
        [_, cond, _] | [_, cond, _, _] => cond.clone(),
        _ => runtime_error!(Bind, "if expects a condition and one or two branches: {:?}", Value::List(seq.clone())),
    };
    Ok(Trampoline::Bounce(cond, env.clone(), Cont::EvalIf(seq, env, Box::new(k))))
}

fn single_arg(seq: &Seq, name: &str) -> Result<Value, RuntimeError> {
    match seq.items() {
        [_, arg] => Ok(arg.clone()),
        _ => runtime_error!(Bind, "{} expects exactly one argument, got {}", name, seq.len().saturating_sub(1)),
    }
}

fn and_step(seq: Rc<Seq>, index: usize, env: Rc<RefCell<Env>>, k: Cont) -> Result<Trampoline, RuntimeError> {
    let expr = seq.items()[index].clone();
    match index + 1 == seq.len() {
        true => Ok(Trampoline::Bounce(expr, env, k)),
        false => Ok(Trampoline::Bounce(expr, env.clone(), Cont::EvalAnd(seq, index + 1, env, Box::new(k)))),
    }
}

fn or_step(seq: Rc<Seq>, index: usize, env: Rc<RefCell<Env>>, k: Cont) -> Result<Trampoline, RuntimeError> {
    let expr = seq.items()[index].clone();
    match index + 1 == seq.len() {
        true => Ok(Trampoline::Bounce(expr, env, k)),
        false => Ok(Trampoline::Bounce(expr, env.clone(), Cont::EvalOr(seq, index + 1, env, Box::new(k)))),
    }
}

pub fn cont_special(rt: &Interpreter, sf: SpecialForm, seq: Rc<Seq>, env: Rc<RefCell<Env>>, k: Cont) -> Result<Trampoline, RuntimeError> {
    debug!("SpecialForm / {:?}", sf);
    match sf {
        SpecialForm::Def => cont_special_def(seq, env, k),
        SpecialForm::Defn => cont_special_defn(seq, env, k, ClosureKind::Function),
        SpecialForm::Defmacro => cont_special_defn(seq, env, k, ClosureKind::Macro),
        SpecialForm::Defsyntax => match seq.len() {
            4 => cont_special_defn(seq, env, k, ClosureKind::Template),
            _ => runtime_error!(Bind, "defsyntax expects a name, a parameter vector and one template"),
        },
        SpecialForm::Fn => cont_special_fn(seq, env, k, ClosureKind::Function),
        SpecialForm::Macro => cont_special_fn(seq, env, k, ClosureKind::Macro),
        SpecialForm::Let => cont_special_let(seq, env, k),
        SpecialForm::Do => eval_body(seq, 1, env, k),
        SpecialForm::If => cont_special_if(seq, env, k),

        SpecialForm::Quote => Ok(Trampoline::Apply(single_arg(&seq, "quote")?, k)),
        SpecialForm::Quasiquote => Ok(Trampoline::QuasiquoteBounce(single_arg(&seq, "quasiquote")?, env, k)),
        SpecialForm::Macroexpand => macroexpand(rt, single_arg(&seq, "macroexpand")?, env, k),
        SpecialForm::Eval => {
            let form = single_arg(&seq, "eval")?;
            Ok(Trampoline::Bounce(form, env.clone(), Cont::Eval(env, Box::new(k))))
        }

        SpecialForm::And => match seq.len() {
            1 => Ok(Trampoline::Apply(Value::Boolean(true), k)),
            _ => and_step(seq, 1, env, k),
        },
        SpecialForm::Or => match seq.len() {
            1 => Ok(Trampoline::Apply(Value::Nil, k)),
            _ => or_step(seq, 1, env, k),
        },
    }
}

/// Expand `form` once if its head names a macro in `env`, otherwise pass it
/// through. The expansion is not evaluated.
pub fn macroexpand(rt: &Interpreter, form: Value, env: Rc<RefCell<Env>>, k: Cont) -> Result<Trampoline, RuntimeError> {
    if let Value::List(call) = &form {
        let resolved = call.head_name().and_then(|name| env.borrow().get(name));
        if let Some(Value::Function(func)) = resolved {
            if func.is_macro() {
                return expand_call(rt, call.clone(), func, env, false, k);
            }
        }
    }
    Ok(Trampoline::Apply(form, k))
}

fn finish_expansion(form: Value, env: Rc<RefCell<Env>>, then_eval: bool, k: Cont) -> Result<Trampoline, RuntimeError> {
    match then_eval {
        true => Ok(Trampoline::Bounce(form, env, k)),
        false => Ok(Trampoline::Apply(form, k)),
    }
}

/// Expand a macro call node, reusing its cached descriptor while it is still
/// valid. With `then_eval` the expansion is evaluated in `env`.
fn expand_call(rt: &Interpreter, seq: Rc<Seq>, func: Rc<Function>, env: Rc<RefCell<Env>>, then_eval: bool, k: Cont) -> Result<Trampoline, RuntimeError> {
    if let Some(expansion) = seq.expansion() {
        if expansion.reusable_by(&func) {
            if let Some(form) = expansion.form() {
                debug!("macro cache hit / {}", head(&seq));
                if let Expansion::Constant(constant) = &expansion {
                    rt.record_reads(&constant.reads);
                }
                return finish_expansion(form, env, then_eval, k);
            }
        }
    }

    debug!("expanding macro / {}", head(&seq));
    let args = seq.items()[1..].to_vec();
    match &*func {
        Function::Native(native) => {
            let ctx = CallContext {
                rt,
                caller: Some(env.clone()),
            };
            let recording = rt.start_recording();
            let result = native.call(&ctx, args);
            let reads = rt.finish_recording(recording);
            let form = result?;
            seq.set_expansion(Expansion::Constant(Constant {
                macro_fn: func.clone(),
                form: form.clone(),
                reads,
            }));
            finish_expansion(form, env, then_eval, k)
        }
        Function::Closure(closure) => {
            let frame = Env::new_child(closure.env.clone());
            bind(&frame, &closure.params, Value::vector(args))?;
            match closure.kind {
                ClosureKind::Template => {
                    let bound = Bound {
                        macro_fn: func.clone(),
                        template: closure.body.clone(),
                        env: frame,
                    };
                    let form = bound.substitute();
                    seq.set_expansion(Expansion::Env(bound));
                    finish_expansion(form, env, then_eval, k)
                }
                _ => {
                    let target = if then_eval { Some(env) } else { None };
                    let recording = rt.start_recording();
                    Ok(Trampoline::Bounce(closure.body.clone(), frame, Cont::Expand(seq, func.clone(), recording, target, Box::new(k))))
                }
            }
        }
    }
}

fn begin_func(rt: &Interpreter, f: Value, seq: Rc<Seq>, env: Rc<RefCell<Env>>, k: Cont) -> Result<Trampoline, RuntimeError> {
    let func = match &f {
        Value::Function(func) => func.clone(),
        _ => runtime_error!(TypeMismatch, "Cannot call {:?}, it is not a function", f),
    };
    if func.is_macro() {
        return expand_call(rt, seq, func, env, true, k);
    }
    if !matches!(seq.expansion(), Some(Expansion::Unchanged)) {
        seq.set_expansion(Expansion::Unchanged);
    }
    let capacity = seq.len() - 1;
    eval_args(rt, f, seq, 1, Vec::with_capacity(capacity), env, k)
}

fn eval_args(rt: &Interpreter, f: Value, seq: Rc<Seq>, next: usize, acc: Vec<Value>, env: Rc<RefCell<Env>>, k: Cont) -> Result<Trampoline, RuntimeError> {
    match seq.items().get(next).cloned() {
        Some(arg) => Ok(Trampoline::Bounce(arg, env.clone(), Cont::EvalFunc(f, seq, next + 1, acc, env, Box::new(k)))),
        None => apply(rt, f, acc, Some(env), k),
    }
}

pub fn eval_vector(seq: Rc<Seq>, next: usize, acc: Vec<Value>, env: Rc<RefCell<Env>>, k: Cont) -> Result<Trampoline, RuntimeError> {
    match seq.items().get(next).cloned() {
        Some(item) => Ok(Trampoline::Bounce(item, env.clone(), Cont::EvalVector(seq, next + 1, acc, env, Box::new(k)))),
        None => Ok(Trampoline::Apply(Value::vector(acc), k)),
    }
}

pub fn eval_map(map: Rc<Map>, next: usize, acc: Vec<(Value, Value)>, env: Rc<RefCell<Env>>, k: Cont) -> Result<Trampoline, RuntimeError> {
    match map.entries().get(next).map(|(_, v)| v.clone()) {
        Some(value) => Ok(Trampoline::Bounce(value, env.clone(), Cont::EvalMap(map, next + 1, acc, env, Box::new(k)))),
        None => Ok(Trampoline::Apply(Value::Map(Rc::new(Map::new(acc)?)), k)),
    }
}

/// Apply a function to already evaluated arguments.
pub fn apply(rt: &Interpreter, f: Value, args: Vec<Value>, caller: Option<Rc<RefCell<Env>>>, k: Cont) -> Result<Trampoline, RuntimeError> {
    let func = match &f {
        Value::Function(func) => func.clone(),
        _ => runtime_error!(TypeMismatch, "Don't know how to apply: {:?}", f),
    };
    match &*func {
        Function::Native(native) => {
            let ctx = CallContext { rt, caller };
            Ok(Trampoline::Apply(native.call(&ctx, args)?, k))
        }
        Function::Closure(closure) => {
            // fresh frame per call, so the caller's frame is never written
            let frame = Env::new_child(closure.env.clone());
            bind(&frame, &closure.params, Value::vector(args))?;
            Ok(Trampoline::Bounce(closure.body.clone(), frame, k))
        }
    }
}

// Detach the next continuation, leaving `Return` in its place.
fn take(k: &mut Box<Cont>) -> Cont { std::mem::replace(&mut **k, Cont::Return) }

impl Cont {
    fn next_mut(&mut self) -> Option<&mut Box<Cont>> {
        match self {
            Cont::EvalDo(.., k)
            | Cont::BeginFunc(.., k)
            | Cont::EvalFunc(.., k)
            | Cont::EvalIf(.., k)
            | Cont::EvalDef(.., k)
            | Cont::EvalLet(.., k)
            | Cont::ContinueQuasiquote(.., k)
            | Cont::Expand(.., k)
            | Cont::Eval(_, k)
            | Cont::EvalAnd(.., k)
            | Cont::EvalOr(.., k)
            | Cont::EvalVector(.., k)
            | Cont::EvalMap(.., k)
            | Cont::Memo(_, k) => Some(k),
            Cont::Return => None,
        }
    }

    pub fn run(mut self, rt: &Interpreter, val: Value) -> Result<Trampoline, RuntimeError> {
        let step = match &mut self {
            Cont::EvalDo(seq, next, env, k) => eval_body(seq.clone(), *next, env.clone(), take(k)),

            Cont::BeginFunc(seq, env, k) => begin_func(rt, val, seq.clone(), env.clone(), take(k)),
            Cont::EvalFunc(f, seq, next, acc, env, k) => {
                let mut acc = std::mem::take(acc);
                acc.push(val);
                eval_args(rt, f.clone(), seq.clone(), *next, acc, env.clone(), take(k))
            }

            Cont::EvalIf(seq, env, k) => match (val.is_truthy(), seq.items()) {
                (true, [_, _, then, ..]) => Ok(Trampoline::Bounce(then.clone(), env.clone(), take(k))),
                (false, [_, _, _, otherwise]) => Ok(Trampoline::Bounce(otherwise.clone(), env.clone(), take(k))),
                _ => Ok(Trampoline::Apply(Value::Nil, take(k))),
            },

            Cont::EvalDef(name, seq, env, k) => {
                env.borrow_mut().define_at(std::mem::take(name), val.clone(), seq);
                Ok(Trampoline::Apply(val, take(k)))
            }

            Cont::EvalLet(bindings, index, seq, frame, k) => cont_eval_let(val, bindings.clone(), *index, seq.clone(), frame.clone(), take(k)),

            Cont::ContinueQuasiquote(template, next, acc, splice, env, k) => {
                let mut acc = std::mem::take(acc);
                if *splice {
                    match &val {
                        Value::List(seq) | Value::Vector(seq) => acc.extend(seq.items().iter().cloned()),
                        Value::Nil => {}
                        _ => runtime_error!(TypeMismatch, "splice-unquote expects a sequence, got {:?}", val),
                    }
                } else {
                    acc.push(val);
                }
                quasiquote_item(template.clone(), *next, acc, env.clone(), take(k))
            }

            Cont::Expand(seq, func, recording, target, k) => {
                let reads = rt.finish_recording(*recording);
                seq.set_expansion(Expansion::Constant(Constant {
                    macro_fn: func.clone(),
                    form: val.clone(),
                    reads,
                }));
                match target.take() {
                    Some(env) => Ok(Trampoline::Bounce(val, env, take(k))),
                    None => Ok(Trampoline::Apply(val, take(k))),
                }
            }

            // eval always runs at top level
            Cont::Eval(env, k) => Ok(Trampoline::Bounce(val, Env::get_root(env.clone()), take(k))),

            Cont::EvalAnd(seq, next, env, k) => match val.is_truthy() {
                true => and_step(seq.clone(), *next, env.clone(), take(k)),
                false => Ok(Trampoline::Apply(val, take(k))),
            },
            Cont::EvalOr(seq, next, env, k) => match val.is_truthy() {
                true => Ok(Trampoline::Apply(val, take(k))),
                false => or_step(seq.clone(), *next, env.clone(), take(k)),
            },

            Cont::EvalVector(seq, next, acc, env, k) => {
                let mut acc = std::mem::take(acc);
                acc.push(val);
                eval_vector(seq.clone(), *next, acc, env.clone(), take(k))
            }
            Cont::EvalMap(map, next, acc, env, k) => {
                let mut acc = std::mem::take(acc);
                let key = map.entries()[*next - 1].0.clone();
                acc.push((key, val));
                eval_map(map.clone(), *next, acc, env.clone(), take(k))
            }

            Cont::Memo(nodes, k) => {
                for node in nodes.iter() {
                    node.set_evaluated(val.clone());
                }
                Ok(Trampoline::Apply(val, take(k)))
            }

            Cont::Return => Ok(Trampoline::Land(val)),
        };
        step
    }
}

/// Unlinks the chain iteratively. A deep non-tail recursion that fails leaves
/// one pending frame per level, too many to drop recursively.
impl Drop for Cont {
    fn drop(&mut self) {
        let mut next = self.next_mut().map(take);
        while let Some(mut k) = next {
            next = k.next_mut().map(take);
        }
    }
}
