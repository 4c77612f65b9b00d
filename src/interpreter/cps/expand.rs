//! Macro expansion descriptors.
//!
//! A macro call node remembers how it expanded so that later evaluations and
//! tooling can reuse the result. A descriptor is only reused while the call's
//! head still resolves to the macro that produced it, and a constant one only
//! while every binding the macro read during expansion is unchanged.

use std::cell::RefCell;
use std::rc::Rc;

use crate::interpreter::cps::env::Env;
use crate::interpreter::cps::procedure::Function;
use crate::interpreter::cps::value::Value;

#[derive(Clone)]
pub enum Expansion {
    /// Fixed expansion form returned by a procedural or native macro.
    Constant(Constant),
    /// Template plus the frame its parameters were bound in.
    Env(Bound),
    /// The node is an ordinary call and expands to itself.
    Unchanged,
}

/// A symbol lookup made while a macro body ran.
#[derive(Clone)]
pub struct Lookup {
    pub env: Rc<RefCell<Env>>,
    pub name: String,
    pub value: Value,
}

impl Lookup {
    fn still_holds(&self) -> bool {
        match self.env.borrow().get(&self.name) {
            Some(current) => current.ptr_eq(&self.value) || current == self.value,
            None => false,
        }
    }
}

#[derive(Clone)]
pub struct Constant {
    pub macro_fn: Rc<Function>,
    pub form: Value,
    pub reads: Rc<[Lookup]>,
}

impl Constant {
    /// True while every recorded lookup resolves to the value it saw.
    pub fn is_current(&self) -> bool { self.reads.iter().all(Lookup::still_holds) }
}

#[derive(Clone)]
pub struct Bound {
    pub macro_fn: Rc<Function>,
    pub template: Value,
    pub env: Rc<RefCell<Env>>,
}

impl Bound {
    pub fn substitute(&self) -> Value { substitute(&self.template, &self.env) }
}

impl Expansion {
    pub fn made_by(&self, f: &Rc<Function>) -> bool {
        match self {
            Expansion::Constant(constant) => Rc::ptr_eq(&constant.macro_fn, f),
            Expansion::Env(bound) => Rc::ptr_eq(&bound.macro_fn, f),
            Expansion::Unchanged => false,
        }
    }

    /// The same macro produced the descriptor and its inputs are unchanged.
    pub fn reusable_by(&self, f: &Rc<Function>) -> bool {
        match self {
            Expansion::Constant(constant) => self.made_by(f) && constant.is_current(),
            _ => self.made_by(f),
        }
    }

    /// The expanded form, `None` for plain calls.
    pub fn form(&self) -> Option<Value> {
        match self {
            Expansion::Constant(constant) => Some(constant.form.clone()),
            Expansion::Env(bound) => Some(bound.substitute()),
            Expansion::Unchanged => None,
        }
    }
}

/// Replace every symbol bound directly in `env` with its value. Outer frames
/// are not consulted, so free symbols in the template stay as written.
pub fn substitute(expr: &Value, env: &Rc<RefCell<Env>>) -> Value {
    match expr {
        Value::Symbol(sym) => env.borrow().get_own(sym.name()).unwrap_or_else(|| expr.clone()),
        Value::List(seq) => Value::List(Rc::new(seq.mapped(|item| substitute(item, env)))),
        Value::Vector(seq) => Value::Vector(Rc::new(seq.mapped(|item| substitute(item, env)))),
        Value::Map(map) => Value::Map(Rc::new(map.mapped_values(|item| substitute(item, env)))),
        _ => expr.clone(),
    }
}

/// What a node stands for after macro expansion.
pub fn expand(form: &Value) -> Value {
    match form {
        Value::List(seq) => match seq.expansion() {
            Some(Expansion::Constant(constant)) => constant.form,
            Some(Expansion::Env(bound)) => bound.substitute(),
            Some(Expansion::Unchanged) => form.clone(),
            None => form.evaluated(),
        },
        _ => form.evaluated(),
    }
}
