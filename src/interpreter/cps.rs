pub mod cont;
pub mod env;
pub mod error;
pub mod expand;
pub mod keyword;
pub mod list;
pub mod printer;
pub mod procedure;
pub mod special;
pub mod trampoline;
pub mod tree;
pub mod value;

#[cfg(test)]
mod tests;

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use tracing::debug;

pub use cont::Cont;
pub use env::Env;
pub use error::{ErrorKind, RuntimeError};
pub use expand::{Bound, Constant, Expansion, Lookup};
pub use keyword::{Keyword, Keywords};
pub use list::{Map, NodeCache, Notation, Seq};
pub use procedure::{CallContext, Closure, ClosureKind, Function, Native, NativeFn};
pub use special::{SpecialForm, SPECIAL_FORMS};
pub use trampoline::Trampoline;
pub use tree::{NodeId, Parent, Tree};
pub use value::{Symbol, Type, Value};

use crate::interpreter::Error;
use crate::reader;

/// One runtime: a root environment with the core library, plus the keyword
/// table every value read by it is interned in.
pub struct Interpreter {
    root: Rc<RefCell<Env>>,
    keywords: Keywords,
    // one entry per macro expansion in progress, innermost last
    recordings: RefCell<Vec<Vec<Lookup>>>,
}

impl Default for Interpreter {
    fn default() -> Self { Interpreter::new() }
}

impl Interpreter {
    pub fn new() -> Interpreter {
        let rt = Interpreter::bare();
        crate::library::install(&rt);
        rt
    }

    /// A runtime with an empty root environment.
    pub fn bare() -> Interpreter {
        Interpreter {
            root: Env::new_root(),
            keywords: Keywords::new(),
            recordings: RefCell::new(Vec::new()),
        }
    }

    pub fn root(&self) -> Rc<RefCell<Env>> { self.root.clone() }

    pub fn keywords(&self) -> &Keywords { &self.keywords }

    pub fn register(&self, lib: &[(&str, NativeFn)]) { procedure::register(&self.root, lib) }

    pub fn register_macros(&self, lib: &[(&str, NativeFn)]) { procedure::register_macros(&self.root, lib) }

    pub fn define(&self, name: &str, value: Value) { self.root.borrow_mut().define(name.to_string(), value) }

    pub fn read(&self, src: &str) -> Result<Value, reader::ReadError> { reader::read_program(src, &self.keywords) }

    pub fn eval(&self, expr: &Value) -> Result<Value, RuntimeError> { self.eval_in(expr, self.root.clone()) }

    pub fn eval_in(&self, expr: &Value, env: Rc<RefCell<Env>>) -> Result<Value, RuntimeError> {
        debug!("eval {:?}", expr);
        trampoline::run(self, Trampoline::Bounce(expr.clone(), env, Cont::Return))
    }

    pub fn read_eval(&self, src: &str) -> Result<Value, Error> {
        let program = self.read(src)?;
        Ok(self.eval(&program)?)
    }

    /// Apply a function value to evaluated arguments from host code.
    pub fn apply(&self, f: &Value, args: Vec<Value>, caller: Option<Rc<RefCell<Env>>>) -> Result<Value, RuntimeError> {
        let start = cont::apply(self, f.clone(), args, caller, Cont::Return)?;
        trampoline::run(self, start)
    }

    /// Expand `form` once against the root environment without evaluating it.
    pub fn macroexpand(&self, form: &Value) -> Result<Value, RuntimeError> {
        let start = cont::macroexpand(self, form.clone(), self.root.clone(), Cont::Return)?;
        trampoline::run(self, start)
    }

    /// What an evaluated node stands for after macro expansion, from its
    /// cached descriptor.
    pub fn expand(&self, form: &Value) -> Value { expand::expand(form) }

    /// Begin collecting the lookups a macro body makes. Returns the handle
    /// for [`Interpreter::finish_recording`].
    pub(crate) fn start_recording(&self) -> usize {
        let mut recordings = self.recordings.borrow_mut();
        recordings.push(Vec::new());
        recordings.len() - 1
    }

    /// Stop the recording opened as `depth` and return its lookups. They are
    /// also credited to the enclosing expansion, which depends on them too.
    pub(crate) fn finish_recording(&self, depth: usize) -> Rc<[Lookup]> {
        let mut recordings = self.recordings.borrow_mut();
        if depth >= recordings.len() {
            let none: Vec<Lookup> = Vec::new();
            return none.into();
        }
        recordings.truncate(depth + 1);
        let mut reads = recordings.pop().unwrap_or_default();
        let mut seen = HashSet::new();
        reads.retain(|read| seen.insert((Rc::as_ptr(&read.env), read.name.clone())));
        if let Some(outer) = recordings.last_mut() {
            outer.extend(reads.iter().cloned());
        }
        reads.into()
    }

    pub(crate) fn record_read(&self, env: &Rc<RefCell<Env>>, name: &str, value: &Value) {
        if let Some(current) = self.recordings.borrow_mut().last_mut() {
            current.push(Lookup {
                env: env.clone(),
                name: name.to_string(),
                value: value.clone(),
            });
        }
    }

    /// Credit a reused expansion's lookups to the expansion in progress.
    pub(crate) fn record_reads(&self, reads: &[Lookup]) {
        if let Some(current) = self.recordings.borrow_mut().last_mut() {
            current.extend(reads.iter().cloned());
        }
    }

    pub(crate) fn recording_depth(&self) -> usize { self.recordings.borrow().len() }

    /// Drop recordings left open by an expansion that failed.
    pub(crate) fn abandon_recordings(&self, depth: usize) { self.recordings.borrow_mut().truncate(depth) }
}
