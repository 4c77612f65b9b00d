use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::interpreter::cps::keyword::Keyword;
use crate::interpreter::cps::list::{Map, Seq};
use crate::interpreter::cps::printer;
use crate::interpreter::cps::procedure::Function;
use crate::interpreter::cps::RuntimeError;
use crate::runtime_error;

/// Type tag, used for dispatch and by the `type` native.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    List,
    Vector,
    Map,
    Number,
    String,
    Boolean,
    Nil,
    Symbol,
    Keyword,
    Atom,
    Function,
    Macro,
}

impl Type {
    pub fn name(self) -> &'static str {
        match self {
            Type::List => "list",
            Type::Vector => "vector",
            Type::Map => "map",
            Type::Number => "number",
            Type::String => "string",
            Type::Boolean => "boolean",
            Type::Nil => "nil",
            Type::Symbol => "symbol",
            Type::Keyword => "keyword",
            Type::Atom => "atom",
            Type::Function => "fn",
            Type::Macro => "macro",
        }
    }
}

/// Cloning a `Value` is shallow: collection nodes are shared, never copied.
/// Use [`Value::deep_clone`] for a structural copy.
#[derive(Clone)]
pub enum Value {
    Nil,
    Boolean(bool),
    Number(f64),
    String(Rc<str>),
    Keyword(Keyword),
    Symbol(Rc<Symbol>),

    List(Rc<Seq>),
    Vector(Rc<Seq>),
    Map(Rc<Map>),

    Function(Rc<Function>),

    Atom(Rc<RefCell<Value>>),
}

pub struct Symbol {
    name: String,
    evaluated: RefCell<Option<Value>>,
    // non-owning link to the `def` form that bound this name
    def: RefCell<Weak<Seq>>,
}

impl Symbol {
    pub fn new(name: impl Into<String>) -> Symbol {
        Symbol {
            name: name.into(),
            evaluated: RefCell::new(None),
            def: RefCell::new(Weak::new()),
        }
    }

    pub fn name(&self) -> &str { &self.name }

    pub fn evaluated(&self) -> Option<Value> { self.evaluated.borrow().clone() }

    pub fn set_evaluated(&self, value: Value) { *self.evaluated.borrow_mut() = Some(value); }

    pub fn def(&self) -> Option<Rc<Seq>> { self.def.borrow().upgrade() }

    pub fn set_def(&self, site: Weak<Seq>) { *self.def.borrow_mut() = site; }

    pub fn invalidate(&self) {
        *self.evaluated.borrow_mut() = None;
        *self.def.borrow_mut() = Weak::new();
    }
}

impl std::ops::Add for Value {
    type Output = Result<Value, RuntimeError>;

    fn add(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (a, b) => runtime_error!(TypeMismatch, "Cannot `+` {:?} and {:?}", a, b),
        }
    }
}

impl std::ops::Sub for Value {
    type Output = Result<Value, RuntimeError>;

    fn sub(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
            (a, b) => runtime_error!(TypeMismatch, "Cannot `-` {:?} and {:?}", a, b),
        }
    }
}

impl std::ops::Mul for Value {
    type Output = Result<Value, RuntimeError>;

    fn mul(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
            (a, b) => runtime_error!(TypeMismatch, "Cannot `*` {:?} and {:?}", a, b),
        }
    }
}

impl std::ops::Div for Value {
    type Output = Result<Value, RuntimeError>;

    fn div(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),
            (a, b) => runtime_error!(TypeMismatch, "Cannot `/` {:?} and {:?}", a, b),
        }
    }
}

impl std::ops::Neg for Value {
    type Output = Result<Value, RuntimeError>;

    fn neg(self) -> Self::Output {
        match self {
            Value::Number(a) => Ok(Value::Number(-a)),
            x => runtime_error!(TypeMismatch, "Cannot `-` {:?}", x),
        }
    }
}

impl Value {
    pub fn symbol(name: impl Into<String>) -> Value { Value::Symbol(Rc::new(Symbol::new(name))) }

    pub fn string(text: impl AsRef<str>) -> Value { Value::String(Rc::from(text.as_ref())) }

    pub fn list(items: Vec<Value>) -> Value { Value::List(Rc::new(Seq::new(items))) }

    pub fn vector(items: Vec<Value>) -> Value { Value::Vector(Rc::new(Seq::new(items))) }

    pub fn map(entries: Vec<(Value, Value)>) -> Result<Value, RuntimeError> { Ok(Value::Map(Rc::new(Map::new(entries)?))) }

    pub fn atom(value: Value) -> Value { Value::Atom(Rc::new(RefCell::new(value))) }

    pub fn type_of(&self) -> Type {
        match self {
            Value::Nil => Type::Nil,
            Value::Boolean(_) => Type::Boolean,
            Value::Number(_) => Type::Number,
            Value::String(_) => Type::String,
            Value::Keyword(_) => Type::Keyword,
            Value::Symbol(_) => Type::Symbol,
            Value::List(_) => Type::List,
            Value::Vector(_) => Type::Vector,
            Value::Map(_) => Type::Map,
            Value::Function(f) if f.is_macro() => Type::Macro,
            Value::Function(_) => Type::Function,
            Value::Atom(_) => Type::Atom,
        }
    }

    /// Only `nil` and `false` are falsy.
    pub fn is_truthy(&self) -> bool { !matches!(self, Value::Nil | Value::Boolean(false)) }

    pub fn is_nil(&self) -> bool { matches!(self, Value::Nil) }

    pub fn as_number(&self) -> Result<f64, RuntimeError> {
        match self {
            Value::Number(n) => Ok(*n),
            _ => runtime_error!(TypeMismatch, "Expected a number: {:?}", self),
        }
    }

    pub fn as_str(&self) -> Result<&str, RuntimeError> {
        match self {
            Value::String(s) => Ok(&**s),
            _ => runtime_error!(TypeMismatch, "Expected a string: {:?}", self),
        }
    }

    /// Lists and vectors.
    pub fn as_seq(&self) -> Result<&Rc<Seq>, RuntimeError> {
        match self {
            Value::List(seq) | Value::Vector(seq) => Ok(seq),
            _ => runtime_error!(TypeMismatch, "Expected a sequence: {:?}", self),
        }
    }

    pub fn as_map(&self) -> Result<&Rc<Map>, RuntimeError> {
        match self {
            Value::Map(map) => Ok(map),
            _ => runtime_error!(TypeMismatch, "Expected a map: {:?}", self),
        }
    }

    pub fn as_atom(&self) -> Result<&Rc<RefCell<Value>>, RuntimeError> {
        match self {
            Value::Atom(cell) => Ok(cell),
            _ => runtime_error!(TypeMismatch, "Expected an atom: {:?}", self),
        }
    }

    /// Text of a string, keyword or symbol.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(&**s),
            Value::Keyword(k) => Some(k.name()),
            Value::Symbol(s) => Some(s.name()),
            _ => None,
        }
    }

    /// The memoized result of the last evaluation of this node, or the node
    /// itself when it is self-evaluating or was never evaluated.
    pub fn evaluated(&self) -> Value {
        let cached = match self {
            Value::Symbol(s) => s.evaluated(),
            Value::List(seq) | Value::Vector(seq) => seq.cache().evaluated(),
            Value::Map(map) => map.cache().evaluated(),
            Value::Atom(cell) => Some(cell.borrow().clone()),
            _ => None,
        };
        cached.unwrap_or_else(|| self.clone())
    }

    pub fn set_evaluated(&self, value: Value) {
        match self {
            Value::Symbol(s) => s.set_evaluated(value),
            Value::List(seq) | Value::Vector(seq) => seq.cache().set_evaluated(value),
            Value::Map(map) => map.cache().set_evaluated(value),
            _ => {}
        }
    }

    /// Drop every derived cache held by this node.
    pub fn invalidate(&self) {
        match self {
            Value::Symbol(s) => s.invalidate(),
            Value::List(seq) | Value::Vector(seq) => seq.invalidate(),
            Value::Map(map) => map.cache().invalidate(),
            _ => {}
        }
    }

    /// Identity comparison. Atomic payloads have no identity except `nil`.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Keyword(a), Value::Keyword(b)) => a.ptr_eq(b),
            (Value::Symbol(a), Value::Symbol(b)) => Rc::ptr_eq(a, b),
            (Value::List(a), Value::List(b)) | (Value::Vector(a), Value::Vector(b)) => Rc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Atom(a), Value::Atom(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Structural copy: collections and symbols get fresh nodes, keywords and
    /// functions keep their identity.
    pub fn deep_clone(&self) -> Value {
        match self {
            Value::Symbol(s) => Value::symbol(s.name()),
            Value::List(seq) => Value::List(Rc::new(seq.deep_clone())),
            Value::Vector(seq) => Value::Vector(Rc::new(seq.deep_clone())),
            Value::Map(map) => Value::Map(Rc::new(map.deep_clone())),
            Value::Atom(cell) => Value::atom(cell.borrow().deep_clone()),
            other => other.clone(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Keyword(a), Value::Keyword(b)) => a.ptr_eq(b),
            (Value::Symbol(a), Value::Symbol(b)) => a.name() == b.name(),
            (Value::List(a) | Value::Vector(a), Value::List(b) | Value::Vector(b)) => a.items() == b.items(),
            (Value::Map(a), Value::Map(b)) => **a == **b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Atom(a), Value::Atom(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { f.write_str(&printer::print_plain(self)) }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { f.write_str(&printer::print(self)) }
}

#[cfg(test)]
mod test_value {
    use super::*;
    use crate::interpreter::cps::Keywords;

    #[test]
    fn test_equal_payloads_are_equal() {
        assert_eq!(Value::Number(1.5), Value::Number(1.5));
        assert_eq!(Value::string("a"), Value::string("a"));
        assert_eq!(Value::symbol("x"), Value::symbol("x"));
        assert_eq!(
            Value::list(vec![Value::Number(1.0), Value::string("b")]),
            Value::list(vec![Value::Number(1.0), Value::string("b")])
        );
        assert_ne!(Value::Number(1.0), Value::string("1"));
    }

    #[test]
    fn test_keyword_equality_is_identity() {
        let keywords = Keywords::new();
        let a = Value::Keyword(keywords.intern("k"));
        let b = Value::Keyword(keywords.intern("k"));
        assert!(a.ptr_eq(&b));
        assert_eq!(a, b);
    }

    #[test]
    fn test_atoms_compare_by_identity() {
        let a = Value::atom(Value::Number(1.0));
        let b = Value::atom(Value::Number(1.0));
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_deep_clone_makes_fresh_nodes() {
        let original = Value::list(vec![Value::symbol("f"), Value::vector(vec![Value::Number(2.0)])]);
        let copy = original.deep_clone();
        assert_eq!(original, copy);
        assert!(!original.ptr_eq(&copy));
    }

    #[test]
    fn test_self_evaluating_evaluated_is_self() {
        let n = Value::Number(4.0);
        assert_eq!(n.evaluated(), n);
        let atom = Value::atom(Value::string("held"));
        assert_eq!(atom.evaluated(), Value::string("held"));
    }

    #[test]
    fn test_arithmetic_rejects_non_numbers() {
        let err = (Value::Number(1.0) + Value::string("a")).unwrap_err();
        assert_eq!(err.kind, crate::interpreter::cps::ErrorKind::TypeMismatch);
        assert_eq!((Value::Number(1.0) + Value::Number(2.0)).unwrap(), Value::Number(3.0));
    }
}
