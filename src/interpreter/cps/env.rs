use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::interpreter::cps::list::Seq;
use crate::interpreter::cps::value::Value;
use crate::interpreter::cps::RuntimeError;
use crate::runtime_error;

pub struct Env {
    pub parent: Option<Rc<RefCell<Env>>>,
    pub values: HashMap<String, Value>,
    // `def` forms that produced the bindings in this frame
    defs: HashMap<String, Weak<Seq>>,
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.parent {
            Some(ref parent) => write!(f, "<Env {} {:?}>", self.values.len(), parent.borrow()),
            None => write!(f, "<Env {}>", self.values.len()),
        }
    }
}

impl Env {
    pub fn new_root() -> Rc<RefCell<Env>> {
        Rc::new(RefCell::new(Env {
            parent: None,
            values: HashMap::new(),
            defs: HashMap::new(),
        }))
    }

    pub fn new_child(parent: Rc<RefCell<Env>>) -> Rc<RefCell<Env>> {
        Rc::new(RefCell::new(Env {
            parent: Some(parent),
            values: HashMap::new(),
            defs: HashMap::new(),
        }))
    }

    // Bind in this frame only; an existing binding here is overwritten,
    // one further up is shadowed.
    pub fn define(&mut self, key: String, value: Value) {
        self.defs.remove(&key);
        self.values.insert(key, value);
    }

    /// Like [`Env::define`], also recording the `def` form as the binding site.
    pub fn define_at(&mut self, key: String, value: Value, site: &Rc<Seq>) {
        self.defs.insert(key.clone(), Rc::downgrade(site));
        self.values.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        match self.values.get(key) {
            Some(val) => Some(val.clone()),
            None => match self.parent {
                Some(ref parent) => parent.borrow().get(key),
                None => None,
            },
        }
    }

    pub fn lookup(&self, key: &str) -> Result<Value, RuntimeError> {
        match self.get(key) {
            Some(val) => Ok(val),
            None => runtime_error!(UnboundSymbol, "Symbol '{}' not found", key),
        }
    }

    /// Binding site of the frame that resolves `key`.
    pub fn def_site(&self, key: &str) -> Option<Weak<Seq>> {
        match self.values.contains_key(key) {
            true => self.defs.get(key).cloned(),
            false => match self.parent {
                Some(ref parent) => parent.borrow().def_site(key),
                None => None,
            },
        }
    }

    pub fn has_own(&self, key: &str) -> bool { self.values.contains_key(key) }

    pub fn get_own(&self, key: &str) -> Option<Value> { self.values.get(key).cloned() }

    pub fn get_root(env_ref: Rc<RefCell<Env>>) -> Rc<RefCell<Env>> {
        let env = env_ref.borrow();
        match env.parent {
            Some(ref parent) => Env::get_root(parent.clone()),
            None => env_ref.clone(),
        }
    }
}

#[cfg(test)]
mod test_env {
    use super::*;
    use crate::interpreter::cps::ErrorKind;

    #[test]
    fn test_child_shadows_without_touching_parent() {
        let root = Env::new_root();
        root.borrow_mut().define("x".into(), Value::Number(1.0));
        let child = Env::new_child(root.clone());
        child.borrow_mut().define("x".into(), Value::Number(2.0));

        assert_eq!(child.borrow().lookup("x").unwrap(), Value::Number(2.0));
        assert_eq!(root.borrow().lookup("x").unwrap(), Value::Number(1.0));
        assert!(child.borrow().has_own("x"));
    }

    #[test]
    fn test_define_overwrites() {
        let root = Env::new_root();
        root.borrow_mut().define("x".into(), Value::Number(1.0));
        root.borrow_mut().define("x".into(), Value::Number(3.0));
        assert_eq!(root.borrow().lookup("x").unwrap(), Value::Number(3.0));
    }

    #[test]
    fn test_lookup_unbound() {
        let root = Env::new_root();
        let child = Env::new_child(root);
        let err = child.borrow().lookup("nope").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnboundSymbol);
    }

    #[test]
    fn test_has_own_ignores_parents() {
        let root = Env::new_root();
        root.borrow_mut().define("y".into(), Value::Nil);
        let child = Env::new_child(root.clone());
        assert!(!child.borrow().has_own("y"));
        assert!(child.borrow().get("y").is_some());
        assert!(Rc::ptr_eq(&Env::get_root(child), &root));
    }

    #[test]
    fn test_def_site_follows_resolving_frame() {
        let site = Rc::new(Seq::new(vec![Value::symbol("def")]));
        let root = Env::new_root();
        root.borrow_mut().define_at("z".into(), Value::Nil, &site);
        let child = Env::new_child(root);
        let found = child.borrow().def_site("z").and_then(|w| w.upgrade()).unwrap();
        assert!(Rc::ptr_eq(&found, &site));

        child.borrow_mut().define("z".into(), Value::Nil);
        assert!(child.borrow().def_site("z").is_none());
    }
}
