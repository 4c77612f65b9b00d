use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// An interned keyword. Two keywords from the same table compare by identity.
#[derive(Clone)]
pub struct Keyword(Rc<str>);

impl Keyword {
    pub fn name(&self) -> &str { &self.0 }

    pub fn ptr_eq(&self, other: &Keyword) -> bool { Rc::ptr_eq(&self.0, &other.0) }
}

impl PartialEq for Keyword {
    fn eq(&self, other: &Self) -> bool { self.ptr_eq(other) }
}

impl fmt::Debug for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, ":{}", self.0) }
}

/// Intern table owned by one runtime; separate runtimes never share keywords.
#[derive(Default)]
pub struct Keywords {
    table: RefCell<HashMap<String, Keyword>>,
}

impl Keywords {
    pub fn new() -> Keywords { Keywords::default() }

    pub fn intern(&self, name: &str) -> Keyword {
        if let Some(keyword) = self.table.borrow().get(name) {
            return keyword.clone();
        }
        let keyword = Keyword(Rc::from(name));
        self.table.borrow_mut().insert(name.to_string(), keyword.clone());
        keyword
    }

    pub fn len(&self) -> usize { self.table.borrow().len() }

    pub fn is_empty(&self) -> bool { self.table.borrow().is_empty() }
}
