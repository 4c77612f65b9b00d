use std::cell::RefCell;

use crate::interpreter::cps::expand::Expansion;
use crate::interpreter::cps::value::Value;
use crate::interpreter::cps::RuntimeError;
use crate::runtime_error;

/// How a list was written. Sugar notations print as their reader prefix,
/// `Program` prints its forms without surrounding parens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notation {
    Plain,
    Quote,
    Quasiquote,
    Unquote,
    SpliceUnquote,
    Deref,
    Program,
}

impl Notation {
    pub fn prefix(self) -> Option<&'static str> {
        match self {
            Notation::Quote => Some("'"),
            Notation::Quasiquote => Some("`"),
            Notation::Unquote => Some("~"),
            Notation::SpliceUnquote => Some("~@"),
            Notation::Deref => Some("@"),
            Notation::Plain | Notation::Program => None,
        }
    }

    /// Symbol that heads the expanded form of a sugar notation.
    pub fn head(self) -> Option<&'static str> {
        match self {
            Notation::Quote => Some("quote"),
            Notation::Quasiquote => Some("quasiquote"),
            Notation::Unquote => Some("unquote"),
            Notation::SpliceUnquote => Some("splice-unquote"),
            Notation::Deref => Some("deref"),
            Notation::Plain | Notation::Program => None,
        }
    }
}

/// Derived data memoized on a collection node.
///
/// Delimiters are the literal text between elements (plus the leading and
/// trailing text inside the brackets). Literals are the source spelling of
/// string and number elements whose printed form would differ, such as `1.0`
/// or a string with a raw tab. Both describe source layout, so
/// [`NodeCache::invalidate`] keeps them and only drops the rendered string and
/// the evaluated value.
#[derive(Default)]
pub struct NodeCache {
    delimiters: RefCell<Option<Vec<String>>>,
    literals: RefCell<Option<Vec<Option<String>>>>,
    rendered: RefCell<Option<String>>,
    evaluated: RefCell<Option<Value>>,
}

impl NodeCache {
    fn with_delimiters(delimiters: Option<Vec<String>>) -> NodeCache {
        NodeCache {
            delimiters: RefCell::new(delimiters),
            ..NodeCache::default()
        }
    }

    pub fn delimiters(&self) -> Option<Vec<String>> { self.delimiters.borrow().clone() }

    pub fn set_delimiters(&self, delimiters: Vec<String>) { *self.delimiters.borrow_mut() = Some(delimiters); }

    pub fn literals(&self) -> Option<Vec<Option<String>>> { self.literals.borrow().clone() }

    /// Record the source text of each element; `None` entries print normally.
    pub fn set_literals(&self, literals: Vec<Option<String>>) {
        let kept = literals.iter().any(Option::is_some).then_some(literals);
        *self.literals.borrow_mut() = kept;
    }

    fn forget_literal(&self, index: usize) {
        if let Some(slot) = self.literals.borrow_mut().as_mut().and_then(|l| l.get_mut(index)) {
            *slot = None;
        }
    }

    pub fn rendered(&self) -> Option<String> { self.rendered.borrow().clone() }

    pub fn set_rendered(&self, text: String) { *self.rendered.borrow_mut() = Some(text); }

    pub fn evaluated(&self) -> Option<Value> { self.evaluated.borrow().clone() }

    pub fn set_evaluated(&self, value: Value) { *self.evaluated.borrow_mut() = Some(value); }

    pub fn invalidate(&self) {
        *self.rendered.borrow_mut() = None;
        *self.evaluated.borrow_mut() = None;
    }

    // layout and text carry over to copies, evaluation does not
    fn copy_layout(&self) -> NodeCache {
        NodeCache {
            delimiters: RefCell::new(self.delimiters()),
            literals: RefCell::new(self.literals()),
            rendered: RefCell::new(self.rendered()),
            evaluated: RefCell::new(None),
        }
    }
}

/// Ordered elements of a list or vector, with the caches the evaluator and
/// printer attach to the node.
pub struct Seq {
    items: Vec<Value>,
    notation: Notation,
    cache: NodeCache,
    expansion: RefCell<Option<Expansion>>,
}

impl Seq {
    pub fn new(items: Vec<Value>) -> Seq { Seq::with_notation(items, Notation::Plain) }

    pub fn with_notation(items: Vec<Value>, notation: Notation) -> Seq {
        Seq {
            items,
            notation,
            cache: NodeCache::default(),
            expansion: RefCell::new(None),
        }
    }

    pub fn from_source(items: Vec<Value>, notation: Notation, delimiters: Vec<String>) -> Seq {
        Seq {
            items,
            notation,
            cache: NodeCache::with_delimiters(Some(delimiters)),
            expansion: RefCell::new(None),
        }
    }

    pub fn items(&self) -> &[Value] { &self.items }

    pub fn len(&self) -> usize { self.items.len() }

    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn get(&self, index: usize) -> Option<&Value> { self.items.get(index) }

    pub fn notation(&self) -> Notation { self.notation }

    pub fn cache(&self) -> &NodeCache { &self.cache }

    /// Name of the head symbol, if the first element is a symbol.
    pub fn head_name(&self) -> Option<&str> {
        match self.items.first() {
            Some(Value::Symbol(s)) => Some(s.name()),
            _ => None,
        }
    }

    pub fn expansion(&self) -> Option<Expansion> { self.expansion.borrow().clone() }

    pub fn set_expansion(&self, expansion: Expansion) { *self.expansion.borrow_mut() = Some(expansion); }

    pub fn invalidate(&self) {
        self.cache.invalidate();
        *self.expansion.borrow_mut() = None;
    }

    /// Copy with one element swapped. The copy keeps the layout but none of
    /// the derived caches.
    pub fn replaced(&self, index: usize, value: Value) -> Result<Seq, RuntimeError> {
        if index >= self.items.len() {
            runtime_error!(IndexOutOfRange, "Index {} out of range for length {}", index, self.items.len())
        }
        let mut items = self.items.clone();
        items[index] = value;
        let seq = Seq {
            items,
            notation: self.notation,
            cache: self.cache.copy_layout(),
            expansion: RefCell::new(None),
        };
        seq.cache.forget_literal(index);
        seq.invalidate();
        Ok(seq)
    }

    /// Same layout and notation with every element passed through `f`.
    pub fn mapped(&self, f: impl Fn(&Value) -> Value) -> Seq {
        Seq {
            items: self.items.iter().map(f).collect(),
            notation: self.notation,
            cache: NodeCache::with_delimiters(self.cache.delimiters()),
            expansion: RefCell::new(None),
        }
    }

    pub fn deep_clone(&self) -> Seq {
        Seq {
            items: self.items.iter().map(Value::deep_clone).collect(),
            notation: self.notation,
            cache: self.cache.copy_layout(),
            expansion: RefCell::new(None),
        }
    }
}

/// Text a map key is compared by. Only keywords and strings are valid keys.
pub fn key_name(key: &Value) -> Option<&str> {
    match key {
        Value::Keyword(k) => Some(k.name()),
        Value::String(s) => Some(&**s),
        _ => None,
    }
}

fn checked_key_name(key: &Value) -> Result<&str, RuntimeError> {
    match key_name(key) {
        Some(name) => Ok(name),
        None => runtime_error!(InvalidMapKey, "Unexpected key {:?}, expected: keyword or string", key),
    }
}

/// Insertion-ordered map keyed by keyword or string text.
pub struct Map {
    entries: Vec<(Value, Value)>,
    cache: NodeCache,
}

impl Map {
    /// Later duplicates overwrite earlier ones in place.
    pub fn new(entries: Vec<(Value, Value)>) -> Result<Map, RuntimeError> {
        let mut out: Vec<(Value, Value)> = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let name = checked_key_name(&key)?;
            match out.iter().position(|(k, _)| key_name(k) == Some(name)) {
                Some(pos) => out[pos] = (key, value),
                None => out.push((key, value)),
            }
        }
        Ok(Map {
            entries: out,
            cache: NodeCache::default(),
        })
    }

    /// Map literal read from source. Duplicate keys are rejected.
    pub fn from_source(entries: Vec<(Value, Value)>, delimiters: Vec<String>) -> Result<Map, RuntimeError> {
        for (i, (key, _)) in entries.iter().enumerate() {
            let name = checked_key_name(key)?;
            if entries[..i].iter().any(|(k, _)| key_name(k) == Some(name)) {
                runtime_error!(InvalidMapKey, "Duplicate key {:?}", key)
            }
        }
        Ok(Map {
            entries,
            cache: NodeCache::with_delimiters(Some(delimiters)),
        })
    }

    /// Build from alternating keys and values.
    pub fn from_flat(items: Vec<Value>) -> Result<Map, RuntimeError> {
        if items.len() % 2 != 0 {
            runtime_error!(Bind, "Expected key/value pairs, got {} elements", items.len())
        }
        let mut entries = Vec::with_capacity(items.len() / 2);
        let mut iter = items.into_iter();
        while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
            entries.push((key, value));
        }
        Map::new(entries)
    }

    pub fn entries(&self) -> &[(Value, Value)] { &self.entries }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn cache(&self) -> &NodeCache { &self.cache }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        if let Value::Keyword(wanted) = key {
            let found = self.entries.iter().find(|(k, _)| matches!(k, Value::Keyword(k) if k.ptr_eq(wanted)));
            if let Some((_, value)) = found {
                return Some(value);
            }
        }
        key_name(key).and_then(|name| self.get_name(name))
    }

    pub fn get_name(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| key_name(k) == Some(name)).map(|(_, v)| v)
    }

    pub fn assoc(&self, pairs: Vec<(Value, Value)>) -> Result<Map, RuntimeError> {
        let mut entries = self.entries.clone();
        entries.extend(pairs);
        Map::new(entries)
    }

    pub fn dissoc(&self, keys: &[Value]) -> Map {
        let removed: Vec<&str> = keys.iter().filter_map(key_name).collect();
        Map {
            entries: self
                .entries
                .iter()
                .filter(|(k, _)| !key_name(k).map_or(false, |name| removed.contains(&name)))
                .cloned()
                .collect(),
            cache: NodeCache::default(),
        }
    }

    /// Copy with the element at `flat` swapped, counting keys and values
    /// alternately (key 0, value 0, key 1, ...).
    pub fn replaced(&self, flat: usize, value: Value) -> Result<Map, RuntimeError> {
        let index = flat / 2;
        if index >= self.entries.len() {
            runtime_error!(IndexOutOfRange, "Index {} out of range for map of {} entries", flat, self.entries.len())
        }
        let mut entries = self.entries.clone();
        if flat % 2 == 0 {
            let name = checked_key_name(&value)?;
            let clash = entries.iter().enumerate().any(|(i, (k, _))| i != index && key_name(k) == Some(name));
            if clash {
                runtime_error!(InvalidMapKey, "Duplicate key {:?}", value)
            }
            entries[index].0 = value;
        } else {
            entries[index].1 = value;
        }
        let map = Map {
            entries,
            cache: self.cache.copy_layout(),
        };
        map.cache.forget_literal(flat);
        map.cache.invalidate();
        Ok(map)
    }

    pub fn mapped_values(&self, f: impl Fn(&Value) -> Value) -> Map {
        Map {
            entries: self.entries.iter().map(|(k, v)| (k.clone(), f(v))).collect(),
            cache: NodeCache::with_delimiters(self.cache.delimiters()),
        }
    }

    pub fn deep_clone(&self) -> Map {
        Map {
            entries: self.entries.iter().map(|(k, v)| (k.deep_clone(), v.deep_clone())).collect(),
            cache: self.cache.copy_layout(),
        }
    }
}

/// Order-insensitive: same key set and equal values.
impl PartialEq for Map {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| key_name(k).and_then(|name| other.get_name(name)).map_or(false, |o| o == v))
    }
}

#[cfg(test)]
mod test_list {
    use super::*;
    use crate::interpreter::cps::{ErrorKind, Keywords};

    #[test]
    fn test_replaced_keeps_layout_and_drops_caches() {
        let seq = Seq::from_source(
            vec![Value::symbol("f"), Value::Number(1.0)],
            Notation::Plain,
            vec!["".into(), "  ".into(), "".into()],
        );
        seq.cache().set_rendered("(f  1)".into());
        seq.cache().set_evaluated(Value::Number(9.0));

        let copy = seq.replaced(1, Value::Number(2.0)).unwrap();
        assert_eq!(copy.items()[1], Value::Number(2.0));
        assert_eq!(copy.cache().delimiters(), seq.cache().delimiters());
        assert!(copy.cache().rendered().is_none());
        assert!(copy.cache().evaluated().is_none());
        assert_eq!(seq.items()[1], Value::Number(1.0));
    }

    #[test]
    fn test_replaced_out_of_range() {
        let seq = Seq::new(vec![Value::Nil]);
        assert_eq!(seq.replaced(3, Value::Nil).err().unwrap().kind, ErrorKind::IndexOutOfRange);
    }

    #[test]
    fn test_map_rejects_non_text_keys() {
        let err = Map::new(vec![(Value::Number(1.0), Value::Nil)]).err().unwrap();
        assert_eq!(err.kind, ErrorKind::InvalidMapKey);
    }

    #[test]
    fn test_map_lookup_by_keyword_and_string() {
        let keywords = Keywords::new();
        let map = Map::new(vec![
            (Value::Keyword(keywords.intern("a")), Value::Number(1.0)),
            (Value::string("b"), Value::Number(2.0)),
        ])
        .unwrap();
        assert_eq!(map.get(&Value::Keyword(keywords.intern("a"))), Some(&Value::Number(1.0)));
        assert_eq!(map.get(&Value::string("b")), Some(&Value::Number(2.0)));
        assert_eq!(map.get(&Value::string("c")), None);
    }

    #[test]
    fn test_map_later_duplicate_wins() {
        let map = Map::from_flat(vec![Value::string("a"), Value::Number(1.0), Value::string("a"), Value::Number(2.0)]).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get_name("a"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn test_map_equality_ignores_order() {
        let a = Map::from_flat(vec![Value::string("x"), Value::Nil, Value::string("y"), Value::Number(1.0)]).unwrap();
        let b = Map::from_flat(vec![Value::string("y"), Value::Number(1.0), Value::string("x"), Value::Nil]).unwrap();
        assert!(a == b);
    }

    #[test]
    fn test_source_map_rejects_duplicates() {
        let entries = vec![(Value::string("a"), Value::Nil), (Value::string("a"), Value::Nil)];
        let err = Map::from_source(entries, vec![String::new(); 5]).err().unwrap();
        assert_eq!(err.kind, ErrorKind::InvalidMapKey);
    }
}
