//! JSON bridge for values.
//!
//! Keywords serialize as `":name"` strings and such strings read back as
//! keywords, interned in the runtime's table. Functions have no JSON form.

use std::fmt;
use std::rc::Rc;

use serde::de::{self, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{self, SerializeMap, SerializeSeq, Serializer};
use serde::Serialize;

use crate::interpreter::cps::list::key_name;
use crate::interpreter::cps::{ErrorKind, Keywords, Map, RuntimeError, Value};

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Nil => serializer.serialize_unit(),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => serializer.serialize_i64(*n as i64),
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Keyword(k) => serializer.serialize_str(&format!(":{}", k.name())),
            Value::Symbol(s) => serializer.serialize_str(s.name()),
            Value::List(seq) | Value::Vector(seq) => {
                let mut out = serializer.serialize_seq(Some(seq.len()))?;
                for item in seq.items() {
                    out.serialize_element(item)?;
                }
                out.end()
            }
            Value::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map.entries() {
                    match key {
                        Value::Keyword(_) => out.serialize_entry(&format!("{:?}", key), value)?,
                        _ => out.serialize_entry(key_name(key).unwrap_or_default(), value)?,
                    }
                }
                out.end()
            }
            Value::Atom(cell) => cell.borrow().serialize(serializer),
            Value::Function(_) => Err(ser::Error::custom("functions cannot be serialized")),
        }
    }
}

/// Deserializes a value, interning keywords in the given table.
pub struct ValueSeed<'a> {
    pub keywords: &'a Keywords,
}

fn text_value(text: &str, keywords: &Keywords) -> Value {
    match text.strip_prefix(':') {
        Some(name) if !name.is_empty() => Value::Keyword(keywords.intern(name)),
        _ => Value::string(text),
    }
}

impl<'de> DeserializeSeed<'de> for ValueSeed<'_> {
    type Value = Value;

    fn deserialize<D>(self, deserializer: D) -> Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for ValueSeed<'_> {
    type Value = Value;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result { formatter.write_str("a JSON value") }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> { Ok(Value::Nil) }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> { Ok(Value::Nil) }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> { Ok(Value::Boolean(v)) }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> { Ok(Value::Number(v as f64)) }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> { Ok(Value::Number(v as f64)) }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> { Ok(Value::Number(v)) }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> { Ok(text_value(v, self.keywords)) }

    fn visit_seq<V>(self, mut seq: V) -> Result<Value, V::Error>
    where
        V: SeqAccess<'de>,
    {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element_seed(ValueSeed { keywords: self.keywords })? {
            items.push(item);
        }
        Ok(Value::vector(items))
    }

    fn visit_map<V>(self, mut map: V) -> Result<Value, V::Error>
    where
        V: MapAccess<'de>,
    {
        let mut entries = Vec::new();
        while let Some(key) = map.next_key::<String>()? {
            let value = map.next_value_seed(ValueSeed { keywords: self.keywords })?;
            entries.push((text_value(&key, self.keywords), value));
        }
        match Map::new(entries) {
            Ok(m) => Ok(Value::Map(Rc::new(m))),
            Err(e) => Err(de::Error::custom(e.message)),
        }
    }
}

pub fn to_json_string(value: &Value) -> Result<String, RuntimeError> {
    serde_json::to_string(value).map_err(|e| RuntimeError::new(ErrorKind::Unsupported, e.to_string()))
}

pub fn from_json_str(json: &str, keywords: &Keywords) -> Result<Value, RuntimeError> {
    let mut deserializer = serde_json::Deserializer::from_str(json);
    let value = ValueSeed { keywords }
        .deserialize(&mut deserializer)
        .map_err(|e| RuntimeError::new(ErrorKind::TypeMismatch, format!("invalid JSON: {}", e)))?;
    deserializer
        .end()
        .map_err(|e| RuntimeError::new(ErrorKind::TypeMismatch, format!("invalid JSON: {}", e)))?;
    Ok(value)
}

#[cfg(test)]
mod test_json {
    use super::*;

    #[test]
    fn test_serialize_collections() {
        let keywords = Keywords::new();
        let value = Value::map(vec![
            (Value::Keyword(keywords.intern("size")), Value::vector(vec![Value::Number(1.0), Value::Number(2.5)])),
            (Value::string("name"), Value::string("box")),
            (Value::string("hidden"), Value::Nil),
        ])
        .unwrap();
        assert_eq!(to_json_string(&value).unwrap(), r#"{":size":[1,2.5],"name":"box","hidden":null}"#);
    }

    #[test]
    fn test_functions_do_not_serialize() {
        let rt = crate::interpreter::cps::Interpreter::new();
        let f = rt.read_eval("+").unwrap();
        assert_eq!(to_json_string(&f).unwrap_err().kind, ErrorKind::Unsupported);
    }

    #[test]
    fn test_parse_interns_keywords() {
        let keywords = Keywords::new();
        let value = from_json_str(r#"{":k": [":k", "plain", 3, true, null]}"#, &keywords).unwrap();
        let map = value.as_map().unwrap();
        let items = map.get(&Value::Keyword(keywords.intern("k"))).unwrap().as_seq().unwrap();
        assert!(items.items()[0].ptr_eq(&Value::Keyword(keywords.intern("k"))));
        assert_eq!(items.items()[1], Value::string("plain"));
        assert_eq!(items.items()[2], Value::Number(3.0));
        assert_eq!(items.items()[4], Value::Nil);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let keywords = Keywords::new();
        assert_eq!(from_json_str("{nope", &keywords).unwrap_err().kind, ErrorKind::TypeMismatch);
        assert!(from_json_str("1 2", &keywords).is_err());
    }
}
