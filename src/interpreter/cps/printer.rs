//! Format-preserving printer.
//!
//! Collections print their elements separated by the delimiter strings
//! recorded on the node, and string or number elements keep the spelling
//! they were read with, so text read from source prints back unchanged.
//! Nodes built at runtime get single spaces. Readable output of a collection
//! is memoized on the node until it is invalidated.

use crate::interpreter::cps::list::{key_name, Map, NodeCache, Notation, Seq};
use crate::interpreter::cps::procedure::{ClosureKind, Function};
use crate::interpreter::cps::value::Value;

/// Readable form: strings quoted and escaped, keys keep their sigil.
pub fn print(value: &Value) -> String {
    let mut out = String::new();
    render(value, true, &mut out);
    out
}

/// Display form: strings are written raw.
pub fn print_plain(value: &Value) -> String {
    let mut out = String::new();
    render(value, false, &mut out);
    out
}

/// Fixed four decimals with trailing zeros and a dangling point removed.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let fixed = format!("{:.4}", n);
    match fixed.trim_end_matches('0').trim_end_matches('.') {
        "-0" => "0".to_string(),
        trimmed => trimmed.to_string(),
    }
}

fn escape_into(text: &str, out: &mut String) {
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Spacing used for `count` elements when no source layout is recorded.
fn default_delimiters(count: usize, notation: Notation) -> Vec<String> {
    let gap = if notation.prefix().is_some() { "" } else { " " };
    let mut delimiters = vec![String::new(); count + 1];
    for delimiter in delimiters.iter_mut().take(count).skip(1) {
        *delimiter = gap.to_string();
    }
    delimiters
}

fn delimiters_for(cache: &NodeCache, count: usize, notation: Notation) -> Vec<String> {
    match cache.delimiters() {
        Some(delimiters) if delimiters.len() == count + 1 => delimiters,
        _ => {
            let delimiters = default_delimiters(count, notation);
            cache.set_delimiters(delimiters.clone());
            delimiters
        }
    }
}

// Returns false when the text depends on mutable state (atoms) and must not
// be memoized by an enclosing node.
fn render(value: &Value, readably: bool, out: &mut String) -> bool {
    match value {
        Value::Nil => out.push_str("nil"),
        Value::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&format_number(*n)),
        Value::String(s) if readably => escape_into(s, out),
        Value::String(s) => out.push_str(s),
        Value::Keyword(k) => {
            out.push(':');
            out.push_str(k.name());
        }
        Value::Symbol(s) => out.push_str(s.name()),
        Value::List(seq) => return render_seq(seq, "(", ")", readably, out),
        Value::Vector(seq) => return render_seq(seq, "[", "]", readably, out),
        Value::Map(map) => return render_map(map, readably, out),
        Value::Function(f) => render_function(f, out),
        Value::Atom(cell) => {
            out.push_str("(atom ");
            render(&cell.borrow(), readably, out);
            out.push(')');
            return false;
        }
    }
    true
}

// Element `index` as written in source, when the node recorded it.
fn literal(literals: &Option<Vec<Option<String>>>, index: usize, readably: bool) -> Option<&str> {
    match literals {
        Some(literals) if readably => literals.get(index).and_then(|l| l.as_deref()),
        _ => None,
    }
}

fn render_item(item: &Value, source: Option<&str>, readably: bool, out: &mut String) -> bool {
    match (source, item) {
        (Some(text), Value::String(_) | Value::Number(_)) => {
            out.push_str(text);
            true
        }
        _ => render(item, readably, out),
    }
}

fn render_seq(seq: &Seq, open: &str, close: &str, readably: bool, out: &mut String) -> bool {
    if readably {
        if let Some(cached) = seq.cache().rendered() {
            out.push_str(&cached);
            return true;
        }
    }

    let items = seq.items();
    let delimiters = delimiters_for(seq.cache(), items.len(), seq.notation());
    let literals = seq.cache().literals();
    let mut text = String::new();
    let mut stable = true;
    match (seq.notation().prefix(), items) {
        (Some(prefix), [_, form]) => {
            text.push_str(prefix);
            text.push_str(&delimiters[1]);
            stable &= render_item(form, literal(&literals, 1, readably), readably, &mut text);
        }
        _ => {
            let bare = seq.notation() == Notation::Program;
            if !bare {
                text.push_str(open);
            }
            text.push_str(&delimiters[0]);
            for (i, (item, delimiter)) in items.iter().zip(&delimiters[1..]).enumerate() {
                stable &= render_item(item, literal(&literals, i, readably), readably, &mut text);
                text.push_str(delimiter);
            }
            if !bare {
                text.push_str(close);
            }
        }
    }

    if readably && stable {
        seq.cache().set_rendered(text.clone());
    }
    out.push_str(&text);
    stable
}

// {d0 k0 d1 v0 d2 k1 d3 v1 d4}: keys and values alternate, 2n+1 delimiters
fn render_map(map: &Map, readably: bool, out: &mut String) -> bool {
    if readably {
        if let Some(cached) = map.cache().rendered() {
            out.push_str(&cached);
            return true;
        }
    }

    let flat: Vec<&Value> = map.entries().iter().flat_map(|(k, v)| [k, v]).collect();
    let delimiters = delimiters_for(map.cache(), flat.len(), Notation::Plain);
    let literals = map.cache().literals();
    let mut text = String::from("{");
    let mut stable = true;
    text.push_str(&delimiters[0]);
    for (i, (item, delimiter)) in flat.iter().zip(&delimiters[1..]).enumerate() {
        match (i % 2 == 0, key_name(item)) {
            (true, Some(name)) if !readably && matches!(item, Value::String(_)) => text.push_str(name),
            _ => stable &= render_item(item, literal(&literals, i, readably), readably, &mut text),
        }
        text.push_str(delimiter);
    }
    text.push('}');

    if readably && stable {
        map.cache().set_rendered(text.clone());
    }
    out.push_str(&text);
    stable
}

fn render_function(f: &Function, out: &mut String) {
    match f {
        Function::Native(native) => {
            out.push_str("#<native ");
            out.push_str(&native.name);
            out.push('>');
        }
        Function::Closure(closure) => {
            out.push('(');
            out.push_str(match closure.kind {
                ClosureKind::Function => "fn",
                ClosureKind::Macro => "macro",
                ClosureKind::Template => "syntax",
            });
            out.push(' ');
            render(&closure.params, true, out);
            out.push(' ');
            render(&closure.body, true, out);
            out.push(')');
        }
    }
}
