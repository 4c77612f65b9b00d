//! Core library: predicates, comparison, arithmetic, sequences, maps,
//! strings, atoms and a few native macros.

use crate::interpreter::cps::printer::{print, print_plain};
use crate::interpreter::cps::{CallContext, ErrorKind, Map, NativeFn, RuntimeError, Type, Value};
use crate::reader::read_form;
use crate::{match_args, runtime_error};

macro_rules! predicate {
    ($fn_name:ident, $name:expr, $x:ident => $test:expr) => {
        fn $fn_name(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
            match_args!($name, args, [$x] => Value::Boolean($test))
        }
    };
}

predicate!(is_nil, "nil?", x => x.is_nil());
predicate!(is_true, "true?", x => matches!(x, Value::Boolean(true)));
predicate!(is_false, "false?", x => matches!(x, Value::Boolean(false)));
predicate!(is_boolean, "boolean?", x => x.type_of() == Type::Boolean);
predicate!(is_number, "number?", x => x.type_of() == Type::Number);
predicate!(is_string, "string?", x => x.type_of() == Type::String);
predicate!(is_keyword, "keyword?", x => x.type_of() == Type::Keyword);
predicate!(is_symbol, "symbol?", x => x.type_of() == Type::Symbol);
predicate!(is_fn, "fn?", x => x.type_of() == Type::Function);
predicate!(is_macro, "macro?", x => x.type_of() == Type::Macro);
predicate!(is_list, "list?", x => x.type_of() == Type::List);
predicate!(is_vector, "vector?", x => x.type_of() == Type::Vector);
predicate!(is_map, "map?", x => x.type_of() == Type::Map);
predicate!(is_sequential, "sequential?", x => matches!(x, Value::List(_) | Value::Vector(_)));
predicate!(is_atom, "atom?", x => x.type_of() == Type::Atom);

fn type_of(ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("type", args, [x] => Value::Keyword(ctx.keywords().intern(x.type_of().name())))
}

fn is_empty(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("empty?", args, [x] => Value::Boolean(match x {
        Value::Nil => true,
        Value::List(seq) | Value::Vector(seq) => seq.is_empty(),
        Value::Map(map) => map.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => runtime_error!(TypeMismatch, "empty?: expected a collection, got {:?}", x),
    }))
}

// constructors

fn name_of<'a>(name: &str, x: &'a Value) -> Result<&'a str, RuntimeError> {
    match x.as_name() {
        Some(text) => Ok(text),
        None => runtime_error!(TypeMismatch, "{}: expected a string, keyword or symbol, got {:?}", name, x),
    }
}

fn keyword(ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("keyword", args, [x] => match x {
        Value::Keyword(_) => x.clone(),
        _ => Value::Keyword(ctx.keywords().intern(name_of("keyword", x)?)),
    })
}

fn symbol(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("symbol", args, [x] => Value::symbol(name_of("symbol", x)?))
}

fn list(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> { Ok(Value::list(args)) }

fn vector(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> { Ok(Value::vector(args)) }

fn vec(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("vec", args, [coll] => Value::vector(items_of(coll)?))
}

fn hash_map(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::Map(std::rc::Rc::new(Map::from_flat(args)?)))
}

fn atom(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("atom", args, [x] => Value::atom(x.clone()))
}

// comparison

fn equal(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("=", args, [a, b] => Value::Boolean(a == b))
}

fn not_equal(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("!=", args, [a, b] => Value::Boolean(a != b))
}

fn compare(name: &str, args: Vec<Value>, test: fn(f64, f64) -> bool) -> Result<Value, RuntimeError> {
    match_args!(name, args, [a, b] => match (a, b) {
        (Value::Number(a), Value::Number(b)) => Value::Boolean(test(*a, *b)),
        _ => runtime_error!(Unsupported, "{}: cannot compare {:?} and {:?}", name, a, b),
    })
}

fn less(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> { compare("<", args, |a, b| a < b) }

fn less_equal(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> { compare("<=", args, |a, b| a <= b) }

fn greater(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> { compare(">", args, |a, b| a > b) }

fn greater_equal(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> { compare(">=", args, |a, b| a >= b) }

// arithmetic

fn add(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    args.into_iter().try_fold(Value::Number(0.0), |acc, arg| acc + arg)
}

fn mul(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    args.into_iter().try_fold(Value::Number(1.0), |acc, arg| acc * arg)
}

fn sub(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let mut iter = args.into_iter();
    match (iter.next(), iter.len()) {
        (None, _) => Ok(Value::Number(0.0)),
        (Some(x), 0) => -x,
        (Some(first), _) => iter.try_fold(first, |acc, arg| acc - arg),
    }
}

fn div(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let mut iter = args.into_iter();
    match (iter.next(), iter.len()) {
        (None, _) => Ok(Value::Number(1.0)),
        (Some(x), 0) => Value::Number(1.0) / x,
        (Some(first), _) => iter.try_fold(first, |acc, arg| acc / arg),
    }
}

fn modulo(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("mod", args, [x, y] => {
        let (x, y) = (x.as_number()?, y.as_number()?);
        Value::Number(((x % y) + y) % y)
    })
}

// sequences

/// Elements of a list or vector; `nil` is empty.
fn items_of(coll: &Value) -> Result<Vec<Value>, RuntimeError> {
    match coll {
        Value::Nil => Ok(Vec::new()),
        Value::List(seq) | Value::Vector(seq) => Ok(seq.items().to_vec()),
        _ => runtime_error!(TypeMismatch, "Expected a sequence, got {:?}", coll),
    }
}

fn nth_of(coll: &Value, index: &Value) -> Result<Value, RuntimeError> {
    let seq = coll.as_seq()?;
    let len = seq.len() as i64;
    let i = index.as_number()?.trunc() as i64;
    let pos = if i < 0 { len + i } else { i };
    if pos < 0 || pos >= len {
        runtime_error!(IndexOutOfRange, "nth: index {} out of range for length {}", i, len)
    }
    Ok(seq.items()[pos as usize].clone())
}

/// (nth coll i), negative `i` counts from the end
fn nth(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("nth", args, [coll, index] => nth_of(coll, index)?)
}

fn first(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("first", args, [coll] => items_of(coll)?.into_iter().next().unwrap_or(Value::Nil))
}

fn rest(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("rest", args, [coll] => Value::vector(items_of(coll)?.into_iter().skip(1).collect()))
}

fn last(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("last", args, [coll] => items_of(coll)?.pop().unwrap_or(Value::Nil))
}

fn butlast(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("butlast", args, [coll] => {
        let mut items = items_of(coll)?;
        items.pop();
        Value::vector(items)
    })
}

fn count(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("count", args, [coll] => Value::Number(match coll {
        Value::Nil => 0.0,
        Value::List(seq) | Value::Vector(seq) => seq.len() as f64,
        Value::Map(map) => map.len() as f64,
        Value::String(s) => s.chars().count() as f64,
        _ => runtime_error!(TypeMismatch, "count: expected a collection, got {:?}", coll),
    }))
}

fn slice_bounds(len: usize, start: f64, end: Option<f64>) -> (usize, usize) {
    let clamp = |i: f64| -> usize {
        let i = i.trunc() as i64;
        let i = if i < 0 { len as i64 + i } else { i };
        i.clamp(0, len as i64) as usize
    };
    let start = clamp(start);
    let end = end.map_or(len, clamp);
    (start, end.max(start))
}

/// (slice coll start end?)
fn slice(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let (coll, start, end) = match_args!("slice", args, {
        [coll, start] => (items_of(coll)?, start.as_number()?, None),
        [coll, start, end] => (items_of(coll)?, start.as_number()?, Some(end.as_number()?)),
    })?;
    let (from, to) = slice_bounds(coll.len(), start, end);
    Ok(Value::vector(coll[from..to].to_vec()))
}

fn cons(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("cons", args, [x, coll] => {
        let mut items = vec![x.clone()];
        items.extend(items_of(coll)?);
        Value::list(items)
    })
}

/// Lists grow at the front, vectors at the back.
fn conj(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let (coll, xs) = match args.split_first() {
        Some((coll, xs)) => (coll, xs),
        None => runtime_error!(Bind, "Wrong number of arguments to conj: 0"),
    };
    match coll {
        Value::List(seq) => {
            let mut items: Vec<Value> = xs.iter().rev().cloned().collect();
            items.extend(seq.items().iter().cloned());
            Ok(Value::list(items))
        }
        Value::Vector(seq) => {
            let mut items = seq.items().to_vec();
            items.extend(xs.iter().cloned());
            Ok(Value::vector(items))
        }
        _ => runtime_error!(TypeMismatch, "conj: expected a list or vector, got {:?}", coll),
    }
}

fn concat(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let mut items = Vec::new();
    for coll in &args {
        items.extend(items_of(coll)?);
    }
    Ok(Value::vector(items))
}

fn reverse(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("reverse", args, [coll] => Value::vector(items_of(coll)?.into_iter().rev().collect()))
}

fn range_of(start: f64, end: f64, step: f64) -> Vec<Value> {
    // a zero step would never terminate, a wrong-signed one never starts
    let step = if step == 0.0 { 1.0 } else { step.abs() };
    let mut out = Vec::new();
    if start <= end {
        let mut x = start;
        while x < end {
            out.push(Value::Number(x));
            x += step;
        }
    } else {
        let mut x = start;
        while x > end {
            out.push(Value::Number(x));
            x -= step;
        }
    }
    out
}

/// (range end), (range start end), (range start end step)
fn range(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let (start, end, step) = match_args!("range", args, {
        [end] => (0.0, end.as_number()?, 1.0),
        [start, end] => (start.as_number()?, end.as_number()?, 1.0),
        [start, end, step] => (start.as_number()?, end.as_number()?, step.as_number()?),
    })?;
    Ok(Value::vector(range_of(start, end, step)))
}

fn map(ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("map", args, [f, coll] => {
        let out = items_of(coll)?
            .into_iter()
            .map(|x| ctx.apply(f, vec![x]))
            .collect::<Result<Vec<Value>, RuntimeError>>()?;
        Value::vector(out)
    })
}

fn map_indexed(ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("map-indexed", args, [f, coll] => {
        let out = items_of(coll)?
            .into_iter()
            .enumerate()
            .map(|(i, x)| ctx.apply(f, vec![Value::Number(i as f64), x]))
            .collect::<Result<Vec<Value>, RuntimeError>>()?;
        Value::vector(out)
    })
}

fn keep(ctx: &CallContext<'_>, f: &Value, coll: &Value, wanted: bool) -> Result<Value, RuntimeError> {
    let mut out = Vec::new();
    for x in items_of(coll)? {
        if ctx.apply(f, vec![x.clone()])?.is_truthy() == wanted {
            out.push(x);
        }
    }
    Ok(Value::vector(out))
}

fn filter(ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("filter", args, [f, coll] => keep(ctx, f, coll, true)?)
}

fn remove(ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("remove", args, [f, coll] => keep(ctx, f, coll, false)?)
}

/// (apply f x y [more])
fn apply(ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match args.as_slice() {
        [f, middle @ .., coll] => {
            let mut call_args = middle.to_vec();
            call_args.extend(items_of(coll)?);
            ctx.apply(f, call_args)
        }
        _ => runtime_error!(Bind, "Wrong number of arguments to apply: {}", args.len()),
    }
}

fn index_of(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("index-of", args, [coll, x] => {
        let found = items_of(coll)?.iter().position(|item| item == x);
        Value::Number(found.map_or(-1.0, |i| i as f64))
    })
}

fn last_index_of(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("last-index-of", args, [coll, x] => {
        let found = items_of(coll)?.iter().rposition(|item| item == x);
        Value::Number(found.map_or(-1.0, |i| i as f64))
    })
}

/// (seq x): sequences copy to a vector of the same items, strings split
/// into one-character strings, maps become `[key value]` pairs, anything
/// else is `nil`.
fn to_seq(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("seq", args, [x] => match x {
        Value::List(seq) | Value::Vector(seq) => Value::vector(seq.items().to_vec()),
        Value::String(s) => Value::vector(s.chars().map(|c| Value::string(c.to_string())).collect()),
        Value::Map(map) => Value::vector(map.entries().iter().map(|(k, v)| Value::vector(vec![k.clone(), v.clone()])).collect()),
        _ => Value::Nil,
    })
}

fn lst(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("lst", args, [coll] => Value::list(items_of(coll)?))
}

/// Numbers sort numerically, strings and keywords by text.
fn sort(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let mut items = match_args!("sort", args, [coll] => items_of(coll)?)?;
    if items.iter().all(|x| matches!(x, Value::Number(_))) {
        items.sort_by(|a, b| match (a, b) {
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            _ => std::cmp::Ordering::Equal,
        });
    } else if items.iter().all(|x| matches!(x, Value::String(_) | Value::Keyword(_))) {
        items.sort_by(|a, b| a.as_name().cmp(&b.as_name()));
    } else {
        runtime_error!(Unsupported, "sort: cannot order mixed or non-comparable items")
    }
    Ok(Value::vector(items))
}

/// (partition n coll), the last group may be short
fn partition(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let (n, items) = match_args!("partition", args, [n, coll] => (n.as_number()?, items_of(coll)?))?;
    if n < 1.0 {
        runtime_error!(TypeMismatch, "partition: group size must be at least 1, got {}", n)
    }
    let groups = items.chunks(n as usize).map(|group| Value::vector(group.to_vec())).collect();
    Ok(Value::vector(groups))
}

/// (repeat x n)
fn repeat(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("repeat", args, [x, n] => {
        let times = n.as_number()?.max(0.0) as usize;
        Value::vector((0..times).map(|_| x.deep_clone()).collect())
    })
}

// metadata, carried by functions only

fn meta(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("meta", args, [x] => match x {
        Value::Function(f) => f.meta(),
        _ => Value::Nil,
    })
}

fn with_meta(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("with-meta", args, [x, m] => match x {
        Value::Function(f) => Value::Function(std::rc::Rc::new(f.with_meta(m.clone()))),
        _ => runtime_error!(TypeMismatch, "with-meta: expected a function, got {:?}", x),
    })
}

// maps

/// (get m key not-found?), a non-map yields `not-found`
fn get(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let (m, key, missing) = match_args!("get", args, {
        [m, key] => (m, key, Value::Nil),
        [m, key, missing] => (m, key, missing.clone()),
    })?;
    Ok(match m {
        Value::Map(map) => map.get(key).cloned().unwrap_or(missing),
        _ => missing,
    })
}

fn assoc(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let (m, kvs) = match args.split_first() {
        Some((m, kvs)) if kvs.len() % 2 == 0 => (m, kvs),
        _ => runtime_error!(Bind, "assoc expects a map and key/value pairs"),
    };
    let pairs = kvs.chunks(2).map(|kv| (kv[0].clone(), kv[1].clone())).collect();
    let updated = match m {
        Value::Nil => Map::new(pairs)?,
        _ => m.as_map()?.assoc(pairs)?,
    };
    Ok(Value::Map(std::rc::Rc::new(updated)))
}

fn dissoc(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match args.split_first() {
        Some((m, keys)) => Ok(Value::Map(std::rc::Rc::new(m.as_map()?.dissoc(keys)))),
        None => runtime_error!(Bind, "Wrong number of arguments to dissoc: 0"),
    }
}

fn keys(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("keys", args, [m] => Value::vector(m.as_map()?.entries().iter().map(|(k, _)| k.clone()).collect()))
}

fn vals(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("vals", args, [m] => Value::vector(m.as_map()?.entries().iter().map(|(_, v)| v.clone()).collect()))
}

fn entries(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("entries", args, [m] => Value::vector(
        m.as_map()?.entries().iter().map(|(k, v)| Value::vector(vec![k.clone(), v.clone()])).collect()
    ))
}

fn contains(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("contains?", args, [m, key] => Value::Boolean(m.as_map()?.get(key).is_some()))
}

/// Later maps win; `nil` arguments are skipped.
fn merge(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let mut pairs = Vec::new();
    for m in args.iter().filter(|m| !m.is_nil()) {
        pairs.extend(m.as_map()?.entries().iter().cloned());
    }
    Ok(Value::Map(std::rc::Rc::new(Map::new(pairs)?)))
}

// strings

fn str_(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::string(args.iter().map(print_plain).collect::<String>()))
}

fn pr_str(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::string(args.iter().map(print).collect::<Vec<String>>().join(" ")))
}

/// (subs s start end?) on characters
fn subs(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let (s, start, end) = match_args!("subs", args, {
        [s, start] => (s.as_str()?, start.as_number()?, None),
        [s, start, end] => (s.as_str()?, start.as_number()?, Some(end.as_number()?)),
    })?;
    let chars: Vec<char> = s.chars().collect();
    let (from, to) = slice_bounds(chars.len(), start, end);
    Ok(Value::string(chars[from..to].iter().collect::<String>()))
}

fn join(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let (separator, coll) = match_args!("join", args, {
        [coll] => (String::new(), coll),
        [separator, coll] => (print_plain(separator), coll),
    })?;
    let parts: Vec<String> = items_of(coll)?.iter().map(print_plain).collect();
    Ok(Value::string(parts.join(&separator)))
}

fn println(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    println!("{}", args.iter().map(print_plain).collect::<Vec<String>>().join(" "));
    Ok(Value::Nil)
}

fn prn(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    println!("{}", args.iter().map(print).collect::<Vec<String>>().join(" "));
    Ok(Value::Nil)
}

// atoms

fn deref(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("deref", args, [a] => a.as_atom()?.borrow().clone())
}

fn reset(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("reset!", args, [a, value] => {
        *a.as_atom()?.borrow_mut() = value.clone();
        value.clone()
    })
}

/// (swap! atom f args...) sets the atom to (f old args...)
fn swap(ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let (a, f, extra) = match args.as_slice() {
        [a, f, extra @ ..] => (a, f, extra),
        _ => runtime_error!(Bind, "Wrong number of arguments to swap!: {}", args.len()),
    };
    let cell = a.as_atom()?;
    let old = cell.borrow().clone();
    let mut call_args = vec![old];
    call_args.extend(extra.iter().cloned());
    let new = ctx.apply(f, call_args)?;
    *cell.borrow_mut() = new.clone();
    Ok(new)
}

// misc

fn throw(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match args.as_slice() {
        [x] => runtime_error!(Thrown, "{}", print_plain(x)),
        _ => runtime_error!(Bind, "Wrong number of arguments to throw: {}", args.len()),
    }
}

fn read_string(ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("read-string", args, [s] => read_form(s.as_str()?, ctx.keywords())
        .map_err(|e| RuntimeError::new(ErrorKind::Unsupported, e.to_string()).within("read-string"))?)
}

// native macros: they receive forms and return a form

/// (when test body...) => (if test (do body...))
fn when(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match args.split_first() {
        Some((test, body)) => {
            let mut block = vec![Value::symbol("do")];
            block.extend(body.iter().cloned());
            Ok(Value::list(vec![Value::symbol("if"), test.clone(), Value::list(block)]))
        }
        None => runtime_error!(Bind, "Wrong number of arguments to when: 0"),
    }
}

/// (cond t1 e1 t2 e2 ...) => (if t1 e1 (if t2 e2 nil))
fn cond(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    if args.len() % 2 != 0 {
        runtime_error!(Bind, "cond expects test/expression pairs, got {} forms", args.len())
    }
    Ok(args
        .chunks(2)
        .rev()
        .fold(Value::Nil, |otherwise, pair| Value::list(vec![Value::symbol("if"), pair[0].clone(), pair[1].clone(), otherwise])))
}

/// (-> x (f a) g) => (g (f x a))
fn thread_first(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let (x, forms) = match args.split_first() {
        Some((x, forms)) => (x.clone(), forms),
        None => runtime_error!(Bind, "Wrong number of arguments to ->: 0"),
    };
    Ok(forms.iter().fold(x, |acc, form| match form {
        Value::List(seq) if !seq.is_empty() => {
            let mut items = vec![seq.items()[0].clone(), acc];
            items.extend(seq.items()[1..].iter().cloned());
            Value::list(items)
        }
        _ => Value::list(vec![form.clone(), acc]),
    }))
}

pub const EXPORTS: &[(&str, NativeFn)] = &[
    ("type", type_of),
    ("nil?", is_nil),
    ("true?", is_true),
    ("false?", is_false),
    ("boolean?", is_boolean),
    ("number?", is_number),
    ("string?", is_string),
    ("keyword?", is_keyword),
    ("symbol?", is_symbol),
    ("fn?", is_fn),
    ("macro?", is_macro),
    ("list?", is_list),
    ("vector?", is_vector),
    ("map?", is_map),
    ("sequential?", is_sequential),
    ("atom?", is_atom),
    ("empty?", is_empty),
    ("keyword", keyword),
    ("symbol", symbol),
    ("list", list),
    ("vector", vector),
    ("vec", vec),
    ("hash-map", hash_map),
    ("atom", atom),
    ("=", equal),
    ("!=", not_equal),
    ("<", less),
    ("<=", less_equal),
    (">", greater),
    (">=", greater_equal),
    ("+", add),
    ("-", sub),
    ("*", mul),
    ("/", div),
    ("mod", modulo),
    ("nth", nth),
    ("first", first),
    ("rest", rest),
    ("last", last),
    ("butlast", butlast),
    ("count", count),
    ("slice", slice),
    ("cons", cons),
    ("conj", conj),
    ("concat", concat),
    ("reverse", reverse),
    ("range", range),
    ("map", map),
    ("map-indexed", map_indexed),
    ("filter", filter),
    ("remove", remove),
    ("apply", apply),
    ("index-of", index_of),
    ("last-index-of", last_index_of),
    ("seq", to_seq),
    ("lst", lst),
    ("sort", sort),
    ("partition", partition),
    ("repeat", repeat),
    ("meta", meta),
    ("with-meta", with_meta),
    ("get", get),
    ("assoc", assoc),
    ("dissoc", dissoc),
    ("keys", keys),
    ("vals", vals),
    ("entries", entries),
    ("contains?", contains),
    ("merge", merge),
    ("str", str_),
    ("pr-str", pr_str),
    ("subs", subs),
    ("join", join),
    ("println", println),
    ("prn", prn),
    ("deref", deref),
    ("reset!", reset),
    ("swap!", swap),
    ("throw", throw),
    ("read-string", read_string),
];

pub const MACROS: &[(&str, NativeFn)] = &[("when", when), ("cond", cond), ("->", thread_first)];
