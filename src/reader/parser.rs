use std::rc::Rc;

use crate::interpreter::cps::printer::print;
use crate::interpreter::cps::{Keywords, Map, Notation, Seq, Value};
use crate::reader::lexer::{Spanned, Token};
use crate::reader::ReadError;

/// Top-level forms with the source text around and between them, and the
/// spelling of any string or number form that would print differently.
pub struct Parsed {
    pub forms: Vec<Value>,
    pub delimiters: Vec<String>,
    pub literals: Vec<Option<String>>,
}

/// Parse all top-level forms.
pub fn parse(src: &str, tokens: &[Spanned], keywords: &Keywords) -> Result<Parsed, ReadError> {
    let mut parser = Parser {
        src,
        tokens,
        pos: 0,
        keywords,
    };
    let mut forms = Vec::new();
    let mut delimiters = Vec::new();
    let mut literals = Vec::new();
    let mut prev = 0;
    while parser.pos < tokens.len() {
        let (form, start, end) = parser.form()?;
        delimiters.push(src[prev..start].to_string());
        literals.push(spelling(&form, &src[start..end]));
        forms.push(form);
        prev = end;
    }
    delimiters.push(src[prev..].to_string());
    Ok(Parsed {
        forms,
        delimiters,
        literals,
    })
}

// Source text of a string or number atom, kept only when printing the value
// would not reproduce it.
fn spelling(value: &Value, text: &str) -> Option<String> {
    match value {
        Value::String(_) | Value::Number(_) if print(value) != text => Some(text.to_string()),
        _ => None,
    }
}

struct Parser<'a> {
    src: &'a str,
    tokens: &'a [Spanned],
    pos: usize,
    keywords: &'a Keywords,
}

fn looks_numeric(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('-' | '+') => match chars.next() {
            Some(c) if c.is_ascii_digit() => true,
            Some('.') => chars.next().map_or(false, |c| c.is_ascii_digit()),
            _ => false,
        },
        Some('.') => chars.next().map_or(false, |c| c.is_ascii_digit()),
        _ => false,
    }
}

impl<'a> Parser<'a> {
    /// One form with its byte range.
    fn form(&mut self) -> Result<(Value, usize, usize), ReadError> {
        let tokens = self.tokens;
        let spanned = match tokens.get(self.pos) {
            Some(spanned) => spanned,
            None => return Err(ReadError::new("Unexpected end of input", self.src.len())),
        };
        self.pos += 1;

        match &spanned.token {
            Token::Open(open) => self.collection(*open, spanned.start, spanned.end),
            Token::Close(close) => Err(ReadError::new(format!("Unexpected '{}'", close), spanned.start)),
            Token::Sugar(notation) => {
                let (form, start, end) = self.form()?;
                let head = notation.head().unwrap_or("quote");
                let delimiters = vec![String::new(), self.src[spanned.end..start].to_string(), String::new()];
                let literals = vec![None, spelling(&form, &self.src[start..end])];
                let seq = Seq::from_source(vec![Value::symbol(head), form], *notation, delimiters);
                seq.cache().set_literals(literals);
                Ok((Value::List(Rc::new(seq)), spanned.start, end))
            }
            Token::Str(text) => Ok((Value::string(text), spanned.start, spanned.end)),
            Token::Atom(text) => Ok((self.atom(text, spanned.start)?, spanned.start, spanned.end)),
        }
    }

    fn collection(&mut self, open: char, start: usize, open_end: usize) -> Result<(Value, usize, usize), ReadError> {
        let close = match open {
            '(' => ')',
            '[' => ']',
            _ => '}',
        };
        let tokens = self.tokens;
        let mut items = Vec::new();
        let mut delimiters = Vec::new();
        let mut literals = Vec::new();
        let mut prev = open_end;

        loop {
            match tokens.get(self.pos) {
                None => return Err(ReadError::new(format!("Expected '{}' before end of input", close), start)),
                Some(Spanned { token: Token::Close(c), start: close_start, end: close_end }) => {
                    if *c != close {
                        return Err(ReadError::new(format!("Expected '{}' but found '{}'", close, c), *close_start));
                    }
                    self.pos += 1;
                    delimiters.push(self.src[prev..*close_start].to_string());
                    let value = match open {
                        '(' | '[' => {
                            let seq = Seq::from_source(items, Notation::Plain, delimiters);
                            seq.cache().set_literals(literals);
                            match open {
                                '(' => Value::List(Rc::new(seq)),
                                _ => Value::Vector(Rc::new(seq)),
                            }
                        }
                        _ => self.map(items, delimiters, literals, start)?,
                    };
                    return Ok((value, start, *close_end));
                }
                Some(_) => {
                    let (form, form_start, form_end) = self.form()?;
                    delimiters.push(self.src[prev..form_start].to_string());
                    literals.push(spelling(&form, &self.src[form_start..form_end]));
                    items.push(form);
                    prev = form_end;
                }
            }
        }
    }

    fn map(&self, items: Vec<Value>, delimiters: Vec<String>, literals: Vec<Option<String>>, start: usize) -> Result<Value, ReadError> {
        if items.len() % 2 != 0 {
            return Err(ReadError::new("Map literal must contain key/value pairs", start));
        }
        let mut entries = Vec::with_capacity(items.len() / 2);
        let mut iter = items.into_iter();
        while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
            entries.push((key, value));
        }
        match Map::from_source(entries, delimiters) {
            Ok(map) => {
                map.cache().set_literals(literals);
                Ok(Value::Map(Rc::new(map)))
            }
            Err(e) => Err(ReadError::new(e.message, start)),
        }
    }

    fn atom(&self, text: &str, start: usize) -> Result<Value, ReadError> {
        match text {
            "nil" => Ok(Value::Nil),
            "true" => Ok(Value::Boolean(true)),
            "false" => Ok(Value::Boolean(false)),
            _ if text.starts_with(':') => match &text[1..] {
                "" => Err(ReadError::new("Empty keyword", start)),
                name => Ok(Value::Keyword(self.keywords.intern(name))),
            },
            _ if looks_numeric(text) => match text.parse::<f64>() {
                Ok(n) => Ok(Value::Number(n)),
                Err(_) => Err(ReadError::new(format!("Invalid number: {}", text), start)),
            },
            _ => Ok(Value::symbol(text)),
        }
    }
}
