use crate::interpreter::cps::Notation;
use crate::reader::ReadError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Open(char),
    Close(char),
    Sugar(Notation),
    Str(String),
    Atom(String),
}

/// A token and its byte range in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub start: usize,
    pub end: usize,
}

fn ends_atom(c: char) -> bool { c.is_whitespace() || "()[]{}\",;".contains(c) }

/// Split `src` into tokens. Whitespace, commas and `;` comments are skipped;
/// the parser recovers them from the gaps between spans.
pub fn tokenize(src: &str) -> Result<Vec<Spanned>, ReadError> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        let token = match c {
            c if c.is_whitespace() || c == ',' => {
                chars.next();
                continue;
            }
            ';' => {
                while let Some(&(_, c)) = chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    chars.next();
                }
                continue;
            }
            '(' | '[' | '{' => {
                chars.next();
                Token::Open(c)
            }
            ')' | ']' | '}' => {
                chars.next();
                Token::Close(c)
            }
            '\'' => {
                chars.next();
                Token::Sugar(Notation::Quote)
            }
            '`' => {
                chars.next();
                Token::Sugar(Notation::Quasiquote)
            }
            '@' => {
                chars.next();
                Token::Sugar(Notation::Deref)
            }
            '~' => {
                chars.next();
                match chars.peek() {
                    Some(&(_, '@')) => {
                        chars.next();
                        Token::Sugar(Notation::SpliceUnquote)
                    }
                    _ => Token::Sugar(Notation::Unquote),
                }
            }
            '"' => {
                chars.next();
                let mut text = String::new();
                let mut closed = false;
                while let Some((_, c)) = chars.next() {
                    match c {
                        '"' => {
                            closed = true;
                            break;
                        }
                        '\\' => match chars.next() {
                            Some((_, 'n')) => text.push('\n'),
                            Some((_, 't')) => text.push('\t'),
                            Some((_, other)) => text.push(other),
                            None => break,
                        },
                        other => text.push(other),
                    }
                }
                if !closed {
                    return Err(ReadError::new("Unterminated string", start));
                }
                Token::Str(text)
            }
            _ => {
                let mut text = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if ends_atom(c) {
                        break;
                    }
                    text.push(c);
                    chars.next();
                }
                Token::Atom(text)
            }
        };
        let end = chars.peek().map_or(src.len(), |&(i, _)| i);
        tokens.push(Spanned { token, start, end });
    }
    Ok(tokens)
}
