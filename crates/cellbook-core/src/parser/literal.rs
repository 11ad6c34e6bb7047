//! Recursive-descent parsing of literal values and argument lists.
//!
//! A single cursor walks the input. Strings, arrays and objects nest; any
//! other run of characters up to the next `,` `)` `]` `}` is an atom, which is
//! classified as a boolean, null, number, bound variable, or bare string.

use crate::value::{Context, Object, Value};

/// Parse a comma-separated argument list.
///
/// Commas nested inside strings, arrays or objects do not split arguments.
pub fn parse_args(text: &str, context: &Context) -> Vec<Value> {
    ValueParser::new(text, context)
        .items()
        .into_iter()
        .map(Item::into_value)
        .collect()
}

/// Parse a single value. Anything after the first top-level comma is ignored.
///
/// Empty input parses as `Null`.
pub fn parse_value(text: &str, context: &Context) -> Value {
    parse_args(text, context).into_iter().next().unwrap_or_default()
}

/// Parsed top-level item.
///
/// Keeps track of atoms that looked like variable names but were not bound,
/// so callers that need stricter handling can tell them apart from quoted
/// strings.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Item {
    Value(Value),
    Unbound(String),
}

impl Item {
    pub(crate) fn into_value(self) -> Value {
        match self {
            Item::Value(value) => value,
            Item::Unbound(name) => Value::String(name),
        }
    }
}

/// Parse an argument list, keeping unbound identifiers distinguishable.
pub(crate) fn parse_items(text: &str, context: &Context) -> Vec<Item> {
    ValueParser::new(text, context).items()
}

pub(crate) fn is_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => chars.all(is_word_char),
        _ => false,
    }
}

pub(crate) fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// `-?digits(.digits)?`
fn is_number(token: &str) -> bool {
    let digits = token.strip_prefix('-').unwrap_or(token);
    let (int, frac) = match digits.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (digits, None),
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    all_digits(int) && frac.is_none_or(all_digits)
}

fn is_atom_end(c: char) -> bool {
    matches!(c, ',' | ')' | ']' | '}')
}

struct ValueParser<'a> {
    chars: Vec<char>,
    pos: usize,
    context: &'a Context,
}

impl<'a> ValueParser<'a> {
    fn new(text: &str, context: &'a Context) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            context,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    /// Step over closing delimiters that do not belong to the enclosing
    /// literal, so the cursor always makes progress.
    fn skip_stray_closers(&mut self, stray: &[char]) {
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(c) if stray.contains(&c) => self.pos += 1,
                _ => break,
            }
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn items(mut self) -> Vec<Item> {
        let mut items = Vec::new();
        self.skip_whitespace();
        if self.at_end() {
            return items;
        }

        while !self.at_end() {
            self.skip_stray_closers(&[')', ']', '}']);
            if self.at_end() {
                break;
            }
            let start = self.pos;
            items.push(self.item());
            self.skip_whitespace();
            if !self.eat(',') && self.pos == start {
                // Always advance.
                self.pos += 1;
            }
        }
        items
    }

    fn item(&mut self) -> Item {
        self.skip_whitespace();
        match self.peek() {
            Some('"' | '\'') => Item::Value(Value::String(self.string())),
            Some('[') => Item::Value(self.array()),
            Some('{') => Item::Value(self.object()),
            _ => self.atom(),
        }
    }

    fn value(&mut self) -> Value {
        self.item().into_value()
    }

    fn string(&mut self) -> String {
        let Some(quote) = self.peek() else {
            return String::new();
        };
        self.pos += 1;

        let mut out = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            if c == quote {
                break;
            }
            if c == '\\' {
                if let Some(escaped) = self.peek() {
                    self.pos += 1;
                    out.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        other => other,
                    });
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    fn array(&mut self) -> Value {
        self.pos += 1; // [
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => break,
                Some(']') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => {}
            }
            self.skip_stray_closers(&[')', '}']);
            if self.peek().is_none_or(|c| c == ']') {
                continue;
            }
            let start = self.pos;
            items.push(self.value());
            self.skip_whitespace();
            if !self.eat(',') && self.pos == start {
                self.pos += 1;
            }
        }
        Value::Array(items)
    }

    fn object(&mut self) -> Value {
        self.pos += 1; // {
        let mut map = Object::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => break,
                Some('}') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => {}
            }
            self.skip_stray_closers(&[')', ']']);
            if self.peek().is_none_or(|c| c == '}') {
                continue;
            }
            let start = self.pos;
            let key = match self.peek() {
                Some('"' | '\'') => self.string(),
                _ => {
                    let begin = self.pos;
                    while self.peek().is_some_and(is_word_char) {
                        self.pos += 1;
                    }
                    self.chars[begin..self.pos].iter().collect()
                }
            };
            self.skip_whitespace();
            self.eat(':');
            let value = self.value();
            map.insert(key, value);
            self.skip_whitespace();
            if !self.eat(',') && self.pos == start {
                self.pos += 1;
            }
        }
        Value::Object(map)
    }

    fn atom(&mut self) -> Item {
        let begin = self.pos;
        while self.peek().is_some_and(|c| !is_atom_end(c)) {
            self.pos += 1;
        }
        let raw: String = self.chars[begin..self.pos].iter().collect();
        let token = raw.trim();

        match token {
            "true" => Item::Value(Value::Bool(true)),
            "false" => Item::Value(Value::Bool(false)),
            "null" => Item::Value(Value::Null),
            _ if is_number(token) => match token.parse::<f64>() {
                Ok(n) => Item::Value(Value::Number(n)),
                Err(_) => Item::Value(Value::String(token.to_string())),
            },
            _ if is_identifier(token) => match self.context.get(token) {
                Some(value) => Item::Value(value.clone()),
                None => Item::Unbound(token.to_string()),
            },
            _ => Item::Value(Value::String(token.to_string())),
        }
    }
}
