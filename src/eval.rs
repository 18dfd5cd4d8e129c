//! Expression evaluation and property access seams
//!
//! The node tree never assumes a concrete expression grammar: test
//! expressions go through the `ExpressionEvaluator` capability and
//! argument-object reads go through `PropertyAccess`. `SimpleEvaluator`
//! is the engine shipped with the crate, a single-pass recursive-descent
//! evaluator over the current bindings; any other engine satisfying the
//! traits can replace it.

use crate::error::{Error, Result};
use crate::types::Value;

/// Name resolution against the per-call evaluation state: additional
/// bindings first, then the argument object.
pub trait Bindings {
    /// Resolve a property path to a value, or None if nothing matches.
    fn resolve(&self, path: &str) -> Option<Value>;
}

/// Path-addressable reads on an argument object
pub trait PropertyAccess {
    fn has_property(&self, object: &Value, path: &str) -> bool;
    fn get_property(&self, object: &Value, path: &str) -> Option<Value>;
}

/// Boolean-producing, bindings-aware expression engine
pub trait ExpressionEvaluator {
    /// Evaluate a test expression to a truth value
    fn evaluate_bool(&self, expression: &str, bindings: &dyn Bindings) -> Result<bool>;

    /// Evaluate an expression to a value (used by foreach and bind)
    fn evaluate_value(&self, expression: &str, bindings: &dyn Bindings) -> Result<Value>;
}

/// One step of a parsed property path
#[derive(Debug, Clone, PartialEq)]
enum PathSegment {
    Name(String),
    Index(usize),
}

/// Parse a property path of dot-separated names with optional `[n]`
/// indexing, e.g. `order.lines[2].sku`. Returns None on malformed paths.
fn parse_path(path: &str) -> Option<Vec<PathSegment>> {
    let mut segments = Vec::new();
    let mut chars = path.chars().peekable();
    loop {
        match chars.peek() {
            Some('[') => {
                chars.next();
                let mut digits = String::new();
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                    digits.push(c);
                }
                segments.push(PathSegment::Index(digits.parse().ok()?));
            }
            Some('.') => {
                chars.next();
                if segments.is_empty() {
                    return None;
                }
            }
            Some(_) => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if c == '.' || c == '[' {
                        break;
                    }
                    name.push(c);
                    chars.next();
                }
                if name.is_empty() {
                    return None;
                }
                segments.push(PathSegment::Name(name));
            }
            None => break,
        }
    }
    if segments.is_empty() {
        None
    } else {
        Some(segments)
    }
}

/// Default property accessor over `Value` trees: map keys by name, list
/// elements by index.
pub struct ValueAccess;

impl ValueAccess {
    fn walk(object: &Value, segments: &[PathSegment]) -> Option<Value> {
        let mut current = object;
        for segment in segments {
            current = match (current, segment) {
                (Value::Map(entries), PathSegment::Name(name)) => entries.get(name)?,
                (Value::List(items), PathSegment::Index(i)) => items.get(*i)?,
                _ => return None,
            };
        }
        Some(current.clone())
    }
}

impl PropertyAccess for ValueAccess {
    fn has_property(&self, object: &Value, path: &str) -> bool {
        self.get_property(object, path).is_some()
    }

    fn get_property(&self, object: &Value, path: &str) -> Option<Value> {
        let segments = parse_path(path)?;
        Self::walk(object, &segments)
    }
}

/// The expression engine shipped with the crate. Supports literals
/// (numbers, quoted strings, `null`, `true`, `false`), property paths,
/// the comparison operators, `and`/`or`/`not` (word or symbolic form),
/// parentheses, and a `size()`/`length()` pseudo-method on collections
/// and strings. Missing properties evaluate to null, matching the
/// truthiness rule rather than failing the call.
pub struct SimpleEvaluator;

impl ExpressionEvaluator for SimpleEvaluator {
    fn evaluate_bool(&self, expression: &str, bindings: &dyn Bindings) -> Result<bool> {
        Ok(self.evaluate_value(expression, bindings)?.truthy())
    }

    fn evaluate_value(&self, expression: &str, bindings: &dyn Bindings) -> Result<Value> {
        let tokens = lex(expression)?;
        let mut parser = ExprParser {
            tokens,
            position: 0,
            bindings,
        };
        let value = parser.parse_or()?;
        if parser.position != parser.tokens.len() {
            return Err(expr_error(format!(
                "trailing input in expression '{}'",
                expression
            )));
        }
        Ok(value)
    }
}

fn expr_error(message: impl Into<String>) -> Error {
    // The statement id is attached by the caller, which knows it.
    Error::Expression {
        statement: String::new(),
        message: message.into(),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Path(String),
    Number(String),
    Str(String),
    Null,
    True,
    False,
    And,
    Or,
    Not,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    OpenParen,
    CloseParen,
}

fn lex(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\r' | '\n' => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::OpenParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::CloseParen);
            }
            '\'' | '"' => {
                let quote = c;
                chars.next();
                let mut body = String::new();
                let mut closed = false;
                for ch in chars.by_ref() {
                    if ch == quote {
                        closed = true;
                        break;
                    }
                    body.push(ch);
                }
                if !closed {
                    return Err(expr_error(format!("unterminated string in '{}'", input)));
                }
                tokens.push(Token::Str(body));
            }
            '=' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                }
                tokens.push(Token::Eq);
            }
            '!' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::NotEq);
                } else {
                    tokens.push(Token::Not);
                }
            }
            '<' => {
                chars.next();
                match chars.peek() {
                    Some('=') => {
                        chars.next();
                        tokens.push(Token::LtEq);
                    }
                    Some('>') => {
                        chars.next();
                        tokens.push(Token::NotEq);
                    }
                    _ => tokens.push(Token::Lt),
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::GtEq);
                } else {
                    tokens.push(Token::Gt);
                }
            }
            '&' => {
                chars.next();
                if chars.next() != Some('&') {
                    return Err(expr_error(format!("stray '&' in '{}'", input)));
                }
                tokens.push(Token::And);
            }
            '|' => {
                chars.next();
                if chars.next() != Some('|') {
                    return Err(expr_error(format!("stray '|' in '{}'", input)));
                }
                tokens.push(Token::Or);
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut number = String::new();
                number.push(c);
                chars.next();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        number.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Number(number));
            }
            c if c.is_alphanumeric() || c == '_' => {
                let mut word = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_alphanumeric() || d == '_' || d == '.' || d == '[' || d == ']' {
                        word.push(d);
                        chars.next();
                    } else if d == '(' {
                        // size() / length() pseudo-method call
                        word.push(d);
                        chars.next();
                        if chars.peek() == Some(&')') {
                            word.push(')');
                            chars.next();
                        } else {
                            return Err(expr_error(format!(
                                "unsupported method call in '{}'",
                                input
                            )));
                        }
                    } else {
                        break;
                    }
                }
                tokens.push(match word.as_str() {
                    "null" => Token::Null,
                    "true" => Token::True,
                    "false" => Token::False,
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    _ => Token::Path(word),
                });
            }
            other => {
                return Err(expr_error(format!(
                    "unexpected character '{}' in '{}'",
                    other, input
                )));
            }
        }
    }
    Ok(tokens)
}

struct ExprParser<'a> {
    tokens: Vec<Token>,
    position: usize,
    bindings: &'a dyn Bindings,
}

impl ExprParser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next_is(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<Value> {
        let mut left = self.parse_and()?;
        while self.next_is(&Token::Or) {
            // Expressions are side-effect-free, so both sides evaluate.
            let right = self.parse_and()?;
            left = Value::Bool(left.truthy() || right.truthy());
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Value> {
        let mut left = self.parse_not()?;
        while self.next_is(&Token::And) {
            let right = self.parse_not()?;
            left = Value::Bool(left.truthy() && right.truthy());
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Value> {
        if self.next_is(&Token::Not) {
            let value = self.parse_not()?;
            Ok(Value::Bool(!value.truthy()))
        } else {
            self.parse_comparison()
        }
    }

    fn parse_comparison(&mut self) -> Result<Value> {
        let left = self.parse_primary()?;
        let op = match self.peek() {
            Some(Token::Eq) => Token::Eq,
            Some(Token::NotEq) => Token::NotEq,
            Some(Token::Lt) => Token::Lt,
            Some(Token::LtEq) => Token::LtEq,
            Some(Token::Gt) => Token::Gt,
            Some(Token::GtEq) => Token::GtEq,
            _ => return Ok(left),
        };
        self.position += 1;
        let right = self.parse_primary()?;
        let equal = match (&left, &right) {
            (Value::Null, Value::Null) => true,
            _ => left.compare(&right) == Some(std::cmp::Ordering::Equal),
        };
        let value = match op {
            Token::Eq => Value::Bool(equal),
            Token::NotEq => Value::Bool(!equal),
            ordered => {
                let ordering = left.compare(&right).ok_or_else(|| {
                    expr_error(format!("cannot compare {:?} with {:?}", left, right))
                })?;
                Value::Bool(match ordered {
                    Token::Lt => ordering.is_lt(),
                    Token::LtEq => ordering.is_le(),
                    Token::Gt => ordering.is_gt(),
                    Token::GtEq => ordering.is_ge(),
                    _ => unreachable!(),
                })
            }
        };
        Ok(value)
    }

    fn parse_primary(&mut self) -> Result<Value> {
        let token = self
            .peek()
            .cloned()
            .ok_or_else(|| expr_error("unexpected end of expression"))?;
        self.position += 1;
        match token {
            Token::OpenParen => {
                let value = self.parse_or()?;
                if !self.next_is(&Token::CloseParen) {
                    return Err(expr_error("expected ')'"));
                }
                Ok(value)
            }
            Token::Null => Ok(Value::Null),
            Token::True => Ok(Value::Bool(true)),
            Token::False => Ok(Value::Bool(false)),
            Token::Str(s) => Ok(Value::Str(s)),
            Token::Number(n) => {
                if n.contains('.') {
                    n.parse::<f64>()
                        .map(Value::F64)
                        .map_err(|_| expr_error(format!("bad number '{}'", n)))
                } else {
                    n.parse::<i64>()
                        .map(Value::I64)
                        .map_err(|_| expr_error(format!("bad number '{}'", n)))
                }
            }
            Token::Path(path) => Ok(self.resolve_path(&path)),
            other => Err(expr_error(format!("unexpected token {:?}", other))),
        }
    }

    /// Resolve a property path, applying a trailing size()/length()
    /// pseudo-method if present. Missing properties are null.
    fn resolve_path(&self, path: &str) -> Value {
        let (base, wants_len) = match path
            .strip_suffix(".size()")
            .or_else(|| path.strip_suffix(".length()"))
        {
            Some(stripped) => (stripped, true),
            None => (path, false),
        };
        let value = self.bindings.resolve(base).unwrap_or(Value::Null);
        if !wants_len {
            return value;
        }
        match value {
            Value::List(items) => Value::I64(items.len() as i64),
            Value::Map(entries) => Value::I64(entries.len() as i64),
            Value::Str(s) => Value::I64(s.chars().count() as i64),
            _ => Value::Null,
        }
    }
}
