//! Interpreter for compiled expressions.
//!
//! Evaluation walks the token stream a [`Compiled`] carries and dispatches
//! name lookups against the two caller-supplied tables. The grammar is the
//! small one the language needs: additive and multiplicative operators,
//! unary minus, parenthesised groups, call argument lists, string-keyed
//! subscripts, and the `true`/`false`/`null` literals.
//!
//! Everything the compiler let through leniently is judged here: unknown
//! names, bad operand types, and malformed syntax all raise [`EvalError`].

use super::compile::{Compiled, Token};
use super::error::EvalError;
use super::value::{Functions, Value, Variables};

/// Evaluates a compiled expression against the given tables.
///
/// # Example
///
/// ```
/// use trellis::expr::{Functions, Value, Variables, compile, evaluate};
///
/// let compiled = compile("$price * 2").unwrap();
/// let variables = Variables::new().with("price", 21);
/// let result = evaluate(&compiled, &Functions::new(), &variables).unwrap();
/// assert_eq!(result, Value::Num(42.0));
/// ```
pub fn evaluate(
    compiled: &Compiled,
    functions: &Functions,
    variables: &Variables,
) -> Result<Value, EvalError> {
    let mut parser = Parser {
        tokens: compiled.tokens(),
        pos: 0,
        functions,
        variables,
    };
    let value = parser.expression()?;
    match parser.peek() {
        None => Ok(value),
        Some(extra) => Err(EvalError::UnexpectedToken(extra.to_string())),
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    functions: &'a Functions,
    variables: &'a Variables,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, wanted: &Token) -> Result<(), EvalError> {
        match self.advance() {
            Some(token) if token == *wanted => Ok(()),
            Some(token) => Err(EvalError::UnexpectedToken(token.to_string())),
            None => Err(EvalError::UnexpectedEnd),
        }
    }

    /// `term (('+' | '-') term)*`
    fn expression(&mut self) -> Result<Value, EvalError> {
        let mut left = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    left = add(left, self.term()?)?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    left = numeric(left, self.term()?, "-", |a, b| Ok(a - b))?;
                }
                _ => return Ok(left),
            }
        }
    }

    /// `factor (('*' | '/') factor)*`
    fn term(&mut self) -> Result<Value, EvalError> {
        let mut left = self.factor()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    left = numeric(left, self.factor()?, "*", |a, b| Ok(a * b))?;
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    left = numeric(left, self.factor()?, "/", |a, b| {
                        if b == 0.0 {
                            Err(EvalError::DivisionByZero)
                        } else {
                            Ok(a / b)
                        }
                    })?;
                }
                _ => return Ok(left),
            }
        }
    }

    /// `'-' factor | postfix`
    fn factor(&mut self) -> Result<Value, EvalError> {
        if matches!(self.peek(), Some(Token::Minus)) {
            self.pos += 1;
            let value = self.factor()?;
            return match value {
                Value::Num(n) => Ok(Value::Num(-n)),
                other => Err(EvalError::Type(format!(
                    "cannot negate {}",
                    other.type_name()
                ))),
            };
        }
        self.postfix()
    }

    /// `primary ('[' expression ']')*`
    fn postfix(&mut self) -> Result<Value, EvalError> {
        let mut value = self.primary()?;
        while matches!(self.peek(), Some(Token::LBracket)) {
            self.pos += 1;
            let key = self.expression()?;
            self.expect(&Token::RBracket)?;
            value = index(value, key)?;
        }
        Ok(value)
    }

    fn primary(&mut self) -> Result<Value, EvalError> {
        match self.advance() {
            Some(Token::Num(n)) => Ok(Value::Num(n)),
            Some(Token::Str(s)) => Ok(Value::Str(s)),
            Some(Token::Var(name)) => self
                .variables
                .get(&name)
                .cloned()
                .ok_or(EvalError::UnknownVariable(name)),
            Some(Token::Call(name)) => {
                let args = self.arguments()?;
                let function = self
                    .functions
                    .get(&name)
                    .ok_or(EvalError::UnknownFunction(name))?;
                function(&args)
            }
            Some(Token::Ident(word)) => match word.as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                "null" => Ok(Value::Null),
                _ => Err(EvalError::UnexpectedToken(word)),
            },
            Some(Token::LParen) => {
                let value = self.expression()?;
                self.expect(&Token::RParen)?;
                Ok(value)
            }
            Some(other) => Err(EvalError::UnexpectedToken(other.to_string())),
            None => Err(EvalError::UnexpectedEnd),
        }
    }

    /// Arguments of a call whose opener was already consumed, through the
    /// closing `)`.
    fn arguments(&mut self) -> Result<Vec<Value>, EvalError> {
        let mut args = Vec::new();
        if matches!(self.peek(), Some(Token::RParen)) {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            match self.advance() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => return Ok(args),
                Some(other) => return Err(EvalError::UnexpectedToken(other.to_string())),
                None => return Err(EvalError::UnexpectedEnd),
            }
        }
    }
}

/// `+`: numeric addition, or string concatenation when either side is a
/// string (with display coercion of the other side).
fn add(left: Value, right: Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Num(a), Value::Num(b)) => Ok(Value::Num(a + b)),
        (left, right) if matches!(left, Value::Str(_)) || matches!(right, Value::Str(_)) => {
            Ok(Value::Str(left.display_string() + &right.display_string()))
        }
        (left, right) => Err(EvalError::Type(format!(
            "cannot add {} and {}",
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn numeric(
    left: Value,
    right: Value,
    op: &str,
    apply: impl FnOnce(f64, f64) -> Result<f64, EvalError>,
) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Num(a), Value::Num(b)) => apply(a, b).map(Value::Num),
        (left, right) => Err(EvalError::Type(format!(
            "cannot apply '{op}' to {} and {}",
            left.type_name(),
            right.type_name()
        ))),
    }
}

/// `value[key]`: string-keyed map lookup. A missing key yields `Null`, which
/// renders as the empty string in concatenation.
fn index(value: Value, key: Value) -> Result<Value, EvalError> {
    match (value, key) {
        (Value::Map(map), Value::Str(key)) => Ok(map.get(&key).cloned().unwrap_or(Value::Null)),
        (Value::Map(_), key) => Err(EvalError::Type(format!(
            "cannot index a map with {}",
            key.type_name()
        ))),
        (value, _) => Err(EvalError::Type(format!(
            "cannot index {}",
            value.type_name()
        ))),
    }
}
