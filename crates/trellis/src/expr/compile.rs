//! Single-pass tokenizer and compiler for the expression mini-language.
//!
//! Three constructs are recognised inside otherwise ordinary text:
//!
//! - `$name` — a variable reference (alphabetic name; a following `[` is
//!   preserved verbatim so `$col["key"]` subscripts work),
//! - `name(` — a function call,
//! - `"..."` — a string literal, copied through opaquely.
//!
//! Everything else passes through unchanged. The compiler records every
//! referenced variable and function name, rewrites references into the
//! host shape (`vars.name` / `funcs.name(`), and shapes the text into the
//! token stream the interpreter in [`eval`](super::eval) walks.

use std::collections::HashSet;

use super::error::CompileError;

/// One element of a compiled expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `$name` variable reference.
    Var(String),
    /// `name(` function call opener; the matching `)` closes the argument
    /// list.
    Call(String),
    /// `"..."` string literal (contents without the quotes).
    Str(String),
    /// Numeric literal.
    Num(f64),
    /// Bare word (not followed by `(`): `true`, `false`, `null`, or an
    /// evaluation error.
    Ident(String),
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `,`
    Comma,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// Any other passthrough character; rejected by the interpreter.
    Other(char),
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Var(name) => write!(f, "${name}"),
            Self::Call(name) => write!(f, "{name}("),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Num(n) => write!(f, "{n}"),
            Self::Ident(word) => f.write_str(word),
            Self::LParen => f.write_str("("),
            Self::RParen => f.write_str(")"),
            Self::LBracket => f.write_str("["),
            Self::RBracket => f.write_str("]"),
            Self::Comma => f.write_str(","),
            Self::Plus => f.write_str("+"),
            Self::Minus => f.write_str("-"),
            Self::Star => f.write_str("*"),
            Self::Slash => f.write_str("/"),
            Self::Other(c) => write!(f, "{c}"),
        }
    }
}

/// The result of compiling one expression text.
///
/// Produced once per input by [`compile`]; immutable afterwards. Evaluate
/// it any number of times with [`evaluate`](super::evaluate).
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    source: String,
    text: String,
    tokens: Vec<Token>,
    vars: HashSet<String>,
    funcs: HashSet<String>,
}

impl Compiled {
    /// The original input text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The rewritten text, in the shape of a host expression over a
    /// `funcs` and a `vars` object: `$x` becomes `vars.x` and `f(` becomes
    /// `funcs.f(`.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The token stream the interpreter walks.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Names referenced as `$name`.
    pub fn vars(&self) -> &HashSet<String> {
        &self.vars
    }

    /// Names referenced as `name(`.
    pub fn funcs(&self) -> &HashSet<String> {
        &self.funcs
    }

    /// Evaluates this expression against the given tables.
    ///
    /// Convenience for [`evaluate`](super::evaluate).
    pub fn evaluate(
        &self,
        functions: &super::Functions,
        variables: &super::Variables,
    ) -> Result<super::Value, super::EvalError> {
        super::evaluate(self, functions, variables)
    }
}

/// Compiles expression text in a single pass.
///
/// Pure: the only outputs are the returned [`Compiled`] value. Malformed
/// `$` syntax and unterminated string literals fail fatally; everything
/// else is passed through for the interpreter to judge.
///
/// # Example
///
/// ```
/// use trellis::expr::compile;
///
/// let compiled = compile("upper($name)").unwrap();
/// assert_eq!(compiled.text(), "funcs.upper(vars.name)");
/// assert!(compiled.vars().contains("name"));
/// assert!(compiled.funcs().contains("upper"));
///
/// // Inside a string literal, `$x` is not a reference.
/// let quoted = compile(r#""$x""#).unwrap();
/// assert!(quoted.vars().is_empty());
/// ```
pub fn compile(source: &str) -> Result<Compiled, CompileError> {
    let chars: Vec<char> = source.chars().collect();
    let mut text = String::new();
    let mut tokens = Vec::new();
    let mut vars = HashSet::new();
    let mut funcs = HashSet::new();

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '"' {
            let start = i;
            i += 1;
            let mut literal = String::new();
            loop {
                match chars.get(i) {
                    None => return Err(CompileError::UnterminatedString { offset: start }),
                    Some('"') => break,
                    Some(&ch) => {
                        literal.push(ch);
                        i += 1;
                    }
                }
            }
            i += 1; // closing quote
            text.push('"');
            text.push_str(&literal);
            text.push('"');
            tokens.push(Token::Str(literal));
        } else if c == '$' {
            match chars.get(i + 1) {
                Some(&ch) if ch.is_ascii_alphabetic() => {
                    i += 1;
                    let mut name = String::new();
                    while i < chars.len() && chars[i].is_ascii_alphabetic() {
                        name.push(chars[i]);
                        i += 1;
                    }
                    text.push_str("vars.");
                    text.push_str(&name);
                    vars.insert(name.clone());
                    tokens.push(Token::Var(name));
                }
                // A lone '$' in prose is plain text; anything else after
                // '$' is a syntax error.
                Some(&ch) if ch.is_whitespace() => {
                    text.push('$');
                    tokens.push(Token::Other('$'));
                    i += 1;
                }
                None => {
                    text.push('$');
                    tokens.push(Token::Other('$'));
                    i += 1;
                }
                Some(&ch) => {
                    return Err(CompileError::BadVariable {
                        found: ch,
                        offset: i + 1,
                    });
                }
            }
        } else if c.is_ascii_alphabetic() {
            let mut name = String::new();
            while i < chars.len() && chars[i].is_ascii_alphabetic() {
                name.push(chars[i]);
                i += 1;
            }
            if chars.get(i) == Some(&'(') {
                i += 1;
                text.push_str("funcs.");
                text.push_str(&name);
                text.push('(');
                funcs.insert(name.clone());
                tokens.push(Token::Call(name));
            } else {
                text.push_str(&name);
                tokens.push(Token::Ident(name));
            }
        } else if c.is_ascii_digit() {
            let mut digits = String::new();
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                digits.push(chars[i]);
                i += 1;
            }
            text.push_str(&digits);
            match digits.parse::<f64>() {
                Ok(n) => tokens.push(Token::Num(n)),
                // Not a number after all (e.g. "1.2.3"): pass the characters
                // through for the interpreter to reject.
                Err(_) => tokens.extend(digits.chars().map(Token::Other)),
            }
        } else if c.is_whitespace() {
            text.push(c);
            i += 1;
        } else {
            text.push(c);
            tokens.push(match c {
                '(' => Token::LParen,
                ')' => Token::RParen,
                '[' => Token::LBracket,
                ']' => Token::RBracket,
                ',' => Token::Comma,
                '+' => Token::Plus,
                '-' => Token::Minus,
                '*' => Token::Star,
                '/' => Token::Slash,
                other => Token::Other(other),
            });
            i += 1;
        }
    }

    tracing::trace!(
        target: "trellis::expr",
        vars = vars.len(),
        funcs = funcs.len(),
        "compiled expression"
    );

    Ok(Compiled {
        source: source.to_string(),
        text,
        tokens,
        vars,
        funcs,
    })
}
