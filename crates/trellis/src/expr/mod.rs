//! Expression engine for computed column values.
//!
//! Widgets such as property sheets and computed grid columns let callers
//! embed a tiny expression language in ordinary text: `$name` references a
//! variable, `name(...)` calls a function, and double-quoted string
//! literals pass through opaquely. This module compiles such text once and
//! evaluates it many times against caller-supplied lookup tables.
//!
//! Compilation is a pure, single pass: it produces the rewritten
//! host-shape text, a structured token stream, and the sets of variable and
//! function names the expression references. Evaluation is a separate step
//! that walks the token stream — there is no dynamic code execution
//! anywhere.
//!
//! # Example
//!
//! ```
//! use trellis::expr::{Functions, Value, Variables, compile, evaluate};
//!
//! let compiled = compile(r#"trim(" " + $rand + trim($col["col 1"]) + $recno + " ")"#).unwrap();
//! assert!(compiled.vars().contains("rand"));
//! assert!(compiled.funcs().contains("trim"));
//!
//! let functions = Functions::new().with("trim", |args| {
//!     Ok(Value::from(args[0].display_string().trim()))
//! });
//! let variables = Variables::new()
//!     .with("rand", "xyz")
//!     .with("recno", 10)
//!     .with("col", Value::map([("col 1", Value::from(" [col1-data]  "))]));
//!
//! let result = evaluate(&compiled, &functions, &variables).unwrap();
//! assert_eq!(result, Value::from("xyz[col1-data]10"));
//! ```
//!
//! # Failure classes
//!
//! Malformed `$` syntax and unterminated string literals are fatal
//! [`CompileError`]s raised synchronously by [`compile`]; no partial result
//! is returned. Unknown names, type mismatches, and malformed expression
//! syntax are [`EvalError`]s raised by [`evaluate`] — a later, separate
//! failure class the compiler never catches.

mod compile;
mod error;
mod eval;
mod value;

pub use compile::{Compiled, Token, compile};
pub use error::{CompileError, EvalError};
pub use eval::evaluate;
pub use value::{Functions, HostFunction, Value, Variables};
