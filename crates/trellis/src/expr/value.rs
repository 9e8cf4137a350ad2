//! Values and lookup tables for expression evaluation.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::error::EvalError;

/// A value produced or consumed by an expression.
///
/// The domain is deliberately small: what the language itself can produce
/// (strings, numbers, booleans, null) plus string-keyed maps so subscripted
/// variables like `$col["col 1"]` have something to index into.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent value; renders as the empty string.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Number (always floating point, like the language's literals).
    Num(f64),
    /// String.
    Str(String),
    /// String-keyed map, for subscripting.
    Map(HashMap<String, Value>),
}

impl Value {
    /// Builds a map value from key/value pairs.
    ///
    /// # Example
    ///
    /// ```
    /// use trellis::expr::Value;
    ///
    /// let row = Value::map([("name", Value::from("ada"))]);
    /// assert!(matches!(row, Value::Map(_)));
    /// ```
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// The string contents, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The numeric value, if this is a number.
    pub fn as_num(&self) -> Option<f64> {
        match self {
            Self::Num(n) => Some(*n),
            _ => None,
        }
    }

    /// Whether this is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The coercion used by string concatenation: numbers drop an integral
    /// `.0`, `Null` renders empty, maps are not renderable.
    pub fn display_string(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Num(n) => format_number(*n),
            Self::Str(s) => s.clone(),
            Self::Map(_) => "[map]".to_string(),
        }
    }

    /// Short type name for error messages.
    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Num(_) => "number",
            Self::Str(_) => "string",
            Self::Map(_) => "map",
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_string())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Num(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Num(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Num(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<HashMap<String, Value>> for Value {
    fn from(map: HashMap<String, Value>) -> Self {
        Self::Map(map)
    }
}

/// A host function callable from expressions.
pub type HostFunction = Arc<dyn Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync>;

/// The function table handed to [`evaluate`](super::evaluate).
///
/// # Example
///
/// ```
/// use trellis::expr::{Functions, Value};
///
/// let functions = Functions::new()
///     .with("upper", |args| Ok(Value::from(args[0].display_string().to_uppercase())));
/// assert!(functions.contains("upper"));
/// ```
#[derive(Clone, Default)]
pub struct Functions {
    entries: HashMap<String, HostFunction>,
}

impl Functions {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a function, builder style.
    pub fn with<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.insert(name, f);
        self
    }

    /// Adds or replaces a function.
    pub fn insert<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.entries.insert(name.into(), Arc::new(f));
    }

    /// Looks a function up by name.
    pub fn get(&self, name: &str) -> Option<&HostFunction> {
        self.entries.get(name)
    }

    /// Whether a function with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

impl fmt::Debug for Functions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

/// The variable table handed to [`evaluate`](super::evaluate).
///
/// # Example
///
/// ```
/// use trellis::expr::{Value, Variables};
///
/// let variables = Variables::new().with("recno", 10).with("name", "ada");
/// assert_eq!(variables.get("recno"), Some(&Value::Num(10.0)));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Variables {
    entries: HashMap<String, Value>,
}

impl Variables {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a variable, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Adds or replaces a variable.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(name.into(), value.into());
    }

    /// Looks a variable up by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    /// Whether a variable with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}
