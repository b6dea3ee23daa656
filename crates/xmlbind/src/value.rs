//! Attribute values and the conversion layer shared by both directions.
//!
//! Raw attribute text is turned into a [`Value`] either by a user
//! [`Converter`] or by coercion according to the declared [`AttrKind`];
//! the reverse direction formats a [`Value`] back to text. Validators run on
//! the converted value.

use crate::error::{BoxError, ConversionError, Error, Result, ValidationError};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A converted attribute value.
#[derive(Clone)]
pub enum Value {
    /// Text, also used for enumeration members.
    String(String),
    /// A boolean; coerced from the exact literal `true`.
    Bool(bool),
    /// A number; malformed numeric text coerces to `NaN`.
    Number(f64),
    /// The output of a custom [`Converter`].
    Custom(Arc<dyn Any + Send + Sync>),
}

impl Value {
    /// Wraps an arbitrary value produced by a converter.
    pub fn custom<T: Any + Send + Sync>(value: T) -> Self {
        Value::Custom(Arc::new(value))
    }

    /// Returns the text for string values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean for bool values.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the number for numeric values.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Borrows a custom value as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Custom(v) => v.downcast_ref::<T>(),
            _ => None,
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Value::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Custom(a), Value::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

/// A [`Value`] did not have the variant an accessor expected.
#[derive(Error, Debug)]
#[error("expected a {expected} value, found {found}")]
pub struct ValueTypeError {
    pub expected: &'static str,
    pub found: &'static str,
}

impl TryFrom<Value> for String {
    type Error = ValueTypeError;

    fn try_from(value: Value) -> std::result::Result<Self, Self::Error> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(ValueTypeError {
                expected: "string",
                found: other.kind_name(),
            }),
        }
    }
}

impl TryFrom<Value> for bool {
    type Error = ValueTypeError;

    fn try_from(value: Value) -> std::result::Result<Self, Self::Error> {
        value.as_bool().ok_or(ValueTypeError {
            expected: "boolean",
            found: value.kind_name(),
        })
    }
}

impl TryFrom<Value> for f64 {
    type Error = ValueTypeError;

    fn try_from(value: Value) -> std::result::Result<Self, Self::Error> {
        value.as_number().ok_or(ValueTypeError {
            expected: "number",
            found: value.kind_name(),
        })
    }
}

/// Primitive type of an attribute without a converter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AttrKind {
    /// Verbatim text.
    #[default]
    String,
    /// `true` when the text is exactly `true`, otherwise `false`.
    Boolean,
    /// Decimal number.
    Number,
    /// One of a fixed set of strings.
    Enum(Vec<String>),
}

impl AttrKind {
    /// An enumeration over the given members.
    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AttrKind::Enum(values.into_iter().map(Into::into).collect())
    }
}

type ParseFn = dyn Fn(&str) -> std::result::Result<Value, BoxError> + Send + Sync;
type FormatFn = dyn Fn(&Value) -> std::result::Result<String, BoxError> + Send + Sync;

/// A bidirectional string/value translation for one attribute.
#[derive(Clone)]
pub struct Converter {
    parse: Arc<ParseFn>,
    format: Arc<FormatFn>,
}

impl Converter {
    /// Creates a converter from its two directions.
    pub fn new<P, F>(parse: P, format: F) -> Self
    where
        P: Fn(&str) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
        F: Fn(&Value) -> std::result::Result<String, BoxError> + Send + Sync + 'static,
    {
        Self {
            parse: Arc::new(parse),
            format: Arc::new(format),
        }
    }

    /// Text to value.
    pub fn parse(&self, raw: &str) -> std::result::Result<Value, BoxError> {
        (self.parse)(raw)
    }

    /// Value to text.
    pub fn format(&self, value: &Value) -> std::result::Result<String, BoxError> {
        (self.format)(value)
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Converter")
    }
}

type ValidateFn = dyn Fn(&Value) -> std::result::Result<(), BoxError> + Send + Sync;

/// A check run against a converted attribute value.
#[derive(Clone)]
pub struct Validator(Arc<ValidateFn>);

impl Validator {
    /// Wraps a validation function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Runs the check.
    pub fn check(&self, value: &Value) -> std::result::Result<(), BoxError> {
        (self.0)(value)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Validator")
    }
}

/// Parses decimal text, yielding `NaN` for anything malformed.
///
/// Besides decimal digits, a sign, a point and an exponent, only the
/// spellings [`format_number`] writes are accepted: `Infinity`, `-Infinity`
/// and `NaN`. Other forms such as `inf` or `nan` are malformed.
pub fn parse_number(raw: &str) -> f64 {
    let raw = raw.trim();
    match raw {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    let decimal = raw
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'));
    if !decimal {
        return f64::NAN;
    }
    raw.parse::<f64>().unwrap_or(f64::NAN)
}

/// Formats a number the way it is written in attributes: integral values
/// without a fractional part, `NaN` and `Infinity` spelled out.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        String::from(if n > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        n.to_string()
    }
}

/// Raw text to value, via the converter when present, else by primitive kind.
pub(crate) fn coerce(
    attribute: &str,
    kind: &AttrKind,
    converter: Option<&Converter>,
    raw: &str,
) -> Result<Value> {
    if let Some(converter) = converter {
        return converter.parse(raw).map_err(|source| {
            Error::from(ConversionError::Parse {
                attribute: attribute.to_string(),
                value: raw.to_string(),
                source,
            })
        });
    }

    Ok(match kind {
        AttrKind::String => Value::String(raw.to_string()),
        AttrKind::Boolean => Value::Bool(raw == "true"),
        AttrKind::Number => Value::Number(parse_number(raw)),
        AttrKind::Enum(allowed) => {
            if !allowed.iter().any(|v| v == raw) {
                return Err(ValidationError::NotInEnum {
                    attribute: attribute.to_string(),
                    value: raw.to_string(),
                    allowed: allowed.clone(),
                }
                .into());
            }
            Value::String(raw.to_string())
        }
    })
}

/// Runs validators in declaration order, stopping at the first failure.
pub(crate) fn validate(attribute: &str, validators: &[Validator], value: &Value) -> Result<()> {
    for validator in validators {
        validator
            .check(value)
            .map_err(|source| ValidationError::Validator {
                attribute: attribute.to_string(),
                source,
            })?;
    }
    Ok(())
}

/// Value to attribute text, via the converter when present.
pub(crate) fn format(
    attribute: &str,
    converter: Option<&Converter>,
    value: &Value,
) -> Result<String> {
    if let Some(converter) = converter {
        return converter.format(value).map_err(|source| {
            Error::from(ConversionError::Format {
                attribute: attribute.to_string(),
                source,
            })
        });
    }

    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(if *b { "true" } else { "false" }.to_string()),
        Value::Number(n) => Ok(format_number(*n)),
        Value::Custom(_) => Err(ConversionError::Format {
            attribute: attribute.to_string(),
            source: "custom values need a converter to be written".into(),
        }
        .into()),
    }
}
