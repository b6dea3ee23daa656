//! Stock validators for common attribute constraints.
//!
//! Each constructor returns a [`Validator`] that can be attached with
//! [`AttributeSpec::validator`](crate::AttributeSpec::validator) or
//! [`Fragment::validate`](crate::Fragment::validate).

use crate::value::{Validator, Value};
use regex::Regex;

/// Rejects numbers below `bound`.
pub fn min(bound: f64) -> Validator {
    Validator::new(move |value| match value.as_number() {
        Some(n) if n < bound => Err(format!("{} is smaller than {}", n, bound).into()),
        _ => Ok(()),
    })
}

/// Rejects numbers above `bound`.
pub fn max(bound: f64) -> Validator {
    Validator::new(move |value| match value.as_number() {
        Some(n) if n > bound => Err(format!("{} is bigger than {}", n, bound).into()),
        _ => Ok(()),
    })
}

/// Rejects empty strings.
pub fn non_empty() -> Validator {
    Validator::new(|value| match value {
        Value::String(s) if s.is_empty() => Err("value must not be empty".into()),
        _ => Ok(()),
    })
}

/// Accepts only the listed strings.
pub fn one_of<I, S>(allowed: I) -> Validator
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let allowed: Vec<String> = allowed.into_iter().map(Into::into).collect();
    Validator::new(move |value| match value.as_str() {
        Some(s) if !allowed.iter().any(|a| a == s) => {
            Err(format!("'{}' is not one of {:?}", s, allowed).into())
        }
        _ => Ok(()),
    })
}

/// Requires string values to match `pattern` in full.
pub fn pattern(pattern: &str) -> Result<Validator, regex::Error> {
    let regex = Regex::new(&format!("^(?:{})$", pattern))?;
    Ok(Validator::new(move |value| match value.as_str() {
        Some(s) if !regex.is_match(s) => {
            Err(format!("'{}' does not match /{}/", s, regex.as_str()).into())
        }
        _ => Ok(()),
    }))
}
