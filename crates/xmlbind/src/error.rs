//! Error types for schema resolution, deserialization and serialization.
//!
//! Every failing call surfaces exactly one [`Error`], the first problem
//! encountered. The variants group into four families:
//!
//! | Family | Meaning |
//! |--------|---------|
//! | [`SchemaError`] | A registration bug: missing tag, undefined binding, bad reference |
//! | [`StructuralError`] | The document or object tree does not fit the schema |
//! | [`ConversionError`] | A converter or primitive coercion failed |
//! | [`ValidationError`] | A validator, enum check or post-deserialization hook rejected a value |

// Variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;
use xmlbind_dom::DomError;

/// Boxed cause returned by user-supplied converters, validators and hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The primary error type for all mapping operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Schema registration problems
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Cardinality, required-value and shape problems
    #[error(transparent)]
    Structural(#[from] StructuralError),

    /// Value conversion problems
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// Value validation problems
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// XML parsing or rendering problems
    #[error(transparent)]
    Dom(#[from] DomError),

    /// A value handed to or returned from an accessor had the wrong Rust type.
    #[error("type mismatch for '{property}' on {type_name}: {message}")]
    Type {
        type_name: &'static str,
        property: String,
        message: String,
    },
}

/// Errors in the declared schemas themselves.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The type has no fragment declaring an element tag.
    #[error("{type_name} has no element tag; register it with Fragment::element")]
    MissingTag { type_name: &'static str },

    /// The type (or an ancestor or child type it references) was never registered.
    #[error("no schema fragment registered for {type_name}")]
    UnresolvedType { type_name: &'static str },

    /// The type was registered twice.
    #[error("schema fragment for {type_name} registered more than once")]
    DuplicateFragment { type_name: &'static str },

    /// A property was renamed or validated but never bound to an attribute.
    #[error("attribute binding '{property}' on {type_name} is used but never defined")]
    UndefinedBinding {
        type_name: &'static str,
        property: String,
    },

    /// A binding violates a registration invariant.
    #[error("invalid binding '{property}' on {type_name}: {reason}")]
    InvalidBinding {
        type_name: &'static str,
        property: String,
        reason: String,
    },

    /// The `extends` declarations form a loop.
    #[error("inheritance cycle through {type_name}")]
    InheritanceCycle { type_name: &'static str },
}

/// The document or object tree does not fit the schema.
#[derive(Error, Debug)]
pub enum StructuralError {
    #[error("<{element}> requires at least {min} '{property}' children, found {found}")]
    TooFewChildren {
        element: String,
        property: String,
        min: usize,
        found: usize,
    },

    #[error("<{element}> allows at most {max} '{property}' children, found {found}")]
    TooManyChildren {
        element: String,
        property: String,
        max: usize,
        found: usize,
    },

    #[error("<{element}> is missing required attribute '{attribute}'")]
    MissingAttribute { element: String, attribute: String },

    #[error("<{element}> has attribute '{attribute}' more than once")]
    DuplicateAttribute { element: String, attribute: String },

    #[error("<{element}> is missing required text content '{property}'")]
    MissingText { element: String, property: String },

    #[error("<{element}> is missing required child object '{property}'")]
    MissingChild { element: String, property: String },

    #[error("'{property}' on <{element}> allows a single child, but a list was given")]
    ListForSingular { element: String, property: String },

    #[error("'{property}' on <{element}> expects a list of children, but a single value was given")]
    SingleForList { element: String, property: String },

    #[error("circular reference: {type_name} is already being serialized")]
    CircularReference { type_name: &'static str },
}

/// A converter or primitive coercion failed.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("cannot parse '{value}' for attribute '{attribute}': {source}")]
    Parse {
        attribute: String,
        value: String,
        source: BoxError,
    },

    #[error("cannot format attribute '{attribute}': {source}")]
    Format { attribute: String, source: BoxError },

    #[error("cannot assign attribute '{attribute}': {source}")]
    Assign { attribute: String, source: BoxError },
}

/// A validator, enum check or hook rejected a value.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("attribute '{attribute}' failed validation: {source}")]
    Validator { attribute: String, source: BoxError },

    #[error("attribute '{attribute}' has value '{value}', expected one of {allowed:?}")]
    NotInEnum {
        attribute: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("post-deserialization hook on {type_name} failed: {source}")]
    Hook {
        type_name: &'static str,
        source: BoxError,
    },
}

/// Result type alias for mapping operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
