//! Error types for parsing and rendering element trees.

use thiserror::Error;

/// Errors produced while turning XML text into an [`Element`](crate::Element)
/// tree or rendering a tree back to text.
#[derive(Error, Debug)]
pub enum DomError {
    /// The underlying XML reader or writer failed.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// IO error while reading input or writing output.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Text or a name could not be decoded.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The rendered output was not valid UTF-8.
    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// The document contains no element at all.
    #[error("document has no root element")]
    NoRootElement,

    /// An end tag was found with no matching start tag.
    #[error("unexpected end tag </{0}>")]
    UnbalancedEndTag(String),

    /// The input ended while elements were still open.
    #[error("unexpected end of input inside <{0}>")]
    UnexpectedEof(String),

    /// A prefix was used without an `xmlns:` declaration in scope.
    #[error("namespace prefix '{0}' is not bound")]
    UnboundPrefix(String),

    /// An entity reference other than the predefined ones or a character reference.
    #[error("unknown entity reference '&{0};'")]
    UnknownEntity(String),
}

/// Result alias for DOM operations.
pub type Result<T> = std::result::Result<T, DomError>;
