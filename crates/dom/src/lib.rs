//! # xmlbind DOM
//!
//! A small, owned XML element tree plus the two boundary steps the
//! `xmlbind` schema mapper needs around it:
//!
//! - **Parsing** ([`parse_str`], [`parse_slice`], [`parse_reader`]) reads
//!   quick-xml events through a namespace-resolving reader and builds an
//!   [`Element`] tree in which every element and prefixed attribute carries the
//!   namespace URI it resolved to.
//! - **Rendering** ([`to_string`], [`to_vec`], [`write_to`]) writes the tree
//!   back out, declaring namespaces on demand.
//!
//! The tree knows nothing about schemas.
//!
//! ```
//! use xmlbind_dom::{Element, parse_str, to_string};
//!
//! let mut root = Element::new_ns("http://foo.bar", "myns:root");
//! root.set_attribute("id", "1");
//! root.append_child(Element::new("child").with_text("hello"));
//!
//! let xml = to_string(&root)?;
//! assert_eq!(
//!     xml,
//!     r#"<myns:root xmlns:myns="http://foo.bar" id="1"><child>hello</child></myns:root>"#
//! );
//! assert_eq!(parse_str(&xml)?, {
//!     let mut expected = root.clone();
//!     expected.attributes.insert(0, xmlbind_dom::Attribute {
//!         name: xmlbind_dom::QName::parse("xmlns:myns"),
//!         namespace: Some(xmlbind_dom::XMLNS_NAMESPACE.to_string()),
//!         value: "http://foo.bar".to_string(),
//!     });
//!     expected
//! });
//! # Ok::<(), xmlbind_dom::DomError>(())
//! ```

pub mod error;
mod node;
mod parse;
mod render;

pub use error::{DomError, Result};
pub use node::{Attribute, Element, Node, QName, XML_NAMESPACE, XMLNS_NAMESPACE};
pub use parse::{parse_reader, parse_slice, parse_str};
pub use render::{RenderOptions, to_string, to_string_with, to_vec, write_to};
