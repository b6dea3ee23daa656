//! # xmlbind
//!
//! Schema-driven mapping between XML documents and typed Rust objects.
//!
//! Each mapped type registers a [`Fragment`] describing its element tag,
//! namespace, attribute bindings, child-element bindings and text binding.
//! A [`Resolver`] merges a type's fragment with those of its declared
//! ancestors into an [`EffectiveSchema`], which then drives both directions:
//!
//! - **Deserialization** ([`from_xml_str`], [`from_element`], ...) walks an
//!   element tree, converts and validates attribute values, recurses into
//!   child elements and enforces child cardinality.
//! - **Serialization** ([`to_xml_string`], [`to_element`], ...) rebuilds an
//!   element tree from an instance, propagating namespace overrides down the
//!   tree and detecting circular object graphs.
//!
//! Parsing and rendering of XML text is handled by [`xmlbind_dom`].
//!
//! ## Inheritance
//!
//! A type declares at most one direct ancestor with [`Fragment::extends`],
//! together with projections to the ancestor part it embeds. Attribute,
//! child and text bindings of ancestors apply to the descendant unless the
//! descendant binds the same property identifier itself. The element tag,
//! namespace and raw-output flag are never inherited.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use xmlbind::{AttributeSpec, ChildSpec, Children, Fragment, InstanceState, Registry, Resolver};
//! use xmlbind::{impl_bindable, validators};
//!
//! #[derive(Default)]
//! struct Library {
//!     state: InstanceState,
//!     books: Vec<Arc<Book>>,
//! }
//! impl_bindable!(Library);
//!
//! #[derive(Default)]
//! struct Book {
//!     state: InstanceState,
//!     pages: f64,
//!     title: String,
//! }
//! impl_bindable!(Book);
//!
//! let mut registry = Registry::new();
//! registry.register(Fragment::<Library>::new().element("library").child(
//!     "books",
//!     ChildSpec::many(),
//!     |l: &Library| Children::many(&l.books),
//!     |l, c| l.books = c.into_vec(),
//! ))?;
//! registry.register(
//!     Fragment::<Book>::new()
//!         .element("book")
//!         .attribute(
//!             "pages",
//!             AttributeSpec::number().required().validator(validators::min(1.0)),
//!             |b| Some(b.pages.into()),
//!             |b, v| {
//!                 b.pages = v.try_into()?;
//!                 Ok(())
//!             },
//!         )
//!         .text("title", true, |b| Some(b.title.clone()), |b, t| b.title = t),
//! )?;
//! let resolver = Resolver::new(registry);
//!
//! let xml = r#"<library><book pages="320">Dune</book><book pages="96">Animal Farm</book></library>"#;
//! let library: Library = xmlbind::from_xml_str(&resolver, xml)?;
//! assert_eq!(library.books.len(), 2);
//! assert_eq!(library.books[1].title, "Animal Farm");
//!
//! assert_eq!(xmlbind::to_xml_string(&resolver, &library)?, xml);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
mod instance;
pub mod naming;
mod schema;
pub mod validators;
pub mod value;
mod xml;

pub use error::{
    BoxError, ConversionError, Error, Result, SchemaError, StructuralError, ValidationError,
};
pub use instance::{Bindable, Children, InstanceState};
pub use naming::NameGenerator;
pub use schema::{
    AttributeSpec, ChildSpec, EffectiveSchema, Fragment, MaxOccurs, Namespace, Registry,
    ResolvedAttribute, ResolvedChild, ResolvedText, Resolver, TypeRef,
};
pub use value::{AttrKind, Converter, Validator, Value};
pub use xml::{
    NamespaceMap, deserialize, deserialize_element, from_element, from_xml_reader,
    from_xml_slice, from_xml_str, render, to_element, to_element_with, to_xml_string,
    to_xml_string_with, to_xml_vec, to_xml_writer,
};
pub use xmlbind_dom::{Element, RenderOptions};
