//! XML entry points.
//!
//! The deserialize direction parses text into an [`Element`](xmlbind_dom::Element) tree and walks
//! it against the effective schema of the requested type; the serialize
//! direction builds an element tree from an instance and renders it.
//!
//! ## Namespaces
//!
//! Serialization threads a [`NamespaceMap`] (prefix to URI) down the tree.
//! For each element the URI bound to its schema prefix is, in increasing
//! precedence:
//!
//! 1. the schema's own namespace declaration
//! 2. an entry for the prefix inherited from the caller or an ancestor
//! 3. the instance's own namespace URI, which also becomes the inherited
//!    entry for its descendants
//!
//! A schema without a namespace reads the empty-prefix entry of the map but
//! never writes it: its instance URI applies to its own element only, so a
//! child deserialized with no namespace is written with none.
//!
//! Each child receives its own copy of the map, so a reassignment in one
//! subtree never reaches its siblings.
//!
//! ```
//! use std::sync::Arc;
//! use xmlbind::{Bindable, ChildSpec, Children, Fragment, InstanceState, Registry, Resolver, impl_bindable};
//!
//! #[derive(Default)]
//! struct Root {
//!     state: InstanceState,
//!     child: Option<Arc<Child>>,
//! }
//! impl_bindable!(Root);
//!
//! #[derive(Default)]
//! struct Child {
//!     state: InstanceState,
//! }
//! impl_bindable!(Child);
//!
//! let mut registry = Registry::new();
//! registry.register(
//!     Fragment::<Root>::new()
//!         .element("root")
//!         .namespace("myns", "http://foo.bar")
//!         .child("child", ChildSpec::optional(), |r: &Root| Children::optional(&r.child), |r, c| {
//!             r.child = c.into_first()
//!         }),
//! )?;
//! registry.register(Fragment::<Child>::new().element("child").namespace("myns", "urn:own"))?;
//! let resolver = Resolver::new(registry);
//!
//! let mut child = Child::default();
//! child.set_namespace_uri(Some("urn:override".to_string()));
//! let root = Root { child: Some(Arc::new(child)), ..Default::default() };
//!
//! assert_eq!(
//!     xmlbind::to_xml_string(&resolver, &root)?,
//!     r#"<myns:root xmlns:myns="http://foo.bar"><myns:child xmlns:myns="urn:override"/></myns:root>"#
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod de;
mod ser;

use std::collections::BTreeMap;

/// Prefix-to-URI overrides applied while serializing. The empty prefix is
/// the default namespace.
pub type NamespaceMap = BTreeMap<String, String>;

pub use de::{
    deserialize, deserialize_element, from_element, from_xml_reader, from_xml_slice, from_xml_str,
};
pub use ser::{
    render, to_element, to_element_with, to_xml_string, to_xml_string_with, to_xml_vec,
    to_xml_writer,
};
