//! Element tree types.
//!
//! The tree is deliberately small: elements carry a qualified name, the
//! namespace URI that name resolved to, an ordered attribute list and an
//! ordered list of child nodes. Namespace declarations (`xmlns`, `xmlns:p`)
//! are kept as ordinary attributes so a parsed tree renders back to the same
//! declarations.

use std::fmt;

/// The namespace permanently bound to the `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// The namespace of `xmlns` declaration attributes.
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// A possibly prefixed XML name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    /// The prefix before the colon, if any.
    pub prefix: Option<String>,
    /// The local part of the name.
    pub local: String,
}

impl QName {
    /// Creates an unprefixed name.
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local: local.into(),
        }
    }

    /// Splits `prefix:local` text into its parts.
    pub fn parse(qualified: &str) -> Self {
        match qualified.split_once(':') {
            Some((prefix, local)) if !prefix.is_empty() => Self {
                prefix: Some(prefix.to_string()),
                local: local.to_string(),
            },
            _ => Self::local(qualified),
        }
    }

    /// Returns `true` for `xmlns` and `xmlns:*` names.
    pub fn is_namespace_declaration(&self) -> bool {
        match &self.prefix {
            Some(prefix) => prefix == "xmlns",
            None => self.local == "xmlns",
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{}:{}", prefix, self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// An attribute on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// The attribute name as written.
    pub name: QName,
    /// Namespace URI the prefix resolves to. Unprefixed attributes have none.
    pub namespace: Option<String>,
    /// The unescaped attribute value.
    pub value: String,
}

impl Attribute {
    /// Returns `true` if this attribute declares a namespace.
    pub fn is_namespace_declaration(&self) -> bool {
        self.name.is_namespace_declaration()
    }

    /// For a namespace declaration, the prefix it binds (`None` for the default namespace).
    pub fn declared_prefix(&self) -> Option<Option<&str>> {
        if !self.is_namespace_declaration() {
            return None;
        }
        match &self.name.prefix {
            Some(_) => Some(Some(self.name.local.as_str())),
            None => Some(None),
        }
    }
}

/// A node in the element tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A nested element.
    Element(Element),
    /// Character data, already unescaped.
    Text(String),
    /// A CDATA section.
    CData(String),
    /// A comment.
    Comment(String),
}

impl Node {
    /// Returns `true` for text and CDATA nodes.
    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_) | Node::CData(_))
    }

    /// Returns the element if this node is one.
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the character data if this node is text or CDATA.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Node::Text(t) | Node::CData(t) => Some(t),
            _ => None,
        }
    }
}

impl From<Element> for Node {
    fn from(e: Element) -> Self {
        Node::Element(e)
    }
}

/// An XML element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// The element name as written.
    pub name: QName,
    /// Namespace URI the element name resolves to.
    pub namespace: Option<String>,
    /// Attributes in document order.
    pub attributes: Vec<Attribute>,
    /// Child nodes in document order.
    pub children: Vec<Node>,
}

impl Element {
    /// Creates an element with no namespace.
    pub fn new(local: impl Into<String>) -> Self {
        Self {
            name: QName::local(local),
            namespace: None,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Creates an element bound to `namespace`, named `prefix:local` or `local`.
    pub fn new_ns(namespace: impl Into<String>, qualified: &str) -> Self {
        Self {
            name: QName::parse(qualified),
            namespace: Some(namespace.into()),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// The local part of the element name.
    pub fn local_name(&self) -> &str {
        &self.name.local
    }

    /// The element prefix, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.name.prefix.as_deref()
    }

    /// The element name including its prefix.
    pub fn qualified_name(&self) -> String {
        self.name.to_string()
    }

    /// The resolved namespace URI.
    pub fn namespace_uri(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Sets an unqualified attribute, replacing any attribute with the same name.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.put_attribute(Attribute {
            name: QName::local(name),
            namespace: None,
            value: value.into(),
        });
    }

    /// Sets a namespace-qualified attribute named `prefix:local`.
    pub fn set_attribute_ns(
        &mut self,
        namespace: impl Into<String>,
        qualified: &str,
        value: impl Into<String>,
    ) {
        self.put_attribute(Attribute {
            name: QName::parse(qualified),
            namespace: Some(namespace.into()),
            value: value.into(),
        });
    }

    fn put_attribute(&mut self, attribute: Attribute) {
        match self
            .attributes
            .iter_mut()
            .find(|a| a.name == attribute.name)
        {
            Some(existing) => *existing = attribute,
            None => self.attributes.push(attribute),
        }
    }

    /// Builder form of [`Element::set_attribute`].
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Looks up an attribute by its written (possibly prefixed) name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        let name = QName::parse(name);
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Looks up an attribute by namespace URI and local name.
    pub fn attribute_ns(&self, namespace: &str, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.as_deref() == Some(namespace) && a.name.local == local)
            .map(|a| a.value.as_str())
    }

    /// Appends a child node.
    pub fn append_child(&mut self, node: impl Into<Node>) {
        self.children.push(node.into());
    }

    /// Appends text, merging with a preceding text node.
    pub fn append_text(&mut self, text: &str) {
        if let Some(Node::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(Node::Text(text.to_string()));
        }
    }

    /// Builder form of [`Element::append_child`].
    pub fn with_child(mut self, node: impl Into<Node>) -> Self {
        self.append_child(node);
        self
    }

    /// Builder form of [`Element::append_text`].
    pub fn with_text(mut self, text: &str) -> Self {
        self.append_text(text);
        self
    }

    /// Iterates over child elements, skipping text and comments.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Concatenated text of all descendant text and CDATA nodes.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(t) | Node::CData(t) => out.push_str(t),
                Node::Element(e) => e.collect_text(out),
                Node::Comment(_) => {}
            }
        }
    }
}
