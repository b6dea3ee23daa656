//! Rendering an [`Element`] tree to XML text.
//!
//! Rendering is a stateless formatting step. Namespace declarations are
//! emitted where an element or attribute is bound to a URI that is not
//! already declared for its prefix in an enclosing scope.

use crate::error::Result;
use crate::node::{Element, Node};
use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::Write;

/// Output configuration for the renderer.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Emit `<?xml version="1.0" encoding="UTF-8"?>` before the root element.
    pub xml_declaration: bool,
}

impl RenderOptions {
    /// Options that emit the XML declaration.
    pub fn with_declaration() -> Self {
        Self {
            xml_declaration: true,
        }
    }
}

/// Render an element to a string with default options.
pub fn to_string(element: &Element) -> Result<String> {
    to_string_with(element, &RenderOptions::default())
}

/// Render an element to a string.
pub fn to_string_with(element: &Element, options: &RenderOptions) -> Result<String> {
    Ok(String::from_utf8(to_vec(element, options)?)?)
}

/// Render an element to a byte vector.
pub fn to_vec(element: &Element, options: &RenderOptions) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_to(element, &mut buffer, options)?;
    Ok(buffer)
}

/// Render an element to a writer.
pub fn write_to<W: Write>(element: &Element, writer: W, options: &RenderOptions) -> Result<()> {
    let mut writer = Writer::new(writer);
    if options.xml_declaration {
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    }
    let mut scopes = Vec::new();
    write_element(&mut writer, element, &mut scopes)
}

/// Prefix-to-URI bindings introduced by one element.
type Scope = Vec<(Option<String>, String)>;

fn lookup<'a>(scopes: &'a [Scope], current: &'a Scope, prefix: Option<&str>) -> Option<&'a str> {
    std::iter::once(current)
        .chain(scopes.iter().rev())
        .flat_map(|scope| scope.iter().rev())
        .find(|(p, _)| p.as_deref() == prefix)
        .map(|(_, uri)| uri.as_str())
}

/// A prefix bound to `uri` for the current element, declaring `ns1`, `ns2`, ...
/// as needed.
fn fresh_prefix(scopes: &[Scope], declared: &mut Scope, uri: &str) -> String {
    let mut n = 1;
    loop {
        let candidate = format!("ns{}", n);
        match lookup(scopes, declared, Some(&candidate)).map(|bound| bound == uri) {
            Some(true) => return candidate,
            Some(false) => n += 1,
            None => {
                declared.push((Some(candidate.clone()), uri.to_string()));
                return candidate;
            }
        }
    }
}

fn write_element<W: Write>(
    writer: &mut Writer<W>,
    element: &Element,
    scopes: &mut Vec<Scope>,
) -> Result<()> {
    let mut declared: Scope = element
        .attributes
        .iter()
        .filter_map(|a| {
            a.declared_prefix()
                .map(|prefix| (prefix.map(str::to_string), a.value.clone()))
        })
        .collect();
    let explicit = declared.len();

    match element.namespace_uri() {
        Some(uri) => {
            let prefix = element.prefix();
            if lookup(scopes, &declared, prefix) != Some(uri) {
                declared.push((prefix.map(str::to_string), uri.to_string()));
            }
        }
        None if element.prefix().is_none() => {
            if lookup(scopes, &declared, None).is_some_and(|uri| !uri.is_empty()) {
                declared.push((None, String::new()));
            }
        }
        None => {}
    }

    // A prefix can carry one binding per element. An attribute whose prefix
    // this element already binds to another URI is written under a fresh prefix.
    let mut rebound: Vec<Option<String>> = vec![None; element.attributes.len()];
    for (index, attr) in element.attributes.iter().enumerate() {
        if attr.is_namespace_declaration() {
            continue;
        }
        let (Some(uri), Some(prefix)) = (attr.namespace.as_deref(), attr.name.prefix.as_deref())
        else {
            continue;
        };
        if prefix == "xml" || lookup(scopes, &declared, Some(prefix)) == Some(uri) {
            continue;
        }
        if declared.iter().any(|(p, _)| p.as_deref() == Some(prefix)) {
            rebound[index] = Some(fresh_prefix(scopes, &mut declared, uri));
        } else {
            declared.push((Some(prefix.to_string()), uri.to_string()));
        }
    }

    let qualified = element.qualified_name();
    let mut start = BytesStart::new(qualified.as_str());
    for (prefix, uri) in &declared[explicit..] {
        let key = match prefix {
            Some(prefix) => format!("xmlns:{}", prefix),
            None => "xmlns".to_string(),
        };
        start.push_attribute((key.as_str(), uri.as_str()));
    }
    for (attr, prefix) in element.attributes.iter().zip(&rebound) {
        let key = match prefix {
            Some(prefix) => format!("{}:{}", prefix, attr.name.local),
            None => attr.name.to_string(),
        };
        start.push_attribute((key.as_str(), attr.value.as_str()));
    }

    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    scopes.push(declared);
    for child in &element.children {
        match child {
            Node::Element(e) => write_element(writer, e, scopes)?,
            Node::Text(t) => writer.write_event(Event::Text(BytesText::new(t)))?,
            Node::CData(t) => writer.write_event(Event::CData(BytesCData::new(t.as_str())))?,
            Node::Comment(t) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(t.as_str())))?
            }
        }
    }
    scopes.pop();
    writer.write_event(Event::End(BytesEnd::new(qualified.as_str())))?;
    Ok(())
}
