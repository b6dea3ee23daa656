//! Namespace-aware parsing of XML text into an [`Element`] tree.

use crate::error::{DomError, Result};
use crate::node::{Element, QName, XML_NAMESPACE, XMLNS_NAMESPACE};
use quick_xml::NsReader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use std::io::BufRead;

/// Parse the document element of an XML string.
///
/// # Examples
///
/// ```
/// let root = xmlbind_dom::parse_str(r#"<a xmlns="urn:x"><b>hi</b></a>"#)?;
/// assert_eq!(root.local_name(), "a");
/// assert_eq!(root.namespace_uri(), Some("urn:x"));
/// assert_eq!(root.text_content(), "hi");
/// # Ok::<(), xmlbind_dom::DomError>(())
/// ```
pub fn parse_str(xml: &str) -> Result<Element> {
    parse_reader(xml.as_bytes())
}

/// Parse the document element of XML bytes.
pub fn parse_slice(xml: &[u8]) -> Result<Element> {
    parse_reader(xml)
}

/// Parse the document element from a buffered reader.
pub fn parse_reader<R: BufRead>(input: R) -> Result<Element> {
    let mut reader = NsReader::from_reader(input);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        buf.clear();
        let (resolved, event) = reader.read_resolved_event_into(&mut buf)?;
        let namespace = owned_namespace(resolved);

        match event {
            Event::Start(start) => {
                let element = build_element(&reader, &start, namespace?)?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = build_element(&reader, &start, namespace?)?;
                attach(&mut stack, &mut root, element);
            }
            Event::End(end) => {
                let element = stack.pop().ok_or_else(|| {
                    let name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                    DomError::UnbalancedEndTag(name)
                })?;
                attach(&mut stack, &mut root, element);
            }
            Event::Text(text) => {
                if let Some(parent) = stack.last_mut() {
                    let decoded = text
                        .decode()
                        .map_err(|e| DomError::Encoding(e.to_string()))?;
                    parent.append_text(&decoded);
                }
            }
            Event::GeneralRef(reference) => {
                if let Some(parent) = stack.last_mut() {
                    if let Some(ch) = reference.resolve_char_ref()? {
                        let mut tmp = [0u8; 4];
                        parent.append_text(ch.encode_utf8(&mut tmp));
                    } else {
                        let name = reference
                            .decode()
                            .map_err(|e| DomError::Encoding(e.to_string()))?;
                        let value = resolve_predefined_entity(&name)
                            .ok_or_else(|| DomError::UnknownEntity(name.to_string()))?;
                        parent.append_text(value);
                    }
                }
            }
            Event::CData(data) => {
                if let Some(parent) = stack.last_mut() {
                    parent.append_child(crate::Node::CData(
                        String::from_utf8_lossy(&data).into_owned(),
                    ));
                }
            }
            Event::Comment(comment) => {
                if let Some(parent) = stack.last_mut() {
                    parent.append_child(crate::Node::Comment(
                        String::from_utf8_lossy(&comment).into_owned(),
                    ));
                }
            }
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => {
                if let Some(open) = stack.last() {
                    return Err(DomError::UnexpectedEof(open.qualified_name()));
                }
                break;
            }
        }
    }

    root.ok_or(DomError::NoRootElement)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.append_child(element),
        None if root.is_none() => *root = Some(element),
        None => {
            tracing::warn!(
                element = %element.qualified_name(),
                "ignoring element after the document element"
            );
        }
    }
}

fn owned_namespace(resolved: ResolveResult<'_>) -> Result<Option<String>> {
    match resolved {
        ResolveResult::Bound(ns) => {
            let uri = decode_name(ns.as_ref())?;
            Ok(if uri.is_empty() { None } else { Some(uri) })
        }
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(DomError::UnboundPrefix(
            String::from_utf8_lossy(&prefix).into_owned(),
        )),
    }
}

fn build_element<R>(
    reader: &NsReader<R>,
    start: &BytesStart<'_>,
    namespace: Option<String>,
) -> Result<Element> {
    let name = decode_name(start.name().as_ref())?;
    let mut element = Element {
        name: QName::parse(&name),
        namespace,
        attributes: Vec::new(),
        children: Vec::new(),
    };

    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let name = QName::parse(&decode_name(attr.key.as_ref())?);
        let namespace = if name.is_namespace_declaration() {
            Some(XMLNS_NAMESPACE.to_string())
        } else {
            match name.prefix.as_deref() {
                None => None,
                Some("xml") => Some(XML_NAMESPACE.to_string()),
                Some(_) => {
                    let (resolved, _) = reader.resolve_attribute(attr.key);
                    owned_namespace(resolved)?
                }
            }
        };
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push(crate::Attribute {
            name,
            namespace,
            value,
        });
    }

    Ok(element)
}

fn decode_name(bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| DomError::Encoding(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Node;

    #[test]
    fn resolves_element_namespaces() {
        let root = parse_str(
            r#"<myns:root xmlns:myns="http://foo.bar"><myns:child/><plain/></myns:root>"#,
        )
        .unwrap();
        assert_eq!(root.prefix(), Some("myns"));
        assert_eq!(root.local_name(), "root");
        assert_eq!(root.namespace_uri(), Some("http://foo.bar"));

        let children: Vec<_> = root.child_elements().collect();
        assert_eq!(children[0].namespace_uri(), Some("http://foo.bar"));
        assert_eq!(children[1].namespace_uri(), None);
    }

    #[test]
    fn default_namespace_applies_to_elements_not_attributes() {
        let root = parse_str(r#"<a xmlns="urn:a" x="1"/>"#).unwrap();
        assert_eq!(root.namespace_uri(), Some("urn:a"));
        let x = root.attributes.iter().find(|a| a.name.local == "x").unwrap();
        assert_eq!(x.namespace, None);
        assert!(root.attributes.iter().any(|a| a.is_namespace_declaration()));
    }

    #[test]
    fn resolves_prefixed_attributes() {
        let root =
            parse_str(r#"<a xmlns:p="urn:p" p:x="1" xml:lang="en"/>"#).unwrap();
        assert_eq!(root.attribute_ns("urn:p", "x"), Some("1"));
        assert_eq!(root.attribute_ns(XML_NAMESPACE, "lang"), Some("en"));
    }

    #[test]
    fn unescapes_text_and_attributes() {
        let root = parse_str(r#"<a v="x &amp; y">1 &lt; 2 &#65;</a>"#).unwrap();
        assert_eq!(root.attribute("v"), Some("x & y"));
        assert_eq!(root.children, vec![Node::Text("1 < 2 A".into())]);
    }

    #[test]
    fn keeps_whitespace_text() {
        let root = parse_str("<a>\n  <b/>\n</a>").unwrap();
        assert_eq!(root.children.len(), 3);
        assert!(root.children[0].is_text());
    }

    #[test]
    fn empty_document_has_no_root() {
        assert!(matches!(
            parse_str("<?xml version=\"1.0\"?>"),
            Err(DomError::NoRootElement)
        ));
    }

    #[test]
    fn unclosed_element_is_an_error() {
        assert!(parse_str("<a><b></b>").is_err());
    }

    #[test]
    fn unbound_prefix_is_an_error() {
        assert!(parse_str("<x:a/>").is_err());
    }
}
