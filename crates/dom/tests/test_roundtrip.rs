use std::io::BufReader;

use xmlbind_dom::{
    DomError, Element, Node, RenderOptions, XML_NAMESPACE, parse_reader, parse_str, to_string,
    to_string_with,
};

fn assert_round_trip(xml: &str) {
    let root = parse_str(xml).unwrap();
    assert_eq!(to_string(&root).unwrap(), xml);
}

#[test]
fn test_namespaced_document_round_trips() {
    assert_round_trip(
        r#"<r xmlns="urn:a" xmlns:b="urn:b"><b:x b:y="1"/><z/><b:x xmlns:b="urn:c"/></r>"#,
    );
}

#[test]
fn test_mixed_content_round_trips() {
    assert_round_trip("<a>x &amp; y<!--c--><![CDATA[<raw>]]><b>in</b> tail</a>");
}

#[test]
fn test_escaped_attribute_round_trips() {
    let root = parse_str(r#"<a v="&lt;&amp;&quot;"/>"#).unwrap();
    assert_eq!(root.attribute("v"), Some(r#"<&""#));
    assert_eq!(to_string(&root).unwrap(), r#"<a v="&lt;&amp;&quot;"/>"#);
}

#[test]
fn test_prolog_is_skipped() {
    let root = parse_str(
        "<?xml version=\"1.0\"?>\n<!-- lead -->\n<?app data?>\n<!DOCTYPE a>\n<a/>",
    )
    .unwrap();
    assert_eq!(root, Element::new("a"));
}

#[test]
fn test_reader_input() {
    let xml = r#"<p:a xmlns:p="urn:p"><b xml:lang="en">hi</b></p:a>"#;
    let root = parse_reader(BufReader::new(xml.as_bytes())).unwrap();
    assert_eq!(root.namespace_uri(), Some("urn:p"));

    let b = root.child_elements().next().unwrap();
    assert_eq!(b.namespace_uri(), None);
    assert_eq!(b.attribute_ns(XML_NAMESPACE, "lang"), Some("en"));
    assert_eq!(root.text_content(), "hi");
}

#[test]
fn test_built_tree_declares_namespaces_where_needed() {
    let mut root = Element::new_ns("urn:a", "a:root");
    let mut child = Element::new_ns("urn:a", "a:child");
    child.set_attribute_ns("urn:b", "b:flag", "on");
    child.append_child(Element::new_ns("urn:b", "b:leaf"));
    root.append_child(child);
    root.append_child(Element::new_ns("urn:d", "item"));

    assert_eq!(
        to_string(&root).unwrap(),
        concat!(
            r#"<a:root xmlns:a="urn:a">"#,
            r#"<a:child xmlns:b="urn:b" b:flag="on"><b:leaf/></a:child>"#,
            r#"<item xmlns="urn:d"/>"#,
            "</a:root>"
        )
    );
}

#[test]
fn test_render_with_declaration() {
    let root = Element::new("a").with_text("x");
    assert_eq!(
        to_string_with(&root, &RenderOptions::with_declaration()).unwrap(),
        r#"<?xml version="1.0" encoding="UTF-8"?><a>x</a>"#
    );
}

#[test]
fn test_text_nodes_merge() {
    let root = Element::new("a").with_text("one").with_text(" two");
    assert_eq!(root.children, vec![Node::Text("one two".to_string())]);
}

#[test]
fn test_parse_errors() {
    assert!(matches!(parse_str(""), Err(DomError::NoRootElement)));
    assert!(parse_str("<a>").is_err());
    assert!(matches!(
        parse_str("<a>&bogus;</a>"),
        Err(DomError::UnknownEntity(name)) if name == "bogus"
    ));
    assert!(matches!(
        parse_str("<p:a/>"),
        Err(DomError::UnboundPrefix(prefix)) if prefix == "p"
    ));
    assert!(parse_str("<a></b>").is_err());
}
