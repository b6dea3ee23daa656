//! Typed instances to element trees.
//!
//! Each instance is marked while it is being serialized, so an object graph
//! that reaches an instance again from inside its own subtree fails with
//! [`StructuralError::CircularReference`] instead of recursing forever.

use std::io::Write;
use std::sync::Arc;

use xmlbind_dom::{Element, RenderOptions, XML_NAMESPACE};

use crate::error::{Result, SchemaError, StructuralError};
use crate::instance::{Bindable, Children};
use crate::schema::{EffectiveSchema, MaxOccurs, ResolvedChild, Resolver, TypeRef, qualify};
use crate::value;

use super::NamespaceMap;

/// Serializes an instance to an element tree.
pub fn to_element(resolver: &Resolver, value: &dyn Bindable) -> Result<Element> {
    to_element_with(resolver, value, NamespaceMap::new())
}

/// Serializes an instance with caller-supplied prefix-to-URI overrides.
///
/// An entry in `namespaces` wins over the schema's default URI for the same
/// prefix; an instance's own namespace URI wins over both.
pub fn to_element_with(
    resolver: &Resolver,
    value: &dyn Bindable,
    namespaces: NamespaceMap,
) -> Result<Element> {
    Serializer { resolver }.instance(value, namespaces)
}

/// Serializes an instance to XML text.
///
/// # Example
///
/// ```
/// use xmlbind::{AttributeSpec, Fragment, InstanceState, Registry, Resolver, impl_bindable};
///
/// #[derive(Default)]
/// struct Point {
///     state: InstanceState,
///     x: f64,
/// }
/// impl_bindable!(Point);
///
/// let mut registry = Registry::new();
/// registry.register(
///     Fragment::<Point>::new()
///         .element("point")
///         .namespace("geo", "urn:geo")
///         .attribute(
///             "x",
///             AttributeSpec::number(),
///             |p| Some(p.x.into()),
///             |p, v| {
///                 p.x = v.try_into()?;
///                 Ok(())
///             },
///         ),
/// )?;
/// let resolver = Resolver::new(registry);
///
/// let point = Point { x: 3.0, ..Default::default() };
/// assert_eq!(
///     xmlbind::to_xml_string(&resolver, &point)?,
///     r#"<geo:point xmlns:geo="urn:geo" x="3"/>"#
/// );
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn to_xml_string(resolver: &Resolver, value: &dyn Bindable) -> Result<String> {
    to_xml_string_with(resolver, value, NamespaceMap::new(), &RenderOptions::default())
}

/// Serializes an instance to XML text with namespace overrides and render options.
pub fn to_xml_string_with(
    resolver: &Resolver,
    value: &dyn Bindable,
    namespaces: NamespaceMap,
    options: &RenderOptions,
) -> Result<String> {
    let element = to_element_with(resolver, value, namespaces)?;
    Ok(xmlbind_dom::to_string_with(&element, options)?)
}

/// Serializes an instance to UTF-8 XML bytes.
pub fn to_xml_vec(resolver: &Resolver, value: &dyn Bindable) -> Result<Vec<u8>> {
    let element = to_element(resolver, value)?;
    Ok(xmlbind_dom::to_vec(&element, &RenderOptions::default())?)
}

/// Serializes an instance as XML into `writer`.
pub fn to_xml_writer<W: Write>(resolver: &Resolver, value: &dyn Bindable, writer: W) -> Result<()> {
    let element = to_element(resolver, value)?;
    Ok(xmlbind_dom::write_to(&element, writer, &RenderOptions::default())?)
}

/// Alias of [`to_xml_string`].
pub fn render(resolver: &Resolver, value: &dyn Bindable) -> Result<String> {
    to_xml_string(resolver, value)
}

struct Serializer<'r> {
    resolver: &'r Resolver,
}

impl Serializer<'_> {
    fn instance(&self, instance: &dyn Bindable, mut namespaces: NamespaceMap) -> Result<Element> {
        let ty = TypeRef::of_instance(instance);
        let _guard = instance
            .state()
            .enter_serialization()
            .ok_or(StructuralError::CircularReference { type_name: ty.name })?;

        let schema = self.resolver.resolve(ty)?;
        tracing::debug!(type_name = ty.name, tag = %schema.tag, "serializing instance");

        if schema.raw_output {
            if let Some(source) = instance.state().source() {
                tracing::trace!(tag = %schema.tag, "emitting stored source element");
                return Ok(Element::clone(source));
            }
        }

        // Namespace. Only a schema that declares a namespace takes part in
        // inheritance; an unqualified schema keeps its instance URI to itself.
        let (prefix, uri) = match &schema.namespace {
            Some(ns) => {
                namespaces
                    .entry(ns.prefix.clone())
                    .or_insert_with(|| ns.uri.clone());
                if let Some(uri) = instance.namespace_uri() {
                    namespaces.insert(ns.prefix.clone(), uri.to_string());
                }
                (ns.prefix.as_str(), namespaces.get(&ns.prefix).cloned())
            }
            None => (
                "",
                instance
                    .namespace_uri()
                    .map(str::to_string)
                    .or_else(|| namespaces.get("").cloned()),
            ),
        };
        let mut element = match uri {
            Some(uri) => Element::new_ns(uri, &qualify(prefix, &schema.tag)),
            None => Element::new(schema.tag.clone()),
        };

        self.attributes(&schema, instance, &mut element)?;

        for binding in &schema.children {
            for child in child_list(&schema, binding, instance)? {
                element.append_child(self.instance(&*child, namespaces.clone())?);
            }
        }

        if let Some(text) = &schema.text {
            match (text.get)(instance.as_any()) {
                Some(content) => element.append_text(&content),
                None if text.required => {
                    return Err(StructuralError::MissingText {
                        element: schema.tag.clone(),
                        property: text.property.clone(),
                    }
                    .into());
                }
                None => {}
            }
        }

        Ok(element)
    }

    fn attributes(
        &self,
        schema: &EffectiveSchema,
        instance: &dyn Bindable,
        element: &mut Element,
    ) -> Result<()> {
        for binding in &schema.attributes {
            let get = match (&binding.get, binding.defined) {
                (Some(get), true) => get,
                _ => {
                    return Err(SchemaError::UndefinedBinding {
                        type_name: schema.ty.name,
                        property: binding.property.clone(),
                    }
                    .into());
                }
            };
            let Some(value) = get(instance.as_any()) else {
                continue;
            };
            let text = value::format(&binding.xml_name, binding.converter.as_ref(), &value)?;

            match &binding.namespace {
                Some(ns) if ns.prefix == "xml" => {
                    element.set_attribute_ns(XML_NAMESPACE, &ns.qualify(&binding.xml_name), text)
                }
                Some(ns) if !ns.prefix.is_empty() => {
                    element.set_attribute_ns(ns.uri.clone(), &ns.qualify(&binding.xml_name), text)
                }
                _ => element.set_attribute(binding.xml_name.clone(), text),
            }
        }
        Ok(())
    }
}

/// The children a binding holds, checked against its cardinality.
fn child_list(
    schema: &EffectiveSchema,
    binding: &ResolvedChild,
    instance: &dyn Bindable,
) -> Result<Vec<Arc<dyn Bindable>>> {
    let element = || schema.tag.clone();
    let property = || binding.property.clone();

    match (binding.get)(instance.as_any()) {
        None if binding.min > 0 => Err(StructuralError::MissingChild {
            element: element(),
            property: property(),
        }
        .into()),
        None => Ok(Vec::new()),
        Some(Children::One(child)) => {
            if !binding.max.is_single() {
                return Err(StructuralError::SingleForList {
                    element: element(),
                    property: property(),
                }
                .into());
            }
            Ok(vec![child])
        }
        Some(Children::Many(list)) => {
            if binding.max.is_single() {
                return Err(StructuralError::ListForSingular {
                    element: element(),
                    property: property(),
                }
                .into());
            }
            if list.len() < binding.min {
                return Err(StructuralError::TooFewChildren {
                    element: element(),
                    property: property(),
                    min: binding.min,
                    found: list.len(),
                }
                .into());
            }
            if let MaxOccurs::Bounded(max) = binding.max {
                if list.len() > max {
                    return Err(StructuralError::TooManyChildren {
                        element: element(),
                        property: property(),
                        max,
                        found: list.len(),
                    }
                    .into());
                }
            }
            Ok(list)
        }
    }
}
