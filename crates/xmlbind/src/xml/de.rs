//! Element tree to typed instances.
//!
//! One call handles one element and recurses into the children that match
//! a child binding. Per element the order is fixed: attributes, namespace,
//! children, text, child cardinality, required attributes, source node,
//! post-deserialization hook. The first failure aborts the whole call.

use std::collections::HashSet;
use std::io::BufRead;
use std::sync::Arc;

use xmlbind_dom::Element;

use crate::error::{ConversionError, Error, Result, SchemaError, StructuralError, ValidationError};
use crate::instance::{Bindable, Children};
use crate::schema::{MaxOccurs, Resolver, TypeRef};
use crate::value;

/// Deserializes a `T` from XML text.
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
/// registry.register(Fragment::<Point>::new().element("point").attribute(
///     "x",
///     AttributeSpec::number(),
///     |p| Some(p.x.into()),
///     |p, v| {
///         p.x = v.try_into()?;
///         Ok(())
///     },
/// ))?;
/// let resolver = Resolver::new(registry);
///
/// let point: Point = xmlbind::from_xml_str(&resolver, r#"<point x="2.5"/>"#)?;
/// assert_eq!(point.x, 2.5);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn from_xml_str<T: Bindable>(resolver: &Resolver, xml: &str) -> Result<T> {
    from_element(resolver, &xmlbind_dom::parse_str(xml)?)
}

/// Deserializes a `T` from UTF-8 XML bytes.
pub fn from_xml_slice<T: Bindable>(resolver: &Resolver, xml: &[u8]) -> Result<T> {
    from_element(resolver, &xmlbind_dom::parse_slice(xml)?)
}

/// Deserializes a `T` from a buffered reader.
pub fn from_xml_reader<T: Bindable, R: BufRead>(resolver: &Resolver, reader: R) -> Result<T> {
    from_element(resolver, &xmlbind_dom::parse_reader(reader)?)
}

/// Deserializes a `T` from an already parsed element.
pub fn from_element<T: Bindable>(resolver: &Resolver, node: &Element) -> Result<T> {
    let ty = TypeRef::of::<T>();
    let instance = deserialize_element(resolver, ty, node)?;
    match instance.into_any().downcast::<T>() {
        Ok(instance) => Ok(*instance),
        Err(_) => Err(Error::Type {
            type_name: ty.name,
            property: node.local_name().to_string(),
            message: "the registered allocator produced a different type".to_string(),
        }),
    }
}

/// Deserializes an instance of the type identified by `ty` from XML text.
pub fn deserialize(resolver: &Resolver, ty: TypeRef, xml: &str) -> Result<Box<dyn Bindable>> {
    deserialize_element(resolver, ty, &xmlbind_dom::parse_str(xml)?)
}

/// Deserializes an instance of the type identified by `ty` from an element.
///
/// A root element whose local name differs from the type's tag is accepted
/// and logged; the caller chose the type.
pub fn deserialize_element(
    resolver: &Resolver,
    ty: TypeRef,
    node: &Element,
) -> Result<Box<dyn Bindable>> {
    let schema = resolver.resolve(ty)?;
    if node.local_name() != schema.tag {
        tracing::warn!(
            type_name = ty.name,
            expected = %schema.tag,
            found = node.local_name(),
            "root element does not match the requested type"
        );
    }
    Deserializer { resolver }.element(ty, node)
}

struct Deserializer<'r> {
    resolver: &'r Resolver,
}

impl Deserializer<'_> {
    fn element(&self, ty: TypeRef, node: &Element) -> Result<Box<dyn Bindable>> {
        let schema = self.resolver.resolve(ty)?;
        tracing::debug!(type_name = ty.name, tag = %schema.tag, "deserializing element");

        let mut boxed = (schema.factory)();
        let instance: &mut dyn Bindable = &mut *boxed;

        // Attributes
        let mut observed = HashSet::new();
        for attr in &node.attributes {
            if attr.is_namespace_declaration() {
                continue;
            }
            let name = attr.name.local.as_str();
            let Some(binding) = schema.attribute(name) else {
                tracing::trace!(
                    tag = %schema.tag,
                    attribute = %attr.name,
                    "skipping unknown attribute"
                );
                continue;
            };
            if !observed.insert(binding.xml_name.as_str()) {
                return Err(StructuralError::DuplicateAttribute {
                    element: schema.tag.clone(),
                    attribute: binding.xml_name.clone(),
                }
                .into());
            }
            let set = match (&binding.set, binding.defined) {
                (Some(set), true) => set,
                _ => {
                    return Err(SchemaError::UndefinedBinding {
                        type_name: ty.name,
                        property: binding.property.clone(),
                    }
                    .into());
                }
            };

            let value = value::coerce(
                &binding.xml_name,
                &binding.kind,
                binding.converter.as_ref(),
                &attr.value,
            )?;
            value::validate(&binding.xml_name, &binding.validators, &value)?;
            set(instance.as_any_mut(), value).map_err(|source| ConversionError::Assign {
                attribute: binding.xml_name.clone(),
                source,
            })?;
        }

        // Namespace
        instance
            .state_mut()
            .set_namespace(node.namespace_uri().map(str::to_string));

        // Children
        let tags = schema
            .children
            .iter()
            .map(|binding| -> Result<String> {
                Ok(self.resolver.resolve(binding.target)?.tag.clone())
            })
            .collect::<Result<Vec<_>>>()?;
        let mut collected: Vec<Vec<Arc<dyn Bindable>>> = vec![Vec::new(); tags.len()];
        for child in node.child_elements() {
            let Some(index) = tags.iter().position(|tag| tag == child.local_name()) else {
                tracing::trace!(tag = %schema.tag, child = %child.name, "skipping unknown element");
                continue;
            };
            let target = schema.children[index].target;
            collected[index].push(Arc::from(self.element(target, child)?));
        }

        // Text
        if let Some(text) = &schema.text {
            let content = node.text_content();
            let trimmed = content.trim();
            if !trimmed.is_empty() {
                (text.set)(instance.as_any_mut(), trimmed.to_string()).map_err(|e| Error::Type {
                    type_name: ty.name,
                    property: text.property.clone(),
                    message: e.to_string(),
                })?;
            } else if text.required {
                return Err(StructuralError::MissingText {
                    element: schema.tag.clone(),
                    property: text.property.clone(),
                }
                .into());
            }
        }

        // Cardinality
        for (binding, mut found) in schema.children.iter().zip(collected) {
            let count = found.len();
            if count < binding.min {
                return Err(StructuralError::TooFewChildren {
                    element: schema.tag.clone(),
                    property: binding.property.clone(),
                    min: binding.min,
                    found: count,
                }
                .into());
            }
            if let MaxOccurs::Bounded(max) = binding.max {
                if count > max {
                    return Err(StructuralError::TooManyChildren {
                        element: schema.tag.clone(),
                        property: binding.property.clone(),
                        max,
                        found: count,
                    }
                    .into());
                }
            }

            let value = if binding.max.is_single() {
                match found.pop() {
                    Some(child) => Children::One(child),
                    None => continue,
                }
            } else if count == 0 {
                continue;
            } else {
                Children::Many(found)
            };
            (binding.set)(instance.as_any_mut(), value).map_err(|e| Error::Type {
                type_name: ty.name,
                property: binding.property.clone(),
                message: e.to_string(),
            })?;
        }

        // Required attributes
        if let Some(missing) = schema
            .attributes
            .iter()
            .find(|a| a.required && !observed.contains(a.xml_name.as_str()))
        {
            return Err(StructuralError::MissingAttribute {
                element: schema.tag.clone(),
                attribute: missing.xml_name.clone(),
            }
            .into());
        }

        instance.state_mut().set_source(Arc::new(node.clone()));

        if let Some(hook) = &schema.hook {
            hook(instance.as_any_mut()).map_err(|source| ValidationError::Hook {
                type_name: ty.name,
                source,
            })?;
        }

        Ok(boxed)
    }
}
