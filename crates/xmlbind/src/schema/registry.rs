//! Fragment registry.
//!
//! Holds one [`Fragment`] per type, keyed by type identity, and enforces the
//! invariants that can be checked on a fragment in isolation.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::SchemaError;
use crate::value::AttrKind;

use super::{Fragment, FragmentData, MaxOccurs, TypeRef};

/// Registered schema fragments, keyed by type.
pub struct Registry {
    fragments: HashMap<TypeId, Arc<FragmentData>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            fragments: HashMap::new(),
        }
    }

    /// Returns the number of registered fragments.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Returns true if nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Whether a fragment for `T` has been registered.
    pub fn contains<T: 'static>(&self) -> bool {
        self.fragments.contains_key(&TypeId::of::<T>())
    }

    /// Registers the fragment for `T`.
    ///
    /// Fails if `T` already has a fragment, if a converter is combined with
    /// a non-string primitive kind, or if a child cardinality is empty or
    /// inverted.
    pub fn register<T>(&mut self, fragment: Fragment<T>) -> Result<(), SchemaError> {
        let data = fragment.data;
        if self.fragments.contains_key(&data.ty.id) {
            return Err(SchemaError::DuplicateFragment {
                type_name: data.ty.name,
            });
        }
        check_fragment(&data)?;

        tracing::debug!(
            type_name = data.ty.name,
            tag = data.element.as_ref().map(|e| e.tag.as_str()),
            attributes = data.attributes.len(),
            children = data.children.len(),
            "registered schema fragment"
        );
        self.fragments.insert(data.ty.id, Arc::new(data));
        Ok(())
    }

    pub(crate) fn get(&self, ty: TypeRef) -> Option<&Arc<FragmentData>> {
        self.fragments.get(&ty.id)
    }
}

fn check_fragment(data: &FragmentData) -> Result<(), SchemaError> {
    let invalid = |property: &str, reason: String| SchemaError::InvalidBinding {
        type_name: data.ty.name,
        property: property.to_string(),
        reason,
    };

    for binding in &data.attributes {
        if binding.spec.converter.is_some() && binding.spec.kind != AttrKind::String {
            return Err(invalid(
                &binding.property,
                format!(
                    "a converter cannot be combined with the {:?} kind",
                    binding.spec.kind
                ),
            ));
        }
    }

    for binding in &data.children {
        match binding.spec.max {
            MaxOccurs::Bounded(0) => {
                return Err(invalid(
                    &binding.property,
                    "maximum occurrences must be at least 1".to_string(),
                ));
            }
            MaxOccurs::Bounded(max) if binding.spec.min > max => {
                return Err(invalid(
                    &binding.property,
                    format!("minimum {} exceeds maximum {}", binding.spec.min, max),
                ));
            }
            _ => {}
        }
    }

    Ok(())
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field(
                "types",
                &self.fragments.values().map(|d| d.ty.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{Children, InstanceState};
    use crate::schema::{AttributeSpec, ChildSpec};
    use crate::value::{Converter, Value};
    use std::sync::Arc;

    #[derive(Default)]
    struct Item {
        state: InstanceState,
        size: f64,
    }
    crate::impl_bindable!(Item);

    #[derive(Default)]
    struct Bag {
        state: InstanceState,
        items: Vec<Arc<Item>>,
    }
    crate::impl_bindable!(Bag);

    #[test]
    fn test_register_and_duplicate() {
        let mut registry = Registry::new();
        assert!(registry.is_empty());
        registry
            .register(Fragment::<Item>::new().element("item"))
            .unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains::<Item>());
        assert!(!registry.contains::<Bag>());

        let err = registry
            .register(Fragment::<Item>::new().element("other"))
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateFragment { .. }));
    }

    #[test]
    fn test_converter_requires_string_kind() {
        let conv = Converter::new(|raw| Ok(Value::from(raw)), |v| Ok(format!("{:?}", v)));
        let fragment = Fragment::<Item>::new().element("item").attribute(
            "size",
            AttributeSpec::number().converter(conv),
            |i| Some(i.size.into()),
            |i, v| {
                i.size = v.try_into()?;
                Ok(())
            },
        );
        let err = Registry::new().register(fragment).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::InvalidBinding { ref property, .. } if property == "size"
        ));
    }

    #[test]
    fn test_inverted_cardinality_rejected() {
        let fragment = |spec: ChildSpec| {
            Fragment::<Bag>::new().element("bag").child(
                "items",
                spec,
                |b: &Bag| Children::many(&b.items),
                |b, c| b.items = c.into_vec(),
            )
        };
        assert!(Registry::new().register(fragment(ChildSpec::range(3, 2))).is_err());
        assert!(Registry::new().register(fragment(ChildSpec::range(0, 0))).is_err());
        assert!(Registry::new().register(fragment(ChildSpec::range(2, 2))).is_ok());
        assert!(Registry::new().register(fragment(ChildSpec::at_least(5))).is_ok());
    }
}
