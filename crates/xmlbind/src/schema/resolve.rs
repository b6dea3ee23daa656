//! Schema resolution.
//!
//! Merges a type's own fragment with the fragments of its ancestor chain
//! into an [`EffectiveSchema`]:
//!
//! - tag, namespace, raw-output flag and allocator come from the type's own
//!   fragment only; a type without a tag is not bindable
//! - attribute and child bindings are merged subclass-wins by property
//!   identifier, independently for the two maps
//! - the text binding and post-deserialization hook are the first found
//!   walking from the subclass toward its ancestors
//!
//! Ancestor bindings are rewritten through the `extends` projections so
//! every accessor in an effective schema takes the concrete instance.

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{BoxError, SchemaError};
use crate::value::{AttrKind, Converter, Validator, Value};

use super::{
    ChildGetter, ChildSetter, Factory, FragmentData, Getter, Hook, MaxOccurs, Namespace,
    Projection, ProjectionMut, Registry, Setter, TextGetter, TextSetter, TypeRef, projection,
    projection_mut,
};
use crate::instance::{Bindable, Children};

/// One attribute binding after merging.
pub struct ResolvedAttribute {
    /// Property identifier.
    pub property: String,
    /// Attribute name on the element: explicit, generated, or the identifier.
    pub xml_name: String,
    /// Primitive kind used when there is no converter.
    pub kind: AttrKind,
    /// Whether the attribute must be present on input.
    pub required: bool,
    /// Namespace qualifying the attribute on output.
    pub namespace: Option<Namespace>,
    /// False when the property was only renamed or validated, never bound.
    pub defined: bool,
    pub(crate) converter: Option<Converter>,
    pub(crate) validators: Vec<Validator>,
    pub(crate) get: Option<Getter>,
    pub(crate) set: Option<Setter>,
}

/// One child-element binding after merging.
pub struct ResolvedChild {
    /// Property identifier.
    pub property: String,
    /// Type of the child objects.
    pub target: TypeRef,
    /// Minimum occurrences.
    pub min: usize,
    /// Maximum occurrences.
    pub max: MaxOccurs,
    pub(crate) get: ChildGetter,
    pub(crate) set: ChildSetter,
}

/// The text-content binding after merging.
pub struct ResolvedText {
    /// Property identifier.
    pub property: String,
    /// Whether text must be present on output.
    pub required: bool,
    pub(crate) get: TextGetter,
    pub(crate) set: TextSetter,
}

/// The merged binding rules of one concrete type.
pub struct EffectiveSchema {
    /// The type this schema describes.
    pub ty: TypeRef,
    /// Element tag.
    pub tag: String,
    /// Default namespace prefix and URI.
    pub namespace: Option<Namespace>,
    /// Whether the stored source element is re-emitted on output.
    pub raw_output: bool,
    /// Attribute bindings, most specific level first.
    pub attributes: Vec<ResolvedAttribute>,
    /// Child-element bindings, most specific level first.
    pub children: Vec<ResolvedChild>,
    /// Text-content binding.
    pub text: Option<ResolvedText>,
    pub(crate) hook: Option<Hook>,
    pub(crate) factory: Factory,
}

impl EffectiveSchema {
    /// Looks up an attribute binding by its XML name.
    pub fn attribute(&self, xml_name: &str) -> Option<&ResolvedAttribute> {
        self.attributes.iter().find(|a| a.xml_name == xml_name)
    }

    /// Looks up a binding by property identifier.
    pub fn attribute_for(&self, property: &str) -> Option<&ResolvedAttribute> {
        self.attributes.iter().find(|a| a.property == property)
    }

    /// Looks up a child binding by property identifier.
    pub fn child_for(&self, property: &str) -> Option<&ResolvedChild> {
        self.children.iter().find(|c| c.property == property)
    }
}

impl fmt::Debug for EffectiveSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectiveSchema")
            .field("type", &self.ty.name)
            .field("tag", &self.tag)
            .field("namespace", &self.namespace)
            .field("raw_output", &self.raw_output)
            .field(
                "attributes",
                &self
                    .attributes
                    .iter()
                    .map(|a| (&a.property, &a.xml_name))
                    .collect::<Vec<_>>(),
            )
            .field(
                "children",
                &self
                    .children
                    .iter()
                    .map(|c| (&c.property, c.target.name))
                    .collect::<Vec<_>>(),
            )
            .field("text", &self.text.as_ref().map(|t| &t.property))
            .finish()
    }
}

/// Resolves and caches effective schemas for the types of a [`Registry`].
///
/// Fragments are immutable once handed to the resolver, so each type is
/// resolved at most once and later calls share the cached result.
pub struct Resolver {
    registry: Registry,
    cache: RwLock<HashMap<TypeId, Arc<EffectiveSchema>>>,
}

impl Resolver {
    /// Creates a resolver over a fully populated registry.
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// The underlying registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Resolves the effective schema of `T`.
    pub fn resolve_type<T: Any>(&self) -> Result<Arc<EffectiveSchema>, SchemaError> {
        self.resolve(TypeRef::of::<T>())
    }

    /// Resolves the effective schema of `ty`.
    pub fn resolve(&self, ty: TypeRef) -> Result<Arc<EffectiveSchema>, SchemaError> {
        if let Some(schema) = self.cache.read().get(&ty.id) {
            tracing::trace!(type_name = ty.name, "schema served from cache");
            return Ok(Arc::clone(schema));
        }

        let schema = Arc::new(self.build(ty)?);
        tracing::debug!(type_name = ty.name, tag = %schema.tag, "resolved schema");

        let mut cache = self.cache.write();
        Ok(Arc::clone(cache.entry(ty.id).or_insert(schema)))
    }

    fn build(&self, ty: TypeRef) -> Result<EffectiveSchema, SchemaError> {
        let own = self
            .registry
            .get(ty)
            .ok_or(SchemaError::UnresolvedType { type_name: ty.name })?;
        let element = own
            .element
            .as_ref()
            .ok_or(SchemaError::MissingTag { type_name: ty.name })?;

        let levels = self.ancestor_chain(own)?;

        let mut attributes: Vec<ResolvedAttribute> = Vec::new();
        let mut children = Vec::new();
        let mut text = None;
        let mut hook = None;
        let mut seen_attributes = HashSet::new();
        let mut seen_children = HashSet::new();

        for level in &levels {
            let data = &level.data;
            for binding in &data.attributes {
                if !seen_attributes.insert(binding.property.as_str()) {
                    continue;
                }
                let xml_name = match (&binding.spec.name, &data.name_generator) {
                    (Some(name), _) => name.clone(),
                    (None, Some(generator)) => generator.generate(&binding.property),
                    (None, None) => binding.property.clone(),
                };
                attributes.push(ResolvedAttribute {
                    property: binding.property.clone(),
                    xml_name,
                    kind: binding.spec.kind.clone(),
                    required: binding.spec.required,
                    namespace: binding.spec.namespace.clone(),
                    defined: binding.defined,
                    converter: binding.spec.converter.clone(),
                    validators: binding.spec.validators.clone(),
                    get: binding.get.clone().map(|g| level.getter(g)),
                    set: binding.set.clone().map(|s| level.setter(s)),
                });
            }

            for binding in &data.children {
                if !seen_children.insert(binding.property.as_str()) {
                    continue;
                }
                children.push(ResolvedChild {
                    property: binding.property.clone(),
                    target: binding.target,
                    min: binding.spec.min,
                    max: binding.spec.max,
                    get: level.child_getter(binding.get.clone()),
                    set: level.child_setter(binding.set.clone()),
                });
            }

            if text.is_none() {
                text = data.text.as_ref().map(|t| ResolvedText {
                    property: t.property.clone(),
                    required: t.required,
                    get: level.text_getter(t.get.clone()),
                    set: level.text_setter(t.set.clone()),
                });
            }

            if hook.is_none() {
                hook = data.hook.clone().map(|h| level.hook(h));
            }
        }

        Ok(EffectiveSchema {
            ty,
            tag: element.tag.clone(),
            namespace: own.namespace.clone(),
            raw_output: own.raw_output,
            attributes,
            children,
            text,
            hook,
            factory: Arc::clone(&element.factory),
        })
    }

    /// The type's own fragment followed by each registered ancestor, each
    /// paired with the projection from the concrete type to that level.
    fn ancestor_chain(&self, own: &Arc<FragmentData>) -> Result<Vec<Level>, SchemaError> {
        let mut levels = vec![Level {
            data: Arc::clone(own),
            path: None,
        }];
        let mut visited = HashSet::from([own.ty.id]);

        loop {
            let Some(current) = levels.last() else {
                break;
            };
            let Some(link) = &current.data.parent else {
                break;
            };
            if !visited.insert(link.parent.id) {
                return Err(SchemaError::InheritanceCycle {
                    type_name: link.parent.name,
                });
            }
            let Some(data) = self.registry.get(link.parent) else {
                tracing::debug!(
                    type_name = own.ty.name,
                    ancestor = link.parent.name,
                    "ancestor has no schema fragment, ending the walk"
                );
                break;
            };

            let path = match &current.path {
                None => (Arc::clone(&link.project), Arc::clone(&link.project_mut)),
                Some((project, project_mut)) => (
                    compose(Arc::clone(project), Arc::clone(&link.project)),
                    compose_mut(Arc::clone(project_mut), Arc::clone(&link.project_mut)),
                ),
            };
            levels.push(Level {
                data: Arc::clone(data),
                path: Some(path),
            });
        }

        Ok(levels)
    }
}

impl From<Registry> for Resolver {
    fn from(registry: Registry) -> Self {
        Self::new(registry)
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("registry", &self.registry)
            .field("cached", &self.cache.read().len())
            .finish()
    }
}

fn compose(first: Projection, then: Projection) -> Projection {
    projection(move |obj| first(obj).and_then(|inner| then(inner)))
}

fn compose_mut(first: ProjectionMut, then: ProjectionMut) -> ProjectionMut {
    projection_mut(move |obj| first(obj).and_then(|inner| then(inner)))
}

fn unreachable_ancestor() -> BoxError {
    "instance does not contain the expected ancestor part".into()
}

/// One fragment in a type's chain and how to reach it from the concrete type.
struct Level {
    data: Arc<FragmentData>,
    path: Option<(Projection, ProjectionMut)>,
}

impl Level {
    fn getter(&self, get: Getter) -> Getter {
        match &self.path {
            None => get,
            Some((project, _)) => {
                let project = Arc::clone(project);
                Arc::new(move |obj: &dyn Any| project(obj).and_then(|part| get(part)))
            }
        }
    }

    fn setter(&self, set: Setter) -> Setter {
        match &self.path {
            None => set,
            Some((_, project_mut)) => {
                let project_mut = Arc::clone(project_mut);
                Arc::new(move |obj: &mut dyn Any, value: Value| {
                    let part = project_mut(obj).ok_or_else(unreachable_ancestor)?;
                    set(part, value)
                })
            }
        }
    }

    fn child_getter(&self, get: ChildGetter) -> ChildGetter {
        match &self.path {
            None => get,
            Some((project, _)) => {
                let project = Arc::clone(project);
                Arc::new(move |obj: &dyn Any| project(obj).and_then(|part| get(part)))
            }
        }
    }

    fn child_setter(&self, set: ChildSetter) -> ChildSetter {
        match &self.path {
            None => set,
            Some((_, project_mut)) => {
                let project_mut = Arc::clone(project_mut);
                Arc::new(move |obj: &mut dyn Any, children: Children<dyn Bindable>| {
                    let part = project_mut(obj).ok_or_else(unreachable_ancestor)?;
                    set(part, children)
                })
            }
        }
    }

    fn text_getter(&self, get: TextGetter) -> TextGetter {
        match &self.path {
            None => get,
            Some((project, _)) => {
                let project = Arc::clone(project);
                Arc::new(move |obj: &dyn Any| project(obj).and_then(|part| get(part)))
            }
        }
    }

    fn text_setter(&self, set: TextSetter) -> TextSetter {
        match &self.path {
            None => set,
            Some((_, project_mut)) => {
                let project_mut = Arc::clone(project_mut);
                Arc::new(move |obj: &mut dyn Any, text: String| {
                    let part = project_mut(obj).ok_or_else(unreachable_ancestor)?;
                    set(part, text)
                })
            }
        }
    }

    fn hook(&self, hook: Hook) -> Hook {
        match &self.path {
            None => hook,
            Some((_, project_mut)) => {
                let project_mut = Arc::clone(project_mut);
                Arc::new(move |obj: &mut dyn Any| {
                    let part = project_mut(obj).ok_or_else(unreachable_ancestor)?;
                    hook(part)
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::InstanceState;
    use crate::naming::NameGenerator;
    use crate::schema::{AttributeSpec, ChildSpec, Fragment};

    #[derive(Default)]
    struct Base {
        state: InstanceState,
        id: String,
        label: String,
        note: String,
    }
    crate::impl_bindable!(Base);

    #[derive(Default)]
    struct Derived {
        base: Base,
        label: String,
        max_size: f64,
    }
    crate::impl_bindable!(Derived => base.state);

    #[derive(Default)]
    struct Leaf {
        derived: Derived,
    }
    crate::impl_bindable!(Leaf => derived.base.state);

    fn string_attr<T: Send + Sync + 'static>(
        fragment: Fragment<T>,
        property: &str,
        field: fn(&T) -> &String,
        field_mut: fn(&mut T) -> &mut String,
    ) -> Fragment<T>
    where
        T: std::any::Any,
    {
        fragment.attribute(
            property,
            AttributeSpec::string(),
            move |t| Some(field(t).clone().into()),
            move |t, v| {
                *field_mut(t) = v.try_into()?;
                Ok(())
            },
        )
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();

        let base = Fragment::<Base>::new()
            .element("base")
            .namespace("b", "urn:base")
            .attribute_names(NameGenerator::prefixed("b-"));
        let base = string_attr(base, "id", |b| &b.id, |b| &mut b.id);
        let base = string_attr(base, "label", |b| &b.label, |b| &mut b.label);
        let base = string_attr(base, "note", |b| &b.note, |b| &mut b.note).text(
            "note",
            false,
            |b| Some(b.note.clone()),
            |b, t| b.note = t,
        );
        registry.register(base).unwrap();

        let derived = Fragment::<Derived>::new()
            .element("derived")
            .extends(|d: &Derived| &d.base, |d: &mut Derived| &mut d.base)
            .attribute_names(NameGenerator::kebab_case())
            .attribute(
                "max_size",
                AttributeSpec::number(),
                |d| Some(d.max_size.into()),
                |d, v| {
                    d.max_size = v.try_into()?;
                    Ok(())
                },
            );
        let derived = string_attr(derived, "label", |d| &d.label, |d| &mut d.label);
        registry.register(derived).unwrap();

        registry
            .register(
                Fragment::<Leaf>::new()
                    .element("leaf")
                    .extends(|l: &Leaf| &l.derived, |l: &mut Leaf| &mut l.derived),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_subclass_wins_by_property() {
        let resolver = Resolver::new(registry());
        let schema = resolver.resolve_type::<Derived>().unwrap();

        assert_eq!(schema.tag, "derived");
        assert_eq!(schema.namespace, None);
        let properties: Vec<_> = schema.attributes.iter().map(|a| a.property.as_str()).collect();
        assert_eq!(properties, ["max_size", "label", "id", "note"]);

        // each level names its own bindings
        assert_eq!(schema.attribute_for("max_size").unwrap().xml_name, "max-size");
        assert_eq!(schema.attribute_for("label").unwrap().xml_name, "label");
        assert_eq!(schema.attribute_for("id").unwrap().xml_name, "b-id");

        let mut d = Derived::default();
        let label = schema.attribute_for("label").unwrap();
        (label.set.as_ref().unwrap())(&mut d, Value::from("sub")).unwrap();
        assert_eq!(d.label, "sub");
        assert_eq!(d.base.label, "");
    }

    #[test]
    fn test_ancestor_accessors_are_composed() {
        let resolver = Resolver::new(registry());
        let schema = resolver.resolve_type::<Leaf>().unwrap();
        assert_eq!(schema.tag, "leaf");

        let mut leaf = Leaf::default();
        let id = schema.attribute_for("id").unwrap();
        (id.set.as_ref().unwrap())(&mut leaf, Value::from("x1")).unwrap();
        assert_eq!(leaf.derived.base.id, "x1");
        assert_eq!(
            (id.get.as_ref().unwrap())(&leaf),
            Some(Value::from("x1"))
        );

        let text = schema.text.as_ref().unwrap();
        assert_eq!(text.property, "note");
        (text.set)(&mut leaf, "hello".to_string()).unwrap();
        assert_eq!(leaf.derived.base.note, "hello");
    }

    #[test]
    fn test_tag_is_not_inherited() {
        #[derive(Default)]
        struct Plain {
            base: Base,
        }
        crate::impl_bindable!(Plain => base.state);

        let mut registry = registry();
        registry
            .register(
                Fragment::<Plain>::new()
                    .extends(|p: &Plain| &p.base, |p: &mut Plain| &mut p.base),
            )
            .unwrap();
        let resolver = Resolver::new(registry);

        let err = resolver.resolve_type::<Plain>().unwrap_err();
        assert!(matches!(err, SchemaError::MissingTag { .. }));

        let err = resolver.resolve_type::<String>().unwrap_err();
        assert!(matches!(err, SchemaError::UnresolvedType { .. }));
    }

    #[test]
    fn test_cache_returns_same_schema() {
        let resolver = Resolver::new(registry());
        let first = resolver.resolve_type::<Derived>().unwrap();
        let second = resolver.resolve_type::<Derived>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_inheritance_cycle() {
        #[derive(Default)]
        struct A {
            state: InstanceState,
            b: B,
        }
        crate::impl_bindable!(A);

        #[derive(Default)]
        struct B {
            state: InstanceState,
        }
        crate::impl_bindable!(B);

        let mut registry = Registry::new();
        registry
            .register(Fragment::<A>::new().element("a").extends(|a: &A| &a.b, |a: &mut A| &mut a.b))
            .unwrap();
        registry
            .register(
                Fragment::<B>::new()
                    .element("b")
                    .extends::<A, _, _>(|_| unreachable!(), |_| unreachable!()),
            )
            .unwrap();

        let err = Resolver::new(registry).resolve_type::<A>().unwrap_err();
        assert!(matches!(err, SchemaError::InheritanceCycle { .. }));
    }

    #[test]
    fn test_child_override_and_placeholder() {
        #[derive(Default)]
        struct Holder {
            state: InstanceState,
            items: Vec<Arc<Base>>,
        }
        crate::impl_bindable!(Holder);

        #[derive(Default)]
        struct Narrow {
            holder: Holder,
            only: Option<Arc<Derived>>,
        }
        crate::impl_bindable!(Narrow => holder.state);

        let mut registry = registry();
        registry
            .register(
                Fragment::<Holder>::new()
                    .element("holder")
                    .child(
                        "items",
                        ChildSpec::many(),
                        |h: &Holder| Children::many(&h.items),
                        |h, c| h.items = c.into_vec(),
                    )
                    .rename_attribute("ghost", "g"),
            )
            .unwrap();
        registry
            .register(
                Fragment::<Narrow>::new()
                    .element("narrow")
                    .extends(|n: &Narrow| &n.holder, |n: &mut Narrow| &mut n.holder)
                    .child(
                        "items",
                        ChildSpec::optional(),
                        |n: &Narrow| Children::optional(&n.only),
                        |n, c| n.only = c.into_first(),
                    ),
            )
            .unwrap();
        let resolver = Resolver::new(registry);

        let schema = resolver.resolve_type::<Narrow>().unwrap();
        assert_eq!(schema.children.len(), 1);
        let items = schema.child_for("items").unwrap();
        assert_eq!(items.target, TypeRef::of::<Derived>());
        assert_eq!(items.max, MaxOccurs::Bounded(1));

        let ghost = schema.attribute("g").unwrap();
        assert!(!ghost.defined);
        assert!(ghost.get.is_none());
    }
}
