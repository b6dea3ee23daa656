//! Schema fragments: per-type declarations of how a Rust type maps to XML.
//!
//! A [`Fragment`] is built for one type and registered in a
//! [`Registry`]. Fragments are not inherited wholesale: the element tag,
//! namespace and raw-output flag apply only to the type that declares them,
//! while attribute, child and text bindings flow down to types that
//! [`extends`](Fragment::extends) it, subject to subclass-wins overriding by
//! property identifier (see [`Resolver`]).
//!
//! Property access goes through accessor closures captured at registration,
//! so the engine never looks fields up by name at runtime.
//!
//! ```
//! use std::sync::Arc;
//! use xmlbind::{AttributeSpec, ChildSpec, Children, Fragment, InstanceState, Registry, impl_bindable};
//!
//! #[derive(Default)]
//! struct Book {
//!     state: InstanceState,
//!     title: String,
//! }
//! impl_bindable!(Book);
//!
//! #[derive(Default)]
//! struct Shelf {
//!     state: InstanceState,
//!     books: Vec<Arc<Book>>,
//! }
//! impl_bindable!(Shelf);
//!
//! let mut registry = Registry::new();
//! registry.register(
//!     Fragment::<Book>::new().element("book").attribute(
//!         "title",
//!         AttributeSpec::string().required(),
//!         |b| Some(b.title.clone().into()),
//!         |b, v| {
//!             b.title = v.try_into()?;
//!             Ok(())
//!         },
//!     ),
//! )?;
//! registry.register(Fragment::<Shelf>::new().element("shelf").child(
//!     "books",
//!     ChildSpec::many(),
//!     |s: &Shelf| Children::many(&s.books),
//!     |s, c| s.books = c.into_vec(),
//! ))?;
//! # Ok::<(), xmlbind::SchemaError>(())
//! ```

mod registry;
mod resolve;

pub use registry::Registry;
pub use resolve::{EffectiveSchema, ResolvedAttribute, ResolvedChild, ResolvedText, Resolver};

use crate::error::BoxError;
use crate::instance::{Bindable, Children};
use crate::naming::NameGenerator;
use crate::value::{AttrKind, Converter, Validator, Value};
use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Identity of a registered type.
#[derive(Debug, Clone, Copy)]
pub struct TypeRef {
    /// The type's identity.
    pub id: TypeId,
    /// The type's name, for diagnostics.
    pub name: &'static str,
}

impl TypeRef {
    /// The reference for `T`.
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The reference for the concrete type behind a trait object.
    pub fn of_instance(instance: &dyn Bindable) -> Self {
        Self {
            id: instance.type_key(),
            name: instance.type_name(),
        }
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeRef {}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A namespace prefix and URI. An empty prefix is the default namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    /// The prefix, or `""` for the default namespace.
    pub prefix: String,
    /// The namespace URI.
    pub uri: String,
}

impl Namespace {
    /// Creates a prefix binding.
    pub fn new(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            uri: uri.into(),
        }
    }

    /// `prefix:local`, or just `local` for the default namespace.
    pub fn qualify(&self, local: &str) -> String {
        qualify(&self.prefix, local)
    }
}

pub(crate) fn qualify(prefix: &str, local: &str) -> String {
    if prefix.is_empty() {
        local.to_string()
    } else {
        format!("{}:{}", prefix, local)
    }
}

/// How an attribute binding is typed, named and checked.
#[derive(Debug, Clone, Default)]
pub struct AttributeSpec {
    pub(crate) name: Option<String>,
    pub(crate) kind: AttrKind,
    pub(crate) required: bool,
    pub(crate) converter: Option<Converter>,
    pub(crate) validators: Vec<Validator>,
    pub(crate) namespace: Option<Namespace>,
}

impl AttributeSpec {
    /// A verbatim string attribute.
    pub fn string() -> Self {
        Self::default()
    }

    /// A boolean attribute.
    pub fn boolean() -> Self {
        Self {
            kind: AttrKind::Boolean,
            ..Self::default()
        }
    }

    /// A numeric attribute.
    pub fn number() -> Self {
        Self {
            kind: AttrKind::Number,
            ..Self::default()
        }
    }

    /// An attribute restricted to the given members.
    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: AttrKind::enumeration(values),
            ..Self::default()
        }
    }

    /// An attribute converted by `converter`.
    pub fn custom(converter: Converter) -> Self {
        Self {
            converter: Some(converter),
            ..Self::default()
        }
    }

    /// Sets the primitive kind.
    pub fn kind(mut self, kind: AttrKind) -> Self {
        self.kind = kind;
        self
    }

    /// Uses an explicit XML attribute name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Marks the attribute as required on input.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the converter.
    pub fn converter(mut self, converter: Converter) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Appends a validator; validators run in the order added.
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Qualifies the attribute with a namespace.
    pub fn namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespace = Some(Namespace::new(prefix, uri));
        self
    }
}

/// Upper bound on the occurrences of a child element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxOccurs {
    /// At most this many.
    Bounded(usize),
    /// Any number.
    Unbounded,
}

impl MaxOccurs {
    /// Whether `count` exceeds the bound.
    pub fn exceeded_by(self, count: usize) -> bool {
        matches!(self, MaxOccurs::Bounded(max) if count > max)
    }

    /// Whether this is exactly one.
    pub fn is_single(self) -> bool {
        self == MaxOccurs::Bounded(1)
    }
}

/// Cardinality of a child-element binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildSpec {
    /// Minimum occurrences.
    pub min: usize,
    /// Maximum occurrences.
    pub max: MaxOccurs,
}

impl Default for ChildSpec {
    fn default() -> Self {
        Self::one()
    }
}

impl ChildSpec {
    /// Exactly one.
    pub fn one() -> Self {
        Self {
            min: 1,
            max: MaxOccurs::Bounded(1),
        }
    }

    /// Zero or one.
    pub fn optional() -> Self {
        Self {
            min: 0,
            max: MaxOccurs::Bounded(1),
        }
    }

    /// Zero or more.
    pub fn many() -> Self {
        Self {
            min: 0,
            max: MaxOccurs::Unbounded,
        }
    }

    /// `min` or more.
    pub fn at_least(min: usize) -> Self {
        Self {
            min,
            max: MaxOccurs::Unbounded,
        }
    }

    /// Between `min` and `max` inclusive.
    pub fn range(min: usize, max: usize) -> Self {
        Self {
            min,
            max: MaxOccurs::Bounded(max),
        }
    }
}

pub(crate) type Getter = Arc<dyn Fn(&dyn Any) -> Option<Value> + Send + Sync>;
pub(crate) type Setter = Arc<dyn Fn(&mut dyn Any, Value) -> Result<(), BoxError> + Send + Sync>;
pub(crate) type ChildGetter =
    Arc<dyn Fn(&dyn Any) -> Option<Children<dyn Bindable>> + Send + Sync>;
pub(crate) type ChildSetter =
    Arc<dyn Fn(&mut dyn Any, Children<dyn Bindable>) -> Result<(), BoxError> + Send + Sync>;
pub(crate) type TextGetter = Arc<dyn Fn(&dyn Any) -> Option<String> + Send + Sync>;
pub(crate) type TextSetter =
    Arc<dyn Fn(&mut dyn Any, String) -> Result<(), BoxError> + Send + Sync>;
pub(crate) type Hook = Arc<dyn Fn(&mut dyn Any) -> Result<(), BoxError> + Send + Sync>;
pub(crate) type Factory = Arc<dyn Fn() -> Box<dyn Bindable> + Send + Sync>;
pub(crate) type Projection =
    Arc<dyn for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any> + Send + Sync>;
pub(crate) type ProjectionMut =
    Arc<dyn for<'a> Fn(&'a mut dyn Any) -> Option<&'a mut dyn Any> + Send + Sync>;

pub(crate) fn projection<F>(f: F) -> Projection
where
    F: for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub(crate) fn projection_mut<F>(f: F) -> ProjectionMut
where
    F: for<'a> Fn(&'a mut dyn Any) -> Option<&'a mut dyn Any> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn mismatch(expected: &'static str) -> BoxError {
    format!("instance is not a {}", expected).into()
}

pub(crate) struct ElementDecl {
    pub tag: String,
    pub factory: Factory,
}

pub(crate) struct ParentLink {
    pub parent: TypeRef,
    pub project: Projection,
    pub project_mut: ProjectionMut,
}

#[derive(Clone)]
pub(crate) struct AttributeBinding {
    pub property: String,
    pub spec: AttributeSpec,
    /// False for placeholders created by `rename_attribute`/`validate` alone.
    pub defined: bool,
    pub get: Option<Getter>,
    pub set: Option<Setter>,
}

#[derive(Clone)]
pub(crate) struct ChildBinding {
    pub property: String,
    pub target: TypeRef,
    pub spec: ChildSpec,
    pub get: ChildGetter,
    pub set: ChildSetter,
}

#[derive(Clone)]
pub(crate) struct TextBinding {
    pub property: String,
    pub required: bool,
    pub get: TextGetter,
    pub set: TextSetter,
}

/// The erased contents of one fragment.
pub(crate) struct FragmentData {
    pub ty: TypeRef,
    pub element: Option<ElementDecl>,
    pub namespace: Option<Namespace>,
    pub name_generator: Option<NameGenerator>,
    pub raw_output: bool,
    pub hook: Option<Hook>,
    pub parent: Option<ParentLink>,
    pub attributes: Vec<AttributeBinding>,
    pub children: Vec<ChildBinding>,
    pub text: Option<TextBinding>,
}

/// The schema declarations of one type `T`.
///
/// Built with chained calls and handed to [`Registry::register`].
pub struct Fragment<T> {
    pub(crate) data: FragmentData,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> Default for Fragment<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Any + Send + Sync> Fragment<T> {
    /// An empty fragment for `T`.
    pub fn new() -> Self {
        Self {
            data: FragmentData {
                ty: TypeRef::of::<T>(),
                element: None,
                namespace: None,
                name_generator: None,
                raw_output: false,
                hook: None,
                parent: None,
                attributes: Vec::new(),
                children: Vec::new(),
                text: None,
            },
            _marker: PhantomData,
        }
    }

    /// Makes `T` an element type with the given tag.
    ///
    /// Deserialization allocates instances with `T::default()` before
    /// populating bound properties.
    pub fn element(mut self, tag: impl Into<String>) -> Self
    where
        T: Bindable + Default,
    {
        self.data.element = Some(ElementDecl {
            tag: tag.into(),
            factory: Arc::new(|| Box::new(T::default()) as Box<dyn Bindable>),
        });
        self
    }

    /// Sets the default namespace prefix and URI for `T`'s element.
    pub fn namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.data.namespace = Some(Namespace::new(prefix, uri));
        self
    }

    /// Declares `P` as the direct ancestor of `T`.
    ///
    /// The projections give access to the part of a `T` that holds `P`'s
    /// properties, so `P`'s bindings apply to `T` after resolution.
    pub fn extends<P, F, G>(mut self, project: F, project_mut: G) -> Self
    where
        P: Any + Send + Sync,
        F: Fn(&T) -> &P + Send + Sync + 'static,
        G: Fn(&mut T) -> &mut P + Send + Sync + 'static,
    {
        self.data.parent = Some(ParentLink {
            parent: TypeRef::of::<P>(),
            project: projection(move |obj: &dyn Any| {
                obj.downcast_ref::<T>().map(|t| project(t) as &dyn Any)
            }),
            project_mut: projection_mut(move |obj: &mut dyn Any| {
                obj.downcast_mut::<T>()
                    .map(|t| project_mut(t) as &mut dyn Any)
            }),
        });
        self
    }

    /// Derives unnamed attribute names on this fragment with `generator`.
    pub fn attribute_names(mut self, generator: NameGenerator) -> Self {
        self.data.name_generator = Some(generator);
        self
    }

    /// Re-emits the original element on serialization when one is stored.
    pub fn raw_output(mut self) -> Self {
        self.data.raw_output = true;
        self
    }

    /// Runs `hook` after an instance has been fully deserialized.
    pub fn after_deserialize<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.data.hook = Some(Arc::new(move |obj: &mut dyn Any| {
            let t = obj
                .downcast_mut::<T>()
                .ok_or_else(|| mismatch(std::any::type_name::<T>()))?;
            hook(t)
        }));
        self
    }

    /// Binds `property` to an XML attribute.
    pub fn attribute<G, S>(
        mut self,
        property: impl Into<String>,
        spec: AttributeSpec,
        get: G,
        set: S,
    ) -> Self
    where
        G: Fn(&T) -> Option<Value> + Send + Sync + 'static,
        S: Fn(&mut T, Value) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let property = property.into();
        let get: Getter = Arc::new(move |obj: &dyn Any| obj.downcast_ref::<T>().and_then(&get));
        let set: Setter = Arc::new(move |obj: &mut dyn Any, value: Value| {
            let t = obj
                .downcast_mut::<T>()
                .ok_or_else(|| mismatch(std::any::type_name::<T>()))?;
            set(t, value)
        });

        let binding = self.attribute_entry(&property);
        let mut spec = spec;
        if spec.name.is_none() {
            spec.name = binding.spec.name.take();
        }
        let mut validators = std::mem::take(&mut binding.spec.validators);
        validators.append(&mut spec.validators);
        spec.validators = validators;

        binding.spec = spec;
        binding.defined = true;
        binding.get = Some(get);
        binding.set = Some(set);
        self
    }

    /// Gives `property` an explicit attribute name, declaring the binding if needed.
    pub fn rename_attribute(
        mut self,
        property: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let property = property.into();
        self.attribute_entry(&property).spec.name = Some(name.into());
        self
    }

    /// Adds a validator to `property`, declaring the binding if needed.
    pub fn validate(mut self, property: impl Into<String>, validator: Validator) -> Self {
        let property = property.into();
        self.attribute_entry(&property).spec.validators.push(validator);
        self
    }

    fn attribute_entry(&mut self, property: &str) -> &mut AttributeBinding {
        let index = match self
            .data
            .attributes
            .iter()
            .position(|b| b.property == property)
        {
            Some(index) => index,
            None => {
                self.data.attributes.push(AttributeBinding {
                    property: property.to_string(),
                    spec: AttributeSpec::default(),
                    defined: false,
                    get: None,
                    set: None,
                });
                self.data.attributes.len() - 1
            }
        };
        &mut self.data.attributes[index]
    }

    /// Binds `property` to child elements of type `C`.
    pub fn child<C, G, S>(
        mut self,
        property: impl Into<String>,
        spec: ChildSpec,
        get: G,
        set: S,
    ) -> Self
    where
        C: Bindable,
        G: Fn(&T) -> Option<Children<C>> + Send + Sync + 'static,
        S: Fn(&mut T, Children<C>) + Send + Sync + 'static,
    {
        let property = property.into();
        let get: ChildGetter = Arc::new(move |obj: &dyn Any| {
            obj.downcast_ref::<T>()
                .and_then(&get)
                .map(Children::erase)
        });
        let set: ChildSetter = Arc::new(move |obj: &mut dyn Any, children: Children<dyn Bindable>| {
            let t = obj
                .downcast_mut::<T>()
                .ok_or_else(|| mismatch(std::any::type_name::<T>()))?;
            let children = children
                .downcast::<C>()
                .ok_or_else(|| mismatch(std::any::type_name::<C>()))?;
            set(t, children);
            Ok(())
        });

        let binding = ChildBinding {
            property,
            target: TypeRef::of::<C>(),
            spec,
            get,
            set,
        };
        match self
            .data
            .children
            .iter_mut()
            .find(|b| b.property == binding.property)
        {
            Some(existing) => *existing = binding,
            None => self.data.children.push(binding),
        }
        self
    }

    /// Binds `property` to the element's text content.
    pub fn text<G, S>(mut self, property: impl Into<String>, required: bool, get: G, set: S) -> Self
    where
        G: Fn(&T) -> Option<String> + Send + Sync + 'static,
        S: Fn(&mut T, String) + Send + Sync + 'static,
    {
        self.data.text = Some(TextBinding {
            property: property.into(),
            required,
            get: Arc::new(move |obj: &dyn Any| obj.downcast_ref::<T>().and_then(&get)),
            set: Arc::new(move |obj: &mut dyn Any, text: String| {
                let t = obj
                    .downcast_mut::<T>()
                    .ok_or_else(|| mismatch(std::any::type_name::<T>()))?;
                set(t, text);
                Ok(())
            }),
        });
        self
    }
}
