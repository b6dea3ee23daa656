//! Typed object instances and the engine-managed state they carry.
//!
//! Any `'static + Send + Sync` type can take part in mapping by embedding an
//! [`InstanceState`] and implementing [`Bindable`], usually through
//! [`impl_bindable!`](crate::impl_bindable).

use std::any::{Any, TypeId};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use xmlbind_dom::Element;

/// A type whose instances can be deserialized from and serialized to XML.
///
/// The schema itself lives in a [`Registry`](crate::Registry); this trait
/// only gives the engine access to the per-instance bookkeeping and to the
/// concrete type behind a trait object. Implement it with
/// [`impl_bindable!`](crate::impl_bindable).
pub trait Bindable: Any + Send + Sync {
    /// Engine-managed state of this instance.
    fn state(&self) -> &InstanceState;

    /// Mutable engine-managed state of this instance.
    fn state_mut(&mut self) -> &mut InstanceState;

    #[doc(hidden)]
    fn as_any(&self) -> &dyn Any;

    #[doc(hidden)]
    fn as_any_mut(&mut self) -> &mut dyn Any;

    #[doc(hidden)]
    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    #[doc(hidden)]
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    /// Identity of the concrete type.
    fn type_key(&self) -> TypeId {
        TypeId::of::<Self>()
    }

    /// Name of the concrete type, for diagnostics.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// The namespace URI in effect for this instance, if overridden.
    fn namespace_uri(&self) -> Option<&str> {
        self.state().namespace_uri.as_deref()
    }

    /// Overrides the namespace URI used when serializing this instance.
    fn set_namespace_uri(&mut self, uri: Option<String>) {
        self.state_mut().namespace_uri = uri;
    }

    /// The element this instance was deserialized from.
    fn source_node(&self) -> Option<&Element> {
        self.state().source.as_deref()
    }

    /// Replaces the stored source element.
    fn set_source_node(&mut self, node: Option<Element>) {
        self.state_mut().source = node.map(Arc::new);
    }
}

/// Implements [`Bindable`] for a type with an [`InstanceState`] field.
///
/// ```
/// use xmlbind::{InstanceState, impl_bindable};
///
/// #[derive(Default)]
/// struct Shape {
///     state: InstanceState,
/// }
/// impl_bindable!(Shape);
///
/// #[derive(Default)]
/// struct Circle {
///     shape: Shape,
/// }
/// // Reuse the embedded ancestor's state.
/// impl_bindable!(Circle => shape.state);
/// ```
#[macro_export]
macro_rules! impl_bindable {
    ($ty:ty => $($field:ident).+) => {
        impl $crate::Bindable for $ty {
            fn state(&self) -> &$crate::InstanceState {
                &self.$($field).+
            }

            fn state_mut(&mut self) -> &mut $crate::InstanceState {
                &mut self.$($field).+
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }

            fn into_any(self: ::std::boxed::Box<Self>) -> ::std::boxed::Box<dyn ::std::any::Any> {
                self
            }

            fn into_any_arc(
                self: ::std::sync::Arc<Self>,
            ) -> ::std::sync::Arc<dyn ::std::any::Any + ::std::marker::Send + ::std::marker::Sync> {
                self
            }
        }
    };
    ($ty:ty) => {
        $crate::impl_bindable!($ty => state);
    };
}

/// Per-instance bookkeeping owned by the engine.
///
/// The state never takes part in equality: two instances with the same bound
/// property values compare equal whatever their source node or namespace.
#[derive(Debug, Default)]
pub struct InstanceState {
    namespace_uri: Option<String>,
    source: Option<Arc<Element>>,
    serializing: AtomicBool,
}

impl InstanceState {
    /// Whether a serialization of this instance is in progress.
    pub fn is_serializing(&self) -> bool {
        self.serializing.load(Ordering::Acquire)
    }

    pub(crate) fn source(&self) -> Option<&Arc<Element>> {
        self.source.as_ref()
    }

    pub(crate) fn set_source(&mut self, source: Arc<Element>) {
        self.source = Some(source);
    }

    pub(crate) fn set_namespace(&mut self, uri: Option<String>) {
        self.namespace_uri = uri;
    }

    /// Marks the instance as being serialized; `None` if it already is.
    pub(crate) fn enter_serialization(&self) -> Option<SerializingGuard<'_>> {
        self.serializing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SerializingGuard {
                flag: &self.serializing,
            })
    }
}

impl Clone for InstanceState {
    fn clone(&self) -> Self {
        Self {
            namespace_uri: self.namespace_uri.clone(),
            source: self.source.clone(),
            serializing: AtomicBool::new(false),
        }
    }
}

impl PartialEq for InstanceState {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

/// Clears the serializing flag when dropped, on every exit path.
pub(crate) struct SerializingGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for SerializingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// The value of a child-element property: one object or a list of objects.
#[derive(Debug)]
pub enum Children<C: ?Sized> {
    /// A single child, for bindings with a maximum of exactly one.
    One(Arc<C>),
    /// A list of children.
    Many(Vec<Arc<C>>),
}

impl<C: ?Sized> Clone for Children<C> {
    fn clone(&self) -> Self {
        match self {
            Children::One(c) => Children::One(Arc::clone(c)),
            Children::Many(list) => Children::Many(list.clone()),
        }
    }
}

impl<C: ?Sized> Children<C> {
    /// Number of children held.
    pub fn len(&self) -> usize {
        match self {
            Children::One(_) => 1,
            Children::Many(list) => list.len(),
        }
    }

    /// Returns true for an empty list.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flattens into a list.
    pub fn into_vec(self) -> Vec<Arc<C>> {
        match self {
            Children::One(c) => vec![c],
            Children::Many(list) => list,
        }
    }
}

impl<C: Bindable> Children<C> {
    /// Getter helper for a single child field.
    pub fn one(child: &Arc<C>) -> Option<Self> {
        Some(Children::One(Arc::clone(child)))
    }

    /// Getter helper for an optional single child field.
    pub fn optional(child: &Option<Arc<C>>) -> Option<Self> {
        child.as_ref().map(|c| Children::One(Arc::clone(c)))
    }

    /// Getter helper for a list field.
    pub fn many(children: &[Arc<C>]) -> Option<Self> {
        Some(Children::Many(children.to_vec()))
    }

    /// The single child, or the first of a list.
    pub fn into_first(self) -> Option<Arc<C>> {
        self.into_vec().into_iter().next()
    }

    pub(crate) fn erase(self) -> Children<dyn Bindable> {
        match self {
            Children::One(c) => Children::One(c as Arc<dyn Bindable>),
            Children::Many(list) => Children::Many(
                list.into_iter()
                    .map(|c| c as Arc<dyn Bindable>)
                    .collect(),
            ),
        }
    }
}

impl Children<dyn Bindable> {
    /// Recovers the concrete child type; `None` if any child is of another type.
    pub(crate) fn downcast<C: Bindable>(self) -> Option<Children<C>> {
        fn cast<C: Bindable>(child: Arc<dyn Bindable>) -> Option<Arc<C>> {
            child.into_any_arc().downcast::<C>().ok()
        }
        Some(match self {
            Children::One(c) => Children::One(cast(c)?),
            Children::Many(list) => Children::Many(
                list.into_iter()
                    .map(cast)
                    .collect::<Option<Vec<_>>>()?,
            ),
        })
    }
}
