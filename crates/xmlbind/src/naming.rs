//! Attribute-name generators.
//!
//! A fragment may carry a [`NameGenerator`] that derives the XML attribute
//! name from the property identifier for every binding on that fragment that
//! has no explicit name. The generator only applies to its own fragment;
//! bindings inherited from an ancestor use the ancestor's generator.
//!
//! Examples:
//! - `kebab_case`: `max_count` → `max-count`
//! - `lower_camel_case`: `max_count` → `maxCount`

use heck::{ToKebabCase, ToLowerCamelCase, ToShoutySnakeCase, ToSnakeCase};
use std::fmt;
use std::sync::Arc;

/// Maps a property identifier to an XML attribute name.
#[derive(Clone)]
pub struct NameGenerator(Arc<dyn Fn(&str) -> String + Send + Sync>);

impl NameGenerator {
    /// Wraps a naming function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Derives the attribute name for `property`.
    pub fn generate(&self, property: &str) -> String {
        (self.0)(property)
    }

    /// `max_count` → `max-count`.
    pub fn kebab_case() -> Self {
        Self::new(|p| p.to_kebab_case())
    }

    /// `max_count` → `maxCount`.
    pub fn lower_camel_case() -> Self {
        Self::new(|p| p.to_lower_camel_case())
    }

    /// `maxCount` → `max_count`.
    pub fn snake_case() -> Self {
        Self::new(|p| p.to_snake_case())
    }

    /// `max_count` → `MAX_COUNT`.
    pub fn shouty_snake_case() -> Self {
        Self::new(|p| p.to_shouty_snake_case())
    }

    /// Prepends a fixed prefix: `count` → `data-count` for `prefixed("data-")`.
    pub fn prefixed(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self::new(move |p| format!("{}{}", prefix, p))
    }
}

impl fmt::Debug for NameGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NameGenerator")
    }
}
