//! Configuration metadata.
//!
//! Metadata is normally generated by the [`BindConfig`](macro@crate::BindConfig) derive macro
//! and cached behind a per-type `LazyLock` static, so extraction runs at most once per type
//! regardless of how many bindings share it. The [`ConfigMetadata::new()`] constructor runs the
//! cross-attribute structural checks and records anything suspicious as [`Problems`]; the
//! binding engine merges those into every build of the type and refuses to proceed on errors.

use std::{any, collections::BTreeMap, fmt};

use crate::problems::Problems;

#[cfg(test)]
mod tests;

/// Representation of a Rust type.
#[derive(Clone, Copy)]
pub struct RustType {
    id: fn() -> any::TypeId,
    name_in_code: &'static str,
}

impl fmt::Debug for RustType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name_in_code)
    }
}

impl PartialEq for RustType {
    fn eq(&self, other: &Self) -> bool {
        (self.id)() == (other.id)()
    }
}

impl RustType {
    /// Creates a new type.
    pub const fn of<T: 'static>(name_in_code: &'static str) -> Self {
        Self {
            id: any::TypeId::of::<T>,
            name_in_code,
        }
    }

    /// Returns the unique ID of this type.
    pub fn id(&self) -> any::TypeId {
        (self.id)()
    }

    /// Returns the name of this type as specified in code.
    pub const fn name_in_code(&self) -> &'static str {
        self.name_in_code
    }
}

/// Deprecation note attached to an attribute. Affects diagnostics only, never routing.
#[derive(Debug, Clone, Copy)]
pub struct DeprecationNote {
    /// Version in which the attribute was deprecated.
    pub since: Option<&'static str>,
    /// Whether the attribute is slated for removal.
    pub for_removal: bool,
}

/// Metadata for a single configuration attribute.
#[derive(Debug, Clone, Copy)]
pub struct AttributeMetadata {
    /// Name of the attribute field in Rust code; doubles as the attribute identity.
    pub rust_field_name: &'static str,
    /// Human-readable help parsed from the doc comment.
    pub help: &'static str,
    /// Canonical property name. Attributes reachable only through legacy aliases have none.
    pub operative: Option<&'static str>,
    /// Deprecated alias property names, in declared order.
    pub legacy: &'static [&'static str],
    /// When set, raw values of this attribute are never echoed in diagnostics.
    pub security_sensitive: bool,
    /// Deprecation note, if the attribute itself is deprecated.
    pub deprecation: Option<DeprecationNote>,
    /// Declared Rust type of the attribute value.
    pub rust_type: RustType,
}

impl AttributeMetadata {
    /// Iterates over all property names injecting into this attribute, operative name first.
    pub fn property_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.operative.into_iter().chain(self.legacy.iter().copied())
    }
}

/// Metadata for a configuration type: its attributes, defunct property names and any
/// structural problems discovered while cross-checking the attribute names.
#[derive(Debug, Clone)]
pub struct ConfigMetadata {
    ty: RustType,
    help: &'static str,
    attributes: Box<[AttributeMetadata]>,
    defunct_properties: Box<[&'static str]>,
    problems: Problems,
}

impl ConfigMetadata {
    /// Assembles metadata for a configuration type, running structural validation.
    ///
    /// Anomalies (duplicate names, operative–legacy collisions, bindable defunct names,
    /// malformed property names) are recorded as problems rather than panicking: the binding
    /// engine reports them in the diagnostics of every build of the type.
    pub fn new(
        ty: RustType,
        help: &'static str,
        attributes: Box<[AttributeMetadata]>,
        defunct_properties: Box<[&'static str]>,
    ) -> Self {
        let problems = validate_structure(ty, &attributes, &defunct_properties);
        Self {
            ty,
            help,
            attributes,
            defunct_properties,
            problems,
        }
    }

    /// Returns the configuration type.
    pub fn ty(&self) -> RustType {
        self.ty
    }

    /// Returns help regarding the config itself.
    pub fn help(&self) -> &'static str {
        self.help
    }

    /// Returns the attributes of the config, in declaration order.
    pub fn attributes(&self) -> &[AttributeMetadata] {
        &self.attributes
    }

    /// Looks up an attribute by its field name.
    pub fn attribute(&self, rust_field_name: &str) -> Option<&AttributeMetadata> {
        self.attributes
            .iter()
            .find(|attribute| attribute.rust_field_name == rust_field_name)
    }

    /// Returns the unqualified property names that must not appear in the input.
    pub fn defunct_properties(&self) -> &[&'static str] {
        &self.defunct_properties
    }

    /// Returns structural problems discovered during metadata extraction.
    pub fn problems(&self) -> &Problems {
        &self.problems
    }
}

fn is_valid_property_name(name: &str) -> bool {
    !name.is_empty()
        && name.is_ascii()
        && !name.starts_with('.')
        && !name.ends_with('.')
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_'))
}

fn validate_structure(
    ty: RustType,
    attributes: &[AttributeMetadata],
    defunct_properties: &[&'static str],
) -> Problems {
    let class = ty.name_in_code();
    let mut problems = Problems::default();

    let mut operative_names = BTreeMap::new();
    for attribute in attributes {
        let field = attribute.rust_field_name;
        if attribute.operative.is_none() && attribute.legacy.is_empty() {
            problems.add_error(format!(
                "Attribute '{field}' (class [{class}]) has no property names"
            ));
        }
        for name in attribute.property_names() {
            if !is_valid_property_name(name) {
                problems.add_error(format!(
                    "Invalid property name '{name}' on attribute '{field}' (class [{class}])"
                ));
            }
        }
        if let Some(name) = attribute.operative {
            if let Some(previous) = operative_names.insert(name, field) {
                problems.add_error(format!(
                    "Ambiguous property '{name}' (class [{class}]): bound by both '{previous}' and '{field}'"
                ));
            }
        }
    }

    let mut legacy_names: BTreeMap<&str, &str> = BTreeMap::new();
    for attribute in attributes {
        let field = attribute.rust_field_name;
        for &name in attribute.legacy {
            if let Some(operative_field) = operative_names.get(name) {
                problems.add_error(format!(
                    "Legacy property '{name}' of attribute '{field}' (class [{class}]) collides \
                     with the operative property of '{operative_field}'"
                ));
            }
            if let Some(previous) = legacy_names.insert(name, field) {
                problems.add_error(format!(
                    "Duplicate legacy property '{name}' (class [{class}]): declared on both \
                     '{previous}' and '{field}'"
                ));
            }
        }
    }

    for &name in defunct_properties {
        if name.is_empty() {
            problems.add_error(format!("Empty defunct property name (class [{class}])"));
            continue;
        }
        let bound_by = operative_names.get(name).or_else(|| legacy_names.get(name));
        if let Some(field) = bound_by {
            problems.add_error(format!(
                "Defunct property '{name}' (class [{class}]) is still bound by attribute '{field}'"
            ));
        }
    }

    problems
}
