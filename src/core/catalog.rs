use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// The kind of API element a catalog entry describes.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationKind {
    Class,
    Method,
    Field,
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclarationKind::Class => write!(f, "class"),
            DeclarationKind::Method => write!(f, "method"),
            DeclarationKind::Field => write!(f, "field"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Protected,
    Private,
    #[default]
    Undeclared,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Undeclared members are reachable from Lua, so they read as public.
            Visibility::Public | Visibility::Undeclared => write!(f, "public"),
            Visibility::Protected => write!(f, "protected"),
            Visibility::Private => write!(f, "private"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct MemberModifier {
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default, rename = "static")]
    pub is_static: bool,
    #[serde(default, rename = "final")]
    pub is_final: bool,
}

/// A single method parameter as reflected from the API.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    /// `None` when the reflected type could not be resolved.
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: Some(type_name.into()),
        }
    }

    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: None,
        }
    }
}

/// One typed API element: a class, a method or a field.
///
/// Members carry their owner in the qualified name (`Owner.member`); classes
/// are addressed by their bare qualified name.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: String,
    pub kind: DeclarationKind,
    #[serde(default)]
    pub params: Vec<Parameter>,
    #[serde(default)]
    pub variadic: bool,
    /// Return type for methods, value type for fields.
    #[serde(default, rename = "type")]
    pub value_type: Option<String>,
    /// Superclass, for classes only.
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub modifier: MemberModifier,
    #[serde(default)]
    pub comment: Option<String>,
}

impl CatalogEntry {
    pub fn class(name: impl Into<String>, parent: Option<&str>) -> Self {
        Self {
            name: name.into(),
            kind: DeclarationKind::Class,
            params: Vec::new(),
            variadic: false,
            value_type: None,
            parent: parent.map(str::to_string),
            modifier: MemberModifier::default(),
            comment: None,
        }
    }

    pub fn method(
        owner: &str,
        name: &str,
        params: Vec<Parameter>,
        return_type: impl Into<String>,
    ) -> Self {
        Self {
            name: qualify(Some(owner), name),
            kind: DeclarationKind::Method,
            params,
            variadic: false,
            value_type: Some(return_type.into()),
            parent: None,
            modifier: MemberModifier::default(),
            comment: None,
        }
    }

    pub fn field(owner: &str, name: &str, value_type: impl Into<String>) -> Self {
        Self {
            name: qualify(Some(owner), name),
            kind: DeclarationKind::Field,
            params: Vec::new(),
            variadic: false,
            value_type: Some(value_type.into()),
            parent: None,
            modifier: MemberModifier::default(),
            comment: None,
        }
    }

    pub fn with_variadic(mut self, variadic: bool) -> Self {
        self.variadic = variadic;
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_modifier(mut self, modifier: MemberModifier) -> Self {
        self.modifier = modifier;
        self
    }

    /// The owning class of a member. Classes have no owner.
    pub fn owner(&self) -> Option<&str> {
        match self.kind {
            DeclarationKind::Class => None,
            _ => self.name.rsplit_once('.').map(|(owner, _)| owner),
        }
    }

    /// The bare member name, without the owner qualifier.
    pub fn simple_name(&self) -> &str {
        match self.kind {
            DeclarationKind::Class => &self.name,
            _ => self
                .name
                .rsplit_once('.')
                .map_or(self.name.as_str(), |(_, name)| name),
        }
    }

    /// Whether the last parameter takes a variable number of arguments.
    /// A method without parameters has nothing to be variadic.
    pub fn has_var_arg(&self) -> bool {
        self.variadic && !self.params.is_empty()
    }

    /// The number of parameters before the variadic one, if any.
    pub fn fixed_arity(&self) -> usize {
        if self.has_var_arg() {
            self.params.len() - 1
        } else {
            self.params.len()
        }
    }
}

/// Joins an optional owner and a member name into a qualified name.
pub fn qualify(owner: Option<&str>, name: &str) -> String {
    match owner {
        Some(owner) if !owner.is_empty() => format!("{owner}.{name}"),
        _ => name.to_string(),
    }
}

/// Serialized form of a catalog file: `{ "entries": [ ... ] }`.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct CatalogFile {
    #[serde(default)]
    pub entries: Vec<CatalogEntry>,
}

/// Immutable lookup table of typed API elements.
///
/// Entries keep their declaration order, which the matcher uses to break ties
/// between equally good overloads.
#[derive(Debug, Clone, Default)]
pub struct DeclarationCatalog {
    entries: Vec<CatalogEntry>,
    index: HashMap<(DeclarationKind, String), Vec<usize>>,
}

impl DeclarationCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        let mut catalog = Self::default();
        for entry in entries {
            let key = (entry.kind, entry.name.clone());
            if entry.kind != DeclarationKind::Method && catalog.index.contains_key(&key) {
                warn!("Duplicate {} entry \"{}\" in catalog, keeping the first", entry.kind, entry.name);
                continue;
            }
            catalog
                .index
                .entry(key)
                .or_default()
                .push(catalog.entries.len());
            catalog.entries.push(entry);
        }
        catalog
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    fn lookup<'a>(
        &'a self,
        kind: DeclarationKind,
        name: &str,
    ) -> impl Iterator<Item = &'a CatalogEntry> + use<'a> {
        self.index
            .get(&(kind, name.to_string()))
            .into_iter()
            .flatten()
            .map(|&i| &self.entries[i])
    }

    pub fn class(&self, name: &str) -> Option<&CatalogEntry> {
        self.lookup(DeclarationKind::Class, name).next()
    }

    pub fn field(&self, owner: Option<&str>, name: &str) -> Option<&CatalogEntry> {
        self.lookup(DeclarationKind::Field, &qualify(owner, name))
            .next()
    }

    /// Every overload of `owner.name`, in declaration order.
    pub fn methods<'a>(
        &'a self,
        owner: Option<&str>,
        name: &str,
    ) -> impl Iterator<Item = &'a CatalogEntry> + use<'a> {
        self.lookup(DeclarationKind::Method, &qualify(owner, name))
    }

    pub fn classes(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries
            .iter()
            .filter(|e| e.kind == DeclarationKind::Class)
    }
}

impl FromIterator<CatalogEntry> for DeclarationCatalog {
    fn from_iter<T: IntoIterator<Item = CatalogEntry>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_owner_and_simple_name() {
        let method = CatalogEntry::method("zombie.Core", "getInstance", vec![], "Core");
        assert_eq!(method.name, "zombie.Core.getInstance");
        assert_eq!(method.owner(), Some("zombie.Core"));
        assert_eq!(method.simple_name(), "getInstance");

        let class = CatalogEntry::class("zombie.Core", None);
        assert_eq!(class.owner(), None);
        assert_eq!(class.simple_name(), "zombie.Core");
    }

    #[test]
    fn test_var_arg_requires_parameters() {
        let empty = CatalogEntry::method("TestClass", "test", vec![], "Boolean").with_variadic(true);
        assert!(!empty.has_var_arg());
        assert_eq!(empty.fixed_arity(), 0);

        let params = vec![Parameter::new("a", "String"), Parameter::new("b", "Integer")];
        let method = CatalogEntry::method("TestClass", "test", params, "Object").with_variadic(true);
        assert!(method.has_var_arg());
        assert_eq!(method.fixed_arity(), 1);
    }

    #[test]
    fn test_duplicate_classes_keep_first() {
        let catalog = DeclarationCatalog::new(vec![
            CatalogEntry::class("TestClass", Some("First")),
            CatalogEntry::class("TestClass", Some("Second")),
        ]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(
            catalog.class("TestClass").and_then(|c| c.parent.as_deref()),
            Some("First")
        );
    }

    #[test]
    fn test_overloads_keep_declaration_order() {
        let catalog: DeclarationCatalog = vec![
            CatalogEntry::method("T", "f", vec![Parameter::new("a", "String")], "void"),
            CatalogEntry::field("T", "f", "Integer"),
            CatalogEntry::method("T", "f", vec![Parameter::new("a", "Integer")], "void"),
        ]
        .into_iter()
        .collect();

        let types: Vec<_> = catalog
            .methods(Some("T"), "f")
            .map(|m| m.params[0].type_name.clone().unwrap_or_default())
            .collect();
        assert_eq!(types, vec!["String", "Integer"]);
        assert!(catalog.field(Some("T"), "f").is_some());
    }
}
