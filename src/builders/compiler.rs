use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, warn};

use crate::builders::patterns::VARARG_MARKER;
use crate::builders::renderer::{ANNOTATION_PREFIX, AnnotationRenderer, lua_type, safe_lua_name};
use crate::core::catalog::{CatalogEntry, DeclarationCatalog, DeclarationKind};

/// Types every Lua tool already knows, plus Java primitives; never declared
/// in the types file.
const BUILTIN_TYPES: [&str; 16] = [
    "any", "void", "nil", "boolean", "number", "string", "table", "function", "userdata", "int",
    "long", "float", "double", "short", "byte", "char",
];

/// The Lua-facing signature of a method, e.g. `TestClass:test(param1, ...)`.
///
/// Static methods use `.`, instance methods `:`. A variadic method prints the
/// marker in place of its last parameter.
pub fn lua_signature(method: &CatalogEntry) -> String {
    let mut params: Vec<String> = method
        .params
        .iter()
        .take(method.fixed_arity())
        .map(|param| safe_lua_name(&param.name).into_owned())
        .collect();
    if method.has_var_arg() {
        params.push(VARARG_MARKER.to_string());
    }

    let name = safe_lua_name(method.simple_name());
    match method.owner() {
        Some(owner) => {
            let separator = if method.modifier.is_static { '.' } else { ':' };
            format!("{owner}{separator}{name}({})", params.join(", "))
        }
        None => format!("{name}({})", params.join(", ")),
    }
}

/// One generated Lua stub: a class table with its fields and methods.
#[derive(Debug, Clone)]
pub struct LuaDocument<'c> {
    pub name: String,
    /// `None` when the catalog has members for a class it never declares.
    pub class: Option<&'c CatalogEntry>,
    pub fields: Vec<&'c CatalogEntry>,
    pub methods: Vec<&'c CatalogEntry>,
}

impl<'c> LuaDocument<'c> {
    /// A copy of this document published under another name.
    pub fn renamed(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..self.clone()
        }
    }

    pub fn to_lua(&self, renderer: &AnnotationRenderer) -> String {
        let mut lines = Vec::new();

        match self.class {
            Some(class) => {
                let mut class = class.clone();
                class.name = self.name.clone();
                lines.extend(renderer.render(&class));
            }
            None => lines.push(format!("{ANNOTATION_PREFIX}class {}", self.name)),
        }
        for field in &self.fields {
            lines.push(format!(
                "{ANNOTATION_PREFIX}field {} {} {}",
                field.modifier.visibility,
                safe_lua_name(field.simple_name()),
                lua_type(field.value_type.as_deref())
            ));
        }
        lines.push(format!("{} = {{}}", self.name));

        for method in &self.methods {
            lines.push(String::new());
            lines.extend(renderer.render(method));
            let mut signature = lua_signature(method);
            if let Some(owner) = method.owner()
                && owner != self.name
            {
                signature = signature.replacen(owner, &self.name, 1);
            }
            lines.push(format!("function {signature} end"));
        }

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

/// Groups catalog entries into one Lua document per class.
pub struct LuaCompiler<'c> {
    catalog: &'c DeclarationCatalog,
    exclude: HashSet<String>,
}

impl<'c> LuaCompiler<'c> {
    pub fn new(catalog: &'c DeclarationCatalog, exclude: HashSet<String>) -> Self {
        Self { catalog, exclude }
    }

    /// Builds the documents in class name order. Excluded classes are left
    /// out together with their members; exclusions that named nothing in the
    /// catalog are reported.
    pub fn compile(&self) -> Vec<LuaDocument<'c>> {
        let mut documents: BTreeMap<&str, LuaDocument<'c>> = BTreeMap::new();
        let mut used_exclusions = HashSet::new();

        for entry in self.catalog.entries() {
            let class_name = match entry.kind {
                DeclarationKind::Class => entry.name.as_str(),
                _ => match entry.owner() {
                    Some(owner) => owner,
                    None => {
                        debug!("Skipping global {} {}", entry.kind, entry.name);
                        continue;
                    }
                },
            };
            if self.exclude.contains(class_name) {
                used_exclusions.insert(class_name);
                continue;
            }

            let document = documents.entry(class_name).or_insert_with(|| LuaDocument {
                name: class_name.to_string(),
                class: None,
                fields: Vec::new(),
                methods: Vec::new(),
            });
            match entry.kind {
                DeclarationKind::Class => document.class = Some(entry),
                DeclarationKind::Field => document.fields.push(entry),
                DeclarationKind::Method => document.methods.push(entry),
            }
        }

        for name in &self.exclude {
            if !used_exclusions.contains(name.as_str()) {
                warn!("Class {} was designated but not excluded from compilation.", name);
            }
        }
        documents.into_values().collect()
    }

    /// Declares every referenced type that has no class of its own.
    pub fn global_types(&self) -> String {
        let declared: HashSet<&str> = self.catalog.classes().map(|c| c.name.as_str()).collect();
        let mut referenced = BTreeSet::new();

        for entry in self.catalog.entries() {
            let types = entry
                .params
                .iter()
                .filter_map(|p| p.type_name.as_deref())
                .chain(entry.value_type.as_deref())
                .chain(entry.parent.as_deref());
            for type_name in types {
                let type_name = type_name.trim().trim_end_matches("[]").trim_end_matches("...");
                if !type_name.is_empty()
                    && !declared.contains(type_name)
                    && !BUILTIN_TYPES.contains(&type_name)
                {
                    referenced.insert(type_name);
                }
            }
        }

        referenced
            .into_iter()
            .map(|type_name| {
                format!(
                    "{ANNOTATION_PREFIX}class {type_name}\n{} = {{}}\n\n",
                    type_name.replace('.', "_")
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::{MemberModifier, Parameter};

    fn params() -> Vec<Parameter> {
        vec![Parameter::new("param1", "String"), Parameter::new("param2", "Integer")]
    }

    #[test]
    fn test_lua_signature() {
        let method = CatalogEntry::method("TestClass", "test", params(), "void");
        assert_eq!(lua_signature(&method), "TestClass:test(param1, param2)");

        let method = method.with_variadic(true);
        assert_eq!(lua_signature(&method), "TestClass:test(param1, ...)");

        let method = CatalogEntry::method("TestClass", "break", vec![], "Boolean")
            .with_variadic(true)
            .with_modifier(MemberModifier {
                is_static: true,
                ..MemberModifier::default()
            });
        assert_eq!(lua_signature(&method), "TestClass._break()");
    }

    #[test]
    fn test_compile_groups_members_and_honors_exclusions() {
        let catalog = DeclarationCatalog::new(vec![
            CatalogEntry::class("TestClass", Some("Base")),
            CatalogEntry::field("TestClass", "count", "Integer"),
            CatalogEntry::method("TestClass", "test", params(), "Object"),
            CatalogEntry::method("Orphan", "run", vec![], "void"),
            CatalogEntry::class("Hidden", None),
            CatalogEntry::method("Hidden", "peek", vec![], "void"),
        ]);
        let exclude = ["Hidden".to_string(), "Missing".to_string()].into();
        let documents = LuaCompiler::new(&catalog, exclude).compile();

        let names: Vec<_> = documents.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Orphan", "TestClass"]);
        assert!(documents[0].class.is_none());

        let lua = documents[1].to_lua(&AnnotationRenderer::default());
        assert_eq!(
            lua,
            "---@class TestClass : Base\n\
             ---@field public count Integer\n\
             TestClass = {}\n\
             \n\
             ---@public\n\
             ---@param param1 String\n\
             ---@param param2 Integer\n\
             ---@return Object\n\
             function TestClass:test(param1, param2) end\n"
        );
    }

    #[test]
    fn test_renamed_document_rewrites_owner() {
        let catalog = DeclarationCatalog::new(vec![
            CatalogEntry::class("IsoPlayer", None),
            CatalogEntry::method("IsoPlayer", "getX", vec![], "float"),
        ]);
        let documents = LuaCompiler::new(&catalog, HashSet::new()).compile();
        let lua = documents[0].renamed("Player").to_lua(&AnnotationRenderer::default());
        assert!(lua.starts_with("---@class Player\nPlayer = {}\n"));
        assert!(lua.contains("function Player:getX() end"));
    }

    #[test]
    fn test_global_types_lists_undeclared_references() {
        let catalog = DeclarationCatalog::new(vec![
            CatalogEntry::class("TestClass", Some("java.lang.Object")),
            CatalogEntry::method("TestClass", "test", params(), "TestClass"),
            CatalogEntry::field("TestClass", "flag", "boolean"),
            CatalogEntry::field("TestClass", "speed", "float"),
            CatalogEntry::method("TestClass", "index", vec![Parameter::new("i", "int")], "long"),
        ]);
        let types = LuaCompiler::new(&catalog, HashSet::new()).global_types();
        assert_eq!(
            types,
            "---@class Integer\nInteger = {}\n\n\
             ---@class String\nString = {}\n\n\
             ---@class java.lang.Object\njava_lang_Object = {}\n\n"
        );
    }
}
