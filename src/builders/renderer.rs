use std::borrow::Cow;

use crate::builders::patterns::LineRecord;
use crate::core::catalog::{CatalogEntry, DeclarationKind};

/// Marks a line carrying an annotation directive.
pub const ANNOTATION_PREFIX: &str = "---@";
/// Marks a documentation comment line.
pub const DOC_PREFIX: &str = "---";
/// Placeholder for types that could not be resolved.
pub const ANY_TYPE: &str = "any";

const LUA_RESERVED: [&str; 22] = [
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto", "if", "in",
    "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];

/// Prefixes names that collide with Lua reserved words with `_`.
pub fn safe_lua_name(name: &str) -> Cow<'_, str> {
    if LUA_RESERVED.contains(&name) {
        Cow::Owned(format!("_{name}"))
    } else {
        Cow::Borrowed(name)
    }
}

/// The Lua-facing spelling of a reflected type; unknown types become `any`.
pub fn lua_type(type_name: Option<&str>) -> &str {
    match type_name.map(str::trim) {
        Some(name) if !name.is_empty() => name,
        _ => ANY_TYPE,
    }
}

/// Element type of a variadic parameter (`String...` or `String[]` → `String`).
fn vararg_type(type_name: Option<&str>) -> &str {
    let name = lua_type(type_name);
    name.strip_suffix("...")
        .or_else(|| name.strip_suffix("[]"))
        .unwrap_or(name)
}

/// Turns catalog entries into EmmyLua annotation blocks.
#[derive(Debug, Clone, Copy)]
pub struct AnnotationRenderer {
    doc_width: usize,
}

impl AnnotationRenderer {
    pub fn new(doc_width: usize) -> Self {
        Self {
            doc_width: doc_width.max(1),
        }
    }

    /// Renders `entry` with the parameter names the catalog knows.
    pub fn render(&self, entry: &CatalogEntry) -> Vec<String> {
        self.render_with_names(entry, &[])
    }

    /// Renders `entry` for the declaration it matched, so `---@param` lines
    /// use the names written in the source.
    pub fn render_for(&self, entry: &CatalogEntry, record: &LineRecord<'_>) -> Vec<String> {
        self.render_with_names(entry, &record.params)
    }

    fn render_with_names(&self, entry: &CatalogEntry, names: &[&str]) -> Vec<String> {
        let mut lines = Vec::new();
        match entry.kind {
            DeclarationKind::Class => match entry.parent.as_deref() {
                Some(parent) if !parent.trim().is_empty() => {
                    lines.push(format!("{ANNOTATION_PREFIX}class {} : {}", entry.name, parent.trim()));
                }
                _ => lines.push(format!("{ANNOTATION_PREFIX}class {}", entry.name)),
            },
            DeclarationKind::Method => {
                lines.push(format!("{ANNOTATION_PREFIX}{}", entry.modifier.visibility));
                for (index, param) in entry.params.iter().take(entry.fixed_arity()).enumerate() {
                    let name = match names.get(index) {
                        Some(name) => Cow::Borrowed(*name),
                        None if !param.name.is_empty() => Cow::Borrowed(param.name.as_str()),
                        None => Cow::Owned(format!("arg{index}")),
                    };
                    lines.push(format!(
                        "{ANNOTATION_PREFIX}param {} {}",
                        safe_lua_name(&name),
                        lua_type(param.type_name.as_deref())
                    ));
                }
                if entry.has_var_arg()
                    && let Some(last) = entry.params.last()
                {
                    lines.push(format!(
                        "{ANNOTATION_PREFIX}vararg {}",
                        vararg_type(last.type_name.as_deref())
                    ));
                }
                let return_type = lua_type(entry.value_type.as_deref());
                if return_type != "void" {
                    lines.push(format!("{ANNOTATION_PREFIX}return {return_type}"));
                }
            }
            DeclarationKind::Field => {
                lines.push(format!("{ANNOTATION_PREFIX}{}", entry.modifier.visibility));
                lines.push(format!(
                    "{ANNOTATION_PREFIX}type {}",
                    lua_type(entry.value_type.as_deref())
                ));
            }
        }
        if let Some(comment) = entry.comment.as_deref() {
            lines.extend(reflow(comment, self.doc_width));
        }
        lines
    }
}

impl Default for AnnotationRenderer {
    fn default() -> Self {
        Self::new(crate::core::config::DEFAULT_DOC_WIDTH)
    }
}

/// Rewraps doc text into `---` comment lines no wider than `width` characters
/// of text. Blank lines separate paragraphs; words longer than the width get a
/// line of their own.
pub fn reflow(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut in_paragraph = false;

    let flush = |current: &mut String, lines: &mut Vec<String>| {
        if !current.is_empty() {
            lines.push(format!("{DOC_PREFIX} {current}"));
            current.clear();
        }
    };

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            if in_paragraph {
                flush(&mut current, &mut lines);
                in_paragraph = false;
            }
            continue;
        }
        if !in_paragraph && !lines.is_empty() {
            lines.push(DOC_PREFIX.to_string());
        }
        in_paragraph = true;

        for word in line.split_whitespace() {
            if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
                flush(&mut current, &mut lines);
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
    }
    flush(&mut current, &mut lines);
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::patterns::LineClassifier;
    use crate::core::catalog::{MemberModifier, Parameter, Visibility};

    fn test_method() -> CatalogEntry {
        CatalogEntry::method(
            "TestClass",
            "test",
            vec![Parameter::new("arg0", "String"), Parameter::new("arg1", "Integer")],
            "Object",
        )
    }

    #[test]
    fn test_method_block_uses_source_names() {
        let line = "function TestClass:test(param1, param2)";
        let record = LineClassifier::default().classify(line);
        let lines = AnnotationRenderer::default().render_for(&test_method(), &record);
        assert_eq!(
            lines,
            vec![
                "---@public",
                "---@param param1 String",
                "---@param param2 Integer",
                "---@return Object",
            ]
        );
    }

    #[test]
    fn test_variadic_block() {
        let entry = test_method().with_variadic(true);
        let record = LineClassifier::default().classify("function TestClass:test(param1, ...)");
        let lines = AnnotationRenderer::default().render_for(&entry, &record);
        assert_eq!(
            lines,
            vec!["---@public", "---@param param1 String", "---@vararg Integer", "---@return Object"]
        );
    }

    #[test]
    fn test_unknown_types_render_as_any() {
        let entry = CatalogEntry::method(
            "T",
            "f",
            vec![Parameter::untyped("end"), Parameter::new("b", " ")],
            "void",
        )
        .with_modifier(MemberModifier {
            visibility: Visibility::Protected,
            ..MemberModifier::default()
        });
        let lines = AnnotationRenderer::default().render(&entry);
        assert_eq!(lines, vec!["---@protected", "---@param _end any", "---@param b any"]);
    }

    #[test]
    fn test_class_and_field_blocks() {
        let renderer = AnnotationRenderer::default();
        assert_eq!(
            renderer.render(&CatalogEntry::class("ISButton", Some("ISPanel"))),
            vec!["---@class ISButton : ISPanel"]
        );
        let mut field = CatalogEntry::field("TestClass", "count", "Integer");
        field.value_type = None;
        assert_eq!(renderer.render(&field), vec!["---@public", "---@type any"]);
    }

    #[test]
    fn test_doc_comment_is_reflowed() {
        let entry = CatalogEntry::class("TestClass", None)
            .with_comment("Holds   the test\nstate for   a run.\n\nSecond paragraph.");
        let lines = AnnotationRenderer::new(12).render(&entry);
        assert_eq!(
            lines,
            vec![
                "---@class TestClass",
                "--- Holds the",
                "--- test state",
                "--- for a run.",
                "---",
                "--- Second",
                "--- paragraph.",
            ]
        );
    }

    #[test]
    fn test_safe_lua_name() {
        assert_eq!(safe_lua_name("break"), "_break");
        assert_eq!(safe_lua_name("test"), "test");
    }
}
