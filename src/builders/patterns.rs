use anyhow::{Context, Result};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use uuid::Uuid;

/// Default recognition pattern for class declarations.
///
/// Matches `Name = {}` and `Name = Parent:derive("Name")` at statement level.
pub const DEFAULT_CLASS_PATTERN: &str = r#"^(?:local\s+)?(?P<name>[A-Za-z_]\w*)\s*=\s*(?:(?P<parent>[A-Za-z_][\w.]*):derive\(\s*["'][^"']*["']\s*\)|\{\s*\})\s*;?\s*(?:--.*)?$"#;

/// Default recognition pattern for function declarations.
///
/// Matches `function name(...)`, `function Owner.name(...)` and
/// `function Owner:name(...)`, optionally `local` and indented.
pub const DEFAULT_FUNCTION_PATTERN: &str = r"^\s*(?:local\s+)?function\s+(?:(?P<owner>[A-Za-z_][\w.]*)[.:])?(?P<name>[A-Za-z_]\w*)\s*\((?P<params>[^)]*)\)";

/// Default recognition pattern for field declarations.
///
/// Matches `Owner.name = value` at statement level. Comparisons (`==`) are
/// rejected because the value may not start with `=`.
pub const DEFAULT_FIELD_PATTERN: &str =
    r"^(?P<owner>[A-Za-z_]\w*)\.(?P<name>[A-Za-z_]\w*)\s*=\s*(?P<value>[^=\s].*)$";

/// Recognizes a function expression on the right-hand side of a field
/// assignment, e.g. `Owner.name = function(a, b)`.
static FUNCTION_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^function\s*\((?P<params>[^)]*)\)").expect("function value pattern is valid")
});

/// The token that marks a variadic parameter list.
pub const VARARG_MARKER: &str = "...";

/// An enum that defines the declaration shapes the classifier recognizes.
///
/// Each variant owns one recognition pattern in the rule set, and each can be
/// overridden from the configuration.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PatternType {
    /// A table declaration that introduces a class, with or without a parent.
    Class,
    /// A `function` statement or a function assigned to a member.
    Function,
    /// A member assignment at statement level.
    Field,
}

impl PatternType {
    pub const ALL: [PatternType; 3] = [PatternType::Class, PatternType::Function, PatternType::Field];

    /// The built-in recognition pattern used when the configuration does not
    /// override it.
    pub fn default_specification(&self) -> &'static str {
        match self {
            PatternType::Class => DEFAULT_CLASS_PATTERN,
            PatternType::Function => DEFAULT_FUNCTION_PATTERN,
            PatternType::Field => DEFAULT_FIELD_PATTERN,
        }
    }

    /// Named capture groups an override must define for its kind.
    pub fn required_groups(&self) -> &'static [&'static str] {
        match self {
            PatternType::Class => &["name"],
            PatternType::Function => &["name", "params"],
            PatternType::Field => &["owner", "name"],
        }
    }

    pub fn line_kind(&self) -> LineKind {
        match self {
            PatternType::Class => LineKind::ClassDecl,
            PatternType::Function => LineKind::FunctionDecl,
            PatternType::Field => LineKind::FieldDecl,
        }
    }
}

/// Implements `fmt::Display` to provide a user-friendly string representation
/// for each `PatternType`. This is useful for logging and reporting.
impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternType::Class => write!(f, "class"),
            PatternType::Function => write!(f, "function"),
            PatternType::Field => write!(f, "field"),
        }
    }
}

impl std::str::FromStr for PatternType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "class" => Ok(PatternType::Class),
            "function" => Ok(PatternType::Function),
            "field" => Ok(PatternType::Field),
            _ => anyhow::bail!("Invalid pattern type: {}", s),
        }
    }
}

/// What a single line of Lua source declares, if anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    None,
    ClassDecl,
    FunctionDecl,
    FieldDecl,
}

/// A single input line plus its classification.
///
/// All extracted parts borrow from the line itself; a record lives only as
/// long as the line it was classified from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRecord<'a> {
    pub text: &'a str,
    pub kind: LineKind,
    /// Receiver qualifier with the separating `.` or `:` stripped.
    pub owner: Option<&'a str>,
    pub name: Option<&'a str>,
    /// Parameter tokens, without the variadic marker.
    pub params: Vec<&'a str>,
    pub variadic: bool,
    /// Parent class of a derived class declaration.
    pub parent: Option<&'a str>,
}

impl<'a> LineRecord<'a> {
    pub fn plain(text: &'a str) -> Self {
        Self {
            text,
            kind: LineKind::None,
            owner: None,
            name: None,
            params: Vec::new(),
            variadic: false,
            parent: None,
        }
    }

    pub fn is_declaration(&self) -> bool {
        self.kind != LineKind::None
    }

    /// `Owner.name` for members, the bare name for classes and globals.
    pub fn qualified_name(&self) -> Option<String> {
        self.name
            .map(|name| crate::core::catalog::qualify(self.owner, name))
    }
}

/// Represents a single declaration pattern defined in the configuration.
///
/// This struct holds the information needed to recognize one declaration
/// shape: its type and the regular expression that describes it.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DeclarationPattern {
    /// A unique identifier for the pattern, used in validation reports.
    pub id: String,
    /// The declaration shape this pattern recognizes.
    pub pattern_type: PatternType,
    /// The raw regular expression with named capture groups.
    pub specification: String,
}

/// The `PatternMatcher` trait defines the core behavior for recognizing a
/// declaration on one line.
///
/// Implementors return `None` when the line does not have their shape, so the
/// classifier can try each pattern in turn.
pub trait PatternMatcher {
    /// Attempts to recognize a declaration on `line`.
    ///
    /// # Arguments
    /// * `line`: The string slice of the line to check.
    ///
    /// # Returns
    /// `Some(LineRecord)` with the extracted parts when the line matches.
    fn recognize<'a>(&self, line: &'a str) -> Option<LineRecord<'a>>;
}

impl DeclarationPattern {
    /// Creates a new `DeclarationPattern` from a given type and specification string.
    ///
    /// # Arguments
    /// * `pattern_type`: A string naming the kind ("class", "function" or "field").
    /// * `specification`: The regular expression describing the declaration.
    ///
    /// # Returns
    /// `Result<Self>` which is the new pattern, or an error if the
    /// `pattern_type` string is invalid.
    pub fn new(pattern_type: String, specification: String) -> Result<Self> {
        let pattern_type: PatternType = pattern_type.parse()?;
        Ok(Self::of(pattern_type, specification))
    }

    pub fn of(pattern_type: PatternType, specification: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            pattern_type,
            specification: specification.into(),
        }
    }

    /// The pattern used when nothing overrides `pattern_type`.
    pub fn default_for(pattern_type: PatternType) -> Self {
        Self::of(pattern_type, pattern_type.default_specification())
    }

    /// Validates the pattern's specification string.
    ///
    /// The regex must compile and must define every named group the
    /// classifier reads for this kind of declaration.
    pub fn validate(&self) -> Result<()> {
        self.compile().map(|_| ())
    }

    /// Compiles the specification into a matcher, validating it on the way.
    pub fn compile(&self) -> Result<CompiledPattern> {
        let regex = Regex::new(&self.specification)
            .with_context(|| format!("Invalid {} pattern", self.pattern_type))?;

        for group in self.pattern_type.required_groups() {
            if !regex.capture_names().flatten().any(|name| name == *group) {
                anyhow::bail!(
                    "The {} pattern must define a named group '{}'",
                    self.pattern_type,
                    group
                );
            }
        }
        Ok(CompiledPattern {
            pattern_type: self.pattern_type,
            regex,
        })
    }
}

/// A validated, compiled declaration pattern.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pattern_type: PatternType,
    regex: Regex,
}

impl CompiledPattern {
    pub fn pattern_type(&self) -> PatternType {
        self.pattern_type
    }
}

/// Implementation of the `PatternMatcher` trait for compiled patterns.
/// Each declaration shape extracts different groups from its captures.
impl PatternMatcher for CompiledPattern {
    fn recognize<'a>(&self, line: &'a str) -> Option<LineRecord<'a>> {
        let caps = self.regex.captures(line)?;
        let group = |name: &str| caps.name(name).map(|m| m.as_str()).filter(|s| !s.is_empty());

        let mut record = LineRecord::plain(line);
        record.kind = self.pattern_type.line_kind();
        record.name = Some(group("name")?);
        record.owner = group("owner");

        match self.pattern_type {
            PatternType::Class => {
                record.parent = group("parent");
            }
            PatternType::Function => {
                let params = caps.name("params").map_or("", |m| m.as_str());
                (record.params, record.variadic) = split_params(params);
            }
            PatternType::Field => {
                // A function assigned to a member declares a function, not a field.
                if let Some(value) = group("value")
                    && let Some(func) = FUNCTION_VALUE.captures(value.trim_start())
                {
                    record.kind = LineKind::FunctionDecl;
                    (record.params, record.variadic) = split_function_params(&func);
                }
            }
        }
        Some(record)
    }
}

fn split_function_params<'a>(caps: &Captures<'a>) -> (Vec<&'a str>, bool) {
    split_params(caps.name("params").map_or("", |m| m.as_str()))
}

/// Splits a parameter list on commas and strips a trailing variadic marker.
pub fn split_params(params: &str) -> (Vec<&str>, bool) {
    let mut tokens: Vec<&str> = params
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect();

    let variadic = tokens.last() == Some(&VARARG_MARKER);
    if variadic {
        tokens.pop();
    }
    (tokens, variadic)
}

/// Finds a Lua long comment (`--[[`, `--[==[`, ...) opened on `line` and not
/// closed on it. Returns the closing bracket that ends it.
pub fn open_long_comment(line: &str) -> Option<String> {
    let start = line.find("--[")?;
    let rest = &line[start + 3..];
    let level = rest.bytes().take_while(|b| *b == b'=').count();
    let body = rest[level..].strip_prefix('[')?;

    let closer = format!("]{}]", "=".repeat(level));
    if body.contains(&closer) {
        None
    } else {
        Some(closer)
    }
}

/// Classifies lines of Lua source against the three declaration patterns.
///
/// Patterns are tried in a fixed order: class, function, field. The first one
/// that recognizes the line wins.
#[derive(Debug, Clone)]
pub struct LineClassifier {
    patterns: Vec<CompiledPattern>,
}

impl LineClassifier {
    pub fn new(class: &DeclarationPattern, function: &DeclarationPattern, field: &DeclarationPattern) -> Result<Self> {
        Ok(Self {
            patterns: vec![class.compile()?, function.compile()?, field.compile()?],
        })
    }

    /// Classifies one line. Empty lines and comments never declare anything.
    pub fn classify<'a>(&self, line: &'a str) -> LineRecord<'a> {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with("--") {
            return LineRecord::plain(line);
        }
        self.patterns
            .iter()
            .find_map(|pattern| pattern.recognize(line))
            .unwrap_or_else(|| LineRecord::plain(line))
    }
}

impl Default for LineClassifier {
    fn default() -> Self {
        Self {
            patterns: PatternType::ALL
                .iter()
                .map(|kind| CompiledPattern {
                    pattern_type: *kind,
                    regex: Regex::new(kind.default_specification())
                        .expect("built-in declaration patterns are valid"),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_declaration_with_receiver() {
        let classifier = LineClassifier::default();
        let record = classifier.classify("function TestClass:test(param1, param2)");
        assert_eq!(record.kind, LineKind::FunctionDecl);
        assert_eq!(record.owner, Some("TestClass"));
        assert_eq!(record.name, Some("test"));
        assert_eq!(record.params, vec!["param1", "param2"]);
        assert!(!record.variadic);
        assert_eq!(record.qualified_name().as_deref(), Some("TestClass.test"));
    }

    #[test]
    fn test_variadic_marker_is_not_a_parameter() {
        let classifier = LineClassifier::default();
        let record = classifier.classify("function TestClass:test(param1, ...)");
        assert_eq!(record.params, vec!["param1"]);
        assert!(record.variadic);

        let record = classifier.classify("local function log(...)");
        assert_eq!(record.owner, None);
        assert_eq!(record.name, Some("log"));
        assert!(record.params.is_empty());
        assert!(record.variadic);
    }

    #[test]
    fn test_nested_owner_keeps_full_qualifier() {
        let classifier = LineClassifier::default();
        let record = classifier.classify("    function ISUI.Panel.render(self)");
        assert_eq!(record.owner, Some("ISUI.Panel"));
        assert_eq!(record.name, Some("render"));
    }

    #[test]
    fn test_class_declarations() {
        let classifier = LineClassifier::default();
        let record = classifier.classify("ISButton = ISPanel:derive(\"ISButton\");");
        assert_eq!(record.kind, LineKind::ClassDecl);
        assert_eq!(record.name, Some("ISButton"));
        assert_eq!(record.parent, Some("ISPanel"));

        let record = classifier.classify("local TestClass = {}");
        assert_eq!(record.kind, LineKind::ClassDecl);
        assert_eq!(record.parent, None);
    }

    #[test]
    fn test_field_and_function_assignments() {
        let classifier = LineClassifier::default();
        let record = classifier.classify("TestClass.count = 0");
        assert_eq!(record.kind, LineKind::FieldDecl);
        assert_eq!(record.owner, Some("TestClass"));
        assert_eq!(record.name, Some("count"));

        let record = classifier.classify("TestClass.run = function(a, b)");
        assert_eq!(record.kind, LineKind::FunctionDecl);
        assert_eq!(record.params, vec!["a", "b"]);
    }

    #[test]
    fn test_lines_without_declarations() {
        let classifier = LineClassifier::default();
        for line in [
            "",
            "   ",
            "-- function TestClass:test(a)",
            "if TestClass.count == 0 then",
            "    TestClass.count = 1",
            "return TestClass",
        ] {
            assert_eq!(classifier.classify(line).kind, LineKind::None, "{line:?}");
        }
    }

    #[test]
    fn test_open_long_comment() {
        assert_eq!(open_long_comment("--[["), Some("]]".to_string()));
        assert_eq!(open_long_comment("x = 1 --[==[ disabled"), Some("]==]".to_string()));
        assert_eq!(open_long_comment("--[[ one line ]]"), None);
        assert_eq!(open_long_comment("--[==[ a ]] b"), Some("]==]".to_string()));
        assert_eq!(open_long_comment("-- [[ not long ]]"), None);
        assert_eq!(open_long_comment("local t = a[b[1]]"), None);
    }

    #[test]
    fn test_override_must_define_required_groups() {
        let pattern = DeclarationPattern::new("function".to_string(), r"^function (\w+)".to_string()).unwrap();
        assert!(pattern.validate().is_err());

        let pattern = DeclarationPattern::new(
            "function".to_string(),
            r"^def (?P<name>\w+)\((?P<params>[^)]*)\)".to_string(),
        )
        .unwrap();
        assert!(pattern.validate().is_ok());
        assert!(DeclarationPattern::new("method".to_string(), "x".to_string()).is_err());
    }
}
