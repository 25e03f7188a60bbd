// This file is the module declaration file for the `builders` module.
// It declares and makes public all the sub-modules within the `src/builders`
// directory. These modules encapsulate the recognition, matching, rendering
// and output logic used by the core.

// `compiler` module:
// Turns the declaration catalog into Lua stub documents, one per class, plus
// a global types file for referenced types without a class of their own.
pub mod compiler;

// `importer` module:
// This module reads external inputs: the serialized declaration catalog
// (JSON, YAML or TOML) and Java-style `.properties` configuration files.
pub mod importer;

// `matcher` module:
// Matches a classified line against the catalog. Exclusions come first;
// methods are resolved across overloads with a pure scoring function.
pub mod matcher;

// `patterns` module:
// This is a fundamental module that defines the declaration patterns
// (`DeclarationPattern` and `PatternType`), the `PatternMatcher` trait, and
// the `LineClassifier` that recognizes class, function and field
// declarations on a single line of Lua source.
pub mod patterns;

// `renderer` module:
// Renders matched catalog entries as EmmyLua annotation blocks
// (`---@class`, `---@param`, `---@return`, ...), reflowing doc comments.
pub mod renderer;

// `reporter` module:
// This module is responsible for generating human-readable reports. It
// defines a `StatusReporter` trait and its `ConsoleReporter` implementation,
// which summarizes the verdict of every annotated file.
pub mod reporter;

// `storage` module:
// This module provides an abstraction over where output goes. It defines the
// `OutputProvider` trait with a `FileOutput` implementation that writes to
// disk and a `MemoryOutput` used for dry runs.
pub mod storage;

// `validator` module:
// This module is dedicated to ensuring the integrity and correctness of
// the configuration. It defines the `ConfigValidator` trait and a
// `StandardValidator` implementation to check for invalid patterns,
// useless exclusions and bad output settings.
pub mod validator;
