// This file is the module declaration file for the `core` module.
// It declares the submodules that make up the annotation core and exposes
// them to the rest of the crate.

// `catalog` module:
// The declaration catalog: typed records for the classes, methods and fields
// of the reflected API, indexed by qualified name. Loaded once and only read
// afterwards.
pub mod catalog;

// `config` module:
// This module is responsible for managing the application's configuration.
// It defines the data structures for the configuration file (`ZdocConfig`),
// provides a `ConfigProvider` trait for abstracting configuration access, and
// includes a `ConfigManager` to load TOML or `.properties` files, save,
// validate and export them.
pub mod config;

// `engine` module:
// The file annotator. It streams the lines of one Lua file through the
// classifier, matcher and renderer, and computes the file's `AnnotateResult`.
pub mod engine;

// `rules` module:
// The rule set built from the configuration and the caller's exclusions:
// compiled declaration patterns, per-kind exclusions, and file ignores.
pub mod rules;
