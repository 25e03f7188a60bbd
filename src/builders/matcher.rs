use std::cmp::Reverse;

use crate::builders::patterns::{LineKind, LineRecord};
use crate::core::catalog::{CatalogEntry, DeclarationCatalog};
use crate::core::rules::AnnotateRules;

/// Score for a parameter token that textually equals the catalog parameter's
/// name or type.
const EXACT_SCORE: usize = 2;
/// Score for a catalog parameter whose type could not be resolved.
const WILDCARD_SCORE: usize = 1;

/// The result of looking a declaration up in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome<'c> {
    Matched(&'c CatalogEntry),
    NoMatch,
    Excluded,
}

impl<'c> MatchOutcome<'c> {
    pub fn entry(&self) -> Option<&'c CatalogEntry> {
        match *self {
            MatchOutcome::Matched(entry) => Some(entry),
            _ => None,
        }
    }
}

/// Matches a classified line against the catalog.
///
/// Exclusion is checked before any lookup, so an excluded name never matches.
/// The result depends only on the arguments.
pub fn match_declaration<'c>(
    record: &LineRecord<'_>,
    catalog: &'c DeclarationCatalog,
    rules: &AnnotateRules,
) -> MatchOutcome<'c> {
    if !record.is_declaration() {
        return MatchOutcome::NoMatch;
    }
    if rules.is_excluded(record) {
        return MatchOutcome::Excluded;
    }
    let Some(name) = record.name else {
        return MatchOutcome::NoMatch;
    };

    let found = match record.kind {
        LineKind::ClassDecl => catalog.class(name),
        LineKind::FieldDecl => catalog.field(record.owner, name),
        LineKind::FunctionDecl => best_overload(record, catalog),
        LineKind::None => None,
    };
    found.map_or(MatchOutcome::NoMatch, MatchOutcome::Matched)
}

/// Picks the overload whose parameters best fit the declaration.
///
/// Only overloads with the same fixed arity and the same variadic-ness are
/// candidates. Among those the highest positional score wins; equal scores
/// go to the overload declared first.
fn best_overload<'c>(record: &LineRecord<'_>, catalog: &'c DeclarationCatalog) -> Option<&'c CatalogEntry> {
    let name = record.name?;
    catalog
        .methods(record.owner, name)
        .filter(|method| {
            method.fixed_arity() == record.params.len() && method.has_var_arg() == record.variadic
        })
        .enumerate()
        .max_by_key(|(index, method)| (score(&record.params, method), Reverse(*index)))
        .map(|(_, method)| method)
}

/// Compares parameter tokens positionally against a method's fixed parameters.
fn score(tokens: &[&str], method: &CatalogEntry) -> usize {
    tokens
        .iter()
        .zip(&method.params)
        .map(|(token, param)| match param.type_name.as_deref() {
            Some(type_name) if *token == type_name || *token == param.name => EXACT_SCORE,
            Some(_) => 0,
            None if *token == param.name => EXACT_SCORE,
            None => WILDCARD_SCORE,
        })
        .sum()
}
