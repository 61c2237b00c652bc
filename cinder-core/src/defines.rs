//! Preprocessor symbol tables.
//!
//! A [`Defines`] table maps a symbol name to its replacement text. A symbol
//! without text (`None`) is still defined and evaluates to `1` in `#if`.
//! Session tables and link-unit tables are both assembled with a
//! [`DefinesBuilder`] and combined per compile step with [`merge`].

use std::collections::BTreeMap;
use std::fmt::Display;

use crate::error::ConfigurationError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Defines {
    entries: BTreeMap<String, Option<String>>,
}

impl Defines {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> DefinesBuilder {
        DefinesBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// `Some(None)` for a symbol defined without text, `None` when undefined.
    pub fn get(&self, name: &str) -> Option<Option<&str>> {
        self.entries.get(name).map(Option::as_deref)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    /// Changes that turn this table into `target`: undefinitions of symbols
    /// `target` lacks, then (re)definitions of symbols that are new or carry
    /// a different value.
    pub fn transition<'a>(&'a self, target: &'a Defines) -> Vec<SymbolChange<'a>> {
        let mut changes: Vec<SymbolChange<'a>> = self
            .entries
            .keys()
            .filter(|name| !target.contains(name))
            .map(|name| SymbolChange::Undefine(name))
            .collect();
        changes.extend(
            target
                .iter()
                .filter(|(name, value)| self.get(name) != Some(*value))
                .map(|(name, value)| SymbolChange::Define(name, value)),
        );
        changes
    }

    fn try_insert(&mut self, name: String, value: Option<String>) -> Result<(), ConfigurationError> {
        if !is_identifier(&name) {
            return Err(ConfigurationError::InvalidDefineName { name });
        }
        if self.entries.contains_key(&name) {
            return Err(ConfigurationError::DuplicateDefine { name });
        }
        self.entries.insert(name, value);
        Ok(())
    }
}

/// Union of `base` and `overlay`; symbols present in both take the overlay value.
pub fn merge(base: &Defines, overlay: &Defines) -> Defines {
    let mut merged = base.clone();
    for (name, value) in &overlay.entries {
        merged.entries.insert(name.clone(), value.clone());
    }
    merged
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolChange<'a> {
    Define(&'a str, Option<&'a str>),
    Undefine(&'a str),
}

/// Values accepted in an explicit define mapping.
pub trait IntoDefineValue {
    fn into_define_value(self) -> Option<String>;
}

impl IntoDefineValue for &str {
    fn into_define_value(self) -> Option<String> {
        Some(self.to_string())
    }
}

impl IntoDefineValue for String {
    fn into_define_value(self) -> Option<String> {
        Some(self)
    }
}

impl IntoDefineValue for Option<&str> {
    fn into_define_value(self) -> Option<String> {
        self.map(str::to_string)
    }
}

impl IntoDefineValue for Option<String> {
    fn into_define_value(self) -> Option<String> {
        self
    }
}

/// Collects an explicit mapping and named defines, then unions them.
///
/// A symbol given by both sources, or twice by one of them, is rejected when
/// the table is built.
#[derive(Debug, Clone, Default)]
pub struct DefinesBuilder {
    mapping: Vec<(String, Option<String>)>,
    named: Vec<(String, Option<String>)>,
}

impl DefinesBuilder {
    pub fn mapping<I, K, V>(mut self, mapping: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: IntoDefineValue,
    {
        self.mapping.extend(
            mapping
                .into_iter()
                .map(|(name, value)| (name.into(), value.into_define_value())),
        );
        self
    }

    /// Named define; the value is rendered with `Display`.
    pub fn define(mut self, name: impl Into<String>, value: impl Display) -> Self {
        self.named.push((name.into(), Some(value.to_string())));
        self
    }

    /// Named define without replacement text.
    pub fn define_flag(mut self, name: impl Into<String>) -> Self {
        self.named.push((name.into(), None));
        self
    }

    pub fn build(self) -> Result<Defines, ConfigurationError> {
        let mut defines = Defines::new();
        for (name, value) in self.mapping.into_iter().chain(self.named) {
            defines.try_insert(name, value)?;
        }
        Ok(defines)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first == '_' || first.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
