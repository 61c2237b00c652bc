use std::fmt::Display;
use std::path::{Path, PathBuf};

use crate::defines::{Defines, DefinesBuilder, IntoDefineValue};
use crate::error::ConfigurationError;

/// Name diagnostics use for inline source.
pub const INLINE_SOURCE_NAME: &str = "<string>";

/// One translatable fragment of C source and the defines visible only while
/// it is compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkUnit {
    Code { source: String, defines: Defines },
    File { path: PathBuf, defines: Defines },
}

impl LinkUnit {
    /// Inline source without local defines.
    pub fn code(source: impl Into<String>) -> Self {
        Self::Code {
            source: source.into(),
            defines: Defines::new(),
        }
    }

    /// Source file without local defines.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File {
            path: path.into(),
            defines: Defines::new(),
        }
    }

    pub fn code_builder(source: impl Into<String>) -> LinkUnitBuilder {
        LinkUnitBuilder::new(UnitSource::Code(source.into()))
    }

    pub fn file_builder(path: impl Into<PathBuf>) -> LinkUnitBuilder {
        LinkUnitBuilder::new(UnitSource::File(path.into()))
    }

    pub fn defines(&self) -> &Defines {
        match self {
            Self::Code { defines, .. } | Self::File { defines, .. } => defines,
        }
    }

    /// Name this unit is reported under in logs.
    pub fn display_name(&self) -> String {
        match self {
            Self::Code { .. } => INLINE_SOURCE_NAME.to_string(),
            Self::File { path, .. } => path.display().to_string(),
        }
    }
}

/// A plain string names a source file.
impl From<&str> for LinkUnit {
    fn from(path: &str) -> Self {
        Self::file(path)
    }
}

impl From<String> for LinkUnit {
    fn from(path: String) -> Self {
        Self::file(path)
    }
}

impl From<&Path> for LinkUnit {
    fn from(path: &Path) -> Self {
        Self::file(path)
    }
}

impl From<PathBuf> for LinkUnit {
    fn from(path: PathBuf) -> Self {
        Self::file(path)
    }
}

#[derive(Debug, Clone)]
enum UnitSource {
    Code(String),
    File(PathBuf),
}

/// Builds a [`LinkUnit`] with local defines.
#[derive(Debug, Clone)]
pub struct LinkUnitBuilder {
    source: UnitSource,
    defines: DefinesBuilder,
}

impl LinkUnitBuilder {
    fn new(source: UnitSource) -> Self {
        Self {
            source,
            defines: DefinesBuilder::default(),
        }
    }

    pub fn defines<I, K, V>(mut self, mapping: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: IntoDefineValue,
    {
        self.defines = self.defines.mapping(mapping);
        self
    }

    pub fn define(mut self, name: impl Into<String>, value: impl Display) -> Self {
        self.defines = self.defines.define(name, value);
        self
    }

    pub fn define_flag(mut self, name: impl Into<String>) -> Self {
        self.defines = self.defines.define_flag(name);
        self
    }

    pub fn build(self) -> Result<LinkUnit, ConfigurationError> {
        let defines = self.defines.build()?;
        Ok(match self.source {
            UnitSource::Code(source) => LinkUnit::Code { source, defines },
            UnitSource::File(path) => LinkUnit::File { path, defines },
        })
    }
}
