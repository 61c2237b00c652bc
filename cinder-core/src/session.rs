//! Compilation sessions.
//!
//! A [`Session`] pairs an immutable [`SessionConfig`] with a [`Toolchain`].
//! Each [`Session::build`] creates a fresh toolchain context, applies the
//! configuration, compiles the link units one after another with their local
//! defines layered over the session defines, and links them into a
//! [`Binary`]. [`Session::run`] additionally calls the entry point.

use std::fmt;
use std::fmt::Display;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::defines::{Defines, DefinesBuilder, IntoDefineValue, SymbolChange, merge};
use crate::diagnostic::Diagnostic;
use crate::error::{CompileError, CompilePhase, ConfigurationError, CoreError, ExecutionError};
use crate::toolchain::{Context, Outcome, Toolchain};
use crate::unit::{INLINE_SOURCE_NAME, LinkUnit};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionConfig {
    /// Toolchain flags, positional arguments first.
    pub options: Vec<String>,
    pub defines: Defines,
    pub include_dirs: Vec<PathBuf>,
    pub sys_include_dirs: Vec<PathBuf>,
    pub library_dirs: Vec<PathBuf>,
}

impl SessionConfig {
    /// Whether `Werror` (with or without its leading dash) was requested.
    pub fn warnings_as_errors(&self) -> bool {
        self.options
            .iter()
            .any(|option| option.trim_start_matches('-') == "Werror")
    }
}

pub struct SessionBuilder<T> {
    toolchain: T,
    args: Vec<String>,
    options: Vec<String>,
    include_dirs: Vec<PathBuf>,
    sys_include_dirs: Vec<PathBuf>,
    library_dirs: Vec<PathBuf>,
    defines: DefinesBuilder,
}

impl<T: Toolchain> SessionBuilder<T> {
    fn new(toolchain: T) -> Self {
        Self {
            toolchain,
            args: Vec::new(),
            options: Vec::new(),
            include_dirs: Vec::new(),
            sys_include_dirs: Vec::new(),
            library_dirs: Vec::new(),
            defines: DefinesBuilder::default(),
        }
    }

    /// Positional flag; positional flags precede those given through
    /// [`options`](Self::options).
    pub fn arg(mut self, flag: impl Into<String>) -> Self {
        self.args.push(flag.into());
        self
    }

    pub fn args<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(flags.into_iter().map(Into::into));
        self
    }

    pub fn options<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.extend(flags.into_iter().map(Into::into));
        self
    }

    pub fn include_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.include_dirs.push(dir.into());
        self
    }

    pub fn include_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.include_dirs.extend(dirs.into_iter().map(Into::into));
        self
    }

    pub fn sys_include_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sys_include_dirs.push(dir.into());
        self
    }

    pub fn sys_include_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.sys_include_dirs.extend(dirs.into_iter().map(Into::into));
        self
    }

    pub fn library_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.library_dirs.push(dir.into());
        self
    }

    pub fn library_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.library_dirs.extend(dirs.into_iter().map(Into::into));
        self
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

    pub fn build(self) -> Result<Session<T>, ConfigurationError> {
        let mut options = self.args;
        options.extend(self.options);
        let config = SessionConfig {
            options,
            defines: self.defines.build()?,
            include_dirs: self.include_dirs,
            sys_include_dirs: self.sys_include_dirs,
            library_dirs: self.library_dirs,
        };
        Ok(Session::new(self.toolchain, config))
    }
}

pub struct Session<T> {
    toolchain: T,
    config: SessionConfig,
}

impl<T: Toolchain> Session<T> {
    pub fn new(toolchain: T, config: SessionConfig) -> Self {
        Self { toolchain, config }
    }

    pub fn builder(toolchain: T) -> SessionBuilder<T> {
        SessionBuilder::new(toolchain)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn options(&self) -> &[String] {
        &self.config.options
    }

    pub fn defines(&self) -> &Defines {
        &self.config.defines
    }

    pub fn include_dirs(&self) -> &[PathBuf] {
        &self.config.include_dirs
    }

    pub fn sys_include_dirs(&self) -> &[PathBuf] {
        &self.config.sys_include_dirs
    }

    pub fn library_dirs(&self) -> &[PathBuf] {
        &self.config.library_dirs
    }

    /// Compile and link `units`, then call the entry point of the image.
    pub fn run<I>(&self, units: I) -> Result<i32, CoreError>
    where
        I: IntoIterator,
        I::Item: Into<LinkUnit>,
    {
        self.build(units)?.run()
    }

    /// Compile every unit in order and link them into one image.
    ///
    /// The first fatal diagnostic aborts the build: later units are not
    /// compiled and nothing is linked.
    pub fn build<I>(&self, units: I) -> Result<Binary<T::Context>, CoreError>
    where
        I: IntoIterator,
        I::Item: Into<LinkUnit>,
    {
        let units: Vec<LinkUnit> = units.into_iter().map(Into::into).collect();
        if units.is_empty() {
            return Err(ExecutionError::NoLinkUnits.into());
        }

        let mut context = self.toolchain.context()?;
        self.configure(&mut context)?;

        let session_defines = &self.config.defines;
        apply_symbols(&mut context, &Defines::new(), session_defines);

        let mut warnings = Vec::new();
        for unit in &units {
            let effective = merge(session_defines, unit.defines());
            debug!(
                unit = %unit.display_name(),
                local_defines = unit.defines().len(),
                "compiling link unit"
            );
            apply_symbols(&mut context, session_defines, &effective);
            let outcome = match unit {
                LinkUnit::Code { source, .. } => {
                    context.compile_source(source, INLINE_SOURCE_NAME)?
                }
                LinkUnit::File { path, .. } => context.compile_file(path)?,
            };
            self.check(CompilePhase::Compile, outcome, &mut warnings)?;
            apply_symbols(&mut context, &effective, session_defines);
        }

        let outcome = context.link()?;
        let image = self.check(CompilePhase::Link, outcome, &mut warnings)?;
        info!(
            units = units.len(),
            warnings = warnings.len(),
            "link units compiled and linked"
        );

        Ok(Binary {
            context,
            image,
            warnings,
        })
    }

    fn configure(&self, context: &mut T::Context) -> Result<(), CoreError> {
        for option in &self.config.options {
            context.set_option(option)?;
        }
        for dir in &self.config.include_dirs {
            context.add_include_dir(dir)?;
        }
        for dir in &self.config.sys_include_dirs {
            context.add_sys_include_dir(dir)?;
        }
        for dir in &self.config.library_dirs {
            context.add_library_dir(dir)?;
        }
        Ok(())
    }

    /// Turns an outcome into its value, or into the error for its first
    /// fatal diagnostic. Non-fatal diagnostics are appended to `warnings`.
    fn check<V>(
        &self,
        phase: CompilePhase,
        outcome: Outcome<V>,
        warnings: &mut Vec<Diagnostic>,
    ) -> Result<V, CoreError> {
        let (result, lines) = match outcome {
            Outcome::Done { value, lines } => (Ok(value), lines),
            Outcome::Failed { message, lines } => (Err(message), lines),
        };
        let diagnostics = lines
            .iter()
            .map(|line| Diagnostic::parse(line))
            .collect::<Result<Vec<_>, _>>()?;

        let deny_warnings = self.config.warnings_as_errors();
        if let Some(index) = diagnostics
            .iter()
            .position(|diagnostic| deny_warnings || diagnostic.is_error())
        {
            let diagnostic = diagnostics[index].clone();
            return Err(CompileError::located(phase, lines[index].clone(), diagnostic).into());
        }

        match result {
            Ok(value) => {
                warnings.extend(diagnostics);
                Ok(value)
            }
            Err(message) => Err(CompileError::unlocated(phase, message.trim_end()).into()),
        }
    }
}

impl<T> fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn apply_symbols<C: Context>(context: &mut C, current: &Defines, target: &Defines) {
    for change in current.transition(target) {
        match change {
            SymbolChange::Define(name, value) => context.define(name, value),
            SymbolChange::Undefine(name) => context.undefine(name),
        }
    }
}

/// A linked image together with the context that produced it.
pub struct Binary<C: Context> {
    context: C,
    image: C::Image,
    warnings: Vec<Diagnostic>,
}

impl<C: Context> Binary<C> {
    /// Non-fatal diagnostics of every unit and of the link, in order.
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    pub fn image(&self) -> &C::Image {
        &self.image
    }

    /// Call the entry point and return its result.
    ///
    /// Blocks until the entry point returns.
    pub fn run(&mut self) -> Result<i32, CoreError> {
        debug!("executing entry point");
        let result = self.context.execute(&self.image)?;
        info!(result, "entry point returned");
        Ok(result)
    }
}

impl<C: Context> fmt::Debug for Binary<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binary")
            .field("warnings", &self.warnings)
            .finish_non_exhaustive()
    }
}
