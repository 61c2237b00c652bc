//! The seam between the session state machine and the native
//! compiler/linker/loader that does the real work.
//!
//! A [`Toolchain`] is a factory; every `build` or `run` of a session asks it
//! for a fresh [`Context`], which owns all compilation state of that one run
//! and is dropped with it.

use std::path::Path;

use crate::error::CoreError;

/// Symbol every linked image must define; it is called with no arguments.
pub const ENTRY_POINT: &str = "main";

/// Result of a compile or link step.
///
/// `lines` are the located diagnostics the step produced, in emission order,
/// each in the `<file>:<line>: <severity>: <text>` shape. `Failed` carries
/// the toolchain's complete error output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Done { value: T, lines: Vec<String> },
    Failed { message: String, lines: Vec<String> },
}

impl<T> Outcome<T> {
    pub fn lines(&self) -> &[String] {
        match self {
            Self::Done { lines, .. } | Self::Failed { lines, .. } => lines,
        }
    }
}

pub trait Toolchain {
    type Context: Context;

    fn context(&self) -> Result<Self::Context, CoreError>;
}

/// One live compiler instance.
///
/// Configuration calls accumulate. The symbol table mutated by
/// [`define`](Context::define) and [`undefine`](Context::undefine) applies to
/// every compile that follows until it is changed again.
pub trait Context {
    type Image;

    fn set_option(&mut self, flag: &str) -> Result<(), CoreError>;
    fn add_include_dir(&mut self, dir: &Path) -> Result<(), CoreError>;
    fn add_sys_include_dir(&mut self, dir: &Path) -> Result<(), CoreError>;
    fn add_library_dir(&mut self, dir: &Path) -> Result<(), CoreError>;

    /// `None` defines the symbol without replacement text.
    fn define(&mut self, name: &str, value: Option<&str>);
    fn undefine(&mut self, name: &str);

    fn compile_source(&mut self, source: &str, name: &str) -> Result<Outcome<()>, CoreError>;
    fn compile_file(&mut self, path: &Path) -> Result<Outcome<()>, CoreError>;

    /// Links every unit compiled so far in this context.
    fn link(&mut self) -> Result<Outcome<Self::Image>, CoreError>;

    /// Calls the image's entry point with no arguments.
    ///
    /// This runs arbitrary native code inside the calling process.
    fn execute(&mut self, image: &Self::Image) -> Result<i32, CoreError>;
}
