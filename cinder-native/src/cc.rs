//! The host C compiler as a [`Toolchain`].
//!
//! Every context owns a scratch directory. Units are compiled there to
//! position-independent objects and linked into one shared object, which is
//! then loaded as a [`CcImage`]. The driver always runs in the `C` locale so
//! its diagnostics keep the `<file>:<line>: <severity>: <text>` shape.

use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use cinder_core::{Context, CoreError, Outcome, Toolchain};
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, warn};

use crate::image::CcImage;
use crate::stderr::located_lines;

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("C compiler `{program}` was not found")]
    NotFound {
        program: String,
        #[source]
        source: which::Error,
    },
}

/// The host C compiler driver (`$CC`, or `cc`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CcToolchain {
    program: PathBuf,
}

impl CcToolchain {
    pub fn detect() -> Result<Self, DetectError> {
        let name = env::var_os("CC")
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| OsString::from("cc"));
        let program = which::which(&name).map_err(|source| DetectError::NotFound {
            program: name.to_string_lossy().into_owned(),
            source,
        })?;
        debug!(program = %program.display(), "detected C compiler");
        Ok(Self { program })
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Toolchain for CcToolchain {
    type Context = CcContext;

    fn context(&self) -> Result<CcContext, CoreError> {
        CcContext::new(self.program.clone())
    }
}

/// One compilation: a scratch directory holding the units' sources and
/// objects, and the accumulated command-line state.
#[derive(Debug)]
pub struct CcContext {
    program: PathBuf,
    workdir: TempDir,
    options: Vec<String>,
    include_dirs: Vec<PathBuf>,
    sys_include_dirs: Vec<PathBuf>,
    library_dirs: Vec<PathBuf>,
    symbols: BTreeMap<String, Option<String>>,
    objects: Vec<PathBuf>,
    compiled: usize,
    links: usize,
}

impl CcContext {
    fn new(program: PathBuf) -> Result<Self, CoreError> {
        let workdir = tempfile::Builder::new().prefix("cinder-").tempdir()?;
        debug!(workdir = %workdir.path().display(), "created compilation context");
        Ok(Self {
            program,
            workdir,
            options: Vec::new(),
            include_dirs: Vec::new(),
            sys_include_dirs: Vec::new(),
            library_dirs: Vec::new(),
            symbols: BTreeMap::new(),
            objects: Vec::new(),
            compiled: 0,
            links: 0,
        })
    }

    pub fn workdir(&self) -> &Path {
        self.workdir.path()
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.env("LC_ALL", "C").env_remove("LANGUAGE");
        command
    }

    fn compile_path(&mut self, source: &Path) -> Result<Outcome<()>, CoreError> {
        let object = self
            .workdir
            .path()
            .join(format!("unit{}.o", self.compiled));
        self.compiled += 1;

        let mut command = self.command();
        command.args([
            "-c",
            "-fPIC",
            "-fno-show-column",
            "-fno-diagnostics-show-caret",
            "-fdiagnostics-color=never",
        ]);
        command.args(&self.options);
        for dir in &self.include_dirs {
            command.arg("-I").arg(dir);
        }
        for dir in &self.sys_include_dirs {
            command.arg("-isystem").arg(dir);
        }
        for (name, value) in &self.symbols {
            command.arg(match value {
                Some(value) => format!("-D{name}={value}"),
                None => format!("-D{name}"),
            });
        }
        command.arg("-o").arg(&object).arg(source);

        let output = invoke(command)?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        let lines = located_lines(&stderr);
        if output.status.success() {
            self.objects.push(object);
            Ok(Outcome::Done { value: (), lines })
        } else {
            Ok(Outcome::Failed {
                message: stderr.into_owned(),
                lines,
            })
        }
    }
}

impl Context for CcContext {
    type Image = CcImage;

    fn set_option(&mut self, flag: &str) -> Result<(), CoreError> {
        self.options.push(if flag.starts_with('-') {
            flag.to_string()
        } else {
            format!("-{flag}")
        });
        Ok(())
    }

    fn add_include_dir(&mut self, dir: &Path) -> Result<(), CoreError> {
        self.include_dirs.push(dir.to_path_buf());
        Ok(())
    }

    fn add_sys_include_dir(&mut self, dir: &Path) -> Result<(), CoreError> {
        self.sys_include_dirs.push(dir.to_path_buf());
        Ok(())
    }

    fn add_library_dir(&mut self, dir: &Path) -> Result<(), CoreError> {
        self.library_dirs.push(dir.to_path_buf());
        Ok(())
    }

    fn define(&mut self, name: &str, value: Option<&str>) {
        self.symbols
            .insert(name.to_string(), value.map(str::to_string));
    }

    fn undefine(&mut self, name: &str) {
        self.symbols.remove(name);
    }

    fn compile_source(&mut self, source: &str, name: &str) -> Result<Outcome<()>, CoreError> {
        let path = self
            .workdir
            .path()
            .join(format!("unit{}.c", self.compiled));
        let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
        fs::write(&path, format!("#line 1 \"{escaped}\"\n{source}\n"))?;
        self.compile_path(&path)
    }

    fn compile_file(&mut self, path: &Path) -> Result<Outcome<()>, CoreError> {
        self.compile_path(path)
    }

    fn link(&mut self) -> Result<Outcome<CcImage>, CoreError> {
        let image = self.workdir.path().join(format!(
            "image{}.{}",
            self.links,
            env::consts::DLL_EXTENSION
        ));
        self.links += 1;

        let mut command = self.command();
        command.arg("-shared").arg("-o").arg(&image);
        command.args(&self.objects);
        for dir in &self.library_dirs {
            command.arg("-L").arg(dir);
        }
        command.args(&self.options);
        // Definitions inside the image win over same-named symbols already
        // loaded in the process.
        #[cfg(target_os = "linux")]
        command.args(["-Wl,--no-undefined", "-Wl,-Bsymbolic"]);

        let output = invoke(command)?;
        if !output.status.success() {
            return Ok(Outcome::Failed {
                message: String::from_utf8_lossy(&output.stderr).into_owned(),
                lines: Vec::new(),
            });
        }
        if !output.stderr.is_empty() {
            warn!(
                stderr = %String::from_utf8_lossy(&output.stderr).trim_end(),
                "linker reported messages"
            );
        }

        Ok(Outcome::Done {
            value: CcImage::load(image)?,
            lines: Vec::new(),
        })
    }

    fn execute(&mut self, image: &CcImage) -> Result<i32, CoreError> {
        image.call_entry_point()
    }
}

fn invoke(mut command: Command) -> Result<Output, CoreError> {
    debug!(command = ?command, "invoking C compiler");
    let output = command.stdin(Stdio::null()).output()?;
    debug!(status = %output.status, "C compiler finished");
    Ok(output)
}
