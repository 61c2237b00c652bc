//! Core of the Cinder in-memory C runner.
//!
//! A host program describes C fragments as link units, and a session drives
//! an external compiler/linker/loader through them:
//!
//!   session config + link units
//!     -> per-unit define layering (defines)
//!     -> compile each unit        (toolchain::Context)
//!     -> diagnostics              (diagnostic, error)
//!     -> link into one image
//!     -> call the entry point in-process
//!
//! The compiler itself lives behind the [`toolchain`] traits; concrete
//! toolchains (such as `cinder-native`) implement them.

// ---------------------------------------------------------------------
// Error handling and diagnostics
// ---------------------------------------------------------------------

pub mod diagnostic;
pub mod error;

// ---------------------------------------------------------------------
// Inputs: symbol tables and link units
// ---------------------------------------------------------------------

pub mod defines;
pub mod unit;

// ---------------------------------------------------------------------
// Orchestration
// ---------------------------------------------------------------------

pub mod toolchain;
pub mod session;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use defines::{Defines, merge};
pub use diagnostic::{Diagnostic, Severity};
pub use error::{
    CompileError, CompilePhase, ConfigurationError, CoreError, ExecutionError, ParseError,
};
pub use session::{Binary, Session, SessionBuilder, SessionConfig};
pub use toolchain::{Context, ENTRY_POINT, Outcome, Toolchain};
pub use unit::LinkUnit;
