//! Native toolchain for Cinder.
//!
//! Compiles link units with the host C compiler driver, links them into a
//! shared object in a per-run scratch directory, and loads that object into
//! the current process to call its entry point.
//!
//! Loading the image runs arbitrary native code in the host process, with no
//! sandbox. Only run sources you trust.

mod cc;
mod image;
mod stderr;

pub use cc::{CcContext, CcToolchain, DetectError};
pub use image::CcImage;
pub use stderr::located_lines;
