//! Extraction of located diagnostics from the compiler's stderr.
//!
//! `cc` interleaves located diagnostics with context lines (`In function
//! ...`, source excerpts, `N errors generated.`, driver messages). Only lines
//! that parse as a [`Diagnostic`] are forwarded; everything else stays in the
//! raw failure message.

use cinder_core::Diagnostic;

/// Located lines of `stderr`, in order, with `fatal error` folded into `error`.
pub fn located_lines(stderr: &str) -> Vec<String> {
    stderr
        .lines()
        .map(|line| line.replacen(": fatal error: ", ": error: ", 1))
        .filter(|line| Diagnostic::parse(line).is_ok())
        .collect()
}
