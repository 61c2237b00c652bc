//! Structured compiler diagnostics.
//!
//! The toolchain reports diagnostics as single text lines of the fixed shape
//!
//! ```text
//! <filename>:<lineno>: <severity>: <text>
//! ```
//!
//! This shape is a contract with the toolchain. A line that does not follow
//! it is rejected with a [`ParseError`] instead of being guessed at.

use std::fmt;

use crate::error::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl Severity {
    const ALL: [Severity; 3] = [Severity::Error, Severity::Warning, Severity::Note];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Note => "note",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub filename: String,
    /// 1-based.
    pub lineno: u32,
    pub severity: Severity,
    pub text: String,
}

impl Diagnostic {
    /// Parse one diagnostic line.
    ///
    /// The filename is the longest prefix ending at a `:<digits>: <severity>:`
    /// boundary, so earlier `:<digits>:` runs (for example inside a
    /// drive-letter or versioned path) stay part of the filename.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        for (colon, _) in line.rmatch_indices(':') {
            let rest = &line[colon + 1..];
            let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
            if digits == 0 {
                continue;
            }
            let Some(after_lineno) = rest[digits..].strip_prefix(": ") else {
                continue;
            };
            let Some((severity, text)) = split_severity(after_lineno) else {
                continue;
            };

            if colon == 0 {
                return Err(ParseError::new(line, "missing filename"));
            }
            let lineno = match rest[..digits].parse::<u32>() {
                Ok(0) | Err(_) => return Err(ParseError::new(line, "invalid line number")),
                Ok(lineno) => lineno,
            };
            return Ok(Self {
                filename: line[..colon].to_string(),
                lineno,
                severity,
                text: text.to_string(),
            });
        }
        Err(ParseError::new(
            line,
            "no `<file>:<line>: <severity>:` boundary",
        ))
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.filename, self.lineno, self.severity, self.text
        )
    }
}

fn split_severity(input: &str) -> Option<(Severity, &str)> {
    Severity::ALL.into_iter().find_map(|severity| {
        let rest = input.strip_prefix(severity.as_str())?.strip_prefix(':')?;
        if rest.is_empty() {
            return Some((severity, rest));
        }
        rest.strip_prefix(' ').map(|text| (severity, text))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_path_diagnostic() {
        let diagnostic =
            Diagnostic::parse("dir/subdir/name.c:123: error: text and more text").expect("parse");
        assert_eq!(diagnostic.filename, "dir/subdir/name.c");
        assert_eq!(diagnostic.lineno, 123);
        assert_eq!(diagnostic.severity, Severity::Error);
        assert_eq!(diagnostic.text, "text and more text");
    }

    #[test]
    fn keeps_colon_digit_runs_inside_filename() {
        let diagnostic =
            Diagnostic::parse("C:\\build:7:\\unit.c:42: warning: unused variable").expect("parse");
        assert_eq!(diagnostic.filename, "C:\\build:7:\\unit.c");
        assert_eq!(diagnostic.lineno, 42);
        assert_eq!(diagnostic.severity, Severity::Warning);
        assert_eq!(diagnostic.text, "unused variable");
    }

    #[test]
    fn last_severity_boundary_ends_filename() {
        let diagnostic = Diagnostic::parse("dir:1: note: x/name.c:5: error: boom").expect("parse");
        assert_eq!(diagnostic.filename, "dir:1: note: x/name.c");
        assert_eq!(diagnostic.lineno, 5);
        assert_eq!(diagnostic.severity, Severity::Error);
        assert_eq!(diagnostic.text, "boom");
    }

    #[test]
    fn text_may_contain_a_location_without_severity() {
        let diagnostic =
            Diagnostic::parse("<string>:2: note: previous definition at x.h:1: here").expect("parse");
        assert_eq!(diagnostic.filename, "<string>");
        assert_eq!(diagnostic.lineno, 2);
        assert_eq!(diagnostic.severity, Severity::Note);
        assert_eq!(diagnostic.text, "previous definition at x.h:1: here");
    }

    #[test]
    fn accepts_empty_text() {
        let diagnostic = Diagnostic::parse("a.c:1: error:").expect("parse");
        assert_eq!(diagnostic.text, "");
    }

    #[test]
    fn display_reproduces_line() {
        let line = "unit.c:9: warning: \"REDEF\" redefined";
        assert_eq!(Diagnostic::parse(line).expect("parse").to_string(), line);
    }

    #[test]
    fn rejects_unknown_severity() {
        let err = Diagnostic::parse("a.c:1: sorry: unimplemented").unwrap_err();
        assert_eq!(err.reason, "no `<file>:<line>: <severity>:` boundary");
    }

    #[test]
    fn rejects_zero_line_number() {
        let err = Diagnostic::parse("a.c:0: error: nope").unwrap_err();
        assert_eq!(err.reason, "invalid line number");
    }

    #[test]
    fn rejects_missing_filename() {
        let err = Diagnostic::parse(":3: error: nope").unwrap_err();
        assert_eq!(err.reason, "missing filename");
    }

    #[test]
    fn rejects_unlocated_driver_message() {
        assert!(Diagnostic::parse("cc: error: no input files").is_err());
        assert!(Diagnostic::parse("a.c: error: no line").is_err());
    }
}
