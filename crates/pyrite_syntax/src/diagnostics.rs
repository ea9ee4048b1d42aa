//! Diagnostics (errors, warnings) with file/line positions.

use std::fmt;

#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
    /// 1-based source line, when known.
    pub line: Option<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Error,
    Warning,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, line: Option<u32>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
            line,
        }
    }

    pub fn warning(message: impl Into<String>, line: Option<u32>) -> Self {
        Self {
            level: Level::Warning,
            message: message.into(),
            line,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            Level::Error => "error",
            Level::Warning => "warning",
        };
        if let Some(line) = self.line {
            write!(f, "{} at line {}: {}", level, line, self.message)
        } else {
            write!(f, "{}: {}", level, self.message)
        }
    }
}

/// Format a diagnostic with its source line (for printing).
pub fn format_diagnostic(source: &str, filename: &str, diag: &Diagnostic) -> String {
    let level = match diag.level {
        Level::Error => "error",
        Level::Warning => "warning",
    };
    let line = match diag.line {
        Some(l) => l,
        None => return format!("{}: {}", level, diag.message),
    };
    let line_content = source
        .lines()
        .nth((line as usize).saturating_sub(1))
        .unwrap_or("");
    format!(
        "{}:{}: {}: {}\n  {} | {}",
        filename, line, level, diag.message, line, line_content
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_and_without_line() {
        let d = Diagnostic::error("bad statement", Some(3));
        assert_eq!(d.to_string(), "error at line 3: bad statement");
        let d = Diagnostic::warning("ignored line", None);
        assert_eq!(d.to_string(), "warning: ignored line");
    }

    #[test]
    fn format_includes_source_line() {
        let src = "def f():\n  return 1\n";
        let d = Diagnostic::error("no parse", Some(2));
        let rendered = format_diagnostic(src, "f.pyr", &d);
        assert!(rendered.starts_with("f.pyr:2: error: no parse"));
        assert!(rendered.contains("  2 |   return 1"));
    }
}
