//! Structured diagnostics shared by the checker and the compilers.
//!
//! The checker evaluates every rule and returns all violations at once, so an
//! operator can fix a catalog in a single round. Warnings travel on a separate
//! channel and can be suppressed per-run by the caller.

use std::fmt;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation continues; can be suppressed.
    Warning,
    /// Current operation aborts; the caller keeps its previous catalog.
    Error,
    /// Assertion failure inside the kernel.
    Internal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Internal => write!(f, "internal"),
        }
    }
}

/// A single diagnostic produced by a rule or a compiler.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Rule or condition code, e.g. `sibling-discriminator`.
    pub code: String,
    /// Severity of this diagnostic.
    pub severity: Severity,
    /// Human-readable description.
    pub message: String,
    /// Names of the atoms or hyperedges involved.
    pub offending: Vec<String>,
}

impl Diagnostic {
    /// Create an error diagnostic.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            severity: Severity::Error,
            message: message.into(),
            offending: Vec::new(),
        }
    }

    /// Create a warning diagnostic.
    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            severity: Severity::Warning,
            message: message.into(),
            offending: Vec::new(),
        }
    }

    /// Attach the names of the offending elements.
    pub fn with_offending(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.offending = names.into_iter().map(Into::into).collect();
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.severity, self.code, self.message)?;
        if !self.offending.is_empty() {
            write!(f, " ({})", self.offending.join(", "))?;
        }
        Ok(())
    }
}

/// Outcome of a full checker pass over a catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckReport {
    diagnostics: Vec<Diagnostic>,
}

impl CheckReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic to the report.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Add all diagnostics from an iterator.
    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }

    /// True when the report contains no error or internal diagnostics.
    pub fn is_ok(&self) -> bool {
        self.errors().next().is_none()
    }

    /// All diagnostics, in rule evaluation order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Error and internal diagnostics only.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity != Severity::Warning)
    }

    /// Warning diagnostics only.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    /// True if any diagnostic carries the given rule code.
    pub fn fired(&self, code: &str) -> bool {
        self.diagnostics.iter().any(|d| d.code == code)
    }
}
