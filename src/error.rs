//! Error and diagnostic types.
use crate::atom::Atom;
use std::fmt;
use thiserror::Error;

/// Convenient return type for functions in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The crate's public error type.
///
/// Compilation failures carry the full list of [`Diagnostic`]s accumulated
/// while parsing and merging every section; per spec §7, no partial keymap
/// is ever exposed when the diagnostic count of any section is non-zero.
#[derive(Debug, Error)]
pub enum Error {
    /// Generic I/O error, e.g. reading an include file.
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),

    /// Compilation failed; see the attached diagnostics for detail.
    #[error("compilation failed with {} diagnostic(s)", .0.len())]
    Compile(Vec<Diagnostic>),

    /// An include cycle was detected while resolving `include` statements.
    #[error("include cycle: {}", .0.join(" -> "))]
    IncludeCycle(Vec<String>),

    /// State reached that should be impossible; corresponds to the
    /// original implementation's `log_wsgo` ("should never happen") sites.
    #[error("internal invariant violated: {0}")]
    Internal(&'static str),
}

/// The severity/category of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    Lex,
    Parse,
    Include,
    Semantic,
    Integrity,
    Internal,
}

/// Whether a [`Diagnostic`] is fatal to the compilation it was raised in.
///
/// Spec §7 distinguishes the two: a warning ("clipped with a warning",
/// "truncation warning", a merge-mode redefinition) is local recovery and
/// never by itself fails `keymap_new_*`; only a non-zero *error* count does
/// (spec §7 "After compilation, if the accumulated error count of any
/// section is non-zero..."). [`DiagnosticBag::error_count`] counts only
/// [`Severity::Error`] entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiagnosticKind::Lex => "lex",
            DiagnosticKind::Parse => "parse",
            DiagnosticKind::Include => "include",
            DiagnosticKind::Semantic => "semantic",
            DiagnosticKind::Integrity => "integrity",
            DiagnosticKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// A source location: file name (as interned by the owning context) plus
/// 1-based line/column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    pub file: Atom,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(file: Atom, line: u32, column: u32) -> Self {
        Location { file, line, column }
    }
}

/// One error/warning/info/debug record produced while compiling a keymap.
///
/// Every error the spec describes (§4.8, §7) carries a kind, a location and
/// a formatted message; `log_wsgo`-style internal diagnostics are always
/// emitted regardless of verbosity (see [`crate::context::Context::log_wsgo`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub location: Option<Location>,
    pub message: String,
}

impl Diagnostic {
    /// An error-severity diagnostic with no source location.
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Diagnostic {
            kind,
            severity: Severity::Error,
            location: None,
            message: message.into(),
        }
    }

    /// An error-severity diagnostic at a source location.
    pub fn at(kind: DiagnosticKind, location: Location, message: impl Into<String>) -> Self {
        Diagnostic {
            kind,
            severity: Severity::Error,
            location: Some(location),
            message: message.into(),
        }
    }

    /// A warning: local recovery per spec §7, never counted by
    /// [`DiagnosticBag::error_count`].
    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Diagnostic {
            kind,
            severity: Severity::Warning,
            location: None,
            message: message.into(),
        }
    }

    /// A warning at a source location; see [`Self::warning`].
    pub fn warning_at(kind: DiagnosticKind, location: Location, message: impl Into<String>) -> Self {
        Diagnostic {
            kind,
            severity: Severity::Warning,
            location: Some(location),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{} ({}): {}", prefix, self.kind, self.message)
    }
}

/// Accumulates diagnostics for one compilation (one [`crate::Keymap::from_string`]
/// call, not one section). Section compilers abort their own section when
/// too many accumulate, but never abort the whole compilation outright;
/// that decision is made once, when the caller inspects the tally at the
/// very end (spec §7: "Local recovery").
#[derive(Debug, Default)]
pub struct DiagnosticBag {
    diagnostics: Vec<Diagnostic>,
    errors: usize,
}

impl DiagnosticBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `diagnostic` and, per SPEC_FULL §A.1, logs it through the
    /// `log` facade alongside accumulating it for the caller. Only
    /// [`Severity::Error`] diagnostics count toward [`Self::error_count`]
    /// (spec §7 local recovery: a warning never fails the compilation).
    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => {
                self.errors += 1;
                log::error!("{}", diagnostic);
            }
            Severity::Warning => log::warn!("{}", diagnostic),
        }
        self.diagnostics.push(diagnostic);
    }

    /// The number of [`Severity::Error`] diagnostics pushed so far; warnings
    /// are excluded, so a section that only ever warned compiles cleanly.
    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn extend(&mut self, other: DiagnosticBag) {
        self.errors += other.errors;
        self.diagnostics.extend(other.diagnostics);
    }
}
