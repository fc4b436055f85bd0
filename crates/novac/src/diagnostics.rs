//! Typed diagnostic records and the per-package sink that accumulates them.
//!
//! Every phase reports failures through [`Diagnostics::push`] instead of
//! returning early; the package driver decides whether to halt by checking
//! [`Diagnostics::error_count`] after each phase, per the propagation policy
//! in the design notes. This mirrors the teacher's `ExcType`/`RunError`
//! split: one `strum`-derived tag enum for matching and display, one record
//! type that carries the tag plus context.

use std::fmt;

use strum::{Display, IntoStaticStr};

use crate::{intern::InternerBuilder, location::Location};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Note => "note",
        };
        f.write_str(s)
    }
}

/// Every diagnostic kind named in the error taxonomy, grouped by the phase
/// that raises it. `strum::IntoStaticStr` gives each variant a stable code
/// string (`invalid_argument_type` style) used both for warning-disable
/// matching and for the `[<code>]` segment of the rendered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr, serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "kebab-case")]
pub enum DiagnosticKind {
    // --- lex / preparse ---
    UnexpectedToken,
    UnmatchedDelimiter,
    PrematureEof,

    // --- macro ---
    MacroNotFound,
    MacroAmbiguous,
    MacroArityMismatch,
    MacroParamKindMismatch,
    MacroUnknownParam,
    MacroRecursionLimit,

    // --- parse ---
    ExpectedToken,
    ExpectedIdentifier,
    ExpectedOnlyOneExpression,
    ExpectedOnlyOnePattern,
    ExpectedOnlyOneDataType,
    ExpectedOnlyOneGenericParam,
    LiteralOutOfRange,
    FeatureNotYetSupported,

    // --- analysis ---
    NameNotFound,
    DuplicateName,
    TypeMismatch,
    OperatorNotResolvable,
    OperatorAmbiguous,
    GenericArityMismatch,
    UnusedCapture,
    NonExhaustiveMatch,
    UnreachableMatchArm,
    VariableNotMutable,
    RecursiveType,
}

impl DiagnosticKind {
    /// Whether a diagnostic of this kind is raised with `Severity::Warning`
    /// by default. Everything else defaults to `Severity::Error`; callers
    /// that need a `Note` construct one explicitly via [`Diagnostic::note`].
    #[must_use]
    pub const fn default_severity(self) -> Severity {
        match self {
            Self::UnusedCapture | Self::UnreachableMatchArm => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Stable code string, e.g. `"non-exhaustive-match"`.
    #[must_use]
    pub fn code(self) -> &'static str {
        self.into()
    }
}

/// A single diagnostic record: `{ severity, kind, location, help, detail }`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub location: Location,
    pub message: String,
    pub help: Option<String>,
    /// A secondary location and message, e.g. a macro's definition site when
    /// reporting an error at an expansion site.
    pub detail: Option<(Location, String)>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(kind: DiagnosticKind, location: Location, message: impl Into<String>) -> Self {
        Self {
            severity: kind.default_severity(),
            kind,
            location,
            message: message.into(),
            help: None,
            detail: None,
        }
    }

    #[must_use]
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    #[must_use]
    pub fn with_detail(mut self, location: Location, message: impl Into<String>) -> Self {
        self.detail = Some((location, message.into()));
        self
    }

    /// Renders the byte-exact header line: `"<file>:<line>:<col>: <severity>[<code>]: <msg>\n"`.
    ///
    /// Source excerpt + caret span are left to the driver, since this core
    /// has no access to the raw source buffer (only the scanner does).
    #[must_use]
    pub fn render_header(&self, interner: &InternerBuilder) -> String {
        format!(
            "{}: {}[{}]: {}\n",
            crate::location::format_start(self.location, interner),
            self.severity,
            self.kind.code(),
            self.message
        )
    }
}

/// Per-package accumulator of diagnostics, with error/warning counts used to
/// gate phase advancement (§5/§7: "if `count_error > 0` the driver halts").
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Diagnostics {
    records: Vec<Diagnostic>,
    error_count: usize,
    warning_count: usize,
    /// Warning codes suppressed via `warning_disables`. Errors and notes are
    /// never suppressible.
    disabled: Vec<String>,
}

impl Diagnostics {
    #[must_use]
    pub fn new(disabled: Vec<String>) -> Self {
        Self { disabled, ..Self::default() }
    }

    /// Records a diagnostic unless it is a disabled warning.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        if diagnostic.severity == Severity::Warning && self.disabled.iter().any(|c| c == diagnostic.kind.code()) {
            return;
        }
        match diagnostic.severity {
            Severity::Error => self.error_count += 1,
            Severity::Warning => self.warning_count += 1,
            Severity::Note => {}
        }
        self.records.push(diagnostic);
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    #[must_use]
    pub fn records(&self) -> &[Diagnostic] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
    use crate::{
        intern::InternerBuilder,
        location::{Location, Pos},
    };

    fn loc(interner: &mut InternerBuilder) -> Location {
        let file = interner.intern("main.nv");
        Location::point(file, Pos::new(0, 0, 0))
    }

    #[test]
    fn warnings_are_suppressible_errors_are_not() {
        let mut interner = InternerBuilder::new();
        let l = loc(&mut interner);
        let mut diags = Diagnostics::new(vec![DiagnosticKind::UnusedCapture.code().to_owned()]);
        diags.push(Diagnostic::new(DiagnosticKind::UnusedCapture, l, "capture `x` unused"));
        diags.push(Diagnostic::new(DiagnosticKind::NameNotFound, l, "`y` not found"));
        assert_eq!(diags.warning_count(), 0, "disabled warning code should be dropped");
        assert_eq!(diags.error_count(), 1);
        assert!(diags.has_errors());
    }

    #[test]
    fn header_matches_byte_exact_format() {
        let mut interner = InternerBuilder::new();
        let l = loc(&mut interner);
        let diag = Diagnostic::new(DiagnosticKind::NameNotFound, l, "`y` not found");
        assert_eq!(diag.render_header(&interner), "main.nv:1:1: error[name-not-found]: `y` not found\n");
        let _ = Severity::Note;
    }
}
