//! Compiler configuration (§6 "Environment / CLI / config": "the core
//! consumes `{standard_level, feature_flags, warning_disables}` as an
//! immutable struct"). Grounded on the teacher's `ResourceLimits`: a small,
//! `Clone + Default + serde` config value built with a builder pattern and
//! passed by reference into the driver.

/// Which edition of the language grammar/stdlib a package targets. Gates
/// preview-only grammar (e.g. a newer pattern form) behind an explicit
/// opt-in the way a language edition normally does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, serde::Serialize, serde::Deserialize)]
pub enum StandardLevel {
    #[default]
    Stable,
    Preview,
}

/// Optional pipeline behaviors a package can turn on independently of its
/// `StandardLevel`. Kept as individual `bool` fields rather than a bitset,
/// matching the teacher's flat `ResourceLimits`/`struct_excessive_bools`
/// convention for small config structs.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct FeatureFlags {
    /// Treat every `DiagnosticKind::default_severity() == Warning` as an
    /// error instead, regardless of `warning_disables`.
    pub warnings_as_errors: bool,
    /// Allow top-level macro-expand decls to themselves expand to more
    /// macro-expand decls, beyond the single re-expansion step §4.2 already
    /// performs, up to the macro engine's own recursion limit.
    pub recursive_macro_expansion: bool,
}

/// `{standard_level, feature_flags, warning_disables}` (§6), owned by the
/// package driver and threaded by reference through every phase that needs
/// it (currently the diagnostic sink's warning filter and the macro
/// engine's recursion check).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct CompilerConfig {
    pub standard_level: StandardLevel,
    pub feature_flags: FeatureFlags,
    /// Warning `DiagnosticKind` codes (§7, e.g. `"unused-capture"`) to drop
    /// before they reach the sink. Errors and notes are never suppressible.
    pub warning_disables: Vec<String>,
}

impl CompilerConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn standard_level(mut self, level: StandardLevel) -> Self {
        self.standard_level = level;
        self
    }

    #[must_use]
    pub const fn feature_flags(mut self, flags: FeatureFlags) -> Self {
        self.feature_flags = flags;
        self
    }

    #[must_use]
    pub fn warning_disable(mut self, code: impl Into<String>) -> Self {
        self.warning_disables.push(code.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{CompilerConfig, StandardLevel};

    #[test]
    fn builder_chains_settings() {
        let config = CompilerConfig::new().standard_level(StandardLevel::Preview).warning_disable("unused-capture");
        assert_eq!(config.standard_level, StandardLevel::Preview);
        assert_eq!(config.warning_disables, vec!["unused-capture".to_owned()]);
    }

    #[test]
    fn default_is_stable_with_no_disables() {
        let config = CompilerConfig::default();
        assert_eq!(config.standard_level, StandardLevel::Stable);
        assert!(config.warning_disables.is_empty());
    }
}
