#![doc = include_str!("../../../README.md")]

pub mod analyze;
pub mod ast;
pub mod config;
pub mod diagnostics;
pub mod intern;
pub mod location;
pub mod mir;
pub mod package;
pub mod parser;
pub mod preparse;
pub mod scope;
pub mod signature;
pub mod token;

pub use crate::{
    analyze::{
        Analyzer, CheckedConst, CheckedExpr, CheckedExprKind, CheckedFun, CheckedFunBody, CheckedMatchArm,
        CheckedPackage, CheckedStmt, CheckedStruct,
    },
    config::{CompilerConfig, FeatureFlags, StandardLevel},
    diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity},
    intern::{InternerBuilder, StringId},
    location::{Location, Pos},
    mir::{Module, builder::MirBuilder},
    package::{CompiledPackage, Package},
    scope::{ScopeId, ScopeTree, SymbolId, SymbolKind},
    token::Token,
};
