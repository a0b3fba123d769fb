//! Diagnostic collection.
//!
//! Both passes report through a [`DiagnosticSink`] and never inspect the outcome. The
//! [`Diagnostics`] collector keeps entries in report order and drops exact repeats, so revisiting
//! a subtree cannot duplicate a message.

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::errors::TypeCheckError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    /// Elaborates the entry reported immediately before it.
    Detail,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub error: TypeCheckError,
}

pub trait DiagnosticSink {
    fn report(&mut self, severity: Severity, error: TypeCheckError);

    fn error(&mut self, error: TypeCheckError) {
        self.report(Severity::Error, error);
    }

    fn warning(&mut self, error: TypeCheckError) {
        self.report(Severity::Warning, error);
    }

    /// Reports `primary` followed by a detail entry pointing at a related location.
    fn error_with_detail(&mut self, primary: TypeCheckError, detail: TypeCheckError) {
        self.report(Severity::Error, primary);
        self.report(Severity::Detail, detail);
    }
}

#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    reported_keys: FxHashSet<String>,
}

impl DiagnosticSink for Diagnostics {
    fn report(&mut self, severity: Severity, error: TypeCheckError) {
        let key = format!("{severity:?}:{error}");
        if self.reported_keys.contains(&key) {
            return;
        }
        self.reported_keys.insert(key);
        debug!(target: "streamc::diagnostics", ?severity, "{error}");
        self.entries.push(Diagnostic { severity, error });
    }
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "this is a pure lookup with no side effects"]
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn errors(&self) -> impl Iterator<Item = &TypeCheckError> + '_ {
        self.with_severity(Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &TypeCheckError> + '_ {
        self.with_severity(Severity::Warning)
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &TypeCheckError> + '_ {
        self.entries
            .iter()
            .filter(move |entry| entry.severity == severity)
            .map(|entry| &entry.error)
    }
}
