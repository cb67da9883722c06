//! Seams between the engine and whatever hosts it.
//!
//! A host supplies three collaborators:
//! - a [`ProgramModel`] that lists annotated callables and hands out their bodies,
//! - a [`Diagnostics`] sink for notes and errors,
//! - an [`ArtifactEmitter`] that materializes companion artifacts.

use std::fmt;
use std::io;

use proc_macro2::{Ident, Span};
use syn::{Attribute, Block};

use crate::companion::CompanionArtifact;
use crate::marker::{Marker, ResolvedMarker};

/// Arena index of a callable within a program model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallableId(pub usize);

/// The type a callable belongs to, and the module path it lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub name: Ident,
    pub namespace: Vec<String>,
}

impl Owner {
    pub fn new(name: Ident, namespace: Vec<String>) -> Self {
        Self { name, namespace }
    }

    /// `a::b::Name`, or just `Name` at the root.
    pub fn qualified(&self) -> String {
        let mut parts = self.namespace.clone();
        parts.push(self.name.to_string());
        parts.join("::")
    }
}

/// A callable carrying the marker attribute, as listed by a [`ProgramModel`].
#[derive(Debug, Clone)]
pub struct AnnotatedCallable {
    pub id: CallableId,
    pub name: Ident,
    pub owner: Option<Owner>,
    /// The first attribute matching the marker.
    pub marker: Attribute,
    pub is_const: bool,
    /// False for declarations without a body, such as required trait methods.
    pub has_body: bool,
}

/// Read and write access to the program being instrumented.
pub trait ProgramModel {
    /// Attribute paths that denote `marker` in this program, or `None` when the
    /// marker is not in scope at all.
    fn resolve_marker(&self, marker: &Marker) -> Option<ResolvedMarker>;

    /// Every callable with an attribute matching `marker`, in source order.
    fn annotated(&self, marker: &ResolvedMarker) -> Vec<AnnotatedCallable>;

    /// Mutable body of a callable, if it has one the engine may rewrite.
    fn body_mut(&mut self, id: CallableId) -> Option<&mut Block>;

    /// Mutable attributes of a callable.
    fn attrs_mut(&mut self, id: CallableId) -> Option<&mut Vec<Attribute>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Note,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Note => write!(f, "note"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn note(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Note,
            message: message.into(),
            span: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            span: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// Receives notes and errors produced during a round.
pub trait Diagnostics {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// A sink that keeps every diagnostic for later inspection.
#[derive(Debug, Default)]
pub struct CollectedDiagnostics {
    diagnostics: Vec<Diagnostic>,
}

impl CollectedDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn into_inner(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl Diagnostics for CollectedDiagnostics {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}

/// Materializes companion artifacts, e.g. as files or as generated items.
pub trait ArtifactEmitter {
    fn emit(&mut self, artifact: &CompanionArtifact) -> io::Result<()>;
}
