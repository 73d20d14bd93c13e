use std::fmt;

/// Category of a non-fatal load problem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// An entity reference GUID matched nothing in the batch, or matched an
    /// entity of the wrong type. The field was left unset.
    UnresolvedReference,
    /// The asset resolver has no asset for the persisted key.
    UnresolvedAsset,
    /// A component's `.type` names no registered component type; the
    /// component was kept verbatim.
    UnknownComponentType,
    /// A component failed to decode and was kept verbatim.
    SalvagedComponent,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UnresolvedReference => "unresolved reference",
            Self::UnresolvedAsset => "unresolved asset",
            Self::UnknownComponentType => "unknown component type",
            Self::SalvagedComponent => "salvaged component",
        })
    }
}

/// A problem that did not stop the load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Where it happened, e.g. `A.components[1].target`.
    pub path: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: {}", self.kind, self.path, self.message)
    }
}
