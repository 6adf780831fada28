//! Error taxonomy for indexing

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while indexing a single file.
///
/// Parse and read failures are per-file: the session records them and moves
/// on. A lock failure is fatal to the writer that hit it and is handed back
/// to the caller of the session for retry.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("could not acquire the store lock for task '{task}'")]
    LockAcquisition { task: String },
}

impl IndexError {
    /// True for errors that only mean "skip this file"
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, IndexError::Read { .. } | IndexError::Parse { .. })
    }
}

pub type IndexResult<T> = Result<T, IndexError>;

/// What kind of reference failed to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Import,
    Base,
    Call,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::Import => write!(f, "import"),
            ReferenceKind::Base => write!(f, "base class"),
            ReferenceKind::Call => write!(f, "call"),
        }
    }
}

/// A reference that could not be mapped to an indexed symbol.
///
/// Never an error: the dependent edge is simply not created.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Diagnostic {
    pub kind: ReferenceKind,
    /// Symbol the reference was made from (module, class or function FQN)
    pub context: String,
    pub name: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unresolved {} '{}' in {}", self.kind, self.name, self.context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_failures_are_classified() {
        let parse = IndexError::Parse {
            path: PathBuf::from("a.py"),
            reason: "syntax error".into(),
        };
        let lock = IndexError::LockAcquisition { task: "t".into() };
        assert!(parse.is_parse_failure());
        assert!(!lock.is_parse_failure());
        assert_eq!(
            lock.to_string(),
            "could not acquire the store lock for task 't'"
        );
    }

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic {
            kind: ReferenceKind::Base,
            context: "pkg.mod.Child".into(),
            name: "Missing".into(),
        };
        assert_eq!(d.to_string(), "unresolved base class 'Missing' in pkg.mod.Child");
    }
}
