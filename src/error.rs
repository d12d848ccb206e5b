//! Error types.

use thiserror::Error;

use crate::reference::FormulaId;

/// Errors reported by the tableau builder, the formula preparation passes and the
/// realization search.
///
/// Apart from [`Error::Oracle`], every variant is a usage defect: the input violated a
/// precondition and the operation was aborted.
///
/// Errors only hold plain data, so they are `Send + Sync`. Formulas are referred to by
/// their [`FormulaId`]; render them with [`TermPool::display`][crate::pool::TermPool::display].
#[derive(Debug, Error)]
pub enum Error {
    #[error("free variable {name} reached the tableau builder")]
    FreeVariable { name: String },

    #[error("unexpected {kind} node {formula}")]
    UnexpectedNode { kind: &'static str, formula: FormulaId },

    #[error("label {label} is not deterministic at state {state}: {successors} successors")]
    NonDeterministic {
        state: String,
        label: String,
        successors: usize,
    },

    #[error("state {state} is not reachable from the initial state")]
    MissingPath { state: String },

    #[error("undefined function: {name}")]
    UnknownFunction { name: String },

    #[error("wrong number of arguments to {name}: expected {expected}, found {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("duplicate definition: {name}")]
    DuplicateDefinition { name: String },

    #[error(transparent)]
    Oracle(#[from] OracleError),
}

/// Failures of an over-approximation oracle. These are fatal for one search branch only.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("more than {limit} regions")]
    TooManyRegions { limit: usize },

    #[error("more than {limit} reachable markings")]
    TooManyStates { limit: usize },

    #[error("label {label} is not in the alphabet")]
    UnknownLabel { label: String },

    #[error("arc {label} from state {state} was lost")]
    LostArc { state: String, label: String },
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let e = Error::FreeVariable { name: "X".to_string() };
        assert_eq!(e.to_string(), "free variable X reached the tableau builder");

        let e = Error::from(OracleError::TooManyRegions { limit: 10 });
        assert_eq!(e.to_string(), "more than 10 regions");
        assert!(matches!(e, Error::Oracle(OracleError::TooManyRegions { limit: 10 })));

        let e = Error::UnexpectedNode {
            kind: "let",
            formula: FormulaId::new(7),
        };
        assert_eq!(e.to_string(), "unexpected let node @7");
    }

    #[test]
    fn test_errors_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<Error>();
        assert_send_sync::<OracleError>();
    }
}
