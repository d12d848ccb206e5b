//! Over-approximation oracles.
//!
//! After arcs are added to a candidate, an oracle generalizes the candidate to a system
//! of a restricted class whose behaviour includes the candidate's. The realization search
//! does not know anything about the class; the oracle's [`Overapproximation::Properties`]
//! are passed through untouched.

use crate::error::OracleError;
use crate::ts::TransitionSystem;

pub trait Overapproximation<T: TransitionSystem> {
    /// Structural restrictions of the target class, e.g. a token bound.
    type Properties;

    fn overapproximate(&self, ts: &T, properties: &Self::Properties) -> Result<T, OracleError>;
}

/// The oracle that does not generalize: every system is its own over-approximation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl<T> Overapproximation<T> for Identity
where
    T: TransitionSystem + Clone,
{
    type Properties = ();

    fn overapproximate(&self, ts: &T, _: &()) -> Result<T, OracleError> {
        Ok(ts.clone())
    }
}
