//! The [`Objective`] trait defines what gets scored.
//!
//! For most searches a closure is enough; pass it to
//! [`SearchConfig::model`](crate::config::SearchConfig::model):
//!
//! ```
//! use hypersearch::prelude::*;
//!
//! let space = SearchSpace::new(vec![Dimension::range("x", -10..11)]).unwrap();
//! let config = SearchConfig::new().model("parabola", space, |p: &ParameterAssignment, _: &()| {
//!     let x = p.get("x").and_then(ParamValue::as_f64).unwrap_or_default();
//!     Ok::<_, String>(-(x - 3.0).powi(2))
//! });
//! assert_eq!(config.len(), 1);
//! ```
//!
//! Implement [`Objective`] on a struct when the scorer carries its own state
//! and pass it to
//! [`SearchConfig::model_objective`](crate::config::SearchConfig::model_objective).

use std::sync::Arc;

use crate::space::ParameterAssignment;

/// A scoring function over decoded parameter assignments.
///
/// `D` is the opaque training data passed through unchanged from the
/// search invocation. The engine never looks at how the score is computed;
/// it only requires the result to be finite.
pub trait Objective<D: ?Sized>: Send + Sync {
    /// The error type returned by [`evaluate`](Objective::evaluate).
    type Error: ToString;

    /// Scores one parameter assignment.
    ///
    /// # Errors
    ///
    /// Any error whose type implements `ToString`. It aborts the search of
    /// the affected model only.
    fn evaluate(&self, params: &ParameterAssignment, data: &D) -> Result<f64, Self::Error>;
}

impl<D, F, E> Objective<D> for F
where
    D: ?Sized,
    F: Fn(&ParameterAssignment, &D) -> Result<f64, E> + Send + Sync,
    E: ToString,
{
    type Error = E;

    fn evaluate(&self, params: &ParameterAssignment, data: &D) -> Result<f64, E> {
        self(params, data)
    }
}

/// Type-erased objective shared between the controller and its engines.
pub type ObjectiveFn<D> =
    Arc<dyn Fn(&ParameterAssignment, &D) -> Result<f64, String> + Send + Sync>;

pub(crate) fn erase<D, O>(objective: O) -> ObjectiveFn<D>
where
    D: ?Sized + 'static,
    O: Objective<D> + 'static,
{
    Arc::new(move |params: &ParameterAssignment, data: &D| {
        objective.evaluate(params, data).map_err(|e| e.to_string())
    })
}
