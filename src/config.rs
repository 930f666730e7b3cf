//! Search and init configuration.
//!
//! A [`SearchConfig`] lists the models to search, each with its
//! [`SearchSpace`] and scoring [`Objective`]. An optional [`InitConfig`]
//! tells the engine how to pick each model's starting point.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::objective::{Objective, ObjectiveFn, erase};
use crate::space::{Dimension, ParameterAssignment, SearchSpace};
use crate::value::ParamValue;

/// The serialized form of one dimension's candidates.
///
/// ```
/// use hypersearch::config::DimensionSpec;
///
/// let spec: DimensionSpec = serde_json::from_str(r#"{"range": [2, 10, 2]}"#).unwrap();
/// let dim = spec.into_dimension("min_samples_split").unwrap();
/// assert_eq!(dim.len(), 4);
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DimensionSpec {
    /// An explicit, ordered list of candidates.
    Values(Vec<ParamValue>),
    /// An integer range `[start, end)` or `[start, end, step)`.
    Range {
        /// `[start, end]` or `[start, end, step]`.
        range: Vec<i64>,
    },
}

impl DimensionSpec {
    /// Materializes the spec into a named [`Dimension`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSearchSpace`] for a malformed range
    /// (wrong arity or a zero step).
    pub fn into_dimension(self, name: impl Into<String>) -> Result<Dimension> {
        let name = name.into();
        match self {
            Self::Values(values) => Ok(Dimension::new(name, values)),
            Self::Range { range } => {
                let (start, end, step) = match range.as_slice() {
                    [start, end] => (*start, *end, 1),
                    [start, end, step] => (*start, *end, *step),
                    _ => {
                        return Err(Error::invalid_space(format!(
                            "range for '{name}' must have 2 or 3 elements"
                        )));
                    }
                };
                if step == 0 {
                    return Err(Error::invalid_space(format!(
                        "range for '{name}' has a zero step"
                    )));
                }
                let mut values = Vec::new();
                let mut v = start;
                while (step > 0 && v < end) || (step < 0 && v > end) {
                    values.push(v);
                    v = match v.checked_add(step) {
                        Some(next) => next,
                        None => break,
                    };
                }
                Ok(Dimension::new(name, values))
            }
        }
    }
}

/// How a model's search starts.
#[derive(Clone, Debug, PartialEq)]
pub enum InitSpec {
    /// Start from this (possibly partial) assignment; unspecified dimensions
    /// are drawn at random. It only takes effect when its first key is the
    /// first dimension of the space, otherwise the search starts at random.
    WarmStart(ParameterAssignment),
    /// Evaluate this many random positions and start from the best.
    Scatter(usize),
}

impl InitSpec {
    /// Parses the JSON form: `{"scatter_init": N}` or a partial assignment
    /// whose values are scalars or one-element lists (`{"max_depth": [1]}`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSearchSpace`] if the document is malformed.
    ///
    /// # Examples
    ///
    /// ```
    /// use hypersearch::config::InitSpec;
    ///
    /// assert_eq!(InitSpec::from_json(r#"{"scatter_init": 10}"#).unwrap(), InitSpec::Scatter(10));
    /// assert!(matches!(
    ///     InitSpec::from_json(r#"{"max_depth": [1]}"#).unwrap(),
    ///     InitSpec::WarmStart(_)
    /// ));
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)
            .map_err(|e| Error::invalid_space(format!("malformed init config: {e}")))?;
        Self::try_from(map)
    }

    /// Returns `false` for a warm start whose first key is not the space's
    /// first dimension. Such a warm start is ignored and the search starts at
    /// a random position.
    #[must_use]
    pub fn applies_to(&self, space: &SearchSpace) -> bool {
        match self {
            Self::WarmStart(assignment) => assignment
                .names()
                .next()
                .is_none_or(|first| space.names().next() == Some(first)),
            Self::Scatter(_) => true,
        }
    }

    /// Checks a spec that [applies](Self::applies_to) against the space it
    /// will seed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSearchSpace`] if a warm start is empty or names
    /// an unknown dimension.
    pub fn validate(&self, space: &SearchSpace) -> Result<()> {
        let Self::WarmStart(assignment) = self else {
            return Ok(());
        };
        if assignment.is_empty() {
            return Err(Error::invalid_space("warm start assignment is empty"));
        }
        if let Some(unknown) = assignment.names().find(|n| space.dimension(n).is_none()) {
            return Err(Error::invalid_space(format!(
                "warm start names unknown hyperparameter '{unknown}'"
            )));
        }
        Ok(())
    }
}

impl TryFrom<serde_json::Map<String, serde_json::Value>> for InitSpec {
    type Error = Error;

    fn try_from(map: serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        if let Some(n) = map.get("scatter_init") {
            let n = n.as_u64().ok_or_else(|| {
                Error::invalid_space("scatter_init must be a non-negative integer")
            })?;
            let n = usize::try_from(n)
                .map_err(|_| Error::invalid_space("scatter_init is too large"))?;
            return Ok(Self::Scatter(n));
        }
        let mut assignment = ParameterAssignment::new();
        for (name, value) in map {
            let value = match value {
                serde_json::Value::Array(mut items) if items.len() == 1 => items.remove(0),
                serde_json::Value::Array(_) => {
                    return Err(Error::invalid_space(format!(
                        "warm start value for '{name}' must be a single value"
                    )));
                }
                other => other,
            };
            let value: ParamValue = serde_json::from_value(value).map_err(|e| {
                Error::invalid_space(format!("malformed warm start value for '{name}': {e}"))
            })?;
            assignment.insert(name, value);
        }
        Ok(Self::WarmStart(assignment))
    }
}

/// Per-model init specs, keyed by model identifier.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InitConfig {
    specs: HashMap<String, InitSpec>,
}

impl InitConfig {
    /// Creates an empty init configuration (every model starts at random).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a warm start for `model`.
    #[must_use]
    pub fn warm_start(mut self, model: impl Into<String>, assignment: ParameterAssignment) -> Self {
        self.specs
            .insert(model.into(), InitSpec::WarmStart(assignment));
        self
    }

    /// Sets scatter initialization with `n` samples for `model`.
    #[must_use]
    pub fn scatter(mut self, model: impl Into<String>, n: usize) -> Self {
        self.specs.insert(model.into(), InitSpec::Scatter(n));
        self
    }

    /// Sets an arbitrary spec for `model`.
    #[must_use]
    pub fn with_spec(mut self, model: impl Into<String>, spec: InitSpec) -> Self {
        self.specs.insert(model.into(), spec);
        self
    }

    /// Returns the spec for `model`, if any.
    #[must_use]
    pub fn get(&self, model: &str) -> Option<&InitSpec> {
        self.specs.get(model)
    }

    /// Returns `true` if no model has a spec.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// The models that have a spec, in arbitrary order.
    pub fn model_ids(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }
}

/// One model to search: its identifier, space and objective.
pub struct ModelConfig<D: ?Sized> {
    pub(crate) id: String,
    pub(crate) space: SearchSpace,
    pub(crate) objective: ObjectiveFn<D>,
}

impl<D: ?Sized> ModelConfig<D> {
    /// Returns the model identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the model's search space.
    #[must_use]
    pub fn space(&self) -> &SearchSpace {
        &self.space
    }

    /// Returns the model's type-erased objective.
    #[must_use]
    pub fn objective(&self) -> &ObjectiveFn<D> {
        &self.objective
    }
}

impl<D: ?Sized> Clone for ModelConfig<D> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            space: self.space.clone(),
            objective: std::sync::Arc::clone(&self.objective),
        }
    }
}

impl<D: ?Sized> core::fmt::Debug for ModelConfig<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("id", &self.id)
            .field("space", &self.space)
            .finish_non_exhaustive()
    }
}

/// The models of a multi-model search, in search order.
pub struct SearchConfig<D: ?Sized> {
    models: Vec<ModelConfig<D>>,
}

impl<D: ?Sized + 'static> SearchConfig<D> {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self { models: Vec::new() }
    }

    /// Adds a model scored by a closure.
    #[must_use]
    pub fn model<F, E>(self, id: impl Into<String>, space: SearchSpace, objective: F) -> Self
    where
        F: Fn(&ParameterAssignment, &D) -> core::result::Result<f64, E> + Send + Sync + 'static,
        E: ToString + 'static,
    {
        self.model_objective(id, space, objective)
    }

    /// Adds a model scored by any [`Objective`] implementation.
    #[must_use]
    pub fn model_objective(
        mut self,
        id: impl Into<String>,
        space: SearchSpace,
        objective: impl Objective<D> + 'static,
    ) -> Self {
        self.models.push(ModelConfig {
            id: id.into(),
            space,
            objective: erase(objective),
        });
        self
    }

    /// Returns the models in order.
    #[must_use]
    pub fn models(&self) -> &[ModelConfig<D>] {
        &self.models
    }

    /// Returns the number of models.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Returns `true` if no model was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl<D: ?Sized + 'static> Default for SearchConfig<D> {
    fn default() -> Self {
        Self::new()
    }
}
