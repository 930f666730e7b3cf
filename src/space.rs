//! Search-space encoding.
//!
//! A [`SearchSpace`] maps between a human-meaningful
//! [`ParameterAssignment`] (name → value) and an integer [`Position`]
//! (one index per [`Dimension`]). Strategies only ever see positions; the
//! ordering of candidate values inside a dimension acts as the metric used
//! for local moves, so "neighbouring" values should be listed next to each
//! other.
//!
//! ```
//! use hypersearch::space::{Dimension, SearchSpace};
//!
//! let space = SearchSpace::new(vec![
//!     Dimension::new("criterion", ["gini", "entropy"]),
//!     Dimension::range("max_depth", 1..51),
//! ])
//! .unwrap();
//!
//! let mut rng = fastrand::Rng::with_seed(1);
//! let position = space.random_position(&mut rng);
//! let params = space.decode(&position).unwrap();
//! assert_eq!(space.encode(&params).unwrap(), position);
//! ```

use core::fmt;
use core::ops::{Index, IndexMut, Range};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::value::ParamValue;

/// An integer vector holding one candidate index per dimension.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position(Vec<usize>);

impl Position {
    /// Wraps raw indices into a position.
    #[must_use]
    pub fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    /// Returns the indices as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Returns the number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the position has no components.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the components.
    pub fn iter(&self) -> core::slice::Iter<'_, usize> {
        self.0.iter()
    }

    /// Consumes the position, returning the raw indices.
    #[must_use]
    pub fn into_inner(self) -> Vec<usize> {
        self.0
    }
}

impl From<Vec<usize>> for Position {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl Index<usize> for Position {
    type Output = usize;

    fn index(&self, i: usize) -> &usize {
        &self.0[i]
    }
}

impl IndexMut<usize> for Position {
    fn index_mut(&mut self, i: usize) -> &mut usize {
        &mut self.0[i]
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// The ordered candidate values of one hyperparameter.
#[derive(Clone, Debug, PartialEq)]
pub struct Dimension {
    name: String,
    values: Vec<ParamValue>,
}

impl Dimension {
    /// Creates a dimension from any sequence of candidate values.
    pub fn new<I, V>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamValue>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates an integer dimension from a half-open range, like `range(1, 51)`.
    #[must_use]
    pub fn range(name: impl Into<String>, range: Range<i64>) -> Self {
        Self::new(name, range)
    }

    /// Returns the hyperparameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the candidate values in order.
    #[must_use]
    pub fn values(&self) -> &[ParamValue] {
        &self.values
    }

    /// Returns the number of candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the dimension has no candidates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the largest valid index.
    #[must_use]
    pub fn max_index(&self) -> usize {
        self.values.len().saturating_sub(1)
    }

    /// Returns the index of the first candidate equal to `value`.
    #[must_use]
    pub fn index_of(&self, value: &ParamValue) -> Option<usize> {
        self.values.iter().position(|v| v == value)
    }
}

/// A decoded assignment of one value per hyperparameter, in dimension order.
///
/// Serializes as a JSON object whose keys keep the assignment order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParameterAssignment {
    entries: Vec<(String, ParamValue)>,
}

impl ParameterAssignment {
    /// Creates an empty assignment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`, replacing an existing entry in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Returns the value assigned to `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Iterates over `(name, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Iterates over the names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no parameter is assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for ParameterAssignment {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut assignment = Self::new();
        for (k, v) in iter {
            assignment.insert(k, v);
        }
        assignment
    }
}

impl Serialize for ParameterAssignment {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> core::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de> Deserialize<'de> for ParameterAssignment {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> core::result::Result<Self, D::Error> {
        struct AssignmentVisitor;

        impl<'de> serde::de::Visitor<'de> for AssignmentVisitor {
            type Value = ParameterAssignment;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of hyperparameter names to values")
            }

            fn visit_map<A: serde::de::MapAccess<'de>>(
                self,
                mut map: A,
            ) -> core::result::Result<Self::Value, A::Error> {
                let mut assignment = ParameterAssignment::new();
                while let Some((name, value)) = map.next_entry::<String, ParamValue>()? {
                    assignment.insert(name, value);
                }
                Ok(assignment)
            }
        }

        deserializer.deserialize_map(AssignmentVisitor)
    }
}

impl fmt::Display for ParameterAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        f.write_str("}")
    }
}

/// The discrete search space of one model.
///
/// Immutable once built: dimension names, their order and their candidate
/// lists never change during a search.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchSpace {
    dimensions: Vec<Dimension>,
}

impl SearchSpace {
    /// Builds a search space from its dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSearchSpace`] if there are no dimensions, a
    /// dimension has no candidates, two dimensions share a name, or a float
    /// candidate is not finite.
    pub fn new(dimensions: Vec<Dimension>) -> Result<Self> {
        if dimensions.is_empty() {
            return Err(Error::invalid_space(
                "at least one hyperparameter is required",
            ));
        }
        for (i, dim) in dimensions.iter().enumerate() {
            if dim.is_empty() {
                return Err(Error::invalid_space(format!(
                    "hyperparameter '{}' has no candidate values",
                    dim.name
                )));
            }
            if dimensions[..i].iter().any(|d| d.name == dim.name) {
                return Err(Error::invalid_space(format!(
                    "hyperparameter '{}' is declared twice",
                    dim.name
                )));
            }
            if dim
                .values
                .iter()
                .any(|v| matches!(v, ParamValue::Float(f) if !f.is_finite()))
            {
                return Err(Error::invalid_space(format!(
                    "hyperparameter '{}' has a non-finite float candidate",
                    dim.name
                )));
            }
        }
        Ok(Self { dimensions })
    }

    /// Parses a search space from a JSON object of dimension specs.
    ///
    /// Keys keep their document order. Each value is either a list of
    /// candidates or `{"range": [start, end]}` / `{"range": [start, end, step]}`
    /// with an exclusive end.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSearchSpace`] if the document is malformed or
    /// violates the constraints of [`SearchSpace::new`].
    ///
    /// # Examples
    ///
    /// ```
    /// use hypersearch::space::SearchSpace;
    ///
    /// let space = SearchSpace::from_json(
    ///     r#"{"criterion": ["gini", "entropy"], "max_depth": {"range": [1, 51]}}"#,
    /// )
    /// .unwrap();
    /// assert_eq!(space.names().collect::<Vec<_>>(), ["criterion", "max_depth"]);
    /// assert_eq!(space.dimension("max_depth").unwrap().len(), 50);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)
            .map_err(|e| Error::invalid_space(format!("malformed search space: {e}")))?;
        let mut dimensions = Vec::with_capacity(map.len());
        for (name, spec) in map {
            let spec: crate::config::DimensionSpec = serde_json::from_value(spec)
                .map_err(|e| Error::invalid_space(format!("malformed dimension '{name}': {e}")))?;
            dimensions.push(spec.into_dimension(name)?);
        }
        Self::new(dimensions)
    }

    /// Returns the number of dimensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    /// Always `false`: a valid space has at least one dimension.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// Returns the dimensions in order.
    #[must_use]
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Returns the dimension called `name`.
    #[must_use]
    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    /// Returns the index of the dimension called `name`.
    #[must_use]
    pub fn dimension_index(&self, name: &str) -> Option<usize> {
        self.dimensions.iter().position(|d| d.name == name)
    }

    /// Iterates over the hyperparameter names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.dimensions.iter().map(|d| d.name.as_str())
    }

    /// Returns the largest valid index of every dimension.
    #[must_use]
    pub fn bounds(&self) -> Vec<usize> {
        self.dimensions.iter().map(Dimension::max_index).collect()
    }

    /// Returns the total number of distinct positions (saturating).
    #[must_use]
    pub fn cardinality(&self) -> usize {
        self.dimensions
            .iter()
            .fold(1usize, |acc, d| acc.saturating_mul(d.len()))
    }

    /// Returns `true` if `position` has one in-bounds component per dimension.
    #[must_use]
    pub fn contains(&self, position: &Position) -> bool {
        position.len() == self.dimensions.len()
            && position
                .iter()
                .zip(&self.dimensions)
                .all(|(&i, d)| i < d.len())
    }

    /// Clamps every component into its dimension's bounds.
    ///
    /// Missing trailing components are filled with `0`; extra ones are dropped.
    #[must_use]
    pub fn clamp(&self, position: Position) -> Position {
        let mut indices = position.into_inner();
        indices.resize(self.dimensions.len(), 0);
        for (i, dim) in indices.iter_mut().zip(&self.dimensions) {
            *i = (*i).min(dim.max_index());
        }
        Position(indices)
    }

    /// Draws each component uniformly from `[0, len - 1]`, in dimension order.
    #[must_use]
    pub fn random_position(&self, rng: &mut fastrand::Rng) -> Position {
        Position(
            self.dimensions
                .iter()
                .map(|d| rng.usize(0..d.len()))
                .collect(),
        )
    }

    /// Draws a uniform index for the single dimension `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSearchSpace`] if `name` is not a dimension.
    pub fn random_scalar(&self, name: &str, rng: &mut fastrand::Rng) -> Result<usize> {
        let dim = self
            .dimension(name)
            .ok_or_else(|| Error::invalid_space(format!("unknown hyperparameter '{name}'")))?;
        Ok(rng.usize(0..dim.len()))
    }

    /// Maps an assignment with one value per dimension to its position.
    ///
    /// Duplicate candidates resolve to their first index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSearchSpace`] if a dimension is missing from
    /// `assignment`, an unknown name is present, or a value is not a candidate.
    pub fn encode(&self, assignment: &ParameterAssignment) -> Result<Position> {
        self.check_names(assignment)?;
        let mut indices = Vec::with_capacity(self.dimensions.len());
        for dim in &self.dimensions {
            let value = assignment.get(&dim.name).ok_or_else(|| {
                Error::invalid_space(format!("missing value for hyperparameter '{}'", dim.name))
            })?;
            indices.push(Self::index_in(dim, value)?);
        }
        Ok(Position(indices))
    }

    /// Encodes a partial assignment, drawing the unspecified dimensions at random.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSearchSpace`] if an unknown name is present or
    /// a value is not a candidate.
    pub fn encode_partial(
        &self,
        assignment: &ParameterAssignment,
        rng: &mut fastrand::Rng,
    ) -> Result<Position> {
        self.check_names(assignment)?;
        let mut indices = Vec::with_capacity(self.dimensions.len());
        for dim in &self.dimensions {
            let index = match assignment.get(&dim.name) {
                Some(value) => Self::index_in(dim, value)?,
                None => rng.usize(0..dim.len()),
            };
            indices.push(index);
        }
        Ok(Position(indices))
    }

    /// Maps a position to its assignment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPosition`] if the position has the wrong number
    /// of components or any component is out of bounds. No clamping happens.
    pub fn decode(&self, position: &Position) -> Result<ParameterAssignment> {
        if position.len() != self.dimensions.len() {
            return Err(Error::InvalidPosition {
                model: String::new(),
                position: position.clone(),
                reason: format!(
                    "expected {} components, got {}",
                    self.dimensions.len(),
                    position.len()
                ),
            });
        }
        let mut entries = Vec::with_capacity(self.dimensions.len());
        for (&i, dim) in position.iter().zip(&self.dimensions) {
            let value = dim.values.get(i).ok_or_else(|| Error::InvalidPosition {
                model: String::new(),
                position: position.clone(),
                reason: format!(
                    "index {i} out of bounds for '{}' (max {})",
                    dim.name,
                    dim.max_index()
                ),
            })?;
            entries.push((dim.name.clone(), value.clone()));
        }
        Ok(ParameterAssignment { entries })
    }

    fn check_names(&self, assignment: &ParameterAssignment) -> Result<()> {
        if let Some(unknown) = assignment.names().find(|n| self.dimension(n).is_none()) {
            return Err(Error::invalid_space(format!(
                "unknown hyperparameter '{unknown}'"
            )));
        }
        Ok(())
    }

    fn index_in(dim: &Dimension, value: &ParamValue) -> Result<usize> {
        dim.index_of(value).ok_or_else(|| {
            Error::invalid_space(format!(
                "value {value} is not a candidate of '{}'",
                dim.name
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_space() -> SearchSpace {
        SearchSpace::new(vec![
            Dimension::new("criterion", ["gini", "entropy"]),
            Dimension::range("max_depth", 1..51),
            Dimension::range("min_samples_split", 2..51),
        ])
        .unwrap()
    }

    #[test]
    fn test_empty_dimension_rejected() {
        let err = SearchSpace::new(vec![Dimension::new("a", Vec::<i64>::new())]).unwrap_err();
        assert!(matches!(err, Error::InvalidSearchSpace { .. }));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = SearchSpace::new(vec![Dimension::range("a", 0..2), Dimension::range("a", 0..3)])
            .unwrap_err();
        assert!(err.to_string().contains("declared twice"));
    }

    #[test]
    fn test_non_finite_float_rejected() {
        let err = SearchSpace::new(vec![Dimension::new("lr", [0.1, f64::NAN])]).unwrap_err();
        assert!(err.to_string().contains("non-finite"));
    }

    #[test]
    fn test_bounds_and_cardinality() {
        let space = tree_space();
        assert_eq!(space.bounds(), vec![1, 49, 48]);
        assert_eq!(space.cardinality(), 2 * 50 * 49);
    }

    #[test]
    fn test_decode_out_of_bounds_is_error() {
        let space = tree_space();
        let err = space.decode(&Position::new(vec![2, 0, 0])).unwrap_err();
        assert!(matches!(err, Error::InvalidPosition { .. }));
        let err = space.decode(&Position::new(vec![0, 0])).unwrap_err();
        assert!(matches!(err, Error::InvalidPosition { .. }));
    }

    #[test]
    fn test_encode_rejects_unknown_and_missing() {
        let space = tree_space();
        let partial = ParameterAssignment::new().with("max_depth", 3);
        assert!(space.encode(&partial).is_err());
        let unknown = ParameterAssignment::new().with("depth", 3);
        let mut rng = fastrand::Rng::with_seed(0);
        assert!(space.encode_partial(&unknown, &mut rng).is_err());
    }

    #[test]
    fn test_encode_partial_keeps_given_values() {
        let space = tree_space();
        let mut rng = fastrand::Rng::with_seed(3);
        let partial = ParameterAssignment::new().with("max_depth", 1);
        for _ in 0..20 {
            let pos = space.encode_partial(&partial, &mut rng).unwrap();
            assert_eq!(pos[1], 0);
            assert!(space.contains(&pos));
        }
    }

    #[test]
    fn test_duplicate_values_collapse_to_first_index() {
        let space = SearchSpace::new(vec![Dimension::new("k", [1, 1, 2])]).unwrap();
        let params = space.decode(&Position::new(vec![1])).unwrap();
        assert_eq!(space.encode(&params).unwrap(), Position::new(vec![0]));
    }

    #[test]
    fn test_clamp() {
        let space = tree_space();
        let clamped = space.clamp(Position::new(vec![5, 100]));
        assert_eq!(clamped, Position::new(vec![1, 49, 0]));
    }

    #[test]
    fn test_random_scalar_in_range() {
        let space = tree_space();
        let mut rng = fastrand::Rng::with_seed(9);
        for _ in 0..100 {
            assert!(space.random_scalar("criterion", &mut rng).unwrap() <= 1);
        }
        assert!(space.random_scalar("nope", &mut rng).is_err());
    }

    #[test]
    fn test_assignment_serializes_as_ordered_map() {
        let a = ParameterAssignment::new().with("z", 1).with("a", "gini");
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, r#"{"z":1,"a":"gini"}"#);
        let back: ParameterAssignment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn test_assignment_display_and_insert() {
        let mut a = ParameterAssignment::new().with("a", 1).with("b", "x");
        a.insert("a", 2);
        assert_eq!(a.len(), 2);
        assert_eq!(a.to_string(), "{a: 2, b: x}");
    }
}
