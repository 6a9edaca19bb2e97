use crate::domain::{HerculesError, HerculesResult, ParamValue};
use serde::{Deserialize, Serialize};

/// Sorted, duplicate-free set of values a parameter field takes across a
/// campaign.
///
/// Numeric fields keep their values. Non-numeric fields degenerate to a
/// positional axis: coordinates are the positions `0..K` over the sorted
/// distinct labels, and nearest-neighbour snapping is unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Axis {
    Numeric { values: Vec<f64> },
    Positional { labels: Vec<String> },
}

impl Axis {
    pub fn numeric(observed: impl IntoIterator<Item = f64>) -> Self {
        let mut values: Vec<f64> = observed
            .into_iter()
            .map(|value| if value == 0.0 { 0.0 } else { value })
            .collect();
        values.sort_by(f64::total_cmp);
        values.dedup();
        Self::Numeric { values }
    }

    pub fn positional<S: Into<String>>(observed: impl IntoIterator<Item = S>) -> Self {
        let mut labels: Vec<String> = observed.into_iter().map(Into::into).collect();
        labels.sort();
        labels.dedup();
        Self::Positional { labels }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Numeric { values } => values.len(),
            Self::Positional { labels } => labels.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric { .. })
    }

    pub fn numeric_values(&self) -> Option<&[f64]> {
        match self {
            Self::Numeric { values } => Some(values),
            Self::Positional { .. } => None,
        }
    }

    pub fn value_at(&self, position: usize) -> Option<ParamValue> {
        match self {
            Self::Numeric { values } => values.get(position).copied().map(ParamValue::Number),
            Self::Positional { labels } => labels.get(position).cloned().map(ParamValue::Text),
        }
    }

    pub fn position_of(&self, value: &ParamValue) -> Option<usize> {
        match (self, value) {
            (Self::Numeric { values }, ParamValue::Number(query)) => values
                .binary_search_by(|probe| probe.total_cmp(&normalize(*query)))
                .ok(),
            (Self::Positional { labels }, ParamValue::Text(query)) => {
                labels.binary_search(query).ok()
            }
            _ => None,
        }
    }

    pub fn first(&self) -> Option<ParamValue> {
        self.value_at(0)
    }

    pub fn last(&self) -> Option<ParamValue> {
        self.len().checked_sub(1).and_then(|last| self.value_at(last))
    }

    /// Strictly ascending with no duplicates.
    pub fn is_strictly_ascending(&self) -> bool {
        match self {
            Self::Numeric { values } => values
                .windows(2)
                .all(|pair| pair[0].total_cmp(&pair[1]).is_lt()),
            Self::Positional { labels } => labels.windows(2).all(|pair| pair[0] < pair[1]),
        }
    }
}

fn normalize(value: f64) -> f64 {
    if value == 0.0 { 0.0 } else { value }
}

/// Maps an arbitrary query to the nearest value present on a numeric axis.
#[derive(Debug, Clone, PartialEq)]
pub enum AxisResolver {
    Constant(f64),
    Nearest(Vec<f64>),
}

impl AxisResolver {
    /// Returns `None` for positional axes.
    pub fn for_axis(axis: &Axis) -> Option<Self> {
        axis.numeric_values().and_then(Self::for_values)
    }

    /// `values` must be strictly ascending. Returns `None` when empty.
    pub fn for_values(values: &[f64]) -> Option<Self> {
        match values {
            [] => None,
            [only] => Some(Self::Constant(*only)),
            _ => Some(Self::Nearest(values.to_vec())),
        }
    }

    /// Queries beyond the axis clamp to its end values; a query exactly
    /// half-way between two values resolves to the lower one.
    pub fn resolve(&self, query: f64) -> HerculesResult<f64> {
        match self {
            Self::Constant(value) => Ok(*value),
            Self::Nearest(values) => {
                if query.is_nan() {
                    return Err(HerculesError::invalid_argument(
                        "GRID.SNAP_NAN",
                        "cannot snap a NaN query value",
                    ));
                }
                // Nearest(..) always holds at least two values.
                let above = values.partition_point(|value| *value < query);
                if above == 0 {
                    return Ok(values[0]);
                }
                if above == values.len() {
                    return Ok(values[above - 1]);
                }
                let (lower, upper) = (values[above - 1], values[above]);
                Ok(if query - lower <= upper - query { lower } else { upper })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Axis, AxisResolver};
    use crate::domain::{HerculesErrorKind, ParamValue};

    #[test]
    fn numeric_axis_is_sorted_and_unique_regardless_of_insertion_order() {
        let axis = Axis::numeric([3.0, -1.0, 3.0, 0.5, -1.0, -0.0, 0.0]);
        assert_eq!(axis.numeric_values(), Some(&[-1.0, 0.0, 0.5, 3.0][..]));
        assert!(axis.is_strictly_ascending());
        assert_eq!(axis.position_of(&ParamValue::Number(0.5)), Some(2));
        assert_eq!(axis.position_of(&ParamValue::Number(-0.0)), Some(1));
        assert_eq!(axis.position_of(&ParamValue::Number(0.25)), None);
    }

    #[test]
    fn positional_axis_orders_labels() {
        let axis = Axis::positional(["beta", "alpha", "beta"]);
        assert_eq!(axis.len(), 2);
        assert!(!axis.is_numeric());
        assert_eq!(axis.value_at(0), Some(ParamValue::from("alpha")));
        assert_eq!(axis.last(), Some(ParamValue::from("beta")));
        assert!(AxisResolver::for_axis(&axis).is_none());
    }

    #[test]
    fn nearest_resolver_clamps_and_breaks_ties_downwards() {
        let resolver = AxisResolver::for_values(&[0.0, 1.0, 4.0]).expect("resolver should exist");
        assert_eq!(resolver.resolve(-50.0).unwrap(), 0.0);
        assert_eq!(resolver.resolve(0.4).unwrap(), 0.0);
        assert_eq!(resolver.resolve(0.5).unwrap(), 0.0);
        assert_eq!(resolver.resolve(0.6).unwrap(), 1.0);
        assert_eq!(resolver.resolve(2.5).unwrap(), 1.0);
        assert_eq!(resolver.resolve(2.6).unwrap(), 4.0);
        assert_eq!(resolver.resolve(1.0e12).unwrap(), 4.0);
    }

    #[test]
    fn resolver_is_idempotent_on_axis_values() {
        let values = [-3.5, -1.0, 0.0, 2.25, 9.0];
        let resolver = AxisResolver::for_values(&values).expect("resolver should exist");
        for value in values {
            assert_eq!(resolver.resolve(value).unwrap(), value);
        }

        // Adjacent floats have no representable midpoint between them.
        let adjacent = [1.0 + f64::EPSILON, 1.0 + 2.0 * f64::EPSILON];
        let resolver = AxisResolver::for_values(&adjacent).expect("resolver should exist");
        for value in adjacent {
            assert_eq!(resolver.resolve(value).unwrap(), value);
        }
        let large = [1.0e300, f64::from_bits(1.0e300_f64.to_bits() + 1)];
        let resolver = AxisResolver::for_values(&large).expect("resolver should exist");
        for value in large {
            assert_eq!(resolver.resolve(value).unwrap(), value);
        }
    }

    #[test]
    fn single_value_axis_resolves_every_query_to_that_value() {
        let resolver = AxisResolver::for_values(&[3.0]).expect("resolver should exist");
        for query in [f64::NEG_INFINITY, -1.0, 3.0, 1.0e300, f64::NAN] {
            assert_eq!(resolver.resolve(query).unwrap(), 3.0);
        }
    }

    #[test]
    fn nan_query_is_rejected_on_multi_value_axis() {
        let resolver = AxisResolver::for_values(&[1.0, 2.0]).expect("resolver should exist");
        let error = resolver.resolve(f64::NAN).expect_err("NaN should be rejected");
        assert_eq!(error.kind(), HerculesErrorKind::InvalidArgument);
    }
}
