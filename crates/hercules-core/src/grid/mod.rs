//! Parameter-space index over the runs of a simulation campaign.
//!
//! A [`Dataset`] maps every run's parameter vector to the directory that
//! holds its output. Runs can be found by exact value, by integer position
//! on each axis, or by snapping arbitrary values to the nearest grid point.

mod axis;
mod index;
mod iter;
mod persist;

pub use axis::{Axis, AxisResolver};
pub use index::{GridIndex, IndexEntry};
pub use iter::GridEntries;
pub use persist::{DATASET_CLASS, DATASET_VERSION, INDEX_FILE_NAME, INFO_FILE_NAME};

use crate::domain::{
    HerculesError, HerculesResult, Metadata, ParamValue, ParameterVector, format_values,
};
use crate::telemetry::TelemetryFile;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Explicit build context for a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetContext {
    pub directory: PathBuf,
    pub metadata: Metadata,
    pub snapping: bool,
}

impl DatasetContext {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            metadata: Metadata::new(),
            snapping: true,
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn without_snapping(mut self) -> Self {
        self.snapping = false;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupMode {
    Exact,
    Index,
    Snapped,
}

impl LookupMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Index => "index",
            Self::Snapped => "snapped",
        }
    }
}

impl Display for LookupMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

impl FromStr for LookupMode {
    type Err = HerculesError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "exact" => Ok(Self::Exact),
            "index" => Ok(Self::Index),
            "snapped" | "interpolated" => Ok(Self::Snapped),
            other => Err(HerculesError::invalid_argument(
                "GRID.LOOKUP_MODE",
                format!("lookup mode can only be 'exact', 'index' or 'snapped', got '{other}'"),
            )),
        }
    }
}

/// A lookup query; the payload type depends on the mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    Exact(&'a [ParamValue]),
    Index(&'a [usize]),
    Snapped(&'a [f64]),
}

impl Lookup<'_> {
    pub const fn mode(&self) -> LookupMode {
        match self {
            Self::Exact(_) => LookupMode::Exact,
            Self::Index(_) => LookupMode::Index,
            Self::Snapped(_) => LookupMode::Snapped,
        }
    }

    pub const fn len(&self) -> usize {
        match self {
            Self::Exact(values) => values.len(),
            Self::Index(positions) => positions.len(),
            Self::Snapped(values) => values.len(),
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A resolved parameter tuple and the location of its run.
#[derive(Debug, Clone, PartialEq)]
pub struct GridHit {
    pub parameters: Vec<ParamValue>,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    version: String,
    directory: PathBuf,
    field_names: Vec<String>,
    metadata: Metadata,
    axes: Vec<Axis>,
    resolvers: Option<Vec<AxisResolver>>,
    index: GridIndex,
}

impl Dataset {
    /// Builds the index from `(parameters, run path)` pairs.
    ///
    /// Every vector must carry the same field names in the same order, and
    /// a field keeps the type (number or text) it has in the first run.
    pub fn build<I, P>(context: DatasetContext, runs: I) -> HerculesResult<Self>
    where
        I: IntoIterator<Item = (ParameterVector, P)>,
        P: Into<PathBuf>,
    {
        let runs: Vec<(ParameterVector, PathBuf)> = runs
            .into_iter()
            .map(|(parameters, path)| (parameters, path.into()))
            .collect();
        info!(
            directory = %context.directory.display(),
            runs = runs.len(),
            "making file index"
        );

        let Some((template, _)) = runs.first() else {
            return Err(HerculesError::schema(
                "GRID.EMPTY",
                "cannot build a dataset from zero runs",
            ));
        };
        if template.is_empty() {
            return Err(HerculesError::schema(
                "GRID.NO_FIELDS",
                "runs do not define any parameter fields",
            ));
        }
        let template = template.clone();
        let field_names: Vec<String> = template.names().map(str::to_string).collect();
        let numeric: Vec<bool> = template.values().map(ParamValue::is_numeric).collect();

        let mut observed_numbers = vec![Vec::with_capacity(runs.len()); field_names.len()];
        let mut observed_labels = vec![Vec::new(); field_names.len()];
        let mut index = GridIndex::default();

        for (run, (parameters, path)) in runs.into_iter().enumerate() {
            if !parameters.has_same_fields(&template) {
                return Err(HerculesError::schema(
                    "GRID.FIELD_MISMATCH",
                    format!(
                        "run {} ('{}') has fields [{}] but the dataset expects [{}]",
                        run,
                        path.display(),
                        parameters.names().collect::<Vec<_>>().join(", "),
                        field_names.join(", ")
                    ),
                ));
            }

            for (field, (name, value)) in parameters.iter().enumerate() {
                match (numeric[field], value) {
                    (true, ParamValue::Number(number)) if !number.is_finite() => {
                        return Err(HerculesError::schema(
                            "GRID.NON_FINITE_VALUE",
                            format!("run {run} has a non-finite value ({number}) for field '{name}'"),
                        ));
                    }
                    (true, ParamValue::Number(number)) => observed_numbers[field].push(*number),
                    (false, ParamValue::Text(label)) => observed_labels[field].push(label.clone()),
                    _ => {
                        return Err(HerculesError::schema(
                            "GRID.MIXED_FIELD_TYPE",
                            format!(
                                "field '{name}' mixes numeric and text values (run {run} has {value})"
                            ),
                        ));
                    }
                }
            }

            let values: Vec<ParamValue> = parameters.values().cloned().collect();
            if let Some(previous) = index.insert(values.clone(), path.clone()) {
                warn!(
                    parameters = %format_values(&values),
                    previous = %previous.display(),
                    replacement = %path.display(),
                    "duplicate parameter vector; keeping the later run"
                );
            }
        }

        let axes: Vec<Axis> = numeric
            .iter()
            .zip(observed_numbers.into_iter().zip(observed_labels))
            .map(|(is_numeric, (numbers, labels))| {
                if *is_numeric {
                    Axis::numeric(numbers)
                } else {
                    Axis::positional(labels)
                }
            })
            .collect();

        let dataset = Self::from_parts(
            DATASET_VERSION.to_string(),
            context.directory,
            field_names,
            context.metadata,
            axes,
            index,
            context.snapping,
        );
        debug!(shape = ?dataset.shape(), runs = dataset.len(), "file index ready");
        Ok(dataset)
    }

    pub(crate) fn from_parts(
        version: String,
        directory: PathBuf,
        field_names: Vec<String>,
        metadata: Metadata,
        axes: Vec<Axis>,
        index: GridIndex,
        snapping: bool,
    ) -> Self {
        let resolvers = if !snapping {
            None
        } else if let Some(positional) = axes.iter().position(|axis| !axis.is_numeric()) {
            warn!(
                field = %field_names[positional],
                "snapping is not possible for non-numeric fields; disabling it for the dataset"
            );
            None
        } else {
            axes.iter().map(AxisResolver::for_axis).collect()
        };

        Self {
            version,
            directory,
            field_names,
            metadata,
            axes,
            resolvers,
            index,
        }
    }

    pub fn lookup(&self, query: Lookup<'_>) -> HerculesResult<GridHit> {
        if query.len() != self.axes.len() {
            return Err(HerculesError::arity(
                "GRID.ARITY",
                format!(
                    "{} query has {} values but the dataset expects {}",
                    query.mode(),
                    query.len(),
                    self.axes.len()
                ),
            ));
        }

        let key = match query {
            Lookup::Exact(values) => values.to_vec(),
            Lookup::Index(positions) => self.values_at(positions)?,
            Lookup::Snapped(values) => self.snap(values)?,
        };
        self.exact_hit(key)
    }

    pub fn lookup_exact(&self, values: &[ParamValue]) -> HerculesResult<GridHit> {
        self.lookup(Lookup::Exact(values))
    }

    pub fn lookup_index(&self, positions: &[usize]) -> HerculesResult<GridHit> {
        self.lookup(Lookup::Index(positions))
    }

    pub fn lookup_snapped(&self, values: &[f64]) -> HerculesResult<GridHit> {
        self.lookup(Lookup::Snapped(values))
    }

    /// Resolves `query` and opens the telemetry file `file_name` stored in
    /// the run directory it lands on.
    pub fn get_data(
        &self,
        query: Lookup<'_>,
        file_name: impl AsRef<Path>,
    ) -> HerculesResult<(Vec<ParamValue>, TelemetryFile)> {
        let hit = self.lookup(query)?;
        let path = hit.path.join(file_name);
        debug!(
            parameters = %format_values(&hit.parameters),
            path = %path.display(),
            "opening run telemetry"
        );
        let telemetry = TelemetryFile::open_path(&path)?;
        Ok((hit.parameters, telemetry))
    }

    fn values_at(&self, positions: &[usize]) -> HerculesResult<Vec<ParamValue>> {
        self.axes
            .iter()
            .zip(positions)
            .zip(&self.field_names)
            .map(|((axis, position), name)| {
                axis.value_at(*position).ok_or_else(|| {
                    HerculesError::index(
                        "GRID.INDEX_RANGE",
                        format!(
                            "position {} is out of range for axis '{}' with {} values",
                            position,
                            name,
                            axis.len()
                        ),
                    )
                })
            })
            .collect()
    }

    fn snap(&self, values: &[f64]) -> HerculesResult<Vec<ParamValue>> {
        let resolvers = self.resolvers.as_ref().ok_or_else(|| {
            HerculesError::invalid_argument(
                "GRID.SNAP_DISABLED",
                "dataset is not snappable; use exact or index lookups",
            )
        })?;
        resolvers
            .iter()
            .zip(values)
            .map(|(resolver, value)| resolver.resolve(*value).map(ParamValue::Number))
            .collect()
    }

    fn exact_hit(&self, parameters: Vec<ParamValue>) -> HerculesResult<GridHit> {
        match self.index.get(&parameters) {
            Some(relative) => Ok(GridHit {
                path: self.directory.join(relative),
                parameters,
            }),
            None => Err(HerculesError::not_found(
                "GRID.NOT_FOUND",
                format!("{} is not part of the dataset", format_values(&parameters)),
            )),
        }
    }

    /// Every present grid point, last field varying fastest.
    pub fn iter(&self) -> GridEntries<'_> {
        GridEntries::new(self)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn axis(&self, field: &str) -> Option<&Axis> {
        self.field_names
            .iter()
            .position(|name| name == field)
            .map(|position| &self.axes[position])
    }

    pub fn shape(&self) -> Vec<usize> {
        self.axes.iter().map(Axis::len).collect()
    }

    pub fn index(&self) -> &GridIndex {
        &self.index
    }

    /// Number of indexed runs.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn is_snappable(&self) -> bool {
        self.resolvers.is_some()
    }

    /// Every combination of axis values has a run.
    pub fn is_dense(&self) -> bool {
        self.axes
            .iter()
            .try_fold(1_usize, |cells, axis| cells.checked_mul(axis.len()))
            .is_some_and(|cells| cells == self.index.len())
    }

    /// Points the dataset at a new root; stored run paths stay relative.
    pub fn rebase(&mut self, directory: impl Into<PathBuf>) {
        self.directory = directory.into();
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = GridHit;
    type IntoIter = GridEntries<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::{Dataset, DatasetContext, Lookup, LookupMode};
    use crate::domain::{HerculesErrorKind, ParamValue, ParameterVector};
    use std::path::PathBuf;

    fn run(x: f64, y: f64, z: f64) -> ParameterVector {
        ParameterVector::new().with("x", x).with("y", y).with("z", z)
    }

    fn small_dataset() -> Dataset {
        let runs = [
            (run(0.0, 3.0, 5.0), "run0"),
            (run(0.0, 3.0, 6.0), "run1"),
            (run(1.0, 3.0, 5.0), "run2"),
            (run(1.0, 3.0, 6.0), "run3"),
        ];
        Dataset::build(DatasetContext::new("/campaign"), runs).expect("dataset should build")
    }

    #[test]
    fn build_collects_axes_and_shape() {
        let dataset = small_dataset();
        assert_eq!(dataset.shape(), vec![2, 1, 2]);
        assert_eq!(dataset.field_names(), ["x", "y", "z"]);
        assert_eq!(dataset.len(), 4);
        assert!(dataset.is_dense());
        assert!(dataset.is_snappable());
    }

    #[test]
    fn snapped_lookup_far_outside_the_grid_clamps_to_the_largest_point() {
        let hit = small_dataset()
            .lookup_snapped(&[100.0, 100.0, 100.0])
            .expect("snapped lookup should resolve");
        assert_eq!(
            hit.parameters,
            vec![
                ParamValue::Number(1.0),
                ParamValue::Number(3.0),
                ParamValue::Number(6.0)
            ]
        );
        assert_eq!(hit.path, PathBuf::from("/campaign/run3"));
    }

    #[test]
    fn every_mode_rejects_wrong_arity() {
        let dataset = small_dataset();
        let exact = vec![ParamValue::Number(0.0)];
        let positions = [0_usize, 0];
        let snapped = [0.0, 0.0, 0.0, 0.0];
        let queries = [
            Lookup::Exact(&exact),
            Lookup::Index(&positions),
            Lookup::Snapped(&snapped),
        ];
        for query in queries {
            let error = dataset.lookup(query).expect_err("arity should be checked");
            assert_eq!(error.kind(), HerculesErrorKind::Arity);
        }
    }

    #[test]
    fn out_of_range_position_is_an_index_error() {
        let error = small_dataset()
            .lookup_index(&[2, 0, 0])
            .expect_err("position 2 is out of range");
        assert_eq!(error.kind(), HerculesErrorKind::Index);
    }

    #[test]
    fn mismatched_field_names_fail_the_build() {
        let runs = [
            (run(0.0, 3.0, 5.0), "run0"),
            (
                ParameterVector::new().with("x", 1.0).with("z", 5.0).with("y", 3.0),
                "run1",
            ),
        ];
        let error = Dataset::build(DatasetContext::new("/campaign"), runs)
            .expect_err("field order mismatch should fail");
        assert_eq!(error.kind(), HerculesErrorKind::Schema);
        assert_eq!(error.placeholder(), "GRID.FIELD_MISMATCH");
    }

    #[test]
    fn empty_and_mixed_type_inputs_fail_the_build() {
        let empty: Vec<(ParameterVector, PathBuf)> = Vec::new();
        let error = Dataset::build(DatasetContext::new("/campaign"), empty)
            .expect_err("empty input should fail");
        assert_eq!(error.kind(), HerculesErrorKind::Schema);

        let runs = [
            (ParameterVector::new().with("x", 1.0), "run0"),
            (ParameterVector::new().with("x", "one"), "run1"),
        ];
        let error = Dataset::build(DatasetContext::new("/campaign"), runs)
            .expect_err("mixed field types should fail");
        assert_eq!(error.placeholder(), "GRID.MIXED_FIELD_TYPE");
    }

    #[test]
    fn non_finite_parameter_values_fail_the_build() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let runs = [(run(0.0, 3.0, 5.0), "run0"), (run(bad, 3.0, 5.0), "run1")];
            let error = Dataset::build(DatasetContext::new("/campaign"), runs)
                .expect_err("non-finite values cannot be persisted");
            assert_eq!(error.kind(), HerculesErrorKind::Schema);
            assert_eq!(error.placeholder(), "GRID.NON_FINITE_VALUE");
        }
    }

    #[test]
    fn text_fields_disable_snapping_but_keep_exact_and_index_lookups() {
        let runs = [
            (ParameterVector::new().with("energy", 1.0).with("particle", "e-"), "run0"),
            (ParameterVector::new().with("energy", 1.0).with("particle", "p"), "run1"),
        ];
        let dataset =
            Dataset::build(DatasetContext::new("root"), runs).expect("dataset should build");

        assert!(!dataset.is_snappable());
        let error = dataset
            .lookup_snapped(&[1.0, 0.0])
            .expect_err("snapping should be disabled");
        assert_eq!(error.kind(), HerculesErrorKind::InvalidArgument);

        let hit = dataset.lookup_index(&[0, 1]).expect("index lookup should resolve");
        assert_eq!(hit.parameters[1], ParamValue::from("p"));
        assert_eq!(hit.path, PathBuf::from("root/run1"));
    }

    #[test]
    fn failed_lookups_leave_the_dataset_untouched() {
        let dataset = small_dataset();
        let before = dataset.clone();
        let _ = dataset.lookup_index(&[9, 9, 9]);
        let _ = dataset.lookup_exact(&vec![ParamValue::Number(0.5); 3]);
        assert_eq!(dataset, before);
        assert!(dataset.lookup_index(&[1, 0, 1]).is_ok());
    }

    #[test]
    fn lookup_mode_parses_legacy_alias() {
        assert_eq!("interpolated".parse::<LookupMode>().unwrap(), LookupMode::Snapped);
        assert_eq!("index".parse::<LookupMode>().unwrap(), LookupMode::Index);
        assert!("inde".parse::<LookupMode>().is_err());
    }
}
