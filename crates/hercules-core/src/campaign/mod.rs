//! Per-run configuration records and the ordered run list of a campaign.

mod scan;

pub use scan::{DEFAULT_SCAN_PATTERN, scan_campaign};

use crate::domain::{HerculesError, HerculesResult, Metadata, ParameterVector};
use crate::grid::{Dataset, DatasetContext};
use crate::serialization::{read_json_artifact, write_json_artifact};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

pub const SIM_CONFIG_NAME: &str = "SimConfig.json";
pub const VERSION_METADATA_KEY: &str = "hercules-version";

/// Configuration record stored next to every run's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(rename = "sim-name", default)]
    pub sim_name: Option<String>,
    #[serde(rename = "meta-data", default)]
    pub meta_data: Metadata,
    #[serde(rename = "config-data")]
    pub config_data: ParameterVector,
}

impl RunConfig {
    pub fn new(config_data: ParameterVector) -> Self {
        Self {
            sim_name: None,
            meta_data: Metadata::new(),
            config_data,
        }
    }

    pub fn with_meta_data(mut self, meta_data: Metadata) -> Self {
        self.meta_data = meta_data;
        self
    }

    pub fn to_json_file(&self, path: &Path) -> HerculesResult<()> {
        write_json_artifact(path, self)
    }

    pub fn from_json_file(path: &Path) -> HerculesResult<Self> {
        read_json_artifact(path)
    }
}

/// A run of the campaign and its directory relative to the campaign root.
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignRun {
    pub config: RunConfig,
    pub path: PathBuf,
}

/// Ordered list of runs that share field names and metadata.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigList {
    meta_data: Metadata,
    own_meta_data: Option<Metadata>,
    field_names: Option<Vec<String>>,
    runs: Vec<CampaignRun>,
}

impl ConfigList {
    /// Starts a list with campaign metadata; the crate version is stamped in.
    pub fn new(mut meta_data: Metadata) -> Self {
        meta_data.insert(
            VERSION_METADATA_KEY.to_string(),
            serde_json::Value::from(env!("CARGO_PKG_VERSION")),
        );
        Self {
            meta_data,
            ..Self::default()
        }
    }

    /// Appends `config` as `run{n}`, where `n` is its position.
    pub fn add_config(&mut self, mut config: RunConfig) -> HerculesResult<()> {
        let name = format!("run{}", self.runs.len());
        config.sim_name = Some(name.clone());
        self.push_run(config, PathBuf::from(name))
    }

    pub(crate) fn push_run(&mut self, mut config: RunConfig, path: PathBuf) -> HerculesResult<()> {
        match (&self.own_meta_data, &self.field_names) {
            (Some(own_meta_data), Some(field_names)) => {
                if config.meta_data != *own_meta_data {
                    return Err(HerculesError::schema(
                        "CAMPAIGN.METADATA_MISMATCH",
                        format!(
                            "run '{}' carries different metadata; all runs of a campaign need the same metadata",
                            path.display()
                        ),
                    ));
                }
                if !config.config_data.names().eq(field_names.iter().map(String::as_str)) {
                    return Err(HerculesError::schema(
                        "CAMPAIGN.FIELD_MISMATCH",
                        format!(
                            "run '{}' has fields [{}] but the campaign expects [{}]",
                            path.display(),
                            config.config_data.names().collect::<Vec<_>>().join(", "),
                            field_names.join(", ")
                        ),
                    ));
                }
            }
            _ => {
                for (key, value) in &config.meta_data {
                    if let Some(existing) = self.meta_data.get(key).filter(|existing| *existing != value) {
                        warn!(
                            key = %key,
                            existing = %existing,
                            replacement = %value,
                            "run metadata overrides a campaign metadata entry"
                        );
                    }
                }
                self.meta_data.extend(config.meta_data.clone());
                self.own_meta_data = Some(config.meta_data.clone());
                self.field_names = Some(config.config_data.names().map(str::to_string).collect());
            }
        }

        config.meta_data = self.meta_data.clone();
        self.runs.push(CampaignRun { config, path });
        Ok(())
    }

    pub fn meta_data(&self) -> &Metadata {
        &self.meta_data
    }

    pub fn field_names(&self) -> &[String] {
        self.field_names.as_deref().unwrap_or_default()
    }

    pub fn entries(&self) -> &[CampaignRun] {
        &self.runs
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// `(parameters, relative path)` pairs in insertion order.
    pub fn runs(&self) -> impl Iterator<Item = (ParameterVector, PathBuf)> + '_ {
        self.runs
            .iter()
            .map(|run| (run.config.config_data.clone(), run.path.clone()))
    }

    /// Writes `<root>/<run>/SimConfig.json` for every run.
    pub fn write_run_configs(&self, root: &Path) -> HerculesResult<()> {
        for run in &self.runs {
            run.config
                .to_json_file(&root.join(&run.path).join(SIM_CONFIG_NAME))?;
        }
        Ok(())
    }

    pub fn to_dataset(&self, context: DatasetContext) -> HerculesResult<Dataset> {
        let context = DatasetContext {
            metadata: self.meta_data.clone(),
            ..context
        };
        Dataset::build(context, self.runs())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigList, RunConfig, VERSION_METADATA_KEY};
    use crate::domain::{HerculesErrorKind, Metadata, ParameterVector};
    use crate::grid::DatasetContext;
    use serde_json::json;
    use std::path::PathBuf;

    fn config(x: f64, z: f64) -> RunConfig {
        RunConfig::new(ParameterVector::new().with("x", x).with("y", 3.0).with("z", z))
    }

    #[test]
    fn runs_are_named_by_position_and_carry_campaign_metadata() {
        let mut list = ConfigList::new(Metadata::from([("sr".to_string(), json!(200.0))]));
        list.add_config(config(0.0, 5.0)).unwrap();
        list.add_config(config(0.0, 6.0)).unwrap();

        let names: Vec<_> = list
            .entries()
            .iter()
            .map(|run| run.config.sim_name.clone().unwrap())
            .collect();
        assert_eq!(names, ["run0", "run1"]);
        assert_eq!(list.entries()[1].path, PathBuf::from("run1"));
        assert_eq!(list.entries()[1].config.meta_data, *list.meta_data());
        assert_eq!(list.meta_data()["sr"], json!(200.0));
        assert!(list.meta_data().contains_key(VERSION_METADATA_KEY));
        assert_eq!(list.field_names(), ["x", "y", "z"]);
    }

    #[test]
    fn first_run_metadata_is_merged_and_later_runs_must_match() {
        let own = Metadata::from([("geometry".to_string(), json!("free-space"))]);
        let mut list = ConfigList::new(Metadata::new());
        list.add_config(config(0.0, 5.0).with_meta_data(own.clone())).unwrap();
        assert_eq!(list.meta_data()["geometry"], json!("free-space"));

        list.add_config(config(1.0, 5.0).with_meta_data(own)).unwrap();
        let error = list
            .add_config(config(2.0, 5.0))
            .expect_err("missing metadata should be rejected");
        assert_eq!(error.kind(), HerculesErrorKind::Schema);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn field_mismatch_is_a_schema_error() {
        let mut list = ConfigList::new(Metadata::new());
        list.add_config(config(0.0, 5.0)).unwrap();
        let error = list
            .add_config(RunConfig::new(ParameterVector::new().with("x", 1.0)))
            .expect_err("different fields should be rejected");
        assert_eq!(error.placeholder(), "CAMPAIGN.FIELD_MISMATCH");
    }

    #[test]
    fn list_builds_a_dataset_with_its_metadata() {
        let mut list = ConfigList::new(Metadata::from([("info".to_string(), json!("hello"))]));
        for x in 0..2 {
            for z in 5..7 {
                list.add_config(config(f64::from(x), f64::from(z))).unwrap();
            }
        }
        let dataset = list
            .to_dataset(DatasetContext::new("campaign"))
            .expect("dataset should build");
        assert_eq!(dataset.shape(), vec![2, 1, 2]);
        assert_eq!(dataset.metadata(), list.meta_data());
        let hit = dataset.lookup_index(&[1, 0, 0]).unwrap();
        assert_eq!(hit.path, PathBuf::from("campaign/run2"));
    }

    #[test]
    fn run_config_uses_hyphenated_json_keys() {
        let mut config = config(1.0, 5.0);
        config.sim_name = Some("run4".to_string());
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["sim-name"], json!("run4"));
        assert_eq!(value["config-data"]["z"], json!(5.0));
        assert!(value["meta-data"].as_object().unwrap().is_empty());
    }
}
