use super::{Axis, Dataset, GridIndex, IndexEntry};
use crate::domain::{HerculesError, HerculesResult, Metadata};
use crate::serialization::{read_json_artifact, write_json_artifact, write_text_artifact};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DATASET_CLASS: &str = "hercules.Dataset";
pub const DATASET_VERSION: &str = "2.0";
pub const INDEX_FILE_NAME: &str = "index.json";
pub const INFO_FILE_NAME: &str = "info.txt";

/// Artifacts written before versions were stamped are treated as 1.0.
const UNSTAMPED_VERSION: &str = "1.0";

#[derive(Debug, Deserialize)]
struct PersistedHeader {
    #[serde(default)]
    class: String,
    #[serde(default = "unstamped_version")]
    version: String,
}

fn unstamped_version() -> String {
    UNSTAMPED_VERSION.to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedDataset {
    class: String,
    version: String,
    field_names: Vec<String>,
    metadata: Metadata,
    snapping: bool,
    axes: Vec<Axis>,
    index: Vec<IndexEntry>,
}

impl Dataset {
    pub fn index_path(&self) -> PathBuf {
        self.directory.join(INDEX_FILE_NAME)
    }

    pub fn info_path(&self) -> PathBuf {
        self.directory.join(INFO_FILE_NAME)
    }

    /// Writes `index.json` and the human-readable `info.txt` under the
    /// dataset root, creating the root when missing.
    pub fn dump(&self) -> HerculesResult<()> {
        let persisted = PersistedDataset {
            class: DATASET_CLASS.to_string(),
            version: self.version.clone(),
            field_names: self.field_names.clone(),
            metadata: self.metadata.clone(),
            snapping: self.is_snappable(),
            axes: self.axes.clone(),
            index: self.index.to_entries(),
        };
        write_json_artifact(&self.index_path(), &persisted)?;
        write_text_artifact(&self.info_path(), &self.info_text())?;
        info!(
            directory = %self.directory.display(),
            runs = self.len(),
            "dataset index written"
        );
        Ok(())
    }

    /// Loads the index stored under `path` and rebases the dataset onto it.
    pub fn load(path: impl AsRef<Path>) -> HerculesResult<Self> {
        let root = path.as_ref();
        let artifact = root.join(INDEX_FILE_NAME);
        let document: serde_json::Value = read_json_artifact(&artifact)?;

        let header: PersistedHeader = serde_json::from_value(document.clone()).map_err(|source| {
            HerculesError::format(
                "GRID.ARTIFACT_HEADER",
                format!("failed to read header of '{}': {}", artifact.display(), source),
            )
        })?;
        if header.class != DATASET_CLASS {
            return Err(HerculesError::version(
                "GRID.ARTIFACT_CLASS",
                format!(
                    "'{}' does not point to a hercules dataset (class '{}')",
                    artifact.display(),
                    header.class
                ),
            ));
        }
        if header.version != DATASET_VERSION {
            return Err(HerculesError::version(
                "GRID.ARTIFACT_VERSION",
                format!(
                    "tried to load a version {} dataset with version {}; an older release is needed to open it",
                    header.version, DATASET_VERSION
                ),
            ));
        }

        let persisted: PersistedDataset = serde_json::from_value(document).map_err(|source| {
            HerculesError::format(
                "GRID.ARTIFACT_BODY",
                format!("failed to decode '{}': {}", artifact.display(), source),
            )
        })?;
        validate_persisted(&persisted, &artifact)?;

        let index: GridIndex = persisted.index.into_iter().collect();
        let dataset = Dataset::from_parts(
            persisted.version,
            root.to_path_buf(),
            persisted.field_names,
            persisted.metadata,
            persisted.axes,
            index,
            persisted.snapping,
        );
        info!(
            directory = %root.display(),
            runs = dataset.len(),
            shape = ?dataset.shape(),
            "dataset index loaded"
        );
        Ok(dataset)
    }

    /// Summary written next to the index; not read back.
    pub fn info_text(&self) -> String {
        let mut text = String::new();
        let metadata = serde_json::to_string(&self.metadata).unwrap_or_else(|_| "{}".to_string());
        let _ = writeln!(text, "Hercules dataset version {}", self.version);
        let _ = writeln!(text, "Metadata:");
        let _ = writeln!(text, "{metadata}");
        let _ = writeln!(text);
        let _ = writeln!(text, "Dataset has following configurations:");
        for (name, axis) in self.field_names.iter().zip(&self.axes) {
            let lower = axis.first().map(|value| value.to_string()).unwrap_or_default();
            let upper = axis.last().map(|value| value.to_string()).unwrap_or_default();
            let suffix = if axis.is_numeric() { "" } else { " (positional)" };
            let _ = writeln!(
                text,
                "{}: {} values in [{},{}]{}",
                name,
                axis.len(),
                lower,
                upper,
                suffix
            );
        }
        text
    }
}

fn validate_persisted(persisted: &PersistedDataset, artifact: &Path) -> HerculesResult<()> {
    let corrupt = |message: String| {
        HerculesError::format(
            "GRID.ARTIFACT_CORRUPT",
            format!("'{}' is inconsistent: {}", artifact.display(), message),
        )
    };

    if persisted.axes.len() != persisted.field_names.len() {
        return Err(corrupt(format!(
            "{} axes for {} fields",
            persisted.axes.len(),
            persisted.field_names.len()
        )));
    }
    for (name, axis) in persisted.field_names.iter().zip(&persisted.axes) {
        if axis.is_empty() || !axis.is_strictly_ascending() {
            return Err(corrupt(format!(
                "axis '{name}' is empty or not strictly ascending"
            )));
        }
    }
    for entry in &persisted.index {
        let on_grid = entry.values.len() == persisted.axes.len()
            && entry
                .values
                .iter()
                .zip(&persisted.axes)
                .all(|(value, axis)| axis.position_of(value).is_some());
        if !on_grid {
            return Err(corrupt(format!(
                "index entry '{}' does not lie on the stored axes",
                entry.path.display()
            )));
        }
    }
    Ok(())
}
