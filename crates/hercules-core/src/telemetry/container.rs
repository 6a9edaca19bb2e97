use crate::domain::{HerculesError, HerculesResult};
use crate::serialization::{read_json_artifact, write_json_artifact};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;

/// Group holding the file-level attributes.
pub const FILE_GROUP: &str = "";

pub fn stream_group(stream: usize) -> String {
    format!("streams/stream{stream}")
}

pub fn channel_group(channel: usize) -> String {
    format!("channels/channel{channel}")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Integer(i64),
    Float(f64),
    Text(String),
    IntegerList(Vec<i64>),
    FloatList(Vec<f64>),
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<i64>> for AttributeValue {
    fn from(value: Vec<i64>) -> Self {
        Self::IntegerList(value)
    }
}

pub type AttributeSet = BTreeMap<String, AttributeValue>;

/// Read access to a structured telemetry container.
///
/// Attribute sets are addressed by group path (see [`FILE_GROUP`],
/// [`stream_group`] and [`channel_group`]); raw sample blocks by stream,
/// acquisition and record. A block holds interleaved real/imaginary codes
/// for every channel of its stream.
pub trait TelemetryContainer {
    fn attributes(&self, group: &str) -> Option<AttributeSet>;

    fn sample_block(
        &self,
        stream: usize,
        acquisition: usize,
        record: usize,
    ) -> HerculesResult<Cow<'_, [i32]>>;
}

impl<T: TelemetryContainer + ?Sized> TelemetryContainer for &T {
    fn attributes(&self, group: &str) -> Option<AttributeSet> {
        (**self).attributes(group)
    }

    fn sample_block(
        &self,
        stream: usize,
        acquisition: usize,
        record: usize,
    ) -> HerculesResult<Cow<'_, [i32]>> {
        (**self).sample_block(stream, acquisition, record)
    }
}

/// In-memory container; its serde form is the JSON telemetry file layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "ContainerDocument", into = "ContainerDocument")]
pub struct MemoryContainer {
    groups: BTreeMap<String, AttributeSet>,
    blocks: BTreeMap<(usize, usize, usize), Vec<i32>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ContainerDocument {
    groups: BTreeMap<String, AttributeSet>,
    #[serde(default)]
    blocks: Vec<BlockDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BlockDocument {
    stream: usize,
    acquisition: usize,
    record: usize,
    samples: Vec<i32>,
}

impl From<ContainerDocument> for MemoryContainer {
    fn from(document: ContainerDocument) -> Self {
        Self {
            groups: document.groups,
            blocks: document
                .blocks
                .into_iter()
                .map(|block| ((block.stream, block.acquisition, block.record), block.samples))
                .collect(),
        }
    }
}

impl From<MemoryContainer> for ContainerDocument {
    fn from(container: MemoryContainer) -> Self {
        Self {
            groups: container.groups,
            blocks: container
                .blocks
                .into_iter()
                .map(|((stream, acquisition, record), samples)| BlockDocument {
                    stream,
                    acquisition,
                    record,
                    samples,
                })
                .collect(),
        }
    }
}

impl MemoryContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_attribute(
        &mut self,
        group: &str,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> &mut Self {
        self.groups
            .entry(group.to_string())
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    pub fn insert_block(
        &mut self,
        stream: usize,
        acquisition: usize,
        record: usize,
        samples: Vec<i32>,
    ) -> &mut Self {
        self.blocks.insert((stream, acquisition, record), samples);
        self
    }

    pub fn remove_group(&mut self, group: &str) -> Option<AttributeSet> {
        self.groups.remove(group)
    }

    pub fn from_json_file(path: &Path) -> HerculesResult<Self> {
        read_json_artifact(path)
    }

    pub fn to_json_file(&self, path: &Path) -> HerculesResult<()> {
        write_json_artifact(path, self)
    }
}

impl TelemetryContainer for MemoryContainer {
    fn attributes(&self, group: &str) -> Option<AttributeSet> {
        self.groups.get(group).cloned()
    }

    fn sample_block(
        &self,
        stream: usize,
        acquisition: usize,
        record: usize,
    ) -> HerculesResult<Cow<'_, [i32]>> {
        self.blocks
            .get(&(stream, acquisition, record))
            .map(|samples| Cow::Borrowed(samples.as_slice()))
            .ok_or_else(|| {
                HerculesError::format(
                    "TELEMETRY.MISSING_BLOCK",
                    format!(
                        "stream {stream} has no sample block for acquisition {acquisition}, record {record}"
                    ),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::{AttributeValue, MemoryContainer, TelemetryContainer, stream_group};
    use crate::domain::HerculesErrorKind;
    use tempfile::TempDir;

    #[test]
    fn attribute_values_decode_from_plain_json() {
        let values: Vec<AttributeValue> =
            serde_json::from_str(r#"[2, 250.5, "packed", [0, 1], [0.5, 1.5]]"#).unwrap();
        assert_eq!(
            values,
            vec![
                AttributeValue::Integer(2),
                AttributeValue::Float(250.5),
                AttributeValue::from("packed"),
                AttributeValue::IntegerList(vec![0, 1]),
                AttributeValue::FloatList(vec![0.5, 1.5]),
            ]
        );
    }

    #[test]
    fn container_round_trips_through_a_json_file() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("simulation.json");
        let mut container = MemoryContainer::new();
        container
            .set_attribute(&stream_group(0), "n_records", 1_i64)
            .insert_block(0, 0, 0, vec![1, 2, 3, 4]);
        container.to_json_file(&path).unwrap();

        let loaded = MemoryContainer::from_json_file(&path).unwrap();
        assert_eq!(loaded, container);
        assert_eq!(loaded.sample_block(0, 0, 0).unwrap().as_ref(), &[1, 2, 3, 4]);
        let error = loaded.sample_block(0, 1, 0).expect_err("block is absent");
        assert_eq!(error.kind(), HerculesErrorKind::Format);
    }
}
