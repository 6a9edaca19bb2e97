use crate::domain::{HerculesError, HerculesResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

pub fn normalize_text_artifact(content: &str) -> String {
    let mut normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    if !normalized.is_empty() && !normalized.ends_with('\n') {
        normalized.push('\n');
    }
    normalized
}

pub fn write_text_artifact(path: &Path, content: &str) -> HerculesResult<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| {
            HerculesError::io(
                "IO.ARTIFACT_DIRECTORY",
                format!("failed to create directory '{}': {}", parent.display(), source),
            )
        })?;
    }
    fs::write(path, normalize_text_artifact(content)).map_err(|source| {
        HerculesError::io(
            "IO.ARTIFACT_WRITE",
            format!("failed to write '{}': {}", path.display(), source),
        )
    })
}

pub fn read_text_artifact(path: &Path) -> HerculesResult<String> {
    fs::read_to_string(path).map_err(|source| {
        HerculesError::io(
            "IO.ARTIFACT_READ",
            format!("failed to read '{}': {}", path.display(), source),
        )
    })
}

pub fn write_json_artifact<T: Serialize>(path: &Path, value: &T) -> HerculesResult<()> {
    let content = serde_json::to_string_pretty(value).map_err(|source| {
        HerculesError::format(
            "FORMAT.JSON_ENCODE",
            format!("failed to encode '{}': {}", path.display(), source),
        )
    })?;
    write_text_artifact(path, &content)
}

pub fn read_json_artifact<T: DeserializeOwned>(path: &Path) -> HerculesResult<T> {
    let content = read_text_artifact(path)?;
    serde_json::from_str(&content).map_err(|source| {
        HerculesError::format(
            "FORMAT.JSON_DECODE",
            format!("failed to decode '{}': {}", path.display(), source),
        )
    })
}
