use super::{ConfigList, RunConfig};
use crate::domain::{HerculesError, HerculesResult, Metadata};
use globset::{Glob, GlobMatcher};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_SCAN_PATTERN: &str = "**/SimConfig.json";

/// Rebuilds a campaign's run list from the `SimConfig.json` records below
/// `root`.
///
/// `pattern` is matched against paths relative to `root` using `/`
/// separators. Each run's path is the directory holding its record, and runs
/// are ordered by that path.
pub fn scan_campaign(root: &Path, pattern: &str) -> HerculesResult<ConfigList> {
    let matcher = Glob::new(pattern)
        .map_err(|source| {
            HerculesError::invalid_argument(
                "CAMPAIGN.SCAN_PATTERN",
                format!("invalid run config pattern '{pattern}': {source}"),
            )
        })?
        .compile_matcher();

    let mut records = Vec::new();
    collect_matches(root, root, &matcher, &mut records)?;
    records.sort();
    if records.is_empty() {
        return Err(HerculesError::schema(
            "CAMPAIGN.NO_RUNS",
            format!(
                "no run configs matching '{}' below '{}'",
                pattern,
                root.display()
            ),
        ));
    }

    let mut list = ConfigList::new(Metadata::new());
    for relative in records {
        let config = RunConfig::from_json_file(&root.join(&relative))?;
        let run_dir = relative
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        debug!(run = %run_dir.display(), "found run config");
        list.push_run(config, run_dir)?;
    }
    info!(root = %root.display(), runs = list.len(), "campaign scanned");
    Ok(list)
}

fn collect_matches(
    root: &Path,
    directory: &Path,
    matcher: &GlobMatcher,
    records: &mut Vec<PathBuf>,
) -> HerculesResult<()> {
    let entries = fs::read_dir(directory).map_err(|source| {
        HerculesError::io(
            "IO.CAMPAIGN_SCAN",
            format!("failed to list '{}': {}", directory.display(), source),
        )
    })?;

    let entry_error = |source: std::io::Error| {
        HerculesError::io(
            "IO.CAMPAIGN_SCAN",
            format!("failed to read entry in '{}': {}", directory.display(), source),
        )
    };
    for entry in entries {
        let entry = entry.map_err(entry_error)?;
        let path = entry.path();
        // Symlinked directories are not descended into.
        if entry.file_type().map_err(entry_error)?.is_dir() {
            collect_matches(root, &path, matcher, records)?;
            continue;
        }
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        let normalized = relative.to_string_lossy().replace('\\', "/");
        if matcher.is_match(&normalized) {
            records.push(relative.to_path_buf());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_SCAN_PATTERN, scan_campaign};
    use crate::campaign::{ConfigList, RunConfig};
    use crate::domain::{HerculesErrorKind, Metadata, ParameterVector};
    use crate::grid::DatasetContext;
    use serde_json::json;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn scanning_written_configs_rebuilds_the_same_index() {
        let temp = TempDir::new().expect("tempdir should be created");
        let mut list = ConfigList::new(Metadata::from([("sr".to_string(), json!(200.0))]));
        for x in 0..3 {
            list.add_config(RunConfig::new(
                ParameterVector::new().with("x", f64::from(x)).with("y", 3.0),
            ))
            .unwrap();
        }
        list.write_run_configs(temp.path()).expect("configs should be written");

        let scanned = scan_campaign(temp.path(), DEFAULT_SCAN_PATTERN).expect("scan should succeed");
        assert_eq!(scanned.len(), 3);
        assert_eq!(scanned.meta_data(), list.meta_data());

        let original = list.to_dataset(DatasetContext::new(temp.path())).unwrap();
        let rebuilt = scanned.to_dataset(DatasetContext::new(temp.path())).unwrap();
        assert_eq!(rebuilt.index(), original.index());
        assert_eq!(rebuilt.axes(), original.axes());
    }

    #[test]
    fn pattern_restricts_the_scanned_records() {
        let temp = TempDir::new().expect("tempdir should be created");
        for (dir, x) in [("keep/a", 0.0), ("keep/b", 1.0), ("skip/c", 2.0)] {
            RunConfig::new(ParameterVector::new().with("x", x))
                .to_json_file(&temp.path().join(dir).join("SimConfig.json"))
                .unwrap();
        }

        let scanned = scan_campaign(temp.path(), "keep/**/SimConfig.json").unwrap();
        let paths: Vec<PathBuf> = scanned.entries().iter().map(|run| run.path.clone()).collect();
        assert_eq!(paths, [PathBuf::from("keep/a"), PathBuf::from("keep/b")]);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_not_followed() {
        let temp = TempDir::new().expect("tempdir should be created");
        RunConfig::new(ParameterVector::new().with("x", 1.0))
            .to_json_file(&temp.path().join("run0").join("SimConfig.json"))
            .unwrap();
        std::os::unix::fs::symlink(temp.path(), temp.path().join("run0").join("loop"))
            .expect("symlink should be created");

        let scanned = scan_campaign(temp.path(), DEFAULT_SCAN_PATTERN).expect("scan should finish");
        let paths: Vec<PathBuf> = scanned.entries().iter().map(|run| run.path.clone()).collect();
        assert_eq!(paths, [PathBuf::from("run0")]);
    }

    #[test]
    fn empty_campaign_and_bad_pattern_are_reported() {
        let temp = TempDir::new().expect("tempdir should be created");
        let error = scan_campaign(temp.path(), DEFAULT_SCAN_PATTERN).expect_err("no runs");
        assert_eq!(error.kind(), HerculesErrorKind::Schema);

        let error = scan_campaign(temp.path(), "a/[b").expect_err("bad glob");
        assert_eq!(error.kind(), HerculesErrorKind::InvalidArgument);
    }
}
