pub mod cvss;
pub mod extractor;
pub mod scope;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::core::state::CrawlResult;
use crate::error::SentinelError;

pub const DEFAULT_OUTPUT_DIR: &str = "sentinel_output";

/// Resolves where a command writes its JSON artifact.
///
/// An explicit path must end in `.json` and, when `must_not_exist` is set,
/// must not already exist. Without one, `sentinel_output/<prefix>_<unix-ms>.json`
/// is used and the directory is created.
pub fn resolve_output_path(
    requested: Option<&str>,
    prefix: &str,
    must_not_exist: bool,
) -> Result<PathBuf, SentinelError> {
    let path = match requested {
        Some(raw) => absolute(Path::new(raw))?,
        None => {
            let dir = absolute(Path::new(DEFAULT_OUTPUT_DIR))?;
            fs::create_dir_all(&dir)
                .map_err(|e| SentinelError::io("failed to create output directory", &dir, e))?;
            dir.join(format!("{}_{}.json", prefix, unix_millis()))
        }
    };

    let mut violations = Vec::new();
    if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
        violations.push(format!("output file '{}' must be a .json file", path.display()));
    }
    if must_not_exist && path.exists() {
        violations.push(format!("output file '{}' already exists", path.display()));
    }

    if violations.is_empty() {
        Ok(path)
    } else {
        Err(SentinelError::Validation(violations))
    }
}

/// Pretty-prints `value` to `path` through a temporary file and a rename, so
/// a killed process never leaves a truncated artifact behind.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), SentinelError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| SentinelError::io("failed to serialize output", path, e.into()))?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, json).map_err(|e| SentinelError::io("failed to write output", &tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| SentinelError::io("failed to write output", path, e))?;
    Ok(())
}

/// Loads a crawl artifact produced by the `spider` command.
pub fn read_spider_results(path: &Path) -> Result<CrawlResult, SentinelError> {
    let data = fs::read_to_string(path)
        .map_err(|e| SentinelError::io("failed to read spider results", path, e))?;

    serde_json::from_str(&data).map_err(|source| SentinelError::Format {
        path: path.to_path_buf(),
        source,
    })
}

fn absolute(path: &Path) -> Result<PathBuf, SentinelError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|e| SentinelError::io("failed to resolve working directory", path, e))
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}
