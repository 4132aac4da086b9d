//! Pre-creates target indexes from optional settings files before the
//! pipeline starts streaming.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::destination::Destination;
use crate::error::{Error, ErrorKind, SiltResult};
use crate::rules::RuleSet;

/// Suffix of index settings files searched next to the configuration file.
const SETTINGS_SUFFIX: &str = ".idx.json";

/// Trailing `-N` version suffix, stripped so `river-3` finds `river.idx.json`.
static VERSION_SUFFIX_EXP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+)-[0-9]+$").unwrap());

/// Creates every distinct target index that has a settings file and does not
/// exist yet. Existing indexes are left untouched; no settings migration is
/// attempted.
pub async fn create_indexes<D: Destination>(
    config_dir: &Path,
    rules: &RuleSet,
    destination: &D,
) -> SiltResult<()> {
    // One settings lookup per distinct index; an explicit indexFile on any of
    // the index's rules wins over the default path.
    let mut index_files: HashMap<&str, Option<&str>> = HashMap::new();
    for rule in rules.iter() {
        let entry = index_files.entry(&rule.index).or_default();
        if entry.is_none() {
            *entry = rule.index_file.as_deref();
        }
    }

    for (index, index_file) in index_files {
        let Some(settings) = read_index_settings(config_dir, index, index_file).await? else {
            continue;
        };

        if destination.index_exists(index).await? {
            warn!(index, "index already exists; settings and mappings not updated");
            continue;
        }

        info!(index, "creating index");
        destination.create_index(index, settings).await?;
    }

    Ok(())
}

/// Locates and parses the settings file for one index.
///
/// An explicitly configured file must exist; the default path
/// `<configDir>/<index-minus-version-suffix>.idx.json` is probed and skipped
/// silently when absent.
async fn read_index_settings(
    config_dir: &Path,
    index: &str,
    index_file: Option<&str>,
) -> SiltResult<Option<Value>> {
    let (path, explicit) = match index_file {
        Some(file) => {
            let path = PathBuf::from(file);
            let path = if path.is_absolute() {
                path
            } else {
                config_dir.join(path)
            };
            (path, true)
        }
        None => {
            let base = match VERSION_SUFFIX_EXP.captures(index) {
                Some(captures) => captures[1].to_string(),
                None => index.to_string(),
            };
            (config_dir.join(format!("{base}{SETTINGS_SUFFIX}")), false)
        }
    };

    let bytes = match fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !explicit => {
            debug!(index, path = %path.display(), "no index settings file");
            return Ok(None);
        }
        Err(e) => {
            return Err(Error::with_source(
                ErrorKind::IndexOperationFailed {
                    index: index.to_string(),
                },
                e,
            ));
        }
    };

    info!(index, path = %path.display(), "using index settings");
    let settings = serde_json::from_slice(&bytes)?;
    Ok(Some(settings))
}
