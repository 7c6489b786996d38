//! Moves processed request files to their terminal location.
//!
//! `<requests>/x/name.csv` → `<results>/name_<YYYYMMDDHHMMSS>_<OK|KO>.csv`

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::{io_err, SyncError};

/// Format of the timestamp embedded in outcome file names.
pub const STAMP_FORMAT: &str = "%Y%m%d%H%M%S";

pub fn outcome_label(succeeded: bool) -> &'static str {
    if succeeded {
        "OK"
    } else {
        "KO"
    }
}

pub fn stamp(at: DateTime<Local>) -> String {
    at.format(STAMP_FORMAT).to_string()
}

/// File name without its last extension.
pub fn basename(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `<basename>_<stamp>_<OK|KO>.<ext>`. Pure, no I/O.
pub fn outcome_file_name(path: &Path, stamp: &str, succeeded: bool, fallback_ext: &str) -> String {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| fallback_ext.to_string());
    format!(
        "{}_{}_{}.{}",
        basename(path),
        stamp,
        outcome_label(succeeded),
        ext
    )
}

/// Move `path` into `results_dir` under its outcome name, replacing any file
/// already there.
///
/// Falls back to copy + remove when a plain rename is not possible (for
/// example across filesystems).
pub fn move_to_results(
    path: &Path,
    results_dir: &Path,
    stamp: &str,
    succeeded: bool,
    fallback_ext: &str,
) -> Result<PathBuf, SyncError> {
    std::fs::create_dir_all(results_dir).map_err(|e| io_err(results_dir, e))?;
    let target = results_dir.join(outcome_file_name(path, stamp, succeeded, fallback_ext));

    match std::fs::rename(path, &target) {
        Ok(()) => return Ok(target),
        Err(err) => tracing::debug!(
            "rename {} -> {} failed ({err}); copying instead",
            path.display(),
            target.display()
        ),
    }
    std::fs::copy(path, &target).map_err(|e| io_err(&target, e))?;
    std::fs::remove_file(path).map_err(|e| io_err(path, e))?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn outcome_name_keeps_extension() {
        let name = outcome_file_name(Path::new("/in/costs.v2.csv"), "20240301083000", true, "csv");
        assert_eq!(name, "costs.v2_20240301083000_OK.csv");

        let name = outcome_file_name(Path::new("/in/noext"), "20240301083000", false, "csv");
        assert_eq!(name, "noext_20240301083000_KO.csv");
    }

    #[test]
    fn stamp_has_second_granularity() {
        let at = Local.with_ymd_and_hms(2024, 3, 1, 8, 30, 5).unwrap();
        assert_eq!(stamp(at), "20240301083005");
    }

    #[test]
    fn move_replaces_existing_target() {
        let tmp = TempDir::new().unwrap();
        let requests = tmp.path().join("requests");
        let results = tmp.path().join("results");
        fs::create_dir_all(&requests).unwrap();
        fs::create_dir_all(&results).unwrap();

        let source = requests.join("batch.csv");
        fs::write(&source, "new").unwrap();
        fs::write(results.join("batch_20240301083000_OK.csv"), "old").unwrap();

        let target = move_to_results(&source, &results, "20240301083000", true, "csv").unwrap();
        assert!(!source.exists());
        assert_eq!(fs::read_to_string(target).unwrap(), "new");
    }

    #[test]
    fn move_of_missing_file_fails() {
        let tmp = TempDir::new().unwrap();
        let err = move_to_results(
            &tmp.path().join("gone.csv"),
            tmp.path(),
            "20240301083000",
            false,
            "csv",
        )
        .unwrap_err();
        assert!(matches!(err, SyncError::Io { .. }));
    }
}
