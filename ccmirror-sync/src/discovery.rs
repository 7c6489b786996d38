//! Request file discovery.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{io_err, SyncError};

/// Suffix marking a file that already went through a batch successfully.
pub const OK_SUFFIX: &str = "_OK";
/// Suffix marking a file that already went through a batch and failed.
pub const KO_SUFFIX: &str = "_KO";

/// `true` if `path` names a request file with `extension` that does not
/// carry an outcome suffix.
pub fn is_request_file(path: &Path, extension: &str) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let Some(stem) = name.strip_suffix(&format!(".{extension}")) else {
        return false;
    };
    !stem.ends_with(OK_SUFFIX) && !stem.ends_with(KO_SUFFIX)
}

/// Walk `requests_dir` recursively and return every pending request file,
/// sorted by path. Symlinked folders are followed.
///
/// Any fault during the walk is returned; a partial listing is never
/// reported as complete.
pub fn discover(requests_dir: &Path, extension: &str) -> Result<Vec<PathBuf>, SyncError> {
    let mut found = Vec::new();
    for entry in WalkDir::new(requests_dir).follow_links(true) {
        let entry = entry.map_err(|err| walk_err(requests_dir, err))?;
        if entry.file_type().is_file() && is_request_file(entry.path(), extension) {
            found.push(entry.into_path());
        }
    }
    found.sort();
    Ok(found)
}

fn walk_err(root: &Path, err: walkdir::Error) -> SyncError {
    let path = err.path().unwrap_or(root).to_path_buf();
    io_err(path, err.into())
}
