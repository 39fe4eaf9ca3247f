/*!
 * PATH Search
 * Resolves bare executable names against a colon-separated search list
 */

use super::types::{LoaderError, LoaderResult};
use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Any of the user/group/other execute bits
const EXECUTE_BITS: u32 = 0o111;

/// Split a PATH value into directories. Empty input yields no entries;
/// empty components are preserved and mean the current directory.
pub fn split_path(path: &OsStr) -> Vec<&OsStr> {
    if path.is_empty() {
        return Vec::new();
    }
    path.as_bytes().split(|b| *b == b':').map(OsStr::from_bytes).collect()
}

/// True when `candidate` exists, is not a directory, and has an execute bit
pub fn is_executable(candidate: &Path) -> bool {
    match std::fs::metadata(candidate) {
        Ok(meta) => !meta.is_dir() && meta.permissions().mode() & EXECUTE_BITS != 0,
        Err(_) => false,
    }
}

/// Find the first executable `name` in the directories of `path_var`.
///
/// There is no fallback to the literal name: when no directory matches
/// the lookup fails with [`LoaderError::NotFound`].
pub fn look_path(name: &OsStr, path_var: Option<&OsStr>) -> LoaderResult<PathBuf> {
    for dir in split_path(path_var.unwrap_or_default()) {
        let dir = if dir.is_empty() { OsStr::new(".") } else { dir };
        let candidate = Path::new(dir).join(name);
        if is_executable(&candidate) {
            return Ok(candidate);
        }
    }
    Err(LoaderError::NotFound(name.to_string_lossy().into_owned()))
}
