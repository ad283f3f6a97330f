// Local path helpers shared across storage operations
use crate::storage::constants::PARTIAL_DOWNLOAD_SUFFIX;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Sibling path a download streams into before it is moved over `target`.
/// Each call yields a fresh name, so concurrent downloads to one target do
/// not share a file.
///
/// Returns `None` when `target` has no file name (for example `/` or `..`).
pub fn partial_download_path(target: &Path) -> Option<PathBuf> {
    let file_name = target.file_name()?;
    let mut partial = file_name.to_os_string();
    partial.push(format!(".{}{PARTIAL_DOWNLOAD_SUFFIX}", Uuid::new_v4().simple()));
    Some(target.with_file_name(partial))
}

/// Parent directory of `path`, skipping the empty parent of a bare file name.
pub fn non_empty_parent(path: &Path) -> Option<&Path> {
    path.parent().filter(|parent| !parent.as_os_str().is_empty())
}
