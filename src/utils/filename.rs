use crate::error::Result;
use crate::utils::constants::{EXPORT_DIR_PREFIX, MANIFEST_SUFFIX, PARTITION_SUFFIX};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

/// Replace path separators so a site name can be embedded in a file name.
pub fn sanitize_component(name: &str) -> String {
    name.replace(['/', '\\'], "_")
}

/// `{site}_{label}_zonal_stats.csv`
pub fn partition_file_name(site: &str, label: &str) -> String {
    format!(
        "{}_{}_{}.csv",
        sanitize_component(site),
        label,
        PARTITION_SUFFIX
    )
}

/// `{label}_zonal_stats.parquet`
pub fn parquet_file_name(label: &str) -> String {
    format!("{}_{}.parquet", label, PARTITION_SUFFIX)
}

/// `{label}_image_list.csv`
pub fn manifest_file_name(label: &str) -> String {
    format!("{}_{}", label, MANIFEST_SUFFIX)
}

/// `zonal_stats_{YYYYMMDD_HHMMSS}`
pub fn export_dir_name(timestamp: DateTime<Local>) -> String {
    format!("{}_{}", EXPORT_DIR_PREFIX, timestamp.format("%Y%m%d_%H%M%S"))
}

/// True when `path`'s file name ends with `extension` (case-sensitive, as
/// the archive naming is).
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.ends_with(extension))
        .unwrap_or(false)
}

/// Directory listing of one walk step: the directory and the regular files
/// directly inside it.
#[derive(Debug, Clone)]
pub struct WalkEntry {
    pub directory: PathBuf,
    pub files: Vec<PathBuf>,
}

/// Top-down recursive walk of `root`. Entries are sorted by name at every
/// level so repeated runs visit the tree in the same order.
pub fn walk_tree(root: &Path) -> Result<Vec<WalkEntry>> {
    let mut entries = Vec::new();
    walk_into(root, &mut entries)?;
    Ok(entries)
}

fn walk_into(dir: &Path, out: &mut Vec<WalkEntry>) -> Result<()> {
    let mut files = Vec::new();
    let mut subdirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            subdirs.push(entry.path());
        } else if file_type.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    subdirs.sort();

    out.push(WalkEntry {
        directory: dir.to_path_buf(),
        files,
    });
    for subdir in subdirs {
        walk_into(&subdir, out)?;
    }
    Ok(())
}
