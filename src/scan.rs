//! Import of reference images from folders on disk.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::{DirEntry, WalkDir};

use crate::error::Error;

/// Extensions accepted by the importer (lowercase, without dot).
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "bmp", "jpg", "jpeg"];

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Whether to descend into subfolders.
    pub recursive: bool,
    /// Optional override for allowed extensions.
    pub exts: Option<Vec<&'static str>>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            exts: None,
        }
    }
}

/// Return `true` if `path` has an allowed image extension, ignoring case.
#[must_use]
pub fn is_supported_image(path: &Path, exts: Option<&[&str]>) -> bool {
    let exts = exts.unwrap_or(IMAGE_EXTENSIONS);
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| exts.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// Collect the images below `folders`, without duplicates, in path order.
///
/// # Errors
/// Returns [`Error::BadDir`] naming every folder that is missing or not a
/// directory.
pub fn scan_with_options(folders: &[PathBuf], opts: &ScanOptions) -> Result<Vec<PathBuf>, Error> {
    let bad: Vec<_> = folders
        .iter()
        .filter(|p| !p.is_dir())
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    if !bad.is_empty() {
        return Err(Error::BadDir(bad.join(", ")));
    }

    let mut found = BTreeSet::new();
    for root in folders {
        let mut wd = WalkDir::new(root);
        if !opts.recursive {
            wd = wd.max_depth(1);
        }
        for entry in wd.into_iter().filter_entry(|e| !should_skip_dir(e)) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(root = %root.display(), error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            let path = entry.path();
            if entry.file_type().is_file() && is_supported_image(path, opts.exts.as_deref()) {
                found.insert(path.to_path_buf());
            }
        }
    }
    Ok(found.into_iter().collect())
}

/// Like [`scan_with_options`], but an import with no images is an error.
///
/// # Errors
/// [`Error::BadDir`] as above, [`Error::EmptyScan`] when nothing was found.
pub fn import_images(folders: &[PathBuf], opts: &ScanOptions) -> Result<Vec<String>, Error> {
    let found = scan_with_options(folders, opts)?;
    if found.is_empty() {
        return Err(Error::EmptyScan);
    }
    Ok(found
        .into_iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect())
}

fn should_skip_dir(entry: &DirEntry) -> bool {
    // Never skip the root; tempfile roots can be dot-dirs.
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    entry
        .file_name()
        .to_str()
        .is_some_and(|n| n.starts_with('.'))
}
