use std::path::Path;

use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::instance::model::is_bookkeeping;

/// Extract `zip_path` into `dest`, merging with what is already there.
///
/// Entries that escape `dest` are rejected. Root-level entries named like
/// instance bookkeeping are skipped so an archive cannot forge a manifest.
/// Blocking; returns the number of files written.
pub fn extract_zip(zip_path: &Path, dest: &Path) -> LauncherResult<usize> {
    let zip_file = std::fs::File::open(zip_path).map_err(LauncherError::io(zip_path))?;
    let mut archive = zip::ZipArchive::new(zip_file)?;
    let mut written = 0;

    for index in 0..archive.len() {
        let mut zipped = archive.by_index(index)?;

        let Some(rel_path) = zipped.enclosed_name() else {
            return Err(LauncherError::Apply(format!(
                "Archive entry escapes the instance: {}",
                zipped.name()
            )));
        };
        if rel_path.as_os_str().is_empty() {
            continue;
        }
        if rel_path.components().count() == 1
            && is_bookkeeping(&rel_path.to_string_lossy())
        {
            warn!(entry = %zipped.name(), "Skipping archive entry that shadows bookkeeping");
            continue;
        }

        let out_path = dest.join(&rel_path);
        if zipped.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(LauncherError::io(&out_path))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(LauncherError::io(parent))?;
        }
        let mut out = std::fs::File::create(&out_path).map_err(LauncherError::io(&out_path))?;
        std::io::copy(&mut zipped, &mut out).map_err(LauncherError::io(&out_path))?;
        written += 1;
    }

    debug!(archive = %zip_path.display(), files = written, "Archive extracted");
    Ok(written)
}
