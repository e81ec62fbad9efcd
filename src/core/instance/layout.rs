// ─── Instance Layout ───
// Repairs the on-disk shape of an instance after archives are extracted or
// installers have run. Blocking std::fs; callers run it off the runtime.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::model::{is_bookkeeping, CANONICAL_SUBDIRS, GAME_DIR, GAME_DIR_ALIAS};
use crate::core::error::{LauncherError, LauncherResult};

/// Transient name a wrapper directory is moved to before hoisting.
const HOIST_STAGING: &str = ".normalize-wrapper";

/// Bring `root` into canonical shape and return how many entries moved.
///
/// 1. A single wrapper directory at the root is unwrapped.
/// 2. `.minecraft` is merged into `minecraft/`.
/// 3. Any other non-bookkeeping entry moves under `minecraft/`.
/// 4. Canonical subdirectories are created.
///
/// Directories merge on collision; a moved file replaces a file of the
/// same name. A second run on the result moves nothing.
pub fn normalize(root: &Path) -> LauncherResult<usize> {
    fs::create_dir_all(root).map_err(LauncherError::io(root))?;
    let game_dir = root.join(GAME_DIR);
    let mut moved = 0;

    if let Some(wrapper) = single_wrapper(root)? {
        moved += hoist(root, &wrapper, &game_dir)?;
    }

    let alias = root.join(GAME_DIR_ALIAS);
    if alias.is_dir() {
        moved += merge_move(&alias, &game_dir).map_err(LauncherError::io(&alias))?;
    }

    for (name, path) in root_candidates(root)? {
        moved += merge_move(&path, &game_dir.join(&name)).map_err(LauncherError::io(&path))?;
    }

    for sub in CANONICAL_SUBDIRS {
        let dir = game_dir.join(sub);
        fs::create_dir_all(&dir).map_err(LauncherError::io(&dir))?;
    }

    debug!(root = %root.display(), moved, "Instance layout normalized");
    Ok(moved)
}

/// Root entries that do not belong at the root.
fn root_candidates(root: &Path) -> LauncherResult<Vec<(String, PathBuf)>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(root).map_err(LauncherError::io(root))? {
        let entry = entry.map_err(LauncherError::io(root))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name == GAME_DIR || is_bookkeeping(&name) {
            continue;
        }
        out.push((name, entry.path()));
    }
    out.sort();
    Ok(out)
}

fn single_wrapper(root: &Path) -> LauncherResult<Option<PathBuf>> {
    let candidates = root_candidates(root)?;
    let [(name, path)] = candidates.as_slice() else {
        return Ok(None);
    };
    let is_wrapper = path.is_dir()
        && name != GAME_DIR_ALIAS
        && name != HOIST_STAGING
        && !CANONICAL_SUBDIRS.contains(&name.as_str());
    Ok(is_wrapper.then(|| path.clone()))
}

fn hoist(root: &Path, wrapper: &Path, game_dir: &Path) -> LauncherResult<usize> {
    debug!(wrapper = %wrapper.display(), "Hoisting nested archive root");

    // Out of the way first, so a child named like the wrapper cannot collide.
    let staged = root.join(HOIST_STAGING);
    fs::rename(wrapper, &staged).map_err(LauncherError::io(wrapper))?;

    let mut moved = 0;
    for entry in fs::read_dir(&staged).map_err(LauncherError::io(&staged))? {
        let entry = entry.map_err(LauncherError::io(&staged))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        // Archive content must never overwrite the installer's own files.
        let target = if is_bookkeeping(&name) {
            game_dir.join(&name)
        } else {
            root.join(&name)
        };
        let source = entry.path();
        moved += merge_move(&source, &target).map_err(LauncherError::io(&source))?;
    }

    fs::remove_dir(&staged).map_err(LauncherError::io(&staged))?;
    Ok(moved)
}

/// Move `src` to `dst`, merging directory trees.
fn merge_move(src: &Path, dst: &Path) -> io::Result<usize> {
    let src_is_dir = fs::symlink_metadata(src)?.is_dir();

    match fs::symlink_metadata(dst) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if let Some(parent) = dst.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::rename(src, dst)?;
            Ok(1)
        }
        Err(e) => Err(e),
        Ok(meta) if meta.is_dir() && src_is_dir => {
            let mut moved = 0;
            for entry in fs::read_dir(src)? {
                let entry = entry?;
                moved += merge_move(&entry.path(), &dst.join(entry.file_name()))?;
            }
            fs::remove_dir(src)?;
            Ok(moved)
        }
        Ok(meta) if !meta.is_dir() && !src_is_dir => {
            fs::rename(src, dst)?;
            Ok(1)
        }
        Ok(_) => Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} conflicts with {}", src.display(), dst.display()),
        )),
    }
}
