use std::{io, path::Path};

use anyhow::{Context, Result};
use fs_err as fs;
use tracing::{debug, warn};

/// File name of a cache directory tag.
pub const CACHEDIR_TAG: &str = "CACHEDIR.TAG";

const CACHEDIR_TAG_HEADER: &str = "Signature: 8a477f597d28d172789f06886806bc55";

fn cachedir_tag_content() -> String {
    format!(
        "{CACHEDIR_TAG_HEADER}\n\
         # This file is a cache directory tag created by tx.\n\
         # For information about cache directory tags, see:\n\
         #\thttps://bford.info/cachedir/spec.html\n"
    )
}

/// Leave `path` as an empty directory, keeping only the child named
/// `except_name`.
///
/// Sub-directories are removed best effort; failing to remove a file is an
/// error. A plain file or a symlink at `path` is replaced by a directory; the
/// link target is left untouched.
pub fn ensure_empty_dir(path: &Path, except_name: Option<&str>) -> Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(path)?;
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };
    if !metadata.is_dir() {
        fs::remove_file(path)?;
        fs::create_dir(path)?;
        return Ok(());
    }
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        if except_name.is_some_and(|name| entry.file_name() == name) {
            continue;
        }
        let child = entry.path();
        let is_dir = entry.file_type().map(|ty| ty.is_dir()).unwrap_or(false);
        if is_dir {
            if let Err(err) = fs::remove_dir_all(&child) {
                warn!(%err, path = %child.display(), "failed to remove directory");
            }
            continue;
        }
        match fs::remove_file(&child) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %child.display(), "entry vanished before removal");
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

/// Write a `CACHEDIR.TAG` into `path` unless one is already there.
pub fn ensure_cachedir_tag(path: &Path) -> Result<()> {
    let tag = path.join(CACHEDIR_TAG);
    if tag.exists() {
        return Ok(());
    }
    fs::write(&tag, cachedir_tag_content())
        .with_context(|| format!("writing cache directory tag in {}", path.display()))
}
