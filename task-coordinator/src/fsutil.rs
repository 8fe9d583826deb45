//! Atomic file replacement.
//!
//! Every mutation in the coordination protocol goes through
//! [`atomic_write`]: concurrent readers never see a partial file, and a
//! crash mid-write leaves the previous version intact. There is no file
//! locking anywhere in the protocol; this is the only durability primitive.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Temp file next to the target, unique per process so overlapping
/// invocations never clobber each other's staging file.
fn staging_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    target.with_file_name(format!("{}.{}.tmp", name, std::process::id()))
}

/// Write `contents` to a staging file in the target's directory, then rename
/// over the target.
pub fn atomic_write(target: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let staging = staging_path(target);
    fs::write(&staging, contents)?;
    match fs::rename(&staging, target) {
        Ok(()) => Ok(()),
        Err(e) => {
            let _ = fs::remove_file(&staging);
            Err(e)
        }
    }
}
