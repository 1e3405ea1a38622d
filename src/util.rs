//! Shared filesystem helpers.

use std::fs;
use std::path::Path;

use crate::error::ErrorKind;

/// Writes `bytes` to `path` atomically: write to a sibling temp file, then rename over the
/// destination. Avoids ever leaving `path` in a half-written state if the process is killed
/// mid-write, which matters for the fingerprint cache and ignore-pattern files that are rewritten
/// on every mutation.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ErrorKind> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let tmp_path = parent.join(format!(
        ".{}.{}.tmp",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("tmp"),
        std::process::id()
    ));
    fs::write(&tmp_path, bytes)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}
