//! Recursive local directory walk: an explicit stack-based walk rather than recursion, hidden
//! files skipped, symlinks never followed.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::ErrorKind;
use crate::local::ignore::IgnorePatternSet;

#[derive(Debug, Clone)]
pub enum LocalEntry {
    Dir(PathBuf),
    File { path: PathBuf },
    Ignored(PathBuf),
}

pub struct LocalScanner;

impl LocalScanner {
    /// Lists the immediate children of `dir`, sorted lexicographically by base name. Hidden
    /// entries (base name starting with `.`) are skipped outright; entries matching `ignore_set`
    /// are yielded as `LocalEntry::Ignored` so callers can log a "skipped" line rather than
    /// silently treating them as absent.
    pub fn scan_dir(dir: &Path, ignore_set: &IgnorePatternSet) -> Result<Vec<LocalEntry>, ErrorKind> {
        let read_dir = fs::read_dir(dir).map_err(ErrorKind::from)?;

        let mut names: Vec<(String, PathBuf)> = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(ErrorKind::from)?;
            let path = entry.path();

            let Some(base_name) = path.file_name().and_then(|n| n.to_str()) else {
                warn!(?path, "skipping entry with non-UTF8 name");
                continue;
            };
            if base_name.starts_with('.') {
                continue;
            }

            // `symlink_metadata` instead of `metadata` so we never follow symlinks.
            let meta = match entry.path().symlink_metadata() {
                Ok(m) => m,
                Err(e) => {
                    warn!(?path, error = %e, "could not stat entry, skipping");
                    continue;
                }
            };
            if meta.file_type().is_symlink() {
                continue;
            }

            names.push((base_name.to_string(), path));
        }
        names.sort_by(|a, b| a.0.cmp(&b.0));

        let mut entries = Vec::with_capacity(names.len());
        for (_, path) in names {
            if ignore_set.matches(&path) {
                entries.push(LocalEntry::Ignored(path));
                continue;
            }

            if path.is_dir() {
                entries.push(LocalEntry::Dir(path));
            } else {
                entries.push(LocalEntry::File { path });
            }
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};

    fn ignore_set() -> IgnorePatternSet {
        IgnorePatternSet::from_patterns(Vec::new()).unwrap()
    }

    #[test]
    fn hidden_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join(".hidden")).unwrap();
        File::create(dir.path().join("visible.jpg")).unwrap();

        let entries = LocalScanner::scan_dir(dir.path(), &ignore_set()).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(matches!(&entries[0], LocalEntry::File { path, .. } if path.ends_with("visible.jpg")));
    }

    #[test]
    fn entries_are_sorted_lexicographically() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("b.jpg")).unwrap();
        File::create(dir.path().join("a.jpg")).unwrap();
        File::create(dir.path().join("c.jpg")).unwrap();

        let entries = LocalScanner::scan_dir(dir.path(), &ignore_set()).unwrap();
        let names: Vec<_> = entries
            .iter()
            .map(|e| match e {
                LocalEntry::File { path, .. } => path.file_name().unwrap().to_str().unwrap().to_string(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.jpg", "c.jpg"]);
    }

    #[test]
    fn subdirectories_are_yielded_as_dir_entries() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("2015")).unwrap();

        let entries = LocalScanner::scan_dir(dir.path(), &ignore_set()).unwrap();
        assert!(matches!(&entries[0], LocalEntry::Dir(p) if p.ends_with("2015")));
    }

    #[test]
    fn ignored_paths_are_reported_not_silently_dropped() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("thumbs.db")).unwrap();
        let ignore = IgnorePatternSet::from_patterns(vec![dir.path().join("thumbs.db").display().to_string()]).unwrap();

        let entries = LocalScanner::scan_dir(dir.path(), &ignore).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(matches!(&entries[0], LocalEntry::Ignored(_)));
    }
}
