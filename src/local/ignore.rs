//! Persisted glob ignore list. Matching uses `globset`; the pattern set is a plain text file
//! rewritten atomically on every mutation.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::ErrorKind;
use crate::util::write_atomic;

struct Inner {
    patterns: BTreeSet<String>,
    matcher: GlobSet,
}

/// Shared via `Arc` between the engine (read-only matching) and the `ignore`/`include` verbs
/// (mutation), so state lives behind an internal mutex rather than requiring `&mut self`.
pub struct IgnorePatternSet {
    inner: Mutex<Inner>,
    backing_file: Option<PathBuf>,
}

impl IgnorePatternSet {
    pub fn load(path: &Path) -> Result<Self, ErrorKind> {
        if !path.exists() {
            let mut set = Self::from_patterns(Vec::new())?;
            set.backing_file = Some(path.to_path_buf());
            return Ok(set);
        }

        let contents = fs::read_to_string(path)?;
        let patterns = contents.lines().map(str::to_string).collect();
        let mut set = Self::from_patterns(patterns)?;
        set.backing_file = Some(path.to_path_buf());
        Ok(set)
    }

    pub fn from_patterns(patterns: Vec<String>) -> Result<Self, ErrorKind> {
        let patterns: BTreeSet<String> = patterns.into_iter().collect();
        let matcher = Self::build_matcher(&patterns)?;
        Ok(Self {
            inner: Mutex::new(Inner { patterns, matcher }),
            backing_file: None,
        })
    }

    fn build_matcher(patterns: &BTreeSet<String>) -> Result<GlobSet, ErrorKind> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern)
                .map_err(|e| ErrorKind::LocalIO(format!("invalid ignore pattern {pattern:?}: {e}")))?;
            builder.add(glob);
        }
        builder
            .build()
            .map_err(|e| ErrorKind::LocalIO(format!("could not build ignore matcher: {e}")))
    }

    pub fn matches(&self, path: &Path) -> bool {
        self.inner.lock().expect("ignore set mutex poisoned").matcher.is_match(path)
    }

    pub fn add(&self, pattern: impl Into<String>) -> Result<(), ErrorKind> {
        let mut inner = self.inner.lock().expect("ignore set mutex poisoned");
        inner.patterns.insert(pattern.into());
        inner.matcher = Self::build_matcher(&inner.patterns)?;
        self.persist(&inner.patterns)
    }

    pub fn remove(&self, pattern: &str) -> Result<(), ErrorKind> {
        let mut inner = self.inner.lock().expect("ignore set mutex poisoned");
        inner.patterns.remove(pattern);
        inner.matcher = Self::build_matcher(&inner.patterns)?;
        self.persist(&inner.patterns)
    }

    pub fn patterns(&self) -> Vec<String> {
        self.inner.lock().expect("ignore set mutex poisoned").patterns.iter().cloned().collect()
    }

    fn persist(&self, patterns: &BTreeSet<String>) -> Result<(), ErrorKind> {
        let Some(path) = &self.backing_file else {
            return Ok(());
        };
        let contents = patterns.iter().cloned().collect::<Vec<_>>().join("\n");
        write_atomic(path, contents.as_bytes())
    }
}
