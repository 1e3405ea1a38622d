//! Persisted thread-count defaults for `sync --set_defaults`. Each field has its own
//! `#[serde(default = ...)]` plus a `Default` impl, so an old or partially-written file still
//! loads with sane values for whatever fields are missing.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ErrorKind;
use crate::util::write_atomic;

fn default_folder_threads() -> usize {
    4
}
fn default_file_threads() -> usize {
    8
}
fn default_upload_threads() -> usize {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Defaults {
    #[serde(default = "default_folder_threads")]
    pub folder_threads: usize,
    #[serde(default = "default_file_threads")]
    pub file_threads: usize,
    #[serde(default = "default_upload_threads")]
    pub upload_threads: usize,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            folder_threads: default_folder_threads(),
            file_threads: default_file_threads(),
            upload_threads: default_upload_threads(),
        }
    }
}

impl Defaults {
    pub fn load(path: &Path) -> Defaults {
        if !path.exists() {
            return Defaults::default();
        }
        match std::fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(error = %e, "could not parse defaults file, using built-in defaults");
                Defaults::default()
            }),
            Err(e) => {
                warn!(error = %e, "could not read defaults file, using built-in defaults");
                Defaults::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ErrorKind> {
        let bytes = serde_json::to_vec_pretty(self)
            .map_err(|e| ErrorKind::LocalIO(format!("could not serialize defaults: {e}")))?;
        write_atomic(path, &bytes)
    }
}
