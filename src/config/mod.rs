//! Per-user persisted state layout: credentials, thread-count defaults, ignore list, and
//! fingerprint cache all live under one resolved config directory.

pub mod credentials;
pub mod defaults;

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

pub struct Dirs {
    project: ProjectDirs,
}

impl Dirs {
    pub fn resolve() -> anyhow::Result<Self> {
        let project = ProjectDirs::from("", "", "gallerysync")
            .ok_or_else(|| anyhow::anyhow!("could not resolve a home directory for this user"))?;
        Ok(Self { project })
    }

    pub fn config_dir(&self) -> &Path {
        self.project.config_dir()
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.config_dir().join("credentials.json")
    }

    pub fn defaults_path(&self) -> PathBuf {
        self.config_dir().join("defaults.json")
    }

    pub fn ignore_path(&self) -> PathBuf {
        self.config_dir().join("ignore.list")
    }

    pub fn fingerprint_cache_path(&self) -> PathBuf {
        self.config_dir().join("fingerprints.bin")
    }
}
