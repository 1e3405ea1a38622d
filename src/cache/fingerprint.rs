//! Persistent `image_uri -> md5_hex` store, encoded as `postcard`. A corrupt or unreadable file
//! is logged and treated as empty rather than failing the whole run. Every mutation is flushed
//! immediately via `write_atomic` rather than batched, since the cache is small and writes are rare
//! compared to the network calls around them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::error;

use crate::error::ErrorKind;
use crate::util::write_atomic;

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheData {
    entries: HashMap<String, String>,
}

pub struct FingerprintCache {
    path: PathBuf,
    data: Mutex<CacheData>,
}

impl FingerprintCache {
    pub fn load(path: PathBuf) -> Self {
        let data = if path.exists() {
            match std::fs::read(&path) {
                Ok(bytes) => postcard::from_bytes(&bytes).unwrap_or_else(|e| {
                    error!(error = %e, "corrupt fingerprint cache, starting empty");
                    CacheData::default()
                }),
                Err(e) => {
                    error!(error = %e, "could not read fingerprint cache, starting empty");
                    CacheData::default()
                }
            }
        } else {
            CacheData::default()
        };

        Self {
            path,
            data: Mutex::new(data),
        }
    }

    pub async fn get(&self, image_uri: &str) -> Option<String> {
        self.data.lock().await.entries.get(image_uri).cloned()
    }

    pub async fn put(&self, image_uri: impl Into<String>, md5_hex: impl Into<String>) -> Result<(), ErrorKind> {
        let mut data = self.data.lock().await;
        data.entries.insert(image_uri.into(), md5_hex.into());
        self.flush(&data)
    }

    pub async fn invalidate(&self, image_uri: &str) -> Result<(), ErrorKind> {
        let mut data = self.data.lock().await;
        data.entries.remove(image_uri);
        self.flush(&data)
    }

    /// Finds the first cached entry with a given md5 — used by move detection to check whether
    /// a local file's content is already known under a different remote name/album, without
    /// probing the remote again.
    pub async fn find_by_md5(&self, md5_hex: &str) -> Option<String> {
        let data = self.data.lock().await;
        data.entries
            .iter()
            .find(|(_, v)| v.as_str() == md5_hex)
            .map(|(k, _)| k.clone())
    }

    fn flush(&self, data: &CacheData) -> Result<(), ErrorKind> {
        let bytes = postcard::to_stdvec(data)
            .map_err(|e| ErrorKind::LocalIO(format!("could not serialize fingerprint cache: {e}")))?;
        write_atomic(&self.path, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FingerprintCache::load(dir.path().join("fp.bin"));
        cache.put("uri-1", "abc123").await.unwrap();
        assert_eq!(cache.get("uri-1").await, Some("abc123".to_string()));
    }

    #[tokio::test]
    async fn invalidate_removes_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FingerprintCache::load(dir.path().join("fp.bin"));
        cache.put("uri-1", "abc123").await.unwrap();
        cache.invalidate("uri-1").await.unwrap();
        assert_eq!(cache.get("uri-1").await, None);
    }

    #[tokio::test]
    async fn persists_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fp.bin");
        {
            let cache = FingerprintCache::load(path.clone());
            cache.put("uri-1", "abc123").await.unwrap();
        }
        let reloaded = FingerprintCache::load(path);
        assert_eq!(reloaded.get("uri-1").await, Some("abc123".to_string()));
    }

    #[tokio::test]
    async fn find_by_md5_locates_existing_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FingerprintCache::load(dir.path().join("fp.bin"));
        cache.put("uri-1", "abc123").await.unwrap();
        cache.put("uri-2", "def456").await.unwrap();
        assert_eq!(cache.find_by_md5("def456").await, Some("uri-2".to_string()));
        assert_eq!(cache.find_by_md5("missing").await, None);
    }
}
