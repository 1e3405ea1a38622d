//! The core reconciliation state machine. A discovery/fan-out stage walks the local tree and
//! feeds bounded worker pools (folders, files, uploads) that settle into a final report. Each
//! file is independently classified as unchanged, modified, moved, or new before any bytes move.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use moka::sync::Cache;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::cache::FingerprintCache;
use crate::error::{ErrorKind, TaskFailure};
use crate::local::{IgnorePatternSet, LocalEntry, LocalScanner};
use crate::metadata::MetadataProbe;
use crate::paths::PathResolver;
use crate::remote::{NodeType, RemoteClient, RemoteImage, RemoteNode};
use crate::sync::report::SyncReport;
use crate::tasks::TaskPool;

pub struct EngineConfig {
    pub folder_threads: usize,
    pub file_threads: usize,
    pub upload_threads: usize,
    pub delete_enabled: bool,
}

struct Pools {
    folder: TaskPool,
    file: TaskPool,
    upload: TaskPool,
}

pub struct SyncEngine {
    remote: Arc<dyn RemoteClient>,
    resolver: Arc<PathResolver>,
    ignore_set: Arc<IgnorePatternSet>,
    fingerprint_cache: Arc<FingerprintCache>,
    metadata_probe: Arc<dyn MetadataProbe>,
    pools: Pools,
    creation_locks: AsyncMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    album_cache: Cache<String, Arc<Vec<RemoteImage>>>,
    touched: AsyncMutex<HashMap<String, HashSet<String>>>,
    global_md5_index: AsyncMutex<Option<Arc<HashMap<String, String>>>>,
    report: SyncReport,
    delete_enabled: bool,
}

impl SyncEngine {
    pub fn new(
        remote: Arc<dyn RemoteClient>,
        resolver: Arc<PathResolver>,
        ignore_set: Arc<IgnorePatternSet>,
        fingerprint_cache: Arc<FingerprintCache>,
        metadata_probe: Arc<dyn MetadataProbe>,
        config: EngineConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            remote,
            resolver,
            ignore_set,
            fingerprint_cache,
            metadata_probe,
            pools: Pools {
                folder: TaskPool::new("folder", config.folder_threads),
                file: TaskPool::new("file", config.file_threads),
                upload: TaskPool::new("upload", config.upload_threads),
            },
            creation_locks: AsyncMutex::new(HashMap::new()),
            album_cache: Cache::new(10_000),
            touched: AsyncMutex::new(HashMap::new()),
            global_md5_index: AsyncMutex::new(None),
            report: SyncReport::new(),
            delete_enabled: config.delete_enabled,
        })
    }

    /// Runs a full sync for each `(local_source, remote_destination_path)` pair, then performs
    /// the gated deletion pass once every folder/file task has settled.
    pub async fn run(self: &Arc<Self>, pairs: Vec<(PathBuf, String)>) -> SyncReport {
        let started_at = chrono::Utc::now();
        let handles: Vec<_> = pairs
            .into_iter()
            .map(|(local_src, dest_path)| {
                let engine = Arc::clone(self);
                tokio::spawn(async move {
                    if let Err(failure) = engine.sync_pair(local_src, dest_path).await {
                        engine.report.record_failure(failure);
                    }
                })
            })
            .collect();
        futures::future::join_all(handles).await;

        if let Err(e) = self.delete_orphans().await {
            warn!(error = %e, "deletion pass failed");
        }

        let report = SyncReport::from_failures(self.report.failures());
        info!(
            started_at = %started_at.to_rfc3339(),
            elapsed_ms = (chrono::Utc::now() - started_at).num_milliseconds(),
            failures = report.failures().len(),
            "sync run complete"
        );
        report
    }

    async fn sync_pair(self: &Arc<Self>, local_src: PathBuf, dest_path: String) -> Result<(), TaskFailure> {
        let src_str = local_src.to_string_lossy();
        let dest_path = if src_str.ends_with('/') || src_str.ends_with(std::path::MAIN_SEPARATOR) {
            dest_path
        } else {
            let basename = local_src
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or_default();
            format!("{}/{}", dest_path.trim_end_matches('/'), basename)
        };

        let (parent, remaining) = self
            .resolver
            .resolve_or_parent(&dest_path)
            .await
            .map_err(|e| TaskFailure::new(dest_path.clone(), e))?;

        let mut current = parent;
        for (i, segment) in remaining.iter().enumerate() {
            let is_last = i == remaining.len() - 1;
            current = if is_last {
                self.get_or_create_typed(&current.uri, segment, &local_src)
                    .await
                    .map_err(|e| TaskFailure::new(dest_path.clone(), e))?
            } else {
                self.get_or_create_folder(&current.uri, segment)
                    .await
                    .map_err(|e| TaskFailure::new(dest_path.clone(), e))?
            };
        }

        folder_task(Arc::clone(self), local_src, current).await
    }

    /// Peeks `local_dir`'s own children to decide whether the node about to be created should be
    /// a Folder (contains subdirectories) or an Album (contains only files). Typing is decided
    /// lazily, at creation time, rather than requiring it up front.
    async fn get_or_create_typed(
        &self,
        parent_uri: &str,
        name: &str,
        local_dir: &Path,
    ) -> Result<RemoteNode, ErrorKind> {
        let peek = LocalScanner::scan_dir(local_dir, &self.ignore_set)?;
        let has_subdirs = peek.iter().any(|e| matches!(e, LocalEntry::Dir(_)));
        let desired = if has_subdirs { NodeType::Folder } else { NodeType::Album };
        self.get_or_create_child(parent_uri, name, desired).await
    }

    async fn get_or_create_folder(&self, parent_uri: &str, name: &str) -> Result<RemoteNode, ErrorKind> {
        self.get_or_create_child(parent_uri, name, NodeType::Folder).await
    }

    /// Serializes creation of `(parent_uri, name)` behind a keyed lock so two concurrent
    /// discoveries of the same missing child issue exactly one `create_folder`/`create_album`
    /// call.
    async fn get_or_create_child(
        &self,
        parent_uri: &str,
        name: &str,
        desired: NodeType,
    ) -> Result<RemoteNode, ErrorKind> {
        let lock = self.creation_lock(parent_uri, name).await;
        let _guard = lock.lock().await;

        let children = self.remote.list_children(parent_uri).await?;
        if let Some(existing) = children.into_iter().find(|c| c.name == name) {
            if existing.node_type != desired {
                return Err(ErrorKind::TypeMismatch {
                    path: format!("{parent_uri}/{name}"),
                    expected: desired.as_str(),
                    found: existing.node_type.as_str(),
                });
            }
            return Ok(existing);
        }

        match desired {
            NodeType::Folder => self.remote.create_folder(parent_uri, name).await,
            _ => self.remote.create_album(parent_uri, name).await,
        }
    }

    async fn creation_lock(&self, parent_uri: &str, name: &str) -> Arc<AsyncMutex<()>> {
        let key = format!("{parent_uri}\u{0}{name}");
        let mut locks = self.creation_locks.lock().await;
        Arc::clone(locks.entry(key).or_insert_with(|| Arc::new(AsyncMutex::new(()))))
    }

    /// Snapshot-per-album image listing, cached for the lifetime of the run so every file task
    /// against the same album reconciles against a consistent view of its remote contents.
    async fn album_images(&self, album_uri: &str) -> Result<Arc<Vec<RemoteImage>>, ErrorKind> {
        if let Some(cached) = self.album_cache.get(&album_uri.to_string()) {
            return Ok(cached);
        }
        let images = self.remote.list_album_images(album_uri).await?;
        let arc = Arc::new(images);
        self.album_cache.insert(album_uri.to_string(), Arc::clone(&arc));
        Ok(arc)
    }

    /// Builds (or returns the already-built) md5 -> image_uri index across every album reachable
    /// from the user's root. Move detection falls back to this when the fingerprint cache has no
    /// entry for a file's content, so a cold or cleared cache still finds a cross-album move
    /// instead of re-uploading bytes the remote already has. Built once per run and reused for
    /// every subsequent miss.
    async fn global_md5_index(&self) -> Result<Arc<HashMap<String, String>>, ErrorKind> {
        {
            let built = self.global_md5_index.lock().await;
            if let Some(index) = built.as_ref() {
                return Ok(Arc::clone(index));
            }
        }

        let root = self.resolver.root().await?;
        let mut index = HashMap::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            match node.node_type {
                NodeType::Album | NodeType::SystemAlbum => {
                    let images = self.album_images(&node.uri).await?;
                    for image in images.iter() {
                        index.entry(image.archived_md5.clone()).or_insert_with(|| image.image_uri.clone());
                    }
                }
                NodeType::Folder | NodeType::Page => {
                    stack.extend(self.remote.list_children(&node.uri).await?);
                }
            }
        }

        let index = Arc::new(index);
        let mut built = self.global_md5_index.lock().await;
        let index = Arc::clone(built.get_or_insert(index));
        Ok(index)
    }

    async fn local_md5(&self, path: &Path) -> Result<String, ErrorKind> {
        let bytes = tokio::fs::read(path).await.map_err(ErrorKind::from)?;
        let digest = md5::compute(&bytes);
        Ok(format!("{digest:x}"))
    }

    async fn mark_touched(&self, album_uri: &str, file_name: &str) {
        let mut touched = self.touched.lock().await;
        touched
            .entry(album_uri.to_string())
            .or_default()
            .insert(file_name.to_string());
    }

    /// For every album touched this run, any remote image with no corresponding local file is an
    /// orphan. Deletion only happens when `--delete` was passed; otherwise orphans are only
    /// reported.
    async fn delete_orphans(&self) -> Result<(), ErrorKind> {
        let touched = self.touched.lock().await.clone();
        for (album_uri, names) in touched {
            let images = self.remote.list_album_images(&album_uri).await?;
            for image in images {
                if names.contains(&image.file_name) {
                    continue;
                }
                if self.delete_enabled {
                    self.remote.delete_node(&image.image_uri).await?;
                    info!(album = %album_uri, file = %image.file_name, "deleted orphaned remote image");
                } else {
                    info!(
                        album = %album_uri,
                        file = %image.file_name,
                        "orphaned remote image with no local counterpart (pass --delete to remove)"
                    );
                }
            }
        }
        Ok(())
    }
}

/// Reconciles one `(local_dir, remote_node)` pair, recursing into subdirectories and fanning out
/// file tasks.
fn folder_task(
    engine: Arc<SyncEngine>,
    local_dir: PathBuf,
    remote: RemoteNode,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), TaskFailure>> + Send>> {
    Box::pin(async move {
        let local_path_str = local_dir.to_string_lossy().to_string();

        let entries = LocalScanner::scan_dir(&local_dir, &engine.ignore_set)
            .map_err(|e| TaskFailure::new(local_path_str.clone(), e))?;

        let mut subdirs = Vec::new();
        let mut files = Vec::new();
        for entry in entries {
            match entry {
                LocalEntry::Dir(p) => subdirs.push(p),
                LocalEntry::File { path, .. } => files.push(path),
                LocalEntry::Ignored(p) => debug!(path = %p.display(), "ignored, skipping"),
            }
        }

        if !subdirs.is_empty() && !files.is_empty() {
            for file in &files {
                engine.report.record_failure(TaskFailure::new(
                    file.to_string_lossy().to_string(),
                    ErrorKind::MixedContent(local_path_str.clone()),
                ));
            }
        } else if !files.is_empty() {
            if remote.node_type != NodeType::Album {
                return Err(TaskFailure::new(
                    local_path_str,
                    ErrorKind::TypeMismatch {
                        path: remote.name.clone(),
                        expected: "Album",
                        found: remote.node_type.as_str(),
                    },
                ));
            }

            let handles: Vec<_> = files
                .into_iter()
                .map(|file| {
                    let engine = Arc::clone(&engine);
                    let album_uri = remote.uri.clone();
                    engine.pools.file.clone().submit(move || {
                        let engine = Arc::clone(&engine);
                        async move { file_task(engine, file, album_uri).await }
                    })
                })
                .collect();
            for result in futures::future::join_all(handles).await {
                if let Ok(Err(failure)) = result {
                    engine.report.record_failure(failure);
                }
            }
            return Ok(());
        }

        let handles: Vec<_> = subdirs
            .into_iter()
            .map(|subdir| {
                let name = subdir
                    .file_name()
                    .and_then(|s| s.to_str())
                    .unwrap_or_default()
                    .to_string();
                let engine = Arc::clone(&engine);
                let parent_uri = remote.uri.clone();

                engine.pools.folder.clone().submit(move || {
                    let engine = Arc::clone(&engine);
                    async move {
                        let child = engine
                            .get_or_create_typed(&parent_uri, &name, &subdir)
                            .await
                            .map_err(|e| TaskFailure::new(subdir.to_string_lossy().to_string(), e))?;
                        folder_task(engine, subdir, child).await
                    }
                })
            })
            .collect();

        for result in futures::future::join_all(handles).await {
            if let Ok(Err(failure)) = result {
                engine.report.record_failure(failure);
            }
        }

        Ok(())
    })
}

/// Reconciles (and, if needed, uploads/replaces/moves) a single local file against the album it
/// belongs to.
async fn file_task(
    engine: Arc<SyncEngine>,
    local_path: PathBuf,
    album_uri: String,
) -> Result<(), TaskFailure> {
    let path_str = local_path.to_string_lossy().to_string();
    let file_name = local_path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();

    engine.mark_touched(&album_uri, &file_name).await;

    let local_size = tokio::fs::metadata(&local_path)
        .await
        .map_err(|e| TaskFailure::new(path_str.clone(), ErrorKind::from(e)))?
        .len();

    let images = engine
        .album_images(&album_uri)
        .await
        .map_err(|e| TaskFailure::new(path_str.clone(), e))?;

    if let Some(existing) = images.iter().find(|i| i.file_name == file_name) {
        return reconcile_named_match(&engine, &local_path, &path_str, local_size, existing).await;
    }

    let local_md5 = engine
        .local_md5(&local_path)
        .await
        .map_err(|e| TaskFailure::new(path_str.clone(), e))?;

    if let Some(same_content) = images.iter().find(|i| i.archived_md5 == local_md5) {
        warn!(
            path = %path_str,
            existing_name = %same_content.file_name,
            "local file renamed within the same album; no in-place rename exists remotely, uploading under the new name"
        );
    } else {
        let found_uri = match engine.fingerprint_cache.find_by_md5(&local_md5).await {
            Some(uri) => Some(uri),
            None => {
                let index = engine
                    .global_md5_index()
                    .await
                    .map_err(|e| TaskFailure::new(path_str.clone(), e))?;
                index.get(&local_md5).cloned()
            }
        };

        if let Some(found_uri) = found_uri {
            if found_uri != album_uri {
                match engine.remote.change_image_album(&found_uri, &album_uri).await {
                    Ok(()) => return Ok(()),
                    Err(ErrorKind::NotFound(_)) => {
                        debug!(image_uri = %found_uri, "move target vanished, falling back to upload");
                    }
                    Err(e) => return Err(TaskFailure::new(path_str, e)),
                }
            }
        }
    }

    upload_new(&engine, &local_path, &path_str, &album_uri, &file_name, &local_md5).await
}

async fn reconcile_named_match(
    engine: &Arc<SyncEngine>,
    local_path: &Path,
    path_str: &str,
    local_size: u64,
    existing: &RemoteImage,
) -> Result<(), TaskFailure> {
    let cached_matches = existing.archived_size == local_size
        && engine.fingerprint_cache.get(&existing.image_uri).await.as_deref() == Some(existing.archived_md5.as_str());

    let local_md5 = engine
        .local_md5(local_path)
        .await
        .map_err(|e| TaskFailure::new(path_str.to_string(), e))?;

    if cached_matches && local_md5 == existing.archived_md5 {
        return Ok(()); // identical content, nothing to do
    }

    if local_md5 == existing.archived_md5 {
        engine
            .fingerprint_cache
            .put(existing.image_uri.clone(), local_md5)
            .await
            .map_err(|e| TaskFailure::new(path_str.to_string(), e))?;
        return Ok(());
    }

    let bytes = tokio::fs::read(local_path)
        .await
        .map_err(|e| TaskFailure::new(path_str.to_string(), ErrorKind::from(e)))?;
    let image_uri = existing.image_uri.clone();
    let engine = Arc::clone(engine);

    let handle = engine.pools.upload.clone().submit(move || {
        let engine = Arc::clone(&engine);
        let image_uri = image_uri.clone();
        async move {
            engine
                .remote
                .replace_image(&image_uri, bytes, &local_md5)
                .await
                .map_err(|e| TaskFailure::new(image_uri.clone(), e))?;
            engine
                .fingerprint_cache
                .invalidate(&image_uri)
                .await
                .map_err(|e| TaskFailure::new(image_uri.clone(), e))?;
            engine
                .fingerprint_cache
                .put(image_uri.clone(), local_md5)
                .await
                .map_err(|e| TaskFailure::new(image_uri.clone(), e))
        }
    });

    handle
        .await
        .unwrap_or_else(|_| Err(TaskFailure::new(path_str.to_string(), ErrorKind::Canceled)))
}

async fn upload_new(
    engine: &Arc<SyncEngine>,
    local_path: &Path,
    path_str: &str,
    album_uri: &str,
    file_name: &str,
    local_md5: &str,
) -> Result<(), TaskFailure> {
    let bytes = tokio::fs::read(local_path)
        .await
        .map_err(|e| TaskFailure::new(path_str.to_string(), ErrorKind::from(e)))?;
    let mime_type = engine
        .metadata_probe
        .mime_type_of(local_path)
        .unwrap_or("application/octet-stream");

    let engine = Arc::clone(engine);
    let album_uri = album_uri.to_string();
    let file_name = file_name.to_string();
    let local_md5 = local_md5.to_string();

    let handle = engine.pools.upload.clone().submit(move || {
        let engine = Arc::clone(&engine);
        let album_uri = album_uri.clone();
        let file_name = file_name.clone();
        let local_md5 = local_md5.clone();
        async move {
            let image = engine
                .remote
                .upload_image(&album_uri, &file_name, bytes, mime_type, &local_md5)
                .await
                .map_err(|e| TaskFailure::new(file_name.clone(), e))?;
            engine
                .fingerprint_cache
                .put(image.image_uri, local_md5)
                .await
                .map_err(|e| TaskFailure::new(file_name.clone(), e))
        }
    });

    handle
        .await
        .unwrap_or_else(|_| Err(TaskFailure::new(path_str.to_string(), ErrorKind::Canceled)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetadataProbe;
    use crate::remote::fake::FakeRemoteClient;
    use std::fs;

    struct NoopProbe;
    impl MetadataProbe for NoopProbe {
        fn mime_type_of(&self, _path: &Path) -> Option<&'static str> {
            Some("application/octet-stream")
        }
    }

    fn make_engine(remote: Arc<FakeRemoteClient>, cache_path: PathBuf) -> (Arc<SyncEngine>, Arc<PathResolver>) {
        let resolver = Arc::new(PathResolver::new(remote.clone(), "alice"));
        let ignore_set = Arc::new(IgnorePatternSet::from_patterns(Vec::new()).unwrap());
        let fingerprint_cache = Arc::new(FingerprintCache::load(cache_path));
        let metadata_probe = Arc::new(NoopProbe);
        let engine = SyncEngine::new(
            remote,
            Arc::clone(&resolver),
            ignore_set,
            fingerprint_cache,
            metadata_probe,
            EngineConfig {
                folder_threads: 2,
                file_threads: 2,
                upload_threads: 2,
                delete_enabled: false,
            },
        );
        (engine, resolver)
    }

    #[tokio::test]
    async fn initial_sync_creates_album_and_uploads_files() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("vacation");
        fs::create_dir(&src).unwrap();
        fs::write(src.join("a.jpg"), b"hello").unwrap();
        fs::write(src.join("b.jpg"), b"world").unwrap();

        let remote = Arc::new(FakeRemoteClient::new("alice"));
        let (engine, resolver) = make_engine(remote.clone(), dir.path().join("fp.bin"));

        let report = engine.run(vec![(src, "2015".to_string())]).await;
        assert!(report.is_success(), "{:?}", report.failures());
        assert_eq!(remote.upload_count(), 2);

        let album = resolver.resolve("2015/vacation").await.unwrap();
        assert_eq!(album.node_type, NodeType::Album);
        assert_eq!(remote.list_album_images(&album.uri).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn resync_with_unchanged_files_uploads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("vacation");
        fs::create_dir(&src).unwrap();
        fs::write(src.join("a.jpg"), b"hello").unwrap();

        let remote = Arc::new(FakeRemoteClient::new("alice"));
        let (engine, _resolver) = make_engine(remote.clone(), dir.path().join("fp.bin"));
        engine.run(vec![(src.clone(), "2015".to_string())]).await;
        assert_eq!(remote.upload_count(), 1);

        let (engine2, _resolver2) = make_engine(remote.clone(), dir.path().join("fp.bin"));
        let report = engine2.run(vec![(src, "2015".to_string())]).await;
        assert!(report.is_success());
        assert_eq!(remote.upload_count(), 1, "unchanged file must not be re-uploaded");
    }

    #[tokio::test]
    async fn modified_file_replaces_existing_image() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("vacation");
        fs::create_dir(&src).unwrap();
        let file = src.join("a.jpg");
        fs::write(&file, b"hello").unwrap();

        let remote = Arc::new(FakeRemoteClient::new("alice"));
        let (engine, resolver) = make_engine(remote.clone(), dir.path().join("fp.bin"));
        engine.run(vec![(src.clone(), "2015".to_string())]).await;

        fs::write(&file, b"hello but different").unwrap();
        let (engine2, _r) = make_engine(remote.clone(), dir.path().join("fp2.bin"));
        let report = engine2.run(vec![(src, "2015".to_string())]).await;
        assert!(report.is_success(), "{:?}", report.failures());

        let album = resolver.resolve("2015/vacation").await.unwrap();
        let images = remote.list_album_images(&album.uri).await.unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].archived_size, "hello but different".len() as u64);
    }

    #[tokio::test]
    async fn cross_album_move_reuses_existing_image() {
        let dir = tempfile::tempdir().unwrap();
        let src_a = dir.path().join("a");
        let src_b = dir.path().join("b");
        fs::create_dir(&src_a).unwrap();
        fs::create_dir(&src_b).unwrap();
        fs::write(src_a.join("pic.jpg"), b"same bytes").unwrap();

        let remote = Arc::new(FakeRemoteClient::new("alice"));
        let (engine, resolver) = make_engine(remote.clone(), dir.path().join("fp.bin"));
        engine.run(vec![(src_a.clone(), "".to_string())]).await;
        assert_eq!(remote.upload_count(), 1);

        // Move the file on disk into a new album directory; re-sync both roots.
        fs::rename(src_a.join("pic.jpg"), src_b.join("pic.jpg")).unwrap();
        fs::remove_dir(&src_a).unwrap();

        let (engine2, _r) = make_engine(remote.clone(), dir.path().join("fp.bin"));
        let report = engine2.run(vec![(src_b, "".to_string())]).await;
        assert!(report.is_success(), "{:?}", report.failures());
        assert_eq!(remote.upload_count(), 1, "same content should be moved, not re-uploaded");

        let album_b = resolver.resolve("b").await.unwrap();
        assert_eq!(remote.list_album_images(&album_b.uri).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cross_album_move_is_detected_even_with_a_cold_fingerprint_cache() {
        let dir = tempfile::tempdir().unwrap();
        let src_a = dir.path().join("a");
        let src_b = dir.path().join("b");
        fs::create_dir(&src_a).unwrap();
        fs::create_dir(&src_b).unwrap();
        fs::write(src_a.join("pic.jpg"), b"same bytes").unwrap();

        let remote = Arc::new(FakeRemoteClient::new("alice"));
        let (engine, resolver) = make_engine(remote.clone(), dir.path().join("fp.bin"));
        engine.run(vec![(src_a.clone(), "".to_string())]).await;
        assert_eq!(remote.upload_count(), 1);

        fs::rename(src_a.join("pic.jpg"), src_b.join("pic.jpg")).unwrap();
        fs::remove_dir(&src_a).unwrap();

        // A fresh fingerprint cache file: the fingerprint cache has no entry for this content,
        // so the move must be found by scanning the remote albums instead.
        let (engine2, _r) = make_engine(remote.clone(), dir.path().join("fp-cold.bin"));
        let report = engine2.run(vec![(src_b, "".to_string())]).await;
        assert!(report.is_success(), "{:?}", report.failures());
        assert_eq!(
            remote.upload_count(),
            1,
            "same content should be moved via the remote album scan, not re-uploaded"
        );

        let album_b = resolver.resolve("b").await.unwrap();
        assert_eq!(remote.list_album_images(&album_b.uri).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn mixed_directory_reports_failures_without_aborting_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("mixed");
        fs::create_dir(&src).unwrap();
        fs::write(src.join("loose.jpg"), b"oops").unwrap();
        fs::create_dir(src.join("subdir")).unwrap();
        fs::write(src.join("subdir").join("ok.jpg"), b"fine").unwrap();

        let remote = Arc::new(FakeRemoteClient::new("alice"));
        let (engine, resolver) = make_engine(remote.clone(), dir.path().join("fp.bin"));
        let report = engine.run(vec![(src, "root".to_string())]).await;

        assert!(!report.is_success());
        assert_eq!(report.failures().len(), 1);
        assert!(matches!(report.failures()[0].kind, ErrorKind::MixedContent(_)));

        // The subdirectory must still have been synced despite the sibling file failure.
        let album = resolver.resolve("root/mixed/subdir").await.unwrap();
        assert_eq!(remote.list_album_images(&album.uri).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn name_collision_with_wrong_type_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("vacation");
        fs::create_dir(&src).unwrap();
        fs::write(src.join("a.jpg"), b"hello").unwrap();

        let remote = Arc::new(FakeRemoteClient::new("alice"));
        let root = remote.get_root("alice").await.unwrap();
        remote.create_folder(&root.uri, "vacation").await.unwrap();

        let (engine, _resolver) = make_engine(remote.clone(), dir.path().join("fp.bin"));
        let report = engine.run(vec![(src, "".to_string())]).await;

        assert!(!report.is_success());
        assert!(matches!(report.failures()[0].kind, ErrorKind::TypeMismatch { .. }));
    }
}
