//! Routes a parsed [`Command`] to the matching component call. Kept thin: all engine logic lives
//! in [`crate::sync::engine`]; this module only wires CLI verbs to it.

use std::io::{self, BufRead, Write as _};
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::cache::FingerprintCache;
use crate::cli::{Command, SyncArgs};
use crate::config::credentials::Credentials;
use crate::config::defaults::Defaults;
use crate::config::Dirs;
use crate::error::ErrorKind;
use crate::local::IgnorePatternSet;
use crate::metadata::MetadataProbe;
use crate::paths::PathResolver;
use crate::remote::{NodeType, RemoteClient};
use crate::sync::{EngineConfig, SyncEngine};

pub struct Dispatcher {
    remote: Arc<dyn RemoteClient>,
    resolver: Arc<PathResolver>,
    ignore_set: Arc<IgnorePatternSet>,
    fingerprint_cache: Arc<FingerprintCache>,
    metadata_probe: Arc<dyn MetadataProbe>,
    dirs: Dirs,
    defaults: Defaults,
}

impl Dispatcher {
    pub fn new(
        remote: Arc<dyn RemoteClient>,
        resolver: Arc<PathResolver>,
        ignore_set: Arc<IgnorePatternSet>,
        fingerprint_cache: Arc<FingerprintCache>,
        metadata_probe: Arc<dyn MetadataProbe>,
        dirs: Dirs,
        defaults: Defaults,
    ) -> Self {
        Self {
            remote,
            resolver,
            ignore_set,
            fingerprint_cache,
            metadata_probe,
            dirs,
            defaults,
        }
    }

    /// Runs `command`, returning the process exit code (0 success, 1 any task/engine failure).
    /// Argument-parsing failures never reach here: `clap` exits with code 2 on its own.
    pub async fn dispatch(&self, command: Command) -> anyhow::Result<i32> {
        match command {
            Command::Login { consumer_key, consumer_secret } => self.login(consumer_key, consumer_secret),
            Command::Logout => self.logout(),
            Command::Ls { path, long } => self.ls(path, long).await,
            Command::Mkdir { paths, parents } => self.mkdir(paths, parents, NodeType::Folder).await,
            Command::Mkalbum { paths, parents } => self.mkdir(paths, parents, NodeType::Album).await,
            Command::Rmdir { paths } => self.rm(paths, false, false).await,
            Command::Rm { paths, force, parents } => self.rm(paths, force, parents).await,
            Command::Upload { files, album_path } => self.upload(files, album_path).await,
            Command::Sync(args) => self.sync(args).await,
            Command::Ignore { patterns } => self.ignore(patterns, true),
            Command::Include { patterns } => self.ignore(patterns, false),
        }
    }

    /// Persists a credential set. The OAuth1 three-legged exchange itself happens out of band;
    /// the operator completes it separately and pastes the resulting token back here.
    fn login(&self, consumer_key: String, consumer_secret: String) -> anyhow::Result<i32> {
        print!("oauth_token: ");
        io::stdout().flush()?;
        let mut oauth_token = String::new();
        io::stdin().lock().read_line(&mut oauth_token)?;

        print!("oauth_token_secret: ");
        io::stdout().flush()?;
        let mut oauth_token_secret = String::new();
        io::stdin().lock().read_line(&mut oauth_token_secret)?;

        let creds = Credentials {
            consumer_key,
            consumer_secret,
            oauth_token: oauth_token.trim().to_string(),
            oauth_token_secret: oauth_token_secret.trim().to_string(),
        };
        creds.save(&self.dirs.credentials_path())?;
        info!("credentials saved");
        Ok(0)
    }

    fn logout(&self) -> anyhow::Result<i32> {
        Credentials::delete(&self.dirs.credentials_path())?;
        info!("credentials removed");
        Ok(0)
    }

    async fn ls(&self, path: Option<String>, long: bool) -> anyhow::Result<i32> {
        let node = match path {
            Some(p) => self.resolver.resolve(&p).await?,
            None => self.resolver.root().await?,
        };
        let children = self.remote.list_children(&node.uri).await?;

        for child in &children {
            if long {
                println!("{:<8} {}", child.node_type.as_str(), child.name);
            } else {
                println!("{}", child.name);
            }
        }
        Ok(0)
    }

    async fn mkdir(&self, paths: Vec<String>, parents: bool, leaf_type: NodeType) -> anyhow::Result<i32> {
        let mut exit_code = 0;
        for path in paths {
            if let Err(e) = self.mkdir_one(&path, parents, leaf_type).await {
                eprintln!("{path}: {e}");
                exit_code = 1;
            }
        }
        Ok(exit_code)
    }

    async fn mkdir_one(&self, path: &str, parents: bool, leaf_type: NodeType) -> Result<(), ErrorKind> {
        let (mut current, remaining) = self.resolver.resolve_or_parent(path).await?;
        if remaining.is_empty() {
            return Ok(());
        }
        if remaining.len() > 1 && !parents {
            return Err(ErrorKind::NotFound(path.to_string()));
        }

        for (i, segment) in remaining.iter().enumerate() {
            let is_last = i == remaining.len() - 1;
            let node_type = if is_last { leaf_type } else { NodeType::Folder };
            let children = self.remote.list_children(&current.uri).await?;
            current = match children.into_iter().find(|c| c.name == *segment) {
                Some(existing) => existing,
                None => match node_type {
                    NodeType::Folder => self.remote.create_folder(&current.uri, segment).await?,
                    _ => self.remote.create_album(&current.uri, segment).await?,
                },
            };
        }
        self.resolver.invalidate(path);
        Ok(())
    }

    async fn rm(&self, paths: Vec<String>, force: bool, prune_parents: bool) -> anyhow::Result<i32> {
        let mut exit_code = 0;
        for path in paths {
            match self.resolver.resolve(&path).await {
                Ok(node) => {
                    if let Err(e) = self.remote.delete_node(&node.uri).await {
                        if !force {
                            eprintln!("{path}: {e}");
                            exit_code = 1;
                        }
                    } else {
                        self.resolver.invalidate(&path);
                        if prune_parents {
                            self.prune_empty_parents(&path).await;
                        }
                    }
                }
                Err(e) if !force => {
                    eprintln!("{path}: {e}");
                    exit_code = 1;
                }
                Err(_) => {}
            }
        }
        Ok(exit_code)
    }

    async fn prune_empty_parents(&self, path: &str) {
        let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        while segments.len() > 1 {
            segments.pop();
            let parent_path = segments.join("/");
            let Ok(node) = self.resolver.resolve(&parent_path).await else { break };
            let Ok(children) = self.remote.list_children(&node.uri).await else { break };
            if !children.is_empty() {
                break;
            }
            if self.remote.delete_node(&node.uri).await.is_err() {
                break;
            }
            self.resolver.invalidate(&parent_path);
        }
    }

    async fn upload(&self, files: Vec<PathBuf>, album_path: String) -> anyhow::Result<i32> {
        let album = self.resolver.resolve(&album_path).await?;
        if album.node_type != NodeType::Album {
            anyhow::bail!("{album_path}: expected Album, found {}", album.node_type.as_str());
        }

        let mut exit_code = 0;
        for file in files {
            if let Err(e) = self.upload_one(&file, &album.uri).await {
                eprintln!("{}: {e}", file.display());
                exit_code = 1;
            }
        }
        Ok(exit_code)
    }

    async fn upload_one(&self, file: &PathBuf, album_uri: &str) -> Result<(), ErrorKind> {
        let bytes = tokio::fs::read(file).await.map_err(ErrorKind::from)?;
        let digest = md5::compute(&bytes);
        let md5_hex = format!("{digest:x}");
        let mime_type = self.metadata_probe.mime_type_of(file).unwrap_or("application/octet-stream");
        let file_name = file
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ErrorKind::LocalIO(format!("{}: non-UTF8 file name", file.display())))?;

        let image = self.remote.upload_image(album_uri, file_name, bytes, mime_type, &md5_hex).await?;
        self.fingerprint_cache.put(image.image_uri, md5_hex).await
    }

    async fn sync(&self, args: SyncArgs) -> anyhow::Result<i32> {
        let folder_threads = args.folder_threads.unwrap_or(self.defaults.folder_threads);
        let file_threads = args.file_threads.unwrap_or(self.defaults.file_threads);
        let upload_threads = args.upload_threads.unwrap_or(self.defaults.upload_threads);

        if args.set_defaults {
            let defaults = Defaults {
                folder_threads,
                file_threads,
                upload_threads,
            };
            defaults.save(&self.dirs.defaults_path())?;
            info!("defaults saved");
        }

        let mut pairs = Vec::with_capacity(args.pairs.len());
        for pair in &args.pairs {
            let (src, dst) = match pair.split_once(':') {
                Some((src, dst)) => (src, dst.to_string()),
                None => (pair.as_str(), String::new()),
            };
            pairs.push((PathBuf::from(src), dst));
        }

        let engine = SyncEngine::new(
            Arc::clone(&self.remote),
            Arc::clone(&self.resolver),
            Arc::clone(&self.ignore_set),
            Arc::clone(&self.fingerprint_cache),
            Arc::clone(&self.metadata_probe),
            EngineConfig {
                folder_threads,
                file_threads,
                upload_threads,
                delete_enabled: args.delete,
            },
        );

        let report = engine.run(pairs).await;
        for failure in report.failures() {
            eprintln!("{failure}");
        }
        Ok(if report.is_success() { 0 } else { 1 })
    }

    fn ignore(&self, patterns: Vec<String>, add: bool) -> anyhow::Result<i32> {
        for pattern in patterns {
            if add {
                self.ignore_set.add(pattern)?;
            } else {
                self.ignore_set.remove(&pattern)?;
            }
        }
        Ok(0)
    }
}
