//! Remote path resolution. Translates `"A/B/C"`-style path strings into node URIs by walking the
//! remote tree segment by segment, caching lookups for the lifetime of one process.

use std::sync::Arc;

use moka::sync::Cache;

use crate::error::ErrorKind;
use crate::remote::{RemoteClient, RemoteNode};

pub struct PathResolver {
    remote: Arc<dyn RemoteClient>,
    user: String,
    cache: Cache<String, RemoteNode>,
}

impl PathResolver {
    pub fn new(remote: Arc<dyn RemoteClient>, user: impl Into<String>) -> Self {
        Self {
            remote,
            user: user.into(),
            cache: Cache::new(10_000),
        }
    }

    fn cache_key(prefix: &[&str]) -> String {
        prefix.join("/")
    }

    /// Resolves a `/`-separated path to the node at that path, walking from the user's root.
    /// Segment matching is case-sensitive exact match on `Name`.
    pub async fn resolve(&self, path: &str) -> Result<RemoteNode, ErrorKind> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut current = self.root().await?;
        let mut walked: Vec<&str> = Vec::with_capacity(segments.len());

        for segment in segments {
            walked.push(segment);
            let key = Self::cache_key(&walked);
            if let Some(node) = self.cache.get(&key) {
                current = node;
                continue;
            }

            let children = self.remote.list_children(&current.uri).await?;
            let found = children
                .into_iter()
                .find(|c| c.name == segment)
                .ok_or_else(|| ErrorKind::NotFound(walked.join("/")))?;
            self.cache.insert(key, found.clone());
            current = found;
        }

        Ok(current)
    }

    /// Resolves as far as existing nodes go, returning the deepest existing ancestor plus the
    /// remaining path segments that do not yet exist. Used by `mkdir`-style verbs.
    pub async fn resolve_or_parent(
        &self,
        path: &str,
    ) -> Result<(RemoteNode, Vec<String>), ErrorKind> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut current = self.root().await?;
        let mut walked: Vec<&str> = Vec::new();

        for (i, segment) in segments.iter().enumerate() {
            walked.push(segment);
            let key = Self::cache_key(&walked);

            let next = if let Some(node) = self.cache.get(&key) {
                Some(node)
            } else {
                let children = self.remote.list_children(&current.uri).await?;
                let found = children.into_iter().find(|c| c.name == *segment);
                if let Some(ref node) = found {
                    self.cache.insert(key, node.clone());
                }
                found
            };

            match next {
                Some(node) => current = node,
                None => {
                    let remaining = segments[i..].iter().map(|s| s.to_string()).collect();
                    return Ok((current, remaining));
                }
            }
        }

        Ok((current, Vec::new()))
    }

    pub async fn root(&self) -> Result<RemoteNode, ErrorKind> {
        if let Some(node) = self.cache.get("") {
            return Ok(node);
        }
        let root = self.remote.get_root(&self.user).await?;
        self.cache.insert(String::new(), root.clone());
        Ok(root)
    }

    pub fn invalidate(&self, path: &str) {
        self.cache.invalidate(&path.to_string());
    }
}
