//! In-memory `RemoteClient` used by the test suite. Backed by `FxHashMap`s guarded by a single
//! mutex rather than a real HTTP round trip, so tests can set up and inspect remote state directly.

use std::sync::Mutex;

use async_trait::async_trait;
use rustc_hash::FxHashMap;

use crate::error::ErrorKind;
use crate::remote::{NodeType, RemoteClient, RemoteImage, RemoteNode};

struct State {
    nodes: FxHashMap<String, RemoteNode>,
    children: FxHashMap<String, Vec<String>>,
    images: FxHashMap<String, Vec<RemoteImage>>,
    next_id: u64,
}

pub struct FakeRemoteClient {
    state: Mutex<State>,
    root_uri: String,
}

impl FakeRemoteClient {
    pub fn new(user: &str) -> Self {
        let root_uri = format!("/api/v2/node/root-{user}");
        let root = RemoteNode {
            node_id: "root".to_string(),
            node_type: NodeType::Folder,
            name: user.to_string(),
            url_name: user.to_string(),
            uri: root_uri.clone(),
            album_uri: None,
            has_children: false,
            parent_uri: None,
        };

        let mut nodes = FxHashMap::default();
        nodes.insert(root_uri.clone(), root);

        Self {
            state: Mutex::new(State {
                nodes,
                children: FxHashMap::default(),
                images: FxHashMap::default(),
                next_id: 1,
            }),
            root_uri,
        }
    }

    fn next_uri(next_id: &mut u64) -> String {
        let id = *next_id;
        *next_id += 1;
        format!("/api/v2/node/id-{id}")
    }

    /// Test helper: seed an image directly, bypassing `upload_image`, to set up pre-existing
    /// remote state for a scenario.
    pub fn seed_image(&self, album_uri: &str, image: RemoteImage) {
        let mut state = self.state.lock().expect("fake remote state poisoned");
        state
            .images
            .entry(album_uri.to_string())
            .or_default()
            .push(image);
    }

    pub fn upload_count(&self) -> usize {
        let state = self.state.lock().expect("fake remote state poisoned");
        state.images.values().map(|v| v.len()).sum()
    }
}

#[async_trait]
impl RemoteClient for FakeRemoteClient {
    async fn get_root(&self, _user: &str) -> Result<RemoteNode, ErrorKind> {
        let state = self.state.lock().expect("fake remote state poisoned");
        Ok(state.nodes[&self.root_uri].clone())
    }

    async fn list_children(&self, node_uri: &str) -> Result<Vec<RemoteNode>, ErrorKind> {
        let state = self.state.lock().expect("fake remote state poisoned");
        Ok(state
            .children
            .get(node_uri)
            .map(|uris| uris.iter().map(|u| state.nodes[u].clone()).collect())
            .unwrap_or_default())
    }

    async fn create_folder(&self, parent_uri: &str, name: &str) -> Result<RemoteNode, ErrorKind> {
        self.create_child(parent_uri, name, NodeType::Folder).await
    }

    async fn create_album(&self, parent_uri: &str, name: &str) -> Result<RemoteNode, ErrorKind> {
        self.create_child(parent_uri, name, NodeType::Album).await
    }

    async fn delete_node(&self, node_uri: &str) -> Result<(), ErrorKind> {
        let mut state = self.state.lock().expect("fake remote state poisoned");
        state.nodes.remove(node_uri);
        state.children.remove(node_uri);
        state.images.remove(node_uri);
        for siblings in state.children.values_mut() {
            siblings.retain(|uri| uri != node_uri);
        }
        Ok(())
    }

    async fn list_album_images(&self, album_uri: &str) -> Result<Vec<RemoteImage>, ErrorKind> {
        let state = self.state.lock().expect("fake remote state poisoned");
        Ok(state.images.get(album_uri).cloned().unwrap_or_default())
    }

    async fn upload_image(
        &self,
        album_uri: &str,
        file_name: &str,
        bytes: Vec<u8>,
        _mime_type: &str,
        md5_hex: &str,
    ) -> Result<RemoteImage, ErrorKind> {
        let mut state = self.state.lock().expect("fake remote state poisoned");
        if !state.nodes.contains_key(album_uri) {
            return Err(ErrorKind::NotFound(album_uri.to_string()));
        }
        let uri = Self::next_uri(&mut state.next_id);
        let image = RemoteImage {
            image_uri: uri,
            file_name: file_name.to_string(),
            archived_md5: md5_hex.to_string(),
            archived_size: bytes.len() as u64,
            caption: None,
            keywords: Vec::new(),
            album_uri: album_uri.to_string(),
        };
        state
            .images
            .entry(album_uri.to_string())
            .or_default()
            .push(image.clone());
        Ok(image)
    }

    async fn replace_image(
        &self,
        image_uri: &str,
        bytes: Vec<u8>,
        md5_hex: &str,
    ) -> Result<(), ErrorKind> {
        let mut state = self.state.lock().expect("fake remote state poisoned");
        for images in state.images.values_mut() {
            if let Some(img) = images.iter_mut().find(|i| i.image_uri == image_uri) {
                img.archived_md5 = md5_hex.to_string();
                img.archived_size = bytes.len() as u64;
                return Ok(());
            }
        }
        Err(ErrorKind::NotFound(image_uri.to_string()))
    }

    async fn change_image_album(
        &self,
        image_uri: &str,
        new_album_uri: &str,
    ) -> Result<(), ErrorKind> {
        let mut state = self.state.lock().expect("fake remote state poisoned");
        let mut moved = None;
        for images in state.images.values_mut() {
            if let Some(pos) = images.iter().position(|i| i.image_uri == image_uri) {
                let mut img = images.remove(pos);
                img.album_uri = new_album_uri.to_string();
                moved = Some(img);
                break;
            }
        }
        let Some(img) = moved else {
            return Err(ErrorKind::NotFound(image_uri.to_string()));
        };
        state
            .images
            .entry(new_album_uri.to_string())
            .or_default()
            .push(img);
        Ok(())
    }

    async fn set_image_keywords(
        &self,
        image_uri: &str,
        keywords: Vec<String>,
    ) -> Result<(), ErrorKind> {
        let mut state = self.state.lock().expect("fake remote state poisoned");
        for images in state.images.values_mut() {
            if let Some(img) = images.iter_mut().find(|i| i.image_uri == image_uri) {
                img.keywords = keywords;
                return Ok(());
            }
        }
        Err(ErrorKind::NotFound(image_uri.to_string()))
    }
}

impl FakeRemoteClient {
    async fn create_child(
        &self,
        parent_uri: &str,
        name: &str,
        node_type: NodeType,
    ) -> Result<RemoteNode, ErrorKind> {
        let mut state = self.state.lock().expect("fake remote state poisoned");
        if !state.nodes.contains_key(parent_uri) {
            return Err(ErrorKind::NotFound(parent_uri.to_string()));
        }

        let existing = state
            .children
            .get(parent_uri)
            .into_iter()
            .flatten()
            .find(|uri| state.nodes[*uri].name == name)
            .cloned();
        if let Some(uri) = existing {
            let existing_node = &state.nodes[&uri];
            if existing_node.node_type != node_type {
                return Err(ErrorKind::NameCollision(format!("{parent_uri}/{name}")));
            }
            return Ok(existing_node.clone());
        }

        let uri = Self::next_uri(&mut state.next_id);
        let node = RemoteNode {
            node_id: uri.clone(),
            node_type,
            name: name.to_string(),
            url_name: name.to_string(),
            uri: uri.clone(),
            album_uri: matches!(node_type, NodeType::Album).then(|| uri.clone()),
            has_children: false,
            parent_uri: Some(parent_uri.to_string()),
        };
        state.nodes.insert(uri.clone(), node.clone());
        state
            .children
            .entry(parent_uri.to_string())
            .or_default()
            .push(uri);
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_folder_then_list_children_round_trips() {
        let client = FakeRemoteClient::new("alice");
        let root = client.get_root("alice").await.unwrap();
        let folder = client.create_folder(&root.uri, "2015").await.unwrap();
        let children = client.list_children(&root.uri).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].uri, folder.uri);
    }

    #[tokio::test]
    async fn creating_same_name_twice_with_same_type_is_idempotent() {
        let client = FakeRemoteClient::new("alice");
        let root = client.get_root("alice").await.unwrap();
        let a = client.create_folder(&root.uri, "2015").await.unwrap();
        let b = client.create_folder(&root.uri, "2015").await.unwrap();
        assert_eq!(a.uri, b.uri);
        assert_eq!(client.list_children(&root.uri).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn creating_same_name_with_different_type_is_a_collision() {
        let client = FakeRemoteClient::new("alice");
        let root = client.get_root("alice").await.unwrap();
        client.create_folder(&root.uri, "photos").await.unwrap();
        let result = client.create_album(&root.uri, "photos").await;
        assert!(matches!(result, Err(ErrorKind::NameCollision(_))));
    }

    #[tokio::test]
    async fn change_image_album_moves_between_listings() {
        let client = FakeRemoteClient::new("alice");
        let root = client.get_root("alice").await.unwrap();
        let album_a = client.create_album(&root.uri, "a").await.unwrap();
        let album_b = client.create_album(&root.uri, "b").await.unwrap();
        let image = client
            .upload_image(&album_a.uri, "x.jpg", vec![1, 2, 3], "image/jpeg", "abc")
            .await
            .unwrap();

        client
            .change_image_album(&image.image_uri, &album_b.uri)
            .await
            .unwrap();

        assert!(client.list_album_images(&album_a.uri).await.unwrap().is_empty());
        assert_eq!(client.list_album_images(&album_b.uri).await.unwrap().len(), 1);
    }
}
