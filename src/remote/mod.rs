//! The remote photo-hosting service's node-tree API. The engine depends only on this trait; the
//! concrete HTTP implementation and signing method are both pluggable.

pub mod backoff;
pub mod fake;
pub mod http;
pub mod signer;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    Folder,
    Album,
    Page,
    SystemAlbum,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Folder => "Folder",
            NodeType::Album => "Album",
            NodeType::Page => "Page",
            NodeType::SystemAlbum => "SystemAlbum",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteNode {
    pub node_id: String,
    pub node_type: NodeType,
    pub name: String,
    pub url_name: String,
    pub uri: String,
    pub album_uri: Option<String>,
    pub has_children: bool,
    pub parent_uri: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteImage {
    pub image_uri: String,
    pub file_name: String,
    pub archived_md5: String,
    pub archived_size: u64,
    pub caption: Option<String>,
    pub keywords: Vec<String>,
    pub album_uri: String,
}

/// The remote service's node-tree API, abstracted away from its REST/JSON wire shape.
///
/// Implementations must retry `Network` and `RateLimited` failures internally per the backoff
/// policy in [`backoff::Backoff`]; every other `ErrorKind` propagates to the caller immediately.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn get_root(&self, user: &str) -> Result<RemoteNode, ErrorKind>;

    async fn list_children(&self, node_uri: &str) -> Result<Vec<RemoteNode>, ErrorKind>;

    async fn create_folder(&self, parent_uri: &str, name: &str) -> Result<RemoteNode, ErrorKind>;

    async fn create_album(&self, parent_uri: &str, name: &str) -> Result<RemoteNode, ErrorKind>;

    async fn delete_node(&self, node_uri: &str) -> Result<(), ErrorKind>;

    async fn list_album_images(&self, album_uri: &str) -> Result<Vec<RemoteImage>, ErrorKind>;

    async fn upload_image(
        &self,
        album_uri: &str,
        file_name: &str,
        bytes: Vec<u8>,
        mime_type: &str,
        md5_hex: &str,
    ) -> Result<RemoteImage, ErrorKind>;

    async fn replace_image(
        &self,
        image_uri: &str,
        bytes: Vec<u8>,
        md5_hex: &str,
    ) -> Result<(), ErrorKind>;

    async fn change_image_album(
        &self,
        image_uri: &str,
        new_album_uri: &str,
    ) -> Result<(), ErrorKind>;

    async fn set_image_keywords(
        &self,
        image_uri: &str,
        keywords: Vec<String>,
    ) -> Result<(), ErrorKind>;
}
