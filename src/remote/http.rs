//! `reqwest`-backed `RemoteClient`. The wire format (REST+JSON, OAuth1-signed, paginated listings)
//! is the remote service's own contract; this module owns only the HTTP mechanics — retry/backoff,
//! signing, and JSON decoding into the typed `RemoteNode`/`RemoteImage` shapes the engine uses.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ErrorKind;
use crate::remote::backoff::Backoff;
use crate::remote::signer::Signer;
use crate::remote::{NodeType, RemoteClient, RemoteImage, RemoteNode};

pub struct HttpRemoteClient {
    client: Client,
    base_url: String,
    signer: Arc<dyn Signer>,
    backoff: Backoff,
}

impl HttpRemoteClient {
    pub fn new(base_url: impl Into<String>, signer: Arc<dyn Signer>) -> anyhow::Result<Self> {
        let base_url = base_url.into();
        url::Url::parse(&base_url).map_err(|e| anyhow::anyhow!("invalid base URL {base_url:?}: {e}"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url,
            signer,
            backoff: Backoff::default(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Issues one signed HTTP call, retrying transient failures (network errors, 5xx, 429)
    /// according to `self.backoff`, up to `backoff.max_retries()` attempts.
    async fn call_json<T: for<'de> Deserialize<'de>>(
        &self,
        method: Method,
        path: &str,
        params: &[(String, String)],
        body: Option<Vec<u8>>,
    ) -> Result<T, ErrorKind> {
        let url = self.url(path);
        let mut attempt = 0u32;

        loop {
            let signed = self.signer.sign(method.as_str(), &url, params);
            let mut request = self.client.request(method.clone(), &url).query(&signed);
            if let Some(ref bytes) = body {
                request = request.body(bytes.clone());
            }

            let result = request.send().await;

            let outcome = match result {
                Ok(response) => self.classify_response::<T>(response).await,
                Err(err) => Err(ErrorKind::Network(err.to_string())),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(kind) if kind.is_retriable() && attempt < self.backoff.max_retries() => {
                    let delay = self.backoff.delay_for(attempt);
                    warn!(%url, attempt, ?delay, "retrying after transient remote failure");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(kind) => return Err(kind),
            }
        }
    }

    async fn classify_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ErrorKind> {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ErrorKind::RateLimited { attempts: 1 });
        }
        if status.is_server_error() {
            return Err(ErrorKind::Network(format!("server error {status}")));
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ErrorKind::Auth(format!("remote returned {status}")));
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ErrorKind::NotFound(response.url().to_string()));
        }
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            return Err(ErrorKind::PayloadTooLarge(response.url().to_string()));
        }
        if !status.is_success() {
            return Err(ErrorKind::Network(format!("unexpected status {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ErrorKind::Network(e.to_string()))?;
        debug!(len = bytes.len(), "decoding remote response body");
        serde_json::from_slice(&bytes).map_err(|e| ErrorKind::Network(format!("bad response body: {e}")))
    }
}

#[async_trait::async_trait]
impl RemoteClient for HttpRemoteClient {
    async fn get_root(&self, user: &str) -> Result<RemoteNode, ErrorKind> {
        self.call_json(
            Method::GET,
            &format!("/api/v2/user/{user}"),
            &[],
            None,
        )
        .await
    }

    async fn list_children(&self, node_uri: &str) -> Result<Vec<RemoteNode>, ErrorKind> {
        let mut all = Vec::new();
        let mut start = 1u64;
        const PAGE_SIZE: u64 = 100;

        loop {
            let params = vec![
                ("start".to_string(), start.to_string()),
                ("count".to_string(), PAGE_SIZE.to_string()),
            ];
            let page: Vec<RemoteNode> = self
                .call_json(Method::GET, &format!("{node_uri}/children"), &params, None)
                .await?;
            let got = page.len() as u64;
            all.extend(page);
            if got < PAGE_SIZE {
                break;
            }
            start += PAGE_SIZE;
        }

        Ok(all)
    }

    async fn create_folder(&self, parent_uri: &str, name: &str) -> Result<RemoteNode, ErrorKind> {
        let params = vec![
            ("Type".to_string(), NodeType::Folder.as_str().to_string()),
            ("Name".to_string(), name.to_string()),
        ];
        self.call_json(Method::POST, &format!("{parent_uri}/children"), &params, None)
            .await
    }

    async fn create_album(&self, parent_uri: &str, name: &str) -> Result<RemoteNode, ErrorKind> {
        let params = vec![
            ("Type".to_string(), NodeType::Album.as_str().to_string()),
            ("Name".to_string(), name.to_string()),
        ];
        self.call_json(Method::POST, &format!("{parent_uri}/children"), &params, None)
            .await
    }

    async fn delete_node(&self, node_uri: &str) -> Result<(), ErrorKind> {
        let _: serde_json::Value = self.call_json(Method::DELETE, node_uri, &[], None).await?;
        Ok(())
    }

    async fn list_album_images(&self, album_uri: &str) -> Result<Vec<RemoteImage>, ErrorKind> {
        let mut all = Vec::new();
        let mut start = 1u64;
        const PAGE_SIZE: u64 = 100;

        loop {
            let params = vec![
                ("start".to_string(), start.to_string()),
                ("count".to_string(), PAGE_SIZE.to_string()),
            ];
            let page: Vec<RemoteImage> = self
                .call_json(Method::GET, &format!("{album_uri}/images"), &params, None)
                .await?;
            let got = page.len() as u64;
            all.extend(page);
            if got < PAGE_SIZE {
                break;
            }
            start += PAGE_SIZE;
        }

        Ok(all)
    }

    async fn upload_image(
        &self,
        album_uri: &str,
        file_name: &str,
        bytes: Vec<u8>,
        mime_type: &str,
        md5_hex: &str,
    ) -> Result<RemoteImage, ErrorKind> {
        let params = vec![
            ("X-Gallery-FileName".to_string(), file_name.to_string()),
            ("Content-MD5".to_string(), md5_hex.to_string()),
            ("Content-Type".to_string(), mime_type.to_string()),
        ];
        self.call_json(
            Method::POST,
            &format!("{album_uri}/images"),
            &params,
            Some(bytes),
        )
        .await
    }

    async fn replace_image(
        &self,
        image_uri: &str,
        bytes: Vec<u8>,
        md5_hex: &str,
    ) -> Result<(), ErrorKind> {
        let params = vec![("Content-MD5".to_string(), md5_hex.to_string())];
        let _: serde_json::Value = self
            .call_json(Method::PUT, &format!("{image_uri}/upload"), &params, Some(bytes))
            .await?;
        Ok(())
    }

    async fn change_image_album(
        &self,
        image_uri: &str,
        new_album_uri: &str,
    ) -> Result<(), ErrorKind> {
        let params = vec![("AlbumUri".to_string(), new_album_uri.to_string())];
        let _: serde_json::Value = self.call_json(Method::POST, image_uri, &params, None).await?;
        Ok(())
    }

    async fn set_image_keywords(
        &self,
        image_uri: &str,
        keywords: Vec<String>,
    ) -> Result<(), ErrorKind> {
        let params = vec![("Keywords".to_string(), keywords.join(","))];
        let _: serde_json::Value = self.call_json(Method::POST, image_uri, &params, None).await?;
        Ok(())
    }
}
