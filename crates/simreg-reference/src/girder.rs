//! Girder REST implementation of [`RemoteStore`]

use crate::cloud::{RemoteStore, VersionManifest};
use crate::error::RemoteError;
use crate::http::download_to;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use simreg_common::CloudConfig;
use std::path::Path;
use tokio::sync::OnceCell;
use tracing::debug;

const TOKEN_HEADER: &str = "Girder-Token";

#[derive(Debug, Clone, Deserialize)]
struct Entry {
    #[serde(rename = "_id")]
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(rename = "authToken")]
    auth_token: AuthToken,
}

#[derive(Debug, Deserialize)]
struct AuthToken {
    token: String,
}

/// Authenticated session against a Girder server
pub struct GirderStore {
    client: Client,
    api_url: String,
    token: String,
    config: CloudConfig,
    root_folders: OnceCell<Vec<Entry>>,
}

impl GirderStore {
    /// Exchange the API key from the environment for a session token
    pub async fn connect(config: &CloudConfig) -> Result<Self, RemoteError> {
        let key = config.api_key().ok_or_else(|| RemoteError::MissingApiKey(config.api_key_env.clone()))?;
        let api_url = config.api_url.trim_end_matches('/').to_string();
        let client = Client::builder()
            .user_agent(concat!("simreg/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| RemoteError::Http { url: api_url.clone(), source })?;

        let url = format!("{api_url}/api_key/token");
        let response = client
            .post(&url)
            .query(&[("key", key.as_str())])
            .send()
            .await
            .map_err(|source| RemoteError::Http { url: url.clone(), source })?;
        if !response.status().is_success() {
            return Err(RemoteError::Status { url, status: response.status().as_u16() });
        }
        let token: TokenResponse =
            response.json().await.map_err(|source| RemoteError::Http { url, source })?;

        debug!(target: "simreg::reference", "Opened remote store session at {api_url}");
        Ok(Self {
            client,
            api_url,
            token: token.auth_token.token,
            config: config.clone(),
            root_folders: OnceCell::new(),
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, RemoteError> {
        let url = format!("{}/{path}", self.api_url);
        let response = self
            .client
            .get(&url)
            .header(TOKEN_HEADER, &self.token)
            .query(query)
            .send()
            .await
            .map_err(|source| RemoteError::Http { url: url.clone(), source })?;
        if !response.status().is_success() {
            return Err(RemoteError::Status { url, status: response.status().as_u16() });
        }
        response.json().await.map_err(|source| RemoteError::Http { url, source })
    }

    async fn folders(&self, parent_id: &str) -> Result<Vec<Entry>, RemoteError> {
        self.get_json("folder", &[("parentType", "folder"), ("parentId", parent_id), ("limit", "0")])
            .await
    }

    async fn items(&self, folder_id: &str) -> Result<Vec<Entry>, RemoteError> {
        self.get_json("item", &[("folderId", folder_id), ("limit", "0")]).await
    }

    async fn root_folder(&self, name: &str) -> Result<Entry, RemoteError> {
        let folders = self
            .root_folders
            .get_or_try_init(|| self.folders(&self.config.root_folder_id))
            .await?;
        find(folders, name)
    }
}

fn find(entries: &[Entry], name: &str) -> Result<Entry, RemoteError> {
    entries
        .iter()
        .find(|e| e.name == name)
        .cloned()
        .ok_or_else(|| RemoteError::NotFound(name.to_string()))
}

#[async_trait]
impl RemoteStore for GirderStore {
    async fn download_manifest(&self) -> Result<VersionManifest, RemoteError> {
        let folder = self.root_folder(&self.config.manifest_folder).await?;
        let item = find(&self.items(&folder.id).await?, &self.config.manifest_item)
            .map_err(|_| {
                RemoteError::NotFound(format!(
                    "{}/{}",
                    self.config.manifest_folder, self.config.manifest_item
                ))
            })?;

        let url = format!("{}/item/{}/download", self.api_url, item.id);
        let response = self
            .client
            .get(&url)
            .header(TOKEN_HEADER, &self.token)
            .send()
            .await
            .map_err(|source| RemoteError::Http { url: url.clone(), source })?;
        if !response.status().is_success() {
            return Err(RemoteError::Status { url, status: response.status().as_u16() });
        }
        let text = response.text().await.map_err(|source| RemoteError::Http { url, source })?;
        VersionManifest::parse(&text)
    }

    async fn resolve_file(&self, folder: &str, path: &[String]) -> Result<String, RemoteError> {
        let Some((file, dirs)) = path.split_last() else {
            return Err(RemoteError::NotFound(format!("{folder}/")));
        };

        let mut current = self.root_folder(folder).await?;
        let mut walked = folder.to_string();
        for dir in dirs {
            walked = format!("{walked}/{dir}");
            current = find(&self.folders(&current.id).await?, dir)
                .map_err(|_| RemoteError::NotFound(walked.clone()))?;
        }
        let item = find(&self.items(&current.id).await?, file)
            .map_err(|_| RemoteError::NotFound(format!("{walked}/{file}")))?;
        Ok(item.id)
    }

    async fn download_item(&self, item_id: &str, target: &Path) -> Result<(), RemoteError> {
        let url = format!("{}/item/{item_id}/download", self.api_url);
        let request = self.client.get(&url).header(TOKEN_HEADER, &self.token);
        download_to(request, &url, target).await.map(drop)
    }
}
