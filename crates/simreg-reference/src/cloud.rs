//! Remote object-store references with a once-per-run version manifest

use crate::error::RemoteError;
use crate::provider::{ReferenceProvider, prepare_target};
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Deserializer};
use simreg_common::{CaseError, StageResult, TestCase, TestReference};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info};

/// One uploaded version of a group's references
#[derive(Debug, Clone, Deserialize)]
pub struct VersionEntry {
    #[serde(deserialize_with = "int_or_string")]
    pub time: i64,
    #[serde(default)]
    pub members: serde_yaml::Value,
}

fn int_or_string<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Str(String),
    }
    match Raw::deserialize(d)? {
        Raw::Int(i) => Ok(i),
        Raw::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Group → version name → entry, as published next to the references
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct VersionManifest {
    groups: BTreeMap<String, BTreeMap<String, VersionEntry>>,
}

impl VersionManifest {
    pub fn parse(text: &str) -> Result<Self, RemoteError> {
        serde_yaml::from_str(text).map_err(|e| RemoteError::Manifest(e.to_string()))
    }

    /// Upload time of the newest version of `group`
    pub fn latest(&self, group: &str) -> Option<i64> {
        self.groups.get(group)?.values().map(|v| v.time).max()
    }
}

/// Remote store operations needed to resolve a cloud reference
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn download_manifest(&self) -> Result<VersionManifest, RemoteError>;

    /// Walk `folder/<path...>` and return the id of the final item
    async fn resolve_file(&self, folder: &str, path: &[String]) -> Result<String, RemoteError>;

    async fn download_item(&self, item_id: &str, target: &Path) -> Result<(), RemoteError>;
}

/// Opens a store session on demand
pub type StoreConnector =
    Box<dyn Fn() -> BoxFuture<'static, Result<Arc<dyn RemoteStore>, RemoteError>> + Send + Sync>;

/// Provider for `cloud:<path>` references.
///
/// The session is opened on first use and the version manifest is fetched at
/// most once; every case of the run resolves against that same snapshot.
pub struct CloudProvider {
    connect: StoreConnector,
    store: OnceCell<Arc<dyn RemoteStore>>,
    manifest: OnceCell<Arc<VersionManifest>>,
}

impl CloudProvider {
    pub fn new(connect: StoreConnector) -> Self {
        Self { connect, store: OnceCell::new(), manifest: OnceCell::new() }
    }

    /// Provider over an already-open store
    pub fn with_store(store: Arc<dyn RemoteStore>) -> Self {
        Self::new(Box::new(move || {
            let store = store.clone();
            Box::pin(async move { Ok(store) })
        }))
    }

    async fn session(&self) -> StageResult<&Arc<dyn RemoteStore>> {
        self.store
            .get_or_try_init(|| (self.connect)())
            .await
            .map_err(|e| CaseError::manifest(format!("cannot open remote store session: {e}")))
    }

    async fn manifest(&self, store: &Arc<dyn RemoteStore>) -> StageResult<&Arc<VersionManifest>> {
        self.manifest
            .get_or_try_init(|| async {
                info!(target: "simreg::reference", "Downloading version manifest");
                store.download_manifest().await.map(Arc::new)
            })
            .await
            .map_err(|e| {
                error!(target: "simreg::reference", "Version manifest download failed: {e}");
                CaseError::manifest(e.to_string())
            })
    }
}

/// Path components under the version folder
fn remote_path(case: &TestCase, reference: &TestReference) -> Vec<String> {
    let payload = reference.loc.payload();
    if payload.is_empty() {
        let file = Path::new(&reference.name)
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| reference.name.clone());
        vec![case.case_name(), file]
    } else {
        payload.split('/').filter(|p| !p.is_empty()).map(str::to_string).collect()
    }
}

#[async_trait]
impl ReferenceProvider for CloudProvider {
    async fn fetch(
        &self,
        case: &TestCase,
        reference: &TestReference,
        dest_dir: &Path,
    ) -> StageResult<PathBuf> {
        let store = self.session().await?;
        let manifest = self.manifest(store).await?;

        let group = case.group_key();
        let time = manifest
            .latest(&group)
            .ok_or_else(|| CaseError::download(format!("No reference version for {group}")))?;
        let folder = format!("{group}-{time}");
        let path = remote_path(case, reference);
        let remote = format!("{folder}/{}", path.join("/"));

        let item_id = store.resolve_file(&folder, &path).await.map_err(|e| {
            CaseError::download(format!("Reference {remote} not found: {e}"))
        })?;

        let target = prepare_target(dest_dir, reference)?;
        info!(
            target: "simreg::reference",
            "Downloading (name: {remote}, id: {item_id}) --> {}",
            target.display()
        );
        store.download_item(&item_id, &target).await.map_err(|e| {
            error!(target: "simreg::reference", "Download ({remote}, id: {item_id}) fails: {e}");
            CaseError::download(format!("Download of {remote} failed: {e}"))
        })?;
        Ok(target)
    }
}
