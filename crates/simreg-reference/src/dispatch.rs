use crate::cloud::{CloudProvider, RemoteStore, StoreConnector};
use crate::girder::GirderStore;
use crate::local::LocalProvider;
use crate::provider::ReferenceProvider;
use crate::url::UrlProvider;
use async_trait::async_trait;
use simreg_common::{HarnessConfig, RefBackend, StageResult, TestCase, TestReference};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Routes each reference to the provider named by its `<backend>:` prefix
pub struct ReferenceDispatcher {
    local: LocalProvider,
    cloud: CloudProvider,
    url: UrlProvider,
}

impl ReferenceDispatcher {
    pub fn new(local: LocalProvider, cloud: CloudProvider, url: UrlProvider) -> Self {
        Self { local, cloud, url }
    }

    /// Production wiring: local store from the config, Girder for cloud references
    pub fn from_config(config: &HarnessConfig) -> Self {
        let cloud_config = config.cloud.clone();
        let connect: StoreConnector = Box::new(move || {
            let cloud_config = cloud_config.clone();
            Box::pin(async move {
                let store = GirderStore::connect(&cloud_config).await?;
                Ok(Arc::new(store) as Arc<dyn RemoteStore>)
            })
        });
        Self::new(
            Self::local_for(config),
            CloudProvider::new(connect),
            UrlProvider::default(),
        )
    }

    /// Wiring with a caller-supplied remote store
    pub fn with_remote_store(config: &HarnessConfig, store: Arc<dyn RemoteStore>) -> Self {
        Self::new(Self::local_for(config), CloudProvider::with_store(store), UrlProvider::default())
    }

    fn local_for(config: &HarnessConfig) -> LocalProvider {
        LocalProvider::new(
            config.paths.source_root.clone(),
            config.paths.local_reference_root.clone(),
        )
    }

    fn provider(&self, reference: &TestReference) -> &dyn ReferenceProvider {
        match reference.loc {
            RefBackend::Local(_) => &self.local,
            RefBackend::Cloud(_) => &self.cloud,
            RefBackend::Url(_) => &self.url,
        }
    }
}

#[async_trait]
impl ReferenceProvider for ReferenceDispatcher {
    async fn fetch(
        &self,
        case: &TestCase,
        reference: &TestReference,
        dest_dir: &Path,
    ) -> StageResult<PathBuf> {
        self.provider(reference).fetch(case, reference, dest_dir).await
    }

    /// Only local references can be published; the others fail with `UPLOAD`.
    async fn push(
        &self,
        case: &TestCase,
        reference: &TestReference,
        source: &Path,
    ) -> StageResult<PathBuf> {
        self.provider(reference).push(case, reference, source).await
    }
}
