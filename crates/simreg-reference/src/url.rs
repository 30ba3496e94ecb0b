use crate::http::download_to;
use crate::provider::{ReferenceProvider, prepare_target};
use async_trait::async_trait;
use reqwest::Client;
use simreg_common::{CaseError, StageResult, TestCase, TestReference};
use std::path::{Path, PathBuf};
use tracing::info;

/// `url:<http(s) address>` references, fetched with a plain GET
#[derive(Debug, Clone, Default)]
pub struct UrlProvider {
    client: Client,
}

impl UrlProvider {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReferenceProvider for UrlProvider {
    async fn fetch(
        &self,
        _case: &TestCase,
        reference: &TestReference,
        dest_dir: &Path,
    ) -> StageResult<PathBuf> {
        let url = reference.loc.payload();
        let target = prepare_target(dest_dir, reference)?;
        info!(target: "simreg::reference", "Downloading {url} --> {}", target.display());
        download_to(self.client.get(url), url, &target)
            .await
            .map_err(|e| CaseError::download(format!("Download from {url} fail: {e}")))?;
        Ok(target)
    }
}
