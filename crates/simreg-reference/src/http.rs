use crate::error::RemoteError;
use futures_util::StreamExt;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Send `request` and stream a 2xx body into `path`, replacing any existing file
pub(crate) async fn download_to(
    request: reqwest::RequestBuilder,
    url: &str,
    path: &Path,
) -> Result<u64, RemoteError> {
    let response = request
        .send()
        .await
        .map_err(|source| RemoteError::Http { url: url.to_string(), source })?;
    if !response.status().is_success() {
        return Err(RemoteError::Status { url: url.to_string(), status: response.status().as_u16() });
    }

    let io_err = |source| RemoteError::Io { path: path.to_path_buf(), source };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    let mut file = tokio::fs::File::create(path).await.map_err(io_err)?;

    let mut stream = response.bytes_stream();
    let mut total = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|source| RemoteError::Http { url: url.to_string(), source })?;
        file.write_all(&chunk).await.map_err(io_err)?;
        total += chunk.len() as u64;
    }
    file.flush().await.map_err(io_err)?;

    debug!(target: "simreg::reference", "Downloaded {url} -> {} ({total} bytes)", path.display());
    Ok(total)
}
