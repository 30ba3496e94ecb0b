use async_trait::async_trait;
use simreg_common::{FileType, Status, TestCase, TestReference};
use simreg_reference::{
    CloudProvider, ReferenceProvider, RemoteError, RemoteStore, VersionManifest,
};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

const MANIFEST: &str = r#"
Riemann_input1:
  v1: { time: 100 }
  v2: { time: 200 }
"#;

#[derive(Default)]
struct FakeStore {
    manifest_calls: AtomicUsize,
    fail_manifest: bool,
    resolved: std::sync::Mutex<Vec<String>>,
}

#[async_trait]
impl RemoteStore for FakeStore {
    async fn download_manifest(&self) -> Result<VersionManifest, RemoteError> {
        self.manifest_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_manifest {
            return Err(RemoteError::NotFound("compare_version_list".into()));
        }
        VersionManifest::parse(MANIFEST)
    }

    async fn resolve_file(&self, folder: &str, path: &[String]) -> Result<String, RemoteError> {
        let full = format!("{folder}/{}", path.join("/"));
        self.resolved.lock().unwrap().push(full.clone());
        if path.last().is_some_and(|f| f == "missing") {
            return Err(RemoteError::NotFound(full));
        }
        Ok(format!("id:{full}"))
    }

    async fn download_item(&self, item_id: &str, target: &Path) -> Result<(), RemoteError> {
        std::fs::write(target, item_id)
            .map_err(|source| RemoteError::Io { path: target.to_path_buf(), source })
    }
}

fn hdf5(name: &str) -> TestReference {
    TestReference { name: name.into(), loc: "cloud:".parse().unwrap(), file_type: FileType::Hdf5 }
}

#[tokio::test]
async fn manifest_is_downloaded_once_for_many_cases() {
    let store = Arc::new(FakeStore::default());
    let provider = CloudProvider::with_store(store.clone());
    let dest = TempDir::new().unwrap();

    for index in 0..4 {
        let case = TestCase::new("Riemann", "input1", index);
        let path = provider.fetch(&case, &hdf5("Data_000010"), dest.path()).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            format!("id:Riemann_input1-200/case_{index:02}/Data_000010")
        );
    }

    assert_eq!(store.manifest_calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.resolved.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn manifest_failure_is_fatal() {
    let store = Arc::new(FakeStore { fail_manifest: true, ..Default::default() });
    let provider = CloudProvider::with_store(store);
    let dest = TempDir::new().unwrap();

    let err = provider
        .fetch(&TestCase::new("Riemann", "input1", 0), &hdf5("Data_000010"), dest.path())
        .await
        .unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(err.status(), Status::Download);
    assert!(err.reason().contains("compare_version_list"), "{}", err.reason());
}

#[tokio::test]
async fn missing_remote_file_is_a_case_download_error() {
    let provider = CloudProvider::with_store(Arc::new(FakeStore::default()));
    let dest = TempDir::new().unwrap();
    let case = TestCase::new("Riemann", "input1", 0);

    let err = provider.fetch(&case, &hdf5("missing"), dest.path()).await.unwrap_err();
    assert!(!err.is_fatal());
    assert_eq!(err.status(), Status::Download);
    assert!(err.reason().contains("Riemann_input1-200/case_00/missing"), "{}", err.reason());

    let unknown = TestCase::new("Sod", "input9", 0);
    let err = provider.fetch(&unknown, &hdf5("Data_000010"), dest.path()).await.unwrap_err();
    assert!(!err.is_fatal());
    assert!(err.reason().contains("Sod_input9"), "{}", err.reason());
}
