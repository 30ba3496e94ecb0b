use crate::provider::{ReferenceProvider, prepare_target};
use async_trait::async_trait;
use simreg_common::{CaseError, RefBackend, StageResult, TestCase, TestReference};
use std::path::{Path, PathBuf};
use tracing::info;

/// References on the local filesystem, linked into the run directory.
///
/// An explicit `local:<path>` payload resolves against the source root. An
/// empty payload points into the local store at `<store>/<test_id>/<name>`.
/// [`ReferenceProvider::push`] publishes to the same path `fetch` reads.
#[derive(Debug, Clone)]
pub struct LocalProvider {
    source_root: PathBuf,
    store_root: PathBuf,
}

impl LocalProvider {
    pub fn new(source_root: PathBuf, store_root: PathBuf) -> Self {
        Self { source_root, store_root }
    }

    pub fn store_path(&self, case: &TestCase, reference: &TestReference) -> PathBuf {
        self.store_root.join(case.test_id()).join(&reference.name)
    }

    fn source_path(&self, case: &TestCase, reference: &TestReference) -> PathBuf {
        match &reference.loc {
            RefBackend::Local(payload) if !payload.is_empty() => {
                let path = Path::new(payload);
                if path.is_absolute() { path.to_path_buf() } else { self.source_root.join(path) }
            }
            _ => self.store_path(case, reference),
        }
    }
}

#[async_trait]
impl ReferenceProvider for LocalProvider {
    async fn fetch(
        &self,
        case: &TestCase,
        reference: &TestReference,
        dest_dir: &Path,
    ) -> StageResult<PathBuf> {
        let source = self.source_path(case, reference);
        if !source.exists() {
            return Err(CaseError::missing_file(&source));
        }

        let target = prepare_target(dest_dir, reference)?;
        if target.symlink_metadata().is_ok() {
            std::fs::remove_file(&target).map_err(|e| {
                CaseError::external(format!("Can not replace {}: {e}", target.display()))
            })?;
        }

        info!(target: "simreg::reference", "Linking {} --> {}", source.display(), target.display());
        symlink(&source, &target).map_err(|e| {
            CaseError::external(format!("Can not link file {}: {e}", source.display()))
        })?;
        Ok(target)
    }

    async fn push(
        &self,
        case: &TestCase,
        reference: &TestReference,
        source: &Path,
    ) -> StageResult<PathBuf> {
        if !source.is_file() {
            return Err(CaseError::missing_file(source));
        }
        let target = self.source_path(case, reference);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CaseError::upload(format!("Can not create {}: {e}", parent.display()))
            })?;
        }
        std::fs::copy(source, &target).map_err(|e| {
            CaseError::upload(format!(
                "Can not copy {} to {}: {e}",
                source.display(),
                target.display()
            ))
        })?;
        info!(target: "simreg::reference", "Published {} --> {}", source.display(), target.display());
        Ok(target)
    }
}

#[cfg(unix)]
fn symlink(source: &Path, target: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(source, target)
}

#[cfg(windows)]
fn symlink(source: &Path, target: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(source, target)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use simreg_common::{FileType, Status};
    use tempfile::TempDir;

    fn reference(loc: &str) -> TestReference {
        TestReference { name: "Data_000001".into(), loc: loc.parse().unwrap(), file_type: FileType::Text }
    }

    #[tokio::test]
    async fn links_relative_payload_from_source_root() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("golden")).unwrap();
        std::fs::write(root.path().join("golden/Data_000001"), "1 2 3\n").unwrap();
        let provider = LocalProvider::new(root.path().into(), root.path().join("store"));
        let dest = root.path().join("run/reference");

        let case = TestCase::new("Riemann", "input1", 0);
        let path = provider.fetch(&case, &reference("local:golden/Data_000001"), &dest).await.unwrap();

        assert_eq!(path, dest.join("Data_000001"));
        assert!(path.symlink_metadata().unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1 2 3\n");

        // Fetching again replaces the link.
        provider.fetch(&case, &reference("local:golden/Data_000001"), &dest).await.unwrap();
    }

    #[tokio::test]
    async fn missing_source_is_missing_file() {
        let root = TempDir::new().unwrap();
        let provider = LocalProvider::new(root.path().into(), root.path().join("store"));
        let err = provider
            .fetch(&TestCase::new("A", "t", 0), &reference("local:/nonexistent/x"), root.path())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Status::MissingFile);
    }

    #[tokio::test]
    async fn pushed_reference_is_fetched_from_store() {
        let root = TempDir::new().unwrap();
        let produced = root.path().join("produced");
        std::fs::write(&produced, "42\n").unwrap();
        let provider = LocalProvider::new(root.path().into(), root.path().join("store"));
        let case = TestCase::new("Riemann", "input1", 0);
        let reference = reference("local:");

        let stored = provider.push(&case, &reference, &produced).await.unwrap();
        assert!(stored.starts_with(root.path().join("store").join(case.test_id())));

        let fetched = provider.fetch(&case, &reference, &root.path().join("dest")).await.unwrap();
        assert_eq!(std::fs::read_to_string(fetched).unwrap(), "42\n");
    }

    #[tokio::test]
    async fn pushed_reference_replaces_explicit_payload() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("golden")).unwrap();
        std::fs::write(root.path().join("golden/Xline"), "old\n").unwrap();
        let produced = root.path().join("Xline");
        std::fs::write(&produced, "new\n").unwrap();
        let provider = LocalProvider::new(root.path().into(), root.path().join("store"));
        let case = TestCase::new("Riemann", "input1", 0);
        let reference = reference("local:golden/Xline");

        let stored = provider.push(&case, &reference, &produced).await.unwrap();
        assert_eq!(stored, root.path().join("golden/Xline"));
        assert!(!root.path().join("store").exists());

        let fetched = provider.fetch(&case, &reference, &root.path().join("dest")).await.unwrap();
        assert_eq!(std::fs::read_to_string(fetched).unwrap(), "new\n");
    }
}
