use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::application::content::{ContentSource, SourceError};

pub const LOCAL_META_DIR: &str = ".meta.local";

/// Content tree on the local filesystem, used while writing.
#[derive(Debug, Clone)]
pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, SourceError> {
        let relative = Path::new(path.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(SourceError::not_found(path));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ContentSource for LocalSource {
    fn meta_dir(&self) -> &str {
        LOCAL_META_DIR
    }

    async fn read_file(&self, path: &str) -> Result<String, SourceError> {
        let resolved = self.resolve(path)?;
        debug!(
            target = "folio::content::local",
            path = %resolved.display(),
            "Reading content file"
        );
        match tokio::fs::read_to_string(&resolved).await {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(SourceError::not_found(path)),
            Err(err) => Err(SourceError::Io(format!("{}: {err}", resolved.display()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_files_under_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("posts/hello")).expect("mkdir");
        std::fs::write(dir.path().join("posts/hello/en.md"), "# Hello\n").expect("write");

        let source = LocalSource::new(dir.path());
        let content = source.read_file("posts/hello/en.md").await.expect("read");
        assert_eq!(content, "# Hello\n");
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = LocalSource::new(dir.path());

        let err = source.read_file("posts/none/en.md").await.expect_err("missing");
        assert_eq!(err, SourceError::not_found("posts/none/en.md"));
    }

    #[tokio::test]
    async fn parent_components_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = LocalSource::new(dir.path().join("content"));

        let err = source.read_file("../secret.txt").await.expect_err("escape");
        assert!(matches!(err, SourceError::NotFound { .. }));
    }

    #[test]
    fn uses_local_meta_dir() {
        assert_eq!(LocalSource::new("/tmp").meta_dir(), ".meta.local");
    }
}
