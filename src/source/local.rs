//! Filesystem-backed walker and resolver

use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tracing::debug;

use super::traits::{ResolveError, ShareWalker, UriResolver, WalkControl, WalkError, WalkVisitor};
use super::types::{FileRef, join_path};

type WalkFuture<'a> = Pin<Box<dyn Future<Output = Result<(), WalkError>> + Send + 'a>>;

/// Walks a local directory tree.
///
/// The root id is a directory path. Entries are visited depth-first in name
/// order and every prefix starts with the root directory's own name, so a
/// file `R/sub/a.txt` is reported with prefix `R/sub`. Symlinks and other
/// special entries are skipped.
#[derive(Debug, Clone, Default)]
pub struct LocalTreeWalker;

impl LocalTreeWalker {
    pub fn new() -> Self {
        Self
    }
}

fn transient(path: &Path, err: std::io::Error) -> WalkError {
    WalkError::Transient(format!("{}: {}", path.display(), err))
}

fn file_ref(path: &Path, name: String, metadata: &std::fs::Metadata) -> FileRef {
    let date = metadata
        .modified()
        .map(|modified| DateTime::<Local>::from(modified).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();

    FileRef::new(path.to_string_lossy(), name)
        .with_size(metadata.len().to_string())
        .with_date(date)
}

fn walk_dir<'a>(dir: PathBuf, prefix: String, visitor: &'a mut dyn WalkVisitor) -> WalkFuture<'a> {
    Box::pin(async move {
        let mut reader = tokio::fs::read_dir(&dir).await.map_err(|e| transient(&dir, e))?;
        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await.map_err(|e| transient(&dir, e))? {
            entries.push(entry);
        }
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            let file_type = entry.file_type().await.map_err(|e| transient(&path, e))?;

            if file_type.is_dir() {
                walk_dir(path, join_path(&prefix, &name), &mut *visitor).await?;
            } else if file_type.is_file() {
                let metadata = entry.metadata().await.map_err(|e| transient(&path, e))?;
                let file = file_ref(&path, name, &metadata);
                if visitor.visit(&prefix, &file).await == WalkControl::Stop {
                    return Err(WalkError::Aborted);
                }
            } else {
                debug!(path = %path.display(), "Skipping non-regular entry");
            }
        }

        Ok(())
    })
}

#[async_trait]
impl ShareWalker for LocalTreeWalker {
    async fn walk(&self, root_id: &str, visitor: &mut dyn WalkVisitor) -> Result<(), WalkError> {
        let root = PathBuf::from(root_id);
        let root = tokio::fs::canonicalize(&root)
            .await
            .map_err(|e| transient(&root, e))?;
        let prefix = root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        walk_dir(root, prefix, visitor).await
    }
}

/// Resolves a walked local file to a single `file://` URI.
///
/// A file that vanished since the walk resolves to an empty map.
#[derive(Debug, Clone, Default)]
pub struct LocalResolver;

impl LocalResolver {
    pub const MIRROR: &'static str = "local";

    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl UriResolver for LocalResolver {
    async fn resolve_uris(&self, file: &FileRef) -> Result<BTreeMap<String, String>, ResolveError> {
        let mut uris = BTreeMap::new();
        match tokio::fs::try_exists(&file.id).await {
            Ok(true) => {
                uris.insert(Self::MIRROR.to_string(), format!("file://{}", file.id));
            }
            Ok(false) => {}
            Err(e) => return Err(ResolveError::Failed(format!("{}: {}", file.id, e))),
        }
        Ok(uris)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::humanize::ByteSize;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder {
        seen: Vec<(String, String)>,
        stop_after: Option<usize>,
    }

    #[async_trait]
    impl WalkVisitor for Recorder {
        async fn visit(&mut self, path_prefix: &str, file: &FileRef) -> WalkControl {
            self.seen.push((path_prefix.to_string(), file.name.clone()));
            match self.stop_after {
                Some(limit) if self.seen.len() >= limit => WalkControl::Stop,
                _ => WalkControl::Continue,
            }
        }
    }

    fn fixture() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("R");
        fs::create_dir_all(root.join("sub/deeper")).unwrap();
        fs::write(root.join("b.txt"), b"bb").unwrap();
        fs::write(root.join("a.txt"), b"a").unwrap();
        fs::write(root.join("sub/c.txt"), b"ccc").unwrap();
        fs::write(root.join("sub/deeper/d.txt"), vec![0u8; 2047]).unwrap();
        (temp_dir, root)
    }

    #[tokio::test]
    async fn test_walk_depth_first_sorted() {
        let (_temp_dir, root) = fixture();
        let mut recorder = Recorder::default();

        LocalTreeWalker::new()
            .walk(root.to_str().unwrap(), &mut recorder)
            .await
            .unwrap();

        assert_eq!(
            recorder.seen,
            vec![
                ("R".to_string(), "a.txt".to_string()),
                ("R".to_string(), "b.txt".to_string()),
                ("R/sub".to_string(), "c.txt".to_string()),
                ("R/sub/deeper".to_string(), "d.txt".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_walk_stop_aborts() {
        let (_temp_dir, root) = fixture();
        let mut recorder = Recorder {
            stop_after: Some(2),
            ..Default::default()
        };

        let result = LocalTreeWalker::new()
            .walk(root.to_str().unwrap(), &mut recorder)
            .await;

        assert_eq!(result, Err(WalkError::Aborted));
        assert_eq!(recorder.seen.len(), 2);
    }

    #[tokio::test]
    async fn test_walk_missing_root_is_transient() {
        let temp_dir = TempDir::new().unwrap();
        let mut recorder = Recorder::default();

        let result = LocalTreeWalker::new()
            .walk(temp_dir.path().join("nope").to_str().unwrap(), &mut recorder)
            .await;

        assert!(matches!(result, Err(WalkError::Transient(_))));
    }

    #[tokio::test]
    async fn test_file_ref_metadata() {
        let (_temp_dir, root) = fixture();

        struct Sizes(Vec<Option<ByteSize>>);

        #[async_trait]
        impl WalkVisitor for Sizes {
            async fn visit(&mut self, _path_prefix: &str, file: &FileRef) -> WalkControl {
                assert!(!file.date.is_empty());
                self.0.push(file.size_bytes());
                WalkControl::Continue
            }
        }

        let mut sizes = Sizes(Vec::new());
        LocalTreeWalker::new()
            .walk(root.to_str().unwrap(), &mut sizes)
            .await
            .unwrap();

        // Sizes survive the listing exactly, not as rounded display units
        assert_eq!(
            sizes.0,
            vec![
                Some(ByteSize(1)),
                Some(ByteSize(2)),
                Some(ByteSize(3)),
                Some(ByteSize(2047))
            ]
        );
    }

    #[tokio::test]
    async fn test_resolver() {
        let (_temp_dir, root) = fixture();
        let resolver = LocalResolver::new();

        let present = FileRef::new(root.join("a.txt").to_string_lossy(), "a.txt");
        let uris = resolver.resolve_uris(&present).await.unwrap();
        assert_eq!(
            uris.get(LocalResolver::MIRROR),
            Some(&format!("file://{}", present.id))
        );

        let missing = FileRef::new(root.join("gone.txt").to_string_lossy(), "gone.txt");
        assert!(resolver.resolve_uris(&missing).await.unwrap().is_empty());
    }
}
