use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

use super::types::FileRef;

/// Walk errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalkError {
    /// The visitor asked the walk to stop
    #[error("walk aborted by visitor")]
    Aborted,
    /// Listing failed in a way that may clear up on its own
    #[error("listing failed: {0}")]
    Transient(String),
}

/// URI resolution errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no download uris resolved")]
    NoUris,
    #[error("resolution failed: {0}")]
    Failed(String),
}

/// Whether a walk should keep going after a visited entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkControl {
    Continue,
    Stop,
}

/// Callback invoked once per file entry, in traversal order.
///
/// The visitor may suspend (e.g. waiting for queue capacity); the walker
/// awaits it before moving to the next entry.
#[async_trait]
pub trait WalkVisitor: Send {
    async fn visit(&mut self, path_prefix: &str, file: &FileRef) -> WalkControl;
}

/// Depth-first traversal of a root's file tree.
///
/// Implementations call the visitor once per leaf entry with the accumulated
/// directory prefix. A `WalkControl::Stop` from the visitor ends the walk with
/// `WalkError::Aborted`; every other failure is `WalkError::Transient`.
#[async_trait]
pub trait ShareWalker: Send + Sync {
    async fn walk(&self, root_id: &str, visitor: &mut dyn WalkVisitor) -> Result<(), WalkError>;
}

/// Turns a discovered entry into downloadable URIs, keyed by mirror name
#[async_trait]
pub trait UriResolver: Send + Sync {
    async fn resolve_uris(&self, file: &FileRef) -> Result<BTreeMap<String, String>, ResolveError>;
}
