//! Share-side collaborators: tree walking and URI resolution
//!
//! The dispatch pipeline only sees these through the [`ShareWalker`] and
//! [`UriResolver`] traits. [`local`] provides filesystem-backed
//! implementations used by the binary and the integration tests.

pub mod local;
pub mod traits;
pub mod types;

pub use local::{LocalResolver, LocalTreeWalker};
pub use traits::{ResolveError, ShareWalker, UriResolver, WalkControl, WalkError, WalkVisitor};
pub use types::{FileRef, join_path};
