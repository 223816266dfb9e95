//! Source contract
//!
//! Concrete providers (repository checkouts, artifact buckets, ...) live
//! outside this crate.

use crate::attach::Attachment;
use std::fmt::Debug;

/// Something that contributes source actions to the pipeline
pub trait Source: Send + Sync + Debug {
    /// Attach this source's nodes into `target.parent()` (the source stage)
    ///
    /// Called once per source while the orchestrator is constructed.
    fn add_to_execution_graph(&self, target: &mut Attachment<'_>) -> anyhow::Result<()>;
}
