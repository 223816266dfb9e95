//! Synth contract

use crate::attach::Attachment;
use crate::scope::PipelineScope;
use std::fmt::Debug;

/// The build step that turns source into deployable output
pub trait Synth: Send + Sync + Debug {
    /// Attach this step's nodes into `target.parent()` (the synth stage)
    ///
    /// Called exactly once, after every source has been attached.
    fn add_to_execution_graph(
        &self,
        target: &mut Attachment<'_>,
        scope: &PipelineScope,
    ) -> anyhow::Result<()>;
}
