//! Rendering backends
//!
//! A [`Backend`] receives the finished plan exactly once and turns it into
//! whatever the target orchestration service needs. [`CodePipelineBackend`]
//! is the default.

mod code_pipeline;

pub use code_pipeline::{CodePipelineBackend, RenderedAction, RenderedPipeline, RenderedStage};

use crate::scope::PipelineScope;
use cdkp_graph::PipelineGraph;
use std::fmt::Debug;

/// Consumer of the finished pipeline graph
pub trait Backend: Send + Sync + Debug {
    /// Render `graph` for `scope`
    ///
    /// Called at most once per pipeline. Validation of the plan (duplicate
    /// names, dependency cycles, missing stages) belongs here.
    fn render_backend(&self, scope: &PipelineScope, graph: &PipelineGraph) -> anyhow::Result<()>;
}
