//! Testing utilities for CDKP workspace
//!
//! Shared fakes and fixtures.

#![allow(missing_docs)]

use anyhow::anyhow;
use cdkp_core::{
    ApplicationStage, AssetRef, Attachment, Backend, CdkPipeline, CdkPipelineProps, Deployment,
    DeploymentContext, PipelineScope, Source, StackArtifact, Synth,
};
use cdkp_graph::{ExecutionGraph, PipelineGraph};
use parking_lot::Mutex;
use std::sync::Arc;

/// Backend that keeps a copy of every graph it is asked to render
#[derive(Debug, Default)]
pub struct RecordingBackend {
    renders: Mutex<Vec<(PipelineScope, PipelineGraph)>>,
    fail_with: Option<String>,
}

impl RecordingBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Backend whose every render fails with `message`
    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            renders: Mutex::new(Vec::new()),
            fail_with: Some(message.to_string()),
        })
    }

    pub fn render_count(&self) -> usize {
        self.renders.lock().len()
    }

    /// Graph passed to the most recent render
    pub fn last_graph(&self) -> Option<PipelineGraph> {
        self.renders.lock().last().map(|(_, g)| g.clone())
    }

    pub fn last_scope(&self) -> Option<PipelineScope> {
        self.renders.lock().last().map(|(s, _)| s.clone())
    }
}

impl Backend for RecordingBackend {
    fn render_backend(&self, scope: &PipelineScope, graph: &PipelineGraph) -> anyhow::Result<()> {
        self.renders.lock().push((scope.clone(), graph.clone()));
        match &self.fail_with {
            Some(message) => Err(anyhow!("{message}")),
            None => Ok(()),
        }
    }
}

/// Source adding one action named after itself
#[derive(Debug, Clone)]
pub struct StaticSource {
    pub name: String,
}

impl StaticSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl Source for StaticSource {
    fn add_to_execution_graph(&self, target: &mut Attachment<'_>) -> anyhow::Result<()> {
        target
            .parent()
            .add(ExecutionGraph::new(self.name.as_str()).with_tag("kind", "source"));
        Ok(())
    }
}

/// Synth step adding one action per command
#[derive(Debug, Clone)]
pub struct StaticSynth {
    pub commands: Vec<String>,
}

impl StaticSynth {
    pub fn new(commands: &[&str]) -> Self {
        Self {
            commands: commands.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl Default for StaticSynth {
    fn default() -> Self {
        Self::new(&["Build"])
    }
}

impl Synth for StaticSynth {
    fn add_to_execution_graph(
        &self,
        target: &mut Attachment<'_>,
        scope: &PipelineScope,
    ) -> anyhow::Result<()> {
        for command in &self.commands {
            target.parent().add(
                ExecutionGraph::new(command.as_str())
                    .with_tag("kind", "synth")
                    .with_tag("scope", scope.path()),
            );
        }
        Ok(())
    }
}

/// Source that always fails
#[derive(Debug, Clone, Copy)]
pub struct FailingSource;

impl Source for FailingSource {
    fn add_to_execution_graph(&self, _target: &mut Attachment<'_>) -> anyhow::Result<()> {
        Err(anyhow!("source unavailable"))
    }
}

/// Synth step that always fails
#[derive(Debug, Clone, Copy)]
pub struct FailingSynth;

impl Synth for FailingSynth {
    fn add_to_execution_graph(
        &self,
        _target: &mut Attachment<'_>,
        _scope: &PipelineScope,
    ) -> anyhow::Result<()> {
        Err(anyhow!("synth misconfigured"))
    }
}

/// Deployment that always fails
#[derive(Debug, Clone, Copy)]
pub struct FailingDeployment;

impl Deployment for FailingDeployment {
    fn produce_execution_graph(&self, _ctx: &DeploymentContext<'_>) -> anyhow::Result<ExecutionGraph> {
        Err(anyhow!("deployment rejected"))
    }
}

/// Deployment recording the top-level phase names it saw
#[derive(Debug, Default)]
pub struct ObservingDeployment {
    pub name: String,
    pub seen: Mutex<Vec<String>>,
}

impl ObservingDeployment {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl Deployment for ObservingDeployment {
    fn produce_execution_graph(&self, ctx: &DeploymentContext<'_>) -> anyhow::Result<ExecutionGraph> {
        *self.seen.lock() = ctx
            .pipeline_graph
            .phase_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        Ok(ExecutionGraph::new(self.name.as_str()).with_child(ExecutionGraph::new("Run")))
    }
}

/// Stage with one stack and one file asset named after the stage
pub fn app_stage(name: &str) -> ApplicationStage {
    ApplicationStage::new(name).with_stack(
        StackArtifact::new(format!("{name}Stack")).with_asset(AssetRef::file(format!("{name}-asset"))),
    )
}

/// Props with one source, the default synth and `backend`
pub fn props_with(backend: Arc<dyn Backend>) -> CdkPipelineProps {
    CdkPipelineProps::new(StaticSynth::default())
        .with_source(StaticSource::new("Checkout"))
        .with_backend(backend)
}

/// Pipeline with one source, the default synth and a recording backend
pub fn setup_test_pipeline() -> (CdkPipeline, Arc<RecordingBackend>) {
    let backend = RecordingBackend::new();
    let pipeline = CdkPipeline::new("Pipeline", props_with(backend.clone()))
        .unwrap_or_else(|e| panic!("test pipeline construction failed: {e}"));
    (pipeline, backend)
}

/// Top-level phase names, reserved stages included
pub fn phase_names(graph: &PipelineGraph) -> Vec<String> {
    graph.phase_names().into_iter().map(str::to_string).collect()
}
