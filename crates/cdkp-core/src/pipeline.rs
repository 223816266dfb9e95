//! Pipeline orchestrator
//!
//! [`CdkPipeline`] owns the [`PipelineGraph`] for one pipeline and funnels
//! every mutation through its own methods:
//!
//! 1. **Construction**: sources and the synth step attach eagerly into the
//!    reserved stages.
//! 2. **Build phase**: application stages and deployment groups are appended
//!    as top-level phases in call order.
//! 3. **Render**: the finished graph goes to the backend exactly once, after
//!    which the pipeline is immutable.

use crate::asset_publishing::{AssetPublishingStrategy, PrepublishAll};
use crate::attach::Attachment;
use crate::backend::{Backend, CodePipelineBackend};
use crate::config::PipelineConfig;
use crate::deployment::{AddApplicationOptions, CdkStageDeployment, Deployment, DeploymentContext};
use crate::error::PipelineError;
use crate::group::DeploymentGroup;
use crate::scope::PipelineScope;
use crate::source::Source;
use crate::stage::ApplicationStage;
use crate::synth::Synth;
use cdkp_graph::{ExecutionGraph, PhaseId, PipelineGraph};
use parking_lot::Mutex;
use std::sync::Arc;

/// Construction properties for [`CdkPipeline`]
#[derive(Debug)]
pub struct CdkPipelineProps {
    /// Sources, attached in order (optional for some backends)
    pub sources: Vec<Box<dyn Source>>,
    /// Synth step
    pub synth: Box<dyn Synth>,
    /// Asset publishing policy; defaults to [`PrepublishAll`]
    pub asset_publishing: Option<Arc<dyn AssetPublishingStrategy>>,
    /// Rendering backend; defaults to [`CodePipelineBackend`]
    pub backend: Option<Arc<dyn Backend>>,
    /// Orchestrator configuration
    pub config: PipelineConfig,
}

impl CdkPipelineProps {
    /// Properties with only the required synth step
    #[must_use]
    pub fn new(synth: impl Synth + 'static) -> Self {
        Self {
            sources: Vec::new(),
            synth: Box::new(synth),
            asset_publishing: None,
            backend: None,
            config: PipelineConfig::default(),
        }
    }

    /// Add a source
    #[must_use]
    pub fn with_source(mut self, source: impl Source + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Use a specific asset publishing policy
    #[must_use]
    pub fn with_asset_publishing(mut self, strategy: Arc<dyn AssetPublishingStrategy>) -> Self {
        self.asset_publishing = Some(strategy);
        self
    }

    /// Use a specific backend
    #[must_use]
    pub fn with_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Use a specific configuration
    #[must_use]
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }
}

#[derive(Debug)]
pub(crate) struct PipelineState {
    pub(crate) graph: PipelineGraph,
    pub(crate) built: bool,
}

/// State shared between the orchestrator and its group handles
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) scope: PipelineScope,
    pub(crate) asset_publishing: Arc<dyn AssetPublishingStrategy>,
    pub(crate) seal_groups_on_build: bool,
    pub(crate) state: Mutex<PipelineState>,
}

impl Shared {
    /// Materialize `deployment` for `target` against the graph as it stands
    pub(crate) fn materialize(
        &self,
        state: &PipelineState,
        target: PhaseId,
        deployment: &dyn Deployment,
    ) -> Result<ExecutionGraph, PipelineError> {
        let ctx = DeploymentContext {
            scope: &self.scope,
            pipeline_graph: &state.graph,
            target,
            asset_publishing: self.asset_publishing.as_ref(),
        };
        Ok(deployment.produce_execution_graph(&ctx)?)
    }
}

/// Orchestrator for one deployment pipeline
///
/// Mutation methods take `&self`; the graph sits behind a lock shared with
/// every [`DeploymentGroup`] handle. Use from one thread at a time.
#[derive(Debug)]
pub struct CdkPipeline {
    shared: Arc<Shared>,
    backend: Arc<dyn Backend>,
    default_backend: Option<Arc<CodePipelineBackend>>,
}

impl CdkPipeline {
    /// Create the pipeline and attach sources and synth
    ///
    /// Sources attach in declaration order, then the synth step. A failing
    /// collaborator aborts construction with its error unchanged.
    pub fn new(id: impl Into<String>, props: CdkPipelineProps) -> Result<Self, PipelineError> {
        let scope = PipelineScope::new(id);
        Self::with_scope(scope, props)
    }

    /// Create the pipeline under an explicit scope
    pub fn with_scope(scope: PipelineScope, props: CdkPipelineProps) -> Result<Self, PipelineError> {
        let CdkPipelineProps {
            sources,
            synth,
            asset_publishing,
            backend,
            config,
        } = props;

        let (backend, default_backend) = match backend {
            Some(backend) => (backend, None),
            None => {
                let default = Arc::new(CodePipelineBackend::with_config(config.backend.clone()));
                (Arc::clone(&default) as Arc<dyn Backend>, Some(default))
            }
        };
        let asset_publishing = asset_publishing.unwrap_or_else(|| Arc::new(PrepublishAll::new()));

        let mut graph = PipelineGraph::new();
        for source in &sources {
            source.add_to_execution_graph(&mut Attachment::source(&mut graph))?;
        }
        synth.add_to_execution_graph(&mut Attachment::synth(&mut graph), &scope)?;

        tracing::info!(
            pipeline = scope.path(),
            sources = sources.len(),
            asset_publishing = asset_publishing.name(),
            "pipeline created"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                scope,
                asset_publishing,
                seal_groups_on_build: config.seal_groups_on_build,
                state: Mutex::new(PipelineState { graph, built: false }),
            }),
            backend,
            default_backend,
        })
    }

    /// Create, populate with `f`, then finalize
    ///
    /// The scoped form of the build lifecycle: rendering happens when `f`
    /// returns unless `f` rendered explicitly.
    pub fn build<F>(id: impl Into<String>, props: CdkPipelineProps, f: F) -> Result<Self, PipelineError>
    where
        F: FnOnce(&CdkPipeline) -> Result<(), PipelineError>,
    {
        let pipeline = Self::new(id, props)?;
        f(&pipeline)?;
        pipeline.finalize()?;
        Ok(pipeline)
    }

    /// Scope handed to collaborators and the backend
    #[inline]
    #[must_use]
    pub fn scope(&self) -> &PipelineScope {
        &self.shared.scope
    }

    /// Backend the graph is rendered to
    #[inline]
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// The built-in backend, when none was supplied in the props
    ///
    /// Read the rendered plan from it after rendering.
    #[inline]
    #[must_use]
    pub fn default_backend(&self) -> Option<&Arc<CodePipelineBackend>> {
        self.default_backend.as_ref()
    }

    /// True once the graph has been rendered
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.shared.state.lock().built
    }

    /// Snapshot of the graph as assembled so far
    #[must_use]
    pub fn graph(&self) -> PipelineGraph {
        self.shared.state.lock().graph.clone()
    }

    /// Deploy an application stage as a new top-level phase
    pub fn add_application_stage(
        &self,
        stage: ApplicationStage,
        options: AddApplicationOptions,
    ) -> Result<(), PipelineError> {
        self.add_deployment(&CdkStageDeployment::new(stage, options))
    }

    /// Materialize `deployment` and append it as a new top-level phase
    pub fn add_deployment(&self, deployment: &dyn Deployment) -> Result<(), PipelineError> {
        let mut state = self.shared.state.lock();
        if state.built {
            tracing::warn!(pipeline = self.scope().path(), "rejected deployment after build");
            return Err(PipelineError::Immutable {
                operation: "add a deployment",
            });
        }

        let target = state.graph.next_phase();
        let phase = self.shared.materialize(&state, target, deployment)?;
        tracing::debug!(pipeline = self.scope().path(), phase = phase.name(), "appending phase");
        state.graph.add(phase);
        Ok(())
    }

    /// Create a named phase now and return a handle for filling it later
    ///
    /// The phase takes its position at call time, whatever is added to it
    /// afterwards.
    pub fn add_deployment_group(&self, name: impl Into<String>) -> Result<DeploymentGroup, PipelineError> {
        let name = name.into();
        let mut state = self.shared.state.lock();
        if state.built {
            tracing::warn!(pipeline = self.scope().path(), group = %name, "rejected group after build");
            return Err(PipelineError::Immutable {
                operation: "add a deployment group",
            });
        }

        let phase = state
            .graph
            .add(ExecutionGraph::new(name.as_str()).with_tag(cdkp_graph::tags::KIND, "group"));
        tracing::debug!(pipeline = self.scope().path(), group = %name, "created deployment group");

        Ok(DeploymentGroup::new(name, phase, Arc::clone(&self.shared)))
    }

    /// Hand the graph to the backend; allowed once
    ///
    /// The pipeline becomes immutable when the backend returns successfully.
    /// A backend failure is returned unchanged and leaves the pipeline
    /// unbuilt.
    pub fn render_to_backend(&self) -> Result<(), PipelineError> {
        let mut state = self.shared.state.lock();
        if state.built {
            return Err(PipelineError::AlreadyBuilt);
        }

        self.backend.render_backend(&self.shared.scope, &state.graph)?;
        state.built = true;
        tracing::info!(
            pipeline = self.scope().path(),
            phases = state.graph.phases().len(),
            "pipeline rendered"
        );
        Ok(())
    }

    /// Render unless already rendered
    pub fn finalize(&self) -> Result<(), PipelineError> {
        if self.is_built() {
            return Ok(());
        }
        self.render_to_backend()
    }
}
