//! Deployment materialization
//!
//! A [`Deployment`] turns a declared intent into an [`ExecutionGraph`]
//! subtree. It reads the pipeline graph and the asset publishing policy but
//! never inserts anything: placing the subtree is the caller's job.

use crate::approver::Approver;
use crate::asset_publishing::{publish_node, AssetPublishingStrategy};
use crate::scope::PipelineScope;
use crate::stage::ApplicationStage;
use cdkp_graph::{tags, ExecutionGraph, PhaseId, PipelineGraph};
use std::fmt::Debug;
use std::sync::Arc;

/// Name of the node holding assets published ahead of a deployment
pub const ASSETS_NODE: &str = "Assets";

/// Everything a deployment may consult while materializing
#[derive(Debug, Clone, Copy)]
pub struct DeploymentContext<'a> {
    /// Scope of the owning pipeline
    pub scope: &'a PipelineScope,
    /// The pipeline graph as assembled so far
    pub pipeline_graph: &'a PipelineGraph,
    /// Top-level phase the produced subtree becomes or joins
    pub target: PhaseId,
    /// The pipeline's asset publishing policy
    pub asset_publishing: &'a dyn AssetPublishingStrategy,
}

/// Something that can materialize itself into an execution subtree
pub trait Deployment: Send + Sync + Debug {
    /// Produce the subtree for this deployment
    ///
    /// Called once, at the time the deployment is added.
    fn produce_execution_graph(&self, ctx: &DeploymentContext<'_>) -> anyhow::Result<ExecutionGraph>;
}

/// Options for `add_application_stage`
#[derive(Debug, Clone, Default)]
pub struct AddApplicationOptions {
    /// Approval gates run after the stage is deployed
    pub approvers: Vec<Arc<dyn Approver>>,
}

impl AddApplicationOptions {
    /// Options without approvers
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an approver
    #[must_use]
    pub fn with_approver(mut self, approver: impl Approver + 'static) -> Self {
        self.approvers.push(Arc::new(approver));
        self
    }
}

/// Deploys one application stage, then runs its approvers
///
/// The produced phase is named after the stage and holds, in order:
/// the [`ASSETS_NODE`] (if the policy publishes ahead of the deployment),
/// per-stack publish actions and deploy actions in stack order, then one
/// node per approver. Ordering between them is explicit through
/// `depends_on`.
#[derive(Debug, Clone)]
pub struct CdkStageDeployment {
    stage: ApplicationStage,
    options: AddApplicationOptions,
}

impl CdkStageDeployment {
    /// Wrap `stage` and its options
    #[must_use]
    pub fn new(stage: ApplicationStage, options: AddApplicationOptions) -> Self {
        Self { stage, options }
    }

    /// The wrapped stage
    #[inline]
    #[must_use]
    pub fn stage(&self) -> &ApplicationStage {
        &self.stage
    }
}

fn deploy_action_name(stack: &str) -> String {
    format!("{stack}.Deploy")
}

fn publish_action_name(stack: &str, asset: &str) -> String {
    format!("{stack}.Publish.{asset}")
}

impl Deployment for CdkStageDeployment {
    fn produce_execution_graph(&self, ctx: &DeploymentContext<'_>) -> anyhow::Result<ExecutionGraph> {
        self.stage.validate()?;

        let plan = ctx.asset_publishing.plan(ctx.pipeline_graph, ctx.target, &self.stage);
        tracing::debug!(
            stage = %self.stage.name,
            strategy = ctx.asset_publishing.name(),
            publish_actions = plan.actions.len(),
            "materializing stage deployment"
        );

        let mut phase = ExecutionGraph::new(&self.stage.name).with_tag(tags::KIND, "deployment");

        let mut assets = ExecutionGraph::new(ASSETS_NODE).with_tag(tags::KIND, "assets");
        for asset in plan.before_deployment() {
            assets.add(publish_node(format!("Publish.{}", asset.id), asset));
        }
        let has_assets = !assets.is_empty();
        if has_assets {
            phase.add(assets);
        }

        let mut deploys = Vec::with_capacity(self.stage.stacks.len());
        for stack in &self.stage.stacks {
            let mut deploy = ExecutionGraph::new(deploy_action_name(&stack.name))
                .with_tag(tags::KIND, "deploy")
                .with_tag(tags::STACK, stack.name.as_str());
            if has_assets {
                deploy.add_dependency(ASSETS_NODE);
            }
            for dependency in &stack.depends_on {
                deploy.add_dependency(deploy_action_name(dependency));
            }

            for asset in plan.before_stack(&stack.name) {
                let name = publish_action_name(&stack.name, &asset.id);
                let mut publish = publish_node(name.as_str(), asset);
                if has_assets {
                    publish.add_dependency(ASSETS_NODE);
                }
                phase.add(publish);
                deploy.add_dependency(name);
            }

            deploys.push(deploy.name().to_string());
            phase.add(deploy);
        }

        for approver in &self.options.approvers {
            let mut approval = approver.produce_action();
            for deploy in &deploys {
                approval.add_dependency(deploy.as_str());
            }
            if deploys.is_empty() && has_assets {
                approval.add_dependency(ASSETS_NODE);
            }
            phase.add(approval);
        }

        Ok(phase)
    }
}
