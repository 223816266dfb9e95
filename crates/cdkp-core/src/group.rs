//! Deployment group handles

use crate::deployment::{AddApplicationOptions, CdkStageDeployment, Deployment};
use crate::error::PipelineError;
use crate::pipeline::Shared;
use crate::stage::ApplicationStage;
use cdkp_graph::PhaseId;
use std::sync::Arc;

/// Handle to a named phase created by `CdkPipeline::add_deployment_group`
///
/// Deployments added here land under the group's phase, which keeps the
/// position it got at creation.
#[derive(Debug, Clone)]
pub struct DeploymentGroup {
    name: String,
    phase: PhaseId,
    shared: Arc<Shared>,
}

impl DeploymentGroup {
    pub(crate) fn new(name: String, phase: PhaseId, shared: Arc<Shared>) -> Self {
        Self { name, phase, shared }
    }

    /// Group (and phase) name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position of the group's phase in the pipeline graph
    #[inline]
    #[must_use]
    pub fn phase_id(&self) -> PhaseId {
        self.phase
    }

    /// Deploy an application stage inside this group
    pub fn add_application_stage(
        &self,
        stage: ApplicationStage,
        options: AddApplicationOptions,
    ) -> Result<(), PipelineError> {
        self.add_deployment(&CdkStageDeployment::new(stage, options))
    }

    /// Materialize `deployment` and append it under this group's phase
    ///
    /// With `seal_groups_on_build` off, this keeps working after the pipeline
    /// is built; the addition then never reaches the backend.
    pub fn add_deployment(&self, deployment: &dyn Deployment) -> Result<(), PipelineError> {
        let mut state = self.shared.state.lock();
        if state.built && self.shared.seal_groups_on_build {
            tracing::warn!(group = %self.name, "rejected group deployment after build");
            return Err(PipelineError::Immutable {
                operation: "add a deployment to a group",
            });
        }

        let subtree = self.shared.materialize(&state, self.phase, deployment)?;
        tracing::debug!(group = %self.name, deployment = subtree.name(), "appending to group");
        match state.graph.phase_mut(self.phase) {
            Some(phase) => {
                phase.add(subtree);
            }
            None => unreachable!("group phases are never removed from the append-only graph"),
        }
        Ok(())
    }
}
