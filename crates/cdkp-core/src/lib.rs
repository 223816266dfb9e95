//! CDKP Core - Pipeline orchestrator
//!
//! Assembles the execution plan of a deployment pipeline and hands it to a
//! rendering backend exactly once:
//! - Sources and the synth step attach eagerly at construction
//! - Application stages and deployment groups append phases in call order
//! - Asset publishing is decided by a pluggable policy
//! - Rendering freezes the pipeline
//!
//! # Example
//!
//! ```rust,ignore
//! use cdkp_core::prelude::*;
//!
//! let pipeline = CdkPipeline::new("Pipeline", CdkPipelineProps::new(synth).with_source(repo))?;
//!
//! let prod = pipeline.add_deployment_group("Prod")?;
//! pipeline.add_application_stage(beta, AddApplicationOptions::new())?;
//! prod.add_application_stage(eu, AddApplicationOptions::new().with_approver(ManualApproval::new("Promote")))?;
//!
//! pipeline.render_to_backend()?;
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

// Core modules
pub mod approver;
pub mod asset_publishing;
pub mod attach;
pub mod backend;
pub mod config;
pub mod deployment;
pub mod error;
pub mod group;
pub mod logging;
pub mod pipeline;
pub mod scope;
pub mod source;
pub mod stage;
pub mod synth;

// Re-exports for convenience
pub use approver::{Approver, ManualApproval};
pub use asset_publishing::{
    AssetPublishingPlan, AssetPublishingStrategy, Placement, PrepublishAll, PublishAction,
    PublishPerDeployment,
};
pub use attach::Attachment;
pub use backend::{Backend, CodePipelineBackend, RenderedAction, RenderedPipeline, RenderedStage};
pub use config::{BackendConfig, LoggingConfig, PipelineConfig};
pub use deployment::{AddApplicationOptions, CdkStageDeployment, Deployment, DeploymentContext};
pub use error::{PipelineError, RenderError, StageError};
pub use group::DeploymentGroup;
pub use logging::init_logging;
pub use pipeline::{CdkPipeline, CdkPipelineProps};
pub use scope::PipelineScope;
pub use source::Source;
pub use stage::{ApplicationStage, AssetKind, AssetRef, StackArtifact};
pub use synth::Synth;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for assembling a pipeline
    pub use crate::{
        AddApplicationOptions, ApplicationStage, AssetRef, Attachment, Backend, CdkPipeline,
        CdkPipelineProps, DeploymentGroup, ManualApproval, PipelineConfig, PipelineError,
        PipelineScope, Source, StackArtifact, Synth,
    };
    pub use cdkp_graph::{ExecutionGraph, PipelineGraph};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
