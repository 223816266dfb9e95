//! CDKP Graph
//!
//! The backend-agnostic plan of a deployment pipeline.
//!
//! # Core Concepts
//!
//! - [`ExecutionGraph`]: a named node with ordered children; phases have
//!   children, actions are leaves
//! - [`PipelineGraph`]: the root, with the reserved source and synth stages
//!   always ahead of user phases
//!
//! Both types only accumulate structure. Validation happens when a backend
//! renders the finished plan.
//!
//! # Example
//!
//! ```rust
//! use cdkp_graph::{ExecutionGraph, PipelineGraph};
//!
//! let mut graph = PipelineGraph::new();
//! graph.synth_stage_mut().add(ExecutionGraph::new("Build"));
//! graph.add(ExecutionGraph::new("Beta"));
//!
//! assert_eq!(graph.phase_names(), vec!["Source", "Synth", "Beta"]);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod graph;
mod pipeline;

pub use graph::{tags, ExecutionGraph};
pub use pipeline::{PhaseId, PipelineGraph, PipelineGraphError, PIPELINE_ROOT, SOURCE_STAGE, SYNTH_STAGE};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
