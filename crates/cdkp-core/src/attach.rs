//! Attachment slots for eager contributors
//!
//! Sources and the synth step write straight into a reserved stage of the
//! pipeline graph while the orchestrator is being constructed.

use cdkp_graph::{ExecutionGraph, PipelineGraph};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Source,
    Synth,
}

/// Write access to one reserved stage plus read access to the whole graph
#[derive(Debug)]
pub struct Attachment<'a> {
    graph: &'a mut PipelineGraph,
    slot: Slot,
}

impl<'a> Attachment<'a> {
    pub(crate) fn source(graph: &'a mut PipelineGraph) -> Self {
        Self {
            graph,
            slot: Slot::Source,
        }
    }

    pub(crate) fn synth(graph: &'a mut PipelineGraph) -> Self {
        Self {
            graph,
            slot: Slot::Synth,
        }
    }

    /// The pipeline graph as assembled so far
    #[inline]
    #[must_use]
    pub fn root(&self) -> &PipelineGraph {
        &*self.graph
    }

    /// The reserved stage this contributor attaches into
    pub fn parent(&mut self) -> &mut ExecutionGraph {
        match self.slot {
            Slot::Source => self.graph.source_stage_mut(),
            Slot::Synth => self.graph.synth_stage_mut(),
        }
    }
}
