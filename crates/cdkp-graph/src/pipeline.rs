//! Pipeline root graph
//!
//! [`PipelineGraph`] is the root [`ExecutionGraph`] of a pipeline. It always
//! starts with the source stage and the synth stage, in that order, so every
//! phase appended later sits after them positionally.

use crate::graph::{tags, ExecutionGraph};
use serde::{Deserialize, Serialize, Serializer};
use std::ops::Deref;
use thiserror::Error;

/// Name of the root node
pub const PIPELINE_ROOT: &str = "Pipeline";
/// Name of the reserved source stage
pub const SOURCE_STAGE: &str = "Source";
/// Name of the reserved synth stage
pub const SYNTH_STAGE: &str = "Synth";

const SOURCE_INDEX: usize = 0;
const SYNTH_INDEX: usize = 1;
const RESERVED: usize = 2;

/// Position of a top-level phase inside a [`PipelineGraph`]
///
/// The graph is append-only, so a position stays valid for the lifetime of
/// the graph that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhaseId(usize);

impl PhaseId {
    /// Zero-based position among the root's children
    #[inline]
    #[must_use]
    pub fn position(self) -> usize {
        self.0
    }
}

/// A tree that cannot be read back as a [`PipelineGraph`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineGraphError {
    /// A reserved stage is missing or out of place
    #[error("expected reserved stage {expected:?} at position {position}, found {found:?}")]
    ReservedStage {
        /// Required position among the root's children
        position: usize,
        /// Name required there
        expected: &'static str,
        /// Name actually there, if any
        found: Option<String>,
    },
}

/// Root of a pipeline plan
///
/// Serializes as its plain root tree. Deserializing checks that the reserved
/// stages lead the root's children.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "ExecutionGraph")]
pub struct PipelineGraph {
    root: ExecutionGraph,
}

impl PipelineGraph {
    /// Create a graph holding only the empty source and synth stages
    #[must_use]
    pub fn new() -> Self {
        let mut root = ExecutionGraph::new(PIPELINE_ROOT);
        root.add(ExecutionGraph::new(SOURCE_STAGE).with_tag(tags::KIND, "source"));
        root.add(ExecutionGraph::new(SYNTH_STAGE).with_tag(tags::KIND, "synth"));
        Self { root }
    }

    /// The whole tree, reserved stages included
    #[inline]
    #[must_use]
    pub fn root(&self) -> &ExecutionGraph {
        &self.root
    }

    /// Reserved source stage
    #[must_use]
    pub fn source_stage(&self) -> &ExecutionGraph {
        &self.root.children()[SOURCE_INDEX]
    }

    /// Reserved synth stage
    #[must_use]
    pub fn synth_stage(&self) -> &ExecutionGraph {
        &self.root.children()[SYNTH_INDEX]
    }

    /// Mutable source stage, the attachment slot for sources
    pub fn source_stage_mut(&mut self) -> &mut ExecutionGraph {
        self.reserved_mut(SOURCE_INDEX)
    }

    /// Mutable synth stage, the attachment slot for the synth step
    pub fn synth_stage_mut(&mut self) -> &mut ExecutionGraph {
        self.reserved_mut(SYNTH_INDEX)
    }

    fn reserved_mut(&mut self, index: usize) -> &mut ExecutionGraph {
        match self.root.child_at_mut(index) {
            Some(stage) => stage,
            None => unreachable!("reserved stages are created in PipelineGraph::new"),
        }
    }

    /// Append a top-level phase after everything added so far
    pub fn add(&mut self, phase: ExecutionGraph) -> PhaseId {
        let id = self.next_phase();
        self.root.add(phase);
        id
    }

    /// Id the next appended phase will get
    #[inline]
    #[must_use]
    pub fn next_phase(&self) -> PhaseId {
        PhaseId(self.root.len())
    }

    /// User phases in call order, reserved stages excluded
    #[must_use]
    pub fn phases(&self) -> &[ExecutionGraph] {
        &self.root.children()[RESERVED..]
    }

    /// Names of every top-level child, reserved stages first
    #[must_use]
    pub fn phase_names(&self) -> Vec<&str> {
        self.root.children().iter().map(ExecutionGraph::name).collect()
    }

    /// Top-level phase at `id`
    #[must_use]
    pub fn phase(&self, id: PhaseId) -> Option<&ExecutionGraph> {
        self.root.children().get(id.0)
    }

    /// Mutable top-level phase at `id`
    ///
    /// Reserved stages are reachable only through their dedicated accessors.
    pub fn phase_mut(&mut self, id: PhaseId) -> Option<&mut ExecutionGraph> {
        if id.0 < RESERVED {
            return None;
        }
        self.root.child_at_mut(id.0)
    }
}

impl Default for PipelineGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl Serialize for PipelineGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.root.serialize(serializer)
    }
}

impl TryFrom<ExecutionGraph> for PipelineGraph {
    type Error = PipelineGraphError;

    fn try_from(root: ExecutionGraph) -> Result<Self, Self::Error> {
        for (position, expected) in [(SOURCE_INDEX, SOURCE_STAGE), (SYNTH_INDEX, SYNTH_STAGE)] {
            let found = root.children().get(position).map(ExecutionGraph::name);
            if found != Some(expected) {
                return Err(PipelineGraphError::ReservedStage {
                    position,
                    expected,
                    found: found.map(str::to_string),
                });
            }
        }
        Ok(Self { root })
    }
}

impl Deref for PipelineGraph {
    type Target = ExecutionGraph;

    fn deref(&self) -> &ExecutionGraph {
        &self.root
    }
}
