//! Approval gates that run after an application stage deploys

use cdkp_graph::{tags, ExecutionGraph};
use std::fmt::Debug;

/// Produces the approval node appended after a stage's deploy actions
pub trait Approver: Send + Sync + Debug {
    /// Build the approval node; the caller adds ordering dependencies
    fn produce_action(&self) -> ExecutionGraph;
}

/// A human sign-off step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualApproval {
    name: String,
    comment: Option<String>,
}

impl ManualApproval {
    /// Approval named `name`
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            comment: None,
        }
    }

    /// Text shown to the approver
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

impl Approver for ManualApproval {
    fn produce_action(&self) -> ExecutionGraph {
        let mut node = ExecutionGraph::new(&self.name)
            .with_tag(tags::KIND, "approval")
            .with_tag(tags::APPROVAL, "manual");
        if let Some(comment) = &self.comment {
            node.set_tag("comment", comment);
        }
        node
    }
}
