//! Error types for CDKP Core
//!
//! - Lifecycle violations of the orchestrator (mutation or render after build)
//! - Application stage declarations that cannot be materialized
//! - Plan validation failures raised by the default backend
//! - Configuration parsing failures
//!
//! Collaborators report failures through `anyhow`; the orchestrator passes
//! them to the caller untouched.

/// Main orchestrator error type
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Mutation attempted after the pipeline was built
    #[error("immutable: cannot {operation} after the pipeline has been built")]
    Immutable {
        /// The rejected operation
        operation: &'static str,
    },

    /// Explicit render requested a second time
    #[error("can only render the pipeline once")]
    AlreadyBuilt,

    /// Configuration could not be parsed
    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Failure raised by a source, synth, deployment or backend
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

impl PipelineError {
    /// True for errors caused by calling the orchestrator in the wrong state
    #[inline]
    #[must_use]
    pub fn is_lifecycle_violation(&self) -> bool {
        matches!(self, Self::Immutable { .. } | Self::AlreadyBuilt)
    }

    /// Downcast a collaborator failure to its concrete type
    #[must_use]
    pub fn collaborator_error<E>(&self) -> Option<&E>
    where
        E: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
    {
        match self {
            Self::Collaborator(e) => e.downcast_ref::<E>(),
            _ => None,
        }
    }
}

/// Application stage declarations that cannot become a deployment
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StageError {
    /// Two stacks share a name inside one stage
    #[error("stage {stage}: duplicate stack {stack}")]
    DuplicateStack {
        /// Stage name
        stage: String,
        /// Repeated stack name
        stack: String,
    },

    /// A stack depends on a stack the stage does not contain
    #[error("stage {stage}: stack {stack} depends on unknown stack {dependency}")]
    UnknownStackDependency {
        /// Stage name
        stage: String,
        /// Dependent stack
        stack: String,
        /// Missing dependency
        dependency: String,
    },

    /// Stack dependencies form a cycle
    #[error("stage {stage}: cyclic stack dependencies")]
    CyclicStackDependencies {
        /// Stage name
        stage: String,
    },
}

/// Plan validation failures raised while rendering
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// Two siblings share a name
    #[error("duplicate node name {name} under {parent}")]
    DuplicateName {
        /// Path of the parent node
        parent: String,
        /// Repeated name
        name: String,
    },

    /// A node depends on a sibling that does not exist
    #[error("node {node} depends on missing sibling {dependency}")]
    DanglingDependency {
        /// Path of the dependent node
        node: String,
        /// Missing sibling name
        dependency: String,
    },

    /// Sibling dependencies form a cycle
    #[error("cyclic dependencies under {parent}")]
    DependencyCycle {
        /// Path of the parent node
        parent: String,
    },

    /// A required stage has no actions
    #[error("stage {0} has no actions")]
    EmptyStage(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_classification() {
        assert!(PipelineError::AlreadyBuilt.is_lifecycle_violation());
        assert!(PipelineError::Immutable { operation: "add" }.is_lifecycle_violation());
        assert!(!PipelineError::from(anyhow::anyhow!("boom")).is_lifecycle_violation());
    }

    #[test]
    fn collaborator_errors_are_transparent() {
        let err = PipelineError::from(anyhow::Error::new(RenderError::EmptyStage("Synth".into())));
        assert_eq!(err.to_string(), "stage Synth has no actions");
        assert_eq!(
            err.collaborator_error::<RenderError>(),
            Some(&RenderError::EmptyStage("Synth".into()))
        );
        assert!(err.collaborator_error::<StageError>().is_none());
    }

    #[test]
    fn immutable_message_names_operation() {
        let err = PipelineError::Immutable {
            operation: "add an application stage",
        };
        assert_eq!(
            err.to_string(),
            "immutable: cannot add an application stage after the pipeline has been built"
        );
    }
}
