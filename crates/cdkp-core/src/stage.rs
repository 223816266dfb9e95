//! Application stage model
//!
//! An [`ApplicationStage`] is the logical deployable unit handed to
//! `add_application_stage`: a named set of stacks, each with the build assets
//! it needs published before it can deploy.

use crate::error::StageError;
use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of build asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetKind {
    /// File or directory bundle
    File,
    /// Container image
    DockerImage,
}

impl AssetKind {
    /// Stable lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::DockerImage => "docker-image",
        }
    }
}

/// Reference to a build asset by content id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetRef {
    /// Content id, shared by every stack using the same asset
    pub id: String,
    /// Asset kind
    pub kind: AssetKind,
}

impl AssetRef {
    /// File asset
    #[must_use]
    pub fn file(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: AssetKind::File,
        }
    }

    /// Container image asset
    #[must_use]
    pub fn docker_image(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: AssetKind::DockerImage,
        }
    }
}

/// One deployable stack of a stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackArtifact {
    /// Stack name, unique within the stage
    pub name: String,
    /// Assets that must be published before deploying
    #[serde(default)]
    pub assets: Vec<AssetRef>,
    /// Stacks of the same stage that must deploy first
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl StackArtifact {
    /// Stack without assets or dependencies
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            assets: Vec::new(),
            depends_on: Vec::new(),
        }
    }

    /// Add a required asset
    #[must_use]
    pub fn with_asset(mut self, asset: AssetRef) -> Self {
        self.assets.push(asset);
        self
    }

    /// Add a dependency on another stack of the stage
    #[must_use]
    pub fn with_dependency(mut self, stack: impl Into<String>) -> Self {
        self.depends_on.push(stack.into());
        self
    }
}

/// A logical application stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationStage {
    /// Stage name; becomes the name of its deployment phase
    pub name: String,
    /// Stacks in declaration order
    #[serde(default)]
    pub stacks: Vec<StackArtifact>,
}

impl ApplicationStage {
    /// Stage without stacks
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stacks: Vec::new(),
        }
    }

    /// Add a stack
    #[must_use]
    pub fn with_stack(mut self, stack: StackArtifact) -> Self {
        self.stacks.push(stack);
        self
    }

    /// Check stack names are unique and dependencies resolve without cycles
    pub fn validate(&self) -> Result<(), StageError> {
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(self.stacks.len());
        for (i, stack) in self.stacks.iter().enumerate() {
            if index.insert(stack.name.as_str(), i).is_some() {
                return Err(StageError::DuplicateStack {
                    stage: self.name.clone(),
                    stack: stack.name.clone(),
                });
            }
        }

        let mut deps = DiGraphMap::<usize, ()>::new();
        for (i, stack) in self.stacks.iter().enumerate() {
            deps.add_node(i);
            for dependency in &stack.depends_on {
                let Some(&from) = index.get(dependency.as_str()) else {
                    return Err(StageError::UnknownStackDependency {
                        stage: self.name.clone(),
                        stack: stack.name.clone(),
                        dependency: dependency.clone(),
                    });
                };
                if from == i {
                    return Err(StageError::CyclicStackDependencies {
                        stage: self.name.clone(),
                    });
                }
                deps.add_edge(from, i, ());
            }
        }

        if petgraph::algo::is_cyclic_directed(&deps) {
            return Err(StageError::CyclicStackDependencies {
                stage: self.name.clone(),
            });
        }
        Ok(())
    }

    /// Every asset of every stack, in stack order, duplicates included
    pub fn assets(&self) -> impl Iterator<Item = &AssetRef> + '_ {
        self.stacks.iter().flat_map(|s| s.assets.iter())
    }
}
