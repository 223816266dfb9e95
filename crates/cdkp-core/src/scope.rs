//! Rendering scope handed to collaborators

use serde::{Deserialize, Serialize};

/// Identity of the pipeline being assembled
///
/// Stands in for the host framework's construct node: collaborators use it to
/// name what they create, the backend uses it to name the rendered pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PipelineScope {
    id: String,
    path: String,
}

impl PipelineScope {
    /// Top-level scope; its path is its id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            path: id.clone(),
            id,
        }
    }

    /// Place this scope under `parent` (a `/`-separated construct path)
    #[must_use]
    pub fn under(mut self, parent: &str) -> Self {
        if !parent.is_empty() {
            self.path = format!("{parent}/{}", self.id);
        }
        self
    }

    /// Local id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Full construct path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}
