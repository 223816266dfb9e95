//! Execution graph nodes
//!
//! An [`ExecutionGraph`] is a named node that owns an ordered list of child
//! nodes. Phases are nodes with children; actions are leaves. The structure is
//! a tree: every node is owned by exactly one parent, and ordering between
//! sibling subtrees is expressed through [`ExecutionGraph::depends_on`] rather
//! than shared ownership.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known tag keys set by graph contributors
pub mod tags {
    /// Node kind (`phase`, `action`, ...)
    pub const KIND: &str = "kind";
    /// Marks a node that publishes build assets
    pub const ASSET_PUBLISHING: &str = "asset-publishing";
    /// Identifier of the asset a publish node uploads
    pub const ASSET_ID: &str = "asset-id";
    /// Marks an approval gate; value names the approval flavour
    pub const APPROVAL: &str = "approval";
    /// Name of the stack a deploy action targets
    pub const STACK: &str = "stack";
}

/// A named, orderable node of the execution plan
///
/// Insertion order of children is a topological hint that backends may read
/// as sequential dependency. It is not enforced here: this type accumulates
/// structure and never fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionGraph {
    name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<ExecutionGraph>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    tags: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    depends_on: Vec<String>,
}

impl ExecutionGraph {
    /// Create an empty node
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            tags: BTreeMap::new(),
            depends_on: Vec::new(),
        }
    }

    /// Node name (unique among siblings only by convention)
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append `child` as the last child and return it
    ///
    /// Duplicate names are accepted; rejecting them is a rendering concern.
    pub fn add(&mut self, child: ExecutionGraph) -> &mut ExecutionGraph {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Builder form of [`ExecutionGraph::add`]
    #[must_use]
    pub fn with_child(mut self, child: ExecutionGraph) -> Self {
        self.children.push(child);
        self
    }

    /// Children in insertion order
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[ExecutionGraph] {
        &self.children
    }

    /// First child with the given name
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&ExecutionGraph> {
        self.children.iter().find(|c| c.name == name)
    }

    pub(crate) fn child_at_mut(&mut self, index: usize) -> Option<&mut ExecutionGraph> {
        self.children.get_mut(index)
    }

    /// Resolve a path of child names starting below this node
    ///
    /// An empty path resolves to `self`.
    pub fn find<I, S>(&self, path: I) -> Option<&ExecutionGraph>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        path.into_iter()
            .try_fold(self, |node, segment| node.child(segment.as_ref()))
    }

    /// Number of direct children
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// True if this node has no children
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Leaves are actions; everything else is a phase
    #[inline]
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of leaves in this subtree (a leaf counts itself)
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        if self.is_leaf() {
            return 1;
        }
        self.children.iter().map(Self::leaf_count).sum()
    }

    /// Pre-order traversal yielding `(depth, node)`, `self` at depth 0
    #[must_use]
    pub fn walk(&self) -> Vec<(usize, &ExecutionGraph)> {
        let mut out = Vec::new();
        let mut stack = vec![(0usize, self)];
        while let Some((depth, node)) = stack.pop() {
            out.push((depth, node));
            for child in node.children.iter().rev() {
                stack.push((depth + 1, child));
            }
        }
        out
    }

    /// Set a metadata tag, replacing any previous value
    pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    /// Builder form of [`ExecutionGraph::set_tag`]
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_tag(key, value);
        self
    }

    /// Tag value, if set
    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// True if the tag is present, whatever its value
    #[inline]
    #[must_use]
    pub fn has_tag(&self, key: &str) -> bool {
        self.tags.contains_key(key)
    }

    /// All tags, ordered by key
    #[inline]
    #[must_use]
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Declare that this node must run after its sibling `sibling`
    pub fn add_dependency(&mut self, sibling: impl Into<String>) {
        let sibling = sibling.into();
        if !self.depends_on.contains(&sibling) {
            self.depends_on.push(sibling);
        }
    }

    /// Builder form of [`ExecutionGraph::add_dependency`]
    #[must_use]
    pub fn with_dependency(mut self, sibling: impl Into<String>) -> Self {
        self.add_dependency(sibling);
        self
    }

    /// Explicit ordering dependencies on sibling names
    #[inline]
    #[must_use]
    pub fn depends_on(&self) -> &[String] {
        &self.depends_on
    }
}
