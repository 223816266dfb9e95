//! Asset publishing strategies
//!
//! Provides the [`AssetPublishingStrategy`] trait, consulted whenever a stage
//! deployment materializes, and the two built-in policies:
//!
//! - [`PrepublishAll`]: publish each asset once, ahead of the first deployment
//!   that needs it (the default)
//! - [`PublishPerDeployment`]: republish a stack's assets right before that
//!   stack deploys

use crate::stage::{AssetRef, ApplicationStage};
use cdkp_graph::{tags, ExecutionGraph, PhaseId, PipelineGraph};
use std::collections::BTreeSet;
use std::fmt::Debug;

/// Where a publish action goes relative to the deployment's own actions
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Placement {
    /// Before every deploy action of the deployment
    BeforeDeployment,
    /// Immediately before the named stack's deploy action
    BeforeStack(String),
}

/// One asset upload to insert
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PublishAction {
    /// Asset to upload
    pub asset: AssetRef,
    /// Position relative to the deployment
    pub placement: Placement,
}

/// Publish actions a deployment must insert
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetPublishingPlan {
    /// Actions in insertion order
    pub actions: Vec<PublishAction>,
}

impl AssetPublishingPlan {
    /// Plan with nothing to publish
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// True if nothing needs publishing
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Assets to publish ahead of the whole deployment
    pub fn before_deployment(&self) -> impl Iterator<Item = &AssetRef> + '_ {
        self.actions
            .iter()
            .filter(|a| a.placement == Placement::BeforeDeployment)
            .map(|a| &a.asset)
    }

    /// Assets to publish right before `stack`
    pub fn before_stack<'a>(&'a self, stack: &'a str) -> impl Iterator<Item = &'a AssetRef> + 'a {
        self.actions
            .iter()
            .filter(move |a| matches!(&a.placement, Placement::BeforeStack(s) if s == stack))
            .map(|a| &a.asset)
    }
}

/// Pluggable policy deciding when build assets are uploaded
pub trait AssetPublishingStrategy: Send + Sync + Debug {
    /// Decide which publish actions `candidate` needs and where
    ///
    /// `graph` is the pipeline as assembled so far; strategies may inspect it
    /// (e.g. to skip assets already published) but cannot change it.
    /// `target` is the top-level phase the candidate lands in: a new phase
    /// for a plain stage, the group's phase for a group member.
    fn plan(
        &self,
        graph: &PipelineGraph,
        target: PhaseId,
        candidate: &ApplicationStage,
    ) -> AssetPublishingPlan;

    /// Strategy name (for logging)
    fn name(&self) -> &'static str;
}

/// Ids of every asset some publish node in `graph` already uploads
#[must_use]
pub fn published_assets(graph: &ExecutionGraph) -> BTreeSet<String> {
    graph
        .walk()
        .into_iter()
        .filter(|(_, node)| node.has_tag(tags::ASSET_PUBLISHING))
        .filter_map(|(_, node)| node.tag(tags::ASSET_ID).map(str::to_string))
        .collect()
}

/// Ids of assets published by top-level phases that run before `target`
///
/// Top-level phases run one after another, so only those positioned ahead of
/// `target` are guaranteed to finish first. Members of the same phase run
/// side by side and never count.
#[must_use]
pub fn published_before(graph: &PipelineGraph, target: PhaseId) -> BTreeSet<String> {
    graph
        .children()
        .iter()
        .take(target.position())
        .flat_map(published_assets)
        .collect()
}

/// Leaf action uploading `asset`
#[must_use]
pub fn publish_node(name: impl Into<String>, asset: &AssetRef) -> ExecutionGraph {
    ExecutionGraph::new(name)
        .with_tag(tags::KIND, "publish")
        .with_tag(tags::ASSET_PUBLISHING, asset.kind.as_str())
        .with_tag(tags::ASSET_ID, asset.id.as_str())
}

/// Publish every asset once, before the first deployment that needs it
///
/// An asset is skipped only when an earlier top-level phase publishes it.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrepublishAll;

impl PrepublishAll {
    /// Create new strategy
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl AssetPublishingStrategy for PrepublishAll {
    fn plan(
        &self,
        graph: &PipelineGraph,
        target: PhaseId,
        candidate: &ApplicationStage,
    ) -> AssetPublishingPlan {
        let mut skip = published_before(graph, target);
        let actions = candidate
            .assets()
            .filter(|asset| skip.insert(asset.id.clone()))
            .map(|asset| PublishAction {
                asset: asset.clone(),
                placement: Placement::BeforeDeployment,
            })
            .collect();
        AssetPublishingPlan { actions }
    }

    fn name(&self) -> &'static str {
        "prepublish_all"
    }
}

/// Republish each stack's assets immediately before that stack deploys
#[derive(Debug, Clone, Copy, Default)]
pub struct PublishPerDeployment;

impl PublishPerDeployment {
    /// Create new strategy
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl AssetPublishingStrategy for PublishPerDeployment {
    fn plan(
        &self,
        _graph: &PipelineGraph,
        _target: PhaseId,
        candidate: &ApplicationStage,
    ) -> AssetPublishingPlan {
        let mut actions = Vec::new();
        for stack in &candidate.stacks {
            let mut seen = BTreeSet::new();
            for asset in &stack.assets {
                if seen.insert(asset.id.as_str()) {
                    actions.push(PublishAction {
                        asset: asset.clone(),
                        placement: Placement::BeforeStack(stack.name.clone()),
                    });
                }
            }
        }
        AssetPublishingPlan { actions }
    }

    fn name(&self) -> &'static str {
        "publish_per_deployment"
    }
}
