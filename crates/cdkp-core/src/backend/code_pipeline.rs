//! Default backend: stage/action layout with run orders
//!
//! Each non-empty top-level phase of the plan becomes a stage. Inside a stage
//! every leaf becomes an action whose run order is derived from the
//! `depends_on` edges between siblings: siblings without dependencies run
//! together, a dependent starts after the last run order of everything it
//! depends on. Nested phases are laid out recursively from their own start.

use crate::backend::Backend;
use crate::config::BackendConfig;
use crate::error::RenderError;
use crate::scope::PipelineScope;
use cdkp_graph::{ExecutionGraph, PipelineGraph, SOURCE_STAGE, SYNTH_STAGE};
use parking_lot::Mutex;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// One action of a rendered stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedAction {
    /// Dotted path of the leaf below its stage
    pub name: String,
    /// 1-based run order; equal values run in parallel
    pub run_order: u32,
    /// Tags copied from the leaf
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

/// One rendered stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedStage {
    /// Name of the top-level phase
    pub name: String,
    /// Actions sorted by run order
    pub actions: Vec<RenderedAction>,
}

impl RenderedStage {
    /// Action names in output order
    #[must_use]
    pub fn action_names(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.name.as_str()).collect()
    }

    /// Action by name
    #[must_use]
    pub fn action(&self, name: &str) -> Option<&RenderedAction> {
        self.actions.iter().find(|a| a.name == name)
    }
}

/// Output of [`CodePipelineBackend`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedPipeline {
    /// Pipeline name (the scope id)
    pub name: String,
    /// Stages in execution order
    pub stages: Vec<RenderedStage>,
}

impl RenderedPipeline {
    /// Stage names in execution order
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }

    /// Stage by name
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&RenderedStage> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Pretty JSON document
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// The well-known default backend
///
/// Keeps the last rendered pipeline; read it back with
/// [`CodePipelineBackend::rendered`].
#[derive(Debug, Default)]
pub struct CodePipelineBackend {
    config: BackendConfig,
    rendered: Mutex<Option<RenderedPipeline>>,
}

impl CodePipelineBackend {
    /// Backend with default options
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend with custom options
    #[must_use]
    pub fn with_config(config: BackendConfig) -> Self {
        Self {
            config,
            rendered: Mutex::new(None),
        }
    }

    /// The rendered pipeline, once rendering succeeded
    #[must_use]
    pub fn rendered(&self) -> Option<RenderedPipeline> {
        self.rendered.lock().clone()
    }

    /// Validate and lay out `graph` without storing the result
    pub fn render(&self, scope: &PipelineScope, graph: &PipelineGraph) -> Result<RenderedPipeline, RenderError> {
        // top-level order is positional; this only validates names and edges
        self.order_children(graph.root(), graph.name())?;

        let mut stages = Vec::with_capacity(graph.len());

        let source = graph.source_stage();
        if source.is_empty() {
            if !self.config.allow_empty_source_stage {
                return Err(RenderError::EmptyStage(SOURCE_STAGE.to_string()));
            }
            tracing::debug!("omitting empty source stage");
        } else {
            stages.push(self.render_stage(source)?);
        }

        let synth = graph.synth_stage();
        if synth.is_empty() {
            return Err(RenderError::EmptyStage(SYNTH_STAGE.to_string()));
        }
        stages.push(self.render_stage(synth)?);

        for phase in graph.phases() {
            if phase.is_empty() {
                tracing::warn!(phase = phase.name(), "omitting phase without actions");
                continue;
            }
            stages.push(self.render_stage(phase)?);
        }

        Ok(RenderedPipeline {
            name: scope.id().to_string(),
            stages,
        })
    }

    fn render_stage(&self, phase: &ExecutionGraph) -> Result<RenderedStage, RenderError> {
        let (mut actions, _) = self.layout_children(phase, phase.name(), None, 1)?;
        actions.sort_by_key(|a| a.run_order);
        Ok(RenderedStage {
            name: phase.name().to_string(),
            actions,
        })
    }

    /// Lay out the children of `node` starting at `start`
    ///
    /// Returns the actions in child insertion order and the last run order used.
    fn layout_children(
        &self,
        node: &ExecutionGraph,
        path: &str,
        prefix: Option<&str>,
        start: u32,
    ) -> Result<(Vec<RenderedAction>, u32), RenderError> {
        let children = node.children();
        let order = self.order_children(node, path)?;
        let index = first_index_by_name(children);

        let mut ends = vec![start; children.len()];
        let mut per_child: Vec<Vec<RenderedAction>> = vec![Vec::new(); children.len()];
        let mut end = start;

        for i in order {
            let child = &children[i];
            let child_start = child
                .depends_on()
                .iter()
                .filter_map(|d| index.get(d.as_str()))
                .map(|&d| ends[d] + 1)
                .max()
                .unwrap_or(start);

            let name = match prefix {
                Some(p) => format!("{p}.{}", child.name()),
                None => child.name().to_string(),
            };

            let child_end = if child.is_leaf() {
                per_child[i].push(RenderedAction {
                    name,
                    run_order: child_start,
                    tags: child.tags().clone(),
                });
                child_start
            } else {
                let child_path = format!("{path}/{}", child.name());
                let (actions, child_end) =
                    self.layout_children(child, &child_path, Some(name.as_str()), child_start)?;
                per_child[i] = actions;
                child_end
            };

            ends[i] = child_end;
            end = end.max(child_end);
        }

        Ok((per_child.into_iter().flatten().collect(), end))
    }

    /// Validate the children of `node` and return them in dependency order
    fn order_children(&self, node: &ExecutionGraph, path: &str) -> Result<Vec<usize>, RenderError> {
        let children = node.children();

        if self.config.reject_duplicate_names {
            let mut seen = HashSet::with_capacity(children.len());
            for child in children {
                if !seen.insert(child.name()) {
                    return Err(RenderError::DuplicateName {
                        parent: path.to_string(),
                        name: child.name().to_string(),
                    });
                }
            }
        }

        let index = first_index_by_name(children);
        let mut deps = DiGraph::<usize, ()>::with_capacity(children.len(), 0);
        let nodes: Vec<NodeIndex> = (0..children.len()).map(|i| deps.add_node(i)).collect();

        for (i, child) in children.iter().enumerate() {
            for dependency in child.depends_on() {
                let Some(&from) = index.get(dependency.as_str()) else {
                    return Err(RenderError::DanglingDependency {
                        node: format!("{path}/{}", child.name()),
                        dependency: dependency.clone(),
                    });
                };
                if from == i {
                    return Err(RenderError::DependencyCycle {
                        parent: path.to_string(),
                    });
                }
                deps.add_edge(nodes[from], nodes[i], ());
            }
        }

        petgraph::algo::toposort(&deps, None)
            .map(|sorted| sorted.into_iter().map(|n| deps[n]).collect())
            .map_err(|_| RenderError::DependencyCycle {
                parent: path.to_string(),
            })
    }
}

fn first_index_by_name(children: &[ExecutionGraph]) -> HashMap<&str, usize> {
    let mut index = HashMap::with_capacity(children.len());
    for (i, child) in children.iter().enumerate() {
        index.entry(child.name()).or_insert(i);
    }
    index
}

impl Backend for CodePipelineBackend {
    fn render_backend(&self, scope: &PipelineScope, graph: &PipelineGraph) -> anyhow::Result<()> {
        let rendered = self.render(scope, graph)?;
        tracing::info!(
            pipeline = scope.path(),
            stages = rendered.stages.len(),
            "rendered pipeline"
        );
        *self.rendered.lock() = Some(rendered);
        Ok(())
    }
}
