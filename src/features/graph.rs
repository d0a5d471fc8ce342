//! The feature graph - declared features and action configs with their edges.
//!
//! A graph is built once per toolchain and shared across targets. Nodes are
//! selectables in declaration order (features first, then action configs);
//! edges record `implies` and `requires` relationships.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::core::errors::AnalysisError;
use crate::core::toolchain::{ActionConfig, Feature, ToolchainDescriptor};

/// A node of the feature graph.
#[derive(Debug, Clone)]
pub enum Selectable {
    Feature(Feature),
    ActionConfig(ActionConfig),
}

impl Selectable {
    pub fn name(&self) -> &str {
        match self {
            Selectable::Feature(f) => &f.name,
            Selectable::ActionConfig(a) => &a.config_name,
        }
    }

    pub fn implies(&self) -> &[String] {
        match self {
            Selectable::Feature(f) => &f.implies,
            Selectable::ActionConfig(a) => &a.implies,
        }
    }

    pub fn is_action_config(&self) -> bool {
        matches!(self, Selectable::ActionConfig(_))
    }
}

/// Kind of relationship between two selectables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Implies,
    Requires,
}

/// Validated feature/action-config declarations of one toolchain.
#[derive(Debug, Clone)]
pub struct FeatureGraph {
    toolchain: String,
    graph: DiGraph<Selectable, Edge>,
    name_to_node: HashMap<String, NodeIndex>,
    action_to_node: HashMap<String, NodeIndex>,
}

impl FeatureGraph {
    /// Build and validate the graph for a toolchain.
    pub fn build(toolchain: &ToolchainDescriptor) -> Result<Self, AnalysisError> {
        let mut graph = DiGraph::new();
        let mut name_to_node = HashMap::new();
        let mut action_to_node = HashMap::new();

        for feature in &toolchain.features {
            if name_to_node.contains_key(&feature.name) {
                return Err(AnalysisError::configuration(
                    "feature",
                    format!("feature `{}` is declared more than once", feature.name),
                ));
            }
            let node = graph.add_node(Selectable::Feature(feature.clone()));
            name_to_node.insert(feature.name.clone(), node);
        }

        for config in &toolchain.action_configs {
            if name_to_node.contains_key(&config.config_name) {
                return Err(AnalysisError::configuration(
                    "action_config",
                    format!(
                        "action config `{}` collides with another feature or action config of the same name",
                        config.config_name
                    ),
                ));
            }
            if action_to_node.contains_key(&config.action_name) {
                return Err(AnalysisError::configuration(
                    "action_config",
                    format!(
                        "action `{}` is configured by more than one action config",
                        config.action_name
                    ),
                ));
            }
            if let Some(flag_set) = config.flag_sets.iter().find(|fs| !fs.actions.is_empty()) {
                return Err(AnalysisError::configuration(
                    format!("action_config.{}.flag_sets", config.config_name),
                    format!(
                        "flag sets inside action config `{}` may not list actions (found {:?})",
                        config.config_name, flag_set.actions
                    ),
                ));
            }
            let node = graph.add_node(Selectable::ActionConfig(config.clone()));
            name_to_node.insert(config.config_name.clone(), node);
            action_to_node.insert(config.action_name.clone(), node);
        }

        let lookup = |owner: &str, field: &str, name: &str| {
            name_to_node.get(name).copied().ok_or_else(|| {
                AnalysisError::configuration(
                    format!("feature.{}.{}", owner, field),
                    format!("`{}` {} undeclared feature `{}`", owner, field, name),
                )
            })
        };

        let mut edges = Vec::new();
        for node in graph.node_indices() {
            let selectable: &Selectable = &graph[node];
            for implied in selectable.implies() {
                edges.push((node, lookup(selectable.name(), "implies", implied.as_str())?, Edge::Implies));
            }
            if let Selectable::Feature(feature) = selectable {
                for set in &feature.requires {
                    for required in &set.features {
                        edges.push((
                            node,
                            lookup(&feature.name, "requires", required.as_str())?,
                            Edge::Requires,
                        ));
                    }
                }
            }
        }
        for (from, to, kind) in edges {
            let exists = graph
                .edges_connecting(from, to)
                .any(|e| *e.weight() == kind);
            if !exists {
                graph.add_edge(from, to, kind);
            }
        }

        tracing::debug!(
            "built feature graph for `{}`: {} selectables, {} edges",
            toolchain.identifier,
            graph.node_count(),
            graph.edge_count()
        );

        Ok(FeatureGraph {
            toolchain: toolchain.identifier.clone(),
            graph,
            name_to_node,
            action_to_node,
        })
    }

    /// Identifier of the toolchain this graph was built from.
    pub fn toolchain(&self) -> &str {
        &self.toolchain
    }

    pub fn node(&self, name: &str) -> Option<NodeIndex> {
        self.name_to_node.get(name).copied()
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.name_to_node.contains_key(name)
    }

    pub fn selectable(&self, node: NodeIndex) -> &Selectable {
        &self.graph[node]
    }

    /// All nodes in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// The action config node configuring `action`.
    pub fn action_config_for(&self, action: &str) -> Option<NodeIndex> {
        self.action_to_node.get(action).copied()
    }

    fn neighbors(
        &self,
        node: NodeIndex,
        direction: Direction,
        kind: Edge,
    ) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph
            .edges_directed(node, direction)
            .filter(move |e| *e.weight() == kind)
            .map(move |e| match direction {
                Direction::Outgoing => e.target(),
                Direction::Incoming => e.source(),
            })
    }

    /// Selectables implied by `node`.
    pub fn implies(&self, node: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.neighbors(node, Direction::Outgoing, Edge::Implies)
    }

    /// Selectables that imply `node`.
    pub fn implied_by(&self, node: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.neighbors(node, Direction::Incoming, Edge::Implies)
    }

    /// Selectables listing `node` in one of their `requires` sets.
    pub fn required_by(&self, node: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.neighbors(node, Direction::Incoming, Edge::Requires)
    }

    /// The alternative `requires` sets of `node`, resolved to nodes.
    fn requirement_sets(&self, node: NodeIndex) -> Vec<Vec<NodeIndex>> {
        match &self.graph[node] {
            Selectable::Feature(feature) => feature
                .requires
                .iter()
                .map(|set| {
                    set.features
                        .iter()
                        .filter_map(|name| self.node(name))
                        .collect()
                })
                .collect(),
            Selectable::ActionConfig(_) => Vec::new(),
        }
    }

    /// Compute the enabled selectables for a set of requested names.
    ///
    /// Requested names the toolchain does not declare are ignored. Every
    /// requested selectable is enabled along with everything it transitively
    /// implies; then selectables that are not satisfied are disabled until a
    /// fixed point is reached. A selectable is satisfied when it is requested
    /// or implied by an enabled selectable, one of its `requires` sets is
    /// fully enabled (or it has none), and everything it implies is enabled.
    ///
    /// The result is in declaration order.
    pub fn select<'a>(&self, requested: impl IntoIterator<Item = &'a str>) -> Vec<NodeIndex> {
        let mut roots = HashSet::new();
        for name in requested {
            match self.node(name) {
                Some(node) => {
                    roots.insert(node);
                }
                None => tracing::trace!("ignoring undeclared feature `{}`", name),
            }
        }

        let mut enabled = HashSet::new();
        let mut stack: Vec<NodeIndex> = roots.iter().copied().collect();
        while let Some(node) = stack.pop() {
            if enabled.insert(node) {
                stack.extend(self.implies(node));
            }
        }

        let mut queue: VecDeque<NodeIndex> = enabled.iter().copied().collect();
        while let Some(node) = queue.pop_front() {
            if !enabled.contains(&node) || self.is_satisfied(node, &roots, &enabled) {
                continue;
            }
            enabled.remove(&node);
            queue.extend(self.implied_by(node));
            queue.extend(self.required_by(node));
            queue.extend(self.implies(node));
        }

        self.graph
            .node_indices()
            .filter(|n| enabled.contains(n))
            .collect()
    }

    fn is_satisfied(
        &self,
        node: NodeIndex,
        roots: &HashSet<NodeIndex>,
        enabled: &HashSet<NodeIndex>,
    ) -> bool {
        let wanted = roots.contains(&node) || self.implied_by(node).any(|n| enabled.contains(&n));
        if !wanted {
            return false;
        }

        let sets = self.requirement_sets(node);
        let requirements_met =
            sets.is_empty() || sets.iter().any(|set| set.iter().all(|n| enabled.contains(n)));
        if !requirements_met {
            return false;
        }

        self.implies(node).all(|n| enabled.contains(&n))
    }
}
