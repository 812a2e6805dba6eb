//! Induced subgraphs carved out of a [`GenomeGraph`].
//!
//! A [`SubGraph`] keeps three things in step: the node map, the root set (nodes with no
//! parent present) and the end set (nodes with no child present). Single-node edits
//! update the two sets incrementally; the bulk operations recompute them once.

use std::collections::{BTreeMap, BTreeSet};

use ahash::AHashMap;
use tracing::debug;

use crate::{NodeId, drawable::DrawableNode, errors::GenomeGraphError, graph::GenomeGraph};

/// What a subgraph needs to know about a node: its id and its neighbours' ids.
pub trait GraphNode {
    fn id(&self) -> NodeId;
    fn parent_ids(&self) -> &[NodeId];
    fn child_ids(&self) -> &[NodeId];
}

#[derive(Clone, Debug)]
pub struct SubGraph<N = DrawableNode> {
    nodes: BTreeMap<NodeId, N>,
    roots: BTreeSet<NodeId>,
    ends: BTreeSet<NodeId>,
}

impl<N> Default for SubGraph<N> {
    fn default() -> Self {
        Self {
            nodes: BTreeMap::new(),
            roots: BTreeSet::new(),
            ends: BTreeSet::new(),
        }
    }
}

impl SubGraph<DrawableNode> {
    /// Extracts the neighbourhood of `center` within `radius` hops.
    ///
    /// See [`SubGraph::build_with`] for the exact traversal rule.
    pub fn build(
        graph: &GenomeGraph,
        center: NodeId,
        radius: u32,
    ) -> Result<Self, GenomeGraphError> {
        let subgraph = Self::build_with(center, radius, |id| DrawableNode::from_graph(graph, id))?;
        debug!(
            center,
            radius,
            nodes = subgraph.len(),
            roots = subgraph.roots.len(),
            ends = subgraph.ends.len(),
            "built subgraph"
        );
        Ok(subgraph)
    }

    /// A subgraph holding every node of `graph`.
    pub fn whole(graph: &GenomeGraph) -> Result<Self, GenomeGraphError> {
        let mut nodes = Vec::new();
        for id in graph.store().node_ids()? {
            nodes.push(DrawableNode::from_graph(graph, id)?);
        }
        Ok(Self::from_nodes(nodes))
    }
}

impl<N: GraphNode> SubGraph<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a subgraph from `nodes`; for repeated ids the last one wins.
    pub fn from_nodes<I: IntoIterator<Item = N>>(nodes: I) -> Self {
        let mut subgraph = Self::default();
        subgraph.replace_all(nodes);
        subgraph
    }

    /// Depth-first expansion from `center` along child and then parent edges.
    ///
    /// A node is taken the first time it is reached and expands with the budget left on
    /// that first visit, `radius - hops`. Reaching it again later through a path with
    /// more budget left changes nothing, so the result can be smaller than the exact
    /// `radius`-ball. Nodes are loaded through `load`.
    pub fn build_with<F>(center: NodeId, radius: u32, mut load: F) -> Result<Self, GenomeGraphError>
    where
        F: FnMut(NodeId) -> Result<N, GenomeGraphError>,
    {
        let mut subgraph = Self::default();
        let mut stack = vec![(center, radius)];
        while let Some((id, budget)) = stack.pop() {
            if subgraph.nodes.contains_key(&id) {
                continue;
            }
            let node = load(id)?;
            if budget > 0 {
                // pushed in reverse so the first child is expanded first, parents after children
                for &parent in node.parent_ids().iter().rev() {
                    stack.push((parent, budget - 1));
                }
                for &child in node.child_ids().iter().rev() {
                    stack.push((child, budget - 1));
                }
            }
            subgraph.nodes.insert(id, node);
        }
        subgraph.recalculate_roots_and_ends();
        Ok(subgraph)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&N> {
        self.nodes.get(&id)
    }

    /// Nodes in ascending id order. Use [`SubGraph::topo_sort`] for dependency order.
    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        self.nodes.values()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn roots(&self) -> &BTreeSet<NodeId> {
        &self.roots
    }

    pub fn ends(&self) -> &BTreeSet<NodeId> {
        &self.ends
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// True as soon as one of `ids` is present.
    pub fn contains_any<'a, I>(&self, ids: I) -> bool
    where
        I: IntoIterator<Item = &'a NodeId>,
    {
        ids.into_iter().any(|id| self.nodes.contains_key(id))
    }

    /// Parents of `id` that are present in this subgraph.
    pub fn present_parents(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&id)
            .map(|node| self.retain_present(node.parent_ids()))
            .unwrap_or_default()
    }

    /// Children of `id` that are present in this subgraph.
    pub fn present_children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&id)
            .map(|node| self.retain_present(node.child_ids()))
            .unwrap_or_default()
    }

    /// Every edge with both endpoints present, as `(parent, child)`, sorted.
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        let mut edges: Vec<(NodeId, NodeId)> = self
            .nodes
            .values()
            .flat_map(|node| {
                node.parent_ids()
                    .iter()
                    .filter(|parent| self.nodes.contains_key(parent))
                    .map(move |&parent| (parent, node.id()))
            })
            .collect();
        edges.sort_unstable();
        edges.dedup();
        edges
    }

    /// Adds a node, failing with [`GenomeGraphError::DuplicateId`] if its id is taken.
    pub fn add_node(&mut self, node: N) -> Result<(), GenomeGraphError> {
        if self.nodes.contains_key(&node.id()) {
            return Err(GenomeGraphError::DuplicateId(node.id()));
        }
        self.insert_updating(node);
        Ok(())
    }

    /// Removes and returns the node with `id`, if present.
    pub fn remove_node(&mut self, id: NodeId) -> Option<N> {
        let node = self.nodes.remove(&id)?;
        self.roots.remove(&id);
        self.ends.remove(&id);
        // children that only had this node as a present parent become roots
        self.check_nodes_for_root(node.child_ids());
        self.check_nodes_for_end(node.parent_ids());
        Some(node)
    }

    /// Puts `node` in place of any node with the same id and returns the old one.
    pub fn replace_node(&mut self, node: N) -> Option<N> {
        let previous = self.remove_node(node.id());
        self.insert_updating(node);
        previous
    }

    /// Inserts every node, then recomputes roots and ends once.
    ///
    /// Stops at the first duplicate id: nodes before it stay inserted.
    pub fn add_all<I: IntoIterator<Item = N>>(&mut self, nodes: I) -> Result<(), GenomeGraphError> {
        for node in nodes {
            let id = node.id();
            if self.nodes.contains_key(&id) {
                self.recalculate_roots_and_ends();
                return Err(GenomeGraphError::DuplicateId(id));
            }
            self.nodes.insert(id, node);
        }
        self.recalculate_roots_and_ends();
        Ok(())
    }

    /// Inserts or replaces every node, then recomputes roots and ends once.
    /// Returns the nodes that were replaced.
    pub fn replace_all<I: IntoIterator<Item = N>>(&mut self, nodes: I) -> Vec<N> {
        let mut replaced = Vec::new();
        for node in nodes {
            if let Some(previous) = self.nodes.insert(node.id(), node) {
                replaced.push(previous);
            }
        }
        self.recalculate_roots_and_ends();
        replaced
    }

    /// Removes every listed id that is present and returns the removed nodes.
    pub fn remove_all<'a, I>(&mut self, ids: I) -> Vec<N>
    where
        I: IntoIterator<Item = &'a NodeId>,
    {
        let removed: Vec<N> = ids
            .into_iter()
            .filter_map(|id| self.nodes.remove(id))
            .collect();
        self.recalculate_roots_and_ends();
        removed
    }

    pub fn recalculate_roots_and_ends(&mut self) {
        self.recalculate_roots();
        self.recalculate_ends();
    }

    pub fn recalculate_roots(&mut self) {
        let roots = self
            .nodes
            .values()
            .filter(|node| !self.contains_any(node.parent_ids()))
            .map(|node| node.id())
            .collect();
        self.roots = roots;
    }

    pub fn recalculate_ends(&mut self) {
        let ends = self
            .nodes
            .values()
            .filter(|node| !self.contains_any(node.child_ids()))
            .map(|node| node.id())
            .collect();
        self.ends = ends;
    }

    /// Orders the nodes so every present parent comes before its children.
    ///
    /// Zero in-degree nodes are emitted smallest id first, which makes the order
    /// independent of insertion order. Fails if the subgraph contains a cycle.
    pub fn topo_sort(&self) -> Result<Vec<NodeId>, GenomeGraphError> {
        let mut in_degree: AHashMap<NodeId, usize> = AHashMap::with_capacity(self.nodes.len());
        let mut children: AHashMap<NodeId, Vec<NodeId>> = AHashMap::new();
        for node in self.nodes.values() {
            let parents = self.retain_present(node.parent_ids());
            in_degree.insert(node.id(), parents.len());
            for parent in parents {
                children.entry(parent).or_default().push(node.id());
            }
        }

        let mut ready: BTreeSet<NodeId> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(&id, _)| id)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(id) = ready.pop_first() {
            order.push(id);
            for child in children.get(&id).map(Vec::as_slice).unwrap_or_default() {
                if let Some(degree) = in_degree.get_mut(child) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(*child);
                    }
                }
            }
        }

        if order.len() != self.nodes.len() {
            return Err(GenomeGraphError::invalid_input(format!(
                "subgraph contains a cycle: {} of {} nodes could not be ordered",
                self.nodes.len() - order.len(),
                self.nodes.len()
            )));
        }
        Ok(order)
    }

    fn insert_updating(&mut self, node: N) {
        let id = node.id();
        for child in node.child_ids() {
            self.roots.remove(child);
        }
        if !self.contains_any(node.parent_ids()) {
            self.roots.insert(id);
        }
        for parent in node.parent_ids() {
            self.ends.remove(parent);
        }
        if !self.contains_any(node.child_ids()) {
            self.ends.insert(id);
        }
        self.nodes.insert(id, node);
    }

    fn check_nodes_for_root(&mut self, ids: &[NodeId]) {
        for id in ids {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            if self.contains_any(node.parent_ids()) {
                self.roots.remove(id);
            } else {
                self.roots.insert(*id);
            }
        }
    }

    fn check_nodes_for_end(&mut self, ids: &[NodeId]) {
        for id in ids {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            if self.contains_any(node.child_ids()) {
                self.ends.remove(id);
            } else {
                self.ends.insert(*id);
            }
        }
    }

    fn retain_present(&self, ids: &[NodeId]) -> Vec<NodeId> {
        let mut present: Vec<NodeId> = Vec::with_capacity(ids.len());
        for &id in ids {
            if self.nodes.contains_key(&id) && !present.contains(&id) {
                present.push(id);
            }
        }
        present
    }
}
