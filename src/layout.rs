//! Layered layout of a subgraph.
//!
//! Nodes are ranked by longest path from the roots, every edge that skips a rank is
//! routed through dummy nodes, layers are ordered with barycenter sweeps and finally
//! every node gets draw coordinates.

use std::{cmp::Ordering, fmt};

use ahash::AHashMap;
use serde::Serialize;
use tracing::debug;

use crate::{
    NodeId,
    config::LayoutConfig,
    drawable::{DrawableNode, Point},
    errors::GenomeGraphError,
    subgraph::{GraphNode, SubGraph},
};

/// Vertical distance between two rows before zooming.
pub const LINE_PADDING: f64 = 30.0;
/// Extra vertical offset of a dummy node so it sits between real rows.
pub const DUMMY_Y_OFFSET: f64 = 5.0;
const SORT_EPSILON: f64 = 1e-10;
const NO_NEIGHBOURS: f64 = -1.0;

/// Nodes sharing one rank, drawn at the same x.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Layer {
    x: f64,
    nodes: Vec<DrawableNode>,
}

impl Layer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: DrawableNode) {
        self.nodes.push(node);
    }

    pub fn nodes(&self) -> &[DrawableNode] {
        &self.nodes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DrawableNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.iter().any(|node| node.id() == id)
    }

    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.nodes.iter().position(|node| node.id() == id)
    }

    /// Widest node in the layer, or 0 for an empty layer.
    pub fn width(&self) -> f64 {
        self.nodes
            .iter()
            .map(DrawableNode::width)
            .fold(0.0, f64::max)
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn set_x(&mut self, x: f64) {
        self.x = x;
    }

    /// y of the first node, once locations are set.
    pub fn y(&self) -> Option<f64> {
        self.nodes.first().map(|node| node.location().y)
    }

    /// Orders this layer against a neighbouring one.
    ///
    /// Each node's key is the mean index, in `neighbour`, of its parents (`has_parents`)
    /// or children (otherwise); neighbours missing from `neighbour` do not count, and a
    /// node with none left gets -1. Nodes are ordered by key descending, then by genome
    /// count descending, then by id descending. Keys closer than 1e-10 are equal.
    pub fn sort(&mut self, neighbour: &Layer, has_parents: bool) {
        let positions: AHashMap<NodeId, usize> = neighbour
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id(), index))
            .collect();

        let keys: AHashMap<NodeId, f64> = self
            .nodes
            .iter()
            .map(|node| {
                let neighbours = if has_parents {
                    node.parent_ids()
                } else {
                    node.child_ids()
                };
                let (sum, count) = neighbours
                    .iter()
                    .filter_map(|id| positions.get(id))
                    .fold((0.0, 0usize), |(sum, count), &index| {
                        (sum + index as f64, count + 1)
                    });
                let key = if count == 0 {
                    NO_NEIGHBOURS
                } else {
                    sum / count as f64
                };
                (node.id(), key)
            })
            .collect();

        self.nodes.sort_by(|a, b| {
            let key_a = keys.get(&a.id()).copied().unwrap_or(NO_NEIGHBOURS);
            let key_b = keys.get(&b.id()).copied().unwrap_or(NO_NEIGHBOURS);
            let difference = key_b - key_a;
            if difference > SORT_EPSILON {
                Ordering::Greater
            } else if difference < -SORT_EPSILON {
                Ordering::Less
            } else {
                b.genome_count()
                    .cmp(&a.genome_count())
                    .then_with(|| b.id().cmp(&a.id()))
            }
        });
    }

    /// Places the nodes top to bottom starting at `y`.
    pub fn set_draw_locations(&mut self, y: f64, zoom_level: f64) {
        let mut y = y;
        for node in &mut self.nodes {
            if node.is_dummy() {
                node.set_location(self.x, y + DUMMY_Y_OFFSET * zoom_level);
            } else {
                node.set_location(self.x, y);
            }
            y += LINE_PADDING * zoom_level;
        }
    }

    pub fn set_size(&mut self, scale: f64) {
        for node in &mut self.nodes {
            node.set_draw_dimensions(scale);
        }
    }
}

impl<'a> IntoIterator for &'a Layer {
    type Item = &'a DrawableNode;
    type IntoIter = std::slice::Iter<'a, DrawableNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nodes = self
            .nodes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "Layer[Segments: {nodes}]")
    }
}

/// An edge of the subgraph, drawn through the dummies that route it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LayoutEdge {
    pub start: NodeId,
    pub end: NodeId,
    pub points: Vec<Point>,
}

#[derive(Clone, Debug, Serialize)]
pub struct LayoutResult {
    pub layers: Vec<Layer>,
    pub edges: Vec<LayoutEdge>,
}

impl LayoutResult {
    /// Location of a node, dummies included.
    pub fn location_of(&self, id: NodeId) -> Option<Point> {
        self.layers
            .iter()
            .flat_map(Layer::iter)
            .find(|node| node.id() == id)
            .map(DrawableNode::location)
    }

    /// Index of the layer holding `id`.
    pub fn rank_of(&self, id: NodeId) -> Option<usize> {
        self.layers.iter().position(|layer| layer.contains(id))
    }
}

pub struct LayeredLayout {
    config: LayoutConfig,
}

impl LayeredLayout {
    pub fn new(config: LayoutConfig) -> Result<Self, GenomeGraphError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Runs the full pass: ranking, dummies, ordering and coordinates.
    pub fn layout(&self, subgraph: &SubGraph<DrawableNode>) -> Result<LayoutResult, GenomeGraphError> {
        let (mut layers, routes) = find_layers(subgraph)?;

        for _ in 0..self.config.sweeps {
            sweep_down(&mut layers);
            sweep_up(&mut layers);
        }

        let mut x = self.config.x0;
        for layer in &mut layers {
            layer.set_size(self.config.scale);
            layer.set_x(x);
            x += layer.width() + self.config.layer_gap * self.config.zoom_level;
            layer.set_draw_locations(self.config.y0, self.config.zoom_level);
        }

        let locations: AHashMap<NodeId, (Point, Point)> = layers
            .iter()
            .flat_map(Layer::iter)
            .map(|node| {
                (
                    node.id(),
                    (node.left_border_center(), node.right_border_center()),
                )
            })
            .collect();
        let edges = routes
            .into_iter()
            .map(|route| route_edge(&route, &locations))
            .collect();

        debug!(
            layers = layers.len(),
            nodes = subgraph.len(),
            "laid out subgraph"
        );
        Ok(LayoutResult { layers, edges })
    }
}

/// Node ids along one subgraph edge: start, any dummies, end.
pub type Route = Vec<NodeId>;

/// Ranks the subgraph into layers and inserts dummy chains for long edges.
///
/// Roots get rank 0; every other node sits one rank after its furthest present
/// parent. Nodes enter their layer in topological order.
pub fn find_layers(
    subgraph: &SubGraph<DrawableNode>,
) -> Result<(Vec<Layer>, Vec<Route>), GenomeGraphError> {
    let order = subgraph.topo_sort()?;

    let mut ranks: AHashMap<NodeId, usize> = AHashMap::with_capacity(order.len());
    for &id in &order {
        let rank = subgraph
            .present_parents(id)
            .iter()
            .filter_map(|parent| ranks.get(parent))
            .map(|rank| rank + 1)
            .max()
            .unwrap_or(0);
        ranks.insert(id, rank);
    }

    let mut nodes: AHashMap<NodeId, DrawableNode> = subgraph
        .nodes()
        .map(|node| (node.id(), node.clone()))
        .collect();
    let mut dummies: Vec<(usize, DrawableNode)> = Vec::new();
    let mut routes = Vec::new();
    let mut next_dummy: NodeId = -1;

    for (parent, child) in subgraph.edges() {
        let (Some(&from), Some(&to)) = (ranks.get(&parent), ranks.get(&child)) else {
            continue;
        };
        let mut route = vec![parent];
        if to > from + 1 {
            let genome_count = nodes.get(&child).map_or(0, DrawableNode::genome_count);
            let chain: Vec<NodeId> = (from + 1..to)
                .map(|_| {
                    let id = next_dummy;
                    next_dummy -= 1;
                    id
                })
                .collect();
            for (offset, &id) in chain.iter().enumerate() {
                let previous = if offset == 0 { parent } else { chain[offset - 1] };
                let next = chain.get(offset + 1).copied().unwrap_or(child);
                dummies.push((
                    from + 1 + offset,
                    DrawableNode::dummy(id, previous, next, genome_count),
                ));
            }
            if let (Some(&first), Some(&last)) = (chain.first(), chain.last()) {
                if let Some(node) = nodes.get_mut(&parent) {
                    node.replace_child(child, first);
                }
                if let Some(node) = nodes.get_mut(&child) {
                    node.replace_parent(parent, last);
                }
            }
            route.extend(chain);
        }
        route.push(child);
        routes.push(route);
    }

    let depth = ranks.values().copied().max().map_or(0, |max| max + 1);
    let mut layers: Vec<Layer> = (0..depth).map(|_| Layer::new()).collect();
    for id in order {
        if let (Some(node), Some(&rank)) = (nodes.remove(&id), ranks.get(&id)) {
            layers[rank].add(node);
        }
    }
    for (rank, dummy) in dummies {
        layers[rank].add(dummy);
    }
    Ok((layers, routes))
}

fn sweep_down(layers: &mut [Layer]) {
    for index in 1..layers.len() {
        let (done, rest) = layers.split_at_mut(index);
        if let (Some(previous), Some(layer)) = (done.last(), rest.first_mut()) {
            layer.sort(previous, true);
        }
    }
}

fn sweep_up(layers: &mut [Layer]) {
    for index in (0..layers.len().saturating_sub(1)).rev() {
        let (head, rest) = layers.split_at_mut(index + 1);
        if let (Some(layer), Some(next)) = (head.last_mut(), rest.first()) {
            layer.sort(next, false);
        }
    }
}

fn route_edge(route: &[NodeId], locations: &AHashMap<NodeId, (Point, Point)>) -> LayoutEdge {
    let last = route.len().saturating_sub(1);
    let points = route
        .iter()
        .enumerate()
        .filter_map(|(index, id)| {
            let (left, right) = locations.get(id)?;
            // leave from the right border, enter at the left one
            Some(if index == last && index > 0 {
                *left
            } else {
                *right
            })
        })
        .collect();
    LayoutEdge {
        start: route.first().copied().unwrap_or_default(),
        end: route.last().copied().unwrap_or_default(),
        points,
    }
}
