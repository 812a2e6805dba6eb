//! Drawable wrappers around graph nodes.
//!
//! A [`DrawableNode`] pairs draw geometry with the id of the node it stands for and a
//! snapshot of that node's parent and child ids. Synthetic dummy nodes, which route a
//! long edge through intermediate layers, use negative ids.

use std::fmt;

use serde::Serialize;

use crate::{NodeId, errors::GenomeGraphError, graph::GenomeGraph, subgraph::GraphNode};

const BASE_WIDTH: f64 = 10.0;
const NODE_HEIGHT: f64 = 10.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum NodeKind {
    Segment,
    Dummy,
}

#[derive(Clone, Debug, Serialize)]
pub struct DrawableNode {
    id: NodeId,
    kind: NodeKind,
    #[serde(skip)]
    parents: Vec<NodeId>,
    #[serde(skip)]
    children: Vec<NodeId>,
    genome_count: usize,
    sequence_length: usize,
    width: f64,
    height: f64,
    location: Point,
}

impl DrawableNode {
    /// Snapshots node `id` from the graph.
    pub fn from_graph(graph: &GenomeGraph, id: NodeId) -> Result<Self, GenomeGraphError> {
        let sequence_length = graph.get_sequence_length(id)?;
        let mut node = Self {
            id,
            kind: NodeKind::Segment,
            parents: graph.get_parents(id)?,
            children: graph.get_children(id)?,
            genome_count: graph.get_genome_count(id)?,
            sequence_length,
            width: 0.0,
            height: 0.0,
            location: Point::default(),
        };
        node.set_draw_dimensions(1.0);
        Ok(node)
    }

    /// Builds a segment node from already known parts.
    pub fn segment(
        id: NodeId,
        sequence_length: usize,
        genome_count: usize,
        parents: Vec<NodeId>,
        children: Vec<NodeId>,
    ) -> Self {
        let mut node = Self {
            id,
            kind: NodeKind::Segment,
            parents,
            children,
            genome_count,
            sequence_length,
            width: 0.0,
            height: 0.0,
            location: Point::default(),
        };
        node.set_draw_dimensions(1.0);
        node
    }

    pub fn dummy(id: NodeId, parent: NodeId, child: NodeId, genome_count: usize) -> Self {
        debug_assert!(id < 0, "dummy ids are negative");
        let mut node = Self {
            id,
            kind: NodeKind::Dummy,
            parents: vec![parent],
            children: vec![child],
            genome_count,
            sequence_length: 0,
            width: 0.0,
            height: 0.0,
            location: Point::default(),
        };
        node.set_draw_dimensions(1.0);
        node
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_dummy(&self) -> bool {
        self.kind == NodeKind::Dummy
    }

    pub fn genome_count(&self) -> usize {
        self.genome_count
    }

    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn location(&self) -> Point {
        self.location
    }

    pub fn set_location(&mut self, x: f64, y: f64) {
        self.location = Point::new(x, y);
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.location.x + self.width / 2.0,
            self.location.y + self.height / 2.0,
        )
    }

    pub fn left_border_center(&self) -> Point {
        Point::new(self.location.x, self.location.y + self.height / 2.0)
    }

    pub fn right_border_center(&self) -> Point {
        Point::new(
            self.location.x + self.width,
            self.location.y + self.height / 2.0,
        )
    }

    /// Width grows with the square root of the sequence length; dummies have no width.
    pub fn set_draw_dimensions(&mut self, scale: f64) {
        let width = match self.kind {
            NodeKind::Segment => BASE_WIDTH + (self.sequence_length as f64).sqrt().floor(),
            NodeKind::Dummy => 0.0,
        };
        self.width = width * scale;
        self.height = NODE_HEIGHT * scale;
    }

    pub(crate) fn replace_parent(&mut self, old: NodeId, new: NodeId) {
        for parent in self.parents.iter_mut().filter(|parent| **parent == old) {
            *parent = new;
        }
    }

    pub(crate) fn replace_child(&mut self, old: NodeId, new: NodeId) {
        for child in self.children.iter_mut().filter(|child| **child == old) {
            *child = new;
        }
    }
}

impl GraphNode for DrawableNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn parent_ids(&self) -> &[NodeId] {
        &self.parents
    }

    fn child_ids(&self) -> &[NodeId] {
        &self.children
    }
}

impl PartialEq for DrawableNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for DrawableNode {}

impl fmt::Display for DrawableNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            NodeKind::Segment => write!(f, "Segment<{}>", self.id),
            NodeKind::Dummy => write!(f, "Dummy<{}>", self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_width_follows_sequence_length() {
        let mut node = DrawableNode::segment(1, 100, 2, vec![], vec![]);
        assert_eq!(node.width(), 20.0);
        assert_eq!(node.height(), 10.0);
        node.set_draw_dimensions(2.0);
        assert_eq!(node.width(), 40.0);
        assert_eq!(node.height(), 20.0);
    }

    #[test]
    fn dummy_has_no_width() {
        let node = DrawableNode::dummy(-1, 3, 4, 1);
        assert!(node.is_dummy());
        assert_eq!(node.width(), 0.0);
        assert_eq!(node.parent_ids(), &[3]);
        assert_eq!(node.child_ids(), &[4]);
    }

    #[test]
    fn equality_is_by_id_only() {
        let a = DrawableNode::segment(7, 4, 1, vec![1], vec![]);
        let b = DrawableNode::segment(7, 9, 3, vec![], vec![2]);
        assert_eq!(a, b);
    }
}
