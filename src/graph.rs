use std::{
    fmt,
    hash::{Hash, Hasher},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{
    GenomeId, NodeId, config::StoreConfig, errors::GenomeGraphError, store::GraphStore,
};

/// A directed link between two segments, annotated with the genomes attributed to it.
///
/// Links are derived from the adjacency arrays on request and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Link {
    pub start: NodeId,
    pub end: NodeId,
    pub genomes: Vec<GenomeId>,
}

/// Graph-shaped view over a [`GraphStore`].
///
/// The graph owns its store; every component that needs the store borrows the graph.
pub struct GenomeGraph {
    name: String,
    store: GraphStore,
}

impl GenomeGraph {
    pub fn new<S: Into<String>>(name: S, store: GraphStore) -> Self {
        Self {
            name: name.into(),
            store,
        }
    }

    /// Opens the graph whose store is derived from `input`, reusing an existing store.
    pub fn open_for_input<P: AsRef<Path>>(
        input: P,
        config: &StoreConfig,
    ) -> Result<Self, GenomeGraphError> {
        let input = input.as_ref();
        let name = input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(name, GraphStore::open_for_input(input, config)?))
    }

    pub fn open_in_memory<S: Into<String>>(name: S) -> Result<Self, GenomeGraphError> {
        Ok(Self::new(name, GraphStore::open_in_memory()?))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut GraphStore {
        &mut self.store
    }

    pub fn into_store(self) -> GraphStore {
        self.store
    }

    /// Number of nodes registered in the store.
    pub fn size(&self) -> Result<usize, GenomeGraphError> {
        self.store.node_count()
    }

    pub fn contains(&self, id: NodeId) -> Result<bool, GenomeGraphError> {
        self.store.contains_node(id)
    }

    /// Returns a handle for `id`, failing if the node has no sequence.
    pub fn segment(&self, id: NodeId) -> Result<Segment<'_>, GenomeGraphError> {
        if !self.contains(id)? {
            return Err(GenomeGraphError::not_found(format!("node {id}")));
        }
        Ok(Segment { id, graph: self })
    }

    pub fn segments(&self) -> Result<Vec<Segment<'_>>, GenomeGraphError> {
        Ok(self
            .store
            .node_ids()?
            .into_iter()
            .map(|id| Segment { id, graph: self })
            .collect())
    }

    /// Registers a node with an empty genome membership; an existing membership is kept.
    pub fn add_node(&self, id: NodeId, sequence: &str) -> Result<(), GenomeGraphError> {
        if id < 0 {
            return Err(GenomeGraphError::invalid_input(format!(
                "node ids must not be negative, got {id}"
            )));
        }
        self.store.write_batch(|store| {
            store.set_sequence(id, sequence)?;
            store.init_genomes(id)
        })
    }

    pub fn add_child(&self, parent: NodeId, child: NodeId) -> Result<(), GenomeGraphError> {
        self.store.add_child(parent, child)
    }

    pub fn add_parent(&self, child: NodeId, parent: NodeId) -> Result<(), GenomeGraphError> {
        self.store.add_parent(child, parent)
    }

    /// Registers `from -> to` on both adjacency arrays.
    pub fn add_edge(&self, from: NodeId, to: NodeId) -> Result<(), GenomeGraphError> {
        self.store.write_batch(|store| {
            store.add_child(from, to)?;
            store.add_parent(to, from)
        })
    }

    pub fn get_sequence(&self, id: NodeId) -> Result<String, GenomeGraphError> {
        self.store.get_sequence(id)
    }

    pub fn get_sequence_length(&self, id: NodeId) -> Result<usize, GenomeGraphError> {
        self.store.get_sequence_length(id)
    }

    pub fn get_children(&self, id: NodeId) -> Result<Vec<NodeId>, GenomeGraphError> {
        self.store.get_children_adjacency(id)
    }

    pub fn get_parents(&self, id: NodeId) -> Result<Vec<NodeId>, GenomeGraphError> {
        self.store.get_parents_adjacency(id)
    }

    pub fn get_genomes(&self, id: NodeId) -> Result<Vec<GenomeId>, GenomeGraphError> {
        self.store.get_genomes(id)
    }

    pub fn get_genome_count(&self, id: NodeId) -> Result<usize, GenomeGraphError> {
        self.store.get_genome_count(id)
    }

    pub fn genome_nodes(&self, genome: GenomeId) -> Result<Vec<NodeId>, GenomeGraphError> {
        self.store.genome_node_ids(genome)
    }

    /// Deletes the backing store. The graph is unusable afterwards.
    pub fn remove_cache(&mut self) -> Result<(), GenomeGraphError> {
        self.store.rollback()
    }
}

/// Lightweight handle for one node.
///
/// Every accessor goes back to the store, so a handle never holds stale data. Two
/// handles are equal iff their ids are.
#[derive(Clone, Copy)]
pub struct Segment<'g> {
    id: NodeId,
    graph: &'g GenomeGraph,
}

impl<'g> Segment<'g> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn sequence(&self) -> Result<String, GenomeGraphError> {
        self.graph.get_sequence(self.id)
    }

    pub fn sequence_len(&self) -> Result<usize, GenomeGraphError> {
        self.graph.get_sequence_length(self.id)
    }

    pub fn genomes(&self) -> Result<Vec<GenomeId>, GenomeGraphError> {
        self.graph.get_genomes(self.id)
    }

    pub fn children(&self) -> Result<Vec<Segment<'g>>, GenomeGraphError> {
        Ok(self
            .graph
            .get_children(self.id)?
            .into_iter()
            .map(|id| Segment {
                id,
                graph: self.graph,
            })
            .collect())
    }

    pub fn parents(&self) -> Result<Vec<Segment<'g>>, GenomeGraphError> {
        Ok(self
            .graph
            .get_parents(self.id)?
            .into_iter()
            .map(|id| Segment {
                id,
                graph: self.graph,
            })
            .collect())
    }

    /// Links to every child; each carries the child's genomes.
    pub fn child_links(&self) -> Result<Vec<Link>, GenomeGraphError> {
        let mut links = Vec::new();
        for child in self.graph.get_children(self.id)? {
            links.push(Link {
                start: self.id,
                end: child,
                genomes: self.graph.get_genomes(child)?,
            });
        }
        Ok(links)
    }

    /// Links from every parent; each carries this node's genomes.
    pub fn parent_links(&self) -> Result<Vec<Link>, GenomeGraphError> {
        let genomes = self.genomes()?;
        Ok(self
            .graph
            .get_parents(self.id)?
            .into_iter()
            .map(|parent| Link {
                start: parent,
                end: self.id,
                genomes: genomes.clone(),
            })
            .collect())
    }
}

impl PartialEq for Segment<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Segment<'_> {}

impl Hash for Segment<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Segment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segment").field("id", &self.id).finish()
    }
}

impl fmt::Display for Segment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sequence() {
            Ok(sequence) => write!(
                f,
                "Segment<{}>[s({}):{}]",
                self.id,
                sequence.len(),
                abbreviate(&sequence, 11)
            ),
            Err(_) => write!(f, "Segment<{}>[?]", self.id),
        }
    }
}

fn abbreviate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[cfg(test)]
mod tests {
    use super::abbreviate;

    #[test]
    fn abbreviate_keeps_short_text() {
        assert_eq!(abbreviate("ACGT", 11), "ACGT");
    }

    #[test]
    fn abbreviate_truncates_long_text() {
        assert_eq!(abbreviate("ACGTACGTACGTACGT", 11), "ACGTACGT...");
    }
}
