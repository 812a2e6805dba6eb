//! Seeded synthetic genome graphs for benchmarks and tests.

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{GenomeGraphError, NodeId, graph::GenomeGraph};

const BASES: [char; 4] = ['A', 'C', 'G', 'T'];

#[derive(Clone, Debug)]
pub struct GraphDataset {
    pub genomes: Vec<String>,
    pub segments: Vec<(NodeId, String)>,
    pub edges: Vec<(NodeId, NodeId)>,
}

impl GraphDataset {
    pub fn nodes(&self) -> usize {
        self.segments.len()
    }

    pub fn edges(&self) -> usize {
        self.edges.len()
    }

    /// Node with the most incident edges; lowest id on ties.
    pub fn hub(&self) -> NodeId {
        let mut counts = vec![0usize; self.segments.len()];
        for &(from, to) in &self.edges {
            counts[from as usize] += 1;
            counts[to as usize] += 1;
        }
        let mut best = (0usize, 0usize);
        for (idx, deg) in counts.into_iter().enumerate() {
            if deg > best.0 {
                best = (deg, idx);
            }
        }
        best.1 as NodeId
    }

    /// Renders the dataset as GFA; every segment is traversed by every genome.
    pub fn to_gfa(&self) -> String {
        let membership = if self.genomes.is_empty() {
            String::new()
        } else {
            format!("\tORI:Z:{}", self.genomes.join(";"))
        };
        let mut out = String::from("H\tVN:Z:1.0\n");
        if !self.genomes.is_empty() {
            out.push_str(&format!("H{membership}\n"));
        }
        for (id, sequence) in &self.segments {
            out.push_str(&format!("S\t{id}\t{sequence}\t*{membership}\n"));
        }
        for (from, to) in &self.edges {
            out.push_str(&format!("L\t{from}\t+\t{to}\t+\t0M\n"));
        }
        out
    }

    /// Writes the dataset straight into `graph`.
    pub fn materialize(&self, graph: &GenomeGraph) -> Result<(), GenomeGraphError> {
        graph.store().write_batch(|store| {
            let genomes = self
                .genomes
                .iter()
                .map(|name| store.genome_id_or_insert(name))
                .collect::<Result<Vec<_>, _>>()?;
            for (id, sequence) in &self.segments {
                graph.add_node(*id, sequence)?;
                store.set_genomes(*id, &genomes)?;
            }
            for &(from, to) in &self.edges {
                graph.add_edge(from, to)?;
            }
            store.mark_complete()
        })
    }
}

#[derive(Clone, Debug)]
pub enum GraphShape {
    /// 0 -> 1 -> 2 -> ...
    Line,
    /// A chain where every `period`-th node opens a two-way bubble.
    Bubbles { period: usize },
    /// Random forward edges; acyclic because every edge goes to a larger id.
    RandomDag { edges: usize },
}

pub fn generate_graph(shape: GraphShape, node_count: usize, seed: u64) -> GraphDataset {
    assert!(node_count > 1, "node_count must exceed 1");
    let mut rng = StdRng::seed_from_u64(seed);
    let segments = (0..node_count)
        .map(|id| (id as NodeId, random_sequence(&mut rng)))
        .collect();
    let mut edges = match shape {
        GraphShape::Line => generate_line_edges(node_count),
        GraphShape::Bubbles { period } => generate_bubble_edges(node_count, period.max(3)),
        GraphShape::RandomDag { edges } => generate_random_edges(node_count, edges, &mut rng),
    };
    edges.sort_unstable();
    edges.dedup();
    GraphDataset {
        genomes: vec!["ref.fasta".to_string(), "alt.fasta".to_string()],
        segments,
        edges,
    }
}

fn random_sequence(rng: &mut StdRng) -> String {
    let len = rng.gen_range(1..=64);
    (0..len).map(|_| BASES[rng.gen_range(0..BASES.len())]).collect()
}

fn generate_line_edges(node_count: usize) -> Vec<(NodeId, NodeId)> {
    (1..node_count)
        .map(|to| ((to - 1) as NodeId, to as NodeId))
        .collect()
}

fn generate_bubble_edges(node_count: usize, period: usize) -> Vec<(NodeId, NodeId)> {
    let mut edges = generate_line_edges(node_count);
    for start in (0..node_count.saturating_sub(2)).step_by(period) {
        edges.push((start as NodeId, (start + 2) as NodeId));
    }
    edges
}

fn generate_random_edges(
    node_count: usize,
    edge_count: usize,
    rng: &mut StdRng,
) -> Vec<(NodeId, NodeId)> {
    let mut edges = generate_line_edges(node_count);
    for _ in 0..edge_count {
        let from = rng.gen_range(0..node_count - 1);
        let to = rng.gen_range(from + 1..node_count);
        edges.push((from as NodeId, to as NodeId));
    }
    edges
}
