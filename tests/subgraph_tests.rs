use std::collections::{BTreeSet, HashMap};

use genograph::{
    DrawableNode, GenomeGraph, GenomeGraphError, GraphNode, SubGraph,
    bench_utils::{GraphShape, generate_graph},
};
use rand::{Rng, SeedableRng, rngs::StdRng};

/// 1->2, 1->5, 2->4, 4->5, 5->6, 6->7, 7->8, 8->3
const EDGES: [(i64, i64); 8] = [(1, 2), (1, 5), (2, 4), (4, 5), (5, 6), (6, 7), (7, 8), (8, 3)];

fn fixture_graph() -> GenomeGraph {
    let graph = GenomeGraph::open_in_memory("fixture").expect("graph");
    for id in 1..=8 {
        graph.add_node(id, "ACGT").unwrap();
    }
    for (from, to) in EDGES {
        graph.add_edge(from, to).unwrap();
    }
    graph
}

fn node(id: i64, parents: &[i64], children: &[i64]) -> DrawableNode {
    DrawableNode::segment(id, 4, 1, parents.to_vec(), children.to_vec())
}

fn ids(set: &BTreeSet<i64>) -> Vec<i64> {
    set.iter().copied().collect()
}

/// Roots and ends recomputed from scratch must match the incrementally kept sets.
fn assert_consistent(subgraph: &SubGraph) {
    let mut fresh = subgraph.clone();
    fresh.recalculate_roots_and_ends();
    assert_eq!(subgraph.roots(), fresh.roots());
    assert_eq!(subgraph.ends(), fresh.ends());
    for id in subgraph.node_ids() {
        assert_eq!(
            subgraph.roots().contains(&id),
            subgraph.present_parents(id).is_empty(),
            "root status of {id}"
        );
        assert_eq!(
            subgraph.ends().contains(&id),
            subgraph.present_children(id).is_empty(),
            "end status of {id}"
        );
    }
}

const SEEDS: [u64; 3] = [0x11, 0x2A, 0x5EED];
const NODES: usize = 40;
const CENTERS: [i64; 4] = [0, 13, 27, 39];

fn generated_graphs() -> Vec<GenomeGraph> {
    let mut graphs = Vec::new();
    for seed in SEEDS {
        for shape in [
            GraphShape::RandomDag { edges: 60 },
            GraphShape::Bubbles { period: 3 },
        ] {
            let dataset = generate_graph(shape, NODES, seed);
            let graph = GenomeGraph::open_in_memory(format!("seed_{seed}")).expect("graph");
            dataset.materialize(&graph).expect("materialize");
            graphs.push(graph);
        }
    }
    graphs
}

fn assert_topological(subgraph: &SubGraph) {
    let order = subgraph.topo_sort().unwrap();
    let mut sorted = order.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, subgraph.node_ids().collect::<Vec<_>>());
    let index: HashMap<i64, usize> = order
        .iter()
        .enumerate()
        .map(|(position, &id)| (id, position))
        .collect();
    for (parent, child) in subgraph.edges() {
        assert!(index[&parent] < index[&child], "{parent} before {child}");
    }
}

#[test]
fn radius_zero_is_just_the_center() {
    let graph = fixture_graph();
    let subgraph = SubGraph::build(&graph, 4, 0).unwrap();
    assert_eq!(subgraph.node_ids().collect::<Vec<_>>(), vec![4]);
    assert_eq!(ids(subgraph.roots()), vec![4]);
    assert_eq!(ids(subgraph.ends()), vec![4]);
}

#[test]
fn radius_one_takes_direct_neighbours() {
    let graph = fixture_graph();
    let subgraph = SubGraph::build(&graph, 4, 1).unwrap();
    assert_eq!(subgraph.len(), 3);
    assert_eq!(subgraph.node_ids().collect::<Vec<_>>(), vec![2, 4, 5]);
    assert_eq!(ids(subgraph.roots()), vec![2]);
    assert_eq!(ids(subgraph.ends()), vec![5]);
}

#[test]
fn radius_four_stops_before_far_end() {
    let graph = fixture_graph();
    let subgraph = SubGraph::build(&graph, 4, 4).unwrap();
    assert_eq!(
        subgraph.node_ids().collect::<Vec<_>>(),
        vec![1, 2, 4, 5, 6, 7, 8]
    );
    assert!(!subgraph.contains(3));
    assert_eq!(ids(subgraph.roots()), vec![1]);
    assert_eq!(ids(subgraph.ends()), vec![8]);
    assert_consistent(&subgraph);
}

#[test]
fn growing_radius_never_loses_nodes() {
    let graph = fixture_graph();
    let mut previous: BTreeSet<i64> = BTreeSet::new();
    for radius in 0..8 {
        let current: BTreeSet<i64> = SubGraph::build(&graph, 4, radius)
            .unwrap()
            .node_ids()
            .collect();
        assert!(previous.is_subset(&current), "radius {radius}");
        previous = current;
    }
    assert_eq!(previous.len(), 8);
}

#[test]
fn first_visit_budget_is_kept() {
    // 0 -> 1 -> 2 -> 3 and a shortcut 0 -> 2. The long way reaches 2 first with no
    // budget left, so 3 is missed although the shortcut puts it two hops away.
    let subgraph = SubGraph::build_with(0, 2, |id| {
        Ok(match id {
            0 => node(0, &[], &[1, 2]),
            1 => node(1, &[0], &[2]),
            2 => node(2, &[0, 1], &[3]),
            3 => node(3, &[2], &[]),
            other => return Err(GenomeGraphError::not_found(format!("node {other}"))),
        })
    })
    .unwrap();
    assert_eq!(subgraph.node_ids().collect::<Vec<_>>(), vec![0, 1, 2]);
}

#[test]
fn unknown_center_fails() {
    let graph = fixture_graph();
    assert!(matches!(
        SubGraph::build(&graph, 99, 2),
        Err(GenomeGraphError::NotFound(_))
    ));
}

#[test]
fn whole_graph_has_single_root_and_end() {
    let graph = fixture_graph();
    let subgraph = SubGraph::whole(&graph).unwrap();
    assert_eq!(subgraph.len(), 8);
    assert_eq!(ids(subgraph.roots()), vec![1]);
    assert_eq!(ids(subgraph.ends()), vec![3]);
    assert_eq!(subgraph.edges().len(), EDGES.len());
}

#[test]
fn add_and_remove_keep_roots_and_ends() {
    let mut subgraph: SubGraph = SubGraph::new();
    subgraph.add_node(node(2, &[1], &[3])).unwrap();
    assert_eq!(ids(subgraph.roots()), vec![2]);
    subgraph.add_node(node(1, &[], &[2])).unwrap();
    subgraph.add_node(node(3, &[2], &[])).unwrap();
    assert_eq!(ids(subgraph.roots()), vec![1]);
    assert_eq!(ids(subgraph.ends()), vec![3]);
    assert_consistent(&subgraph);

    let removed = subgraph.remove_node(2).unwrap();
    assert_eq!(removed.id(), 2);
    assert_eq!(ids(subgraph.roots()), vec![1, 3]);
    assert_eq!(ids(subgraph.ends()), vec![1, 3]);
    assert_consistent(&subgraph);
    assert!(subgraph.remove_node(2).is_none());
}

#[test]
fn duplicate_ids_are_rejected() {
    let mut subgraph: SubGraph = SubGraph::new();
    subgraph.add_node(node(1, &[], &[])).unwrap();
    assert!(matches!(
        subgraph.add_node(node(1, &[], &[])),
        Err(GenomeGraphError::DuplicateId(1))
    ));
}

#[test]
fn replace_node_returns_previous() {
    let mut subgraph: SubGraph = SubGraph::from_nodes([node(1, &[], &[2]), node(2, &[1], &[])]);
    let previous = subgraph
        .replace_node(DrawableNode::segment(2, 99, 3, vec![1], vec![]))
        .unwrap();
    assert_eq!(previous.sequence_length(), 4);
    assert_eq!(subgraph.get(2).unwrap().sequence_length(), 99);
    assert!(subgraph.replace_node(node(3, &[2], &[])).is_none());
    assert_eq!(ids(subgraph.ends()), vec![3]);
    assert_consistent(&subgraph);
}

#[test]
fn bulk_operations_recompute_once() {
    let mut subgraph: SubGraph = SubGraph::new();
    subgraph
        .add_all([node(1, &[], &[2]), node(2, &[1], &[3]), node(3, &[2], &[])])
        .unwrap();
    assert_eq!(ids(subgraph.roots()), vec![1]);
    assert_eq!(ids(subgraph.ends()), vec![3]);

    let err = subgraph.add_all([node(4, &[3], &[]), node(2, &[], &[])]);
    assert!(matches!(err, Err(GenomeGraphError::DuplicateId(2))));
    assert!(subgraph.contains(4));
    assert_eq!(ids(subgraph.ends()), vec![3, 4]);

    let replaced = subgraph.replace_all([node(2, &[], &[3]), node(5, &[], &[])]);
    assert_eq!(replaced.len(), 1);
    assert_eq!(ids(subgraph.roots()), vec![1, 2, 5]);

    let removed = subgraph.remove_all(&[1, 2, 42]);
    assert_eq!(removed.len(), 2);
    assert_eq!(subgraph.node_ids().collect::<Vec<_>>(), vec![3, 4, 5]);
    assert_eq!(ids(subgraph.roots()), vec![3, 5]);
    assert_consistent(&subgraph);
}

#[test]
fn contains_any_checks_each_id() {
    let subgraph: SubGraph = SubGraph::from_nodes([node(4, &[], &[])]);
    assert!(subgraph.contains_any(&[1, 4]));
    assert!(!subgraph.contains_any(&[1, 2]));
    assert!(!subgraph.contains_any(std::iter::empty::<&i64>()));
}

#[test]
fn topo_sort_orders_parents_first() {
    let graph = fixture_graph();
    let subgraph = SubGraph::whole(&graph).unwrap();
    let order = subgraph.topo_sort().unwrap();
    assert_eq!(order, vec![1, 2, 4, 5, 6, 7, 8, 3]);
    for (from, to) in EDGES {
        let a = order.iter().position(|&id| id == from).unwrap();
        let b = order.iter().position(|&id| id == to).unwrap();
        assert!(a < b, "{from} before {to}");
    }
}

#[test]
fn topo_sort_ignores_absent_neighbours() {
    let graph = fixture_graph();
    let subgraph = SubGraph::build(&graph, 4, 1).unwrap();
    assert_eq!(subgraph.topo_sort().unwrap(), vec![2, 4, 5]);
}

#[test]
fn topo_sort_reports_cycles() {
    let subgraph: SubGraph = SubGraph::from_nodes([
        node(1, &[3], &[2]),
        node(2, &[1], &[3]),
        node(3, &[2], &[1]),
    ]);
    assert!(matches!(
        subgraph.topo_sort(),
        Err(GenomeGraphError::InvalidInput(_))
    ));
}

#[test]
fn generated_graphs_sort_topologically() {
    for graph in generated_graphs() {
        assert_topological(&SubGraph::whole(&graph).unwrap());
        for center in CENTERS {
            for radius in [1, 3, 6] {
                assert_topological(&SubGraph::build(&graph, center, radius).unwrap());
            }
        }
    }
}

#[test]
fn built_subgraphs_have_consistent_roots_and_ends() {
    for graph in generated_graphs() {
        for center in CENTERS {
            for radius in 0..6 {
                assert_consistent(&SubGraph::build(&graph, center, radius).unwrap());
            }
        }
    }
}

#[test]
fn random_edits_keep_roots_and_ends() {
    for (graph, seed) in generated_graphs().into_iter().zip(0u64..) {
        let pool: Vec<DrawableNode> = (0..NODES as i64)
            .map(|id| DrawableNode::from_graph(&graph, id).unwrap())
            .collect();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut subgraph: SubGraph = SubGraph::new();
        for _ in 0..300 {
            let node = pool[rng.gen_range(0..pool.len())].clone();
            let id = node.id();
            match rng.gen_range(0..3) {
                0 => {
                    let present = subgraph.contains(id);
                    match subgraph.add_node(node) {
                        Ok(()) => assert!(!present),
                        Err(GenomeGraphError::DuplicateId(dup)) => {
                            assert!(present);
                            assert_eq!(dup, id);
                        }
                        Err(other) => panic!("unexpected error {other}"),
                    }
                }
                1 => {
                    let present = subgraph.contains(id);
                    assert_eq!(subgraph.remove_node(id).is_some(), present);
                }
                _ => {
                    let present = subgraph.contains(id);
                    assert_eq!(subgraph.replace_node(node).is_some(), present);
                }
            }
            assert_consistent(&subgraph);
        }
    }
}

#[test]
fn growing_radius_never_loses_nodes_on_paths() {
    // every node of a path has exactly one route from the center
    for seed in SEEDS {
        let dataset = generate_graph(GraphShape::Line, NODES, seed);
        let graph = GenomeGraph::open_in_memory("line").expect("graph");
        dataset.materialize(&graph).expect("materialize");
        for center in CENTERS {
            let mut previous: BTreeSet<i64> = BTreeSet::new();
            for radius in 0..=NODES as u32 {
                let current: BTreeSet<i64> = SubGraph::build(&graph, center, radius)
                    .unwrap()
                    .node_ids()
                    .collect();
                assert!(previous.is_subset(&current), "center {center} radius {radius}");
                previous = current;
            }
            assert_eq!(previous.len(), NODES);
        }
    }
}

#[test]
fn larger_radius_can_reach_a_node_first_with_less_budget() {
    // 0 -> 1 -> 2 -> 4 -> 5 plus a shortcut 0 -> 4. At radius 2 node 4 is first reached
    // through the shortcut and still expands to 5. At radius 3 the long way gets there
    // first with nothing left, and the shortcut visit is skipped.
    let load = |id: i64| {
        Ok(match id {
            0 => node(0, &[], &[1, 4]),
            1 => node(1, &[0], &[2]),
            2 => node(2, &[1], &[4]),
            4 => node(4, &[0, 2], &[5]),
            5 => node(5, &[4], &[]),
            other => return Err(GenomeGraphError::not_found(format!("node {other}"))),
        })
    };
    let two = SubGraph::build_with(0, 2, load).unwrap();
    let three = SubGraph::build_with(0, 3, load).unwrap();
    assert_eq!(two.node_ids().collect::<Vec<_>>(), vec![0, 1, 2, 4, 5]);
    assert_eq!(three.node_ids().collect::<Vec<_>>(), vec![0, 1, 2, 4]);
}
