use genograph::{GenomeGraph, cache::AdjacencyCache};

#[test]
fn test_adjacency_cache_get_insert_clear() {
    let cache = AdjacencyCache::new();
    assert!(cache.get(1).is_none());
    cache.insert(1, vec![2, 3]);
    assert_eq!(cache.get(1), Some(vec![2, 3]));
    assert_eq!(cache.len(), 1);
    cache.invalidate(1);
    assert!(cache.get(1).is_none());
    cache.insert(4, vec![]);
    cache.clear();
    assert!(cache.is_empty());
}

#[test]
fn test_cached_children_follow_new_edges() {
    let graph = GenomeGraph::open_in_memory("cache").expect("graph");
    for id in 1..=3 {
        graph.add_node(id, "A").unwrap();
    }
    graph.add_edge(1, 2).unwrap();
    assert_eq!(graph.get_children(1).unwrap(), vec![2]);
    assert_eq!(graph.get_children(1).unwrap(), vec![2]);
    graph.add_edge(1, 3).unwrap();
    assert_eq!(graph.get_children(1).unwrap(), vec![2, 3]);
    assert_eq!(graph.get_parents(3).unwrap(), vec![1]);
}
