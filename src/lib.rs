//! Disk-backed genome graph index for interactive visualisation.
//!
//! A GFA file is parsed once into a SQLite store ([`store`]), viewed as a graph
//! ([`graph`]), cut into radius-bounded neighbourhoods ([`subgraph`]) and laid out in
//! ranked layers ([`layout`]).
//! Run Criterion benchmarks with `cargo bench` to inspect reports under `target/criterion`.

pub mod bench_utils;
pub mod cache;
pub mod client;
pub mod config;
pub mod drawable;
pub mod errors;
pub mod graph;
pub mod layout;
pub mod parser;
pub mod schema;
pub mod store;
pub mod subgraph;

/// Identifier of a node. Negative values are reserved for layout dummies.
pub type NodeId = i64;
/// Identifier of a genome, assigned 0, 1, 2, … in first-seen order.
pub type GenomeId = i64;

pub use crate::config::{LayoutConfig, StoreConfig};
pub use crate::drawable::{DrawableNode, NodeKind, Point};
pub use crate::errors::GenomeGraphError;
pub use crate::graph::{GenomeGraph, Link, Segment};
pub use crate::layout::{Layer, LayeredLayout, LayoutEdge, LayoutResult};
pub use crate::parser::{GraphParser, ParseStats, ParseTask};
pub use crate::store::{GraphStore, StoreStats};
pub use crate::subgraph::{GraphNode, SubGraph};
