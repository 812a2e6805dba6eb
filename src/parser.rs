//! GFA reader feeding a [`GenomeGraph`].
//!
//! Only the three line types the viewer needs are understood: `H` (genome names in an
//! `ORI:Z:` tag), `S` (segments, with an optional `ORI:Z:` membership tag) and `L`
//! (links). Anything else fails the whole parse, after which the partially written store
//! is deleted rather than repaired.
//!
//! [`GraphParser::spawn`] runs the parse on a background thread and hands back a
//! [`ParseTask`] that resolves exactly once, with either the populated graph or the
//! failure.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    thread::{self, JoinHandle},
};

use serde::Serialize;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use crate::{
    GenomeId, NodeId, config::StoreConfig, errors::GenomeGraphError, graph::GenomeGraph,
    store::has_store,
};

const GENOME_TAG: &str = "ORI:Z:";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ParseStats {
    pub headers: usize,
    pub segments: usize,
    pub links: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind {
    Header,
    Segment,
    Link,
}

#[derive(Clone, Debug)]
pub struct GraphParser {
    input: PathBuf,
    config: StoreConfig,
}

impl GraphParser {
    pub fn new<P: AsRef<Path>>(input: P, config: StoreConfig) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            config,
        }
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    /// Parses the input into its store, or reuses the store if an earlier parse of the
    /// same file finished.
    pub fn parse(&self) -> Result<GenomeGraph, GenomeGraphError> {
        let existed = has_store(&self.input, &self.config)?;
        let mut graph = GenomeGraph::open_for_input(&self.input, &self.config)?;
        if existed {
            if graph.store().is_complete()? {
                info!(input = %self.input.display(), "reusing existing graph store");
                return Ok(graph);
            }
            warn!(input = %self.input.display(), "discarding incomplete graph store");
            graph.remove_cache()?;
            graph = GenomeGraph::open_for_input(&self.input, &self.config)?;
        }

        info!(input = %self.input.display(), "parsing graph");
        let file = match File::open(&self.input) {
            Ok(file) => file,
            Err(err) => {
                discard(&mut graph);
                return Err(GenomeGraphError::file_access(format!(
                    "cannot read {}: {err}",
                    self.input.display()
                )));
            }
        };
        match read_into(&graph, BufReader::new(file)) {
            Ok(stats) => {
                info!(
                    segments = stats.segments,
                    links = stats.links,
                    headers = stats.headers,
                    "parsed graph"
                );
                Ok(graph)
            }
            Err(err) => {
                warn!(error = %err, input = %self.input.display(), "parse failed");
                discard(&mut graph);
                Err(err)
            }
        }
    }

    /// Starts [`GraphParser::parse`] on a background thread.
    pub fn spawn(self) -> ParseTask {
        let (sender, receiver) = oneshot::channel();
        let spawned = thread::Builder::new()
            .name("gfa-parser".to_string())
            .spawn(move || {
                let result = self.parse();
                if sender.send(result).is_err() {
                    debug!("parse result dropped, nobody is waiting");
                }
            });
        let handle = match spawned {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!(error = %err, "failed to start parser thread");
                None
            }
        };
        ParseTask { receiver, handle }
    }
}

/// The single pending result of a background parse.
pub struct ParseTask {
    receiver: oneshot::Receiver<Result<GenomeGraph, GenomeGraphError>>,
    handle: Option<JoinHandle<()>>,
}

impl ParseTask {
    /// Blocks until the parse resolves. Must not be called from inside an async runtime.
    pub fn wait(mut self) -> Result<GenomeGraph, GenomeGraphError> {
        let result = self
            .receiver
            .blocking_recv()
            .map_err(|_| GenomeGraphError::aborted("parser stopped without reporting a result"));
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("parser thread panicked");
            }
        }
        result?
    }

    /// Returns the result if it is ready, without blocking.
    ///
    /// Yields `Some` once; polling again after that reports the task as aborted.
    pub fn try_result(&mut self) -> Option<Result<GenomeGraph, GenomeGraphError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(GenomeGraphError::aborted(
                "parser stopped without reporting a result",
            ))),
        }
    }
}

/// Reads every line of `reader` into `graph` inside one write batch.
pub fn read_into<R: BufRead>(graph: &GenomeGraph, reader: R) -> Result<ParseStats, GenomeGraphError> {
    graph.store().write_batch(|store| {
        let mut stats = ParseStats::default();
        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| GenomeGraphError::file_access(e.to_string()))?;
            let kind = parse_line(graph, &line).map_err(|err| match err {
                GenomeGraphError::UnknownFormat(msg) => {
                    GenomeGraphError::unknown_format(format!("line {}: {msg}", index + 1))
                }
                other => other,
            })?;
            match kind {
                Some(LineKind::Header) => stats.headers += 1,
                Some(LineKind::Segment) => stats.segments += 1,
                Some(LineKind::Link) => stats.links += 1,
                None => {}
            }
        }
        // links may precede their segments, so endpoints are checked once at the end
        let dangling = store.dangling_node_ids()?;
        if !dangling.is_empty() {
            let ids = dangling
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(GenomeGraphError::unknown_format(format!(
                "links reference segments that were never defined: {ids}"
            )));
        }
        store.mark_complete()?;
        Ok(stats)
    })
}

/// Applies one GFA line to `graph`. Blank lines are skipped and yield `None`.
pub fn parse_line(graph: &GenomeGraph, line: &str) -> Result<Option<LineKind>, GenomeGraphError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(None);
    }
    let mut fields = line.split('\t');
    match fields.next() {
        Some("H") => {
            parse_header(graph, fields)?;
            Ok(Some(LineKind::Header))
        }
        Some("S") => {
            parse_segment(graph, fields)?;
            Ok(Some(LineKind::Segment))
        }
        Some("L") => {
            parse_link(graph, fields)?;
            Ok(Some(LineKind::Link))
        }
        Some(other) => Err(GenomeGraphError::unknown_format(format!(
            "unknown line type {other:?}"
        ))),
        None => Ok(None),
    }
}

fn parse_header<'a, I>(graph: &GenomeGraph, fields: I) -> Result<(), GenomeGraphError>
where
    I: Iterator<Item = &'a str>,
{
    for names in fields.filter_map(|field| field.strip_prefix(GENOME_TAG)) {
        for name in split_names(names) {
            graph.store().genome_id_or_insert(name)?;
        }
    }
    Ok(())
}

fn parse_segment<'a, I>(graph: &GenomeGraph, mut fields: I) -> Result<(), GenomeGraphError>
where
    I: Iterator<Item = &'a str>,
{
    let id = parse_id(fields.next(), "segment id")?;
    let sequence = fields
        .next()
        .filter(|sequence| !sequence.is_empty())
        .ok_or_else(|| GenomeGraphError::unknown_format(format!("segment {id} has no sequence")))?;
    // orientation marker
    fields.next();

    let mut genomes: Vec<GenomeId> = Vec::new();
    for names in fields.filter_map(|field| field.strip_prefix(GENOME_TAG)) {
        for name in split_names(names) {
            let genome = graph.store().genome_id_or_insert(name)?;
            if !genomes.contains(&genome) {
                genomes.push(genome);
            }
        }
    }

    graph.add_node(id, sequence)?;
    graph.store().set_genomes(id, &genomes)
}

fn parse_link<'a, I>(graph: &GenomeGraph, mut fields: I) -> Result<(), GenomeGraphError>
where
    I: Iterator<Item = &'a str>,
{
    let from = parse_id(fields.next(), "link source")?;
    fields.next();
    let to = parse_id(fields.next(), "link target")?;
    graph.add_edge(from, to)
}

fn parse_id(field: Option<&str>, what: &str) -> Result<NodeId, GenomeGraphError> {
    let field = field.ok_or_else(|| GenomeGraphError::unknown_format(format!("missing {what}")))?;
    match field.parse::<NodeId>() {
        Ok(id) if id >= 0 => Ok(id),
        _ => Err(GenomeGraphError::unknown_format(format!(
            "{what} {field:?} is not a node id"
        ))),
    }
}

fn split_names(names: &str) -> impl Iterator<Item = &str> {
    names.split(';').map(str::trim).filter(|name| !name.is_empty())
}

fn discard(graph: &mut GenomeGraph) {
    if let Err(err) = graph.remove_cache() {
        warn!(error = %err, "failed to remove graph store");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_rejects_negative_and_text() {
        assert_eq!(parse_id(Some("12"), "id").unwrap(), 12);
        assert!(matches!(
            parse_id(Some("-1"), "id"),
            Err(GenomeGraphError::UnknownFormat(_))
        ));
        assert!(matches!(
            parse_id(Some("x"), "id"),
            Err(GenomeGraphError::UnknownFormat(_))
        ));
        assert!(matches!(
            parse_id(None, "id"),
            Err(GenomeGraphError::UnknownFormat(_))
        ));
    }

    #[test]
    fn split_names_skips_empty_items() {
        let names: Vec<&str> = split_names("a.fasta;;b.fasta;").collect();
        assert_eq!(names, vec!["a.fasta", "b.fasta"]);
    }
}
