//! Disk-backed tables for one parsed genome graph.
//!
//! A [`GraphStore`] wraps a single SQLite database holding node sequences (with cached
//! lengths), the genome name table in both directions, node-genome membership with its
//! cached cardinality, persisted parent/child adjacency arrays and the node counter.
//! There is exactly one store per input file; see [`store_path_for`] for the layout on
//! disk. The store never locks: a handle is `Send` but not `Sync`, and writers are
//! serialised by whoever owns it.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    GenomeId, NodeId,
    cache::AdjacencyCache,
    config::StoreConfig,
    errors::GenomeGraphError,
    schema::{COMPLETE_KEY, NODE_COUNT_KEY, ensure_schema},
};

const WRITE_SAVEPOINT: &str = "genograph_write";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub path: Option<PathBuf>,
    pub nodes: usize,
    pub genomes: usize,
}

pub struct GraphStore {
    conn: Option<Connection>,
    path: Option<PathBuf>,
    children_cache: AdjacencyCache,
    parents_cache: AdjacencyCache,
}

/// Computes where the store for `input` lives.
///
/// A trailing `.gfa` is stripped (case-insensitively), the configured extension is
/// appended unless already present, and the result is placed in the cache directory
/// that sits next to the input file.
pub fn store_path_for<P: AsRef<Path>>(
    input: P,
    config: &StoreConfig,
) -> Result<PathBuf, GenomeGraphError> {
    let input = std::path::absolute(input.as_ref())
        .map_err(|e| GenomeGraphError::file_access(e.to_string()))?;
    let file_name = input
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            GenomeGraphError::file_access(format!("{} has no file name", input.display()))
        })?;

    let mut name = strip_suffix_ignore_case(file_name, ".gfa").to_string();
    if strip_suffix_ignore_case(&name, &config.extension).len() == name.len() {
        name.push_str(&config.extension);
    }

    let parent = input.parent().unwrap_or_else(|| Path::new("/"));
    Ok(parent.join(&config.cache_dir).join(name))
}

/// Returns true if a store already exists for `input`.
pub fn has_store<P: AsRef<Path>>(input: P, config: &StoreConfig) -> Result<bool, GenomeGraphError> {
    Ok(store_path_for(input, config)?.exists())
}

/// Deletes the store for `input` without opening it. Returns true if a file was removed.
pub fn remove_store_for<P: AsRef<Path>>(
    input: P,
    config: &StoreConfig,
) -> Result<bool, GenomeGraphError> {
    let path = store_path_for(input, config)?;
    delete_store_files(&path)
}

impl GraphStore {
    pub fn open<P: AsRef<Path>>(path: P, config: &StoreConfig) -> Result<Self, GenomeGraphError> {
        config.validate()?;
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| {
                GenomeGraphError::file_access(format!(
                    "cannot create store directory {}: {e}",
                    dir.display()
                ))
            })?;
        }
        info!(path = %path.display(), "opening graph store");
        let conn = Connection::open(&path).map_err(|e| {
            GenomeGraphError::file_access(format!("cannot open store {}: {e}", path.display()))
        })?;
        Self::from_connection(conn, Some(path), config)
    }

    /// Opens (or reuses) the store derived from an input file name.
    pub fn open_for_input<P: AsRef<Path>>(
        input: P,
        config: &StoreConfig,
    ) -> Result<Self, GenomeGraphError> {
        let path = store_path_for(input, config)?;
        Self::open(path, config)
    }

    pub fn open_in_memory() -> Result<Self, GenomeGraphError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| GenomeGraphError::file_access(e.to_string()))?;
        Self::from_connection(conn, None, &StoreConfig::default())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Runs `f` inside a savepoint. Nested calls nest; a failure undoes only the
    /// innermost batch.
    pub fn write_batch<T, F>(&self, f: F) -> Result<T, GenomeGraphError>
    where
        F: FnOnce(&Self) -> Result<T, GenomeGraphError>,
    {
        let conn = self.connection()?;
        conn.execute_batch(&format!("SAVEPOINT {WRITE_SAVEPOINT}"))
            .map_err(|e| GenomeGraphError::query(e.to_string()))?;
        let outcome = f(self).and_then(|value| {
            conn.execute_batch(&format!("RELEASE {WRITE_SAVEPOINT}"))
                .map_err(|e| GenomeGraphError::query(e.to_string()))?;
            Ok(value)
        });
        if outcome.is_err() {
            // a failed RELEASE leaves the savepoint open as well
            let undo = format!("ROLLBACK TO {WRITE_SAVEPOINT}; RELEASE {WRITE_SAVEPOINT}");
            if let Err(undo_err) = conn.execute_batch(&undo) {
                warn!(error = %undo_err, "failed to undo write batch");
            }
            self.children_cache.clear();
            self.parents_cache.clear();
        }
        outcome
    }

    pub fn set_sequence(&self, id: NodeId, sequence: &str) -> Result<(), GenomeGraphError> {
        let length = i64::try_from(sequence.len())
            .map_err(|_| GenomeGraphError::invalid_input("sequence too long"))?;
        self.write_batch(|store| {
            let conn = store.connection()?;
            let inserted = conn
                .execute(
                    "INSERT OR IGNORE INTO sequences(node_id, sequence) VALUES(?1, ?2)",
                    params![id, sequence],
                )
                .map_err(|e| GenomeGraphError::query(e.to_string()))?;
            if inserted == 0 {
                conn.execute(
                    "UPDATE sequences SET sequence=?2 WHERE node_id=?1",
                    params![id, sequence],
                )
                .map_err(|e| GenomeGraphError::query(e.to_string()))?;
            } else {
                conn.execute(
                    "UPDATE store_meta SET value = value + 1 WHERE key=?1",
                    params![NODE_COUNT_KEY],
                )
                .map_err(|e| GenomeGraphError::query(e.to_string()))?;
            }
            conn.execute(
                "INSERT OR REPLACE INTO sequence_lengths(node_id, length) VALUES(?1, ?2)",
                params![id, length],
            )
            .map_err(|e| GenomeGraphError::query(e.to_string()))?;
            Ok(())
        })
    }

    pub fn get_sequence(&self, id: NodeId) -> Result<String, GenomeGraphError> {
        self.connection()?
            .prepare_cached("SELECT sequence FROM sequences WHERE node_id=?1")
            .and_then(|mut stmt| stmt.query_row(params![id], |row| row.get(0)).optional())
            .map_err(|e| GenomeGraphError::query(e.to_string()))?
            .ok_or_else(|| GenomeGraphError::not_found(format!("no sequence cached for node {id}")))
    }

    pub fn get_sequence_length(&self, id: NodeId) -> Result<usize, GenomeGraphError> {
        let length: i64 = self
            .connection()?
            .prepare_cached("SELECT length FROM sequence_lengths WHERE node_id=?1")
            .and_then(|mut stmt| stmt.query_row(params![id], |row| row.get(0)).optional())
            .map_err(|e| GenomeGraphError::query(e.to_string()))?
            .ok_or_else(|| {
                GenomeGraphError::not_found(format!("no sequence length cached for node {id}"))
            })?;
        to_usize(length)
    }

    pub fn contains_node(&self, id: NodeId) -> Result<bool, GenomeGraphError> {
        let exists: Option<i64> = self
            .connection()?
            .prepare_cached("SELECT 1 FROM sequences WHERE node_id=?1")
            .and_then(|mut stmt| stmt.query_row(params![id], |row| row.get(0)).optional())
            .map_err(|e| GenomeGraphError::query(e.to_string()))?;
        Ok(exists.is_some())
    }

    pub fn node_count(&self) -> Result<usize, GenomeGraphError> {
        let count: i64 = self
            .connection()?
            .query_row(
                "SELECT value FROM store_meta WHERE key=?1",
                params![NODE_COUNT_KEY],
                |row| row.get(0),
            )
            .map_err(|e| GenomeGraphError::query(e.to_string()))?;
        to_usize(count)
    }

    pub fn node_ids(&self) -> Result<Vec<NodeId>, GenomeGraphError> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare("SELECT node_id FROM sequences ORDER BY node_id")
            .map_err(|e| GenomeGraphError::query(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| GenomeGraphError::query(e.to_string()))?;
        let mut ids = Vec::new();
        for id in rows {
            ids.push(id.map_err(|e| GenomeGraphError::query(e.to_string()))?);
        }
        Ok(ids)
    }

    /// Stores the genomes traversing a node together with their count.
    pub fn set_genomes(&self, id: NodeId, genome_ids: &[GenomeId]) -> Result<(), GenomeGraphError> {
        let encoded = encode_ids(genome_ids)?;
        let count = i64::try_from(genome_ids.len())
            .map_err(|_| GenomeGraphError::invalid_input("too many genomes"))?;
        self.connection()?
            .execute(
                "INSERT OR REPLACE INTO node_genomes(node_id, genomes, genome_count) \
                 VALUES(?1, ?2, ?3)",
                params![id, encoded, count],
            )
            .map_err(|e| GenomeGraphError::query(e.to_string()))?;
        Ok(())
    }

    /// Gives `id` an empty membership row unless it already has one.
    pub fn init_genomes(&self, id: NodeId) -> Result<(), GenomeGraphError> {
        self.connection()?
            .execute(
                "INSERT OR IGNORE INTO node_genomes(node_id, genomes, genome_count) \
                 VALUES(?1, '[]', 0)",
                params![id],
            )
            .map_err(|e| GenomeGraphError::query(e.to_string()))?;
        Ok(())
    }

    pub fn get_genomes(&self, id: NodeId) -> Result<Vec<GenomeId>, GenomeGraphError> {
        let encoded: String = self
            .connection()?
            .prepare_cached("SELECT genomes FROM node_genomes WHERE node_id=?1")
            .and_then(|mut stmt| stmt.query_row(params![id], |row| row.get(0)).optional())
            .map_err(|e| GenomeGraphError::query(e.to_string()))?
            .ok_or_else(|| GenomeGraphError::not_found(format!("no genomes cached for node {id}")))?;
        decode_ids(&encoded)
    }

    pub fn get_genome_count(&self, id: NodeId) -> Result<usize, GenomeGraphError> {
        let count: i64 = self
            .connection()?
            .prepare_cached("SELECT genome_count FROM node_genomes WHERE node_id=?1")
            .and_then(|mut stmt| stmt.query_row(params![id], |row| row.get(0)).optional())
            .map_err(|e| GenomeGraphError::query(e.to_string()))?
            .ok_or_else(|| {
                GenomeGraphError::not_found(format!("no genome count cached for node {id}"))
            })?;
        to_usize(count)
    }

    /// Registers a genome name under the next free id and returns that id.
    ///
    /// Both lookup directions are written in one batch.
    pub fn add_genome_name(&self, name: &str) -> Result<GenomeId, GenomeGraphError> {
        if name.is_empty() {
            return Err(GenomeGraphError::invalid_input("genome name must be set"));
        }
        self.write_batch(|store| {
            let conn = store.connection()?;
            let existing: Option<GenomeId> = conn
                .query_row(
                    "SELECT genome_id FROM genome_name_ids WHERE name=?1",
                    params![name],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| GenomeGraphError::query(e.to_string()))?;
            if let Some(id) = existing {
                return Err(GenomeGraphError::invalid_input(format!(
                    "genome {name} is already registered as {id}"
                )));
            }
            let next: GenomeId = conn
                .query_row("SELECT COUNT(*) FROM genome_id_names", [], |row| row.get(0))
                .map_err(|e| GenomeGraphError::query(e.to_string()))?;
            conn.execute(
                "INSERT INTO genome_id_names(genome_id, name) VALUES(?1, ?2)",
                params![next, name],
            )
            .map_err(|e| GenomeGraphError::query(e.to_string()))?;
            conn.execute(
                "INSERT INTO genome_name_ids(name, genome_id) VALUES(?1, ?2)",
                params![name, next],
            )
            .map_err(|e| GenomeGraphError::query(e.to_string()))?;
            Ok(next)
        })
    }

    /// Looks a genome up by name, registering it when it is new.
    pub fn genome_id_or_insert(&self, name: &str) -> Result<GenomeId, GenomeGraphError> {
        match self.get_genome_id(name) {
            Ok(id) => Ok(id),
            Err(err) if err.is_not_found() => self.add_genome_name(name),
            Err(err) => Err(err),
        }
    }

    pub fn get_genome_name(&self, genome_id: GenomeId) -> Result<String, GenomeGraphError> {
        self.connection()?
            .prepare_cached("SELECT name FROM genome_id_names WHERE genome_id=?1")
            .and_then(|mut stmt| stmt.query_row(params![genome_id], |row| row.get(0)).optional())
            .map_err(|e| GenomeGraphError::query(e.to_string()))?
            .ok_or_else(|| {
                GenomeGraphError::not_found(format!("no name cached for genome {genome_id}"))
            })
    }

    pub fn get_genome_id(&self, name: &str) -> Result<GenomeId, GenomeGraphError> {
        self.connection()?
            .prepare_cached("SELECT genome_id FROM genome_name_ids WHERE name=?1")
            .and_then(|mut stmt| stmt.query_row(params![name], |row| row.get(0)).optional())
            .map_err(|e| GenomeGraphError::query(e.to_string()))?
            .ok_or_else(|| GenomeGraphError::not_found(format!("no id cached for genome {name}")))
    }

    pub fn genome_total(&self) -> Result<usize, GenomeGraphError> {
        let count: i64 = self
            .connection()?
            .query_row("SELECT COUNT(*) FROM genome_id_names", [], |row| row.get(0))
            .map_err(|e| GenomeGraphError::query(e.to_string()))?;
        to_usize(count)
    }

    /// Ids of every node traversed by `genome_id`, ascending.
    pub fn genome_node_ids(&self, genome_id: GenomeId) -> Result<Vec<NodeId>, GenomeGraphError> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare("SELECT node_id, genomes FROM node_genomes ORDER BY node_id")
            .map_err(|e| GenomeGraphError::query(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| {
                let id: NodeId = row.get(0)?;
                let genomes: String = row.get(1)?;
                Ok((id, genomes))
            })
            .map_err(|e| GenomeGraphError::query(e.to_string()))?;
        let mut ids = Vec::new();
        for row in rows {
            let (id, encoded) = row.map_err(|e| GenomeGraphError::query(e.to_string()))?;
            if decode_ids(&encoded)?.contains(&genome_id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    pub fn get_children_adjacency(&self, id: NodeId) -> Result<Vec<NodeId>, GenomeGraphError> {
        if let Some(cached) = self.children_cache.get(id) {
            return Ok(cached);
        }
        let result = self.load_adjacency(
            "SELECT children FROM children_adjacency WHERE node_id=?1",
            id,
        )?;
        self.children_cache.insert(id, result.clone());
        Ok(result)
    }

    pub fn get_parents_adjacency(&self, id: NodeId) -> Result<Vec<NodeId>, GenomeGraphError> {
        if let Some(cached) = self.parents_cache.get(id) {
            return Ok(cached);
        }
        let result = self.load_adjacency(
            "SELECT parents FROM parents_adjacency WHERE node_id=?1",
            id,
        )?;
        self.parents_cache.insert(id, result.clone());
        Ok(result)
    }

    /// Appends `child` to the children of `parent`. Already present children are kept once.
    pub fn add_child(&self, parent: NodeId, child: NodeId) -> Result<(), GenomeGraphError> {
        let mut children = self.get_children_adjacency(parent)?;
        if children.contains(&child) {
            return Ok(());
        }
        children.push(child);
        self.store_adjacency(
            "INSERT OR REPLACE INTO children_adjacency(node_id, children) VALUES(?1, ?2)",
            parent,
            &children,
        )?;
        self.children_cache.invalidate(parent);
        Ok(())
    }

    /// Appends `parent` to the parents of `child`. Already present parents are kept once.
    pub fn add_parent(&self, child: NodeId, parent: NodeId) -> Result<(), GenomeGraphError> {
        let mut parents = self.get_parents_adjacency(child)?;
        if parents.contains(&parent) {
            return Ok(());
        }
        parents.push(parent);
        self.store_adjacency(
            "INSERT OR REPLACE INTO parents_adjacency(node_id, parents) VALUES(?1, ?2)",
            child,
            &parents,
        )?;
        self.parents_cache.invalidate(child);
        Ok(())
    }

    /// Ids that appear in an adjacency array but have no sequence, ascending.
    pub fn dangling_node_ids(&self) -> Result<Vec<NodeId>, GenomeGraphError> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(
                "SELECT node_id FROM children_adjacency \
                 WHERE node_id NOT IN (SELECT node_id FROM sequences) \
                 UNION \
                 SELECT node_id FROM parents_adjacency \
                 WHERE node_id NOT IN (SELECT node_id FROM sequences) \
                 ORDER BY node_id",
            )
            .map_err(|e| GenomeGraphError::query(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| GenomeGraphError::query(e.to_string()))?;
        let mut ids = Vec::new();
        for id in rows {
            ids.push(id.map_err(|e| GenomeGraphError::query(e.to_string()))?);
        }
        Ok(ids)
    }

    /// Records that population finished; only complete stores are reused.
    pub fn mark_complete(&self) -> Result<(), GenomeGraphError> {
        self.connection()?
            .execute(
                "INSERT OR REPLACE INTO store_meta(key, value) VALUES(?1, 1)",
                params![COMPLETE_KEY],
            )
            .map_err(|e| GenomeGraphError::query(e.to_string()))?;
        Ok(())
    }

    pub fn is_complete(&self) -> Result<bool, GenomeGraphError> {
        let flag: Option<i64> = self
            .connection()?
            .query_row(
                "SELECT value FROM store_meta WHERE key=?1",
                params![COMPLETE_KEY],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| GenomeGraphError::query(e.to_string()))?;
        Ok(flag == Some(1))
    }

    pub fn stats(&self) -> Result<StoreStats, GenomeGraphError> {
        Ok(StoreStats {
            path: self.path.clone(),
            nodes: self.node_count()?,
            genomes: self.genome_total()?,
        })
    }

    /// Flushes and closes the database. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<(), GenomeGraphError> {
        self.children_cache.clear();
        self.parents_cache.clear();
        if let Some(conn) = self.conn.take() {
            debug!(path = ?self.path, "closing graph store");
            conn.close()
                .map_err(|(_, e)| GenomeGraphError::file_access(e.to_string()))?;
        }
        Ok(())
    }

    /// Closes the store and deletes its backing file. This cannot be undone.
    pub fn remove_db(&mut self) -> Result<(), GenomeGraphError> {
        self.close()?;
        if let Some(path) = self.path.as_deref() {
            info!(path = %path.display(), "removing graph store");
            delete_store_files(path)?;
        }
        Ok(())
    }

    /// Discards everything written so far. A partially populated store is never patched.
    pub fn rollback(&mut self) -> Result<(), GenomeGraphError> {
        warn!(path = ?self.path, "rolling back graph store");
        self.remove_db()
    }
}

impl GraphStore {
    pub(crate) fn connection(&self) -> Result<&Connection, GenomeGraphError> {
        self.conn
            .as_ref()
            .ok_or_else(|| GenomeGraphError::file_access("graph store is closed"))
    }

    fn load_adjacency(&self, sql: &str, id: NodeId) -> Result<Vec<NodeId>, GenomeGraphError> {
        let encoded: Option<String> = self
            .connection()?
            .prepare_cached(sql)
            .and_then(|mut stmt| stmt.query_row(params![id], |row| row.get(0)).optional())
            .map_err(|e| GenomeGraphError::query(e.to_string()))?;
        match encoded {
            Some(encoded) => decode_ids(&encoded),
            None => Ok(Vec::new()),
        }
    }

    fn store_adjacency(
        &self,
        sql: &str,
        id: NodeId,
        ids: &[NodeId],
    ) -> Result<(), GenomeGraphError> {
        let encoded = encode_ids(ids)?;
        self.connection()?
            .prepare_cached(sql)
            .and_then(|mut stmt| stmt.execute(params![id, encoded]))
            .map_err(|e| GenomeGraphError::query(e.to_string()))?;
        Ok(())
    }

    fn from_connection(
        conn: Connection,
        path: Option<PathBuf>,
        config: &StoreConfig,
    ) -> Result<Self, GenomeGraphError> {
        for (key, value) in &config.pragma_settings {
            conn.execute_batch(&format!("PRAGMA {key} = {value};"))
                .map_err(|e| GenomeGraphError::file_access(format!("pragma {key}: {e}")))?;
        }
        if let Some(capacity) = config.statement_cache_size {
            conn.set_prepared_statement_cache_capacity(capacity);
        }
        ensure_schema(&conn)?;
        Ok(Self {
            conn: Some(conn),
            path,
            children_cache: AdjacencyCache::new(),
            parents_cache: AdjacencyCache::new(),
        })
    }
}

impl Drop for GraphStore {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(error = %err, "failed to close graph store");
        }
    }
}

fn strip_suffix_ignore_case<'a>(name: &'a str, suffix: &str) -> &'a str {
    let Some(split) = name.len().checked_sub(suffix.len()) else {
        return name;
    };
    match name.get(split..) {
        Some(tail) if tail.eq_ignore_ascii_case(suffix) => &name[..split],
        _ => name,
    }
}

fn delete_store_files(path: &Path) -> Result<bool, GenomeGraphError> {
    let removed = remove_if_exists(path)?;
    let mut journal = path.as_os_str().to_owned();
    journal.push("-journal");
    remove_if_exists(Path::new(&journal))?;
    Ok(removed)
}

fn remove_if_exists(path: &Path) -> Result<bool, GenomeGraphError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(GenomeGraphError::file_access(format!(
            "cannot remove {}: {err}",
            path.display()
        ))),
    }
}

fn encode_ids(ids: &[i64]) -> Result<String, GenomeGraphError> {
    serde_json::to_string(ids).map_err(|e| GenomeGraphError::invalid_input(e.to_string()))
}

fn decode_ids(encoded: &str) -> Result<Vec<i64>, GenomeGraphError> {
    serde_json::from_str(encoded).map_err(|e| GenomeGraphError::query(e.to_string()))
}

fn to_usize(value: i64) -> Result<usize, GenomeGraphError> {
    usize::try_from(value)
        .map_err(|_| GenomeGraphError::query(format!("negative count {value} in store")))
}
