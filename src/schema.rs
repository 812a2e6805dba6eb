use rusqlite::Connection;

use crate::errors::GenomeGraphError;

pub const NODE_COUNT_KEY: &str = "node_count";
pub const COMPLETE_KEY: &str = "complete";

pub fn ensure_schema(conn: &Connection) -> Result<(), GenomeGraphError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS sequences (
            node_id  INTEGER PRIMARY KEY,
            sequence TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS sequence_lengths (
            node_id INTEGER PRIMARY KEY,
            length  INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS genome_id_names (
            genome_id INTEGER PRIMARY KEY,
            name      TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS genome_name_ids (
            name      TEXT PRIMARY KEY,
            genome_id INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS node_genomes (
            node_id      INTEGER PRIMARY KEY,
            genomes      TEXT NOT NULL,
            genome_count INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS children_adjacency (
            node_id  INTEGER PRIMARY KEY,
            children TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS parents_adjacency (
            node_id INTEGER PRIMARY KEY,
            parents TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS store_meta (
            key   TEXT PRIMARY KEY,
            value INTEGER NOT NULL
        );
        INSERT OR IGNORE INTO store_meta(key, value) VALUES('node_count', 0);
        "#,
    )
    .map_err(|e| GenomeGraphError::schema(e.to_string()))?;
    Ok(())
}
