//! Configuration for the persistent store and the layered layout.
//!
//! Both structures carry `Default` impls matching the values the viewer uses out of the
//! box; `validate` rejects settings that would make a store path or a layout pass
//! meaningless.

use std::collections::BTreeMap;

use crate::GenomeGraphError;

/// Options for opening a [`GraphStore`](crate::store::GraphStore).
///
/// # Default Configuration
///
/// ```rust
/// use genograph::StoreConfig;
/// let config = StoreConfig::default();
/// assert_eq!(config.cache_dir, "caches");
/// assert_eq!(config.extension, ".genograph.db");
/// assert!(config.pragma_settings.is_empty());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    /// Name of the directory, next to the input file, that holds the stores.
    pub cache_dir: String,

    /// Suffix appended to the input file stem to name its store.
    pub extension: String,

    /// Extra `PRAGMA key = value` statements applied after opening.
    ///
    /// Ordered so the statements run deterministically.
    pub pragma_settings: BTreeMap<String, String>,

    /// Capacity of the prepared statement cache, if it should differ from rusqlite's.
    pub statement_cache_size: Option<usize>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cache_dir: "caches".to_string(),
            extension: ".genograph.db".to_string(),
            pragma_settings: BTreeMap::new(),
            statement_cache_size: None,
        }
    }
}

impl StoreConfig {
    pub fn with_pragma<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.pragma_settings.insert(key.into(), value.into());
        self
    }

    pub fn validate(&self) -> Result<(), GenomeGraphError> {
        if self.cache_dir.trim().is_empty() {
            return Err(GenomeGraphError::invalid_input("cache_dir must be set"));
        }
        if self.cache_dir.contains(['/', '\\']) {
            return Err(GenomeGraphError::invalid_input(
                "cache_dir must be a single directory name",
            ));
        }
        if self.extension.trim().is_empty() {
            return Err(GenomeGraphError::invalid_input("extension must be set"));
        }
        for key in self.pragma_settings.keys() {
            if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(GenomeGraphError::invalid_input(format!(
                    "invalid pragma name {key:?}"
                )));
            }
        }
        Ok(())
    }
}

/// Options for one [`LayeredLayout`](crate::layout::LayeredLayout) pass.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutConfig {
    /// Multiplier applied to vertical padding and the layer gap.
    pub zoom_level: f64,
    /// x of the first layer.
    pub x0: f64,
    /// y of the first node in every layer.
    pub y0: f64,
    /// Horizontal gap between two layers before zooming.
    pub layer_gap: f64,
    /// Number of down+up barycenter sweeps.
    pub sweeps: usize,
    /// Scale applied to node draw dimensions.
    pub scale: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            zoom_level: 1.0,
            x0: 0.0,
            y0: 0.0,
            layer_gap: 50.0,
            sweeps: 4,
            scale: 1.0,
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<(), GenomeGraphError> {
        if !(self.zoom_level.is_finite() && self.zoom_level > 0.0) {
            return Err(GenomeGraphError::invalid_input(
                "zoom_level must be a positive number",
            ));
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(GenomeGraphError::invalid_input(
                "scale must be a positive number",
            ));
        }
        if !(self.layer_gap.is_finite() && self.layer_gap >= 0.0) {
            return Err(GenomeGraphError::invalid_input(
                "layer_gap must not be negative",
            ));
        }
        if !(self.x0.is_finite() && self.y0.is_finite()) {
            return Err(GenomeGraphError::invalid_input("origin must be finite"));
        }
        Ok(())
    }
}
