use std::time::Duration;

use grid::{GridIndexer, InvalidCellSize};

use crate::query::FeatureQuery;

/// Default grid cell size, projected pixels.
pub const DEFAULT_CELL_SIZE: f64 = 512.0;
/// Default prefetch margin around the viewport, projected pixels.
pub const DEFAULT_PADDING: f64 = 100.0;
/// Default debounce interval for viewport signals.
pub const DEFAULT_DEBOUNCE_MS: u64 = 150;

/// Constructor-time configuration for a feature layer.
#[derive(Debug, Clone)]
pub struct LayerOptions {
    /// Grid cell size in projected pixels. Must be a positive number;
    /// rejected at construction otherwise.
    pub cell_size: f64,
    /// Prefetch margin in the same units as `cell_size`.
    pub padding: f64,
    /// How long a pan/zoom storm must settle before a dispatch runs.
    pub debounce_ms: u64,
    /// When false, every indexed cell is fetched on every dispatch.
    pub deduplicate: bool,
    /// Attribute names to request; empty means all.
    pub fields: Vec<String>,
    /// Attribute filter expression.
    pub where_clause: String,
    /// Initial credential, if the service needs one.
    pub token: Option<String>,
}

impl Default for LayerOptions {
    fn default() -> Self {
        Self {
            cell_size: DEFAULT_CELL_SIZE,
            padding: DEFAULT_PADDING,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            deduplicate: true,
            fields: Vec::new(),
            where_clause: "1=1".to_string(),
            token: None,
        }
    }
}

impl LayerOptions {
    /// Builds the grid indexer, validating `cell_size`.
    pub fn indexer(&self) -> Result<GridIndexer, InvalidCellSize> {
        GridIndexer::new(self.cell_size, self.padding)
    }

    /// The layer-wide query template; per-cell envelopes are added at
    /// dispatch time.
    pub fn query_template(&self) -> FeatureQuery {
        FeatureQuery::new()
            .where_clause(self.where_clause.clone())
            .fields(self.fields.clone())
            .token(self.token.clone())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
