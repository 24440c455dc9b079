//! Word similarity lookups.
//!
//! The embedding model itself lives outside this crate. The server consumes
//! it through [`SimilarityOracle`]; [`NeighborTable`] is the implementation
//! backed by a precomputed neighbour export (JSON, one entry per token).
//! Lookups never run under a session registry lock.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{GameError, GameResult};
use crate::normalize::normalize_word;
use crate::utils::require_field;

/// One neighbour of a looked-up token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarTerm {
    pub term: String,
    pub score: f32,
}

/// Source of nearest neighbours for a normalized token.
pub trait SimilarityOracle: Send + Sync {
    /// Name reported to clients as the origin of the scores.
    fn name(&self) -> &str;

    /// Returns at most `topn` neighbours, best first. Unknown tokens yield
    /// an empty list.
    fn most_similar(&self, token: &str, topn: usize) -> Vec<SimilarTerm>;
}

/// Response body of a similarity lookup.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarResponse {
    pub origin: String,
    pub normalized: String,
    pub results: Vec<SimilarTerm>,
}

/// Clamps a requested neighbour count into `[1, max]`.
#[must_use]
pub fn clamp_topn(requested: i64, max: usize) -> usize {
    let max = max.max(1);
    requested.clamp(1, max as i64) as usize
}

/// Normalizes `word` and queries the oracle.
pub fn lookup_similar(
    oracle: &dyn SimilarityOracle,
    word: &str,
    topn: i64,
    max_topn: usize,
) -> GameResult<SimilarResponse> {
    let word = require_field(word, "word")
        .map_err(|_| GameError::InvalidRequest("Provide a non-empty word".into()))?;
    let normalized = normalize_word(word);
    let results = oracle.most_similar(&normalized, clamp_topn(topn, max_topn));
    Ok(SimilarResponse {
        origin: oracle.name().to_string(),
        normalized,
        results,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Precomputed Neighbour Table
// ─────────────────────────────────────────────────────────────────────────────

/// Errors loading a neighbour table.
#[derive(Debug, Error)]
pub enum NeighborTableError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// In-memory neighbour lists keyed by normalized token.
///
/// File format: `{ "token": [["neighbour", 0.81], ...], ... }`, each list
/// sorted best first.
#[derive(Debug, Default)]
pub struct NeighborTable {
    name: String,
    neighbors: HashMap<String, Vec<SimilarTerm>>,
}

impl NeighborTable {
    /// An empty table; every lookup returns nothing.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            neighbors: HashMap::new(),
        }
    }

    /// Loads a table from a JSON export.
    pub fn load(name: impl Into<String>, path: &Path) -> Result<Self, NeighborTableError> {
        let content = std::fs::read_to_string(path).map_err(|source| NeighborTableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_json(name, &content).map_err(|source| NeighborTableError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!(
            "[Similar] Loaded {} tokens from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Parses a table from JSON text.
    pub fn from_json(name: impl Into<String>, json: &str) -> Result<Self, serde_json::Error> {
        let raw: HashMap<String, Vec<(String, f32)>> = serde_json::from_str(json)?;
        let neighbors = raw
            .into_iter()
            .map(|(token, list)| {
                let terms = list
                    .into_iter()
                    .map(|(term, score)| SimilarTerm { term, score })
                    .collect();
                (token, terms)
            })
            .collect();
        Ok(Self {
            name: name.into(),
            neighbors,
        })
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }
}

impl SimilarityOracle for NeighborTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn most_similar(&self, token: &str, topn: usize) -> Vec<SimilarTerm> {
        self.neighbors
            .get(token)
            .map(|terms| terms.iter().take(topn).cloned().collect())
            .unwrap_or_default()
    }
}
