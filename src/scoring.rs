//! Normalization of a completed session's accumulator.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::EngineError;
use crate::models::{Catalog, DimensionId, NormalizationMode, ScoreSource};
use crate::session::{Session, Tally};

/// Normalized score of one dimension, in authoring order within its table.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionScore {
    /// Index into the catalog's dimension registry.
    pub dimension: usize,
    pub raw: f64,
    /// On the 0-100 scale, rounded to two decimals.
    pub normalized: f64,
    /// Raw contributions grouped by prompt category.
    pub categories: BTreeMap<String, f64>,
}

impl DimensionScore {
    /// Up to `n` categories that contributed most, largest first.
    pub fn top_categories(&self, n: usize) -> Vec<String> {
        let mut categories: Vec<(&String, f64)> = self
            .categories
            .iter()
            .filter(|(_, v)| **v > 0.0)
            .map(|(k, v)| (k, *v))
            .collect();
        categories.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        categories
            .into_iter()
            .take(n)
            .map(|(k, _)| k.clone())
            .collect()
    }
}

/// Scores of every dimension for one source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceScores {
    pub source: ScoreSource,
    pub scores: Vec<DimensionScore>,
}

/// All score tables of one completed session.
#[derive(Debug, Clone)]
pub struct ScoreCard {
    catalog: Arc<Catalog>,
    tables: Vec<SourceScores>,
}

impl ScoreCard {
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn get(&self, source: ScoreSource) -> Option<&SourceScores> {
        self.tables.iter().find(|t| t.source == source)
    }

    pub fn sources(&self) -> Vec<ScoreSource> {
        self.tables.iter().map(|t| t.source).collect()
    }

    pub fn tables(&self) -> &[SourceScores] {
        &self.tables
    }
}

/// Normalize every score table of a completed session.
///
/// Pure function of the session: same answers, same card.
pub fn aggregate(session: &Session) -> Result<ScoreCard, EngineError> {
    if !session.is_complete() {
        return Err(EngineError::SessionIncomplete);
    }

    let catalog = Arc::clone(session.catalog());
    let accumulator = session.accumulator();
    let mut tables = Vec::new();
    for source in accumulator.sources() {
        let tallies = accumulator.table(source).unwrap_or_default();
        let normalized = match catalog.normalization {
            NormalizationMode::ShareOfMaximum => share_of_maximum(tallies),
            NormalizationMode::WeightedAverage { .. } => {
                weighted_average(&catalog, tallies, catalog.normalization)?
            }
        };
        let scores = tallies
            .iter()
            .zip(normalized)
            .enumerate()
            .map(|(dimension, (tally, normalized))| DimensionScore {
                dimension,
                raw: tally.raw,
                normalized,
                categories: tally.categories.clone(),
            })
            .collect();
        tables.push(SourceScores { source, scores });
    }

    Ok(ScoreCard { catalog, tables })
}

/// `raw / max(raw) * 100`, all zeros when nothing scored.
fn share_of_maximum(tallies: &[Tally]) -> Vec<f64> {
    let max = tallies.iter().map(|t| t.raw).fold(0.0_f64, f64::max);
    tallies
        .iter()
        .map(|t| {
            if max > 0.0 {
                to_scale(t.raw / max * 100.0)
            } else {
                0.0
            }
        })
        .collect()
}

/// `Σ(value·w) / Σw * (100 / max_answer_value)` per dimension.
fn weighted_average(
    catalog: &Catalog,
    tallies: &[Tally],
    mode: NormalizationMode,
) -> Result<Vec<f64>, EngineError> {
    let factor = mode.scale_factor().unwrap_or(1.0);
    tallies
        .iter()
        .enumerate()
        .map(|(index, tally)| {
            if tally.weight <= 0.0 {
                let dimension = catalog
                    .dimensions
                    .get(index)
                    .map(|d| d.id.clone())
                    .unwrap_or_else(|| DimensionId::new(format!("#{}", index)));
                return Err(EngineError::DimensionNotCovered { dimension });
            }
            Ok(to_scale(tally.raw / tally.weight * factor))
        })
        .collect()
}

/// Clamp to [0, 100] and round to two decimals.
fn to_scale(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    round2(value.clamp(0.0, 100.0))
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
