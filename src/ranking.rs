//! Ranking, Top-N views and strength/weakness classification.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::models::{DimensionId, DimensionRegistry};
use crate::scoring::{round2, SourceScores};

/// One dimension's place in a ranking. `rank` is 1-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub id: DimensionId,
    pub label: String,
    pub raw_score: f64,
    pub normalized_score: f64,
    pub rank: usize,
}

/// Sort dimensions by normalized score, best first.
///
/// Equal scores keep authoring order, so the dimension declared first in
/// the catalog wins a tie.
pub fn rank(scores: &SourceScores, dimensions: &DimensionRegistry) -> Vec<RankedEntry> {
    let mut ordered: Vec<_> = scores.scores.iter().collect();
    ordered.sort_by(|a, b| {
        b.normalized
            .total_cmp(&a.normalized)
            .then(a.dimension.cmp(&b.dimension))
    });

    ordered
        .into_iter()
        .filter_map(|score| {
            dimensions
                .get(score.dimension)
                .map(|dimension| (dimension, score))
        })
        .enumerate()
        .map(|(position, (dimension, score))| RankedEntry {
            id: dimension.id.clone(),
            label: dimension.label.clone(),
            raw_score: round2(score.raw),
            normalized_score: score.normalized,
            rank: position + 1,
        })
        .collect()
}

/// First `n` entries whose dimension is not in `exclude`.
pub fn top_n(
    ranked: &[RankedEntry],
    n: usize,
    exclude: &BTreeSet<DimensionId>,
) -> Vec<RankedEntry> {
    ranked
        .iter()
        .filter(|entry| !exclude.contains(&entry.id))
        .take(n)
        .cloned()
        .collect()
}

/// Rank-1 entry, if anything was ranked.
pub fn primary_recommendation(ranked: &[RankedEntry]) -> Option<&RankedEntry> {
    ranked.first()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationLabel {
    Strength,
    Weakness,
    Unlabeled,
}

impl Display for ClassificationLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strength => write!(f, "strength"),
            Self::Weakness => write!(f, "weakness"),
            Self::Unlabeled => write!(f, "-"),
        }
    }
}

/// Top-k strengths (best first) and bottom-k weaknesses (worst first).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub strengths: Vec<RankedEntry>,
    pub weaknesses: Vec<RankedEntry>,
}

impl Classification {
    pub fn label_of(&self, id: &DimensionId) -> ClassificationLabel {
        if self.strengths.iter().any(|e| &e.id == id) {
            ClassificationLabel::Strength
        } else if self.weaknesses.iter().any(|e| &e.id == id) {
            ClassificationLabel::Weakness
        } else {
            ClassificationLabel::Unlabeled
        }
    }
}

/// Largest usable `k` for `count` dimensions: the two sets may never overlap.
pub fn effective_k(k: usize, count: usize) -> usize {
    k.min(count / 2)
}

pub fn classify(ranked: &[RankedEntry], k: usize) -> Classification {
    let k = effective_k(k, ranked.len());
    Classification {
        strengths: ranked.iter().take(k).cloned().collect(),
        weaknesses: ranked.iter().rev().take(k).cloned().collect(),
    }
}
