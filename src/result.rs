//! The immutable assessment result and its final consistency checks.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::models::{DimensionId, NormalizationMode, ScoreSource};
use crate::ranking::{Classification, RankedEntry};

/// The rank-1 pick of the primary source, with its explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: DimensionId,
    pub label: String,
    pub score: f64,
    pub rank: usize,
    pub rationale: String,
}

/// Everything an assessment produces. Field order is the JSON field order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub catalog_id: String,
    pub total_prompts: usize,
    pub answered_prompts: usize,
    pub normalization: NormalizationMode,
    pub primary_source: ScoreSource,
    pub ranked_dimensions: Vec<RankedEntry>,
    pub top3_primary: Vec<RankedEntry>,
    pub top3_secondary: Vec<RankedEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preference_top3: Option<Vec<RankedEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fit_top3: Option<Vec<RankedEntry>>,
    pub recommended: Recommendation,
    pub strengths: Vec<RankedEntry>,
    pub weaknesses: Vec<RankedEntry>,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
}

impl AssessmentResult {
    pub fn entry(&self, id: &DimensionId) -> Option<&RankedEntry> {
        self.ranked_dimensions.iter().find(|e| &e.id == id)
    }
}

/// Pieces produced upstream, handed over by value.
#[derive(Debug, Clone)]
pub struct AssemblyInput {
    pub catalog_id: String,
    pub total_prompts: usize,
    pub answered_prompts: usize,
    pub normalization: NormalizationMode,
    pub primary_source: ScoreSource,
    pub ranked: Vec<RankedEntry>,
    pub top3_primary: Vec<RankedEntry>,
    pub top3_secondary: Vec<RankedEntry>,
    pub preference_top3: Option<Vec<RankedEntry>>,
    pub fit_top3: Option<Vec<RankedEntry>>,
    pub recommended: RankedEntry,
    pub rationale: String,
    pub classification: Classification,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Package the result after re-checking the invariants upstream promises.
pub fn assemble(input: AssemblyInput) -> Result<AssessmentResult, EngineError> {
    check(&input)?;

    let AssemblyInput {
        catalog_id,
        total_prompts,
        answered_prompts,
        normalization,
        primary_source,
        ranked,
        top3_primary,
        top3_secondary,
        preference_top3,
        fit_top3,
        recommended,
        rationale,
        classification,
        insights,
        recommendations,
    } = input;

    Ok(AssessmentResult {
        catalog_id,
        total_prompts,
        answered_prompts,
        normalization,
        primary_source,
        ranked_dimensions: ranked,
        top3_primary,
        top3_secondary,
        preference_top3,
        fit_top3,
        recommended: Recommendation {
            id: recommended.id,
            label: recommended.label,
            score: recommended.normalized_score,
            rank: recommended.rank,
            rationale,
        },
        strengths: classification.strengths,
        weaknesses: classification.weaknesses,
        insights,
        recommendations,
    })
}

fn check(input: &AssemblyInput) -> Result<(), EngineError> {
    let ranked_ids: BTreeSet<&DimensionId> = input.ranked.iter().map(|e| &e.id).collect();

    match input.ranked.iter().find(|e| e.id == input.recommended.id) {
        None => {
            return Err(EngineError::InconsistentResult(format!(
                "recommended dimension '{}' is not in the ranked list",
                input.recommended.id
            )))
        }
        Some(entry) if entry != &input.recommended => {
            return Err(EngineError::InconsistentResult(format!(
                "recommended dimension '{}' differs from its ranked entry",
                input.recommended.id
            )))
        }
        Some(_) => {}
    }

    let strengths: BTreeSet<&DimensionId> =
        input.classification.strengths.iter().map(|e| &e.id).collect();
    let weaknesses: BTreeSet<&DimensionId> =
        input.classification.weaknesses.iter().map(|e| &e.id).collect();
    if let Some(both) = strengths.intersection(&weaknesses).next() {
        return Err(EngineError::InconsistentResult(format!(
            "dimension '{}' is both a strength and a weakness",
            both
        )));
    }
    if let Some(unknown) = strengths.union(&weaknesses).find(|id| !ranked_ids.contains(*id)) {
        return Err(EngineError::InconsistentResult(format!(
            "classified dimension '{}' is not in the ranked list",
            unknown
        )));
    }

    let mut surfaced: BTreeSet<&DimensionId> =
        input.top3_primary.iter().map(|e| &e.id).collect();
    surfaced.insert(&input.recommended.id);
    if let Some(repeat) = input
        .top3_secondary
        .iter()
        .find(|e| surfaced.contains(&e.id))
    {
        return Err(EngineError::InconsistentResult(format!(
            "secondary view repeats already surfaced dimension '{}'",
            repeat.id
        )));
    }

    Ok(())
}
