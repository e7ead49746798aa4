//! Templated explanations: rationale sentences, insights and recommendations.
//!
//! Everything here is plain string interpolation over authored templates and
//! fixed fallbacks, so a result can always be produced without any external
//! text service.

use std::collections::BTreeSet;

use crate::models::{Dimension, DimensionRegistry, RankBand, ScoreSource};
use crate::ranking::{effective_k, Classification, RankedEntry};

const MAX_RECOMMENDATIONS: usize = 5;
const CLOSE_RACE_POINTS: f64 = 5.0;

/// Everything `compose` needs besides the entry itself.
#[derive(Debug, Clone)]
pub struct RationaleContext<'a> {
    pub dimension: &'a Dimension,
    pub band: RankBand,
    /// Prompt categories that contributed most to the dimension.
    pub highlights: &'a [String],
}

/// Band of a 1-based `rank` among `total` entries, given `k` weaknesses.
pub fn band_for(rank: usize, total: usize, k: usize) -> RankBand {
    let k = effective_k(k, total);
    if rank <= 1 {
        RankBand::Top
    } else if k > 0 && rank + k > total {
        RankBand::Low
    } else if rank <= 3 {
        RankBand::High
    } else {
        RankBand::Middle
    }
}

fn generic_template(band: RankBand, has_highlights: bool) -> &'static str {
    match (band, has_highlights) {
        (RankBand::Top, false) => {
            "{label} scored highest because your answers consistently aligned with this dimension."
        }
        (RankBand::Top, true) => {
            "{label} scored highest because your answers consistently aligned with this dimension, especially around {highlights}."
        }
        (RankBand::High, _) => "{label} is also a strong match, ranked #{rank} with {score} points.",
        (RankBand::Middle, _) => "{label} sits in the middle of your profile with {score} points.",
        (RankBand::Low, _) => "{label} scored {score} points and is an area to develop.",
    }
}

/// Sentence explaining one ranked entry.
///
/// Uses the dimension's template for the band when one is authored, the
/// generic sentence otherwise.
pub fn compose(entry: &RankedEntry, context: &RationaleContext<'_>) -> String {
    let template = context
        .dimension
        .templates
        .get(&context.band)
        .map(String::as_str)
        .unwrap_or_else(|| generic_template(context.band, !context.highlights.is_empty()));
    interpolate(template, entry, context.highlights)
}

fn interpolate(template: &str, entry: &RankedEntry, highlights: &[String]) -> String {
    let highlights = if highlights.is_empty() {
        "your answers".to_string()
    } else {
        join_natural(highlights)
    };
    template
        .replace("{label}", &entry.label)
        .replace("{score}", &format!("{:.1}", entry.normalized_score))
        .replace("{rank}", &entry.rank.to_string())
        .replace("{highlights}", &highlights)
}

/// `a`, `a and b`, `a, b and c`.
fn join_natural(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

fn labels(entries: &[RankedEntry]) -> String {
    join_natural(&entries.iter().map(|e| e.label.clone()).collect::<Vec<_>>())
}

fn describe(source: ScoreSource) -> &'static str {
    match source {
        ScoreSource::Preference => "interest",
        ScoreSource::Fit => "experience",
    }
}

/// Inputs for the insight sentences.
#[derive(Debug, Clone)]
pub struct InsightContext<'a> {
    pub primary_source: ScoreSource,
    pub ranked: &'a [RankedEntry],
    /// Ranking of the other score source, when the catalog has two.
    pub other: Option<(ScoreSource, &'a [RankedEntry])>,
    pub classification: &'a Classification,
    pub highlights: &'a [String],
}

/// Short observations about the result, in a fixed order.
pub fn insights(context: &InsightContext<'_>) -> Vec<String> {
    let mut insights = Vec::new();
    let Some(top) = context.ranked.first() else {
        return insights;
    };

    insights.push(format!(
        "Your strongest match is {} with {:.1} points.",
        top.label, top.normalized_score
    ));

    if let Some(runner_up) = context.ranked.get(1) {
        let gap = top.normalized_score - runner_up.normalized_score;
        if gap < CLOSE_RACE_POINTS {
            insights.push(format!(
                "{} is close behind ({:.1} points apart), so it is worth exploring both.",
                runner_up.label, gap
            ));
        }
    }

    if let Some((other_source, other_ranked)) = context.other {
        if let Some(other_top) = other_ranked.first() {
            if other_top.id == top.id {
                insights.push(format!(
                    "Your {} and {} answers both point to {}.",
                    describe(context.primary_source),
                    describe(other_source),
                    top.label
                ));
            } else {
                insights.push(format!(
                    "Your {} answers point to {}, while your {} answers point to {}.",
                    describe(context.primary_source),
                    top.label,
                    describe(other_source),
                    other_top.label
                ));
            }
        }
    }

    if !context.classification.strengths.is_empty() {
        insights.push(format!(
            "Strengths: {}.",
            labels(&context.classification.strengths)
        ));
    }
    if !context.classification.weaknesses.is_empty() {
        insights.push(format!(
            "Areas to develop: {}.",
            labels(&context.classification.weaknesses)
        ));
    }

    if !context.highlights.is_empty() {
        insights.push(format!(
            "Your {} score was driven mostly by {}.",
            top.label,
            join_natural(context.highlights)
        ));
    }

    insights
}

/// Resources of the weakness dimensions, weakest first, without repeats.
pub fn recommendations(
    classification: &Classification,
    dimensions: &DimensionRegistry,
) -> Vec<String> {
    let mut seen = BTreeSet::new();
    classification
        .weaknesses
        .iter()
        .filter_map(|entry| dimensions.find(&entry.id))
        .flat_map(|dimension| dimension.resources.iter())
        .filter(|resource| seen.insert(resource.as_str()))
        .take(MAX_RECOMMENDATIONS)
        .cloned()
        .collect()
}
