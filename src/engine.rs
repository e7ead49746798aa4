//! Facade tying the pipeline together: aggregate, rank, classify, compose, assemble.

use std::collections::BTreeSet;

use log::{debug, warn};

use crate::catalog::CatalogLibrary;
use crate::error::EngineError;
use crate::models::{DimensionId, ScoreSource};
use crate::ranking::{classify, primary_recommendation, rank, top_n, RankedEntry};
use crate::rationale::{self, band_for, compose, InsightContext, RationaleContext};
use crate::result::{assemble, AssemblyInput, AssessmentResult};
use crate::scoring::aggregate;
use crate::session::{AnswerRecord, Session, SessionId};

const TOP_N: usize = 3;
const HIGHLIGHT_COUNT: usize = 2;

/// Runs assessments against a library of validated catalogs.
///
/// Holds no per-session state; sessions are passed in explicitly.
#[derive(Debug, Clone)]
pub struct Engine {
    library: CatalogLibrary,
    primary_override: Option<ScoreSource>,
}

impl Engine {
    pub fn new(library: CatalogLibrary) -> Self {
        Self {
            library,
            primary_override: None,
        }
    }

    /// Rank by `source` instead of each catalog's designated primary source.
    pub fn with_primary_source(mut self, source: Option<ScoreSource>) -> Self {
        self.primary_override = source;
        self
    }

    pub fn library(&self) -> &CatalogLibrary {
        &self.library
    }

    pub fn start(&self, catalog_id: &str, session_id: SessionId) -> Result<Session, EngineError> {
        Session::start(session_id, self.library.get(catalog_id)?)
    }

    /// Rebuild an interrupted session from its partial answer log.
    pub fn resume(
        &self,
        catalog_id: &str,
        session_id: SessionId,
        records: &[AnswerRecord],
    ) -> Result<Session, EngineError> {
        Session::resume(session_id, self.library.get(catalog_id)?, records)
    }

    /// Replay a full answer log and produce the result in one call.
    pub fn evaluate(
        &self,
        catalog_id: &str,
        records: &[AnswerRecord],
    ) -> Result<AssessmentResult, EngineError> {
        let session = Session::replay(
            SessionId::new(format!("{}-replay", catalog_id)),
            self.library.get(catalog_id)?,
            records,
        )?;
        self.finish(&session)
    }

    /// Turn a completed session into its result.
    pub fn finish(&self, session: &Session) -> Result<AssessmentResult, EngineError> {
        let card = aggregate(session)?;
        let catalog = card.catalog();

        let rankings: Vec<(ScoreSource, Vec<RankedEntry>)> = card
            .tables()
            .iter()
            .map(|table| (table.source, rank(table, &catalog.dimensions)))
            .collect();

        let primary_source = self.primary_source(catalog.primary_source, &card.sources())?;
        let ranked = ranking_for(&rankings, primary_source);
        let other = rankings
            .iter()
            .find(|(source, _)| *source != primary_source)
            .map(|(source, entries)| (*source, entries.as_slice()));

        let recommended = primary_recommendation(ranked)
            .cloned()
            .ok_or_else(|| EngineError::InconsistentResult("nothing was ranked".to_string()))?;

        let top3_primary = top_n(ranked, TOP_N, &BTreeSet::new());
        let mut surfaced: BTreeSet<DimensionId> =
            top3_primary.iter().map(|e| e.id.clone()).collect();
        surfaced.insert(recommended.id.clone());
        let top3_secondary = top_n(ranked, TOP_N, &surfaced);

        let (preference_top3, fit_top3) = if rankings.len() > 1 {
            let view = |source| Some(top_n(ranking_for(&rankings, source), TOP_N, &BTreeSet::new()));
            (view(ScoreSource::Preference), view(ScoreSource::Fit))
        } else {
            (None, None)
        };

        let classification = classify(ranked, catalog.classification_k);

        let highlights = card
            .get(primary_source)
            .and_then(|table| {
                let index = catalog.dimensions.index_of(&recommended.id)?;
                table.scores.iter().find(|s| s.dimension == index)
            })
            .map(|score| score.top_categories(HIGHLIGHT_COUNT))
            .unwrap_or_default();

        let dimension = catalog.dimensions.find(&recommended.id).ok_or_else(|| {
            EngineError::InconsistentResult(format!(
                "recommended dimension '{}' is not registered",
                recommended.id
            ))
        })?;
        let rationale = compose(
            &recommended,
            &RationaleContext {
                dimension,
                band: band_for(recommended.rank, ranked.len(), catalog.classification_k),
                highlights: &highlights,
            },
        );

        let insights = rationale::insights(&InsightContext {
            primary_source,
            ranked,
            other,
            classification: &classification,
            highlights: &highlights,
        });
        let recommendations = rationale::recommendations(&classification, &catalog.dimensions);

        debug!(
            "Session {}: recommended {} ({:.2}) from {} source",
            session.id(),
            recommended.id,
            recommended.normalized_score,
            primary_source
        );

        assemble(AssemblyInput {
            catalog_id: catalog.id.clone(),
            total_prompts: catalog.len(),
            answered_prompts: session.answered_count(),
            normalization: catalog.normalization,
            primary_source,
            ranked: ranked.to_vec(),
            top3_primary,
            top3_secondary,
            preference_top3,
            fit_top3,
            recommended,
            rationale,
            classification,
            insights,
            recommendations,
        })
    }

    fn primary_source(
        &self,
        designated: ScoreSource,
        available: &[ScoreSource],
    ) -> Result<ScoreSource, EngineError> {
        if let Some(requested) = self.primary_override {
            if available.contains(&requested) {
                return Ok(requested);
            }
            warn!(
                "Requested primary source '{}' has no scored prompts; using '{}'",
                requested, designated
            );
        }
        if available.contains(&designated) {
            return Ok(designated);
        }
        available.first().copied().ok_or_else(|| {
            EngineError::InconsistentResult("catalog has no scored prompts".to_string())
        })
    }
}

fn ranking_for(rankings: &[(ScoreSource, Vec<RankedEntry>)], source: ScoreSource) -> &[RankedEntry] {
    rankings
        .iter()
        .find(|(s, _)| *s == source)
        .map(|(_, entries)| entries.as_slice())
        .unwrap_or_default()
}
