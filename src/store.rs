//! Persistence of finished results and interrupted sessions, plus result
//! comparison.
//!
//! The engine itself never touches the filesystem; this module is how the
//! command-line front end keeps results and resumable answer logs around.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::DimensionId;
use crate::result::AssessmentResult;
use crate::session::{AnswerRecord, Session, SessionId};

pub const DEFAULT_RESULTS_DIR: &str = ".career-compass/results";
pub const DEFAULT_SESSIONS_DIR: &str = ".career-compass/sessions";
const SNAPSHOT_SUFFIX: &str = ".session.json";

/// Score changes smaller than this are noise.
const CHANGE_THRESHOLD: f64 = 1.0;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(String),
    #[error("No saved session for catalog '{0}'. Start one with 'career-compass take {0}'.")]
    NoSession(String),
}

/// A result as written to disk. The timestamp lives here, never in the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedResult {
    pub saved_at: DateTime<Utc>,
    pub result: AssessmentResult,
}

pub fn default_result_filename(catalog_id: &str) -> String {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    format!("{}_{}.json", catalog_id, timestamp)
}

/// Save a result under `dir` with a timestamped name, or at `path` if given.
pub fn save_result(
    result: &AssessmentResult,
    dir: &Path,
    path: Option<&Path>,
) -> Result<PathBuf, StoreError> {
    let save_path = match path {
        Some(p) => p.to_path_buf(),
        None => dir.join(default_result_filename(&result.catalog_id)),
    };
    if let Some(parent) = save_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let saved = SavedResult {
        saved_at: Utc::now(),
        result: result.clone(),
    };
    let json = serde_json::to_string_pretty(&saved).map_err(|e| StoreError::Json(e.to_string()))?;
    fs::write(&save_path, json)?;
    Ok(save_path)
}

/// Load a saved result. Bare result JSON (as printed by `--format json`) is
/// accepted too and gets the file's modification time.
pub fn load_result(path: &Path) -> Result<SavedResult, StoreError> {
    let json = fs::read_to_string(path)?;
    if let Ok(saved) = serde_json::from_str::<SavedResult>(&json) {
        return Ok(saved);
    }
    let result: AssessmentResult =
        serde_json::from_str(&json).map_err(|e| StoreError::Json(e.to_string()))?;
    let saved_at = fs::metadata(path)
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());
    Ok(SavedResult { saved_at, result })
}

/// Saved result files in `dir`, oldest first.
pub fn list_results(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut results = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            results.push(path);
        }
    }
    // Names end in a sortable timestamp.
    results.sort();
    Ok(results)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionDelta {
    pub id: DimensionId,
    pub label: String,
    pub before: f64,
    pub after: f64,
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultComparison {
    pub catalog_id: String,
    pub before_recommended: String,
    pub after_recommended: String,
    pub recommendation_changed: bool,
    /// Dimensions present in both results, in the order of the newer ranking.
    pub deltas: Vec<DimensionDelta>,
    pub improvements: Vec<String>,
    pub regressions: Vec<String>,
}

/// Compare two results, typically an earlier and a retaken checkup.
pub fn compare_results(before: &AssessmentResult, after: &AssessmentResult) -> ResultComparison {
    let deltas: Vec<DimensionDelta> = after
        .ranked_dimensions
        .iter()
        .filter_map(|entry| {
            before.entry(&entry.id).map(|old| DimensionDelta {
                id: entry.id.clone(),
                label: entry.label.clone(),
                before: old.normalized_score,
                after: entry.normalized_score,
                delta: crate::scoring::round2(entry.normalized_score - old.normalized_score),
            })
        })
        .collect();

    let improvements = deltas
        .iter()
        .filter(|d| d.delta > CHANGE_THRESHOLD)
        .map(|d| format!("{}: +{:.1}", d.label, d.delta))
        .collect();
    let regressions = deltas
        .iter()
        .filter(|d| d.delta < -CHANGE_THRESHOLD)
        .map(|d| format!("{}: {:.1}", d.label, d.delta))
        .collect();

    ResultComparison {
        catalog_id: after.catalog_id.clone(),
        before_recommended: before.recommended.label.clone(),
        after_recommended: after.recommended.label.clone(),
        recommendation_changed: before.recommended.id != after.recommended.id,
        deltas,
        improvements,
        regressions,
    }
}

/// Ordered answer log of an unfinished session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub catalog_id: String,
    pub started_at: DateTime<Utc>,
    pub answers: Vec<AnswerRecord>,
}

impl SessionSnapshot {
    pub fn capture(session: &Session, started_at: DateTime<Utc>) -> Self {
        Self {
            session_id: session.id().clone(),
            catalog_id: session.catalog().id.clone(),
            started_at,
            answers: session.records().to_vec(),
        }
    }
}

/// Abstracts where interrupted sessions are kept between runs.
pub trait SessionStore {
    fn load(&self, catalog_id: &str) -> Result<SessionSnapshot, StoreError>;
    fn save(&self, snapshot: &SessionSnapshot) -> Result<PathBuf, StoreError>;
    fn delete(&self, catalog_id: &str) -> Result<(), StoreError>;
    fn exists(&self, catalog_id: &str) -> bool;
    fn list(&self) -> Result<Vec<SessionSnapshot>, StoreError>;
}

/// One snapshot file per catalog under a directory.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, catalog_id: &str) -> PathBuf {
        self.dir.join(format!("{}{}", catalog_id, SNAPSHOT_SUFFIX))
    }
}

impl Default for FileSessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSIONS_DIR)
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self, catalog_id: &str) -> Result<SessionSnapshot, StoreError> {
        let path = self.path_for(catalog_id);
        if !path.exists() {
            return Err(StoreError::NoSession(catalog_id.to_string()));
        }
        let json = fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| StoreError::Json(e.to_string()))
    }

    fn save(&self, snapshot: &SessionSnapshot) -> Result<PathBuf, StoreError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&snapshot.catalog_id);
        let json =
            serde_json::to_string_pretty(snapshot).map_err(|e| StoreError::Json(e.to_string()))?;
        fs::write(&path, json)?;
        Ok(path)
    }

    fn delete(&self, catalog_id: &str) -> Result<(), StoreError> {
        let path = self.path_for(catalog_id);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn exists(&self, catalog_id: &str) -> bool {
        self.path_for(catalog_id).exists()
    }

    fn list(&self) -> Result<Vec<SessionSnapshot>, StoreError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut paths: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(SNAPSHOT_SUFFIX))
            })
            .collect();
        paths.sort();

        paths
            .into_iter()
            .map(|path| {
                let json = fs::read_to_string(path)?;
                serde_json::from_str(&json).map_err(|e| StoreError::Json(e.to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NormalizationMode;
    use crate::models::ScoreSource;
    use crate::ranking::RankedEntry;
    use crate::result::Recommendation;
    use crate::session::Answer;
    use crate::test_utils::{choice, scenario_one_catalog};

    fn entry(id: &str, score: f64, rank: usize) -> RankedEntry {
        RankedEntry {
            id: DimensionId::from(id),
            label: id.to_string(),
            raw_score: score,
            normalized_score: score,
            rank,
        }
    }

    fn result(scores: &[(&str, f64)]) -> AssessmentResult {
        let ranked: Vec<RankedEntry> = scores
            .iter()
            .enumerate()
            .map(|(i, (id, s))| entry(id, *s, i + 1))
            .collect();
        AssessmentResult {
            catalog_id: "checkup".into(),
            total_prompts: 2,
            answered_prompts: 2,
            normalization: NormalizationMode::WeightedAverage {
                max_answer_value: 5,
            },
            primary_source: ScoreSource::Fit,
            top3_primary: ranked.clone(),
            top3_secondary: vec![],
            preference_top3: None,
            fit_top3: None,
            recommended: Recommendation {
                id: ranked[0].id.clone(),
                label: ranked[0].label.clone(),
                score: ranked[0].normalized_score,
                rank: 1,
                rationale: "top".into(),
            },
            strengths: vec![],
            weaknesses: vec![],
            insights: vec![],
            recommendations: vec![],
            ranked_dimensions: ranked,
        }
    }

    #[test]
    fn save_and_load_result() {
        let dir = tempfile::tempdir().unwrap();
        let original = result(&[("A", 80.0), ("B", 40.0)]);

        let path = save_result(&original, dir.path(), None).unwrap();
        assert!(path.starts_with(dir.path()));
        let loaded = load_result(&path).unwrap();
        assert_eq!(loaded.result, original);
        assert_eq!(list_results(dir.path()).unwrap(), vec![path]);
    }

    #[test]
    fn load_accepts_bare_result_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bare.json");
        let original = result(&[("A", 80.0)]);
        fs::write(&path, serde_json::to_string(&original).unwrap()).unwrap();
        assert_eq!(load_result(&path).unwrap().result, original);
    }

    #[test]
    fn list_of_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_results(&dir.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn comparison_detects_changes() {
        let before = result(&[("A", 80.0), ("B", 40.0), ("C", 50.0)]);
        let after = result(&[("B", 85.0), ("A", 79.5), ("C", 30.0)]);

        let comparison = compare_results(&before, &after);
        assert!(comparison.recommendation_changed);
        assert_eq!(comparison.improvements, vec!["B: +45.0"]);
        assert_eq!(comparison.regressions, vec!["C: -20.0"]);
        assert_eq!(comparison.deltas.len(), 3);
        assert_eq!(comparison.deltas[1].delta, -0.5);
    }

    #[test]
    fn session_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        assert!(!store.exists("scenario-one"));
        assert!(matches!(store.load("scenario-one"), Err(StoreError::NoSession(_))));

        let mut session =
            Session::start(SessionId::new("s1"), scenario_one_catalog()).unwrap();
        session.answer_and_advance(choice("a")).unwrap();
        let snapshot = SessionSnapshot::capture(&session, Utc::now());
        store.save(&snapshot).unwrap();

        assert!(store.exists("scenario-one"));
        let loaded = store.load("scenario-one").unwrap();
        assert_eq!(loaded, snapshot);
        assert_eq!(loaded.answers[0].answer, Some(Answer::Choice("a".into())));
        assert_eq!(store.list().unwrap().len(), 1);

        store.delete("scenario-one").unwrap();
        assert!(!store.exists("scenario-one"));
    }
}
