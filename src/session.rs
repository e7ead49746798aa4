//! In-progress assessments.
//!
//! A [`Session`] owns the prompt cursor, the answer log and the
//! [`Accumulator`]. `answer_and_advance` (and its `skip` sibling) is the only
//! place the accumulator changes. Every answer is checked against the current
//! prompt before anything is mutated, so a rejected answer leaves the session
//! exactly as it was.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, TryLockError};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::catalog::CatalogIssue;
use crate::error::EngineError;
use crate::models::{
    Catalog, ChoiceId, DimensionId, Jump, Prompt, PromptId, PromptKind, ScoreSource,
};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the caller supplies for one prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Answer {
    Choice(ChoiceId),
    Choices(Vec<ChoiceId>),
    Text(String),
    Scale(u32),
}

impl Answer {
    /// Empty text and empty selections count as "no answer".
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Choices(ids) => ids.is_empty(),
            Self::Choice(_) | Self::Scale(_) => false,
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Self::Choice(_) => "single_choice",
            Self::Choices(_) => "multi_choice",
            Self::Text(_) => "free_text",
            Self::Scale(_) => "scale",
        }
    }
}

/// One entry of the answer log. `answer: None` marks a skipped optional prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub prompt_id: PromptId,
    #[serde(default)]
    pub answer: Option<Answer>,
}

/// Where the cursor ended up after an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Index of the new current prompt.
    Next(usize),
    Complete,
}

/// Running totals for one dimension of one score source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tally {
    /// Sum of contributions (`weight · multiplier`, times the value on scales).
    pub raw: f64,
    /// Sum of applied weights, the denominator of weighted-average scoring.
    pub weight: f64,
    /// Contributions grouped by the category of the prompt they came from.
    pub categories: BTreeMap<String, f64>,
}

/// Per-source, per-dimension running totals of one session.
#[derive(Debug, Clone, PartialEq)]
pub struct Accumulator {
    tables: BTreeMap<ScoreSource, Vec<Tally>>,
}

impl Accumulator {
    fn new(catalog: &Catalog) -> Self {
        let tables = catalog
            .sources()
            .into_iter()
            .map(|source| (source, vec![Tally::default(); catalog.dimensions.len()]))
            .collect();
        Self { tables }
    }

    /// Sources with a table, in canonical order.
    pub fn sources(&self) -> impl Iterator<Item = ScoreSource> + '_ {
        self.tables.keys().copied()
    }

    pub fn table(&self, source: ScoreSource) -> Option<&[Tally]> {
        self.tables.get(&source).map(Vec::as_slice)
    }

    /// Raw total of one dimension; 0 for untouched dimensions or sources.
    pub fn raw(&self, source: ScoreSource, dimension: usize) -> f64 {
        self.table(source)
            .and_then(|t| t.get(dimension))
            .map_or(0.0, |t| t.raw)
    }

    fn apply(&mut self, source: ScoreSource, category: Option<&str>, delta: &Delta) {
        let Some(tally) = self
            .tables
            .get_mut(&source)
            .and_then(|t| t.get_mut(delta.dimension))
        else {
            return;
        };
        tally.raw += delta.raw;
        tally.weight += delta.weight;
        if let Some(category) = category {
            *tally.categories.entry(category.to_string()).or_insert(0.0) += delta.raw;
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Delta {
    dimension: usize,
    raw: f64,
    weight: f64,
}

/// A validated answer, ready to be merged.
#[derive(Debug)]
struct Plan {
    answer: Answer,
    deltas: Vec<Delta>,
    jump: Option<Jump>,
}

/// One in-progress assessment over one catalog.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    catalog: Arc<Catalog>,
    cursor: usize,
    answers: BTreeMap<PromptId, Answer>,
    log: Vec<AnswerRecord>,
    draft: Option<Answer>,
    accumulator: Accumulator,
}

impl Session {
    /// Begin a session at the first prompt.
    ///
    /// Catalogs are validated at load time; this re-checks the two conditions
    /// that would make a session meaningless.
    pub fn start(id: SessionId, catalog: Arc<Catalog>) -> Result<Self, EngineError> {
        let mut issues = Vec::new();
        if catalog.is_empty() {
            issues.push(CatalogIssue::NoPrompts);
        }
        let count = catalog.dimensions.len();
        for prompt in &catalog.prompts {
            let dangling = match &prompt.kind {
                PromptKind::Scale(scale) => scale.weights.iter().find(|w| w.dimension >= count),
                _ => prompt
                    .choices()
                    .iter()
                    .flat_map(|c| c.weights.iter())
                    .find(|w| w.dimension >= count),
            };
            if let Some(weight) = dangling {
                issues.push(CatalogIssue::UnknownDimension {
                    prompt: prompt.id.clone(),
                    dimension: DimensionId::new(format!("#{}", weight.dimension)),
                });
            }
        }
        if !issues.is_empty() {
            return Err(EngineError::InvalidCatalog {
                catalog: catalog.id.clone(),
                issues,
            });
        }

        debug!("Session {} started on catalog '{}'", id, catalog.id);
        Ok(Self {
            accumulator: Accumulator::new(&catalog),
            id,
            catalog,
            cursor: 0,
            answers: BTreeMap::new(),
            log: Vec::new(),
            draft: None,
        })
    }

    /// Rebuild a session from a possibly partial answer log.
    ///
    /// Optional prompts missing from the log are skipped. Replay stops when
    /// the log runs out, leaving the cursor on the first unanswered prompt.
    pub fn resume(
        id: SessionId,
        catalog: Arc<Catalog>,
        records: &[AnswerRecord],
    ) -> Result<Self, EngineError> {
        let mut session = Self::start(id, catalog)?;
        let mut records = records.iter().peekable();

        while let Some(record) = records.peek() {
            let prompt = session.current_prompt().map_err(|_| {
                EngineError::invalid_answer(
                    &record.prompt_id,
                    "answer recorded after the session completed",
                )
            })?;
            let (prompt_id, optional) = (prompt.id.clone(), prompt.optional);

            if record.prompt_id == prompt_id {
                match &record.answer {
                    Some(answer) => session.answer_and_advance(answer.clone())?,
                    None => session.skip()?,
                };
                records.next();
            } else if optional {
                session.skip()?;
            } else {
                return Err(EngineError::invalid_answer(
                    &prompt_id,
                    format!(
                        "required prompt has no answer (log continues with '{}')",
                        record.prompt_id
                    ),
                ));
            }
        }
        Ok(session)
    }

    /// Rebuild a complete session from an answer log.
    ///
    /// Trailing optional prompts may be omitted from the log.
    pub fn replay(
        id: SessionId,
        catalog: Arc<Catalog>,
        records: &[AnswerRecord],
    ) -> Result<Self, EngineError> {
        let mut session = Self::resume(id, catalog, records)?;
        while let Ok(prompt) = session.current_prompt() {
            if !prompt.optional {
                return Err(EngineError::invalid_answer(
                    &prompt.id,
                    "required prompt has no answer",
                ));
            }
            session.skip()?;
        }
        Ok(session)
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_complete(&self) -> bool {
        self.cursor >= self.catalog.len()
    }

    pub fn accumulator(&self) -> &Accumulator {
        &self.accumulator
    }

    /// Captured answers keyed by prompt id. Skipped prompts are absent.
    pub fn answers(&self) -> &BTreeMap<PromptId, Answer> {
        &self.answers
    }

    /// Ordered log of every answered or skipped prompt.
    pub fn records(&self) -> &[AnswerRecord] {
        &self.log
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    pub fn current_prompt(&self) -> Result<&Prompt, EngineError> {
        self.catalog
            .prompt(self.cursor)
            .ok_or(EngineError::SessionComplete)
    }

    /// Store a draft answer for the current prompt without merging it.
    ///
    /// An empty draft on an optional prompt is kept as "no answer".
    pub fn record(&mut self, answer: Answer) -> Result<(), EngineError> {
        let prompt = self.current_prompt()?;
        if answer.is_empty() && prompt.optional {
            self.draft = None;
            return Ok(());
        }
        let plan = plan(prompt, answer)?;
        self.draft = Some(plan.answer);
        Ok(())
    }

    pub fn draft(&self) -> Option<&Answer> {
        self.draft.as_ref()
    }

    /// Whether the "required answer" gate lets the cursor move.
    pub fn can_advance(&self) -> bool {
        match self.current_prompt() {
            Ok(prompt) => prompt.optional || self.draft.is_some(),
            Err(_) => false,
        }
    }

    /// Commit the draft, or skip the current prompt when it is optional.
    pub fn advance(&mut self) -> Result<Progress, EngineError> {
        let prompt = self.current_prompt()?;
        let (prompt_id, optional) = (prompt.id.clone(), prompt.optional);
        match self.draft.clone() {
            Some(answer) => self.answer_and_advance(answer),
            None if optional => self.skip(),
            None => Err(EngineError::invalid_answer(
                &prompt_id,
                "an answer is required before moving on",
            )),
        }
    }

    /// Validate `answer` against the current prompt, merge its weights and
    /// move the cursor.
    pub fn answer_and_advance(&mut self, answer: Answer) -> Result<Progress, EngineError> {
        let prompt = self.current_prompt()?;
        if answer.is_empty() && prompt.optional {
            return self.skip();
        }
        let plan = plan(prompt, answer)?;
        Ok(self.commit(plan))
    }

    /// Move past an optional prompt without an answer.
    pub fn skip(&mut self) -> Result<Progress, EngineError> {
        let prompt = self.current_prompt()?;
        if !prompt.optional {
            return Err(EngineError::invalid_answer(
                &prompt.id,
                "prompt is required and cannot be skipped",
            ));
        }
        let prompt_id = prompt.id.clone();
        debug!("Session {}: skipped {}", self.id, prompt_id);
        self.log.push(AnswerRecord {
            prompt_id,
            answer: None,
        });
        self.draft = None;
        self.cursor += 1;
        Ok(self.progress())
    }

    fn commit(&mut self, plan: Plan) -> Progress {
        let catalog = Arc::clone(&self.catalog);
        let Some(prompt) = catalog.prompt(self.cursor) else {
            return Progress::Complete;
        };

        for delta in &plan.deltas {
            self.accumulator
                .apply(prompt.source, prompt.category.as_deref(), delta);
        }
        debug!(
            "Session {}: {} merged {} weight(s) into {}",
            self.id,
            prompt.id,
            plan.deltas.len(),
            prompt.source
        );

        self.answers.insert(prompt.id.clone(), plan.answer.clone());
        self.log.push(AnswerRecord {
            prompt_id: prompt.id.clone(),
            answer: Some(plan.answer),
        });
        self.draft = None;

        self.cursor = match plan.jump {
            Some(Jump::To(target)) => {
                debug!(
                    "Session {}: jump from {} to {}",
                    self.id,
                    prompt.id,
                    catalog.prompt(target).map_or("?", |p| p.id.as_str())
                );
                target
            }
            Some(Jump::Complete) => {
                debug!("Session {}: jump from {} to completion", self.id, prompt.id);
                catalog.len()
            }
            None => self.cursor + 1,
        };
        self.progress()
    }

    fn progress(&self) -> Progress {
        if self.is_complete() {
            Progress::Complete
        } else {
            Progress::Next(self.cursor)
        }
    }
}

/// Check an answer against a prompt and work out what it contributes.
fn plan(prompt: &Prompt, answer: Answer) -> Result<Plan, EngineError> {
    let mismatch = |answer: &Answer| {
        EngineError::invalid_answer(
            &prompt.id,
            format!(
                "expected a {} answer, got {}",
                prompt.kind.name(),
                answer.kind_name()
            ),
        )
    };

    match (&prompt.kind, answer) {
        (PromptKind::SingleChoice { .. }, Answer::Choice(id)) => {
            let choice = prompt.choice(&id).ok_or_else(|| unknown_option(prompt, &id))?;
            let multiplier = prompt.multiplier_for(choice);
            Ok(Plan {
                deltas: choice_deltas(&choice.weights, multiplier),
                jump: choice.on_select,
                answer: Answer::Choice(id),
            })
        }
        (PromptKind::MultiChoice { .. }, Answer::Choices(ids)) => {
            if ids.is_empty() {
                return Err(EngineError::invalid_answer(
                    &prompt.id,
                    "select at least one option",
                ));
            }
            let mut seen = BTreeSet::new();
            let mut deltas = Vec::new();
            for id in &ids {
                if !seen.insert(id) {
                    return Err(EngineError::invalid_answer(
                        &prompt.id,
                        format!("option '{}' selected more than once", id),
                    ));
                }
                let choice = prompt.choice(id).ok_or_else(|| unknown_option(prompt, id))?;
                deltas.extend(choice_deltas(&choice.weights, prompt.multiplier_for(choice)));
            }
            Ok(Plan {
                answer: Answer::Choices(ids),
                deltas,
                jump: None,
            })
        }
        (PromptKind::FreeText, Answer::Text(text)) => {
            if text.trim().is_empty() {
                return Err(EngineError::invalid_answer(
                    &prompt.id,
                    "free-text answer must not be empty",
                ));
            }
            Ok(Plan {
                answer: Answer::Text(text),
                deltas: Vec::new(),
                jump: None,
            })
        }
        (PromptKind::Scale(scale), Answer::Scale(value)) => {
            if !scale.contains(value) {
                return Err(EngineError::invalid_answer(
                    &prompt.id,
                    format!("{} is outside {}..={}", value, scale.min, scale.max),
                ));
            }
            let deltas = scale
                .weights
                .iter()
                .map(|w| {
                    let applied = w.value * prompt.multiplier;
                    Delta {
                        dimension: w.dimension,
                        raw: f64::from(value) * applied,
                        weight: applied,
                    }
                })
                .collect();
            Ok(Plan {
                answer: Answer::Scale(value),
                deltas,
                jump: scale.jump_for(value),
            })
        }
        (_, other) => Err(mismatch(&other)),
    }
}

fn choice_deltas(weights: &[crate::models::Weight], multiplier: f64) -> Vec<Delta> {
    weights
        .iter()
        .map(|w| Delta {
            dimension: w.dimension,
            raw: w.value * multiplier,
            weight: w.value * multiplier,
        })
        .collect()
}

fn unknown_option(prompt: &Prompt, id: &ChoiceId) -> EngineError {
    EngineError::invalid_answer(&prompt.id, format!("unknown option '{}'", id))
}

/// Shared handle that serializes submissions for one session.
///
/// A second submission while one is being applied is rejected with
/// `SubmissionInFlight` rather than queued, so a double-clicked answer can
/// never be merged twice.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    inner: Arc<Mutex<Session>>,
}

impl SessionHandle {
    pub fn new(session: Session) -> Self {
        Self {
            id: session.id().clone(),
            inner: Arc::new(Mutex::new(session)),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn answer_and_advance(&self, answer: Answer) -> Result<Progress, EngineError> {
        self.with_session(|session| session.answer_and_advance(answer))
    }

    pub fn skip(&self) -> Result<Progress, EngineError> {
        self.with_session(Session::skip)
    }

    /// Run `f` with exclusive access, failing fast if another call holds it.
    pub fn with_session<T>(
        &self,
        f: impl FnOnce(&mut Session) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let mut guard = match self.inner.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => {
                return Err(EngineError::SubmissionInFlight {
                    session: self.id.to_string(),
                })
            }
            // Every mutation validates before it writes, so a panic mid-call
            // cannot leave a half-merged answer behind.
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    /// Copy of the current session state.
    pub fn snapshot(&self) -> Result<Session, EngineError> {
        self.with_session(|session| Ok(session.clone()))
    }
}
