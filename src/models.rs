//! Core data model: dimensions, prompts, choices and catalogs.
//!
//! These are the compiled, validated forms. Authoring files are parsed into the
//! raw types in [`crate::catalog`] and only become a [`Catalog`] after the
//! load-time validation pass, so every dimension reference here is an index
//! into the catalog's [`DimensionRegistry`].

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Stable key of a scoring axis (e.g. `PM`, `data_analysis`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DimensionId(pub String);

impl DimensionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DimensionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DimensionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Identifier of a prompt, unique within its catalog.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptId(pub String);

impl PromptId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PromptId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PromptId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Identifier of a selectable option, unique within its prompt.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChoiceId(pub String);

impl ChoiceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ChoiceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ChoiceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Independent score table a prompt feeds.
///
/// `Preference` collects stated interest, `Fit` collects demonstrated
/// competency. The two are ranked separately and never merged.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    #[default]
    Preference,
    Fit,
}

impl ScoreSource {
    pub fn all() -> &'static [ScoreSource] {
        &[ScoreSource::Preference, ScoreSource::Fit]
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Preference => "Preference",
            Self::Fit => "Fit",
        }
    }
}

impl Display for ScoreSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Preference => write!(f, "preference"),
            Self::Fit => write!(f, "fit"),
        }
    }
}

impl std::str::FromStr for ScoreSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "preference" | "interest" => Ok(Self::Preference),
            "fit" | "competency" => Ok(Self::Fit),
            _ => Err(format!(
                "Unknown score source: '{}'. Valid options: preference, fit",
                s
            )),
        }
    }
}

/// How raw accumulator totals are mapped onto the 0-100 scale.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum NormalizationMode {
    /// `raw / max(raw) * 100`; every score is 0 when the maximum is 0.
    ShareOfMaximum,
    /// `Σ(value·w) / Σw * (100 / max_answer_value)`.
    WeightedAverage { max_answer_value: u32 },
}

impl NormalizationMode {
    /// Factor mapping one answer unit onto the 0-100 scale, if the mode has one.
    pub fn scale_factor(&self) -> Option<f64> {
        match self {
            Self::ShareOfMaximum => None,
            Self::WeightedAverage { max_answer_value } => {
                Some(100.0 / f64::from((*max_answer_value).max(1)))
            }
        }
    }
}

impl Display for NormalizationMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ShareOfMaximum => write!(f, "share_of_maximum"),
            Self::WeightedAverage { max_answer_value } => {
                write!(f, "weighted_average (1-{})", max_answer_value)
            }
        }
    }
}

/// Coarse position of a dimension in the ranking, used to pick rationale templates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankBand {
    /// Rank 1.
    Top,
    /// Ranks 2-3.
    High,
    Middle,
    /// The bottom `k` entries (the weakness band).
    Low,
}

/// A scoring axis: a job category or a competency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub id: DimensionId,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Rationale templates keyed by rank band. Placeholders: `{label}`,
    /// `{score}`, `{rank}`, `{highlights}`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub templates: BTreeMap<RankBand, String>,
    /// Suggested activities, surfaced when the dimension is a weakness.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,
}

impl Dimension {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: DimensionId::new(id),
            label: label.into(),
            description: None,
            templates: BTreeMap::new(),
            resources: Vec::new(),
        }
    }

    pub fn with_template(mut self, band: RankBand, template: impl Into<String>) -> Self {
        self.templates.insert(band, template.into());
        self
    }

    pub fn with_resources(mut self, resources: Vec<String>) -> Self {
        self.resources = resources;
        self
    }
}

/// Closed, ordered set of dimensions for one catalog.
///
/// Authoring order is significant: it is the tie-break order for ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionRegistry {
    dimensions: Vec<Dimension>,
    index: BTreeMap<DimensionId, usize>,
}

impl DimensionRegistry {
    /// Build a registry. Later duplicates never shadow the first occurrence;
    /// the catalog validation pass rejects duplicates before this is called.
    pub fn new(dimensions: Vec<Dimension>) -> Self {
        let mut index = BTreeMap::new();
        for (position, dimension) in dimensions.iter().enumerate() {
            index.entry(dimension.id.clone()).or_insert(position);
        }
        Self { dimensions, index }
    }

    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Dimension> {
        self.dimensions.get(index)
    }

    pub fn index_of(&self, id: &DimensionId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn find(&self, id: &DimensionId) -> Option<&Dimension> {
        self.index_of(id).and_then(|i| self.dimensions.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dimension> {
        self.dimensions.iter()
    }
}

/// One compiled weight: dimension index and amount.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weight {
    pub dimension: usize,
    pub value: f64,
}

/// Where the cursor goes after a jump rule fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jump {
    /// Index of the target prompt (always ahead of the prompt owning the rule).
    To(usize),
    Complete,
}

/// A selectable answer to a choice prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    pub id: ChoiceId,
    pub label: String,
    pub weights: Vec<Weight>,
    /// Overrides the owning prompt's multiplier when present.
    pub multiplier: Option<f64>,
    pub on_select: Option<Jump>,
}

/// Bounded numeric scale (Likert or self-rated skill).
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleSpec {
    pub min: u32,
    pub max: u32,
    pub weights: Vec<Weight>,
    pub jumps: Vec<(u32, Jump)>,
}

impl ScaleSpec {
    pub fn contains(&self, value: u32) -> bool {
        (self.min..=self.max).contains(&value)
    }

    pub fn jump_for(&self, value: u32) -> Option<Jump> {
        self.jumps
            .iter()
            .find(|(v, _)| *v == value)
            .map(|(_, jump)| *jump)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PromptKind {
    SingleChoice { choices: Vec<Choice> },
    MultiChoice { choices: Vec<Choice> },
    FreeText,
    Scale(ScaleSpec),
}

impl PromptKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SingleChoice { .. } => "single_choice",
            Self::MultiChoice { .. } => "multi_choice",
            Self::FreeText => "free_text",
            Self::Scale(_) => "scale",
        }
    }
}

/// One step of an assessment.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub id: PromptId,
    /// 0-based position in the catalog.
    pub ordinal: usize,
    pub text: String,
    pub kind: PromptKind,
    pub optional: bool,
    /// Base importance of the prompt (e.g. 1.0-1.5).
    pub multiplier: f64,
    pub source: ScoreSource,
    /// Short trait label used for highlight rationales.
    pub category: Option<String>,
    pub phase: Option<String>,
    pub speaker: Option<String>,
}

impl Prompt {
    /// Options of a choice prompt; empty for free-text and scale prompts.
    pub fn choices(&self) -> &[Choice] {
        match &self.kind {
            PromptKind::SingleChoice { choices } | PromptKind::MultiChoice { choices } => choices,
            PromptKind::FreeText | PromptKind::Scale(_) => &[],
        }
    }

    pub fn choice(&self, id: &ChoiceId) -> Option<&Choice> {
        self.choices().iter().find(|c| &c.id == id)
    }

    pub fn multiplier_for(&self, choice: &Choice) -> f64 {
        choice.multiplier.unwrap_or(self.multiplier)
    }

    /// Whether answering this prompt can ever move a score.
    pub fn is_scored(&self) -> bool {
        match &self.kind {
            PromptKind::SingleChoice { choices } | PromptKind::MultiChoice { choices } => {
                choices.iter().any(|c| !c.weights.is_empty())
            }
            PromptKind::Scale(scale) => !scale.weights.is_empty(),
            PromptKind::FreeText => false,
        }
    }
}

/// An ordered, validated assessment variant.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    pub id: String,
    pub title: String,
    pub description: String,
    pub normalization: NormalizationMode,
    pub primary_source: ScoreSource,
    /// Number of strengths and weaknesses to label.
    pub classification_k: usize,
    pub dimensions: DimensionRegistry,
    pub prompts: Vec<Prompt>,
}

impl Catalog {
    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    pub fn prompt(&self, index: usize) -> Option<&Prompt> {
        self.prompts.get(index)
    }

    pub fn prompt_index(&self, id: &PromptId) -> Option<usize> {
        self.prompts.iter().position(|p| &p.id == id)
    }

    /// Score sources fed by at least one scored prompt, in canonical order.
    pub fn sources(&self) -> Vec<ScoreSource> {
        ScoreSource::all()
            .iter()
            .copied()
            .filter(|source| {
                self.prompts
                    .iter()
                    .any(|p| p.source == *source && p.is_scored())
            })
            .collect()
    }
}
