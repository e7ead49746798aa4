//! Load-time validation of authored catalogs.
//!
//! Every issue is collected in one pass so an author sees the whole list
//! instead of fixing typos one rebuild at a time.

use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::{CatalogFile, ChoiceFile, JumpTarget, PromptFile, PromptKindFile};
use crate::models::{ChoiceId, DimensionId, NormalizationMode, PromptId, ScoreSource};

/// Problems found in a catalog file.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogIssue {
    /// The catalog declares no dimensions
    NoDimensions,

    /// The catalog declares no prompts
    NoPrompts,

    /// No prompt can move any score
    NoScoredPrompts,

    /// A dimension id is declared twice
    DuplicateDimension { dimension: DimensionId },

    /// A prompt id is declared twice
    DuplicatePrompt { prompt: PromptId },

    /// An option id appears twice within one prompt
    DuplicateChoice { prompt: PromptId, choice: ChoiceId },

    /// A prompt has no display text
    EmptyText { prompt: PromptId },

    /// A choice prompt offers no options
    EmptyChoices { prompt: PromptId },

    /// A weight references a dimension missing from the registry
    UnknownDimension {
        prompt: PromptId,
        dimension: DimensionId,
    },

    /// A weight is negative or not finite
    InvalidWeight {
        prompt: PromptId,
        dimension: DimensionId,
        value: f64,
    },

    /// A multiplier is not a positive finite number
    InvalidMultiplier { prompt: PromptId, value: f64 },

    /// A scale has min > max or a zero maximum
    InvalidScale { prompt: PromptId, min: u32, max: u32 },

    /// A scale reaches past the catalog's maximum answer value
    ScaleExceedsMaximum {
        prompt: PromptId,
        max: u32,
        limit: u32,
    },

    /// A scale jump is attached to a value outside the scale
    JumpValueOutOfRange { prompt: PromptId, value: u32 },

    /// A jump targets a prompt that does not exist
    UnknownJumpTarget { prompt: PromptId, target: PromptId },

    /// A jump targets the same or an earlier prompt
    BackwardJump { prompt: PromptId, target: PromptId },

    /// Multi-choice options cannot carry jump rules
    JumpInMultiChoice { prompt: PromptId, choice: ChoiceId },

    /// Weighted-average catalogs only score scale prompts
    ChoiceWeightsInWeightedAverage { prompt: PromptId },

    /// Free-text prompts never contribute weight
    FreeTextWeights { prompt: PromptId },

    /// `max_answer_value` of zero makes the scale factor undefined
    InvalidMaxAnswerValue,

    /// The designated primary source is not fed by any prompt
    PrimarySourceUnused { source: ScoreSource },
}

impl std::fmt::Display for CatalogIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDimensions => write!(f, "no dimensions declared"),
            Self::NoPrompts => write!(f, "no prompts declared"),
            Self::NoScoredPrompts => write!(f, "no prompt carries any weight"),
            Self::DuplicateDimension { dimension } => {
                write!(f, "dimension '{}' declared more than once", dimension)
            }
            Self::DuplicatePrompt { prompt } => {
                write!(f, "prompt '{}' declared more than once", prompt)
            }
            Self::DuplicateChoice { prompt, choice } => {
                write!(f, "{}: option '{}' declared more than once", prompt, choice)
            }
            Self::EmptyText { prompt } => write!(f, "{}: empty prompt text", prompt),
            Self::EmptyChoices { prompt } => write!(f, "{}: choice prompt has no options", prompt),
            Self::UnknownDimension { prompt, dimension } => {
                write!(f, "{}: unknown dimension '{}'", prompt, dimension)
            }
            Self::InvalidWeight {
                prompt,
                dimension,
                value,
            } => write!(
                f,
                "{}: weight {} for '{}' must be finite and non-negative",
                prompt, value, dimension
            ),
            Self::InvalidMultiplier { prompt, value } => {
                write!(f, "{}: multiplier {} must be positive", prompt, value)
            }
            Self::InvalidScale { prompt, min, max } => {
                write!(f, "{}: invalid scale {}..={}", prompt, min, max)
            }
            Self::ScaleExceedsMaximum { prompt, max, limit } => write!(
                f,
                "{}: scale maximum {} exceeds max_answer_value {}",
                prompt, max, limit
            ),
            Self::JumpValueOutOfRange { prompt, value } => {
                write!(f, "{}: jump attached to out-of-range value {}", prompt, value)
            }
            Self::UnknownJumpTarget { prompt, target } => {
                write!(f, "{}: jump to unknown prompt '{}'", prompt, target)
            }
            Self::BackwardJump { prompt, target } => {
                write!(f, "{}: jump to '{}' does not move forward", prompt, target)
            }
            Self::JumpInMultiChoice { prompt, choice } => write!(
                f,
                "{}: option '{}' has a jump rule but the prompt is multi-choice",
                prompt, choice
            ),
            Self::ChoiceWeightsInWeightedAverage { prompt } => write!(
                f,
                "{}: choice weights are not allowed in weighted_average catalogs",
                prompt
            ),
            Self::FreeTextWeights { prompt } => {
                write!(f, "{}: free-text prompts cannot carry weights", prompt)
            }
            Self::InvalidMaxAnswerValue => write!(f, "max_answer_value must be at least 1"),
            Self::PrimarySourceUnused { source } => {
                write!(f, "primary source '{}' is not fed by any prompt", source)
            }
        }
    }
}

/// Result of validating a catalog file
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub issues: Vec<CatalogIssue>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Run every structural check against an authored catalog.
pub fn validate(file: &CatalogFile) -> ValidationResult {
    let mut issues = Vec::new();

    if file.dimensions.is_empty() {
        issues.push(CatalogIssue::NoDimensions);
    }
    if file.prompts.is_empty() {
        issues.push(CatalogIssue::NoPrompts);
    }
    if let NormalizationMode::WeightedAverage { max_answer_value } = file.scoring {
        if max_answer_value == 0 {
            issues.push(CatalogIssue::InvalidMaxAnswerValue);
        }
    }

    let mut known_dimensions = BTreeSet::new();
    for dimension in &file.dimensions {
        if !known_dimensions.insert(dimension.id.clone()) {
            issues.push(CatalogIssue::DuplicateDimension {
                dimension: dimension.id.clone(),
            });
        }
    }

    let mut positions: BTreeMap<&PromptId, usize> = BTreeMap::new();
    for (position, prompt) in file.prompts.iter().enumerate() {
        if positions.contains_key(&prompt.id) {
            issues.push(CatalogIssue::DuplicatePrompt {
                prompt: prompt.id.clone(),
            });
        } else {
            positions.insert(&prompt.id, position);
        }
    }

    for (position, prompt) in file.prompts.iter().enumerate() {
        check_prompt(
            file,
            prompt,
            position,
            &known_dimensions,
            &positions,
            &mut issues,
        );
    }

    let scored: BTreeSet<ScoreSource> = file
        .prompts
        .iter()
        .filter(|p| p.kind.has_weights())
        .map(|p| p.source)
        .collect();
    if !file.prompts.is_empty() && scored.is_empty() {
        issues.push(CatalogIssue::NoScoredPrompts);
    } else if !scored.is_empty() && !scored.contains(&file.primary_source) {
        issues.push(CatalogIssue::PrimarySourceUnused {
            source: file.primary_source,
        });
    }

    ValidationResult { issues }
}

/// Dimensions that a weighted-average catalog may leave without any weight.
///
/// Coverage is per score source: every dimension needs a positive weight
/// from at least one scale prompt feeding each source the catalog uses.
/// Only required prompts that no jump rule can pass over count, since any
/// other prompt may go unanswered in a complete session. Share-of-maximum
/// catalogs have no such requirement; an untouched dimension simply
/// scores 0 there.
pub fn uncovered_dimensions(file: &CatalogFile) -> Vec<DimensionId> {
    if !matches!(file.scoring, NormalizationMode::WeightedAverage { .. }) {
        return Vec::new();
    }

    let skippable = skippable_positions(file);
    let mut sources = BTreeSet::new();
    let mut covered: BTreeMap<ScoreSource, BTreeSet<&DimensionId>> = BTreeMap::new();
    for (position, prompt) in file.prompts.iter().enumerate() {
        let PromptKindFile::Scale { weights, .. } = &prompt.kind else {
            continue;
        };
        if weights.is_empty() {
            continue;
        }
        sources.insert(prompt.source);
        if prompt.optional || skippable.contains(&position) {
            continue;
        }
        covered
            .entry(prompt.source)
            .or_default()
            .extend(weights.iter().filter(|(_, w)| **w > 0.0).map(|(d, _)| d));
    }

    file.dimensions
        .iter()
        .filter(|d| {
            sources
                .iter()
                .any(|source| !covered.get(source).is_some_and(|set| set.contains(&d.id)))
        })
        .map(|d| d.id.clone())
        .collect()
}

/// Positions some jump rule can pass over.
///
/// A jump to a later prompt skips everything in between; completing early
/// skips everything after the jumping prompt. Unknown targets are reported
/// elsewhere and ignored here.
fn skippable_positions(file: &CatalogFile) -> BTreeSet<usize> {
    let positions: BTreeMap<&PromptId, usize> = file
        .prompts
        .iter()
        .enumerate()
        .map(|(position, prompt)| (&prompt.id, position))
        .collect();

    let mut skippable = BTreeSet::new();
    for (position, prompt) in file.prompts.iter().enumerate() {
        let targets: Vec<&JumpTarget> = match &prompt.kind {
            PromptKindFile::SingleChoice { options } | PromptKindFile::MultiChoice { options } => {
                options.iter().filter_map(|o| o.on_select.as_ref()).collect()
            }
            PromptKindFile::Scale { jumps, .. } => jumps.iter().map(|j| &j.target).collect(),
            PromptKindFile::FreeText { .. } => Vec::new(),
        };
        for target in targets {
            let end = match target {
                JumpTarget::NextPrompt(id) => match positions.get(id) {
                    Some(&end) => end,
                    None => continue,
                },
                JumpTarget::Complete => file.prompts.len(),
            };
            skippable.extend(position + 1..end);
        }
    }
    skippable
}

fn check_prompt(
    file: &CatalogFile,
    prompt: &PromptFile,
    position: usize,
    known_dimensions: &BTreeSet<DimensionId>,
    positions: &BTreeMap<&PromptId, usize>,
    issues: &mut Vec<CatalogIssue>,
) {
    if prompt.text.trim().is_empty() {
        issues.push(CatalogIssue::EmptyText {
            prompt: prompt.id.clone(),
        });
    }
    check_multiplier(&prompt.id, prompt.multiplier, issues);

    let weighted_average = matches!(file.scoring, NormalizationMode::WeightedAverage { .. });

    match &prompt.kind {
        PromptKindFile::SingleChoice { options } | PromptKindFile::MultiChoice { options } => {
            let multi = matches!(prompt.kind, PromptKindFile::MultiChoice { .. });
            if options.is_empty() {
                issues.push(CatalogIssue::EmptyChoices {
                    prompt: prompt.id.clone(),
                });
            }
            if weighted_average && options.iter().any(|o| !o.weights.is_empty()) {
                issues.push(CatalogIssue::ChoiceWeightsInWeightedAverage {
                    prompt: prompt.id.clone(),
                });
            }

            let mut seen = BTreeSet::new();
            for option in options {
                if !seen.insert(&option.id) {
                    issues.push(CatalogIssue::DuplicateChoice {
                        prompt: prompt.id.clone(),
                        choice: option.id.clone(),
                    });
                }
                check_choice(prompt, option, multi, position, known_dimensions, positions, issues);
            }
        }
        PromptKindFile::FreeText { weights } => {
            if !weights.is_empty() {
                issues.push(CatalogIssue::FreeTextWeights {
                    prompt: prompt.id.clone(),
                });
            }
        }
        PromptKindFile::Scale {
            min,
            max,
            weights,
            jumps,
        } => {
            if min > max || *max == 0 {
                issues.push(CatalogIssue::InvalidScale {
                    prompt: prompt.id.clone(),
                    min: *min,
                    max: *max,
                });
            }
            if let NormalizationMode::WeightedAverage { max_answer_value } = file.scoring {
                if *max > max_answer_value {
                    issues.push(CatalogIssue::ScaleExceedsMaximum {
                        prompt: prompt.id.clone(),
                        max: *max,
                        limit: max_answer_value,
                    });
                }
            }
            check_weights(&prompt.id, weights, known_dimensions, issues);
            for jump in jumps {
                if !(*min..=*max).contains(&jump.value) {
                    issues.push(CatalogIssue::JumpValueOutOfRange {
                        prompt: prompt.id.clone(),
                        value: jump.value,
                    });
                }
                check_jump(&prompt.id, &jump.target, position, positions, issues);
            }
        }
    }
}

fn check_choice(
    prompt: &PromptFile,
    option: &ChoiceFile,
    multi: bool,
    position: usize,
    known_dimensions: &BTreeSet<DimensionId>,
    positions: &BTreeMap<&PromptId, usize>,
    issues: &mut Vec<CatalogIssue>,
) {
    check_weights(&prompt.id, &option.weights, known_dimensions, issues);
    if let Some(multiplier) = option.multiplier {
        check_multiplier(&prompt.id, multiplier, issues);
    }
    if let Some(target) = &option.on_select {
        if multi {
            issues.push(CatalogIssue::JumpInMultiChoice {
                prompt: prompt.id.clone(),
                choice: option.id.clone(),
            });
        } else {
            check_jump(&prompt.id, target, position, positions, issues);
        }
    }
}

fn check_weights(
    prompt: &PromptId,
    weights: &BTreeMap<DimensionId, f64>,
    known_dimensions: &BTreeSet<DimensionId>,
    issues: &mut Vec<CatalogIssue>,
) {
    for (dimension, value) in weights {
        if !known_dimensions.contains(dimension) {
            issues.push(CatalogIssue::UnknownDimension {
                prompt: prompt.clone(),
                dimension: dimension.clone(),
            });
        }
        if !value.is_finite() || *value < 0.0 {
            issues.push(CatalogIssue::InvalidWeight {
                prompt: prompt.clone(),
                dimension: dimension.clone(),
                value: *value,
            });
        }
    }
}

fn check_multiplier(prompt: &PromptId, value: f64, issues: &mut Vec<CatalogIssue>) {
    if !value.is_finite() || value <= 0.0 {
        issues.push(CatalogIssue::InvalidMultiplier {
            prompt: prompt.clone(),
            value,
        });
    }
}

fn check_jump(
    prompt: &PromptId,
    target: &JumpTarget,
    position: usize,
    positions: &BTreeMap<&PromptId, usize>,
    issues: &mut Vec<CatalogIssue>,
) {
    let JumpTarget::NextPrompt(target) = target else {
        return;
    };
    match positions.get(target) {
        None => issues.push(CatalogIssue::UnknownJumpTarget {
            prompt: prompt.clone(),
            target: target.clone(),
        }),
        Some(target_position) if *target_position <= position => {
            issues.push(CatalogIssue::BackwardJump {
                prompt: prompt.clone(),
                target: target.clone(),
            })
        }
        Some(_) => {}
    }
}
