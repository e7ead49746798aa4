//! Catalog authoring format, compilation and the catalog library.
//!
//! Catalogs are authored as JSON ([`CatalogFile`]), checked by the
//! validation pass in [`validation`] and compiled into the index-based
//! [`Catalog`] the engine runs on. Nothing downstream ever sees a raw file.

mod builtin;
pub mod validation;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::models::{
    Catalog, Choice, ChoiceId, Dimension, DimensionId, DimensionRegistry, Jump,
    NormalizationMode, Prompt, PromptId, PromptKind, ScaleSpec, ScoreSource, Weight,
};

pub use builtin::builtin_catalog_sources;
pub use validation::{CatalogIssue, ValidationResult};

const DEFAULT_CLASSIFICATION_K: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Declarative jump rule: `{"next_prompt": "p7"}` or `"complete"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JumpTarget {
    NextPrompt(PromptId),
    Complete,
}

/// A catalog as authored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFile {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub scoring: NormalizationMode,
    #[serde(default)]
    pub primary_source: ScoreSource,
    #[serde(default = "default_classification_k")]
    pub classification_k: usize,
    pub dimensions: Vec<Dimension>,
    pub prompts: Vec<PromptFile>,
}

fn default_classification_k() -> usize {
    DEFAULT_CLASSIFICATION_K
}

fn default_multiplier() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptFile {
    pub id: PromptId,
    pub text: String,
    #[serde(flatten)]
    pub kind: PromptKindFile,
    #[serde(default)]
    pub optional: bool,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default)]
    pub source: ScoreSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PromptKindFile {
    SingleChoice {
        options: Vec<ChoiceFile>,
    },
    MultiChoice {
        options: Vec<ChoiceFile>,
    },
    FreeText {
        /// Always rejected when non-empty; kept so the validation pass can
        /// name the mistake instead of failing to parse.
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        weights: BTreeMap<DimensionId, f64>,
    },
    Scale {
        min: u32,
        max: u32,
        #[serde(default)]
        weights: BTreeMap<DimensionId, f64>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        jumps: Vec<ScaleJumpFile>,
    },
}

impl PromptKindFile {
    pub fn has_weights(&self) -> bool {
        match self {
            Self::SingleChoice { options } | Self::MultiChoice { options } => {
                options.iter().any(|o| !o.weights.is_empty())
            }
            Self::Scale { weights, .. } => !weights.is_empty(),
            Self::FreeText { .. } => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceFile {
    pub id: ChoiceId,
    pub label: String,
    #[serde(default)]
    pub weights: BTreeMap<DimensionId, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_select: Option<JumpTarget>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaleJumpFile {
    pub value: u32,
    pub target: JumpTarget,
}

pub fn parse_catalog_file(json: &str) -> Result<CatalogFile, CatalogError> {
    serde_json::from_str(json).map_err(|e| CatalogError::Json(e.to_string()))
}

/// Validate and compile an authored catalog.
///
/// Fails with `InvalidCatalog` listing every structural issue, or with
/// `DimensionNotCovered` when a weighted-average dimension has no scale
/// prompt feeding it.
pub fn compile(file: CatalogFile) -> Result<Catalog, EngineError> {
    let result = validation::validate(&file);
    if !result.is_valid() {
        return Err(EngineError::InvalidCatalog {
            catalog: file.id,
            issues: result.issues,
        });
    }
    if let Some(dimension) = validation::uncovered_dimensions(&file).into_iter().next() {
        return Err(EngineError::DimensionNotCovered { dimension });
    }

    let dimensions = DimensionRegistry::new(file.dimensions);
    let positions: BTreeMap<PromptId, usize> = file
        .prompts
        .iter()
        .enumerate()
        .map(|(i, p)| (p.id.clone(), i))
        .collect();

    let mut prompts = Vec::with_capacity(file.prompts.len());
    for (ordinal, prompt) in file.prompts.into_iter().enumerate() {
        let kind = compile_kind(&file.id, &prompt.id, prompt.kind, &dimensions, &positions)?;
        prompts.push(Prompt {
            id: prompt.id,
            ordinal,
            text: prompt.text,
            kind,
            optional: prompt.optional,
            multiplier: prompt.multiplier,
            source: prompt.source,
            category: prompt.category,
            phase: prompt.phase,
            speaker: prompt.speaker,
        });
    }

    debug!(
        "Compiled catalog '{}': {} dimensions, {} prompts",
        file.id,
        dimensions.len(),
        prompts.len()
    );

    Ok(Catalog {
        id: file.id,
        title: file.title,
        description: file.description,
        normalization: file.scoring,
        primary_source: file.primary_source,
        classification_k: file.classification_k,
        dimensions,
        prompts,
    })
}

fn compile_kind(
    catalog: &str,
    prompt: &PromptId,
    kind: PromptKindFile,
    dimensions: &DimensionRegistry,
    positions: &BTreeMap<PromptId, usize>,
) -> Result<PromptKind, EngineError> {
    let compile_choices = |options: Vec<ChoiceFile>| -> Result<Vec<Choice>, EngineError> {
        options
            .into_iter()
            .map(|option| -> Result<Choice, EngineError> {
                Ok(Choice {
                    weights: compile_weights(catalog, prompt, &option.weights, dimensions)?,
                    on_select: option
                        .on_select
                        .as_ref()
                        .map(|t| compile_jump(catalog, prompt, t, positions))
                        .transpose()?,
                    id: option.id,
                    label: option.label,
                    multiplier: option.multiplier,
                })
            })
            .collect()
    };

    Ok(match kind {
        PromptKindFile::SingleChoice { options } => PromptKind::SingleChoice {
            choices: compile_choices(options)?,
        },
        PromptKindFile::MultiChoice { options } => PromptKind::MultiChoice {
            choices: compile_choices(options)?,
        },
        PromptKindFile::FreeText { .. } => PromptKind::FreeText,
        PromptKindFile::Scale {
            min,
            max,
            weights,
            jumps,
        } => PromptKind::Scale(ScaleSpec {
            min,
            max,
            weights: compile_weights(catalog, prompt, &weights, dimensions)?,
            jumps: jumps
                .iter()
                .map(|j| compile_jump(catalog, prompt, &j.target, positions).map(|t| (j.value, t)))
                .collect::<Result<Vec<_>, EngineError>>()?,
        }),
    })
}

/// Resolve dimension ids to registry indices, ordered by authoring order.
fn compile_weights(
    catalog: &str,
    prompt: &PromptId,
    weights: &BTreeMap<DimensionId, f64>,
    dimensions: &DimensionRegistry,
) -> Result<Vec<Weight>, EngineError> {
    let mut compiled = weights
        .iter()
        .map(|(id, value)| {
            dimensions
                .index_of(id)
                .map(|dimension| Weight {
                    dimension,
                    value: *value,
                })
                .ok_or_else(|| EngineError::InvalidCatalog {
                    catalog: catalog.to_string(),
                    issues: vec![CatalogIssue::UnknownDimension {
                        prompt: prompt.clone(),
                        dimension: id.clone(),
                    }],
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    compiled.sort_by_key(|w| w.dimension);
    Ok(compiled)
}

fn compile_jump(
    catalog: &str,
    prompt: &PromptId,
    target: &JumpTarget,
    positions: &BTreeMap<PromptId, usize>,
) -> Result<Jump, EngineError> {
    match target {
        JumpTarget::Complete => Ok(Jump::Complete),
        JumpTarget::NextPrompt(id) => {
            positions
                .get(id)
                .map(|i| Jump::To(*i))
                .ok_or_else(|| EngineError::InvalidCatalog {
                    catalog: catalog.to_string(),
                    issues: vec![CatalogIssue::UnknownJumpTarget {
                        prompt: prompt.clone(),
                        target: id.clone(),
                    }],
                })
        }
    }
}

/// Read, validate and compile one catalog file.
pub fn load_catalog(path: &Path) -> Result<Catalog, CatalogError> {
    let json = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(compile(parse_catalog_file(&json)?)?)
}

/// Validated catalogs, addressable by id.
#[derive(Debug, Clone, Default)]
pub struct CatalogLibrary {
    catalogs: BTreeMap<String, Arc<Catalog>>,
}

impl CatalogLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// The catalogs shipped with the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        let mut library = Self::new();
        for (name, json) in builtin_catalog_sources() {
            debug!("Loading built-in catalog {}", name);
            library.insert(compile(parse_catalog_file(json)?)?);
        }
        Ok(library)
    }

    /// Load every `*.json` file in `dir`, replacing catalogs with the same id.
    ///
    /// Unreadable files are skipped with a warning; a file that reads but
    /// fails validation is an authoring error and aborts the load.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, CatalogError> {
        let entries = fs::read_dir(dir).map_err(|source| CatalogError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut loaded = 0;
        for path in paths {
            match load_catalog(&path) {
                Ok(catalog) => {
                    if self.catalogs.contains_key(&catalog.id) {
                        warn!(
                            "Catalog '{}' from {} replaces an earlier definition",
                            catalog.id,
                            path.display()
                        );
                    }
                    self.insert(catalog);
                    loaded += 1;
                }
                Err(CatalogError::Io { path, source }) => {
                    warn!("Skipping unreadable catalog {}: {}", path.display(), source);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(loaded)
    }

    pub fn insert(&mut self, catalog: Catalog) {
        self.catalogs.insert(catalog.id.clone(), Arc::new(catalog));
    }

    pub fn get(&self, id: &str) -> Result<Arc<Catalog>, EngineError> {
        self.catalogs
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownCatalog(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Catalog>> {
        self.catalogs.values()
    }

    pub fn len(&self) -> usize {
        self.catalogs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalogs.is_empty()
    }
}
