mod runner;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{info, warn};
use serde::Deserialize;

use crate::cancel;
use crate::catalog::{load_catalog, CatalogError};
use crate::cli::{Command, CompareArgs, ResultArgs, ScoreArgs, ShowArgs, TakeArgs, ValidateArgs};
use crate::config::Config;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::input::{InputError, Prompter};
use crate::report::{format_comparison, format_result};
use crate::result::AssessmentResult;
use crate::session::{AnswerRecord, SessionId};
use crate::store::{
    compare_results, list_results, load_result, save_result, SessionSnapshot, SessionStore,
    StoreError,
};

pub use runner::{Outcome, RunError, SessionRunner};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Run(#[from] RunError),
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{0}")]
    User(String),
}

/// Answer log accepted by `score`: bare records or a saved session.
#[derive(Deserialize)]
#[serde(untagged)]
enum AnswerLog {
    Records(Vec<AnswerRecord>),
    Snapshot(SessionSnapshot),
}

pub struct App<S: SessionStore, P: Prompter> {
    engine: Engine,
    config: Config,
    sessions: S,
    prompter: P,
}

impl<S: SessionStore, P: Prompter> App<S, P> {
    pub fn new(engine: Engine, config: Config, sessions: S, prompter: P) -> Self {
        Self {
            engine,
            config,
            sessions,
            prompter,
        }
    }

    pub fn run(&mut self, command: Command) -> Result<(), AppError> {
        match command {
            Command::Catalogs => self.handle_catalogs(),
            Command::Validate(args) => self.handle_validate(args),
            Command::Take(args) => self.handle_take(args),
            Command::Score(args) => self.handle_score(args),
            Command::Show(args) => self.handle_show(args),
            Command::Compare(args) => self.handle_compare(args),
            Command::Status => self.handle_status(),
        }
    }

    fn handle_catalogs(&self) -> Result<(), AppError> {
        let library = self.engine.library();
        if library.is_empty() {
            info!("No catalogs available.");
            return Ok(());
        }

        let width = library.iter().map(|c| c.id.len()).max().unwrap_or(0);
        for catalog in library.iter() {
            let sources: Vec<String> = catalog.sources().iter().map(|s| s.to_string()).collect();
            println!(
                "{:<width$}  {:>2} prompts  {:>2} dimensions  {:<28} [{}]  {}",
                catalog.id,
                catalog.len(),
                catalog.dimensions.len(),
                catalog.normalization.to_string(),
                sources.join(", "),
                catalog.title,
                width = width
            );
        }
        Ok(())
    }

    fn handle_validate(&self, args: ValidateArgs) -> Result<(), AppError> {
        let mut failed = 0;
        for path in &args.files {
            match load_catalog(path) {
                Ok(catalog) => println!(
                    "ok    {}: '{}' ({} prompts, {} dimensions)",
                    path.display(),
                    catalog.id,
                    catalog.len(),
                    catalog.dimensions.len()
                ),
                Err(CatalogError::Engine(EngineError::InvalidCatalog { catalog, issues })) => {
                    failed += 1;
                    println!(
                        "error {}: catalog '{}' has {} issue(s)",
                        path.display(),
                        catalog,
                        issues.len()
                    );
                    for issue in issues {
                        println!("      - {}", issue);
                    }
                }
                Err(e) => {
                    failed += 1;
                    println!("error {}: {}", path.display(), e);
                }
            }
        }

        if failed > 0 {
            return Err(AppError::User(format!(
                "{} of {} catalog file(s) failed validation",
                failed,
                args.files.len()
            )));
        }
        Ok(())
    }

    fn handle_take(&mut self, args: TakeArgs) -> Result<(), AppError> {
        let engine = self
            .engine
            .clone()
            .with_primary_source(args.output.primary_source);

        let (session, started_at) = if args.resume {
            let snapshot = self.sessions.load(&args.catalog)?;
            info!(
                "Resuming session {} ({} prompt(s) already answered)",
                snapshot.session_id,
                snapshot.answers.len()
            );
            let session =
                engine.resume(&args.catalog, snapshot.session_id.clone(), &snapshot.answers)?;
            (session, snapshot.started_at)
        } else {
            if self.sessions.exists(&args.catalog) {
                warn!(
                    "An interrupted session of '{}' exists and will be replaced. Use --resume to continue it.",
                    args.catalog
                );
            }
            let started_at = Utc::now();
            let id = SessionId::new(format!(
                "{}-{}",
                args.catalog,
                started_at.format("%Y%m%d%H%M%S")
            ));
            (engine.start(&args.catalog, id)?, started_at)
        };

        let catalog = session.catalog().clone();
        info!("{} ({} prompts)", catalog.title, catalog.len());
        if !catalog.description.is_empty() {
            info!("{}", catalog.description);
        }
        info!("Enter q to stop and continue later.");

        cancel::reset();
        cancel::register_handler();

        let outcome = SessionRunner::new(&mut self.prompter, &self.sessions).run(session, started_at)?;
        match outcome {
            Outcome::Completed(session) => {
                let result = engine.finish(&session).map_err(|e| {
                    warn!(
                        "Answers for '{}' were kept; score them later with 'career-compass score'.",
                        args.catalog
                    );
                    e
                })?;
                self.sessions.delete(&args.catalog)?;
                self.emit(&result, &args.output)
            }
            Outcome::Saved(path) => {
                info!(
                    "Progress saved to {}. Continue with 'career-compass take {} --resume'.",
                    path.display(),
                    args.catalog
                );
                Ok(())
            }
        }
    }

    fn handle_score(&self, args: ScoreArgs) -> Result<(), AppError> {
        let json = fs::read_to_string(&args.answers).map_err(|source| AppError::Io {
            path: args.answers.clone(),
            source,
        })?;
        let records = match serde_json::from_str::<AnswerLog>(&json) {
            Ok(AnswerLog::Records(records)) => records,
            Ok(AnswerLog::Snapshot(snapshot)) => {
                if snapshot.catalog_id != args.catalog {
                    warn!(
                        "Answer log was recorded for '{}', scoring it against '{}'",
                        snapshot.catalog_id, args.catalog
                    );
                }
                snapshot.answers
            }
            Err(e) => {
                return Err(AppError::User(format!(
                    "{} is not an answer log: {}",
                    args.answers.display(),
                    e
                )))
            }
        };

        let result = self
            .engine
            .clone()
            .with_primary_source(args.output.primary_source)
            .evaluate(&args.catalog, &records)?;
        self.emit(&result, &args.output)
    }

    fn handle_show(&self, args: ShowArgs) -> Result<(), AppError> {
        let saved = load_result(&args.result)?;
        info!("Saved {}", saved.saved_at.format("%Y-%m-%d %H:%M:%S UTC"));
        println!("{}", format_result(&saved.result, args.format, args.full));
        Ok(())
    }

    fn handle_compare(&self, args: CompareArgs) -> Result<(), AppError> {
        let before = load_result(&args.before)?;
        let after = load_result(&args.after)?;
        if before.result.catalog_id != after.result.catalog_id {
            return Err(AppError::User(format!(
                "Cannot compare results of different catalogs ('{}' and '{}')",
                before.result.catalog_id, after.result.catalog_id
            )));
        }

        let comparison = compare_results(&before.result, &after.result);
        println!("{}", format_comparison(&comparison, args.format));
        Ok(())
    }

    fn handle_status(&self) -> Result<(), AppError> {
        let sessions = self.sessions.list()?;
        if sessions.is_empty() {
            println!("No interrupted sessions.");
        } else {
            println!("Interrupted sessions:");
            for snapshot in &sessions {
                let total = self
                    .engine
                    .library()
                    .get(&snapshot.catalog_id)
                    .map(|c| c.len().to_string())
                    .unwrap_or_else(|_| "?".to_string());
                println!(
                    "  {}  {}/{} answered, started {}",
                    snapshot.catalog_id,
                    snapshot.answers.len(),
                    total,
                    snapshot.started_at.format("%Y-%m-%d %H:%M")
                );
            }
        }

        let results = list_results(&self.config.results_dir)?;
        if results.is_empty() {
            println!("No saved results in {}.", self.config.results_dir.display());
        } else {
            println!("Saved results:");
            for path in &results {
                match load_result(path) {
                    Ok(saved) => println!(
                        "  {}  {} -> {} ({:.1})",
                        path.display(),
                        saved.result.catalog_id,
                        saved.result.recommended.label,
                        saved.result.recommended.score
                    ),
                    Err(e) => warn!("Unreadable result {}: {}", path.display(), e),
                }
            }
        }
        Ok(())
    }

    fn emit(&self, result: &AssessmentResult, output: &ResultArgs) -> Result<(), AppError> {
        println!("{}", format_result(result, output.format, output.full));
        if let Some(path) = &output.save {
            let saved = save_result(result, &self.config.results_dir, path.as_deref())?;
            info!("Result saved to {}", saved.display());
        }
        Ok(())
    }

    pub fn results_dir(&self) -> &Path {
        &self.config.results_dir
    }
}
