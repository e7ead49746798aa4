use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::models::ScoreSource;
use crate::report::OutputFormat;

/// Command line interface definition for career-compass.
#[derive(Parser, Debug)]
#[command(name = "career-compass")]
#[command(about = "Take career assessments and get ranked, explained recommendations")]
#[command(version)]
pub struct Cli {
    /// Increase log output (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbosity: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbosity")]
    pub quiet: bool,

    /// Directory of additional catalog JSON files
    #[arg(long, global = true, value_name = "DIR")]
    pub catalog_dir: Option<PathBuf>,

    /// Where saved results are written
    #[arg(long, global = true, value_name = "DIR")]
    pub results_dir: Option<PathBuf>,

    /// Where interrupted sessions are kept
    #[arg(long, global = true, value_name = "DIR")]
    pub session_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List the available catalogs
    Catalogs,
    /// Check catalog files for authoring errors
    Validate(ValidateArgs),
    /// Take an assessment interactively
    Take(TakeArgs),
    /// Score a recorded answer log without prompting
    Score(ScoreArgs),
    /// Display a saved result
    Show(ShowArgs),
    /// Compare two saved results of the same catalog
    Compare(CompareArgs),
    /// List interrupted sessions and saved results
    Status,
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Catalog files to check
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,
}

/// Options shared by the commands that produce a result.
#[derive(Args, Debug, Clone)]
pub struct ResultArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty")]
    pub format: OutputFormat,

    /// Save the result (optionally to PATH instead of the results directory)
    #[arg(long, value_name = "PATH", num_args = 0..=1)]
    pub save: Option<Option<PathBuf>>,

    /// Rank by this score source instead of the catalog's primary one
    #[arg(long, value_name = "SOURCE")]
    pub primary_source: Option<ScoreSource>,

    /// List every dimension instead of the top matches
    #[arg(long)]
    pub full: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TakeArgs {
    /// Catalog id (see `career-compass catalogs`)
    pub catalog: String,

    /// Continue the interrupted session of this catalog
    #[arg(long)]
    pub resume: bool,

    /// Answer free-text prompts in $EDITOR
    #[arg(long)]
    pub editor: bool,

    #[command(flatten)]
    pub output: ResultArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ScoreArgs {
    /// Catalog id
    pub catalog: String,

    /// JSON answer log: a list of {"prompt_id", "answer"} records or a saved session
    #[arg(short, long, value_name = "FILE")]
    pub answers: PathBuf,

    #[command(flatten)]
    pub output: ResultArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Saved result file
    pub result: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty")]
    pub format: OutputFormat,

    /// List every dimension instead of the top matches
    #[arg(long)]
    pub full: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CompareArgs {
    /// Earlier result file
    pub before: PathBuf,

    /// Later result file
    pub after: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty")]
    pub format: OutputFormat,
}
