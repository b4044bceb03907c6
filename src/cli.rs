use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::extract::{HouseNumberMode, RecoveryCategory};

#[derive(Parser, Debug)]
#[command(
    name = "voterroll",
    version,
    about = "Electoral roll page parsing and recovery reconciliation"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Parse(ParseArgs),
    Prompt(PromptArgs),
    Merge(MergeArgs),
    Reconcile(ReconcileArgs),
    Export(ExportArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ParseArgs {
    #[arg(long, default_value = ".cache/voterroll")]
    pub cache_root: PathBuf,

    #[arg(long = "input")]
    pub inputs: Vec<PathBuf>,

    #[arg(long)]
    pub input_dir: Option<PathBuf>,

    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = HouseNumberMode::Full)]
    pub house_number_mode: HouseNumberMode,
}

#[derive(Args, Debug, Clone)]
pub struct PromptArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long, value_enum)]
    pub category: RecoveryCategory,

    #[arg(long = "candidate-id")]
    pub candidate_ids: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct MergeArgs {
    #[arg(long)]
    pub parsed: PathBuf,

    #[arg(long)]
    pub page: String,

    #[arg(long, value_enum)]
    pub category: RecoveryCategory,

    #[arg(long)]
    pub response: PathBuf,

    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Ignore the page's current candidates and accept every serial in the
    /// response.
    #[arg(long, default_value_t = false)]
    pub all_serials: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ReconcileArgs {
    #[arg(long)]
    pub parsed: PathBuf,

    /// A second parse of the same pages whose values fill gaps in `--parsed`.
    #[arg(long)]
    pub with: PathBuf,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    #[arg(long, default_value = ".cache/voterroll")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub parsed: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".cache/voterroll")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,
}
