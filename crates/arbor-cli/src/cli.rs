use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "arbor",
    about = "Arbor: inspect, convert and verify hierarchical object databases",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML schema declaring the enums and types stored in the files
    #[arg(long, global = true)]
    pub schema: Option<PathBuf>,

    /// TOML settings (pretty text, compression, disabled entities)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the folder tree of a database file
    Inspect(InspectArgs),
    /// Rewrite a database in the backend given by the output extension
    Convert(ConvertArgs),
    /// Compare the stored structural checksum with a recomputed one
    Checksum(ChecksumArgs),
    /// Load database files and report diagnostics and staleness
    Verify(VerifyArgs),
    /// Line diff of two databases in canonical text form
    Diff(DiffArgs),
}

#[derive(Args)]
pub struct InspectArgs {
    pub file: PathBuf,
    /// Also list entities under each folder
    #[arg(short, long)]
    pub entities: bool,
}

#[derive(Args)]
pub struct ConvertArgs {
    pub input: PathBuf,
    pub output: PathBuf,
}

#[derive(Args)]
pub struct ChecksumArgs {
    pub file: PathBuf,
}

#[derive(Args)]
pub struct VerifyArgs {
    /// A database file, or a directory searched for `.json` and `.bin` files
    pub path: PathBuf,
}

#[derive(Args)]
pub struct DiffArgs {
    pub old: PathBuf,
    pub new: PathBuf,
    /// Lines of context around each change
    #[arg(short = 'U', long, default_value = "3")]
    pub context: usize,
}
