//! conftree cli interface

use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Change the work directory
    ///
    /// Can be specified multiple times. Note that all
    /// paths on the way to the final path must exist.
    ///
    /// This is equivalent to running { cd <directory>; conftree ... }
    #[clap(short = 'C', long = "directory", global(true))]
    pub directory: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse configuration files, resolve includes and print the flattened
    /// tree
    ///
    /// Reads a single document from stdin unless files are provided (via
    /// --input-file)
    Print(PrintCommand),

    /// Query the flattened tree with a path of names
    #[command(alias = "q")]
    Query(QueryCommand),

    /// Print debug information for development
    Dev(DevCommand),
}

#[derive(Parser, Debug)]
pub struct PrintCommand {
    #[clap(flatten)]
    pub input: InputArgs,

    #[clap(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser, Debug)]
pub struct QueryCommand {
    #[clap(flatten)]
    pub input: InputArgs,

    /// Match the first name at any depth
    #[clap(long)]
    pub deep: bool,

    /// Print only the first match
    #[clap(long, conflicts_with("last"))]
    pub first: bool,

    /// Print only the last match
    #[clap(long)]
    pub last: bool,

    /// Path of section/directive names, outermost first
    #[clap(required = true)]
    pub path: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct InputArgs {
    /// Grammar the files are written in
    #[clap(short = 'g', long, value_enum)]
    pub grammar: Grammar,

    /// Load a file; the complete file set of one logical configuration
    /// should be passed, includes resolve against exactly these files
    #[clap(short = 'f', long = "input-file")]
    pub files: Vec<PathBuf>,

    /// Base name of the main file include resolution starts from
    /// (default depends on the grammar, e.g. httpd.conf)
    #[clap(short = 'm', long = "main")]
    pub main: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Grammar {
    Httpd,
    Nginx,
    Multipath,
    Logrotate,
}

#[derive(Parser, Debug)]
pub struct OutputArgs {
    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum OutputFormat {
    #[default]
    Tree,
    Json,
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Tree => f.write_str("tree"),
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}

#[derive(Parser, Debug)]
pub struct DevCommand {
    #[clap(flatten)]
    pub input: InputArgs,

    #[command(subcommand)]
    pub command: DevSubCommand,
}

#[derive(Subcommand, Debug)]
pub enum DevSubCommand {
    /// Dump every per-file tree before combination
    Documents,
    /// Dump the combined tree
    Combined,
}
