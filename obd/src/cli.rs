use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Command line interface for obd
#[derive(Parser, Debug)]
#[command(author, version, about = "OBD: Open Bible Data page renderer")]
pub struct Cli {
  /// Subcommand to execute (see [`Commands`])
  #[command(subcommand)]
  pub command: Commands,

  /// Enable verbose debug logging
  #[arg(short, long)]
  pub verbose: bool,

  /// Path to configuration file(s) (TOML or JSON, can be specified multiple
  /// times) Multiple files are merged in order, with later files overriding
  /// earlier ones
  #[arg(short = 'c', long = "config-file", action = clap::ArgAction::Append)]
  pub config_files: Vec<PathBuf>,

  /// Override configuration values (KEY=VALUE format, can be used multiple
  /// times)
  #[arg(long = "config", action = clap::ArgAction::Append)]
  pub config_overrides: Vec<String>,
}

/// All supported subcommands for the obd CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
  /// Render unit JSON files into html pages.
  Render {
    /// A unit JSON file, or a directory searched recursively for them.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output directory for rendered pages.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of threads to use for parallel rendering.
    #[arg(short = 'p', long = "jobs")]
    jobs: Option<usize>,
  },

  /// Resolve a free-text scripture reference and print its link.
  Resolve {
    /// The reference, e.g. "1 Sam 16:1–1 Ki 2:11".
    reference: String,

    /// Book the reference appears in, used when it names none.
    #[arg(short, long, default_value = "GEN")]
    book: String,

    /// Version whose abbreviations and pages are used.
    #[arg(short = 'V', long, default_value = "BSB")]
    version: String,

    /// Kind of page the link points at.
    #[arg(
      short,
      long,
      default_value = "chapter",
      value_parser = ["book", "chapter", "verse", "section"]
    )]
    mode: String,

    /// Directory depth of the page the link would appear on.
    #[arg(short, long, default_value_t = 0)]
    level: usize,
  },

  /// Load and validate the word substitution tables.
  CheckTables,

  /// Initialize a new obd configuration file
  Init {
    /// Path to create the configuration file at
    #[arg(short, long, default_value = "obd.toml")]
    output: PathBuf,

    /// Format of the configuration file.
    #[arg(
      short = 'F',
      long,
      default_value = "toml",
      value_parser = ["toml", "json"]
    )]
    format: String,

    /// Force overwrite if file already exists
    #[arg(short, long)]
    force: bool,
  },
}

impl Cli {
  /// Parse command line arguments into a [`Cli`] struct.
  #[must_use]
  pub fn parse_args() -> Self {
    Self::parse()
  }
}
