use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bookforged")]
#[command(author, version, about = "Split long audiobooks into player-friendly parts")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command that writes parts.
#[derive(Args, Debug, Clone, Default)]
pub struct SplitOptions {
    /// Output directory for finished parts
    #[arg(short, long, env = "OUTPUT_FOLDER")]
    pub output: Option<PathBuf>,

    /// Maximum part length in hours
    #[arg(long, env = "SPLIT_LIMIT_HRS")]
    pub split_hours: Option<f64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sync the Libation library and split every long book
    Run {
        #[command(flatten)]
        split: SplitOptions,

        /// Skip the Libation scan and liberate steps
        #[arg(long)]
        skip_sync: bool,

        /// Use an existing catalog export instead of exporting one
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Directory holding the downloaded .m4b files
        #[arg(long)]
        books_dir: Option<PathBuf>,

        /// Only process books whose author contains this text
        #[arg(long, env = "FILTER_BY_AUTHOR")]
        author: Option<String>,

        /// Path to the LibationCli executable
        #[arg(long, env = "LIBATION_EXE")]
        libation: Option<PathBuf>,

        /// Keep the exported catalog JSON after the run
        #[arg(long, env = "BOOKFORGED_KEEP_EXPORT")]
        keep_export: bool,
    },

    /// Split a single audiobook file
    Split {
        /// Audiobook file to split
        #[arg(required = true)]
        file: PathBuf,

        #[command(flatten)]
        split: SplitOptions,

        /// Title used for output names (defaults to the file stem)
        #[arg(long)]
        title: Option<String>,

        /// Author written into part metadata
        #[arg(long)]
        author: Option<String>,
    },

    /// Show how a file would be split without writing anything
    Plan {
        /// Audiobook file to plan
        #[arg(required = true)]
        file: PathBuf,

        /// Maximum part length in hours
        #[arg(long, env = "SPLIT_LIMIT_HRS")]
        split_hours: Option<f64>,
    },

    /// Probe an audio file and display duration and chapters
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn split_flags_flatten_into_run() {
        let cli = Cli::try_parse_from([
            "bookforged",
            "run",
            "--skip-sync",
            "--split-hours",
            "8",
            "-o",
            "/tmp/out",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                split, skip_sync, ..
            } => {
                assert!(skip_sync);
                assert_eq!(split.split_hours, Some(8.0));
                assert_eq!(split.output, Some(PathBuf::from("/tmp/out")));
            }
            _ => panic!("expected run"),
        }
    }
}
