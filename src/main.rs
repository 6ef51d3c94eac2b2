use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use casecov::cli::{self, ReportArgs, Style};
use casecov::mangle::ManglingScheme;

/// casecov: pragmatic branch coverage from case-tree dumps and runtime profiles.
#[derive(Parser)]
#[command(name = "casecov", version, about)]
struct Cli {
    /// Log debug details (RUST_LOG overrides this).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify the branches of a case-tree dump without any runtime data.
    Analyze {
        /// Path to the case-tree dump.
        #[arg(long)]
        dump: PathBuf,
    },

    /// Compute branch coverage across one or more test runs.
    Report {
        /// Path to the case-tree dump.
        #[arg(long)]
        dump: PathBuf,

        /// A test run directory holding the profiler output, as NAME=DIR or
        /// DIR. Repeat for every run; hits are OR-merged.
        #[arg(long = "run", required = true)]
        runs: Vec<String>,

        /// Output style.
        #[arg(long, value_enum, default_value = "text")]
        style: Style,

        /// Hide compiler-generated functions matching this name from the
        /// targets (a trailing `*` matches a prefix). Repeatable.
        #[arg(long)]
        exclude: Vec<String>,

        /// JSON config file with exclusions and the mangling scheme.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Identifier mangling scheme; overrides the config file.
        #[arg(long, value_enum)]
        mangling: Option<ManglingScheme>,
    },

    /// Print the runtime identifier of each fully-qualified name.
    Mangle {
        /// Fully-qualified names.
        #[arg(required = true)]
        names: Vec<String>,

        /// Identifier mangling scheme.
        #[arg(long, value_enum, default_value = "uniform")]
        mangling: ManglingScheme,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let output = match cli.command {
        Commands::Analyze { dump } => cli::cmd_analyze(&dump)?,
        Commands::Report {
            dump,
            runs,
            style,
            exclude,
            config,
            mangling,
        } => cli::cmd_report(&ReportArgs {
            dump,
            runs,
            style,
            exclude,
            config,
            mangling,
        })?,
        Commands::Mangle { names, mangling } => cli::cmd_mangle(&names, mangling)?,
    };

    print!("{output}");
    Ok(())
}
