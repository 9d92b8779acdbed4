use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ba2tk_cli::GlobalOptions;
use ba2tk_cli::commands::{self, ExtractFlags};

#[derive(Parser)]
#[command(
    name = "ba2tk",
    about = "Inspect and extract Bethesda BA2 archives",
    version,
    long_about = "A command-line tool for reading BA2 (BTDX) archives used by Fallout 4, Fallout 76 and Starfield: list their contents, extract files and verify payloads."
)]
struct Cli {
    /// Set the logging level (RUST_LOG takes precedence)
    #[arg(short, long, value_enum, global = true, default_value = "info")]
    log_level: LogLevel,

    /// Extract through bounded blocks instead of whole buffers
    #[arg(long, global = true, env = "BA2TK_STREAMED")]
    streamed: bool,

    /// Accept unknown versions, bad sentinels and duplicate names with a warning
    #[arg(long, global = true, env = "BA2TK_LAX")]
    lax: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show header fields and entry totals
    Info {
        /// Archive to inspect
        archive: PathBuf,
    },

    /// List entries in record order
    List {
        /// Archive to list
        archive: PathBuf,

        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Extract every entry into a directory
    Extract {
        /// Archive to extract
        archive: PathBuf,

        /// Destination directory
        dest: PathBuf,

        /// Skip files that already exist
        #[arg(long)]
        no_overwrite: bool,

        /// Abort on the first entry that fails
        #[arg(long)]
        stop_on_error: bool,

        /// Write textures without a DDS header
        #[arg(long)]
        raw_textures: bool,
    },

    /// Check entry hashes and decode every payload
    Verify {
        /// Archive to verify
        archive: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let global = GlobalOptions {
        streamed: cli.streamed,
        lax: cli.lax,
    };
    let mut out = io::stdout().lock();

    match cli.command {
        Commands::Info { archive } => commands::info(&archive, global, &mut out),
        Commands::List { archive, json } => commands::list(&archive, global, json, &mut out),
        Commands::Extract {
            archive,
            dest,
            no_overwrite,
            stop_on_error,
            raw_textures,
        } => commands::extract(
            &archive,
            &dest,
            global,
            ExtractFlags {
                no_overwrite,
                stop_on_error,
                raw_textures,
            },
            &mut out,
        ),
        Commands::Verify { archive } => commands::verify(&archive, global, &mut out),
    }
}
