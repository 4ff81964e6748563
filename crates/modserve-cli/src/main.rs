#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;

use clap::Parser;
use miette::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "modserve")]
#[command(author, version, about = "Rewrite ES module imports for unbundled dev serving", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Rewrite the imports of a module as the dev server would serve it
    Rewrite {
        /// Module file to rewrite
        file: PathBuf,

        /// Public URL of the module (defaults to its path under the root)
        #[arg(long)]
        url: Option<String>,

        /// JSON config file (root, base, mode, client_path, env, resolve_concurrency)
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Print a JSON summary instead of the rewritten code
        #[arg(long)]
        summary: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    logging::init(cli.verbose, cli.json);

    match cli.command {
        Some(Commands::Version) | None => commands::version::run(),
        Some(Commands::Rewrite {
            file,
            url,
            config,
            summary,
        }) => {
            let span = tracing::info_span!("rewrite", cmd = "rewrite", cwd = %cwd.display());
            let _guard = span.enter();
            commands::rewrite::run(&commands::rewrite::RewriteArgs {
                cwd: &cwd,
                file: &file,
                url: url.as_deref(),
                config: config.as_deref(),
                summary: summary || cli.json,
            })
        }
    }
}
