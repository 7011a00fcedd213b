#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use output::{CliError, OutputMode};
use refscope_core::config;
use refscope_core::error::ErrorCode;
use std::env;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "refscope: inspect what an entity depends on and what references it",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format. Overrides `--json`, `FORMAT` and config files.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// The format requested by flags, if any.
    fn flag_format(&self) -> Option<&'static str> {
        output::flag_format(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Read",
        about = "Show what targets depend on",
        long_about = "Scan each target into one session and print the reduced dependency tree.",
        after_help = "EXAMPLES:\n    # Inspect one entity\n    refscope inspect facts.toml Player\n\n    # Limit the tree depth\n    refscope inspect facts.toml Scene --depth 2\n\n    # Emit machine-readable output\n    refscope inspect facts.toml Player --json"
    )]
    Inspect(cmd::inspect::InspectArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show what references a target",
        long_about = "Scan from every scan root and list the entities referencing the target.",
        after_help = "EXAMPLES:\n    # Use the scan roots declared in the facts file\n    refscope references facts.toml Mesh\n\n    # Pick scan roots explicitly\n    refscope references facts.toml Mesh --scan-root Level1 --scan-root Level2"
    )]
    References(cmd::references::ReferencesArgs),

    #[command(
        next_help_heading = "Interoperability",
        about = "Export the accumulated graph",
        long_about = "Export the reduced graph of one or more targets as JSON or Graphviz DOT.",
        after_help = "EXAMPLES:\n    # JSON to stdout\n    refscope export facts.toml Scene\n\n    # DOT to a file\n    refscope export facts.toml Scene --dot --output scene.dot"
    )]
    Export(cmd::export::ExportArgs),

    #[command(
        next_help_heading = "Project Maintenance",
        about = "Generate shell completion scripts",
        long_about = "Generate shell completion scripts for supported shells.",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    refscope completions bash\n\n    # Generate zsh completions\n    refscope completions zsh"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("REFSCOPE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "refscope=debug,info"
        } else {
            "refscope=info,warn"
        })
    });

    let format = env::var("REFSCOPE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so stdout stays parseable.
    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_writer(std::io::stderr).with_ansi(false))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let project_root = env::current_dir()?;
    let config = match config::resolve_config(&project_root, cli.flag_format()) {
        Ok(config) => config,
        Err(err) => {
            let fallback = cli.format.unwrap_or(if cli.json { OutputMode::Json } else { OutputMode::Text });
            output::render_error(
                fallback,
                &CliError::coded(format!("{err:#}"), ErrorCode::ConfigParseError),
            )?;
            anyhow::bail!("{err:#}");
        }
    };
    let output = OutputMode::from_name(&config.resolved_output).unwrap_or(OutputMode::Text);
    debug!(output = output.as_str(), "output mode resolved");

    match cli.command {
        Commands::Inspect(ref args) => cmd::inspect::run_inspect(args, &config, output, &project_root),
        Commands::References(ref args) => {
            cmd::references::run_references(args, &config, output, &project_root)
        }
        Commands::Export(ref args) => cmd::export::run_export(args, &config, output, &project_root),
        Commands::Completions(args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}
