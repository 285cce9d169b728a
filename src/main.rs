mod cli;
mod config;
mod logging;
mod responder;
mod workflow;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cli::commands;
use config::{Catalog, ObiConfig, Persona, PersonaTable};
use responder::ResponseGenerator;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "obi")]
#[command(about = "Obi - simulated Firefly Services creative automation assistant")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project directory (defaults to current)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Catalog file (overrides config and discovery)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Output mode: console, json, quiet
    #[arg(long, global = true, default_value = "console")]
    output: String,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Suppress normal output
    #[arg(long, global = true)]
    quiet: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Write logs to the default log directory
    #[arg(long, global = true, conflicts_with = "log_file")]
    log: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog workflows
    Workflows,

    /// Show which workflow a label selects
    Select {
        /// Free-text label, e.g. a quick action
        #[arg(trailing_var_arg = true)]
        label: Vec<String>,
    },

    /// Select a workflow by label and run it
    Run {
        /// Free-text label, e.g. a quick action
        #[arg(trailing_var_arg = true)]
        label: Vec<String>,

        /// Speed factor for simulated waits
        #[arg(long)]
        speed: Option<f64>,
    },

    /// Ask the assistant something
    Chat {
        /// Message text
        #[arg(trailing_var_arg = true)]
        message: Vec<String>,

        /// Persona (creative_director, campaign_manager, designer, developer)
        #[arg(long)]
        persona: Option<Persona>,

        /// Run the suggested workflow
        #[arg(long)]
        run: bool,
    },

    /// List personas and their quick actions
    Personas,

    /// Validate the catalog
    Validate,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Workflows => "workflows",
            Commands::Select { .. } => "select",
            Commands::Run { .. } => "run",
            Commands::Chat { .. } => "chat",
            Commands::Personas => "personas",
            Commands::Validate => "validate",
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_file = match (&cli.log_file, cli.log) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => Some(logging::default_log_path(cli.command.name())?),
        (None, false) => None,
    };
    let log_guard = logging::init_logging(cli.debug, cli.quiet, log_file.as_deref())?;

    let project_dir = cli.dir.as_deref();
    let mut config = ObiConfig::load(project_dir)?;

    let mode = if cli.quiet {
        cli::OutputMode::Quiet
    } else {
        cli::OutputMode::parse(&cli.output)
    };
    let handler = cli::create_handler(mode, cli.debug);

    let token = cli::CancellationToken::new();
    tokio::spawn(cli::setup_signal_handlers(token.clone()));

    let code = match cli.command {
        Commands::Validate => {
            commands::validate_catalog(cli.catalog.as_deref(), &config, project_dir, &*handler)
        }

        Commands::Personas => {
            let generator = ResponseGenerator::new(PersonaTable::builtin()?);
            commands::list_personas(&generator, &*handler)
        }

        Commands::Workflows => {
            let catalog = Catalog::resolve(cli.catalog.as_deref(), &config, project_dir)?;
            commands::list_workflows(&catalog, &*handler)
        }

        Commands::Select { label } => {
            let catalog = Catalog::resolve(cli.catalog.as_deref(), &config, project_dir)?;
            commands::select_workflow(&label.join(" "), &catalog, &config.engine, &*handler)
        }

        Commands::Run { label, speed } => {
            let catalog = Catalog::resolve(cli.catalog.as_deref(), &config, project_dir)?;
            if let Some(speed) = speed {
                config.engine.speed = speed;
            }
            commands::run_workflow(&label.join(" "), &catalog, &config.engine, &token, &*handler)
                .await
        }

        Commands::Chat {
            message,
            persona,
            run,
        } => {
            let catalog = Catalog::resolve(cli.catalog.as_deref(), &config, project_dir)?;
            let generator = ResponseGenerator::new(PersonaTable::builtin()?);
            let persona = persona.unwrap_or(config.defaults.persona);
            commands::chat(
                &message.join(" "),
                persona,
                &generator,
                &catalog,
                &config,
                run,
                &token,
                &*handler,
            )
            .await
        }
    };

    if code != 0 {
        drop(log_guard);
        std::process::exit(code);
    }

    Ok(())
}
