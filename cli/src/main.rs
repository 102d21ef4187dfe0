use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;

use config::Config;
use config::OutputFormat;

#[derive(Parser)]
#[command(name = "opencode-agents")]
#[command(about = "Run agent definitions and multi-step agent workflows")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List built-in agents and workflows
    List {
        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Show the definition an agent name resolves to
    Show {
        /// Name of the agent
        agent: String,

        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// List materialized agent definitions per scope
    Installed {
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Run a single agent
    Run {
        /// Name of the agent to run
        agent: String,

        /// Task description passed to the agent
        #[arg(short, long)]
        input: String,

        /// Context entry as key=value; repeatable
        #[arg(long = "context", value_parser = cli::parse_key_value)]
        context: Vec<(String, String)>,

        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Run a built-in or custom workflow
    Workflow {
        /// Workflow name
        name: String,

        /// Load the workflow from a YAML file instead
        #[arg(long)]
        file: Option<PathBuf>,

        /// Initial context entry as key=value; repeatable
        #[arg(long = "context", value_parser = cli::parse_key_value)]
        context: Vec<(String, String)>,

        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Write the default configuration file
    Init {
        /// Force overwrite existing configuration
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let project_root = std::env::current_dir().context("cannot determine current directory")?;
    let config = Config::load(cli.config.as_deref(), &project_root).await?;

    let log_level = if cli.verbose {
        "debug"
    } else {
        config.log_level.as_str()
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("opencode_agents={log_level},opencode_agents_cli={log_level}")))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    for issue in config.validate() {
        warn!("{issue}");
    }

    let format_or_default = |format: Option<OutputFormat>| format.unwrap_or(config.output);

    match cli.command {
        Commands::List { format } => {
            cli::list_agents(&config, format_or_default(format)).await?;
        }

        Commands::Show { agent, format } => {
            cli::show_agent(&config, &agent, format_or_default(format)).await?;
        }

        Commands::Installed { format } => {
            cli::list_installed(&config, format_or_default(format)).await?;
        }

        Commands::Run {
            agent,
            input,
            context,
            format,
        } => {
            cli::run_agent(&config, &project_root, &agent, &input, context, format_or_default(format))
                .await?;
        }

        Commands::Workflow {
            name,
            file,
            context,
            format,
        } => {
            cli::run_workflow(
                &config,
                &project_root,
                &name,
                file.as_deref(),
                context,
                format_or_default(format),
            )
            .await?;
        }

        Commands::Init { force } => {
            cli::initialize_config(&config, force).await?;
        }
    }

    Ok(())
}
