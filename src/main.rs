// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use edge_orchestrator::{
    apply::{apply_plan, KubeApplier},
    config::EdgeConfig,
    constants::DEFAULT_FIELD_MANAGER,
    orchestrator::{plan, DeploymentPlan},
};
use kube::Client;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Plans and applies the network edge of a Kubernetes cluster.
#[derive(Parser, Debug)]
#[command(name = "edge-orchestrator", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print every manifest of the plan in creation order
    Plan {
        /// Configuration file (YAML or JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        output: OutputFormat,

        /// Fail when a component was left out of the plan or a warning was raised
        #[arg(long)]
        strict: bool,
    },

    /// Build the plan and print its stages
    Validate {
        /// Configuration file (YAML or JSON)
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Apply the plan to the current cluster, one stage at a time
    Apply {
        /// Configuration file (YAML or JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Field manager used for server-side apply
        #[arg(long, default_value = DEFAULT_FIELD_MANAGER)]
        field_manager: String,

        /// Validate against the API server without persisting anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    /// Multi-document YAML stream
    Yaml,
    /// JSON array
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("edge-orchestrator")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli))
}

fn initialize_logging() {
    // Respects RUST_LOG, defaulting to INFO, and RUST_LOG_FORMAT (json or text).
    // Logs go to stderr; stdout carries plan output.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(io::stderr)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(io::stderr)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(cli: Cli) -> Result<()> {
    initialize_logging();
    debug!("Logging initialized with file and line number tracking");

    match cli.command {
        Commands::Plan {
            config,
            output,
            strict,
        } => {
            let plan = load_plan(&config)?;
            let rendered = match output {
                OutputFormat::Yaml => plan.to_yaml()?,
                OutputFormat::Json => plan.to_json()?,
            };
            println!("{rendered}");
            if strict && !plan.is_clean() {
                bail!(
                    "plan has {} failure(s) and {} warning(s)",
                    plan.failures.len(),
                    plan.warnings.len()
                );
            }
        }
        Commands::Validate { config } => {
            let plan = load_plan(&config)?;
            for (index, stage) in plan.stages().enumerate() {
                println!("stage {index}:");
                for resource in stage {
                    println!("  {}", resource.id);
                }
            }
            if let Some(class) = &plan.ingress_class_name {
                println!("ingress class: {class}");
            }
            if !plan.failures.is_empty() {
                bail!("{} component(s) could not be planned", plan.failures.len());
            }
            info!(resources = plan.len(), "Configuration is valid");
        }
        Commands::Apply {
            config,
            field_manager,
            dry_run,
        } => {
            let plan = load_plan(&config)?;

            debug!("Initializing Kubernetes client");
            let client = Client::try_default().await?;
            let applier = KubeApplier::new(client, field_manager, dry_run);

            info!(
                resources = plan.len(),
                stages = plan.graph().stages().len(),
                dry_run,
                "Applying plan"
            );
            let report = apply_plan(&plan, &applier).await;
            for (id, e) in &report.failed {
                error!(id = %id, error = %e, "Resource not applied");
            }
            if !report.is_success() {
                bail!(
                    "{} resource(s) failed, {} skipped",
                    report.failed.len(),
                    report.skipped.len()
                );
            }
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "edge-orchestrator",
                &mut io::stdout(),
            );
        }
    }

    Ok(())
}

fn load_plan(path: &Path) -> Result<DeploymentPlan> {
    let spec = EdgeConfig::load(path)?
        .into_spec()
        .with_context(|| format!("invalid configuration in {}", path.display()))?;
    Ok(plan(&spec)?)
}
