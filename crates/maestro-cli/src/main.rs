mod config;

use clap::{Parser, Subcommand};
use config::MaestroConfig;
use maestro_core::QueryContext;
use maestro_orchestrator::AgentOrchestrator;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "maestro", about = "Maestro: capability-based agent routing")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "maestro.toml")]
    config: PathBuf,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Upper bound for a single dispatch or workflow run
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered agents in registration order
    Agents,
    /// Print the capability index
    Capabilities,
    /// List agents covering any of the given capabilities
    Discover {
        #[arg(required = true)]
        capabilities: Vec<String>,
    },
    /// Route a query and run the chosen agent
    Route {
        query: String,
        #[arg(long, default_value = "cli")]
        user: String,
        /// Session id (random when omitted)
        #[arg(long)]
        session: Option<String>,
        #[arg(long)]
        query_type: Option<String>,
        #[arg(long, default_value_t = 1)]
        priority: i64,
        /// Only consider agents with this capability (repeatable)
        #[arg(long = "require")]
        required: Vec<String>,
    },
    /// Run a named workflow
    Workflow {
        name: String,
        /// Workflow input; parsed as JSON, otherwise passed as a string
        #[arg(long)]
        input: Option<String>,
    },
    /// Load the config and check the router setup
    Validate,
}

fn init_tracing(json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn bounded<T>(secs: u64, fut: impl Future<Output = T>) -> anyhow::Result<T> {
    tokio::time::timeout(Duration::from_secs(secs), fut)
        .await
        .map_err(|_| anyhow::anyhow!("timed out after {secs}s"))
}

fn parse_input(raw: Option<String>) -> serde_json::Value {
    match raw {
        None => serde_json::Value::Null,
        Some(text) => serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)),
    }
}

fn list_agents(orchestrator: &AgentOrchestrator) -> Vec<serde_json::Value> {
    orchestrator
        .registry()
        .descriptors()
        .into_iter()
        .map(|d| {
            serde_json::json!({
                "agent_id": d.agent_id,
                "capabilities": d.capabilities,
                "priority_hint": d.priority_hint,
            })
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = MaestroConfig::load(&cli.config).await?;
    let orchestrator = config.build()?;

    match cli.command {
        Commands::Agents => print_json(&list_agents(&orchestrator))?,
        Commands::Capabilities => print_json(&orchestrator.discovery().discover_capabilities())?,
        Commands::Discover { capabilities } => {
            print_json(&orchestrator.discovery().analyze_requirements(&capabilities))?;
        }
        Commands::Route {
            query,
            user,
            session,
            query_type,
            priority,
            required,
        } => {
            let session = session.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let mut context = QueryContext::new(user, session)
                .with_priority(priority)
                .requiring(required);
            if let Some(query_type) = query_type {
                context = context.with_query_type(query_type);
            }
            let dispatch =
                bounded(cli.timeout_secs, orchestrator.dispatch(&query, &context)).await??;
            print_json(&dispatch)?;
        }
        Commands::Workflow { name, input } => {
            let run = bounded(
                cli.timeout_secs,
                orchestrator.run_workflow(&name, parse_input(input), None),
            )
            .await??;
            print_json(&run.summary())?;
            if !run.is_completed() {
                anyhow::bail!("workflow '{name}' ended in {:?}", run.status);
            }
        }
        Commands::Validate => {
            info!(
                agents = orchestrator.registry().len(),
                default_agent = %orchestrator.router().config().default_agent,
                "Configuration is valid"
            );
            println!("ok");
        }
    }

    Ok(())
}
