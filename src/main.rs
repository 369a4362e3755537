use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use fanout_rs::fanout::steps::{self, KeywordClassifier};
use fanout_rs::fanout::workflow::builder::Builder;
use fanout_rs::fanout::workflow::config::RunConfig;
use fanout_rs::fanout::workflow::graph::CompiledGraph;
use fanout_rs::fanout::workflow::registry::StepRegistry;
use fanout_rs::sdk::state::StateUpdate;

use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the orchestrator/worker graph on a query
    Run {
        /// The main query
        #[arg(short, long)]
        query: String,

        /// Workflow file to run instead of the built-in graph
        #[arg(short, long)]
        workflow: Option<String>,

        /// Maximum fan-out children running at once
        #[arg(long)]
        max_concurrency: Option<usize>,
    },
    /// Print the structure of a graph
    Graph {
        /// Workflow file to describe instead of the built-in graph
        #[arg(short, long)]
        workflow: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Mermaid)]
        format: Format,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Mermaid,
    Json,
}

async fn load_graph(workflow: Option<&str>) -> anyhow::Result<CompiledGraph> {
    match workflow {
        Some(path) => {
            let registry = StepRegistry::new();
            steps::register_builtin_steps(&registry).await;
            Builder::new(registry)
                .build_from_file(path)
                .await
                .with_context(|| format!("Failed to build workflow {}", path))
        }
        None => steps::orchestrator_workers_graph(Arc::new(KeywordClassifier::default()))
            .context("Failed to build the built-in graph"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::Run {
            query,
            workflow,
            max_concurrency,
        } => {
            let mut config = RunConfig::from_env().context("Invalid environment configuration")?;
            if let Some(n) = max_concurrency {
                config = config.with_max_concurrency(n);
            }

            let graph = load_graph(workflow.as_deref()).await?.with_config(config);
            log::info!("Running graph: {}", graph.name());

            let input = StateUpdate::new().with("main_query", query)?;
            let report = graph.run(input).await.context("Run failed")?;
            log::info!(
                "Run {} finished in {} ms",
                report.run_id,
                report.elapsed().num_milliseconds()
            );
            println!("{}", serde_json::to_string_pretty(&report.state.to_json())?);
        }
        Commands::Graph {
            workflow,
            format,
            output,
        } => {
            let info = load_graph(workflow.as_deref()).await?.describe();
            let rendered = match format {
                Format::Mermaid => info.to_mermaid(),
                Format::Json => serde_json::to_string_pretty(&info)?,
            };
            match output {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("Failed to write {}", path))?;
                    println!("Graph written to {}", path);
                }
                None => println!("{}", rendered),
            }
        }
    }

    Ok(())
}
