use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::sync::Arc;

use conveyor_rs::ai::{AiProvider, DisabledProvider, GeminiProvider};
use conveyor_rs::catalog::Catalog;
use conveyor_rs::compiler::{compile, estimate_credits};
use conveyor_rs::drivers::ChromiumDriver;
use conveyor_rs::graph::FlowLoader;
use conveyor_rs::run::store::RunStore;
use conveyor_rs::run::{CancelFlag, MemoryRunStore, Orchestrator, Trigger};
use conveyor_rs::steps::standard_registry;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a flow file and print its phase plan
    Validate {
        /// Path to the flow file
        #[arg(short, long)]
        file: String,
    },
    /// Print the credit cost of a flow file
    Estimate {
        /// Path to the flow file
        #[arg(short, long)]
        file: String,
    },
    /// Compile and execute a flow file end to end
    Run {
        /// Path to the flow file
        #[arg(short, long)]
        file: String,

        /// Gemini model used by ai_extract steps
        #[arg(short, long, default_value = "gemini-1.5-flash")]
        model: String,

        /// Run the browser with a visible window
        #[arg(long)]
        headed: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let catalog = Catalog::standard();
    let loader = FlowLoader::new();

    match args.command {
        Commands::Validate { file } => {
            let def = loader.load_flow(&file)?;
            let plan = compile(&def.graph, &catalog)?;

            println!(
                "'{}' compiles to {} phases ({} nodes):",
                def.name,
                plan.phases.len(),
                plan.node_count()
            );
            for phase in &plan.phases {
                let ids: Vec<&str> = phase.nodes.iter().map(|n| n.id.as_str()).collect();
                println!("  phase {}: {}", phase.index, ids.join(", "));
            }
        }
        Commands::Estimate { file } => {
            let def = loader.load_flow(&file)?;
            let credits = estimate_credits(&def.graph.nodes, &catalog)?;
            println!("'{}' costs {} credits per run", def.name, credits);
        }
        Commands::Run {
            file,
            model,
            headed,
        } => {
            let def = loader.load_flow(&file)?;

            let provider: Arc<dyn AiProvider> = match GeminiProvider::new(model) {
                Ok(provider) => Arc::new(provider),
                Err(e) => {
                    log::warn!("ai_extract steps will fail: {}", e);
                    Arc::new(DisabledProvider)
                }
            };
            let registry = standard_registry(provider, reqwest::Client::new());
            let store = Arc::new(MemoryRunStore::new());
            let orchestrator = Orchestrator::new(
                catalog,
                store.clone(),
                Arc::new(ChromiumDriver::new(!headed)),
                Arc::new(registry),
            );

            let cancel = CancelFlag::new();
            let ctrlc = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::warn!("cancellation requested, finishing the current step");
                    ctrlc.cancel();
                }
            });

            let result = orchestrator
                .start_run(&def.name, &def.graph, Trigger::Manual, &cancel)
                .await?;

            println!(
                "run {} ended {:?}, {} credits consumed",
                result.run_id, result.status, result.credits_consumed
            );
            for exec in store.phase_executions(result.run_id).await? {
                println!("  [{:?}] {} ({})", exec.status, exec.node.id, exec.node.step);
                for line in &exec.log {
                    println!("      {:?} {}", line.level, line.message);
                }
            }
        }
    }

    Ok(())
}
