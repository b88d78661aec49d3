use clap::{Parser, Subcommand};
use dotenv::dotenv;
use ragflow_rs::adk::model::DEFAULT_MODEL;
use ragflow_rs::ragflow::pipeline::{self, HandsonInput, HandsonOutput};
use ragflow_rs::ragflow::server;
use ragflow_rs::ragflow::workflow::WorkflowRegistry;

use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a question from Confluence
    Ask {
        /// The question, in natural language
        #[arg(short, long)]
        query: String,

        /// The model to use
        #[arg(short, long, default_value = DEFAULT_MODEL)]
        model: String,
    },
    /// Serve the workflow over HTTP
    Serve {
        #[arg(short, long, default_value_t = 3000)]
        port: u16,

        /// The model to use
        #[arg(short, long, default_value = DEFAULT_MODEL)]
        model: String,
    },
    /// Print the workflow's step contracts as YAML
    Describe {
        /// The model to use
        #[arg(short, long, default_value = DEFAULT_MODEL)]
        model: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv().ok();

    let args = Args::parse();

    // The server logs through tracing so request spans show up; log records are bridged
    match &args.command {
        Commands::Serve { .. } => tracing_subscriber::fmt().init(),
        _ => env_logger::init(),
    }

    match args.command {
        Commands::Ask { query, model } => {
            let workflow = pipeline::build_from_env(&model)?;

            println!("Question: {}", query);
            let output: HandsonOutput = workflow.invoke(&HandsonInput { query }).await?;
            println!("Answer: {}", output.text);
        }
        Commands::Serve { port, model } => {
            let registry = WorkflowRegistry::new();
            let workflow = pipeline::build_from_env(&model)?;
            log::info!("Registered workflow: {}", workflow.id());
            registry.register(Arc::new(workflow)).await;

            server::serve(port, registry).await?;
        }
        Commands::Describe { model } => {
            let workflow = pipeline::build_from_env(&model)?;
            print!("{}", workflow.describe().to_yaml()?);
        }
    }

    Ok(())
}
