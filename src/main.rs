use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use clinical_assistant_lib::config::AssistantConfig;
use clinical_assistant_lib::pipeline::assistant::{
    extract_and_validate, AssistantContext, HttpDataLookup, HttpEmrWriter, HttpKnowledgeGateway,
    QueryOrchestrator,
};
use clinical_assistant_lib::pipeline::entities::extract_entities;
use clinical_assistant_lib::pipeline::routing::route_query;

#[derive(Parser)]
#[command(name = "clinical-assistant", version, about = "Clinical query routing and entity extraction")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify a query into a route
    Route { text: String },
    /// Extract clinical entities from narrative text
    Extract {
        text: String,
        /// Print raw extractor output without validation
        #[arg(long)]
        raw: bool,
    },
    /// Answer a query through the configured collaborators
    Ask {
        text: String,
        #[arg(long, env = "CLINICAL_ASSISTANT_PATIENT_ID")]
        patient_id: Option<String>,
        #[arg(long)]
        record_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    clinical_assistant_lib::init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Route { text } => print_json(&route_query(&text)),
        Command::Extract { text, raw: true } => print_json(&extract_entities(&text)),
        Command::Extract { text, raw: false } => print_json(&extract_and_validate(&text)),
        Command::Ask {
            text,
            patient_id,
            record_id,
        } => {
            let config = AssistantConfig::from_env().context("Invalid assistant configuration")?;
            let orchestrator = QueryOrchestrator::new(
                HttpDataLookup::new(&config.data_lookup_url),
                HttpKnowledgeGateway::new(&config.knowledge_url),
                HttpEmrWriter::new(&config.emr_url),
            );
            let context = AssistantContext {
                patient_id,
                record_id,
            };
            let reply = orchestrator.ask(&text, &context).await;
            print_json(&reply)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}
