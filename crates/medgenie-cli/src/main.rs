//! MedGenie CLI - Command-line interface
//!
//! Usage:
//!   medgenie retrieve <question> [--top-k N]
//!   medgenie answer <question> [--top-k N]
//!   medgenie check
//!
//! Configuration comes from the environment (and `.env`) exactly as for the
//! API server.
//!
//! Author: hephaex@gmail.com

use anyhow::Context;
use clap::{Parser, Subcommand};
use medgenie_core::{AppConfig, DocumentRetriever, LlmClient, RagQuery, DEFAULT_TOP_K};
use medgenie_rag::{create_llm_client, PipelineConfig, RagPipeline};
use medgenie_vector::VectorRetriever;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "medgenie")]
#[command(about = "Medical question answering over a Pinecone index")]
#[command(version)]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Retrieve the most similar documents for a question
    Retrieve {
        /// Question to search for
        question: String,

        /// Number of documents to retrieve
        #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },
    /// Answer a question from retrieved context
    Answer {
        /// Question to ask
        question: String,

        /// Number of documents to use as context
        #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },
    /// Validate configuration and run one warm-up retrieval
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("Failed to load configuration")?;

    match cli.command {
        Commands::Retrieve { question, top_k } => {
            let pipeline = build_pipeline(&config)?;
            let query = RagQuery::new(question).with_top_k(top_k);
            query.validate(pipeline.max_top_k())?;

            let result = pipeline.retrieve(&query).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                for (i, doc) in result.retrieved_docs.iter().enumerate() {
                    println!("[{}] {}\n", i + 1, doc);
                }
                if result.retrieved_docs.is_empty() {
                    println!("No documents found.");
                }
            }
        }
        Commands::Answer { question, top_k } => {
            let pipeline = build_pipeline(&config)?;
            let query = RagQuery::new(question).with_top_k(top_k);
            query.validate(pipeline.max_top_k())?;

            let result = pipeline.answer(&query).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", result.answer);
            }
        }
        Commands::Check => {
            print_config(&config);

            let pipeline = build_pipeline(&config)?;
            pipeline
                .warm_up()
                .await
                .context("Warm-up retrieval failed")?;
            println!("Index reachable: warm-up retrieval succeeded");
        }
    }

    Ok(())
}

fn build_pipeline(config: &AppConfig) -> anyhow::Result<RagPipeline> {
    let retriever: Arc<dyn DocumentRetriever> = Arc::new(VectorRetriever::from_config(config)?);
    let llm_client: Arc<dyn LlmClient> = Arc::from(create_llm_client(&config.llm)?);

    Ok(RagPipeline::new(
        retriever,
        llm_client,
        PipelineConfig::from(&config.rag),
    ))
}

fn print_config(config: &AppConfig) {
    println!("Configuration OK");
    println!("  Pinecone index:   {}", config.pinecone.index_name);
    println!(
        "  Pinecone host:    {}",
        config.pinecone.host.as_deref().unwrap_or("(resolved at startup)")
    );
    println!(
        "  Embedding:        {:?} / {}",
        config.embedding.provider, config.embedding.model
    );
    println!(
        "  LLM:              {:?} / {}",
        config.llm.provider, config.llm.model
    );
    println!(
        "  Cache:            {} entries, {}s TTL",
        config.rag.cache_max_capacity, config.rag.cache_ttl_seconds
    );
    println!(
        "  Server:           {}:{} (static: {})",
        config.server.host,
        config.server.port,
        config.server.static_dir.display()
    );
}
