//! Manual batch runner: feeds a local batch file through the pipeline.
//!
//! In production the orchestrator is invoked by the storage trigger; this
//! binary stands in for that trigger during development and operations
//! drills. The run report is printed to stdout as JSON.
//!
//! Usage: `caretriage <batch-file.json> [classify|summarise|both]`

use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use caretriage::config::{self, PipelineConfig};
use caretriage::inference::HttpInferenceClient;
use caretriage::pipeline::PipelineOrchestrator;
use caretriage::store::{ResultStore, SqliteResultStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let mut args = std::env::args().skip(1);
    let batch_file = match args.next() {
        Some(path) => PathBuf::from(path),
        None => {
            eprintln!("usage: caretriage <batch-file.json> [classify|summarise|both]");
            std::process::exit(2);
        }
    };
    let mode = args.next().unwrap_or_else(|| "classify".to_string());

    let payload = std::fs::read_to_string(&batch_file)?;
    let object_key = batch_file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| batch_file.display().to_string());

    let config = PipelineConfig::from_env();
    let db_path = std::env::var("CARETRIAGE_DB").unwrap_or_else(|_| "caretriage.db".to_string());
    let store = Arc::new(SqliteResultStore::open(
        std::path::Path::new(&db_path),
        &config,
    )?) as Arc<dyn ResultStore>;
    let inference = Arc::new(HttpInferenceClient::new(
        &config.inference_base_url,
        config.inference_timeout_secs,
    ));

    let orchestrator = PipelineOrchestrator::new(config, inference, store);

    match mode.as_str() {
        "classify" => {
            let outcome = orchestrator.run_classification(&object_key, &payload).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        "summarise" | "summarize" => {
            let outcome = orchestrator.run_summaries(&object_key, &payload).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        "both" => {
            let classified = orchestrator.run_classification(&object_key, &payload).await;
            let summarised = orchestrator.run_summaries(&object_key, &payload).await;
            println!("{}", serde_json::to_string_pretty(&classified)?);
            println!("{}", serde_json::to_string_pretty(&summarised)?);
        }
        other => {
            eprintln!("unknown mode '{other}', expected classify, summarise or both");
            std::process::exit(2);
        }
    }

    Ok(())
}
