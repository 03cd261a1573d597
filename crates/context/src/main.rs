//! RagForge Context Engine
//!
//! Reads one JSON command from stdin and writes the JSON result to stdout:
//!
//! ```text
//! {"synthesize": {"user_id": "u1", "query": "What is backpropagation?"}}
//! {"analyze": {"document_text": "...", "analysis_type": "faq"}}
//! ```
//!
//! Failures are written as an error body and exit with status 1.

use anyhow::Context;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use ragforge_common::{config::AppConfig, metrics, telemetry, ErrorResponse, VERSION};
use ragforge_context::{AnalysisRequest, Orchestrator, SynthesisRequest};
use serde::Deserialize;
use std::io::Read;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Command {
    Synthesize(SynthesisRequest),
    Analyze(AnalysisRequest),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    telemetry::init(&config.observability)?;

    info!("Starting RagForge Context Engine v{}", VERSION);

    metrics::register_metrics();
    if config.observability.metrics_port != 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        let mut builder = PrometheusBuilder::new().with_http_listener(addr);
        for (name, buckets) in metrics::histogram_buckets() {
            builder = builder
                .set_buckets_for_metric(Matcher::Full(name), buckets)
                .context("invalid histogram buckets")?;
        }
        builder.install().context("failed to start metrics exporter")?;
        info!(%addr, "Metrics exporter listening");
    }

    let config = Arc::new(config);
    let orchestrator = Orchestrator::from_config(config.clone())?;

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("failed to read command from stdin")?;
    let command: Command = serde_json::from_str(&input).context("malformed command")?;

    let outcome = match command {
        Command::Synthesize(request) => orchestrator
            .synthesize(request)
            .await
            .and_then(|response| to_json(&response)),
        Command::Analyze(request) => orchestrator
            .analyze(request)
            .await
            .and_then(|response| to_json(&response)),
    };

    match outcome {
        Ok(body) => {
            println!("{}", body);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, code = e.kind().as_code(), "Request failed");
            println!("{}", serde_json::to_string_pretty(&ErrorResponse::from(&e))?);
            std::process::exit(1);
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> ragforge_common::Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| ragforge_common::AppError::Internal {
        message: format!("failed to encode response: {}", e),
    })
}
