use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use email_triage::actions::LoggingActionSink;
use email_triage::config::PipelineConfig;
use email_triage::dataset;
use email_triage::llm::{LlmConfig, create_provider};
use email_triage::pipeline::{BatchRunner, BatchSummary, ProcessingResult};

/// Reply preview width in the summary table.
const REPLY_PREVIEW_CHARS: usize = 60;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = PipelineConfig::from_env().context("invalid pipeline configuration")?;
    let llm_config = LlmConfig::from_env(&config.model, config.call_timeout)
        .context("LLM backend is not configured")?;

    eprintln!("📬 Email Triage v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Backend: {:?}", llm_config.backend);
    eprintln!("   Model: {}", config.model);
    eprintln!("   Concurrency: {}", config.concurrency);
    eprintln!("   Call timeout: {}s", config.call_timeout.as_secs());

    let emails = match std::env::args().nth(1) {
        Some(path) => {
            let path = PathBuf::from(path);
            eprintln!("   Dataset: {}\n", path.display());
            dataset::load_emails(&path)
                .await
                .with_context(|| format!("failed to load emails from {}", path.display()))?
        }
        None => {
            eprintln!("   Dataset: built-in samples\n");
            dataset::sample_emails()
        }
    };

    let llm = create_provider(&llm_config)?;
    let runner = BatchRunner::from_config(llm, Arc::new(LoggingActionSink::new()), &config);

    let results = runner.run(&emails).await;
    print_summary(&results);

    Ok(())
}

fn print_summary(results: &[ProcessingResult]) {
    println!("\nProcessing Summary:");
    println!(
        "{:<10} {:<8} {:<16} {}",
        "email_id", "success", "classification", "reply"
    );
    for result in results {
        let preview: String = result
            .reply_text
            .replace('\n', " ")
            .chars()
            .take(REPLY_PREVIEW_CHARS)
            .collect();
        let reply = match (&result.error, preview.is_empty()) {
            (Some(error), _) => format!("(failed: {error})"),
            (None, true) => "(none)".to_string(),
            (None, false) => preview,
        };
        println!(
            "{:<10} {:<8} {:<16} {}",
            result.email_id,
            if result.success { "yes" } else { "no" },
            result.category_label(),
            reply
        );
    }

    let summary = BatchSummary::from_results(results);
    println!();
    for (category, count) in &summary.by_category {
        println!("  {category}: {count}");
    }
    println!(
        "  {} of {} processed successfully",
        summary.succeeded, summary.total
    );
}
