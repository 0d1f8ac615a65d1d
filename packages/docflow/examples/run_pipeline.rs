//! End-to-end pipeline demo over mock collaborators.
//!
//! Runs 25 synthetic documents through the batch pipeline, prints the run
//! statistics, and writes the retry artifact for the failures.
//!
//! ```sh
//! cargo run --example run_pipeline
//! ```

use docflow::testing::{MockBackend, MockSource};
use docflow::{
    write_retry_file, DocumentRef, MemoryStore, Pipeline, PipelineConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let documents: Vec<DocumentRef> = (0..25)
        .map(|i| DocumentRef::new(format!("corpus/report_{i:02}.txt")))
        .collect();

    // One document the backend silently drops, one with a useless payload.
    let backend = MockBackend::new()
        .with_dropped_document("corpus/report_03.txt")
        .with_payload("corpus/report_11.txt", "n/a");

    let pipeline = Pipeline::new(
        backend,
        MemoryStore::new(),
        MockSource::new().with_default_content(),
        PipelineConfig::default()
            .with_chunk_size(10)
            .with_max_document_retries(1),
    )?;

    let report = pipeline.run(documents).await?;

    println!("run {}", report.run_id);
    println!(
        "  submitted {} completed {} validated {} failed {} retried {}",
        report.stats.submitted,
        report.stats.completed,
        report.stats.validated,
        report.stats.failed,
        report.stats.retried,
    );

    if !report.failures.is_empty() {
        let path = std::env::temp_dir().join("docflow_failures.csv");
        write_retry_file(&path, &report.failures)?;
        println!("  retry artifact: {}", path.display());
        for failure in &report.failures {
            println!("    {} ({})", failure.document, failure.reason);
        }
    }

    Ok(())
}
