use invoice_dl::{Config, Pipeline, logging};

#[tokio::main]
async fn main() {
    logging::init_logging();

    match run().await {
        Ok(elapsed_ms) => {
            println!("Processing completed successfully in {elapsed_ms:.2}ms");
        }
        Err(err) => {
            tracing::error!(code = err.error_code(), error = %err, "invoice run failed");
            eprintln!("invoice-dl error [{}]: {}", err.error_code(), err);
            std::process::exit(1);
        }
    }
}

async fn run() -> invoice_dl::Result<f64> {
    let config = Config::load()?;
    let pipeline = Pipeline::from_config(config)?;
    let summary = pipeline.run().await?;

    tracing::info!(
        fetched = summary.fetched,
        retained = summary.retained,
        downloaded = summary.downloaded,
        export = %summary.export_path.display(),
        "run summary"
    );
    Ok(summary.elapsed.as_secs_f64() * 1000.0)
}
