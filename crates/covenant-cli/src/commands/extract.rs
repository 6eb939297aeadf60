//! Extract command implementation.

use crate::cli::ExtractArgs;
use crate::config::Config;
use crate::document::load_document;
use crate::error::Result;
use crate::output::Formatter;
use covenant_domain::{Document, ExtractionModel, ExtractionResult, ResultSink};
use covenant_extractor::{
    CancelHandle, CatalogueDirectory, ChunkOverrides, CostLedger, ExtractionEngine,
    ExtractorConfig, InMemoryResultSink, JsonFileResultSink,
};
use std::sync::Arc;
use tracing::warn;

/// Execute the extract command.
pub async fn execute_extract(args: ExtractArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let document = load_document(&args.document, args.document_id.as_deref())?;
    let catalogue = CatalogueDirectory::from_file(&args.questions)?;
    let model = Arc::new(config.model.client()?);
    let overrides = ChunkOverrides::from(args.chunking);

    let result = match &args.output {
        Some(dir) => {
            let sink = Arc::new(JsonFileResultSink::new(dir));
            let result =
                run_extraction(model, catalogue, sink.clone(), &config.extractor, &document, overrides)
                    .await?;
            if !result.stats.cancelled {
                eprintln!(
                    "{}",
                    formatter.success(&format!(
                        "Result written to {}",
                        sink.path_for(&result.document_id).display()
                    ))
                );
            }
            result
        }
        None => {
            let sink = Arc::new(InMemoryResultSink::new());
            run_extraction(model, catalogue, sink, &config.extractor, &document, overrides).await?
        }
    };

    println!("{}", formatter.format_result(&result)?);
    Ok(())
}

/// Run one pass, cancelling it at the next chunk boundary on Ctrl+C.
///
/// The pass's cost summary is logged once it returns.
pub async fn run_extraction<M, S>(
    model: Arc<M>,
    catalogue: CatalogueDirectory,
    sink: Arc<S>,
    config: &ExtractorConfig,
    document: &Document,
    overrides: ChunkOverrides,
) -> Result<ExtractionResult>
where
    M: ExtractionModel,
    S: ResultSink,
{
    let ledger = Arc::new(CostLedger::new());
    let engine = ExtractionEngine::new(model, Arc::new(catalogue), sink, config.clone())
        .with_cost_sink(ledger.clone());

    let handle = CancelHandle::new();
    let pass = engine.run_pass(document, Some(overrides), handle.token());
    tokio::pin!(pass);

    let outcome = tokio::select! {
        outcome = &mut pass => outcome,
        Ok(()) = tokio::signal::ctrl_c() => {
            warn!("Interrupt received, stopping after the current chunk");
            handle.cancel();
            pass.await
        }
    };

    ledger.summary(&document.id).log();
    Ok(outcome?)
}
