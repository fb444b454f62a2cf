//! Command implementations. Each returns the JSON document printed to stdout.

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};

use agentic_logo::{
    discover, rank_prompts, HttpFetcher, HttpRankSource, LocalDirStore, LogoPipeline,
    LogoRequest, Normalizer, PipelineConfig,
};

/// Settings for the `find` command once flags and environment are resolved.
pub struct FindSettings {
    pub rank_endpoint: String,
    pub rank_token: Option<String>,
    pub output_dir: std::path::PathBuf,
    pub config: PipelineConfig,
}

/// Full lookup: discover, normalize, upload, rank, select.
pub async fn find(request: LogoRequest, settings: FindSettings) -> anyhow::Result<Value> {
    let http = Arc::new(HttpFetcher::new(settings.config.timeout_ms));
    let ranker = HttpRankSource::new(settings.rank_endpoint, settings.config.timeout_ms)
        .with_authorization(settings.rank_token);
    let store = LocalDirStore::new(settings.output_dir);

    let pipeline = LogoPipeline::new(
        http.clone(),
        http,
        Arc::new(store),
        Arc::new(ranker),
        settings.config,
    );

    let report = pipeline.run(&request).await?;
    tracing::info!(
        "{}: {} candidate(s), {} uploaded, {} ranked",
        request.url,
        report.candidates.len(),
        report.uploaded.len(),
        report.ranked.len()
    );

    Ok(json!({
        "url": request.url,
        "best": report.best(),
        "winner": report.outcome.winner,
        "backups": report.outcome.backups,
        "disposed": report.deleted,
        "candidates": report.candidates.len(),
    }))
}

/// Discovery only.
pub async fn discover_candidates(
    url: &str,
    name: &str,
    entity: &str,
    timeout_ms: u64,
) -> anyhow::Result<Value> {
    let http = HttpFetcher::new(timeout_ms);
    let set = discover(&http, url, name, entity).await?;
    let candidates = set.into_candidates();
    Ok(json!({
        "url": url,
        "count": candidates.len(),
        "candidates": candidates,
    }))
}

/// Normalize a local raster or SVG file and write the square PNG.
pub fn normalize_file(input: &Path, output: &Path, config: PipelineConfig) -> anyhow::Result<Value> {
    let bytes = std::fs::read(input)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", input.display()))?;

    let source = input.display().to_string();
    let normalized = Normalizer::new(config).normalize(&source, &bytes)?;
    normalized.pixels.save(output)?;

    Ok(json!({
        "input": source,
        "output": output.display().to_string(),
        "identifier": normalized.identifier,
        "original": {
            "width": normalized.original_width,
            "height": normalized.original_height
        },
        "size": normalized.size(),
        "background": normalized.background_color,
    }))
}

/// The fixed prompt list sent to the rank service.
pub fn prompts(name: &str, prefix: &str) -> Value {
    json!({ "prompts": rank_prompts(prefix, name) })
}
