//! End-to-end orchestration: discover, normalize, upload, rank, select.
//!
//! Every per-candidate step is independent and runs with bounded concurrency.
//! Streams are order-preserving, so the ranked list handed to the
//! disambiguator is fully materialized and in discovery order. Any failure
//! for one candidate is logged and that candidate is skipped.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::discovery::discover;
use crate::disambiguate::Disambiguator;
use crate::fetch::{Fetcher, PageRenderer};
use crate::normalize::{AssetKind, Normalizer};
use crate::rank::{entity_description, into_ranked, RankSource};
use crate::storage::Uploader;
use crate::types::{
    Candidate, LogoError, LogoRequest, LogoResult, NormalizedImage, PipelineConfig,
    RankedCandidate, SelectionOutcome,
};

/// One uploaded normalized image.
#[derive(Debug, Clone, Serialize)]
pub struct UploadedImage {
    pub source_url: String,
    pub identifier: String,
    pub address: String,
}

/// Everything a lookup produced, for callers and diagnostics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    pub candidates: Vec<Candidate>,
    pub uploaded: Vec<UploadedImage>,
    pub ranked: Vec<RankedCandidate>,
    pub outcome: SelectionOutcome,
    /// Identifiers removed from storage after a winner was chosen.
    pub deleted: Vec<String>,
}

impl PipelineReport {
    /// The winner, else the earliest-found backup.
    pub fn best(&self) -> Option<&str> {
        self.outcome.best()
    }
}

/// Wires the external capabilities into one lookup.
#[derive(Clone)]
pub struct LogoPipeline {
    renderer: Arc<dyn PageRenderer>,
    fetcher: Arc<dyn Fetcher>,
    uploader: Arc<dyn Uploader>,
    ranker: Arc<dyn RankSource>,
    normalizer: Arc<Normalizer>,
    config: PipelineConfig,
}

impl LogoPipeline {
    pub fn new(
        renderer: Arc<dyn PageRenderer>,
        fetcher: Arc<dyn Fetcher>,
        uploader: Arc<dyn Uploader>,
        ranker: Arc<dyn RankSource>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            renderer,
            fetcher,
            uploader,
            ranker,
            normalizer: Arc::new(Normalizer::new(config.clone())),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run a full lookup.
    ///
    /// Only an invalid request URL is an error. "No logo found" is an empty
    /// outcome in the report.
    pub async fn run(&self, request: &LogoRequest) -> LogoResult<PipelineReport> {
        let set = discover(
            self.renderer.as_ref(),
            &request.url,
            &request.name,
            &request.entity,
        )
        .await?;

        let candidates = set.into_candidates();
        tracing::info!("{} candidate(s) discovered for {}", candidates.len(), request.url);

        let urls: Vec<String> = candidates
            .iter()
            .map(|c| c.source_url.clone())
            .filter(|u| {
                let keep = AssetKind::from_url(u).is_some();
                if !keep {
                    tracing::debug!("Skipping unsupported asset {u}");
                }
                keep
            })
            .collect();

        let normalized = self.normalize_all(urls).await;
        let uploaded = self.upload_all(normalized).await;

        let description = entity_description(&request.name).to_string();
        let ranked = self.rank_all(&uploaded, &description, &request.prefix).await;

        let outcome = Disambiguator::new(&description, &request.prefix)
            .with_threshold(self.config.confidence_threshold)
            .select(&ranked);

        let deleted = self.dispose(&outcome, &uploaded).await;

        Ok(PipelineReport {
            candidates,
            uploaded,
            ranked,
            outcome,
            deleted,
        })
    }

    /// Fetch and normalize one candidate.
    pub async fn fetch_and_normalize(&self, url: &str) -> LogoResult<NormalizedImage> {
        if AssetKind::from_url(url).is_none() {
            return Err(LogoError::Unsupported(url.to_string()));
        }
        let bytes = self.fetcher.fetch(url).await?;
        let normalizer = Arc::clone(&self.normalizer);
        let owned = url.to_string();
        tokio::task::spawn_blocking(move || normalizer.normalize(&owned, &bytes))
            .await
            .map_err(|e| LogoError::Task(e.to_string()))?
    }

    async fn normalize_all(&self, urls: Vec<String>) -> Vec<(String, NormalizedImage)> {
        let results: Vec<(String, LogoResult<NormalizedImage>)> = stream::iter(urls)
            .map(|url| async move {
                let result = self.fetch_and_normalize(&url).await;
                (url, result)
            })
            .buffered(self.config.fetch_concurrency.max(1))
            .collect()
            .await;

        results
            .into_iter()
            .filter_map(|(url, result)| match result {
                Ok(img) => Some((url, img)),
                Err(e) => {
                    tracing::warn!("Skipping {url}: {e}");
                    None
                }
            })
            .collect()
    }

    async fn upload_all(&self, images: Vec<(String, NormalizedImage)>) -> Vec<UploadedImage> {
        // Distinct URLs can share an identifier; the first one found keeps it.
        let mut seen = HashSet::new();
        let images: Vec<(String, NormalizedImage)> = images
            .into_iter()
            .filter(|(source_url, img)| {
                let fresh = seen.insert(img.identifier.clone());
                if !fresh {
                    tracing::warn!(
                        "Skipping {source_url}: identifier {} already taken",
                        img.identifier
                    );
                }
                fresh
            })
            .collect();

        let results: Vec<LogoResult<UploadedImage>> = stream::iter(images)
            .map(|(source_url, img)| async move {
                let png = img.to_png()?;
                let address = self.uploader.upload(&img.identifier, png).await?;
                Ok::<_, LogoError>(UploadedImage {
                    source_url,
                    identifier: img.identifier,
                    address,
                })
            })
            .buffered(self.config.fetch_concurrency.max(1))
            .collect()
            .await;

        results
            .into_iter()
            .filter_map(|r| match r {
                Ok(u) => Some(u),
                Err(e) => {
                    tracing::warn!("Upload failed: {e}");
                    None
                }
            })
            .collect()
    }

    async fn rank_all(
        &self,
        uploaded: &[UploadedImage],
        description: &str,
        prefix: &str,
    ) -> Vec<RankedCandidate> {
        let results: Vec<LogoResult<RankedCandidate>> = stream::iter(uploaded)
            .map(|u| async move {
                let scores = self.ranker.rank(&u.address, description, prefix).await?;
                into_ranked(&u.address, scores)
            })
            .buffered(self.config.rank_concurrency.max(1))
            .collect()
            .await;

        results
            .into_iter()
            .zip(uploaded)
            .filter_map(|(r, u)| match r {
                Ok(ranked) => Some(ranked),
                Err(e) => {
                    tracing::warn!("Rank failed for {}: {e}", u.address);
                    None
                }
            })
            .collect()
    }

    async fn dispose(&self, outcome: &SelectionOutcome, uploaded: &[UploadedImage]) -> Vec<String> {
        let by_address: HashMap<&str, &str> = uploaded
            .iter()
            .map(|u| (u.address.as_str(), u.identifier.as_str()))
            .collect();

        let mut deleted = Vec::new();
        for address in &outcome.disposal {
            let Some(identifier) = by_address.get(address.as_str()) else {
                tracing::warn!("No stored object for disposal address {address}");
                continue;
            };
            match self.uploader.delete(identifier).await {
                Ok(()) => deleted.push(identifier.to_string()),
                Err(e) => tracing::error!("Failed to delete {identifier}: {e}"),
            }
        }
        deleted
    }
}
