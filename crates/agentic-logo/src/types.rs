//! Core data types for logo candidates, normalized images, and selection.

use std::collections::BTreeSet;
use std::fmt;

use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Default entity kind matched against alt text.
pub const DEFAULT_ENTITY: &str = "logo";

/// Default prompt prefix placed before the entity name.
pub const DEFAULT_PREFIX: &str = "the logo of";

/// Structural location a candidate was found under. Diagnostic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginTag {
    Header,
    Footer,
    Head,
    LinkRel,
    MetaOg,
    AltTextMatch,
}

impl fmt::Display for OriginTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OriginTag::Header => "header",
            OriginTag::Footer => "footer",
            OriginTag::Head => "head",
            OriginTag::LinkRel => "link_rel",
            OriginTag::MetaOg => "meta_og",
            OriginTag::AltTextMatch => "alt_text_match",
        };
        f.write_str(s)
    }
}

/// A discovered image reference before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Absolute URL, resolved against the page URL at discovery time.
    pub source_url: String,
    pub origin_tags: BTreeSet<OriginTag>,
}

/// A candidate after square padding and background/contrast correction.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    /// Storage key derived from the source URL.
    pub identifier: String,
    /// Opaque, square RGB raster.
    pub pixels: RgbImage,
    /// Fill tone used for padding.
    pub background_color: [u8; 3],
    pub original_width: u32,
    pub original_height: u32,
}

impl NormalizedImage {
    /// Side length of the square raster.
    pub fn size(&self) -> u32 {
        self.pixels.width()
    }

    /// Encode the raster as PNG bytes for upload.
    pub fn to_png(&self) -> LogoResult<Vec<u8>> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        self.pixels.write_with_encoder(encoder)?;
        Ok(buf)
    }
}

/// One (prompt, score) entry returned by a rank source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptScore {
    pub prompt_text: String,
    pub similarity_score: f64,
    pub cosine_score: f64,
}

impl PromptScore {
    pub fn new(prompt_text: impl Into<String>, similarity_score: f64, cosine_score: f64) -> Self {
        Self {
            prompt_text: prompt_text.into(),
            similarity_score,
            cosine_score,
        }
    }
}

/// The semantic evaluation of one uploaded normalized image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    /// Externally addressable location of the uploaded image.
    pub address: String,
    /// Best and second-best prompt matches, most similar first.
    pub top_two: [PromptScore; 2],
}

impl RankedCandidate {
    pub fn top(&self) -> &PromptScore {
        &self.top_two[0]
    }

    pub fn second(&self) -> &PromptScore {
        &self.top_two[1]
    }
}

/// Result of disambiguation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionOutcome {
    pub winner: Option<String>,
    /// Name matches below the confidence bar, most recently found first.
    pub backups: Vec<String>,
    /// Addresses of non-winning candidates to delete once a winner exists.
    pub disposal: Vec<String>,
}

impl SelectionOutcome {
    /// True when neither a winner nor a backup emerged.
    pub fn is_empty(&self) -> bool {
        self.winner.is_none() && self.backups.is_empty()
    }

    /// The winner, else the earliest-found backup.
    pub fn best(&self) -> Option<&str> {
        self.winner
            .as_deref()
            .or_else(|| self.backups.last().map(String::as_str))
    }
}

/// Inputs for one logo lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoRequest {
    pub url: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_entity")]
    pub entity: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl LogoRequest {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            entity: default_entity(),
            prefix: default_prefix(),
        }
    }
}

fn default_entity() -> String {
    DEFAULT_ENTITY.to_string()
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

/// Tunables for discovery, normalization, and ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Minimum width and height, in pixels, for a usable logo.
    pub min_dimension: u32,
    pub fetch_concurrency: usize,
    pub rank_concurrency: usize,
    pub timeout_ms: u64,
    /// Percentile spread below which an image counts as low contrast.
    pub contrast_threshold: f64,
    pub lower_percentile: f64,
    pub upper_percentile: f64,
    /// Top score that alone confirms a name match as the winner.
    pub confidence_threshold: f64,
    pub svg_render_dpi: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_dimension: 30,
            fetch_concurrency: 8,
            rank_concurrency: 4,
            timeout_ms: 15_000,
            contrast_threshold: 0.3,
            lower_percentile: 1.0,
            upper_percentile: 99.0,
            confidence_threshold: 0.87,
            svg_render_dpi: 200.0,
        }
    }
}

/// Errors that can occur in the logo library.
#[derive(thiserror::Error, Debug)]
pub enum LogoError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported asset: {0}")]
    Unsupported(String),

    #[error("Image too small: {width}x{height}")]
    TooSmall { width: u32, height: u32 },

    #[error("Rasterization error: {0}")]
    Rasterize(String),

    #[error("Rank error: {0}")]
    Rank(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Task error: {0}")]
    Task(String),
}

impl From<reqwest::Error> for LogoError {
    fn from(e: reqwest::Error) -> Self {
        LogoError::Http(e.to_string())
    }
}

/// Convenience result type.
pub type LogoResult<T> = Result<T, LogoError>;
