//! AgenticLogo: find the canonical logo image for a named entity from its web page.

pub mod background;
pub mod disambiguate;
pub mod discovery;
pub mod fetch;
pub mod identifier;
pub mod normalize;
pub mod pipeline;
pub mod rank;
pub mod storage;
pub mod svg;
pub mod types;

pub use background::{BackgroundStrategy, TwoMeansBackground};
pub use disambiguate::{select, Disambiguator, Verdict};
pub use discovery::{discover, extract_candidates, CandidateSet};
pub use fetch::{Fetcher, HttpFetcher, PageRenderer, RenderedPage};
pub use identifier::identifier_for;
pub use normalize::{AssetKind, Normalizer};
pub use pipeline::{LogoPipeline, PipelineReport, UploadedImage};
pub use rank::{rank_prompts, HttpRankSource, RankSource};
pub use storage::{LocalDirStore, Uploader};
pub use svg::rasterize_svg;
pub use types::*;
