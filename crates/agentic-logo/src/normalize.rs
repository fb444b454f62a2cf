//! Visual normalization: background inference, contrast correction, squaring.

use image::{imageops, DynamicImage, GenericImageView, Rgb, RgbImage, Rgba, RgbaImage};

use crate::background::{BackgroundStrategy, TwoMeansBackground};
use crate::identifier::identifier_for;
use crate::svg::rasterize_svg;
use crate::types::{LogoError, LogoResult, NormalizedImage, PipelineConfig};

/// What kind of asset a candidate URL points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Raster,
    Vector,
}

impl AssetKind {
    /// Classify by URL suffix. Anything outside png/jpeg/svg/webp is `None`
    /// and must not be fetched.
    pub fn from_url(url: &str) -> Option<Self> {
        let lower = url.to_ascii_lowercase();
        if lower.ends_with(".svg") {
            Some(AssetKind::Vector)
        } else if lower.ends_with(".png") || lower.ends_with(".jpeg") || lower.ends_with(".webp") {
            Some(AssetKind::Raster)
        } else {
            None
        }
    }
}

/// Keep only URLs with a supported suffix, preserving order.
pub fn filter_supported<'a, I>(urls: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    urls.into_iter()
        .filter(|u| AssetKind::from_url(u).is_some())
        .map(str::to_string)
        .collect()
}

/// Whether any pixel is less than fully opaque.
pub fn has_transparency(img: &DynamicImage) -> bool {
    if !img.color().has_alpha() {
        return false;
    }
    img.to_rgba8().pixels().any(|p| p.0[3] < u8::MAX)
}

/// Flatten an image into raw channel samples for background inference.
pub fn intensity_samples(img: &DynamicImage) -> Vec<u8> {
    if img.color().has_alpha() {
        img.to_rgba8().into_raw()
    } else {
        img.to_rgb8().into_raw()
    }
}

/// Per-channel complement of a color.
pub fn complement(color: [u8; 3]) -> [u8; 3] {
    color.map(|c| u8::MAX - c)
}

/// Composite `img` (with its alpha) over a solid `fill` canvas.
pub fn composite_over(img: &DynamicImage, fill: [u8; 3]) -> RgbImage {
    let (w, h) = img.dimensions();
    let mut canvas = RgbaImage::from_pixel(w, h, Rgba([fill[0], fill[1], fill[2], u8::MAX]));
    imageops::overlay(&mut canvas, &img.to_rgba8(), 0, 0);
    DynamicImage::ImageRgba8(canvas).to_rgb8()
}

/// Center `img` on a `fill` square of side `max(width, height)`.
pub fn make_square(img: &RgbImage, fill: [u8; 3]) -> RgbImage {
    let (w, h) = img.dimensions();
    let side = w.max(h);
    let mut canvas = RgbImage::from_pixel(side, side, Rgb(fill));
    let x = (side - w) / 2;
    let y = (side - h) / 2;
    imageops::replace(&mut canvas, img, i64::from(x), i64::from(y));
    canvas
}

/// Value at percentile `p` (0-100) of a histogram, linearly interpolated
/// between neighbouring ranks.
fn percentile(histogram: &[u64; 256], total: u64, p: f64) -> f64 {
    let rank = (p / 100.0).clamp(0.0, 1.0) * (total - 1) as f64;
    let lower = rank.floor() as u64;
    let upper = rank.ceil() as u64;

    let value_at = |target: u64| -> f64 {
        let mut seen = 0u64;
        for (value, &count) in histogram.iter().enumerate() {
            seen += count;
            if seen > target {
                return value as f64;
            }
        }
        255.0
    };

    let lo = value_at(lower);
    if upper == lower {
        return lo;
    }
    let hi = value_at(upper);
    lo + (hi - lo) * (rank - lower as f64)
}

/// Low-contrast test: the luma spread between the lower and upper
/// percentiles, as a fraction of the full 0-255 range, is below `threshold`.
///
/// The same threshold applies to grey and colour input. Colour images are
/// reduced to 8-bit luma first, not to a float grey compared over a
/// `[-1, 1]` range.
pub fn is_low_contrast(img: &DynamicImage, threshold: f64, lower_pct: f64, upper_pct: f64) -> bool {
    let luma = img.to_luma8();
    let total = luma.len() as u64;
    if total == 0 {
        return true;
    }

    let mut histogram = [0u64; 256];
    for &v in luma.as_raw() {
        histogram[v as usize] += 1;
    }

    let lo = percentile(&histogram, total, lower_pct);
    let hi = percentile(&histogram, total, upper_pct);
    (hi - lo) / 255.0 < threshold
}

/// Which branch normalization took. Useful for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    Transparent,
    LowContrast,
    None,
}

/// Normalizes candidate bytes into opaque square rasters.
pub struct Normalizer<S = TwoMeansBackground> {
    strategy: S,
    config: PipelineConfig,
}

impl Normalizer<TwoMeansBackground> {
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_strategy(config, TwoMeansBackground::default())
    }
}

impl Default for Normalizer<TwoMeansBackground> {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl<S: BackgroundStrategy> Normalizer<S> {
    pub fn with_strategy(config: PipelineConfig, strategy: S) -> Self {
        Self { strategy, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Infer the greyscale background triple.
    pub fn background_color(&self, img: &DynamicImage) -> [u8; 3] {
        let v = self.strategy.infer_background(&intensity_samples(img));
        [v, v, v]
    }

    /// Decode bytes into a working raster, rasterizing vectors first.
    pub fn decode(&self, bytes: &[u8], kind: AssetKind) -> LogoResult<DynamicImage> {
        match kind {
            AssetKind::Vector => rasterize_svg(bytes, self.config.svg_render_dpi),
            AssetKind::Raster => Ok(image::load_from_memory(bytes)?),
        }
    }

    /// Run background/contrast correction and square the result.
    ///
    /// Returns the square raster, its pad color, and the branch taken.
    pub fn correct(&self, img: &DynamicImage) -> (RgbImage, [u8; 3], Correction) {
        let bg = self.background_color(img);

        if has_transparency(img) {
            let fallback = complement(bg);
            let composited = composite_over(img, fallback);
            return (make_square(&composited, fallback), fallback, Correction::Transparent);
        }

        let low_contrast = is_low_contrast(
            img,
            self.config.contrast_threshold,
            self.config.lower_percentile,
            self.config.upper_percentile,
        );

        if low_contrast {
            let corrected = composite_over(img, complement(bg));
            let fill = self.background_color(&DynamicImage::ImageRgb8(corrected.clone()));
            (make_square(&corrected, fill), fill, Correction::LowContrast)
        } else {
            (make_square(&img.to_rgb8(), bg), bg, Correction::None)
        }
    }

    /// Normalize one candidate's bytes.
    pub fn normalize(&self, source_url: &str, bytes: &[u8]) -> LogoResult<NormalizedImage> {
        let kind = AssetKind::from_url(source_url)
            .ok_or_else(|| LogoError::Unsupported(source_url.to_string()))?;

        let img = self.decode(bytes, kind)?;
        let (width, height) = img.dimensions();
        let min = self.config.min_dimension;
        if width < min || height < min {
            return Err(LogoError::TooSmall { width, height });
        }

        let (pixels, background_color, correction) = self.correct(&img);
        tracing::debug!(
            "Normalized {source_url}: {width}x{height} -> {}px, correction {correction:?}",
            pixels.width()
        );

        Ok(NormalizedImage {
            identifier: identifier_for(source_url),
            pixels,
            background_color,
            original_width: width,
            original_height: height,
        })
    }
}
