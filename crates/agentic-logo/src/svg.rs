//! Vector rasterization.

use image::{DynamicImage, Rgba, RgbaImage};
use resvg::{tiny_skia, usvg};

use crate::types::{LogoError, LogoResult};

/// Upper bound on either edge of a rendered page.
const MAX_RENDER_EDGE: f32 = 4096.0;

/// Rasterize SVG bytes onto a white page at `dpi`.
///
/// Document units are treated as points (1/72 inch), so the page comes out
/// `dpi / 72` times the nominal size, capped at [`MAX_RENDER_EDGE`].
pub fn rasterize_svg(bytes: &[u8], dpi: f32) -> LogoResult<DynamicImage> {
    let tree = usvg::Tree::from_data(bytes, &usvg::Options::default())
        .map_err(|e| LogoError::Rasterize(format!("Invalid SVG: {e}")))?;

    let size = tree.size();
    let mut scale = dpi / 72.0;
    let longest = size.width().max(size.height()) * scale;
    if longest > MAX_RENDER_EDGE {
        scale *= MAX_RENDER_EDGE / longest;
    }

    let width = (size.width() * scale).ceil().max(1.0) as u32;
    let height = (size.height() * scale).ceil().max(1.0) as u32;

    let mut pixmap = tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| LogoError::Rasterize(format!("Cannot allocate {width}x{height} page")))?;
    pixmap.fill(tiny_skia::Color::WHITE);
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );

    let mut rgba = RgbaImage::new(width, height);
    for (dst, src) in rgba.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }

    Ok(DynamicImage::ImageRgba8(rgba))
}
