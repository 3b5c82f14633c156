//! SVG rasterization and source-over blending using resvg.

use image::{Rgba, RgbaImage};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{Options, Tree};

/// Failure to turn SVG bytes into pixels.
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("invalid svg: {0}")]
    Parse(#[from] resvg::usvg::Error),

    #[error("cannot allocate a {0}x{0} surface")]
    Surface(u32),
}

// ============================================================================
// Rasterization
// ============================================================================

/// Renders SVG data stretched to fill a `size x size` square.
///
/// Width and height scale independently, so the document's viewport always
/// covers the whole square regardless of its aspect ratio.
pub fn render_svg_fill(svg_data: &[u8], size: u32) -> Result<RgbaImage, RasterError> {
    let tree = Tree::from_data(svg_data, &Options::default())?;
    let mut pixmap = Pixmap::new(size, size).ok_or(RasterError::Surface(size))?;

    let extent = tree.size();
    let stretch = Transform::from_scale(
        size as f32 / extent.width(),
        size as f32 / extent.height(),
    );
    resvg::render(&tree, stretch, &mut pixmap.as_mut());

    Ok(straight_alpha(&pixmap))
}

/// Copies a premultiplied pixmap into a straight-alpha image.
fn straight_alpha(pixmap: &Pixmap) -> RgbaImage {
    let mut raw = Vec::with_capacity(pixmap.data().len());
    for px in pixmap.pixels() {
        let c = px.demultiply();
        raw.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    // Length is width * height * 4 by construction.
    RgbaImage::from_raw(pixmap.width(), pixmap.height(), raw)
        .unwrap_or_else(|| RgbaImage::new(pixmap.width(), pixmap.height()))
}

// ============================================================================
// Blending
// ============================================================================

/// Paints `layer` over `dest`, pixel for pixel.
///
/// Both images must have the same dimensions; extra pixels of the larger one
/// are ignored.
pub fn blend_layer(dest: &mut RgbaImage, layer: &RgbaImage) {
    let width = dest.width().min(layer.width());
    let height = dest.height().min(layer.height());
    for y in 0..height {
        for x in 0..width {
            let top = *layer.get_pixel(x, y);
            if top[3] == 0 {
                continue;
            }
            let under = dest.get_pixel_mut(x, y);
            *under = source_over(top, *under);
        }
    }
}

/// Porter-Duff source-over on straight-alpha pixels.
fn source_over(top: Rgba<u8>, under: Rgba<u8>) -> Rgba<u8> {
    if top[3] == 255 {
        return top;
    }
    let alpha_top = f32::from(top[3]) / 255.0;
    let alpha_under = f32::from(under[3]) / 255.0 * (1.0 - alpha_top);
    let alpha = alpha_top + alpha_under;
    if alpha <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let mut out = [0u8; 4];
    for (channel, slot) in out.iter_mut().take(3).enumerate() {
        let mixed = f32::from(top[channel]) * alpha_top + f32::from(under[channel]) * alpha_under;
        *slot = (mixed / alpha).round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (alpha * 255.0).round() as u8;
    Rgba(out)
}
