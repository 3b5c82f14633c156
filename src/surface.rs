//! The square drawing surface layers are composited onto.

use image::{Rgba, RgbaImage};

use crate::layer::svg::blend_layer;

/// Default internal resolution of the canvas, independent of display size.
pub const DEFAULT_CANVAS_SIZE: u32 = 640;

/// Largest canvas side accepted; larger requests are clamped.
pub const MAX_CANVAS_SIZE: u32 = 8192;

/// Fixed-size RGBA canvas.
///
/// Starts fully transparent. Layers are drawn with source-over blending, so
/// later draws paint over earlier ones wherever they are opaque.
#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    data: RgbaImage,
}

impl Canvas {
    /// Creates a transparent square canvas.
    ///
    /// `side` is clamped to [`MAX_CANVAS_SIZE`].
    pub fn new(side: u32) -> Self {
        let side = side.min(MAX_CANVAS_SIZE);
        Self {
            data: RgbaImage::new(side, side),
        }
    }

    /// Side length in pixels.
    pub fn side(&self) -> u32 {
        self.data.width()
    }

    /// Resets every pixel to transparent.
    pub fn clear(&mut self) {
        for pixel in self.data.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    /// Draws a full-canvas layer over the current contents.
    ///
    /// The layer must already be rasterized at the canvas size.
    pub fn draw(&mut self, layer: &RgbaImage) {
        debug_assert_eq!(layer.dimensions(), self.data.dimensions());
        blend_layer(&mut self.data, layer);
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.data.get_pixel(x, y).0
    }

    /// The underlying pixel buffer.
    pub fn image(&self) -> &RgbaImage {
        &self.data
    }

    /// Returns true when no pixel has any coverage.
    pub fn is_blank(&self) -> bool {
        self.data.pixels().all(|p| p[3] == 0)
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(DEFAULT_CANVAS_SIZE)
    }
}
