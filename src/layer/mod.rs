//! Rasterized layer cache.
//!
//! A render cycle turns every selected [`AssetSource`] into a full-canvas
//! raster, or into nothing (empty source, failed fetch, or undecodable SVG).
//! Successful rasters are cached per source and size, so switching back to a
//! previously shown image does not re-rasterize it.

pub mod svg;

use std::collections::HashMap;
use std::sync::Arc;

use image::RgbaImage;

use crate::catalog::AssetSource;

/// Key for cached rasters: the source and the square size it was rendered at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    source: AssetSource,
    size: u32,
}

impl CacheKey {
    pub fn new(source: AssetSource, size: u32) -> Self {
        Self { source, size }
    }
}

#[derive(Debug, Default)]
pub struct RasterCache {
    entries: HashMap<CacheKey, Arc<RgbaImage>>,
}

impl RasterCache {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<RgbaImage>> {
        self.entries.get(key).cloned()
    }

    pub fn store(&mut self, key: CacheKey, image: Arc<RgbaImage>) {
        self.entries.insert(key, image);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
