//! Per-category selection and the derived current composition.

use rand::Rng;

use crate::catalog::{AssetSet, AssetSource};
use crate::category::{Category, PerCategory};
use crate::error::SelectionError;

/// The image chosen for every layer, derived from a catalog and a selection.
///
/// Optional layers may hold [`AssetSource::none`].
pub type CurrentComposition = PerCategory<AssetSource>;

/// Draws a uniform integer in `[min, max]`, both bounds inclusive.
///
/// Computed as `floor(u * (max - min + 1)) + min` with `u` uniform in `[0, 1)`.
/// Returns `min` when `max < min`.
pub fn random_int<R: Rng>(rng: &mut R, min: usize, max: usize) -> usize {
    if max < min {
        return min;
    }
    let span = (max - min + 1) as f64;
    let offset = (rng.random::<f64>() * span).floor() as usize;
    min + offset.min(max - min)
}

/// The chosen index of every category.
///
/// Indices stay in range for the catalog they were validated against. A
/// category with no entries keeps index 0, which resolves to "none".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionState {
    indices: PerCategory<usize>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index currently chosen for a category.
    pub fn index(&self, category: Category) -> usize {
        self.indices[category]
    }

    /// Sets one category's index, leaving the others unchanged.
    ///
    /// Returns true if the index changed.
    pub fn set_selection(
        &mut self,
        assets: &AssetSet,
        category: Category,
        index: usize,
    ) -> Result<bool, SelectionError> {
        let len = assets.len(category);
        if index >= len {
            return Err(SelectionError::OutOfRange {
                category,
                index,
                len,
            });
        }
        let changed = self.indices[category] != index;
        self.indices[category] = index;
        Ok(changed)
    }

    /// Independently draws a uniform index for every category.
    pub fn randomize<R: Rng>(&mut self, assets: &AssetSet, rng: &mut R) {
        for category in Category::ALL {
            let len = assets.len(category);
            self.indices[category] = random_int(rng, 0, len.saturating_sub(1));
        }
    }

    /// Derives the composition for this selection.
    pub fn current_composition(&self, assets: &AssetSet) -> CurrentComposition {
        PerCategory::from_fn(|category| assets.source(category, self.indices[category]))
    }

    /// Iterates `(category, index)` in stacking order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, usize)> + '_ {
        self.indices.iter().map(|(c, i)| (c, *i))
    }
}
