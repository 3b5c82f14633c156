//! Serializable composition profile.
//!
//! A [`ComposerProfile`] records the chosen image of each layer by source
//! path rather than by index, so a saved profile survives catalogs that gain
//! or reorder files.
//!
//! # Example
//!
//! ```
//! use emoji_composer::{Category, ComposerProfile};
//!
//! let profile = ComposerProfile::new()
//!     .with_selection(Category::Head, "head/round.svg")
//!     .with_selection(Category::Detail, "");
//!
//! let json = profile.to_json().unwrap();
//! let restored = ComposerProfile::from_json(&json).unwrap();
//! assert_eq!(restored, profile);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{AssetSet, AssetSource};
use crate::category::Category;
use crate::compositor::RenderFuture;
use crate::selection::CurrentComposition;

// ============================================================================
// Configurable Trait
// ============================================================================

/// Types whose selection can be driven by a [`ComposerProfile`].
pub trait Configurable {
    /// Applies a profile and starts rendering the result.
    fn apply_profile(&self, profile: &ComposerProfile) -> RenderFuture<'_>;

    /// Captures the current selection as a profile.
    fn export_profile(&self) -> ComposerProfile;
}

// ============================================================================
// ComposerProfile
// ============================================================================

/// Selected source per category.
///
/// # JSON Format
///
/// ```json
/// {
///   "selections": {
///     "head": "head/round.svg",
///     "eyes": "eyes/wide.svg",
///     "detail": ""
///   }
/// }
/// ```
///
/// An empty string selects "none" for an optional layer. Categories that are
/// not listed keep their current selection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct ComposerProfile {
    #[serde(default)]
    pub selections: BTreeMap<Category, AssetSource>,
}

impl ComposerProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures every layer of a composition.
    pub fn from_composition(composition: &CurrentComposition) -> Self {
        Self {
            selections: composition
                .iter()
                .map(|(category, source)| (category, source.clone()))
                .collect(),
        }
    }

    pub fn with_selection(mut self, category: Category, source: impl Into<AssetSource>) -> Self {
        self.selections.insert(category, source.into());
        self
    }

    pub fn get(&self, category: Category) -> Option<&AssetSource> {
        self.selections.get(&category)
    }

    /// Maps each listed source to its index in `assets`.
    ///
    /// Sources the catalog does not contain are dropped with a warning.
    pub fn resolve(&self, assets: &AssetSet) -> Vec<(Category, usize)> {
        self.selections
            .iter()
            .filter_map(|(&category, source)| match assets.position(category, source) {
                Some(index) => Some((category, index)),
                None => {
                    tracing::warn!(%category, %source, "profile entry not in catalog, ignored");
                    None
                }
            })
            .collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// ============================================================================
// Tests
// ============================================================================
