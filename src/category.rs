//! The fixed set of avatar layers and their stacking order.

use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// Category
// ============================================================================

/// One of the five avatar layers.
///
/// Declaration order is the stacking order: [`Category::Head`] is drawn first
/// (bottom) and [`Category::Detail`] last (top).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Head,
    Eyes,
    Eyebrows,
    Mouth,
    Detail,
}

impl Category {
    /// All categories in stacking order, bottom to top.
    pub const ALL: [Category; 5] = [
        Category::Head,
        Category::Eyes,
        Category::Eyebrows,
        Category::Mouth,
        Category::Detail,
    ];

    /// Position of this category in the stacking order.
    pub fn z_index(self) -> usize {
        self as usize
    }

    /// Lowercase name used in JSON, CLI arguments and logs.
    pub fn name(self) -> &'static str {
        match self {
            Category::Head => "head",
            Category::Eyes => "eyes",
            Category::Eyebrows => "eyebrows",
            Category::Mouth => "mouth",
            Category::Detail => "detail",
        }
    }

    /// Directory holding this category's assets under the catalog root.
    ///
    /// The detail layer lives in `details/`.
    pub fn dir_name(self) -> &'static str {
        match self {
            Category::Detail => "details",
            other => other.name(),
        }
    }

    /// Whether the layer may be switched off.
    ///
    /// Every layer except the head gets a leading "none" entry in the catalog.
    pub fn is_optional(self) -> bool {
        self != Category::Head
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown category name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category '{0}' (expected head, eyes, eyebrows, mouth or detail)")]
pub struct ParseCategoryError(String);

impl FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.name() == lowered || c.dir_name() == lowered)
            .ok_or_else(|| ParseCategoryError(s.to_string()))
    }
}

// ============================================================================
// PerCategory
// ============================================================================

/// A value for each [`Category`], indexable by category.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PerCategory<T>([T; 5]);

impl<T> PerCategory<T> {
    /// Builds the map by calling `f` once per category, in stacking order.
    pub fn from_fn(mut f: impl FnMut(Category) -> T) -> Self {
        Self(Category::ALL.map(&mut f))
    }

    /// Iterates `(category, value)` pairs in stacking order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &T)> {
        Category::ALL.into_iter().zip(self.0.iter())
    }

    /// Applies `f` to every value, keeping the category association.
    pub fn map<U>(&self, mut f: impl FnMut(Category, &T) -> U) -> PerCategory<U> {
        PerCategory::from_fn(|c| f(c, &self.0[c.z_index()]))
    }
}

impl<T> Index<Category> for PerCategory<T> {
    type Output = T;

    fn index(&self, category: Category) -> &T {
        &self.0[category.z_index()]
    }
}

impl<T> IndexMut<Category> for PerCategory<T> {
    fn index_mut(&mut self, category: Category) -> &mut T {
        &mut self.0[category.z_index()]
    }
}
