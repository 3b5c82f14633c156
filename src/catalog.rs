//! Asset catalog discovery and loading.
//!
//! The catalog is a per-category list of [`AssetSource`]s. It is produced
//! once, at start, by [`load_assets`] from any [`AssetFetcher`]:
//!
//! - [`DirFetcher`] reads `<root>/<category dir>/*.svg` from disk
//! - [`MemoryFetcher`] serves assets bundled into the binary
//!
//! # Example
//!
//! ```
//! use emoji_composer::{load_assets, Category, MemoryFetcher};
//!
//! let fetcher = MemoryFetcher::new()
//!     .with_asset(Category::Head, "round.svg", "<svg/>")
//!     .with_asset(Category::Eyes, "dots.svg", "<svg/>");
//!
//! let assets = futures::executor::block_on(load_assets(&fetcher)).unwrap();
//! assert_eq!(assets.len(Category::Head), 1);
//! assert_eq!(assets.len(Category::Eyes), 2); // "none" + dots
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

use crate::category::{Category, PerCategory};
use crate::error::CatalogError;

// ============================================================================
// AssetSource
// ============================================================================

/// Identifier of a fetchable image.
///
/// The empty source is the "none" entry of optional layers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(transparent)]
pub struct AssetSource(String);

impl AssetSource {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    /// The "none" sentinel.
    pub fn none() -> Self {
        Self(String::new())
    }

    /// Returns true for the "none" sentinel.
    pub fn is_none(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            f.write_str("<none>")
        } else {
            f.write_str(&self.0)
        }
    }
}

impl From<&str> for AssetSource {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AssetSource {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ============================================================================
// AssetSet
// ============================================================================

/// The selectable images of every category.
///
/// Optional categories start with [`AssetSource::none`]; the head never does.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssetSet {
    entries: PerCategory<Vec<AssetSource>>,
}

impl AssetSet {
    /// Builds a catalog from discovered sources, adding the "none" entries.
    pub fn from_discovered(mut discovered: PerCategory<Vec<AssetSource>>) -> Self {
        for category in Category::ALL {
            let list = &mut discovered[category];
            list.retain(|s| !s.is_none());
            if category.is_optional() {
                list.insert(0, AssetSource::none());
            }
        }
        Self {
            entries: discovered,
        }
    }

    /// A catalog with no images at all, only the "none" entries.
    pub fn empty() -> Self {
        Self::from_discovered(PerCategory::default())
    }

    /// The ordered entries of a category.
    pub fn get(&self, category: Category) -> &[AssetSource] {
        &self.entries[category]
    }

    /// Number of entries of a category, including "none".
    pub fn len(&self, category: Category) -> usize {
        self.entries[category].len()
    }

    /// Returns true when no category holds a real image.
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|(_, list)| list.iter().all(AssetSource::is_none))
    }

    /// Resolves an index, treating out-of-range as "none".
    pub fn source(&self, category: Category, index: usize) -> AssetSource {
        self.entries[category]
            .get(index)
            .cloned()
            .unwrap_or_default()
    }

    /// Finds the index of a source within a category.
    pub fn position(&self, category: Category, source: &AssetSource) -> Option<usize> {
        self.entries[category].iter().position(|s| s == source)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &[AssetSource])> {
        self.entries.iter().map(|(c, list)| (c, list.as_slice()))
    }
}

// ============================================================================
// AssetFetcher
// ============================================================================

/// Source of catalog entries and their bytes.
///
/// Runs on a single thread; implementations may hold non-`Send` state.
#[async_trait(?Send)]
pub trait AssetFetcher {
    /// Lists the sources of one category, in presentation order.
    async fn discover(&self, category: Category) -> Result<Vec<AssetSource>, CatalogError>;

    /// Fetches the raw bytes of a source.
    async fn fetch(&self, source: &AssetSource) -> Result<Vec<u8>, CatalogError>;
}

/// Loads the full catalog.
///
/// The five categories load concurrently. Every discovered source is fetched
/// once to prove it resolvable; the first failure aborts the load.
#[tracing::instrument(skip(fetcher))]
pub async fn load_assets(fetcher: &dyn AssetFetcher) -> Result<AssetSet, CatalogError> {
    let lists = try_join_all(
        Category::ALL
            .into_iter()
            .map(|category| load_category(fetcher, category)),
    )
    .await?;

    let mut lists = lists.into_iter();
    let discovered = PerCategory::from_fn(|_| lists.next().unwrap_or_default());
    let assets = AssetSet::from_discovered(discovered);

    tracing::info!(
        head = assets.len(Category::Head),
        eyes = assets.len(Category::Eyes),
        eyebrows = assets.len(Category::Eyebrows),
        mouth = assets.len(Category::Mouth),
        detail = assets.len(Category::Detail),
        "asset catalog loaded"
    );
    Ok(assets)
}

async fn load_category(
    fetcher: &dyn AssetFetcher,
    category: Category,
) -> Result<Vec<AssetSource>, CatalogError> {
    let sources = fetcher.discover(category).await?;
    try_join_all(sources.iter().map(|source| fetcher.fetch(source))).await?;
    tracing::debug!(%category, count = sources.len(), "category resolved");
    Ok(sources)
}

// ============================================================================
// DirFetcher
// ============================================================================

/// Catalog rooted at a directory with one sub-directory per category.
///
/// ```text
/// assets/
/// ├── head/*.svg
/// ├── eyes/*.svg
/// ├── eyebrows/*.svg
/// ├── mouth/*.svg
/// └── details/*.svg
/// ```
#[derive(Debug, Clone)]
pub struct DirFetcher {
    root: PathBuf,
}

impl DirFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn is_svg(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"))
}

#[async_trait(?Send)]
impl AssetFetcher for DirFetcher {
    async fn discover(&self, category: Category) -> Result<Vec<AssetSource>, CatalogError> {
        if !self.root.is_dir() {
            return Err(CatalogError::RootNotFound(self.root.clone()));
        }

        let dir = self.root.join(category.dir_name());
        if !dir.is_dir() {
            tracing::debug!(%category, dir = %dir.display(), "category directory missing");
            return Ok(Vec::new());
        }

        let discover_err = |source| CatalogError::Discover { category, source };
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&dir).map_err(discover_err)? {
            let path = entry.map_err(discover_err)?.path();
            if path.is_file()
                && is_svg(&path)
                && let Some(name) = path.file_name().and_then(|n| n.to_str())
            {
                names.push(name.to_string());
            }
        }
        names.sort();

        Ok(names
            .into_iter()
            .map(|name| AssetSource::new(format!("{}/{}", category.dir_name(), name)))
            .collect())
    }

    async fn fetch(&self, source: &AssetSource) -> Result<Vec<u8>, CatalogError> {
        let path = self.root.join(source.as_str());
        std::fs::read(&path).map_err(|e| CatalogError::Fetch {
            asset: source.to_string(),
            source: e,
        })
    }
}

// ============================================================================
// MemoryFetcher
// ============================================================================

/// Catalog held in memory, for bundled assets and tests.
///
/// Discovery returns sources in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    order: PerCategory<Vec<AssetSource>>,
    bytes: HashMap<AssetSource, Vec<u8>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an asset under `<category dir>/<name>` and returns its source.
    pub fn insert(
        &mut self,
        category: Category,
        name: &str,
        data: impl Into<Vec<u8>>,
    ) -> AssetSource {
        let source = AssetSource::new(format!("{}/{}", category.dir_name(), name));
        if self.bytes.insert(source.clone(), data.into()).is_none() {
            self.order[category].push(source.clone());
        }
        source
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_asset(mut self, category: Category, name: &str, data: impl Into<Vec<u8>>) -> Self {
        self.insert(category, name, data);
        self
    }

    /// Drops the bytes of a source while keeping it discoverable.
    ///
    /// Subsequent fetches of that source fail.
    pub fn forget(&mut self, source: &AssetSource) {
        self.bytes.remove(source);
    }
}

#[async_trait(?Send)]
impl AssetFetcher for MemoryFetcher {
    async fn discover(&self, category: Category) -> Result<Vec<AssetSource>, CatalogError> {
        Ok(self.order[category].clone())
    }

    async fn fetch(&self, source: &AssetSource) -> Result<Vec<u8>, CatalogError> {
        self.bytes
            .get(source)
            .cloned()
            .ok_or_else(|| CatalogError::MissingAsset(source.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    const SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="4" height="4"/>"#;

    fn sample_fetcher() -> MemoryFetcher {
        MemoryFetcher::new()
            .with_asset(Category::Head, "h1.svg", SVG)
            .with_asset(Category::Head, "h2.svg", SVG)
            .with_asset(Category::Eyes, "e1.svg", SVG)
            .with_asset(Category::Detail, "d1.svg", SVG)
    }

    #[test]
    fn none_sentinel_only_for_optional_layers() {
        let assets = block_on(load_assets(&sample_fetcher())).unwrap();

        assert!(!assets.get(Category::Head)[0].is_none());
        assert_eq!(assets.get(Category::Head)[0].as_str(), "head/h1.svg");
        for category in Category::ALL.into_iter().filter(|c| c.is_optional()) {
            assert!(assets.get(category)[0].is_none(), "{category} should start with none");
        }
    }

    #[test]
    fn discovery_order_is_preserved() {
        let assets = block_on(load_assets(&sample_fetcher())).unwrap();
        let heads: Vec<_> = assets.get(Category::Head).iter().map(|s| s.as_str()).collect();
        assert_eq!(heads, ["head/h1.svg", "head/h2.svg"]);
        assert_eq!(assets.get(Category::Detail)[1].as_str(), "details/d1.svg");
        assert_eq!(assets.len(Category::Mouth), 1);
    }

    #[test]
    fn load_fails_fast_on_unfetchable_asset() {
        let mut fetcher = sample_fetcher();
        fetcher.forget(&AssetSource::new("eyes/e1.svg"));

        let err = block_on(load_assets(&fetcher)).unwrap_err();
        assert!(matches!(err, CatalogError::MissingAsset(ref s) if s == "eyes/e1.svg"));
    }

    #[test]
    fn empty_catalog_has_only_sentinels() {
        let assets = AssetSet::empty();
        assert!(assets.is_empty());
        assert_eq!(assets.len(Category::Head), 0);
        assert_eq!(assets.len(Category::Eyes), 1);
        assert!(assets.source(Category::Head, 0).is_none());
    }

    #[test]
    fn position_finds_sources() {
        let assets = block_on(load_assets(&sample_fetcher())).unwrap();
        assert_eq!(
            assets.position(Category::Head, &AssetSource::new("head/h2.svg")),
            Some(1)
        );
        assert_eq!(assets.position(Category::Eyes, &AssetSource::none()), Some(0));
        assert_eq!(assets.position(Category::Eyes, &"eyes/nope.svg".into()), None);
    }

    #[test]
    fn dir_fetcher_lists_sorted_svgs() {
        let root = tempfile::tempdir().unwrap();
        let head = root.path().join("head");
        let details = root.path().join("details");
        std::fs::create_dir_all(&head).unwrap();
        std::fs::create_dir_all(&details).unwrap();
        std::fs::write(head.join("b.svg"), SVG).unwrap();
        std::fs::write(head.join("a.SVG"), SVG).unwrap();
        std::fs::write(head.join("notes.txt"), "skip me").unwrap();
        std::fs::write(details.join("star.svg"), SVG).unwrap();

        let fetcher = DirFetcher::new(root.path());
        let assets = block_on(load_assets(&fetcher)).unwrap();

        let heads: Vec<_> = assets.get(Category::Head).iter().map(|s| s.as_str()).collect();
        assert_eq!(heads, ["head/a.SVG", "head/b.svg"]);
        assert_eq!(assets.get(Category::Detail)[1].as_str(), "details/star.svg");
        // Missing category directories are empty, not errors.
        assert_eq!(assets.len(Category::Mouth), 1);

        let bytes = block_on(fetcher.fetch(&AssetSource::new("head/b.svg"))).unwrap();
        assert_eq!(bytes, SVG.as_bytes());
    }

    #[test]
    fn dir_fetcher_missing_root_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let fetcher = DirFetcher::new(root.path().join("nope"));
        let err = block_on(load_assets(&fetcher)).unwrap_err();
        assert!(matches!(err, CatalogError::RootNotFound(_)));
    }
}
