//! emoji-composer: layered avatar composition library
//!
//! This crate loads layered SVG artwork grouped into five categories
//! (head, eyes, eyebrows, mouth, detail), composes one image per category onto
//! a square canvas, and exports the result as PNG or as a merged SVG.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use emoji_composer::{Category, Composer, ComposerConfig, MemoryFetcher};
//!
//! let fetcher = MemoryFetcher::new()
//!     .with_asset(
//!         Category::Head,
//!         "round.svg",
//!         r#"<svg xmlns="http://www.w3.org/2000/svg" width="4" height="4"><circle cx="2" cy="2" r="2"/></svg>"#,
//!     )
//!     .with_asset(Category::Eyes, "dots.svg", "<svg xmlns=\"http://www.w3.org/2000/svg\"/>");
//!
//! let config = ComposerConfig::new().with_canvas_size(64).with_seed(1);
//! futures::executor::block_on(async {
//!     let composer = Composer::start(config, Rc::new(fetcher)).await.unwrap();
//!
//!     // Pick "dots" for the eyes layer (index 0 is "none").
//!     composer.set_selection(Category::Eyes, 1).unwrap().await;
//!
//!     let png = composer.export_png().unwrap();
//!     assert!(png.file_name.ends_with(".png"));
//! });
//! ```
//!
//! # Serializable Profiles
//!
//! Selections can be saved and restored by source path with
//! [`ComposerProfile`] and the [`Configurable`] trait:
//!
//! ```
//! use std::rc::Rc;
//! use emoji_composer::{
//!     AssetSet, Category, Composer, ComposerConfig, ComposerProfile, Configurable, MemoryFetcher,
//! };
//!
//! let composer = Composer::with_assets(
//!     ComposerConfig::default(),
//!     Rc::new(MemoryFetcher::new()),
//!     AssetSet::empty(),
//! );
//!
//! let json = composer.export_profile().to_json().unwrap();
//! let profile = ComposerProfile::from_json(&json).unwrap();
//! futures::executor::block_on(composer.apply_profile(&profile));
//! assert!(profile.get(Category::Head).is_some());
//! ```

mod catalog;
mod category;
mod composer;
mod compositor;
mod config;
mod error;
mod export;
mod layer;
mod profile;
mod selection;
mod surface;

pub use catalog::{AssetFetcher, AssetSet, AssetSource, DirFetcher, MemoryFetcher, load_assets};
pub use category::{Category, ParseCategoryError, PerCategory};
pub use composer::{Composer, ComposerEvent, SubscriptionId};
pub use compositor::{Compositor, RenderFuture, RenderOutcome, RenderPolicy};
pub use config::{CatalogPolicy, ComposerConfig};
pub use error::{
    CatalogError, ComposerError, ComposerResult, ConfigError, ExportError, SelectionError,
};
pub use export::{
    DEFAULT_SVG_EXPORT_SIZE, DirectorySink, DownloadSink, ExportFile, ExportFormat, export_png,
    export_svg,
};
pub use layer::svg::{RasterError, render_svg_fill};
pub use layer::{CacheKey, RasterCache};
pub use profile::{ComposerProfile, Configurable};
pub use selection::{CurrentComposition, SelectionState, random_int};
pub use surface::{Canvas, DEFAULT_CANVAS_SIZE, MAX_CANVAS_SIZE};
