//! Draws the current composition onto the shared canvas.
//!
//! Each call to [`Compositor::render`] starts a *render cycle*:
//!
//! 1. The cycle is tagged with the next sequence number, at request time.
//! 2. The five selected layers load concurrently. Empty sources, failed
//!    fetches and undecodable SVGs all resolve to "no image".
//! 3. Once all five have settled, the canvas is cleared and the layers are
//!    drawn head → eyes → eyebrows → mouth → detail in one synchronous burst.
//!
//! Step 3 never interleaves with another cycle, so the canvas never shows a
//! half-updated composition. Which of several overlapping cycles ends up on
//! screen depends on the [`RenderPolicy`].

use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{LocalBoxFuture, join_all};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::catalog::{AssetFetcher, AssetSource};
use crate::category::Category;
use crate::layer::svg::render_svg_fill;
use crate::layer::{CacheKey, RasterCache};
use crate::selection::CurrentComposition;
use crate::surface::Canvas;

/// Future of one render cycle.
pub type RenderFuture<'a> = LocalBoxFuture<'a, RenderOutcome>;

/// How overlapping render cycles resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "kebab-case")]
pub enum RenderPolicy {
    /// Only the most recently requested cycle draws; older cycles that settle
    /// later are dropped.
    #[default]
    LatestRequested,
    /// Every cycle draws when it settles; the last one to settle wins.
    LastSettled,
}

/// Result of a render cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The cycle drew `layers` non-empty layers onto the canvas.
    Drawn { sequence: u64, layers: usize },
    /// A newer cycle was requested before this one settled; nothing was drawn.
    Superseded { sequence: u64, latest: u64 },
}

impl RenderOutcome {
    pub fn sequence(&self) -> u64 {
        match *self {
            RenderOutcome::Drawn { sequence, .. } | RenderOutcome::Superseded { sequence, .. } => {
                sequence
            }
        }
    }

    pub fn is_drawn(&self) -> bool {
        matches!(self, RenderOutcome::Drawn { .. })
    }
}

/// Sole writer of the canvas.
pub struct Compositor {
    fetcher: Rc<dyn AssetFetcher>,
    policy: RenderPolicy,
    canvas: RefCell<Canvas>,
    cache: RefCell<RasterCache>,
    requested: Cell<u64>,
    drawn: Cell<Option<u64>>,
    drawn_composition: RefCell<Option<CurrentComposition>>,
}

impl Compositor {
    pub fn new(fetcher: Rc<dyn AssetFetcher>, canvas_size: u32, policy: RenderPolicy) -> Self {
        Self {
            fetcher,
            policy,
            canvas: RefCell::new(Canvas::new(canvas_size)),
            cache: RefCell::new(RasterCache::default()),
            requested: Cell::new(0),
            drawn: Cell::new(None),
            drawn_composition: RefCell::new(None),
        }
    }

    /// Read access to the canvas.
    ///
    /// Must not be held across an `.await` that lets a render cycle settle.
    pub fn canvas(&self) -> Ref<'_, Canvas> {
        self.canvas.borrow()
    }

    /// Sequence number of the most recently requested cycle.
    pub fn latest_requested(&self) -> u64 {
        self.requested.get()
    }

    /// Sequence number of the cycle currently on the canvas.
    pub fn last_drawn(&self) -> Option<u64> {
        self.drawn.get()
    }

    /// Composition currently on the canvas.
    pub fn drawn_composition(&self) -> Option<CurrentComposition> {
        self.drawn_composition.borrow().clone()
    }

    /// Drops all cached rasters.
    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    /// Starts a render cycle for `composition`.
    ///
    /// The sequence number is taken immediately; the returned future loads
    /// and draws.
    pub fn render(&self, composition: CurrentComposition) -> RenderFuture<'_> {
        let sequence = self.requested.get() + 1;
        self.requested.set(sequence);

        async move {
            let layers = join_all(
                Category::ALL
                    .into_iter()
                    .map(|category| self.load_layer(category, &composition[category])),
            )
            .await;
            self.draw(sequence, composition, layers)
        }
        .boxed_local()
    }

    /// Resolves one layer to a raster, or `None` when there is nothing to draw.
    async fn load_layer(&self, category: Category, source: &AssetSource) -> Option<Arc<RgbaImage>> {
        if source.is_none() {
            return None;
        }

        let size = self.canvas.borrow().side();
        let key = CacheKey::new(source.clone(), size);
        if let Some(image) = self.cache.borrow().get(&key) {
            return Some(image);
        }

        let bytes = match self.fetcher.fetch(source).await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(%category, %source, error = %err, "layer fetch failed, drawing nothing");
                return None;
            }
        };

        match render_svg_fill(&bytes, size) {
            Ok(raster) => {
                let image = Arc::new(raster);
                self.cache.borrow_mut().store(key, image.clone());
                Some(image)
            }
            Err(err) => {
                tracing::warn!(%category, %source, error = %err, "layer decode failed, drawing nothing");
                None
            }
        }
    }

    fn draw(
        &self,
        sequence: u64,
        composition: CurrentComposition,
        layers: Vec<Option<Arc<RgbaImage>>>,
    ) -> RenderOutcome {
        let latest = self.requested.get();
        if self.policy == RenderPolicy::LatestRequested && sequence != latest {
            tracing::debug!(sequence, latest, "render cycle superseded");
            return RenderOutcome::Superseded { sequence, latest };
        }

        let mut canvas = self.canvas.borrow_mut();
        canvas.clear();
        let mut drawn = 0;
        for image in layers.iter().flatten() {
            canvas.draw(image);
            drawn += 1;
        }
        drop(canvas);

        self.drawn.set(Some(sequence));
        *self.drawn_composition.borrow_mut() = Some(composition);
        tracing::debug!(sequence, layers = drawn, "render cycle drawn");
        RenderOutcome::Drawn {
            sequence,
            layers: drawn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryFetcher;
    use futures::executor::block_on;

    fn square(color: &str) -> String {
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="8" height="8"><rect width="8" height="8" fill="{color}"/></svg>"#
        )
    }

    /// Opaque band covering rows `[y0, y1)` of an 8x8 box.
    fn band(color: &str, y0: u32, y1: u32) -> String {
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="8" height="8"><rect y="{y0}" width="8" height="{}" fill="{color}"/></svg>"#,
            y1 - y0
        )
    }

    fn composition(entries: &[(Category, &AssetSource)]) -> CurrentComposition {
        let mut comp = CurrentComposition::default();
        for (category, source) in entries {
            comp[*category] = (*source).clone();
        }
        comp
    }

    #[test]
    fn empty_layers_are_skipped() {
        let mut fetcher = MemoryFetcher::new();
        let head = fetcher.insert(Category::Head, "h.svg", square("#ff0000"));
        let compositor = Compositor::new(Rc::new(fetcher), 16, RenderPolicy::default());

        let outcome = block_on(compositor.render(composition(&[(Category::Head, &head)])));
        assert_eq!(outcome, RenderOutcome::Drawn { sequence: 1, layers: 1 });
        assert_eq!(compositor.canvas().pixel(8, 8), [255, 0, 0, 255]);
    }

    #[test]
    fn layers_stack_head_to_detail() {
        // Every layer is opaque; each higher layer covers fewer rows, so
        // each band shows the topmost layer present there.
        let mut fetcher = MemoryFetcher::new();
        let head = fetcher.insert(Category::Head, "h.svg", band("#ff0000", 0, 8));
        let eyes = fetcher.insert(Category::Eyes, "e.svg", band("#00ff00", 0, 6));
        let brows = fetcher.insert(Category::Eyebrows, "b.svg", band("#0000ff", 0, 4));
        let mouth = fetcher.insert(Category::Mouth, "m.svg", band("#ffff00", 0, 2));
        let detail = fetcher.insert(Category::Detail, "d.svg", band("#00ffff", 0, 1));

        let compositor = Compositor::new(Rc::new(fetcher), 8, RenderPolicy::default());
        let comp = composition(&[
            (Category::Head, &head),
            (Category::Eyes, &eyes),
            (Category::Eyebrows, &brows),
            (Category::Mouth, &mouth),
            (Category::Detail, &detail),
        ]);
        let outcome = block_on(compositor.render(comp));
        assert_eq!(outcome, RenderOutcome::Drawn { sequence: 1, layers: 5 });

        let canvas = compositor.canvas();
        assert_eq!(canvas.pixel(3, 0), [0, 255, 255, 255]);
        assert_eq!(canvas.pixel(3, 1), [255, 255, 0, 255]);
        assert_eq!(canvas.pixel(3, 3), [0, 0, 255, 255]);
        assert_eq!(canvas.pixel(3, 5), [0, 255, 0, 255]);
        assert_eq!(canvas.pixel(3, 7), [255, 0, 0, 255]);
    }

    #[test]
    fn broken_layer_does_not_block_others() {
        let mut fetcher = MemoryFetcher::new();
        let head = fetcher.insert(Category::Head, "h.svg", square("#ff0000"));
        let broken = fetcher.insert(Category::Eyes, "bad.svg", "<svg><unclosed></svg>");
        let missing = AssetSource::new("mouth/gone.svg");

        let compositor = Compositor::new(Rc::new(fetcher), 8, RenderPolicy::default());
        let comp = composition(&[
            (Category::Head, &head),
            (Category::Eyes, &broken),
            (Category::Mouth, &missing),
        ]);
        let outcome = block_on(compositor.render(comp));
        assert_eq!(outcome, RenderOutcome::Drawn { sequence: 1, layers: 1 });
        assert_eq!(compositor.canvas().pixel(0, 0), [255, 0, 0, 255]);
    }

    #[test]
    fn render_is_idempotent() {
        let mut fetcher = MemoryFetcher::new();
        let head = fetcher.insert(Category::Head, "h.svg", square("#123456"));
        let eyes = fetcher.insert(
            Category::Eyes,
            "e.svg",
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="8" height="8"><circle cx="4" cy="4" r="2" fill="#fedcba" fill-opacity="0.5"/></svg>"##,
        );
        let compositor = Compositor::new(Rc::new(fetcher), 32, RenderPolicy::default());
        let comp = composition(&[(Category::Head, &head), (Category::Eyes, &eyes)]);

        block_on(compositor.render(comp.clone()));
        let first = compositor.canvas().clone();
        block_on(compositor.render(comp));
        assert_eq!(*compositor.canvas(), first);
    }

    #[test]
    fn rasters_are_cached() {
        let mut fetcher = MemoryFetcher::new();
        let head = fetcher.insert(Category::Head, "h.svg", square("#ff0000"));
        let compositor = Compositor::new(Rc::new(fetcher), 8, RenderPolicy::default());

        block_on(compositor.render(composition(&[(Category::Head, &head)])));
        assert_eq!(compositor.cache.borrow().len(), 1);
        compositor.clear_cache();
        assert!(compositor.cache.borrow().is_empty());
    }

    #[test]
    fn sequence_is_assigned_at_request_time() {
        let compositor = Compositor::new(Rc::new(MemoryFetcher::new()), 4, RenderPolicy::default());
        let first = compositor.render(CurrentComposition::default());
        let second = compositor.render(CurrentComposition::default());
        assert_eq!(compositor.latest_requested(), 2);

        // The older cycle settles after the newer one was requested.
        assert_eq!(
            block_on(first),
            RenderOutcome::Superseded { sequence: 1, latest: 2 }
        );
        assert!(block_on(second).is_drawn());
        assert_eq!(compositor.last_drawn(), Some(2));
    }

    #[test]
    fn last_settled_policy_draws_every_cycle() {
        let compositor = Compositor::new(Rc::new(MemoryFetcher::new()), 4, RenderPolicy::LastSettled);
        let first = compositor.render(CurrentComposition::default());
        let second = compositor.render(CurrentComposition::default());
        assert!(block_on(second).is_drawn());
        assert!(block_on(first).is_drawn());
        assert_eq!(compositor.last_drawn(), Some(1));
    }

    #[test]
    fn policy_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&RenderPolicy::LastSettled).unwrap(),
            "\"last-settled\""
        );
    }
}
