//! Application state controller.
//!
//! A [`Composer`] owns the loaded catalog, the selection, the active tab and
//! the compositor. Every mutation notifies subscribers and hands back the
//! render cycle for the new composition; callers drive it to completion (or
//! drop it to skip drawing).

use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::catalog::{AssetFetcher, AssetSet, load_assets};
use crate::category::Category;
use crate::compositor::{Compositor, RenderFuture};
use crate::config::{CatalogPolicy, ComposerConfig};
use crate::error::{ComposerResult, ExportError, SelectionError};
use crate::export::{ExportFile, export_png, export_svg};
use crate::profile::{ComposerProfile, Configurable};
use crate::selection::{CurrentComposition, SelectionState};
use crate::surface::Canvas;

// ============================================================================
// Events
// ============================================================================

/// Change notifications delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposerEvent {
    SelectionChanged(CurrentComposition),
    TabChanged(Category),
}

/// Handle returned by [`Composer::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Rc<dyn Fn(&ComposerEvent)>;

// ============================================================================
// Composer
// ============================================================================

pub struct Composer {
    config: ComposerConfig,
    fetcher: Rc<dyn AssetFetcher>,
    assets: AssetSet,
    selection: RefCell<SelectionState>,
    rng: RefCell<StdRng>,
    active_tab: Cell<Category>,
    compositor: Compositor,
    listeners: RefCell<Vec<(SubscriptionId, Listener)>>,
    next_subscription: Cell<u64>,
}

impl Composer {
    /// Loads the catalog, picks a random composition and draws it.
    ///
    /// A catalog that fails to load aborts start-up unless
    /// [`CatalogPolicy::Empty`] is configured, in which case the composer
    /// starts with no assets.
    #[tracing::instrument(skip_all, fields(policy = ?config.catalog_policy))]
    pub async fn start(
        config: ComposerConfig,
        fetcher: Rc<dyn AssetFetcher>,
    ) -> ComposerResult<Self> {
        config.validate()?;

        let assets = match load_assets(fetcher.as_ref()).await {
            Ok(assets) => assets,
            Err(err) => match config.catalog_policy {
                CatalogPolicy::Fail => return Err(err.into()),
                CatalogPolicy::Empty => {
                    tracing::warn!(error = %err, "catalog failed to load, starting empty");
                    AssetSet::empty()
                }
            },
        };

        let composer = Self::with_assets(config, fetcher, assets);
        let outcome = composer.refresh().await;
        tracing::debug!(?outcome, "initial render");
        Ok(composer)
    }

    /// Builds a composer around an already loaded catalog.
    ///
    /// The selection is randomized; nothing is drawn until the first render.
    pub fn with_assets(
        config: ComposerConfig,
        fetcher: Rc<dyn AssetFetcher>,
        assets: AssetSet,
    ) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut selection = SelectionState::new();
        selection.randomize(&assets, &mut rng);

        let compositor = Compositor::new(fetcher.clone(), config.canvas_size, config.render_policy);
        Self {
            config,
            fetcher,
            assets,
            selection: RefCell::new(selection),
            rng: RefCell::new(rng),
            active_tab: Cell::new(Category::Head),
            compositor,
            listeners: RefCell::new(Vec::new()),
            next_subscription: Cell::new(0),
        }
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    pub fn assets(&self) -> &AssetSet {
        &self.assets
    }

    pub fn selection(&self) -> SelectionState {
        self.selection.borrow().clone()
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    /// Read access to the canvas.
    pub fn canvas(&self) -> Ref<'_, Canvas> {
        self.compositor.canvas()
    }

    pub fn current_composition(&self) -> CurrentComposition {
        self.selection.borrow().current_composition(&self.assets)
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Chooses `index` for `category`.
    ///
    /// Subscribers hear about it only if the index actually changed; the
    /// composition is rendered either way.
    pub fn set_selection(
        &self,
        category: Category,
        index: usize,
    ) -> Result<RenderFuture<'_>, SelectionError> {
        let changed = self
            .selection
            .borrow_mut()
            .set_selection(&self.assets, category, index)?;
        if changed {
            self.notify(&ComposerEvent::SelectionChanged(self.current_composition()));
        }
        Ok(self.refresh())
    }

    /// Draws a fresh random composition.
    pub fn randomize(&self) -> RenderFuture<'_> {
        self.selection
            .borrow_mut()
            .randomize(&self.assets, &mut *self.rng.borrow_mut());
        self.notify(&ComposerEvent::SelectionChanged(self.current_composition()));
        self.refresh()
    }

    /// Renders the current composition again.
    pub fn refresh(&self) -> RenderFuture<'_> {
        self.compositor.render(self.current_composition())
    }

    pub fn active_tab(&self) -> Category {
        self.active_tab.get()
    }

    /// Switches the category shown in the picker. Does not affect the canvas.
    pub fn set_active_tab(&self, category: Category) {
        if self.active_tab.replace(category) != category {
            self.notify(&ComposerEvent::TabChanged(category));
        }
    }

    // ------------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------------

    pub fn subscribe(&self, listener: impl Fn(&ComposerEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.get());
        self.next_subscription.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    fn notify(&self, event: &ComposerEvent) {
        // Snapshot so listeners may subscribe or unsubscribe while notified.
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    // ------------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------------

    /// Encodes the canvas as it currently stands.
    pub fn export_png(&self) -> Result<ExportFile, ExportError> {
        export_png(&self.canvas())
    }

    /// Merges the current composition's source documents into one SVG.
    pub async fn export_svg(&self) -> Result<ExportFile, ExportError> {
        let composition = self.current_composition();
        export_svg(
            self.fetcher.as_ref(),
            &composition,
            self.config.svg_export_size,
        )
        .await
    }
}

impl Configurable for Composer {
    fn apply_profile(&self, profile: &ComposerProfile) -> RenderFuture<'_> {
        let mut changed = false;
        {
            let mut selection = self.selection.borrow_mut();
            for (category, index) in profile.resolve(&self.assets) {
                // Resolved indices come from the catalog, so they are in range.
                match selection.set_selection(&self.assets, category, index) {
                    Ok(updated) => changed |= updated,
                    Err(err) => {
                        debug_assert!(false, "resolved profile entry rejected: {err}");
                        tracing::warn!(%category, index, %err, "profile entry skipped");
                    }
                }
            }
        }
        if changed {
            self.notify(&ComposerEvent::SelectionChanged(self.current_composition()));
        }
        self.refresh()
    }

    fn export_profile(&self) -> ComposerProfile {
        ComposerProfile::from_composition(&self.current_composition())
    }
}

// ============================================================================
// Tests
// ============================================================================
