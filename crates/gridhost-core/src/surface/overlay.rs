//! Overlays drawn on top of the grid canvas.
//!
//! Each overlay carries a `type` tag, a priority, an optional anchored
//! [`GridRegion`], a render callback and a hit-test callback.
//!
//! - **Paint**: [`OverlayRegistry::render_all`] renders in ascending priority,
//!   so higher priorities end up on top.
//! - **Pointer**: [`OverlayRegistry::hit_test`] walks the reverse order
//!   (topmost first) and returns the id of the first overlay that claims the
//!   point. Ties in priority go to the later registration, which is also the
//!   one painted last.
//!
//! Several overlays may share a type tag. Extensions that redraw a set of
//! regions whenever some input changes (a visible filter range, say) swap the
//! whole set with [`OverlayRegistry::replace_by_type`] instead of diffing ids.
//!
//! # Type-tag removal
//!
//! [`OverlayRegistry::remove_by_type`] is string-granular and removes every
//! overlay with that tag, whoever registered it. Extensions go through
//! [`OverlayRegistry::remove_by_type_for_owner`], which only touches their own
//! registrations, so two extensions picking the same tag cannot clobber each
//! other.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::chain::Chain;
use crate::error::HandlerResult;
use crate::foundation::{Canvas, Cleanup, GridGeometry, Rect, RegistrationId, call_isolated};

/// Inclusive cell range an overlay is anchored to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridRegion {
    pub start_row: u32,
    pub start_col: u32,
    pub end_row: u32,
    pub end_col: u32,
    /// Free-form data owned by the extension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl GridRegion {
    pub fn new(start_row: u32, start_col: u32, end_row: u32, end_col: u32) -> Self {
        Self {
            start_row: start_row.min(end_row),
            start_col: start_col.min(end_col),
            end_row: start_row.max(end_row),
            end_col: start_col.max(end_col),
            data: None,
        }
    }

    pub fn cell(row: u32, col: u32) -> Self {
        Self::new(row, col, row, col)
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn contains_cell(&self, row: u32, col: u32) -> bool {
        (self.start_row..=self.end_row).contains(&row)
            && (self.start_col..=self.end_col).contains(&col)
    }

    /// Canvas bounds of the region under `geometry`.
    pub fn bounds(&self, geometry: &dyn GridGeometry) -> Rect {
        geometry.range_rect(self.start_row, self.start_col, self.end_row, self.end_col)
    }
}

// =============================================================================
// Callback contexts
// =============================================================================

/// Everything a render callback may touch.
pub struct OverlayRenderContext<'a> {
    pub geometry: &'a dyn GridGeometry,
    pub canvas: &'a mut dyn Canvas,
    pub region: Option<&'a GridRegion>,
}

impl OverlayRenderContext<'_> {
    /// Bounds of the anchored region, if any.
    pub fn region_bounds(&self) -> Option<Rect> {
        self.region.map(|r| r.bounds(self.geometry))
    }
}

/// Input to a hit-test callback.
pub struct OverlayHitContext<'a> {
    pub geometry: &'a dyn GridGeometry,
    pub x: f64,
    pub y: f64,
    pub region: Option<&'a GridRegion>,
}

impl OverlayHitContext<'_> {
    /// Whether the pointer lies inside the anchored region.
    pub fn in_region(&self) -> bool {
        self.region
            .is_some_and(|r| r.bounds(self.geometry).contains(self.x, self.y))
    }
}

pub type OverlayRenderFn = dyn Fn(&mut OverlayRenderContext<'_>) -> HandlerResult<()> + Send + Sync;

pub type OverlayHitTestFn = dyn Fn(&OverlayHitContext<'_>) -> HandlerResult<bool> + Send + Sync;

// =============================================================================
// Registration
// =============================================================================

/// Description of an overlay to register.
///
/// ```rust,ignore
/// let reg = OverlayRegistration::new("grid-marker")
///     .priority(5)
///     .region(GridRegion::new(0, 0, 0, 5))
///     .render(|ctx| {
///         if let Some(bounds) = ctx.region_bounds() {
///             ctx.canvas.stroke_rect(bounds, Color::rgb(0, 120, 215), 2.0);
///         }
///         Ok(())
///     })
///     .hit_test(|ctx| Ok(ctx.in_region()));
/// ```
pub struct OverlayRegistration {
    id: Option<String>,
    overlay_type: String,
    priority: i32,
    region: Option<GridRegion>,
    render: Option<Arc<OverlayRenderFn>>,
    hit_test: Option<Arc<OverlayHitTestFn>>,
}

impl OverlayRegistration {
    pub fn new(overlay_type: impl Into<String>) -> Self {
        Self {
            id: None,
            overlay_type: overlay_type.into(),
            priority: 0,
            region: None,
            render: None,
            hit_test: None,
        }
    }

    /// Explicit id. Without one, a unique id derived from the type is used.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn region(mut self, region: GridRegion) -> Self {
        self.region = Some(region);
        self
    }

    pub fn render<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut OverlayRenderContext<'_>) -> HandlerResult<()> + Send + Sync + 'static,
    {
        self.render = Some(Arc::new(f));
        self
    }

    /// Without a hit test the overlay never claims pointer events.
    pub fn hit_test<F>(mut self, f: F) -> Self
    where
        F: Fn(&OverlayHitContext<'_>) -> HandlerResult<bool> + Send + Sync + 'static,
    {
        self.hit_test = Some(Arc::new(f));
        self
    }

    fn into_entry(self) -> (String, i32, Arc<Overlay>) {
        let id = self
            .id
            .unwrap_or_else(|| format!("{}{}", self.overlay_type, RegistrationId::next()));
        let overlay = Overlay {
            overlay_type: self.overlay_type,
            region: self.region,
            render: self.render,
            hit_test: self.hit_test,
        };
        (id, self.priority, Arc::new(overlay))
    }
}

/// Stored form of a registered overlay.
pub struct Overlay {
    pub overlay_type: String,
    pub region: Option<GridRegion>,
    render: Option<Arc<OverlayRenderFn>>,
    hit_test: Option<Arc<OverlayHitTestFn>>,
}

impl fmt::Debug for Overlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Overlay")
            .field("overlay_type", &self.overlay_type)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Registry of overlays, ordered by `(priority, registration)`.
#[derive(Clone, Debug)]
pub struct OverlayRegistry {
    chain: Chain<Overlay>,
}

impl Default for OverlayRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayRegistry {
    pub fn new() -> Self {
        Self {
            chain: Chain::new("overlay"),
        }
    }

    /// Registers an overlay; an existing overlay with the same id is replaced.
    pub fn register(&self, registration: OverlayRegistration) -> Cleanup {
        let (id, priority, overlay) = registration.into_entry();
        self.chain.register(None, id, priority, overlay)
    }

    /// Registers an overlay on behalf of the extension `owner`.
    pub fn register_owned(&self, owner: &str, registration: OverlayRegistration) -> Cleanup {
        let (id, priority, overlay) = registration.into_entry();
        self.chain.register(Some(owner), id, priority, overlay)
    }

    /// Removes every overlay tagged `overlay_type`, regardless of owner.
    pub fn remove_by_type(&self, overlay_type: &str) -> usize {
        let removed = self
            .chain
            .remove_where(|e| e.handler.overlay_type == overlay_type);
        debug!(overlay_type = %overlay_type, removed, "Overlays removed by type");
        removed
    }

    /// Removes the overlays tagged `overlay_type` that `owner` registered.
    pub fn remove_by_type_for_owner(&self, owner: &str, overlay_type: &str) -> usize {
        let removed = self.chain.remove_where(|e| {
            e.handler.overlay_type == overlay_type && e.owner.as_deref() == Some(owner)
        });
        debug!(owner = %owner, overlay_type = %overlay_type, removed, "Overlays removed by type");
        removed
    }

    /// Swaps every overlay tagged `overlay_type` for `registrations` in one
    /// step. Registrations with a different tag are rejected.
    pub fn replace_by_type(
        &self,
        overlay_type: &str,
        registrations: impl IntoIterator<Item = OverlayRegistration>,
    ) -> Vec<Cleanup> {
        self.replace_matching(None, overlay_type, registrations)
    }

    /// Owner-scoped [`replace_by_type`](Self::replace_by_type).
    pub fn replace_by_type_for_owner(
        &self,
        owner: &str,
        overlay_type: &str,
        registrations: impl IntoIterator<Item = OverlayRegistration>,
    ) -> Vec<Cleanup> {
        self.replace_matching(Some(owner), overlay_type, registrations)
    }

    fn replace_matching(
        &self,
        owner: Option<&str>,
        overlay_type: &str,
        registrations: impl IntoIterator<Item = OverlayRegistration>,
    ) -> Vec<Cleanup> {
        let additions: Vec<_> = registrations
            .into_iter()
            .filter(|reg| {
                let matches = reg.overlay_type == overlay_type;
                if !matches {
                    error!(
                        expected = %overlay_type,
                        actual = %reg.overlay_type,
                        "Overlay type mismatch in replace, skipping registration"
                    );
                }
                matches
            })
            .map(OverlayRegistration::into_entry)
            .collect();
        let added = additions.len();

        let (removed, cleanups) = self.chain.splice(
            owner,
            |e| {
                e.handler.overlay_type == overlay_type
                    && owner.is_none_or(|o| e.owner.as_deref() == Some(o))
            },
            additions,
        );
        debug!(overlay_type = %overlay_type, removed, added, "Overlays replaced by type");
        cleanups
    }

    /// Paints every overlay in ascending priority. Returns how many rendered
    /// without error.
    pub fn render_all(&self, geometry: &dyn GridGeometry, canvas: &mut dyn Canvas) -> usize {
        let entries = self.chain.snapshot();
        let mut rendered = 0;
        for entry in entries.iter() {
            let Some(render) = &entry.handler.render else {
                continue;
            };
            let mut ctx = OverlayRenderContext {
                geometry,
                canvas: &mut *canvas,
                region: entry.handler.region.as_ref(),
            };
            match call_isolated(|| render(&mut ctx)) {
                Ok(()) => rendered += 1,
                Err(e) => {
                    error!(overlay = %entry.id, error = %e, "Overlay render failed");
                }
            }
        }
        rendered
    }

    /// Returns the id of the topmost overlay claiming `(x, y)`.
    ///
    /// `None` means the pointer event falls through to the grid.
    pub fn hit_test(&self, geometry: &dyn GridGeometry, x: f64, y: f64) -> Option<String> {
        let entries = self.chain.snapshot();
        for entry in entries.iter().rev() {
            let Some(hit_test) = &entry.handler.hit_test else {
                continue;
            };
            let ctx = OverlayHitContext {
                geometry,
                x,
                y,
                region: entry.handler.region.as_ref(),
            };
            match call_isolated(|| hit_test(&ctx)) {
                Ok(true) => return Some(entry.id.clone()),
                Ok(false) => {}
                Err(e) => {
                    error!(overlay = %entry.id, error = %e, "Overlay hit test failed");
                }
            }
        }
        None
    }

    /// Number of overlays tagged `overlay_type`.
    pub fn count_by_type(&self, overlay_type: &str) -> usize {
        self.chain
            .snapshot()
            .iter()
            .filter(|e| e.handler.overlay_type == overlay_type)
            .count()
    }

    /// Regions of the overlays tagged `overlay_type`, in paint order.
    pub fn regions_by_type(&self, overlay_type: &str) -> Vec<GridRegion> {
        self.chain
            .snapshot()
            .iter()
            .filter(|e| e.handler.overlay_type == overlay_type)
            .filter_map(|e| e.handler.region.clone())
            .collect()
    }
}

crate::chain::delegate_chain!(OverlayRegistry);
