//! UI contribution registries: overlays, dialogs and menus.

pub mod dialog;
pub mod menu;
pub mod overlay;

pub use dialog::{ActiveDialog, DialogChange, DialogDefinition, DialogRegistry, DialogState};
pub use menu::{MenuActionFn, MenuChange, MenuDefinition, MenuItem, MenuRegistry};
pub use overlay::{
    GridRegion, OverlayHitContext, OverlayHitTestFn, OverlayRegistration, OverlayRegistry,
    OverlayRenderContext, OverlayRenderFn,
};
