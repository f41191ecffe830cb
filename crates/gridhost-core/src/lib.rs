//! # Gridhost Core
//!
//! Registry and interceptor infrastructure for the Gridhost extension host.
//!
//! The core owns no grid logic of its own. The rendering layer consults the
//! registries at each decision point (paint, click, edit start), and
//! extensions contribute behavior by registering into them.
//!
//! ## Architecture Layers
//!
//! ### Foundation
//!
//! - **Registration**: tokens and idempotent cleanup handles ([`RegistrationId`], [`Cleanup`])
//! - **Isolation**: error and panic boundaries around extension code ([`call_isolated`])
//! - **Value types**: cells, styles and geometry ([`CellValue`], [`CellStyle`], [`GridGeometry`], [`Canvas`])
//!
//! ### Decision Points
//!
//! - **Event bus**: synchronous fan-out with per-listener isolation ([`EventBus`])
//! - **Chains**: priority-ordered style, click and edit-guard interceptors ([`StyleChain`], [`ClickChain`], [`EditGuardChain`])
//!
//! ### Surfaces
//!
//! - **Overlays**: renderable, hit-testable regions ([`OverlayRegistry`])
//! - **Dialogs** and **Menus**: UI contribution points ([`DialogRegistry`], [`MenuRegistry`])
//!
//! ## Example
//!
//! ```rust,ignore
//! use gridhost_core::prelude::*;
//!
//! let registries = Registries::new();
//!
//! let cleanup = registries.styles.register("negatives-red", 10, |value, _, _| {
//!     let negative = value.as_number().is_some_and(|n| n < 0.0);
//!     Ok(negative.then(|| CellStyle::new().text(Color::rgb(200, 0, 0))))
//! });
//!
//! let style = registries.styles.resolve(
//!     &CellValue::Number(-4.0),
//!     &CellStyle::new(),
//!     CellCoords::new(0, 0),
//! );
//! assert_eq!(style.text_color, Some(Color::rgb(200, 0, 0)));
//!
//! cleanup.run()?;
//! ```

pub mod chain;
pub mod error;
pub mod events;
pub mod foundation;
pub mod registries;
pub mod surface;

pub use chain::{
    ClickChain, ClickDispatch, ClickEvent, EditDecision, EditGuardChain, EditGuardResult,
    Modifiers, MouseButton, StyleChain,
};
pub use chain::click::ClickInterceptorFn;
pub use chain::edit::EditGuardFn;
pub use chain::style::StyleInterceptorFn;
pub use error::{BoxError, CoreError, CoreResult, HandlerResult};
pub use events::{EventBus, EventPayload, ListenerFn, names};
pub use foundation::{
    Canvas, CellCoords, CellStyle, CellValue, Cleanup, Color, GridGeometry, Rect,
    RegistrationId, TextAlign, UniformGeometry, call_isolated, call_isolated_async,
};
pub use registries::Registries;
pub use surface::{
    ActiveDialog, DialogChange, DialogDefinition, DialogRegistry, DialogState, GridRegion,
    MenuActionFn, MenuChange, MenuDefinition, MenuItem, MenuRegistry, OverlayHitContext,
    OverlayHitTestFn, OverlayRegistration, OverlayRegistry, OverlayRenderContext, OverlayRenderFn,
};

/// Re-exported so extensions can name boxed futures without depending on `futures`.
pub use futures::future::BoxFuture;

/// Prelude for common imports.
pub mod prelude {
    pub use super::foundation::*;
    pub use super::{
        BoxError, ClickChain, ClickEvent, DialogDefinition, EditDecision, EditGuardChain,
        EditGuardResult, EventBus, GridRegion, HandlerResult, MenuDefinition, MenuItem,
        OverlayRegistration, Registries, StyleChain, names,
    };
}
