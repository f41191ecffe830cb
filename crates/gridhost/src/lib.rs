//! # Gridhost
//!
//! An extension host for interactive grid applications.
//!
//! ## Overview
//!
//! The host is a microkernel: the grid renderer never references extension
//! code. Instead it consults a set of registries at each decision point, and
//! independently packaged extensions contribute behavior into them.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐ paint / click / edit ┌────────────────────────────────────┐
//! │ Grid renderer│─────────────────────▶│ Registries                         │
//! └──────────────┘                      │  styles · clicks · edit guards     │
//!                                       │  overlays · dialogs · menus · bus  │
//!                                       └────────────────────────────────────┘
//!                                                 ▲ register / cleanup
//!                  ┌──────────────────┐           │
//!                  │ ExtensionManager │──activate──▶ Extension "banding"
//!                  │  (GridHost)      │──activate──▶ Extension "validation"
//!                  └──────────────────┘
//! ```
//!
//! - **Core**: registries, chains, event bus and value types
//! - **Framework**: the `Extension` trait, registration context and lifecycle manager
//! - **Runtime**: `GridHost`, configuration and logging
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use gridhost::prelude::*;
//!
//! struct NegativesRed;
//!
//! #[async_trait]
//! impl Extension for NegativesRed {
//!     fn manifest(&self) -> ExtensionManifest {
//!         ExtensionManifest::new("negatives-red", "Negative numbers in red")
//!     }
//!
//!     async fn activate(&self, ctx: &mut ExtensionContext) -> HandlerResult<()> {
//!         ctx.register_style_interceptor("red", 10, |value, _, _| {
//!             let negative = value.as_number().is_some_and(|n| n < 0.0);
//!             Ok(negative.then(|| CellStyle::new().text(Color::rgb(200, 0, 0))))
//!         });
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let host = GridHost::builder().build()?;
//!     host.register(Arc::new(NegativesRed)).await?;
//!     host.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: `gridhost.toml` configuration files
//! - `yaml-config`: `gridhost.yaml` configuration files
//! - `json-log`: JSON log output

pub use gridhost_core as core;
pub use gridhost_framework as framework;
pub use gridhost_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use gridhost::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use gridhost_runtime::{GridHost, GridHostConfig};

    // Extension model
    pub use gridhost_framework::{
        BUILTIN_EXTENSIONS, Extension, ExtensionContext, ExtensionFactory, ExtensionManifest,
        ExtensionState, async_trait,
    };

    // Registries and value types
    pub use gridhost_core::prelude::*;
    pub use gridhost_core::{
        CellCoords, CellStyle, CellValue, ClickDispatch, Cleanup, Color, GridGeometry,
        OverlayHitContext, OverlayRenderContext, Rect,
    };
}
