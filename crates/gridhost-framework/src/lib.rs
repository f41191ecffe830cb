//! # Gridhost Framework
//!
//! Extension model and lifecycle management on top of `gridhost-core`.
//!
//! This layer provides:
//! - The [`Extension`] trait and [`ExtensionManifest`]
//! - [`ExtensionContext`], which records every contribution an extension makes
//! - [`ExtensionManager`], which activates and deactivates extensions atomically
//! - [`BUILTIN_EXTENSIONS`], a link-time registry of bundled extensions
//!
//! The core registries know nothing about extensions; everything here is
//! built from their public add/remove API.

pub mod error;
pub mod extension;
pub mod manager;

pub use error::{ExtensionError, ExtensionResult};
pub use extension::{
    BUILTIN_EXTENSIONS, Extension, ExtensionContext, ExtensionFactory, ExtensionManifest,
    builtin_extensions,
};
pub use manager::{ExtensionInfo, ExtensionManager, ExtensionState};

#[doc(hidden)]
pub use async_trait::async_trait;
#[doc(hidden)]
pub use linkme;
