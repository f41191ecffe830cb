//! Extension model.
//!
//! An [`Extension`] is an independently activatable module that contributes
//! behavior to the host exclusively through the registries. The host core is
//! never aware of individual extensions.
//!
//! - [`ExtensionManifest`]: id, display name and version.
//! - [`ExtensionContext`]: the registration surface handed to `activate`,
//!   which records every cleanup so deactivation can undo it.
//! - [`BUILTIN_EXTENSIONS`]: link-time registry of extensions shipped with the
//!   host binary.

pub mod builtin;
pub mod context;
pub mod core;

pub use builtin::{BUILTIN_EXTENSIONS, ExtensionFactory, builtin_extensions};
pub use context::ExtensionContext;
pub use self::core::{Extension, ExtensionManifest};
