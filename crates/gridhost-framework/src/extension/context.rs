use std::fmt;
use std::future::Future;
use std::sync::Arc;

use gridhost_core::{
    CellCoords, CellStyle, CellValue, ClickChain, ClickEvent, Cleanup, DialogDefinition,
    EditGuardChain, EditGuardResult, EventPayload, HandlerResult, MenuDefinition, MenuItem,
    OverlayRegistration, Registries, StyleInterceptorFn,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::error::{ExtensionError, ExtensionResult};

// ─── ExtensionContext ─────────────────────────────────────────────────────────

/// Registration surface handed to [`Extension::activate`].
///
/// Every `register_*` method forwards to the matching registry and records
/// the returned [`Cleanup`]. The manager runs the recorded cleanups, newest
/// first, when the extension deactivates or fails to activate. Chain and
/// overlay entries are tagged with the extension id as their owner.
///
/// Each method also returns the cleanup, so an extension can withdraw a single
/// contribution early; the recorded copy then becomes a no-op.
///
/// [`Extension::activate`]: super::Extension::activate
pub struct ExtensionContext {
    id: String,
    registries: Registries,
    config: Arc<Value>,
    cleanups: Vec<Cleanup>,
}

impl ExtensionContext {
    pub(crate) fn new(id: impl Into<String>, registries: Registries, config: Arc<Value>) -> Self {
        Self {
            id: id.into(),
            registries,
            config,
            cleanups: Vec::new(),
        }
    }

    /// Id of the extension being activated.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The registries, for queries and untracked calls such as `emit` or
    /// `open_dialog`.
    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    /// Deserializes this extension's config section into `T`.
    ///
    /// A missing section reads as an empty table, so `T` with
    /// `#[serde(default)]` fields always succeeds.
    pub fn config<T: DeserializeOwned>(&self) -> ExtensionResult<T> {
        let value = match self.config.as_ref() {
            Value::Null => Value::Object(Map::new()),
            other => other.clone(),
        };
        serde_json::from_value(value).map_err(|source| ExtensionError::Config {
            id: self.id.clone(),
            source,
        })
    }

    /// Records an externally obtained cleanup.
    pub fn track(&mut self, cleanup: Cleanup) -> Cleanup {
        self.cleanups.push(cleanup.clone());
        cleanup
    }

    /// Records arbitrary fallible teardown to run on deactivation.
    pub fn on_deactivate<F>(&mut self, f: F) -> Cleanup
    where
        F: FnOnce() -> HandlerResult<()> + Send + 'static,
    {
        let label = format!("teardown of '{}'", self.id);
        self.track(Cleanup::new(label, f))
    }

    /// Number of cleanups recorded so far.
    pub fn tracked(&self) -> usize {
        self.cleanups.len()
    }

    pub(crate) fn into_cleanups(self) -> Vec<Cleanup> {
        self.cleanups
    }

    // ─── Event bus ───────────────────────────────────────────────────────────

    pub fn subscribe<F>(&mut self, event: impl Into<String>, listener: F) -> Cleanup
    where
        F: Fn(&EventPayload) -> HandlerResult<()> + Send + Sync + 'static,
    {
        let cleanup = self.registries.events.subscribe(event, listener);
        self.track(cleanup)
    }

    pub fn subscribe_typed<T, F>(&mut self, event: impl Into<String>, listener: F) -> Cleanup
    where
        T: DeserializeOwned,
        F: Fn(T) -> HandlerResult<()> + Send + Sync + 'static,
    {
        let cleanup = self.registries.events.subscribe_typed(event, listener);
        self.track(cleanup)
    }

    // ─── Chains ──────────────────────────────────────────────────────────────

    pub fn register_style_interceptor<F>(
        &mut self,
        id: impl Into<String>,
        priority: i32,
        interceptor: F,
    ) -> Cleanup
    where
        F: Fn(&CellValue, &CellStyle, CellCoords) -> HandlerResult<Option<CellStyle>>
            + Send
            + Sync
            + 'static,
    {
        let interceptor: Arc<StyleInterceptorFn> = Arc::new(interceptor);
        let cleanup = self
            .registries
            .styles
            .register_owned(&self.id, id, priority, interceptor);
        self.track(cleanup)
    }

    pub fn register_click_interceptor<F, Fut>(
        &mut self,
        id: impl Into<String>,
        priority: i32,
        interceptor: F,
    ) -> Cleanup
    where
        F: Fn(u32, u32, ClickEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<bool>> + Send + 'static,
    {
        let cleanup = self.registries.clicks.register_owned(
            &self.id,
            id,
            priority,
            ClickChain::interceptor(interceptor),
        );
        self.track(cleanup)
    }

    pub fn register_edit_guard<F, Fut>(
        &mut self,
        id: impl Into<String>,
        priority: i32,
        guard: F,
    ) -> Cleanup
    where
        F: Fn(u32, u32) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<Option<EditGuardResult>>> + Send + 'static,
    {
        let cleanup = self.registries.edit_guards.register_owned(
            &self.id,
            id,
            priority,
            EditGuardChain::guard(guard),
        );
        self.track(cleanup)
    }

    // ─── Overlays ────────────────────────────────────────────────────────────

    pub fn register_overlay(&mut self, registration: OverlayRegistration) -> Cleanup {
        let cleanup = self.registries.overlays.register_owned(&self.id, registration);
        self.track(cleanup)
    }

    /// Removes this extension's overlays tagged `overlay_type`.
    ///
    /// Overlays other extensions registered under the same tag are untouched.
    pub fn remove_overlays_by_type(&self, overlay_type: &str) -> usize {
        self.registries
            .overlays
            .remove_by_type_for_owner(&self.id, overlay_type)
    }

    /// Swaps this extension's overlays tagged `overlay_type` for a new set.
    pub fn replace_overlays_by_type(
        &mut self,
        overlay_type: &str,
        registrations: impl IntoIterator<Item = OverlayRegistration>,
    ) -> Vec<Cleanup> {
        let cleanups =
            self.registries
                .overlays
                .replace_by_type_for_owner(&self.id, overlay_type, registrations);
        self.cleanups.extend(cleanups.iter().cloned());
        cleanups
    }

    // ─── Dialogs & menus ─────────────────────────────────────────────────────

    pub fn register_dialog(&mut self, definition: DialogDefinition) -> Cleanup {
        let cleanup = self.registries.dialogs.register_dialog(definition);
        self.track(cleanup)
    }

    pub fn register_menu(&mut self, definition: MenuDefinition) -> Cleanup {
        let cleanup = self.registries.menus.register_menu(definition);
        self.track(cleanup)
    }

    pub fn register_menu_item(&mut self, menu_id: &str, item: MenuItem) -> Cleanup {
        let cleanup = self.registries.menus.register_menu_item(menu_id, item);
        self.track(cleanup)
    }

    pub fn register_submenu_item(
        &mut self,
        menu_id: &str,
        parent_item_id: &str,
        item: MenuItem,
    ) -> Cleanup {
        let cleanup = self
            .registries
            .menus
            .register_submenu_item(menu_id, parent_item_id, item);
        self.track(cleanup)
    }
}

impl fmt::Debug for ExtensionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionContext")
            .field("id", &self.id)
            .field("tracked", &self.cleanups.len())
            .finish_non_exhaustive()
    }
}

/// Runs `cleanups` newest first, logging and counting failures.
pub(crate) fn run_cleanups(extension: &str, cleanups: Vec<Cleanup>) -> usize {
    let total = cleanups.len();
    let mut failures = 0;
    for cleanup in cleanups.into_iter().rev() {
        if let Err(e) = cleanup.run() {
            failures += 1;
            error!(
                extension = %extension,
                cleanup = %cleanup.label(),
                error = %e,
                "Cleanup failed, continuing with the rest"
            );
        }
    }
    debug!(extension = %extension, total, failures, "Cleanups run");
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridhost_core::GridRegion;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct BandingConfig {
        stride: u32,
        color: Option<String>,
    }

    fn context(config: Value) -> ExtensionContext {
        ExtensionContext::new("banding", Registries::new(), Arc::new(config))
    }

    #[test]
    fn test_config_reads_section_or_defaults() {
        let ctx = context(serde_json::json!({ "stride": 2 }));
        assert_eq!(
            ctx.config::<BandingConfig>().unwrap(),
            BandingConfig {
                stride: 2,
                color: None
            }
        );

        let ctx = context(Value::Null);
        assert_eq!(ctx.config::<BandingConfig>().unwrap(), BandingConfig::default());

        let ctx = context(serde_json::json!({ "stride": "two" }));
        assert!(matches!(
            ctx.config::<BandingConfig>(),
            Err(ExtensionError::Config { .. })
        ));
    }

    #[test]
    fn test_registrations_are_tracked_and_owned() {
        let mut ctx = context(Value::Null);
        ctx.register_style_interceptor("rows", 0, |_, _, _| Ok(None));
        ctx.register_overlay(OverlayRegistration::new("band").region(GridRegion::cell(0, 0)));
        ctx.subscribe("grid:refresh", |_| Ok(()));
        assert_eq!(ctx.tracked(), 3);

        let registries = ctx.registries().clone();
        assert_eq!(registries.owned_by("banding"), 2);

        assert_eq!(run_cleanups("banding", ctx.into_cleanups()), 0);
        assert_eq!(registries.total_entries(), 0);
    }

    #[test]
    fn test_overlay_type_removal_is_owner_scoped() {
        let registries = Registries::new();
        let mut a = ExtensionContext::new("ext-a", registries.clone(), Arc::new(Value::Null));
        let mut b = ExtensionContext::new("ext-b", registries.clone(), Arc::new(Value::Null));

        a.register_overlay(
            OverlayRegistration::new("grid-marker")
                .priority(5)
                .region(GridRegion::new(0, 0, 0, 5)),
        );
        b.register_overlay(OverlayRegistration::new("grid-marker").priority(20));

        assert_eq!(a.remove_overlays_by_type("grid-marker"), 1);
        assert_eq!(registries.overlays.count_by_type("grid-marker"), 1);
        assert_eq!(registries.overlays.ids_owned_by("ext-b").len(), 1);
    }

    #[test]
    fn test_failing_cleanup_does_not_stop_others() {
        let mut ctx = context(Value::Null);
        ctx.register_style_interceptor("a", 0, |_, _, _| Ok(None));
        ctx.on_deactivate(|| Err("disk full".into()));
        ctx.on_deactivate(|| panic!("teardown panicked"));
        ctx.register_style_interceptor("b", 0, |_, _, _| Ok(None));

        let registries = ctx.registries().clone();
        assert_eq!(run_cleanups("banding", ctx.into_cleanups()), 2);
        assert!(registries.styles.is_empty());
    }
}
