//! The bundle of registries an extension host exposes.
//!
//! [`Registries`] is a cheap, cloneable handle set. The host usually works with
//! the process-wide instance from [`Registries::global`], which starts empty
//! and lives for the lifetime of the process. Tests and embedded hosts build
//! private instances with [`Registries::new`] so they never share state.

use std::sync::LazyLock;

use crate::chain::{ClickChain, EditGuardChain, StyleChain};
use crate::events::EventBus;
use crate::surface::{DialogRegistry, MenuRegistry, OverlayRegistry};

static GLOBAL: LazyLock<Registries> = LazyLock::new(Registries::new);

/// Every contribution point of the host.
#[derive(Clone, Debug, Default)]
pub struct Registries {
    pub events: EventBus,
    pub styles: StyleChain,
    pub clicks: ClickChain,
    pub edit_guards: EditGuardChain,
    pub overlays: OverlayRegistry,
    pub dialogs: DialogRegistry,
    pub menus: MenuRegistry,
}

impl Registries {
    /// Creates an isolated, empty set of registries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide registries.
    pub fn global() -> &'static Registries {
        &GLOBAL
    }

    /// Number of live entries across every registry, menu items included.
    ///
    /// Useful to assert that a deactivation left nothing behind.
    pub fn total_entries(&self) -> usize {
        self.events.total_listeners()
            + self.styles.len()
            + self.clicks.len()
            + self.edit_guards.len()
            + self.overlays.len()
            + self.dialogs.len()
            + self.menus.len()
            + self.menus.total_items()
    }

    /// Number of chain and overlay entries contributed by `owner`.
    pub fn owned_by(&self, owner: &str) -> usize {
        self.styles.ids_owned_by(owner).len()
            + self.clicks.ids_owned_by(owner).len()
            + self.edit_guards.ids_owned_by(owner).len()
            + self.overlays.ids_owned_by(owner).len()
    }

    /// Withdraws every chain and overlay entry still tagged with `owner`.
    ///
    /// Returns how many entries were found. The lifecycle manager calls this
    /// after running an extension's cleanups to catch entries it registered
    /// outside its activation context.
    pub fn remove_owned_by(&self, owner: &str) -> usize {
        self.styles.remove_owned_by(owner)
            + self.clicks.remove_owned_by(owner)
            + self.edit_guards.remove_owned_by(owner)
            + self.overlays.remove_owned_by(owner)
    }

    /// Empties every registry.
    pub fn clear(&self) {
        self.events.clear();
        self.styles.clear();
        self.clicks.clear();
        self.edit_guards.clear();
        self.overlays.clear();
        self.dialogs.clear();
        self.menus.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{DialogDefinition, MenuDefinition, MenuItem, OverlayRegistration};

    #[test]
    fn test_totals_and_clear() {
        let registries = Registries::new();
        registries.events.subscribe("grid:refresh", |_| Ok(()));
        registries.styles.register("s", 0, |_, _, _| Ok(None));
        registries.overlays.register_owned("ext", OverlayRegistration::new("marker"));
        registries.dialogs.register_dialog(DialogDefinition::new("d", "D"));
        registries
            .menus
            .register_menu(MenuDefinition::new("m", "M").item(MenuItem::new("i", "I")));

        assert_eq!(registries.total_entries(), 6);
        assert_eq!(registries.owned_by("ext"), 1);
        assert_eq!(registries.remove_owned_by("ext"), 1);
        assert_eq!(registries.owned_by("ext"), 0);

        registries.clear();
        assert_eq!(registries.total_entries(), 0);
    }

    #[test]
    fn test_clones_share_state() {
        let registries = Registries::new();
        let other = registries.clone();
        other.styles.register("s", 0, |_, _, _| Ok(None));
        assert_eq!(registries.styles.len(), 1);
        assert!(Registries::global().styles.ids().iter().all(|id| id != "s"));
    }
}
