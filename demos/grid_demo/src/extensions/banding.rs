use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use gridhost::prelude::*;
use linkme::distributed_slice;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

#[derive(Debug, Deserialize)]
#[serde(default)]
struct BandingSettings {
    /// Rows per band.
    stride: u32,
    color: String,
}

impl Default for BandingSettings {
    fn default() -> Self {
        Self {
            stride: 1,
            color: "#EEF3FB".to_string(),
        }
    }
}

/// Alternating row backgrounds, toggled from the View menu.
pub struct TableBanding;

#[distributed_slice(BUILTIN_EXTENSIONS)]
static TABLE_BANDING: ExtensionFactory = table_banding;

fn table_banding() -> Arc<dyn Extension> {
    Arc::new(TableBanding)
}

#[async_trait]
impl Extension for TableBanding {
    fn manifest(&self) -> ExtensionManifest {
        ExtensionManifest::new("table-banding", "Table banding")
            .version("0.1.0")
            .description("Shades every other band of rows")
    }

    async fn activate(&self, ctx: &mut ExtensionContext) -> HandlerResult<()> {
        let settings: BandingSettings = ctx.config()?;
        let color = Color::from_hex(&settings.color)
            .ok_or_else(|| format!("invalid banding color {:?}", settings.color))?;
        let stride = settings.stride.max(1);
        let enabled = Arc::new(AtomicBool::new(true));

        let active = Arc::clone(&enabled);
        ctx.register_style_interceptor("banding", 0, move |_, _, coords| {
            let shaded = active.load(Ordering::Relaxed) && (coords.row / stride) % 2 == 1;
            Ok(shaded.then(|| CellStyle::new().background(color)))
        });

        ctx.register_menu(MenuDefinition::new("view", "View").order(20));

        let events = ctx.registries().events.clone();
        ctx.register_menu_item(
            "view",
            MenuItem::new("toggle-banding", "Row banding")
                .shortcut("Ctrl+Shift+B")
                .checked(true)
                .action(move || {
                    let enabled = Arc::clone(&enabled);
                    let events = events.clone();
                    async move {
                        let was = enabled.fetch_xor(true, Ordering::Relaxed);
                        info!(enabled = !was, "Row banding toggled");
                        events.emit(names::GRID_REFRESH, Value::Null);
                        Ok(())
                    }
                }),
        );

        Ok(())
    }
}
