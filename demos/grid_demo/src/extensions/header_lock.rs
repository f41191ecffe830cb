use std::sync::Arc;

use gridhost::prelude::*;
use linkme::distributed_slice;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

const HEADER_COLUMNS: u32 = 3;

#[derive(Debug, Deserialize)]
struct SelectionChanged {
    row: u32,
    col: u32,
}

/// Keeps the header row read-only and opens a column dialog on double click.
pub struct HeaderLock;

#[distributed_slice(BUILTIN_EXTENSIONS)]
static HEADER_LOCK: ExtensionFactory = header_lock;

fn header_lock() -> Arc<dyn Extension> {
    Arc::new(HeaderLock)
}

#[async_trait]
impl Extension for HeaderLock {
    fn manifest(&self) -> ExtensionManifest {
        ExtensionManifest::new("header-lock", "Header lock").version("0.1.0")
    }

    async fn activate(&self, ctx: &mut ExtensionContext) -> HandlerResult<()> {
        ctx.register_style_interceptor("header-bold", 10, |_, _, coords| {
            Ok((coords.row == 0).then(|| CellStyle::new().bold(true)))
        });

        ctx.register_edit_guard("header-row", 0, |row, _col| async move {
            Ok((row == 0).then(|| EditGuardResult::block("The header row is read-only")))
        });

        ctx.register_dialog(
            DialogDefinition::new("column-info", "ColumnInfoDialog").title("Column details"),
        );

        let dialogs = ctx.registries().dialogs.clone();
        ctx.register_click_interceptor("header-double-click", 0, move |row, col, event| {
            let dialogs = dialogs.clone();
            async move {
                if row != 0 || !event.is_double_click() {
                    return Ok(false);
                }
                let column = CellCoords::new(row, col).column_name();
                Ok(dialogs.open_dialog_with("column-info", &json!({ "column": column }))?)
            }
        });

        ctx.register_overlay(
            OverlayRegistration::new("grid-marker")
                .priority(5)
                .region(GridRegion::new(0, 0, 0, HEADER_COLUMNS - 1))
                .render(|ctx| {
                    if let Some(bounds) = ctx.region_bounds() {
                        ctx.canvas.stroke_rect(bounds, Color::rgb(0, 120, 215), 2.0);
                    }
                    Ok(())
                })
                .hit_test(|ctx| Ok(ctx.in_region())),
        );

        ctx.subscribe_typed(names::SELECTION_CHANGED, |selection: SelectionChanged| {
            info!(row = selection.row, col = selection.col, "Selection changed");
            Ok(())
        });

        Ok(())
    }
}
