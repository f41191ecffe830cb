//! Grid Demo
//!
//! Drives one simulated grid session through the extension host:
//!
//! 1. Build a host from `gridhost.toml` (if present) and start it; the
//!    built-in `table-banding` and `header-lock` extensions activate.
//! 2. Paint a small grid: resolve each cell's style, then render overlays.
//! 3. Double-click a header cell, which opens the column dialog.
//! 4. Try to edit a header cell and a body cell.
//! 5. Toggle banding from the View menu and repaint.
//! 6. Shut down and report what is left in the registries.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package grid-demo -- --rows 6
//! GRIDHOST_LOGGING__LEVEL=debug cargo run --package grid-demo
//! ```

mod extensions;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use gridhost::core::{Canvas, ClickEvent, UniformGeometry};
use gridhost::prelude::*;
use serde_json::json;
use tracing::{info, warn};

const COLUMNS: u32 = 3;

#[derive(Debug, Parser)]
#[command(name = "grid-demo", about = "Simulated grid session on the Gridhost extension host")]
struct Args {
    /// Configuration file (defaults to searching for gridhost.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile.
    #[arg(short, long, default_value = "development")]
    profile: String,

    /// Number of grid rows, including the header.
    #[arg(long, default_value_t = 5)]
    rows: u32,
}

// ============================================================================
// Rendering stand-ins
// ============================================================================

/// Canvas that records draw calls instead of painting.
#[derive(Debug, Default)]
struct RecordingCanvas {
    commands: Vec<String>,
}

impl Canvas for RecordingCanvas {
    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(format!("fill {rect:?} {}", color.to_hex()));
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, line_width: f64) {
        self.commands
            .push(format!("stroke {rect:?} {} w={line_width}", color.to_hex()));
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, color: Color) {
        self.commands
            .push(format!("text {text:?} at ({x}, {y}) {}", color.to_hex()));
    }
}

fn cell_value(row: u32, col: u32) -> CellValue {
    if row == 0 {
        return CellValue::Text(["Item", "Qty", "Delta"][col as usize % 3].to_string());
    }
    match col {
        0 => CellValue::Text(format!("item-{row}")),
        1 => CellValue::Number(f64::from(row * 10)),
        _ => CellValue::Number(f64::from(row) - 3.0),
    }
}

fn describe(style: &CellStyle) -> String {
    let mut parts = Vec::new();
    if let Some(bg) = style.background_color {
        parts.push(format!("bg={}", bg.to_hex()));
    }
    if style.bold == Some(true) {
        parts.push("bold".to_string());
    }
    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(",")
    }
}

/// One paint pass: cell styles first, then overlays on top.
fn paint(host: &GridHost, geometry: &UniformGeometry, rows: u32) {
    let registries = host.registries();
    let base = CellStyle::new();

    for row in 0..rows {
        let line: Vec<String> = (0..COLUMNS)
            .map(|col| {
                let value = cell_value(row, col);
                let style = registries
                    .styles
                    .resolve(&value, &base, CellCoords::new(row, col));
                format!("{:>10} [{}]", format!("{value:?}"), describe(&style))
            })
            .collect();
        println!("  {}", line.join(" | "));
    }

    let mut canvas = RecordingCanvas::default();
    let drawn = registries.overlays.render_all(geometry, &mut canvas);
    info!(overlays = drawn, "Overlays rendered");
    for command in &canvas.commands {
        println!("  overlay: {command}");
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = GridHost::builder().profile(&args.profile);
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    let host = builder.build()?;

    for failure in host.start().await {
        warn!(error = %failure, "Extension did not start");
    }
    for extension in host.manager().list() {
        info!(
            extension = %extension.manifest.id,
            version = %extension.manifest.version,
            state = %extension.state,
            "Extension"
        );
    }

    let geometry = UniformGeometry::new(100.0, 24.0);
    let rows = args.rows.max(2);

    println!("Initial paint:");
    paint(&host, &geometry, rows);

    // Double click on the middle header cell
    let header = geometry.cell_rect(0, 1);
    let click = ClickEvent {
        click_count: 2,
        ..ClickEvent::at(header.x + 5.0, header.y + 5.0)
    };
    let dispatch = host.registries().clicks.dispatch(0, 1, click).await;
    info!(
        claimed_by = ?dispatch.claimed_by,
        consulted = dispatch.consulted,
        "Header double click"
    );
    for dialog in host.registries().dialogs.get_active_dialogs() {
        info!(dialog = %dialog.id, data = ?dialog.data, "Dialog open");
    }
    if let Some(hit) = host.registries().overlays.hit_test(&geometry, click.x, click.y) {
        info!(overlay = %hit, "Pointer is over an overlay");
    }

    host.registries()
        .events
        .emit_json(names::SELECTION_CHANGED, &json!({ "row": 2, "col": 1 }))?;

    for (row, col) in [(0, 1), (2, 1)] {
        match host.registries().edit_guards.check(row, col).await {
            EditDecision::Allowed => info!(row, col, "Edit allowed"),
            EditDecision::Blocked { guard_id, message } => {
                info!(row, col, guard = %guard_id, message = ?message, "Edit blocked");
            }
        }
    }

    if host.registries().menus.execute("view", "toggle-banding").await {
        println!("After toggling banding:");
        paint(&host, &geometry, rows);
    }

    let failures = host.shutdown().await;
    info!(
        cleanup_failures = failures,
        residue = host.registries().total_entries(),
        "Session finished"
    );

    Ok(())
}
