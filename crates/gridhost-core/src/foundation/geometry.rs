//! Read-only grid geometry and the drawing surface handed to overlays.
//!
//! Both traits are implemented by the rendering layer. Overlays only ever see
//! `&dyn GridGeometry` (never mutable grid state) and draw through
//! `&mut dyn Canvas`.

use serde::{Deserialize, Serialize};

use super::style::Color;

/// Axis-aligned rectangle in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Half-open containment test: the right and bottom edges are outside.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// Geometry accessors exposed by the renderer.
pub trait GridGeometry {
    /// Left edge of `col` in canvas pixels.
    fn column_x(&self, col: u32) -> f64;

    /// Top edge of `row` in canvas pixels.
    fn row_y(&self, row: u32) -> f64;

    fn column_width(&self, col: u32) -> f64;

    fn row_height(&self, row: u32) -> f64;

    /// Bounds of a single cell.
    fn cell_rect(&self, row: u32, col: u32) -> Rect {
        Rect::new(
            self.column_x(col),
            self.row_y(row),
            self.column_width(col),
            self.row_height(row),
        )
    }

    /// Bounds spanning an inclusive cell range.
    fn range_rect(&self, start_row: u32, start_col: u32, end_row: u32, end_col: u32) -> Rect {
        let x = self.column_x(start_col);
        let y = self.row_y(start_row);
        let right = self.column_x(end_col) + self.column_width(end_col);
        let bottom = self.row_y(end_row) + self.row_height(end_row);
        Rect::new(x, y, right - x, bottom - y)
    }
}

/// Drawing primitives available to overlays.
pub trait Canvas {
    fn fill_rect(&mut self, rect: Rect, color: Color);

    fn stroke_rect(&mut self, rect: Rect, color: Color, line_width: f64);

    fn fill_text(&mut self, text: &str, x: f64, y: f64, color: Color);
}

/// Geometry with fixed column widths and row heights.
///
/// Handy for headless hosts, demos and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformGeometry {
    pub origin_x: f64,
    pub origin_y: f64,
    pub column_width: f64,
    pub row_height: f64,
}

impl UniformGeometry {
    pub const fn new(column_width: f64, row_height: f64) -> Self {
        Self {
            origin_x: 0.0,
            origin_y: 0.0,
            column_width,
            row_height,
        }
    }

    /// Maps a canvas point back to the cell beneath it.
    pub fn cell_at(&self, x: f64, y: f64) -> Option<(u32, u32)> {
        let col = (x - self.origin_x) / self.column_width;
        let row = (y - self.origin_y) / self.row_height;
        (col >= 0.0 && row >= 0.0).then(|| (row.floor() as u32, col.floor() as u32))
    }
}

impl GridGeometry for UniformGeometry {
    fn column_x(&self, col: u32) -> f64 {
        self.origin_x + f64::from(col) * self.column_width
    }

    fn row_y(&self, row: u32) -> f64 {
        self.origin_y + f64::from(row) * self.row_height
    }

    fn column_width(&self, _col: u32) -> f64 {
        self.column_width
    }

    fn row_height(&self, _row: u32) -> f64 {
        self.row_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_rect_spans_inclusive_range() {
        let geo = UniformGeometry::new(100.0, 20.0);
        let rect = geo.range_rect(0, 0, 0, 5);
        assert_eq!(rect, Rect::new(0.0, 0.0, 600.0, 20.0));
        assert!(rect.contains(599.0, 19.0));
        assert!(!rect.contains(600.0, 10.0));
    }

    #[test]
    fn test_cell_at() {
        let geo = UniformGeometry::new(100.0, 20.0);
        assert_eq!(geo.cell_at(250.0, 45.0), Some((2, 2)));
        assert_eq!(geo.cell_at(-1.0, 5.0), None);
    }
}
