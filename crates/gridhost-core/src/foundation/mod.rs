//! Foundation layer: value types shared by every registry.

pub mod cell;
pub mod geometry;
pub mod isolate;
pub mod registration;
pub mod style;

pub use cell::{CellCoords, CellValue};
pub use geometry::{Canvas, GridGeometry, Rect, UniformGeometry};
pub use isolate::{call_isolated, call_isolated_async};
pub use registration::{Cleanup, RegistrationId};
pub use style::{CellStyle, Color, TextAlign};
