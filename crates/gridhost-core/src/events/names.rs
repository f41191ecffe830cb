//! Well-known event names.
//!
//! Event names are opaque strings; these constants only exist so that
//! producers and consumers agree on spelling.

/// The active selection moved. Payload: `{ "row", "col", "end_row"?, "end_col"? }`.
pub const SELECTION_CHANGED: &str = "selection:changed";

/// Cell contents changed. Payload: `{ "cells": [{ "row", "col" }] }`.
pub const DATA_CHANGED: &str = "data:changed";

/// The active sheet was switched. Payload: `{ "index", "name" }`.
pub const SHEET_CHANGED: &str = "sheet:changed";

/// A cell edit was committed. Payload: `{ "row", "col", "value" }`.
pub const CELL_EDITED: &str = "cell:edited";

/// Extensions ask the renderer to repaint. Payload: none.
pub const GRID_REFRESH: &str = "grid:refresh";

/// An extension finished activating. Payload: `{ "id" }`.
pub const EXTENSION_ACTIVATED: &str = "extension:activated";

/// An extension finished deactivating. Payload: `{ "id", "cleanup_failures" }`.
pub const EXTENSION_DEACTIVATED: &str = "extension:deactivated";
