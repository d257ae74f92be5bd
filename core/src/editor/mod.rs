//! Editor capability interface.
//!
//! Everything the session engine needs from the host editor and its window
//! manager goes through the [`Editor`] trait: open-file queries, tile and
//! grid control, geometry read-back, and the few filesystem probes used
//! while reconciling saved paths. [`memory::MemoryEditor`] is a
//! deterministic in-process implementation.

pub mod memory;

use std::path::{Path, PathBuf};

use crate::error::EditorError;
use crate::types::session::{GridSize, Rect, TileNumber};

/// Opaque reference to an open document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentHandle(pub u64);

pub trait Editor {
    /// Open documents in the editor's enumeration order.
    fn list_open_files(&self) -> Result<Vec<PathBuf>, EditorError>;

    /// Focused document and its cursor line, if any document is open.
    fn active_file(&self) -> Result<Option<(PathBuf, u32)>, EditorError>;

    fn open_file(&mut self, path: &Path) -> Result<(), EditorError>;

    fn close_file(&mut self, path: &Path) -> Result<(), EditorError>;

    fn open_and_focus(&mut self, path: &Path, line: u32) -> Result<(), EditorError>;

    fn resolve_handle(&self, path: &Path) -> Option<DocumentHandle>;

    /// Tile hosting the document; negative when it floats outside the grid.
    fn tile_of(&self, handle: DocumentHandle) -> Result<TileNumber, EditorError>;

    fn geometry(&self, handle: DocumentHandle) -> Result<Rect, EditorError>;

    fn grid_dimensions(&self) -> Result<GridSize, EditorError>;

    fn set_grid_dimensions(&mut self, size: GridSize) -> Result<(), EditorError>;

    /// Switch to a single untiled (maximized) document area.
    fn maximize(&mut self) -> Result<(), EditorError>;

    fn set_column_span(&mut self, row: u32, col: u32, span: u32) -> Result<(), EditorError>;

    fn set_row_span(&mut self, row: u32, col: u32, span: u32) -> Result<(), EditorError>;

    fn set_row_heights(&mut self, ratios: &[f64]) -> Result<(), EditorError>;

    fn set_column_widths(&mut self, ratios: &[f64]) -> Result<(), EditorError>;

    fn set_tile(&mut self, handle: DocumentHandle, tile: u32) -> Result<(), EditorError>;

    fn set_external(&mut self, handle: DocumentHandle, rect: Rect) -> Result<(), EditorError>;

    fn working_directory(&self) -> Result<PathBuf, EditorError>;

    fn set_working_directory(&mut self, dir: &Path) -> Result<(), EditorError>;

    /// The active module/search path, serialized as one opaque string.
    fn search_path(&self) -> Result<String, EditorError>;

    fn set_search_path(&mut self, path: &str) -> Result<(), EditorError>;

    /// Whether `path` exists and can be loaded.
    fn file_exists(&self, path: &Path) -> bool;

    /// Loadable files whose base name is `file_name`, anywhere the editor looks.
    fn locate(&self, file_name: &str) -> Vec<PathBuf>;

    /// Create (or truncate) a scratch file on disk.
    fn create_file(&mut self, path: &Path, contents: &str) -> Result<(), EditorError>;

    fn delete_file(&mut self, path: &Path) -> Result<(), EditorError>;
}
