//! In-memory editor: a deterministic model of a tiling window manager.
//!
//! The document area is a fixed pixel canvas divided into a grid whose
//! column widths and row heights are ratios of the canvas. Cells can span
//! neighbours; a spanning cell hides the cells it covers. Live tile numbers
//! are assigned to the visible cells in column-major order, which purposely
//! differs from the row-major order the layout engine reasons in.
//!
//! A small set of injectable faults (see [`Faults`]) reproduces the
//! transient failures real window managers exhibit.

use std::cell::Cell;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::editor::{DocumentHandle, Editor};
use crate::error::EditorError;
use crate::types::session::{file_name_of, GridSize, Rect, TileNumber};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub handle: u64,
    pub path: PathBuf,
    /// Docked tile, or negative when floating.
    pub tile: TileNumber,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external: Option<Rect>,
    #[serde(default)]
    pub line: u32,
    #[serde(skip)]
    ready_after: Cell<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub row: u32,
    pub col: u32,
    pub span: u32,
}

/// Faults injected into the model; never persisted.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// `set_tile` on these paths fails with `ViewNotReady` this many times.
    pub flaky_views: HashMap<PathBuf, u32>,
    /// Newly opened documents stay unresolvable for this many lookups.
    pub handle_delay: u32,
    /// Moves to tiles at or above this number are silently ignored.
    pub ignore_moves_from: Option<u32>,
    pub focus_fails: bool,
}

/// Calls that change the grid, for asserting on layout churn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counters {
    pub grid_applies: usize,
    pub maximize_calls: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEditor {
    canvas: Rect,
    grid: GridSize,
    #[serde(default)]
    column_spans: Vec<Span>,
    #[serde(default)]
    row_spans: Vec<Span>,
    #[serde(default)]
    column_widths: Vec<f64>,
    #[serde(default)]
    row_heights: Vec<f64>,
    #[serde(default)]
    documents: Vec<Document>,
    #[serde(default)]
    active: Option<u64>,
    #[serde(default)]
    next_handle: u64,
    #[serde(default)]
    disk: BTreeSet<PathBuf>,
    working_directory: PathBuf,
    #[serde(default)]
    search_path: String,
    #[serde(skip)]
    faults: Faults,
    #[serde(skip)]
    counters: Counters,
}

/// A visible cell of the grid with its spans clipped to the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct VisibleCell {
    row: u32,
    col: u32,
    row_span: u32,
    col_span: u32,
}

impl Default for MemoryEditor {
    fn default() -> Self {
        MemoryEditor::new(Rect::new(0, 0, 1200, 800))
    }
}

impl MemoryEditor {
    pub fn new(canvas: Rect) -> MemoryEditor {
        MemoryEditor {
            canvas,
            grid: GridSize::SINGLE,
            column_spans: Vec::new(),
            row_spans: Vec::new(),
            column_widths: vec![1.0],
            row_heights: vec![1.0],
            documents: Vec::new(),
            active: None,
            next_handle: 1,
            disk: BTreeSet::new(),
            working_directory: PathBuf::from("/"),
            search_path: String::new(),
            faults: Faults::default(),
            counters: Counters::default(),
        }
    }

    pub fn with_files<I, P>(mut self, paths: I) -> MemoryEditor
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        for p in paths {
            self.disk.insert(p.into());
        }
        self
    }

    pub fn add_file(&mut self, path: impl Into<PathBuf>) {
        self.disk.insert(path.into());
    }

    pub fn remove_file(&mut self, path: &Path) {
        self.disk.remove(path);
    }

    /// Open `path` directly into `tile`, bypassing the usual placement.
    pub fn open_in_tile(&mut self, path: impl Into<PathBuf>, tile: u32) -> Result<(), EditorError> {
        let path = path.into();
        self.open_file(&path)?;
        let handle = self
            .resolve_handle(&path)
            .ok_or_else(|| EditorError::NoDocument(path.clone()))?;
        self.set_tile(handle, tile)
    }

    pub fn open_floating(&mut self, path: impl Into<PathBuf>, rect: Rect) -> Result<(), EditorError> {
        let path = path.into();
        self.open_file(&path)?;
        let handle = self
            .resolve_handle(&path)
            .ok_or_else(|| EditorError::NoDocument(path.clone()))?;
        self.set_external(handle, rect)
    }

    pub fn set_cursor_line(&mut self, line: u32) {
        if let Some(active) = self.active {
            if let Some(doc) = self.documents.iter_mut().find(|d| d.handle == active) {
                doc.line = line;
            }
        }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn document(&self, path: &Path) -> Option<&Document> {
        self.documents.iter().find(|d| d.path == path)
    }

    pub fn disk_files(&self) -> impl Iterator<Item = &PathBuf> {
        self.disk.iter()
    }

    pub fn faults_mut(&mut self) -> &mut Faults {
        &mut self.faults
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn reset_counters(&mut self) {
        self.counters = Counters::default();
    }

    pub fn live_tile_count(&self) -> u32 {
        self.visible_cells().len() as u32
    }

    fn doc_mut(&mut self, handle: DocumentHandle) -> Result<&mut Document, EditorError> {
        self.documents
            .iter_mut()
            .find(|d| d.handle == handle.0)
            .ok_or_else(|| EditorError::Rejected(format!("unknown handle {}", handle.0)))
    }

    fn doc(&self, handle: DocumentHandle) -> Result<&Document, EditorError> {
        self.documents
            .iter()
            .find(|d| d.handle == handle.0)
            .ok_or_else(|| EditorError::Rejected(format!("unknown handle {}", handle.0)))
    }

    fn span_at(spans: &[Span], row: u32, col: u32) -> u32 {
        spans
            .iter()
            .find(|s| s.row == row && s.col == col)
            .map(|s| s.span.max(1))
            .unwrap_or(1)
    }

    /// Visible cells in live tile order (column-major).
    fn visible_cells(&self) -> Vec<VisibleCell> {
        let w = self.grid.width as usize;
        let h = self.grid.height as usize;
        let mut covered = vec![vec![false; w]; h];
        let mut cells = Vec::new();
        for r in 0..h {
            for c in 0..w {
                if covered[r][c] {
                    continue;
                }
                let col_span = Self::span_at(&self.column_spans, r as u32, c as u32)
                    .min((w - c) as u32);
                let row_span =
                    Self::span_at(&self.row_spans, r as u32, c as u32).min((h - r) as u32);
                for rr in r..r + row_span as usize {
                    for cc in c..c + col_span as usize {
                        covered[rr][cc] = true;
                    }
                }
                cells.push(VisibleCell {
                    row: r as u32,
                    col: c as u32,
                    row_span,
                    col_span,
                });
            }
        }
        cells.sort_by_key(|cell| (cell.col, cell.row));
        cells
    }

    fn boundaries(origin: i32, extent: i32, ratios: &[f64], count: u32) -> Vec<i32> {
        let count = count as usize;
        let ratios: Vec<f64> = if ratios.len() == count && ratios.iter().sum::<f64>() > 0.0 {
            ratios.to_vec()
        } else {
            vec![1.0; count]
        };
        let total: f64 = ratios.iter().sum();
        let mut acc = 0.0;
        let mut bounds = Vec::with_capacity(count + 1);
        bounds.push(origin);
        for r in &ratios {
            acc += r / total;
            bounds.push(origin + (acc * extent as f64).round() as i32);
        }
        bounds
    }

    fn cell_rect(&self, cell: VisibleCell) -> Rect {
        let xs = Self::boundaries(
            self.canvas.x,
            self.canvas.width,
            &self.column_widths,
            self.grid.width,
        );
        let ys = Self::boundaries(
            self.canvas.y,
            self.canvas.height,
            &self.row_heights,
            self.grid.height,
        );
        let x0 = xs[cell.col as usize];
        let x1 = xs[(cell.col + cell.col_span) as usize];
        let y0 = ys[cell.row as usize];
        let y1 = ys[(cell.row + cell.row_span) as usize];
        Rect::new(x0, y0, x1 - x0, y1 - y0)
    }

    fn reset_grid(&mut self, size: GridSize) {
        self.grid = size;
        self.column_spans.clear();
        self.row_spans.clear();
        self.column_widths = vec![1.0 / size.width as f64; size.width as usize];
        self.row_heights = vec![1.0 / size.height as f64; size.height as usize];
        self.rehome_documents();
    }

    /// Documents on tiles that no longer exist fall back to tile 0.
    fn rehome_documents(&mut self) {
        let count = self.live_tile_count() as TileNumber;
        for doc in &mut self.documents {
            if doc.tile >= count {
                doc.tile = 0;
            }
        }
    }

    fn check_cell(&self, row: u32, col: u32) -> Result<(), EditorError> {
        if row >= self.grid.height || col >= self.grid.width {
            return Err(EditorError::Rejected(format!(
                "cell ({}, {}) outside {}x{} grid",
                row, col, self.grid.width, self.grid.height
            )));
        }
        Ok(())
    }

    fn set_span(&mut self, row: u32, col: u32, span: u32, rows: bool) -> Result<(), EditorError> {
        self.check_cell(row, col)?;
        let spans = if rows {
            &mut self.row_spans
        } else {
            &mut self.column_spans
        };
        spans.retain(|s| !(s.row == row && s.col == col));
        if span > 1 {
            spans.push(Span { row, col, span });
        }
        self.rehome_documents();
        Ok(())
    }
}

impl Editor for MemoryEditor {
    fn list_open_files(&self) -> Result<Vec<PathBuf>, EditorError> {
        Ok(self.documents.iter().map(|d| d.path.clone()).collect())
    }

    fn active_file(&self) -> Result<Option<(PathBuf, u32)>, EditorError> {
        Ok(self.active.and_then(|h| {
            self.documents
                .iter()
                .find(|d| d.handle == h)
                .map(|d| (d.path.clone(), d.line))
        }))
    }

    fn open_file(&mut self, path: &Path) -> Result<(), EditorError> {
        if let Some(doc) = self.documents.iter().find(|d| d.path == path) {
            self.active = Some(doc.handle);
            return Ok(());
        }
        if !self.disk.contains(path) {
            return Err(EditorError::NotLoadable(path.to_path_buf()));
        }
        let handle = self.next_handle;
        self.next_handle += 1;
        self.documents.push(Document {
            handle,
            path: path.to_path_buf(),
            tile: 0,
            external: None,
            line: 1,
            ready_after: Cell::new(self.faults.handle_delay),
        });
        self.active = Some(handle);
        Ok(())
    }

    fn close_file(&mut self, path: &Path) -> Result<(), EditorError> {
        let pos = self
            .documents
            .iter()
            .position(|d| d.path == path)
            .ok_or_else(|| EditorError::NoDocument(path.to_path_buf()))?;
        let doc = self.documents.remove(pos);
        if self.active == Some(doc.handle) {
            self.active = self.documents.last().map(|d| d.handle);
        }
        Ok(())
    }

    fn open_and_focus(&mut self, path: &Path, line: u32) -> Result<(), EditorError> {
        if self.faults.focus_fails {
            return Err(EditorError::Rejected("focus request refused".into()));
        }
        self.open_file(path)?;
        self.set_cursor_line(line);
        Ok(())
    }

    fn resolve_handle(&self, path: &Path) -> Option<DocumentHandle> {
        let doc = self.documents.iter().find(|d| d.path == path)?;
        let pending = doc.ready_after.get();
        if pending > 0 {
            doc.ready_after.set(pending - 1);
            return None;
        }
        Some(DocumentHandle(doc.handle))
    }

    fn tile_of(&self, handle: DocumentHandle) -> Result<TileNumber, EditorError> {
        let doc = self.doc(handle)?;
        Ok(if doc.external.is_some() { -1 } else { doc.tile })
    }

    fn geometry(&self, handle: DocumentHandle) -> Result<Rect, EditorError> {
        let doc = self.doc(handle)?;
        if let Some(rect) = doc.external {
            return Ok(rect);
        }
        let cells = self.visible_cells();
        let cell = cells
            .get(doc.tile.max(0) as usize)
            .copied()
            .ok_or_else(|| EditorError::ViewNotReady(doc.path.clone()))?;
        Ok(self.cell_rect(cell))
    }

    fn grid_dimensions(&self) -> Result<GridSize, EditorError> {
        Ok(self.grid)
    }

    fn set_grid_dimensions(&mut self, size: GridSize) -> Result<(), EditorError> {
        if size.width == 0 || size.height == 0 {
            return Err(EditorError::Rejected(format!(
                "grid must be at least 1x1, got {}x{}",
                size.width, size.height
            )));
        }
        self.counters.grid_applies += 1;
        self.reset_grid(size);
        Ok(())
    }

    fn maximize(&mut self) -> Result<(), EditorError> {
        self.counters.maximize_calls += 1;
        self.reset_grid(GridSize::SINGLE);
        Ok(())
    }

    fn set_column_span(&mut self, row: u32, col: u32, span: u32) -> Result<(), EditorError> {
        self.set_span(row, col, span, false)
    }

    fn set_row_span(&mut self, row: u32, col: u32, span: u32) -> Result<(), EditorError> {
        self.set_span(row, col, span, true)
    }

    fn set_row_heights(&mut self, ratios: &[f64]) -> Result<(), EditorError> {
        if ratios.len() != self.grid.height as usize {
            return Err(EditorError::Rejected(format!(
                "{} row heights for {} rows",
                ratios.len(),
                self.grid.height
            )));
        }
        self.row_heights = ratios.to_vec();
        Ok(())
    }

    fn set_column_widths(&mut self, ratios: &[f64]) -> Result<(), EditorError> {
        if ratios.len() != self.grid.width as usize {
            return Err(EditorError::Rejected(format!(
                "{} column widths for {} columns",
                ratios.len(),
                self.grid.width
            )));
        }
        self.column_widths = ratios.to_vec();
        Ok(())
    }

    fn set_tile(&mut self, handle: DocumentHandle, tile: u32) -> Result<(), EditorError> {
        let count = self.live_tile_count();
        let grid = self.grid;
        let ignore_from = self.faults.ignore_moves_from;
        let path = self.doc(handle)?.path.clone();
        if let Some(remaining) = self.faults.flaky_views.get_mut(&path) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(EditorError::ViewNotReady(path));
            }
        }
        if tile >= count {
            return Err(EditorError::InvalidTile {
                tile,
                width: grid.width,
                height: grid.height,
            });
        }
        if ignore_from.is_some_and(|limit| tile >= limit) {
            return Ok(());
        }
        let doc = self.doc_mut(handle)?;
        doc.tile = tile as TileNumber;
        doc.external = None;
        Ok(())
    }

    fn set_external(&mut self, handle: DocumentHandle, rect: Rect) -> Result<(), EditorError> {
        let doc = self.doc_mut(handle)?;
        doc.tile = -1;
        doc.external = Some(rect);
        Ok(())
    }

    fn working_directory(&self) -> Result<PathBuf, EditorError> {
        Ok(self.working_directory.clone())
    }

    fn set_working_directory(&mut self, dir: &Path) -> Result<(), EditorError> {
        self.working_directory = dir.to_path_buf();
        Ok(())
    }

    fn search_path(&self) -> Result<String, EditorError> {
        Ok(self.search_path.clone())
    }

    fn set_search_path(&mut self, path: &str) -> Result<(), EditorError> {
        self.search_path = path.to_string();
        Ok(())
    }

    fn file_exists(&self, path: &Path) -> bool {
        self.disk.contains(path)
    }

    fn locate(&self, file_name: &str) -> Vec<PathBuf> {
        self.disk
            .iter()
            .filter(|p| file_name_of(p) == Some(file_name))
            .cloned()
            .collect()
    }

    fn create_file(&mut self, path: &Path, _contents: &str) -> Result<(), EditorError> {
        self.disk.insert(path.to_path_buf());
        Ok(())
    }

    fn delete_file(&mut self, path: &Path) -> Result<(), EditorError> {
        self.disk.remove(path);
        Ok(())
    }
}
