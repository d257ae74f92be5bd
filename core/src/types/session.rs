use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Tile numbers below zero denote an external (floating) window.
pub type TileNumber = i32;

/// Pixel rectangle as reported by the window manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Rect {
        Rect {
            x,
            y,
            width,
            height,
        }
    }
}

/// Dimensions of the docked tile grid, in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub width: u32,
    pub height: u32,
}

impl GridSize {
    pub const SINGLE: GridSize = GridSize {
        width: 1,
        height: 1,
    };

    pub fn new(width: u32, height: u32) -> GridSize {
        GridSize { width, height }
    }

    pub fn is_single(&self) -> bool {
        *self == GridSize::SINGLE
    }
}

/// Geometry of one tile as observed at capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRect {
    pub tile_number: TileNumber,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl TileRect {
    pub fn new(tile_number: TileNumber, rect: Rect) -> TileRect {
        TileRect {
            tile_number,
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn is_external(&self) -> bool {
        self.tile_number < 0
    }
}

/// Tile grid shared by every file in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub grid_width: u32,
    pub grid_height: u32,
    #[serde(default)]
    pub tiles: Vec<TileRect>,
}

impl Layout {
    pub fn grid_size(&self) -> GridSize {
        GridSize::new(self.grid_width, self.grid_height)
    }

    pub fn tile(&self, tile_number: TileNumber) -> Option<&TileRect> {
        self.tiles.iter().find(|t| t.tile_number == tile_number)
    }

    pub fn docked_tiles(&self) -> impl Iterator<Item = &TileRect> {
        self.tiles.iter().filter(|t| !t.is_external())
    }
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            grid_width: 1,
            grid_height: 1,
            tiles: Vec::new(),
        }
    }
}

/// A file recorded in a session and the tile it was shown in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: PathBuf,
    pub tile_number: TileNumber,
}

impl FileEntry {
    pub fn new(path: impl Into<PathBuf>, tile_number: TileNumber) -> FileEntry {
        FileEntry {
            path: path.into(),
            tile_number,
        }
    }

    /// Base name used to find the file when it has moved.
    pub fn file_name(&self) -> Option<&str> {
        file_name_of(&self.path)
    }
}

/// A persisted snapshot of editor state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub name: String,
    pub working_directory: PathBuf,
    #[serde(default)]
    pub search_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_file: Option<PathBuf>,
    #[serde(default)]
    pub active_file_position: u32,
    pub last_used: String,
    pub last_saved: String,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub files: Vec<FileEntry>,
}

impl SessionRecord {
    pub fn summary(&self, index: usize) -> SessionSummary {
        SessionSummary {
            index,
            name: self.name.clone(),
            file_count: self.files.len(),
            working_directory: self.working_directory.clone(),
            last_used: self.last_used.clone(),
            last_saved: self.last_saved.clone(),
        }
    }

    /// Tile numbers referenced by files in this session that have no geometry.
    pub fn dangling_tiles(&self) -> Vec<TileNumber> {
        let mut missing: Vec<TileNumber> = self
            .files
            .iter()
            .map(|f| f.tile_number)
            .filter(|n| self.layout.tile(*n).is_none())
            .collect();
        missing.sort_unstable();
        missing.dedup();
        missing
    }
}

/// One row of the store listing. `index` is 1-based load order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub index: usize,
    pub name: String,
    pub file_count: usize,
    pub working_directory: PathBuf,
    pub last_used: String,
    pub last_saved: String,
}

pub fn file_name_of(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}
