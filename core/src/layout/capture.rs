//! Snapshot capture: build a session record from the live editor.
//!
//! Open files are walked in the editor's enumeration order. Docked files keep
//! their live tile number, and the first file seen in each tile contributes
//! that tile's geometry. Every floating file becomes its own external tile,
//! numbered `-1, -2, -3, …` in first-seen order.

use tracing::{debug, warn};

use crate::editor::Editor;
use crate::error::SessionError;
use crate::types::session::{FileEntry, Layout, SessionRecord, TileNumber, TileRect};

pub fn capture(editor: &dyn Editor, name: &str, now: &str) -> Result<SessionRecord, SessionError> {
    let grid = editor.grid_dimensions()?;
    let mut tiles: Vec<TileRect> = Vec::new();
    let mut files: Vec<FileEntry> = Vec::new();
    let mut lowest_external: TileNumber = 0;

    for path in editor.list_open_files()? {
        let Some(handle) = editor.resolve_handle(&path) else {
            warn!(path = %path.display(), "open file has no view, leaving it out of the snapshot");
            continue;
        };
        let live = editor.tile_of(handle)?;
        let tile_number = if live < 0 {
            lowest_external -= 1;
            lowest_external
        } else {
            live
        };
        if !tiles.iter().any(|t| t.tile_number == tile_number) {
            let rect = editor.geometry(handle)?;
            tiles.push(TileRect::new(tile_number, rect));
        }
        files.push(FileEntry::new(path, tile_number));
    }

    let (active_file, active_file_position) = match editor.active_file()? {
        Some((path, line)) => (Some(path), line),
        None => (None, 0),
    };

    debug!(
        session = name,
        files = files.len(),
        tiles = tiles.len(),
        grid_width = grid.width,
        grid_height = grid.height,
        "captured snapshot"
    );

    Ok(SessionRecord {
        name: name.to_string(),
        working_directory: editor.working_directory()?,
        search_path: editor.search_path()?,
        active_file,
        active_file_position,
        last_used: now.to_string(),
        last_saved: now.to_string(),
        layout: Layout {
            grid_width: grid.width,
            grid_height: grid.height,
            tiles,
        },
        files,
    })
}
