//! Tile correlation: apply a grid plan and learn which live tile number the
//! window manager gave each logical cell.
//!
//! Window managers number tiles by internal order, not by position. To learn
//! the mapping, one marker file per docked tile is opened, parked on tile 0,
//! then moved to live tile `i`. Reading the markers back and ranking their
//! top-left corners exactly as the planner ranked the saved geometry yields
//! each marker's `(row, col)`. The mapping must be a bijection; anything else
//! aborts the restore before a single session file is moved.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::editor::{DocumentHandle, Editor};
use crate::error::SessionError;
use crate::layout::grid::{rank_positions, GridPlan};
use crate::types::config::Settings;
use crate::types::session::{GridSize, Rect, TileNumber};

/// Saved docked tile number -> live tile number.
pub type TileMap = HashMap<TileNumber, u32>;

/// Ask the window manager to realize `plan`.
///
/// `previous` is the grid that was live before this call. A single-cell plan
/// maximizes instead of tiling, and does nothing when the editor is already
/// single-celled.
pub fn apply_plan(editor: &mut dyn Editor, plan: &GridPlan, previous: GridSize) -> Result<(), SessionError> {
    if plan.is_single() {
        if previous.is_single() {
            debug!("document area already single-celled, leaving it alone");
        } else {
            editor.maximize()?;
        }
        return Ok(());
    }

    issue_grid(editor, plan)?;
    if previous.is_single() && plan.has_spans() {
        // The first grid request after a single-cell area does not always
        // redistribute existing windows; a second identical request does.
        debug!("re-applying grid after leaving a single-cell area");
        issue_grid(editor, plan)?;
    }
    info!(
        width = plan.size.width,
        height = plan.size.height,
        tiles = plan.tiles.len(),
        "applied grid"
    );
    Ok(())
}

fn issue_grid(editor: &mut dyn Editor, plan: &GridPlan) -> Result<(), SessionError> {
    editor.set_grid_dimensions(plan.size)?;
    for t in &plan.tiles {
        if t.col_span > 1 {
            editor.set_column_span(t.row, t.col, t.col_span)?;
        }
        if t.row_span > 1 {
            editor.set_row_span(t.row, t.col, t.row_span)?;
        }
    }
    editor.set_column_widths(&plan.column_widths)?;
    editor.set_row_heights(&plan.row_heights)?;
    Ok(())
}

/// Discover the live tile number of every planned tile.
pub fn correlate(editor: &mut dyn Editor, plan: &GridPlan, settings: &Settings) -> Result<TileMap, SessionError> {
    if plan.is_single() {
        return Ok(plan.tiles.iter().map(|t| (t.tile_number, 0)).collect());
    }

    let markers: Vec<PathBuf> = (0..plan.tiles.len()).map(|i| settings.marker_path(i)).collect();
    let result = place_markers(editor, &markers, settings)
        .and_then(|live| match_positions(plan, &live));
    remove_markers(editor, &markers);

    if let Ok(map) = &result {
        debug!(?map, "correlated tiles");
    }
    result
}

/// Open every marker, park it on tile 0, move it to its own tile, and read
/// back where it landed. A marker that misses the poll deadline is looked up
/// again once the others are placed, and once more at read-back.
fn place_markers(
    editor: &mut dyn Editor,
    markers: &[PathBuf],
    settings: &Settings,
) -> Result<Vec<Option<Rect>>, SessionError> {
    let timeout = Duration::from_millis(settings.marker_timeout_ms);
    let interval = Duration::from_millis(settings.marker_poll_interval_ms.max(1));
    let mut handles: Vec<Option<DocumentHandle>> = Vec::with_capacity(markers.len());

    for (i, path) in markers.iter().enumerate() {
        editor.create_file(path, &format!("tile marker {}\n", i))?;
        editor.open_file(path)?;
        let handle = wait_for_handle(editor, path, timeout, interval);
        match handle {
            Some(h) => move_marker(editor, h, i)?,
            None => warn!(marker = %path.display(), "marker did not appear in time, continuing"),
        }
        handles.push(handle);
    }

    for _ in 0..2 {
        for (i, path) in markers.iter().enumerate() {
            if handles[i].is_some() {
                continue;
            }
            if let Some(h) = editor.resolve_handle(path) {
                debug!(marker = %path.display(), "late marker appeared");
                move_marker(editor, h, i)?;
                handles[i] = Some(h);
            }
        }
    }

    Ok(handles
        .iter()
        .map(|h| h.and_then(|h| editor.geometry(h).ok()))
        .collect())
}

fn move_marker(editor: &mut dyn Editor, handle: DocumentHandle, tile: usize) -> Result<(), SessionError> {
    for target in [0, tile as u32] {
        editor.set_tile(handle, target).map_err(|e| {
            SessionError::Correlation(format!("could not move marker to live tile {}: {}", target, e))
        })?;
    }
    Ok(())
}

fn wait_for_handle(
    editor: &dyn Editor,
    path: &Path,
    timeout: Duration,
    interval: Duration,
) -> Option<DocumentHandle> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(h) = editor.resolve_handle(path) {
            return Some(h);
        }
        if Instant::now() >= deadline {
            return None;
        }
        std::thread::sleep(interval);
    }
}

fn remove_markers(editor: &mut dyn Editor, markers: &[PathBuf]) {
    for path in markers {
        if editor_has_open(editor, path) {
            if let Err(e) = editor.close_file(path) {
                warn!(marker = %path.display(), error = %e, "failed to close marker");
            }
        }
        if let Err(e) = editor.delete_file(path) {
            warn!(marker = %path.display(), error = %e, "failed to delete marker");
        }
    }
}

fn editor_has_open(editor: &dyn Editor, path: &Path) -> bool {
    editor
        .list_open_files()
        .map(|files| files.iter().any(|f| f == path))
        .unwrap_or(false)
}

/// Match each planned `(row, col)` to the live tile whose marker landed
/// there. `live[i]` is where the marker for live tile `i` ended up.
pub fn match_positions(plan: &GridPlan, live: &[Option<Rect>]) -> Result<TileMap, SessionError> {
    if live.len() != plan.tiles.len() {
        return Err(SessionError::Correlation(format!(
            "{} markers for {} tiles",
            live.len(),
            plan.tiles.len()
        )));
    }
    let mut rects = Vec::with_capacity(live.len());
    for (i, r) in live.iter().enumerate() {
        match r {
            Some(r) => rects.push(*r),
            None => {
                return Err(SessionError::Correlation(format!(
                    "marker for live tile {} never appeared",
                    i
                )))
            }
        }
    }

    let positions = rank_positions(&rects);
    let mut seen: HashMap<(u32, u32), usize> = HashMap::new();
    for (i, pos) in positions.iter().enumerate() {
        if let Some(other) = seen.insert(*pos, i) {
            return Err(SessionError::Correlation(format!(
                "live tiles {} and {} occupy the same position (row {}, column {})",
                other, i, pos.0, pos.1
            )));
        }
    }

    let mut map = TileMap::new();
    for t in &plan.tiles {
        let live_tile = seen.get(&(t.row, t.col)).ok_or_else(|| {
            SessionError::Correlation(format!(
                "no live tile at row {}, column {} for saved tile {}",
                t.row, t.col, t.tile_number
            ))
        })?;
        map.insert(t.tile_number, *live_tile as u32);
    }
    Ok(map)
}
