//! Layout recompute: derive grid cells, spans, and ratios from saved tile
//! geometry.
//!
//! Pixel rectangles captured on one machine are meaningless on another, so
//! only their *order* and *proportions* are used. Each docked tile's column
//! is the rank of its left edge among the distinct left edges of all docked
//! tiles, and its column span is the rank of its right edge among the
//! distinct right edges, minus that column, plus one. Rows work the same way
//! on the vertical axis.

use std::collections::BTreeSet;

use crate::error::SessionError;
use crate::types::session::{GridSize, Layout, Rect, TileNumber, TileRect};

/// Grid placement for one saved docked tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedTile {
    pub tile_number: TileNumber,
    pub row: u32,
    pub col: u32,
    pub row_span: u32,
    pub col_span: u32,
}

/// Everything needed to rebuild the saved grid on a live window manager.
#[derive(Debug, Clone, PartialEq)]
pub struct GridPlan {
    pub size: GridSize,
    /// Docked tiles ordered by (row, col).
    pub tiles: Vec<PlannedTile>,
    /// Column widths as fractions summing to 1.
    pub column_widths: Vec<f64>,
    /// Row heights as fractions summing to 1.
    pub row_heights: Vec<f64>,
}

impl GridPlan {
    pub fn is_single(&self) -> bool {
        self.size.is_single()
    }

    pub fn has_spans(&self) -> bool {
        self.tiles.iter().any(|t| t.row_span > 1 || t.col_span > 1)
    }

    pub fn tile(&self, tile_number: TileNumber) -> Option<&PlannedTile> {
        self.tiles.iter().find(|t| t.tile_number == tile_number)
    }
}

/// Recompute the grid for `layout`, failing fast when the saved geometry does
/// not describe exactly `grid_width` x `grid_height` cells.
pub fn plan(session: &str, layout: &Layout) -> Result<GridPlan, SessionError> {
    let size = layout.grid_size();
    if size.width == 0 || size.height == 0 {
        return Err(SessionError::layout(
            session,
            format!("grid is {}x{}", size.width, size.height),
        ));
    }
    let docked: Vec<&TileRect> = layout.docked_tiles().collect();

    if size.is_single() && docked.is_empty() {
        return Ok(GridPlan {
            size,
            tiles: Vec::new(),
            column_widths: vec![1.0],
            row_heights: vec![1.0],
        });
    }

    let edges = docked
        .iter()
        .map(|t| far_edges(session, t))
        .collect::<Result<Vec<_>, _>>()?;
    let col_starts = distinct(docked.iter().map(|t| t.x));
    let col_ends = distinct(edges.iter().map(|e| e.0));
    let row_starts = distinct(docked.iter().map(|t| t.y));
    let row_ends = distinct(edges.iter().map(|e| e.1));

    for (what, found, expected) in [
        ("column starts", col_starts.len(), size.width),
        ("column ends", col_ends.len(), size.width),
        ("row starts", row_starts.len(), size.height),
        ("row ends", row_ends.len(), size.height),
    ] {
        if found != expected as usize {
            return Err(SessionError::layout(
                session,
                format!("{} distinct {}, expected {}", found, what, expected),
            ));
        }
    }

    let mut tiles = Vec::with_capacity(docked.len());
    for (t, (right, bottom)) in docked.iter().zip(&edges) {
        let col = rank(&col_starts, t.x);
        let row = rank(&row_starts, t.y);
        let col_end = rank(&col_ends, *right);
        let row_end = rank(&row_ends, *bottom);
        if col_end < col || row_end < row {
            return Err(SessionError::layout(
                session,
                format!("tile {} ends before it starts", t.tile_number),
            ));
        }
        tiles.push(PlannedTile {
            tile_number: t.tile_number,
            row,
            col,
            row_span: row_end - row + 1,
            col_span: col_end - col + 1,
        });
    }
    check_coverage(session, size, &tiles)?;
    tiles.sort_by_key(|t| (t.row, t.col));

    Ok(GridPlan {
        size,
        tiles,
        column_widths: ratios(&col_starts, &col_ends),
        row_heights: ratios(&row_starts, &row_ends),
    })
}

/// Right and bottom edge of a docked tile.
fn far_edges(session: &str, t: &TileRect) -> Result<(i32, i32), SessionError> {
    match (t.x.checked_add(t.width), t.y.checked_add(t.height)) {
        (Some(right), Some(bottom)) => Ok((right, bottom)),
        _ => Err(SessionError::layout(
            session,
            format!("tile {} extends past the coordinate range", t.tile_number),
        )),
    }
}

/// Each grid cell must be covered by exactly one docked tile.
fn check_coverage(session: &str, size: GridSize, tiles: &[PlannedTile]) -> Result<(), SessionError> {
    let w = size.width as usize;
    let h = size.height as usize;
    let mut owner: Vec<Option<TileNumber>> = vec![None; w * h];
    for t in tiles {
        for r in t.row..t.row + t.row_span {
            for c in t.col..t.col + t.col_span {
                let slot = &mut owner[r as usize * w + c as usize];
                if let Some(other) = slot {
                    return Err(SessionError::layout(
                        session,
                        format!(
                            "tiles {} and {} overlap at row {}, column {}",
                            other, t.tile_number, r, c
                        ),
                    ));
                }
                *slot = Some(t.tile_number);
            }
        }
    }
    let covered = owner.iter().filter(|o| o.is_some()).count();
    if covered != w * h {
        return Err(SessionError::layout(
            session,
            format!("docked tiles cover {} of {} cells", covered, w * h),
        ));
    }
    Ok(())
}

/// `(row, col)` of each rectangle by rank of its top-left corner.
pub fn rank_positions(rects: &[Rect]) -> Vec<(u32, u32)> {
    let xs = distinct(rects.iter().map(|r| r.x));
    let ys = distinct(rects.iter().map(|r| r.y));
    rects
        .iter()
        .map(|r| (rank(&ys, r.y), rank(&xs, r.x)))
        .collect()
}

fn distinct(values: impl Iterator<Item = i32>) -> Vec<i32> {
    values.collect::<BTreeSet<_>>().into_iter().collect()
}

fn rank(sorted: &[i32], value: i32) -> u32 {
    sorted.partition_point(|v| *v < value) as u32
}

fn ratios(starts: &[i32], ends: &[i32]) -> Vec<f64> {
    let extents: Vec<f64> = starts
        .iter()
        .zip(ends)
        .map(|(s, e)| (i64::from(*e) - i64::from(*s)).max(0) as f64)
        .collect();
    let total: f64 = extents.iter().sum();
    if total <= 0.0 {
        return vec![1.0 / extents.len() as f64; extents.len()];
    }
    extents.iter().map(|e| e / total).collect()
}


#[cfg(test)]
mod tests {
    use super::*;

    fn tile(n: TileNumber, x: i32, y: i32, w: i32, h: i32) -> TileRect {
        TileRect::new(n, Rect::new(x, y, w, h))
    }

    fn layout(w: u32, h: u32, tiles: Vec<TileRect>) -> Layout {
        Layout {
            grid_width: w,
            grid_height: h,
            tiles,
        }
    }

    #[test]
    fn two_by_two_ranks_cells() {
        let l = layout(
            2,
            2,
            vec![
                tile(0, 0, 0, 300, 200),
                tile(1, 0, 205, 300, 395),
                tile(2, 305, 0, 695, 200),
                tile(3, 305, 205, 695, 395),
            ],
        );
        let p = plan("s", &l).unwrap();
        assert_eq!(p.tile(1).map(|t| (t.row, t.col)), Some((1, 0)));
        assert_eq!(p.tile(2).map(|t| (t.row, t.col)), Some((0, 1)));
        assert!(!p.has_spans());
        assert!((p.column_widths[0] - 300.0 / 995.0).abs() < 1e-9);
        assert!((p.row_heights.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn spanning_tile_gets_span() {
        // One wide tile on top, two below.
        let l = layout(
            2,
            2,
            vec![
                tile(0, 0, 0, 1000, 300),
                tile(1, 0, 300, 500, 300),
                tile(2, 500, 300, 500, 300),
            ],
        );
        let p = plan("s", &l).unwrap();
        let wide = p.tile(0).unwrap();
        assert_eq!((wide.col_span, wide.row_span), (2, 1));
        assert!(p.has_spans());
    }

    #[test]
    fn single_grid_without_docked_tiles_is_fine() {
        let l = layout(1, 1, vec![tile(-1, 40, 40, 300, 300)]);
        let p = plan("s", &l).unwrap();
        assert!(p.is_single());
        assert!(p.tiles.is_empty());
    }

    #[test]
    fn wrong_column_count_is_inconsistent() {
        let l = layout(
            3,
            1,
            vec![tile(0, 0, 0, 500, 600), tile(1, 500, 0, 500, 600)],
        );
        match plan("s", &l) {
            Err(SessionError::LayoutInconsistent { reason, .. }) => {
                assert!(reason.contains("column starts"), "{}", reason)
            }
            other => panic!("expected LayoutInconsistent, got {:?}", other),
        }
    }

    #[test]
    fn missing_cell_is_inconsistent() {
        // 2x2 grid but the bottom-right tile was never captured.
        let l = layout(
            2,
            2,
            vec![
                tile(0, 0, 0, 500, 300),
                tile(1, 0, 300, 500, 300),
                tile(2, 500, 0, 500, 300),
            ],
        );
        match plan("s", &l) {
            Err(SessionError::LayoutInconsistent { reason, .. }) => {
                assert!(reason.contains("3 of 4"), "{}", reason)
            }
            other => panic!("expected LayoutInconsistent, got {:?}", other),
        }
    }

    #[test]
    fn overlapping_tiles_are_inconsistent() {
        let l = layout(
            2,
            1,
            vec![
                tile(0, 0, 0, 500, 600),
                tile(1, 500, 0, 500, 600),
                tile(2, 500, 0, 500, 600),
            ],
        );
        assert!(matches!(
            plan("s", &l),
            Err(SessionError::LayoutInconsistent { .. })
        ));
    }

    #[test]
    fn externals_are_ignored_by_the_grid() {
        let l = layout(
            1,
            1,
            vec![tile(0, 0, 0, 800, 600), tile(-1, 10, 10, 100, 100)],
        );
        let p = plan("s", &l).unwrap();
        assert_eq!(p.tiles.len(), 1);
    }

    #[test]
    fn overflowing_geometry_is_inconsistent() {
        let l = layout(1, 1, vec![tile(0, i32::MAX - 10, 0, 100, 600)]);
        match plan("s", &l) {
            Err(SessionError::LayoutInconsistent { reason, .. }) => {
                assert!(reason.contains("coordinate range"), "{}", reason)
            }
            other => panic!("expected LayoutInconsistent, got {:?}", other),
        }
        let tall = layout(1, 1, vec![tile(0, 0, 10, 100, i32::MAX)]);
        assert!(matches!(
            plan("s", &tall),
            Err(SessionError::LayoutInconsistent { .. })
        ));
    }

    #[test]
    fn extreme_but_valid_edges_give_finite_ratios() {
        let l = layout(
            2,
            1,
            vec![tile(0, i32::MIN, 0, i32::MAX, 10), tile(1, -1, 0, i32::MAX, 10)],
        );
        let p = plan("s", &l).unwrap();
        assert!((p.column_widths.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn rank_positions_buckets_corners() {
        let rects = [
            Rect::new(600, 0, 10, 10),
            Rect::new(0, 400, 10, 10),
            Rect::new(0, 0, 10, 10),
        ];
        assert_eq!(rank_positions(&rects), vec![(0, 1), (1, 0), (0, 0)]);
    }
}
