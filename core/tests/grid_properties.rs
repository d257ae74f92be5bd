use std::collections::BTreeSet;

use proptest::prelude::*;

use edsession_core::editor::memory::MemoryEditor;
use edsession_core::editor::Editor;
use edsession_core::layout::correlate::{apply_plan, correlate};
use edsession_core::layout::grid::plan;
use edsession_core::types::config::Settings;
use edsession_core::types::session::{Layout, Rect, TileRect};

/// A valid layout: the first row is fully split so every column boundary is
/// observed, later rows merge neighbouring columns where `joins` says so.
/// Transposed layouts merge rows instead.
fn layout_strategy() -> impl Strategy<Value = Layout> {
    (1usize..5, 1usize..5, any::<bool>()).prop_flat_map(|(w, h, flip)| {
        (
            prop::collection::vec(20i32..400, w),
            prop::collection::vec(20i32..300, h),
            prop::collection::vec(prop::collection::vec(any::<bool>(), w.saturating_sub(1)), h),
        )
            .prop_map(move |(widths, heights, joins)| {
                let layout = build_layout(&widths, &heights, &joins);
                if flip {
                    transpose(layout)
                } else {
                    layout
                }
            })
    })
}

fn transpose(layout: Layout) -> Layout {
    Layout {
        grid_width: layout.grid_height,
        grid_height: layout.grid_width,
        tiles: layout
            .tiles
            .iter()
            .map(|t| TileRect::new(t.tile_number, Rect::new(t.y, t.x, t.height, t.width)))
            .collect(),
    }
}

fn build_layout(widths: &[i32], heights: &[i32], joins: &[Vec<bool>]) -> Layout {
    let xs: Vec<i32> = std::iter::once(0)
        .chain(widths.iter().scan(0, |acc, w| {
            *acc += w;
            Some(*acc)
        }))
        .collect();
    let mut y = 0;
    let mut tiles = Vec::new();
    for (r, height) in heights.iter().enumerate() {
        let mut start = 0;
        for c in 0..widths.len() {
            let last = c + 1 == widths.len();
            let join = r > 0 && !last && joins[r][c];
            if !join {
                let n = tiles.len() as i32;
                tiles.push(TileRect::new(n, Rect::new(xs[start], y, xs[c + 1] - xs[start], *height)));
                start = c + 1;
            }
        }
        y += height;
    }
    Layout {
        grid_width: widths.len() as u32,
        grid_height: heights.len() as u32,
        tiles,
    }
}

fn settings() -> Settings {
    Settings {
        marker_dir: "/markers".into(),
        marker_timeout_ms: 50,
        marker_poll_interval_ms: 1,
        ..Settings::default()
    }
}

proptest! {
    #[test]
    fn spans_fill_every_row_and_column(layout in layout_strategy()) {
        let p = plan("prop", &layout).unwrap();
        let (w, h) = (p.size.width, p.size.height);
        for r in 0..h {
            let across: u32 = p
                .tiles
                .iter()
                .filter(|t| t.row <= r && r < t.row + t.row_span)
                .map(|t| t.col_span)
                .sum();
            prop_assert_eq!(across, w);
        }
        for c in 0..w {
            let down: u32 = p
                .tiles
                .iter()
                .filter(|t| t.col <= c && c < t.col + t.col_span)
                .map(|t| t.row_span)
                .sum();
            prop_assert_eq!(down, h);
        }
        prop_assert!((p.column_widths.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        prop_assert!((p.row_heights.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn correlation_is_a_bijection(layout in layout_strategy()) {
        let p = plan("prop", &layout).unwrap();
        let mut ed = MemoryEditor::default();
        let previous = ed.grid_dimensions().unwrap();
        apply_plan(&mut ed, &p, previous).unwrap();
        let map = correlate(&mut ed, &p, &settings()).unwrap();

        prop_assert_eq!(map.len(), p.tiles.len());
        let live: BTreeSet<u32> = map.values().copied().collect();
        prop_assert_eq!(live.len(), p.tiles.len());
        let expected: BTreeSet<u32> = (0..p.tiles.len() as u32).collect();
        prop_assert_eq!(live, expected);
        prop_assert!(ed.list_open_files().unwrap().is_empty());
    }

    #[test]
    fn transposed_layouts_swap_spans(layout in layout_strategy()) {
        let p = plan("prop", &layout).unwrap();
        let t = plan("prop", &transpose(layout)).unwrap();
        prop_assert_eq!((t.size.width, t.size.height), (p.size.height, p.size.width));
        for tile in &p.tiles {
            let other = t.tile(tile.tile_number).unwrap();
            prop_assert_eq!((other.row, other.col), (tile.col, tile.row));
            prop_assert_eq!((other.row_span, other.col_span), (tile.col_span, tile.row_span));
        }
    }
}
