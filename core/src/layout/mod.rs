//! Layout handling: snapshot capture, grid recompute, and tile correlation.
//!
//! `capture` reads the live editor into a `SessionRecord`. `grid` turns saved
//! pixel geometry into a rank-based grid plan with spans and ratios.
//! `correlate` applies a plan to the editor and discovers which live tile
//! ended up in each planned cell.

pub mod capture;
pub mod correlate;
pub mod grid;
