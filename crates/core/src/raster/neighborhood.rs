//! D8 neighborhood for raster analysis

/// D8 neighbor offsets: (row_offset, col_offset)
pub const D8_OFFSETS: [(isize, isize); 8] = [
    (-1, -1), (-1, 0), (-1, 1),
    (0, -1),           (0, 1),
    (1, -1),  (1, 0),  (1, 1),
];

/// The three downward D8 neighbors (toward the next row), left to right.
///
/// Walking one row with these offsets enumerates every 8-adjacency between
/// that row and the row below it exactly once.
pub const D8_DOWNWARD: [(isize, isize); 3] = [(1, -1), (1, 0), (1, 1)];

/// Translate (row, col) by a neighbor offset, staying inside (rows, cols).
pub fn translate(
    row: usize,
    col: usize,
    offset: (isize, isize),
    rows: usize,
    cols: usize,
) -> Option<(usize, usize)> {
    let nr = row as isize + offset.0;
    let nc = col as isize + offset.1;
    if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
        None
    } else {
        Some((nr as usize, nc as usize))
    }
}
