use crate::{Coord, Grid, TileValue};

// SAFETY: 2 > 0.
const TWO: TileValue = unsafe { TileValue::new_unchecked(2) };

/// One cluster merge: `into` absorbed every cell in `absorbed`, all of which held `value`.
#[derive(Eq, PartialEq, Clone, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Merge {
    pub into: Coord,
    pub absorbed: Vec<Coord>,
    pub value: TileValue,
    pub merged_value: TileValue,
}

/// Outcome of resolving a board to its fixed point.
#[derive(Eq, PartialEq, Clone, Hash, Default, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Resolution {
    /// Gravity/merge rounds that changed the board.
    pub passes: usize,
    pub merges: Vec<Merge>,
    pub score_bonus: u64,
}

impl Merge {
    /// Value of a tile after absorbing `matched` equal neighbors at once: `value * 2^matched`.
    pub fn merged(value: TileValue, matched: usize) -> TileValue {
        (0..matched).fold(value, |acc, _| acc.saturating_mul(TWO))
    }
}

/// Compacts every column towards the floor, keeping the relative order of its tiles.
///
/// Returns whether any tile ended up in a different row.
pub fn gravity_collapse(grid: &mut Grid) -> bool {
    let rows = grid.rows();
    let mut moved = false;
    for col in 0..grid.cols() {
        let stack: Vec<(usize, TileValue)> = (0..rows)
            .rev()
            .filter_map(|row| grid.take((row, col)).map(|value| (row, value)))
            .collect();
        for (landing_row, (row, value)) in (0..rows).rev().zip(stack) {
            grid.set((landing_row, col), Some(value));
            moved |= landing_row != row;
        }
    }
    moved
}

/// One sweep, floor line first and left to right within a line, collapsing every cell
/// together with its unconsumed equal-valued neighbors into the cell itself.
pub fn merge_pass(grid: &mut Grid) -> Vec<Merge> {
    merge_pass_from(grid, None)
}

/// Like [`merge_pass`], but `focus` (typically the cell a tile just locked into) is examined
/// before the regular sweep.
///
/// A cell takes part in at most one merge per sweep.
pub fn merge_pass_from(grid: &mut Grid, focus: Option<Coord>) -> Vec<Merge> {
    let (rows, cols) = (grid.rows(), grid.cols());
    let mut consumed = vec![vec![false; cols]; rows];
    let sweep = (0..rows)
        .rev()
        .flat_map(|row| (0..cols).map(move |col| (row, col)));
    focus
        .into_iter()
        .chain(sweep)
        .filter_map(|coord| merge_at(grid, &mut consumed, coord))
        .collect()
}

fn merge_at(grid: &mut Grid, consumed: &mut [Vec<bool>], (row, col): Coord) -> Option<Merge> {
    if !grid.contains((row, col)) || consumed[row][col] {
        return None;
    }
    let value = grid.get((row, col))?;
    let absorbed: Vec<Coord> = grid
        .neighbors((row, col))
        .filter(|&(r, c)| !consumed[r][c] && grid.get((r, c)) == Some(value))
        .collect();
    if absorbed.is_empty() {
        return None;
    }
    for &(r, c) in &absorbed {
        grid.set((r, c), None);
        consumed[r][c] = true;
    }
    let merged_value = Merge::merged(value, absorbed.len());
    grid.set((row, col), Some(merged_value));
    consumed[row][col] = true;
    Some(Merge {
        into: (row, col),
        absorbed,
        value,
        merged_value,
    })
}

/// Alternates gravity and merging until neither changes the board, then settles once more.
pub fn resolve(grid: &mut Grid) -> Resolution {
    resolve_from(grid, None)
}

/// [`resolve`], with `focus` getting first pick of its neighbors in the first merge sweep.
pub fn resolve_from(grid: &mut Grid, mut focus: Option<Coord>) -> Resolution {
    let mut resolution = Resolution::default();
    loop {
        let moved = gravity_collapse(grid);
        let merges = merge_pass_from(grid, focus.take());
        if !moved && merges.is_empty() {
            break;
        }
        resolution.passes += 1;
        debug_assert!(
            resolution.passes <= grid.rows() * grid.cols(),
            "resolution did not reach a fixed point"
        );
        resolution.score_bonus = merges.iter().fold(resolution.score_bonus, |score, merge| {
            score.saturating_add(merge.merged_value.get())
        });
        resolution.merges.extend(merges);
    }
    gravity_collapse(grid);
    resolution
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(lines: &[&[u64]]) -> Grid {
        Grid::from_lines(
            lines
                .iter()
                .map(|line| line.iter().map(|&v| TileValue::new(v)).collect())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn gravity_closes_gaps_preserving_order() {
        let mut board = grid(&[
            &[4, 0, 0],
            &[0, 2, 0],
            &[8, 0, 0],
            &[0, 0, 16],
        ]);
        assert!(gravity_collapse(&mut board));
        assert_eq!(
            board,
            grid(&[
                &[0, 0, 0],
                &[0, 0, 0],
                &[4, 0, 0],
                &[8, 2, 16],
            ])
        );
        assert!(!gravity_collapse(&mut board));
    }

    #[test]
    fn single_pair_doubles_into_lower_cell() {
        let mut board = grid(&[
            &[0, 0],
            &[2, 0],
            &[2, 0],
        ]);
        let merges = merge_pass(&mut board);
        assert_eq!(merges.len(), 1);
        assert_eq!(merges[0].into, (2, 0));
        assert_eq!(merges[0].absorbed, vec![(1, 0)]);
        assert_eq!(board, grid(&[&[0, 0], &[0, 0], &[4, 0]]));
    }

    #[test]
    fn sweep_order_decides_the_source() {
        // (1,0) is reached before (1,1) and takes it, leaving (0,1) and (1,2) without a partner.
        let mut board = grid(&[
            &[0, 2, 0],
            &[2, 2, 2],
            &[8, 4, 8],
        ]);
        let merges = merge_pass(&mut board);
        assert_eq!(merges.len(), 1);
        assert_eq!(merges[0].into, (1, 0));
        assert_eq!(merges[0].absorbed, vec![(1, 1)]);
        assert_eq!(merges[0].merged_value.get(), 4);
        assert_eq!(board, grid(&[&[0, 2, 0], &[4, 0, 2], &[8, 4, 8]]));
    }

    #[test]
    fn focus_cell_absorbs_its_whole_cluster() {
        let mut board = grid(&[
            &[0, 2, 0],
            &[2, 2, 2],
            &[8, 4, 8],
        ]);
        let merges = merge_pass_from(&mut board, Some((1, 1)));
        assert_eq!(merges.len(), 1);
        assert_eq!(merges[0].into, (1, 1));
        assert_eq!(merges[0].absorbed, vec![(0, 1), (1, 0), (1, 2)]);
        assert_eq!(merges[0].merged_value.get(), 16);
        assert_eq!(board, grid(&[&[0, 0, 0], &[0, 16, 0], &[8, 4, 8]]));
    }

    #[test]
    fn unmatched_focus_falls_back_to_sweep() {
        let mut board = grid(&[
            &[0, 0, 0],
            &[4, 8, 0],
            &[4, 2, 0],
        ]);
        let merges = merge_pass_from(&mut board, Some((1, 1)));
        assert_eq!(merges.len(), 1);
        assert_eq!(merges[0].into, (2, 0));
        assert_eq!(board, grid(&[&[0, 0, 0], &[0, 8, 0], &[8, 2, 0]]));
    }

    #[test]
    fn out_of_bounds_focus_is_ignored() {
        let mut board = grid(&[&[2, 2]]);
        let merges = merge_pass_from(&mut board, Some((3, 3)));
        assert_eq!(merges.len(), 1);
        assert_eq!(board, grid(&[&[4, 0]]));
    }

    #[test]
    fn no_equal_neighbors_means_no_merge() {
        let mut board = grid(&[
            &[0, 4, 0],
            &[4, 2, 4],
            &[8, 16, 8],
        ]);
        assert!(merge_pass(&mut board).is_empty());
        assert!(merge_pass_from(&mut board, Some((1, 1))).is_empty());
    }

    #[test]
    fn merged_value_is_power_scaled() {
        let two = TileValue::new(2).unwrap();
        assert_eq!(Merge::merged(two, 1).get(), 4);
        assert_eq!(Merge::merged(two, 2).get(), 8);
        assert_eq!(Merge::merged(two, 4).get(), 32);
        assert_eq!(Merge::merged(TileValue::MAX, 1), TileValue::MAX);
    }

    #[test]
    fn resolve_cascades_until_stable() {
        // 2,2 -> 4 on the floor, then the 4 above falls next to it and merges into 8.
        let mut board = grid(&[
            &[0, 4],
            &[2, 2],
        ]);
        let resolution = resolve(&mut board);
        assert_eq!(board, grid(&[&[0, 0], &[8, 0]]));
        assert_eq!(resolution.merges.len(), 2);
        assert_eq!(resolution.score_bonus, 4 + 8);
        assert_eq!(resolution.passes, 2);
        assert!(!gravity_collapse(&mut board));
        assert!(merge_pass(&mut board).is_empty());
    }

    #[test]
    fn resolve_on_stable_board_changes_nothing() {
        let mut board = grid(&[&[0, 0], &[2, 4]]);
        let resolution = resolve(&mut board);
        assert_eq!(resolution, Resolution::default());
        assert_eq!(board, grid(&[&[0, 0], &[2, 4]]));
    }
}
