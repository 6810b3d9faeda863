use crate::{offset, ConfigError, Coord, TileValue};

pub type Line = Vec<Option<TileValue>>;

/// Fixed-size matrix of optional tile values.
///
/// Coordinates are `(row, col)`, row `0` being the top of the board and `rows() - 1` the floor.
/// Dimensions never change after creation.
#[derive(Eq, PartialEq, Clone, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Grid {
    cols: usize,
    lines: Vec<Line>,
}

impl Grid {
    /// Orthogonal neighbor offsets: up, down, left, right.
    pub const NEIGHBOR_OFFSETS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            cols,
            lines: std::iter::repeat(vec![None; cols]).take(rows).collect(),
        }
    }

    /// Builds a grid from its lines, top line first.
    pub fn from_lines(lines: Vec<Line>) -> Result<Self, ConfigError> {
        let cols = lines.first().map_or(0, Vec::len);
        if lines.is_empty() || cols == 0 {
            return Err(ConfigError::EmptyGrid);
        }
        if let Some(row) = lines.iter().position(|line| line.len() != cols) {
            return Err(ConfigError::RaggedGrid { row, expected: cols });
        }
        Ok(Self { cols, lines })
    }

    pub fn rows(&self) -> usize {
        self.lines.len()
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn contains(&self, (row, col): Coord) -> bool {
        row < self.rows() && col < self.cols
    }

    pub fn get(&self, (row, col): Coord) -> Option<TileValue> {
        self.lines.get(row).and_then(|line| line.get(col).copied().flatten())
    }

    /// Writes `value` into an in-bounds cell. Out-of-bounds writes are ignored.
    pub fn set(&mut self, (row, col): Coord, value: Option<TileValue>) {
        if let Some(cell) = self.lines.get_mut(row).and_then(|line| line.get_mut(col)) {
            *cell = value;
        }
    }

    pub fn take(&mut self, (row, col): Coord) -> Option<TileValue> {
        self.lines
            .get_mut(row)
            .and_then(|line| line.get_mut(col))
            .and_then(Option::take)
    }

    /// Whether a tile could be placed at `coord`: in bounds and empty.
    pub fn is_occupiable(&self, coord: Coord) -> bool {
        self.contains(coord) && self.get(coord).is_none()
    }

    /// The up-to-four orthogonally adjacent in-bounds coordinates, in up/down/left/right order.
    pub fn neighbors(&self, coord: Coord) -> impl Iterator<Item = Coord> + '_ {
        Self::NEIGHBOR_OFFSETS
            .into_iter()
            .filter_map(move |delta| offset(coord, delta))
            .filter(|&neighbor| self.contains(neighbor))
    }

    pub fn occupied(&self) -> impl Iterator<Item = (Coord, TileValue)> + '_ {
        self.lines.iter().enumerate().flat_map(|(row, line)| {
            line.iter()
                .enumerate()
                .filter_map(move |(col, cell)| cell.map(|value| ((row, col), value)))
        })
    }

    pub fn occupied_count(&self) -> usize {
        self.occupied().count()
    }

    pub fn is_empty(&self) -> bool {
        self.occupied().next().is_none()
    }

}
