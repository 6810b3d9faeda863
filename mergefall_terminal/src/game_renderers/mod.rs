pub mod naive;

use std::io::{self, Write};

use crossterm::terminal;
use mergefall_engine::{FeedbackEvents, Game};

use crate::{game_input_handler::LaneDrag, terminal_app::App};

pub trait GameScreenRenderer {
    fn render<T>(
        &mut self,
        app: &mut App<T>,
        game: &Game,
        layout: &BoardLayout,
        lane_drag: &LaneDrag,
        new_feedback_events: FeedbackEvents,
    ) -> io::Result<()>
    where
        T: Write;
}

/// Where the board sits on screen, shared by drawing and pointer hit-testing.
///
/// Top border at `y`, then `rows` cells of [`CELL_HEIGHT`](Self::CELL_HEIGHT) lines each,
/// the bottom border, and finally the lane row used for drag-to-drop.
#[derive(Eq, PartialEq, Clone, Copy, Debug)]
pub struct BoardLayout {
    pub x: u16,
    pub y: u16,
    pub rows: usize,
    pub cols: usize,
}

impl BoardLayout {
    pub const CELL_WIDTH: u16 = 7;
    pub const CELL_HEIGHT: u16 = 2;

    pub fn new(x: u16, y: u16, rows: usize, cols: usize) -> Self {
        Self { x, y, rows, cols }
    }

    /// Board centered in the current terminal, leaving room for the side panel.
    pub fn centered(rows: usize, cols: usize) -> Self {
        let mut layout = Self::new(0, 0, rows, cols);
        let (w_console, h_console) = terminal::size().unwrap_or((0, 0));
        layout.x = w_console.saturating_sub(layout.width() + naive::Renderer::W_PANEL) / 2;
        layout.y = h_console.saturating_sub(layout.height()) / 2;
        layout
    }

    /// Width including both side borders.
    pub fn width(&self) -> u16 {
        span(self.cols, Self::CELL_WIDTH).saturating_add(2)
    }

    /// Height including both borders and the lane row.
    pub fn height(&self) -> u16 {
        span(self.rows, Self::CELL_HEIGHT).saturating_add(3)
    }

    /// Screen column of the first character of lane `col`.
    pub fn lane_x(&self, col: usize) -> u16 {
        self.x
            .saturating_add(1)
            .saturating_add(span(col, Self::CELL_WIDTH))
    }

    /// Screen line of the top of a cell at fractional row `row`, snapped to whole lines.
    pub fn cell_y(&self, row: f64) -> u16 {
        let lines = (row.max(0.0) * f64::from(Self::CELL_HEIGHT)).floor();
        self.y.saturating_add(1).saturating_add(lines as u16)
    }

    pub fn bottom_border_y(&self) -> u16 {
        self.y
            .saturating_add(1)
            .saturating_add(span(self.rows, Self::CELL_HEIGHT))
    }

    pub fn lane_row_y(&self) -> u16 {
        self.bottom_border_y().saturating_add(1)
    }

    /// Lane under the pointer, if the pointer is over the board or the lane row.
    pub fn lane_at(&self, column: u16, row: u16) -> Option<usize> {
        if row <= self.y || row > self.lane_row_y() || row == self.bottom_border_y() {
            return None;
        }
        let offset = column.checked_sub(self.x.saturating_add(1))?;
        let lane = usize::from(offset / Self::CELL_WIDTH);
        (lane < self.cols).then_some(lane)
    }
}

fn span(n: usize, unit: u16) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX).saturating_mul(unit)
}
