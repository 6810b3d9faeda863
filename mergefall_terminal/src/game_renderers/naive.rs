use std::{
    collections::VecDeque,
    io::{self, Write},
};

use crossterm::{
    cursor::MoveTo,
    style::{Color, Print, PrintStyledContent, StyledContent, Stylize},
    terminal, QueueableCommand,
};
use mergefall_engine::{Feedback, FeedbackEvents, Game, GameState, GameTime, TileValue};

use crate::{
    game_input_handler::LaneDrag,
    game_renderers::{BoardLayout, GameScreenRenderer},
    terminal_app::{format_duration, App},
};

/// Redraws the whole screen every frame.
#[derive(Clone, Default, Debug)]
pub struct Renderer {
    feedback_event_buffer: VecDeque<(GameTime, Feedback)>,
}

impl Renderer {
    pub const W_PANEL: u16 = 28;
    const MAX_MESSAGES: usize = 10;
}

impl GameScreenRenderer for Renderer {
    fn render<T>(
        &mut self,
        app: &mut App<T>,
        game: &Game,
        layout: &BoardLayout,
        lane_drag: &LaneDrag,
        new_feedback_events: FeedbackEvents,
    ) -> io::Result<()>
    where
        T: Write,
    {
        let state = game.state();
        let w_cell = usize::from(BoardLayout::CELL_WIDTH);
        let horizontal_border = format!("+{}+", "-".repeat(w_cell * layout.cols));
        app.term
            .queue(terminal::Clear(terminal::ClearType::All))?
            .queue(MoveTo(layout.x, layout.y))?
            .queue(Print(&horizontal_border))?;
        // Settled tiles.
        for (row, line) in state.grid.lines().iter().enumerate() {
            for sub_line in 0..BoardLayout::CELL_HEIGHT {
                let y = layout.cell_y(row as f64) + sub_line;
                app.term.queue(MoveTo(layout.x, y))?.queue(Print("|"))?;
                for cell in line {
                    app.term
                        .queue(PrintStyledContent(cell_text(*cell, sub_line == 0)))?;
                }
                app.term.queue(Print("|"))?;
            }
        }
        app.term
            .queue(MoveTo(layout.x, layout.bottom_border_y()))?
            .queue(Print(&horizontal_border))?;
        // Falling tile, drawn at its fractional row unless it is already resting on something.
        if let Some(tile) = state.active_tile {
            let resting = !state.grid.is_occupiable((tile.row() + 1, tile.col()));
            let row = if resting {
                tile.row() as f64
            } else {
                tile.vertical_position(layout.rows)
            };
            for sub_line in 0..BoardLayout::CELL_HEIGHT {
                app.term
                    .queue(MoveTo(
                        layout.lane_x(tile.col()),
                        layout.cell_y(row) + sub_line,
                    ))?
                    .queue(PrintStyledContent(
                        cell_text(Some(tile.value), sub_line == 0).bold(),
                    ))?;
            }
        }
        // Lane row.
        for col in 0..layout.cols {
            let marker = if lane_drag.selected() == Some(col) {
                format!("{:^w_cell$}", "▲▲▲").yellow().bold()
            } else if state.active_tile.is_some_and(|tile| tile.col() == col) {
                format!("{:^w_cell$}", "^").white()
            } else {
                format!("{:^w_cell$}", "·").dark_grey()
            };
            app.term
                .queue(MoveTo(layout.lane_x(col), layout.lane_row_y()))?
                .queue(PrintStyledContent(marker))?;
        }
        // Side panel.
        let x_panel = layout.x + layout.width() + 3;
        let panel = panel_lines(state);
        for (i, line) in panel.iter().enumerate() {
            app.term
                .queue(MoveTo(x_panel, layout.y + i as u16))?
                .queue(Print(line))?;
        }
        for evt in new_feedback_events {
            self.feedback_event_buffer.push_front(evt);
        }
        self.feedback_event_buffer.truncate(Self::MAX_MESSAGES);
        let y_messages = layout.y + panel.len() as u16 + 1;
        for (i, (_, feedback)) in self.feedback_event_buffer.iter().enumerate() {
            let Some(msg) = feedback_message(feedback) else {
                continue;
            };
            app.term
                .queue(MoveTo(x_panel, y_messages + i as u16))?
                .queue(Print(msg))?;
        }
        if state.is_game_over() {
            let w_board = usize::from(layout.width());
            let y_banner = layout.cell_y(layout.rows as f64 / 2.0) - 1;
            for (i, txt) in ["", "GAME OVER", "press any key", ""].iter().enumerate() {
                app.term
                    .queue(MoveTo(layout.x, y_banner + i as u16))?
                    .queue(PrintStyledContent(
                        format!("{txt:^w_board$}").black().on_white(),
                    ))?;
            }
        }
        app.term.flush()?;
        Ok(())
    }
}

fn panel_lines(state: &GameState) -> Vec<String> {
    vec![
        format!("Score:     {}", state.score),
        format!("Next:      {}", state.next_value),
        format!(
            "Best tile: {}",
            state
                .highest_tile()
                .map_or("-".to_string(), |value| value.to_string())
        ),
        format!("Merges:    {}", state.merges),
        format!("Locked:    {}", state.tiles_locked),
        format!("Time:      {}", format_duration(state.game_time)),
    ]
}

fn feedback_message(feedback: &Feedback) -> Option<String> {
    match feedback {
        Feedback::Merge { from, into, value } => Some(format!(
            "{value} ({},{}) -> ({},{})",
            from.0, from.1, into.0, into.1
        )),
        Feedback::Cascade {
            passes,
            score_bonus,
        } if *passes > 1 => Some(format!("Cascade x{passes}! +{score_bonus}")),
        Feedback::Cascade { score_bonus, .. } => Some(format!("+{score_bonus}")),
        Feedback::GameOver(reason) => Some(format!("Game over: {reason:?}")),
        Feedback::Locked { .. } | Feedback::Spawned { .. } => None,
    }
}

/// One line of a cell; only the top line carries the number.
fn cell_text(cell: Option<TileValue>, with_value: bool) -> StyledContent<String> {
    let w_cell = usize::from(BoardLayout::CELL_WIDTH);
    match cell {
        None if with_value => format!("{:^w_cell$}", "·").dark_grey(),
        None => " ".repeat(w_cell).reset(),
        Some(value) => {
            let txt = if with_value {
                format!("{:^w_cell$}", value.get())
            } else {
                " ".repeat(w_cell)
            };
            txt.black().on(tile_color(value))
        }
    }
}

fn tile_color(value: TileValue) -> Color {
    const PALETTE: [Color; 8] = [
        Color::White,
        Color::Yellow,
        Color::DarkYellow,
        Color::Red,
        Color::Magenta,
        Color::Blue,
        Color::Cyan,
        Color::Green,
    ];
    let exponent = value.trailing_zeros() as usize;
    PALETTE[exponent.saturating_sub(1) % PALETTE.len()]
}
