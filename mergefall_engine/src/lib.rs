mod descent_policies;
mod error;
mod grid;
mod resolution;
mod tile_generators;

use std::{fmt, num::NonZeroU64, time::Duration};

use rand::{rngs::StdRng, SeedableRng};
use tracing::{debug, trace};

pub use descent_policies::{descend, drop_to_rest, Descent, DescentPolicy};
pub use error::ConfigError;
pub use grid::{Grid, Line};
pub use resolution::{
    gravity_collapse, merge_pass, merge_pass_from, resolve, resolve_from, Merge, Resolution,
};
pub use tile_generators::{next_start_value, TileGenerator};

pub type TileValue = NonZeroU64;
/// `(row, col)`, row `0` being the top line.
pub type Coord = (usize, usize);
pub type Offset = (isize, isize);
pub type GameTime = Duration;
pub type FeedbackEvents = Vec<(GameTime, Feedback)>;

/// The single falling, not yet locked tile.
#[derive(PartialEq, PartialOrd, Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActiveTile {
    pub pos: Coord,
    pub value: TileValue,
    /// Sub-cell progress towards the next row, in `[0, 1)`.
    pub fall: f64,
}

#[derive(PartialEq, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GameConfig {
    pub rows: usize,
    pub cols: usize,
    pub spawn_values: Vec<TileValue>,
    pub tile_generator: TileGenerator,
    pub descent_policy: DescentPolicy,
    /// Upper bound for a single `update` step, against tunneling after stalled frames.
    pub max_step: Duration,
}

#[derive(Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Intent {
    MoveLeft,
    MoveRight,
    MoveToColumn(usize),
    HardDrop,
    Restart,
}

#[derive(Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GameOver {
    /// The spawn cell was occupied when the next tile was due.
    BlockOut,
    Forfeit,
}

#[derive(PartialEq, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GameState {
    pub game_time: GameTime,
    pub update_counter: u64,
    /// Invariants:
    /// * Once set, nothing but a restart mutates `grid`, `active_tile` or `score`.
    /// * Until the game has ended there is always an active tile between calls: `end.is_some() || active_tile.is_some()`.
    pub end: Option<GameOver>,
    pub grid: Grid,
    pub active_tile: Option<ActiveTile>,
    pub next_value: TileValue,
    pub score: u64,
    pub tiles_locked: u64,
    pub merges: u64,
    /// Time accumulated towards the next fixed-tick step.
    pub tick_clock: Duration,
}

#[derive(Eq, PartialEq, Clone, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Feedback {
    Spawned {
        at: Coord,
        value: TileValue,
    },
    Locked {
        at: Coord,
        value: TileValue,
    },
    /// A tile holding `value` at `from` was absorbed by the tile at `into`.
    Merge {
        from: Coord,
        into: Coord,
        value: TileValue,
    },
    /// Summary of resolving the board after one lock.
    Cascade {
        passes: usize,
        score_bonus: u64,
    },
    GameOver(GameOver),
}

#[derive(PartialEq, Clone, Copy, Debug)]
pub enum Spawn {
    Placed(ActiveTile),
    BlockedOut,
}

pub struct Game {
    config: GameConfig,
    state: GameState,
    rng: StdRng,
}

impl ActiveTile {
    pub fn row(&self) -> usize {
        self.pos.0
    }

    pub fn col(&self) -> usize {
        self.pos.1
    }

    /// Fractional row for rendering, never below `row()` and never past the bottom line.
    pub fn vertical_position(&self, rows: usize) -> f64 {
        let bottom = rows.saturating_sub(1) as f64;
        (self.pos.0 as f64 + self.fall).min(bottom.max(self.pos.0 as f64))
    }
}

impl GameConfig {
    pub const ROWS: usize = 8;
    pub const COLS: usize = 5;
    pub const SPAWN_VALUES: [u64; 7] = [2, 4, 8, 16, 32, 64, 128];
    pub const MAX_STEP: Duration = Duration::from_millis(50);

    /// Column new tiles appear in, on the top line.
    pub fn spawn_col(&self) -> usize {
        self.cols / 2
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(ConfigError::EmptyGrid);
        }
        if self.spawn_values.is_empty() {
            return Err(ConfigError::EmptySpawnSet);
        }
        if let Some(value) = self.spawn_values.iter().find(|v| !v.is_power_of_two()) {
            return Err(ConfigError::SpawnValueNotPowerOfTwo { value: value.get() });
        }
        if let TileGenerator::Scripted { values, .. } = &self.tile_generator {
            if values.is_empty() {
                return Err(ConfigError::EmptyScript);
            }
        }
        match self.descent_policy {
            DescentPolicy::FixedTick { interval } if interval.is_zero() => {
                return Err(ConfigError::ZeroTickInterval);
            }
            DescentPolicy::ContinuousRate { rows_per_second }
                if !(rows_per_second.is_finite() && rows_per_second > 0.0) =>
            {
                return Err(ConfigError::InvalidFallRate { rows_per_second });
            }
            _ => {}
        }
        if self.max_step.is_zero() {
            return Err(ConfigError::ZeroMaxStep);
        }
        Ok(())
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            rows: Self::ROWS,
            cols: Self::COLS,
            spawn_values: Self::SPAWN_VALUES
                .into_iter()
                .filter_map(TileValue::new)
                .collect(),
            tile_generator: TileGenerator::default(),
            descent_policy: DescentPolicy::default(),
            max_step: Self::MAX_STEP,
        }
    }
}

impl GameState {
    fn fresh(grid: Grid, next_value: TileValue) -> Self {
        Self {
            game_time: Duration::ZERO,
            update_counter: 0,
            end: None,
            grid,
            active_tile: None,
            next_value,
            score: 0,
            tiles_locked: 0,
            merges: 0,
            tick_clock: Duration::ZERO,
        }
    }

    pub fn is_game_over(&self) -> bool {
        self.end.is_some()
    }

    pub fn highest_tile(&self) -> Option<TileValue> {
        self.grid.occupied().map(|(_, value)| value).max()
    }
}

impl fmt::Debug for Game {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Game")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("rng", &std::any::type_name_of_val(&self.rng))
            .finish()
    }
}

impl Game {
    /// A game with the default configuration.
    pub fn new(seed: u64) -> Self {
        let config = GameConfig::default();
        let grid = Grid::new(config.rows, config.cols);
        Self::start(config, grid, seed)
    }

    pub fn with_config(config: GameConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let grid = Grid::new(config.rows, config.cols);
        Ok(Self::start(config, grid, seed))
    }

    /// Starts on a pre-filled grid, which must match the configured size.
    pub fn with_grid(config: GameConfig, grid: Grid, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        if (grid.rows(), grid.cols()) != (config.rows, config.cols) {
            return Err(ConfigError::GridMismatch {
                rows: config.rows,
                cols: config.cols,
            });
        }
        Ok(Self::start(config, grid, seed))
    }

    fn start(config: GameConfig, grid: Grid, seed: u64) -> Self {
        let mut game = Game {
            config,
            state: GameState::fresh(grid, TileValue::MIN),
            rng: StdRng::seed_from_u64(seed),
        };
        game.state.next_value = game.draw_value();
        game.spawn_tile(&mut Vec::new());
        game
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn ended(&self) -> bool {
        self.state.end.is_some()
    }

    pub fn forfeit(&mut self) {
        if !self.ended() {
            self.end_game(GameOver::Forfeit, &mut Vec::new());
        }
    }

    /// Resets grid, score, queued value and active tile together and resumes play.
    pub fn restart(&mut self) -> FeedbackEvents {
        let grid = Grid::new(self.config.rows, self.config.cols);
        let next_value = self.draw_value();
        self.state = GameState::fresh(grid, next_value);
        debug!("game restarted");
        let mut feedback_events = Vec::new();
        self.spawn_tile(&mut feedback_events);
        feedback_events
    }

    pub fn handle_intent(&mut self, intent: Intent) -> FeedbackEvents {
        match intent {
            Intent::MoveLeft => {
                self.move_left();
                Vec::new()
            }
            Intent::MoveRight => {
                self.move_right();
                Vec::new()
            }
            Intent::MoveToColumn(col) => {
                self.move_to_column(col);
                Vec::new()
            }
            Intent::HardDrop => self.hard_drop(),
            Intent::Restart => self.restart(),
        }
    }

    pub fn move_left(&mut self) -> bool {
        self.move_lateral(-1)
    }

    pub fn move_right(&mut self) -> bool {
        self.move_lateral(1)
    }

    /// Shifts the active tile by `dx` columns if the destination at its current row is free.
    pub fn move_lateral(&mut self, dx: isize) -> bool {
        if self.ended() {
            return false;
        }
        let grid = &self.state.grid;
        let Some(tile) = self.state.active_tile.as_mut() else {
            return false;
        };
        match offset(tile.pos, (0, dx)).filter(|&target| grid.is_occupiable(target)) {
            Some(target) => {
                tile.pos = target;
                true
            }
            None => false,
        }
    }

    /// Puts the active tile into lane `col` at its current row if that cell is free.
    ///
    /// Only the destination is checked, lanes in between may be occupied.
    pub fn move_to_column(&mut self, col: usize) -> bool {
        if self.ended() || col >= self.config.cols {
            return false;
        }
        let grid = &self.state.grid;
        let Some(tile) = self.state.active_tile.as_mut() else {
            return false;
        };
        let target = (tile.row(), col);
        if target == tile.pos || !grid.is_occupiable(target) {
            return false;
        }
        tile.pos = target;
        true
    }

    /// Drops the active tile as far as it goes and locks it, synchronously.
    pub fn hard_drop(&mut self) -> FeedbackEvents {
        let mut feedback_events = Vec::new();
        if self.ended() {
            return feedback_events;
        }
        let Some(mut tile) = self.state.active_tile.take() else {
            return feedback_events;
        };
        drop_to_rest(&mut tile, &self.state.grid);
        self.lock(tile, &mut feedback_events);
        feedback_events
    }

    /// Advances the game clock by `elapsed_secs`, letting the active tile descend.
    ///
    /// Negative, NaN and infinite inputs count as no time; large steps are capped at
    /// [`GameConfig::max_step`].
    pub fn update(&mut self, elapsed_secs: f64) -> FeedbackEvents {
        let mut feedback_events = Vec::new();
        if self.ended() {
            return feedback_events;
        }
        let elapsed = sanitize_elapsed(elapsed_secs, self.config.max_step);
        self.state.update_counter += 1;
        self.state.game_time += elapsed;
        let Some(mut tile) = self.state.active_tile else {
            return feedback_events;
        };
        let rows = self
            .config
            .descent_policy
            .progress(elapsed, &mut self.state.tick_clock);
        match descend(&mut tile, &self.state.grid, rows) {
            Descent::Falling => self.state.active_tile = Some(tile),
            Descent::Landed => {
                self.state.active_tile = None;
                self.lock(tile, &mut feedback_events);
            }
        }
        feedback_events
    }

    fn draw_value(&mut self) -> TileValue {
        self.config
            .tile_generator
            .with_rng(&self.config.spawn_values, &mut self.rng)
            .next()
            .expect("tile generator ran out of values despite validated config")
    }

    fn spawn_tile(&mut self, feedback_events: &mut FeedbackEvents) {
        debug_assert!(
            self.state.active_tile.is_none(),
            "spawning new tile while an active tile is still in play"
        );
        let queued = self.draw_value();
        let value = std::mem::replace(&mut self.state.next_value, queued);
        match spawn(&self.state.grid, value) {
            Spawn::Placed(tile) => {
                trace!(col = tile.col(), value = value.get(), "spawned tile");
                feedback_events.push((
                    self.state.game_time,
                    Feedback::Spawned {
                        at: tile.pos,
                        value,
                    },
                ));
                self.state.active_tile = Some(tile);
            }
            Spawn::BlockedOut => self.end_game(GameOver::BlockOut, feedback_events),
        }
    }

    /// Writes the tile into the grid, resolves the board to its fixed point and spawns the next
    /// tile, all before returning.
    fn lock(&mut self, tile: ActiveTile, feedback_events: &mut FeedbackEvents) {
        let time = self.state.game_time;
        self.state.grid.set(tile.pos, Some(tile.value));
        self.state.tiles_locked += 1;
        feedback_events.push((
            time,
            Feedback::Locked {
                at: tile.pos,
                value: tile.value,
            },
        ));
        let Resolution {
            passes,
            merges,
            score_bonus,
        } = resolve_from(&mut self.state.grid, Some(tile.pos));
        for merge in &merges {
            trace!(
                into = ?merge.into,
                absorbed = merge.absorbed.len(),
                value = merge.merged_value.get(),
                "merge"
            );
            feedback_events.extend(merge.absorbed.iter().map(|&from| {
                (
                    time,
                    Feedback::Merge {
                        from,
                        into: merge.into,
                        value: merge.value,
                    },
                )
            }));
        }
        if !merges.is_empty() {
            self.state.score = self.state.score.saturating_add(score_bonus);
            self.state.merges = self.state.merges.saturating_add(merges.len() as u64);
            feedback_events.push((
                time,
                Feedback::Cascade {
                    passes,
                    score_bonus,
                },
            ));
        }
        debug!(
            at = ?tile.pos,
            value = tile.value.get(),
            passes,
            score_bonus,
            score = self.state.score,
            "tile locked"
        );
        self.spawn_tile(feedback_events);
    }

    fn end_game(&mut self, reason: GameOver, feedback_events: &mut FeedbackEvents) {
        self.state.end = Some(reason);
        debug!(
            ?reason,
            score = self.state.score,
            tiles_locked = self.state.tiles_locked,
            "game over"
        );
        feedback_events.push((self.state.game_time, Feedback::GameOver(reason)));
    }
}

/// Places a tile holding `value` on the top line, centered column, unless that cell is taken.
///
/// Refilling the queued value is up to the caller, see [`Game`].
pub fn spawn(grid: &Grid, value: TileValue) -> Spawn {
    let pos = (0, grid.cols() / 2);
    if grid.is_occupiable(pos) {
        Spawn::Placed(ActiveTile {
            pos,
            value,
            fall: 0.0,
        })
    } else {
        Spawn::BlockedOut
    }
}

/// Clamps a raw frame delta into `[0, max_step]`.
pub fn sanitize_elapsed(elapsed_secs: f64, max_step: Duration) -> Duration {
    if !elapsed_secs.is_finite() || elapsed_secs <= 0.0 {
        Duration::ZERO
    } else if elapsed_secs >= max_step.as_secs_f64() {
        max_step
    } else {
        Duration::from_secs_f64(elapsed_secs)
    }
}

pub fn offset((row, col): Coord, (d_row, d_col): Offset) -> Option<Coord> {
    Some((row.checked_add_signed(d_row)?, col.checked_add_signed(d_col)?))
}
