use std::time::Duration;

use crate::{offset, ActiveTile, Grid};

/// How elapsed time turns into downward motion of the active tile.
#[derive(PartialEq, PartialOrd, Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DescentPolicy {
    /// Step one whole row every `interval`.
    FixedTick { interval: Duration },
    /// Slide continuously at `rows_per_second`, exposing sub-cell progress for rendering.
    ContinuousRate { rows_per_second: f64 },
}

#[derive(Eq, PartialEq, Clone, Copy, Hash, Debug)]
pub enum Descent {
    Falling,
    /// A downward step was attempted and blocked; the tile must lock where it is.
    Landed,
}

impl DescentPolicy {
    pub const DEFAULT_RATE: f64 = 0.85;

    /// Rows of descent earned by `elapsed`.
    ///
    /// `tick_clock` carries leftover time between calls for the fixed-tick policy.
    pub fn progress(&self, elapsed: Duration, tick_clock: &mut Duration) -> f64 {
        match *self {
            DescentPolicy::FixedTick { interval } => {
                if interval.is_zero() {
                    return 0.0;
                }
                *tick_clock += elapsed;
                let mut ticks = 0u32;
                while *tick_clock >= interval {
                    *tick_clock -= interval;
                    ticks += 1;
                }
                f64::from(ticks)
            }
            DescentPolicy::ContinuousRate { rows_per_second } => {
                rows_per_second * elapsed.as_secs_f64()
            }
        }
    }
}

impl Default for DescentPolicy {
    fn default() -> Self {
        DescentPolicy::ContinuousRate {
            rows_per_second: Self::DEFAULT_RATE,
        }
    }
}

/// Advances `tile` by `rows` of progress, one row at a time.
///
/// Every whole row of accumulated progress is a downward attempt; the first blocked attempt
/// (occupied cell or floor) resets the sub-cell progress and reports [`Descent::Landed`].
pub fn descend(tile: &mut ActiveTile, grid: &Grid, rows: f64) -> Descent {
    if rows.is_finite() && rows > 0.0 {
        tile.fall += rows;
    }
    while tile.fall >= 1.0 {
        match offset(tile.pos, (1, 0)).filter(|&below| grid.is_occupiable(below)) {
            Some(below) => {
                tile.pos = below;
                tile.fall -= 1.0;
            }
            None => {
                tile.fall = 0.0;
                return Descent::Landed;
            }
        }
    }
    Descent::Falling
}

/// Moves `tile` straight down as far as it goes, without time.
pub fn drop_to_rest(tile: &mut ActiveTile, grid: &Grid) {
    while let Some(below) = offset(tile.pos, (1, 0)).filter(|&below| grid.is_occupiable(below)) {
        tile.pos = below;
    }
    tile.fall = 0.0;
}
