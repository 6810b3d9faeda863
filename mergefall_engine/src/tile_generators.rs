use rand::{rngs::StdRng, seq::SliceRandom};

use crate::TileValue;

#[derive(Eq, PartialEq, Clone, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TileGenerator {
    /// Every spawn value is equally likely on every draw.
    Uniform,
    /// Each spawn value is drawn exactly once per bag, in shuffled order.
    Bag { values_left: Vec<TileValue> },
    /// Cycles through a fixed list, ignoring the spawn set.
    Scripted { values: Vec<TileValue>, next: usize },
}

impl TileGenerator {
    pub fn uniform() -> Self {
        Self::Uniform
    }

    pub fn bag() -> Self {
        Self::Bag {
            values_left: Vec::new(),
        }
    }

    pub fn scripted(values: impl IntoIterator<Item = TileValue>) -> Self {
        Self::Scripted {
            values: values.into_iter().collect(),
            next: 0,
        }
    }

    pub(crate) fn with_rng<'a>(
        &'a mut self,
        spawn_values: &'a [TileValue],
        rng: &'a mut StdRng,
    ) -> TileIterator<'a> {
        TileIterator {
            tile_generator: self,
            spawn_values,
            rng,
        }
    }
}

impl Default for TileGenerator {
    fn default() -> Self {
        Self::uniform()
    }
}

/// Uniform draw from the spawn set; `None` only if the set is empty.
pub fn next_start_value(spawn_values: &[TileValue], rng: &mut StdRng) -> Option<TileValue> {
    spawn_values.choose(rng).copied()
}

pub(crate) struct TileIterator<'a> {
    tile_generator: &'a mut TileGenerator,
    spawn_values: &'a [TileValue],
    rng: &'a mut StdRng,
}

impl<'a> Iterator for TileIterator<'a> {
    type Item = TileValue;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.tile_generator {
            TileGenerator::Uniform => next_start_value(self.spawn_values, self.rng),
            TileGenerator::Bag { values_left } => {
                // Replenish and reshuffle once the bag runs dry.
                if values_left.is_empty() {
                    values_left.extend_from_slice(self.spawn_values);
                    values_left.shuffle(self.rng);
                }
                values_left.pop()
            }
            TileGenerator::Scripted { values, next } => {
                let value = values.get(*next % values.len().max(1)).copied();
                *next = next.wrapping_add(1);
                value
            }
        }
    }
}
