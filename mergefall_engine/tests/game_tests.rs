use std::time::Duration;

use mergefall_engine::{
    DescentPolicy, Feedback, Game, GameConfig, GameOver, Grid, Intent, TileGenerator, TileValue,
};

fn value(v: u64) -> TileValue {
    TileValue::new(v).unwrap()
}

/// Default-sized config whose tiles come from `script`, in order.
fn scripted(script: &[u64]) -> GameConfig {
    GameConfig {
        tile_generator: TileGenerator::scripted(script.iter().map(|&v| value(v))),
        ..Default::default()
    }
}

fn grid_with(tiles: &[((usize, usize), u64)]) -> Grid {
    let mut grid = Grid::new(GameConfig::ROWS, GameConfig::COLS);
    for &(pos, v) in tiles {
        grid.set(pos, Some(value(v)));
    }
    grid
}

fn locked_at(feedback: &[(Duration, Feedback)]) -> Vec<(usize, usize)> {
    feedback
        .iter()
        .filter_map(|(_, event)| match event {
            Feedback::Locked { at, .. } => Some(*at),
            _ => None,
        })
        .collect()
}

#[test]
fn new_game_spawns_centered_on_top_line() {
    let game = Game::new(1);
    let state = game.state();
    let tile = state.active_tile.expect("fresh game has an active tile");
    assert_eq!(tile.pos, (0, 2));
    assert!(GameConfig::SPAWN_VALUES.contains(&tile.value.get()));
    assert!(GameConfig::SPAWN_VALUES.contains(&state.next_value.get()));
    assert_eq!(state.score, 0);
    assert!(!state.is_game_over());
    assert!(state.grid.is_empty());
}

#[test]
fn landing_between_equal_tiles_merges_into_landing_cell() {
    let grid = grid_with(&[((7, 1), 2), ((7, 3), 2)]);
    let mut game = Game::with_grid(scripted(&[2, 64]), grid, 0).unwrap();
    let feedback = game.hard_drop();

    let state = game.state();
    assert_eq!(state.grid.get((7, 2)), Some(value(8)));
    assert_eq!(state.grid.get((7, 1)), None);
    assert_eq!(state.grid.get((7, 3)), None);
    assert_eq!(state.grid.occupied_count(), 1);
    assert_eq!(state.score, 8);
    assert_eq!(locked_at(&feedback), vec![(7, 2)]);
    let merged_from: Vec<_> = feedback
        .iter()
        .filter_map(|(_, event)| match event {
            Feedback::Merge { from, into, value } => {
                assert_eq!(*into, (7, 2));
                assert_eq!(value.get(), 2);
                Some(*from)
            }
            _ => None,
        })
        .collect();
    assert_eq!(merged_from, vec![(7, 1), (7, 3)]);
    assert!(feedback.iter().any(|(_, event)| *event
        == Feedback::Cascade {
            passes: 1,
            score_bonus: 8
        }));
}

#[test]
fn settled_tiles_fall_into_emptied_cells_and_cascade() {
    // Dropping a 2 onto the 2 folds it into a 4, which then falls onto the floor 4.
    let grid = grid_with(&[((7, 2), 4), ((6, 2), 2)]);
    let mut game = Game::with_grid(scripted(&[2, 64]), grid, 0).unwrap();
    let feedback = game.hard_drop();

    let state = game.state();
    assert_eq!(locked_at(&feedback), vec![(5, 2)]);
    assert_eq!(state.grid.get((7, 2)), Some(value(8)));
    assert_eq!(state.grid.occupied_count(), 1);
    assert_eq!(state.score, 4 + 8);
    assert_eq!(state.merges, 2);
    assert!(feedback.iter().any(|(_, event)| *event
        == Feedback::Cascade {
            passes: 2,
            score_bonus: 12
        }));
}

#[test]
fn hard_drop_into_full_column_locks_in_place_and_blocks_out() {
    let column: Vec<_> = (1..8)
        .map(|row| ((row, 2), if row % 2 == 0 { 8 } else { 4 }))
        .collect();
    let mut game = Game::with_grid(scripted(&[2, 64]), grid_with(&column), 0).unwrap();
    assert_eq!(game.state().active_tile.map(|tile| tile.pos), Some((0, 2)));

    let feedback = game.hard_drop();
    assert_eq!(locked_at(&feedback), vec![(0, 2)]);
    assert_eq!(game.state().grid.get((0, 2)), Some(value(2)));
    assert!(feedback
        .iter()
        .any(|(_, event)| *event == Feedback::GameOver(GameOver::BlockOut)));
    assert_eq!(game.state().end, Some(GameOver::BlockOut));
    assert_eq!(game.state().active_tile, None);
}

#[test]
fn game_over_freezes_everything_until_restart() {
    let column: Vec<_> = (1..8)
        .map(|row| ((row, 2), if row % 2 == 0 { 8 } else { 4 }))
        .collect();
    let mut game = Game::with_grid(scripted(&[2, 64]), grid_with(&column), 0).unwrap();
    game.hard_drop();
    assert!(game.ended());
    let frozen = game.state().clone();

    assert!(!game.move_left());
    assert!(!game.move_right());
    assert!(!game.move_to_column(0));
    assert!(game.hard_drop().is_empty());
    assert!(game.update(0.05).is_empty());
    assert!(game.handle_intent(Intent::HardDrop).is_empty());
    assert_eq!(game.state(), &frozen);

    let feedback = game.handle_intent(Intent::Restart);
    let state = game.state();
    assert!(!state.is_game_over());
    assert!(state.grid.is_empty());
    assert_eq!(state.score, 0);
    assert_eq!(state.tiles_locked, 0);
    assert_eq!(state.active_tile.map(|tile| tile.pos), Some((0, 2)));
    assert!(matches!(
        feedback.as_slice(),
        [(_, Feedback::Spawned { at: (0, 2), .. })]
    ));
}

#[test]
fn lateral_moves_stop_at_walls() {
    let mut game = Game::new(5);
    assert!(game.move_left());
    assert!(game.move_left());
    assert!(!game.move_left());
    assert_eq!(game.state().active_tile.unwrap().col(), 0);
    for _ in 0..4 {
        assert!(game.move_right());
    }
    assert!(!game.move_right());
    assert_eq!(game.state().active_tile.unwrap().col(), 4);
}

#[test]
fn occupied_lanes_block_lateral_moves_but_not_column_jumps() {
    let wall: Vec<_> = (0..8)
        .map(|row| ((row, 1), if row % 2 == 0 { 16 } else { 32 }))
        .collect();
    let mut game = Game::with_grid(scripted(&[2, 4]), grid_with(&wall), 0).unwrap();
    assert!(!game.move_left());
    assert!(!game.move_to_column(1));
    assert!(!game.move_to_column(2));
    assert!(!game.move_to_column(5));
    assert!(game.move_to_column(0));
    assert_eq!(game.state().active_tile.unwrap().pos, (0, 0));
    assert!(!game.move_right());
}

#[test]
fn intents_route_to_moves() {
    let mut game = Game::new(9);
    assert!(game.handle_intent(Intent::MoveToColumn(4)).is_empty());
    assert_eq!(game.state().active_tile.unwrap().col(), 4);
    game.handle_intent(Intent::MoveLeft);
    assert_eq!(game.state().active_tile.unwrap().col(), 3);
    game.handle_intent(Intent::MoveRight);
    assert_eq!(game.state().active_tile.unwrap().col(), 4);
    let feedback = game.handle_intent(Intent::HardDrop);
    assert_eq!(locked_at(&feedback), vec![(7, 4)]);
    assert_eq!(game.state().tiles_locked, 1);
}

#[test]
fn queued_value_becomes_next_active_tile() {
    let mut game = Game::new(11);
    for _ in 0..5 {
        let queued = game.state().next_value;
        game.move_to_column(0);
        game.hard_drop();
        if game.ended() {
            break;
        }
        assert_eq!(game.state().active_tile.unwrap().value, queued);
    }
}

#[test]
fn continuous_descent_moves_by_whole_rows_only() {
    let mut game = Game::new(3);
    for _ in 0..24 {
        assert!(game.update(0.05).is_empty());
    }
    // 24 * 0.05s * 0.85 rows/s = 1.02 rows.
    let tile = game.state().active_tile.unwrap();
    assert_eq!(tile.row(), 1);
    assert!((tile.vertical_position(GameConfig::ROWS) - 1.02).abs() < 1e-6);
    assert_eq!(game.state().game_time, Duration::from_millis(1200));
}

#[test]
fn stalled_frames_are_capped() {
    let mut game = Game::new(3);
    game.update(10.0);
    game.update(f64::NAN);
    game.update(-4.0);
    let tile = game.state().active_tile.unwrap();
    assert_eq!(tile.row(), 0);
    assert!((tile.fall - 0.85 * 0.05).abs() < 1e-9);
    assert_eq!(game.state().game_time, GameConfig::MAX_STEP);
}

#[test]
fn continuous_tile_rests_on_floor_before_locking() {
    let mut game = Game::new(8);
    let mut reached_floor = false;
    let mut locks = Vec::new();
    for _ in 0..1000 {
        let feedback = game.update(0.05);
        locks.extend(locked_at(&feedback));
        if !locks.is_empty() {
            break;
        }
        let tile = game.state().active_tile.unwrap();
        if tile.row() == GameConfig::ROWS - 1 {
            reached_floor = true;
            assert!(tile.vertical_position(GameConfig::ROWS) <= 7.0);
        }
    }
    assert!(reached_floor);
    assert_eq!(locks, vec![(7, 2)]);
}

#[test]
fn fixed_tick_steps_a_row_per_interval() {
    let config = GameConfig {
        descent_policy: DescentPolicy::FixedTick {
            interval: Duration::from_millis(100),
        },
        ..Default::default()
    };
    let mut game = Game::with_config(config, 4).unwrap();
    game.update(0.05);
    assert_eq!(game.state().active_tile.unwrap().row(), 0);
    game.update(0.05);
    assert_eq!(game.state().active_tile.unwrap().row(), 1);
    assert_eq!(game.state().active_tile.unwrap().fall, 0.0);
    for _ in 0..12 {
        game.update(0.05);
    }
    assert_eq!(game.state().active_tile.unwrap().row(), 7);
    assert_eq!(game.state().tiles_locked, 0);
    game.update(0.05);
    let feedback = game.update(0.05);
    assert_eq!(locked_at(&feedback), vec![(7, 2)]);
    assert_eq!(game.state().tiles_locked, 1);
}

#[test]
fn same_seed_same_game() {
    let play = |seed| {
        let mut game = Game::new(seed);
        for col in [0, 4, 2, 1, 3, 0, 4] {
            game.move_to_column(col);
            game.hard_drop();
            game.update(0.03);
        }
        game.state().clone()
    };
    assert_eq!(play(2024), play(2024));
}

#[test]
fn forfeit_ends_game() {
    let mut game = Game::new(0);
    game.forfeit();
    assert_eq!(game.state().end, Some(GameOver::Forfeit));
    assert!(!game.move_left());
}

#[test]
fn preset_grid_must_match_config() {
    let grid = Grid::new(4, 4);
    assert!(Game::with_grid(GameConfig::default(), grid, 0).is_err());
}

#[test]
fn highest_tile_tracks_merges() {
    let grid = grid_with(&[((7, 1), 2), ((7, 3), 2)]);
    let mut game = Game::with_grid(scripted(&[2, 64]), grid, 0).unwrap();
    assert_eq!(game.state().highest_tile(), Some(value(2)));
    game.hard_drop();
    assert_eq!(game.state().highest_tile(), Some(value(8)));
}
