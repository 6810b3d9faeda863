use std::{
    fmt,
    io::{self, Write},
    sync::mpsc,
    time::{Duration, Instant},
};

use crossterm::{
    cursor::{self, MoveTo},
    event::{
        self, Event, KeyCode, KeyEvent,
        KeyEventKind::{Press, Repeat},
        KeyModifiers,
    },
    style::{self, Print, PrintStyledContent, Stylize},
    terminal, ExecutableCommand, QueueableCommand,
};
use mergefall_engine::{Game, GameState, Intent};
use tracing::info;

use crate::{
    game_input_handler::{CrosstermHandler, InputSignal, LaneDrag},
    game_renderers::{naive::Renderer, BoardLayout, GameScreenRenderer},
    settings::Settings,
};

#[derive(Debug)]
enum Menu {
    Game {
        game: Box<Game>,
        game_screen_renderer: Renderer,
        lane_drag: LaneDrag,
    },
    GameOver(Box<GameState>),
    Pause,
    Quit(String),
}

impl fmt::Display for Menu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Menu::Game { .. } => "Game",
            Menu::GameOver(_) => "Game Over",
            Menu::Pause => "Pause",
            Menu::Quit(_) => "Quit",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug)]
enum MenuUpdate {
    Pop,
    Push(Menu),
    /// Throw away everything above the game and start it over.
    Restart,
}

#[derive(Eq, PartialEq, Clone, Copy, Debug)]
enum Choice {
    Resume,
    Restart,
    Quit,
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Choice::Resume => "Resume",
            Choice::Restart => "Restart",
            Choice::Quit => "Quit",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug)]
pub struct App<T: Write> {
    pub term: T,
    pub settings: Settings,
}

impl<T: Write> Drop for App<T> {
    fn drop(&mut self) {
        // Console epilogue: de-initialization.
        let _ = self.term.execute(event::DisableMouseCapture);
        let _ = terminal::disable_raw_mode();
        let _ = self.term.execute(style::ResetColor);
        let _ = self.term.execute(cursor::Show);
        let _ = self.term.execute(terminal::LeaveAlternateScreen);
    }
}

impl<T: Write> App<T> {
    pub const W_MAIN: u16 = 80;
    pub const H_MAIN: u16 = 24;

    pub fn new(mut terminal: T, settings: Settings) -> Self {
        // Console prologue: initialization.
        let _ = terminal.execute(terminal::EnterAlternateScreen);
        let _ = terminal.execute(terminal::SetTitle("Mergefall"));
        let _ = terminal.execute(cursor::Hide);
        let _ = terminal.execute(event::EnableMouseCapture);
        let _ = terminal::enable_raw_mode();
        Self {
            term: terminal,
            settings,
        }
    }

    /// Plays `game` until the player quits, returning a farewell message.
    pub fn run(&mut self, game: Game) -> io::Result<String> {
        let mut menu_stack = vec![Menu::Game {
            game: Box::new(game),
            game_screen_renderer: Renderer::default(),
            lane_drag: LaneDrag::default(),
        }];
        let msg = loop {
            // Retrieve active menu, stop application if stack is empty.
            let Some(screen) = menu_stack.last_mut() else {
                break String::from("all menus exited");
            };
            let menu_update = match screen {
                Menu::Game {
                    game,
                    game_screen_renderer,
                    lane_drag,
                } => self.game(game, game_screen_renderer, lane_drag),
                Menu::GameOver(last_state) => self.gameover(last_state),
                Menu::Pause => self.pause(),
                Menu::Quit(string) => break string.clone(),
            }?;
            match menu_update {
                MenuUpdate::Pop => {
                    if menu_stack.len() > 1 {
                        menu_stack.pop();
                    }
                }
                MenuUpdate::Push(menu) => menu_stack.push(menu),
                MenuUpdate::Restart => {
                    menu_stack.retain(|menu| matches!(menu, Menu::Game { .. }));
                    if let Some(Menu::Game {
                        game,
                        game_screen_renderer,
                        lane_drag,
                    }) = menu_stack.last_mut()
                    {
                        game.restart();
                        *game_screen_renderer = Renderer::default();
                        lane_drag.cancel();
                        info!("game restarted from menu");
                    }
                }
            }
        };
        for menu in &mut menu_stack {
            if let Menu::Game { game, .. } = menu {
                game.forfeit();
                let state = game.state();
                info!(
                    score = state.score,
                    tiles_locked = state.tiles_locked,
                    "session ended"
                );
                return Ok(format!("{msg} (score {})", state.score));
            }
        }
        Ok(msg)
    }

    fn game(
        &mut self,
        game: &mut Game,
        game_screen_renderer: &mut Renderer,
        lane_drag: &mut LaneDrag,
    ) -> io::Result<MenuUpdate> {
        // Prepare channel with which to communicate intents / game interrupt.
        let (tx, rx) = mpsc::channel::<InputSignal>();
        let _input_handler = CrosstermHandler::new(&tx, &self.settings.keybinds);
        let mut session_resumed = Instant::now();
        let mut last_update = session_resumed;
        let mut f = 0u32;
        let mut new_feedback_events = Vec::new();
        let next_menu = 'render_loop: loop {
            let layout = BoardLayout::centered(game.config().rows, game.config().cols);
            if game.ended() {
                lane_drag.cancel();
                game_screen_renderer.render(
                    self,
                    game,
                    &layout,
                    lane_drag,
                    std::mem::take(&mut new_feedback_events),
                )?;
                info!(score = game.state().score, "game over");
                // Keep the final board up until the player reacts.
                loop {
                    match rx.recv() {
                        Ok(InputSignal::Pointer { .. }) => continue,
                        Ok(InputSignal::Quit) => {
                            break 'render_loop MenuUpdate::Push(Menu::Quit(
                                "exited with ctrl-c".to_string(),
                            ))
                        }
                        Ok(InputSignal::Intent(Intent::Restart)) => {
                            new_feedback_events = game.restart();
                            *game_screen_renderer = Renderer::default();
                            session_resumed = Instant::now();
                            last_update = session_resumed;
                            f = 0;
                            continue 'render_loop;
                        }
                        Ok(_) | Err(_) => {
                            break 'render_loop MenuUpdate::Push(Menu::GameOver(Box::new(
                                game.state().clone(),
                            )))
                        }
                    }
                }
            }
            // Start next frame
            f += 1;
            let next_frame_at =
                session_resumed + Duration::from_secs_f64(f64::from(f) / self.settings.game_fps);
            'idle_loop: loop {
                let frame_idle_remaining = next_frame_at.saturating_duration_since(Instant::now());
                match rx.recv_timeout(frame_idle_remaining) {
                    Ok(InputSignal::Pause) => {
                        lane_drag.cancel();
                        break 'render_loop MenuUpdate::Push(Menu::Pause);
                    }
                    Ok(InputSignal::Quit) => {
                        break 'render_loop MenuUpdate::Push(Menu::Quit(
                            "exited with ctrl-c".to_string(),
                        ));
                    }
                    Ok(InputSignal::Intent(intent)) => {
                        new_feedback_events.extend(game.handle_intent(intent));
                        if intent == Intent::Restart {
                            *game_screen_renderer = Renderer::default();
                            lane_drag.cancel();
                        }
                        continue 'idle_loop;
                    }
                    Ok(InputSignal::Pointer {
                        column,
                        row,
                        action,
                    }) => {
                        if let Some(intent) = lane_drag.handle(&layout, column, row, action) {
                            new_feedback_events.extend(game.handle_intent(intent));
                        }
                        continue 'idle_loop;
                    }
                    Err(mpsc::RecvTimeoutError::Timeout) => {
                        let now = Instant::now();
                        let dt = now.saturating_duration_since(last_update);
                        last_update = now;
                        new_feedback_events.extend(game.update(dt.as_secs_f64()));
                        break 'idle_loop;
                    }
                    Err(mpsc::RecvTimeoutError::Disconnected) => {
                        // NOTE: We kind of rely on this not happening too often.
                        break 'render_loop MenuUpdate::Push(Menu::Pause);
                    }
                };
            }
            game_screen_renderer.render(
                self,
                game,
                &layout,
                lane_drag,
                std::mem::take(&mut new_feedback_events),
            )?;
        };
        Ok(next_menu)
    }

    fn gameover(&mut self, last_state: &GameState) -> io::Result<MenuUpdate> {
        let details = vec![
            format!("Score: {}", last_state.score),
            format!(
                "Best tile: {}",
                last_state
                    .highest_tile()
                    .map_or("-".to_string(), |value| value.to_string())
            ),
            format!("Tiles: {}", last_state.tiles_locked),
            format!("Merges: {}", last_state.merges),
            format!("Time: {}", format_duration(last_state.game_time)),
        ];
        self.selection_widget("Game Over", &details, &[Choice::Restart, Choice::Quit])
    }

    fn pause(&mut self) -> io::Result<MenuUpdate> {
        self.selection_widget(
            &Menu::Pause.to_string(),
            &[],
            &[Choice::Resume, Choice::Restart, Choice::Quit],
        )
    }

    pub(crate) fn fetch_main_xy() -> (u16, u16) {
        let (w_console, h_console) = terminal::size().unwrap_or((0, 0));
        (
            w_console.saturating_sub(Self::W_MAIN) / 2,
            h_console.saturating_sub(Self::H_MAIN) / 2,
        )
    }

    fn selection_widget(
        &mut self,
        current_menu_name: &str,
        details: &[String],
        choices: &[Choice],
    ) -> io::Result<MenuUpdate> {
        let mut selected = 0usize;
        loop {
            let w_main = Self::W_MAIN.into();
            let (x_main, y_main) = Self::fetch_main_xy();
            let y_selection = Self::H_MAIN / 5;
            self.term
                .queue(terminal::Clear(terminal::ClearType::All))?
                .queue(MoveTo(x_main, y_main + y_selection))?
                .queue(Print(format!(
                    "{:^w_main$}",
                    format!("[ {} ]", current_menu_name.to_ascii_uppercase())
                )))?
                .queue(MoveTo(x_main, y_main + y_selection + 2))?
                .queue(Print(format!("{:^w_main$}", "──────────────────────────")))?;
            let mut y_line = y_main + y_selection + 4;
            for detail in details {
                self.term
                    .queue(MoveTo(x_main, y_line))?
                    .queue(Print(format!("{detail:^w_main$}")))?;
                y_line += 1;
            }
            if !details.is_empty() {
                y_line += 1;
            }
            for (i, choice) in choices.iter().enumerate() {
                let name = choice.to_string();
                self.term
                    .queue(MoveTo(x_main, y_line))?
                    .queue(Print(format!(
                        "{:^w_main$}",
                        if i == selected {
                            format!(">>> {name} <<<")
                        } else {
                            name
                        }
                    )))?;
                y_line += 1;
            }
            self.term
                .queue(MoveTo(x_main, y_line + 2))?
                .queue(PrintStyledContent(
                    format!("{:^w_main$}", "Use [↑] [↓] [Esc] [Enter].").italic(),
                ))?;
            self.term.flush()?;
            // Wait for new input.
            match event::read()? {
                // Quit menu.
                Event::Key(KeyEvent {
                    code: KeyCode::Char('c'),
                    modifiers: KeyModifiers::CONTROL,
                    kind: Press | Repeat,
                    state: _,
                }) => {
                    break Ok(MenuUpdate::Push(Menu::Quit(
                        "exited with ctrl-c".to_string(),
                    )))
                }
                Event::Key(KeyEvent {
                    code: KeyCode::Esc,
                    kind: Press,
                    ..
                }) if choices.contains(&Choice::Resume) => break Ok(MenuUpdate::Pop),
                Event::Key(KeyEvent {
                    code: KeyCode::Enter,
                    kind: Press,
                    ..
                }) => {
                    if let Some(choice) = choices.get(selected) {
                        break Ok(match choice {
                            Choice::Resume => MenuUpdate::Pop,
                            Choice::Restart => MenuUpdate::Restart,
                            Choice::Quit => MenuUpdate::Push(Menu::Quit(format!(
                                "quit from {}",
                                current_menu_name.to_lowercase()
                            ))),
                        });
                    }
                }
                // Move selector up.
                Event::Key(KeyEvent {
                    code: KeyCode::Up,
                    kind: Press | Repeat,
                    ..
                }) => {
                    if !choices.is_empty() {
                        selected += choices.len() - 1;
                    }
                }
                // Move selector down.
                Event::Key(KeyEvent {
                    code: KeyCode::Down,
                    kind: Press | Repeat,
                    ..
                }) => {
                    if !choices.is_empty() {
                        selected += 1;
                    }
                }
                // Other event: don't care.
                _ => {}
            }
            if !choices.is_empty() {
                selected = selected.rem_euclid(choices.len());
            }
        }
    }
}

pub fn format_duration(dur: Duration) -> String {
    format!(
        "{}:{:02}.{:02}",
        dur.as_secs() / 60,
        dur.as_secs() % 60,
        dur.as_millis() % 1000 / 10
    )
}
