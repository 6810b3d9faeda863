use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::Sender,
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
use mergefall_engine::Intent;

use crate::game_renderers::BoardLayout;

#[derive(Eq, PartialEq, Clone, Copy, Debug)]
pub enum PointerAction {
    Press,
    Drag,
    Release,
}

#[derive(Eq, PartialEq, Clone, Copy, Debug)]
pub enum InputSignal {
    Intent(Intent),
    /// Raw left-button pointer activity in screen coordinates; mapped to lanes by the game loop,
    /// which owns the current layout.
    Pointer {
        column: u16,
        row: u16,
        action: PointerAction,
    },
    Pause,
    Quit,
}

#[derive(Debug)]
pub struct CrosstermHandler {
    handles: Option<(JoinHandle<()>, Arc<AtomicBool>)>,
}

impl Drop for CrosstermHandler {
    fn drop(&mut self) {
        if let Some((_handle, running_flag)) = self.handles.take() {
            running_flag.store(false, Ordering::Release);
        }
    }
}

impl CrosstermHandler {
    const POLL_INTERVAL: Duration = Duration::from_millis(25);

    pub fn new(sender: &Sender<InputSignal>, keybinds: &HashMap<KeyCode, Intent>) -> Self {
        let flag = Arc::new(AtomicBool::new(true));
        let handle = Self::spawn(sender.clone(), flag.clone(), keybinds.clone());
        CrosstermHandler {
            handles: Some((handle, flag)),
        }
    }

    fn spawn(
        sender: Sender<InputSignal>,
        flag: Arc<AtomicBool>,
        keybinds: HashMap<KeyCode, Intent>,
    ) -> JoinHandle<()> {
        thread::spawn(move || {
            while flag.load(Ordering::Acquire) {
                // Poll first so a stopped handler does not swallow the next event.
                match event::poll(Self::POLL_INTERVAL) {
                    Ok(true) => {}
                    Ok(false) | Err(_) => continue,
                }
                let event = match event::read() {
                    Ok(event) => event,
                    // Spurious io::Error: ignore.
                    Err(_) => continue,
                };
                let Some(signal) = translate(&event, &keybinds) else {
                    continue;
                };
                if sender.send(signal).is_err() {
                    break;
                }
            }
        })
    }
}

/// Maps one terminal event to a game loop signal, if it means anything to the game.
pub fn translate(event: &Event, keybinds: &HashMap<KeyCode, Intent>) -> Option<InputSignal> {
    match *event {
        Event::Key(KeyEvent {
            code: KeyCode::Char('c'),
            modifiers: KeyModifiers::CONTROL,
            kind: KeyEventKind::Press,
            ..
        }) => Some(InputSignal::Quit),
        Event::Key(KeyEvent {
            code: KeyCode::Esc,
            kind: KeyEventKind::Press,
            ..
        }) => Some(InputSignal::Pause),
        Event::Key(KeyEvent {
            code,
            kind: KeyEventKind::Press | KeyEventKind::Repeat,
            ..
        }) => keybinds.get(&code).copied().map(InputSignal::Intent),
        Event::Mouse(MouseEvent {
            kind,
            column,
            row,
            ..
        }) => {
            let action = match kind {
                MouseEventKind::Down(MouseButton::Left) => PointerAction::Press,
                MouseEventKind::Drag(MouseButton::Left) => PointerAction::Drag,
                MouseEventKind::Up(MouseButton::Left) => PointerAction::Release,
                _ => return None,
            };
            Some(InputSignal::Pointer {
                column,
                row,
                action,
            })
        }
        _ => None,
    }
}

/// Drag-to-drop state: pressing on a lane grabs the falling tile, dragging moves it between
/// lanes, releasing drops it.
#[derive(Eq, PartialEq, Clone, Copy, Default, Debug)]
pub struct LaneDrag {
    selected: Option<usize>,
}

impl LaneDrag {
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn cancel(&mut self) {
        self.selected = None;
    }

    pub fn handle(
        &mut self,
        layout: &BoardLayout,
        column: u16,
        row: u16,
        action: PointerAction,
    ) -> Option<Intent> {
        match action {
            PointerAction::Press => {
                self.selected = layout.lane_at(column, row);
                self.selected.map(Intent::MoveToColumn)
            }
            PointerAction::Drag => {
                self.selected?;
                let lane = layout.lane_at(column, row)?;
                if self.selected == Some(lane) {
                    return None;
                }
                self.selected = Some(lane);
                Some(Intent::MoveToColumn(lane))
            }
            PointerAction::Release => self.selected.take().map(|_| Intent::HardDrop),
        }
    }
}
