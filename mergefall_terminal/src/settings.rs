use std::{
    collections::HashMap,
    fs::File,
    io::{self, Read},
    path::Path,
};

use crossterm::event::KeyCode;
use mergefall_engine::Intent;
use serde_with::serde_as;

/// Frontend settings, read from the JSON file passed with `--settings`.
#[serde_as]
#[derive(PartialEq, Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Settings {
    pub game_fps: f64,
    // JSON object keys must be strings, so keybinds are stored as a list of pairs.
    #[serde_as(as = "Vec<(_, _)>")]
    pub keybinds: HashMap<KeyCode, Intent>,
}

impl Settings {
    pub const DEFAULT_FPS: f64 = 30.0;

    /// Reads settings from `path`, falling back to defaults if there is no such file.
    pub fn load(path: &Path) -> io::Result<Self> {
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(err),
        };
        let mut settings_str = String::new();
        file.read_to_string(&mut settings_str)?;
        Self::from_json(&settings_str)
    }

    fn from_json(settings_str: &str) -> io::Result<Self> {
        let settings: Self = serde_json::from_str(settings_str)?;
        if !(settings.game_fps.is_finite() && settings.game_fps > 0.0) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("game_fps must be positive, got {}", settings.game_fps),
            ));
        }
        Ok(settings)
    }
}

impl Default for Settings {
    fn default() -> Self {
        let keybinds = HashMap::from([
            (KeyCode::Left, Intent::MoveLeft),
            (KeyCode::Right, Intent::MoveRight),
            (KeyCode::Char('a'), Intent::MoveLeft),
            (KeyCode::Char('d'), Intent::MoveRight),
            (KeyCode::Down, Intent::HardDrop),
            (KeyCode::Char(' '), Intent::HardDrop),
            (KeyCode::Char('r'), Intent::Restart),
        ]);
        Self {
            game_fps: Self::DEFAULT_FPS,
            keybinds,
        }
    }
}
