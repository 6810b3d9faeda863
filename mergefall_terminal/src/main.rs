mod game_input_handler;
mod game_renderers;
mod settings;
mod terminal_app;

use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};

use clap::Parser;
use mergefall_engine::{DescentPolicy, Game, GameConfig};
use tracing::info;
use tracing_subscriber::filter::EnvFilter;

use settings::Settings;

/// Terminal frontend for playing mergefall.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The framerate at which to run the main game.
    #[arg(short, long)]
    fps: Option<u32>,
    /// Seed for the tile sequence, random if omitted.
    #[arg(short, long)]
    seed: Option<u64>,
    /// Step the falling tile one row every this many milliseconds instead of sliding it.
    #[arg(long, conflicts_with = "rate")]
    tick_ms: Option<u64>,
    /// Continuous fall speed in rows per second.
    #[arg(long)]
    rate: Option<f64>,
    /// JSON file with fps and keybinds.
    #[arg(long, default_value = "mergefall_settings.json")]
    settings: PathBuf,
    /// Where to write logs; filtered by `RUST_LOG`, nothing is logged without it.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Args {
    fn game_config(&self) -> GameConfig {
        let descent_policy = match (self.tick_ms, self.rate) {
            (Some(millis), _) => DescentPolicy::FixedTick {
                interval: Duration::from_millis(millis),
            },
            (None, Some(rows_per_second)) => DescentPolicy::ContinuousRate { rows_per_second },
            (None, None) => DescentPolicy::default(),
        };
        GameConfig {
            descent_policy,
            ..Default::default()
        }
    }
}

fn init_logging(path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> Result<(), io::Error> {
    let args = Args::parse();
    if let Some(path) = &args.log_file {
        init_logging(path)?;
    }
    let mut settings = Settings::load(&args.settings)?;
    if let Some(fps) = args.fps.filter(|&fps| fps > 0) {
        settings.game_fps = fps.into();
    }
    let seed = args.seed.unwrap_or_else(rand::random);
    let config = args.game_config();
    info!(
        seed,
        descent_policy = ?config.descent_policy,
        fps = settings.game_fps,
        "starting game"
    );
    let game = Game::with_config(config, seed)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
    let stdout = io::BufWriter::new(io::stdout());
    let msg = {
        let mut app = terminal_app::App::new(stdout, settings);
        app.run(game)?
    };
    println!("{msg}");
    Ok(())
}
