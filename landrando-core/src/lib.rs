use log::{debug, info};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod data;
mod exploration;
pub mod items;
pub mod model;
pub mod options;
pub mod randomizer;
pub mod solver;
pub mod spoiler;
pub mod world;

pub use data::WorldData;
pub use exploration::missing_items;
pub use options::RandomizerOptions;
pub use randomizer::WorldRandomizer;
pub use solver::WorldSolver;
pub use spoiler::SpoilerLog;
pub use world::World;

#[derive(Debug, Clone)]
pub struct RandomizerSettings {
    pub options: RandomizerOptions,
    /// World model to use instead of the bundled one. May be gzipped.
    pub world_data_path: Option<PathBuf>,
    pub plando_path: Option<PathBuf>,
    pub output_path: PathBuf,
    /// Writes the spoiler log even when the options forbid it.
    pub debug: bool,
}

#[derive(Debug, Error)]
pub enum RandomizerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid world data: {0}")]
    WorldData(String),
    #[error("no appropriate item source could be found to place {item}")]
    NoAppropriateItemSource { item: String },
    #[error("world cannot be completed from '{start}' to '{end}' ({steps} exploration steps)")]
    UncompletableWorld {
        start: String,
        end: String,
        steps: usize,
        /// Step-by-step exploration log, as JSON.
        dump: String,
    },
}

pub type Result<T> = std::result::Result<T, RandomizerError>;

/// Builds the world a randomization run works on: static data, then option
/// patches, then plando pre-fills.
pub fn build_world(
    data: WorldData,
    options: &RandomizerOptions,
    plando: Option<&Value>,
) -> Result<World> {
    options.validate()?;
    let mut world = World::from_data(data)?;
    world.apply_options(options)?;
    if let Some(plando) = plando {
        world.apply_plando(plando)?;
    }
    Ok(world)
}

/// Randomizes `world` in place and returns the spoiler log of the run.
pub fn randomize(world: &mut World, options: &RandomizerOptions) -> Result<SpoilerLog> {
    let mut randomizer = WorldRandomizer::new(world, options)?;
    randomizer.randomize()?;
    Ok(randomizer.into_spoiler_log())
}

pub fn output_folder(output_path: &Path, seed: u32) -> PathBuf {
    output_path.join(format!("Landrando_{}", seed))
}

pub fn write_crash_dump(output_path: &Path, dump: &str) -> Result<PathBuf> {
    fs::create_dir_all(output_path)?;
    let path = output_path.join("crash_dump.json");
    fs::write(&path, dump)?;
    Ok(path)
}

pub fn run(settings: RandomizerSettings) -> Result<()> {
    let options = &settings.options;
    options.validate()?;

    let data = match &settings.world_data_path {
        Some(path) => WorldData::load(path)?,
        None => WorldData::bundled()?,
    };

    let plando: Option<Value> = match &settings.plando_path {
        Some(path) => Some(serde_json::from_str(&fs::read_to_string(path)?)?),
        None => None,
    };

    let mut world = build_world(data, options, plando.as_ref())?;
    info!("Randomizing with seed {}...", options.seed);
    let spoiler_log = randomize(&mut world, options)?;

    // Nothing is written before the world is known to be completable
    let out_root = output_folder(&settings.output_path, options.seed);
    fs::create_dir_all(&out_root)?;

    let world_path = out_root.join("world.json");
    fs::write(&world_path, serde_json::to_string_pretty(&world.export())?)?;
    info!("World written to {}", world_path.display());

    if options.randomizer_settings.allow_spoiler_log || settings.debug {
        let spoiler_path = out_root.join("spoiler_log.json");
        fs::write(&spoiler_path, spoiler_log.to_json_pretty()?)?;
        info!("Spoiler log written to {}", spoiler_path.display());
    }

    if settings.debug {
        for step in &spoiler_log.steps {
            debug!(
                "Step {}: {} nodes explored, {} key items, {} filler items",
                step.label,
                step.explored_nodes.len(),
                step.placed_key_items.len(),
                step.filled_sources.len()
            );
        }
    }

    Ok(())
}
