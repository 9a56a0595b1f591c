use clap::Parser;
use log::{error, info};
use rand::Rng;
use std::path::PathBuf;

use landrando_core::{run, write_crash_dump, RandomizerError, RandomizerOptions, RandomizerSettings};

#[derive(Debug, Parser)]
#[command(name = "landrando", version, about = "Landstalker item randomizer")]
struct Args {
    /// Folder receiving the Landrando_<seed> output folder.
    #[arg(long)]
    output: PathBuf,

    /// Random when omitted, or taken from the preset if one is given.
    #[arg(long)]
    seed: Option<u32>,

    /// JSON preset holding the randomizer options.
    #[arg(long)]
    preset: Option<PathBuf>,

    /// World model to use instead of the bundled one (.json or .json.gz).
    #[arg(long, value_name = "FILE")]
    world_data: Option<PathBuf>,

    /// JSON file pre-filling some item sources.
    #[arg(long)]
    plando: Option<PathBuf>,

    #[arg(long)]
    filling_rate: Option<f64>,

    #[arg(long)]
    jewel_count: Option<u8>,

    /// Restricts the possible spawn locations. Can be repeated.
    #[arg(long = "spawn-location", value_name = "ID")]
    spawn_locations: Vec<String>,

    #[arg(long, default_value_t = false)]
    shuffle_trees: bool,

    /// Lets logic expect the ghost jump up to the mountainous area.
    #[arg(long, default_value_t = false)]
    ghost_jumping_in_logic: bool,

    #[arg(long, default_value_t = false)]
    no_armor_upgrades: bool,

    #[arg(long, default_value_t = false)]
    no_spoiler_log: bool,

    #[arg(long, default_value_t = false)]
    debug: bool,
}

impl Args {
    fn options(&self) -> Result<RandomizerOptions, RandomizerError> {
        let mut options = match &self.preset {
            Some(path) => RandomizerOptions::from_preset_file(path)?,
            None => {
                let mut options = RandomizerOptions::default();
                options.seed = rand::thread_rng().gen();
                options
            }
        };

        if let Some(seed) = self.seed {
            options.seed = seed;
        }
        if let Some(filling_rate) = self.filling_rate {
            options.randomizer_settings.filling_rate = filling_rate;
        }
        if let Some(jewel_count) = self.jewel_count {
            options.game_settings.jewel_count = jewel_count;
        }
        if !self.spawn_locations.is_empty() {
            options.randomizer_settings.spawn_locations = self.spawn_locations.clone();
        }
        if self.shuffle_trees {
            options.randomizer_settings.shuffle_trees = true;
        }
        if self.ghost_jumping_in_logic {
            options.randomizer_settings.ghost_jumping_in_logic = true;
        }
        if self.no_armor_upgrades {
            options.game_settings.armor_upgrades = false;
        }
        if self.no_spoiler_log {
            options.randomizer_settings.allow_spoiler_log = false;
        }

        options.validate()?;
        Ok(options)
    }
}

fn main() {
    let args = Args::parse();

    let default_filter = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();

    let options = match args.options() {
        Ok(options) => options,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };
    info!("Seed: {}", options.seed);

    let settings = RandomizerSettings {
        options,
        world_data_path: args.world_data.clone(),
        plando_path: args.plando.clone(),
        output_path: args.output.clone(),
        debug: args.debug,
    };

    if let Err(err) = run(settings) {
        if let RandomizerError::UncompletableWorld { dump, .. } = &err {
            match write_crash_dump(&args.output, dump) {
                Ok(path) => error!("Exploration dump written to {}", path.display()),
                Err(dump_err) => error!("Could not write crash dump: {dump_err}"),
            }
        }
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
