use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::items::{DEFAULT_FILLER_ITEMS, DEFAULT_MANDATORY_ITEMS};
use crate::{RandomizerError, Result};

pub const MAX_JEWEL_COUNT: u8 = 9;

/// Everything that changes the generated world. Presets are this structure
/// serialized as JSON; missing keys take their default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RandomizerOptions {
    pub seed: u32,
    pub game_settings: GameSettings,
    pub randomizer_settings: LogicSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameSettings {
    pub jewel_count: u8,
    /// Makes the four breast armors cost the same, so they can be bought in
    /// any order as upgrades.
    pub armor_upgrades: bool,
    pub consumable_record_book: bool,
    pub starting_items: BTreeMap<String, u8>,
    pub item_prices: BTreeMap<String, u16>,
    pub item_max_quantities: BTreeMap<String, u8>,
}

impl Default for GameSettings {
    fn default() -> Self {
        GameSettings {
            jewel_count: 2,
            armor_upgrades: true,
            consumable_record_book: false,
            starting_items: BTreeMap::new(),
            item_prices: BTreeMap::new(),
            item_max_quantities: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogicSettings {
    /// Share of the known empty sources filled with filler items at each
    /// step of the placement loop.
    pub filling_rate: f64,
    /// Allowed spawn location ids. Empty means every spawn location.
    pub spawn_locations: Vec<String>,
    pub shuffle_trees: bool,
    /// Counts the ghost jump from the lake shrine route up to the
    /// mountainous area as a way forward.
    pub ghost_jumping_in_logic: bool,
    pub allow_spoiler_log: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mandatory_items: Option<BTreeMap<String, u16>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filler_items: Option<BTreeMap<String, u16>>,
}

impl Default for LogicSettings {
    fn default() -> Self {
        LogicSettings {
            filling_rate: 0.20,
            spawn_locations: Vec::new(),
            shuffle_trees: false,
            ghost_jumping_in_logic: false,
            allow_spoiler_log: true,
            mandatory_items: None,
            filler_items: None,
        }
    }
}

impl Default for RandomizerOptions {
    fn default() -> Self {
        RandomizerOptions {
            seed: 0,
            game_settings: GameSettings::default(),
            randomizer_settings: LogicSettings::default(),
        }
    }
}

fn to_distribution(table: &[(&str, u16)]) -> BTreeMap<String, u16> {
    table
        .iter()
        .map(|(name, quantity)| (name.to_string(), *quantity))
        .collect()
}

impl RandomizerOptions {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: RandomizerOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_preset_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let options = Self::from_json_str(&text)?;
        info!("Loaded preset from {}", path.display());
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        let jewel_count = self.game_settings.jewel_count;
        if jewel_count > MAX_JEWEL_COUNT {
            return Err(RandomizerError::Config(format!(
                "jewel count must be between 0 and {}, got {}",
                MAX_JEWEL_COUNT, jewel_count
            )));
        }

        let filling_rate = self.randomizer_settings.filling_rate;
        if !(0.0..=1.0).contains(&filling_rate) {
            return Err(RandomizerError::Config(format!(
                "filling rate must be between 0 and 1, got {}",
                filling_rate
            )));
        }

        Ok(())
    }

    pub fn filling_rate(&self) -> f64 {
        self.randomizer_settings.filling_rate
    }

    pub fn jewel_count(&self) -> u8 {
        self.game_settings.jewel_count
    }

    pub fn mandatory_items(&self) -> BTreeMap<String, u16> {
        self.randomizer_settings
            .mandatory_items
            .clone()
            .unwrap_or_else(|| to_distribution(DEFAULT_MANDATORY_ITEMS))
    }

    pub fn filler_items(&self) -> BTreeMap<String, u16> {
        self.randomizer_settings
            .filler_items
            .clone()
            .unwrap_or_else(|| to_distribution(DEFAULT_FILLER_ITEMS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_preset_takes_defaults() {
        let options = RandomizerOptions::from_json_str("{}").unwrap();
        assert_eq!(options, RandomizerOptions::default());
        assert!(!options.randomizer_settings.ghost_jumping_in_logic);
        assert_eq!(options.jewel_count(), 2);
        assert!((options.filling_rate() - 0.20).abs() < f64::EPSILON);
        assert_eq!(options.filler_items().get("Golds"), Some(&30));
        assert_eq!(options.mandatory_items().get("Spell Book"), Some(&1));
    }

    #[test]
    fn nested_preset_fields_are_read() {
        let json = r#"{
            "seed": 1234,
            "gameSettings": { "jewelCount": 7, "startingItems": { "Lantern": 1 } },
            "randomizerSettings": {
                "fillingRate": 0.5,
                "spawnLocations": ["gumi"],
                "ghostJumpingInLogic": true,
                "fillerItems": { "EkeEke": 10 }
            }
        }"#;
        let options = RandomizerOptions::from_json_str(json).unwrap();
        assert_eq!(options.seed, 1234);
        assert_eq!(options.jewel_count(), 7);
        assert!(options.game_settings.armor_upgrades);
        assert_eq!(options.game_settings.starting_items.get("Lantern"), Some(&1));
        assert_eq!(options.randomizer_settings.spawn_locations, vec!["gumi"]);
        assert!(options.randomizer_settings.ghost_jumping_in_logic);
        assert_eq!(options.filler_items().len(), 1);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut options = RandomizerOptions::default();
        options.game_settings.jewel_count = 10;
        assert!(matches!(options.validate(), Err(RandomizerError::Config(_))));

        let mut options = RandomizerOptions::default();
        options.randomizer_settings.filling_rate = 1.5;
        assert!(options.validate().is_err());
        options.randomizer_settings.filling_rate = f64::NAN;
        assert!(options.validate().is_err());
        options.randomizer_settings.filling_rate = 1.0;
        assert!(options.validate().is_ok());
    }
}
