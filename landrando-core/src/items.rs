use serde::{Deserialize, Serialize};

pub type ItemId = u8;

pub const ITEM_EKEEKE: ItemId = 0x00;
pub const ITEM_MAGIC_SWORD: ItemId = 0x01;
pub const ITEM_ICE_SWORD: ItemId = 0x02;
pub const ITEM_THUNDER_SWORD: ItemId = 0x03;
pub const ITEM_GAIA_SWORD: ItemId = 0x04;
pub const ITEM_FIREPROOF_BOOTS: ItemId = 0x05;
pub const ITEM_IRON_BOOTS: ItemId = 0x06;
pub const ITEM_HEALING_BOOTS: ItemId = 0x07;
pub const ITEM_SPIKE_BOOTS: ItemId = 0x08;
pub const ITEM_STEEL_BREAST: ItemId = 0x09;
pub const ITEM_CHROME_BREAST: ItemId = 0x0A;
pub const ITEM_SHELL_BREAST: ItemId = 0x0B;
pub const ITEM_HYPER_BREAST: ItemId = 0x0C;
pub const ITEM_MARS_STONE: ItemId = 0x0D;
pub const ITEM_MOON_STONE: ItemId = 0x0E;
pub const ITEM_SATURN_STONE: ItemId = 0x0F;
pub const ITEM_VENUS_STONE: ItemId = 0x10;
pub const ITEM_DETOX_GRASS: ItemId = 0x12;
pub const ITEM_STATUE_GAIA: ItemId = 0x13;
pub const ITEM_GOLDEN_STATUE: ItemId = 0x14;
pub const ITEM_MIND_REPAIR: ItemId = 0x15;
pub const ITEM_CASINO_TICKET: ItemId = 0x16;
pub const ITEM_AXE_MAGIC: ItemId = 0x17;
pub const ITEM_BLUE_RIBBON: ItemId = 0x18;
pub const ITEM_BUYER_CARD: ItemId = 0x19;
pub const ITEM_LANTERN: ItemId = 0x1A;
pub const ITEM_GARLIC: ItemId = 0x1B;
pub const ITEM_ANTI_PARALYZE: ItemId = 0x1C;
pub const ITEM_STATUE_JYPTA: ItemId = 0x1D;
pub const ITEM_SUN_STONE: ItemId = 0x1E;
pub const ITEM_ARMLET: ItemId = 0x1F;
pub const ITEM_EINSTEIN_WHISTLE: ItemId = 0x20;
pub const ITEM_RECORD_BOOK: ItemId = 0x23;
pub const ITEM_SPELL_BOOK: ItemId = 0x24;
pub const ITEM_LITHOGRAPH: ItemId = 0x27;
pub const ITEM_RED_JEWEL: ItemId = 0x28;
pub const ITEM_PAWN_TICKET: ItemId = 0x29;
pub const ITEM_PURPLE_JEWEL: ItemId = 0x2A;
pub const ITEM_GOLA_EYE: ItemId = 0x2B;
pub const ITEM_DEATH_STATUE: ItemId = 0x2C;
pub const ITEM_DAHL: ItemId = 0x2D;
pub const ITEM_RESTORATION: ItemId = 0x2E;
pub const ITEM_LOGS: ItemId = 0x2F;
pub const ITEM_ORACLE_STONE: ItemId = 0x30;
pub const ITEM_IDOL_STONE: ItemId = 0x31;
pub const ITEM_KEY: ItemId = 0x32;
pub const ITEM_SAFETY_PASS: ItemId = 0x33;
pub const ITEM_BLUE_JEWEL: ItemId = 0x34;
pub const ITEM_BELL: ItemId = 0x35;
pub const ITEM_SHORT_CAKE: ItemId = 0x36;
pub const ITEM_GOLA_NAIL: ItemId = 0x37;
pub const ITEM_GOLA_HORN: ItemId = 0x38;
pub const ITEM_GOLA_FANG: ItemId = 0x39;
pub const ITEM_GREEN_JEWEL: ItemId = 0x3A;
pub const ITEM_YELLOW_JEWEL: ItemId = 0x3B;
pub const ITEM_LIFESTOCK: ItemId = 0x3C;
pub const ITEM_NONE: ItemId = 0x3F;

/// First id used for generated gold stacks. Every item from this id upward
/// is a gold reward whose worth is its gold value.
pub const ITEM_GOLDS_START: ItemId = 0x40;

/// Above this count, jewels are no longer distinct items but copies of a
/// single "Kazalt Jewel".
pub const MAX_INDIVIDUAL_JEWELS: u8 = 5;

pub const JEWELS: [ItemId; 5] = [
    ITEM_RED_JEWEL,
    ITEM_PURPLE_JEWEL,
    ITEM_GREEN_JEWEL,
    ITEM_BLUE_JEWEL,
    ITEM_YELLOW_JEWEL,
];

/// Pseudo-item name used in filler distributions to reserve gold slots.
pub const GOLDS_FILLER_NAME: &str = "Golds";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    #[serde(default)]
    pub starting_quantity: u8,
    #[serde(default = "default_max_quantity")]
    pub max_quantity: u8,
    #[serde(default)]
    pub gold_value: u16,
    #[serde(default = "default_allowed_on_ground")]
    pub allowed_on_ground: bool,
}

fn default_max_quantity() -> u8 {
    1
}

fn default_allowed_on_ground() -> bool {
    true
}

impl Item {
    pub fn gold_stack(id: ItemId, worth: u8) -> Self {
        Item {
            id,
            name: gold_item_name(worth),
            starting_quantity: 0,
            max_quantity: 0,
            gold_value: worth as u16,
            allowed_on_ground: false,
        }
    }

    pub fn is_gold_stack(&self) -> bool {
        self.id >= ITEM_GOLDS_START
    }
}

pub fn gold_item_name(worth: u8) -> String {
    format!("{} golds", worth)
}

/// Parses names shaped like "42 golds" back into a worth.
pub fn parse_gold_item_name(name: &str) -> Option<u8> {
    let number = name.strip_suffix("golds")?.trim();
    number.parse::<u8>().ok()
}

pub(crate) const DEFAULT_FILLER_ITEMS: &[(&str, u16)] = &[
    ("Life Stock", 80),
    ("EkeEke", 55),
    (GOLDS_FILLER_NAME, 30),
    ("Dahl", 16),
    ("Statue of Gaia", 12),
    ("Detox Grass", 11),
    ("Golden Statue", 10),
    ("Restoration", 10),
    ("Mind Repair", 7),
    ("Anti Paralyze", 7),
    ("No Item", 4),
    ("Pawn Ticket", 1),
    ("Short Cake", 1),
    ("Bell", 1),
    ("Blue Ribbon", 1),
    ("Death Statue", 1),
];

pub(crate) const DEFAULT_MANDATORY_ITEMS: &[(&str, u16)] = &[
    ("Magic Sword", 1),
    ("Thunder Sword", 1),
    ("Sword of Ice", 1),
    ("Sword of Gaia", 1),
    ("Steel Breast", 1),
    ("Chrome Breast", 1),
    ("Shell Breast", 1),
    ("Hyper Breast", 1),
    ("Healing Boots", 1),
    ("Iron Boots", 1),
    ("Fireproof", 1),
    ("Mars Stone", 1),
    ("Moon Stone", 1),
    ("Saturn Stone", 1),
    ("Venus Stone", 1),
    ("Oracle Stone", 1),
    ("Statue of Jypta", 1),
    ("Spell Book", 1),
    ("Lithograph", 1),
];

/// Items worth a "you will / won't need X" sign hint.
pub(crate) const HINTABLE_ITEM_REQUIREMENTS: &[ItemId] = &[
    ITEM_BUYER_CARD,
    ITEM_EINSTEIN_WHISTLE,
    ITEM_ARMLET,
    ITEM_GARLIC,
    ITEM_IDOL_STONE,
    ITEM_CASINO_TICKET,
    ITEM_LOGS,
];

/// Items worth a "you shall find X in Y" sign hint.
pub(crate) const HINTABLE_ITEM_LOCATIONS: &[ItemId] = &[
    ITEM_SPIKE_BOOTS,
    ITEM_AXE_MAGIC,
    ITEM_BUYER_CARD,
    ITEM_GARLIC,
    ITEM_EINSTEIN_WHISTLE,
    ITEM_ARMLET,
    ITEM_IDOL_STONE,
    ITEM_THUNDER_SWORD,
    ITEM_HEALING_BOOTS,
    ITEM_VENUS_STONE,
    ITEM_STATUE_JYPTA,
    ITEM_SUN_STONE,
    ITEM_KEY,
    ITEM_SAFETY_PASS,
    ITEM_LOGS,
    ITEM_GOLA_EYE,
    ITEM_GOLA_NAIL,
    ITEM_GOLA_FANG,
    ITEM_GOLA_HORN,
];

/// Gola items the fortune teller may talk about, with the way she names them.
pub(crate) const FORTUNE_TELLER_ITEMS: &[(ItemId, &str)] = &[
    (ITEM_GOLA_EYE, "an eye"),
    (ITEM_GOLA_NAIL, "a nail"),
    (ITEM_GOLA_FANG, "a fang"),
    (ITEM_GOLA_HORN, "a horn"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_gold_names() {
        assert_eq!(parse_gold_item_name("42 golds"), Some(42));
        assert_eq!(parse_gold_item_name(&gold_item_name(255)), Some(255));
        assert_eq!(parse_gold_item_name("300 golds"), None);
        assert_eq!(parse_gold_item_name("EkeEke"), None);
    }

    #[test]
    fn gold_stacks_stay_off_the_ground() {
        let gold = Item::gold_stack(ITEM_GOLDS_START + 3, 12);
        assert!(gold.is_gold_stack());
        assert!(!gold.allowed_on_ground);
        assert_eq!(gold.gold_value, 12);
        assert_eq!(gold.name, "12 golds");
    }
}
