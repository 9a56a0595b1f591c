use serde::{Deserialize, Deserializer, Serialize};

use crate::items::{Item, ItemId, ITEM_NONE};

pub type NodeIdx = usize;
pub type RegionIdx = usize;
pub type PathIdx = usize;
pub type SourceIdx = usize;
pub type HintIdx = usize;

#[derive(Debug, Clone)]
pub struct WorldNode {
    pub id: String,
    pub region: RegionIdx,
    pub hints: Vec<String>,
    pub item_sources: Vec<SourceIdx>,
    pub outgoing_paths: Vec<PathIdx>,
    pub ingoing_paths: Vec<PathIdx>,
}

#[derive(Debug, Clone)]
pub struct WorldRegion {
    pub id: String,
    pub name: String,
    pub nodes: Vec<NodeIdx>,
    pub dark_map_ids: Vec<u16>,
}

#[derive(Debug, Clone)]
pub struct WorldPath {
    pub origin: NodeIdx,
    pub destination: NodeIdx,
    pub weight: u16,
    /// May contain the same item several times when a quantity is needed.
    pub required_items: Vec<ItemId>,
    pub required_nodes: Vec<NodeIdx>,
    pub items_placed_when_crossing: Vec<ItemId>,
}

impl WorldPath {
    pub fn add_required_item(&mut self, item: ItemId) {
        self.required_items.push(item);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ItemSourceKind {
    Chest {
        #[serde(rename = "chestId")]
        chest_id: u8,
    },
    Ground {
        #[serde(rename = "address", deserialize_with = "one_or_many")]
        addresses: Vec<u32>,
        #[serde(rename = "cannotBeTakenRepeatedly", default)]
        cannot_be_taken_repeatedly: bool,
    },
    Shop {
        #[serde(rename = "address", deserialize_with = "one_or_many")]
        addresses: Vec<u32>,
    },
    Reward {
        address: u32,
    },
}

impl ItemSourceKind {
    pub fn is_shop(&self) -> bool {
        matches!(self, ItemSourceKind::Shop { .. })
    }

    /// Compatibility rules that only depend on the item itself. Shops have an
    /// extra rule involving their neighbours, see `World::is_item_compatible`.
    pub fn accepts(&self, item: &Item) -> bool {
        match self {
            ItemSourceKind::Chest { .. } => true,
            ItemSourceKind::Ground { .. } => item.allowed_on_ground,
            ItemSourceKind::Shop { .. } => item.allowed_on_ground && item.id != ITEM_NONE,
            ItemSourceKind::Reward { .. } => !item.is_gold_stack(),
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(u32),
        Many(Vec<u32>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(address) => vec![address],
        OneOrMany::Many(addresses) => addresses,
    })
}

#[derive(Debug, Clone)]
pub struct ItemSource {
    pub name: String,
    pub node: NodeIdx,
    pub hints: Vec<String>,
    pub kind: ItemSourceKind,
    pub item: Option<ItemId>,
}

#[derive(Debug, Clone)]
pub struct HintSource {
    pub description: String,
    pub text_ids: Vec<u16>,
    pub node: Option<NodeIdx>,
    /// Special sources get dedicated hints instead of the generic sign ones.
    pub special: bool,
    pub small_textbox: bool,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct SpawnLocation {
    pub id: String,
    pub node: NodeIdx,
    pub map_id: u16,
    pub starting_life: u8,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeleportTree {
    pub name: String,
    pub tree_map_id: u16,
}
