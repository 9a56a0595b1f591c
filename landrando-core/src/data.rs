use flate2::read::GzDecoder;
use log::info;
use serde::Deserialize;
use std::fs;
use std::io::Read;
use std::path::Path;

use crate::items::Item;
use crate::model::ItemSourceKind;
use crate::Result;

const BUNDLED_WORLD_JSON: &str = include_str!("../data/world.json");

/// Raw static world description, as read from JSON. Cross references are
/// still plain strings here; `World::from_data` resolves them.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldData {
    pub items: Vec<Item>,
    pub regions: Vec<RegionData>,
    pub nodes: Vec<NodeData>,
    #[serde(default)]
    pub paths: Vec<PathData>,
    #[serde(default)]
    pub item_sources: Vec<ItemSourceData>,
    #[serde(default)]
    pub spawn_locations: Vec<SpawnLocationData>,
    #[serde(default)]
    pub hint_sources: Vec<HintSourceData>,
    #[serde(default)]
    pub teleport_trees: Vec<TeleportTreeData>,
    #[serde(default = "default_end_node_id")]
    pub end_node_id: String,
}

fn default_end_node_id() -> String {
    "end".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionData {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub nodes: Vec<String>,
    #[serde(default)]
    pub dark_map_ids: Vec<u16>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    pub id: String,
    #[serde(default)]
    pub hints: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathData {
    pub from_id: String,
    pub to_id: String,
    #[serde(default)]
    pub two_way: bool,
    #[serde(default = "default_weight")]
    pub weight: u16,
    #[serde(default)]
    pub required_items: Vec<String>,
    #[serde(default)]
    pub required_nodes: Vec<String>,
    #[serde(default)]
    pub items_placed_when_crossing: Vec<String>,
}

fn default_weight() -> u16 {
    1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSourceData {
    pub name: String,
    pub node_id: String,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(flatten)]
    pub kind: ItemSourceKind,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnLocationData {
    pub id: String,
    pub node_id: String,
    #[serde(default)]
    pub map_id: u16,
    #[serde(default)]
    pub starting_life: u8,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HintSourceData {
    pub description: String,
    #[serde(default)]
    pub text_ids: Vec<u16>,
    #[serde(default)]
    pub node_id: Option<String>,
    #[serde(default)]
    pub special: bool,
    #[serde(default)]
    pub small_textbox: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeleportTreeData {
    pub name: String,
    pub tree_map_id: u16,
}

impl WorldData {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The world model shipped with the library.
    pub fn bundled() -> Result<Self> {
        Self::from_json_str(BUNDLED_WORLD_JSON)
    }

    /// Loads a world model from disk. Files ending in `.gz` are gunzipped
    /// first.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path)?;
        let is_gzipped = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("gz"))
            .unwrap_or(false);

        let json = if is_gzipped {
            let mut decoder = GzDecoder::new(raw.as_slice());
            let mut text = String::new();
            decoder.read_to_string(&mut text)?;
            text
        } else {
            String::from_utf8_lossy(&raw).into_owned()
        };

        let data = Self::from_json_str(&json)?;
        info!(
            "Read world model from {} ({} items, {} nodes, {} item sources)",
            path.display(),
            data.items.len(),
            data.nodes.len(),
            data.item_sources.len()
        );
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{write::GzEncoder, Compression};
    use std::io::Write;

    #[test]
    fn bundled_world_parses() {
        let data = WorldData::bundled().unwrap();
        assert!(!data.items.is_empty());
        assert!(!data.item_sources.is_empty());
        assert_eq!(data.end_node_id, "end");
        assert!(data.spawn_locations.len() >= 3);
    }

    #[test]
    fn item_source_kinds_are_flattened() {
        let json = r#"{"name":"Shop slot","nodeId":"gumi","type":"shop","address":[10,20]}"#;
        let source: ItemSourceData = serde_json::from_str(json).unwrap();
        assert_eq!(source.node_id, "gumi");
        assert_eq!(
            source.kind,
            ItemSourceKind::Shop {
                addresses: vec![10, 20]
            }
        );
    }

    #[test]
    fn loads_gzipped_world_files() {
        let dir = std::env::temp_dir().join(format!("landrando-data-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("world.json.gz");

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(BUNDLED_WORLD_JSON.as_bytes()).unwrap();
        fs::write(&path, encoder.finish().unwrap()).unwrap();

        let data = WorldData::load(&path).unwrap();
        assert_eq!(data.items.len(), WorldData::bundled().unwrap().items.len());

        let _ = fs::remove_dir_all(&dir);
    }
}
