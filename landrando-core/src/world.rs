use log::{debug, info};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::data::WorldData;
use crate::items::{
    parse_gold_item_name, Item, ItemId, ITEM_AXE_MAGIC, ITEM_CHROME_BREAST, ITEM_GOLDS_START,
    ITEM_HYPER_BREAST, ITEM_LANTERN, ITEM_RECORD_BOOK, ITEM_RED_JEWEL, ITEM_SHELL_BREAST,
    ITEM_STEEL_BREAST, JEWELS, MAX_INDIVIDUAL_JEWELS,
};
use crate::model::{
    HintIdx, HintSource, ItemSource, ItemSourceKind, NodeIdx, PathIdx, RegionIdx, SourceIdx,
    SpawnLocation, TeleportTree, WorldNode, WorldPath, WorldRegion,
};
use crate::options::RandomizerOptions;
use crate::solver::WorldSolver;
use crate::{RandomizerError, Result};

const ARMOR_UPGRADE_PRICE: u16 = 250;
const MAX_STARTING_QUANTITY: u8 = 9;
const DARK_REGION_HINT: &str = "in a very dark place";

/// Nodes on both sides of the gate that asks for the jewels.
const JEWEL_GATE: (&str, &str) = ("king_nole_cave", "kazalt");
const GHOST_JUMP: (&str, &str) = ("route_lake_shrine", "mountainous_area");

/// The randomizer's logical model of the game. Owns every entity; everything
/// else refers to them by index.
#[derive(Debug, Clone)]
pub struct World {
    items: BTreeMap<ItemId, Item>,
    nodes: Vec<WorldNode>,
    regions: Vec<WorldRegion>,
    paths: Vec<WorldPath>,
    item_sources: Vec<ItemSource>,
    hint_sources: Vec<HintSource>,
    spawn_locations: Vec<SpawnLocation>,
    teleport_trees: Vec<TeleportTree>,

    node_index: HashMap<String, NodeIdx>,
    region_index: HashMap<String, RegionIdx>,
    path_index: HashMap<(NodeIdx, NodeIdx), PathIdx>,
    source_index: HashMap<String, SourceIdx>,

    end_node: NodeIdx,
    active_spawn_location: Option<usize>,
    dark_region: Option<RegionIdx>,
}

fn world_data_error(msg: String) -> RandomizerError {
    RandomizerError::WorldData(msg)
}

impl World {
    pub fn from_data(data: WorldData) -> Result<World> {
        let mut items: BTreeMap<ItemId, Item> = BTreeMap::new();
        let mut item_names: HashMap<String, ItemId> = HashMap::new();
        for item in data.items {
            if items.contains_key(&item.id) {
                return Err(world_data_error(format!(
                    "item id {} is defined more than once",
                    item.id
                )));
            }
            if item_names.insert(item.name.clone(), item.id).is_some() {
                return Err(world_data_error(format!(
                    "item name '{}' is defined more than once",
                    item.name
                )));
            }
            items.insert(item.id, item);
        }

        let mut nodes = Vec::with_capacity(data.nodes.len());
        let mut node_index = HashMap::new();
        for node_data in data.nodes {
            if node_index.contains_key(&node_data.id) {
                return Err(world_data_error(format!(
                    "node '{}' is defined more than once",
                    node_data.id
                )));
            }
            node_index.insert(node_data.id.clone(), nodes.len());
            nodes.push(WorldNode {
                id: node_data.id,
                region: usize::MAX,
                hints: node_data.hints,
                item_sources: Vec::new(),
                outgoing_paths: Vec::new(),
                ingoing_paths: Vec::new(),
            });
        }

        let lookup_node = |node_index: &HashMap<String, NodeIdx>, id: &str, context: &str| {
            node_index.get(id).copied().ok_or_else(|| {
                world_data_error(format!("could not find node '{}' referenced by {}", id, context))
            })
        };
        let lookup_item = |name: &str, context: &str| {
            item_names.get(name).copied().ok_or_else(|| {
                world_data_error(format!("could not find item '{}' referenced by {}", name, context))
            })
        };

        let mut regions = Vec::with_capacity(data.regions.len());
        let mut region_index = HashMap::new();
        for region_data in data.regions {
            let region_idx = regions.len();
            if region_index.insert(region_data.id.clone(), region_idx).is_some() {
                return Err(world_data_error(format!(
                    "region '{}' is defined more than once",
                    region_data.id
                )));
            }

            let context = format!("region '{}'", region_data.id);
            let mut region_nodes = Vec::with_capacity(region_data.nodes.len());
            for node_id in &region_data.nodes {
                let node_idx = lookup_node(&node_index, node_id, &context)?;
                if nodes[node_idx].region != usize::MAX {
                    return Err(world_data_error(format!(
                        "node '{}' belongs to several regions",
                        node_id
                    )));
                }
                nodes[node_idx].region = region_idx;
                region_nodes.push(node_idx);
            }

            regions.push(WorldRegion {
                name: region_data.name.unwrap_or_else(|| region_data.id.clone()),
                id: region_data.id,
                nodes: region_nodes,
                dark_map_ids: region_data.dark_map_ids,
            });
        }

        if let Some(orphan) = nodes.iter().find(|node| node.region == usize::MAX) {
            return Err(world_data_error(format!(
                "node '{}' doesn't belong to any region",
                orphan.id
            )));
        }

        let mut paths: Vec<WorldPath> = Vec::with_capacity(data.paths.len() * 2);
        let mut path_index = HashMap::new();
        for path_data in data.paths {
            let context = format!("path {} -> {}", path_data.from_id, path_data.to_id);
            let origin = lookup_node(&node_index, &path_data.from_id, &context)?;
            let destination = lookup_node(&node_index, &path_data.to_id, &context)?;
            let required_items = path_data
                .required_items
                .iter()
                .map(|name| lookup_item(name, &context))
                .collect::<Result<Vec<_>>>()?;
            let required_nodes = path_data
                .required_nodes
                .iter()
                .map(|id| lookup_node(&node_index, id, &context))
                .collect::<Result<Vec<_>>>()?;
            let items_placed_when_crossing = path_data
                .items_placed_when_crossing
                .iter()
                .map(|name| lookup_item(name, &context))
                .collect::<Result<Vec<_>>>()?;

            let mut endpoints = vec![(origin, destination)];
            if path_data.two_way {
                endpoints.push((destination, origin));
            }

            for (from, to) in endpoints {
                if path_index.insert((from, to), paths.len()).is_some() {
                    return Err(world_data_error(format!(
                        "path {} -> {} is defined more than once",
                        nodes[from].id, nodes[to].id
                    )));
                }
                nodes[from].outgoing_paths.push(paths.len());
                nodes[to].ingoing_paths.push(paths.len());
                paths.push(WorldPath {
                    origin: from,
                    destination: to,
                    weight: path_data.weight.max(1),
                    required_items: required_items.clone(),
                    required_nodes: required_nodes.clone(),
                    items_placed_when_crossing: items_placed_when_crossing.clone(),
                });
            }
        }

        let mut item_sources = Vec::with_capacity(data.item_sources.len());
        let mut source_index = HashMap::new();
        for source_data in data.item_sources {
            let context = format!("item source '{}'", source_data.name);
            let node = lookup_node(&node_index, &source_data.node_id, &context)?;
            if source_index
                .insert(source_data.name.clone(), item_sources.len())
                .is_some()
            {
                return Err(world_data_error(format!(
                    "item source '{}' is defined more than once",
                    source_data.name
                )));
            }
            nodes[node].item_sources.push(item_sources.len());
            item_sources.push(ItemSource {
                name: source_data.name,
                node,
                hints: source_data.hints,
                kind: source_data.kind,
                item: None,
            });
        }

        let mut spawn_locations = Vec::with_capacity(data.spawn_locations.len());
        for spawn_data in data.spawn_locations {
            let context = format!("spawn location '{}'", spawn_data.id);
            spawn_locations.push(SpawnLocation {
                node: lookup_node(&node_index, &spawn_data.node_id, &context)?,
                id: spawn_data.id,
                map_id: spawn_data.map_id,
                starting_life: spawn_data.starting_life,
            });
        }

        let mut hint_sources = Vec::with_capacity(data.hint_sources.len());
        for hint_data in data.hint_sources {
            let context = format!("hint source '{}'", hint_data.description);
            let node = match &hint_data.node_id {
                Some(node_id) => Some(lookup_node(&node_index, node_id, &context)?),
                None => None,
            };
            if !hint_data.special && node.is_none() {
                return Err(world_data_error(format!(
                    "hint source '{}' is neither special nor bound to a node",
                    hint_data.description
                )));
            }
            hint_sources.push(HintSource {
                description: hint_data.description,
                text_ids: hint_data.text_ids,
                node,
                special: hint_data.special,
                small_textbox: hint_data.small_textbox,
                text: String::new(),
            });
        }

        let teleport_trees = data
            .teleport_trees
            .into_iter()
            .map(|tree| TeleportTree {
                name: tree.name,
                tree_map_id: tree.tree_map_id,
            })
            .collect::<Vec<_>>();

        let end_node = lookup_node(&node_index, &data.end_node_id, "the end node")?;

        info!(
            "{} items, {} regions, {} nodes, {} paths, {} item sources loaded.",
            items.len(),
            regions.len(),
            nodes.len(),
            paths.len(),
            item_sources.len()
        );
        debug!(
            "{} spawn locations, {} hint sources, {} teleport trees loaded.",
            spawn_locations.len(),
            hint_sources.len(),
            teleport_trees.len()
        );

        Ok(World {
            items,
            nodes,
            regions,
            paths,
            item_sources,
            hint_sources,
            spawn_locations,
            teleport_trees,
            node_index,
            region_index,
            path_index,
            source_index,
            end_node,
            active_spawn_location: None,
            dark_region: None,
        })
    }

    // Lookups

    pub fn items(&self) -> &BTreeMap<ItemId, Item> {
        &self.items
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn item_name(&self, id: ItemId) -> String {
        self.items
            .get(&id)
            .map(|item| item.name.clone())
            .unwrap_or_else(|| format!("Item {:#04X}", id))
    }

    pub fn item_by_name(&self, name: &str) -> Option<&Item> {
        if name.is_empty() {
            return None;
        }
        self.items.values().find(|item| item.name == name)
    }

    pub fn nodes(&self) -> &[WorldNode] {
        &self.nodes
    }

    pub fn node(&self, idx: NodeIdx) -> &WorldNode {
        &self.nodes[idx]
    }

    pub fn node_idx(&self, id: &str) -> Option<NodeIdx> {
        self.node_index.get(id).copied()
    }

    pub fn regions(&self) -> &[WorldRegion] {
        &self.regions
    }

    pub fn region(&self, idx: RegionIdx) -> &WorldRegion {
        &self.regions[idx]
    }

    pub fn region_idx(&self, id: &str) -> Option<RegionIdx> {
        self.region_index.get(id).copied()
    }

    pub fn paths(&self) -> &[WorldPath] {
        &self.paths
    }

    pub fn path(&self, idx: PathIdx) -> &WorldPath {
        &self.paths[idx]
    }

    pub fn path_between(&self, origin: NodeIdx, destination: NodeIdx) -> Option<PathIdx> {
        self.path_index.get(&(origin, destination)).copied()
    }

    pub fn item_sources(&self) -> &[ItemSource] {
        &self.item_sources
    }

    pub fn item_source(&self, idx: SourceIdx) -> &ItemSource {
        &self.item_sources[idx]
    }

    pub fn item_source_idx(&self, name: &str) -> Option<SourceIdx> {
        self.source_index.get(name).copied()
    }

    pub fn item_source_region(&self, idx: SourceIdx) -> RegionIdx {
        self.nodes[self.item_sources[idx].node].region
    }

    pub fn item_sources_with_item(&self, item: ItemId) -> Vec<SourceIdx> {
        self.item_sources
            .iter()
            .enumerate()
            .filter(|(_, source)| source.item == Some(item))
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn hint_sources(&self) -> &[HintSource] {
        &self.hint_sources
    }

    pub fn hint_source_idx(&self, description: &str) -> Option<HintIdx> {
        self.hint_sources
            .iter()
            .position(|source| source.description == description)
    }

    pub fn set_hint_text(&mut self, idx: HintIdx, text: String) {
        self.hint_sources[idx].text = text;
    }

    pub fn spawn_locations(&self) -> &[SpawnLocation] {
        &self.spawn_locations
    }

    pub fn teleport_trees(&self) -> &[TeleportTree] {
        &self.teleport_trees
    }

    pub fn set_teleport_tree_map_ids(&mut self, map_ids: &[u16]) {
        for (tree, map_id) in self.teleport_trees.iter_mut().zip(map_ids) {
            tree.tree_map_id = *map_id;
        }
    }

    pub fn end_node(&self) -> NodeIdx {
        self.end_node
    }

    pub fn active_spawn_location(&self) -> Option<&SpawnLocation> {
        self.active_spawn_location
            .map(|idx| &self.spawn_locations[idx])
    }

    pub fn set_active_spawn_location(&mut self, id: &str) -> Result<()> {
        let idx = self
            .spawn_locations
            .iter()
            .position(|spawn| spawn.id == id)
            .ok_or_else(|| {
                RandomizerError::Config(format!("unknown spawn location '{}'", id))
            })?;
        self.active_spawn_location = Some(idx);
        Ok(())
    }

    pub(crate) fn spawn_node(&self) -> Result<NodeIdx> {
        self.active_spawn_location()
            .map(|spawn| spawn.node)
            .ok_or_else(|| RandomizerError::Config("no spawn location was chosen".to_string()))
    }

    pub fn dark_region(&self) -> Option<RegionIdx> {
        self.dark_region
    }

    // Mutations happening before or during randomization

    /// Darkens a region: entering it from outside now requires the lantern.
    pub fn set_dark_region(&mut self, region_idx: RegionIdx) -> Result<()> {
        let entering_paths: Vec<PathIdx> = self.regions[region_idx]
            .nodes
            .iter()
            .flat_map(|&node| self.nodes[node].ingoing_paths.iter().copied())
            .filter(|&path| self.nodes[self.paths[path].origin].region != region_idx)
            .collect();

        if !entering_paths.is_empty() && !self.items.contains_key(&ITEM_LANTERN) {
            return Err(RandomizerError::Config(format!(
                "region '{}' cannot be darkened without a lantern item",
                self.regions[region_idx].id
            )));
        }

        for path in entering_paths {
            self.paths[path].add_required_item(ITEM_LANTERN);
        }
        for &node in &self.regions[region_idx].nodes {
            self.nodes[node].hints.push(DARK_REGION_HINT.to_string());
        }

        self.dark_region = Some(region_idx);
        Ok(())
    }

    /// Returns the gold item worth `worth`, creating it if needed. `None` when
    /// every item id is already used.
    pub fn add_gold_item(&mut self, worth: u8) -> Option<ItemId> {
        if let Some(existing) = self
            .items
            .range(ITEM_GOLDS_START..)
            .find(|(_, item)| item.gold_value == worth as u16)
        {
            return Some(*existing.0);
        }

        let next_id = match self.items.keys().next_back() {
            Some(&highest) if highest >= ITEM_GOLDS_START => highest.checked_add(1)?,
            _ => ITEM_GOLDS_START,
        };
        self.items.insert(next_id, Item::gold_stack(next_id, worth));
        Some(next_id)
    }

    /// (item id, worth) for every gold stack, in id order.
    pub fn gold_values(&self) -> Vec<(ItemId, u8)> {
        self.items
            .range(ITEM_GOLDS_START..)
            .map(|(&id, item)| (id, item.gold_value.min(255) as u8))
            .collect()
    }

    pub fn is_item_compatible(&self, source_idx: SourceIdx, item_id: ItemId) -> bool {
        let Some(item) = self.items.get(&item_id) else {
            return false;
        };
        let source = &self.item_sources[source_idx];
        if !source.kind.accepts(item) {
            return false;
        }

        // Two shop slots of the same shop cannot sell the same item
        if source.kind.is_shop() {
            let neighbours = &self.nodes[source.node].item_sources;
            for &other in neighbours {
                let other = &self.item_sources[other];
                if other.kind.is_shop() && other.item == Some(item_id) {
                    return false;
                }
            }
        }

        true
    }

    /// Fills an empty source. Filling an already filled source is a bug in the
    /// caller.
    pub fn place_item(&mut self, source_idx: SourceIdx, item: ItemId) {
        let source = &mut self.item_sources[source_idx];
        assert!(
            source.item.is_none(),
            "item source '{}' was filled twice",
            source.name
        );
        source.item = Some(item);
    }

    /// Applies option-driven item patches and the jewel requirements. Must run
    /// once, before randomization.
    pub fn apply_options(&mut self, options: &RandomizerOptions) -> Result<()> {
        let game = &options.game_settings;

        if game.armor_upgrades {
            for id in [
                ITEM_STEEL_BREAST,
                ITEM_CHROME_BREAST,
                ITEM_SHELL_BREAST,
                ITEM_HYPER_BREAST,
            ] {
                if let Some(item) = self.items.get_mut(&id) {
                    item.gold_value = ARMOR_UPGRADE_PRICE;
                }
            }
        }

        if game.consumable_record_book {
            if let Some(item) = self.items.get_mut(&ITEM_RECORD_BOOK) {
                item.max_quantity = 9;
                item.gold_value /= 5;
            }
        }

        for (name, quantity) in &game.starting_items {
            let item = self.item_by_name_mut(name).ok_or_else(|| {
                RandomizerError::Config(format!(
                    "cannot set starting quantity of unknown item '{}'",
                    name
                ))
            })?;
            item.starting_quantity = (*quantity).min(MAX_STARTING_QUANTITY);
        }

        for (name, price) in &game.item_prices {
            let item = self.item_by_name_mut(name).ok_or_else(|| {
                RandomizerError::Config(format!("cannot set price of unknown item '{}'", name))
            })?;
            item.gold_value = *price;
        }

        for (name, max_quantity) in &game.item_max_quantities {
            let item = self.item_by_name_mut(name).ok_or_else(|| {
                RandomizerError::Config(format!(
                    "cannot set max quantity of unknown item '{}'",
                    name
                ))
            })?;
            item.max_quantity = *max_quantity;
        }

        self.apply_jewel_count(game.jewel_count)?;

        if options.randomizer_settings.ghost_jumping_in_logic {
            self.add_ghost_jump_path()?;
        }
        Ok(())
    }

    fn add_ghost_jump_path(&mut self) -> Result<()> {
        let (Some(origin), Some(destination)) =
            (self.node_idx(GHOST_JUMP.0), self.node_idx(GHOST_JUMP.1))
        else {
            debug!("No ghost jump nodes in this world, option ignored.");
            return Ok(());
        };
        self.add_path(WorldPath {
            origin,
            destination,
            weight: 1,
            required_items: vec![ITEM_AXE_MAGIC],
            required_nodes: Vec::new(),
            items_placed_when_crossing: Vec::new(),
        })?;
        Ok(())
    }

    /// Adds a directed path after loading. Fails if the node pair is already
    /// linked in that direction.
    pub fn add_path(&mut self, path: WorldPath) -> Result<PathIdx> {
        let idx = self.paths.len();
        let key = (path.origin, path.destination);
        if self.path_index.contains_key(&key) {
            return Err(RandomizerError::Config(format!(
                "path {} -> {} already exists",
                self.nodes[path.origin].id, self.nodes[path.destination].id
            )));
        }
        self.path_index.insert(key, idx);
        self.nodes[path.origin].outgoing_paths.push(idx);
        self.nodes[path.destination].ingoing_paths.push(idx);
        self.paths.push(path);
        Ok(idx)
    }

    fn apply_jewel_count(&mut self, jewel_count: u8) -> Result<()> {
        let gate = match (self.node_idx(JEWEL_GATE.0), self.node_idx(JEWEL_GATE.1)) {
            (Some(from), Some(to)) => self.path_between(from, to),
            _ => None,
        };
        let Some(gate) = gate else {
            return Ok(());
        };

        let required: Vec<ItemId> = if jewel_count > MAX_INDIVIDUAL_JEWELS {
            let jewel = self.items.get_mut(&ITEM_RED_JEWEL).ok_or_else(|| {
                RandomizerError::Config("the world has no jewel item".to_string())
            })?;
            jewel.name = "Kazalt Jewel".to_string();
            jewel.allowed_on_ground = false;
            jewel.max_quantity = jewel_count;
            vec![ITEM_RED_JEWEL; jewel_count as usize]
        } else {
            JEWELS[..jewel_count as usize].to_vec()
        };

        for jewel in required {
            if !self.items.contains_key(&jewel) {
                return Err(RandomizerError::Config(format!(
                    "the world has no jewel item with id {:#04X}",
                    jewel
                )));
            }
            self.paths[gate].add_required_item(jewel);
        }
        Ok(())
    }

    fn item_by_name_mut(&mut self, name: &str) -> Option<&mut Item> {
        self.items.values_mut().find(|item| item.name == name)
    }

    /// Resolves an item name, creating the gold stack for names like
    /// "25 golds".
    pub fn parse_item_from_name(&mut self, name: &str) -> Option<ItemId> {
        if let Some(item) = self.item_by_name(name) {
            return Some(item.id);
        }
        let worth = parse_gold_item_name(name)?;
        self.add_gold_item(worth)
    }

    /// Pre-fills item sources from a plando document shaped like
    /// `{"itemSources": {"<source name>": "<item name>"}}`. Sources not listed
    /// stay empty and are randomized as usual.
    pub fn apply_plando(&mut self, plando: &Value) -> Result<()> {
        let Some(sources) = plando.get("itemSources") else {
            return Ok(());
        };
        let sources = sources.as_object().ok_or_else(|| {
            RandomizerError::Config("'itemSources' must be an object in plando JSON".to_string())
        })?;

        for (source_name, item_value) in sources {
            let source_idx = self.item_source_idx(source_name).ok_or_else(|| {
                RandomizerError::Config(format!(
                    "item source '{}' is invalid in plando JSON",
                    source_name
                ))
            })?;
            let item_name = item_value.as_str().unwrap_or_default();
            let item = self.parse_item_from_name(item_name).ok_or_else(|| {
                RandomizerError::Config(format!(
                    "item name '{}' is invalid in plando JSON",
                    item_name
                ))
            })?;
            self.place_item(source_idx, item);
        }

        info!("{} item sources pre-filled from plando.", sources.len());
        Ok(())
    }

    // Logic queries

    pub fn starting_inventory(&self) -> Vec<ItemId> {
        let mut inventory = Vec::new();
        for (&id, item) in &self.items {
            for _ in 0..item.starting_quantity {
                inventory.push(id);
            }
        }
        inventory
    }

    pub fn minimal_inventory_to_complete(&self) -> Result<Vec<ItemId>> {
        self.minimal_inventory_to_reach(self.end_node)
    }

    pub fn minimal_inventory_to_reach(&self, node: NodeIdx) -> Result<Vec<ItemId>> {
        let mut solver = WorldSolver::new(self, self.spawn_node()?, node);
        solver.find_minimal_inventory()
    }

    /// True when the end can be reached without taking any item inside the
    /// region.
    pub fn is_region_avoidable(&self, region: RegionIdx) -> Result<bool> {
        let mut solver = WorldSolver::new(self, self.spawn_node()?, self.end_node);
        solver.forbid_taking_items_from_regions([region]);
        Ok(solver.try_to_solve())
    }

    pub fn is_item_avoidable(&self, item: ItemId) -> Result<bool> {
        let mut solver = WorldSolver::new(self, self.spawn_node()?, self.end_node);
        solver.forbid_item_types([item]);
        Ok(solver.try_to_solve())
    }

    // Export

    /// Everything the ROM patch writer needs from the finished world.
    pub fn export(&self) -> ExportedWorld {
        let mut item_sources: BTreeMap<String, BTreeMap<String, ExportedItemSource>> =
            BTreeMap::new();
        for source in &self.item_sources {
            let region = &self.regions[self.nodes[source.node].region];
            item_sources.entry(region.name.clone()).or_default().insert(
                source.name.clone(),
                ExportedItemSource {
                    item: source.item.map(|id| self.item_name(id)),
                    item_id: source.item,
                    kind: source.kind.clone(),
                },
            );
        }

        let hints = self
            .hint_sources
            .iter()
            .map(|source| {
                (
                    source.description.clone(),
                    ExportedHint {
                        text_ids: source.text_ids.clone(),
                        small_textbox: source.small_textbox,
                        text: source.text.clone(),
                    },
                )
            })
            .collect();

        let dark_region = self.dark_region.map(|idx| ExportedDarkRegion {
            name: self.regions[idx].name.clone(),
            map_ids: self.regions[idx].dark_map_ids.clone(),
        });

        let items = self
            .items
            .values()
            .filter(|item| !item.is_gold_stack())
            .cloned()
            .collect();

        ExportedWorld {
            spawn_location: self.active_spawn_location().map(|spawn| spawn.id.clone()),
            spawn_map_id: self.active_spawn_location().map(|spawn| spawn.map_id),
            starting_life: self.active_spawn_location().map(|spawn| spawn.starting_life),
            dark_region,
            gold_values: self.gold_values().into_iter().map(|(_, worth)| worth).collect(),
            teleport_trees: self.teleport_trees.clone(),
            hints,
            item_sources,
            items,
        }
    }

    /// Nodes `start` cannot lead to, even with every requirement met.
    pub fn unreachable_nodes_from(&self, start: NodeIdx) -> Vec<NodeIdx> {
        let mut seen = HashSet::from([start]);
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            for &path in &self.nodes[node].outgoing_paths {
                let destination = self.paths[path].destination;
                if seen.insert(destination) {
                    stack.push(destination);
                }
            }
        }
        (0..self.nodes.len()).filter(|n| !seen.contains(n)).collect()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedWorld {
    pub spawn_location: Option<String>,
    pub spawn_map_id: Option<u16>,
    pub starting_life: Option<u8>,
    pub dark_region: Option<ExportedDarkRegion>,
    pub gold_values: Vec<u8>,
    pub teleport_trees: Vec<TeleportTree>,
    pub hints: BTreeMap<String, ExportedHint>,
    pub item_sources: BTreeMap<String, BTreeMap<String, ExportedItemSource>>,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedDarkRegion {
    pub name: String,
    pub map_ids: Vec<u16>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedHint {
    pub text_ids: Vec<u16>,
    pub small_textbox: bool,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedItemSource {
    pub item: Option<String>,
    pub item_id: Option<ItemId>,
    #[serde(flatten)]
    pub kind: ItemSourceKind,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::{ITEM_EKEEKE, ITEM_KEY};
    use serde_json::json;

    fn bundled_world() -> World {
        World::from_data(WorldData::bundled().unwrap()).unwrap()
    }

    fn small_world(value: Value) -> Result<World> {
        World::from_data(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn bundled_world_is_consistent() {
        let world = bundled_world();
        let end = world.end_node();
        assert_eq!(world.node(end).id, "end");

        for spawn in world.spawn_locations() {
            // Everything is reachable once every gate is open
            assert!(world.unreachable_nodes_from(spawn.node).is_empty());
        }
        for (idx, node) in world.nodes().iter().enumerate() {
            assert!(world.region(node.region).nodes.contains(&idx));
        }
    }

    #[test]
    fn two_way_paths_become_two_directed_paths() {
        let world = bundled_world();
        let massan = world.node_idx("massan").unwrap();
        let cave = world.node_idx("massan_cave").unwrap();
        let there = world.path_between(massan, cave).unwrap();
        let back = world.path_between(cave, massan).unwrap();
        assert_ne!(there, back);
        assert_eq!(world.path(there).required_items, world.path(back).required_items);

        let palace = world.node_idx("king_nole_palace").unwrap();
        assert!(world.path_between(palace, world.end_node()).is_some());
        assert!(world.path_between(world.end_node(), palace).is_none());
    }

    #[test]
    fn structural_errors_are_rejected() {
        let orphan = small_world(json!({
            "items": [], "regions": [{ "id": "r", "nodes": ["end"] }],
            "nodes": [{ "id": "end" }, { "id": "lost" }]
        }));
        assert!(matches!(orphan, Err(RandomizerError::WorldData(_))));

        let twice = small_world(json!({
            "items": [],
            "regions": [{ "id": "a", "nodes": ["end"] }, { "id": "b", "nodes": ["end"] }],
            "nodes": [{ "id": "end" }]
        }));
        assert!(matches!(twice, Err(RandomizerError::WorldData(_))));

        let dangling = small_world(json!({
            "items": [], "regions": [{ "id": "r", "nodes": ["end"] }],
            "nodes": [{ "id": "end" }],
            "paths": [{ "fromId": "end", "toId": "nowhere" }]
        }));
        assert!(matches!(dangling, Err(RandomizerError::WorldData(_))));

        let no_end = small_world(json!({
            "items": [], "regions": [{ "id": "r", "nodes": ["start"] }],
            "nodes": [{ "id": "start" }]
        }));
        assert!(matches!(no_end, Err(RandomizerError::WorldData(_))));

        let duplicate_item = small_world(json!({
            "items": [{ "id": 1, "name": "A" }, { "id": 1, "name": "B" }],
            "regions": [{ "id": "r", "nodes": ["end"] }],
            "nodes": [{ "id": "end" }]
        }));
        assert!(matches!(duplicate_item, Err(RandomizerError::WorldData(_))));
    }

    #[test]
    fn options_patch_items_and_jewel_gate() {
        let mut world = bundled_world();
        let mut options = RandomizerOptions::default();
        options.game_settings.jewel_count = 7;
        options.game_settings.consumable_record_book = true;
        options
            .game_settings
            .starting_items
            .insert("EkeEke".to_string(), 12);
        world.apply_options(&options).unwrap();

        assert_eq!(world.item(ITEM_STEEL_BREAST).unwrap().gold_value, ARMOR_UPGRADE_PRICE);
        assert_eq!(world.item(ITEM_HYPER_BREAST).unwrap().gold_value, ARMOR_UPGRADE_PRICE);
        assert_eq!(world.item(ITEM_RECORD_BOOK).unwrap().max_quantity, 9);
        assert_eq!(world.item(ITEM_EKEEKE).unwrap().starting_quantity, 9);

        let jewel = world.item(ITEM_RED_JEWEL).unwrap();
        assert_eq!(jewel.name, "Kazalt Jewel");
        assert!(!jewel.allowed_on_ground);
        assert_eq!(jewel.max_quantity, 7);

        let gate = world
            .path_between(world.node_idx("king_nole_cave").unwrap(), world.node_idx("kazalt").unwrap())
            .unwrap();
        assert_eq!(world.path(gate).required_items, vec![ITEM_RED_JEWEL; 7]);
    }

    #[test]
    fn few_jewels_are_all_different() {
        let mut world = bundled_world();
        let mut options = RandomizerOptions::default();
        options.game_settings.jewel_count = 3;
        options.game_settings.item_prices.insert("Lantern".to_string(), 5);
        world.apply_options(&options).unwrap();

        let gate = world
            .path_between(world.node_idx("king_nole_cave").unwrap(), world.node_idx("kazalt").unwrap())
            .unwrap();
        assert_eq!(world.path(gate).required_items, JEWELS[..3].to_vec());
        assert_eq!(world.item(ITEM_LANTERN).unwrap().gold_value, 5);
    }

    #[test]
    fn ghost_jumping_adds_the_axe_magic_shortcut() {
        let route = |world: &World| {
            world.path_between(
                world.node_idx("route_lake_shrine").unwrap(),
                world.node_idx("mountainous_area").unwrap(),
            )
        };

        let mut world = bundled_world();
        world.apply_options(&RandomizerOptions::default()).unwrap();
        assert!(route(&world).is_none());

        let mut options = RandomizerOptions::default();
        options.randomizer_settings.ghost_jumping_in_logic = true;
        let mut world = bundled_world();
        world.apply_options(&options).unwrap();
        let shortcut = route(&world).unwrap();
        assert_eq!(world.path(shortcut).required_items, vec![ITEM_AXE_MAGIC]);
        assert!(world
            .node(world.node_idx("route_lake_shrine").unwrap())
            .outgoing_paths
            .contains(&shortcut));

        // The pair is linked now, a second pass cannot add it again
        assert!(matches!(world.apply_options(&options), Err(RandomizerError::Config(_))));
    }

    #[test]
    fn solver_takes_the_ghost_jump_when_allowed() {
        let small = || {
            small_world(json!({
                "items": [{ "id": ITEM_AXE_MAGIC, "name": "Axe Magic" }],
                "regions": [{ "id": "all", "nodes": ["route_lake_shrine", "mountainous_area", "end"] }],
                "nodes": [{ "id": "route_lake_shrine" }, { "id": "mountainous_area" }, { "id": "end" }],
                "paths": [{ "fromId": "mountainous_area", "toId": "end" }],
                "itemSources": [
                    { "name": "Shrine chest", "nodeId": "route_lake_shrine", "type": "chest", "chestId": 0 }
                ]
            }))
            .unwrap()
        };
        let solvable = |world: &World| {
            let start = world.node_idx("route_lake_shrine").unwrap();
            WorldSolver::new(world, start, world.end_node()).try_to_solve()
        };

        let mut options = RandomizerOptions::default();
        options.game_settings.jewel_count = 0;

        let mut world = small();
        world.place_item(world.item_source_idx("Shrine chest").unwrap(), ITEM_AXE_MAGIC);
        world.apply_options(&options).unwrap();
        assert!(!solvable(&world));

        options.randomizer_settings.ghost_jumping_in_logic = true;
        let mut world = small();
        world.apply_options(&options).unwrap();
        assert!(!solvable(&world), "the jump needs Axe Magic");

        world.place_item(world.item_source_idx("Shrine chest").unwrap(), ITEM_AXE_MAGIC);
        assert!(solvable(&world));
    }

    #[test]
    fn unknown_item_in_options_is_a_configuration_error() {
        let mut world = bundled_world();
        let mut options = RandomizerOptions::default();
        options.game_settings.item_prices.insert("Excalibur".to_string(), 5);
        assert!(matches!(world.apply_options(&options), Err(RandomizerError::Config(_))));
    }

    #[test]
    fn dark_region_requires_the_lantern_from_outside_only() {
        let mut world = bundled_world();
        let region = world.region_idx("mir_tower").unwrap();
        world.set_dark_region(region).unwrap();

        let mercator = world.node_idx("mercator").unwrap();
        let sector = world.node_idx("mir_tower_sector").unwrap();
        let tower = world.node_idx("mir_tower").unwrap();
        let entering = world.path_between(mercator, sector).unwrap();
        let inside = world.path_between(sector, tower).unwrap();
        let leaving = world.path_between(sector, mercator).unwrap();

        assert!(world.path(entering).required_items.contains(&ITEM_LANTERN));
        assert!(!world.path(inside).required_items.contains(&ITEM_LANTERN));
        assert!(!world.path(leaving).required_items.contains(&ITEM_LANTERN));
        assert!(world.node(tower).hints.iter().any(|hint| hint == DARK_REGION_HINT));
        assert_eq!(world.dark_region(), Some(region));
    }

    #[test]
    fn gold_items_are_shared_by_worth() {
        let mut world = bundled_world();
        let first = world.add_gold_item(25).unwrap();
        let second = world.add_gold_item(40).unwrap();
        assert_eq!(first, ITEM_GOLDS_START);
        assert_eq!(second, ITEM_GOLDS_START + 1);
        assert_eq!(world.add_gold_item(25), Some(first));
        assert_eq!(world.gold_values(), vec![(first, 25), (second, 40)]);
        assert_eq!(world.parse_item_from_name("40 golds"), Some(second));
    }

    #[test]
    fn shop_slots_of_a_shop_sell_different_items() {
        let mut world = bundled_world();
        let first = world.item_source_idx("Gumi: shop item 1").unwrap();
        let second = world.item_source_idx("Gumi: shop item 2").unwrap();
        let elsewhere = world.item_source_idx("Ryuma: shop item 1").unwrap();

        assert!(world.is_item_compatible(first, ITEM_KEY));
        world.place_item(first, ITEM_KEY);
        assert!(!world.is_item_compatible(second, ITEM_KEY));
        assert!(world.is_item_compatible(elsewhere, ITEM_KEY));

        let gold = world.add_gold_item(10).unwrap();
        assert!(!world.is_item_compatible(second, gold));
        assert!(!world.is_item_compatible(second, crate::items::ITEM_NONE));
    }

    #[test]
    #[should_panic(expected = "filled twice")]
    fn filling_a_source_twice_panics() {
        let mut world = bundled_world();
        let source = world.item_source_idx("Massan: chest 1").unwrap();
        world.place_item(source, ITEM_KEY);
        world.place_item(source, ITEM_EKEEKE);
    }

    #[test]
    fn plando_prefills_sources() {
        let mut world = bundled_world();
        let plando = json!({ "itemSources": { "Massan: chest 1": "Key", "Tibor: chest 2": "12 golds" } });
        world.apply_plando(&plando).unwrap();

        let chest = world.item_source_idx("Massan: chest 1").unwrap();
        assert_eq!(world.item_source(chest).item, Some(ITEM_KEY));
        let tibor = world.item_source_idx("Tibor: chest 2").unwrap();
        let gold = world.item_source(tibor).item.unwrap();
        assert_eq!(world.item(gold).unwrap().gold_value, 12);

        let wrong_source = json!({ "itemSources": { "Nowhere": "Key" } });
        assert!(world.apply_plando(&wrong_source).is_err());
        let wrong_item = json!({ "itemSources": { "Massan: chest 2": "Excalibur" } });
        assert!(world.apply_plando(&wrong_item).is_err());
    }

    #[test]
    fn export_lists_sources_by_region() {
        let mut world = bundled_world();
        world.set_active_spawn_location("gumi").unwrap();
        let source = world.item_source_idx("Massan: chest 1").unwrap();
        world.place_item(source, ITEM_KEY);

        let exported = serde_json::to_value(world.export()).unwrap();
        assert_eq!(exported["spawnLocation"], "gumi");
        let chest = &exported["itemSources"]["Massan"]["Massan: chest 1"];
        assert_eq!(chest["item"], "Key");
        assert_eq!(chest["type"], "chest");
        assert!(exported["hints"]["Lithograph"].is_object());
    }

    #[test]
    fn unknown_spawn_location_is_rejected() {
        let mut world = bundled_world();
        assert!(world.set_active_spawn_location("atlantis").is_err());
        assert!(world.spawn_node().is_err());
    }
}
