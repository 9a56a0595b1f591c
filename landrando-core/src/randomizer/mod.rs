use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::exploration::{missing_items, Exploration, ExplorationVisitor};
use crate::items::{ItemId, GOLDS_FILLER_NAME, ITEM_EKEEKE};
use crate::model::{NodeIdx, PathIdx, SourceIdx};
use crate::options::RandomizerOptions;
use crate::spoiler::{PlacedItem, SpoilerLog, SpoilerStep};
use crate::world::World;
use crate::{RandomizerError, Result};

mod hints;

const AVERAGE_GOLD_PER_CHEST: u32 = 35;
const MAX_FACTOR_OF_TOTAL_GOLD: f64 = 0.16;

/// What the placement loop knows at a given time: the player's inventory and
/// the reachable sources still waiting for an item.
#[derive(Debug, Default)]
struct PlacementState {
    inventory: Vec<ItemId>,
    item_sources_to_fill: Vec<SourceIdx>,
    explored_this_step: Vec<String>,
}

impl ExplorationVisitor for PlacementState {
    fn inventory(&self) -> &[ItemId] {
        &self.inventory
    }

    fn on_node_explored(&mut self, world: &World, node: NodeIdx) {
        let node = world.node(node);
        self.explored_this_step.push(node.id.clone());
        for &source in &node.item_sources {
            // Pre-filled sources (mandatory items, plando) are picked up as is
            match world.item_source(source).item {
                Some(item) => self.inventory.push(item),
                None => self.item_sources_to_fill.push(source),
            }
        }
    }

    fn on_path_crossed(&mut self, world: &World, path: PathIdx) {
        self.inventory
            .extend(world.path(path).items_placed_when_crossing.iter().copied());
    }
}

pub struct WorldRandomizer<'a> {
    world: &'a mut World,
    options: &'a RandomizerOptions,
    rng: StdRng,
    filler_items: Vec<ItemId>,
    mandatory_items: Vec<ItemId>,
    gold_items_count: u16,
    exploration: Exploration,
    placement: PlacementState,
    logical_playthrough: Vec<SourceIdx>,
    minimal_items_to_complete: Vec<ItemId>,
    spoiler_log: SpoilerLog,
}

impl<'a> WorldRandomizer<'a> {
    pub fn new(world: &'a mut World, options: &'a RandomizerOptions) -> Result<Self> {
        options.validate()?;

        let mut randomizer = WorldRandomizer {
            world,
            options,
            rng: StdRng::seed_from_u64(options.seed as u64),
            filler_items: Vec::new(),
            mandatory_items: Vec::new(),
            gold_items_count: 0,
            exploration: Exploration::default(),
            placement: PlacementState::default(),
            logical_playthrough: Vec::new(),
            minimal_items_to_complete: Vec::new(),
            spoiler_log: SpoilerLog::new(options),
        };
        randomizer.init_filler_items()?;
        randomizer.init_mandatory_items()?;
        Ok(randomizer)
    }

    fn init_filler_items(&mut self) -> Result<()> {
        for (name, quantity) in self.options.filler_items() {
            if name == GOLDS_FILLER_NAME {
                self.gold_items_count = self.gold_items_count.saturating_add(quantity);
                continue;
            }
            let item = self.world.item_by_name(&name).ok_or_else(|| {
                RandomizerError::Config(format!("Unknown item '{}' found in filler items.", name))
            })?;
            self.filler_items
                .extend(std::iter::repeat(item.id).take(quantity as usize));
        }
        Ok(())
    }

    fn init_mandatory_items(&mut self) -> Result<()> {
        for (name, quantity) in self.options.mandatory_items() {
            let item = self.world.item_by_name(&name).ok_or_else(|| {
                RandomizerError::Config(format!(
                    "Unknown item '{}' found in mandatory items.",
                    name
                ))
            })?;
            self.mandatory_items
                .extend(std::iter::repeat(item.id).take(quantity as usize));
        }
        Ok(())
    }

    fn reseed(&mut self) {
        self.rng = StdRng::seed_from_u64(self.options.seed as u64);
    }

    pub fn randomize(&mut self) -> Result<()> {
        // Each pass restarts the RNG so it only depends on the previous
        // passes' results, not on how many numbers they drew.
        self.reseed();
        self.randomize_spawn_location()?;
        self.randomize_gold_values();
        self.randomize_dark_region()?;

        self.reseed();
        self.randomize_items()?;

        self.minimal_items_to_complete = self.world.minimal_inventory_to_complete()?;
        info!(
            "{} items are required to complete the seed.",
            self.minimal_items_to_complete.len()
        );

        self.reseed();
        self.randomize_hints()?;

        if self.options.randomizer_settings.shuffle_trees {
            self.randomize_teleport_trees();
        }

        self.finish_spoiler_log();
        Ok(())
    }

    pub fn minimal_items_to_complete(&self) -> &[ItemId] {
        &self.minimal_items_to_complete
    }

    pub fn spoiler_log(&self) -> &SpoilerLog {
        &self.spoiler_log
    }

    pub fn into_spoiler_log(self) -> SpoilerLog {
        self.spoiler_log
    }

    // First pass, before items

    fn randomize_spawn_location(&mut self) -> Result<()> {
        let mut candidates = self.options.randomizer_settings.spawn_locations.clone();
        if candidates.is_empty() {
            candidates = self
                .world
                .spawn_locations()
                .iter()
                .map(|spawn| spawn.id.clone())
                .collect();
        }

        candidates.shuffle(&mut self.rng);
        let spawn = candidates.first().ok_or_else(|| {
            RandomizerError::Config("no spawn location can be chosen".to_string())
        })?;
        self.world.set_active_spawn_location(spawn)?;

        info!("Spawning in {}.", spawn);
        let spawn_node = self.world.spawn_node()?;
        let unreachable = self.world.unreachable_nodes_from(spawn_node);
        if !unreachable.is_empty() {
            warn!(
                "{} nodes can never be reached from {}, their sources will hold filler items.",
                unreachable.len(),
                spawn
            );
        }
        self.spoiler_log.spawn_location = Some(spawn.clone());
        Ok(())
    }

    fn randomize_gold_values(&mut self) {
        let count = self.gold_items_count as u32;
        let mut total_gold = AVERAGE_GOLD_PER_CHEST * count;

        for i in 0..count {
            let drawn = if i + 1 < count {
                let proportion: f64 = self.rng.gen();
                (total_gold as f64 * proportion * MAX_FACTOR_OF_TOTAL_GOLD) as u32
            } else {
                total_gold
            };
            let gold_value = drawn.clamp(1, 255);

            total_gold = total_gold.saturating_sub(gold_value);

            match self.world.add_gold_item(gold_value as u8) {
                Some(item) => self.filler_items.push(item),
                None => warn!("No item id left for a {} golds reward, skipping it.", gold_value),
            }
        }

        debug!("{} gold rewards added to filler items.", count);
    }

    fn randomize_dark_region(&mut self) -> Result<()> {
        let mut candidates: Vec<_> = self
            .world
            .regions()
            .iter()
            .enumerate()
            .filter(|(_, region)| !region.dark_map_ids.is_empty())
            .map(|(idx, _)| idx)
            .collect();

        candidates.shuffle(&mut self.rng);
        let region = *candidates.first().ok_or_else(|| {
            RandomizerError::Config("no region can be chosen as dark region".to_string())
        })?;
        self.world.set_dark_region(region)?;

        let name = self.world.region(region).name.clone();
        info!("{} is the dark region.", name);
        self.spoiler_log.dark_region = Some(name);
        Ok(())
    }

    // Second pass, items

    fn randomize_items(&mut self) -> Result<()> {
        let spawn = self.world.spawn_node()?;
        self.exploration = Exploration::starting_at(spawn);
        self.placement = PlacementState {
            inventory: self.world.starting_inventory(),
            ..Default::default()
        };

        self.filler_items.shuffle(&mut self.rng);
        self.place_mandatory_items();

        let mut step_count = 1;
        while self.exploration.has_pending_work() {
            let mut step = SpoilerStep::new(step_count.to_string());

            let explored = self.exploration.expand(&*self.world, &mut self.placement);
            step.explored_nodes = std::mem::take(&mut self.placement.explored_this_step);

            // Pre-filled sources may already open some paths
            let unlocked_early = self.unlock_phase();

            self.placement.item_sources_to_fill.shuffle(&mut self.rng);

            let placed_key_items = self.place_key_items_phase(&mut step)?;

            if !self.placement.item_sources_to_fill.is_empty() {
                let count = (self.placement.item_sources_to_fill.len() as f64
                    * self.options.filling_rate())
                .floor() as usize;
                self.place_filler_items_phase(&mut step, count, None);
            }

            let unlocked_late = self.unlock_phase();
            self.spoiler_log.steps.push(step);

            if explored == 0 && !unlocked_early && placed_key_items == 0 && !unlocked_late {
                warn!(
                    "Placement stalled at step {} with {} blocked paths left.",
                    step_count,
                    self.exploration.blocked_paths().len()
                );
                break;
            }
            step_count += 1;
        }

        self.drain_remaining_sources()
    }

    /// Mandatory items go anywhere, reachable or not.
    fn place_mandatory_items(&mut self) {
        let mut step = SpoilerStep::new("0");
        step.comment = Some("Placing mandatory items".to_string());

        self.mandatory_items.shuffle(&mut self.rng);

        let mut empty_sources: Vec<SourceIdx> = (0..self.world.item_sources().len())
            .filter(|&source| self.world.item_source(source).item.is_none())
            .collect();
        empty_sources.shuffle(&mut self.rng);

        for &item in &self.mandatory_items {
            let source = empty_sources.iter().copied().find(|&source| {
                self.world.item_source(source).item.is_none()
                    && self.world.is_item_compatible(source, item)
            });

            match source {
                Some(source) => {
                    self.world.place_item(source, item);
                    step.placed_items.push(self.placed_item(source));
                }
                None => warn!(
                    "Could not find any source for mandatory item {}.",
                    self.world.item_name(item)
                ),
            }
        }

        self.spoiler_log.steps.push(step);
    }

    fn unlock_phase(&mut self) -> bool {
        self.exploration.unlock(&*self.world, &mut self.placement)
    }

    /// Opens one of the paths blocked only by items. Paths are drawn with a
    /// probability proportional to their weight. Returns the count of placed
    /// items.
    fn place_key_items_phase(&mut self, step: &mut SpoilerStep) -> Result<usize> {
        let mut weighted_paths: Vec<PathIdx> = Vec::new();
        for &path in self.exploration.blocked_paths() {
            if !self.exploration.missing_nodes(&*self.world, path).is_empty() {
                continue;
            }
            let world_path = self.world.path(path);
            if !missing_items(&world_path.required_items, &self.placement.inventory).is_empty() {
                for _ in 0..world_path.weight {
                    weighted_paths.push(path);
                }
            }
        }

        weighted_paths.shuffle(&mut self.rng);
        let Some(&path_to_open) = weighted_paths.first() else {
            return Ok(0);
        };

        let missing = missing_items(
            &self.world.path(path_to_open).required_items,
            &self.placement.inventory,
        );
        for &item in &missing {
            let position = self
                .placement
                .item_sources_to_fill
                .iter()
                .position(|&source| self.world.is_item_compatible(source, item));

            let Some(position) = position else {
                let path = self.world.path(path_to_open);
                error!(
                    "No empty source can carry {} to open {} --> {} ({} candidates left).",
                    self.world.item_name(item),
                    self.world.node(path.origin).id,
                    self.world.node(path.destination).id,
                    self.placement.item_sources_to_fill.len()
                );
                return Err(RandomizerError::NoAppropriateItemSource {
                    item: self.world.item_name(item),
                });
            };

            let source = self.placement.item_sources_to_fill.remove(position);
            self.world.place_item(source, item);
            self.logical_playthrough.push(source);
            self.placement.inventory.push(item);
            step.placed_key_items.push(self.placed_item(source));
        }

        Ok(missing.len())
    }

    /// Fills the first `count` candidates with filler items. A candidate no
    /// filler fits in goes back at the end of the queue, unless a last resort
    /// filler is given.
    fn place_filler_items_phase(
        &mut self,
        step: &mut SpoilerStep,
        count: usize,
        last_resort_filler: Option<ItemId>,
    ) {
        for _ in 0..count {
            if self.placement.item_sources_to_fill.is_empty() {
                break;
            }
            let source = self.placement.item_sources_to_fill.remove(0);

            let filler_position = self
                .filler_items
                .iter()
                .position(|&item| self.world.is_item_compatible(source, item));

            match (filler_position, last_resort_filler) {
                (Some(position), _) => {
                    let item = self.filler_items.remove(position);
                    self.world.place_item(source, item);
                }
                (None, Some(item)) => self.world.place_item(source, item),
                (None, None) => {
                    self.placement.item_sources_to_fill.push(source);
                    continue;
                }
            }

            step.filled_sources.push(self.placed_item(source));
        }
    }

    fn drain_remaining_sources(&mut self) -> Result<()> {
        let mut step = SpoilerStep::new("remainder");

        // Sources behind paths that were never opened still need an item
        for source in 0..self.world.item_sources().len() {
            if self.world.item_source(source).item.is_none()
                && !self.placement.item_sources_to_fill.contains(&source)
            {
                self.placement.item_sources_to_fill.push(source);
            }
        }

        let last_resort = self.world.item(ITEM_EKEEKE).map(|item| item.id);
        let count = self.placement.item_sources_to_fill.len();
        self.place_filler_items_phase(&mut step, count, last_resort);
        self.spoiler_log.steps.push(step);

        self.spoiler_log.unplaced_items = self
            .filler_items
            .iter()
            .map(|&item| self.world.item_name(item))
            .collect();
        self.spoiler_log.end_state.remaining_sources_to_fill = self
            .placement
            .item_sources_to_fill
            .iter()
            .map(|&source| self.world.item_source(source).name.clone())
            .collect();
        self.spoiler_log.end_state.pending_paths = self.exploration.blocked_paths().len();

        if let Some(source) = self.world.item_sources().iter().find(|s| s.item.is_none()) {
            return Err(RandomizerError::Config(format!(
                "item source '{}' could not be filled",
                source.name
            )));
        }

        info!(
            "Items placed, {} filler items left unused.",
            self.filler_items.len()
        );
        Ok(())
    }

    fn placed_item(&self, source: SourceIdx) -> PlacedItem {
        let source = self.world.item_source(source);
        PlacedItem {
            source: source.name.clone(),
            item: source
                .item
                .map(|item| self.world.item_name(item))
                .unwrap_or_default(),
        }
    }

    // Post-item passes

    fn randomize_teleport_trees(&mut self) {
        let mut map_ids: Vec<u16> = self
            .world
            .teleport_trees()
            .iter()
            .map(|tree| tree.tree_map_id)
            .collect();
        map_ids.shuffle(&mut self.rng);
        self.world.set_teleport_tree_map_ids(&map_ids);
    }

    fn finish_spoiler_log(&mut self) {
        let world = &*self.world;

        self.spoiler_log.required_items = self
            .minimal_items_to_complete
            .iter()
            .map(|&item| world.item_name(item))
            .collect();

        self.spoiler_log.playthrough = self
            .logical_playthrough
            .iter()
            .filter_map(|&source| {
                let source = world.item_source(source);
                let item = source.item?;
                self.minimal_items_to_complete
                    .contains(&item)
                    .then(|| PlacedItem {
                        source: source.name.clone(),
                        item: world.item_name(item),
                    })
            })
            .collect();

        self.spoiler_log.hints = world
            .hint_sources()
            .iter()
            .map(|hint| (hint.description.clone(), hint.text.clone()))
            .collect();

        for source in world.item_sources() {
            let region = world.region(world.node(source.node).region);
            self.spoiler_log
                .item_sources
                .entry(region.name.clone())
                .or_default()
                .insert(
                    source.name.clone(),
                    source
                        .item
                        .map(|item| world.item_name(item))
                        .unwrap_or_default(),
                );
        }
    }
}
