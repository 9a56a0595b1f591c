use log::{debug, error};
use serde::Serialize;
use std::collections::HashSet;

use crate::exploration::{missing_items, Exploration, ExplorationVisitor};
use crate::items::ItemId;
use crate::model::{NodeIdx, PathIdx, RegionIdx, SourceIdx};
use crate::world::World;
use crate::{RandomizerError, Result};

/// Everything that happened during one `run_until_blocked` call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SolverStep {
    pub exploration: Vec<String>,
}

#[derive(Debug, Default)]
struct SolverState {
    inventory: Vec<ItemId>,
    reachable_sources: Vec<SourceIdx>,
    relevant_items: HashSet<ItemId>,
    debug_log: Vec<SolverStep>,
}

impl SolverState {
    fn trace(&mut self, line: String) {
        if let Some(step) = self.debug_log.last_mut() {
            step.exploration.push(line);
        }
    }
}

impl ExplorationVisitor for SolverState {
    fn inventory(&self) -> &[ItemId] {
        &self.inventory
    }

    fn on_node_explored(&mut self, world: &World, node: NodeIdx) {
        let node = world.node(node);
        self.trace(format!("Explored {}", node.id));
        self.reachable_sources.extend(node.item_sources.iter().copied());
    }

    fn on_node_queued(&mut self, world: &World, node: NodeIdx) {
        self.trace(format!("Added {} to accessible nodes", world.node(node).id));
    }

    fn on_path_blocked(&mut self, world: &World, path: PathIdx) {
        let path = world.path(path);
        self.trace(format!(
            "Found blocked path to {}",
            world.node(path.destination).id
        ));
        self.relevant_items.extend(path.required_items.iter().copied());
    }

    fn on_path_unlocked(&mut self, world: &World, path: PathIdx) {
        let path = world.path(path);
        self.trace(format!(
            "Unlocked path {} --> {}",
            world.node(path.origin).id,
            world.node(path.destination).id
        ));
    }
}

/// Reachability engine over a finished or partially filled world.
///
/// A solver is cheap: build a fresh one for every question. Its exclusion
/// controls are there to probe whether an item, an item type or a region is
/// really needed to go from `start` to `end`.
pub struct WorldSolver<'w> {
    world: &'w World,
    start: NodeIdx,
    end: NodeIdx,
    starting_inventory: Vec<ItemId>,
    exploration: Exploration,
    state: SolverState,
    forbidden_item_instances: Vec<ItemId>,
    forbidden_item_types: HashSet<ItemId>,
    forbidden_regions: HashSet<RegionIdx>,
}

impl<'w> WorldSolver<'w> {
    pub fn new(world: &'w World, start: NodeIdx, end: NodeIdx) -> Self {
        WorldSolver {
            world,
            start,
            end,
            starting_inventory: world.starting_inventory(),
            exploration: Exploration::starting_at(start),
            state: SolverState::default(),
            forbidden_item_instances: Vec::new(),
            forbidden_item_types: HashSet::new(),
            forbidden_regions: HashSet::new(),
        }
    }

    /// Each entry cancels exactly one occurrence of that item.
    pub fn forbid_item_instances(&mut self, items: impl IntoIterator<Item = ItemId>) {
        self.forbidden_item_instances = items.into_iter().collect();
    }

    pub fn forbid_item_types(&mut self, items: impl IntoIterator<Item = ItemId>) {
        self.forbidden_item_types = items.into_iter().collect();
    }

    pub fn forbid_taking_items_from_regions(&mut self, regions: impl IntoIterator<Item = RegionIdx>) {
        self.forbidden_regions = regions.into_iter().collect();
    }

    pub fn try_to_solve(&mut self) -> bool {
        self.run_until_blocked();
        self.reached_end()
    }

    /// Explores until no blocked path can be opened anymore. Returns whether
    /// anything new was explored or unlocked.
    pub fn run_until_blocked(&mut self) -> bool {
        self.state.debug_log.push(SolverStep::default());
        let explored_at_start = self.exploration.explored_count();

        let mut unlocked_any = false;
        loop {
            self.exploration.expand(self.world, &mut self.state);
            self.update_current_inventory();
            if !self.exploration.unlock(self.world, &mut self.state) {
                break;
            }
            unlocked_any = true;
        }

        unlocked_any || self.exploration.explored_count() > explored_at_start
    }

    pub fn reached_end(&self) -> bool {
        self.exploration.is_explored(self.end)
    }

    pub fn is_explored(&self, node: NodeIdx) -> bool {
        self.exploration.is_explored(node)
    }

    pub fn can_take_path(&self, path: PathIdx) -> bool {
        self.missing_items_to_take_path(path).is_empty()
            && self.missing_nodes_to_take_path(path).is_empty()
    }

    pub fn missing_items_to_take_path(&self, path: PathIdx) -> Vec<ItemId> {
        missing_items(&self.world.path(path).required_items, &self.state.inventory)
    }

    pub fn missing_nodes_to_take_path(&self, path: PathIdx) -> Vec<NodeIdx> {
        self.exploration.missing_nodes(self.world, path)
    }

    pub fn inventory(&self) -> &[ItemId] {
        &self.state.inventory
    }

    pub fn relevant_items(&self) -> &HashSet<ItemId> {
        &self.state.relevant_items
    }

    pub fn blocked_paths(&self) -> &[PathIdx] {
        self.exploration.blocked_paths()
    }

    pub fn reachable_item_sources(&self) -> &[SourceIdx] {
        &self.state.reachable_sources
    }

    pub fn empty_reachable_item_sources(&self) -> Vec<SourceIdx> {
        self.state
            .reachable_sources
            .iter()
            .copied()
            .filter(|&source| self.world.item_source(source).item.is_none())
            .collect()
    }

    pub fn debug_log(&self) -> &[SolverStep] {
        &self.state.debug_log
    }

    /// Greedily removes every relevant item that is not needed to reach the
    /// end. The result depends on inventory order and is only locally minimal.
    pub fn find_minimal_inventory(&mut self) -> Result<Vec<ItemId>> {
        if !self.reached_end() && !self.try_to_solve() {
            return Err(self.uncompletable_error());
        }

        let mut minimal_inventory = Vec::new();
        let mut forbidden_items: Vec<ItemId> = Vec::new();

        for item in self.state.inventory.clone() {
            if !self.state.relevant_items.contains(&item) {
                continue;
            }

            let mut forbidden_plus_one = forbidden_items.clone();
            forbidden_plus_one.push(item);

            let mut probe = WorldSolver::new(self.world, self.start, self.end);
            probe.forbid_item_instances(forbidden_plus_one.iter().copied());
            if probe.try_to_solve() {
                forbidden_items = forbidden_plus_one;
            } else {
                minimal_inventory.push(item);
            }
        }

        debug!(
            "Minimal inventory from {} to {}: {:?}",
            self.world.node(self.start).id,
            self.world.node(self.end).id,
            minimal_inventory
                .iter()
                .map(|&item| self.world.item_name(item))
                .collect::<Vec<_>>()
        );
        Ok(minimal_inventory)
    }

    fn update_current_inventory(&mut self) {
        let world = self.world;
        let mut inventory = self.starting_inventory.clone();

        for &path in self.exploration.crossed_paths() {
            inventory.extend(world.path(path).items_placed_when_crossing.iter().copied());
        }

        let mut forbidden_instances = self.forbidden_item_instances.clone();
        for &source in &self.state.reachable_sources {
            if self.forbidden_regions.contains(&world.item_source_region(source)) {
                continue;
            }
            let Some(item) = world.item_source(source).item else {
                continue;
            };
            if !self.state.relevant_items.contains(&item) {
                continue;
            }
            if self.forbidden_item_types.contains(&item) {
                continue;
            }

            if let Some(position) = forbidden_instances.iter().position(|&f| f == item) {
                forbidden_instances.swap_remove(position);
            } else {
                inventory.push(item);
            }
        }

        self.state.inventory = inventory;
    }

    fn uncompletable_error(&self) -> RandomizerError {
        let dump = serde_json::to_string_pretty(&self.state.debug_log)
            .unwrap_or_else(|err| format!("unable to serialize exploration log: {err}"));
        let start = self.world.node(self.start).id.clone();
        let end = self.world.node(self.end).id.clone();
        error!(
            "Tried to find minimal inventory from {} to {} on an uncompletable world:\n{}",
            start, end, dump
        );
        RandomizerError::UncompletableWorld {
            start,
            end,
            steps: self.state.debug_log.len(),
            dump,
        }
    }
}
