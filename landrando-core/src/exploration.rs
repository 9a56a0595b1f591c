use std::collections::{HashSet, VecDeque};

use crate::items::ItemId;
use crate::model::{NodeIdx, PathIdx};
use crate::world::World;

/// Items from `required` that cannot be matched in `inventory`. Each
/// occurrence in `inventory` matches at most one requirement, so a path
/// asking twice for the same item needs two copies.
pub fn missing_items(required: &[ItemId], inventory: &[ItemId]) -> Vec<ItemId> {
    let mut available = inventory.to_vec();
    let mut missing = Vec::new();
    for &item in required {
        match available.iter().position(|&owned| owned == item) {
            Some(position) => {
                available.swap_remove(position);
            }
            None => missing.push(item),
        }
    }
    missing
}

/// Hooks called while the explored area grows. The solver and the randomizer
/// only differ in how they account for what they find.
pub(crate) trait ExplorationVisitor {
    /// Inventory used to decide whether a path can be crossed.
    fn inventory(&self) -> &[ItemId];

    fn on_node_explored(&mut self, _world: &World, _node: NodeIdx) {}

    fn on_node_queued(&mut self, _world: &World, _node: NodeIdx) {}

    fn on_path_blocked(&mut self, _world: &World, _path: PathIdx) {}

    /// Called once for every path actually taken, either right away or after
    /// being unlocked.
    fn on_path_crossed(&mut self, _world: &World, _path: PathIdx) {}

    fn on_path_unlocked(&mut self, _world: &World, _path: PathIdx) {}
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Exploration {
    frontier: VecDeque<NodeIdx>,
    discovered: HashSet<NodeIdx>,
    explored: HashSet<NodeIdx>,
    blocked_paths: Vec<PathIdx>,
    crossed_paths: Vec<PathIdx>,
}

impl Exploration {
    pub fn starting_at(start: NodeIdx) -> Self {
        Exploration {
            frontier: VecDeque::from([start]),
            discovered: HashSet::from([start]),
            ..Default::default()
        }
    }

    pub fn is_explored(&self, node: NodeIdx) -> bool {
        self.explored.contains(&node)
    }

    pub fn explored_count(&self) -> usize {
        self.explored.len()
    }

    pub fn blocked_paths(&self) -> &[PathIdx] {
        &self.blocked_paths
    }

    pub fn crossed_paths(&self) -> &[PathIdx] {
        &self.crossed_paths
    }

    pub fn has_pending_work(&self) -> bool {
        !self.frontier.is_empty() || !self.blocked_paths.is_empty()
    }

    pub fn missing_nodes(&self, world: &World, path: PathIdx) -> Vec<NodeIdx> {
        world
            .path(path)
            .required_nodes
            .iter()
            .copied()
            .filter(|node| !self.explored.contains(node))
            .collect()
    }

    pub fn can_take_path(&self, world: &World, path: PathIdx, inventory: &[ItemId]) -> bool {
        self.missing_nodes(world, path).is_empty()
            && missing_items(&world.path(path).required_items, inventory).is_empty()
    }

    /// Explores the whole frontier. Paths leading to undiscovered nodes are
    /// either crossed or parked as blocked. Returns how many nodes were
    /// explored.
    pub fn expand<V: ExplorationVisitor>(&mut self, world: &World, visitor: &mut V) -> usize {
        let mut explored_count = 0;

        while let Some(node) = self.frontier.pop_front() {
            self.explored.insert(node);
            explored_count += 1;
            visitor.on_node_explored(world, node);

            for &path in &world.node(node).outgoing_paths {
                let destination = world.path(path).destination;
                if self.discovered.contains(&destination) {
                    continue;
                }

                if self.can_take_path(world, path, visitor.inventory()) {
                    self.discovered.insert(destination);
                    self.frontier.push_back(destination);
                    self.crossed_paths.push(path);
                    visitor.on_path_crossed(world, path);
                    visitor.on_node_queued(world, destination);
                } else {
                    self.blocked_paths.push(path);
                    visitor.on_path_blocked(world, path);
                }
            }
        }

        explored_count
    }

    /// Retries every blocked path against the visitor's inventory. Returns
    /// whether at least one path was unlocked.
    pub fn unlock<V: ExplorationVisitor>(&mut self, world: &World, visitor: &mut V) -> bool {
        let mut unlocked_any = false;
        let mut still_blocked = Vec::with_capacity(self.blocked_paths.len());

        for path in std::mem::take(&mut self.blocked_paths) {
            if !self.can_take_path(world, path, visitor.inventory()) {
                still_blocked.push(path);
                continue;
            }

            unlocked_any = true;
            let destination = world.path(path).destination;
            if self.discovered.insert(destination) {
                self.frontier.push_back(destination);
            }
            self.crossed_paths.push(path);
            visitor.on_path_crossed(world, path);
            visitor.on_path_unlocked(world, path);
        }

        self.blocked_paths = still_blocked;
        unlocked_any
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::{ITEM_KEY, ITEM_LANTERN};

    #[test]
    fn duplicates_need_as_many_copies() {
        let required = [ITEM_KEY, ITEM_KEY];
        assert_eq!(missing_items(&required, &[]), vec![ITEM_KEY, ITEM_KEY]);
        assert_eq!(missing_items(&required, &[ITEM_KEY]), vec![ITEM_KEY]);
        assert!(missing_items(&required, &[ITEM_KEY, ITEM_KEY]).is_empty());
    }

    #[test]
    fn unrelated_items_do_not_count() {
        let required = [ITEM_KEY, ITEM_LANTERN];
        assert_eq!(
            missing_items(&required, &[ITEM_LANTERN, ITEM_LANTERN]),
            vec![ITEM_KEY]
        );
        assert!(missing_items(&[], &[ITEM_KEY]).is_empty());
    }
}
