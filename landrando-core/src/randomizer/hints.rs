//! Hint texts written once every item has found its place.

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

use super::WorldRandomizer;
use crate::items::{
    ItemId, FORTUNE_TELLER_ITEMS, HINTABLE_ITEM_LOCATIONS, HINTABLE_ITEM_REQUIREMENTS,
    ITEM_LITHOGRAPH, ITEM_ORACLE_STONE, ITEM_RED_JEWEL, JEWELS, MAX_INDIVIDUAL_JEWELS,
};
use crate::model::{RegionIdx, SourceIdx};
use crate::Result;

const LITHOGRAPH_HINT: &str = "Lithograph";
const KING_NOLE_CAVE_SIGN_HINT: &str = "King Nole's Cave sign";
const FORTUNE_TELLER_HINT: &str = "Mercator fortune teller";
const ORACLE_STONE_HINT: &str = "Oracle Stone";

const UNKNOWN_PLACE: &str = "in an unknown place";
const UNREADABLE_SIGN: &str = "This sign has been damaged in a way that makes it unreadable.";

const REGION_HINT_THRESHOLD: f64 = 0.30;
const ITEM_REQUIREMENT_HINT_THRESHOLD: f64 = 0.55;

impl<'a> WorldRandomizer<'a> {
    pub(super) fn randomize_hints(&mut self) -> Result<()> {
        self.randomize_lithograph_hint();
        self.randomize_where_is_lithograph_hint();

        let hinted_fortune_item = self.randomize_fortune_teller_hint();
        let hinted_oracle_stone_item = self.randomize_oracle_stone_hint(hinted_fortune_item)?;

        self.randomize_sign_hints(hinted_fortune_item, hinted_oracle_stone_item)
    }

    fn set_hint(&mut self, description: &str, text: String) -> bool {
        match self.world.hint_source_idx(description) {
            Some(idx) => {
                debug!("{}: {}", description, text);
                self.world.set_hint_text(idx, text);
                true
            }
            None => false,
        }
    }

    fn randomize_lithograph_hint(&mut self) {
        if self.world.hint_source_idx(LITHOGRAPH_HINT).is_none() {
            return;
        }

        let jewel_count = self.options.jewel_count();
        let text = if jewel_count > MAX_INDIVIDUAL_JEWELS {
            let sources = self.world.item_sources_with_item(ITEM_RED_JEWEL);
            sources
                .into_iter()
                .map(|source| format!("A jewel is {}.", self.random_hint_for_item_source(source)))
                .collect::<Vec<_>>()
                .join("\n")
        } else if jewel_count >= 1 {
            JEWELS[..jewel_count as usize]
                .iter()
                .map(|&jewel| {
                    let hint = self.random_hint_for_item(jewel);
                    format!("{} is {}.", self.world.item_name(jewel), hint)
                })
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            "This tablet seems of no use...".to_string()
        };

        self.set_hint(LITHOGRAPH_HINT, text);
    }

    fn randomize_where_is_lithograph_hint(&mut self) {
        if self.world.hint_source_idx(KING_NOLE_CAVE_SIGN_HINT).is_none() {
            return;
        }
        let text = format!(
            "The lithograph will help you finding the jewels. It is {}.",
            self.random_hint_for_item(ITEM_LITHOGRAPH)
        );
        self.set_hint(KING_NOLE_CAVE_SIGN_HINT, text);
    }

    fn randomize_fortune_teller_hint(&mut self) -> Option<ItemId> {
        if self.world.hint_source_idx(FORTUNE_TELLER_HINT).is_none() {
            return None;
        }

        let mut hintable_items: Vec<(ItemId, &str)> = FORTUNE_TELLER_ITEMS
            .iter()
            .copied()
            .filter(|(item, _)| self.world.item(*item).is_some())
            .collect();
        hintable_items.shuffle(&mut self.rng);
        let (hinted_item, fancy_name) = *hintable_items.first()?;

        let text = format!(
            "I see... I see...\nI see {} {}.",
            fancy_name,
            self.random_hint_for_item(hinted_item)
        );
        self.set_hint(FORTUNE_TELLER_HINT, text);
        Some(hinted_item)
    }

    /// Hints one required item, never one needed to reach the stone itself.
    fn randomize_oracle_stone_hint(
        &mut self,
        hinted_fortune_item: Option<ItemId>,
    ) -> Result<Option<ItemId>> {
        if self.world.hint_source_idx(ORACLE_STONE_HINT).is_none() {
            return Ok(None);
        }

        let mut forbidden_items: HashSet<ItemId> = JEWELS.iter().copied().collect();
        forbidden_items.extend(hinted_fortune_item);

        if let Some(&source) = self.world.item_sources_with_item(ITEM_ORACLE_STONE).first() {
            let node = self.world.item_source(source).node;
            forbidden_items.extend(self.world.minimal_inventory_to_reach(node)?);
        }

        let mut hintable_items: Vec<ItemId> = self
            .minimal_items_to_complete
            .iter()
            .copied()
            .filter(|item| !forbidden_items.contains(item))
            .collect();
        hintable_items.shuffle(&mut self.rng);

        match hintable_items.first().copied() {
            Some(hinted_item) => {
                let hint = self.random_hint_for_item(hinted_item);
                let text = format!(
                    "You will need {}. It is {}.",
                    self.world.item_name(hinted_item),
                    hint
                );
                self.set_hint(ORACLE_STONE_HINT, text);
                Ok(Some(hinted_item))
            }
            None => {
                self.set_hint(
                    ORACLE_STONE_HINT,
                    "The stone looks blurry. It looks like it won't be of any use...".to_string(),
                );
                Ok(None)
            }
        }
    }

    fn randomize_sign_hints(
        &mut self,
        hinted_fortune_item: Option<ItemId>,
        hinted_oracle_stone_item: Option<ItemId>,
    ) -> Result<()> {
        let mut hintable_regions: Vec<RegionIdx> = (0..self.world.regions().len())
            .filter(|&region| {
                self.world
                    .region(region)
                    .nodes
                    .iter()
                    .any(|&node| !self.world.node(node).item_sources.is_empty())
            })
            .collect();
        hintable_regions.shuffle(&mut self.rng);

        let mut hintable_item_requirements: Vec<ItemId> = HINTABLE_ITEM_REQUIREMENTS
            .iter()
            .copied()
            .filter(|&item| self.world.item(item).is_some())
            .collect();
        hintable_item_requirements.shuffle(&mut self.rng);

        let mut hintable_item_locations: Vec<ItemId> = HINTABLE_ITEM_LOCATIONS
            .iter()
            .copied()
            .filter(|&item| self.world.item(item).is_some())
            .filter(|&item| Some(item) != hinted_fortune_item)
            .filter(|&item| Some(item) != hinted_oracle_stone_item)
            .collect();
        hintable_item_locations.shuffle(&mut self.rng);

        let unreachable_nodes = self.world.unreachable_nodes_from(self.world.spawn_node()?);

        for hint_idx in 0..self.world.hint_sources().len() {
            let hint_source = &self.world.hint_sources()[hint_idx];
            let Some(node) = hint_source.node.filter(|_| !hint_source.special) else {
                continue;
            };
            if unreachable_nodes.contains(&node) {
                self.world.set_hint_text(hint_idx, UNREADABLE_SIGN.to_string());
                continue;
            }

            let inventory_at_sign = self.world.minimal_inventory_to_reach(node)?;
            let random_number: f64 = self.rng.gen();

            if random_number < REGION_HINT_THRESHOLD && !hintable_regions.is_empty() {
                let region = hintable_regions.remove(0);
                let name = &self.world.region(region).name;
                let text = if self.world.is_region_avoidable(region)? {
                    format!("What you are looking for is not in {}.", name)
                } else {
                    format!("You might have a pleasant surprise wandering in {}.", name)
                };
                self.world.set_hint_text(hint_idx, text);
                continue;
            }

            if random_number < ITEM_REQUIREMENT_HINT_THRESHOLD {
                if let Some(item) =
                    take_first_not_owned(&mut hintable_item_requirements, &inventory_at_sign)
                {
                    let name = self.world.item_name(item);
                    let text = if self.world.is_item_avoidable(item)? {
                        format!("{} is not required in your quest to King Nole's treasure.", name)
                    } else {
                        format!("You will need {} in your quest to King Nole's treasure.", name)
                    };
                    self.world.set_hint_text(hint_idx, text);
                    continue;
                }
            }

            if let Some(item) = take_first_not_owned(&mut hintable_item_locations, &inventory_at_sign)
            {
                let hint = self.random_hint_for_item(item);
                let text = format!("You shall find {} {}.", self.world.item_name(item), hint);
                self.world.set_hint_text(hint_idx, text);
                continue;
            }

            self.world.set_hint_text(hint_idx, UNREADABLE_SIGN.to_string());
        }

        Ok(())
    }

    fn random_hint_for_item(&mut self, item: ItemId) -> String {
        let mut sources = self.world.item_sources_with_item(item);
        sources.shuffle(&mut self.rng);
        match sources.first() {
            Some(&source) => self.random_hint_for_item_source(source),
            None => UNKNOWN_PLACE.to_string(),
        }
    }

    fn random_hint_for_item_source(&mut self, source: SourceIdx) -> String {
        let source = self.world.item_source(source);
        let mut all_hints: Vec<&String> = self
            .world
            .node(source.node)
            .hints
            .iter()
            .chain(source.hints.iter())
            .collect();

        all_hints.shuffle(&mut self.rng);
        all_hints
            .first()
            .map(|hint| hint.to_string())
            .unwrap_or_else(|| UNKNOWN_PLACE.to_string())
    }
}

/// Removes and returns the first item of `pool` the player does not already
/// need to own to read the sign.
fn take_first_not_owned(pool: &mut Vec<ItemId>, owned: &[ItemId]) -> Option<ItemId> {
    let position = pool.iter().position(|item| !owned.contains(item))?;
    Some(pool.remove(position))
}
