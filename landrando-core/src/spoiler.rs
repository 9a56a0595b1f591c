use serde::Serialize;
use std::collections::BTreeMap;

use crate::options::RandomizerOptions;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedItem {
    pub source: String,
    pub item: String,
}

/// One iteration of the placement loop. `label` is the step number, "0" for
/// mandatory items and "remainder" for the final drain.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpoilerStep {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub explored_nodes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub placed_key_items: Vec<PlacedItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub placed_items: Vec<PlacedItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filled_sources: Vec<PlacedItem>,
}

impl SpoilerStep {
    pub fn new(label: impl Into<String>) -> Self {
        SpoilerStep {
            label: label.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndState {
    pub remaining_sources_to_fill: Vec<String>,
    pub pending_paths: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpoilerLog {
    pub seed: u32,
    pub options: RandomizerOptions,
    pub spawn_location: Option<String>,
    pub dark_region: Option<String>,
    pub steps: Vec<SpoilerStep>,
    pub unplaced_items: Vec<String>,
    pub end_state: EndState,
    pub required_items: Vec<String>,
    pub playthrough: Vec<PlacedItem>,
    pub hints: BTreeMap<String, String>,
    pub item_sources: BTreeMap<String, BTreeMap<String, String>>,
}

impl SpoilerLog {
    pub fn new(options: &RandomizerOptions) -> Self {
        SpoilerLog {
            seed: options.seed,
            options: options.clone(),
            spawn_location: None,
            dark_region: None,
            steps: Vec::new(),
            unplaced_items: Vec::new(),
            end_state: EndState::default(),
            required_items: Vec::new(),
            playthrough: Vec::new(),
            hints: BTreeMap::new(),
            item_sources: BTreeMap::new(),
        }
    }

    pub fn step(&self, label: &str) -> Option<&SpoilerStep> {
        self.steps.iter().find(|step| step.label == label)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
