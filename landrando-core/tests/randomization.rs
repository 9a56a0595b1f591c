use std::collections::{BTreeMap, HashSet};

use landrando_core::items::ITEM_KEY;
use landrando_core::{
    build_world, randomize, run, RandomizerOptions, RandomizerSettings, SpoilerLog, World,
    WorldData, WorldSolver,
};
use serde_json::json;

fn options_with_seed(seed: u32) -> RandomizerOptions {
    let mut options = RandomizerOptions::default();
    options.seed = seed;
    options
}

fn randomized_bundled_world(options: &RandomizerOptions) -> (World, SpoilerLog) {
    let mut world = build_world(WorldData::bundled().unwrap(), options, None).unwrap();
    let log = randomize(&mut world, options).unwrap();
    (world, log)
}

fn is_completable(world: &World) -> bool {
    let spawn = world.active_spawn_location().unwrap().node;
    WorldSolver::new(world, spawn, world.end_node()).try_to_solve()
}

#[test]
fn hundred_seeds_are_completable() {
    for seed in 0..100 {
        let (world, log) = randomized_bundled_world(&options_with_seed(seed));
        assert!(is_completable(&world), "seed {} cannot be completed", seed);
        assert!(!log.required_items.is_empty());
        assert!(
            world.item_sources().iter().all(|source| source.item.is_some()),
            "seed {} left an empty source",
            seed
        );
    }
}

#[test]
fn same_seed_gives_same_world() {
    let options = options_with_seed(0xC0FFEE);
    let (first, first_log) = randomized_bundled_world(&options);
    let (second, second_log) = randomized_bundled_world(&options);

    let first_items: Vec<_> = first.item_sources().iter().map(|s| s.item).collect();
    let second_items: Vec<_> = second.item_sources().iter().map(|s| s.item).collect();
    assert_eq!(first_items, second_items);

    let first_hints: Vec<_> = first.hint_sources().iter().map(|h| h.text.clone()).collect();
    let second_hints: Vec<_> = second.hint_sources().iter().map(|h| h.text.clone()).collect();
    assert_eq!(first_hints, second_hints);
    assert!(first_hints.iter().all(|text| !text.is_empty()));

    assert_eq!(
        serde_json::to_string(&first.export()).unwrap(),
        serde_json::to_string(&second.export()).unwrap()
    );
    assert_eq!(first_log.to_json_pretty().unwrap(), second_log.to_json_pretty().unwrap());
}

#[test]
fn different_seeds_give_different_worlds() {
    let (first, _) = randomized_bundled_world(&options_with_seed(1));
    let (second, _) = randomized_bundled_world(&options_with_seed(2));
    let first_items: Vec<_> = first.item_sources().iter().map(|s| s.item).collect();
    let second_items: Vec<_> = second.item_sources().iter().map(|s| s.item).collect();
    assert_ne!(first_items, second_items);
}

#[test]
fn every_source_is_filled_exactly_once() {
    for seed in 0..25 {
        let (world, log) = randomized_bundled_world(&options_with_seed(seed));

        let mut filled = HashSet::new();
        for step in &log.steps {
            let placements = step
                .placed_items
                .iter()
                .chain(&step.placed_key_items)
                .chain(&step.filled_sources);
            for placement in placements {
                assert!(
                    filled.insert(placement.source.clone()),
                    "seed {}: {} filled twice",
                    seed,
                    placement.source
                );
            }
        }
        assert_eq!(filled.len(), world.item_sources().len());
    }
}

#[test]
fn zero_filling_rate_keeps_filler_for_the_end() {
    for seed in 0..10 {
        let mut options = options_with_seed(seed);
        options.randomizer_settings.filling_rate = 0.0;
        let (world, log) = randomized_bundled_world(&options);

        let main_loop_fills: usize = log
            .steps
            .iter()
            .filter(|step| step.label != "0" && step.label != "remainder")
            .map(|step| step.filled_sources.len())
            .sum();
        assert_eq!(main_loop_fills, 0);
        assert!(!log.step("remainder").unwrap().filled_sources.is_empty());
        assert!(is_completable(&world));
    }
}

#[test]
fn full_filling_rate_still_completes() {
    for seed in 0..10 {
        let mut options = options_with_seed(seed);
        options.randomizer_settings.filling_rate = 1.0;
        let (world, log) = randomized_bundled_world(&options);

        let first_step = log.step("1").unwrap();
        assert!(!first_step.filled_sources.is_empty());
        assert!(is_completable(&world));
    }
}

#[test]
fn restricted_spawn_and_tree_shuffle_are_honoured() {
    let mut options = options_with_seed(99);
    options.randomizer_settings.spawn_locations = vec!["ryuma".to_string()];
    options.randomizer_settings.shuffle_trees = true;
    let (world, log) = randomized_bundled_world(&options);

    assert_eq!(world.active_spawn_location().unwrap().id, "ryuma");
    assert_eq!(log.spawn_location.as_deref(), Some("ryuma"));

    let mut tree_maps: Vec<u16> = world.teleport_trees().iter().map(|t| t.tree_map_id).collect();
    tree_maps.sort_unstable();
    assert_eq!(tree_maps, (0x200..0x206).collect::<Vec<u16>>());
}

#[test]
fn dark_region_is_one_of_the_dark_candidates() {
    let (world, log) = randomized_bundled_world(&options_with_seed(5));
    let dark = world.dark_region().unwrap();
    assert!(!world.region(dark).dark_map_ids.is_empty());
    assert_eq!(log.dark_region.as_deref(), Some(world.region(dark).name.as_str()));
}

#[test]
fn plando_items_survive_randomization() {
    let options = options_with_seed(3);
    let plando = json!({ "itemSources": { "Massan: chest 1": "Key", "Gumi: chest 1": "25 golds" } });
    let mut world = build_world(WorldData::bundled().unwrap(), &options, Some(&plando)).unwrap();
    randomize(&mut world, &options).unwrap();

    let massan_chest = world.item_source_idx("Massan: chest 1").unwrap();
    assert_eq!(world.item_source(massan_chest).item, Some(ITEM_KEY));
    let gumi_chest = world.item_source_idx("Gumi: chest 1").unwrap();
    let gold = world.item_source(gumi_chest).item.unwrap();
    assert_eq!(world.item_name(gold), "25 golds");
    assert!(is_completable(&world));
}

fn distribution(entries: &[(&str, u16)]) -> Option<BTreeMap<String, u16>> {
    Some(
        entries
            .iter()
            .map(|(name, quantity)| (name.to_string(), *quantity))
            .collect(),
    )
}

#[test]
fn key_goes_to_the_only_source() {
    let data: WorldData = serde_json::from_value(json!({
        "items": [{ "id": ITEM_KEY, "name": "Key" }],
        "regions": [
            { "id": "start", "nodes": ["start"], "darkMapIds": [1] },
            { "id": "mid", "nodes": ["mid"] },
            { "id": "end", "nodes": ["end"] }
        ],
        "nodes": [{ "id": "start" }, { "id": "mid" }, { "id": "end" }],
        "paths": [
            { "fromId": "start", "toId": "mid", "requiredItems": ["Key"] },
            { "fromId": "mid", "toId": "end" }
        ],
        "itemSources": [
            { "name": "Start ground", "nodeId": "start", "type": "ground", "address": 4096 }
        ],
        "spawnLocations": [{ "id": "start", "nodeId": "start" }]
    }))
    .unwrap();

    let mut options = options_with_seed(42);
    options.game_settings.jewel_count = 0;
    options.randomizer_settings.mandatory_items = distribution(&[("Key", 1)]);
    options.randomizer_settings.filler_items = distribution(&[]);

    let mut world = build_world(data, &options, None).unwrap();
    let log = randomize(&mut world, &options).unwrap();

    let source = world.item_source_idx("Start ground").unwrap();
    assert_eq!(world.item_source(source).item, Some(ITEM_KEY));
    assert_eq!(log.required_items, vec!["Key".to_string()]);

    let start = world.node_idx("start").unwrap();
    let mut solver = WorldSolver::new(&world, start, world.end_node());
    assert!(solver.try_to_solve());
}

#[test]
fn run_writes_world_and_spoiler_log() {
    let output = std::env::temp_dir().join(format!("landrando-run-{}", std::process::id()));
    let settings = RandomizerSettings {
        options: options_with_seed(17),
        world_data_path: None,
        plando_path: None,
        output_path: output.clone(),
        debug: false,
    };
    run(settings).unwrap();

    let folder = output.join("Landrando_17");
    let world: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(folder.join("world.json")).unwrap()).unwrap();
    assert!(world["itemSources"].is_object());
    assert!(world["darkRegion"]["mapIds"].is_array());

    let spoiler: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(folder.join("spoiler_log.json")).unwrap())
            .unwrap();
    assert_eq!(spoiler["seed"], 17);
    assert!(spoiler["requiredItems"].is_array());

    let _ = std::fs::remove_dir_all(&output);
}

#[test]
fn run_without_spoiler_log() {
    let output = std::env::temp_dir().join(format!("landrando-nospoiler-{}", std::process::id()));
    let mut options = options_with_seed(18);
    options.randomizer_settings.allow_spoiler_log = false;
    let settings = RandomizerSettings {
        options,
        world_data_path: None,
        plando_path: None,
        output_path: output.clone(),
        debug: false,
    };
    run(settings).unwrap();

    let folder = output.join("Landrando_18");
    assert!(folder.join("world.json").exists());
    assert!(!folder.join("spoiler_log.json").exists());

    let _ = std::fs::remove_dir_all(&output);
}
