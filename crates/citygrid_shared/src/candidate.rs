//! One-pass, per-region structure selection.
//!
//! The region stream is drawn exactly three times, in this order: the region
//! chance, the weighted pick, the picked candidate's own chance. Anchors come
//! from per-candidate streams salted with the structure name, so reordering or
//! adding entries never moves an existing candidate's anchor.

use std::collections::HashMap;

use glam::IVec3;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::anchor::{anchor_in_region, Footprint};
use crate::coords::{CellPos, LocalColumn, RegionPos, RegionSize};
use crate::heightmap::{BiomeId, BiomeSource, HeightmapProvider};
use crate::random::{derive, name_salt, CANDIDATE_ANCHOR_SALT, REGION_CHANCE_SALT};

const BIOME_SAMPLE_COLUMNS: [(u8, u8); 5] = [(8, 8), (3, 3), (12, 3), (3, 12), (12, 12)];

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiomeFilter {
    #[serde(default)]
    pub any: Vec<BiomeId>,
    #[serde(default)]
    pub all: Vec<BiomeId>,
    #[serde(default)]
    pub excluding: Vec<BiomeId>,
}

impl BiomeFilter {
    pub fn is_empty(&self) -> bool {
        self.any.is_empty() && self.all.is_empty() && self.excluding.is_empty()
    }

    pub fn matches(&self, samples: &[BiomeId]) -> bool {
        let any_ok = self.any.is_empty() || samples.iter().any(|b| self.any.contains(b));
        let all_ok = self.all.is_empty() || samples.iter().all(|b| self.all.contains(b));
        let excluding_ok = !samples.iter().any(|b| self.excluding.contains(b));
        any_ok && all_ok && excluding_ok
    }
}

#[derive(Clone, Debug, Default)]
pub struct StructureCatalog {
    footprints: HashMap<String, Footprint>,
}

impl StructureCatalog {
    pub fn insert(&mut self, name: impl Into<String>, footprint: Footprint) {
        self.footprints.insert(name.into(), footprint);
    }

    pub fn footprint(&self, name: &str) -> Option<Footprint> {
        self.footprints.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.footprints.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.footprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.footprints.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SelectorEntry {
    pub structure: String,
    pub weight: i32,
    pub chance: f64,
    pub max_height_diff: Option<i32>,
    pub biomes: BiomeFilter,
}

impl SelectorEntry {
    pub fn new(structure: impl Into<String>, weight: i32) -> Self {
        Self {
            structure: structure.into(),
            weight,
            chance: 1.0,
            max_height_diff: None,
            biomes: BiomeFilter::default(),
        }
    }

    pub fn effective_weight(&self) -> u32 {
        self.weight.max(1) as u32
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GridSelector {
    pub name: String,
    pub region_size: RegionSize,
    pub region_chance: f64,
    pub weight_none: u32,
    pub entries: Vec<SelectorEntry>,
}

impl GridSelector {
    pub fn new(name: impl Into<String>, region_size: RegionSize) -> Self {
        Self {
            name: name.into(),
            region_size,
            region_chance: 1.0,
            weight_none: 0,
            entries: Vec::new(),
        }
    }

    pub fn with_entry(mut self, entry: SelectorEntry) -> Self {
        self.entries.push(entry);
        self
    }

    fn salt(&self) -> i64 {
        name_salt(&self.name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub weight: u32,
    pub chance: f64,
    pub anchor: CellPos,
    pub footprint: Footprint,
    pub region: RegionPos,
}

pub fn build_candidates<T>(
    world_seed: i64,
    region: RegionPos,
    selector: &GridSelector,
    catalog: &StructureCatalog,
    terrain: &T,
) -> Vec<Candidate>
where
    T: HeightmapProvider + BiomeSource + ?Sized,
{
    let size = selector.region_size;
    let mut out = Vec::with_capacity(selector.entries.len());

    for entry in &selector.entries {
        let Some(footprint) = catalog.footprint(&entry.structure) else {
            trace!("selector '{}': unknown structure '{}'", selector.name, entry.structure);
            continue;
        };
        if !footprint.fits(size) {
            trace!(
                "selector '{}': '{}' ({}x{}) does not fit region size {}",
                selector.name,
                entry.structure,
                footprint.width(),
                footprint.depth(),
                size.get()
            );
            continue;
        }

        let salt = CANDIDATE_ANCHOR_SALT ^ selector.salt() ^ name_salt(&entry.structure);
        let mut anchor_stream = derive(world_seed, region.x, region.z, salt);
        let anchor = anchor_in_region(region, size, footprint, &mut anchor_stream);

        if !passes_filters(entry, anchor, terrain) {
            continue;
        }

        out.push(Candidate {
            name: entry.structure.clone(),
            weight: entry.effective_weight(),
            chance: entry.chance,
            anchor,
            footprint,
            region,
        });
    }

    out
}

fn passes_filters<T>(entry: &SelectorEntry, anchor: CellPos, terrain: &T) -> bool
where
    T: HeightmapProvider + BiomeSource + ?Sized,
{
    if entry.max_height_diff.is_none() && entry.biomes.is_empty() {
        return true;
    }

    let sample = terrain.height_sample(anchor);
    if let (Some(limit), Some(sample)) = (entry.max_height_diff, sample.as_ref()) {
        if sample.height_difference() > limit {
            return false;
        }
    }

    if entry.biomes.is_empty() {
        return true;
    }

    let bounds = terrain.vertical_bounds();
    let biomes: Vec<BiomeId> = BIOME_SAMPLE_COLUMNS
        .iter()
        .map(|&(x, z)| {
            let y = sample
                .as_ref()
                .map_or((bounds.min + bounds.top()) / 2, |s| {
                    s.height(usize::from(x), usize::from(z))
                });
            let world: IVec3 = anchor.column_to_world(LocalColumn { x, z }, y);
            terrain.biome_at(world)
        })
        .collect();
    entry.biomes.matches(&biomes)
}

/// Index of the picked candidate for a `roll` in `[0, 1)`, or `None` when the
/// roll lands in the leading "none" interval.
///
/// Each weight owns the half-open interval `[start, start + weight)` of the
/// cumulative line, with "none" first. A roll that rounding pushes past the
/// end saturates to the last candidate.
pub fn weighted_pick(weights: &[u32], weight_none: u32, roll: f64) -> Option<usize> {
    if weights.is_empty() {
        return None;
    }

    let total: f64 = f64::from(weight_none) + weights.iter().map(|w| f64::from(*w)).sum::<f64>();
    let point = roll.clamp(0.0, 1.0) * total;
    let mut cumulative = f64::from(weight_none);
    if point < cumulative {
        return None;
    }

    for (index, weight) in weights.iter().enumerate() {
        cumulative += f64::from(*weight);
        if point < cumulative {
            return Some(index);
        }
    }
    Some(weights.len() - 1)
}

pub fn resolve_grid_candidate<T>(
    world_seed: i64,
    region: RegionPos,
    selector: &GridSelector,
    catalog: &StructureCatalog,
    terrain: &T,
) -> Option<Candidate>
where
    T: HeightmapProvider + BiomeSource + ?Sized,
{
    let mut region_stream = derive(
        world_seed,
        region.x,
        region.z,
        REGION_CHANCE_SALT ^ selector.salt(),
    );

    if !region_stream.chance(selector.region_chance) {
        trace!("selector '{}': region {:?} rolled nothing", selector.name, region);
        return None;
    }

    let mut candidates = build_candidates(world_seed, region, selector, catalog, terrain);
    let weights: Vec<u32> = candidates.iter().map(|c| c.weight).collect();
    let picked = weighted_pick(&weights, selector.weight_none, region_stream.next_f64())?;
    let candidate = candidates.swap_remove(picked);

    if !region_stream.chance(candidate.chance) {
        trace!(
            "selector '{}': '{}' vetoed by its own chance in {:?}",
            selector.name,
            candidate.name,
            region
        );
        return None;
    }

    Some(candidate)
}

pub fn candidate_for_cell<T>(
    world_seed: i64,
    cell: CellPos,
    selector: &GridSelector,
    catalog: &StructureCatalog,
    terrain: &T,
) -> Option<Candidate>
where
    T: HeightmapProvider + BiomeSource + ?Sized,
{
    let region = cell.region(selector.region_size);
    resolve_grid_candidate(world_seed, region, selector, catalog, terrain)
}

#[cfg(test)]
mod tests {
    use glam::IVec3;

    use super::{
        build_candidates, resolve_grid_candidate, weighted_pick, BiomeFilter, GridSelector,
        SelectorEntry, StructureCatalog,
    };
    use crate::anchor::Footprint;
    use crate::coords::{CellPos, RegionPos, RegionSize};
    use crate::heightmap::{BiomeId, BiomeSource, HeightSample, HeightmapProvider, VerticalBounds};
    use crate::random::{derive, name_salt, REGION_CHANCE_SALT};

    // Flat land at 64, except a steep strip of cells at x == 3. Biome is
    // "desert" west of world x 0 and "plains" elsewhere.
    struct TestTerrain;

    impl HeightmapProvider for TestTerrain {
        fn height_sample(&self, cell: CellPos) -> Option<HeightSample> {
            if cell.x == 3 {
                Some(HeightSample::from_fn(|x, _| 60 + 2 * x as i32))
            } else {
                Some(HeightSample::flat(64))
            }
        }

        fn vertical_bounds(&self) -> VerticalBounds {
            VerticalBounds::new(0, 256)
        }
    }

    impl BiomeSource for TestTerrain {
        fn biome_at(&self, world_pos: IVec3) -> BiomeId {
            if world_pos.x < 0 {
                BiomeId::new("desert")
            } else {
                BiomeId::new("plains")
            }
        }
    }

    fn size(cells: u32) -> RegionSize {
        RegionSize::new(cells).expect("non-zero region size")
    }

    fn catalog() -> StructureCatalog {
        let mut catalog = StructureCatalog::default();
        catalog.insert("kiosk", Footprint::Single);
        catalog.insert("tower", Footprint::Single);
        catalog.insert("hall", Footprint::Multi { width: 2, depth: 3 });
        catalog.insert("stadium", Footprint::Multi { width: 9, depth: 9 });
        catalog
    }

    #[test]
    fn single_certain_candidate_is_always_selected() {
        let selector = GridSelector::new("scatter", size(16)).with_entry(SelectorEntry::new("kiosk", 1));
        let catalog = catalog();
        for seed in 0..200i64 {
            for (rx, rz) in [(0, 0), (-1, 4), (7, -9)] {
                let picked = resolve_grid_candidate(seed, RegionPos::new(rx, rz), &selector, &catalog, &TestTerrain);
                let picked = picked.expect("certain candidate must be selected");
                assert_eq!(picked.name, "kiosk");
                assert_eq!(picked.region, RegionPos::new(rx, rz));
            }
        }
    }

    #[test]
    fn resolution_is_deterministic_and_order_independent() {
        let mut selector = GridSelector::new("scatter", size(20));
        selector.region_chance = 0.6;
        selector.weight_none = 2;
        selector.entries = vec![SelectorEntry::new("kiosk", 2), SelectorEntry::new("hall", 5)];
        let catalog = catalog();

        let regions: Vec<RegionPos> = (-4..4)
            .flat_map(|x| (-4..4).map(move |z| RegionPos::new(x, z)))
            .collect();
        let forward: Vec<_> = regions
            .iter()
            .map(|r| resolve_grid_candidate(77, *r, &selector, &catalog, &TestTerrain))
            .collect();
        let backward: Vec<_> = regions
            .iter()
            .rev()
            .map(|r| resolve_grid_candidate(77, *r, &selector, &catalog, &TestTerrain))
            .collect();

        assert_eq!(forward, backward.into_iter().rev().collect::<Vec<_>>());
        assert!(forward.iter().any(Option::is_some));
        assert!(forward.iter().any(Option::is_none));
    }

    #[test]
    fn weights_one_to_three_give_matching_distribution() {
        let selector = GridSelector::new("scatter", size(16))
            .with_entry(SelectorEntry::new("kiosk", 1))
            .with_entry(SelectorEntry::new("tower", 3));
        let catalog = catalog();

        let trials = 2000;
        let mut towers = 0;
        for seed in 0..trials {
            let picked = resolve_grid_candidate(seed, RegionPos::new(1, 1), &selector, &catalog, &TestTerrain)
                .expect("weight_none is zero");
            if picked.name == "tower" {
                towers += 1;
            }
        }
        let share = f64::from(towers) / trials as f64;
        assert!((0.70..=0.80).contains(&share), "tower share {share}");
    }

    #[test]
    fn oversized_footprints_are_discarded_before_weighting() {
        let selector = GridSelector::new("scatter", size(8))
            .with_entry(SelectorEntry::new("stadium", 1000))
            .with_entry(SelectorEntry::new("kiosk", 1));
        let catalog = catalog();

        for seed in 0..100i64 {
            let picked = resolve_grid_candidate(seed, RegionPos::new(0, 0), &selector, &catalog, &TestTerrain)
                .expect("kiosk is the only candidate left");
            assert_eq!(picked.name, "kiosk");
        }
    }

    #[test]
    fn unknown_structures_are_skipped() {
        let selector = GridSelector::new("scatter", size(16)).with_entry(SelectorEntry::new("ghost", 1));
        assert!(resolve_grid_candidate(1, RegionPos::new(0, 0), &selector, &catalog(), &TestTerrain).is_none());
    }

    #[test]
    fn anchors_do_not_depend_on_entry_order() {
        let catalog = catalog();
        let a = GridSelector::new("scatter", size(16))
            .with_entry(SelectorEntry::new("kiosk", 1))
            .with_entry(SelectorEntry::new("hall", 1));
        let b = GridSelector::new("scatter", size(16))
            .with_entry(SelectorEntry::new("hall", 1))
            .with_entry(SelectorEntry::new("tower", 4))
            .with_entry(SelectorEntry::new("kiosk", 1));

        for seed in 0..32i64 {
            let region = RegionPos::new(2, -3);
            let from_a = build_candidates(seed, region, &a, &catalog, &TestTerrain);
            let from_b = build_candidates(seed, region, &b, &catalog, &TestTerrain);
            for candidate in &from_a {
                let twin = from_b
                    .iter()
                    .find(|c| c.name == candidate.name)
                    .expect("same structure is present in both selectors");
                assert_eq!(twin.anchor, candidate.anchor);
            }
        }
    }

    #[test]
    fn height_filter_uses_the_anchor_cell() {
        let mut steep_only = SelectorEntry::new("kiosk", 1);
        steep_only.max_height_diff = Some(4);
        // Region size one: the anchor is the region's only cell.
        let selector = GridSelector::new("scatter", size(1)).with_entry(steep_only);
        let catalog = catalog();

        assert!(build_candidates(5, RegionPos::new(3, 0), &selector, &catalog, &TestTerrain).is_empty());
        assert_eq!(build_candidates(5, RegionPos::new(2, 0), &selector, &catalog, &TestTerrain).len(), 1);
    }

    #[test]
    fn biome_rules_combine() {
        let plains = BiomeId::new("plains");
        let desert = BiomeId::new("desert");
        let samples = vec![plains.clone(), plains.clone(), desert.clone()];

        let any = BiomeFilter {
            any: vec![desert.clone()],
            ..BiomeFilter::default()
        };
        let all = BiomeFilter {
            all: vec![plains.clone()],
            ..BiomeFilter::default()
        };
        let excluding = BiomeFilter {
            excluding: vec![desert.clone()],
            ..BiomeFilter::default()
        };

        assert!(any.matches(&samples));
        assert!(!all.matches(&samples));
        assert!(!excluding.matches(&samples));
        assert!(BiomeFilter::default().matches(&samples));
        assert!(all.matches(&[plains.clone()]));
    }

    #[test]
    fn biome_filter_is_evaluated_on_anchor_cell() {
        let mut desert_only = SelectorEntry::new("kiosk", 1);
        desert_only.biomes.all = vec![BiomeId::new("desert")];
        let selector = GridSelector::new("scatter", size(1)).with_entry(desert_only);
        let catalog = catalog();

        assert_eq!(build_candidates(9, RegionPos::new(-1, 0), &selector, &catalog, &TestTerrain).len(), 1);
        assert!(build_candidates(9, RegionPos::new(0, 0), &selector, &catalog, &TestTerrain).is_empty());
    }

    #[test]
    fn weighted_pick_uses_half_open_intervals() {
        // none: [0, 1), a: [1, 2), b: [2, 4)
        assert_eq!(weighted_pick(&[1, 2], 1, 0.0), None);
        assert_eq!(weighted_pick(&[1, 2], 1, 0.25), Some(0));
        assert_eq!(weighted_pick(&[1, 2], 1, 0.4999), Some(0));
        assert_eq!(weighted_pick(&[1, 2], 1, 0.5), Some(1));
        assert_eq!(weighted_pick(&[1, 2], 1, 0.9999), Some(1));
    }

    #[test]
    fn weighted_pick_saturates_and_handles_zero_none() {
        assert_eq!(weighted_pick(&[3, 1], 0, 1.0), Some(1));
        assert_eq!(weighted_pick(&[3, 1], 0, 0.0), Some(0));
        assert_eq!(weighted_pick(&[], 5, 0.3), None);
    }

    #[test]
    fn zero_and_negative_weights_are_floored() {
        assert_eq!(SelectorEntry::new("kiosk", 0).effective_weight(), 1);
        assert_eq!(SelectorEntry::new("kiosk", -7).effective_weight(), 1);
        assert_eq!(SelectorEntry::new("kiosk", 6).effective_weight(), 6);
    }

    #[test]
    fn candidate_chance_vetoes_after_pick() {
        let mut never = SelectorEntry::new("kiosk", 1);
        never.chance = 0.0;
        let selector = GridSelector::new("scatter", size(16)).with_entry(never);
        let catalog = catalog();
        for seed in 0..50i64 {
            assert!(resolve_grid_candidate(seed, RegionPos::new(0, 0), &selector, &catalog, &TestTerrain).is_none());
        }
    }

    #[test]
    fn zero_region_chance_never_places() {
        let mut selector = GridSelector::new("scatter", size(16)).with_entry(SelectorEntry::new("kiosk", 1));
        selector.region_chance = 0.0;
        let catalog = catalog();
        for seed in 0..50i64 {
            assert!(resolve_grid_candidate(seed, RegionPos::new(4, 4), &selector, &catalog, &TestTerrain).is_none());
        }
    }

    #[test]
    fn region_stream_is_drawn_chance_then_pick_then_veto() {
        let mut kiosk = SelectorEntry::new("kiosk", 3);
        kiosk.chance = 0.8;
        let mut hall = SelectorEntry::new("hall", 2);
        hall.chance = 0.5;
        let mut selector = GridSelector::new("scatter", size(16))
            .with_entry(kiosk)
            .with_entry(hall);
        selector.region_chance = 0.7;
        selector.weight_none = 1;
        let catalog = catalog();

        let mut placed = 0;
        let mut vetoed = 0;
        for seed in 0..600i64 {
            let region = RegionPos::new((seed % 7) as i32, -3);
            let mut stream = derive(seed, region.x, region.z, REGION_CHANCE_SALT ^ name_salt("scatter"));

            let mut expected = None;
            if stream.chance(selector.region_chance) {
                let mut candidates = build_candidates(seed, region, &selector, &catalog, &TestTerrain);
                let weights: Vec<u32> = candidates.iter().map(|c| c.weight).collect();
                if let Some(index) = weighted_pick(&weights, selector.weight_none, stream.next_f64()) {
                    let candidate = candidates.swap_remove(index);
                    if stream.chance(candidate.chance) {
                        placed += 1;
                        expected = Some(candidate);
                    } else {
                        vetoed += 1;
                    }
                    assert_eq!(stream.draws(), 3);
                }
            }

            let resolved = resolve_grid_candidate(seed, region, &selector, &catalog, &TestTerrain);
            assert_eq!(resolved, expected, "seed {seed}");
        }
        assert!(placed > 0);
        assert!(vetoed > 0);
    }
}
