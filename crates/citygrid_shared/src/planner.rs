use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::anchor::{resolve_anchor_participation, FootprintPart};
use crate::candidate::{candidate_for_cell, GridSelector, StructureCatalog};
use crate::city::{CellKind, CityLayout, CityParams};
use crate::coords::{index_to_column, CellPos, Direction, CELL_AREA};
use crate::embed::{embed_column, EmbedAction, EmbedLimits};
use crate::fallback::FallbackChain;
use crate::heightmap::{BiomeSource, HeightmapProvider, NeighborInfo, NeighborSummary};
use crate::surface::{
    corner_value, side_anchor, solve, CornerValues, NeighborAnchor, SideAnchors, SurfaceInput,
    SurfaceKind, SurfaceParams, SurfaceTargetGrid,
};

#[derive(Clone, Debug)]
pub struct PlannerSettings {
    pub world_seed: i64,
    pub surface: SurfaceParams,
    pub embed: EmbedLimits,
    pub city: CityParams,
    pub selectors: Vec<GridSelector>,
    pub catalog: StructureCatalog,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StructurePlacement {
    pub selector: String,
    pub structure: String,
    pub anchor: CellPos,
    pub part: FootprintPart,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellPlan {
    pub cell: CellPos,
    pub kind: CellKind,
    pub ground_level: Option<i32>,
    pub structures: Vec<StructurePlacement>,
    pub targets: Option<SurfaceTargetGrid>,
    pub columns: Vec<EmbedAction>,
}

impl CellPlan {
    pub fn moved_blocks(&self) -> u64 {
        self.columns.iter().map(|a| u64::from(a.block_count())).sum()
    }
}

#[derive(Clone, Debug, PartialEq)]
struct CellSummary {
    kind: CellKind,
    flat: Option<i32>,
    structures: Vec<StructurePlacement>,
}

pub struct CellPlanner<'a, T: ?Sized> {
    settings: &'a PlannerSettings,
    terrain: &'a T,
    layout: CityLayout<'a, T>,
}

impl<'a, T> CellPlanner<'a, T>
where
    T: HeightmapProvider + BiomeSource + ?Sized,
{
    pub fn new(settings: &'a PlannerSettings, terrain: &'a T) -> Self {
        Self {
            settings,
            terrain,
            layout: CityLayout::new(settings.world_seed, settings.city, terrain),
        }
    }

    pub fn layout(&self) -> &CityLayout<'a, T> {
        &self.layout
    }

    pub fn structures_at(&self, cell: CellPos) -> Vec<StructurePlacement> {
        let mut placements = Vec::new();
        for selector in &self.settings.selectors {
            let Some(candidate) = candidate_for_cell(
                self.settings.world_seed,
                cell,
                selector,
                &self.settings.catalog,
                self.terrain,
            ) else {
                continue;
            };
            if let Some(part) = resolve_anchor_participation(cell, &candidate).part() {
                placements.push(StructurePlacement {
                    selector: selector.name.clone(),
                    structure: candidate.name,
                    anchor: candidate.anchor,
                    part,
                });
            }
        }
        placements
    }

    fn summary(&self, cell: CellPos) -> CellSummary {
        let structures = self.structures_at(cell);
        if let Some(first) = structures.first() {
            let flat = self.layout.ground_level(first.anchor);
            return CellSummary {
                kind: CellKind::Building,
                flat: Some(flat),
                structures,
            };
        }

        let kind = self.layout.cell_kind(cell);
        let flat = (kind != CellKind::Wild).then(|| self.layout.ground_level(cell));
        CellSummary {
            kind,
            flat,
            structures,
        }
    }

    pub fn compute_surface_targets(
        &self,
        cell: CellPos,
        is_building_cell: bool,
        flat_ground_level: i32,
    ) -> SurfaceTargetGrid {
        let kind = if is_building_cell {
            SurfaceKind::Building
        } else {
            SurfaceKind::Street
        };
        let input = surface_input(
            cell,
            kind,
            flat_ground_level,
            self,
            self.terrain,
            &self.settings.surface,
        );
        solve(&input, &self.settings.surface, self.terrain.vertical_bounds())
    }

    pub fn plan_cell(&self, cell: CellPos) -> CellPlan {
        let summary = self.summary(cell);
        let bounds = self.terrain.vertical_bounds();

        let targets = summary.flat.map(|flat| {
            self.compute_surface_targets(cell, summary.kind == CellKind::Building, flat)
        });

        let mut columns = Vec::new();
        if let (Some(targets), Some(sample)) = (targets.as_ref(), self.terrain.height_sample(cell)) {
            columns.reserve_exact(CELL_AREA);
            for index in 0..CELL_AREA {
                let local = index_to_column(index);
                let (x, z) = (usize::from(local.x), usize::from(local.z));
                columns.push(embed_column(
                    sample.height(x, z),
                    targets.get(x, z),
                    self.settings.embed,
                    bounds,
                ));
            }
        }

        debug!(
            "planned cell ({}, {}): {:?}, level {:?}, {} structure part(s)",
            cell.x,
            cell.z,
            summary.kind,
            summary.flat,
            summary.structures.len()
        );

        CellPlan {
            cell,
            kind: summary.kind,
            ground_level: summary.flat,
            structures: summary.structures,
            targets,
            columns,
        }
    }
}

impl<T> NeighborInfo for CellPlanner<'_, T>
where
    T: HeightmapProvider + BiomeSource + ?Sized,
{
    fn neighbor_summary(&self, cell: CellPos) -> Option<NeighborSummary> {
        let summary = self.summary(cell);
        Some(match summary.flat {
            Some(flat) => NeighborSummary {
                is_city_cell: true,
                flat_ground_level: flat,
            },
            None => NeighborSummary {
                is_city_cell: false,
                flat_ground_level: self.layout.ground_level(cell),
            },
        })
    }
}

pub fn surface_input<N, H>(
    cell: CellPos,
    kind: SurfaceKind,
    flat: i32,
    neighbors: &N,
    heights: &H,
    params: &SurfaceParams,
) -> SurfaceInput
where
    N: NeighborInfo + ?Sized,
    H: HeightmapProvider + ?Sized,
{
    let own_sample = heights.height_sample(cell);
    let mut sides = SideAnchors::default();

    for side in Direction::ALL {
        let chain = FallbackChain::<CellPos, NeighborAnchor>::new("side anchor")
            .then("flat_neighbor", |n| {
                neighbors
                    .neighbor_summary(*n)
                    .filter(|s| s.is_city_cell)
                    .map(|s| NeighborAnchor::City {
                        flat_ground_level: s.flat_ground_level,
                    })
            })
            .then("neighbor_edge_terrain", |n| {
                heights.height_sample(*n).map(|s| NeighborAnchor::Terrain {
                    natural_height: s.edge_average(side.opposite()),
                })
            })
            .then("own_edge_terrain", |_| {
                own_sample.as_ref().map(|s| NeighborAnchor::Terrain {
                    natural_height: s.edge_average(side),
                })
            });

        let anchor = chain.resolve_or(
            &cell.neighbor(side),
            NeighborAnchor::Terrain {
                natural_height: flat,
            },
        );
        sides.set(side, side_anchor(flat, anchor, params));
    }

    let city_levels = |dx: i32, dz: i32| -> Vec<i32> {
        let mut levels = vec![flat];
        for offset in [CellPos::new(dx, 0), CellPos::new(0, dz), CellPos::new(dx, dz)] {
            if let Some(summary) = neighbors.neighbor_summary(cell + offset) {
                if summary.is_city_cell {
                    levels.push(summary.flat_ground_level);
                }
            }
        }
        levels
    };

    let corners = CornerValues {
        north_west: corner_value(sides.west, sides.north, &city_levels(-1, -1)),
        north_east: corner_value(sides.east, sides.north, &city_levels(1, -1)),
        south_west: corner_value(sides.west, sides.south, &city_levels(-1, 1)),
        south_east: corner_value(sides.east, sides.south, &city_levels(1, 1)),
    };

    SurfaceInput {
        kind,
        flat_level: flat,
        sides,
        corners,
    }
}
