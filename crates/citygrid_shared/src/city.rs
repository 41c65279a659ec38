use serde::{Deserialize, Serialize};

use crate::coords::{CellPos, RegionPos, RegionSize};
use crate::fallback::FallbackChain;
use crate::heightmap::HeightmapProvider;
use crate::random::{derive, CELL_KIND_SALT, CITY_SPHERE_SALT};
use crate::surface::SurfaceKind;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellKind {
    Wild,
    Street,
    Building,
}

impl CellKind {
    pub fn surface(self) -> Option<SurfaceKind> {
        match self {
            CellKind::Wild => None,
            CellKind::Street => Some(SurfaceKind::Street),
            CellKind::Building => Some(SurfaceKind::Building),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CityParams {
    pub region_size: RegionSize,
    pub city_chance: f64,
    pub min_radius: u32,
    pub max_radius: u32,
    pub ground_base: i32,
    pub level_step: i32,
    pub max_levels: i32,
    pub building_chance: f64,
}

impl CityParams {
    pub fn with_region_size(region_size: RegionSize) -> Self {
        Self {
            region_size,
            city_chance: 0.5,
            min_radius: 4,
            max_radius: 8,
            ground_base: 64,
            level_step: 6,
            max_levels: 4,
            building_chance: 0.6,
        }
    }

    pub fn quantize(&self, natural: i32) -> i32 {
        let step = self.level_step.max(1);
        let level = (f64::from(natural - self.ground_base) / f64::from(step)).round() as i32;
        self.ground_base + level.clamp(0, self.max_levels.max(0)) * step
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CitySphere {
    pub center: CellPos,
    pub radius: u32,
}

impl CitySphere {
    pub fn contains(&self, cell: CellPos) -> bool {
        let dx = i64::from(cell.x - self.center.x);
        let dz = i64::from(cell.z - self.center.z);
        let r = i64::from(self.radius);
        dx * dx + dz * dz <= r * r
    }
}

pub struct CityLayout<'a, H: ?Sized> {
    world_seed: i64,
    params: CityParams,
    heights: &'a H,
}

impl<'a, H: HeightmapProvider + ?Sized> CityLayout<'a, H> {
    pub fn new(world_seed: i64, params: CityParams, heights: &'a H) -> Self {
        Self {
            world_seed,
            params,
            heights,
        }
    }

    pub fn params(&self) -> &CityParams {
        &self.params
    }

    pub fn sphere(&self, region: RegionPos) -> Option<CitySphere> {
        let size = self.params.region_size;
        let mut stream = derive(self.world_seed, region.x, region.z, CITY_SPHERE_SALT);
        if !stream.chance(self.params.city_chance) {
            return None;
        }

        let span = size.get() as u32;
        let origin = region.origin_cell(size);
        let center = origin
            + CellPos::new(
                stream.next_below(span) as i32,
                stream.next_below(span) as i32,
            );
        let max_radius = self.params.max_radius.min(span);
        let min_radius = self.params.min_radius.min(max_radius);
        let radius = stream.next_in_inclusive(min_radius as i32, max_radius as i32) as u32;
        Some(CitySphere { center, radius })
    }

    pub fn is_city_cell(&self, cell: CellPos) -> bool {
        self.sphere_covering(cell).is_some()
    }

    pub fn sphere_covering(&self, cell: CellPos) -> Option<CitySphere> {
        let region = cell.region(self.params.region_size);
        (-1..=1)
            .flat_map(|dz| (-1..=1).map(move |dx| RegionPos::new(region.x + dx, region.z + dz)))
            .filter_map(|r| self.sphere(r))
            .find(|sphere| sphere.contains(cell))
    }

    pub fn ground_level(&self, cell: CellPos) -> i32 {
        let chain = FallbackChain::<CellPos, i32>::new("ground level")
            .then("own_heightmap", |cell| {
                self.heights.height_sample(*cell).map(|s| s.average())
            })
            .then("sphere_center_heightmap", |cell| {
                let sphere = self.sphere_covering(*cell)?;
                self.heights.height_sample(sphere.center).map(|s| s.average())
            });

        let natural = chain.resolve_or(&cell, self.params.ground_base);
        self.params.quantize(natural)
    }

    pub fn cell_kind(&self, cell: CellPos) -> CellKind {
        if !self.is_city_cell(cell) {
            return CellKind::Wild;
        }
        let mut stream = derive(self.world_seed, cell.x, cell.z, CELL_KIND_SALT);
        if stream.chance(self.params.building_chance) {
            CellKind::Building
        } else {
            CellKind::Street
        }
    }
}
