//! Per-cell target surface: a flat city plateau blended toward whatever the
//! four neighbors expose at the shared boundaries.
//!
//! Boundary values are a function of both sides of the boundary only, so two
//! city cells computing their grids independently agree on every shared edge.

use serde::{Deserialize, Serialize};

use crate::coords::{Direction, CELL_MAX, CELL_SIZE};
use crate::heightmap::VerticalBounds;

const STREET_PLATEAU_MIN: usize = 4;
const STREET_PLATEAU_MAX: usize = 12;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceKind {
    Street,
    Building,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SurfaceParams {
    pub max_step: i32,
    pub relaxation_passes: u32,
    pub terrain_blend: f64,
    pub street_plateau_blend: f64,
    pub apron_inset: usize,
    pub apron_max_drop: i32,
}

impl Default for SurfaceParams {
    fn default() -> Self {
        Self {
            max_step: 1,
            relaxation_passes: 8,
            terrain_blend: 0.65,
            street_plateau_blend: 0.7,
            apron_inset: 4,
            apron_max_drop: 6,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NeighborAnchor {
    City { flat_ground_level: i32 },
    Terrain { natural_height: i32 },
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SideAnchors {
    pub west: i32,
    pub east: i32,
    pub north: i32,
    pub south: i32,
}

impl SideAnchors {
    pub fn get(&self, side: Direction) -> i32 {
        match side {
            Direction::West => self.west,
            Direction::East => self.east,
            Direction::North => self.north,
            Direction::South => self.south,
        }
    }

    pub fn set(&mut self, side: Direction, value: i32) {
        match side {
            Direction::West => self.west = value,
            Direction::East => self.east = value,
            Direction::North => self.north = value,
            Direction::South => self.south = value,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CornerValues {
    pub north_west: i32,
    pub north_east: i32,
    pub south_west: i32,
    pub south_east: i32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SurfaceInput {
    pub kind: SurfaceKind,
    pub flat_level: i32,
    pub sides: SideAnchors,
    pub corners: CornerValues,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceTargetGrid {
    heights: [[i32; CELL_SIZE]; CELL_SIZE],
}

impl SurfaceTargetGrid {
    pub fn filled(height: i32) -> Self {
        Self {
            heights: [[height; CELL_SIZE]; CELL_SIZE],
        }
    }

    pub fn get(&self, x: usize, z: usize) -> i32 {
        self.heights[x][z]
    }

    pub fn edge(&self, side: Direction) -> [i32; CELL_SIZE] {
        let mut out = [0; CELL_SIZE];
        for (i, value) in out.iter_mut().enumerate() {
            *value = match side {
                Direction::West => self.heights[0][i],
                Direction::East => self.heights[CELL_MAX][i],
                Direction::North => self.heights[i][0],
                Direction::South => self.heights[i][CELL_MAX],
            };
        }
        out
    }

    pub fn min(&self) -> i32 {
        self.heights.iter().flatten().copied().min().unwrap_or_default()
    }

    pub fn max(&self) -> i32 {
        self.heights.iter().flatten().copied().max().unwrap_or_default()
    }
}

fn round_to_i32(value: f64) -> i32 {
    value.round() as i32
}

pub fn side_anchor(own_flat: i32, neighbor: NeighborAnchor, params: &SurfaceParams) -> i32 {
    match neighbor {
        NeighborAnchor::City { flat_ground_level } => {
            round_to_i32(f64::from(own_flat + flat_ground_level) / 2.0)
        }
        NeighborAnchor::Terrain { natural_height } => {
            let blend = params.terrain_blend.clamp(0.0, 1.0);
            round_to_i32(f64::from(own_flat) * (1.0 - blend) + f64::from(natural_height) * blend)
        }
    }
}

pub fn corner_value(side_a: i32, side_b: i32, city_levels: &[i32]) -> i32 {
    if city_levels.len() >= 2 {
        let sum: i32 = city_levels.iter().sum();
        round_to_i32(f64::from(sum) / city_levels.len() as f64)
    } else {
        round_to_i32(f64::from(side_a + side_b) / 2.0)
    }
}

pub fn solve(input: &SurfaceInput, params: &SurfaceParams, bounds: VerticalBounds) -> SurfaceTargetGrid {
    let mut grid = [[0i32; CELL_SIZE]; CELL_SIZE];
    let corners = &input.corners;
    let flat = f64::from(input.flat_level);

    for (x, column) in grid.iter_mut().enumerate() {
        let fx = x as f64 / CELL_MAX as f64;
        for (z, value) in column.iter_mut().enumerate() {
            let fz = z as f64 / CELL_MAX as f64;
            let interpolated = f64::from(corners.north_west) * (1.0 - fx) * (1.0 - fz)
                + f64::from(corners.north_east) * fx * (1.0 - fz)
                + f64::from(corners.south_west) * (1.0 - fx) * fz
                + f64::from(corners.south_east) * fx * fz;

            let shaped = match input.kind {
                SurfaceKind::Street => street_value(x, z, interpolated, flat, params),
                SurfaceKind::Building => building_value(x, z, &input.sides, flat, params),
            };
            *value = round_to_i32(shaped);
        }
    }

    lock_edges(&mut grid, input);
    relax(&mut grid, params);
    lock_edges(&mut grid, input);

    for value in grid.iter_mut().flatten() {
        *value = bounds.clamp(*value);
    }

    SurfaceTargetGrid { heights: grid }
}

fn street_value(x: usize, z: usize, interpolated: f64, flat: f64, params: &SurfaceParams) -> f64 {
    let plateau = STREET_PLATEAU_MIN..STREET_PLATEAU_MAX;
    if plateau.contains(&x) && plateau.contains(&z) {
        let blend = params.street_plateau_blend.clamp(0.0, 1.0);
        interpolated * (1.0 - blend) + flat * blend
    } else {
        interpolated
    }
}

fn building_value(x: usize, z: usize, sides: &SideAnchors, flat: f64, params: &SurfaceParams) -> f64 {
    let (distance, side) = nearest_side(x, z);
    if params.apron_inset == 0 || distance >= params.apron_inset {
        return flat;
    }

    // The apron ramps from the plateau down to the anchor of the closest edge.
    let edge = f64::from(sides.get(side));
    let t = distance as f64 / params.apron_inset as f64;
    let apron = edge + (flat - edge) * t;
    apron.clamp(flat - f64::from(params.apron_max_drop.max(0)), flat)
}

fn nearest_side(x: usize, z: usize) -> (usize, Direction) {
    let distances = [
        (x, Direction::West),
        (CELL_MAX - x, Direction::East),
        (z, Direction::North),
        (CELL_MAX - z, Direction::South),
    ];
    let mut nearest = distances[0];
    for candidate in &distances[1..] {
        if candidate.0 < nearest.0 {
            nearest = *candidate;
        }
    }
    nearest
}

fn lock_edges(grid: &mut [[i32; CELL_SIZE]; CELL_SIZE], input: &SurfaceInput) {
    let sides = &input.sides;
    for i in 1..CELL_MAX {
        grid[0][i] = sides.west;
        grid[CELL_MAX][i] = sides.east;
        grid[i][0] = sides.north;
        grid[i][CELL_MAX] = sides.south;
    }

    let corners = &input.corners;
    grid[0][0] = corners.north_west;
    grid[CELL_MAX][0] = corners.north_east;
    grid[0][CELL_MAX] = corners.south_west;
    grid[CELL_MAX][CELL_MAX] = corners.south_east;
}

fn relax(grid: &mut [[i32; CELL_SIZE]; CELL_SIZE], params: &SurfaceParams) {
    let step = params.max_step.max(1);
    for _ in 0..params.relaxation_passes {
        let mut changed = false;
        for x in 1..CELL_MAX {
            for z in 1..CELL_MAX {
                let neighbors = [grid[x - 1][z], grid[x + 1][z], grid[x][z - 1], grid[x][z + 1]];
                let low = neighbors.iter().max().copied().unwrap_or_default() - step;
                let high = neighbors.iter().min().copied().unwrap_or_default() + step;
                // Neighbors further apart than two steps cannot all be satisfied;
                // settle between them and let later passes spread the difference.
                let value = if low <= high {
                    grid[x][z].clamp(low, high)
                } else {
                    (low + high).div_euclid(2)
                };
                if value != grid[x][z] {
                    grid[x][z] = value;
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }
}
