use std::fmt;

use glam::IVec3;
use serde::{Deserialize, Serialize};

use crate::coords::{CellPos, Direction, CELL_MAX, CELL_SIZE};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeightSample {
    heights: [[i32; CELL_SIZE]; CELL_SIZE],
    min: i32,
    max: i32,
    average: i32,
}

impl HeightSample {
    pub fn new(heights: [[i32; CELL_SIZE]; CELL_SIZE]) -> Self {
        let mut min = i32::MAX;
        let mut max = i32::MIN;
        let mut sum = 0i64;
        for row in &heights {
            for &h in row {
                min = min.min(h);
                max = max.max(h);
                sum += i64::from(h);
            }
        }
        let average = (sum as f64 / (CELL_SIZE * CELL_SIZE) as f64).round() as i32;
        Self {
            heights,
            min,
            max,
            average,
        }
    }

    pub fn flat(height: i32) -> Self {
        Self::new([[height; CELL_SIZE]; CELL_SIZE])
    }

    pub fn from_fn(mut height_at: impl FnMut(usize, usize) -> i32) -> Self {
        let mut heights = [[0i32; CELL_SIZE]; CELL_SIZE];
        for (z, row) in heights.iter_mut().enumerate() {
            for (x, h) in row.iter_mut().enumerate() {
                *h = height_at(x, z);
            }
        }
        Self::new(heights)
    }

    pub fn height(&self, x: usize, z: usize) -> i32 {
        self.heights[z][x]
    }

    pub fn min(&self) -> i32 {
        self.min
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    pub fn average(&self) -> i32 {
        self.average
    }

    pub fn height_difference(&self) -> i32 {
        self.max - self.min
    }

    pub fn edge_average(&self, side: Direction) -> i32 {
        let sum: i32 = (0..CELL_SIZE)
            .map(|i| match side {
                Direction::West => self.heights[i][0],
                Direction::East => self.heights[i][CELL_MAX],
                Direction::North => self.heights[0][i],
                Direction::South => self.heights[CELL_MAX][i],
            })
            .sum();
        (f64::from(sum) / CELL_SIZE as f64).round() as i32
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborSummary {
    pub is_city_cell: bool,
    pub flat_ground_level: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BiomeId(pub String);

impl BiomeId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BiomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerticalBounds {
    pub min: i32,
    pub max_exclusive: i32,
}

impl VerticalBounds {
    pub fn new(min: i32, max_exclusive: i32) -> Self {
        Self {
            min,
            max_exclusive: max_exclusive.max(min + 1),
        }
    }

    pub fn top(&self) -> i32 {
        self.max_exclusive - 1
    }

    pub fn clamp(&self, y: i32) -> i32 {
        y.clamp(self.min, self.top())
    }

    pub fn contains(&self, y: i32) -> bool {
        (self.min..self.max_exclusive).contains(&y)
    }
}

impl Default for VerticalBounds {
    fn default() -> Self {
        Self::new(-64, 320)
    }
}

pub trait HeightmapProvider {
    fn height_sample(&self, cell: CellPos) -> Option<HeightSample>;

    fn vertical_bounds(&self) -> VerticalBounds;
}

pub trait BiomeSource {
    fn biome_at(&self, world_pos: IVec3) -> BiomeId;
}

pub trait NeighborInfo {
    fn neighbor_summary(&self, cell: CellPos) -> Option<NeighborSummary>;
}

impl<T: HeightmapProvider + ?Sized> HeightmapProvider for &T {
    fn height_sample(&self, cell: CellPos) -> Option<HeightSample> {
        (**self).height_sample(cell)
    }

    fn vertical_bounds(&self) -> VerticalBounds {
        (**self).vertical_bounds()
    }
}

impl<T: BiomeSource + ?Sized> BiomeSource for &T {
    fn biome_at(&self, world_pos: IVec3) -> BiomeId {
        (**self).biome_at(world_pos)
    }
}

#[cfg(test)]
mod tests {
    use super::{HeightSample, VerticalBounds};
    use crate::coords::Direction;

    #[test]
    fn summary_is_derived_from_heights() {
        let sample = HeightSample::from_fn(|x, z| 60 + x as i32 + z as i32);
        assert_eq!(sample.min(), 60);
        assert_eq!(sample.max(), 90);
        assert_eq!(sample.average(), 75);
        assert_eq!(sample.height_difference(), 30);
        assert_eq!(sample.height(3, 4), 67);
    }

    #[test]
    fn edge_average_reads_the_matching_boundary() {
        let sample = HeightSample::from_fn(|x, _| 50 + x as i32);
        assert_eq!(sample.edge_average(Direction::West), 50);
        assert_eq!(sample.edge_average(Direction::East), 65);
        // x runs 0..16 along the north edge: mean of 50..=65 is 57.5.
        assert_eq!(sample.edge_average(Direction::North), 58);
    }

    #[test]
    fn vertical_bounds_clamp_to_inclusive_top() {
        let bounds = VerticalBounds::new(0, 128);
        assert_eq!(bounds.clamp(-5), 0);
        assert_eq!(bounds.clamp(128), 127);
        assert_eq!(bounds.clamp(64), 64);
        assert!(bounds.contains(127));
        assert!(!bounds.contains(128));

        let degenerate = VerticalBounds::new(10, 3);
        assert_eq!(degenerate.top(), 10);
    }
}
