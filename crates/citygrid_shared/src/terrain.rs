use glam::IVec3;
use noise::{NoiseFn, Perlin};

use crate::coords::{CellPos, LocalColumn};
use crate::heightmap::{BiomeId, BiomeSource, HeightSample, HeightmapProvider, VerticalBounds};

const HEIGHT_OFFSET: f64 = 68.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Biome {
    Desert,
    Plains,
    Forest,
    Snowy,
    Taiga,
    Jungle,
    Savanna,
    Badlands,
    Mountain,
    Swamp,
    Ocean,
}

impl Biome {
    fn id(self) -> &'static str {
        match self {
            Biome::Desert => "desert",
            Biome::Plains => "plains",
            Biome::Forest => "forest",
            Biome::Snowy => "snowy",
            Biome::Taiga => "taiga",
            Biome::Jungle => "jungle",
            Biome::Savanna => "savanna",
            Biome::Badlands => "badlands",
            Biome::Mountain => "mountain",
            Biome::Swamp => "swamp",
            Biome::Ocean => "ocean",
        }
    }
}

#[derive(Clone)]
pub struct NoiseTerrain {
    seed: u64,
    bounds: VerticalBounds,
    terrain: Perlin,
    temperature: Perlin,
    humidity: Perlin,
}

impl NoiseTerrain {
    pub fn new(seed: u64, bounds: VerticalBounds) -> Self {
        Self {
            seed,
            bounds,
            terrain: Perlin::new(seed as u32),
            temperature: Perlin::new(seed.wrapping_add(3) as u32),
            humidity: Perlin::new(seed.wrapping_add(7) as u32),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn sample_climate(&self, world_x: i32, world_z: i32) -> (f64, f64) {
        let wx = f64::from(world_x);
        let wz = f64::from(world_z);
        let warp_x = self.temperature.get([wx * 0.0008 + 91.0, wz * 0.0008 - 47.0]) * 40.0;
        let warp_z = self.humidity.get([wx * 0.0009 - 77.0, wz * 0.0009 + 113.0]) * 40.0;
        let climate_x = wx + warp_x;
        let climate_z = wz + warp_z;
        let temperature = self.temperature.get([climate_x * 0.0018, climate_z * 0.0018]);
        let humidity = self.humidity.get([climate_x * 0.0022, climate_z * 0.0022]);
        (temperature, humidity)
    }

    fn biome_from_climate(temperature: f64, humidity: f64) -> Biome {
        if temperature < -0.4 {
            if humidity > 0.1 {
                Biome::Taiga
            } else {
                Biome::Snowy
            }
        } else if temperature < 0.1 {
            if humidity > 0.4 {
                Biome::Swamp
            } else if humidity > 0.0 {
                Biome::Forest
            } else if humidity < -0.4 {
                Biome::Mountain
            } else {
                Biome::Plains
            }
        } else if temperature < 0.4 {
            if humidity > 0.3 {
                Biome::Jungle
            } else {
                Biome::Savanna
            }
        } else if humidity > 0.3 {
            Biome::Ocean
        } else if humidity > 0.0 {
            Biome::Badlands
        } else {
            Biome::Desert
        }
    }

    fn surface_height(&self, world_x: i32, world_z: i32, temperature: f64, humidity: f64) -> i32 {
        let wx = f64::from(world_x);
        let wz = f64::from(world_z);

        let coarse = self.terrain.get([wx * 0.008, wz * 0.008]);
        let detail = self.terrain.get([wx * 0.032 + 101.3, wz * 0.032 - 73.7]) * 0.35;
        let ridge = (1.0 - self.terrain.get([wx * 0.004 + 401.0, wz * 0.004 - 257.0]).abs()).powf(1.7);

        let temp01 = ((temperature + 1.0) * 0.5).clamp(0.0, 1.0);
        let humid01 = ((humidity + 1.0) * 0.5).clamp(0.0, 1.0);
        let mountain_factor = ((1.0 - temp01) * (1.0 - humid01)).powf(0.8);
        let plains_factor = (1.0 - (temp01 - 0.5).abs() * 1.8).max(0.0);
        let height_multiplier = (0.75 + plains_factor * 0.45 + mountain_factor * 1.35).clamp(0.45, 2.6);

        let height = coarse * 22.0 * height_multiplier
            + detail * 10.0 * (0.7 + plains_factor * 0.3)
            + ridge * 14.0 * (0.45 + mountain_factor * 0.9)
            + HEIGHT_OFFSET;
        self.bounds.clamp(height.round() as i32)
    }
}

impl HeightmapProvider for NoiseTerrain {
    fn height_sample(&self, cell: CellPos) -> Option<HeightSample> {
        Some(HeightSample::from_fn(|x, z| {
            let world = cell.column_to_world(
                LocalColumn {
                    x: x as u8,
                    z: z as u8,
                },
                0,
            );
            let (temperature, humidity) = self.sample_climate(world.x, world.z);
            self.surface_height(world.x, world.z, temperature, humidity)
        }))
    }

    fn vertical_bounds(&self) -> VerticalBounds {
        self.bounds
    }
}

impl BiomeSource for NoiseTerrain {
    fn biome_at(&self, world_pos: IVec3) -> BiomeId {
        let (temperature, humidity) = self.sample_climate(world_pos.x, world_pos.z);
        BiomeId::new(Self::biome_from_climate(temperature, humidity).id())
    }
}
