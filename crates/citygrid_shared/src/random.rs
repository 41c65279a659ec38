use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const GRID_X_MULTIPLIER: i64 = 341_873_128_712;
const GRID_Z_MULTIPLIER: i64 = 132_897_987_541;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

pub const REGION_CHANCE_SALT: i64 = 0x2f6b_1d3a_90c4_0001;
pub const CANDIDATE_ANCHOR_SALT: i64 = 0x2f6b_1d3a_90c4_0002;
pub const CITY_SPHERE_SALT: i64 = 0x2f6b_1d3a_90c4_0003;
pub const CELL_KIND_SALT: i64 = 0x2f6b_1d3a_90c4_0004;

pub fn mix_seed(world_seed: i64, gx: i32, gz: i32, salt: i64) -> u64 {
    let mixed = world_seed
        ^ i64::from(gx).wrapping_mul(GRID_X_MULTIPLIER)
        ^ i64::from(gz).wrapping_mul(GRID_Z_MULTIPLIER)
        ^ salt;
    mixed as u64
}

pub fn derive(world_seed: i64, gx: i32, gz: i32, salt: i64) -> RandomStream {
    RandomStream {
        rng: StdRng::seed_from_u64(mix_seed(world_seed, gx, gz, salt)),
        draws: 0,
    }
}

pub fn name_salt(name: &str) -> i64 {
    let hash = name.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    });
    hash as i64
}

#[derive(Debug, Clone)]
pub struct RandomStream {
    rng: StdRng,
    draws: u32,
}

impl RandomStream {
    pub fn next_f64(&mut self) -> f64 {
        self.draws += 1;
        self.rng.gen::<f64>()
    }

    pub fn next_below(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        self.draws += 1;
        self.rng.gen_range(0..bound)
    }

    pub fn next_in_inclusive(&mut self, low: i32, high: i32) -> i32 {
        if high <= low {
            return low;
        }
        self.draws += 1;
        self.rng.gen_range(low..=high)
    }

    pub fn chance(&mut self, probability: f64) -> bool {
        self.next_f64() < probability
    }

    pub fn draws(&self) -> u32 {
        self.draws
    }
}
