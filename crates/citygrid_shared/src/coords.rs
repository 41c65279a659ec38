use std::num::NonZeroU32;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use glam::IVec3;
use serde::{Deserialize, Serialize};

pub const CELL_SIZE: usize = 16;
pub const CELL_AREA: usize = CELL_SIZE * CELL_SIZE;

pub const CELL_MAX: usize = CELL_SIZE - 1;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellPos {
    pub x: i32,
    pub z: i32,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalColumn {
    pub x: u8,
    pub z: u8,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionPos {
    pub x: i32,
    pub z: i32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct RegionSize(NonZeroU32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    West,
    East,
    North,
    South,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::West,
        Direction::East,
        Direction::North,
        Direction::South,
    ];

    pub fn offset(self) -> CellPos {
        match self {
            Direction::West => CellPos { x: -1, z: 0 },
            Direction::East => CellPos { x: 1, z: 0 },
            Direction::North => CellPos { x: 0, z: -1 },
            Direction::South => CellPos { x: 0, z: 1 },
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::West => Direction::East,
            Direction::East => Direction::West,
            Direction::North => Direction::South,
            Direction::South => Direction::North,
        }
    }
}

impl CellPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn neighbor(self, direction: Direction) -> CellPos {
        self + direction.offset()
    }

    pub fn region(self, size: RegionSize) -> RegionPos {
        let size = size.get();
        RegionPos {
            x: self.x.div_euclid(size),
            z: self.z.div_euclid(size),
        }
    }

    pub fn column_to_world(self, local: LocalColumn, y: i32) -> IVec3 {
        let size = CELL_SIZE as i32;
        IVec3::new(
            self.x * size + i32::from(local.x),
            y,
            self.z * size + i32::from(local.z),
        )
    }
}

impl Add for CellPos {
    type Output = CellPos;

    fn add(self, rhs: Self) -> Self::Output {
        CellPos {
            x: self.x + rhs.x,
            z: self.z + rhs.z,
        }
    }
}

impl AddAssign for CellPos {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.z += rhs.z;
    }
}

impl Sub for CellPos {
    type Output = CellPos;

    fn sub(self, rhs: Self) -> Self::Output {
        CellPos {
            x: self.x - rhs.x,
            z: self.z - rhs.z,
        }
    }
}

impl SubAssign for CellPos {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.z -= rhs.z;
    }
}

impl RegionSize {
    pub fn new(cells: u32) -> Option<Self> {
        NonZeroU32::new(cells).map(Self)
    }

    pub fn get(self) -> i32 {
        i32::try_from(self.0.get()).unwrap_or(i32::MAX)
    }
}

impl RegionPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn origin_cell(self, size: RegionSize) -> CellPos {
        let size = size.get();
        CellPos {
            x: self.x * size,
            z: self.z * size,
        }
    }

    pub fn contains(self, size: RegionSize, cell: CellPos) -> bool {
        cell.region(size) == self
    }
}

fn div_rem_floor(value: i32, divisor: i32) -> (i32, i32) {
    let mut q = value / divisor;
    let mut r = value % divisor;
    if r < 0 {
        q -= 1;
        r += divisor;
    }
    (q, r)
}

pub fn world_to_cell(world_pos: IVec3) -> (CellPos, LocalColumn) {
    let size = CELL_SIZE as i32;

    let (cell_x, local_x) = div_rem_floor(world_pos.x, size);
    let (cell_z, local_z) = div_rem_floor(world_pos.z, size);

    (
        CellPos {
            x: cell_x,
            z: cell_z,
        },
        LocalColumn {
            x: local_x as u8,
            z: local_z as u8,
        },
    )
}

pub fn column_to_index(local: LocalColumn) -> usize {
    usize::from(local.x) + usize::from(local.z) * CELL_SIZE
}

pub fn index_to_column(index: usize) -> LocalColumn {
    assert!(index < CELL_AREA, "cell column index out of bounds: {index}");

    LocalColumn {
        x: (index % CELL_SIZE) as u8,
        z: (index / CELL_SIZE) as u8,
    }
}

#[cfg(test)]
mod tests {
    use glam::IVec3;

    use super::{
        column_to_index, index_to_column, world_to_cell, CellPos, Direction, LocalColumn,
        RegionPos, RegionSize, CELL_SIZE,
    };

    #[test]
    fn column_index_round_trips_back_to_local_coords() {
        for z in 0..CELL_SIZE {
            for x in 0..CELL_SIZE {
                let local = LocalColumn {
                    x: x as u8,
                    z: z as u8,
                };
                assert_eq!(index_to_column(column_to_index(local)), local);
            }
        }
    }

    #[test]
    fn cell_pos_arithmetic_is_component_wise() {
        let a = CellPos::new(10, 4);
        let b = CellPos::new(-3, 1);

        assert_eq!(a + b, CellPos::new(7, 5));
        assert_eq!(a - b, CellPos::new(13, 3));

        let mut c = a;
        c += b;
        assert_eq!(c, CellPos::new(7, 5));
        c -= b;
        assert_eq!(c, a);
    }

    #[test]
    fn region_uses_floor_division_for_negative_cells() {
        let size = RegionSize::new(16).expect("non-zero region size");
        assert_eq!(CellPos::new(0, 15).region(size), RegionPos::new(0, 0));
        assert_eq!(CellPos::new(-1, 16).region(size), RegionPos::new(-1, 1));
        assert_eq!(CellPos::new(-16, -17).region(size), RegionPos::new(-1, -2));

        let region = RegionPos::new(-2, 3);
        let origin = region.origin_cell(size);
        assert_eq!(origin, CellPos::new(-32, 48));
        assert!(region.contains(size, origin));
        assert!(region.contains(size, origin + CellPos::new(15, 15)));
        assert!(!region.contains(size, origin + CellPos::new(16, 0)));
    }

    #[test]
    fn zero_region_size_is_rejected() {
        assert!(RegionSize::new(0).is_none());
        assert_eq!(RegionSize::new(20).map(RegionSize::get), Some(20));
    }

    #[test]
    fn directions_are_symmetric() {
        let cell = CellPos::new(5, -7);
        for direction in Direction::ALL {
            assert_eq!(cell.neighbor(direction).neighbor(direction.opposite()), cell);
        }
    }

    #[test]
    fn world_to_cell_handles_negative_and_positive_coordinates() {
        let (cell0, local0) = world_to_cell(IVec3::new(-1, 70, -1));
        assert_eq!(cell0, CellPos::new(-1, -1));
        assert_eq!(
            local0,
            LocalColumn {
                x: (CELL_SIZE - 1) as u8,
                z: (CELL_SIZE - 1) as u8,
            }
        );

        let world = IVec3::new(-33, 95, 66);
        let (cell1, local1) = world_to_cell(world);
        assert_eq!(cell1.column_to_world(local1, 95), world);
    }
}
