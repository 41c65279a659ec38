use serde::{Deserialize, Serialize};

use crate::candidate::Candidate;
use crate::coords::{CellPos, Direction, RegionPos, RegionSize};
use crate::random::RandomStream;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Footprint {
    Single,
    Multi { width: u32, depth: u32 },
}

impl Footprint {
    pub fn new(width: i32, depth: i32) -> Option<Self> {
        let width = u32::try_from(width).ok().filter(|w| *w > 0)?;
        let depth = u32::try_from(depth).ok().filter(|d| *d > 0)?;
        if width == 1 && depth == 1 {
            Some(Footprint::Single)
        } else {
            Some(Footprint::Multi { width, depth })
        }
    }

    pub fn width(&self) -> u32 {
        match *self {
            Footprint::Single => 1,
            Footprint::Multi { width, .. } => width,
        }
    }

    pub fn depth(&self) -> u32 {
        match *self {
            Footprint::Single => 1,
            Footprint::Multi { depth, .. } => depth,
        }
    }

    pub fn cell_count(&self) -> u32 {
        self.width() * self.depth()
    }

    pub fn fits(&self, size: RegionSize) -> bool {
        let size = size.get() as u32;
        self.width() <= size && self.depth() <= size
    }
}

pub fn anchor_in_region(
    region: RegionPos,
    size: RegionSize,
    footprint: Footprint,
    stream: &mut RandomStream,
) -> CellPos {
    let origin = region.origin_cell(size);
    let span = size.get() as u32;
    let slack_x = span.saturating_sub(footprint.width()) + 1;
    let slack_z = span.saturating_sub(footprint.depth()) + 1;
    let dx = stream.next_below(slack_x) as i32;
    let dz = stream.next_below(slack_z) as i32;
    origin + CellPos::new(dx, dz)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FootprintPart {
    pub rel_x: u32,
    pub rel_z: u32,
    pub width: u32,
    pub depth: u32,
}

impl FootprintPart {
    pub fn is_anchor(&self) -> bool {
        self.rel_x == 0 && self.rel_z == 0
    }

    pub fn is_exterior(&self, side: Direction) -> bool {
        match side {
            Direction::West => self.rel_x == 0,
            Direction::East => self.rel_x + 1 == self.width,
            Direction::North => self.rel_z == 0,
            Direction::South => self.rel_z + 1 == self.depth,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnchorResolution {
    NotParticipating,
    Part(FootprintPart),
}

impl AnchorResolution {
    pub fn part(&self) -> Option<FootprintPart> {
        match *self {
            AnchorResolution::Part(part) => Some(part),
            AnchorResolution::NotParticipating => None,
        }
    }
}

pub fn resolve_anchor_participation(cell: CellPos, candidate: &Candidate) -> AnchorResolution {
    match candidate.footprint {
        Footprint::Single => resolve_single(cell, candidate.anchor),
        Footprint::Multi { width, depth } => resolve_multi(cell, candidate.anchor, width, depth),
    }
}

pub fn resolve_single(cell: CellPos, anchor: CellPos) -> AnchorResolution {
    if cell == anchor {
        AnchorResolution::Part(FootprintPart {
            rel_x: 0,
            rel_z: 0,
            width: 1,
            depth: 1,
        })
    } else {
        AnchorResolution::NotParticipating
    }
}

pub fn resolve_multi(cell: CellPos, anchor: CellPos, width: u32, depth: u32) -> AnchorResolution {
    let offset = cell - anchor;
    let (Ok(rel_x), Ok(rel_z)) = (u32::try_from(offset.x), u32::try_from(offset.z)) else {
        return AnchorResolution::NotParticipating;
    };
    if rel_x >= width || rel_z >= depth {
        return AnchorResolution::NotParticipating;
    }
    AnchorResolution::Part(FootprintPart {
        rel_x,
        rel_z,
        width,
        depth,
    })
}

pub fn footprint_cells(candidate: &Candidate) -> impl Iterator<Item = CellPos> + '_ {
    let width = candidate.footprint.width() as i32;
    let depth = candidate.footprint.depth() as i32;
    (0..depth).flat_map(move |dz| {
        (0..width).map(move |dx| candidate.anchor + CellPos::new(dx, dz))
    })
}
