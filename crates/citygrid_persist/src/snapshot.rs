use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use citygrid_shared::coords::CellPos;
use citygrid_shared::heightmap::VerticalBounds;
use citygrid_shared::planner::CellPlan;

use crate::compression::{compress_zstd, decompress_zstd, DEFAULT_ZSTD_LEVEL};
use crate::versioning::{ensure_supported, peek_format_version, CURRENT_SNAPSHOT_FORMAT_VERSION};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayoutSnapshot {
    pub format_version: u32,
    pub world_seed: i64,
    pub city_region_size: u32,
    pub bounds: VerticalBounds,
    pub cells: Vec<CellPlan>,
}

impl LayoutSnapshot {
    pub const MAGIC: [u8; 4] = *b"CGLS";
    const WIRE_VERSION_UNCOMPRESSED: u8 = 1;
    const WIRE_VERSION_ZSTD: u8 = 2;

    pub fn new(world_seed: i64, city_region_size: u32, bounds: VerticalBounds, cells: Vec<CellPlan>) -> Self {
        Self {
            format_version: CURRENT_SNAPSHOT_FORMAT_VERSION,
            world_seed,
            city_region_size,
            bounds,
            cells,
        }
    }

    pub fn cell(&self, pos: CellPos) -> Option<&CellPlan> {
        self.cells.iter().find(|plan| plan.cell == pos)
    }

    pub fn encode(&self) -> io::Result<Vec<u8>> {
        let encoded = bincode::serialize(self).map_err(|err| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("failed to encode snapshot payload: {err}"),
            )
        })?;
        let compressed = compress_zstd(&encoded, DEFAULT_ZSTD_LEVEL).map_err(|err| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("failed to compress snapshot payload: {err}"),
            )
        })?;

        let mut bytes = Vec::with_capacity(Self::MAGIC.len() + 1 + compressed.len());
        bytes.extend_from_slice(&Self::MAGIC);
        bytes.push(Self::WIRE_VERSION_ZSTD);
        bytes.extend_from_slice(&compressed);
        Ok(bytes)
    }

    pub fn decode(bytes: &[u8]) -> io::Result<Self> {
        if bytes.len() < Self::MAGIC.len() || bytes[..4] != Self::MAGIC[..] {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "invalid snapshot magic; expected CGLS",
            ));
        }

        let (wire_version, wire_payload) = bytes[Self::MAGIC.len()..].split_first().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "missing snapshot wire format version")
        })?;

        match *wire_version {
            Self::WIRE_VERSION_UNCOMPRESSED => Self::decode_payload(wire_payload),
            Self::WIRE_VERSION_ZSTD => {
                let decompressed = decompress_zstd(wire_payload).map_err(|err| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("failed to decompress snapshot payload: {err}"),
                    )
                })?;
                Self::decode_payload(&decompressed)
            }
            other => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unsupported snapshot wire format version {other}; expected 1 or 2"),
            )),
        }
    }

    fn decode_payload(payload: &[u8]) -> io::Result<Self> {
        let version = peek_format_version(payload)
            .and_then(|version| ensure_supported(version).map(|()| version))
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

        let snapshot: Self = bincode::deserialize(payload).map_err(|err| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("failed to decode snapshot payload (format v{version}): {err}"),
            )
        })?;
        Ok(snapshot)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = self.encode()?;
        fs::write(path, &bytes)?;
        info!(
            "Wrote snapshot {} ({} cells, {} bytes)",
            path.display(),
            self.cells.len(),
            bytes.len()
        );
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let snapshot = Self::decode(&fs::read(path)?)?;
        debug!(
            "Loaded snapshot {} with {} cells (format v{})",
            path.display(),
            snapshot.cells.len(),
            snapshot.format_version
        );
        Ok(snapshot)
    }
}
