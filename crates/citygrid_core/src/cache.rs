use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use citygrid_shared::coords::CellPos;
use citygrid_shared::heightmap::{BiomeId, BiomeSource, HeightSample, HeightmapProvider, VerticalBounds};
use glam::IVec3;
use rustc_hash::FxHashMap;

pub struct HeightCache<P> {
    inner: P,
    samples: RwLock<FxHashMap<CellPos, Option<HeightSample>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl<P: HeightmapProvider> HeightCache<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            samples: RwLock::new(FxHashMap::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self
            .samples
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        CacheStats {
            entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub fn clear(&self) {
        self.samples
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl<P: HeightmapProvider> HeightmapProvider for HeightCache<P> {
    fn height_sample(&self, cell: CellPos) -> Option<HeightSample> {
        if let Some(cached) = self
            .samples
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&cell)
        {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return cached.clone();
        }

        // Sampled outside the lock; a racing worker computes the same value.
        self.misses.fetch_add(1, Ordering::Relaxed);
        let sample = self.inner.height_sample(cell);
        self.samples
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(cell)
            .or_insert_with(|| sample.clone());
        sample
    }

    fn vertical_bounds(&self) -> VerticalBounds {
        self.inner.vertical_bounds()
    }
}

impl<P: HeightmapProvider + BiomeSource> BiomeSource for HeightCache<P> {
    fn biome_at(&self, world_pos: IVec3) -> BiomeId {
        self.inner.biome_at(world_pos)
    }
}
