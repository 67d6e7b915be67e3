use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::grid::{resample, ElevationGrid, Tier};
use crate::mesh::{build_mesh, TerrainMesh};

/// A fully prepared detail tier: the resampled grid and the mesh built
/// from it.
#[derive(Clone)]
pub struct TierEntry {
    pub grid: Arc<ElevationGrid>,
    pub mesh: Arc<TerrainMesh>,
}

/// Hit/miss/build counters, mostly useful for diagnostics and tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub builds: u64,
}

/// Memoizes prepared tiers per `(source identifier, tier)` key.
///
/// Entries are created lazily and never evicted; the tier enumeration is
/// small and bounded. Owned by its terrain view, constructed with it and
/// dropped with it; multiple views never share cache state.
#[derive(Default)]
pub struct TierCache {
    entries: HashMap<(String, Tier), TierEntry>,
    stats: CacheStats,
}

impl TierCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, source: &str, tier: Tier) -> Option<TierEntry> {
        let entry = self.entries.get(&(source.to_string(), tier)).cloned();
        match entry {
            Some(entry) => {
                self.stats.hits += 1;
                debug!("Tier cache hit: {} @ {}", source, tier);
                Some(entry)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    pub fn insert(
        &mut self,
        source: &str,
        tier: Tier,
        grid: Arc<ElevationGrid>,
        mesh: Arc<TerrainMesh>,
    ) {
        info!(
            "Cached tier {} of '{}' ({}x{})",
            tier, source, grid.width, grid.height
        );
        self.entries
            .insert((source.to_string(), tier), TierEntry { grid, mesh });
    }

    /// Resample and build `tier` from the full-resolution grid unless the
    /// entry already exists. Idempotent: a second call with the same key
    /// returns the same mesh instance without recomputing anything.
    pub fn get_or_build(
        &mut self,
        source: &str,
        tier: Tier,
        full: &Arc<ElevationGrid>,
    ) -> Arc<TerrainMesh> {
        if let Some(entry) = self.get(source, tier) {
            return entry.mesh;
        }

        self.stats.builds += 1;
        let grid = Arc::new(resample(full, tier));
        let mesh = Arc::new(build_mesh(&grid));
        self.insert(source, tier, grid, mesh.clone());
        mesh
    }

    pub fn contains(&self, source: &str, tier: Tier) -> bool {
        self.entries.contains_key(&(source.to_string(), tier))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
