pub mod cache;
pub mod color;
pub mod controller;
pub mod grid;
pub mod mesh;
pub mod source;
mod utils;

use std::sync::Arc;

use tracing::info;

pub use cache::{CacheStats, TierCache, TierEntry};
pub use controller::{FetchOutcome, LodController, LodSettings, ViewState};
pub use grid::{resample, ElevationGrid, Tier};
pub use mesh::{build_mesh, upright_tilt, TerrainMesh, HEIGHT_SCALE, WORLD_WIDTH};
pub use source::{
    Error, GeoTiffSource, PngHeightmapSource, RasterSource, Result, SyntheticSource,
};

/// Information used to create a [`TerrainView`].
#[derive(Clone, Copy, Debug, Default)]
pub struct TerrainViewInfo {
    pub settings: LodSettings,
}

/// One terrain surface and everything needed to keep its detail matched to
/// the viewer: the raster source, the tier cache, and the LOD controller.
///
/// Drive it with [`update`](Self::update) once per frame. The initial
/// preview tier is requested on construction so something is visible as
/// soon as the raster decodes; until then [`active_mesh`](Self::active_mesh)
/// is `None` and [`is_loading`](Self::is_loading) is true.
pub struct TerrainView {
    source: Arc<dyn RasterSource>,
    cache: TierCache,
    controller: LodController,
}

impl TerrainView {
    pub fn new(source: impl RasterSource + 'static, info: &TerrainViewInfo) -> Self {
        let source: Arc<dyn RasterSource> = Arc::new(source);
        let mut cache = TierCache::new();
        let mut controller = LodController::new(info.settings);

        info!("Creating terrain view for '{}'", source.identifier());
        controller.request(Tier::Preview, &source, &mut cache);

        Self {
            source,
            cache,
            controller,
        }
    }

    /// Advance the view by one frame: collect finished fetches and, at the
    /// throttled cadence, re-evaluate the tier for `viewer_distance` (the
    /// scalar distance from the viewpoint to the terrain's local origin).
    /// Never blocks on I/O or mesh builds.
    pub fn update(&mut self, dt: f32, viewer_distance: f32) {
        self.controller
            .update(dt, viewer_distance, &self.source, &mut self.cache);
    }

    /// The mesh to draw this frame, or `None` before the first tier lands.
    /// The reference is swapped wholesale on tier switches; the previous
    /// mesh stays valid for as long as the caller holds it.
    pub fn active_mesh(&self) -> Option<Arc<TerrainMesh>> {
        self.controller.active_mesh()
    }

    /// Increments on every active-mesh swap. Compare once per frame to
    /// decide when to re-upload vertex buffers.
    pub fn mesh_version(&self) -> u64 {
        self.controller.mesh_version()
    }

    /// True while any tier fetch (including the initial load) is pending.
    pub fn is_loading(&self) -> bool {
        self.controller.is_loading()
    }

    pub fn current_tier(&self) -> Tier {
        self.controller.current_tier()
    }

    /// The most recent fetch failure, if any. Errors never stop the view;
    /// the last-good mesh stays active.
    pub fn take_last_error(&mut self) -> Option<Error> {
        self.controller.take_last_error()
    }

    pub fn source_identifier(&self) -> &str {
        self.source.identifier()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn settings(&self) -> &LodSettings {
        self.controller.settings()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_new_view_is_loading_the_preview_tier() {
        let view = TerrainView::new(
            SyntheticSource::new("hills", 64, 64),
            &TerrainViewInfo::default(),
        );
        assert!(view.is_loading());
        assert!(view.active_mesh().is_none());
        assert_eq!(view.current_tier(), Tier::Preview);
        assert_eq!(view.mesh_version(), 0);
    }

    #[test]
    fn views_do_not_share_cache_state() {
        let a = TerrainView::new(
            SyntheticSource::new("hills", 32, 32),
            &TerrainViewInfo::default(),
        );
        let b = TerrainView::new(
            SyntheticSource::new("hills", 32, 32),
            &TerrainViewInfo::default(),
        );
        // Each view owns its cache; stats start fresh for both.
        assert_eq!(a.cache_stats().builds, 0);
        assert_eq!(b.cache_stats().builds, 0);
    }
}
