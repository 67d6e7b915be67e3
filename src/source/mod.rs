pub mod error;
pub use error::*;
mod geotiff;
mod png;
mod synthetic;

pub use geotiff::GeoTiffSource;
pub use png::PngHeightmapSource;
pub use synthetic::SyntheticSource;

use crate::grid::ElevationGrid;

/// Provides the full-resolution elevation grid behind a terrain view.
///
/// `load` performs the I/O and container decode every time it is called;
/// memoization is the tier cache's job one layer up. Implementations run on
/// worker threads, so the trait requires `Send + Sync`.
pub trait RasterSource: Send + Sync {
    /// Stable identifier used as the cache key, typically the asset path.
    fn identifier(&self) -> &str;

    /// Fetch and decode the raster into a full-resolution grid.
    fn load(&self) -> Result<ElevationGrid>;
}
