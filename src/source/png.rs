use image::DynamicImage;
use tracing::info;

use crate::grid::ElevationGrid;
use crate::source::{Error, RasterSource, Result};

/// An 8- or 16-bit grayscale PNG heightmap on disk.
///
/// Raw sample values become elevations as-is; `with_elevation_range` remaps
/// the sample range onto a real-world min/max instead.
pub struct PngHeightmapSource {
    path: String,
    elevation_range: Option<(f32, f32)>,
}

impl PngHeightmapSource {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            elevation_range: None,
        }
    }

    /// Remap the full sample range onto `[min, max]` elevations.
    pub fn with_elevation_range(mut self, min: f32, max: f32) -> Self {
        self.elevation_range = Some((min, max));
        self
    }
}

impl RasterSource for PngHeightmapSource {
    fn identifier(&self) -> &str {
        &self.path
    }

    fn load(&self) -> Result<ElevationGrid> {
        let image = image::io::Reader::open(&self.path)
            .map_err(|e| Error::loading(&self.path, e))?
            .decode()
            .map_err(|e| Error::decode(&self.path, e))?;

        let (width, height, values, full_scale) = match image {
            DynamicImage::ImageLuma8(buf) => {
                let (w, h) = buf.dimensions();
                let values: Vec<f32> = buf.into_raw().into_iter().map(f32::from).collect();
                (w, h, values, u8::MAX as f32)
            }
            DynamicImage::ImageLuma16(buf) => {
                let (w, h) = buf.dimensions();
                let values: Vec<f32> = buf.into_raw().into_iter().map(f32::from).collect();
                (w, h, values, u16::MAX as f32)
            }
            other => {
                return Err(Error::decode(
                    &self.path,
                    format!(
                        "expected a grayscale heightmap, found {:?}",
                        other.color()
                    ),
                ))
            }
        };

        if width == 0 || height == 0 {
            return Err(Error::decode(&self.path, "image has a zero dimension"));
        }

        let values: Vec<f32> = match self.elevation_range {
            Some((min, max)) => values
                .into_iter()
                .map(|v| min + v / full_scale * (max - min))
                .collect(),
            None => values,
        };

        info!(
            "Loaded heightmap '{}' ({}x{})",
            self.path, width, height
        );
        Ok(ElevationGrid::from_values(values, width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma};

    #[test]
    fn decodes_a_luma16_heightmap() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("height.png");
        let buf: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_fn(4, 2, |x, y| Luma([(y * 4 + x) as u16 * 1000]));
        buf.save(&path).unwrap();

        let source = PngHeightmapSource::new(path.to_str().unwrap());
        let grid = source.load().unwrap();
        assert_eq!((grid.width, grid.height), (4, 2));
        assert_eq!(grid.min_elevation, 0.0);
        assert_eq!(grid.max_elevation, 7000.0);
    }

    #[test]
    fn remaps_samples_onto_an_elevation_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("height.png");
        let buf: ImageBuffer<Luma<u8>, Vec<u8>> =
            ImageBuffer::from_fn(2, 1, |x, _| Luma([if x == 0 { 0 } else { 255 }]));
        buf.save(&path).unwrap();

        let source = PngHeightmapSource::new(path.to_str().unwrap())
            .with_elevation_range(100.0, 500.0);
        let grid = source.load().unwrap();
        assert_eq!(grid.min_elevation, 100.0);
        assert_eq!(grid.max_elevation, 500.0);
    }

    #[test]
    fn rejects_color_images() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("color.png");
        let buf: ImageBuffer<image::Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_pixel(2, 2, image::Rgb([10, 20, 30]));
        buf.save(&path).unwrap();

        let source = PngHeightmapSource::new(path.to_str().unwrap());
        assert!(matches!(source.load(), Err(Error::Decode(_))));
    }
}
