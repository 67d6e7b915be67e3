use std::fs::File;
use std::io::BufReader;

use tiff::decoder::{Decoder, DecodingResult};
use tiff::ColorType;
use tracing::info;

use crate::grid::ElevationGrid;
use crate::source::{Error, RasterSource, Result};

/// A single-band GeoTIFF elevation raster on disk.
///
/// Only grayscale images decode; color or multi-band files are rejected.
/// All common DEM sample formats (signed/unsigned integer and float) are
/// converted to `f32` elevations.
pub struct GeoTiffSource {
    path: String,
}

impl GeoTiffSource {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl RasterSource for GeoTiffSource {
    fn identifier(&self) -> &str {
        &self.path
    }

    fn load(&self) -> Result<ElevationGrid> {
        let file = File::open(&self.path).map_err(|e| Error::loading(&self.path, e))?;
        let mut decoder =
            Decoder::new(BufReader::new(file)).map_err(|e| Error::decode(&self.path, e))?;

        match decoder.colortype().map_err(|e| Error::decode(&self.path, e))? {
            ColorType::Gray(_) => {}
            other => {
                return Err(Error::decode(
                    &self.path,
                    format!("expected a gray single-band image, found {:?}", other),
                ))
            }
        }

        let (width, height) = decoder
            .dimensions()
            .map_err(|e| Error::decode(&self.path, e))?;
        if width == 0 || height == 0 {
            return Err(Error::decode(&self.path, "image has a zero dimension"));
        }

        let image = decoder
            .read_image()
            .map_err(|e| Error::decode(&self.path, e))?;
        let values = samples_to_f32(&self.path, image)?;

        if values.len() != (width * height) as usize {
            return Err(Error::decode(
                &self.path,
                format!(
                    "expected {} samples for {}x{}, found {}",
                    width * height,
                    width,
                    height,
                    values.len()
                ),
            ));
        }

        info!(
            "Loaded elevation raster '{}' ({}x{})",
            self.path, width, height
        );
        Ok(ElevationGrid::from_values(values, width, height))
    }
}

fn samples_to_f32(path: &str, image: DecodingResult) -> Result<Vec<f32>> {
    let values = match image {
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|s| s as f32).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|s| s as f32).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|s| s as f32).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|s| s as f32).collect(),
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|s| s as f32).collect(),
    };
    if values.is_empty() {
        return Err(Error::decode(path, "image contains no samples"));
    }
    Ok(values)
}
