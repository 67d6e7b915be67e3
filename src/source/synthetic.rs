use crate::grid::ElevationGrid;
use crate::source::{RasterSource, Result};

/// Procedural rolling-hill terrain for demos and tests.
///
/// Layered sine waves over a base elevation, fully deterministic so test
/// assertions and cache keys stay stable across runs.
pub struct SyntheticSource {
    name: String,
    width: u32,
    height: u32,
}

impl SyntheticSource {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width: width.max(1),
            height: height.max(1),
        }
    }
}

impl RasterSource for SyntheticSource {
    fn identifier(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<ElevationGrid> {
        let mut values = Vec::with_capacity((self.width * self.height) as usize);
        for row in 0..self.height {
            for col in 0..self.width {
                let x = col as f32 / self.width as f32;
                let y = row as f32 / self.height as f32;

                // Base plateau with two octaves of hills.
                let mut elevation = 100.0;
                elevation += (x * 5.0).sin() * (y * 5.0).cos() * 50.0;
                elevation += (x * 10.0 + y * 10.0).sin() * 25.0;

                values.push(elevation);
            }
        }

        Ok(ElevationGrid::from_values(values, self.width, self.height))
    }
}
