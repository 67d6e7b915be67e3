use glam::{Quat, Vec3};
use rayon::prelude::*;

use crate::color;
use crate::grid::ElevationGrid;

/// World-space width of the rendered surface along the raster's long axis.
pub const WORLD_WIDTH: f32 = 10.0;

/// Vertical exaggeration applied to normalized elevation.
pub const HEIGHT_SCALE: f32 = 2.0;

/// Rows of vertices filled per work unit. Bounds the size of any single
/// fill step; the output is identical for any chunk size.
const FILL_CHUNK_ROWS: usize = 64;

/// A renderable terrain surface built from one [`ElevationGrid`].
///
/// Authored flat in the XY plane with elevation along +Z; the consuming
/// scene applies [`upright_tilt`] to stand it up. Never mutated after
/// construction; a tier switch swaps the whole mesh reference.
#[derive(Clone, Debug)]
pub struct TerrainMesh {
    pub positions: Vec<Vec3>,
    pub colors: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub grid_width: u32,
    pub grid_height: u32,
}

impl TerrainMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    pub fn color_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.colors)
    }

    pub fn normal_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.normals)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// The fixed -90° tilt about X that rotates the authored XY plane into a
/// horizontal ground plane with elevation pointing up.
pub fn upright_tilt() -> Quat {
    Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2)
}

/// Synthesize a mesh from a resampled grid.
///
/// One vertex per grid cell over a footprint of `WORLD_WIDTH` units across,
/// depth scaled by the raster aspect ratio. Heights are normalized elevation
/// times `HEIGHT_SCALE`; colors come from the classifier. Normals are
/// recomputed last, once every position is final.
pub fn build_mesh(grid: &ElevationGrid) -> TerrainMesh {
    let w = grid.width as usize;
    let h = grid.height as usize;
    let count = w * h;

    let world_w = WORLD_WIDTH;
    let world_h = WORLD_WIDTH * grid.height as f32 / grid.width as f32;
    let x_step = if w > 1 { world_w / (w - 1) as f32 } else { 0.0 };
    let y_step = if h > 1 { world_h / (h - 1) as f32 } else { 0.0 };

    let mut positions = vec![Vec3::ZERO; count];
    let mut colors = vec![Vec3::ZERO; count];

    // Row bands are disjoint, so the fill parallelizes without changing
    // the result.
    let band = FILL_CHUNK_ROWS * w;
    positions
        .par_chunks_mut(band)
        .zip(colors.par_chunks_mut(band))
        .enumerate()
        .for_each(|(band_idx, (position_band, color_band))| {
            let base = band_idx * band;
            for (k, (position, color)) in position_band
                .iter_mut()
                .zip(color_band.iter_mut())
                .enumerate()
            {
                let idx = base + k;
                let row = idx / w;
                let col = idx % w;

                let value = grid.values[idx];
                let x = col as f32 * x_step - world_w / 2.0;
                let y = world_h / 2.0 - row as f32 * y_step;
                let z = grid.normalized(value) * HEIGHT_SCALE;

                *position = Vec3::new(x, y, z);
                *color = color::classify(value, grid.min_elevation, grid.max_elevation);
            }
        });

    let indices = grid_indices(w, h);
    let normals = accumulate_normals(&positions, &indices);

    TerrainMesh {
        positions,
        colors,
        normals,
        indices,
        grid_width: grid.width,
        grid_height: grid.height,
    }
}

/// Two counter-clockwise triangles per grid cell.
fn grid_indices(w: usize, h: usize) -> Vec<u32> {
    if w < 2 || h < 2 {
        return Vec::new();
    }

    let mut indices = Vec::with_capacity((w - 1) * (h - 1) * 6);
    for row in 0..h - 1 {
        for col in 0..w - 1 {
            let i0 = (row * w + col) as u32;
            let i1 = i0 + 1;
            let i2 = i0 + w as u32;
            let i3 = i2 + 1;

            indices.extend_from_slice(&[i0, i2, i1]);
            indices.extend_from_slice(&[i1, i2, i3]);
        }
    }
    indices
}

/// Area-weighted face normals accumulated per shared vertex, then
/// normalized. Must run after every position mutation, never before.
fn accumulate_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];

    for tri in indices.chunks_exact(3) {
        let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let face = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }

    for normal in &mut normals {
        *normal = normal.try_normalize().unwrap_or(Vec3::Z);
    }
    normals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{resample, ElevationGrid, Tier};

    fn ramp_grid(width: u32, height: u32) -> ElevationGrid {
        let values = (0..width * height).map(|i| i as f32).collect();
        ElevationGrid::from_values(values, width, height)
    }

    #[test]
    fn vertex_count_matches_grid_for_every_tier() {
        let full = ramp_grid(130, 97);
        for tier in Tier::ALL {
            let grid = resample(&full, tier);
            let mesh = build_mesh(&grid);
            let expected = (grid.width * grid.height) as usize;
            assert_eq!(mesh.positions.len(), expected);
            assert_eq!(mesh.colors.len(), expected);
            assert_eq!(mesh.normals.len(), expected);
        }
    }

    #[test]
    fn footprint_preserves_aspect_ratio() {
        let grid = ramp_grid(100, 50);
        let mesh = build_mesh(&grid);

        let first = mesh.positions[0];
        let last = mesh.positions[mesh.positions.len() - 1];
        assert!((first.x - -WORLD_WIDTH / 2.0).abs() < 1e-4);
        assert!((last.x - WORLD_WIDTH / 2.0).abs() < 1e-4);
        // Depth is half the width for a 2:1 raster.
        assert!((first.y - WORLD_WIDTH / 4.0).abs() < 1e-4);
        assert!((last.y - -WORLD_WIDTH / 4.0).abs() < 1e-4);
    }

    #[test]
    fn flat_grid_builds_a_flat_mesh_with_up_normals() {
        let grid = ElevationGrid::from_values(vec![50.0; 64], 8, 8);
        let mesh = build_mesh(&grid);
        for p in &mesh.positions {
            assert_eq!(p.z, 0.0);
        }
        for n in &mesh.normals {
            assert!((*n - Vec3::Z).length() < 1e-5);
        }
    }

    #[test]
    fn heights_span_the_exaggeration_range() {
        let grid = ramp_grid(10, 10);
        let mesh = build_mesh(&grid);
        let max_z = mesh.positions.iter().map(|p| p.z).fold(0.0, f32::max);
        assert!((max_z - HEIGHT_SCALE).abs() < 1e-5);
    }

    #[test]
    fn two_triangles_per_cell() {
        let grid = ramp_grid(5, 4);
        let mesh = build_mesh(&grid);
        assert_eq!(mesh.indices.len(), 4 * 3 * 6);
        let max = *mesh.indices.iter().max().unwrap();
        assert!((max as usize) < mesh.vertex_count());
    }

    #[test]
    fn single_row_grid_has_no_faces() {
        let grid = ramp_grid(7, 1);
        let mesh = build_mesh(&grid);
        assert_eq!(mesh.vertex_count(), 7);
        assert!(mesh.indices.is_empty());
        for n in &mesh.normals {
            assert_eq!(*n, Vec3::Z);
        }
    }

    #[test]
    fn byte_views_cover_the_buffers() {
        let grid = ramp_grid(6, 6);
        let mesh = build_mesh(&grid);
        assert_eq!(
            mesh.position_bytes().len(),
            mesh.vertex_count() * std::mem::size_of::<Vec3>()
        );
        assert_eq!(
            mesh.index_bytes().len(),
            mesh.indices.len() * std::mem::size_of::<u32>()
        );
    }

    #[test]
    fn upright_tilt_stands_the_surface_up() {
        // +Z (authored elevation axis) must map to +Y (world up).
        let up = upright_tilt() * Vec3::Z;
        assert!((up - Vec3::Y).length() < 1e-6);
    }
}
