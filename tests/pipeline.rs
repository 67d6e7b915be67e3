use std::fs::File;
use std::time::Duration;

use image::{ImageBuffer, Luma};
use tiff::encoder::{colortype, TiffEncoder};

use relief::{
    GeoTiffSource, PngHeightmapSource, SyntheticSource, TerrainView, TerrainViewInfo, Tier,
};

/// Pump the frame loop until the pending fetch lands. Every tick crosses
/// the evaluation throttle, so the distance takes effect immediately.
fn settle(view: &mut TerrainView, distance: f32) {
    for _ in 0..2000 {
        view.update(0.6, distance);
        if !view.is_loading() {
            return;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    panic!("terrain never finished loading");
}

#[test]
fn preview_loads_first_and_zooming_in_refines() {
    let mut view = TerrainView::new(
        SyntheticSource::new("hills", 900, 600),
        &TerrainViewInfo::default(),
    );
    assert!(view.is_loading());

    settle(&mut view, 25.0);
    assert_eq!(view.current_tier(), Tier::Preview);
    let mesh = view.active_mesh().expect("preview mesh missing");
    // Preview targets 100 samples: stride 9 over 900x600.
    assert_eq!((mesh.grid_width, mesh.grid_height), (100, 66));
    assert_eq!(
        mesh.positions.len(),
        (mesh.grid_width * mesh.grid_height) as usize
    );
    let preview_version = view.mesh_version();

    settle(&mut view, 3.0);
    assert_eq!(view.current_tier(), Tier::High);
    let mesh = view.active_mesh().expect("high mesh missing");
    // High targets 800: stride 1 keeps the full grid.
    assert_eq!((mesh.grid_width, mesh.grid_height), (900, 600));
    assert!(view.mesh_version() > preview_version);
}

#[test]
fn revisiting_a_tier_hits_the_cache() {
    let mut view = TerrainView::new(
        SyntheticSource::new("hills", 400, 400),
        &TerrainViewInfo::default(),
    );
    settle(&mut view, 25.0);
    settle(&mut view, 7.0);
    assert_eq!(view.current_tier(), Tier::Medium);

    // Back out to preview: already cached, applies within one frame.
    view.update(0.6, 25.0);
    assert_eq!(view.current_tier(), Tier::Preview);
    assert!(!view.is_loading());
    assert!(view.cache_stats().hits >= 1);
}

#[test]
fn geotiff_raster_drives_the_full_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dem.tif");
    let data: Vec<u16> = (0..100u32 * 80).map(|i| (i % 500) as u16).collect();
    let file = File::create(&path).unwrap();
    let mut encoder = TiffEncoder::new(file).unwrap();
    encoder
        .write_image::<colortype::Gray16>(100, 80, &data)
        .unwrap();

    let mut view = TerrainView::new(
        GeoTiffSource::new(path.to_str().unwrap()),
        &TerrainViewInfo::default(),
    );
    settle(&mut view, 25.0);

    let mesh = view.active_mesh().expect("mesh missing");
    // The raster is smaller than every tier target, so preview keeps it.
    assert_eq!((mesh.grid_width, mesh.grid_height), (100, 80));
    for color in &mesh.colors {
        for c in color.to_array() {
            assert!((0.0..=1.0).contains(&c));
        }
    }
    assert!(view.take_last_error().is_none());
}

#[test]
fn flat_heightmap_renders_flat_and_neutral() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flat.png");
    let buf: ImageBuffer<Luma<u8>, Vec<u8>> = ImageBuffer::from_pixel(32, 32, Luma([50]));
    buf.save(&path).unwrap();

    let mut view = TerrainView::new(
        PngHeightmapSource::new(path.to_str().unwrap()),
        &TerrainViewInfo::default(),
    );
    settle(&mut view, 25.0);

    let mesh = view.active_mesh().expect("mesh missing");
    let neutral = glam::Vec3::new(0.5, 0.5, 0.5);
    for (position, color) in mesh.positions.iter().zip(mesh.colors.iter()) {
        assert_eq!(position.z, 0.0);
        assert_eq!(*color, neutral);
    }
}

#[test]
fn an_unreadable_raster_fails_without_crashing_the_loop() {
    let mut view = TerrainView::new(
        GeoTiffSource::new("/no/such/place/dem.tif"),
        &TerrainViewInfo::default(),
    );
    settle(&mut view, 25.0);

    assert!(view.active_mesh().is_none());
    assert_eq!(view.current_tier(), Tier::Preview);
    let err = view.take_last_error().expect("error was not surfaced");
    assert!(matches!(err, relief::Error::Loading(_)));

    // The loop keeps running on the last-good (here: empty) state.
    for _ in 0..10 {
        view.update(0.016, 3.0);
    }
}
