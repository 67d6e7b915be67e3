use std::time::Duration;

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use relief::{SyntheticSource, TerrainView, TerrainViewInfo};

/// Drives a terrain view the way a render loop would: a camera orbits in
/// from far away and back out while the controller swaps detail tiers.
fn main() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut view = TerrainView::new(
        SyntheticSource::new("rolling-hills", 1200, 900),
        &TerrainViewInfo::default(),
    );

    let mut version = view.mesh_version();
    let mut t = 0.0f32;
    let dt = 1.0 / 60.0;

    for frame in 0..1200 {
        t += dt;
        // Ease between 2 and 25 world units from the terrain origin.
        let distance = 2.0 + 23.0 * (0.5 + 0.5 * (t * 0.4).cos());
        view.update(dt, distance);

        if view.mesh_version() != version {
            version = view.mesh_version();
            if let Some(mesh) = view.active_mesh() {
                println!(
                    "frame {:4}: tier {:7} active at distance {:5.1} ({} vertices)",
                    frame,
                    view.current_tier().to_string(),
                    distance,
                    mesh.vertex_count()
                );
            }
        }

        std::thread::sleep(Duration::from_millis(2));
    }
}
