use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::TierCache;
use crate::grid::{resample, ElevationGrid, Tier};
use crate::mesh::{build_mesh, TerrainMesh};
use crate::source::{Error, RasterSource, Result};
use crate::utils::throttle::Throttle;

/// Distance thresholds and timing knobs for tier selection.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LodSettings {
    /// Seconds of accumulated update time between evaluations.
    pub evaluate_interval: f32,
    /// Ascending viewer distances at which detail steps down one tier:
    /// below the first is High, past the last is Preview.
    pub tier_thresholds: [f32; 3],
    /// Extra distance the viewer must cross back over a threshold before
    /// the controller coarsens. Zero keeps the reference behavior of
    /// symmetric bounds; raise it if tiers oscillate at a boundary.
    pub downgrade_margin: f32,
}

impl Default for LodSettings {
    fn default() -> Self {
        Self {
            evaluate_interval: 0.5,
            tier_thresholds: [5.0, 10.0, 20.0],
            downgrade_margin: 0.0,
        }
    }
}

impl LodSettings {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Controller-owned view state, mutated only by the evaluation step.
pub struct ViewState {
    pub current_tier: Tier,
    pub last_evaluated_distance: f32,
    evaluation: Throttle,
}

impl ViewState {
    /// Update time accumulated toward the next evaluation tick.
    pub fn accumulated_idle_time(&self) -> f32 {
        self.evaluation.accumulated()
    }
}

/// What the controller did with one completed fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    Stale,
    Failed,
}

/// Everything a worker produced for one tier request. The first request
/// also carries the full-resolution grid it had to fetch.
struct TierAsset {
    full: Option<Arc<ElevationGrid>>,
    grid: Arc<ElevationGrid>,
    mesh: Arc<TerrainMesh>,
}

struct Completion {
    seq: u64,
    tier: Tier,
    result: Result<TierAsset>,
}

/// Keeps the active mesh's detail matched to viewer distance.
///
/// Driven by `update(dt, distance)` from the frame loop. Evaluation is
/// throttled; heavy work runs on detached worker threads and reports back
/// over a channel drained at the start of every update. Requests carry a
/// monotonically increasing sequence number and only the latest one may
/// swap the active mesh; an older in-flight result is cached but never
/// activated, so the view cannot regress to an outdated tier.
pub struct LodController {
    settings: LodSettings,
    state: ViewState,
    /// Target of the most recent request, applied or not.
    desired_tier: Tier,
    latest_seq: u64,
    in_flight: usize,
    /// Sequence of the request that is fetching the full-resolution grid.
    grid_fetch_seq: Option<u64>,
    full_grid: Option<Arc<ElevationGrid>>,
    active_mesh: Option<Arc<TerrainMesh>>,
    mesh_version: u64,
    loading: bool,
    last_error: Option<Error>,
    completions_tx: Sender<Completion>,
    completions_rx: Receiver<Completion>,
}

impl LodController {
    pub fn new(settings: LodSettings) -> Self {
        let (completions_tx, completions_rx) = channel();
        Self {
            state: ViewState {
                current_tier: Tier::Preview,
                last_evaluated_distance: 0.0,
                evaluation: Throttle::new(settings.evaluate_interval),
            },
            settings,
            desired_tier: Tier::Preview,
            latest_seq: 0,
            in_flight: 0,
            grid_fetch_seq: None,
            full_grid: None,
            active_mesh: None,
            mesh_version: 0,
            loading: false,
            last_error: None,
            completions_tx,
            completions_rx,
        }
    }

    /// Drain finished fetches, then re-evaluate the tier if the throttle
    /// interval elapsed. Never blocks.
    pub fn update(
        &mut self,
        dt: f32,
        viewer_distance: f32,
        source: &Arc<dyn RasterSource>,
        cache: &mut TierCache,
    ) {
        self.drain(source, cache);

        if !self.state.evaluation.tick(dt) {
            return;
        }
        self.state.last_evaluated_distance = viewer_distance;

        let decided = self.decide(viewer_distance);
        if decided != self.desired_tier {
            info!(
                "Viewer at {:.1}: switching tier {} -> {}",
                viewer_distance, self.desired_tier, decided
            );
            self.request(decided, source, cache);
        }
    }

    /// Map a viewer distance to a tier, honoring the downgrade margin
    /// relative to the currently active tier.
    pub fn decide(&self, distance: f32) -> Tier {
        let target = self.tier_for(distance);
        if self.settings.downgrade_margin > 0.0 && target < self.state.current_tier {
            let held = self.tier_for(distance - self.settings.downgrade_margin);
            if held >= self.state.current_tier {
                return self.state.current_tier;
            }
        }
        target
    }

    fn tier_for(&self, distance: f32) -> Tier {
        let [d1, d2, d3] = self.settings.tier_thresholds;
        if distance < d1 {
            Tier::High
        } else if distance < d2 {
            Tier::Medium
        } else if distance < d3 {
            Tier::Low
        } else {
            Tier::Preview
        }
    }

    /// Ask for `tier`, serving from cache when possible and spawning a
    /// worker otherwise. Supersedes any request still in flight.
    pub fn request(&mut self, tier: Tier, source: &Arc<dyn RasterSource>, cache: &mut TierCache) {
        self.desired_tier = tier;
        self.latest_seq += 1;

        if tier == self.state.current_tier && self.active_mesh.is_some() {
            self.loading = false;
            return;
        }

        if let Some(entry) = cache.get(source.identifier(), tier) {
            self.activate(tier, entry.mesh);
            self.loading = false;
            return;
        }

        self.loading = true;
        if let Some(full) = &self.full_grid {
            spawn_build(self.completions_tx.clone(), self.latest_seq, tier, full.clone());
            self.in_flight += 1;
        } else if self.grid_fetch_seq.is_some() {
            // The raster itself is still loading; the retargeted tier is
            // issued as soon as the grid arrives.
        } else {
            self.grid_fetch_seq = Some(self.latest_seq);
            spawn_fetch_and_build(
                self.completions_tx.clone(),
                self.latest_seq,
                tier,
                source.clone(),
            );
            self.in_flight += 1;
        }
    }

    fn drain(&mut self, source: &Arc<dyn RasterSource>, cache: &mut TierCache) {
        let mut reissue = false;

        while let Ok(completion) = self.completions_rx.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            self.apply_completion(completion, source, cache, &mut reissue);
        }

        if reissue && self.desired_tier != self.state.current_tier {
            self.request(self.desired_tier, source, cache);
        }
    }

    fn apply_completion(
        &mut self,
        completion: Completion,
        source: &Arc<dyn RasterSource>,
        cache: &mut TierCache,
        reissue: &mut bool,
    ) -> FetchOutcome {
        let was_grid_fetch = self.grid_fetch_seq == Some(completion.seq);
        if was_grid_fetch {
            self.grid_fetch_seq = None;
        }

        match completion.result {
            Ok(asset) => {
                if let Some(full) = asset.full {
                    self.full_grid = Some(full);
                }
                cache.insert(
                    source.identifier(),
                    completion.tier,
                    asset.grid,
                    asset.mesh.clone(),
                );

                if completion.seq == self.latest_seq {
                    self.activate(completion.tier, asset.mesh);
                    self.loading = false;
                    FetchOutcome::Applied
                } else {
                    debug!(
                        "Discarding stale tier {} (request {} superseded by {})",
                        completion.tier, completion.seq, self.latest_seq
                    );
                    // A superseded grid fetch still unblocks the tier the
                    // viewer actually wants now.
                    if was_grid_fetch {
                        *reissue = true;
                    }
                    FetchOutcome::Stale
                }
            }
            Err(e) => {
                warn!("Tier {} fetch failed: {}", completion.tier, e);
                // A failed grid fetch also ends any retargeted request that
                // was waiting on it; nothing else can be in flight without
                // the full-resolution grid.
                if completion.seq == self.latest_seq || was_grid_fetch {
                    self.loading = false;
                    // Fall back to the last-good tier; the next evaluation
                    // may retry from a clean slate.
                    self.desired_tier = self.state.current_tier;
                }
                self.last_error = Some(e);
                FetchOutcome::Failed
            }
        }
    }

    fn activate(&mut self, tier: Tier, mesh: Arc<TerrainMesh>) {
        self.state.current_tier = tier;
        self.active_mesh = Some(mesh);
        self.mesh_version += 1;
        info!("Activated tier {} (mesh version {})", tier, self.mesh_version);
    }

    /// The mesh the renderer should draw, if any tier has landed yet.
    pub fn active_mesh(&self) -> Option<Arc<TerrainMesh>> {
        self.active_mesh.clone()
    }

    /// Increments on every active-mesh swap; check once per frame to know
    /// when to re-upload vertex data.
    pub fn mesh_version(&self) -> u64 {
        self.mesh_version
    }

    /// True from the moment a fetch is issued until the latest request
    /// completes or fails.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn current_tier(&self) -> Tier {
        self.state.current_tier
    }

    pub fn desired_tier(&self) -> Tier {
        self.desired_tier
    }

    pub fn last_evaluated_distance(&self) -> f32 {
        self.state.last_evaluated_distance
    }

    pub fn take_last_error(&mut self) -> Option<Error> {
        self.last_error.take()
    }

    pub fn settings(&self) -> &LodSettings {
        &self.settings
    }

    pub fn view_state(&self) -> &ViewState {
        &self.state
    }
}

fn spawn_build(tx: Sender<Completion>, seq: u64, tier: Tier, full: Arc<ElevationGrid>) {
    thread::spawn(move || {
        let grid = Arc::new(resample(&full, tier));
        let mesh = Arc::new(build_mesh(&grid));
        let _ = tx.send(Completion {
            seq,
            tier,
            result: Ok(TierAsset {
                full: None,
                grid,
                mesh,
            }),
        });
    });
}

fn spawn_fetch_and_build(
    tx: Sender<Completion>,
    seq: u64,
    tier: Tier,
    source: Arc<dyn RasterSource>,
) {
    thread::spawn(move || {
        let result = source.load().map(|full| {
            let full = Arc::new(full);
            let grid = Arc::new(resample(&full, tier));
            let mesh = Arc::new(build_mesh(&grid));
            TierAsset {
                full: Some(full),
                grid,
                mesh,
            }
        });
        let _ = tx.send(Completion { seq, tier, result });
    });
}
