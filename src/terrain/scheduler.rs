//! Streaming scheduler - reconciles the active chunk set with the viewpoint
//!
//! One pass walks Idle -> Diffing -> Releasing -> Creating -> Idle. The
//! pass is a plain resumable value driven by `tick`: it releases far chunks
//! first to bound peak instance count, then creates missing chunks nearest
//! first, at a fixed rate per tick and within an optional millisecond
//! budget. Moving the viewpoint to a new lattice coordinate supersedes the
//! in-flight pass; a partially built chunk goes back to its pool and is
//! never observable in the active set.

use crate::terrain::biome::BiomeRegistry;
use crate::terrain::chunk::{chunk_center, world_to_chunk, Chunk, ChunkBuilder, ChunkTemplate};
use crate::terrain::config::TerrainConfig;
use crate::terrain::culling::{cull_chunks, cull_decorations, Frustum, LayerCullDistances};
use crate::terrain::sampler::{FractalSampler, HeightField};
use crate::terrain::store::ChunkStore;
use glam::{IVec2, Vec2, Vec3};
use std::time::Duration;
use web_time::Instant;

/// Outcome of stepping a resumable task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    InProgress,
    Done,
}

/// Work allowance for one scheduler tick: an item count plus an optional
/// wall-clock deadline.
pub struct TickBudget {
    deadline: Option<Instant>,
    items_left: usize,
}

impl TickBudget {
    pub fn new(max_items: usize, max_millis: Option<u32>) -> Self {
        Self {
            deadline: max_millis
                .map(|millis| Instant::now() + Duration::from_millis(u64::from(millis))),
            items_left: max_items.max(1),
        }
    }

    /// No limits; used for synchronous regeneration.
    pub fn unbounded() -> Self {
        Self {
            deadline: None,
            items_left: usize::MAX,
        }
    }

    pub fn out_of_time(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    pub fn consume_item(&mut self) {
        self.items_left = self.items_left.saturating_sub(1);
    }

    pub fn items_exhausted(&self) -> bool {
        self.items_left == 0
    }

    pub fn exhausted(&self) -> bool {
        self.items_left == 0 || self.out_of_time()
    }
}

/// One planned reconciliation: far coordinates to release and missing
/// coordinates to create, nearest first, with cursors marking progress.
struct StreamPass {
    to_release: Vec<IVec2>,
    to_create: Vec<(IVec2, usize)>,
    next_release: usize,
    next_create: usize,
}

impl StreamPass {
    /// Diff the desired set around `center` against the active set.
    fn plan(center: IVec2, viewpoint: Vec2, config: &TerrainConfig, store: &ChunkStore) -> Self {
        let radius = config.keep_radius();

        let mut to_release: Vec<IVec2> = store
            .active_coords()
            .into_iter()
            .filter(|coord| {
                (coord.x - center.x).abs() > radius || (coord.y - center.y).abs() > radius
            })
            .collect();
        // The active map iterates in hash order; sort for reproducible logs.
        to_release.sort_unstable_by_key(|coord| (coord.x, coord.y));

        let mut to_create: Vec<(IVec2, usize, f32)> = Vec::new();
        for dx in -radius..=radius {
            for dz in -radius..=radius {
                let coord = IVec2::new(center.x + dx, center.y + dz);
                if store.contains(coord) {
                    continue;
                }
                let distance = chunk_center(coord, config.chunk_size).distance(viewpoint);
                let tier = config.lod.tier_for_distance(distance);
                to_create.push((coord, tier, distance));
            }
        }
        // Nearest first, so visible content appears before distant content.
        to_create.sort_by(|a, b| a.2.total_cmp(&b.2));

        Self {
            to_release,
            to_create: to_create
                .into_iter()
                .map(|(coord, tier, _)| (coord, tier))
                .collect(),
            next_release: 0,
            next_create: 0,
        }
    }
}

/// A chunk being generated for the current pass. It only enters the active
/// set once its builder reports completion.
struct PendingChunk {
    coord: IVec2,
    tier: usize,
    chunk: Chunk,
    builder: ChunkBuilder,
}

/// Streams terrain chunks around a moving viewpoint.
pub struct StreamingScheduler {
    config: TerrainConfig,
    sampler: Option<FractalSampler>,
    template: Option<ChunkTemplate>,
    biomes: BiomeRegistry,
    store: ChunkStore,
    viewpoint: Option<Vec3>,
    current_coord: Option<IVec2>,
    pass: Option<StreamPass>,
    pending: Option<PendingChunk>,
    since_evaluation: f32,
}

impl StreamingScheduler {
    pub fn new(config: TerrainConfig) -> Self {
        let config = config.sanitize();
        let mut store = ChunkStore::new(config.lod.tier_count());
        store.prewarm(config.pool_initial_per_tier);
        Self {
            config,
            sampler: None,
            template: None,
            biomes: BiomeRegistry::new(),
            store,
            viewpoint: None,
            current_coord: None,
            pass: None,
            pending: None,
            since_evaluation: f32::MAX,
        }
    }

    /// Wire a sampler built from the config's own noise parameters and a
    /// default chunk template.
    pub fn with_default_generators(mut self) -> Self {
        self.sampler = Some(FractalSampler::new(
            self.config.noise,
            self.config.max_height as f32,
        ));
        self.template = Some(ChunkTemplate {
            water_level: self.config.water_level,
            ..ChunkTemplate::default()
        });
        self
    }

    pub fn set_sampler(&mut self, sampler: FractalSampler) {
        self.sampler = Some(sampler);
    }

    pub fn set_template(&mut self, template: ChunkTemplate) {
        self.template = Some(template);
    }

    /// (Re)target the streaming center, e.g. once a player avatar exists.
    pub fn set_viewpoint(&mut self, position: Vec3) {
        self.viewpoint = Some(position);
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    pub fn biomes(&self) -> &BiomeRegistry {
        &self.biomes
    }

    pub fn biomes_mut(&mut self) -> &mut BiomeRegistry {
        &mut self.biomes
    }

    /// Whether a reconciliation pass is currently in flight.
    pub fn is_streaming(&self) -> bool {
        self.pass.is_some() || self.pending.is_some()
    }

    /// Advance streaming by one tick of `dt` seconds. Re-evaluates the
    /// desired set at the configured interval and then performs up to one
    /// budget's worth of release/create work. Returns
    /// [`StepResult::InProgress`] while a pass has work left.
    pub fn tick(&mut self, dt: f32) -> StepResult {
        self.since_evaluation = self.since_evaluation.max(0.0) + dt.max(0.0);
        if self.since_evaluation >= self.config.update_interval {
            self.since_evaluation = 0.0;
            self.evaluate_viewpoint();
        }
        self.step_pass()
    }

    /// Frustum-cull active chunks, toggling their visibility only.
    pub fn cull(&mut self, frustum: &Frustum) -> usize {
        cull_chunks(&mut self.store, frustum)
    }

    /// Distance-cull decorations per culling layer around the viewpoint.
    pub fn cull_decorations(&mut self, distances: &LayerCullDistances) -> usize {
        match self.viewpoint {
            Some(viewpoint) => cull_decorations(&mut self.store, viewpoint, distances),
            None => 0,
        }
    }

    fn evaluate_viewpoint(&mut self) {
        if self.sampler.is_none() || self.template.is_none() {
            log::trace!("streaming skipped: no terrain generator configured");
            return;
        }
        let Some(viewpoint) = self.viewpoint else {
            log::trace!("streaming skipped: no viewpoint assigned");
            return;
        };

        let coord = world_to_chunk(viewpoint.x, viewpoint.z, self.config.chunk_size);
        if self.current_coord == Some(coord) {
            return;
        }
        self.current_coord = Some(coord);

        // Supersede the in-flight pass: a half-built chunk goes back to the
        // pool, and the new plan starts from the store's current state.
        if let Some(pending) = self.pending.take() {
            log::debug!(
                "superseded generation of chunk {:?} (tier {})",
                pending.coord,
                pending.tier
            );
            self.store.return_to_pool(pending.chunk);
        }

        let pass = StreamPass::plan(
            coord,
            Vec2::new(viewpoint.x, viewpoint.z),
            &self.config,
            &self.store,
        );
        log::debug!(
            "streaming pass planned at {:?}: {} to release, {} to create",
            coord,
            pass.to_release.len(),
            pass.to_create.len()
        );
        self.pass = Some(pass);
    }

    fn step_pass(&mut self) -> StepResult {
        let Some(mut pass) = self.pass.take() else {
            return StepResult::Done;
        };
        let mut budget = TickBudget::new(self.config.create_per_tick, self.config.budget_ms);

        // Releasing: always ahead of creation so instance count peaks low.
        // The budget check follows the work so every tick progresses.
        while pass.next_release < pass.to_release.len() {
            self.store.release(pass.to_release[pass.next_release]);
            pass.next_release += 1;
            if budget.out_of_time() && pass.next_release < pass.to_release.len() {
                self.pass = Some(pass);
                return StepResult::InProgress;
            }
        }

        // Creating: nearest first, resuming any chunk already in progress.
        loop {
            if let Some(mut pending) = self.pending.take() {
                let Some(sampler) = self.sampler.as_ref() else {
                    self.store.return_to_pool(pending.chunk);
                    return StepResult::Done;
                };
                match pending
                    .builder
                    .step(&mut pending.chunk, sampler, &self.biomes, &mut budget)
                {
                    StepResult::InProgress => {
                        self.pending = Some(pending);
                        self.pass = Some(pass);
                        return StepResult::InProgress;
                    }
                    StepResult::Done => {
                        self.biomes.process_chunk(&mut pending.chunk, sampler);
                        pending.chunk.visible = true;
                        self.store.insert_active(pending.coord, pending.chunk);
                        budget.consume_item();
                        log::trace!(
                            "activated chunk {:?} (tier {})",
                            pending.coord,
                            pending.tier
                        );
                    }
                }
                continue;
            }

            if pass.next_create >= pass.to_create.len() {
                log::debug!("streaming pass complete");
                return StepResult::Done;
            }
            // Only the item count gates starting the next chunk; the time
            // budget is enforced column-by-column inside the builder, which
            // always advances at least one column per tick.
            if budget.items_exhausted() {
                self.pass = Some(pass);
                return StepResult::InProgress;
            }

            let (coord, tier) = pass.to_create[pass.next_create];
            pass.next_create += 1;
            let Some(template) = self.template.as_ref() else {
                return StepResult::Done;
            };

            let mut chunk = self.store.borrow(tier);
            chunk.configure(coord, tier, &self.config, template);
            self.pending = Some(PendingChunk {
                coord,
                tier,
                chunk,
                builder: ChunkBuilder::new(),
            });
        }
    }
}

impl HeightField for StreamingScheduler {
    fn height(&self, x: f32, z: f32) -> f32 {
        self.sampler.as_ref().map_or(0.0, |sampler| sampler.height(x, z))
    }

    fn is_generated(&self, x: f32, z: f32) -> bool {
        self.store
            .contains(world_to_chunk(x, z, self.config.chunk_size))
    }
}
