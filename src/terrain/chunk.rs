//! Chunk data - occupancy grids, generated tiles and resumable population

use crate::terrain::biome::{BiomeRegistry, PlacedObject};
use crate::terrain::config::{CaveParams, NoiseParams, TerrainConfig};
use crate::terrain::mesher::{MeshData, VoxelMesher};
use crate::terrain::sampler::FractalSampler;
use crate::terrain::scheduler::{StepResult, TickBudget};
use fastnoise_lite::{FastNoiseLite, NoiseType};
use glam::{IVec2, Vec2, Vec3};

/// Lattice coordinate of the chunk containing a world position.
pub fn world_to_chunk(x: f32, z: f32, chunk_size: u32) -> IVec2 {
    let size = chunk_size.max(1) as f32;
    IVec2::new((x / size).floor() as i32, (z / size).floor() as i32)
}

/// World-space center of a chunk footprint.
pub fn chunk_center(coord: IVec2, chunk_size: u32) -> Vec2 {
    (coord.as_vec2() + 0.5) * chunk_size.max(1) as f32
}

/// 3D boolean grid of solid voxels. Reads outside the grid report empty,
/// which is what makes border faces of a chunk visible.
#[derive(Debug, Clone)]
pub struct OccupancyGrid {
    size_x: usize,
    size_y: usize,
    size_z: usize,
    cells: Vec<bool>,
}

impl OccupancyGrid {
    pub fn new(size_x: usize, size_y: usize, size_z: usize) -> Self {
        let size_x = size_x.max(1);
        let size_y = size_y.max(1);
        let size_z = size_z.max(1);
        Self {
            size_x,
            size_y,
            size_z,
            cells: vec![false; size_x * size_y * size_z],
        }
    }

    pub fn dimensions(&self) -> (usize, usize, usize) {
        (self.size_x, self.size_y, self.size_z)
    }

    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (y * self.size_z + z) * self.size_x + x
    }

    /// Solid test; out-of-range coordinates read as empty.
    pub fn get(&self, x: isize, y: isize, z: isize) -> bool {
        if x < 0
            || y < 0
            || z < 0
            || x >= self.size_x as isize
            || y >= self.size_y as isize
            || z >= self.size_z as isize
        {
            return false;
        }
        self.cells[self.index(x as usize, y as usize, z as usize)]
    }

    pub fn set(&mut self, x: usize, y: usize, z: usize, solid: bool) {
        if x < self.size_x && y < self.size_y && z < self.size_z {
            let index = self.index(x, y, z);
            self.cells[index] = solid;
        }
    }

    /// Mark all voxels below `height` in a column as solid.
    pub fn fill_column(&mut self, x: usize, z: usize, height: usize) {
        for y in 0..height.min(self.size_y) {
            self.set(x, y, z, true);
        }
    }

    pub fn solid_count(&self) -> usize {
        self.cells.iter().filter(|solid| **solid).count()
    }
}

/// Per-instance chunk settings handed over by the scheduler when a pooled
/// or fresh chunk is activated. Optional behaviors are plain fields with
/// defaults, so a template never needs runtime inspection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkTemplate {
    /// Ground at or below this height counts as underwater.
    pub water_level: f32,
    /// Apply the LOD tier multiplier as horizontal sampling stride. When
    /// false every tier samples at full resolution.
    pub lod_voxel_step: bool,
    /// Sample per-vertex ground colors from the biome registry.
    pub colored: bool,
}

impl Default for ChunkTemplate {
    fn default() -> Self {
        Self {
            water_level: 0.0,
            lod_voxel_step: true,
            colored: true,
        }
    }
}

/// One generated terrain tile: its lattice coordinate, LOD tier, sampled
/// column heights, occupancy grid, mesh buffers and decorations.
///
/// A chunk instance always lives in exactly one place - the active set or
/// one tier pool - because it is moved by value between them.
#[derive(Debug, Clone)]
pub struct Chunk {
    coord: IVec2,
    tier: usize,
    size: u32,
    max_height: u32,
    voxel_step: u32,
    water_level: f32,
    colored: bool,
    origin: Vec3,
    noise: NoiseParams,
    caves: CaveParams,
    heights: Vec<u32>,
    grid: OccupancyGrid,
    mesh: MeshData,
    pub visible: bool,
    pub decorations: Vec<PlacedObject>,
}

impl Default for Chunk {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunk {
    /// An inactive template instance, ready to be configured.
    pub fn new() -> Self {
        Self {
            coord: IVec2::ZERO,
            tier: 0,
            size: 1,
            max_height: 1,
            voxel_step: 1,
            water_level: 0.0,
            colored: false,
            origin: Vec3::ZERO,
            noise: NoiseParams::default(),
            caves: CaveParams::default(),
            heights: Vec::new(),
            grid: OccupancyGrid::new(1, 1, 1),
            mesh: MeshData::new(),
            visible: false,
            decorations: Vec::new(),
        }
    }

    /// Reconfigure the instance for a coordinate and LOD tier. The edge
    /// length is the base size times the tier multiplier (clamped to at
    /// least 1) and the noise scale grows by the same factor so coarser
    /// tiers sample coarser detail. All previously generated content is
    /// dropped.
    pub fn configure(
        &mut self,
        coord: IVec2,
        tier: usize,
        config: &TerrainConfig,
        template: &ChunkTemplate,
    ) {
        let base = config.chunk_size.max(1);
        let multiplier = config.lod.multiplier(tier);

        self.coord = coord;
        self.tier = tier;
        self.size = (base * multiplier).max(1);
        self.max_height = config.max_height.max(1);
        self.voxel_step = if template.lod_voxel_step { multiplier } else { 1 };
        self.water_level = template.water_level;
        self.colored = template.colored;
        // Chunks stay on the base-size lattice even when the tier covers
        // more world area.
        self.origin = Vec3::new(
            (coord.x * base as i32) as f32,
            0.0,
            (coord.y * base as i32) as f32,
        );
        self.noise = config.noise.for_tier(multiplier);
        self.caves = config.caves;
        self.visible = false;
        self.heights.clear();
        self.grid = OccupancyGrid::new(1, 1, 1);
        self.mesh.clear();
        self.decorations.clear();
    }

    pub fn coord(&self) -> IVec2 {
        self.coord
    }

    pub fn tier(&self) -> usize {
        self.tier
    }

    /// Edge length in world units.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn max_height(&self) -> u32 {
        self.max_height
    }

    pub fn voxel_step(&self) -> u32 {
        self.voxel_step
    }

    pub fn water_level(&self) -> f32 {
        self.water_level
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn noise(&self) -> &NoiseParams {
        &self.noise
    }

    pub fn heights(&self) -> &[u32] {
        &self.heights
    }

    pub fn grid(&self) -> &OccupancyGrid {
        &self.grid
    }

    pub fn mesh(&self) -> &MeshData {
        &self.mesh
    }

    /// Collider geometry. It is the render mesh itself, so the two can
    /// never drift apart across regenerations.
    pub fn collider(&self) -> &MeshData {
        &self.mesh
    }

    pub fn is_populated(&self) -> bool {
        !self.mesh.is_empty()
    }

    /// World-space bounding volume of the tile footprint.
    pub fn aabb(&self) -> (Vec3, Vec3) {
        let extent = Vec3::new(self.size as f32, self.max_height as f32, self.size as f32);
        (self.origin, self.origin + extent)
    }

    /// Number of sampled columns along one horizontal axis.
    fn cells(&self) -> usize {
        (self.size as usize / self.voxel_step.max(1) as usize).max(1)
    }

    fn begin_population(&mut self) {
        let cells = self.cells();
        self.heights.clear();
        self.heights.resize(cells * cells, 0);
        self.grid = OccupancyGrid::new(cells, self.max_height as usize, cells);
        self.mesh.clear();
    }

    fn set_column(&mut self, cx: usize, cz: usize, height: u32) {
        let cells = self.cells();
        self.heights[cz * cells + cx] = height;
        self.grid.fill_column(cx, cz, height as usize);
    }

    fn build_mesh(&mut self, biomes: &BiomeRegistry) {
        let step = self.voxel_step.max(1) as f32;
        let mesher = VoxelMesher::new(Vec3::new(step, 1.0, step));
        self.mesh = if self.colored && !biomes.is_empty() {
            let origin = Vec2::new(self.origin.x, self.origin.z);
            mesher.mesh_colored(&self.grid, origin, &|x, z| biomes.ground_color(x, z))
        } else {
            mesher.mesh(&self.grid)
        };
    }

    /// Regenerate the chunk's geometry in one go, fully replacing any
    /// previous buffers. Streaming uses the budgeted [`ChunkBuilder`]
    /// instead; this is the synchronous entry point of the chunk contract.
    pub fn regenerate(&mut self, biomes: &BiomeRegistry) {
        let sampler = FractalSampler::new(self.noise, self.max_height as f32);
        let mut builder = ChunkBuilder::new();
        let mut budget = TickBudget::unbounded();
        while builder.step(self, &sampler, biomes, &mut budget) == StepResult::InProgress {}
    }
}

// Seed offset separating the cave density field from the height field.
const CAVE_SEED_OFFSET: i32 = 13;

/// Resumable chunk population.
///
/// Tracks a column cursor so heightfield sampling can pause when the tick's
/// time budget runs out and resume on the next tick. The final meshing step
/// runs once all columns are filled. A chunk built this way is never
/// observable half-generated: the scheduler only activates it after `step`
/// returns [`StepResult::Done`].
#[derive(Default)]
pub struct ChunkBuilder {
    next_column: usize,
    started: bool,
    cave_noise: Option<FastNoiseLite>,
}

impl ChunkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(
        &mut self,
        chunk: &mut Chunk,
        sampler: &FractalSampler,
        biomes: &BiomeRegistry,
        budget: &mut TickBudget,
    ) -> StepResult {
        if !self.started {
            chunk.begin_population();
            if chunk.caves.enabled {
                let mut noise =
                    FastNoiseLite::with_seed(chunk.noise.seed.wrapping_add(CAVE_SEED_OFFSET));
                noise.set_noise_type(Some(NoiseType::OpenSimplex2));
                noise.set_frequency(Some(1.0));
                self.cave_noise = Some(noise);
            }
            self.started = true;
        }

        let cells = chunk.cells();
        let step = chunk.voxel_step.max(1) as usize;
        let total = cells * cells;

        while self.next_column < total {
            let cx = self.next_column % cells;
            let cz = self.next_column / cells;
            let world_x = chunk.origin.x + (cx * step) as f32;
            let world_z = chunk.origin.z + (cz * step) as f32;

            let height = sampler.column_height(world_x, world_z).min(chunk.max_height);
            chunk.set_column(cx, cz, height);

            if let Some(noise) = &self.cave_noise {
                let scale = chunk.caves.scale;
                for y in 0..height as usize {
                    let density = (noise.get_noise_3d(
                        world_x * scale,
                        y as f32 * scale,
                        world_z * scale,
                    ) + 1.0)
                        * 0.5;
                    if density >= chunk.caves.density_threshold {
                        chunk.grid.set(cx, y, cz, false);
                    }
                }
            }

            self.next_column += 1;
            // Checked after the column so every step makes progress even
            // under an exhausted budget.
            if budget.out_of_time() && self.next_column < total {
                return StepResult::InProgress;
            }
        }

        chunk.build_mesh(biomes);
        StepResult::Done
    }
}
