//! Terrain core - sampling, meshing, chunk streaming

pub mod biome;
pub mod chunk;
pub mod config;
pub mod culling;
pub mod mesher;
pub mod sampler;
pub mod scheduler;
pub mod store;

pub use biome::{
    BiomeDefinition, BiomeRegistry, BiomeShape, DecorationKind, PlacedObject, PlacedPart,
};
pub use chunk::{chunk_center, world_to_chunk, Chunk, ChunkBuilder, ChunkTemplate, OccupancyGrid};
pub use config::{CaveParams, LodParams, NoiseParams, PresetError, TerrainConfig};
pub use culling::{cull_chunks, cull_decorations, Frustum, LayerCullDistances};
pub use mesher::{MeshData, VoxelMesher};
pub use sampler::{BoundedHeightField, FractalSampler, HeightField};
pub use scheduler::{StepResult, StreamingScheduler, TickBudget};
pub use store::ChunkStore;
