//! Streaming configuration - serializable parameters for the terrain engine
//!
//! All knobs the scheduler, chunks and sampler consume live here, so a whole
//! terrain setup can be captured as a RON preset and restored later. The
//! seed is part of the noise parameters: same preset + same seed = same
//! world.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or saving a configuration preset.
#[derive(Debug, Error)]
pub enum PresetError {
    #[error("failed to read preset: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse preset: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("failed to encode preset: {0}")]
    Encode(#[from] ron::Error),
}

/// Fractal noise parameters for the height field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseParams {
    /// Seed for the gradient field.
    pub seed: i32,
    /// Number of detail layers.
    pub octaves: u32,
    /// How much each successive octave contributes.
    pub persistence: f32,
    /// How small the details of each successive octave are.
    pub lacunarity: f32,
    /// Base sampling scale; larger values mean wider features.
    pub scale: f32,
    /// World-space offset applied before sampling (relocates the relief).
    pub offset: Vec2,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            seed: 0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            scale: 20.0,
            offset: Vec2::ZERO,
        }
    }
}

impl NoiseParams {
    /// Replace the seed with a random one.
    pub fn with_random_seed(mut self) -> Self {
        self.seed = rand::thread_rng().gen_range(-100_000..100_000);
        self
    }

    /// Parameters for a coarser LOD tier: the sampling scale grows with the
    /// tier multiplier so far tiles sample cheaper, lower-frequency detail.
    pub fn for_tier(&self, multiplier: u32) -> Self {
        let mut scaled = *self;
        scaled.scale = self.scale * multiplier.max(1) as f32;
        scaled
    }
}

/// Level-of-detail tiers: ascending distance thresholds paired with chunk
/// edge multipliers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LodParams {
    /// Edge-length multiplier per tier (tier 0 is the base chunk size).
    pub multipliers: Vec<u32>,
    /// Distance thresholds classifying a chunk into a tier.
    pub ranges: Vec<f32>,
}

impl Default for LodParams {
    fn default() -> Self {
        Self {
            multipliers: vec![1, 2, 4],
            ranges: vec![50.0, 150.0, 400.0],
        }
    }
}

impl LodParams {
    pub fn tier_count(&self) -> usize {
        self.multipliers.len().max(1)
    }

    /// Edge multiplier for a tier, clamped to a sane minimum.
    pub fn multiplier(&self, tier: usize) -> u32 {
        self.multipliers.get(tier).copied().unwrap_or(1).max(1)
    }

    /// Tier for a viewpoint distance: index of the first threshold at or
    /// beyond the distance, clamped to the last tier.
    pub fn tier_for_distance(&self, distance: f32) -> usize {
        let last = self.tier_count() - 1;
        for (i, range) in self.ranges.iter().enumerate() {
            if distance <= *range {
                return i.min(last);
            }
        }
        self.ranges.len().min(last)
    }
}

/// Optional cave carving applied while filling the occupancy grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaveParams {
    pub enabled: bool,
    /// Sampling scale of the 3D density field.
    pub scale: f32,
    /// Voxels whose normalized density reaches this threshold are carved out.
    pub density_threshold: f32,
}

impl Default for CaveParams {
    fn default() -> Self {
        Self {
            enabled: false,
            scale: 0.05,
            density_threshold: 0.5,
        }
    }
}

/// Complete streaming-terrain configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainConfig {
    /// Edge length of a base (tier 0) chunk, in world units.
    pub chunk_size: u32,
    /// Maximum relief height, in voxels.
    pub max_height: u32,
    /// Ground below this height counts as underwater for decoration placement.
    pub water_level: f32,
    pub noise: NoiseParams,
    pub lod: LodParams,
    pub caves: CaveParams,
    /// How many base chunks around the viewpoint to keep rendered.
    pub render_radius: i32,
    /// Extra ring kept in memory before chunks are released to the pool.
    pub keep_margin: i32,
    /// Seconds between desired-set re-evaluations.
    pub update_interval: f32,
    /// Chunks completed per scheduler tick.
    pub create_per_tick: usize,
    /// Chunk instances prewarmed per LOD tier.
    pub pool_initial_per_tier: usize,
    /// Millisecond budget for generation work within one tick; `None` means
    /// only the per-tick item count bounds the work.
    pub budget_ms: Option<u32>,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            chunk_size: 16,
            max_height: 32,
            water_level: 0.0,
            noise: NoiseParams::default(),
            lod: LodParams::default(),
            caves: CaveParams::default(),
            render_radius: 4,
            keep_margin: 2,
            update_interval: 0.18,
            create_per_tick: 2,
            pool_initial_per_tier: 8,
            budget_ms: Some(32),
        }
    }
}

impl TerrainConfig {
    /// Radius, in base chunks, inside which chunks are kept alive.
    pub fn keep_radius(&self) -> i32 {
        self.render_radius + self.keep_margin
    }

    /// Clamp degenerate parameters to safe values. Zero or negative sizes,
    /// tier multipliers and octave counts are raised to 1 rather than
    /// rejected.
    pub fn sanitize(mut self) -> Self {
        self.chunk_size = self.chunk_size.max(1);
        self.max_height = self.max_height.max(1);
        self.render_radius = self.render_radius.max(0);
        self.keep_margin = self.keep_margin.max(0);
        self.update_interval = self.update_interval.max(0.0);
        self.create_per_tick = self.create_per_tick.max(1);
        self.noise.octaves = self.noise.octaves.max(1);
        self.noise.scale = self.noise.scale.max(f32::EPSILON);
        self.noise.lacunarity = self.noise.lacunarity.max(f32::EPSILON);
        self.caves.scale = self.caves.scale.max(f32::EPSILON);
        if self.lod.multipliers.is_empty() {
            self.lod.multipliers.push(1);
        }
        for multiplier in &mut self.lod.multipliers {
            *multiplier = (*multiplier).max(1);
        }
        self
    }

    /// Parse a configuration from RON preset text.
    pub fn from_preset_str(text: &str) -> Result<Self, PresetError> {
        Ok(ron::from_str::<Self>(text)?.sanitize())
    }

    /// Encode the configuration as RON preset text.
    pub fn to_preset_string(&self) -> Result<String, PresetError> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    /// Load a preset file from disk.
    pub fn load_preset<P: AsRef<Path>>(path: P) -> Result<Self, PresetError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_preset_str(&text)
    }

    /// Write the configuration as a preset file.
    pub fn save_preset<P: AsRef<Path>>(&self, path: P) -> Result<(), PresetError> {
        std::fs::write(path, self.to_preset_string()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TerrainConfig::default();
        assert_eq!(config.chunk_size, 16);
        assert_eq!(config.max_height, 32);
        assert_eq!(config.keep_radius(), 6);
        assert_eq!(config.lod.tier_count(), 3);
        assert_eq!(config.noise.octaves, 4);
    }

    #[test]
    fn test_sanitize_clamps_degenerate_values() {
        let mut config = TerrainConfig::default();
        config.chunk_size = 0;
        config.max_height = 0;
        config.create_per_tick = 0;
        config.noise.octaves = 0;
        config.lod.multipliers = vec![0, 2];
        let config = config.sanitize();

        assert_eq!(config.chunk_size, 1);
        assert_eq!(config.max_height, 1);
        assert_eq!(config.create_per_tick, 1);
        assert_eq!(config.noise.octaves, 1);
        assert_eq!(config.lod.multipliers, vec![1, 2]);
    }

    #[test]
    fn test_sanitize_restores_empty_tier_table() {
        let mut config = TerrainConfig::default();
        config.lod.multipliers.clear();
        let config = config.sanitize();
        assert_eq!(config.lod.multipliers, vec![1]);
    }

    #[test]
    fn test_tier_for_distance() {
        let lod = LodParams::default();
        assert_eq!(lod.tier_for_distance(0.0), 0);
        assert_eq!(lod.tier_for_distance(50.0), 0);
        assert_eq!(lod.tier_for_distance(51.0), 1);
        assert_eq!(lod.tier_for_distance(150.0), 1);
        assert_eq!(lod.tier_for_distance(300.0), 2);
        // Beyond the last threshold stays on the coarsest tier
        assert_eq!(lod.tier_for_distance(10_000.0), 2);
    }

    #[test]
    fn test_tier_for_distance_clamps_to_multiplier_table() {
        let lod = LodParams {
            multipliers: vec![1, 2],
            ranges: vec![10.0, 20.0, 30.0],
        };
        assert_eq!(lod.tier_for_distance(25.0), 1);
        assert_eq!(lod.tier_for_distance(100.0), 1);
    }

    #[test]
    fn test_noise_params_for_tier() {
        let noise = NoiseParams::default();
        let coarse = noise.for_tier(4);
        assert_eq!(coarse.scale, noise.scale * 4.0);
        assert_eq!(coarse.seed, noise.seed);
        assert_eq!(coarse.octaves, noise.octaves);
    }

    #[test]
    fn test_random_seed_in_range() {
        for _ in 0..16 {
            let noise = NoiseParams::default().with_random_seed();
            assert!((-100_000..100_000).contains(&noise.seed));
        }
    }

    #[test]
    fn test_preset_round_trip() {
        let mut config = TerrainConfig::default();
        config.noise.seed = 4242;
        config.caves.enabled = true;

        let text = config.to_preset_string().expect("Failed to serialize");
        let restored = TerrainConfig::from_preset_str(&text).expect("Failed to deserialize");
        assert_eq!(config, restored);
    }
}
