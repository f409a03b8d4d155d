//! Height sampling - deterministic fractal Perlin height fields

use crate::terrain::config::NoiseParams;
use fastnoise_lite::{FastNoiseLite, NoiseType};

/// Capability interface of a terrain generation strategy.
///
/// Implemented independently by each strategy (fixed-map heightfield,
/// streamed chunk set) and selected via composition; collaborators such as
/// entity spawners only ever see this trait.
pub trait HeightField {
    /// Terrain height at a world position, in `[0, max_height]`.
    fn height(&self, x: f32, z: f32) -> f32;

    /// Whether the position currently lies inside generated terrain, i.e.
    /// entities can safely be placed there.
    fn is_generated(&self, x: f32, z: f32) -> bool;
}

/// Multi-octave Perlin height sampler.
///
/// Pure function of (seed, position, parameters): two samplers built from
/// the same parameters agree everywhere. With `octaves = 1` the fractal sum
/// degrades to the plain `perlin01(x / scale, z / scale) * max_height`
/// legacy surface.
pub struct FractalSampler {
    noise: FastNoiseLite,
    params: NoiseParams,
    max_height: f32,
}

impl FractalSampler {
    pub fn new(params: NoiseParams, max_height: f32) -> Self {
        let mut noise = FastNoiseLite::with_seed(params.seed);
        noise.set_noise_type(Some(NoiseType::Perlin));
        noise.set_frequency(Some(1.0));
        Self {
            noise,
            params,
            max_height: max_height.max(1.0),
        }
    }

    pub fn params(&self) -> &NoiseParams {
        &self.params
    }

    pub fn max_height(&self) -> f32 {
        self.max_height
    }

    /// Height of the relief at a world position.
    ///
    /// Octave i samples the gradient field at
    /// `(p + offset) * frequency / scale` with amplitude `persistence^i`
    /// and frequency `lacunarity^i`; the signed sum is renormalized to
    /// `[0, 1]` and scaled by the maximum height.
    pub fn height(&self, x: f32, z: f32) -> f32 {
        let p = &self.params;
        let mut amplitude = 1.0f32;
        let mut frequency = 1.0f32;
        let mut sum = 0.0f32;

        for _ in 0..p.octaves.max(1) {
            let sample_x = (x + p.offset.x) / p.scale * frequency;
            let sample_z = (z + p.offset.y) / p.scale * frequency;
            sum += self.noise.get_noise_2d(sample_x, sample_z) * amplitude;
            amplitude *= p.persistence;
            frequency *= p.lacunarity;
        }

        let normalized = ((sum + 1.0) * 0.5).clamp(0.0, 1.0);
        normalized * self.max_height
    }

    /// Solid voxel count of a terrain column. Never below 1 so every column
    /// produces at least a ground layer.
    pub fn column_height(&self, x: f32, z: f32) -> u32 {
        let h = self.height(x, z).floor() as i64;
        h.clamp(1, self.max_height as i64) as u32
    }
}

/// Fixed-map strategy: one pre-sized square of terrain, generated in full.
///
/// `is_generated` simply reports whether the position falls inside the map
/// bounds.
pub struct BoundedHeightField {
    sampler: FractalSampler,
    map_size: f32,
}

impl BoundedHeightField {
    pub fn new(sampler: FractalSampler, map_size: f32) -> Self {
        Self {
            sampler,
            map_size: map_size.max(0.0),
        }
    }

    pub fn sampler(&self) -> &FractalSampler {
        &self.sampler
    }
}

impl HeightField for BoundedHeightField {
    fn height(&self, x: f32, z: f32) -> f32 {
        self.sampler.height(x, z)
    }

    fn is_generated(&self, x: f32, z: f32) -> bool {
        x >= 0.0 && x < self.map_size && z >= 0.0 && z < self.map_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sampler_with_seed(seed: i32) -> FractalSampler {
        let params = NoiseParams {
            seed,
            ..NoiseParams::default()
        };
        FractalSampler::new(params, 32.0)
    }

    #[test]
    fn test_height_is_deterministic() {
        let a = sampler_with_seed(42);
        let b = sampler_with_seed(42);

        for i in -50..50 {
            let x = i as f32 * 1.7;
            let z = i as f32 * -3.1;
            assert_eq!(a.height(x, z), b.height(x, z), "Mismatch at ({x}, {z})");
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = sampler_with_seed(1);
        let b = sampler_with_seed(2);

        let mut any_difference = false;
        for i in 0..100 {
            let x = i as f32 * 2.3;
            if (a.height(x, 7.0) - b.height(x, 7.0)).abs() > f32::EPSILON {
                any_difference = true;
                break;
            }
        }
        assert!(any_difference, "Seeds 1 and 2 produced identical fields");
    }

    #[test]
    fn test_height_bounds() {
        let sampler = sampler_with_seed(1337);
        for ix in -40..40 {
            for iz in -40..40 {
                let h = sampler.height(ix as f32 * 3.7, iz as f32 * 5.1);
                assert!(
                    (0.0..=32.0).contains(&h),
                    "Height {h} out of bounds at ({ix}, {iz})"
                );
            }
        }
    }

    #[test]
    fn test_single_octave_matches_plain_perlin() {
        // octaves = 1 must reduce to perlin01 * max_height: the fractal
        // renormalization is the identity for a single layer.
        let params = NoiseParams {
            seed: 7,
            octaves: 1,
            ..NoiseParams::default()
        };
        let sampler = FractalSampler::new(params, 32.0);

        let mut raw = FastNoiseLite::with_seed(7);
        raw.set_noise_type(Some(NoiseType::Perlin));
        raw.set_frequency(Some(1.0));

        for i in 0..50 {
            let x = i as f32 * 4.3;
            let z = i as f32 * -2.9;
            let expected = (raw.get_noise_2d(x / params.scale, z / params.scale) + 1.0)
                * 0.5
                * 32.0;
            assert!((sampler.height(x, z) - expected).abs() < 1e-4);
        }
    }

    #[test]
    fn test_column_height_has_ground_layer() {
        let sampler = sampler_with_seed(9);
        for i in -30..30 {
            let h = sampler.column_height(i as f32 * 11.0, i as f32 * 13.0);
            assert!((1..=32).contains(&h));
        }
    }

    #[test]
    fn test_bounded_field_reports_map_bounds() {
        let field = BoundedHeightField::new(sampler_with_seed(3), 100.0);
        assert!(field.is_generated(0.0, 0.0));
        assert!(field.is_generated(99.0, 99.0));
        assert!(!field.is_generated(100.0, 0.0));
        assert!(!field.is_generated(-1.0, 50.0));
    }
}
