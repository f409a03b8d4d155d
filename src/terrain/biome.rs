//! Biome regions and deterministic decoration placement
//!
//! Biomes are area descriptors held in an insertion-ordered registry; the
//! first registered biome containing a point claims it, so background
//! ("global") biomes should be registered last. Placement decisions are
//! pure functions of world coordinates: regenerating a chunk reproduces
//! its decorations exactly.

use crate::terrain::chunk::Chunk;
use crate::terrain::sampler::FractalSampler;
use fastnoise_lite::{FastNoiseLite, NoiseType};
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Ground color used where no biome claims a column.
pub const NEUTRAL_GROUND_COLOR: [f32; 4] = [0.5, 0.5, 0.5, 1.0];

/// Density percentages are measured against this constant, so 100 percent
/// decorates one column in twenty.
const DENSITY_NORMALIZER: f32 = 2000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BiomeShape {
    #[default]
    Square,
    Circle,
}

/// One placeable object kind of a biome catalog, with its named sub-parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecorationKind {
    pub name: String,
    pub parts: Vec<String>,
}

impl DecorationKind {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parts: Vec::new(),
        }
    }

    pub fn with_parts(name: &str, parts: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            parts: parts.iter().map(|part| part.to_string()).collect(),
        }
    }
}

/// A sub-part of a spawned decoration; carries the same culling layer as
/// its parent.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedPart {
    pub name: String,
    pub layer: u8,
}

/// A decoration spawned on a chunk column.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedObject {
    pub kind: String,
    pub position: Vec3,
    pub yaw_degrees: f32,
    pub layer: u8,
    pub parts: Vec<PlacedPart>,
    pub visible: bool,
}

/// A biome region: shape, perturbed border, density and object catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomeDefinition {
    pub name: String,
    /// Region center in world space.
    pub origin: Vec2,
    /// Radius or half-size of the area.
    pub size: f32,
    pub shape: BiomeShape,
    /// Background biome: matches everywhere not otherwise claimed.
    pub global: bool,
    /// Size of the border perturbations (higher for larger noise).
    pub border_noise_scale: f32,
    /// Strength of the border perturbations; 0 keeps the edge exact.
    pub border_noise_strength: f32,
    /// Chance per column, in percent, measured against the normalizing
    /// constant.
    pub density_percent: u32,
    /// Vertical offset applied to spawned objects.
    pub y_offset: f32,
    /// Allow placement where the ground is at or below the water level.
    pub allow_underwater: bool,
    /// No decorations inside this radius around the world origin.
    pub spawn_safe_radius: f32,
    /// Culling layer assigned to spawned objects and their sub-parts.
    pub object_layer: u8,
    /// Ground tint inside the biome.
    pub area_color: [f32; 4],
    pub catalog: Vec<DecorationKind>,
}

impl BiomeDefinition {
    pub fn new(name: &str, origin: Vec2, size: f32) -> Self {
        Self {
            name: name.to_string(),
            origin,
            size,
            shape: BiomeShape::Square,
            global: false,
            border_noise_scale: 20.0,
            border_noise_strength: 0.0,
            density_percent: 30,
            y_offset: 0.0,
            allow_underwater: false,
            spawn_safe_radius: 5.0,
            object_layer: 6,
            area_color: [0.4, 0.7, 0.2, 1.0],
            catalog: Vec::new(),
        }
    }

    /// A background biome that claims every point no earlier biome owns.
    pub fn global(name: &str) -> Self {
        let mut biome = Self::new(name, Vec2::ZERO, 0.0);
        biome.global = true;
        biome
    }
}

// frac(sin(x*k1 + z*k2) * 43758.5453), the classic coordinate hash. Order
// independent by construction: only the column coordinates go in.
fn hash01(x: i32, z: i32, k1: f32, k2: f32) -> f32 {
    let v = (x as f32 * k1 + z as f32 * k2).sin() * 43758.5453;
    v - v.floor()
}

const PLACE_K: (f32, f32) = (12.9898, 78.233);
const KIND_K: (f32, f32) = (39.3468, 11.1353);
const YAW_K: (f32, f32) = (26.6513, 63.7264);

/// Insertion-ordered biome registry.
///
/// Registration order is the precedence order: when several biomes overlap
/// a point, the first registered one wins. Membership queries are pure and
/// side-effect free.
pub struct BiomeRegistry {
    biomes: Vec<BiomeDefinition>,
    border_noise: FastNoiseLite,
}

impl Default for BiomeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BiomeRegistry {
    pub fn new() -> Self {
        let mut border_noise = FastNoiseLite::with_seed(0);
        border_noise.set_noise_type(Some(NoiseType::Perlin));
        border_noise.set_frequency(Some(1.0));
        Self {
            biomes: Vec::new(),
            border_noise,
        }
    }

    pub fn register(&mut self, biome: BiomeDefinition) {
        log::debug!("registered biome '{}'", biome.name);
        self.biomes.push(biome);
    }

    /// Remove the first biome with the given name, preserving the order of
    /// the others.
    pub fn unregister(&mut self, name: &str) -> Option<BiomeDefinition> {
        let index = self.biomes.iter().position(|biome| biome.name == name)?;
        log::debug!("unregistered biome '{name}'");
        Some(self.biomes.remove(index))
    }

    pub fn len(&self) -> usize {
        self.biomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.biomes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BiomeDefinition> {
        self.biomes.iter()
    }

    /// Whether a point lies inside a biome, with the border optionally
    /// perturbed by low-frequency noise for organic edges.
    pub fn contains(&self, biome: &BiomeDefinition, x: f32, z: f32) -> bool {
        if biome.global {
            return true;
        }

        let offset = if biome.border_noise_strength != 0.0 {
            let scale = biome.border_noise_scale.max(f32::EPSILON);
            self.border_noise
                .get_noise_2d((x + 1000.0) / scale, (z + 1000.0) / scale)
                * biome.border_noise_strength
        } else {
            0.0
        };

        let dx = (x - biome.origin.x).abs();
        let dz = (z - biome.origin.y).abs();

        match biome.shape {
            BiomeShape::Square => dx + offset <= biome.size && dz + offset <= biome.size,
            BiomeShape::Circle => (dx * dx + dz * dz).sqrt() + offset <= biome.size,
        }
    }

    /// First registered biome containing the point.
    pub fn first_match(&self, x: f32, z: f32) -> Option<&BiomeDefinition> {
        self.biomes.iter().find(|biome| self.contains(biome, x, z))
    }

    /// Ground color at a world column, for mesh vertex tinting.
    pub fn ground_color(&self, x: f32, z: f32) -> [f32; 4] {
        self.first_match(x, z)
            .map(|biome| biome.area_color)
            .unwrap_or(NEUTRAL_GROUND_COLOR)
    }

    /// Decorate a freshly generated chunk.
    ///
    /// Every world column of the chunk footprint is claimed by at most one
    /// biome (first registered wins); a coordinate hash decides placement,
    /// object kind and yaw, so processing the same chunk twice yields the
    /// same decorations.
    pub fn process_chunk(&self, chunk: &mut Chunk, sampler: &FractalSampler) {
        chunk.decorations.clear();
        if self.biomes.is_empty() {
            return;
        }

        let size = chunk.size() as i32;
        let origin_x = chunk.origin().x as i32;
        let origin_z = chunk.origin().z as i32;

        for x in 0..size {
            for z in 0..size {
                let world_x = origin_x + x;
                let world_z = origin_z + z;

                let Some(biome) = self.first_match(world_x as f32, world_z as f32) else {
                    continue;
                };
                if biome.catalog.is_empty() {
                    continue;
                }

                // Keep the spawn area around the world origin clear.
                let origin_dist_sq = (world_x * world_x + world_z * world_z) as f32;
                if origin_dist_sq < biome.spawn_safe_radius * biome.spawn_safe_radius {
                    continue;
                }

                let roll = hash01(world_x, world_z, PLACE_K.0, PLACE_K.1);
                if roll >= biome.density_percent as f32 / DENSITY_NORMALIZER {
                    continue;
                }

                let ground = sampler.height(world_x as f32, world_z as f32);
                if !biome.allow_underwater && ground <= chunk.water_level() {
                    continue;
                }

                let kind_roll = hash01(world_x, world_z, KIND_K.0, KIND_K.1);
                let kind_index =
                    ((kind_roll * biome.catalog.len() as f32) as usize).min(biome.catalog.len() - 1);
                let kind = &biome.catalog[kind_index];
                let yaw = hash01(world_x, world_z, YAW_K.0, YAW_K.1) * 360.0;

                chunk.decorations.push(PlacedObject {
                    kind: kind.name.clone(),
                    // Offset to center the object on its column.
                    position: Vec3::new(
                        world_x as f32 + 0.5,
                        ground + biome.y_offset,
                        world_z as f32 + 0.5,
                    ),
                    yaw_degrees: yaw,
                    layer: biome.object_layer,
                    parts: kind
                        .parts
                        .iter()
                        .map(|part| PlacedPart {
                            name: part.clone(),
                            layer: biome.object_layer,
                        })
                        .collect(),
                    visible: true,
                });
            }
        }

        log::trace!(
            "decorated chunk {:?} with {} objects",
            chunk.coord(),
            chunk.decorations.len()
        );
    }
}
