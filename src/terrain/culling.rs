//! View culling - frustum tests for chunks, distance tests for decorations
//!
//! Culling only toggles visibility. It never releases a chunk from the
//! active set or touches the pools, so a chunk scrolling back into view is
//! redisplayed without regeneration.

use crate::terrain::store::ChunkStore;
use glam::{Mat4, Vec3};

/// Six view-frustum planes as `[a, b, c, d]` with `ax + by + cz + d = 0`,
/// normals pointing inward.
#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    planes: [[f32; 4]; 6],
}

impl Frustum {
    /// Extract planes (left, right, bottom, top, near, far) from a
    /// view-projection matrix.
    pub fn from_view_proj(view_proj: Mat4) -> Self {
        let m = view_proj.to_cols_array();
        Self {
            planes: [
                // Left: row4 + row1
                [m[3] + m[0], m[7] + m[4], m[11] + m[8], m[15] + m[12]],
                // Right: row4 - row1
                [m[3] - m[0], m[7] - m[4], m[11] - m[8], m[15] - m[12]],
                // Bottom: row4 + row2
                [m[3] + m[1], m[7] + m[5], m[11] + m[9], m[15] + m[13]],
                // Top: row4 - row2
                [m[3] - m[1], m[7] - m[5], m[11] - m[9], m[15] - m[13]],
                // Near: row4 + row3
                [m[3] + m[2], m[7] + m[6], m[11] + m[10], m[15] + m[14]],
                // Far: row4 - row3
                [m[3] - m[2], m[7] - m[6], m[11] - m[10], m[15] - m[14]],
            ],
        }
    }

    /// Build the frustum of a perspective camera looking at `target`.
    pub fn from_camera(
        eye: Vec3,
        target: Vec3,
        up: Vec3,
        fov_y: f32,
        aspect: f32,
        z_near: f32,
        z_far: f32,
    ) -> Self {
        let view = Mat4::look_at_rh(eye, target, up);
        let proj = Mat4::perspective_rh(fov_y, aspect, z_near, z_far);
        Self::from_view_proj(proj * view)
    }

    /// Whether an axis-aligned box intersects the frustum. A box is culled
    /// only when all eight corners lie outside one plane.
    pub fn contains_aabb(&self, min: Vec3, max: Vec3) -> bool {
        let corners = [
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(min.x, max.y, max.z),
            Vec3::new(max.x, max.y, max.z),
        ];

        for [a, b, c, d] in &self.planes {
            let mut all_outside = true;
            for corner in &corners {
                if a * corner.x + b * corner.y + c * corner.z + d > 0.0 {
                    all_outside = false;
                    break;
                }
            }
            if all_outside {
                return false;
            }
        }
        true
    }
}

/// Toggle visibility of every active chunk against the frustum. Returns the
/// number of chunks whose state changed.
pub fn cull_chunks(store: &mut ChunkStore, frustum: &Frustum) -> usize {
    let mut toggled = 0;
    for (_, chunk) in store.iter_active_mut() {
        let (min, max) = chunk.aabb();
        let visible = frustum.contains_aabb(min, max);
        if chunk.visible != visible {
            chunk.visible = visible;
            toggled += 1;
        }
    }
    if toggled > 0 {
        log::trace!("frustum culling toggled {toggled} chunks");
    }
    toggled
}

/// Per-layer display distances. Layer slots left at zero are never culled.
#[derive(Debug, Clone, Copy)]
pub struct LayerCullDistances {
    distances: [f32; 32],
}

impl Default for LayerCullDistances {
    fn default() -> Self {
        Self {
            distances: [0.0; 32],
        }
    }
}

impl LayerCullDistances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, layer: u8, distance: f32) {
        if let Some(slot) = self.distances.get_mut(layer as usize) {
            *slot = distance.max(0.0);
        }
    }

    pub fn get(&self, layer: u8) -> f32 {
        self.distances.get(layer as usize).copied().unwrap_or(0.0)
    }
}

/// Toggle decoration visibility by squared distance to the viewpoint,
/// honoring each decoration's culling layer. Returns the number of
/// decorations whose state changed.
pub fn cull_decorations(
    store: &mut ChunkStore,
    viewpoint: Vec3,
    distances: &LayerCullDistances,
) -> usize {
    let mut toggled = 0;
    for (_, chunk) in store.iter_active_mut() {
        for decoration in &mut chunk.decorations {
            let limit = distances.get(decoration.layer);
            if limit <= 0.0 {
                continue;
            }
            let visible = decoration.position.distance_squared(viewpoint) <= limit * limit;
            if decoration.visible != visible {
                decoration.visible = visible;
                toggled += 1;
            }
        }
    }
    toggled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::biome::{PlacedObject, PlacedPart};
    use crate::terrain::chunk::{Chunk, ChunkTemplate};
    use crate::terrain::config::TerrainConfig;
    use glam::IVec2;

    fn looking_down_z() -> Frustum {
        // Camera at the origin looking toward +Z.
        Frustum::from_camera(
            Vec3::new(0.0, 10.0, 0.0),
            Vec3::new(0.0, 10.0, 100.0),
            Vec3::Y,
            60f32.to_radians(),
            16.0 / 9.0,
            0.1,
            1000.0,
        )
    }

    fn active_chunk_at(store: &mut ChunkStore, coord: IVec2) {
        let config = TerrainConfig::default().sanitize();
        let mut chunk = Chunk::new();
        chunk.configure(coord, 0, &config, &ChunkTemplate::default());
        chunk.visible = true;
        store.insert_active(coord, chunk);
    }

    #[test]
    fn test_aabb_in_front_is_visible() {
        let frustum = looking_down_z();
        assert!(frustum.contains_aabb(Vec3::new(-8.0, 0.0, 40.0), Vec3::new(8.0, 16.0, 56.0)));
    }

    #[test]
    fn test_aabb_behind_is_culled() {
        let frustum = looking_down_z();
        assert!(!frustum.contains_aabb(
            Vec3::new(-8.0, 0.0, -56.0),
            Vec3::new(8.0, 16.0, -40.0)
        ));
    }

    #[test]
    fn test_aabb_straddling_a_plane_is_visible() {
        let frustum = looking_down_z();
        // Box spanning the near plane.
        assert!(frustum.contains_aabb(
            Vec3::new(-4.0, 6.0, -4.0),
            Vec3::new(4.0, 14.0, 4.0)
        ));
    }

    #[test]
    fn test_cull_chunks_toggles_and_preserves_membership() {
        let mut store = ChunkStore::new(1);
        active_chunk_at(&mut store, IVec2::new(0, 2)); // ahead (z = 32..48)
        active_chunk_at(&mut store, IVec2::new(0, -4)); // behind

        let frustum = looking_down_z();
        let toggled = cull_chunks(&mut store, &frustum);
        assert_eq!(toggled, 1);
        assert_eq!(store.active_len(), 2);
        assert!(store.get(IVec2::new(0, 2)).unwrap().visible);
        assert!(!store.get(IVec2::new(0, -4)).unwrap().visible);

        // A second pass with the same frustum changes nothing.
        assert_eq!(cull_chunks(&mut store, &frustum), 0);
    }

    #[test]
    fn test_layer_distances_cull_decorations() {
        let mut store = ChunkStore::new(1);
        active_chunk_at(&mut store, IVec2::ZERO);

        let decoration = |position: Vec3, layer: u8| PlacedObject {
            kind: "rock".to_string(),
            position,
            yaw_degrees: 0.0,
            layer,
            parts: vec![PlacedPart {
                name: "base".to_string(),
                layer,
            }],
            visible: true,
        };
        {
            let chunk = store.get_mut(IVec2::ZERO).unwrap();
            chunk.decorations.push(decoration(Vec3::new(10.0, 0.0, 0.0), 6));
            chunk.decorations.push(decoration(Vec3::new(300.0, 0.0, 0.0), 6));
            chunk.decorations.push(decoration(Vec3::new(60.0, 0.0, 0.0), 7));
            // Layer 0 has no limit configured and is never culled.
            chunk.decorations.push(decoration(Vec3::new(9000.0, 0.0, 0.0), 0));
        }

        let mut distances = LayerCullDistances::new();
        distances.set(6, 200.0);
        distances.set(7, 50.0);

        let toggled = cull_decorations(&mut store, Vec3::ZERO, &distances);
        assert_eq!(toggled, 2);

        let chunk = store.get(IVec2::ZERO).unwrap();
        assert!(chunk.decorations[0].visible);
        assert!(!chunk.decorations[1].visible);
        assert!(!chunk.decorations[2].visible);
        assert!(chunk.decorations[3].visible);
    }
}
