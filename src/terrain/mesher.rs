//! Voxel surface extraction - face-culling mesher
//!
//! Emits one quad per solid-voxel face that borders empty or out-of-range
//! space. Faces never share vertices: each quad gets four fresh vertices so
//! it can carry its own color and UVs, at the cost of vertex count. Index
//! buffers are 32-bit because a dense high-resolution chunk easily exceeds
//! 65 535 vertices.

use crate::terrain::chunk::OccupancyGrid;
use glam::{IVec3, Vec2, Vec3};

/// CPU-side mesh buffers ready for upload.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    /// Per-vertex RGBA, empty when coloring is unused.
    pub colors: Vec<[f32; 4]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn clear(&mut self) {
        self.positions.clear();
        self.normals.clear();
        self.uvs.clear();
        self.colors.clear();
        self.indices.clear();
    }
}

// Back, Front, Left, Right, Top, Bottom
const FACE_DIRS: [IVec3; 6] = [
    IVec3::new(0, 0, -1),
    IVec3::new(0, 0, 1),
    IVec3::new(-1, 0, 0),
    IVec3::new(1, 0, 0),
    IVec3::new(0, 1, 0),
    IVec3::new(0, -1, 0),
];

// Corner order per face; winding matches the outward normal of FACE_DIRS.
const FACE_CORNERS: [[Vec3; 4]; 6] = [
    [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
    ],
    [
        Vec3::new(1.0, 0.0, 1.0),
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(0.0, 1.0, 1.0),
        Vec3::new(1.0, 1.0, 1.0),
    ],
    [
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(0.0, 1.0, 1.0),
    ],
    [
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 1.0),
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(1.0, 1.0, 0.0),
    ],
    [
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(0.0, 1.0, 1.0),
    ],
    [
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(1.0, 0.0, 1.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, 0.0, 0.0),
    ],
];

const FACE_UVS: [Vec2; 4] = [
    Vec2::new(0.0, 0.0),
    Vec2::new(1.0, 0.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(0.0, 1.0),
];

/// Converts an occupancy grid into renderable surface buffers.
pub struct VoxelMesher {
    /// Per-axis voxel edge length; coarse LOD tiers widen x/z.
    cell: Vec3,
}

impl Default for VoxelMesher {
    fn default() -> Self {
        Self { cell: Vec3::ONE }
    }
}

impl VoxelMesher {
    pub fn new(cell: Vec3) -> Self {
        Self {
            cell: cell.max(Vec3::splat(f32::EPSILON)),
        }
    }

    /// Mesh without vertex colors.
    pub fn mesh(&self, grid: &OccupancyGrid) -> MeshData {
        self.emit(grid, None)
    }

    /// Mesh with a per-vertex color sampled at each voxel's world column.
    pub fn mesh_colored(
        &self,
        grid: &OccupancyGrid,
        origin: Vec2,
        color_at: &dyn Fn(f32, f32) -> [f32; 4],
    ) -> MeshData {
        self.emit(grid, Some((origin, color_at)))
    }

    fn emit(
        &self,
        grid: &OccupancyGrid,
        coloring: Option<(Vec2, &dyn Fn(f32, f32) -> [f32; 4])>,
    ) -> MeshData {
        let (size_x, size_y, size_z) = grid.dimensions();
        let mut mesh = MeshData::new();
        let mut index: u32 = 0;

        for x in 0..size_x {
            for y in 0..size_y {
                for z in 0..size_z {
                    if !grid.get(x as isize, y as isize, z as isize) {
                        continue;
                    }

                    let color = coloring.as_ref().map(|(origin, color_at)| {
                        color_at(
                            origin.x + x as f32 * self.cell.x,
                            origin.y + z as f32 * self.cell.z,
                        )
                    });
                    let voxel = Vec3::new(x as f32, y as f32, z as f32);

                    for (face, dir) in FACE_DIRS.iter().enumerate() {
                        let neighbor = IVec3::new(x as i32, y as i32, z as i32) + *dir;
                        // Out-of-range neighbors read as empty, so border
                        // faces stay visible.
                        if grid.get(
                            neighbor.x as isize,
                            neighbor.y as isize,
                            neighbor.z as isize,
                        ) {
                            continue;
                        }

                        let normal = dir.as_vec3();
                        for (corner, uv) in FACE_CORNERS[face].iter().zip(FACE_UVS.iter()) {
                            mesh.positions.push((*corner + voxel) * self.cell);
                            mesh.normals.push(normal);
                            mesh.uvs.push(*uv);
                            if let Some(color) = color {
                                mesh.colors.push(color);
                            }
                        }

                        mesh.indices.extend_from_slice(&[
                            index,
                            index + 2,
                            index + 1,
                            index,
                            index + 3,
                            index + 2,
                        ]);
                        index += 4;
                    }
                }
            }
        }

        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_grid(x: usize, y: usize, z: usize) -> OccupancyGrid {
        let mut grid = OccupancyGrid::new(x, y, z);
        for gx in 0..x {
            for gy in 0..y {
                for gz in 0..z {
                    grid.set(gx, gy, gz, true);
                }
            }
        }
        grid
    }

    #[test]
    fn test_single_voxel_has_six_faces() {
        let mesh = VoxelMesher::default().mesh(&solid_grid(1, 1, 1));
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.indices.len(), 36);
        assert_eq!(mesh.triangle_count(), 12);
    }

    #[test]
    fn test_interior_faces_are_culled() {
        // Two voxels side by side share one hidden face pair: 10 faces remain.
        let mesh = VoxelMesher::default().mesh(&solid_grid(2, 1, 1));
        assert_eq!(mesh.vertex_count(), 40);
        assert_eq!(mesh.triangle_count(), 20);
    }

    #[test]
    fn test_empty_grid_yields_empty_mesh() {
        let mesh = VoxelMesher::default().mesh(&OccupancyGrid::new(4, 4, 4));
        assert!(mesh.is_empty());
        assert_eq!(mesh.triangle_count(), 0);
    }

    #[test]
    fn test_winding_pattern() {
        let mesh = VoxelMesher::default().mesh(&solid_grid(1, 1, 1));
        assert_eq!(&mesh.indices[..6], &[0, 2, 1, 0, 3, 2]);
    }

    #[test]
    fn test_normals_point_outward() {
        let mesh = VoxelMesher::default().mesh(&solid_grid(1, 1, 1));
        // Faces are emitted in FACE_DIRS order; the fifth face is Top.
        let top_normal = mesh.normals[4 * 4];
        assert_eq!(top_normal, Vec3::Y);
        let bottom_normal = mesh.normals[5 * 4];
        assert_eq!(bottom_normal, -Vec3::Y);
    }

    #[test]
    fn test_cell_scale_stretches_positions() {
        let mesher = VoxelMesher::new(Vec3::new(2.0, 1.0, 2.0));
        let mesh = mesher.mesh(&solid_grid(1, 1, 1));
        let max_x = mesh
            .positions
            .iter()
            .map(|p| p.x)
            .fold(f32::MIN, f32::max);
        assert_eq!(max_x, 2.0);
        let max_y = mesh
            .positions
            .iter()
            .map(|p| p.y)
            .fold(f32::MIN, f32::max);
        assert_eq!(max_y, 1.0);
    }

    #[test]
    fn test_colored_mesh_carries_one_color_per_vertex() {
        let mesh = VoxelMesher::default().mesh_colored(
            &solid_grid(2, 1, 1),
            Vec2::ZERO,
            &|x, _z| {
                if x < 1.0 {
                    [1.0, 0.0, 0.0, 1.0]
                } else {
                    [0.0, 1.0, 0.0, 1.0]
                }
            },
        );
        assert_eq!(mesh.colors.len(), mesh.vertex_count());
        assert!(mesh.colors.contains(&[1.0, 0.0, 0.0, 1.0]));
        assert!(mesh.colors.contains(&[0.0, 1.0, 0.0, 1.0]));
    }

    #[test]
    fn test_uncolored_mesh_has_no_colors() {
        let mesh = VoxelMesher::default().mesh(&solid_grid(1, 1, 1));
        assert!(mesh.colors.is_empty());
    }
}
