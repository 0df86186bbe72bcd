//! Greedy meshing implementation for voxel rendering.
//!
//! For each axis `d` the grid is cut by the planes `0..=size(d)`. Each plane
//! gets a signed 2D mask over its `(u, v)` cross-section:
//!
//! * `+m` where the voxel below the plane is material `m` and the one above is air,
//! * `-m` where the voxel above is material `m` and the one below is air,
//! * `0` everywhere else (both empty, or both solid).
//!
//! Voxels outside the grid count as air, so a chunk always closes its own
//! boundary. The mask is then consumed row by row: each nonzero cell starts a
//! rectangle that grows along `u` while the value repeats, then along `v` while
//! the whole next row segment repeats. The rectangle becomes one [`Quad`] and its
//! cells are cleared.

use crate::engine_state::voxels::grid::VoxelGrid;

use super::quad::{FaceDirection, Quad};

/// Runs the greedy mesher over every axis of `grid`.
pub fn greedy_quads(grid: &VoxelGrid) -> Vec<Quad> {
    let dims = grid.dims();
    let mut quads = Vec::new();
    if grid.is_empty() {
        return quads;
    }

    for axis in 0..3 {
        let u = (axis + 1) % 3;
        let v = (axis + 2) % 3;
        let mut mask = vec![0i16; dims[u] * dims[v]];

        for slice in 0..=dims[axis] {
            fill_mask(grid, axis, slice, &mut mask);
            merge_mask(&mut mask, [dims[u], dims[v]], axis, slice, &mut quads);
        }
    }

    quads
}

/// Counts the exposed unit faces of `grid` without merging anything.
pub fn naive_face_count(grid: &VoxelGrid) -> usize {
    let dims = grid.dims();
    let mut faces = 0;
    for axis in 0..3 {
        let u = (axis + 1) % 3;
        let v = (axis + 2) % 3;
        let mut mask = vec![0i16; dims[u] * dims[v]];
        for slice in 0..=dims[axis] {
            fill_mask(grid, axis, slice, &mut mask);
            faces += mask.iter().filter(|&&m| m != 0).count();
        }
    }
    faces
}

fn fill_mask(grid: &VoxelGrid, axis: usize, slice: usize, mask: &mut [i16]) {
    let dims = grid.dims();
    let u = (axis + 1) % 3;
    let v = (axis + 2) % 3;

    let mut position = [0usize; 3];
    for j in 0..dims[v] {
        for i in 0..dims[u] {
            position[u] = i;
            position[v] = j;

            let below = if slice > 0 {
                position[axis] = slice - 1;
                grid.get_at(position)
            } else {
                0
            };
            let above = if slice < dims[axis] {
                position[axis] = slice;
                grid.get_at(position)
            } else {
                0
            };

            mask[i + j * dims[u]] = match (below != 0, above != 0) {
                (true, false) => below as i16,
                (false, true) => -(above as i16),
                _ => 0,
            };
        }
    }
}

fn merge_mask(
    mask: &mut [i16],
    [width, height]: [usize; 2],
    axis: usize,
    slice: usize,
    quads: &mut Vec<Quad>,
) {
    for j in 0..height {
        let mut i = 0;
        while i < width {
            let value = mask[i + j * width];
            if value == 0 {
                i += 1;
                continue;
            }

            let mut w = 1;
            while i + w < width && mask[i + w + j * width] == value {
                w += 1;
            }

            let mut h = 1;
            'grow: while j + h < height {
                let row = (j + h) * width;
                for k in i..i + w {
                    if mask[k + row] != value {
                        break 'grow;
                    }
                }
                h += 1;
            }

            quads.push(Quad {
                axis,
                direction: if value > 0 {
                    FaceDirection::Positive
                } else {
                    FaceDirection::Negative
                },
                slice,
                u0: i,
                v0: j,
                width: w,
                height: h,
                material: value.unsigned_abs() as u8,
            });

            for row in j..j + h {
                mask[row * width + i..row * width + i + w].fill(0);
            }
            i += w;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::material::Material;

    #[test]
    fn two_by_two_by_one_block_is_six_quads_anywhere() {
        let stone = Material::Stone.id();
        for (ox, oy, oz) in [(0, 0, 0), (3, 5, 2), (6, 7, 6)] {
            let mut grid = VoxelGrid::new(8, 8, 8);
            for (dx, dz) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                grid.set(ox + dx, oy, oz + dz, stone);
            }
            let quads = greedy_quads(&grid);
            assert_eq!(quads.len(), 6, "block at {:?}", (ox, oy, oz));
            assert_eq!(quads.iter().map(Quad::face_count).sum::<usize>(), 16);
            assert_eq!(naive_face_count(&grid), 16);
        }
    }

    #[test]
    fn empty_grid_has_no_geometry() {
        assert!(greedy_quads(&VoxelGrid::new(4, 4, 4)).is_empty());
    }

    #[test]
    fn solid_grid_only_meshes_its_boundary() {
        let grid = VoxelGrid::from_fn(4, 6, 5, |_, _, _| Material::Dirt.id());
        let quads = greedy_quads(&grid);
        assert_eq!(quads.len(), 6);
        assert!(quads
            .iter()
            .all(|q| q.slice == 0 || q.slice == grid.size(q.axis)));
    }

    #[test]
    fn different_materials_do_not_merge() {
        let mut grid = VoxelGrid::new(2, 1, 1);
        grid.set(0, 0, 0, Material::Stone.id());
        grid.set(1, 0, 0, Material::Sand.id());
        let quads = greedy_quads(&grid);
        // x: two end caps; y and z: two faces per voxel per side
        assert_eq!(quads.len(), 10);
    }

    #[test]
    fn face_direction_points_away_from_solid() {
        let mut grid = VoxelGrid::new(1, 3, 1);
        grid.set(0, 1, 0, Material::Grass.id());
        let quads = greedy_quads(&grid);
        let top = quads
            .iter()
            .find(|q| q.axis == 1 && q.slice == 2)
            .expect("top face");
        let bottom = quads
            .iter()
            .find(|q| q.axis == 1 && q.slice == 1)
            .expect("bottom face");
        assert_eq!(top.direction, FaceDirection::Positive);
        assert_eq!(bottom.direction, FaceDirection::Negative);
    }
}
