//! # Voxel Grid Module
//!
//! Dense storage for the material ids of one chunk (or of any cuboid region, which
//! the mesher and the tests rely on).
//!
//! ## Layout
//!
//! Materials are stored row-major by `(y, z, x)`: `x` varies fastest, then `z`,
//! then `y`. Alongside the id array the grid keeps a bit vector with one bit per
//! voxel marking non-air cells, so emptiness checks and whole-grid "is there
//! anything here" queries never touch the material bytes.
//!
//! ## Level of Detail
//!
//! [`VoxelGrid::downsample`] builds the coarse grid used for LOD meshes by majority
//! vote over `factor³` blocks of fine voxels.

use bitvec::vec::BitVec;

use super::material::MaterialId;

/// Width of a chunk in voxels (x axis).
pub const CHUNK_WIDTH: usize = 32;
/// Height of a chunk in voxels (y axis). Chunks span the whole world column.
pub const CHUNK_HEIGHT: usize = 128;
/// Depth of a chunk in voxels (z axis).
pub const CHUNK_DEPTH: usize = 32;

/// Dense 3D array of material ids. Id 0 is air.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoxelGrid {
    dims: [usize; 3],
    materials: Vec<MaterialId>,
    solid: BitVec,
}

impl VoxelGrid {
    /// Creates an all-air grid of `width × height × depth` voxels.
    pub fn new(width: usize, height: usize, depth: usize) -> Self {
        let len = width * height * depth;
        let mut solid = BitVec::with_capacity(len);
        solid.resize(len, false);
        Self {
            dims: [width, height, depth],
            materials: vec![0; len],
            solid,
        }
    }

    /// Creates an all-air grid with chunk dimensions.
    pub fn chunk_sized() -> Self {
        Self::new(CHUNK_WIDTH, CHUNK_HEIGHT, CHUNK_DEPTH)
    }

    /// Builds a grid by evaluating `f(x, y, z)` for every cell.
    pub fn from_fn(
        width: usize,
        height: usize,
        depth: usize,
        mut f: impl FnMut(usize, usize, usize) -> MaterialId,
    ) -> Self {
        let mut grid = Self::new(width, height, depth);
        for y in 0..height {
            for z in 0..depth {
                for x in 0..width {
                    grid.set(x, y, z, f(x, y, z));
                }
            }
        }
        grid
    }

    /// `[width, height, depth]`.
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Size along `axis` (0 = x, 1 = y, 2 = z).
    pub fn size(&self, axis: usize) -> usize {
        self.dims[axis]
    }

    #[inline]
    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.dims[0] * (z + self.dims[2] * y)
    }

    /// Material at `(x, y, z)`.
    ///
    /// # Panics
    /// Panics if the coordinates are out of bounds.
    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> MaterialId {
        self.materials[self.index(x, y, z)]
    }

    /// Material at a position given as `[x, y, z]`.
    #[inline]
    pub fn get_at(&self, position: [usize; 3]) -> MaterialId {
        self.get(position[0], position[1], position[2])
    }

    /// Writes a material and keeps the occupancy bits in sync.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, material: MaterialId) {
        let index = self.index(x, y, z);
        self.materials[index] = material;
        self.solid.set(index, material != 0);
    }

    /// Whether `(x, y, z)` holds anything but air.
    #[inline]
    pub fn is_solid(&self, x: usize, y: usize, z: usize) -> bool {
        self.solid[self.index(x, y, z)]
    }

    /// Number of non-air voxels.
    pub fn solid_count(&self) -> usize {
        self.solid.count_ones()
    }

    /// `true` when every voxel is air.
    pub fn is_empty(&self) -> bool {
        self.solid.not_any()
    }

    /// Reduces the grid by an integer `factor` using majority voting.
    ///
    /// Each coarse cell tallies the non-air materials among its `factor³` fine
    /// voxels (cells at the far edges may cover fewer when a dimension is not a
    /// multiple of `factor`). The most frequent material wins; ties resolve to the
    /// lowest material id. A coarse cell is air only when all of its fine voxels
    /// are air.
    ///
    /// A factor of 1 returns a copy.
    pub fn downsample(&self, factor: usize) -> VoxelGrid {
        assert!(factor >= 1, "downsample factor must be positive");
        if factor == 1 {
            return self.clone();
        }

        let [width, height, depth] = self.dims;
        let coarse = [
            width.div_ceil(factor),
            height.div_ceil(factor),
            depth.div_ceil(factor),
        ];
        let mut out = VoxelGrid::new(coarse[0], coarse[1], coarse[2]);
        let mut tally = [0u32; 256];

        for cy in 0..coarse[1] {
            for cz in 0..coarse[2] {
                for cx in 0..coarse[0] {
                    tally.fill(0);
                    let mut any_solid = false;
                    for y in cy * factor..((cy + 1) * factor).min(height) {
                        for z in cz * factor..((cz + 1) * factor).min(depth) {
                            for x in cx * factor..((cx + 1) * factor).min(width) {
                                let material = self.get(x, y, z);
                                if material != 0 {
                                    tally[material as usize] += 1;
                                    any_solid = true;
                                }
                            }
                        }
                    }
                    if !any_solid {
                        continue;
                    }

                    let mut winner = 0usize;
                    let mut best = 0u32;
                    for (material, &count) in tally.iter().enumerate().skip(1) {
                        if count > best {
                            best = count;
                            winner = material;
                        }
                    }
                    out.set(cx, cy, cz, winner as MaterialId);
                }
            }
        }

        out
    }
}
