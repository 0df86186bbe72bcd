//! # Terrain Generation
//!
//! Deterministic mapping from a chunk coordinate to a filled [`VoxelGrid`].
//!
//! ## Layers
//!
//! 1. **Height**: a low-frequency fBm "continent" field plus a higher-frequency
//!    "erosion" field, both offset by the sea level.
//! 2. **Biome**: a temperature field picks desert above a threshold, plains below.
//!    The biome decides which material sits at each depth under the surface.
//! 3. **Water**: columns whose surface lies below sea level are topped with water
//!    up to the sea level.
//! 4. **Caves**: an independent 3D field carves air pockets wherever it exceeds a
//!    threshold. Carving runs after the surface fill and never touches water or the
//!    bottom layer.
//!
//! ## Thread Safety
//!
//! The `noise` generators are immutable after construction and evaluate through
//! `&self`, so one `TerrainGenerator` is shared by every worker thread without
//! locking. Output depends only on the seed and the chunk coordinate.

use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

use super::{
    chunk::ChunkCoordinate,
    grid::{VoxelGrid, CHUNK_DEPTH, CHUNK_HEIGHT, CHUNK_WIDTH},
    material::Material,
};

/// Tunable constants for the terrain fields.
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainParams {
    /// Water fills every column up to this height.
    pub sea_level: i32,
    /// Vertical swing of the continent field in voxels.
    pub continent_amplitude: f64,
    /// Horizontal frequency of the continent field.
    pub continent_frequency: f64,
    /// Vertical swing of the erosion field in voxels.
    pub erosion_amplitude: f64,
    /// Horizontal frequency of the erosion field.
    pub erosion_frequency: f64,
    /// Horizontal frequency of the temperature field.
    pub temperature_frequency: f64,
    /// Temperature samples above this value produce desert.
    pub desert_threshold: f64,
    /// Frequency of the 3D cave field.
    pub cave_frequency: f64,
    /// Cave samples above this value become air.
    pub cave_threshold: f64,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            sea_level: 60,
            continent_amplitude: 28.0,
            continent_frequency: 0.004,
            erosion_amplitude: 6.0,
            erosion_frequency: 0.035,
            temperature_frequency: 0.0025,
            desert_threshold: 0.25,
            cave_frequency: 0.06,
            cave_threshold: 0.6,
        }
    }
}

/// Surface material rules.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Biome {
    /// Grass over a few layers of dirt.
    Plains,
    /// Sand over sandstone.
    Desert,
}

impl Biome {
    /// Material at `depth` voxels below the column surface (0 = the surface voxel).
    pub fn material_at_depth(self, depth: i32) -> Material {
        match self {
            Biome::Plains => match depth {
                0 => Material::Grass,
                1..=3 => Material::Dirt,
                _ => Material::Stone,
            },
            Biome::Desert => match depth {
                0..=3 => Material::Sand,
                4..=6 => Material::Sandstone,
                _ => Material::Stone,
            },
        }
    }
}

/// Stateless chunk terrain synthesizer.
pub struct TerrainGenerator {
    continent: Fbm<Perlin>,
    erosion: Perlin,
    temperature: Perlin,
    caves: Perlin,
    params: TerrainParams,
}

impl TerrainGenerator {
    /// Creates a generator with default parameters.
    pub fn new(seed: u32) -> Self {
        Self::with_params(seed, TerrainParams::default())
    }

    /// Creates a generator with explicit parameters.
    ///
    /// Each field gets its own seed derived from `seed` so the layers are
    /// uncorrelated.
    pub fn with_params(seed: u32, params: TerrainParams) -> Self {
        Self {
            continent: Fbm::<Perlin>::new(seed)
                .set_octaves(4)
                .set_frequency(params.continent_frequency),
            erosion: Perlin::new(seed.wrapping_add(1)),
            temperature: Perlin::new(seed.wrapping_add(2)),
            caves: Perlin::new(seed.wrapping_add(3)),
            params,
        }
    }

    /// Parameters in use.
    pub fn params(&self) -> &TerrainParams {
        &self.params
    }

    /// Surface height of the global column `(wx, wz)`, clamped into the chunk.
    pub fn column_height(&self, wx: i32, wz: i32) -> i32 {
        let p = &self.params;
        let (x, z) = (wx as f64, wz as f64);
        let continent = self.continent.get([x, z]) * p.continent_amplitude;
        let erosion = self
            .erosion
            .get([x * p.erosion_frequency, z * p.erosion_frequency])
            * p.erosion_amplitude;
        let height = p.sea_level as f64 + continent + erosion;
        (height.round() as i32).clamp(1, CHUNK_HEIGHT as i32 - 1)
    }

    /// Biome of the global column `(wx, wz)`.
    pub fn biome(&self, wx: i32, wz: i32) -> Biome {
        let f = self.params.temperature_frequency;
        let temperature = self.temperature.get([wx as f64 * f, wz as f64 * f]);
        if temperature > self.params.desert_threshold {
            Biome::Desert
        } else {
            Biome::Plains
        }
    }

    fn is_cave(&self, wx: i32, y: i32, wz: i32) -> bool {
        let f = self.params.cave_frequency;
        self.caves.get([wx as f64 * f, y as f64 * f, wz as f64 * f]) > self.params.cave_threshold
    }

    /// Fills a chunk-sized grid for `coordinate`.
    pub fn generate(&self, coordinate: ChunkCoordinate) -> VoxelGrid {
        let mut grid = VoxelGrid::chunk_sized();
        let origin_x = coordinate.x * CHUNK_WIDTH as i32;
        let origin_z = coordinate.z * CHUNK_DEPTH as i32;
        let sea_level = self.params.sea_level.min(CHUNK_HEIGHT as i32 - 1);

        for z in 0..CHUNK_DEPTH {
            for x in 0..CHUNK_WIDTH {
                let wx = origin_x + x as i32;
                let wz = origin_z + z as i32;
                let height = self.column_height(wx, wz);
                let biome = self.biome(wx, wz);

                for y in 0..=height {
                    let material = biome.material_at_depth(height - y);
                    grid.set(x, y as usize, z, material.id());
                }
                for y in height + 1..=sea_level {
                    grid.set(x, y as usize, z, Material::Water.id());
                }

                for y in 1..=height {
                    if self.is_cave(wx, y, wz) {
                        grid.set(x, y as usize, z, Material::Air.id());
                    }
                }
            }
        }

        grid
    }
}
