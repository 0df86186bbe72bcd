//! # Material Module
//!
//! This module defines the voxel materials produced by terrain generation and their
//! placement in the texture atlas. Material ids are stored as raw `u8` values in the
//! voxel grid; id 0 is always air.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

/// Raw storage type for a material id inside a voxel grid.
pub type MaterialId = u8;

/// Number of tile columns (and rows) in the texture atlas.
pub const ATLAS_COLUMNS: u32 = 16;

/// Material of a single voxel.
///
/// The discriminant is the id stored in the grid and the tile index in the atlas.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive)]
pub enum Material {
    /// Empty space
    Air = 0,
    /// Deep rock under every biome
    Stone = 1,
    /// Plains sub-surface soil
    Dirt = 2,
    /// Plains surface
    Grass = 3,
    /// Desert surface
    Sand = 4,
    /// Desert sub-surface
    Sandstone = 5,
    /// Fills columns between the terrain height and sea level
    Water = 6,
}

impl Material {
    /// Returns the material for a stored id, or `None` for ids without a definition.
    pub fn from_id(id: MaterialId) -> Option<Self> {
        Material::from_u8(id)
    }

    /// The id stored in the voxel grid.
    pub const fn id(self) -> MaterialId {
        self as MaterialId
    }

    /// Whether this material renders in the liquid/transparent pass.
    pub fn is_liquid(self) -> bool {
        matches!(self, Material::Water)
    }
}

/// Liquid check on a raw id. Unknown ids are treated as opaque.
pub fn is_liquid_id(id: MaterialId) -> bool {
    Material::from_id(id).is_some_and(Material::is_liquid)
}

/// Normalized top-left corner of the material's tile in the 16-column atlas.
pub fn atlas_origin(id: MaterialId) -> [f32; 2] {
    let tile = id as u32;
    let size = 1.0 / ATLAS_COLUMNS as f32;
    [
        (tile % ATLAS_COLUMNS) as f32 * size,
        (tile / ATLAS_COLUMNS) as f32 * size,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_from_id() {
        for material in [
            Material::Air,
            Material::Stone,
            Material::Dirt,
            Material::Grass,
            Material::Sand,
            Material::Sandstone,
            Material::Water,
        ] {
            assert_eq!(Material::from_id(material.id()), Some(material));
        }
        assert_eq!(Material::from_id(200), None);
    }

    #[test]
    fn atlas_wraps_after_sixteen_columns() {
        assert_eq!(atlas_origin(0), [0.0, 0.0]);
        assert_eq!(atlas_origin(3), [3.0 / 16.0, 0.0]);
        assert_eq!(atlas_origin(17), [1.0 / 16.0, 1.0 / 16.0]);
    }
}
