//! Decoded tile geometry handed to the renderer for GPU upload.

use crate::layers::{GLOBAL_OFS_X, GLOBAL_OFS_Y};
use crate::position::TilePosition;
use crate::surface::SurfaceType;

/// Triangle list for one surface type within a tile.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceMesh {
    /// Land-cover class, which selects the fill color.
    pub surface: SurfaceType,
    /// Flattened triangle-vertex indices into the tile's vertex array.
    pub indices: Vec<u16>,
}

impl SurfaceMesh {
    /// Fill color for this mesh.
    #[must_use]
    pub fn color(&self) -> [f32; 3] {
        self.surface.color()
    }

    /// Number of triangles.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Index buffer as raw bytes for upload.
    #[must_use]
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// One tile's geometry: deduplicated map-space vertices plus a triangle list
/// per non-empty surface type, in header slot order.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedTile {
    position: TilePosition,
    vertices: Vec<[f32; 2]>,
    surfaces: Vec<SurfaceMesh>,
}

impl DecodedTile {
    pub(crate) fn new(
        position: TilePosition,
        vertices: Vec<[f32; 2]>,
        surfaces: Vec<SurfaceMesh>,
    ) -> Self {
        Self {
            position,
            vertices,
            surfaces,
        }
    }

    /// Tile position as declared by the tile header.
    #[must_use]
    pub fn position(&self) -> TilePosition {
        self.position
    }

    /// Tile extent in map units.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.position.size()
    }

    /// Lower-left corner in offset map coordinates (global offset removed).
    #[must_use]
    pub fn origin(&self) -> [f32; 2] {
        let size = i64::from(self.size());
        [
            (i64::from(self.position.tx()) * size - i64::from(GLOBAL_OFS_X)) as f32,
            (i64::from(self.position.ty()) * size - i64::from(GLOBAL_OFS_Y)) as f32,
        ]
    }

    /// Vertex positions in offset map coordinates.
    #[must_use]
    pub fn vertices(&self) -> &[[f32; 2]] {
        &self.vertices
    }

    /// Number of unique vertices referenced by the index buffers.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Vertex buffer as raw bytes for upload.
    #[must_use]
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Per-surface meshes in slot order. Empty slots are absent.
    #[must_use]
    pub fn surfaces(&self) -> &[SurfaceMesh] {
        &self.surfaces
    }

    /// The mesh for `surface`, if the tile has any triangles of that type.
    #[must_use]
    pub fn surface(&self, surface: SurfaceType) -> Option<&SurfaceMesh> {
        self.surfaces.iter().find(|m| m.surface == surface)
    }

    /// Total triangles across all surface types.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.surfaces.iter().map(SurfaceMesh::triangle_count).sum()
    }

    /// Bytes needed for the vertex buffer plus all index buffers.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.vertex_bytes().len()
            + self
                .surfaces
                .iter()
                .map(|m| m.index_bytes().len())
                .sum::<usize>()
    }
}
