use bytemuck::{Pod, Zeroable};
use serde::Serialize;

/// One corner of a rendered cell quad.
///
/// `#[repr(C)]` + `Pod` so a `&[Vertex]` can be handed to a GPU buffer
/// upload without repacking. Positions are in the image's local space,
/// bottom-left origin, Y up; UVs sample the atlas texture.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

/// Vertices emitted per occupied cell: two triangles, corners duplicated
pub const VERTICES_PER_CELL: usize = 6;
