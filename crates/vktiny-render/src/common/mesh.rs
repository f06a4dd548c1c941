use super::{
    buffer::Buffer,
    index::Index,
    vertex::Vertex,
};
use crate::{
    accel_struct::triangle_primitive_count,
    context::Context,
};
use anyhow::{
    bail,
    ensure,
    Result,
};
use ash::vk;

pub fn geometry_buffer_usage() -> vk::BufferUsageFlags {
    vk::BufferUsageFlags::STORAGE_BUFFER
        | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS
        | vk::BufferUsageFlags::ACCELERATION_STRUCTURE_BUILD_INPUT_READ_ONLY_KHR
}

/// Number of triangles, after checking every index refers to a vertex.
pub fn triangle_count(vertices: &[Vertex], indices: &[Index]) -> Result<u32> {
    ensure!(!vertices.is_empty(), "no vertices to build triangles from");
    let primitive_count = triangle_primitive_count(indices.len())?;
    if let Some(index) = indices
        .iter()
        .find(|&&index| usize::from(index) >= vertices.len())
    {
        bail!(
            "index {} is out of range for {} vertices",
            index.0,
            vertices.len()
        );
    }
    Ok(primitive_count)
}

pub struct Mesh {
    vertex_buffer: Buffer,
    index_buffer: Buffer,
    vertices: Vec<Vertex>,
    indices: Vec<Index>,
}

impl Mesh {
    pub fn new(context: &Context, vertices: Vec<Vertex>, indices: Vec<Index>) -> Result<Self> {
        triangle_count(&vertices, &indices)?;

        let vertex_buffer = create_geometry_buffer(context, bytemuck::cast_slice(&vertices))?;
        let index_buffer = create_geometry_buffer(context, bytemuck::cast_slice(&indices))?;

        Ok(Self {
            vertex_buffer,
            index_buffer,
            vertices,
            indices,
        })
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[Index] {
        &self.indices
    }

    pub fn vertex_buffer(&self) -> &Buffer {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> &Buffer {
        &self.index_buffer
    }
}

pub fn create_geometry_buffer(context: &Context, data: &[u8]) -> Result<Buffer> {
    context.create_buffer(
        Some(data),
        data.len() as vk::DeviceSize,
        geometry_buffer_usage(),
        vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Vec<Vertex> {
        vec![
            Vertex::new(1.0, 1.0, 0.0),
            Vertex::new(-1.0, 1.0, 0.0),
            Vertex::new(0.0, -1.0, 0.0),
        ]
    }

    fn indices(raw: &[u32]) -> Vec<Index> {
        raw.iter().copied().map(Index::from).collect()
    }

    #[test]
    fn test_triangle_count() {
        assert_eq!(triangle_count(&triangle(), &indices(&[0, 1, 2])).unwrap(), 1);
        assert_eq!(
            triangle_count(&triangle(), &indices(&[0, 1, 2, 2, 1, 0])).unwrap(),
            2
        );
    }

    #[test]
    fn test_triangle_count_rejects_out_of_range_index() {
        assert!(triangle_count(&triangle(), &indices(&[0, 1, 3])).is_err());
    }

    #[test]
    fn test_triangle_count_rejects_bad_geometry() {
        assert!(triangle_count(&[], &indices(&[0, 1, 2])).is_err());
        assert!(triangle_count(&triangle(), &[]).is_err());
        assert!(triangle_count(&triangle(), &indices(&[0, 1])).is_err());
    }
}
