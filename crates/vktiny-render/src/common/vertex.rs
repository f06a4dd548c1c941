use ash::vk;

#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Vertex {
    pub pos: [f32; 3],
}

impl Vertex {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { pos: [x, y, z] }
    }

    pub fn format() -> vk::Format {
        vk::Format::R32G32B32_SFLOAT
    }

    pub fn stride() -> vk::DeviceSize {
        std::mem::size_of::<Vertex>() as vk::DeviceSize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout() {
        assert_eq!(Vertex::stride(), 12);
        let vertices = [Vertex::new(1.0, 2.0, 3.0), Vertex::new(4.0, 5.0, 6.0)];
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        assert_eq!(bytes.len(), 24);
        assert_eq!(&bytes[12..16], &4.0f32.to_ne_bytes());
    }
}
