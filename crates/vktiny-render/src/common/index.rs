use ash::vk;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(transparent)]
pub struct Index(pub u32);

impl Index {
    pub fn get_type() -> vk::IndexType {
        vk::IndexType::UINT32
    }
}

impl From<u32> for Index {
    fn from(index: u32) -> Self {
        Self(index)
    }
}

impl From<Index> for usize {
    fn from(index: Index) -> Self {
        index.0 as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_bytes() {
        let indices: Vec<Index> = [0u32, 1, 2].into_iter().map(Index::from).collect();
        let bytes: &[u8] = bytemuck::cast_slice(&indices);
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[8..12], &2u32.to_ne_bytes());
        assert_eq!(usize::from(indices[1]), 1);
    }
}
