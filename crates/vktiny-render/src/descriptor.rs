pub mod descriptor_manager;
pub mod registry;

pub use descriptor_manager::DescriptorManager;
pub use registry::DescriptorRegistry;

use ash::vk;

#[derive(Debug, Clone, Copy)]
pub enum DescriptorWrite {
    Buffer(vk::DescriptorBufferInfo),
    Image(vk::DescriptorImageInfo),
    AccelStruct(vk::AccelerationStructureKHR),
}

impl DescriptorWrite {
    pub fn matches(&self, descriptor_type: vk::DescriptorType) -> bool {
        match self {
            DescriptorWrite::Buffer(_) => matches!(
                descriptor_type,
                vk::DescriptorType::STORAGE_BUFFER | vk::DescriptorType::UNIFORM_BUFFER
            ),
            DescriptorWrite::Image(_) => descriptor_type == vk::DescriptorType::STORAGE_IMAGE,
            DescriptorWrite::AccelStruct(_) => {
                descriptor_type == vk::DescriptorType::ACCELERATION_STRUCTURE_KHR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_matches_descriptor_type() {
        let buffer = DescriptorWrite::Buffer(vk::DescriptorBufferInfo::default());
        assert!(buffer.matches(vk::DescriptorType::STORAGE_BUFFER));
        assert!(buffer.matches(vk::DescriptorType::UNIFORM_BUFFER));
        assert!(!buffer.matches(vk::DescriptorType::STORAGE_IMAGE));

        let image = DescriptorWrite::Image(vk::DescriptorImageInfo::default());
        assert!(image.matches(vk::DescriptorType::STORAGE_IMAGE));
        assert!(!image.matches(vk::DescriptorType::ACCELERATION_STRUCTURE_KHR));

        let accel = DescriptorWrite::AccelStruct(vk::AccelerationStructureKHR::null());
        assert!(accel.matches(vk::DescriptorType::ACCELERATION_STRUCTURE_KHR));
        assert!(!accel.matches(vk::DescriptorType::STORAGE_BUFFER));
    }
}
