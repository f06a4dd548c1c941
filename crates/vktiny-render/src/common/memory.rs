use anyhow::{
    Context,
    Result,
};
use ash::vk;

pub fn find_memory_type(
    type_filter: u32,
    required_properties: vk::MemoryPropertyFlags,
    physical_device: vk::PhysicalDevice,
    instance: &ash::Instance,
) -> Result<u32> {
    let mem_props = unsafe { instance.get_physical_device_memory_properties(physical_device) };
    select_memory_type(&mem_props, type_filter, required_properties).with_context(|| {
        format!(
            "failed to find suitable memory type! type_filter: {:?}, properties: {:?}",
            type_filter, required_properties
        )
    })
}

/// First memory type allowed by `type_filter` that has every required property.
pub fn select_memory_type(
    mem_props: &vk::PhysicalDeviceMemoryProperties,
    type_filter: u32,
    required_properties: vk::MemoryPropertyFlags,
) -> Option<u32> {
    mem_props.memory_types[..mem_props.memory_type_count as usize]
        .iter()
        .enumerate()
        .find(|(type_i, mem_type)| {
            type_filter & (1 << type_i) != 0
                && mem_type.property_flags.contains(required_properties)
        })
        .map(|(type_i, _)| type_i as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_properties(flags: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut props = vk::PhysicalDeviceMemoryProperties::default();
        props.memory_type_count = flags.len() as u32;
        for (i, &property_flags) in flags.iter().enumerate() {
            props.memory_types[i] = vk::MemoryType {
                property_flags,
                heap_index: 0,
            };
        }
        props
    }

    #[test]
    fn test_select_memory_type() {
        let props = memory_properties(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::HOST_VISIBLE,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        ]);

        let device_local = vk::MemoryPropertyFlags::DEVICE_LOCAL;
        assert_eq!(select_memory_type(&props, 0b111, device_local), Some(0));

        let host = vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        assert_eq!(select_memory_type(&props, 0b111, host), Some(2));
    }

    #[test]
    fn test_select_memory_type_respects_filter() {
        let props = memory_properties(&[
            vk::MemoryPropertyFlags::HOST_VISIBLE,
            vk::MemoryPropertyFlags::HOST_VISIBLE,
        ]);
        let host_visible = vk::MemoryPropertyFlags::HOST_VISIBLE;
        assert_eq!(select_memory_type(&props, 0b10, host_visible), Some(1));
        assert_eq!(select_memory_type(&props, 0b00, host_visible), None);
    }

    #[test]
    fn test_select_memory_type_ignores_unused_slots() {
        let props = memory_properties(&[vk::MemoryPropertyFlags::DEVICE_LOCAL]);
        let host_visible = vk::MemoryPropertyFlags::HOST_VISIBLE;
        assert_eq!(select_memory_type(&props, u32::MAX, host_visible), None);
    }
}
