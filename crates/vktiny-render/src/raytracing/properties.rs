use ash::vk;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RaytracingPipelineProperties {
    pub shader_group_handle_size: u32,
    pub shader_group_base_alignment: u32,
    pub shader_group_handle_alignment: u32,
    pub max_ray_recursion_depth: u32,
}

impl RaytracingPipelineProperties {
    pub fn query(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> Self {
        let mut raytracing_pipeline_props =
            vk::PhysicalDeviceRayTracingPipelinePropertiesKHR::default();
        let mut physical_device_props =
            vk::PhysicalDeviceProperties2::default().push_next(&mut raytracing_pipeline_props);
        unsafe {
            instance.get_physical_device_properties2(physical_device, &mut physical_device_props);
        }
        Self::from(&raytracing_pipeline_props)
    }
}

impl From<&vk::PhysicalDeviceRayTracingPipelinePropertiesKHR<'_>> for RaytracingPipelineProperties {
    fn from(props: &vk::PhysicalDeviceRayTracingPipelinePropertiesKHR<'_>) -> Self {
        Self {
            shader_group_handle_size: props.shader_group_handle_size,
            shader_group_base_alignment: props.shader_group_base_alignment,
            shader_group_handle_alignment: props.shader_group_handle_alignment,
            max_ray_recursion_depth: props.max_ray_recursion_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vk_properties() {
        let vk_props = vk::PhysicalDeviceRayTracingPipelinePropertiesKHR::default()
            .shader_group_handle_size(32)
            .shader_group_base_alignment(64)
            .shader_group_handle_alignment(32)
            .max_ray_recursion_depth(31);
        let props = RaytracingPipelineProperties::from(&vk_props);
        assert_eq!(props.shader_group_handle_size, 32);
        assert_eq!(props.shader_group_base_alignment, 64);
        assert_eq!(props.shader_group_handle_alignment, 32);
        assert_eq!(props.max_ray_recursion_depth, 31);
    }
}
