use super::{
    extension::{
        check_device_extension_support,
        required_device_extension_names,
    },
    surface::Surface,
    swapchain::query_swapchain_support,
};
use crate::utils::tool::convert_char_to_string;
use anyhow::{
    bail,
    Context,
    Result,
};
use ash::vk;
use std::collections::BTreeSet;

pub fn pick_physical_device(
    instance: &ash::Instance,
    surface: &Surface,
    enable_ray_tracing: bool,
) -> Result<vk::PhysicalDevice> {
    let physical_devices = unsafe { instance.enumerate_physical_devices()? };

    log::debug!(
        "{} devices (GPU) found with vulkan support.",
        physical_devices.len()
    );

    for &physical_device in physical_devices.iter() {
        if is_physical_device_suitable(instance, physical_device, surface, enable_ray_tracing)? {
            let properties = unsafe { instance.get_physical_device_properties(physical_device) };
            let name = convert_char_to_string(&properties.device_name)?;
            log::info!("physical device selected: {}", name);
            return Ok(physical_device);
        }
    }

    bail!("Failed to find a suitable GPU!")
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics_compute_family: Option<u32>,
    pub present_family: Option<u32>,
}

impl QueueFamilyIndices {
    pub fn is_complete(&self) -> bool {
        self.graphics_compute_family.is_some() && self.present_family.is_some()
    }

    pub fn graphics_compute_family(&self) -> Result<u32> {
        self.graphics_compute_family
            .context("No graphics and compute queue family")
    }

    pub fn present_family(&self) -> Result<u32> {
        self.present_family.context("No present queue family")
    }

    pub fn unique_families(&self) -> Vec<u32> {
        [self.graphics_compute_family, self.present_family]
            .into_iter()
            .flatten()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

pub fn find_queue_family(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    surface: &Surface,
) -> Result<QueueFamilyIndices> {
    let queue_families =
        unsafe { instance.get_physical_device_queue_family_properties(physical_device) };

    let mut queue_family_indices = QueueFamilyIndices::default();

    for (index, queue_family) in queue_families.iter().enumerate() {
        let index = index as u32;
        if queue_family.queue_count > 0
            && queue_family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
            && queue_family.queue_flags.contains(vk::QueueFlags::COMPUTE)
            && queue_family_indices.graphics_compute_family.is_none()
        {
            queue_family_indices.graphics_compute_family = Some(index);
        }

        if queue_family.queue_count > 0
            && queue_family_indices.present_family.is_none()
            && surface.is_present_supported(physical_device, index)?
        {
            queue_family_indices.present_family = Some(index);
        }

        if queue_family_indices.is_complete() {
            break;
        }
    }

    Ok(queue_family_indices)
}

fn is_physical_device_suitable(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    surface: &Surface,
    enable_ray_tracing: bool,
) -> Result<bool> {
    let indices = find_queue_family(instance, physical_device, surface)?;
    if !indices.is_complete() {
        return Ok(false);
    }

    let required_extensions = required_device_extension_names(enable_ray_tracing);
    if !check_device_extension_support(instance, physical_device, required_extensions)? {
        return Ok(false);
    }

    let swapchain_support = query_swapchain_support(physical_device, surface)?;
    Ok(!swapchain_support.formats.is_empty() && !swapchain_support.present_modes.is_empty())
}

pub struct Device {
    device: ash::Device,
}

impl Device {
    pub fn new(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        indices: &QueueFamilyIndices,
        enable_ray_tracing: bool,
    ) -> Result<Self> {
        let queue_priorities = [1.0_f32];
        let queue_create_infos = indices
            .unique_families()
            .into_iter()
            .map(|queue_family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(queue_family)
                    .queue_priorities(&queue_priorities)
            })
            .collect::<Vec<_>>();

        let mut vulkan12_features =
            vk::PhysicalDeviceVulkan12Features::default().buffer_device_address(true);
        let mut vulkan13_features =
            vk::PhysicalDeviceVulkan13Features::default().synchronization2(true);
        let mut raytracing_pipeline_features =
            vk::PhysicalDeviceRayTracingPipelineFeaturesKHR::default().ray_tracing_pipeline(true);
        let mut acceleration_structure_features =
            vk::PhysicalDeviceAccelerationStructureFeaturesKHR::default()
                .acceleration_structure(true);

        let mut physical_device_features = vk::PhysicalDeviceFeatures2::default()
            .features(vk::PhysicalDeviceFeatures::default().shader_int64(true))
            .push_next(&mut vulkan12_features)
            .push_next(&mut vulkan13_features);
        if enable_ray_tracing {
            physical_device_features = physical_device_features
                .push_next(&mut raytracing_pipeline_features)
                .push_next(&mut acceleration_structure_features);
        }

        let extension_names = required_device_extension_names(enable_ray_tracing)
            .iter()
            .map(|extension| extension.as_ptr())
            .collect::<Vec<_>>();
        let device_create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_names)
            .push_next(&mut physical_device_features);

        let device = unsafe { instance.create_device(physical_device, &device_create_info, None)? };
        log::info!("logical device created");
        Ok(Self { device })
    }

    pub fn ash_device(&self) -> &ash::Device {
        &self.device
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_device(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_family_indices_complete() {
        let mut indices = QueueFamilyIndices::default();
        assert!(!indices.is_complete());
        assert!(indices.graphics_compute_family().is_err());

        indices.graphics_compute_family = Some(0);
        assert!(!indices.is_complete());
        indices.present_family = Some(2);
        assert!(indices.is_complete());
        assert_eq!(indices.present_family().unwrap(), 2);
    }

    #[test]
    fn test_unique_families() {
        let shared = QueueFamilyIndices {
            graphics_compute_family: Some(1),
            present_family: Some(1),
        };
        assert_eq!(shared.unique_families(), vec![1]);

        let split = QueueFamilyIndices {
            graphics_compute_family: Some(2),
            present_family: Some(0),
        };
        assert_eq!(split.unique_families(), vec![0, 2]);
    }
}
