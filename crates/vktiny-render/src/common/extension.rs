use crate::utils::tool::convert_char_to_string;
use anyhow::Result;
use ash::vk;
use std::ffi::CStr;

const RAY_TRACING_DEVICE_EXTENSIONS: [&CStr; 9] = [
    ash::khr::swapchain::NAME,
    ash::khr::dedicated_allocation::NAME,
    ash::khr::get_memory_requirements2::NAME,
    ash::khr::maintenance3::NAME,
    ash::khr::pipeline_library::NAME,
    ash::khr::deferred_host_operations::NAME,
    ash::khr::buffer_device_address::NAME,
    ash::khr::ray_tracing_pipeline::NAME,
    ash::khr::acceleration_structure::NAME,
];

const PRESENT_DEVICE_EXTENSIONS: [&CStr; 1] = [ash::khr::swapchain::NAME];

pub fn required_instance_extension_names(
    display_extensions: &[*const std::ffi::c_char],
    enable_debug: bool,
) -> Vec<*const std::ffi::c_char> {
    let mut names = display_extensions.to_vec();
    if enable_debug {
        names.push(ash::ext::debug_utils::NAME.as_ptr());
    }
    names
}

pub fn required_device_extension_names(enable_ray_tracing: bool) -> &'static [&'static CStr] {
    if enable_ray_tracing {
        &RAY_TRACING_DEVICE_EXTENSIONS
    } else {
        &PRESENT_DEVICE_EXTENSIONS
    }
}

pub fn missing_extensions(required: &[&CStr], available: &[String]) -> Vec<String> {
    required
        .iter()
        .map(|name| name.to_string_lossy().to_string())
        .filter(|name| !available.contains(name))
        .collect()
}

pub fn check_device_extension_support(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    required: &[&CStr],
) -> Result<bool> {
    let available_extensions =
        unsafe { instance.enumerate_device_extension_properties(physical_device)? };

    let mut available_extension_names = vec![];
    for extension in available_extensions.iter() {
        available_extension_names.push(convert_char_to_string(&extension.extension_name)?);
    }

    let missing = missing_extensions(required, &available_extension_names);
    for name in missing.iter() {
        log::debug!("Device extension {} is not supported.", name);
    }
    Ok(missing.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_device_extension_names() {
        let present_only = required_device_extension_names(false);
        assert_eq!(present_only, &[ash::khr::swapchain::NAME]);

        let ray_tracing = required_device_extension_names(true);
        assert!(ray_tracing.contains(&ash::khr::ray_tracing_pipeline::NAME));
        assert!(ray_tracing.contains(&ash::khr::acceleration_structure::NAME));
        assert!(ray_tracing.contains(&ash::khr::swapchain::NAME));
    }

    #[test]
    fn test_missing_extensions() {
        let available = vec![
            "VK_KHR_swapchain".to_string(),
            "VK_KHR_maintenance3".to_string(),
        ];
        assert!(missing_extensions(&PRESENT_DEVICE_EXTENSIONS, &available).is_empty());

        let missing = missing_extensions(
            &[ash::khr::swapchain::NAME, ash::khr::ray_tracing_pipeline::NAME],
            &available,
        );
        assert_eq!(missing, vec!["VK_KHR_ray_tracing_pipeline".to_string()]);
    }

    #[test]
    fn test_required_instance_extension_names() {
        let surface = [ash::khr::surface::NAME.as_ptr()];
        assert_eq!(required_instance_extension_names(&surface, false).len(), 1);
        let with_debug = required_instance_extension_names(&surface, true);
        assert_eq!(with_debug.len(), 2);
        assert_eq!(with_debug[1], ash::ext::debug_utils::NAME.as_ptr());
    }
}
