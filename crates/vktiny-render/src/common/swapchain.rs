use super::{
    device::QueueFamilyIndices,
    surface::Surface,
};
use anyhow::{
    Context,
    Result,
};
use ash::vk;

pub struct Swapchain {
    swapchain_loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    swapchain_images: Vec<vk::Image>,
    swapchain_format: vk::Format,
    swapchain_extent: vk::Extent2D,
}

impl Swapchain {
    pub fn new(
        instance: &ash::Instance,
        device: &ash::Device,
        physical_device: vk::PhysicalDevice,
        surface: &Surface,
        queue_family: &QueueFamilyIndices,
        window_extent: vk::Extent2D,
    ) -> Result<Self> {
        let swapchain_support = query_swapchain_support(physical_device, surface)?;
        let surface_format = choose_swapchain_format(&swapchain_support.formats)?;
        let present_mode = choose_swapchain_present_mode(&swapchain_support.present_modes);
        let extent = choose_swapchain_extent(&swapchain_support.capabilities, window_extent);
        let image_count = choose_image_count(&swapchain_support.capabilities);

        let graphics_family = queue_family.graphics_compute_family()?;
        let present_family = queue_family.present_family()?;
        let queue_family_indices = [graphics_family, present_family];
        let mut swapchain_create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface.surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(swapchain_support.capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(vk::SwapchainKHR::null());
        if graphics_family != present_family {
            swapchain_create_info = swapchain_create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&queue_family_indices);
        }

        let swapchain_loader = ash::khr::swapchain::Device::new(instance, device);
        let swapchain = unsafe { swapchain_loader.create_swapchain(&swapchain_create_info, None)? };
        let swapchain_images = unsafe { swapchain_loader.get_swapchain_images(swapchain)? };
        log::info!(
            "swapchain created: {} images, {}x{}, {:?}, {:?}",
            swapchain_images.len(),
            extent.width,
            extent.height,
            surface_format.format,
            present_mode
        );

        Ok(Swapchain {
            swapchain_loader,
            swapchain,
            swapchain_format: surface_format.format,
            swapchain_extent: extent,
            swapchain_images,
        })
    }

    pub fn swapchain_loader(&self) -> &ash::khr::swapchain::Device {
        &self.swapchain_loader
    }

    pub fn vk_swapchain(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    pub fn vk_swapchain_images(&self) -> &[vk::Image] {
        &self.swapchain_images
    }

    pub fn vk_swapchain_format(&self) -> vk::Format {
        self.swapchain_format
    }

    pub fn vk_swapchain_extent(&self) -> vk::Extent2D {
        self.swapchain_extent
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            self.swapchain_loader
                .destroy_swapchain(self.swapchain, None);
        }
    }
}

pub struct SwapChainSupportDetail {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

pub fn choose_swapchain_format(
    available_formats: &[vk::SurfaceFormatKHR],
) -> Result<vk::SurfaceFormatKHR> {
    available_formats
        .iter()
        .find(|format| {
            format.format == vk::Format::B8G8R8A8_UNORM
                && format.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .or_else(|| available_formats.first())
        .copied()
        .context("No surface formats available")
}

pub fn choose_swapchain_present_mode(
    available_present_modes: &[vk::PresentModeKHR],
) -> vk::PresentModeKHR {
    if available_present_modes.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

pub fn choose_swapchain_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    window_extent: vk::Extent2D,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D::default()
            .width(window_extent.width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ))
            .height(window_extent.height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ))
    }
}

/// One more than the minimum, capped by the maximum (0 means unbounded).
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let image_count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        image_count.min(capabilities.max_image_count)
    } else {
        image_count
    }
}

pub fn query_swapchain_support(
    physical_device: vk::PhysicalDevice,
    surface: &Surface,
) -> Result<SwapChainSupportDetail> {
    unsafe {
        let capabilities = surface
            .surface_loader
            .get_physical_device_surface_capabilities(physical_device, surface.surface)?;
        let formats = surface
            .surface_loader
            .get_physical_device_surface_formats(physical_device, surface.surface)?;
        let present_modes = surface
            .surface_loader
            .get_physical_device_surface_present_modes(physical_device, surface.surface)?;

        Ok(SwapChainSupportDetail {
            capabilities,
            formats,
            present_modes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface_format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space,
        }
    }

    #[test]
    fn test_choose_swapchain_format() {
        let preferred = surface_format(
            vk::Format::B8G8R8A8_UNORM,
            vk::ColorSpaceKHR::SRGB_NONLINEAR,
        );
        let other = surface_format(
            vk::Format::R8G8B8A8_SRGB,
            vk::ColorSpaceKHR::SRGB_NONLINEAR,
        );
        assert_eq!(choose_swapchain_format(&[other, preferred]).unwrap(), preferred);
        assert_eq!(choose_swapchain_format(&[other]).unwrap(), other);
        assert!(choose_swapchain_format(&[]).is_err());
    }

    #[test]
    fn test_choose_swapchain_present_mode() {
        assert_eq!(
            choose_swapchain_present_mode(&[
                vk::PresentModeKHR::FIFO,
                vk::PresentModeKHR::MAILBOX
            ]),
            vk::PresentModeKHR::MAILBOX
        );
        assert_eq!(
            choose_swapchain_present_mode(&[vk::PresentModeKHR::IMMEDIATE]),
            vk::PresentModeKHR::FIFO
        );
    }

    #[test]
    fn test_choose_swapchain_extent() {
        let window = vk::Extent2D {
            width: 4000,
            height: 10,
        };
        let fixed = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: 1280,
                height: 720,
            },
            ..Default::default()
        };
        assert_eq!(choose_swapchain_extent(&fixed, window), fixed.current_extent);

        let free = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            },
            min_image_extent: vk::Extent2D {
                width: 64,
                height: 64,
            },
            max_image_extent: vk::Extent2D {
                width: 2048,
                height: 2048,
            },
            ..Default::default()
        };
        assert_eq!(
            choose_swapchain_extent(&free, window),
            vk::Extent2D {
                width: 2048,
                height: 64
            }
        );
    }

    #[test]
    fn test_choose_image_count() {
        let bounded = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 3,
            ..Default::default()
        };
        assert_eq!(choose_image_count(&bounded), 3);

        let capped = vk::SurfaceCapabilitiesKHR {
            min_image_count: 3,
            max_image_count: 3,
            ..Default::default()
        };
        assert_eq!(choose_image_count(&capped), 3);

        let unbounded = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 0,
            ..Default::default()
        };
        assert_eq!(choose_image_count(&unbounded), 3);
    }
}
