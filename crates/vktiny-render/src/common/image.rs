use super::{
    image_view::ImageView,
    memory::find_memory_type,
};
use crate::{
    context::Context,
    descriptor::DescriptorWrite,
};
use anyhow::Result;
use ash::vk::{
    self,
    AccessFlags2,
    PipelineStageFlags2,
};

pub fn color_subresource_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

fn color_subresource_layers() -> vk::ImageSubresourceLayers {
    vk::ImageSubresourceLayers {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        mip_level: 0,
        base_array_layer: 0,
        layer_count: 1,
    }
}

pub fn layout_sync_scope(layout: vk::ImageLayout) -> (PipelineStageFlags2, AccessFlags2) {
    match layout {
        vk::ImageLayout::UNDEFINED => (PipelineStageFlags2::TOP_OF_PIPE, AccessFlags2::NONE),
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL => {
            (PipelineStageFlags2::TRANSFER, AccessFlags2::TRANSFER_READ)
        }
        vk::ImageLayout::TRANSFER_DST_OPTIMAL => {
            (PipelineStageFlags2::TRANSFER, AccessFlags2::TRANSFER_WRITE)
        }
        vk::ImageLayout::PRESENT_SRC_KHR => {
            (PipelineStageFlags2::BOTTOM_OF_PIPE, AccessFlags2::NONE)
        }
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL => (
            PipelineStageFlags2::ALL_COMMANDS,
            AccessFlags2::SHADER_READ,
        ),
        // GENERAL is used for storage images written by ray tracing and compute shaders
        _ => (
            PipelineStageFlags2::ALL_COMMANDS,
            AccessFlags2::SHADER_STORAGE_READ | AccessFlags2::SHADER_STORAGE_WRITE,
        ),
    }
}

struct ImageMemory {
    image: vk::Image,
    device_memory: vk::DeviceMemory,
    device: ash::Device,
}

impl Drop for ImageMemory {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_image(self.image, None);
            self.device.free_memory(self.device_memory, None);
        }
    }
}

pub struct Image {
    // the view must be destroyed before the image it references
    view: ImageView,
    memory: ImageMemory,
    device: ash::Device,
    format: vk::Format,
    extent: vk::Extent2D,
    layout: vk::ImageLayout,
}

impl Image {
    pub fn new(
        extent: vk::Extent2D,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
        physical_device: vk::PhysicalDevice,
        device: ash::Device,
        instance: &ash::Instance,
    ) -> Result<Self> {
        let image_create_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);
        let image = unsafe { device.create_image(&image_create_info, None)? };
        let mut memory = ImageMemory {
            image,
            device_memory: vk::DeviceMemory::null(),
            device: device.clone(),
        };

        let memory_requirements = unsafe { device.get_image_memory_requirements(image) };
        let memory_type_index = find_memory_type(
            memory_requirements.memory_type_bits,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            physical_device,
            instance,
        )?;
        memory.device_memory = unsafe {
            device.allocate_memory(
                &vk::MemoryAllocateInfo::default()
                    .allocation_size(memory_requirements.size)
                    .memory_type_index(memory_type_index),
                None,
            )?
        };

        let bind_infos = [vk::BindImageMemoryInfo::default()
            .image(image)
            .memory(memory.device_memory)
            .memory_offset(0)];
        unsafe {
            device.bind_image_memory2(&bind_infos)?;
        }

        let view = ImageView::new_color_2d(image, format, device.clone())?;

        Ok(Self {
            view,
            memory,
            device,
            format,
            extent,
            layout: vk::ImageLayout::UNDEFINED,
        })
    }

    /// Records a transition to `new_layout` and remembers it as the layout
    /// descriptors will reference.
    pub fn record_transition(
        &mut self,
        command_buffer: vk::CommandBuffer,
        new_layout: vk::ImageLayout,
    ) {
        transition_image_layout(
            &self.device,
            command_buffer,
            self.memory.image,
            self.layout,
            new_layout,
        );
        self.layout = new_layout;
    }

    pub fn transition(&mut self, context: &Context, new_layout: vk::ImageLayout) -> Result<()> {
        let command_buffer = context.begin_graphics_command()?;
        self.record_transition(command_buffer, new_layout);
        context.end_graphics_command(command_buffer)
    }

    pub fn create_write(&self) -> DescriptorWrite {
        DescriptorWrite::Image(
            vk::DescriptorImageInfo::default()
                .image_view(self.view.vk_image_view())
                .image_layout(self.layout),
        )
    }

    pub fn image(&self) -> vk::Image {
        self.memory.image
    }

    pub fn image_view(&self) -> vk::ImageView {
        self.view.vk_image_view()
    }

    pub fn format(&self) -> vk::Format {
        self.format
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub fn layout(&self) -> vk::ImageLayout {
        self.layout
    }
}

pub fn transition_image_layout(
    device: &ash::Device,
    command_buffer: vk::CommandBuffer,
    image: vk::Image,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) {
    let (src_stage_mask, src_access_mask) = layout_sync_scope(old_layout);
    let (dst_stage_mask, dst_access_mask) = layout_sync_scope(new_layout);
    let barriers = [vk::ImageMemoryBarrier2::default()
        .src_stage_mask(src_stage_mask)
        .src_access_mask(src_access_mask)
        .dst_stage_mask(dst_stage_mask)
        .dst_access_mask(dst_access_mask)
        .old_layout(old_layout)
        .new_layout(new_layout)
        .image(image)
        .subresource_range(color_subresource_range())];
    let dependency_info = vk::DependencyInfo::default().image_memory_barriers(&barriers);
    unsafe {
        device.cmd_pipeline_barrier2(command_buffer, &dependency_info);
    }
}

/// Copies a whole 2D color image; `src` must be TRANSFER_SRC_OPTIMAL and `dst`
/// TRANSFER_DST_OPTIMAL.
pub fn copy_image(
    device: &ash::Device,
    command_buffer: vk::CommandBuffer,
    src: vk::Image,
    dst: vk::Image,
    extent: vk::Extent2D,
) {
    let image_copy = [vk::ImageCopy2::default()
        .src_subresource(color_subresource_layers())
        .dst_subresource(color_subresource_layers())
        .extent(vk::Extent3D {
            width: extent.width,
            height: extent.height,
            depth: 1,
        })];
    let copy_image_info = vk::CopyImageInfo2::default()
        .src_image(src)
        .src_image_layout(vk::ImageLayout::TRANSFER_SRC_OPTIMAL)
        .dst_image(dst)
        .dst_image_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
        .regions(&image_copy);
    unsafe {
        device.cmd_copy_image2(command_buffer, &copy_image_info);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_sync_scope_transfer() {
        assert_eq!(
            layout_sync_scope(vk::ImageLayout::TRANSFER_SRC_OPTIMAL),
            (PipelineStageFlags2::TRANSFER, AccessFlags2::TRANSFER_READ)
        );
        assert_eq!(
            layout_sync_scope(vk::ImageLayout::TRANSFER_DST_OPTIMAL),
            (PipelineStageFlags2::TRANSFER, AccessFlags2::TRANSFER_WRITE)
        );
    }

    #[test]
    fn test_layout_sync_scope_undefined_has_no_access() {
        let (stage, access) = layout_sync_scope(vk::ImageLayout::UNDEFINED);
        assert_eq!(stage, PipelineStageFlags2::TOP_OF_PIPE);
        assert!(access.is_empty());
    }

    #[test]
    fn test_layout_sync_scope_general_covers_storage() {
        let (_, access) = layout_sync_scope(vk::ImageLayout::GENERAL);
        assert!(access.contains(AccessFlags2::SHADER_STORAGE_WRITE));
        assert!(access.contains(AccessFlags2::SHADER_STORAGE_READ));
    }
}
