use crate::{
    common::{
        buffer::Buffer,
        command_buffer::{
            begin_single_time_command,
            create_command_buffers,
            end_single_time_command,
        },
        command_pool::CommandPool,
        debug::DebugUtils,
        device::{
            find_queue_family,
            pick_physical_device,
            Device,
            QueueFamilyIndices,
        },
        extra_functions::ExtraFunctions,
        image::Image,
        instance::Instance,
        surface::Surface,
        swapchain::Swapchain,
        sync::{
            next_frame,
            SyncObjects,
        },
    },
    config::ContextCreateInfo,
    raytracing::properties::RaytracingPipelineProperties,
};
use anyhow::{
    Context as _,
    Result,
};
use ash::vk;
use winit::{
    raw_window_handle::HasDisplayHandle,
    window::Window,
};

#[derive(Debug, Clone, Copy)]
pub struct FrameInfo {
    pub image_index: u32,
    pub image_available_semaphore: vk::Semaphore,
    pub render_finished_semaphore: vk::Semaphore,
    pub in_flight_fence: vk::Fence,
}

/// Field order is teardown order.
pub struct Context {
    sync_objects: SyncObjects,
    swapchain: Swapchain,
    command_pool: CommandPool,
    extra_functions: Option<ExtraFunctions>,
    ray_tracing_properties: Option<RaytracingPipelineProperties>,
    queue_family_indices: QueueFamilyIndices,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
    physical_device: vk::PhysicalDevice,
    current_frame: usize,
    device: Device,
    surface: Surface,
    _debug_utils: DebugUtils,
    instance: Instance,
    window: Window,
    _entry: ash::Entry,
}

impl Context {
    pub fn new(window: Window, create_info: &ContextCreateInfo) -> Result<Self> {
        log::info!("loading vulkan entry");
        let entry = unsafe { ash::Entry::load()? };

        log::info!("creating instance");
        let instance = Instance::new(
            &entry,
            &create_info.title,
            window.display_handle()?.as_raw(),
            create_info.debug,
        )?;

        log::info!("setting up debug utils");
        let debug_utils = DebugUtils::new(&entry, instance.instance(), create_info.debug)?;

        log::info!("creating surface");
        let surface = Surface::new(&entry, instance.instance(), &window)?;

        log::info!("picking physical device");
        let physical_device =
            pick_physical_device(instance.instance(), &surface, create_info.ray_tracing)?;
        let queue_family_indices =
            find_queue_family(instance.instance(), physical_device, &surface)?;

        log::info!("creating logical device");
        let device = Device::new(
            instance.instance(),
            physical_device,
            &queue_family_indices,
            create_info.ray_tracing,
        )?;
        let ash_device = device.ash_device().clone();

        log::info!("getting queues");
        let graphics_family = queue_family_indices.graphics_compute_family()?;
        let graphics_queue = unsafe { ash_device.get_device_queue(graphics_family, 0) };
        let present_queue =
            unsafe { ash_device.get_device_queue(queue_family_indices.present_family()?, 0) };

        let (extra_functions, ray_tracing_properties) = if create_info.ray_tracing {
            log::info!("loading ray tracing functions");
            (
                Some(ExtraFunctions::new(instance.instance(), &ash_device)),
                Some(RaytracingPipelineProperties::query(
                    instance.instance(),
                    physical_device,
                )),
            )
        } else {
            (None, None)
        };

        log::info!("creating command pool");
        let command_pool = CommandPool::new(graphics_family, ash_device.clone())?;

        log::info!("creating swapchain");
        let window_size = window.inner_size();
        let swapchain = Swapchain::new(
            instance.instance(),
            &ash_device,
            physical_device,
            &surface,
            &queue_family_indices,
            vk::Extent2D {
                width: window_size.width,
                height: window_size.height,
            },
        )?;

        log::info!("creating sync objects");
        let sync_objects = SyncObjects::new(ash_device, swapchain.vk_swapchain_images().len())?;

        Ok(Self {
            sync_objects,
            swapchain,
            command_pool,
            extra_functions,
            ray_tracing_properties,
            queue_family_indices,
            graphics_queue,
            present_queue,
            physical_device,
            current_frame: 0,
            device,
            surface,
            _debug_utils: debug_utils,
            instance,
            window,
            _entry: entry,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn instance(&self) -> &ash::Instance {
        self.instance.instance()
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub fn device(&self) -> &ash::Device {
        self.device.ash_device()
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn queue_family_indices(&self) -> &QueueFamilyIndices {
        &self.queue_family_indices
    }

    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    pub fn command_pool(&self) -> vk::CommandPool {
        self.command_pool.vk_command_pool()
    }

    pub fn swapchain(&self) -> &Swapchain {
        &self.swapchain
    }

    pub fn swapchain_images(&self) -> &[vk::Image] {
        self.swapchain.vk_swapchain_images()
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.vk_swapchain_extent()
    }

    pub fn format(&self) -> vk::Format {
        self.swapchain.vk_swapchain_format()
    }

    pub fn ray_tracing(&self) -> Result<&ExtraFunctions> {
        self.extra_functions
            .as_ref()
            .context("ray tracing is disabled for this context")
    }

    pub fn ray_tracing_properties(&self) -> Result<RaytracingPipelineProperties> {
        self.ray_tracing_properties
            .context("ray tracing is disabled for this context")
    }

    pub fn create_buffer(
        &self,
        data: Option<&[u8]>,
        size: vk::DeviceSize,
        usage_flags: vk::BufferUsageFlags,
        memory_property_flags: vk::MemoryPropertyFlags,
    ) -> Result<Buffer> {
        Buffer::new(
            data,
            size,
            usage_flags,
            memory_property_flags,
            self.physical_device,
            self.device().clone(),
            self.instance(),
        )
    }

    pub fn create_image(
        &self,
        extent: vk::Extent2D,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
    ) -> Result<Image> {
        Image::new(
            extent,
            format,
            usage,
            self.physical_device,
            self.device().clone(),
            self.instance(),
        )
    }

    pub fn begin_graphics_command(&self) -> Result<vk::CommandBuffer> {
        begin_single_time_command(self.command_pool(), self.device())
    }

    pub fn end_graphics_command(&self, command_buffer: vk::CommandBuffer) -> Result<()> {
        end_single_time_command(
            command_buffer,
            self.graphics_queue,
            self.command_pool(),
            self.device(),
        )
    }

    pub fn allocate_draw_command_buffers(&self) -> Result<Vec<vk::CommandBuffer>> {
        create_command_buffers(
            self.device(),
            self.command_pool(),
            self.swapchain_images().len() as u32,
        )
    }

    pub fn begin_frame(&mut self) -> Result<FrameInfo> {
        let device = self.device.ash_device();
        let in_flight_fence = self.sync_objects.inflight_fence(self.current_frame);
        let image_available_semaphore = self
            .sync_objects
            .image_available_semaphore(self.current_frame);
        let render_finished_semaphore = self
            .sync_objects
            .render_finished_semaphore(self.current_frame);

        unsafe {
            device.wait_for_fences(&[in_flight_fence], true, u64::MAX)?;
        }

        let (image_index, is_suboptimal) = unsafe {
            self.swapchain.swapchain_loader().acquire_next_image(
                self.swapchain.vk_swapchain(),
                u64::MAX,
                image_available_semaphore,
                vk::Fence::null(),
            )?
        };
        if is_suboptimal {
            log::warn!("swapchain is suboptimal for the surface");
        }

        // an earlier frame slot may still be rendering to this image
        let image_fence = self
            .sync_objects
            .replace_image_in_flight(image_index as usize, in_flight_fence);
        if image_fence != vk::Fence::null() && image_fence != in_flight_fence {
            unsafe {
                device.wait_for_fences(&[image_fence], true, u64::MAX)?;
            }
        }

        unsafe {
            device.reset_fences(&[in_flight_fence])?;
        }

        log::debug!(
            "frame {} acquired image {}",
            self.current_frame,
            image_index
        );
        Ok(FrameInfo {
            image_index,
            image_available_semaphore,
            render_finished_semaphore,
            in_flight_fence,
        })
    }

    pub fn end_frame(
        &mut self,
        frame: &FrameInfo,
        command_buffer: vk::CommandBuffer,
        wait_stage: vk::PipelineStageFlags2,
    ) -> Result<()> {
        let command_buffer_infos =
            [vk::CommandBufferSubmitInfo::default().command_buffer(command_buffer)];
        let wait_semaphore_infos = [vk::SemaphoreSubmitInfo::default()
            .semaphore(frame.image_available_semaphore)
            .stage_mask(wait_stage)];
        let signal_semaphore_infos = [vk::SemaphoreSubmitInfo::default()
            .semaphore(frame.render_finished_semaphore)
            .stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS)];
        let submit_infos = [vk::SubmitInfo2::default()
            .command_buffer_infos(&command_buffer_infos)
            .wait_semaphore_infos(&wait_semaphore_infos)
            .signal_semaphore_infos(&signal_semaphore_infos)];
        unsafe {
            self.device().queue_submit2(
                self.graphics_queue,
                &submit_infos,
                frame.in_flight_fence,
            )?;
        }

        let swapchains = [self.swapchain.vk_swapchain()];
        let image_indices = [frame.image_index];
        let wait_semaphores = [frame.render_finished_semaphore];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);
        let is_suboptimal = unsafe {
            self.swapchain
                .swapchain_loader()
                .queue_present(self.present_queue, &present_info)?
        };
        if is_suboptimal {
            log::warn!("swapchain is suboptimal for the surface");
        }

        self.current_frame = next_frame(self.current_frame);
        Ok(())
    }

    pub fn device_wait_idle(&self) -> Result<()> {
        unsafe { self.device().device_wait_idle()? };
        Ok(())
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        if let Err(err) = self.device_wait_idle() {
            log::error!("failed to wait for device idle: {:?}", err);
        }
    }
}
