use anyhow::{
    Context,
    Result,
};
use ash::vk;

pub fn create_command_buffers(
    device: &ash::Device,
    command_pool: vk::CommandPool,
    count: u32,
) -> Result<Vec<vk::CommandBuffer>> {
    let command_buffer_allocate_info = vk::CommandBufferAllocateInfo::default()
        .command_buffer_count(count)
        .command_pool(command_pool)
        .level(vk::CommandBufferLevel::PRIMARY);

    let command_buffers =
        unsafe { device.allocate_command_buffers(&command_buffer_allocate_info)? };
    Ok(command_buffers)
}

pub fn begin_single_time_command(
    command_pool: vk::CommandPool,
    device: &ash::Device,
) -> Result<vk::CommandBuffer> {
    let command_buffer = create_command_buffers(device, command_pool, 1)?
        .into_iter()
        .next()
        .context("failed to allocate command buffer")?;

    let begin_info =
        vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

    unsafe {
        device.begin_command_buffer(command_buffer, &begin_info)?;
    }

    Ok(command_buffer)
}

/// Ends, submits and frees `command_buffer`, blocking until `queue` is idle.
pub fn end_single_time_command(
    command_buffer: vk::CommandBuffer,
    queue: vk::Queue,
    command_pool: vk::CommandPool,
    device: &ash::Device,
) -> Result<()> {
    unsafe {
        device.end_command_buffer(command_buffer)?;

        let command_buffer_infos =
            [vk::CommandBufferSubmitInfo::default().command_buffer(command_buffer)];
        let submit_infos =
            [vk::SubmitInfo2::default().command_buffer_infos(&command_buffer_infos)];

        device.queue_submit2(queue, &submit_infos, vk::Fence::null())?;
        device.queue_wait_idle(queue)?;

        device.free_command_buffers(command_pool, &[command_buffer]);
    }
    Ok(())
}
