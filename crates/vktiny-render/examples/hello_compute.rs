use anyhow::{
    Context as _,
    Result,
};
use ash::vk;
use vktiny_base::path::{
    get_project_root,
    get_shader_spv_path,
};
use vktiny_render::{
    common::image::{
        copy_image,
        transition_image_layout,
    },
    config::load_context_create_info,
    pipeline::ComputePipeline,
    resource::ImageHandle,
    utils::math::div_up,
    App,
    Context,
    Example,
    ResourceManager,
};

/// Matches `local_size_x` and `local_size_y` of gradient.comp.
const WORKGROUP_SIZE: u32 = 16;

struct HelloCompute {
    command_buffers: Vec<vk::CommandBuffer>,
    _pipeline: ComputePipeline,
    _resources: ResourceManager,
}

impl Example for HelloCompute {
    fn prepare(context: &mut Context) -> Result<Self> {
        let mut resources = ResourceManager::new(context);
        let render_image = resources.add_storage_image(
            context,
            context.extent(),
            context.format(),
            vk::ImageUsageFlags::STORAGE | vk::ImageUsageFlags::TRANSFER_SRC,
            vk::ImageLayout::GENERAL,
        )?;
        resources.prepare()?;

        let pipeline = ComputePipeline::new(
            context,
            &resources.desc_set_layouts(),
            get_shader_spv_path("gradient.comp")?,
        )?;

        log::info!("recording command buffers");
        let command_buffers = record_command_buffers(context, &resources, render_image, &pipeline)?;

        Ok(Self {
            command_buffers,
            _pipeline: pipeline,
            _resources: resources,
        })
    }

    fn draw(&mut self, context: &mut Context) -> Result<()> {
        let frame = context.begin_frame()?;
        let command_buffer = *self
            .command_buffers
            .get(frame.image_index as usize)
            .context("no command buffer for the acquired image")?;
        context.end_frame(&frame, command_buffer, vk::PipelineStageFlags2::ALL_COMMANDS)
    }
}

fn record_command_buffers(
    context: &Context,
    resources: &ResourceManager,
    render_image: ImageHandle,
    pipeline: &ComputePipeline,
) -> Result<Vec<vk::CommandBuffer>> {
    let device = context.device();
    let extent = context.extent();
    let render_image = resources.storage_image(render_image)?.image();

    let command_buffers = context.allocate_draw_command_buffers()?;
    for (&command_buffer, &swapchain_image) in
        command_buffers.iter().zip(context.swapchain_images())
    {
        unsafe {
            device.begin_command_buffer(command_buffer, &vk::CommandBufferBeginInfo::default())?;
            device.cmd_bind_pipeline(
                command_buffer,
                vk::PipelineBindPoint::COMPUTE,
                pipeline.vk_pipeline(),
            );
            device.cmd_bind_descriptor_sets(
                command_buffer,
                vk::PipelineBindPoint::COMPUTE,
                pipeline.vk_pipeline_layout(),
                0,
                resources.desc_sets(),
                &[],
            );
            device.cmd_dispatch(
                command_buffer,
                div_up(extent.width, WORKGROUP_SIZE),
                div_up(extent.height, WORKGROUP_SIZE),
                1,
            );
        }

        transition_image_layout(
            device,
            command_buffer,
            render_image,
            vk::ImageLayout::GENERAL,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        );
        transition_image_layout(
            device,
            command_buffer,
            swapchain_image,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        );
        copy_image(device, command_buffer, render_image, swapchain_image, extent);
        transition_image_layout(
            device,
            command_buffer,
            render_image,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            vk::ImageLayout::GENERAL,
        );
        transition_image_layout(
            device,
            command_buffer,
            swapchain_image,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::PRESENT_SRC_KHR,
        );

        unsafe {
            device.end_command_buffer(command_buffer)?;
        }
    }
    Ok(command_buffers)
}

fn run() -> Result<()> {
    let config_path = get_project_root()?.join("crates/vktiny-render/configs/hello_compute.json");
    let create_info = load_context_create_info(config_path)?;

    log::info!("compiling shaders");
    vktiny_shader::command::compile_all()?;

    log::info!("starting {}", create_info.title);
    App::<HelloCompute>::run(create_info)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        log::error!("{:?}", err);
        eprintln!("error: {:?}", err);
        std::process::exit(1);
    }
}
