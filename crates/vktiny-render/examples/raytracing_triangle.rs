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
    accel_struct::BottomLevelAccelStruct,
    common::{
        image::{
            copy_image,
            transition_image_layout,
        },
        index::Index,
        mesh::geometry_buffer_usage,
        vertex::Vertex,
    },
    config::load_context_create_info,
    pipeline::RayTracingPipeline,
    resource::ImageHandle,
    shader::shader_manager::RayTracingShaderManager,
    App,
    Context,
    Example,
    ResourceManager,
};

const VERTICES: [Vertex; 3] = [
    Vertex::new(1.0, 1.0, 0.0),
    Vertex::new(-1.0, 1.0, 0.0),
    Vertex::new(0.0, -1.0, 0.0),
];
const INDICES: [Index; 3] = [Index(0), Index(1), Index(2)];

struct RaytracingTriangle {
    command_buffers: Vec<vk::CommandBuffer>,
    _shader_manager: RayTracingShaderManager,
    _pipeline: RayTracingPipeline,
    _resources: ResourceManager,
    // instanced by the top-level structure held in `resources`
    _bottom_level: BottomLevelAccelStruct,
}

impl Example for RaytracingTriangle {
    fn prepare(context: &mut Context) -> Result<Self> {
        let mut resources = ResourceManager::new(context);

        log::info!("creating render image");
        let render_image = resources.add_storage_image(
            context,
            context.extent(),
            context.format(),
            vk::ImageUsageFlags::STORAGE
                | vk::ImageUsageFlags::TRANSFER_SRC
                | vk::ImageUsageFlags::TRANSFER_DST,
            vk::ImageLayout::GENERAL,
        )?;

        log::info!("uploading triangle");
        let host_visible =
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        let vertex_data: &[u8] = bytemuck::cast_slice(&VERTICES);
        let vertex_buffer = resources.add_storage_buffer(
            context,
            vertex_data.len() as vk::DeviceSize,
            geometry_buffer_usage(),
            host_visible,
            Some(vertex_data),
        )?;
        let index_data: &[u8] = bytemuck::cast_slice(&INDICES);
        let index_buffer = resources.add_storage_buffer(
            context,
            index_data.len() as vk::DeviceSize,
            geometry_buffer_usage(),
            host_visible,
            Some(index_data),
        )?;

        log::info!("building acceleration structures");
        let bottom_level = BottomLevelAccelStruct::new(
            context,
            &VERTICES,
            resources.storage_buffer(vertex_buffer)?,
            &INDICES,
            resources.storage_buffer(index_buffer)?,
        )?;
        resources.add_top_level_accel_struct(context, &bottom_level)?;
        resources.prepare()?;

        log::info!("loading shaders");
        let mut shader_manager = RayTracingShaderManager::new();
        shader_manager.add_raygen_shader(context, get_shader_spv_path("raygen.rgen")?)?;
        shader_manager.add_miss_shader(context, get_shader_spv_path("miss.rmiss")?)?;
        shader_manager.add_chit_shader(context, get_shader_spv_path("closesthit.rchit")?)?;

        log::info!("creating pipeline");
        let pipeline = RayTracingPipeline::new(context, &shader_manager, &resources)?;
        shader_manager.init_shader_binding_table(context, &pipeline)?;

        log::info!("recording command buffers");
        let command_buffers =
            record_command_buffers(context, &resources, render_image, &pipeline, &shader_manager)?;

        Ok(Self {
            command_buffers,
            _shader_manager: shader_manager,
            _pipeline: pipeline,
            _resources: resources,
            _bottom_level: bottom_level,
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
    pipeline: &RayTracingPipeline,
    shader_manager: &RayTracingShaderManager,
) -> Result<Vec<vk::CommandBuffer>> {
    let device = context.device();
    let extent = context.extent();
    let render_image = resources.storage_image(render_image)?.image();
    let raytracing_pipeline = &context.ray_tracing()?.raytracing_pipeline;

    let command_buffers = context.allocate_draw_command_buffers()?;
    for (&command_buffer, &swapchain_image) in
        command_buffers.iter().zip(context.swapchain_images())
    {
        unsafe {
            device.begin_command_buffer(command_buffer, &vk::CommandBufferBeginInfo::default())?;
            device.cmd_bind_pipeline(
                command_buffer,
                vk::PipelineBindPoint::RAY_TRACING_KHR,
                pipeline.vk_pipeline(),
            );
            device.cmd_bind_descriptor_sets(
                command_buffer,
                vk::PipelineBindPoint::RAY_TRACING_KHR,
                pipeline.vk_pipeline_layout(),
                0,
                resources.desc_sets(),
                &[],
            );
            raytracing_pipeline.cmd_trace_rays(
                command_buffer,
                shader_manager.raygen_region()?,
                shader_manager.miss_region()?,
                shader_manager.hit_region()?,
                shader_manager.callable_region()?,
                extent.width,
                extent.height,
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
    let config_path =
        get_project_root()?.join("crates/vktiny-render/configs/raytracing_triangle.json");
    let create_info = load_context_create_info(config_path)?;

    log::info!("compiling shaders");
    vktiny_shader::command::compile_all()?;

    log::info!("starting {}", create_info.title);
    App::<RaytracingTriangle>::run(create_info)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        log::error!("{:?}", err);
        eprintln!("error: {:?}", err);
        std::process::exit(1);
    }
}
