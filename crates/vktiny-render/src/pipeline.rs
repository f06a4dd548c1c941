use crate::{
    common::pipeline_layout::PipelineLayout,
    context::Context,
    resource::ResourceManager,
    shader::{
        shader::ShaderModule,
        shader_manager::RayTracingShaderManager,
    },
};
use anyhow::{
    ensure,
    Context as _,
    Result,
};
use ash::vk;
use std::path::Path;

const RAY_RECURSION_DEPTH: u32 = 1;

pub fn clamp_recursion_depth(requested: u32, device_limit: u32) -> u32 {
    requested.min(device_limit)
}

pub struct RayTracingPipeline {
    pipeline: vk::Pipeline,
    layout: PipelineLayout,
    device: ash::Device,
}

impl RayTracingPipeline {
    pub fn new(
        context: &Context,
        shaders: &RayTracingShaderManager,
        resources: &ResourceManager,
    ) -> Result<Self> {
        ensure!(!shaders.stages().is_empty(), "no ray tracing shaders were added");
        let device = context.device().clone();
        let layout = PipelineLayout::new(&resources.desc_set_layouts(), device.clone())?;

        let max_recursion_depth = clamp_recursion_depth(
            RAY_RECURSION_DEPTH,
            context.ray_tracing_properties()?.max_ray_recursion_depth,
        );
        let create_info = vk::RayTracingPipelineCreateInfoKHR::default()
            .stages(shaders.stages())
            .groups(shaders.groups())
            .max_pipeline_ray_recursion_depth(max_recursion_depth)
            .layout(layout.vk_pipeline_layout());

        log::info!("creating ray tracing pipeline");
        let pipeline = unsafe {
            context
                .ray_tracing()?
                .raytracing_pipeline
                .create_ray_tracing_pipelines(
                    vk::DeferredOperationKHR::null(),
                    vk::PipelineCache::null(),
                    std::slice::from_ref(&create_info),
                    None,
                )
                .map_err(|(_, err)| err)?
        }
        .into_iter()
        .next()
        .context("no ray tracing pipeline was created")?;

        Ok(Self {
            pipeline,
            layout,
            device,
        })
    }

    pub fn vk_pipeline(&self) -> vk::Pipeline {
        self.pipeline
    }

    pub fn vk_pipeline_layout(&self) -> vk::PipelineLayout {
        self.layout.vk_pipeline_layout()
    }
}

impl Drop for RayTracingPipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
        }
    }
}

pub struct ComputePipeline {
    pipeline: vk::Pipeline,
    layout: PipelineLayout,
    device: ash::Device,
}

impl ComputePipeline {
    pub fn new(
        context: &Context,
        set_layouts: &[vk::DescriptorSetLayout],
        shader_path: impl AsRef<Path>,
    ) -> Result<Self> {
        let device = context.device().clone();
        let shader_module = ShaderModule::new(device.clone(), shader_path.as_ref())?;
        let layout = PipelineLayout::new(set_layouts, device.clone())?;

        let create_info = vk::ComputePipelineCreateInfo::default()
            .stage(shader_module.stage_create_info(vk::ShaderStageFlags::COMPUTE))
            .layout(layout.vk_pipeline_layout());

        log::info!("creating compute pipeline");
        let pipeline = unsafe {
            device
                .create_compute_pipelines(
                    vk::PipelineCache::null(),
                    std::slice::from_ref(&create_info),
                    None,
                )
                .map_err(|(_, err)| err)?
        }
        .into_iter()
        .next()
        .context("no compute pipeline was created")?;

        Ok(Self {
            pipeline,
            layout,
            device,
        })
    }

    pub fn vk_pipeline(&self) -> vk::Pipeline {
        self.pipeline
    }

    pub fn vk_pipeline_layout(&self) -> vk::PipelineLayout {
        self.layout.vk_pipeline_layout()
    }
}

impl Drop for ComputePipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
        }
    }
}
