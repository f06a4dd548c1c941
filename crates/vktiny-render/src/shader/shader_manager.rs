use super::shader::ShaderModule;
use crate::{
    context::Context,
    pipeline::RayTracingPipeline,
    raytracing::shader_binding_table::{
        SbtGroupCounts,
        ShaderBindingTable,
        ShaderBindingTableLayout,
    },
};
use anyhow::{
    Context as _,
    Result,
};
use ash::vk;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderGroupKind {
    Raygen,
    Miss,
    Hit,
    Callable,
}

fn general_group(stage_index: u32) -> vk::RayTracingShaderGroupCreateInfoKHR<'static> {
    vk::RayTracingShaderGroupCreateInfoKHR::default()
        .ty(vk::RayTracingShaderGroupTypeKHR::GENERAL)
        .general_shader(stage_index)
        .closest_hit_shader(vk::SHADER_UNUSED_KHR)
        .any_hit_shader(vk::SHADER_UNUSED_KHR)
        .intersection_shader(vk::SHADER_UNUSED_KHR)
}

fn triangles_hit_group(stage_index: u32) -> vk::RayTracingShaderGroupCreateInfoKHR<'static> {
    vk::RayTracingShaderGroupCreateInfoKHR::default()
        .ty(vk::RayTracingShaderGroupTypeKHR::TRIANGLES_HIT_GROUP)
        .general_shader(vk::SHADER_UNUSED_KHR)
        .closest_hit_shader(stage_index)
        .any_hit_shader(vk::SHADER_UNUSED_KHR)
        .intersection_shader(vk::SHADER_UNUSED_KHR)
}

pub struct RayTracingShaderManager {
    shader_binding_table: Option<ShaderBindingTable>,
    stages: Vec<vk::PipelineShaderStageCreateInfo<'static>>,
    groups: Vec<vk::RayTracingShaderGroupCreateInfoKHR<'static>>,
    group_kinds: Vec<ShaderGroupKind>,
    modules: Vec<ShaderModule>,
}

impl Default for RayTracingShaderManager {
    fn default() -> Self {
        Self::new()
    }
}

impl RayTracingShaderManager {
    pub fn new() -> Self {
        Self {
            shader_binding_table: None,
            stages: vec![],
            groups: vec![],
            group_kinds: vec![],
            modules: vec![],
        }
    }

    pub fn add_raygen_shader(&mut self, context: &Context, path: impl AsRef<Path>) -> Result<()> {
        self.add_shader(
            context,
            path.as_ref(),
            vk::ShaderStageFlags::RAYGEN_KHR,
            ShaderGroupKind::Raygen,
        )
    }

    pub fn add_miss_shader(&mut self, context: &Context, path: impl AsRef<Path>) -> Result<()> {
        self.add_shader(
            context,
            path.as_ref(),
            vk::ShaderStageFlags::MISS_KHR,
            ShaderGroupKind::Miss,
        )
    }

    pub fn add_chit_shader(&mut self, context: &Context, path: impl AsRef<Path>) -> Result<()> {
        self.add_shader(
            context,
            path.as_ref(),
            vk::ShaderStageFlags::CLOSEST_HIT_KHR,
            ShaderGroupKind::Hit,
        )
    }

    pub fn add_callable_shader(
        &mut self,
        context: &Context,
        path: impl AsRef<Path>,
    ) -> Result<()> {
        self.add_shader(
            context,
            path.as_ref(),
            vk::ShaderStageFlags::CALLABLE_KHR,
            ShaderGroupKind::Callable,
        )
    }

    fn add_shader(
        &mut self,
        context: &Context,
        path: &Path,
        stage: vk::ShaderStageFlags,
        kind: ShaderGroupKind,
    ) -> Result<()> {
        let module = ShaderModule::new(context.device().clone(), path)?;
        self.push_stage(module.stage_create_info(stage), kind);
        self.modules.push(module);
        Ok(())
    }

    fn push_stage(
        &mut self,
        stage: vk::PipelineShaderStageCreateInfo<'static>,
        kind: ShaderGroupKind,
    ) {
        let stage_index = self.stages.len() as u32;
        let group = match kind {
            ShaderGroupKind::Hit => triangles_hit_group(stage_index),
            _ => general_group(stage_index),
        };
        self.stages.push(stage);
        self.groups.push(group);
        self.group_kinds.push(kind);
    }

    pub fn stages(&self) -> &[vk::PipelineShaderStageCreateInfo<'static>] {
        &self.stages
    }

    pub fn groups(&self) -> &[vk::RayTracingShaderGroupCreateInfoKHR<'static>] {
        &self.groups
    }

    pub fn group_indices(&self, kind: ShaderGroupKind) -> Vec<u32> {
        self.group_kinds
            .iter()
            .enumerate()
            .filter(|&(_, &k)| k == kind)
            .map(|(i, _)| i as u32)
            .collect()
    }

    pub fn group_counts(&self) -> SbtGroupCounts {
        let count = |kind: ShaderGroupKind| {
            self.group_kinds.iter().filter(|&&k| k == kind).count() as u32
        };
        SbtGroupCounts {
            raygen: count(ShaderGroupKind::Raygen),
            miss: count(ShaderGroupKind::Miss),
            hit: count(ShaderGroupKind::Hit),
            callable: count(ShaderGroupKind::Callable),
        }
    }

    pub fn init_shader_binding_table(
        &mut self,
        context: &Context,
        pipeline: &RayTracingPipeline,
    ) -> Result<()> {
        let properties = context.ray_tracing_properties()?;
        let layout = ShaderBindingTableLayout::new(&properties, self.group_counts())?;

        let raygen = self.group_indices(ShaderGroupKind::Raygen);
        let miss = self.group_indices(ShaderGroupKind::Miss);
        let hit = self.group_indices(ShaderGroupKind::Hit);
        let callable = self.group_indices(ShaderGroupKind::Callable);
        let shader_binding_table = ShaderBindingTable::new(
            context,
            pipeline.vk_pipeline(),
            &layout,
            self.groups.len() as u32,
            [&raygen[..], &miss[..], &hit[..], &callable[..]],
            properties.shader_group_base_alignment,
        )?;
        self.shader_binding_table = Some(shader_binding_table);
        Ok(())
    }

    fn shader_binding_table(&self) -> Result<&ShaderBindingTable> {
        self.shader_binding_table
            .as_ref()
            .context("shader binding table is not initialized")
    }

    pub fn raygen_region(&self) -> Result<&vk::StridedDeviceAddressRegionKHR> {
        Ok(self.shader_binding_table()?.raygen_region())
    }

    pub fn miss_region(&self) -> Result<&vk::StridedDeviceAddressRegionKHR> {
        Ok(self.shader_binding_table()?.miss_region())
    }

    pub fn hit_region(&self) -> Result<&vk::StridedDeviceAddressRegionKHR> {
        Ok(self.shader_binding_table()?.hit_region())
    }

    pub fn callable_region(&self) -> Result<&vk::StridedDeviceAddressRegionKHR> {
        Ok(self.shader_binding_table()?.callable_region())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(stage: vk::ShaderStageFlags) -> vk::PipelineShaderStageCreateInfo<'static> {
        vk::PipelineShaderStageCreateInfo::default().stage(stage)
    }

    #[test]
    fn test_groups_follow_registration_order() {
        let mut manager = RayTracingShaderManager::new();
        manager.push_stage(stage(vk::ShaderStageFlags::RAYGEN_KHR), ShaderGroupKind::Raygen);
        manager.push_stage(stage(vk::ShaderStageFlags::MISS_KHR), ShaderGroupKind::Miss);
        manager.push_stage(
            stage(vk::ShaderStageFlags::CLOSEST_HIT_KHR),
            ShaderGroupKind::Hit,
        );
        manager.push_stage(stage(vk::ShaderStageFlags::MISS_KHR), ShaderGroupKind::Miss);

        assert_eq!(manager.stages().len(), 4);
        let groups = manager.groups();
        assert_eq!(groups[0].ty, vk::RayTracingShaderGroupTypeKHR::GENERAL);
        assert_eq!(groups[0].general_shader, 0);
        assert_eq!(groups[1].general_shader, 1);
        assert_eq!(
            groups[2].ty,
            vk::RayTracingShaderGroupTypeKHR::TRIANGLES_HIT_GROUP
        );
        assert_eq!(groups[2].general_shader, vk::SHADER_UNUSED_KHR);
        assert_eq!(groups[2].closest_hit_shader, 2);
        assert_eq!(groups[3].general_shader, 3);

        assert_eq!(manager.group_indices(ShaderGroupKind::Miss), vec![1, 3]);
        assert_eq!(manager.group_indices(ShaderGroupKind::Hit), vec![2]);
        assert_eq!(
            manager.group_counts(),
            SbtGroupCounts {
                raygen: 1,
                miss: 2,
                hit: 1,
                callable: 0,
            }
        );
    }

    #[test]
    fn test_regions_before_init_are_errors() {
        let manager = RayTracingShaderManager::new();
        assert!(manager.raygen_region().is_err());
        assert!(manager.callable_region().is_err());
    }
}
