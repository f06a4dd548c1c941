use super::{
    registry::PendingWrite,
    DescriptorRegistry,
    DescriptorWrite,
};
use crate::{
    accel_struct::{
        AccelerationStructure,
        TopLevelAccelStruct,
    },
    common::{
        buffer::Buffer,
        descriptor_pool::DescriptorPool,
        descriptor_set_layout::DescriptorSetLayout,
        image::Image,
    },
};
use anyhow::{
    ensure,
    Context as _,
    Result,
};
use ash::vk;

/// Collects resource registrations, then creates the pool, one layout per
/// set index, one set per layout and writes every registered resource.
pub struct DescriptorManager {
    descriptor_sets: Vec<vk::DescriptorSet>,
    descriptor_pool: Option<DescriptorPool>,
    descriptor_set_layouts: Vec<DescriptorSetLayout>,
    registry: DescriptorRegistry,
    device: ash::Device,
}

impl DescriptorManager {
    pub fn new(device: ash::Device) -> Self {
        Self {
            descriptor_sets: vec![],
            descriptor_pool: None,
            descriptor_set_layouts: vec![],
            registry: DescriptorRegistry::default(),
            device,
        }
    }

    pub fn with_stage_flags(mut self, stage_flags: vk::ShaderStageFlags) -> Self {
        self.registry.set_stage_flags(stage_flags);
        self
    }

    pub fn add_storage_buffer(&mut self, buffer: &Buffer, binding: u32, set: u32) -> Result<()> {
        self.registry.add(
            vk::DescriptorType::STORAGE_BUFFER,
            binding,
            set,
            buffer.create_write(),
        )
    }

    pub fn add_uniform_buffer(&mut self, buffer: &Buffer, binding: u32, set: u32) -> Result<()> {
        self.registry.add(
            vk::DescriptorType::UNIFORM_BUFFER,
            binding,
            set,
            buffer.create_write(),
        )
    }

    pub fn add_storage_image(&mut self, image: &Image, binding: u32, set: u32) -> Result<()> {
        self.registry.add(
            vk::DescriptorType::STORAGE_IMAGE,
            binding,
            set,
            image.create_write(),
        )
    }

    pub fn add_top_level_accel_struct(
        &mut self,
        accel_struct: &TopLevelAccelStruct,
        binding: u32,
        set: u32,
    ) -> Result<()> {
        self.registry.add(
            vk::DescriptorType::ACCELERATION_STRUCTURE_KHR,
            binding,
            set,
            accel_struct.create_write(),
        )
    }

    pub fn prepare(&mut self, max_sets: u32) -> Result<()> {
        ensure!(max_sets > 0, "max_sets must be greater than zero");
        self.registry.seal()?;

        log::info!("creating descriptor pool");
        let set_count = self.registry.set_count();
        let pool_sizes = self.registry.pool_sizes(max_sets);
        let descriptor_pool =
            DescriptorPool::new(&pool_sizes, max_sets * set_count, self.device.clone())?;

        log::info!("creating {} descriptor set layouts", set_count);
        let mut descriptor_set_layouts = Vec::with_capacity(set_count as usize);
        for set in 0..set_count {
            descriptor_set_layouts.push(DescriptorSetLayout::new(
                self.registry.layout_bindings(set),
                self.device.clone(),
            )?);
        }

        log::info!("allocating descriptor sets");
        let vk_layouts = descriptor_set_layouts
            .iter()
            .map(|layout| layout.vk_descriptor_set_layout())
            .collect::<Vec<_>>();
        let descriptor_sets = descriptor_pool.allocate(&vk_layouts)?;

        log::info!("updating descriptor sets");
        update_descriptor_sets(&self.device, &descriptor_sets, self.registry.writes())?;

        self.descriptor_pool = Some(descriptor_pool);
        self.descriptor_set_layouts = descriptor_set_layouts;
        self.descriptor_sets = descriptor_sets;
        Ok(())
    }

    pub fn is_prepared(&self) -> bool {
        self.descriptor_pool.is_some()
    }

    pub fn registry(&self) -> &DescriptorRegistry {
        &self.registry
    }

    pub fn desc_set(&self) -> Result<vk::DescriptorSet> {
        self.desc_set_at(0)
    }

    pub fn desc_set_at(&self, set: u32) -> Result<vk::DescriptorSet> {
        self.descriptor_sets
            .get(set as usize)
            .copied()
            .with_context(|| format!("descriptor set {} is not prepared", set))
    }

    pub fn desc_sets(&self) -> &[vk::DescriptorSet] {
        &self.descriptor_sets
    }

    pub fn desc_set_layout(&self) -> Result<vk::DescriptorSetLayout> {
        self.descriptor_set_layouts
            .first()
            .map(|layout| layout.vk_descriptor_set_layout())
            .context("descriptor set layouts are not prepared")
    }

    pub fn desc_set_layouts(&self) -> Vec<vk::DescriptorSetLayout> {
        self.descriptor_set_layouts
            .iter()
            .map(|layout| layout.vk_descriptor_set_layout())
            .collect()
    }
}

fn update_descriptor_sets(
    device: &ash::Device,
    descriptor_sets: &[vk::DescriptorSet],
    pending_writes: &[PendingWrite],
) -> Result<()> {
    let mut accel_struct_infos = pending_writes
        .iter()
        .filter_map(|pending| match &pending.write {
            DescriptorWrite::AccelStruct(handle) => Some(
                vk::WriteDescriptorSetAccelerationStructureKHR::default()
                    .acceleration_structures(std::slice::from_ref(handle)),
            ),
            _ => None,
        })
        .collect::<Vec<_>>();
    let mut accel_struct_infos = accel_struct_infos.iter_mut();

    let mut writes = Vec::with_capacity(pending_writes.len());
    for pending in pending_writes {
        let dst_set = *descriptor_sets
            .get(pending.set as usize)
            .with_context(|| format!("descriptor set {} was not allocated", pending.set))?;
        let write = vk::WriteDescriptorSet::default()
            .dst_set(dst_set)
            .dst_binding(pending.binding)
            .dst_array_element(0)
            .descriptor_type(pending.descriptor_type);
        let write = match &pending.write {
            DescriptorWrite::Buffer(info) => write.buffer_info(std::slice::from_ref(info)),
            DescriptorWrite::Image(info) => write.image_info(std::slice::from_ref(info)),
            DescriptorWrite::AccelStruct(_) => {
                let accel_struct_info = accel_struct_infos
                    .next()
                    .context("missing acceleration structure write")?;
                write.push_next(accel_struct_info).descriptor_count(1)
            }
        };
        writes.push(write);
    }

    unsafe {
        device.update_descriptor_sets(&writes, &[]);
    }
    Ok(())
}
