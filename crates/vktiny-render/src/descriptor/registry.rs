use super::DescriptorWrite;
use anyhow::{
    bail,
    ensure,
    Result,
};
use ash::vk;
use std::collections::BTreeMap;

pub fn default_stage_flags(ray_tracing: bool) -> vk::ShaderStageFlags {
    if ray_tracing {
        vk::ShaderStageFlags::RAYGEN_KHR
            | vk::ShaderStageFlags::CLOSEST_HIT_KHR
            | vk::ShaderStageFlags::MISS_KHR
            | vk::ShaderStageFlags::COMPUTE
    } else {
        vk::ShaderStageFlags::COMPUTE
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PendingWrite {
    pub set: u32,
    pub binding: u32,
    pub descriptor_type: vk::DescriptorType,
    pub write: DescriptorWrite,
}

/// Device-free bookkeeping behind `DescriptorManager`: per-type counts,
/// per-set layout bindings and the writes applied at prepare time.
#[derive(Debug)]
pub struct DescriptorRegistry {
    counts: BTreeMap<vk::DescriptorType, u32>,
    bindings: BTreeMap<u32, Vec<vk::DescriptorSetLayoutBinding<'static>>>,
    writes: Vec<PendingWrite>,
    stage_flags: vk::ShaderStageFlags,
    sealed: bool,
}

impl Default for DescriptorRegistry {
    fn default() -> Self {
        Self::new(default_stage_flags(true))
    }
}

impl DescriptorRegistry {
    pub fn new(stage_flags: vk::ShaderStageFlags) -> Self {
        Self {
            counts: BTreeMap::new(),
            bindings: BTreeMap::new(),
            writes: vec![],
            stage_flags,
            sealed: false,
        }
    }

    pub fn set_stage_flags(&mut self, stage_flags: vk::ShaderStageFlags) {
        self.stage_flags = stage_flags;
    }

    pub fn add(
        &mut self,
        descriptor_type: vk::DescriptorType,
        binding: u32,
        set: u32,
        write: DescriptorWrite,
    ) -> Result<()> {
        ensure!(!self.sealed, "descriptors are already prepared");
        ensure!(
            write.matches(descriptor_type),
            "write {:?} cannot fill a {:?} binding",
            write,
            descriptor_type
        );

        let set_bindings = self.bindings.entry(set).or_default();
        if set_bindings.iter().any(|b| b.binding == binding) {
            bail!("binding {} of set {} is already in use", binding, set);
        }
        set_bindings.push(
            vk::DescriptorSetLayoutBinding::default()
                .binding(binding)
                .descriptor_type(descriptor_type)
                .descriptor_count(1)
                .stage_flags(self.stage_flags),
        );

        *self.counts.entry(descriptor_type).or_insert(0) += 1;
        self.writes.push(PendingWrite {
            set,
            binding,
            descriptor_type,
            write,
        });
        Ok(())
    }

    pub fn descriptor_count(&self, descriptor_type: vk::DescriptorType) -> u32 {
        self.counts.get(&descriptor_type).copied().unwrap_or(0)
    }

    pub fn pool_sizes(&self, max_sets: u32) -> Vec<vk::DescriptorPoolSize> {
        self.counts
            .iter()
            .map(|(&ty, &count)| {
                vk::DescriptorPoolSize::default()
                    .ty(ty)
                    .descriptor_count(count * max_sets)
            })
            .collect()
    }

    pub fn set_count(&self) -> u32 {
        self.bindings
            .keys()
            .next_back()
            .map(|&set| set + 1)
            .unwrap_or(0)
    }

    /// Bindings of `set`; empty for an index below the highest set with no bindings.
    pub fn layout_bindings(&self, set: u32) -> &[vk::DescriptorSetLayoutBinding<'static>] {
        self.bindings
            .get(&set)
            .map(|bindings| bindings.as_slice())
            .unwrap_or(&[])
    }

    pub fn writes(&self) -> &[PendingWrite] {
        &self.writes
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Marks the registry prepared; rejects a second call.
    pub fn seal(&mut self) -> Result<()> {
        ensure!(!self.sealed, "descriptors are already prepared");
        ensure!(!self.is_empty(), "no descriptors were registered");
        self.sealed = true;
        Ok(())
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_write() -> DescriptorWrite {
        DescriptorWrite::Buffer(vk::DescriptorBufferInfo::default())
    }

    fn image_write() -> DescriptorWrite {
        DescriptorWrite::Image(vk::DescriptorImageInfo::default())
    }

    fn accel_write() -> DescriptorWrite {
        DescriptorWrite::AccelStruct(vk::AccelerationStructureKHR::null())
    }

    #[test]
    fn test_counts_are_order_independent() {
        let mut a = DescriptorRegistry::default();
        a.add(vk::DescriptorType::STORAGE_IMAGE, 0, 0, image_write())
            .unwrap();
        a.add(vk::DescriptorType::STORAGE_BUFFER, 1, 0, buffer_write())
            .unwrap();
        a.add(vk::DescriptorType::STORAGE_BUFFER, 2, 0, buffer_write())
            .unwrap();
        a.add(
            vk::DescriptorType::ACCELERATION_STRUCTURE_KHR,
            3,
            0,
            accel_write(),
        )
        .unwrap();

        let mut b = DescriptorRegistry::default();
        b.add(
            vk::DescriptorType::ACCELERATION_STRUCTURE_KHR,
            3,
            0,
            accel_write(),
        )
        .unwrap();
        b.add(vk::DescriptorType::STORAGE_BUFFER, 2, 0, buffer_write())
            .unwrap();
        b.add(vk::DescriptorType::STORAGE_IMAGE, 0, 0, image_write())
            .unwrap();
        b.add(vk::DescriptorType::STORAGE_BUFFER, 1, 0, buffer_write())
            .unwrap();

        for registry in [&a, &b] {
            assert_eq!(registry.descriptor_count(vk::DescriptorType::STORAGE_BUFFER), 2);
            assert_eq!(registry.descriptor_count(vk::DescriptorType::STORAGE_IMAGE), 1);
            assert_eq!(
                registry.descriptor_count(vk::DescriptorType::ACCELERATION_STRUCTURE_KHR),
                1
            );
            assert_eq!(registry.descriptor_count(vk::DescriptorType::UNIFORM_BUFFER), 0);
        }
        let sizes = |r: &DescriptorRegistry| {
            r.pool_sizes(1)
                .iter()
                .map(|s| (s.ty, s.descriptor_count))
                .collect::<Vec<_>>()
        };
        assert_eq!(sizes(&a), sizes(&b));
    }

    #[test]
    fn test_pool_sizes_scale_with_max_sets() {
        let mut registry = DescriptorRegistry::default();
        registry
            .add(vk::DescriptorType::UNIFORM_BUFFER, 0, 0, buffer_write())
            .unwrap();
        registry
            .add(vk::DescriptorType::UNIFORM_BUFFER, 1, 0, buffer_write())
            .unwrap();
        let pool_sizes = registry.pool_sizes(3);
        assert_eq!(pool_sizes.len(), 1);
        assert_eq!(pool_sizes[0].ty, vk::DescriptorType::UNIFORM_BUFFER);
        assert_eq!(pool_sizes[0].descriptor_count, 6);
    }

    #[test]
    fn test_duplicate_binding_in_same_set_is_rejected() {
        let mut registry = DescriptorRegistry::default();
        registry
            .add(vk::DescriptorType::STORAGE_BUFFER, 0, 0, buffer_write())
            .unwrap();
        assert!(registry
            .add(vk::DescriptorType::STORAGE_IMAGE, 0, 0, image_write())
            .is_err());
        // the rejected add leaves no trace
        assert_eq!(registry.descriptor_count(vk::DescriptorType::STORAGE_IMAGE), 0);
        assert_eq!(registry.writes().len(), 1);
    }

    #[test]
    fn test_same_binding_in_different_sets() {
        let mut registry = DescriptorRegistry::default();
        registry
            .add(vk::DescriptorType::STORAGE_BUFFER, 0, 0, buffer_write())
            .unwrap();
        registry
            .add(vk::DescriptorType::STORAGE_BUFFER, 0, 2, buffer_write())
            .unwrap();
        assert_eq!(registry.set_count(), 3);
        assert_eq!(registry.layout_bindings(0).len(), 1);
        assert!(registry.layout_bindings(1).is_empty());
        assert_eq!(registry.layout_bindings(2).len(), 1);
    }

    #[test]
    fn test_mismatched_write_is_rejected() {
        let mut registry = DescriptorRegistry::default();
        assert!(registry
            .add(vk::DescriptorType::STORAGE_IMAGE, 0, 0, buffer_write())
            .is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_seal_once() {
        let mut registry = DescriptorRegistry::default();
        assert!(registry.seal().is_err());

        registry
            .add(vk::DescriptorType::STORAGE_IMAGE, 0, 0, image_write())
            .unwrap();
        registry.seal().unwrap();
        assert!(registry.is_sealed());
        assert!(registry.seal().is_err());
        assert!(registry
            .add(vk::DescriptorType::STORAGE_BUFFER, 1, 0, buffer_write())
            .is_err());
    }

    #[test]
    fn test_layout_binding_fields() {
        let mut registry = DescriptorRegistry::new(vk::ShaderStageFlags::COMPUTE);
        registry
            .add(vk::DescriptorType::STORAGE_IMAGE, 4, 0, image_write())
            .unwrap();
        let binding = registry.layout_bindings(0)[0];
        assert_eq!(binding.binding, 4);
        assert_eq!(binding.descriptor_type, vk::DescriptorType::STORAGE_IMAGE);
        assert_eq!(binding.descriptor_count, 1);
        assert_eq!(binding.stage_flags, vk::ShaderStageFlags::COMPUTE);
    }

    #[test]
    fn test_default_stage_flags() {
        assert!(default_stage_flags(true).contains(vk::ShaderStageFlags::RAYGEN_KHR));
        assert_eq!(default_stage_flags(false), vk::ShaderStageFlags::COMPUTE);
    }
}
