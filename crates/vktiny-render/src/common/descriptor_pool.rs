use anyhow::Result;
use ash::vk;

pub struct DescriptorPool {
    pool: vk::DescriptorPool,
    device: ash::Device,
}

impl DescriptorPool {
    pub fn new(
        pool_sizes: &[vk::DescriptorPoolSize],
        max_sets: u32,
        device: ash::Device,
    ) -> Result<Self> {
        let create_info = vk::DescriptorPoolCreateInfo::default()
            .pool_sizes(pool_sizes)
            .max_sets(max_sets);
        let pool = unsafe { device.create_descriptor_pool(&create_info, None)? };

        Ok(Self { pool, device })
    }

    pub fn allocate(&self, layouts: &[vk::DescriptorSetLayout]) -> Result<Vec<vk::DescriptorSet>> {
        let allocate_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.pool)
            .set_layouts(layouts);
        let descriptor_sets = unsafe { self.device.allocate_descriptor_sets(&allocate_info)? };
        Ok(descriptor_sets)
    }

    pub fn vk_pool(&self) -> vk::DescriptorPool {
        self.pool
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_pool(self.pool, None);
        }
    }
}
