use anyhow::Result;
use ash::vk;

pub struct DescriptorSetLayout {
    descriptor_set_layout: vk::DescriptorSetLayout,
    device: ash::Device,
}

impl DescriptorSetLayout {
    pub fn new(bindings: &[vk::DescriptorSetLayoutBinding], device: ash::Device) -> Result<Self> {
        let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(bindings);
        let descriptor_set_layout =
            unsafe { device.create_descriptor_set_layout(&create_info, None)? };

        Ok(Self {
            descriptor_set_layout,
            device,
        })
    }

    pub fn vk_descriptor_set_layout(&self) -> vk::DescriptorSetLayout {
        self.descriptor_set_layout
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device
                .destroy_descriptor_set_layout(self.descriptor_set_layout, None);
        }
    }
}
