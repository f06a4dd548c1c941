use super::memory::find_memory_type;
use crate::descriptor::DescriptorWrite;
use anyhow::{
    ensure,
    Result,
};
use ash::vk;

fn flush_mapped_memory(
    device: &ash::Device,
    device_memory: vk::DeviceMemory,
) -> Result<()> {
    let mapped_range = [vk::MappedMemoryRange::default()
        .memory(device_memory)
        .offset(0)
        .size(vk::WHOLE_SIZE)];
    unsafe {
        device.flush_mapped_memory_ranges(&mapped_range)?;
    }
    Ok(())
}

pub struct Buffer {
    buffer: vk::Buffer,
    device: ash::Device,
    device_memory: vk::DeviceMemory,
    usage_flags: vk::BufferUsageFlags,
    memory_property_flags: vk::MemoryPropertyFlags,
    device_address: vk::DeviceAddress,
    size: vk::DeviceSize,
}

impl Buffer {
    pub fn new(
        data: Option<&[u8]>,
        size: vk::DeviceSize,
        usage_flags: vk::BufferUsageFlags,
        memory_property_flags: vk::MemoryPropertyFlags,
        physical_device: vk::PhysicalDevice,
        device: ash::Device,
        instance: &ash::Instance,
    ) -> Result<Self> {
        ensure!(size > 0, "buffer size must be greater than zero");

        let create_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage_flags)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let vk_buffer = unsafe { device.create_buffer(&create_info, None)? };
        // owns the handle from here on; memory is attached once allocated
        let mut buffer = Self {
            buffer: vk_buffer,
            device: device.clone(),
            device_memory: vk::DeviceMemory::null(),
            usage_flags,
            memory_property_flags,
            device_address: 0,
            size,
        };

        let mem_requirements = unsafe { device.get_buffer_memory_requirements(vk_buffer) };

        let wants_device_address = usage_flags.contains(vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS);
        let mut alloc_flags_info = if wants_device_address {
            vk::MemoryAllocateFlagsInfo::default().flags(vk::MemoryAllocateFlags::DEVICE_ADDRESS)
        } else {
            vk::MemoryAllocateFlagsInfo::default()
        };

        let memory_type = find_memory_type(
            mem_requirements.memory_type_bits,
            memory_property_flags,
            physical_device,
            instance,
        )?;

        let alloc_info = vk::MemoryAllocateInfo::default()
            .allocation_size(mem_requirements.size)
            .memory_type_index(memory_type)
            .push_next(&mut alloc_flags_info);

        buffer.device_memory = unsafe { device.allocate_memory(&alloc_info, None)? };

        unsafe {
            device.bind_buffer_memory(vk_buffer, buffer.device_memory, 0)?;
        }

        if wants_device_address {
            buffer.device_address = unsafe {
                device.get_buffer_device_address(
                    &vk::BufferDeviceAddressInfo::default().buffer(vk_buffer),
                )
            };
        }

        if let Some(data) = data {
            buffer.write(0, data)?;
        }

        Ok(buffer)
    }

    pub fn write(&self, offset: vk::DeviceSize, data: &[u8]) -> Result<()> {
        ensure!(
            self.memory_property_flags
                .contains(vk::MemoryPropertyFlags::HOST_VISIBLE),
            "buffer is not host visible"
        );
        ensure!(
            offset + data.len() as vk::DeviceSize <= self.size,
            "write of {} bytes at offset {} overflows buffer of {} bytes",
            data.len(),
            offset,
            self.size
        );

        unsafe {
            let mapped_memory = self.device.map_memory(
                self.device_memory,
                0,
                vk::WHOLE_SIZE,
                vk::MemoryMapFlags::empty(),
            )?;
            std::ptr::copy_nonoverlapping(
                data.as_ptr(),
                (mapped_memory as *mut u8).add(offset as usize),
                data.len(),
            );
        }

        if !self
            .memory_property_flags
            .contains(vk::MemoryPropertyFlags::HOST_COHERENT)
        {
            flush_mapped_memory(&self.device, self.device_memory)?;
        }

        unsafe {
            self.device.unmap_memory(self.device_memory);
        }
        Ok(())
    }

    pub fn create_write(&self) -> DescriptorWrite {
        DescriptorWrite::Buffer(
            vk::DescriptorBufferInfo::default()
                .buffer(self.buffer)
                .offset(0)
                .range(vk::WHOLE_SIZE),
        )
    }

    pub fn vk_buffer(&self) -> vk::Buffer {
        self.buffer
    }

    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    pub fn usage_flags(&self) -> vk::BufferUsageFlags {
        self.usage_flags
    }

    /// Zero unless the buffer was created with `SHADER_DEVICE_ADDRESS`.
    pub fn device_address(&self) -> vk::DeviceAddress {
        self.device_address
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_buffer(self.buffer, None);
            self.device.free_memory(self.device_memory, None);
        }
    }
}
