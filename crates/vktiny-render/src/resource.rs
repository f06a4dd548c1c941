use crate::{
    accel_struct::{
        BottomLevelAccelStruct,
        TopLevelAccelStruct,
    },
    common::{
        buffer::Buffer,
        image::Image,
    },
    context::Context,
    descriptor::{
        registry::default_stage_flags,
        DescriptorManager,
    },
};
use anyhow::{
    ensure,
    Context as _,
    Result,
};
use ash::vk;

const RESOURCE_SET: u32 = 0;

macro_rules! resource_handle {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name {
            binding: u32,
        }

        impl $name {
            pub fn binding(&self) -> u32 {
                self.binding
            }
        }
    };
}

resource_handle!(BufferHandle);
resource_handle!(UniformBufferHandle);
resource_handle!(ImageHandle);
resource_handle!(AccelStructHandle);

#[derive(Debug, Default)]
struct BindingAllocator {
    next_binding: u32,
    sealed: bool,
}

impl BindingAllocator {
    fn ensure_open(&self) -> Result<()> {
        ensure!(!self.sealed, "resources cannot be added after prepare");
        Ok(())
    }

    fn next(&mut self) -> Result<u32> {
        self.ensure_open()?;
        let binding = self.next_binding;
        self.next_binding += 1;
        Ok(binding)
    }

    fn seal(&mut self) -> Result<()> {
        ensure!(!self.sealed, "resources are already prepared");
        self.sealed = true;
        Ok(())
    }
}

fn find_by_binding<'a, T>(entries: &'a [(T, u32)], binding: u32, kind: &str) -> Result<&'a T> {
    entries
        .iter()
        .find(|(_, entry_binding)| *entry_binding == binding)
        .map(|(entry, _)| entry)
        .with_context(|| format!("binding {} is not a {}", binding, kind))
}

pub struct ResourceManager {
    descriptor_manager: DescriptorManager,
    storage_buffers: Vec<(Buffer, u32)>,
    uniform_buffers: Vec<(Buffer, u32)>,
    storage_images: Vec<(Image, u32)>,
    top_level_accel_structs: Vec<(TopLevelAccelStruct, u32)>,
    bindings: BindingAllocator,
}

impl ResourceManager {
    pub fn new(context: &Context) -> Self {
        let stage_flags = default_stage_flags(context.ray_tracing().is_ok());
        Self {
            descriptor_manager: DescriptorManager::new(context.device().clone())
                .with_stage_flags(stage_flags),
            storage_buffers: vec![],
            uniform_buffers: vec![],
            storage_images: vec![],
            top_level_accel_structs: vec![],
            bindings: BindingAllocator::default(),
        }
    }

    fn ensure_not_prepared(&self) -> Result<()> {
        self.bindings.ensure_open()?;
        ensure!(
            !self.descriptor_manager.registry().is_sealed(),
            "resources cannot be added after prepare"
        );
        Ok(())
    }

    pub fn add_storage_image(
        &mut self,
        context: &Context,
        extent: vk::Extent2D,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
        layout: vk::ImageLayout,
    ) -> Result<ImageHandle> {
        self.ensure_not_prepared()?;
        let mut image =
            context.create_image(extent, format, usage | vk::ImageUsageFlags::STORAGE)?;
        image.transition(context, layout)?;
        let binding = self.bindings.next()?;
        log::debug!(
            "storage image {}x{} at binding {}",
            extent.width,
            extent.height,
            binding
        );
        self.storage_images.push((image, binding));
        Ok(ImageHandle { binding })
    }

    pub fn add_storage_buffer(
        &mut self,
        context: &Context,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        memory_properties: vk::MemoryPropertyFlags,
        data: Option<&[u8]>,
    ) -> Result<BufferHandle> {
        self.ensure_not_prepared()?;
        let buffer = context.create_buffer(
            data,
            size,
            usage | vk::BufferUsageFlags::STORAGE_BUFFER,
            memory_properties,
        )?;
        let binding = self.bindings.next()?;
        log::debug!("storage buffer of {} bytes at binding {}", size, binding);
        self.storage_buffers.push((buffer, binding));
        Ok(BufferHandle { binding })
    }

    pub fn add_uniform_buffer(
        &mut self,
        context: &Context,
        size: vk::DeviceSize,
        data: Option<&[u8]>,
    ) -> Result<UniformBufferHandle> {
        self.ensure_not_prepared()?;
        let buffer = context.create_buffer(
            data,
            size,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        let binding = self.bindings.next()?;
        log::debug!("uniform buffer of {} bytes at binding {}", size, binding);
        self.uniform_buffers.push((buffer, binding));
        Ok(UniformBufferHandle { binding })
    }

    /// Builds a top-level structure instancing `bottom_level`, which must
    /// outlive this manager.
    pub fn add_top_level_accel_struct(
        &mut self,
        context: &Context,
        bottom_level: &BottomLevelAccelStruct,
    ) -> Result<AccelStructHandle> {
        self.ensure_not_prepared()?;
        let accel_struct = TopLevelAccelStruct::new(context, bottom_level)?;
        let binding = self.bindings.next()?;
        log::debug!("top level acceleration structure at binding {}", binding);
        self.top_level_accel_structs.push((accel_struct, binding));
        Ok(AccelStructHandle { binding })
    }

    pub fn prepare(&mut self) -> Result<()> {
        self.ensure_not_prepared()?;
        // sealed first so a failed prepare cannot be followed by more registrations
        self.bindings.seal()?;
        for (buffer, binding) in self.storage_buffers.iter() {
            self.descriptor_manager
                .add_storage_buffer(buffer, *binding, RESOURCE_SET)?;
        }
        for (buffer, binding) in self.uniform_buffers.iter() {
            self.descriptor_manager
                .add_uniform_buffer(buffer, *binding, RESOURCE_SET)?;
        }
        for (image, binding) in self.storage_images.iter() {
            self.descriptor_manager
                .add_storage_image(image, *binding, RESOURCE_SET)?;
        }
        for (accel_struct, binding) in self.top_level_accel_structs.iter() {
            self.descriptor_manager
                .add_top_level_accel_struct(accel_struct, *binding, RESOURCE_SET)?;
        }
        self.descriptor_manager.prepare(1)?;
        log::info!(
            "resources prepared: {} storage buffers, {} uniform buffers, {} storage images, {} acceleration structures",
            self.storage_buffers.len(),
            self.uniform_buffers.len(),
            self.storage_images.len(),
            self.top_level_accel_structs.len()
        );
        Ok(())
    }

    pub fn storage_buffer(&self, handle: BufferHandle) -> Result<&Buffer> {
        find_by_binding(&self.storage_buffers, handle.binding, "storage buffer")
    }

    pub fn uniform_buffer(&self, handle: UniformBufferHandle) -> Result<&Buffer> {
        find_by_binding(&self.uniform_buffers, handle.binding, "uniform buffer")
    }

    pub fn storage_image(&self, handle: ImageHandle) -> Result<&Image> {
        find_by_binding(&self.storage_images, handle.binding, "storage image")
    }

    pub fn top_level_accel_struct(
        &self,
        handle: AccelStructHandle,
    ) -> Result<&TopLevelAccelStruct> {
        find_by_binding(
            &self.top_level_accel_structs,
            handle.binding,
            "top level acceleration structure",
        )
    }

    pub fn desc_set(&self) -> Result<vk::DescriptorSet> {
        self.descriptor_manager.desc_set()
    }

    pub fn desc_set_layout(&self) -> Result<vk::DescriptorSetLayout> {
        self.descriptor_manager.desc_set_layout()
    }

    pub fn desc_set_layouts(&self) -> Vec<vk::DescriptorSetLayout> {
        self.descriptor_manager.desc_set_layouts()
    }

    pub fn desc_sets(&self) -> &[vk::DescriptorSet] {
        self.descriptor_manager.desc_sets()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bindings_follow_registration_order() {
        let mut bindings = BindingAllocator::default();
        assert_eq!(bindings.next().unwrap(), 0);
        assert_eq!(bindings.next().unwrap(), 1);
        assert_eq!(bindings.next().unwrap(), 2);
    }

    #[test]
    fn test_no_bindings_after_prepare() {
        let mut bindings = BindingAllocator::default();
        bindings.next().unwrap();
        bindings.seal().unwrap();
        assert!(bindings.ensure_open().is_err());
        assert!(bindings.next().is_err());
    }

    #[test]
    fn test_prepare_twice_is_rejected() {
        let mut bindings = BindingAllocator::default();
        bindings.seal().unwrap();
        assert!(bindings.seal().is_err());
    }

    #[test]
    fn test_lookup_by_binding() {
        // storage entries at bindings 0 and 2, uniform at binding 1
        let storage = [("vertices", 0), ("indices", 2)];
        let uniform = [("camera", 1)];
        assert_eq!(*find_by_binding(&storage, 2, "storage buffer").unwrap(), "indices");
        assert_eq!(*find_by_binding(&uniform, 1, "uniform buffer").unwrap(), "camera");
        // a binding owned by another resource kind does not resolve
        assert!(find_by_binding(&storage, 1, "storage buffer").is_err());
        assert!(find_by_binding(&uniform, 0, "uniform buffer").is_err());
    }

    #[test]
    fn test_handle_binding() {
        let handle = ImageHandle { binding: 3 };
        assert_eq!(handle.binding(), 3);
        let copied = handle;
        assert_eq!(copied, handle);
    }
}
