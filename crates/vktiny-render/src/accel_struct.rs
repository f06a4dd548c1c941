use crate::{
    common::{
        buffer::Buffer,
        index::Index,
        mesh::{
            triangle_count,
            Mesh,
        },
        vertex::Vertex,
    },
    context::Context,
    descriptor::DescriptorWrite,
};
use anyhow::{
    ensure,
    Result,
};
use ash::vk;
use nalgebra_glm as glm;

pub trait AccelerationStructure {
    fn accel_struct(&self) -> &AccelStruct;

    fn buffer(&self) -> &Buffer {
        &self.accel_struct().buffer
    }

    fn create_write(&self) -> DescriptorWrite {
        DescriptorWrite::AccelStruct(self.accel_struct().handle)
    }

    fn vk_accel_struct(&self) -> vk::AccelerationStructureKHR {
        self.accel_struct().handle
    }

    fn device_address(&self) -> vk::DeviceAddress {
        self.accel_struct().device_address
    }
}

pub fn buffer_sizes(
    sizes: &vk::AccelerationStructureBuildSizesInfoKHR,
) -> (vk::DeviceSize, vk::DeviceSize) {
    (sizes.acceleration_structure_size, sizes.build_scratch_size)
}

pub fn triangle_primitive_count(index_count: usize) -> Result<u32> {
    ensure!(index_count > 0, "no indices to build triangles from");
    ensure!(
        index_count % 3 == 0,
        "index count {} is not a multiple of 3",
        index_count
    );
    Ok((index_count / 3) as u32)
}

pub fn build_range(primitive_count: u32) -> vk::AccelerationStructureBuildRangeInfoKHR {
    vk::AccelerationStructureBuildRangeInfoKHR::default()
        .primitive_count(primitive_count)
        .primitive_offset(0)
        .first_vertex(0)
        .transform_offset(0)
}

/// Row-major 3x4 top of `matrix`.
pub fn transform_matrix(matrix: &glm::Mat4) -> vk::TransformMatrixKHR {
    let mut transform = [0.0f32; 12];
    for row in 0..3 {
        for col in 0..4 {
            transform[row * 4 + col] = matrix[(row, col)];
        }
    }
    vk::TransformMatrixKHR { matrix: transform }
}

/// Instance record with identity transform and mask `0xFF`, face culling off.
pub fn single_instance(
    bottom_level_address: vk::DeviceAddress,
) -> vk::AccelerationStructureInstanceKHR {
    vk::AccelerationStructureInstanceKHR {
        transform: transform_matrix(&glm::Mat4::identity()),
        instance_custom_index_and_mask: vk::Packed24_8::new(0, 0xFF),
        instance_shader_binding_table_record_offset_and_flags: vk::Packed24_8::new(
            0,
            vk::GeometryInstanceFlagsKHR::TRIANGLE_FACING_CULL_DISABLE.as_raw() as u8,
        ),
        acceleration_structure_reference: vk::AccelerationStructureReferenceKHR {
            device_handle: bottom_level_address,
        },
    }
}

fn instance_bytes(instance: &vk::AccelerationStructureInstanceKHR) -> &[u8] {
    unsafe {
        std::slice::from_raw_parts(
            instance as *const vk::AccelerationStructureInstanceKHR as *const u8,
            std::mem::size_of::<vk::AccelerationStructureInstanceKHR>(),
        )
    }
}

pub struct AccelStruct {
    handle: vk::AccelerationStructureKHR,
    buffer: Buffer,
    loader: ash::khr::acceleration_structure::Device,
    device_address: vk::DeviceAddress,
    ty: vk::AccelerationStructureTypeKHR,
}

impl AccelStruct {
    pub fn new(
        context: &Context,
        ty: vk::AccelerationStructureTypeKHR,
        geometries: &[vk::AccelerationStructureGeometryKHR],
        primitive_count: u32,
    ) -> Result<Self> {
        let loader = context.ray_tracing()?.acceleration_structure.clone();

        let geometry_info = vk::AccelerationStructureBuildGeometryInfoKHR::default()
            .ty(ty)
            .flags(vk::BuildAccelerationStructureFlagsKHR::PREFER_FAST_TRACE)
            .mode(vk::BuildAccelerationStructureModeKHR::BUILD)
            .geometries(geometries);

        let sizes = Self::get_size(&loader, &geometry_info, primitive_count);
        let (storage_size, _) = buffer_sizes(&sizes);
        let buffer = Self::create_buffer(context, storage_size)?;
        let handle = Self::create_accel_struct(&loader, &buffer, storage_size, ty)?;

        let mut accel_struct = Self {
            handle,
            buffer,
            loader,
            device_address: 0,
            ty,
        };
        accel_struct.build(context, geometry_info, &sizes, primitive_count)?;
        accel_struct.device_address = unsafe {
            accel_struct
                .loader
                .get_acceleration_structure_device_address(
                    &vk::AccelerationStructureDeviceAddressInfoKHR::default()
                        .acceleration_structure(handle),
                )
        };
        log::info!(
            "{:?} acceleration structure built: {} bytes, {} primitives",
            ty,
            storage_size,
            primitive_count
        );
        Ok(accel_struct)
    }

    pub fn get_size(
        loader: &ash::khr::acceleration_structure::Device,
        geometry_info: &vk::AccelerationStructureBuildGeometryInfoKHR,
        primitive_count: u32,
    ) -> vk::AccelerationStructureBuildSizesInfoKHR<'static> {
        let mut sizes = vk::AccelerationStructureBuildSizesInfoKHR::default();
        unsafe {
            loader.get_acceleration_structure_build_sizes(
                vk::AccelerationStructureBuildTypeKHR::DEVICE,
                geometry_info,
                &[primitive_count],
                &mut sizes,
            );
        }
        sizes
    }

    pub fn create_buffer(context: &Context, size: vk::DeviceSize) -> Result<Buffer> {
        context.create_buffer(
            None,
            size,
            vk::BufferUsageFlags::ACCELERATION_STRUCTURE_STORAGE_KHR
                | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )
    }

    pub fn create_accel_struct(
        loader: &ash::khr::acceleration_structure::Device,
        buffer: &Buffer,
        size: vk::DeviceSize,
        ty: vk::AccelerationStructureTypeKHR,
    ) -> Result<vk::AccelerationStructureKHR> {
        let create_info = vk::AccelerationStructureCreateInfoKHR::default()
            .buffer(buffer.vk_buffer())
            .size(size)
            .ty(ty);
        let handle = unsafe { loader.create_acceleration_structure(&create_info, None)? };
        Ok(handle)
    }

    /// Records and submits one build into this structure, waiting for completion.
    pub fn build(
        &self,
        context: &Context,
        geometry_info: vk::AccelerationStructureBuildGeometryInfoKHR,
        sizes: &vk::AccelerationStructureBuildSizesInfoKHR,
        primitive_count: u32,
    ) -> Result<()> {
        let (_, scratch_size) = buffer_sizes(sizes);
        let scratch_buffer = context.create_buffer(
            None,
            scratch_size.max(1),
            vk::BufferUsageFlags::STORAGE_BUFFER | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;

        let geometry_info = geometry_info
            .dst_acceleration_structure(self.handle)
            .scratch_data(vk::DeviceOrHostAddressKHR {
                device_address: scratch_buffer.device_address(),
            });
        let build_range_infos = [build_range(primitive_count)];

        let command_buffer = context.begin_graphics_command()?;
        unsafe {
            self.loader.cmd_build_acceleration_structures(
                command_buffer,
                std::slice::from_ref(&geometry_info),
                &[&build_range_infos],
            );
        }
        // scratch_buffer outlives the wait inside end_graphics_command
        context.end_graphics_command(command_buffer)
    }

    pub fn ty(&self) -> vk::AccelerationStructureTypeKHR {
        self.ty
    }
}

impl AccelerationStructure for AccelStruct {
    fn accel_struct(&self) -> &AccelStruct {
        self
    }
}

impl Drop for AccelStruct {
    fn drop(&mut self) {
        unsafe {
            self.loader
                .destroy_acceleration_structure(self.handle, None);
        }
    }
}

pub struct BottomLevelAccelStruct {
    accel_struct: AccelStruct,
}

impl BottomLevelAccelStruct {
    pub fn new(
        context: &Context,
        vertices: &[Vertex],
        vertex_buffer: &Buffer,
        indices: &[Index],
        index_buffer: &Buffer,
    ) -> Result<Self> {
        let primitive_count = triangle_count(vertices, indices)?;
        ensure!(
            vertex_buffer.device_address() != 0 && index_buffer.device_address() != 0,
            "geometry buffers need SHADER_DEVICE_ADDRESS usage"
        );

        let triangles = vk::AccelerationStructureGeometryTrianglesDataKHR::default()
            .vertex_format(Vertex::format())
            .vertex_data(vk::DeviceOrHostAddressConstKHR {
                device_address: vertex_buffer.device_address(),
            })
            .vertex_stride(Vertex::stride())
            .max_vertex(vertices.len() as u32 - 1)
            .index_type(Index::get_type())
            .index_data(vk::DeviceOrHostAddressConstKHR {
                device_address: index_buffer.device_address(),
            });
        let geometries = [vk::AccelerationStructureGeometryKHR::default()
            .geometry_type(vk::GeometryTypeKHR::TRIANGLES)
            .geometry(vk::AccelerationStructureGeometryDataKHR { triangles })
            .flags(vk::GeometryFlagsKHR::OPAQUE)];

        let accel_struct = AccelStruct::new(
            context,
            vk::AccelerationStructureTypeKHR::BOTTOM_LEVEL,
            &geometries,
            primitive_count,
        )?;
        Ok(Self { accel_struct })
    }

    pub fn from_mesh(context: &Context, mesh: &Mesh) -> Result<Self> {
        Self::new(
            context,
            mesh.vertices(),
            mesh.vertex_buffer(),
            mesh.indices(),
            mesh.index_buffer(),
        )
    }
}

impl AccelerationStructure for BottomLevelAccelStruct {
    fn accel_struct(&self) -> &AccelStruct {
        &self.accel_struct
    }
}

pub struct TopLevelAccelStruct {
    accel_struct: AccelStruct,
    _instance_buffer: Buffer,
}

impl TopLevelAccelStruct {
    pub fn new(context: &Context, bottom_level: &BottomLevelAccelStruct) -> Result<Self> {
        let instance = single_instance(bottom_level.device_address());
        let instance_data = instance_bytes(&instance);
        let instance_buffer = context.create_buffer(
            Some(instance_data),
            instance_data.len() as vk::DeviceSize,
            vk::BufferUsageFlags::ACCELERATION_STRUCTURE_BUILD_INPUT_READ_ONLY_KHR
                | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;

        let instances = vk::AccelerationStructureGeometryInstancesDataKHR::default()
            .array_of_pointers(false)
            .data(vk::DeviceOrHostAddressConstKHR {
                device_address: instance_buffer.device_address(),
            });
        let geometries = [vk::AccelerationStructureGeometryKHR::default()
            .geometry_type(vk::GeometryTypeKHR::INSTANCES)
            .geometry(vk::AccelerationStructureGeometryDataKHR { instances })
            .flags(vk::GeometryFlagsKHR::OPAQUE)];

        let accel_struct = AccelStruct::new(
            context,
            vk::AccelerationStructureTypeKHR::TOP_LEVEL,
            &geometries,
            1,
        )?;
        Ok(Self {
            accel_struct,
            _instance_buffer: instance_buffer,
        })
    }
}

impl AccelerationStructure for TopLevelAccelStruct {
    fn accel_struct(&self) -> &AccelStruct {
        &self.accel_struct
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_triangle() {
        assert_eq!(triangle_primitive_count(3).unwrap(), 1);
        let range = build_range(triangle_primitive_count(3).unwrap());
        assert_eq!(range.primitive_count, 1);
        assert_eq!(range.primitive_offset, 0);
        assert_eq!(range.first_vertex, 0);
        assert_eq!(range.transform_offset, 0);
    }

    #[test]
    fn test_primitive_count_rejects_partial_triangles() {
        assert_eq!(triangle_primitive_count(12).unwrap(), 4);
        assert!(triangle_primitive_count(4).is_err());
        assert!(triangle_primitive_count(0).is_err());
    }

    #[test]
    fn test_buffer_sizes_follow_query() {
        let sizes = vk::AccelerationStructureBuildSizesInfoKHR::default()
            .acceleration_structure_size(1280)
            .build_scratch_size(4096);
        assert_eq!(buffer_sizes(&sizes), (1280, 4096));
    }

    #[test]
    fn test_transform_matrix_is_row_major() {
        let translated = glm::translate(&glm::Mat4::identity(), &glm::vec3(1.0, 2.0, 3.0));
        let transform = transform_matrix(&translated);
        assert_eq!(
            transform.matrix,
            [1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 2.0, 0.0, 0.0, 1.0, 3.0]
        );
    }

    #[test]
    fn test_single_instance() {
        let instance = single_instance(0xdead_beef);
        assert_eq!(
            instance.transform.matrix,
            [1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0]
        );
        assert_eq!(instance.instance_custom_index_and_mask.low_24(), 0);
        assert_eq!(instance.instance_custom_index_and_mask.high_8(), 0xFF);
        assert_eq!(
            instance
                .instance_shader_binding_table_record_offset_and_flags
                .low_24(),
            0
        );
        assert_eq!(
            instance
                .instance_shader_binding_table_record_offset_and_flags
                .high_8() as u32,
            vk::GeometryInstanceFlagsKHR::TRIANGLE_FACING_CULL_DISABLE.as_raw()
        );
        let reference = unsafe { instance.acceleration_structure_reference.device_handle };
        assert_eq!(reference, 0xdead_beef);
    }

    #[test]
    fn test_instance_bytes_len() {
        let instance = single_instance(0);
        assert_eq!(instance_bytes(&instance).len(), 64);
    }
}
