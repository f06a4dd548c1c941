use super::properties::RaytracingPipelineProperties;
use crate::{
    common::buffer::Buffer,
    context::Context,
    utils::math::align_up,
};
use anyhow::{
    ensure,
    Context as _,
    Result,
};
use ash::vk;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SbtRegion {
    pub offset: vk::DeviceSize,
    pub stride: vk::DeviceSize,
    pub size: vk::DeviceSize,
}

impl SbtRegion {
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Region relative to `base_address`; an empty region has a zero address.
    pub fn strided_region(
        &self,
        base_address: vk::DeviceAddress,
    ) -> vk::StridedDeviceAddressRegionKHR {
        if self.is_empty() {
            return vk::StridedDeviceAddressRegionKHR::default();
        }
        vk::StridedDeviceAddressRegionKHR::default()
            .device_address(base_address + self.offset)
            .stride(self.stride)
            .size(self.size)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SbtGroupCounts {
    pub raygen: u32,
    pub miss: u32,
    pub hit: u32,
    pub callable: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShaderBindingTableLayout {
    pub handle_size: u32,
    pub handle_stride: vk::DeviceSize,
    pub raygen: SbtRegion,
    pub miss: SbtRegion,
    pub hit: SbtRegion,
    pub callable: SbtRegion,
    pub total_size: vk::DeviceSize,
}

impl ShaderBindingTableLayout {
    pub fn new(properties: &RaytracingPipelineProperties, counts: SbtGroupCounts) -> Result<Self> {
        ensure!(
            counts.raygen == 1,
            "exactly one raygen shader is required, got {}",
            counts.raygen
        );
        ensure!(
            properties.shader_group_handle_size > 0,
            "shader group handle size is zero"
        );
        let handle_alignment = properties.shader_group_handle_alignment.max(1) as vk::DeviceSize;
        let base_alignment = properties.shader_group_base_alignment.max(1) as vk::DeviceSize;
        ensure!(
            handle_alignment.is_power_of_two() && base_alignment.is_power_of_two(),
            "shader group alignments must be powers of two"
        );

        let handle_size = properties.shader_group_handle_size as vk::DeviceSize;
        let handle_stride = align_up(handle_size, handle_alignment);

        // the raygen region's size must equal its stride
        let raygen_stride = align_up(handle_stride, base_alignment);
        let raygen = SbtRegion {
            offset: 0,
            stride: raygen_stride,
            size: raygen_stride,
        };

        let mut offset = raygen.size;
        let mut next_region = |count: u32| {
            if count == 0 {
                return SbtRegion::default();
            }
            let size = align_up(count as vk::DeviceSize * handle_stride, base_alignment);
            let region = SbtRegion {
                offset,
                stride: handle_stride,
                size,
            };
            offset += size;
            region
        };
        let miss = next_region(counts.miss);
        let hit = next_region(counts.hit);
        let callable = next_region(counts.callable);

        Ok(Self {
            handle_size: properties.shader_group_handle_size,
            handle_stride,
            raygen,
            miss,
            hit,
            callable,
            total_size: offset,
        })
    }

    /// Table contents: each region's groups, in order, copied from `handles`
    /// (tightly packed, `handle_size` bytes per group index).
    pub fn fill(&self, handles: &[u8], region_groups: [&[u32]; 4]) -> Result<Vec<u8>> {
        let handle_size = self.handle_size as usize;
        let mut data = vec![0u8; self.total_size as usize];
        let regions = [self.raygen, self.miss, self.hit, self.callable];
        for (region, groups) in regions.iter().zip(region_groups) {
            ensure!(
                groups.len() as vk::DeviceSize * region.stride <= region.size,
                "{} groups do not fit a region of {} bytes",
                groups.len(),
                region.size
            );
            for (i, &group) in groups.iter().enumerate() {
                let src = group as usize * handle_size;
                let handle = handles
                    .get(src..src + handle_size)
                    .with_context(|| format!("no handle for shader group {}", group))?;
                let dst = (region.offset + i as vk::DeviceSize * region.stride) as usize;
                data[dst..dst + handle_size].copy_from_slice(handle);
            }
        }
        Ok(data)
    }
}

pub struct ShaderBindingTable {
    _buffer: Buffer,
    raygen_region: vk::StridedDeviceAddressRegionKHR,
    miss_region: vk::StridedDeviceAddressRegionKHR,
    hit_region: vk::StridedDeviceAddressRegionKHR,
    callable_region: vk::StridedDeviceAddressRegionKHR,
}

impl ShaderBindingTable {
    pub fn new(
        context: &Context,
        pipeline: vk::Pipeline,
        layout: &ShaderBindingTableLayout,
        group_count: u32,
        region_groups: [&[u32]; 4],
        base_alignment: u32,
    ) -> Result<Self> {
        let raytracing_pipeline = &context.ray_tracing()?.raytracing_pipeline;
        let handles = unsafe {
            raytracing_pipeline.get_ray_tracing_shader_group_handles(
                pipeline,
                0,
                group_count,
                (layout.handle_size * group_count) as usize,
            )?
        };
        let data = layout.fill(&handles, region_groups)?;

        // over-allocate so the table start can be moved to the base alignment
        let base_alignment = base_alignment.max(1) as vk::DeviceSize;
        let buffer = context.create_buffer(
            None,
            layout.total_size + base_alignment,
            vk::BufferUsageFlags::SHADER_BINDING_TABLE_KHR
                | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        let table_address = align_up(buffer.device_address(), base_alignment);
        buffer.write(table_address - buffer.device_address(), &data)?;
        log::info!(
            "shader binding table created: {} groups, {} bytes",
            group_count,
            layout.total_size
        );

        Ok(Self {
            raygen_region: layout.raygen.strided_region(table_address),
            miss_region: layout.miss.strided_region(table_address),
            hit_region: layout.hit.strided_region(table_address),
            callable_region: layout.callable.strided_region(table_address),
            _buffer: buffer,
        })
    }

    pub fn raygen_region(&self) -> &vk::StridedDeviceAddressRegionKHR {
        &self.raygen_region
    }

    pub fn miss_region(&self) -> &vk::StridedDeviceAddressRegionKHR {
        &self.miss_region
    }

    pub fn hit_region(&self) -> &vk::StridedDeviceAddressRegionKHR {
        &self.hit_region
    }

    pub fn callable_region(&self) -> &vk::StridedDeviceAddressRegionKHR {
        &self.callable_region
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn properties(
        handle_size: u32,
        handle_alignment: u32,
        base_alignment: u32,
    ) -> RaytracingPipelineProperties {
        RaytracingPipelineProperties {
            shader_group_handle_size: handle_size,
            shader_group_handle_alignment: handle_alignment,
            shader_group_base_alignment: base_alignment,
            max_ray_recursion_depth: 1,
        }
    }

    fn counts(raygen: u32, miss: u32, hit: u32, callable: u32) -> SbtGroupCounts {
        SbtGroupCounts {
            raygen,
            miss,
            hit,
            callable,
        }
    }

    #[test]
    fn test_layout_one_group_each() {
        let layout =
            ShaderBindingTableLayout::new(&properties(32, 32, 64), counts(1, 1, 1, 0)).unwrap();
        assert_eq!(layout.handle_stride, 32);
        assert_eq!(
            layout.raygen,
            SbtRegion {
                offset: 0,
                stride: 64,
                size: 64
            }
        );
        assert_eq!(
            layout.miss,
            SbtRegion {
                offset: 64,
                stride: 32,
                size: 64
            }
        );
        assert_eq!(
            layout.hit,
            SbtRegion {
                offset: 128,
                stride: 32,
                size: 64
            }
        );
        assert!(layout.callable.is_empty());
        assert_eq!(layout.total_size, 192);
    }

    #[test]
    fn test_layout_unaligned_handle() {
        // handle 24 bytes, 16 byte handle alignment -> stride 32
        let layout =
            ShaderBindingTableLayout::new(&properties(24, 16, 64), counts(1, 3, 2, 1)).unwrap();
        assert_eq!(layout.handle_stride, 32);
        assert_eq!(layout.raygen.size, 64);
        assert_eq!(layout.miss.offset, 64);
        assert_eq!(layout.miss.size, 128);
        assert_eq!(layout.hit.offset, 192);
        assert_eq!(layout.hit.size, 64);
        assert_eq!(layout.callable.offset, 256);
        assert_eq!(layout.callable.size, 64);
        assert_eq!(layout.total_size, 320);
    }

    #[test]
    fn test_layout_requires_single_raygen() {
        let props = properties(32, 32, 64);
        assert!(ShaderBindingTableLayout::new(&props, counts(0, 1, 1, 0)).is_err());
        assert!(ShaderBindingTableLayout::new(&props, counts(2, 1, 1, 0)).is_err());
    }

    #[test]
    fn test_empty_region_has_zero_address() {
        let layout =
            ShaderBindingTableLayout::new(&properties(32, 32, 64), counts(1, 1, 0, 0)).unwrap();
        let hit = layout.hit.strided_region(0x1000);
        assert_eq!(hit.device_address, 0);
        assert_eq!(hit.size, 0);
        assert_eq!(hit.stride, 0);

        let miss = layout.miss.strided_region(0x1000);
        assert_eq!(miss.device_address, 0x1040);
        assert_eq!(miss.stride, 32);
    }

    #[test]
    fn test_fill_places_handles_by_region() {
        let layout =
            ShaderBindingTableLayout::new(&properties(4, 4, 8), counts(1, 2, 1, 0)).unwrap();
        // groups in creation order: 0 raygen, 1 miss, 2 hit, 3 miss
        let handles: Vec<u8> = (0..4u8).flat_map(|g| [g + 1; 4]).collect();
        let data = layout
            .fill(&handles, [&[0], &[1, 3], &[2], &[]])
            .unwrap();
        assert_eq!(data.len() as u64, layout.total_size);
        assert_eq!(&data[0..4], &[1; 4]);
        assert_eq!(&data[4..8], &[0; 4]);
        assert_eq!(&data[8..12], &[2; 4]);
        assert_eq!(&data[12..16], &[4; 4]);
        assert_eq!(&data[16..20], &[3; 4]);
    }

    #[test]
    fn test_fill_rejects_missing_handle() {
        let layout =
            ShaderBindingTableLayout::new(&properties(4, 4, 8), counts(1, 0, 0, 0)).unwrap();
        assert!(layout.fill(&[0u8; 4], [&[1], &[], &[], &[]]).is_err());
    }
}
