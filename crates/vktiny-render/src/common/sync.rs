use crate::common::consts::MAX_FRAMES_IN_FLIGHT;
use anyhow::Result;
use ash::vk;

pub struct SyncObjects {
    image_available_semaphores: Vec<vk::Semaphore>,
    render_finished_semaphores: Vec<vk::Semaphore>,
    inflight_fences: Vec<vk::Fence>,
    images_in_flight: Vec<vk::Fence>,
    device: ash::Device,
}

impl SyncObjects {
    pub fn new(device: ash::Device, swapchain_image_count: usize) -> Result<Self> {
        let semaphore_create_info = vk::SemaphoreCreateInfo::default();
        // signaled so the first wait of each slot returns immediately
        let fence_create_info =
            vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);

        let mut image_available_semaphores = vec![];
        let mut render_finished_semaphores = vec![];
        let mut inflight_fences = vec![];

        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            unsafe {
                let image_available_semaphore =
                    device.create_semaphore(&semaphore_create_info, None)?;
                let render_finished_semaphore =
                    device.create_semaphore(&semaphore_create_info, None)?;
                let inflight_fence = device.create_fence(&fence_create_info, None)?;

                image_available_semaphores.push(image_available_semaphore);
                render_finished_semaphores.push(render_finished_semaphore);
                inflight_fences.push(inflight_fence);
            }
        }

        Ok(Self {
            image_available_semaphores,
            render_finished_semaphores,
            inflight_fences,
            images_in_flight: vec![vk::Fence::null(); swapchain_image_count],
            device,
        })
    }

    pub fn image_available_semaphore(&self, frame: usize) -> vk::Semaphore {
        self.image_available_semaphores[frame]
    }

    pub fn render_finished_semaphore(&self, frame: usize) -> vk::Semaphore {
        self.render_finished_semaphores[frame]
    }

    pub fn inflight_fence(&self, frame: usize) -> vk::Fence {
        self.inflight_fences[frame]
    }

    /// Swaps in the fence now guarding `image_index`, returning the previous one.
    pub fn replace_image_in_flight(&mut self, image_index: usize, fence: vk::Fence) -> vk::Fence {
        std::mem::replace(&mut self.images_in_flight[image_index], fence)
    }
}

impl Drop for SyncObjects {
    fn drop(&mut self) {
        unsafe {
            for &semaphore in self.image_available_semaphores.iter() {
                self.device.destroy_semaphore(semaphore, None);
            }
            for &semaphore in self.render_finished_semaphores.iter() {
                self.device.destroy_semaphore(semaphore, None);
            }
            for &fence in self.inflight_fences.iter() {
                self.device.destroy_fence(fence, None);
            }
        }
    }
}

pub fn next_frame(current_frame: usize) -> usize {
    (current_frame + 1) % MAX_FRAMES_IN_FLIGHT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_frame_wraps() {
        let mut frame = 0;
        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            frame = next_frame(frame);
        }
        assert_eq!(frame, 0);
        assert_eq!(next_frame(0), 1 % MAX_FRAMES_IN_FLIGHT);
    }
}
