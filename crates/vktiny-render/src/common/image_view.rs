use anyhow::Result;
use ash::vk;

pub struct ImageView {
    image_view: vk::ImageView,
    device: ash::Device,
}

impl ImageView {
    pub fn new_color_2d(image: vk::Image, format: vk::Format, device: ash::Device) -> Result<Self> {
        let image_view_create_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(super::image::color_subresource_range());
        let image_view = unsafe { device.create_image_view(&image_view_create_info, None)? };
        Ok(Self { image_view, device })
    }

    pub fn vk_image_view(&self) -> vk::ImageView {
        self.image_view
    }
}

impl Drop for ImageView {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_image_view(self.image_view, None);
        }
    }
}
